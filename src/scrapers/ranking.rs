//! Per-outlet ranking extractor for the Naver news ranking page.
//!
//! The page groups its most-read articles by outlet:
//!
//! ```text
//! div._popularRanking
//! └── div.rankingnews_box                 (one per outlet)
//!     ├── a.rankingnews_box_head
//!     │   └── strong.rankingnews_name     (outlet name)
//!     └── ul.rankingnews_list
//!         └── li
//!             ├── a.list_title[href]      (title + link)
//!             ├── span.list_time          (optional)
//!             └── img                     (optional)
//! ```
//!
//! Anything below the ranking container is tolerated partially: outlets
//! without a name and rows without a title link are skipped, not errors.

use crate::error::ExtractError;
use crate::models::{Article, ExtractedOutlet};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Origin used to resolve relative article links.
pub const NAVER_NEWS_ORIGIN: &str = "https://news.naver.com";

/// Default ranking page.
pub const RANKING_PAGE_URL: &str = "https://news.naver.com/main/ranking/popularDay.naver";

const RANKING_CONTAINER: &str = "div._popularRanking";

static RANKING: Lazy<Selector> = Lazy::new(|| Selector::parse(RANKING_CONTAINER).unwrap());
static OUTLET_BOX: Lazy<Selector> = Lazy::new(|| Selector::parse("div.rankingnews_box").unwrap());
static OUTLET_HEAD: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.rankingnews_box_head").unwrap());
static OUTLET_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("strong.rankingnews_name").unwrap());
static ARTICLE_LIST: Lazy<Selector> = Lazy::new(|| Selector::parse("ul.rankingnews_list").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("a.list_title").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static TIME_LABEL: Lazy<Selector> = Lazy::new(|| Selector::parse("span.list_time").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Extract every outlet's ranking from rendered page markup, in page order.
///
/// # Errors
///
/// Returns [`ExtractError::MissingContainer`] when the ranking container is
/// absent, which usually means the page layout changed. A container with no
/// usable outlets yields `Ok(vec![])`.
#[instrument(level = "info", skip_all, fields(bytes = html.len(), base = %base))]
pub fn extract_rankings(html: &str, base: &Url) -> Result<Vec<ExtractedOutlet>, ExtractError> {
    let document = Html::parse_document(html);
    let container = document
        .select(&RANKING)
        .next()
        .ok_or(ExtractError::MissingContainer {
            selector: RANKING_CONTAINER,
        })?;

    let boxes: Vec<ElementRef> = container.select(&OUTLET_BOX).collect();
    info!(count = boxes.len(), "Found outlet ranking boxes");

    let outlets: Vec<ExtractedOutlet> = boxes
        .into_iter()
        .filter_map(|outlet_box| extract_outlet(outlet_box, base))
        .collect();

    let articles: usize = outlets.iter().map(|o| o.articles.len()).sum();
    info!(outlets = outlets.len(), articles, "Extracted rankings");
    Ok(outlets)
}

fn extract_outlet(outlet_box: ElementRef, base: &Url) -> Option<ExtractedOutlet> {
    let Some(head) = outlet_box.select(&OUTLET_HEAD).next() else {
        debug!("Outlet box without heading; skipping");
        return None;
    };
    let name = head.select(&OUTLET_NAME).next().map(element_text)?;
    if name.is_empty() {
        debug!("Outlet heading without name; skipping");
        return None;
    }

    let articles = match outlet_box.select(&ARTICLE_LIST).next() {
        Some(list) => list
            .select(&ROW)
            .filter_map(|row| extract_article(row, base))
            .collect(),
        None => {
            warn!(outlet = %name, "Outlet has no article list");
            Vec::new()
        }
    };
    debug!(outlet = %name, count = articles.len(), "Extracted outlet");

    Some(ExtractedOutlet {
        outlet_name: name,
        articles,
    })
}

fn extract_article(row: ElementRef, base: &Url) -> Option<Article> {
    let title_link = row.select(&TITLE).next()?;
    let href = title_link.value().attr("href")?;
    let title = element_text(title_link);
    if title.is_empty() {
        return None;
    }
    let link = match base.join(href.trim()) {
        Ok(link) => link.to_string(),
        Err(e) => {
            warn!(%href, error = %e, "Unresolvable article link; skipping row");
            return None;
        }
    };

    let image_url = row
        .select(&IMAGE)
        .next()
        .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
        .and_then(|src| base.join(src.trim()).ok())
        .map(|u| u.to_string());

    let published_label = row
        .select(&TIME_LABEL)
        .next()
        .map(element_text)
        .filter(|label| !label.is_empty());

    Some(Article {
        title,
        link,
        image_url,
        published_label,
    })
}

/// Element text with whitespace runs collapsed and ends trimmed.
fn element_text(element: ElementRef) -> String {
    let text = element.text().collect::<String>();
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse(NAVER_NEWS_ORIGIN).unwrap()
    }

    const PAGE: &str = r#"
        <html><body>
        <div class="rankingnews _popularRanking">
          <div class="rankingnews_box">
            <a href="/press/001/ranking" class="rankingnews_box_head nclicks('RBP.rnkpname')">
              <span class="rankingnews_thumb"><img src="https://mimgnews.pstatic.net/001.png" alt=""></span>
              <strong class="rankingnews_name">연합뉴스</strong>
            </a>
            <ul class="rankingnews_list">
              <li>
                <em class="list_ranking_num">1</em>
                <div class="list_content">
                  <a href="https://n.news.naver.com/article/001/0001" class="list_title nclicks('RBP.rnknws')">
                    첫 번째   기사
                  </a>
                  <span class="list_time">1시간전</span>
                </div>
                <a href="https://n.news.naver.com/article/001/0001" class="list_img">
                  <img src="https://imgnews.pstatic.net/001/0001.jpg" width="70" height="70" alt="">
                </a>
              </li>
              <li>
                <em class="list_ranking_num">2</em>
                <div class="list_content">
                  <a href="/article/001/0002" class="list_title">두 번째 기사</a>
                </div>
              </li>
              <li><em class="list_ranking_num">3</em><div class="list_content"><span>no link</span></div></li>
              <li><a class="list_title">title without href</a></li>
            </ul>
          </div>
          <div class="rankingnews_box">
            <div class="rankingnews_box_head">not an anchor heading</div>
            <ul class="rankingnews_list"><li><a class="list_title" href="/x">orphan</a></li></ul>
          </div>
          <div class="rankingnews_box">
            <a href="/press/020/ranking" class="rankingnews_box_head"><span>missing name</span></a>
          </div>
          <div class="rankingnews_box">
            <a href="/press/025/ranking" class="rankingnews_box_head"><strong class="rankingnews_name">중앙일보</strong></a>
          </div>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_extracts_outlets_in_page_order_and_skips_nameless() {
        let outlets = extract_rankings(PAGE, &base()).unwrap();
        let names: Vec<_> = outlets.iter().map(|o| o.outlet_name.as_str()).collect();
        assert_eq!(names, vec!["연합뉴스", "중앙일보"]);
    }

    #[test]
    fn test_article_fields_and_skipped_rows() {
        let outlets = extract_rankings(PAGE, &base()).unwrap();
        let articles = &outlets[0].articles;
        assert_eq!(articles.len(), 2);

        assert_eq!(articles[0].title, "첫 번째 기사");
        assert_eq!(articles[0].link, "https://n.news.naver.com/article/001/0001");
        assert_eq!(
            articles[0].image_url.as_deref(),
            Some("https://imgnews.pstatic.net/001/0001.jpg")
        );
        assert_eq!(articles[0].published_label.as_deref(), Some("1시간전"));

        assert_eq!(articles[1].title, "두 번째 기사");
        assert_eq!(articles[1].link, "https://news.naver.com/article/001/0002");
        assert_eq!(articles[1].image_url, None);
        assert_eq!(articles[1].published_label, None);
    }

    #[test]
    fn test_outlet_without_list_has_no_articles() {
        let outlets = extract_rankings(PAGE, &base()).unwrap();
        assert!(outlets[1].articles.is_empty());
    }

    #[test]
    fn test_missing_container_is_structural_fault() {
        let html = r#"<html><body><div class="rankingnews_box"></div></body></html>"#;
        let err = extract_rankings(html, &base()).unwrap_err();
        assert!(matches!(err, ExtractError::MissingContainer { .. }));
    }

    #[test]
    fn test_empty_container_is_not_an_error() {
        let html = r#"<div class="_popularRanking"></div>"#;
        assert!(extract_rankings(html, &base()).unwrap().is_empty());
    }
}
