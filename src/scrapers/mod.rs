//! Page scrapers that turn rendered markup into structured rankings.
//!
//! Scrapers only parse. Fetching the page lives in [`crate::fetch`] and
//! merging results into the store lives in [`crate::store`], so every
//! scraper can be tested offline against captured HTML.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Naver News 언론사별 랭킹 | [`ranking`] | HTML scraping | Per-outlet most-read lists |

pub mod ranking;
