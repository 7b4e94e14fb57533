//! Offline data preparation: enrollment filtering and rating scraping.

pub mod filter;
pub mod scraper;
