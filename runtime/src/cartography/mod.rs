//! Cartography engine: scoring, classification and the bounded crawl that
//! finds a material's listing page on a site.

pub mod crawler;
pub mod material;
pub mod page_classifier;
pub mod rate_limiter;
pub mod scorer;
pub mod sites;
pub mod url_rules;
