//! Page acquisition: HTTP and rendered fetch strategies, and candidate
//! link extraction from the fetched markup.

pub mod fetcher;
pub mod http_client;
pub mod links;
