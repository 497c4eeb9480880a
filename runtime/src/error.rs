//! Error taxonomy for link discovery.
//!
//! Only a handful of these ever leave a crawl. Page-level failures
//! (`FetchFailed`, `ParseFailed`) are recovered inside the frontier
//! controller and surface as diagnostics; `RenderUnavailable` and the
//! request-shape errors end a single target, never a whole batch.

use serde::Serialize;

/// All errors produced by the discovery library.
#[derive(thiserror::Error, Debug)]
pub enum ScoutError {
    #[error("fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("rendering session unavailable: {0}")]
    RenderUnavailable(String),

    #[error("could not parse {source_kind}: {detail}")]
    ParseFailed { source_kind: String, detail: String },

    #[error("invalid seed URL {0:?}")]
    InvalidSeed(String),

    #[error("unknown site {0:?}")]
    UnknownSite(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScoutError {
    /// Stable machine-readable kind, used in JSON output.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoutError::FetchFailed { .. } => ErrorKind::FetchFailed,
            ScoutError::RenderUnavailable(_) => ErrorKind::RenderUnavailable,
            ScoutError::ParseFailed { .. } => ErrorKind::ParseFailed,
            ScoutError::InvalidSeed(_) => ErrorKind::InvalidSeed,
            ScoutError::UnknownSite(_) => ErrorKind::UnknownSite,
            ScoutError::Config(_) | ScoutError::Io(_) | ScoutError::Json(_) => ErrorKind::Config,
        }
    }
}

/// Serializable error kind carried on failed crawl results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FetchFailed,
    RenderUnavailable,
    ParseFailed,
    InvalidSeed,
    UnknownSite,
    Config,
}

/// Convenience alias for library results.
pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ScoutError::RenderUnavailable("no chromium".into()).kind(),
            ErrorKind::RenderUnavailable
        );
        assert_eq!(
            ScoutError::UnknownSite("amazon".into()).kind(),
            ErrorKind::UnknownSite
        );
        let json = serde_json::to_string(&ErrorKind::RenderUnavailable).unwrap();
        assert_eq!(json, "\"render_unavailable\"");
    }

    #[test]
    fn test_error_display() {
        let e = ScoutError::FetchFailed {
            url: "https://example.com".into(),
            reason: "HTTP 503".into(),
        };
        assert_eq!(e.to_string(), "fetch failed for https://example.com: HTTP 503");
    }
}
