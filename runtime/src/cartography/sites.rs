//! Site registry: which commerce sites we know how to search.

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};

/// Placeholder replaced by the encoded query in search templates.
pub const QUERY_PLACEHOLDER: &str = "{q}";

/// A searchable third-party commerce site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Short identifier used on the command line (e.g. "buildersmart").
    pub id: String,
    /// Registrable domain used as the domain hint (e.g. "buildersmart.in").
    pub domain: String,
    /// Search URL templates containing `{q}`. Each seeds the frontier.
    pub search_templates: Vec<String>,
}

impl SiteProfile {
    pub fn new(id: &str, domain: &str, templates: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            domain: domain.to_string(),
            search_templates: templates.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Construct the search URLs for a query string.
    pub fn search_urls(&self, query: &str) -> Vec<String> {
        let encoded = encode_query(query);
        self.search_templates
            .iter()
            .map(|t| t.replace(QUERY_PLACEHOLDER, &encoded))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() || self.domain.trim().is_empty() {
            return Err(ScoutError::Config("site id and domain must be set".into()));
        }
        if self.search_templates.is_empty() {
            return Err(ScoutError::Config(format!(
                "site {:?} has no search templates",
                self.id
            )));
        }
        for template in &self.search_templates {
            if !template.contains(QUERY_PLACEHOLDER) {
                return Err(ScoutError::Config(format!(
                    "search template {template:?} is missing {QUERY_PLACEHOLDER}"
                )));
            }
            let sample = template.replace(QUERY_PLACEHOLDER, "cement");
            let parsed = url::Url::parse(&sample)
                .map_err(|e| ScoutError::Config(format!("bad search template {template:?}: {e}")))?;
            let host = parsed.host_str().unwrap_or("");
            if !super::url_rules::host_matches(host, &self.domain) {
                return Err(ScoutError::Config(format!(
                    "search template {template:?} is not on domain {}",
                    self.domain
                )));
            }
        }
        Ok(())
    }
}

/// Form-encode a query: spaces become `+`, reserved characters are escaped.
pub fn encode_query(query: &str) -> String {
    url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect()
}

/// Sites available without any configuration.
pub fn builtin_sites() -> Vec<SiteProfile> {
    vec![
        SiteProfile::new(
            "buildersmart",
            "buildersmart.in",
            &[
                "https://www.buildersmart.in/catalogsearch/result?q={q}",
                "https://www.buildersmart.in/search?q={q}",
            ],
        ),
        SiteProfile::new(
            "indiamart",
            "indiamart.com",
            &["https://dir.indiamart.com/search.mp?ss={q}"],
        ),
    ]
}
