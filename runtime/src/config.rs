//! Configuration loading and resolution.
//!
//! Every tunable used by the crawler lives here: scoring weights, the
//! URL/DOM heuristics, fetch timeouts, politeness limits and the site
//! registry. All sections default sensibly, so a config file only needs
//! the keys it wants to change.

use crate::cartography::sites::{self, SiteProfile};
use crate::cartography::url_rules::UrlRules;
use crate::error::{Result, ScoutError};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LINKSCOUT_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub weights: ScoringWeights,
    pub filters: FilterRules,
    pub fetch: FetchConfig,
    pub politeness: PolitenessConfig,
    pub sites: Vec<SiteProfile>,
    /// Ordered `(alias, retail term)` pairs applied to search queries when
    /// `normalize_query` is on.
    pub search_aliases: Vec<(String, String)>,
    pub normalize_query: bool,
    /// Scan raw page source for bare URLs when nothing else qualified.
    pub raw_source_fallback: bool,
    /// Expand outbound links of pages classified as product detail.
    pub follow_detail_pages: bool,
    /// Enqueue links whose URL alone looks like a product detail page.
    pub enqueue_detail_links: bool,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            filters: FilterRules::default(),
            fetch: FetchConfig::default(),
            politeness: PolitenessConfig::default(),
            sites: sites::builtin_sites(),
            search_aliases: default_search_aliases(),
            normalize_query: false,
            raw_source_fallback: true,
            follow_detail_pages: true,
            enqueue_detail_links: false,
        }
    }
}

/// Additive relevance weights and classification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Per material token found anywhere in the combined text.
    pub token: i64,
    /// Full token phrase found verbatim.
    pub phrase: i64,
    /// Per material token found in the URL path.
    pub path_token: i64,
    /// Per category keyword found in URL, path or anchor text.
    pub category: i64,
    /// Multiplier applied to the product-card count of a visited page.
    pub card_multiplier: i64,
    /// Card count at which a page is conclusively a listing.
    pub listing_threshold: usize,
    /// Candidates below this score are recorded but never visited.
    pub min_visit_score: i64,
    /// Candidates below this score are never returned as results.
    pub min_result_score: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            token: 2,
            phrase: 5,
            path_token: 3,
            category: 4,
            card_multiplier: 5,
            listing_threshold: 3,
            min_visit_score: 3,
            min_result_score: 1,
        }
    }
}

/// URL and DOM heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    /// File suffixes (matched against the end of the URL path).
    pub static_suffixes: Vec<String>,
    /// Fragments matched anywhere in the lower-cased URL.
    pub static_fragments: Vec<String>,
    pub category_keywords: Vec<String>,
    /// Path fragments that mark a single-product view.
    pub detail_fragments: Vec<String>,
    /// Regex over the URL path for SKU-looking trailers.
    pub sku_pattern: String,
    /// CSS selectors whose matches count as product cards.
    pub card_selectors: Vec<String>,
    /// Attributes that hold a destination URL directly.
    pub link_attributes: Vec<String>,
    /// Inline event-handler attributes scanned for navigation calls.
    pub handler_attributes: Vec<String>,
    /// Attributes that hold a category label; the nearest ancestor anchor
    /// supplies the URL.
    pub label_attributes: Vec<String>,
    /// Upper bound on the container text kept as candidate context.
    pub max_context_chars: usize,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            static_suffixes: strings(&[
                ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".webp", ".bmp", ".tif",
                ".tiff", ".css", ".woff", ".woff2", ".ttf", ".eot", ".otf", ".js", ".map",
                ".mp4", ".pdf",
            ]),
            static_fragments: strings(&[
                "fontawesome",
                "cdn-media",
                "/static/",
                "/assets/",
                "/media/",
                "/cdn-cgi/",
            ]),
            category_keywords: strings(&[
                "catalogsearch",
                "catalog",
                "category",
                "products",
                "buy",
                "shop",
                "list",
                "tmt-steel",
                "cement",
                "bricks",
                "plumbing",
                "electrical",
                "bricks-blocks",
                "bricks-and-blocks",
                "bricks-blocks-price",
            ]),
            detail_fragments: strings(&[
                "/prodetail/",
                "/product-detail",
                "/productdetail",
                "/proddetail/",
                "/product/",
                "/dp/",
                "/pd/",
                "/p/",
                "/item/",
                "/sku/",
            ]),
            sku_pattern: r"[-_/]\d{4,}(\.html?)?/?$".to_string(),
            card_selectors: strings(&[
                r#"[class*="product"]"#,
                r#"[class*="product-item"]"#,
                r#"[class*="product-list"]"#,
                r#"[class*="search-result"]"#,
                r#"[class*="listing"]"#,
                r#"ul[class*="products"] > li"#,
                r#"div[class*="prod"]"#,
            ]),
            link_attributes: strings(&[
                "data-href",
                "data-url",
                "data-link",
                "data-target",
                "data-redirect",
            ]),
            handler_attributes: strings(&[
                "onclick",
                "onmousedown",
                "onmouseup",
                "ondblclick",
                "onchange",
                "ontouchstart",
                "onkeydown",
            ]),
            label_attributes: strings(&["data-category", "data-cat", "title", "aria-label"]),
            max_context_chars: 1000,
        }
    }
}

/// Fetch timeouts and client identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    /// How long a rendered fetch waits for `document.body`.
    pub ready_timeout_ms: u64,
    /// Pause after readiness so script-populated listings can settle.
    pub settle_ms: u64,
    pub max_retries: u32,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 8_000,
            ready_timeout_ms: 5_000,
            settle_ms: 500,
            max_retries: 1,
            user_agent: concat!(
                "Mozilla/5.0 (compatible; linkscout/",
                env!("CARGO_PKG_VERSION"),
                "; material listing discovery)"
            )
            .to_string(),
            accept_language: "en-IN,en;q=0.9".to_string(),
        }
    }
}

/// Limits toward third-party servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolitenessConfig {
    /// Targets crawled at once.
    pub concurrency: usize,
    /// Minimum spacing between requests to the same host.
    pub min_delay_ms: u64,
    /// Random extra delay added on top of `min_delay_ms`.
    pub jitter_ms: u64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            min_delay_ms: 750,
            jitter_ms: 250,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_search_aliases() -> Vec<(String, String)> {
    [
        ("stainless steel bars", "stainless steel rod"),
        ("stainless steel rods", "stainless steel rod"),
        ("mild steel", "ms steel"),
        ("tmt", "tmt bar"),
        ("steel structures", "structural steel"),
        ("angles", "steel angle"),
        ("channels", "steel channel"),
        ("sections", "steel section"),
        ("flat products", "steel flat"),
        ("long products", "steel rod"),
    ]
    .iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect()
}

impl ScoutConfig {
    /// Load configuration from the resolved path, or defaults when none exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: ScoutConfig = serde_json::from_str(&data)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Check every selector, regex and limit up front.
    pub fn validate(&self) -> Result<()> {
        for sel in &self.filters.card_selectors {
            Selector::parse(sel)
                .map_err(|e| ScoutError::Config(format!("bad card selector {sel:?}: {e}")))?;
        }
        UrlRules::from_filters(&self.filters)?;

        if self.weights.listing_threshold == 0 {
            return Err(ScoutError::Config(
                "weights.listing_threshold must be at least 1".into(),
            ));
        }
        if self.politeness.concurrency == 0 {
            return Err(ScoutError::Config(
                "politeness.concurrency must be at least 1".into(),
            ));
        }
        if self.fetch.timeout_ms == 0 {
            return Err(ScoutError::Config("fetch.timeout_ms must be positive".into()));
        }
        for site in &self.sites {
            site.validate()?;
        }
        Ok(())
    }

    /// Look up a site profile by id (case-insensitive).
    pub fn site(&self, id: &str) -> Option<&SiteProfile> {
        self.sites.iter().find(|s| s.id.eq_ignore_ascii_case(id))
    }

    /// Apply the retail alias table to a material name.
    ///
    /// Returns the material unchanged when normalisation is off or no
    /// alias matches.
    pub fn search_term(&self, material: &str) -> String {
        if !self.normalize_query {
            return material.trim().to_string();
        }
        let lower = material.to_lowercase();
        for (alias, term) in &self.search_aliases {
            if lower.contains(alias.as_str()) {
                return term.clone();
            }
        }
        material.trim().to_string()
    }
}

/// Resolve the config path: explicit flag, then `LINKSCOUT_CONFIG`, then
/// `./linkscout.json`, then the user config directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from("linkscout.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    let user_config = dirs::config_dir()?.join("linkscout").join("config.json");
    user_config.exists().then_some(user_config)
}
