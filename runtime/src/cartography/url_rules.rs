//! URL hygiene and pattern rules: resolution, static-asset and domain
//! filters, category keywords and product-detail shapes.

use crate::config::FilterRules;
use crate::error::{Result, ScoutError};
use regex::Regex;
use url::{Host, Url};

/// Schemes that can never lead to a page.
const PSEUDO_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "about:", "blob:", "sms:"];

/// Compiled URL heuristics shared by the extractor, scorer and classifier.
#[derive(Debug, Clone)]
pub struct UrlRules {
    static_suffixes: Vec<String>,
    static_fragments: Vec<String>,
    category_keywords: Vec<String>,
    detail_fragments: Vec<String>,
    sku: Regex,
}

impl UrlRules {
    pub fn from_filters(filters: &FilterRules) -> Result<Self> {
        let sku = Regex::new(&filters.sku_pattern).map_err(|e| {
            ScoutError::Config(format!("bad sku pattern {:?}: {e}", filters.sku_pattern))
        })?;
        Ok(Self {
            static_suffixes: lowered(&filters.static_suffixes),
            static_fragments: lowered(&filters.static_fragments),
            category_keywords: lowered(&filters.category_keywords),
            detail_fragments: lowered(&filters.detail_fragments),
            sku,
        })
    }

    /// True for images, fonts, stylesheets and anything under a
    /// CDN/media/static directory. These are never listing pages.
    pub fn is_static(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        if self.static_fragments.iter().any(|f| lower.contains(f.as_str())) {
            return true;
        }
        let path = path_of(&lower);
        self.static_suffixes.iter().any(|s| path.ends_with(s.as_str()))
    }

    /// Category keywords present in the URL or the anchor text.
    ///
    /// Each keyword counts once, wherever it appears.
    pub fn category_hits(&self, url: &str, anchor_text: &str) -> Vec<&str> {
        let url_lower = url.to_lowercase();
        let text_lower = anchor_text.to_lowercase();
        self.category_keywords
            .iter()
            .filter(|k| url_lower.contains(k.as_str()) || text_lower.contains(k.as_str()))
            .map(|k| k.as_str())
            .collect()
    }

    /// URL shape of a single-product view (detail segment or SKU trailer).
    pub fn looks_like_detail(&self, url: &str) -> bool {
        let path = path_of(url).to_lowercase();
        self.detail_fragments.iter().any(|f| path.contains(f.as_str())) || self.sku.is_match(&path)
    }

    /// Detail-shaped URL with no category keyword to redeem it.
    pub fn is_detail_url(&self, url: &str) -> bool {
        self.looks_like_detail(url) && self.category_hits(url, "").is_empty()
    }
}

fn lowered(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

/// Resolve a raw attribute value against the page URL.
///
/// Returns `None` for empty values, fragment-only references, pseudo
/// schemes and anything that does not resolve to http(s). The fragment
/// is stripped from the result.
pub fn resolve(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    let lower = raw.to_lowercase();
    if PSEUDO_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        return None;
    }
    let mut url = base.join(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Canonical string form used for the visited set and de-duplication.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// Whether `host` is `domain` or one of its subdomains.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Whether an absolute URL lives on the domain hint.
pub fn on_domain(url: &str, domain: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| host_matches(h, domain)))
        .unwrap_or(false)
}

/// Second-level labels that registries sell names under, as in
/// `example.co.in` or `example.com.au`.
const SHARED_SECOND_LEVEL: &[&str] = &["co", "com", "net", "org", "gov", "edu", "ac", "firm", "gen", "ind"];

/// Domain hint for a seed URL: the registrable domain of its host, so
/// `www.`, `m.` and `dir.` siblings share one hint. IP hosts stay whole.
pub fn domain_hint_for(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    match url.host()? {
        Host::Domain(_) => Some(registrable_domain(&host)),
        Host::Ipv4(_) | Host::Ipv6(_) => Some(host),
    }
}

/// Last two labels of `host`, or three under a country-code shared
/// second level.
fn registrable_domain(host: &str) -> String {
    let labels: Vec<&str> = host.trim_end_matches('.').split('.').collect();
    let n = labels.len();
    if n <= 2 {
        return labels.join(".");
    }
    let shared = labels[n - 1].len() == 2 && SHARED_SECOND_LEVEL.contains(&labels[n - 2]);
    let keep = if shared { 3 } else { 2 };
    labels[n - keep..].join(".")
}

/// Path component of a URL string without parsing it fully.
pub fn path_of(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("HTTPS://"))
        .or_else(|| url.strip_prefix("HTTP://"));
    let path = match rest {
        Some(rest) => match rest.find('/') {
            Some(pos) => &rest[pos..],
            None => "/",
        },
        None => url,
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}
