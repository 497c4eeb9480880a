//! Candidate link extraction from a fetched page.
//!
//! Five sources are scanned, in this order: anchor hrefs, link-like
//! attributes, inline event handlers (`onclick`, `onmousedown` and the
//! rest of the configured list), label attributes and embedded scripts. A label (`title`, `aria-label`, `data-category`) names the
//! nearest ancestor anchor, so it supplies the text for icon-only links.
//! Script text is first walked as JSON; the plain URL regex only runs over
//! blocks where no JSON literal could be parsed.
//!
//! `scraper::Html` is `!Send`, so everything here is synchronous and the
//! document never crosses an `.await`.

use crate::cartography::scorer::collapse_whitespace;
use crate::cartography::url_rules::{self, UrlRules};
use crate::config::FilterRules;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Upper bound on JSON parse attempts inside one script block.
const MAX_JSON_ATTEMPTS: usize = 64;

/// Largest JSON literal we try to parse (bytes).
const MAX_JSON_LITERAL: usize = 256 * 1024;

/// Where a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Anchor,
    Attribute,
    EventHandler,
    Script,
}

/// A discovered outbound link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Absolute, fragment-free URL.
    pub url: String,
    /// Anchor text (or its label), empty for script literals.
    pub anchor_text: String,
    /// Text of the enclosing element, whitespace-collapsed and capped.
    pub context: String,
    pub source: CandidateSource,
    /// False when a domain hint was given and the host does not match it.
    pub on_domain: bool,
    /// First-seen position within the page; the deterministic tie-break.
    pub seq: usize,
}

/// Everything extracted from one page.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// De-duplicated, non-static candidates in first-seen order.
    pub candidates: Vec<Candidate>,
    /// Bare absolute URLs found anywhere in the raw source, for the
    /// last-resort fallback. Already filtered for static assets.
    pub raw_urls: Vec<String>,
    /// Script blocks whose embedded JSON could not be parsed.
    pub parse_failures: usize,
    /// Candidates discarded as static assets.
    pub static_dropped: usize,
}

/// Compiled extractor, built once per crawl and reused for every page.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    rules: UrlRules,
    max_context_chars: usize,
    anchor_sel: Selector,
    script_sel: Selector,
    attr_sels: Vec<(String, Selector)>,
    handler_sels: Vec<(String, Selector)>,
    label_sels: Vec<(String, Selector)>,
    handler_nav: Regex,
    quoted_url: Regex,
    bare_url: Regex,
}

impl LinkExtractor {
    pub fn new(filters: &FilterRules, rules: &UrlRules) -> Self {
        Self {
            rules: rules.clone(),
            max_context_chars: filters.max_context_chars,
            anchor_sel: Selector::parse("a[href], area[href]").expect("valid selector"),
            script_sel: Selector::parse("script").expect("valid selector"),
            attr_sels: attribute_selectors(&filters.link_attributes),
            handler_sels: attribute_selectors(&filters.handler_attributes),
            label_sels: attribute_selectors(&filters.label_attributes),
            handler_nav: Regex::new(
                r#"(?:location\.href|window\.location(?:\.href)?|window\.open)\s*(?:=|\()\s*['"]([^'"]+)['"]"#,
            )
            .expect("valid regex"),
            quoted_url: Regex::new(r#"['"](https?:(?://|\\/\\/)[^'"\s]+)['"]"#).expect("valid regex"),
            bare_url: Regex::new(r#"https?://[A-Za-z0-9\-._~/?=&%+:@!,;]+"#).expect("valid regex"),
        }
    }

    /// Parse `html` and extract candidates.
    pub fn extract_html(&self, html: &str, page_url: &Url, domain_hint: Option<&str>) -> Extraction {
        let document = Html::parse_document(html);
        self.extract(&document, html, page_url, domain_hint)
    }

    /// Extract from an already parsed document. `raw` is the source it was
    /// parsed from, used for the bare-URL scan.
    pub fn extract(
        &self,
        document: &Html,
        raw: &str,
        page_url: &Url,
        domain_hint: Option<&str>,
    ) -> Extraction {
        let mut sink = Sink::new(&self.rules, domain_hint);

        // 1. anchors
        for el in document.select(&self.anchor_sel) {
            let href = el.value().attr("href").unwrap_or_default();
            if let Some(url) = url_rules::resolve(page_url, href) {
                let text = element_text(&el);
                let context = self.context_of(&el);
                sink.push(url, text, context, CandidateSource::Anchor);
            }
        }

        // 2. link-like attributes
        for (attr, sel) in &self.attr_sels {
            for el in document.select(sel) {
                let raw_value = el.value().attr(attr).unwrap_or_default();
                if !looks_like_link(raw_value) {
                    continue;
                }
                if let Some(url) = url_rules::resolve(page_url, raw_value) {
                    sink.push(url, element_text(&el), self.context_of(&el), CandidateSource::Attribute);
                }
            }
        }

        // 3. inline event handlers
        for (attr, sel) in &self.handler_sels {
            for el in document.select(sel) {
                let handler = el.value().attr(attr).unwrap_or_default();
                let Some(target) = self.handler_target(handler) else {
                    continue;
                };
                if let Some(url) = url_rules::resolve(page_url, &target) {
                    sink.push(url, element_text(&el), self.context_of(&el), CandidateSource::EventHandler);
                }
            }
        }

        // 4. label attributes name the nearest ancestor anchor
        for (attr, sel) in &self.label_sels {
            for el in document.select(sel) {
                let label = el.value().attr(attr).unwrap_or_default().trim();
                if label.is_empty() {
                    continue;
                }
                let Some(anchor) = nearest_anchor(&el) else {
                    continue;
                };
                let href = anchor.value().attr("href").unwrap_or_default();
                if let Some(url) = url_rules::resolve(page_url, href) {
                    sink.label(url.as_str(), collapse_whitespace(label));
                }
            }
        }

        // 5. scripts
        let mut parse_failures = 0;
        for el in document.select(&self.script_sel) {
            let text: String = el.text().collect();
            if text.trim().is_empty() {
                continue;
            }
            let scan = scan_script_json(&text);
            if scan.failed {
                parse_failures += 1;
            }
            let found = if scan.parsed_any {
                scan.urls
            } else {
                self.regex_urls(&text)
            };
            for raw_url in found {
                if let Some(url) = url_rules::resolve(page_url, &raw_url) {
                    sink.push(url, String::new(), String::new(), CandidateSource::Script);
                }
            }
        }
        if parse_failures > 0 {
            tracing::debug!(
                "{} script block(s) on {} had no parseable JSON, fell back to URL scan",
                parse_failures,
                page_url
            );
        }

        let raw_urls = self.raw_source_urls(raw);
        Extraction {
            candidates: sink.candidates,
            raw_urls,
            parse_failures,
            static_dropped: sink.static_dropped,
        }
    }

    fn handler_target(&self, handler: &str) -> Option<String> {
        let caps = self
            .handler_nav
            .captures(handler)
            .or_else(|| self.quoted_url.captures(handler))?;
        Some(unescape_slashes(caps.get(1)?.as_str()))
    }

    fn regex_urls(&self, text: &str) -> Vec<String> {
        self.bare_url
            .find_iter(&unescape_slashes(text))
            .map(|m| trim_url_tail(m.as_str()).to_string())
            .collect()
    }

    /// Every bare absolute URL in the raw page source, de-duplicated and
    /// stripped of static assets.
    fn raw_source_urls(&self, raw: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for m in self.bare_url.find_iter(raw) {
            let candidate = trim_url_tail(m.as_str()).replace("&amp;", "&");
            let Some(url) = url_rules::normalize_url(&candidate) else {
                continue;
            };
            if self.rules.is_static(&url) {
                continue;
            }
            if seen.insert(url.clone()) {
                out.push(url);
            }
        }
        out
    }

    fn context_of(&self, el: &ElementRef<'_>) -> String {
        let container = el.parent().and_then(ElementRef::wrap).unwrap_or(*el);
        truncate_chars(&element_text(&container), self.max_context_chars)
    }
}

/// Convenience wrapper that builds an extractor for a single page.
pub fn extract_candidates(
    html: &str,
    page_url: &Url,
    domain_hint: Option<&str>,
    filters: &FilterRules,
    rules: &UrlRules,
) -> Extraction {
    LinkExtractor::new(filters, rules).extract_html(html, page_url, domain_hint)
}

/// Accumulates candidates with first-seen de-duplication.
struct Sink<'r> {
    rules: &'r UrlRules,
    domain_hint: Option<&'r str>,
    seen: HashMap<String, Option<usize>>,
    candidates: Vec<Candidate>,
    static_dropped: usize,
}

impl<'r> Sink<'r> {
    fn new(rules: &'r UrlRules, domain_hint: Option<&'r str>) -> Self {
        Self {
            rules,
            domain_hint,
            seen: HashMap::new(),
            candidates: Vec::new(),
            static_dropped: 0,
        }
    }

    fn push(&mut self, url: Url, anchor_text: String, context: String, source: CandidateSource) {
        let url = url.to_string();
        if self.seen.contains_key(&url) {
            return;
        }
        if self.rules.is_static(&url) {
            self.static_dropped += 1;
            self.seen.insert(url, None);
            return;
        }
        let on_domain = self
            .domain_hint
            .map(|d| url_rules::on_domain(&url, d))
            .unwrap_or(true);
        let seq = self.candidates.len();
        self.seen.insert(url.clone(), Some(seq));
        self.candidates.push(Candidate {
            url,
            anchor_text,
            context,
            source,
            on_domain,
            seq,
        });
    }

    /// Give a text-less candidate its label. Labelled text never replaces
    /// real anchor text.
    fn label(&mut self, url: &str, label: String) {
        if let Some(Some(idx)) = self.seen.get(url) {
            let candidate = &mut self.candidates[*idx];
            if candidate.anchor_text.is_empty() {
                candidate.anchor_text = label;
            }
        }
    }
}

fn attribute_selectors(attrs: &[String]) -> Vec<(String, Selector)> {
    attrs
        .iter()
        .filter_map(|a| {
            Selector::parse(&format!("[{a}]"))
                .ok()
                .map(|sel| (a.clone(), sel))
        })
        .collect()
}

/// Attribute values such as `data-target="#modal"` or `".collapse"` are
/// widget references, not destinations.
fn looks_like_link(value: &str) -> bool {
    let v = value.trim();
    v.starts_with("http://") || v.starts_with("https://") || v.starts_with('/')
}

fn nearest_anchor<'d>(el: &ElementRef<'d>) -> Option<ElementRef<'d>> {
    if el.value().name() == "a" && el.value().attr("href").is_some() {
        return Some(*el);
    }
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "a" && a.value().attr("href").is_some())
}

fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn unescape_slashes(s: &str) -> String {
    s.replace("\\/", "/")
}

fn trim_url_tail(s: &str) -> &str {
    s.trim_end_matches(['.', ',', ';', ':', '!'])
}

/// Outcome of walking one script block for JSON literals.
#[derive(Debug, Default)]
struct ScriptScan {
    urls: Vec<String>,
    parsed_any: bool,
    failed: bool,
}

/// Find JSON object literals in script text and collect URL-valued strings.
///
/// Only `{` followed by a quoted key is tried, which skips function bodies
/// and most JS object literals without paying for a parse attempt.
fn scan_script_json(text: &str) -> ScriptScan {
    let mut scan = ScriptScan::default();
    let bytes = text.as_bytes();
    let mut attempts = 0;
    let mut pos = 0;

    while pos < bytes.len() && attempts < MAX_JSON_ATTEMPTS {
        let Some(offset) = text[pos..].find('{') else {
            break;
        };
        let start = pos + offset;
        if !opens_json_object(&text[start + 1..]) {
            pos = start + 1;
            continue;
        }
        attempts += 1;
        match matching_brace(&text[start..]) {
            Some(len) if len <= MAX_JSON_LITERAL => {
                let literal = &text[start..start + len];
                match serde_json::from_str::<Value>(literal) {
                    Ok(value) => {
                        scan.parsed_any = true;
                        collect_json_urls(&value, &mut scan.urls);
                        pos = start + len;
                    }
                    Err(_) => {
                        scan.failed = true;
                        pos = start + 1;
                    }
                }
            }
            _ => {
                scan.failed = true;
                pos = start + 1;
            }
        }
    }
    if scan.parsed_any {
        scan.failed = false;
    }
    scan
}

fn opens_json_object(rest: &str) -> bool {
    matches!(rest.trim_start().chars().next(), Some('"') | Some('}'))
}

/// Byte length of the balanced `{...}` starting at `s[0]`, honouring
/// double-quoted strings and escapes.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        if i > MAX_JSON_LITERAL {
            return None;
        }
    }
    None
}

fn collect_json_urls(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.starts_with("http://") || s.starts_with("https://") {
                out.push(s.to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_json_urls(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_json_urls(v, out)),
        _ => {}
    }
}
