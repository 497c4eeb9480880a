//! End-to-end crawl scenarios against an in-memory web.

use async_trait::async_trait;
use linkscout::acquisition::fetcher::{FetchBackend, PageFetch, PageFetcher};
use linkscout::cartography::crawler::{CancelToken, CrawlOutcome, EmptyReason, StopReason};
use linkscout::cartography::page_classifier::PageClass;
use linkscout::cartography::sites::SiteProfile;
use linkscout::config::ScoutConfig;
use linkscout::discovery::{self, DiscoverOptions, DiscoveryContext};
use linkscout::error::{ErrorKind, Result, ScoutError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
enum Reply {
    Html(String),
    /// Answers after a real delay.
    Slow(u64, String),
    Timeout,
    /// Lands on another URL with the given body.
    Redirect(&'static str, &'static str),
}

#[derive(Default)]
struct MockWeb {
    pages: HashMap<String, Reply>,
    fetched: Mutex<Vec<String>>,
    session_attempts: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    /// Session attempts (0-based) that fail as if the browser would not start.
    failing_sessions: Vec<usize>,
    /// Cancel this token once this many pages have been fetched.
    cancel_after: Option<(usize, CancelToken)>,
}

impl MockWeb {
    fn new(pages: &[(&str, Reply)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(u, r)| (u.to_string(), r.clone()))
                .collect(),
            ..Self::default()
        }
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

struct MockBackend(Arc<MockWeb>);

#[async_trait]
impl FetchBackend for MockBackend {
    async fn open_session(&self) -> Result<Box<dyn PageFetcher>> {
        let attempt = self.0.session_attempts.fetch_add(1, Ordering::SeqCst);
        if self.0.failing_sessions.contains(&attempt) {
            return Err(ScoutError::RenderUnavailable(
                "browser exited during startup".into(),
            ));
        }
        self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockFetcher(Arc::clone(&self.0))))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

struct MockFetcher(Arc<MockWeb>);

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&mut self, url: &str) -> PageFetch {
        let count = {
            let mut fetched = self.0.fetched.lock().unwrap();
            fetched.push(url.to_string());
            fetched.len()
        };
        let page = match self.0.pages.get(url) {
            Some(Reply::Html(html)) => PageFetch::ok(url, url.to_string(), html.clone(), Some(200)),
            Some(Reply::Slow(ms, html)) => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                PageFetch::ok(url, url.to_string(), html.clone(), Some(200))
            }
            Some(Reply::Timeout) => PageFetch::timeout(url),
            Some(Reply::Redirect(to, body)) => PageFetch::ok(url, to.to_string(), body.to_string(), Some(200)),
            None => PageFetch::failed(url, "HTTP 404", Some(404)),
        };
        if let Some((after, token)) = &self.0.cancel_after {
            if count >= *after {
                token.cancel();
            }
        }
        page
    }

    async fn close(self: Box<Self>) {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn html(s: &str) -> Reply {
    Reply::Html(s.to_string())
}

fn config() -> ScoutConfig {
    ScoutConfig {
        sites: vec![SiteProfile::new(
            "acme",
            "acme-build.in",
            &["https://www.acme-build.in/search?q={q}"],
        )],
        ..ScoutConfig::default()
    }
}

fn context(web: &Arc<MockWeb>) -> DiscoveryContext {
    context_with(web, config())
}

fn context_with(web: &Arc<MockWeb>, config: ScoutConfig) -> DiscoveryContext {
    DiscoveryContext::new(Arc::new(config), Arc::new(MockBackend(Arc::clone(web))))
}

fn sequential() -> DiscoverOptions {
    DiscoverOptions {
        concurrency: Some(1),
        ..DiscoverOptions::default()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const OPC_SEARCH: &str = "https://www.acme-build.in/search?q=Ordinary+Portland+cement";
const PPC_PAGE: &str = "https://www.acme-build.in/buy-cement-online/ppc";

fn product_cards(n: usize) -> String {
    let cards: String = (0..n)
        .map(|i| format!(r#"<div class="product-card"><a href="/prodetail/item-{i}">Item {i}</a></div>"#))
        .collect();
    format!("<html><body><h1>Results</h1>{cards}</body></html>")
}

#[tokio::test]
async fn scenario_a_relevant_link_wins_on_exhaustion() {
    let web = Arc::new(MockWeb::new(&[
        (
            OPC_SEARCH,
            html(r#"<html><body><nav><a href="/buy-cement-online/ppc">PPC Cement</a></nav></body></html>"#),
        ),
        (PPC_PAGE, html("<html><body><p>50 kg bags, delivered</p></body></html>")),
    ]));
    let ctx = context(&web);

    let report = discovery::discover_links(
        &strings(&["Ordinary Portland cement"]),
        &strings(&["acme"]),
        &sequential(),
        &ctx,
    )
    .await;
    let result = &report["Ordinary Portland cement"]["acme"];

    assert_eq!(result.outcome, CrawlOutcome::Exhausted);
    assert_eq!(result.best_url.as_deref(), Some(PPC_PAGE));
    let best = result.best.as_ref().unwrap();
    assert_eq!(best.class, PageClass::Unclassified);
    assert_eq!(best.breakdown.token, 2);
    assert_eq!(best.breakdown.path, 3);
    assert_eq!(best.breakdown.category, 8);
    assert_eq!(best.breakdown.structural, 0);
    assert_eq!(best.score, 13);
    assert!(!best.fallback);
}

#[tokio::test]
async fn scenario_a_without_verification_fetches_only_the_search_page() {
    let web = Arc::new(MockWeb::new(&[(
        OPC_SEARCH,
        html(r#"<a href="/buy-cement-online/ppc">PPC Cement</a>"#),
    )]));
    let ctx = context(&web);
    let options = DiscoverOptions {
        verify_by_visiting: false,
        ..sequential()
    };

    let report = discovery::discover_links(
        &strings(&["Ordinary Portland cement"]),
        &strings(&["acme"]),
        &options,
        &ctx,
    )
    .await;

    assert_eq!(web.fetched(), vec![OPC_SEARCH.to_string()]);
    assert_eq!(
        report["Ordinary Portland cement"]["acme"].best_url.as_deref(),
        Some(PPC_PAGE)
    );
}

#[tokio::test]
async fn scenario_b_card_rich_page_is_a_listing_immediately() {
    let search = "https://www.acme-build.in/search?q=White+cement";
    let mut page = product_cards(5);
    page.push_str(r#"<a href="/white-cement/more">More white cement</a>"#);
    let web = Arc::new(MockWeb::new(&[(search, Reply::Html(page))]));
    let ctx = context(&web);

    let report = discovery::discover_links(
        &strings(&["White cement"]),
        &strings(&["acme"]),
        &sequential(),
        &ctx,
    )
    .await;
    let result = &report["White cement"]["acme"];

    assert_eq!(result.outcome, CrawlOutcome::Succeeded);
    assert_eq!(result.best_url.as_deref(), Some(search));
    let best = result.best.as_ref().unwrap();
    assert_eq!(best.class, PageClass::Listing);
    assert_eq!(best.card_count, Some(5));
    // no fetches after the listing
    assert_eq!(web.fetched().len(), 1);
}

#[tokio::test]
async fn scenario_c_detail_seed_is_never_a_result() {
    let seed = "https://www.acme-build.in/prodetail/ultratech-opc-53-grade";
    let web = Arc::new(MockWeb::new(&[(
        seed,
        html(r#"<h1>UltraTech OPC 53 Grade</h1><p>Ultratech opc grade, per bag</p>"#),
    )]));
    let ctx = context(&web);

    let report = discovery::discover_from_seeds(&strings(&[seed]), &sequential(), &ctx).await;
    assert!(report[seed].is_empty());

    let results = discovery::discover_seed_results(&strings(&[seed]), &sequential(), &ctx).await;
    let result = &results[seed];
    assert_eq!(result.outcome, CrawlOutcome::Exhausted);
    assert!(result.best_url.is_none());
    assert_eq!(result.empty_reason, Some(EmptyReason::NoRelevantCandidate));
}

#[tokio::test]
async fn scenario_d_timeout_on_the_only_page() {
    let web = Arc::new(MockWeb::new(&[(OPC_SEARCH, Reply::Timeout)]));
    let ctx = context(&web);

    let report = discovery::discover_links(
        &strings(&["Ordinary Portland cement"]),
        &strings(&["acme"]),
        &sequential(),
        &ctx,
    )
    .await;
    let result = &report["Ordinary Portland cement"]["acme"];

    assert_eq!(result.outcome, CrawlOutcome::Exhausted);
    assert!(result.best_url.is_none());
    assert_eq!(result.empty_reason, Some(EmptyReason::NoPagesFetched));
    assert!(result.reason.as_deref().unwrap().contains("no pages"));
    assert_eq!(result.stats.fetch_failures, 1);
}

#[tokio::test]
async fn scenario_e_session_failure_is_isolated() {
    let white = "https://www.acme-build.in/search?q=White+cement";
    let web = Arc::new(MockWeb {
        // the second target's session cannot start
        failing_sessions: vec![1],
        ..MockWeb::new(&[(white, Reply::Html(product_cards(4)))])
    });
    let ctx = context(&web);

    let report = discovery::discover_links(
        &strings(&["White cement", "slag cement"]),
        &strings(&["acme"]),
        &sequential(),
        &ctx,
    )
    .await;

    let ok = &report["White cement"]["acme"];
    assert_eq!(ok.outcome, CrawlOutcome::Succeeded);
    assert_eq!(ok.best_url.as_deref(), Some(white));

    let failed = &report["slag cement"]["acme"];
    assert_eq!(failed.outcome, CrawlOutcome::Failed);
    assert!(failed.best_url.is_none());
    assert_eq!(failed.error.as_ref().unwrap().kind, ErrorKind::RenderUnavailable);
    assert!(failed.reason.as_deref().unwrap().contains("browser exited"));
}

#[tokio::test]
async fn unknown_site_fails_only_its_target() {
    let white = "https://www.acme-build.in/search?q=White+cement";
    let web = Arc::new(MockWeb::new(&[(white, Reply::Html(product_cards(3)))]));
    let ctx = context(&web);

    let report = discovery::discover_links(
        &strings(&["White cement"]),
        &strings(&["acme", "nowhere"]),
        &DiscoverOptions::default(),
        &ctx,
    )
    .await;

    assert_eq!(report["White cement"]["acme"].outcome, CrawlOutcome::Succeeded);
    let unknown = &report["White cement"]["nowhere"];
    assert_eq!(unknown.outcome, CrawlOutcome::Failed);
    assert_eq!(unknown.error.as_ref().unwrap().kind, ErrorKind::UnknownSite);
}

#[tokio::test]
async fn invalid_seed_is_reported_not_crawled() {
    let web = Arc::new(MockWeb::new(&[]));
    let ctx = context(&web);
    let results =
        discovery::discover_seed_results(&strings(&["mailto:sales@acme-build.in"]), &sequential(), &ctx).await;
    let result = &results["mailto:sales@acme-build.in"];
    assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::InvalidSeed);
    assert!(web.fetched().is_empty());
}

#[tokio::test]
async fn sessions_are_closed_on_every_exit_path() {
    let white = "https://www.acme-build.in/search?q=White+cement";
    let web = Arc::new(MockWeb::new(&[
        (white, Reply::Html(product_cards(3))),
        (OPC_SEARCH, Reply::Timeout),
    ]));
    let ctx = context(&web);

    discovery::discover_links(
        &strings(&["White cement", "Ordinary Portland cement", "slag cement"]),
        &strings(&["acme"]),
        &DiscoverOptions::default(),
        &ctx,
    )
    .await;

    assert_eq!(web.opened.load(Ordering::SeqCst), 3);
    assert_eq!(web.closed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn static_and_off_domain_links_are_never_queued_or_returned() {
    let seed = "https://www.acme-build.in/cement";
    let web = Arc::new(MockWeb::new(&[(
        seed,
        html(
            r#"<a href="/static/cement-banner.html">cement banner</a>
               <a href="/cement/opc-cement.jpg">OPC cement photo</a>
               <a href="https://www.rival-build.in/cement/opc">OPC cement elsewhere</a>
               <a href="/cement/opc">OPC cement range</a>"#,
        ),
    )]));
    let ctx = context(&web);

    let results = discovery::discover_seed_results(&strings(&[seed]), &sequential(), &ctx).await;
    let result = &results[seed];
    let fetched = web.fetched();

    for url in fetched.iter().chain(result.ranked.iter().map(|r| &r.url)) {
        assert!(!url.contains("/static/"), "{url}");
        assert!(!url.ends_with(".jpg"), "{url}");
        assert!(url.starts_with("https://www.acme-build.in/"), "{url}");
    }
    assert!(fetched.contains(&"https://www.acme-build.in/cement/opc".to_string()));
    assert!(result.stats.off_domain_dropped >= 1);
}

#[tokio::test]
async fn depth_and_page_budgets_hold() {
    let seed = "https://www.acme-build.in/cement";
    let mut pages = vec![(
        seed.to_string(),
        (0..12)
            .map(|i| format!(r#"<a href="/cement/range-{i}">Cement range {i}</a>"#))
            .collect::<String>(),
    )];
    for i in 0..12 {
        pages.push((
            format!("https://www.acme-build.in/cement/range-{i}"),
            format!(r#"<a href="/cement/range-{i}/deeper">Deeper cement {i}</a>"#),
        ));
    }
    let refs: Vec<(&str, Reply)> = pages
        .iter()
        .map(|(u, h)| (u.as_str(), Reply::Html(h.clone())))
        .collect();
    let web = Arc::new(MockWeb::new(&refs));
    let ctx = context(&web);

    let options = DiscoverOptions {
        max_depth: 1,
        max_pages: 6,
        ..sequential()
    };
    let results = discovery::discover_seed_results(&strings(&[seed]), &options, &ctx).await;
    let result = &results[seed];

    assert!(web.fetched().len() <= 6);
    assert!(result.stats.pages_fetched <= 6);
    assert!(result.stats.visits.iter().all(|v| v.depth <= 1));
    assert!(web.fetched().iter().all(|u| !u.ends_with("/deeper")));
    assert!(result.ranked.len() <= options.max_results);
}

#[tokio::test]
async fn off_domain_redirect_counts_as_failure() {
    let seed = "https://www.acme-build.in/cement";
    let web = Arc::new(MockWeb::new(&[(seed, Reply::Redirect("https://parked.example.net/", "<p>parked</p>"))]));
    let ctx = context(&web);

    let results = discovery::discover_seed_results(&strings(&[seed]), &sequential(), &ctx).await;
    let result = &results[seed];
    assert!(result.best_url.is_none());
    assert_eq!(result.empty_reason, Some(EmptyReason::NoPagesFetched));
}

#[tokio::test]
async fn identical_responses_give_identical_results() {
    let web = Arc::new(MockWeb::new(&[
        (
            OPC_SEARCH,
            html(
                r#"<a href="/cement/opc">OPC cement</a>
                   <a href="/cement/ppc">PPC cement</a>
                   <a href="/buy-cement-online/ppc">PPC Cement</a>"#,
            ),
        ),
        ("https://www.acme-build.in/cement/opc", html("<p>opc</p>")),
        ("https://www.acme-build.in/cement/ppc", html("<p>ppc</p>")),
        (PPC_PAGE, html("<p>ppc</p>")),
    ]));

    let mut runs = Vec::new();
    for _ in 0..2 {
        let ctx = context(&web);
        let report = discovery::discover_links(
            &strings(&["Ordinary Portland cement"]),
            &strings(&["acme"]),
            &sequential(),
            &ctx,
        )
        .await;
        let result = report["Ordinary Portland cement"]["acme"].clone();
        runs.push((result.best_url, result.ranked));
    }
    assert_eq!(runs[0], runs[1]);
    assert!(runs[0].0.is_some());
}

#[tokio::test]
async fn report_json_shape() {
    let white = "https://www.acme-build.in/search?q=White+cement";
    let web = Arc::new(MockWeb::new(&[(white, Reply::Html(product_cards(3)))]));
    let ctx = context(&web);

    let report = discovery::discover_links(
        &strings(&["White cement"]),
        &strings(&["acme", "nowhere"]),
        &sequential(),
        &ctx,
    )
    .await;
    let actual = serde_json::to_value(&report).unwrap();

    assert_json_diff::assert_json_include!(
        actual: actual,
        expected: serde_json::json!({
            "White cement": {
                "acme": {
                    "outcome": "succeeded",
                    "best_url": white,
                    "best": {"class": "listing", "card_count": 3, "fallback": false},
                    "error": null,
                    "stats": {"pages_fetched": 1, "stop": "listing_found"}
                },
                "nowhere": {
                    "outcome": "failed",
                    "best_url": null,
                    "error": {"kind": "unknown_site"}
                }
            }
        })
    );
}

#[tokio::test]
async fn redirect_onto_a_product_page_is_never_a_result() {
    let seed = "https://www.acme-build.in/cement-range";
    let web = Arc::new(MockWeb::new(&[(
        seed,
        Reply::Redirect(
            "https://www.acme-build.in/prodetail/ultratech-opc-53",
            "<h1>UltraTech OPC 53</h1>",
        ),
    )]));
    let ctx = context(&web);

    let results = discovery::discover_seed_results(&strings(&[seed]), &sequential(), &ctx).await;
    let result = &results[seed];

    assert!(result.best_url.is_none());
    assert!(result.ranked.is_empty());
    assert_eq!(result.stats.visits[0].class, Some(PageClass::Detail));
    assert_eq!(result.empty_reason, Some(EmptyReason::NoRelevantCandidate));
}

#[tokio::test]
async fn raw_source_url_is_the_last_resort() {
    let search = "https://www.acme-build.in/search?q=slag+cement";
    let price = "https://www.acme-build.in/slag-cement-price";
    let page = "<p>Current rates at https://www.acme-build.in/slag-cement-price for bulk orders.</p>";
    let web = Arc::new(MockWeb::new(&[(search, html(page))]));

    let report = discovery::discover_links(
        &strings(&["slag cement"]),
        &strings(&["acme"]),
        &sequential(),
        &context(&web),
    )
    .await;
    let result = &report["slag cement"]["acme"];

    assert_eq!(result.outcome, CrawlOutcome::Exhausted);
    assert_eq!(result.best_url.as_deref(), Some(price));
    assert!(result.best.as_ref().unwrap().fallback);
    assert_eq!(web.fetched(), vec![search.to_string()]);

    let mut strict = config();
    strict.raw_source_fallback = false;
    let report = discovery::discover_links(
        &strings(&["slag cement"]),
        &strings(&["acme"]),
        &sequential(),
        &context_with(&web, strict),
    )
    .await;
    let result = &report["slag cement"]["acme"];
    assert!(result.best_url.is_none());
    assert_eq!(result.empty_reason, Some(EmptyReason::NoRelevantCandidate));
}

#[tokio::test]
async fn time_budget_stops_the_crawl_with_the_best_so_far() {
    let seed = "https://www.acme-build.in/cement";
    let mut pages = vec![(
        seed.to_string(),
        Reply::Html(
            (0..8)
                .map(|i| format!(r#"<a href="/cement/range-{i}">Cement range {i}</a>"#))
                .collect(),
        ),
    )];
    for i in 0..8 {
        pages.push((
            format!("https://www.acme-build.in/cement/range-{i}"),
            Reply::Slow(80, "<p>bags</p>".into()),
        ));
    }
    let refs: Vec<(&str, Reply)> = pages.iter().map(|(u, r)| (u.as_str(), r.clone())).collect();
    let web = Arc::new(MockWeb::new(&refs));

    let options = DiscoverOptions {
        time_budget_ms: Some(150),
        ..sequential()
    };
    let results = discovery::discover_seed_results(&strings(&[seed]), &options, &context(&web)).await;
    let result = &results[seed];

    assert_eq!(result.stats.stop, Some(StopReason::TimeBudget));
    assert!(web.fetched().len() < 9);
    assert!(result.best_url.is_some());
    assert!(result.stats.pages_fetched < 9);
}

#[tokio::test]
async fn cancelling_mid_crawl_keeps_the_best_so_far() {
    let token = CancelToken::new();
    let web = Arc::new(MockWeb {
        cancel_after: Some((1, token.clone())),
        ..MockWeb::new(&[
            (OPC_SEARCH, html(r#"<a href="/buy-cement-online/ppc">PPC Cement</a>"#)),
            (PPC_PAGE, html("<p>never fetched</p>")),
        ])
    });
    let ctx = context(&web).with_cancel(token);

    let report = discovery::discover_links(
        &strings(&["Ordinary Portland cement"]),
        &strings(&["acme"]),
        &sequential(),
        &ctx,
    )
    .await;
    let result = &report["Ordinary Portland cement"]["acme"];

    assert_eq!(web.fetched(), vec![OPC_SEARCH.to_string()]);
    assert_eq!(result.stats.stop, Some(StopReason::Cancelled));
    assert_eq!(result.outcome, CrawlOutcome::Exhausted);
    assert_eq!(result.best_url.as_deref(), Some(PPC_PAGE));
}

async fn crawl_through_detail_page(enqueue_detail_links: bool, follow_detail_pages: bool) -> Vec<String> {
    let web = Arc::new(MockWeb::new(&[
        (
            OPC_SEARCH,
            html(r#"<a href="/prodetail/opc-cement-bag">Ordinary Portland cement bag</a>"#),
        ),
        (
            "https://www.acme-build.in/prodetail/opc-cement-bag",
            html(r#"<h1>OPC bag</h1><a href="/cement/opc-range">More Ordinary Portland cement</a>"#),
        ),
        ("https://www.acme-build.in/cement/opc-range", html("<p>range</p>")),
    ]));
    let mut config = config();
    config.enqueue_detail_links = enqueue_detail_links;
    config.follow_detail_pages = follow_detail_pages;

    let report = discovery::discover_links(
        &strings(&["Ordinary Portland cement"]),
        &strings(&["acme"]),
        &sequential(),
        &context_with(&web, config),
    )
    .await;
    let result = &report["Ordinary Portland cement"]["acme"];
    assert!(result.ranked.iter().all(|r| !r.url.contains("/prodetail/")));
    web.fetched()
}

#[tokio::test]
async fn detail_links_are_queued_and_followed_only_when_configured() {
    let detail = "https://www.acme-build.in/prodetail/opc-cement-bag".to_string();
    let range = "https://www.acme-build.in/cement/opc-range".to_string();

    let fetched = crawl_through_detail_page(false, true).await;
    assert_eq!(fetched, vec![OPC_SEARCH.to_string()]);

    let fetched = crawl_through_detail_page(true, false).await;
    assert_eq!(fetched, vec![OPC_SEARCH.to_string(), detail.clone()]);

    let fetched = crawl_through_detail_page(true, true).await;
    assert_eq!(fetched, vec![OPC_SEARCH.to_string(), detail, range]);
}

#[tokio::test]
async fn page_with_too_few_cards_is_a_detail_page() {
    let opc = "https://www.acme-build.in/cement/opc";
    let web = Arc::new(MockWeb::new(&[
        (
            OPC_SEARCH,
            html(r#"<a href="/buy-cement-online/ppc">PPC Cement</a><a href="/cement/opc">OPC cement</a>"#),
        ),
        (PPC_PAGE, Reply::Html(product_cards(2))),
        (opc, html("<p>opc</p>")),
    ]));

    let report = discovery::discover_links(
        &strings(&["Ordinary Portland cement"]),
        &strings(&["acme"]),
        &sequential(),
        &context(&web),
    )
    .await;
    let result = &report["Ordinary Portland cement"]["acme"];

    let visit = result.stats.visits.iter().find(|v| v.url == PPC_PAGE).unwrap();
    assert_eq!(visit.class, Some(PageClass::Detail));
    assert_eq!(visit.cards, 2);
    assert!(result.ranked.iter().all(|r| r.url != PPC_PAGE));
    assert_eq!(result.best_url.as_deref(), Some(opc));
}
