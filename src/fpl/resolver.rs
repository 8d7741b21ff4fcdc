//! Fetch-with-fallback orchestration for the fantasy bootstrap document.
//!
//! ```text
//!  resolve(kind, force)
//!     │ fresh cache && !force ──▶ cached payload (no I/O)
//!     ▼
//!  CandidateResolver ──▶ [primary, mirrors…, relays…]
//!     │ one at a time
//!     ▼
//!  UpstreamClient::fetch ──▶ Attempt::{Success, Retry(AttemptFailure)}
//!     │ first Success: cache.put + return
//!     ▼
//!  exhausted ──▶ StatsError::AllCandidatesExhausted
//! ```

use chrono::Duration;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::cache::StatsCache;
use super::candidates::CandidateResolver;
use super::client::UpstreamClient;
use super::models::{Bootstrap, StatKind};
use super::StatsError;

/// Length of the body excerpt carried by diagnostics.
const SAMPLE_LEN: usize = 200;

/// Why a single candidate was skipped. Always recoverable by moving on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Unreachable(String),
    Rejected { status: u16, sample: String },
    Malformed { sample: String },
}

#[derive(Debug)]
pub enum Attempt {
    Success(Bootstrap),
    Retry(AttemptFailure),
}

/// A payload together with where it came from.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub payload: Arc<Bootstrap>,
    pub source_url: String,
    pub from_cache: bool,
}

#[derive(Clone)]
pub struct StatsResolver {
    client: Arc<dyn UpstreamClient>,
    candidates: CandidateResolver,
    cache: StatsCache,
    ttl: Duration,
}

impl StatsResolver {
    pub fn new(
        client: Arc<dyn UpstreamClient>,
        candidates: CandidateResolver,
        cache: StatsCache,
        ttl: Duration,
    ) -> Self {
        StatsResolver {
            client,
            candidates,
            cache,
            ttl,
        }
    }

    pub fn cache(&self) -> &StatsCache {
        &self.cache
    }

    pub fn candidates(&self, kind: StatKind) -> Vec<String> {
        self.candidates.candidates(kind)
    }

    pub async fn resolve(&self, kind: StatKind, force_refresh: bool) -> Result<Resolved, StatsError> {
        if !force_refresh {
            if let Some(entry) = self.cache.fresh().await {
                debug!("Stats cache hit for {} (source {})", kind, entry.source_url);
                return Ok(Resolved {
                    payload: entry.payload,
                    source_url: entry.source_url,
                    from_cache: true,
                });
            }
        }

        let candidates = self.candidates.candidates(kind);
        let mut last_status: Option<u16> = None;
        let mut last_sample = String::new();

        for url in &candidates {
            match self.attempt(url).await {
                Attempt::Success(payload) => {
                    let payload = Arc::new(payload);
                    self.cache.put(Arc::clone(&payload), url, self.ttl).await;
                    info!(
                        "Resolved {} from {} ({} elements)",
                        kind,
                        url,
                        payload.elements.len()
                    );
                    return Ok(Resolved {
                        payload,
                        source_url: url.clone(),
                        from_cache: false,
                    });
                }
                Attempt::Retry(failure) => {
                    warn!("Stats candidate {} failed: {:?}", url, failure);
                    match failure {
                        AttemptFailure::Unreachable(msg) => last_sample = excerpt(&msg),
                        AttemptFailure::Rejected { status, sample } => {
                            last_status = Some(status);
                            last_sample = sample;
                        }
                        AttemptFailure::Malformed { sample } => {
                            last_status = Some(200);
                            last_sample = sample;
                        }
                    }
                }
            }
        }

        warn!("All {} stats candidates failed for {}", candidates.len(), kind);
        Err(StatsError::AllCandidatesExhausted {
            last_status,
            sample: last_sample,
        })
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let resp = match self.client.fetch(url).await {
            Ok(r) => r,
            Err(e) => return Attempt::Retry(AttemptFailure::Unreachable(e.to_string())),
        };
        if !resp.is_success() {
            return Attempt::Retry(AttemptFailure::Rejected {
                status: resp.status,
                sample: excerpt(&resp.body),
            });
        }
        match parse_payload(&resp.body) {
            Some(payload) => Attempt::Success(payload),
            None => Attempt::Retry(AttemptFailure::Malformed {
                sample: excerpt(&resp.body),
            }),
        }
    }
}

/// Parse a response body as a bootstrap document, trying the whole body
/// first, then the first balanced `{ … }` span, then the first `{` to the
/// last `}` (relays may wrap the JSON in markup or prose).
pub fn parse_payload(body: &str) -> Option<Bootstrap> {
    std::iter::once(body)
        .chain(balanced_object(body))
        .chain(outermost_braces(body))
        .filter_map(|text| serde_json::from_str::<Value>(text).ok())
        .filter(has_elements)
        .find_map(|doc| serde_json::from_value::<Bootstrap>(doc).ok())
}

/// Success predicate: the document carries an `elements` array.
pub fn has_elements(doc: &Value) -> bool {
    doc.get("elements").map_or(false, Value::is_array)
}

/// The span from the first `{` to its matching `}`, skipping braces inside
/// JSON string literals. Best-effort: a stray `{` in leading prose wins.
fn balanced_object(body: &str) -> Option<&str> {
    let start = body.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in body.bytes().enumerate().skip(start) {
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
                depth -= 1;
                if depth == 0 {
                    return Some(&body[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// The span from the first `{` to the last `}`.
fn outermost_braces(body: &str) -> Option<&str> {
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

fn excerpt(text: &str) -> String {
    text.chars().take(SAMPLE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fpl::cache::testing::ManualClock;
    use crate::fpl::client::testing::ScriptedClient;

    const PRIMARY: &str = "https://fpl.example/bootstrap";
    const BODY: &str = r#"{"teams":[{"id":1,"name":"Arsenal"}],"elements":[{"id":9,"web_name":"Saka","team":1,"goals_scored":12,"photo":"123.jpg"}]}"#;

    fn setup(client: ScriptedClient) -> (StatsResolver, Arc<ScriptedClient>, Arc<ManualClock>) {
        let client = Arc::new(client);
        let clock = ManualClock::new();
        let resolver = StatsResolver::new(
            client.clone(),
            CandidateResolver::new(PRIMARY, &[]),
            StatsCache::new(clock.clone()),
            Duration::seconds(300),
        );
        (resolver, client, clock)
    }

    fn candidate(n: usize) -> String {
        CandidateResolver::new(PRIMARY, &[]).candidates(StatKind::Scorers)[n].clone()
    }

    #[tokio::test]
    async fn test_first_success_wins_and_stops() {
        let client = ScriptedClient::default()
            .respond(PRIMARY, 403, "Forbidden")
            .unreachable(&candidate(1))
            .respond(&candidate(2), 200, BODY)
            .respond(&candidate(3), 200, BODY);
        let (resolver, client, _) = setup(client);

        let resolved = resolver.resolve(StatKind::Scorers, false).await.unwrap();
        assert_eq!(resolved.source_url, candidate(2));
        assert!(!resolved.from_cache);
        assert_eq!(client.calls(), vec![candidate(0), candidate(1), candidate(2)]);

        let entry = resolver.cache().get().await.unwrap();
        assert_eq!(entry.source_url, candidate(2));
    }

    #[tokio::test]
    async fn test_cache_freshness_window() {
        let (resolver, client, clock) = setup(ScriptedClient::default().respond(PRIMARY, 200, BODY));

        resolver.resolve(StatKind::Scorers, false).await.unwrap();
        assert_eq!(client.calls().len(), 1);

        clock.advance(Duration::seconds(299));
        let hit = resolver.resolve(StatKind::Assists, false).await.unwrap();
        assert!(hit.from_cache);
        assert_eq!(client.calls().len(), 1, "fresh cache must not touch the network");

        clock.advance(Duration::seconds(2));
        let miss = resolver.resolve(StatKind::Scorers, false).await.unwrap();
        assert!(!miss.from_cache);
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_fresh_cache() {
        let (resolver, client, _) = setup(ScriptedClient::default().respond(PRIMARY, 200, BODY));

        resolver.resolve(StatKind::Scorers, false).await.unwrap();
        let forced = resolver.resolve(StatKind::Scorers, true).await.unwrap();
        assert!(!forced.from_cache);
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_all_failed_leaves_cache_untouched() {
        let (resolver, client, _) = setup(ScriptedClient::default());

        let err = resolver.resolve(StatKind::Cleansheets, false).await.unwrap_err();
        match err {
            StatsError::AllCandidatesExhausted { last_status, sample } => {
                assert_eq!(last_status, Some(500));
                assert_eq!(sample, "Internal Server Error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.calls().len(), 4);
        assert!(resolver.cache().get().await.is_none());
    }

    #[tokio::test]
    async fn test_all_unreachable_has_no_status() {
        let mut client = ScriptedClient::default();
        for n in 0..4 {
            client = client.unreachable(&candidate(n));
        }
        let (resolver, client, _) = setup(client);

        let err = resolver.resolve(StatKind::Scorers, false).await.unwrap_err();
        match err {
            StatsError::AllCandidatesExhausted { last_status, sample } => {
                assert_eq!(last_status, None);
                assert!(sample.contains("connection refused"), "sample: {}", sample);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_last_observed_status_survives_unreachable_tail() {
        let client = ScriptedClient::default()
            .unreachable(PRIMARY)
            .respond(&candidate(1), 404, "Not Found")
            .unreachable(&candidate(2))
            .unreachable(&candidate(3));
        let (resolver, _, _) = setup(client);

        let err = resolver.resolve(StatKind::Assists, false).await.unwrap_err();
        match err {
            StatsError::AllCandidatesExhausted { last_status, .. } => {
                assert_eq!(last_status, Some(404));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_trailing_4xx_after_unreachable_is_reported() {
        let client = ScriptedClient::default()
            .unreachable(PRIMARY)
            .unreachable(&candidate(1))
            .unreachable(&candidate(2))
            .respond(&candidate(3), 429, "Too Many Requests");
        let (resolver, _, _) = setup(client);

        let err = resolver.resolve(StatKind::Scorers, true).await.unwrap_err();
        match err {
            StatsError::AllCandidatesExhausted { last_status, sample } => {
                assert_eq!(last_status, Some(429));
                assert_eq!(sample, "Too Many Requests");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_entry() {
        let (resolver, _, clock) = setup(ScriptedClient::default().respond(PRIMARY, 200, BODY));
        resolver.resolve(StatKind::Scorers, false).await.unwrap();
        let before = resolver.cache().get().await.unwrap();

        // Same resolver state, but now every candidate fails.
        let failing = StatsResolver::new(
            Arc::new(ScriptedClient::default()),
            CandidateResolver::new(PRIMARY, &[]),
            resolver.cache().clone(),
            Duration::seconds(300),
        );
        clock.advance(Duration::seconds(1));
        assert!(failing.resolve(StatKind::Scorers, true).await.is_err());

        let after = failing.cache().get().await.unwrap();
        assert_eq!(after.stored_at, before.stored_at);
    }

    #[tokio::test]
    async fn test_wrapped_json_is_recovered() {
        let wrapped = format!("Title: bootstrap\n\nMarkdown Content:\n<pre>{}</pre>\n", BODY);
        let (resolver, _, _) = setup(ScriptedClient::default().respond(PRIMARY, 200, &wrapped));

        let resolved = resolver.resolve(StatKind::Scorers, false).await.unwrap();
        let direct: Bootstrap = serde_json::from_str(BODY).unwrap();
        assert_eq!(resolved.payload.elements.len(), direct.elements.len());
        assert_eq!(
            resolved.payload.elements[0].web_name,
            direct.elements[0].web_name
        );
        assert_eq!(resolved.payload.teams[0].name, "Arsenal");
    }

    #[tokio::test]
    async fn test_shape_without_elements_is_skipped() {
        let client = ScriptedClient::default()
            .respond(PRIMARY, 200, r#"{"error":"rate limited"}"#)
            .respond(&candidate(1), 200, BODY);
        let (resolver, client, _) = setup(client);

        let resolved = resolver.resolve(StatKind::Scorers, false).await.unwrap();
        assert_eq!(resolved.source_url, candidate(1));
        assert_eq!(client.calls().len(), 2);
    }

    #[test]
    fn test_recovers_json_before_trailing_script() {
        let page = format!(
            "<html><pre>{}</pre><script>window.x = {{a: 1}};</script><style>p {{ color: red }}</style></html>",
            BODY
        );
        let payload = parse_payload(&page).unwrap();
        assert_eq!(payload.elements.len(), 1);
        assert_eq!(payload.teams[0].name, "Arsenal");
    }

    #[test]
    fn test_balanced_span_ignores_braces_in_strings() {
        let body = r#"{"teams":[{"id":1,"name":"Arse}nal \"{"}],"elements":[]} trailing }"#;
        assert_eq!(
            balanced_object(&format!("junk {}", body)),
            Some(r#"{"teams":[{"id":1,"name":"Arse}nal \"{"}],"elements":[]}"#)
        );
        assert_eq!(balanced_object("{ never closed"), None);
        let payload = parse_payload(&format!("junk {}", body)).unwrap();
        assert_eq!(payload.teams[0].name, "Arse}nal \"{");
    }

    #[test]
    fn test_parse_payload_variants() {
        assert!(parse_payload(BODY).is_some());
        assert!(parse_payload("<html>blocked</html>").is_none());
        assert!(parse_payload(r#"{"elements": {}}"#).is_none());
        assert!(parse_payload(r#"}{"#).is_none());
        assert!(parse_payload(&format!("callback({});", BODY)).is_some());
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let long = "x".repeat(1000);
        assert_eq!(excerpt(&long).len(), SAMPLE_LEN);
    }
}
