//! Ordered source URLs for the fantasy bootstrap document.
//!
//! The primary URL comes first, then any configured mirrors, then public
//! relays that re-serve the primary for hosts that block server clients:
//! two CORS relays and one text-extraction relay.

use super::StatKind;

const ALLORIGINS_RAW: &str = "https://api.allorigins.win/raw?url=";
const CORSPROXY: &str = "https://corsproxy.io/?url=";
const JINA_READER: &str = "https://r.jina.ai/";

#[derive(Debug, Clone)]
pub struct CandidateResolver {
    primary: String,
    mirrors: Vec<String>,
}

impl CandidateResolver {
    pub fn new(primary: &str, mirrors: &[String]) -> Self {
        CandidateResolver {
            primary: primary.trim().to_string(),
            mirrors: mirrors
                .iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// Candidate URLs for `kind`, most preferred first. Never empty.
    ///
    /// Every kind is derived from the same bootstrap document, so the list is
    /// currently identical for all of them.
    pub fn candidates(&self, _kind: StatKind) -> Vec<String> {
        let encoded: String = url::form_urlencoded::byte_serialize(self.primary.as_bytes()).collect();

        let mut out: Vec<String> = Vec::with_capacity(self.mirrors.len() + 4);
        let all = std::iter::once(self.primary.clone())
            .chain(self.mirrors.iter().cloned())
            .chain([
                format!("{}{}", ALLORIGINS_RAW, encoded),
                format!("{}{}", CORSPROXY, encoded),
                format!("{}{}", JINA_READER, self.primary),
            ]);
        for candidate in all {
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }
}
