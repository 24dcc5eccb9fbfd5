/// Recommendation client: one Gemini call per prompt, model text turned into a
/// `RecommendationSet`.
///
/// Transport failures come back as `GeminiError`. Malformed model output never does: it is
/// resolved by the configured `ParseFailurePolicy`.
use std::sync::{Arc, LazyLock};

use eureka_core::gemini::{GeminiClient, GeminiError};
use regex::Regex;
use tracing::{info, warn};

use crate::model::RecommendationSet;

pub const PARSE_FAILURE_SUMMARY: &str = "Failed to parse recommendations. Please try again.";

/// What to hand back when the model's text is not the JSON we asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseFailurePolicy {
    /// Empty recommendation list with a fixed explanatory summary.
    #[default]
    EmptyResult,
}

impl ParseFailurePolicy {
    pub fn fallback(self) -> RecommendationSet {
        match self {
            Self::EmptyResult => RecommendationSet {
                recommendations: Vec::new(),
                summary: PARSE_FAILURE_SUMMARY.to_string(),
                additional_notes: String::new(),
            },
        }
    }
}

#[derive(Clone)]
pub struct RecommendationClient {
    gemini: Arc<GeminiClient>,
    on_parse_failure: ParseFailurePolicy,
}

impl RecommendationClient {
    pub fn new(gemini: Arc<GeminiClient>) -> Self {
        Self {
            gemini,
            on_parse_failure: ParseFailurePolicy::default(),
        }
    }

    pub async fn fetch_recommendations(&self, prompt: &str) -> Result<RecommendationSet, GeminiError> {
        let text = self.gemini.generate_text(prompt).await?;
        let set = parse_recommendations(&text, self.on_parse_failure);
        info!(count = set.recommendations.len(), "recommendations received");
        Ok(set)
    }
}

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```json\n?").expect("valid regex"));
static BARE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```\n?").expect("valid regex"));

/// Remove every ```` ```json ```` and ```` ``` ```` marker (with an optional trailing newline).
pub fn strip_code_fences(text: &str) -> String {
    let without_json = JSON_FENCE.replace_all(text, "");
    BARE_FENCE.replace_all(&without_json, "").into_owned()
}

pub fn parse_recommendations(text: &str, policy: ParseFailurePolicy) -> RecommendationSet {
    let cleaned = strip_code_fences(text);
    serde_json::from_str::<RecommendationSet>(cleaned.trim())
        .inspect_err(|e| warn!(error = %e, "failed to parse model output as recommendations"))
        .unwrap_or_else(|_| policy.fallback())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eureka_core::gemini::GeminiClientConfig;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAYLOAD: &str = r#"{
  "recommendations": [
    {"rank": 1, "name": "Zotero", "tagline": "Reference manager", "confidence": 92,
     "pros": ["Free"], "cons": ["Sync quota"], "keyFeatures": ["Citations"]}
  ],
  "summary": "One solid pick",
  "additionalNotes": "Check storage limits"
}"#;

    #[test]
    fn fenced_and_plain_payloads_parse_identically() {
        let plain = parse_recommendations(PAYLOAD, ParseFailurePolicy::EmptyResult);
        let fenced = parse_recommendations(
            &format!("```json\n{PAYLOAD}\n```"),
            ParseFailurePolicy::EmptyResult,
        );
        let bare = parse_recommendations(&format!("```\n{PAYLOAD}\n```\n"), ParseFailurePolicy::EmptyResult);
        assert_eq!(plain.recommendations.len(), 1);
        assert_eq!(plain.recommendations[0].name, "Zotero");
        assert_eq!(plain, fenced);
        assert_eq!(plain, bare);
    }

    #[test]
    fn strips_all_fence_markers() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}\n");
        assert_eq!(strip_code_fences("```json{}```"), "{}");
        assert_eq!(strip_code_fences("no fences"), "no fences");
    }

    #[test]
    fn unparsable_output_falls_back_to_empty_set() {
        let set = parse_recommendations("Sorry, I can't help with that.", ParseFailurePolicy::EmptyResult);
        assert!(set.is_empty());
        assert_eq!(set.summary, PARSE_FAILURE_SUMMARY);
        assert_eq!(set.additional_notes, "");
    }

    #[test]
    fn sloppy_fields_keep_the_rest_of_the_set() {
        let text = r#"```json
{"recommendations": [
  {"rank": 1, "name": "Zotero", "confidence": null},
  {"rank": "2", "name": "Mendeley", "confidence": 80}
],
"summary": "Two picks",
"additionalNotes": null}
```"#;
        let set = parse_recommendations(text, ParseFailurePolicy::EmptyResult);
        assert_eq!(set.recommendations.len(), 2);
        assert_eq!(set.summary, "Two picks");
        assert_eq!(set.additional_notes, "");
        assert_eq!(set.recommendations[0].confidence, 0);
        assert_eq!(set.recommendations[1].rank, 2);
    }

    #[test]
    fn non_object_json_falls_back() {
        let set = parse_recommendations("[1, 2, 3]", ParseFailurePolicy::EmptyResult);
        assert_eq!(set, ParseFailurePolicy::EmptyResult.fallback());
    }

    #[tokio::test]
    async fn fetch_never_raises_on_garbage_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "```json\n{not json"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = GeminiClientConfig::new("k");
        config.endpoint = server.uri();
        let client = RecommendationClient::new(Arc::new(GeminiClient::new(config).unwrap()));
        let set = client.fetch_recommendations("prompt").await.unwrap();
        assert!(set.is_empty());
        assert_eq!(set.summary, PARSE_FAILURE_SUMMARY);
    }
}
