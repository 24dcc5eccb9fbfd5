use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The form input. Field order here is the order used when deriving cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Free-text description of what the tools are needed for.
    pub use_case: String,
    pub budget: Budget,
    /// Tool category, or "any".
    pub category: String,
    /// Target platform, or "any".
    pub platform: String,
    pub privacy: Privacy,
    /// Extra requirements, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional: Option<String>,
}

impl SearchQuery {
    pub fn additional_text(&self) -> Option<&str> {
        self.additional
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Budget {
    Free,
    Under20,
    Under50,
    Under100,
    Flexible,
}

impl Budget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Under20 => "under20",
            Self::Under50 => "under50",
            Self::Under100 => "under100",
            Self::Flexible => "flexible",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Standard,
    High,
    Local,
    Opensource,
}

impl Privacy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::High => "high",
            Self::Local => "local",
            Self::Opensource => "opensource",
        }
    }
}

/// One recommended tool as the model described it.
///
/// Decoding never fails on a single field: missing, null or off-type values fall back to
/// the field's default, and numbers given as strings are read as numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(default, deserialize_with = "lenient::rank")]
    pub rank: u32,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub tagline: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub website: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub pricing: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub trial_available: bool,
    #[serde(default, deserialize_with = "lenient::texts")]
    pub pros: Vec<String>,
    #[serde(default, deserialize_with = "lenient::texts")]
    pub cons: Vec<String>,
    /// 0-100.
    #[serde(default, deserialize_with = "lenient::confidence")]
    pub confidence: u8,
    #[serde(default, deserialize_with = "lenient::text")]
    pub reasoning: String,
    #[serde(default, deserialize_with = "lenient::texts")]
    pub key_features: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub alternatives_considered: String,
}

/// What one query produced. Never mutated after the client builds it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    #[serde(default, deserialize_with = "lenient::recommendations")]
    pub recommendations: Vec<Recommendation>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub additional_notes: String,
}

/// Field decoders for model output. Each goes through `serde_json::Value` and maps
/// anything unusable to the type's default.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::Recommendation;

    fn decode<'de, D, T>(deserializer: D, convert: impl FnOnce(Value) -> Option<T>) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(convert(value).unwrap_or_default())
    }

    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
    }

    fn scalar_text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn rank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        decode(deserializer, |v| {
            number(&v)
                .filter(|n| *n >= 0.0)
                .map(|n| n.round().min(u32::MAX as f64) as u32)
        })
    }

    /// Clamped to 0..=100; models occasionally answer `85.0` or `110`.
    pub fn confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        decode(deserializer, |v| {
            number(&v).map(|n| n.clamp(0.0, 100.0).round() as u8)
        })
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        decode(deserializer, scalar_text)
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        decode(deserializer, |v| match v {
            Value::Bool(b) => Some(b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    /// A bare string counts as a one-item list. Non-scalar items are skipped.
    pub fn texts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        decode(deserializer, |v| match v {
            Value::Array(items) => Some(items.into_iter().filter_map(scalar_text).collect()),
            Value::String(s) if !s.trim().is_empty() => Some(vec![s]),
            _ => None,
        })
    }

    /// Items that are not objects are skipped.
    pub fn recommendations<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Recommendation>, D::Error> {
        decode(deserializer, |v| match v {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter(Value::is_object)
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            ),
            _ => None,
        })
    }
}

impl RecommendationSet {
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }
}

/// Preset form fills offered as quick-start examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExampleKind {
    Research,
    Design,
    Productivity,
    Data,
}

impl ExampleKind {
    pub fn query(self) -> SearchQuery {
        let (use_case, budget, category, platform, privacy) = match self {
            Self::Research => (
                "I need tools for academic research including reference management, note-taking, and citation formatting for my thesis project.",
                Budget::Under50,
                "research",
                "any",
                Privacy::Standard,
            ),
            Self::Design => (
                "Looking for design tools to create social media graphics, presentations, and marketing materials for a small business.",
                Budget::Under20,
                "design",
                "web",
                Privacy::Standard,
            ),
            Self::Productivity => (
                "Need productivity tools for project management, team collaboration, and time tracking for a remote team of 5 people.",
                Budget::Under100,
                "productivity",
                "any",
                Privacy::High,
            ),
            Self::Data => (
                "Require data analysis tools for processing large datasets, creating visualizations, and generating reports for business intelligence.",
                Budget::Flexible,
                "data-analysis",
                "any",
                Privacy::High,
            ),
        };
        SearchQuery {
            use_case: use_case.to_string(),
            budget,
            category: category.to_string(),
            platform: platform.to_string(),
            privacy,
            additional: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_uses_wire_field_names() {
        let query: SearchQuery = serde_json::from_value(serde_json::json!({
            "useCase": "thesis citations",
            "budget": "under50",
            "category": "research",
            "platform": "any",
            "privacy": "opensource"
        }))
        .unwrap();
        assert_eq!(query.budget, Budget::Under50);
        assert_eq!(query.privacy, Privacy::Opensource);
        assert_eq!(query.additional, None);
        assert_eq!(serde_json::to_value(query.budget).unwrap(), query.budget.as_str());
        assert_eq!(serde_json::to_value(query.privacy).unwrap(), query.privacy.as_str());

        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["useCase"], "thesis citations");
        assert!(value.get("additional").is_none());
    }

    #[test]
    fn unknown_budget_is_rejected() {
        let result = serde_json::from_value::<SearchQuery>(serde_json::json!({
            "useCase": "x",
            "budget": "cheap",
            "category": "any",
            "platform": "any",
            "privacy": "standard"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn blank_additional_counts_as_absent() {
        let mut query = ExampleKind::Design.query();
        query.additional = Some("   ".to_string());
        assert_eq!(query.additional_text(), None);
        query.additional = Some(" offline ".to_string());
        assert_eq!(query.additional_text(), Some("offline"));
    }

    #[test]
    fn recommendation_tolerates_missing_fields() {
        let set: RecommendationSet = serde_json::from_value(serde_json::json!({
            "recommendations": [{"rank": 1, "name": "Zotero", "trialAvailable": true}],
            "summary": "ok"
        }))
        .unwrap();
        let rec = &set.recommendations[0];
        assert_eq!(rec.name, "Zotero");
        assert!(rec.trial_available);
        assert!(rec.pros.is_empty());
        assert_eq!(set.additional_notes, "");
    }

    #[test]
    fn confidence_is_clamped() {
        let rec: Recommendation =
            serde_json::from_value(serde_json::json!({"name": "A", "confidence": 120})).unwrap();
        assert_eq!(rec.confidence, 100);
        let rec: Recommendation =
            serde_json::from_value(serde_json::json!({"name": "B", "confidence": 72.6})).unwrap();
        assert_eq!(rec.confidence, 73);
    }

    #[test]
    fn examples_fill_every_field() {
        let research = ExampleKind::Research.query();
        assert_eq!(research.budget, Budget::Under50);
        assert_eq!(research.category, "research");
        assert_eq!(ExampleKind::Data.query().category, "data-analysis");
        assert_eq!(ExampleKind::Design.query().platform, "web");
    }

    #[test]
    fn off_type_fields_fall_back_per_field() {
        let set: RecommendationSet = serde_json::from_value(serde_json::json!({
            "recommendations": [
                {"rank": 1, "name": "Zotero", "confidence": null},
                {"rank": "2", "name": "Mendeley", "confidence": "80", "trialAvailable": "yes"},
                {"rank": null, "name": 42, "pros": "Free", "cons": null, "keyFeatures": ["PDF", null, 3]},
                "not an object"
            ],
            "summary": null,
            "additionalNotes": {"unexpected": true}
        }))
        .unwrap();
        assert_eq!(set.recommendations.len(), 3);
        assert_eq!(set.summary, "");
        assert_eq!(set.additional_notes, "");

        let zotero = &set.recommendations[0];
        assert_eq!(zotero.confidence, 0);

        let mendeley = &set.recommendations[1];
        assert_eq!(mendeley.rank, 2);
        assert_eq!(mendeley.confidence, 80);
        assert!(mendeley.trial_available);

        let third = &set.recommendations[2];
        assert_eq!(third.rank, 0);
        assert_eq!(third.name, "42");
        assert_eq!(third.pros, ["Free"]);
        assert!(third.cons.is_empty());
        assert_eq!(third.key_features, ["PDF", "3"]);
    }

    #[test]
    fn non_list_recommendations_decode_as_empty() {
        let set: RecommendationSet = serde_json::from_value(serde_json::json!({
            "recommendations": {"name": "Zotero"},
            "summary": "odd"
        }))
        .unwrap();
        assert!(set.is_empty());
        assert_eq!(set.summary, "odd");
    }
}
