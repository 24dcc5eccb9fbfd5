use crate::model::{Budget, Privacy, SearchQuery};

const PREAMBLE: &str = "You are an expert tool recommendation system. Based on the following requirements, \
provide exactly 3-5 tool recommendations with detailed analysis. Use real-time search to ensure accuracy.";

const ACCURACY_NOTE: &str = "IMPORTANT: Search for current, real tools that exist today. Include accurate pricing, \
real websites, and factual information.";

const RESPONSE_SCHEMA: &str = r#"Provide your response in the following JSON format:
{
  "recommendations": [
    {
      "rank": 1,
      "name": "Tool Name",
      "tagline": "Brief description in one line",
      "description": "Detailed description of the tool and how it matches the requirements",
      "website": "https://actual-website.com",
      "pricing": "Specific pricing details (e.g., Free tier available, $19/month for Pro)",
      "trialAvailable": true/false,
      "pros": ["Pro 1 specific to use case", "Pro 2", "Pro 3"],
      "cons": ["Con 1 specific to use case", "Con 2"],
      "confidence": 85,
      "reasoning": "Why this tool is recommended for this specific use case",
      "keyFeatures": ["Feature 1", "Feature 2", "Feature 3", "Feature 4"],
      "alternativesConsidered": "Brief mention of why this was chosen over similar tools"
    }
  ],
  "summary": "Brief summary of the recommendations and any important considerations",
  "additionalNotes": "Any caveats, tips, or additional information the user should know"
}"#;

const CLOSING: &str =
    "Ensure all recommendations are real, currently available tools with accurate information.";

pub fn budget_phrase(budget: Budget) -> &'static str {
    match budget {
        Budget::Free => "free tools only",
        Budget::Under20 => "under $20/month",
        Budget::Under50 => "under $50/month",
        Budget::Under100 => "under $100/month",
        Budget::Flexible => "any price range",
    }
}

pub fn privacy_phrase(privacy: Privacy) -> &'static str {
    match privacy {
        Privacy::Standard => "standard privacy",
        Privacy::High => "high privacy with GDPR compliance",
        Privacy::Local => "local/on-premise solutions only",
        Privacy::Opensource => "open source preferred",
    }
}

/// `None` for the "no preference" values of the category and platform selects.
pub(crate) fn specific(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && !value.eq_ignore_ascii_case("any")).then_some(value)
}

/// Build the instruction sent to the model. Pure; every field renders something.
pub fn build_prompt(query: &SearchQuery) -> String {
    let category = specific(&query.category).unwrap_or("any category");
    let platform = specific(&query.platform).unwrap_or("any platform");
    let additional = query.additional_text().unwrap_or("None specified");

    format!(
        "{PREAMBLE}\n\n\
USER REQUIREMENTS:\n\
- Use Case: {use_case}\n\
- Budget: {budget}\n\
- Category: {category}\n\
- Platform: {platform}\n\
- Privacy: {privacy}\n\
- Additional Requirements: {additional}\n\n\
{ACCURACY_NOTE}\n\n\
{RESPONSE_SCHEMA}\n\n\
{CLOSING}",
        use_case = query.use_case,
        budget = budget_phrase(query.budget),
        privacy = privacy_phrase(query.privacy),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExampleKind;

    const LABELS: [&str; 6] = [
        "- Use Case:",
        "- Budget:",
        "- Category:",
        "- Platform:",
        "- Privacy:",
        "- Additional Requirements:",
    ];

    fn thesis_query() -> SearchQuery {
        SearchQuery {
            use_case: "thesis citations".to_string(),
            budget: Budget::Under50,
            category: "research".to_string(),
            platform: "any".to_string(),
            privacy: Privacy::Standard,
            additional: None,
        }
    }

    #[test]
    fn every_label_appears_once() {
        let budgets = [
            Budget::Free,
            Budget::Under20,
            Budget::Under50,
            Budget::Under100,
            Budget::Flexible,
        ];
        let privacies = [
            Privacy::Standard,
            Privacy::High,
            Privacy::Local,
            Privacy::Opensource,
        ];
        for budget in budgets {
            for privacy in privacies {
                let mut query = thesis_query();
                query.budget = budget;
                query.privacy = privacy;
                let prompt = build_prompt(&query);
                for label in LABELS {
                    assert_eq!(prompt.matches(label).count(), 1, "{label} in {budget:?}/{privacy:?}");
                }
            }
        }
    }

    #[test]
    fn renders_phrases_and_defaults() {
        let prompt = build_prompt(&thesis_query());
        assert!(prompt.starts_with("You are an expert tool recommendation system."));
        assert!(prompt.contains("- Use Case: thesis citations\n"));
        assert!(prompt.contains("- Budget: under $50/month\n"));
        assert!(prompt.contains("- Category: research\n"));
        assert!(prompt.contains("- Platform: any platform\n"));
        assert!(prompt.contains("- Privacy: standard privacy\n"));
        assert!(prompt.contains("- Additional Requirements: None specified\n"));
        assert!(prompt.contains("\"alternativesConsidered\""));
        assert!(prompt.ends_with(CLOSING));
    }

    #[test]
    fn any_category_and_additional_text() {
        let mut query = ExampleKind::Productivity.query();
        query.category = "Any".to_string();
        query.additional = Some("must integrate with Slack".to_string());
        let prompt = build_prompt(&query);
        assert!(prompt.contains("- Category: any category\n"));
        assert!(prompt.contains("- Privacy: high privacy with GDPR compliance\n"));
        assert!(prompt.contains("- Additional Requirements: must integrate with Slack\n"));
    }

    #[test]
    fn blank_platform_means_any() {
        let mut query = thesis_query();
        query.platform = "  ".to_string();
        assert!(build_prompt(&query).contains("- Platform: any platform\n"));
    }

    #[test]
    fn phrase_tables() {
        assert_eq!(budget_phrase(Budget::Free), "free tools only");
        assert_eq!(budget_phrase(Budget::Flexible), "any price range");
        assert_eq!(privacy_phrase(Privacy::Local), "local/on-premise solutions only");
        assert_eq!(privacy_phrase(Privacy::Opensource), "open source preferred");
    }
}
