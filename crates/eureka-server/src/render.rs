/// Results view: projects a `RecommendationSet` into display records and owns the
/// per-connection comparison selection.
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Budget, Privacy, Recommendation, RecommendationSet, SearchQuery};
use crate::preferences::FavoriteSet;
use crate::prompt::specific;

pub const MAX_COMPARED: usize = 3;
const USE_CASE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn for_confidence(confidence: u8) -> Self {
        match confidence {
            80.. => Self::High,
            60..=79 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Badge styling by list position. Positions past the third share the third style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RankBadge {
    Primary,
    Secondary,
    Tertiary,
}

impl RankBadge {
    /// `position` is 1-based.
    pub fn for_position(position: usize) -> Self {
        match position {
            0 | 1 => Self::Primary,
            2 => Self::Secondary,
            _ => Self::Tertiary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecommendationCard {
    pub display_rank: u32,
    pub badge: RankBadge,
    pub confidence_band: ConfidenceBand,
    pub favorite: bool,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderedResults {
    /// The set holds no recommendations.
    Empty { summary: String },
    Cards {
        summary: String,
        cards: Vec<RecommendationCard>,
        additional_notes: String,
    },
}

pub fn render(set: &RecommendationSet, favorites: &FavoriteSet) -> RenderedResults {
    if set.is_empty() {
        return RenderedResults::Empty {
            summary: set.summary.clone(),
        };
    }
    let cards = set
        .recommendations
        .iter()
        .enumerate()
        .map(|(index, rec)| {
            let position = index + 1;
            RecommendationCard {
                display_rank: if rec.rank > 0 { rec.rank } else { position as u32 },
                badge: RankBadge::for_position(position),
                confidence_band: ConfidenceBand::for_confidence(rec.confidence),
                favorite: favorites.contains(&rec.name),
                recommendation: rec.clone(),
            }
        })
        .collect();
    RenderedResults::Cards {
        summary: set.summary.clone(),
        cards,
        additional_notes: set.additional_notes.clone(),
    }
}

/// Header describing the criteria the results were generated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryDetails {
    pub use_case: String,
    pub budget: String,
    pub category: String,
    pub platform: String,
    pub privacy: String,
    pub additional: Option<String>,
}

pub fn budget_label(budget: Budget) -> &'static str {
    match budget {
        Budget::Free => "Free only",
        Budget::Under20 => "Under $20/month",
        Budget::Under50 => "Under $50/month",
        Budget::Under100 => "Under $100/month",
        Budget::Flexible => "Flexible budget",
    }
}

pub fn privacy_label(privacy: Privacy) -> &'static str {
    match privacy {
        Privacy::Standard => "Standard",
        Privacy::High => "High (GDPR compliant)",
        Privacy::Local => "Local/on-premise only",
        Privacy::Opensource => "Open source preferred",
    }
}

pub fn query_details(query: &SearchQuery) -> QueryDetails {
    let preview: String = query.use_case.chars().take(USE_CASE_PREVIEW_CHARS).collect();
    QueryDetails {
        use_case: format!("{preview}..."),
        budget: budget_label(query.budget).to_string(),
        category: specific(&query.category).unwrap_or("Any").to_string(),
        platform: specific(&query.platform).unwrap_or("Any").to_string(),
        privacy: privacy_label(query.privacy).to_string(),
        additional: query.additional_text().map(str::to_string),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExportDocument {
    pub timestamp: DateTime<Utc>,
    pub query: SearchQuery,
    pub recommendations: RecommendationSet,
}

impl ExportDocument {
    pub fn new(at: DateTime<Utc>, query: SearchQuery, recommendations: RecommendationSet) -> Self {
        Self {
            timestamp: at,
            query,
            recommendations,
        }
    }

    pub fn file_name(&self) -> String {
        format!("eureka-recommendations-{}.json", self.timestamp.timestamp_millis())
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected,
    Deselected,
    LimitReached,
    NotComparing,
}

/// Comparison-mode state for one results view.
#[derive(Debug, Default)]
pub struct ResultsController {
    comparing: bool,
    selected: Vec<String>,
}

impl ResultsController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_comparing(&self) -> bool {
        self.comparing
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Flip comparison mode. Leaving it clears the selection.
    pub fn toggle_comparison(&mut self) -> bool {
        self.comparing = !self.comparing;
        if !self.comparing {
            self.selected.clear();
        }
        self.comparing
    }

    pub fn select(&mut self, tool: &str) -> SelectOutcome {
        if !self.comparing {
            return SelectOutcome::NotComparing;
        }
        if let Some(index) = self.selected.iter().position(|t| t == tool) {
            self.selected.remove(index);
            return SelectOutcome::Deselected;
        }
        if self.selected.len() >= MAX_COMPARED {
            return SelectOutcome::LimitReached;
        }
        self.selected.push(tool.to_string());
        SelectOutcome::Selected
    }

    pub fn ready_to_compare(&self) -> bool {
        self.selected.len() >= 2
    }
}
