use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::activity::{DayCount, HistoryEntry};
use crate::clock::Clock;
use crate::controller::{RecommendationController, RequestState, Shared, SubmitOutcome};
use crate::model::{ExampleKind, SearchQuery};
use crate::preferences::{Preferences, Theme};
use crate::prompt;
use crate::rate_limit::RateLimiter;
use crate::render::{
    self, ExportDocument, QueryDetails, RecommendationCard, RenderedResults, ResultsController,
    SelectOutcome, MAX_COMPARED,
};

const DEFAULT_ACTIVITY_DAYS: usize = 7;
const DEFAULT_HISTORY_PAGE: usize = 1;
const DEFAULT_HISTORY_LIMIT: usize = 10;

/// One MCP connection. Services in `shared` and `preferences` are common to every
/// connection; the two controllers are per connection.
#[derive(Clone)]
pub struct EurekaServer {
    shared: Shared,
    preferences: Preferences,
    clock: Arc<dyn Clock>,
    limiter: Option<RateLimiter>,
    submissions: Arc<Mutex<RecommendationController>>,
    results: Arc<Mutex<ResultsController>>,
    tool_router: ToolRouter<EurekaServer>,
}

impl EurekaServer {
    pub fn new(
        shared: Shared,
        preferences: Preferences,
        clock: Arc<dyn Clock>,
        limiter: Option<RateLimiter>,
    ) -> Self {
        Self {
            submissions: Arc::new(Mutex::new(RecommendationController::new(shared.clone()))),
            results: Arc::new(Mutex::new(ResultsController::new())),
            shared,
            preferences,
            clock,
            limiter,
            tool_router: Self::tool_router(),
        }
    }

    /// Same shared services, fresh session and comparison state.
    pub fn new_session(&self) -> Self {
        Self::new(
            self.shared.clone(),
            self.preferences.clone(),
            Arc::clone(&self.clock),
            self.limiter.clone(),
        )
    }

    async fn gate(&self) -> Result<(), String> {
        if let Some(limiter) = &self.limiter {
            limiter.check().await?;
        }
        Ok(())
    }

    async fn results_view(&self) -> ResultsView {
        let loaded = self.submissions.lock().await.session().load().await;
        let (comparing, selected) = {
            let results = self.results.lock().await;
            (results.is_comparing(), results.selected().to_vec())
        };
        let mut view = ResultsView {
            status: ViewStatus::Redirect,
            query: None,
            summary: String::new(),
            cards: Vec::new(),
            additional_notes: String::new(),
            theme: self.preferences.theme().await,
            comparing,
            ready_to_compare: selected.len() >= 2,
            selected,
        };
        let Ok((query, set)) = loaded else {
            return view;
        };
        view.query = Some(render::query_details(&query));
        match render::render(&set, &self.preferences.favorites().await) {
            RenderedResults::Empty { summary } => {
                view.status = ViewStatus::Empty;
                view.summary = summary;
            }
            RenderedResults::Cards {
                summary,
                cards,
                additional_notes,
            } => {
                view.status = ViewStatus::Cards;
                view.summary = summary;
                view.cards = cards;
                view.additional_notes = additional_notes;
            }
        }
        view
    }

    async fn comparison(&self) -> ComparisonResponse {
        let results = self.results.lock().await;
        ComparisonResponse {
            comparing: results.is_comparing(),
            selected: results.selected().to_vec(),
            ready_to_compare: results.ready_to_compare(),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ToolNameParams {
    /// Tool name exactly as it appears in the results.
    name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct QuickExampleParams {
    example: ExampleKind,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ActivityStatsParams {
    /// Number of most recent active days to return (default 7).
    days: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchHistoryParams {
    /// 1-based page number (default 1).
    page: Option<usize>,
    /// Entries per page (default 10).
    limit: Option<usize>,
}

/// `redirect` means the session holds no results and the caller should start a new search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
enum ViewStatus {
    Redirect,
    Empty,
    Cards,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ResultsView {
    status: ViewStatus,
    query: Option<QueryDetails>,
    summary: String,
    cards: Vec<RecommendationCard>,
    additional_notes: String,
    theme: Theme,
    comparing: bool,
    selected: Vec<String>,
    ready_to_compare: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
struct RecommendResponse {
    state: RequestState,
    /// States this submission passed through.
    transitions: Vec<RequestState>,
    from_cache: bool,
    /// User-facing error, present when the submission failed.
    error: Option<String>,
    results: Option<ResultsView>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct TextResponse {
    text: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ExportResponse {
    file_name: String,
    content: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct FavoriteResponse {
    name: String,
    favorite: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
struct FavoritesResponse {
    favorites: Vec<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ThemeResponse {
    theme: Theme,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ComparisonResponse {
    comparing: bool,
    selected: Vec<String>,
    ready_to_compare: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ActivityStatsResponse {
    days: Vec<DayCount>,
    total_searches: u64,
}

#[derive(Debug, Serialize, JsonSchema)]
struct SearchHistoryResponse {
    page: usize,
    limit: usize,
    entries: Vec<HistoryEntry>,
}

#[tool_router]
impl EurekaServer {
    #[tool(description = "Get AI tool recommendations for a use case. Serves identical searches from a 30-minute cache; otherwise asks Gemini. On success the results are stored in this session and returned rendered.")]
    async fn recommend_tools(
        &self,
        Parameters(query): Parameters<SearchQuery>,
    ) -> Result<Json<RecommendResponse>, String> {
        if query.use_case.trim().is_empty() {
            return Err("useCase must not be empty".to_string());
        }
        self.gate().await?;

        let (outcome, state, transitions) = {
            let mut controller = self.submissions.lock().await;
            let outcome = controller.submit(query).await;
            (
                outcome,
                controller.state().clone(),
                controller.transitions().to_vec(),
            )
        };
        let response = match outcome {
            SubmitOutcome::Redirect { from_cache, .. } => RecommendResponse {
                state,
                transitions,
                from_cache,
                error: None,
                results: Some(self.results_view().await),
            },
            SubmitOutcome::Failed { message } => RecommendResponse {
                state,
                transitions,
                from_cache: false,
                error: Some(message),
                results: None,
            },
        };
        Ok(Json(response))
    }

    #[tool(description = "Show the Gemini prompt that would be sent for a search, without sending it.")]
    async fn build_prompt(
        &self,
        Parameters(query): Parameters<SearchQuery>,
    ) -> Result<Json<TextResponse>, String> {
        Ok(Json(TextResponse {
            text: prompt::build_prompt(&query),
        }))
    }

    #[tool(description = "Render the results of this session's last search: query details, ranked cards with confidence bands and favorites, and comparison state. Status 'redirect' means there is nothing to show yet.")]
    async fn view_results(&self) -> Result<Json<ResultsView>, String> {
        Ok(Json(self.results_view().await))
    }

    #[tool(description = "Export this session's last search and its recommendations as a pretty-printed JSON document with a suggested file name.")]
    async fn export_results(&self) -> Result<Json<ExportResponse>, String> {
        let (query, set) = self
            .submissions
            .lock()
            .await
            .session()
            .load()
            .await
            .map_err(|e| e.to_string())?;
        let document = ExportDocument::new(self.clock.now(), query, set);
        let content = document
            .to_pretty_json()
            .map_err(|e| format!("export failed: {e}"))?;
        Ok(Json(ExportResponse {
            file_name: document.file_name(),
            content,
        }))
    }

    #[tool(description = "Add a tool to favorites, or remove it if it is already there. Returns the new state.")]
    async fn toggle_favorite(
        &self,
        Parameters(params): Parameters<ToolNameParams>,
    ) -> Result<Json<FavoriteResponse>, String> {
        let name = params.name.trim().to_string();
        if name.is_empty() {
            return Err("name must not be empty".to_string());
        }
        let favorite = self.preferences.toggle_favorite(&name).await;
        Ok(Json(FavoriteResponse { name, favorite }))
    }

    #[tool(description = "List favorite tool names in the order they were added.")]
    async fn list_favorites(&self) -> Result<Json<FavoritesResponse>, String> {
        Ok(Json(FavoritesResponse {
            favorites: self.preferences.favorites().await.0,
        }))
    }

    #[tool(description = "Switch between the dark and light theme. Returns the new theme.")]
    async fn toggle_theme(&self) -> Result<Json<ThemeResponse>, String> {
        Ok(Json(ThemeResponse {
            theme: self.preferences.toggle_theme().await,
        }))
    }

    #[tool(description = "Turn comparison mode on or off for this session. Turning it off clears the selection.")]
    async fn toggle_compare_mode(&self) -> Result<Json<ComparisonResponse>, String> {
        self.results.lock().await.toggle_comparison();
        Ok(Json(self.comparison().await))
    }

    #[tool(description = "Select a tool for side-by-side comparison, or deselect it if already selected. At most 3 tools; comparison is ready with 2 or more.")]
    async fn select_for_comparison(
        &self,
        Parameters(params): Parameters<ToolNameParams>,
    ) -> Result<Json<ComparisonResponse>, String> {
        let outcome = self.results.lock().await.select(params.name.trim());
        match outcome {
            SelectOutcome::Selected | SelectOutcome::Deselected => Ok(Json(self.comparison().await)),
            SelectOutcome::LimitReached => Err(format!(
                "Maximum {MAX_COMPARED} tools can be selected for comparison"
            )),
            SelectOutcome::NotComparing => {
                Err("comparison mode is off; call toggle_compare_mode first".to_string())
            }
        }
    }

    #[tool(description = "Get a preset search (research, design, productivity, data) to pass to recommend_tools.")]
    async fn quick_example(
        &self,
        Parameters(params): Parameters<QuickExampleParams>,
    ) -> Result<Json<SearchQuery>, String> {
        Ok(Json(params.example.query()))
    }

    #[tool(description = "Searches per day for the most recent active days, newest first.")]
    async fn get_activity_stats(
        &self,
        Parameters(params): Parameters<ActivityStatsParams>,
    ) -> Result<Json<ActivityStatsResponse>, String> {
        let days = self
            .shared
            .activity
            .daily_activity(params.days.unwrap_or(DEFAULT_ACTIVITY_DAYS))
            .await;
        let total_searches = days.iter().map(|d| d.search_count).sum();
        Ok(Json(ActivityStatsResponse {
            days,
            total_searches,
        }))
    }

    #[tool(description = "Page through recent searches, newest first. At most 50 searches are kept.")]
    async fn get_search_history(
        &self,
        Parameters(params): Parameters<SearchHistoryParams>,
    ) -> Result<Json<SearchHistoryResponse>, String> {
        let page = params.page.unwrap_or(DEFAULT_HISTORY_PAGE).max(1);
        let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if limit == 0 {
            return Err("limit must be at least 1".to_string());
        }
        let entries = self.shared.activity.search_history(page, limit).await;
        Ok(Json(SearchHistoryResponse {
            page,
            limit,
            entries,
        }))
    }
}

#[tool_handler]
impl ServerHandler for EurekaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "eureka".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Eureka recommends AI tools for a use case. Call recommend_tools with a search \
(quick_example returns ready-made ones), then view_results, export_results, and the favorite and \
comparison tools operate on that session's results. build_prompt previews the Gemini prompt. \
Activity is available via get_activity_stats and get_search_history."
                    .to_string(),
            ),
        }
    }
}
