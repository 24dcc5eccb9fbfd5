/// Request lifecycle for one connection:
///
/// ```text
/// Idle -> Submitting -> CacheHit  -> Redirecting
///                    -> CacheMiss -> AwaitingUpstream -> Redirecting
///                                                     -> IdleWithError
/// ```
///
/// `Redirecting` means results are in the session handoff and the caller should show them.
/// `IdleWithError` carries the user-facing message and accepts a new submission.
use std::sync::Arc;

use eureka_core::gemini::GeminiError;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{info, warn};

use crate::activity::ActivityTracker;
use crate::cache::{cache_key, ResultCache};
use crate::model::{RecommendationSet, SearchQuery};
use crate::prompt::build_prompt;
use crate::recommend::RecommendationClient;
use crate::session::SessionHandoff;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit reached. Please try again in a moment.";
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum RequestState {
    Idle,
    Submitting,
    CacheHit,
    CacheMiss,
    AwaitingUpstream,
    Redirecting,
    IdleWithError(String),
}

/// Map a transport failure to what the user sees.
pub fn user_message(err: &GeminiError) -> &'static str {
    if err.is_rate_limited() {
        RATE_LIMIT_MESSAGE
    } else {
        GENERIC_ERROR_MESSAGE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Redirect {
        results: RecommendationSet,
        from_cache: bool,
    },
    Failed {
        message: String,
    },
}

/// Services shared by every connection.
#[derive(Clone)]
pub struct Shared {
    pub client: RecommendationClient,
    pub cache: Arc<ResultCache>,
    pub activity: ActivityTracker,
}

pub struct RecommendationController {
    shared: Shared,
    session: SessionHandoff,
    state: RequestState,
    transitions: Vec<RequestState>,
}

impl RecommendationController {
    pub fn new(shared: Shared) -> Self {
        Self {
            shared,
            session: SessionHandoff::new(),
            state: RequestState::Idle,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// States entered by the latest submission, oldest first.
    pub fn transitions(&self) -> &[RequestState] {
        &self.transitions
    }

    pub fn session(&self) -> &SessionHandoff {
        &self.session
    }

    fn enter(&mut self, state: RequestState) {
        self.transitions.push(state.clone());
        self.state = state;
    }

    /// Run one submission. `&mut self` serializes submissions on a connection.
    pub async fn submit(&mut self, query: SearchQuery) -> SubmitOutcome {
        self.transitions.clear();
        self.enter(RequestState::Submitting);

        let key = cache_key(&query);
        if let Some(results) = self.shared.cache.get(&key).await {
            info!(key, "recommendation cache hit");
            self.enter(RequestState::CacheHit);
            return self.redirect(query, results, true).await;
        }
        self.enter(RequestState::CacheMiss);

        let prompt = build_prompt(&query);
        self.enter(RequestState::AwaitingUpstream);
        match self.shared.client.fetch_recommendations(&prompt).await {
            Ok(results) => {
                self.shared.cache.set(&key, &results).await;
                self.redirect(query, results, false).await
            }
            Err(e) => {
                warn!(error = %e, "error getting recommendations");
                let message = user_message(&e).to_string();
                self.enter(RequestState::IdleWithError(message.clone()));
                SubmitOutcome::Failed { message }
            }
        }
    }

    async fn redirect(
        &mut self,
        query: SearchQuery,
        results: RecommendationSet,
        from_cache: bool,
    ) -> SubmitOutcome {
        self.session.store(&query, &results).await;
        self.shared.activity.record(&query, from_cache).await;
        self.enter(RequestState::Redirecting);
        SubmitOutcome::Redirect {
            results,
            from_cache,
        }
    }
}
