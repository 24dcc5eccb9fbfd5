/// Per-connection handoff between the submit step and the results view.
///
/// Two fixed slots, `searchQuery` and `recommendations`, in a store that lives only as long
/// as the connection. The results view treats a missing slot as "start over", not as an error.
use std::sync::Arc;

use eureka_core::store::{MemoryStore, Record, Repository};

use crate::model::{RecommendationSet, SearchQuery};

pub const QUERY_SLOT: &str = "searchQuery";
pub const RECOMMENDATIONS_SLOT: &str = "recommendations";

impl Record for SearchQuery {
    const SCHEMA_VERSION: u32 = 1;
}

impl Record for RecommendationSet {
    const SCHEMA_VERSION: u32 = 1;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no search results in this session")]
pub struct MissingSessionData;

#[derive(Clone)]
pub struct SessionHandoff {
    repo: Repository,
}

impl Default for SessionHandoff {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandoff {
    pub fn new() -> Self {
        Self {
            repo: Repository::new(Arc::new(MemoryStore::new())),
        }
    }

    pub async fn store(&self, query: &SearchQuery, results: &RecommendationSet) {
        self.repo.set(QUERY_SLOT, query).await;
        self.repo.set(RECOMMENDATIONS_SLOT, results).await;
    }

    /// Both slots, or `MissingSessionData` if either is absent or the query has no use case.
    pub async fn load(&self) -> Result<(SearchQuery, RecommendationSet), MissingSessionData> {
        let query: SearchQuery = self.repo.get(QUERY_SLOT).await.ok_or(MissingSessionData)?;
        if query.use_case.trim().is_empty() {
            return Err(MissingSessionData);
        }
        let results = self
            .repo
            .get(RECOMMENDATIONS_SLOT)
            .await
            .ok_or(MissingSessionData)?;
        Ok((query, results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExampleKind;

    #[tokio::test]
    async fn empty_session_is_missing() {
        assert_eq!(SessionHandoff::new().load().await, Err(MissingSessionData));
    }

    #[tokio::test]
    async fn stored_handoff_loads_back() {
        let session = SessionHandoff::new();
        let query = ExampleKind::Research.query();
        let results = RecommendationSet {
            summary: "two picks".to_string(),
            ..Default::default()
        };
        session.store(&query, &results).await;
        assert_eq!(session.load().await, Ok((query, results)));
    }

    #[tokio::test]
    async fn blank_use_case_is_missing() {
        let session = SessionHandoff::new();
        let mut query = ExampleKind::Design.query();
        query.use_case = " ".to_string();
        session.store(&query, &RecommendationSet::default()).await;
        assert_eq!(session.load().await, Err(MissingSessionData));
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let first = SessionHandoff::new();
        first
            .store(&ExampleKind::Data.query(), &RecommendationSet::default())
            .await;
        assert!(first.load().await.is_ok());
        assert_eq!(SessionHandoff::new().load().await, Err(MissingSessionData));
    }
}
