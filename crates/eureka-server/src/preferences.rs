/// Persisted user preferences.
///
/// Key schema:
/// - `eureka-favorites`: ordered list of favorited tool names
/// - `eureka-theme`: `"dark"` or `"light"` (dark when unset)
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use eureka_core::store::{Record, Repository};

pub const FAVORITES_KEY: &str = "eureka-favorites";
pub const THEME_KEY: &str = "eureka-theme";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteSet(pub Vec<String>);

impl FavoriteSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }
}

impl Record for FavoriteSet {
    const SCHEMA_VERSION: u32 = 1;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl Record for Theme {
    const SCHEMA_VERSION: u32 = 1;
}

/// Clones share one write lock, so toggles from concurrent connections never overwrite
/// each other.
#[derive(Clone)]
pub struct Preferences {
    repo: Repository,
    writes: Arc<Mutex<()>>,
}

impl Preferences {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub async fn favorites(&self) -> FavoriteSet {
        self.repo.get(FAVORITES_KEY).await.unwrap_or_default()
    }

    /// Add `name` if absent, remove it if present. Returns whether it is now a favorite.
    pub async fn toggle_favorite(&self, name: &str) -> bool {
        let _guard = self.writes.lock().await;
        let mut favorites = self.favorites().await;
        let now_favorite = match favorites.0.iter().position(|n| n == name) {
            Some(index) => {
                favorites.0.remove(index);
                false
            }
            None => {
                favorites.0.push(name.to_string());
                true
            }
        };
        if !self.repo.set(FAVORITES_KEY, &favorites).await {
            warn!(name, "failed to persist favorites");
        }
        now_favorite
    }

    pub async fn theme(&self) -> Theme {
        self.repo.get(THEME_KEY).await.unwrap_or_default()
    }

    pub async fn toggle_theme(&self) -> Theme {
        let _guard = self.writes.lock().await;
        let theme = self.theme().await.toggled();
        if !self.repo.set(THEME_KEY, &theme).await {
            warn!(?theme, "failed to persist theme");
        }
        theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use eureka_core::store::MemoryStore;

    fn prefs() -> Preferences {
        Preferences::new(Repository::new(Arc::new(MemoryStore::new())))
    }

    #[tokio::test]
    async fn toggle_favorite_round_trip() {
        let prefs = prefs();
        assert!(prefs.toggle_favorite("Zotero").await);
        assert!(prefs.toggle_favorite("Notion").await);
        assert_eq!(
            prefs.favorites().await,
            FavoriteSet(vec!["Zotero".to_string(), "Notion".to_string()])
        );
        assert!(!prefs.toggle_favorite("Zotero").await);
        let favorites = prefs.favorites().await;
        assert!(!favorites.contains("Zotero"));
        assert!(favorites.contains("Notion"));
    }

    #[tokio::test]
    async fn theme_defaults_to_dark_and_toggles() {
        let prefs = prefs();
        assert_eq!(prefs.theme().await, Theme::Dark);
        assert_eq!(prefs.toggle_theme().await, Theme::Light);
        assert_eq!(prefs.theme().await, Theme::Light);
        assert_eq!(prefs.toggle_theme().await, Theme::Dark);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_toggles_from_many_connections_all_land() {
        let prefs = prefs();
        let tasks: Vec<_> = (0..100)
            .map(|i| {
                let prefs = prefs.clone();
                tokio::spawn(async move { prefs.toggle_favorite(&format!("tool-{i}")).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }
        let favorites = prefs.favorites().await;
        assert_eq!(favorites.0.len(), 100);
        assert!(favorites.contains("tool-0"));
        assert!(favorites.contains("tool-99"));
    }
}
