use eureka_core::error::CommonError;
use eureka_core::gemini::GeminiError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Gemini(#[from] GeminiError),

    #[error("config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use eureka_core::redis::RedisCache;

    #[tokio::test]
    async fn redis_probe_failure_converts_transparently() {
        let err = RedisCache::new(None)
            .probe()
            .await
            .map_err(AppError::from)
            .unwrap_err();
        assert!(matches!(err, AppError::Common(CommonError::RedisUnavailable)));
        assert_eq!(err.to_string(), CommonError::RedisUnavailable.to_string());
    }
}
