/// Error types for the storage layer shared by the Eureka crates.
///
/// Store operations degrade gracefully and mostly report failure through `Option`/`bool`.
/// These variants exist for the few places that need to explain *why* something failed,
/// such as startup probing. Server-side errors wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis unavailable, degrading gracefully")]
    RedisUnavailable,

    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("record schema mismatch for {key}: stored v{found}, expected v{expected}")]
    SchemaMismatch {
        key: String,
        found: u32,
        expected: u32,
    },
}
