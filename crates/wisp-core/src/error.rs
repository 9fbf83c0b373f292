/// Errors raised by host-side setup (grid validation, launch and runtime configuration).
///
/// Kernel primitives themselves never fail; they follow local-recovery policies instead.
#[derive(Debug, thiserror::Error)]
pub enum WispError {
    #[error("Invalid grid buffer: {0}")]
    InvalidGrid(String),

    #[error("Unsupported grid type {0} (only float grids can be sampled)")]
    UnsupportedGridType(u32),

    #[error("Invalid sampling mode {0}")]
    InvalidSamplingMode(i32),

    #[error("Invalid launch: {0}")]
    InvalidLaunch(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
