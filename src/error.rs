use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskfleetError {
    #[error("Browser not found: {0}")]
    BrowserNotFound(String),

    #[error("Session already running for profile '{profile_id}'")]
    AlreadyRunning { profile_id: String },

    #[error("Launch timed out: {0}")]
    LaunchTimeout(String),

    #[error("Launch cancelled for profile '{profile_id}'")]
    LaunchCancelled { profile_id: String },

    #[error("Proxy resolution failed: {0}")]
    ProxyResolutionFailed(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Control channel error: {0}")]
    ControlChannel(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MaskfleetError>;
