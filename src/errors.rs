use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("SSE parsing error: {0}")]
    SseParsing(String),

    #[error("Perception error: {0}")]
    Perception(String),

    #[error("Grounding error: {0}")]
    Grounding(String),

    /// The grounding backend never produced a parseable coordinate pair.
    #[error("Cannot ground \"{reference}\" after {attempts} attempts")]
    GroundingExhausted { reference: String, attempts: u32 },

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Environment {operation} failed after {attempts} retries due to timeouts")]
    EnvironmentTimeout { operation: String, attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type ArenaResult<T> = Result<T, ArenaError>;
