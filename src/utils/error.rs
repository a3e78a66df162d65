use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Invalid selector: {selector}")]
    InvalidSelector { selector: String },

    #[error("Bot API error: {method}: {description}")]
    BotApi { method: String, description: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Transient errors are expected to clear up by the next scan.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Http(_) | AppError::Fetch { .. } | AppError::Extraction(_)
        )
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
