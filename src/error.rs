use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The completion service answered, but not with parseable JSON.
    /// `raw` is the response text exactly as received.
    #[error("AI returned an invalid JSON format{}. Details: {message}", context_suffix(.context))]
    AiInvalidJson {
        context: Option<String>,
        message: String,
        raw: String,
    },

    #[error("AI service error: {0}")]
    Ai(String),
}

fn context_suffix(context: &Option<String>) -> String {
    context
        .as_deref()
        .map(|c| format!(" for {c}"))
        .unwrap_or_default()
}

impl Error {
    /// Raw AI response text for JSON parse failures.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::AiInvalidJson { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
