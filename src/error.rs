use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not replace store file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("movie not found: {title}")]
    NotFound { title: String },

    #[error("movie already exists: {title}")]
    AlreadyExists { title: String },

    #[error("corrupt or unusable source {}: {reason}", path.display())]
    CorruptSource { path: PathBuf, reason: String },

    #[error("title must not be blank")]
    EmptyTitle,

    #[error("rating must be a finite number between 0.0 and 10.0, got {0}")]
    InvalidRating(f64),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn not_found(title: &str) -> Self {
        Self::NotFound {
            title: title.to_string(),
        }
    }

    pub(crate) fn already_exists(title: &str) -> Self {
        Self::AlreadyExists {
            title: title.to_string(),
        }
    }
}
