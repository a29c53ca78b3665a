use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Persistence(#[from] sea_orm::DbErr),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{}", labelled("Not found", .0))]
    NotFound(String),
    #[error("{}", labelled("Invalid parameter", .0))]
    InvalidParameter(String),
    #[error("{}", labelled("Conflict", .0))]
    Conflict(String),
    #[error("{}", labelled("Invalid operation", .0))]
    InvalidOperation(String),
}

impl AppError {
    /// True for failures produced by local validation rather than I/O or storage.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::InvalidParameter(_)
                | AppError::Conflict(_)
                | AppError::InvalidOperation(_)
        )
    }
}

fn labelled(label: &str, message: &str) -> String {
    if message.contains('\n') {
        format!("{label}:\n{message}")
    } else {
        format!("{label}: {message}")
    }
}
