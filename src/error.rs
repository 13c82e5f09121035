use crate::notify::Severity;
use thiserror::Error;

/// Failures surfaced by the upload-analyze-persist workflow. Every variant is
/// caught at the controller boundary and rendered as a single modal; nothing
/// here escapes to the caller of the event loop.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Please log in first!")]
    AuthRequired,

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("{0}")]
    AnalysisFailed(String),

    #[error("Unable to delete this file: {0}")]
    DeleteFailed(String),

    #[error("File not found.")]
    NotFound,

    #[error("You do not have permission to view this file.")]
    AccessDenied,
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

impl WorkflowError {
    /// Short modal title for this failure.
    pub fn title(&self) -> &'static str {
        match self {
            WorkflowError::AuthRequired => "Authentication required",
            WorkflowError::UploadFailed(_) => "Upload failed",
            WorkflowError::AnalysisFailed(_) => "Processing error",
            WorkflowError::DeleteFailed(_) => "Delete failed",
            WorkflowError::NotFound => "Not found",
            WorkflowError::AccessDenied => "Access denied",
        }
    }

    /// Modal body: the underlying message without the title restated.
    pub fn user_text(&self) -> String {
        match self {
            WorkflowError::AuthRequired => "Please log in first!".to_string(),
            WorkflowError::UploadFailed(msg)
            | WorkflowError::AnalysisFailed(msg)
            | WorkflowError::DeleteFailed(msg) => msg.clone(),
            WorkflowError::NotFound => "File not found.".to_string(),
            WorkflowError::AccessDenied => {
                "You do not have permission to view this file.".to_string()
            }
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            WorkflowError::AuthRequired | WorkflowError::AccessDenied => Severity::Warning,
            WorkflowError::NotFound => Severity::Info,
            WorkflowError::UploadFailed(_)
            | WorkflowError::AnalysisFailed(_)
            | WorkflowError::DeleteFailed(_) => Severity::Error,
        }
    }
}

/// Object-store outcomes. Delete must distinguish "already absent" from a
/// real backend failure: the former counts as success (the goal is
/// convergence to absent), the latter aborts the whole delete.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),
}
