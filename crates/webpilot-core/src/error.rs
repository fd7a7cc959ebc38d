use thiserror::Error;

/// Errors surfaced by task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task {0} not found")]
    NotFound(String),

    /// The task's current status does not allow the requested transition
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for TaskError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<TaskError>() {
            Ok(task_error) => task_error,
            Err(other) => TaskError::Internal(other),
        }
    }
}

impl TaskError {
    pub fn not_found(id: impl Into<String>) -> Self {
        TaskError::NotFound(id.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        TaskError::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        TaskError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anyhow_roundtrip_keeps_variant() {
        let wrapped: anyhow::Error = TaskError::conflict("Task is already running").into();
        let error = TaskError::from(wrapped);
        assert!(matches!(error, TaskError::Conflict(ref m) if m == "Task is already running"));

        let internal = TaskError::from(anyhow::anyhow!("disk full"));
        assert!(matches!(internal, TaskError::Internal(_)));
        assert_eq!(internal.to_string(), "disk full");
    }
}
