use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures a caller of the pipeline can observe.
///
/// Everything else (a flaky extractor, a weather lookup, the snapshot cache)
/// degrades to documented defaults and is only logged.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Acquisition session unavailable: {0}")]
    SessionUnavailable(String),
}

impl PipelineError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InvalidRequest(_))
    }

    /// HTTP status an outer surface should answer with.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_is_a_client_error() {
        let err = PipelineError::InvalidRequest("Home team and away team are required".into());
        assert!(err.is_client_error());
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn unavailable_session_is_a_server_error() {
        let err = PipelineError::SessionUnavailable("chromium not found".into());
        assert!(!err.is_client_error());
        assert_eq!(err.status_code(), 500);
        assert_eq!(
            err.to_string(),
            "Acquisition session unavailable: chromium not found"
        );
    }
}
