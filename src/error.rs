use std::fmt;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stage-tagged failure of one ingestion attempt.
///
/// Every variant counts the same for scrape health; the tag only drives diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid job: {0}")]
    Validation(String),
    #[error("feed fetch failed: {0}")]
    Fetch(#[source] BoxError),
    #[error("feed parse failed: {0}")]
    Parse(#[source] BoxError),
    #[error("persistence failed: {0}")]
    Persistence(#[source] BoxError),
    #[error("activity publish failed: {0}")]
    Publish(#[source] BoxError),
    #[error("enrichment scheduling failed: {0}")]
    Schedule(#[source] BoxError),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Fetch,
    Parse,
    Persistence,
    Publish,
    Schedule,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Fetch => "fetch",
            ErrorKind::Parse => "parse",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Publish => "publish",
            ErrorKind::Schedule => "schedule",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Validation(_) => ErrorKind::Validation,
            IngestError::Fetch(_) => ErrorKind::Fetch,
            IngestError::Parse(_) => ErrorKind::Parse,
            IngestError::Persistence(_) => ErrorKind::Persistence,
            IngestError::Publish(_) => ErrorKind::Publish,
            IngestError::Schedule(_) => ErrorKind::Schedule,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        IngestError::Validation(msg.into())
    }

    pub fn fetch(err: impl Into<BoxError>) -> Self {
        IngestError::Fetch(err.into())
    }

    pub fn parse(err: impl Into<BoxError>) -> Self {
        IngestError::Parse(err.into())
    }

    pub fn persistence(err: impl Into<BoxError>) -> Self {
        IngestError::Persistence(err.into())
    }

    pub fn publish(err: impl Into<BoxError>) -> Self {
        IngestError::Publish(err.into())
    }

    pub fn schedule(err: impl Into<BoxError>) -> Self {
        IngestError::Schedule(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant_and_display_keeps_cause() {
        let err = IngestError::fetch("connection refused");
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert_eq!(err.to_string(), "feed fetch failed: connection refused");

        let err = IngestError::validation("missing url");
        assert_eq!(err.kind().as_str(), "validation");
        assert_eq!(err.to_string(), "invalid job: missing url");
    }

    #[test]
    fn source_is_exposed_for_wrapped_errors() {
        use std::error::Error as _;
        let err = IngestError::publish("503 Service Unavailable");
        assert!(err.source().is_some());
        assert!(IngestError::validation("x").source().is_none());
    }
}
