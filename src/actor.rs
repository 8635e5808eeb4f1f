use std::error::Error as StdError;
use std::fmt;
use tracing::error;
use tracing_error::SpanTrace;

/// Error returned from actor methods, remembering the span it was raised in.
#[derive(Debug)]
pub struct Error {
    source: anyhow::Error,
    span_trace: SpanTrace,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, fmt)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.source()
    }
}

impl From<anyhow::Error> for Error {
    fn from(source: anyhow::Error) -> Self {
        Self {
            source,
            span_trace: SpanTrace::capture(),
        }
    }
}

/// Logs an actor error and keeps the actor running.
pub fn handle_error(error: Box<dyn StdError + Send + Sync>) -> bool {
    let (error, span_trace) = match error.downcast_ref::<Error>() {
        Some(e) => (format!("{:#}", e.source), Some(&e.span_trace)),
        None => (format!("{}", error), None),
    };

    error!(
        "{} SpanTrace: {}",
        error,
        span_trace
            .map(|st| format!("{}", st))
            .unwrap_or_else(|| String::from("None"))
    );

    false
}
