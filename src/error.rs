//! Unified error types.

use std::fmt;

/// Boxed error returned by middleware stages.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by strata's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding to a port, accepting a connection, or
/// reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("invalid value `{value}` for {key}")]
    Config { key: &'static str, value: String },
}

/// The pipeline stage a middleware fault happened in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Before,
    After,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::After => f.write_str("after"),
        }
    }
}

/// A failure caught at the pipeline boundary.
///
/// Faults are logged and turned into a fresh `500` response. They never
/// reach the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error("middleware `{middleware}` failed in {stage} stage: {source}")]
    Middleware {
        middleware: &'static str,
        stage: Stage,
        #[source]
        source: BoxError,
    },

    #[error("endpoint failed: {0}")]
    Upstream(#[source] BoxError),
}

/// A caught panic, carried as an error.
#[derive(Debug, thiserror::Error)]
#[error("panicked: {0}")]
pub(crate) struct Panic(String);

impl Panic {
    pub(crate) fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_owned()
        };
        Self(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_display_names_middleware_and_stage() {
        let fault = Fault::Middleware {
            middleware: "compression",
            stage: Stage::After,
            source: "encoder closed".into(),
        };
        assert_eq!(
            fault.to_string(),
            "middleware `compression` failed in after stage: encoder closed",
        );
    }

    #[test]
    fn panic_payload_keeps_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("boom"));
        assert_eq!(Panic::from_payload(payload).to_string(), "panicked: boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(
            Panic::from_payload(payload).to_string(),
            "panicked: unknown panic payload",
        );
    }
}
