//! Error types for hal-route.
//!
//! Errors are split into two categories:
//! - **Host-facing errors** ([`HalError`]): returned from every entry point on
//!   [`HalDevice`](crate::HalDevice) and convertible to a status code
//! - **Collaborator errors** ([`BackendError`]): raised by the platform backend,
//!   stream objects and the voice router, then wrapped into a [`HalError`]

use crate::stream::{AudioConfig, IoHandle};

/// Negative errno values reported to the host.
mod errno {
    pub const ENOMEM: i32 = 12;
    pub const ENODEV: i32 = 19;
    pub const EINVAL: i32 = 22;
    pub const ENOSYS: i32 = 38;
    pub const EIO: i32 = 5;
}

/// Errors returned by the routing core.
///
/// Validation errors are detected before any shared state is touched, so
/// receiving one of them means nothing changed.
#[derive(Debug, thiserror::Error)]
pub enum HalError {
    /// A handle, port configuration or parameter was malformed or unknown.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the request.
        reason: String,
    },

    /// The requested operation exists but this implementation does not support it.
    #[error("not implemented: {operation}")]
    NotImplemented {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// The sound card is offline and cannot serve the request.
    #[error("no device available: {reason}")]
    NoDevice {
        /// Why no device is available.
        reason: String,
    },

    /// Growing a device id buffer failed.
    #[error("resource exhausted while {context}")]
    ResourceExhausted {
        /// What was being allocated.
        context: &'static str,
    },

    /// The backend rejected a route change for a stream.
    #[error("routing failed for io handle {io_handle}: {source}")]
    RoutingFailure {
        /// Mix-side I/O handle of the stream being routed.
        io_handle: IoHandle,
        /// The backend failure.
        #[source]
        source: BackendError,
    },

    /// The requested input configuration is not supported.
    ///
    /// `suggested` carries the configuration the host should retry with.
    #[error("unsupported input config, retry with {suggested:?}")]
    UnsupportedConfig {
        /// Closest configuration that would be accepted.
        suggested: AudioConfig,
    },

    /// A stream was closed that the registry does not hold.
    #[error("stream with io handle {io_handle} is not registered")]
    StreamNotRegistered {
        /// I/O handle of the stream.
        io_handle: IoHandle,
    },

    /// The platform backend failed outside of stream routing.
    #[error("platform backend error: {0}")]
    Backend(#[from] BackendError),

    /// No platform backend was configured before building the module.
    #[error("no platform backend configured - call backend() before build()")]
    NoBackendConfigured,

    /// No stream factory was configured before building the module.
    #[error("no stream factory configured - call stream_factory() before build()")]
    NoStreamFactoryConfigured,
}

impl HalError {
    /// Creates an invalid argument error with the given reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Creates a routing failure for the given stream.
    pub fn routing(io_handle: IoHandle, source: BackendError) -> Self {
        Self::RoutingFailure { io_handle, source }
    }

    /// Returns the status code reported to the host (a negative errno).
    #[must_use]
    pub fn status_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. }
            | Self::UnsupportedConfig { .. }
            | Self::StreamNotRegistered { .. }
            | Self::NoBackendConfigured
            | Self::NoStreamFactoryConfigured => -errno::EINVAL,
            Self::NotImplemented { .. } => -errno::ENOSYS,
            Self::NoDevice { .. } => -errno::ENODEV,
            Self::ResourceExhausted { .. } => -errno::ENOMEM,
            Self::RoutingFailure { source, .. } | Self::Backend(source) => source.status_code(),
        }
    }
}

/// Errors raised by external collaborators (platform backend, streams, voice).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend rejected the request with a status code.
    #[error("rejected with status {status}")]
    Rejected {
        /// The backend's (negative) status code.
        status: i32,
    },

    /// The backend returned a payload that is too small or malformed.
    #[error("malformed reply: {reason}")]
    MalformedReply {
        /// What was wrong with the reply.
        reason: String,
    },

    /// Custom error for user-implemented collaborators.
    #[error("{0}")]
    Custom(String),
}

impl BackendError {
    /// Creates a custom backend error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Creates a rejection with the given status code.
    pub fn rejected(status: i32) -> Self {
        Self::Rejected { status }
    }

    /// Creates a malformed reply error with the given reason.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedReply {
            reason: reason.into(),
        }
    }

    /// Returns the status code this error maps to.
    #[must_use]
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Rejected { status } if *status < 0 => *status,
            Self::Rejected { .. } | Self::Custom(_) => -errno::EIO,
            Self::MalformedReply { .. } => -errno::EINVAL,
        }
    }
}
