//! Runtime events for monitoring routing activity.
//!
//! Events are notifications about state changes the core has already
//! applied. They're for logging/metrics, not error handling: every failure
//! reported here is also returned to the caller that triggered it.

use std::sync::Arc;

use crate::device::{Direction, LogicalDevice};
use crate::patch::{PatchHandle, PatchType};
use crate::state::{CardStatus, Rotation};
use crate::stream::{IoHandle, StreamRef};

/// Runtime events emitted by a [`HalDevice`](crate::HalDevice).
///
/// # Example
///
/// ```
/// use hal_route::HalEvent;
///
/// fn handle_event(event: HalEvent) {
///     match event {
///         HalEvent::RoutingFailed { io_handle, error } => {
///             eprintln!("routing io {} failed: {}", io_handle, error);
///         }
///         HalEvent::CardStatusChanged { status } => {
///             eprintln!("sound card is now {:?}", status);
///         }
///         other => eprintln!("{:?}", other),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalEvent {
    /// A stream was opened and registered.
    StreamOpened {
        /// Stream direction.
        direction: Direction,
        /// Host I/O handle.
        io_handle: IoHandle,
    },

    /// A stream was closed and unregistered.
    StreamClosed {
        /// Stream direction.
        direction: Direction,
        /// Host I/O handle.
        io_handle: IoHandle,
    },

    /// A close was requested for a stream that is not registered.
    ///
    /// The close is tolerated; this event exists so double closes show up in
    /// monitoring.
    UnknownStreamClosed {
        /// Stream direction.
        direction: Direction,
        /// Public handle that was passed in.
        stream_ref: StreamRef,
    },

    /// A new patch was routed and inserted.
    PatchCreated {
        /// New patch handle.
        handle: PatchHandle,
        /// Shape of the patch.
        patch_type: PatchType,
        /// Mix-side I/O handle.
        io_handle: IoHandle,
    },

    /// An existing patch was re-routed.
    PatchUpdated {
        /// Patch handle.
        handle: PatchHandle,
        /// Shape of the patch after the update.
        patch_type: PatchType,
        /// Mix-side I/O handle.
        io_handle: IoHandle,
    },

    /// A patch was removed from the table.
    PatchReleased {
        /// Released patch handle.
        handle: PatchHandle,
    },

    /// Routing a stream (or the voice path) failed.
    RoutingFailed {
        /// Mix-side I/O handle.
        io_handle: IoHandle,
        /// Description of the error.
        error: String,
    },

    /// The platform reported a sound card status change.
    CardStatusChanged {
        /// New status.
        status: CardStatus,
    },

    /// Speaker orientation was swapped.
    RotationChanged {
        /// New orientation.
        rotation: Rotation,
    },

    /// A device was plugged or unplugged.
    DeviceConnectionChanged {
        /// Device the host reported.
        device: LogicalDevice,
        /// `true` on connect.
        connected: bool,
    },
}

/// Callback type for receiving runtime events.
///
/// Register an event callback via [`HalModuleBuilder::on_event()`].
///
/// [`HalModuleBuilder::on_event()`]: crate::HalModuleBuilder::on_event
///
/// # Example
///
/// ```ignore
/// use hal_route::{HalModule, HalEvent};
///
/// let module = HalModule::builder()
///     .backend(backend)
///     .stream_factory(factory)
///     .on_event(|event| {
///         tracing::info!(?event, "hal event");
///     })
///     .build()?;
/// ```
pub type EventCallback = Arc<dyn Fn(HalEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use hal_route::{event_callback, HalEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(HalEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Fans events out to the registered callback, if any.
#[derive(Clone, Default)]
pub(crate) struct EventSink {
    callback: Option<EventCallback>,
}

impl EventSink {
    pub fn new(callback: Option<EventCallback>) -> Self {
        Self { callback }
    }

    pub fn emit(&self, event: HalEvent) {
        if let Some(callback) = &self.callback {
            callback(event);
        }
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("registered", &self.callback.is_some())
            .finish()
    }
}
