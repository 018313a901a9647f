//! # hal-route
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Patch and routing core of an audio hardware abstraction layer.
//!
//! `hal-route` sits between an audio policy host and a platform audio
//! backend. The host opens streams and describes *patches* (a mix or device
//! source connected to device sinks); the core validates them, translates
//! logical device identifiers into the backend's device ids and re-routes
//! the affected stream. Device connections, orientation and sound card
//! state are tracked in one shared snapshot that every routing decision
//! reads.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use hal_route::backend::mock::MockBackend;
//! use hal_route::device::LogicalDevice;
//! use hal_route::patch::{PortConfig, PortRole};
//! use hal_route::stream::mock::MockStreamFactory;
//! use hal_route::stream::{IoHandle, OutputStreamRequest};
//! use hal_route::HalModule;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), hal_route::HalError> {
//! let module = HalModule::builder()
//!     .backend(Arc::new(MockBackend::new()))
//!     .stream_factory(Arc::new(MockStreamFactory::new()))
//!     .on_event(|e| tracing::info!(?e, "hal event"))
//!     .build()?;
//!
//! let device = module.open()?;
//! device.open_output_stream(OutputStreamRequest {
//!     io_handle: IoHandle::new(13),
//!     ..Default::default()
//! })?;
//!
//! let handle = device
//!     .create_audio_patch(
//!         &[PortConfig::mix(PortRole::Source, IoHandle::new(13))],
//!         &[PortConfig::device(PortRole::Sink, LogicalDevice::OutSpeaker)],
//!     )
//!     .await?;
//! device.release_audio_patch(handle).await?;
//!
//! module.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **[`HalModule`]**: reference-counted open/close around backend init.
//! - **[`HalDevice`]**: host entry points (streams, patches, parameters).
//! - **[`RoutingCoordinator`]**: patch validation, allocation and routing.
//! - **[`DeviceStateMonitor`]**: connection, rotation and card state.
//! - **[`StreamRegistry`](stream::StreamRegistry)**: open streams per direction.
//!
//! Locks are held only for registry and table bookkeeping, never across a
//! call into a stream, the voice path or the backend.

#![warn(missing_docs)]
// Status codes and device ids cross the i32/u32 boundary of the backend
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

pub mod backend;
mod builder;
mod config;
pub mod device;
mod device_facade;
mod error;
mod event;
mod module;
mod monitor;
pub mod params;
pub mod patch;
pub mod state;
mod stats;
pub mod stream;
pub mod voice;

pub use builder::HalModuleBuilder;
pub use config::{HalConfig, DEFAULT_MAX_PATCH_PORTS};
pub use device_facade::HalDevice;
pub use error::{BackendError, HalError};
pub use event::{event_callback, EventCallback, HalEvent};
pub use module::HalModule;
pub use monitor::DeviceStateMonitor;
pub use patch::{PatchHandle, RoutingCoordinator};
pub use state::{CardStatus, Rotation, SharedRoutingState};
pub use stats::HalStats;
