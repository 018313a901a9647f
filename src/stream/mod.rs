//! Stream abstraction and the per-direction stream registries.
//!
//! Stream objects themselves (buffering, format conversion, the platform
//! session) live outside this crate. The core only needs to find them by
//! handle and ask them to re-route through the [`Stream`] trait.

pub mod mock;
mod registry;

pub use registry::StreamRegistry;

use std::sync::Arc;

use async_trait::async_trait;
use bitflags::bitflags;

use crate::device::{DeviceSet, PlatformDevice};
use crate::BackendError;

/// Host-assigned identifier of an open stream.
///
/// Unique among the concurrently open streams of one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IoHandle(i32);

impl IoHandle {
    /// The "no stream" sentinel.
    pub const NONE: Self = Self(0);

    /// Wraps a raw host handle.
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw host handle.
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for IoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public handle the host holds for an open stream and passes back on close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamRef(u64);

impl StreamRef {
    /// Wraps a raw public handle.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw public handle.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

bitflags! {
    /// Capability flags of an output stream.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct OutputFlags: u32 {
        const DIRECT = 1 << 0;
        const PRIMARY = 1 << 1;
        const FAST = 1 << 2;
        const DEEP_BUFFER = 1 << 3;
        const COMPRESS_OFFLOAD = 1 << 4;
        const NON_BLOCKING = 1 << 5;
        const VOIP_RX = 1 << 11;
    }
}

bitflags! {
    /// Capability flags of an input stream.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct InputFlags: u32 {
        const FAST = 1 << 0;
        const HW_HOTWORD = 1 << 1;
        const RAW = 1 << 2;
        const SYNC = 1 << 3;
        const MMAP_NOIRQ = 1 << 4;
        const VOIP_TX = 1 << 5;
    }
}

/// PCM sample layouts a stream can be opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    /// Signed 16-bit.
    #[default]
    Pcm16Bit,
    /// 24-bit samples in 32-bit containers.
    Pcm8_24Bit,
    /// Packed 24-bit.
    Pcm24BitPacked,
    /// Signed 32-bit.
    Pcm32Bit,
    /// 32-bit float.
    PcmFloat,
}

impl AudioFormat {
    /// Returns `true` for layouts wider than 16 bits.
    pub fn is_high_resolution(self) -> bool {
        !matches!(self, Self::Pcm16Bit)
    }

    /// Returns `true` for the 24-bit layouts capture accepts natively.
    pub fn is_24_bit(self) -> bool {
        matches!(self, Self::Pcm8_24Bit | Self::Pcm24BitPacked)
    }
}

/// Format requested when opening a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Sample layout.
    pub format: AudioFormat,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            format: AudioFormat::Pcm16Bit,
        }
    }
}

/// Capture use case of an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioSource {
    /// No particular use case.
    #[default]
    Default,
    /// Generic microphone capture.
    Mic,
    /// Voice call capture.
    VoiceCall,
    /// Video recording.
    Camcorder,
    /// Speech recognition.
    VoiceRecognition,
    /// VoIP.
    VoiceCommunication,
    /// Capture without platform processing.
    Unprocessed,
    /// FM tuner capture.
    FmTuner,
}

/// A route change handed to [`Stream::route_stream()`].
///
/// An empty request tears the stream's physical route down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRequest {
    /// Logical devices the stream should play to / capture from.
    pub devices: DeviceSet,
    /// The same devices translated for the platform backend.
    pub platform_devices: Vec<PlatformDevice>,
}

impl RouteRequest {
    /// A request that disconnects the stream from every device.
    pub fn teardown() -> Self {
        Self::default()
    }

    /// Returns `true` if this request routes to no device.
    pub fn is_teardown(&self) -> bool {
        self.platform_devices.is_empty()
    }
}

/// A live stream the core can look up and re-route.
///
/// Implementations must be cheap to query: the registries read the handle
/// accessors once at registration, but the coordinator calls
/// [`route_stream()`](Self::route_stream) while no lock is held, so it may
/// take as long as the hardware needs.
#[async_trait]
pub trait Stream: Send + Sync {
    /// Host-assigned I/O handle.
    fn io_handle(&self) -> IoHandle;

    /// Public handle the host holds for this stream.
    fn stream_ref(&self) -> StreamRef;

    /// Devices the stream is currently routed to.
    fn routed_devices(&self) -> DeviceSet;

    /// Moves the stream onto a new set of devices.
    async fn route_stream(&self, route: &RouteRequest) -> Result<(), BackendError>;
}

/// An output (playback) stream.
pub trait OutputStream: Stream {
    /// Flags the stream was opened with.
    fn flags(&self) -> OutputFlags;
}

/// An input (capture) stream.
pub trait InputStream: Stream {
    /// Flags the stream was opened with.
    fn flags(&self) -> InputFlags;

    /// Capture use case.
    fn source(&self) -> AudioSource;
}

/// Optional post-processing hook bound to output streams (visualizer,
/// offload effects bundle).
///
/// Observers are resolved by the host's loader and injected once through
/// [`HalModuleBuilder::observer()`](crate::HalModuleBuilder::observer).
pub trait StreamLifecycleObserver: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Called by the stream when it starts producing audio.
    fn on_output_started(&self, io_handle: IoHandle);

    /// Called by the stream when it stops producing audio.
    fn on_output_stopped(&self, io_handle: IoHandle);
}

/// Parameters of an open-output request.
#[derive(Debug, Clone, Default)]
pub struct OutputStreamRequest {
    /// Host-assigned I/O handle.
    pub io_handle: IoHandle,
    /// Initial devices.
    pub devices: DeviceSet,
    /// Capability flags.
    pub flags: OutputFlags,
    /// Requested format.
    pub config: AudioConfig,
    /// Device address (e.g. a BT MAC or USB card path).
    pub address: String,
}

/// Parameters of an open-input request.
#[derive(Debug, Clone, Default)]
pub struct InputStreamRequest {
    /// Host-assigned I/O handle.
    pub io_handle: IoHandle,
    /// Initial devices.
    pub devices: DeviceSet,
    /// Capability flags.
    pub flags: InputFlags,
    /// Requested format.
    pub config: AudioConfig,
    /// Device address.
    pub address: String,
    /// Capture use case.
    pub source: AudioSource,
}

impl Default for IoHandle {
    fn default() -> Self {
        Self::NONE
    }
}

/// Creates stream objects on behalf of the core.
pub trait StreamFactory: Send + Sync {
    /// Creates an output stream.
    fn create_output(
        &self,
        request: &OutputStreamRequest,
        observers: &[Arc<dyn StreamLifecycleObserver>],
    ) -> Result<Arc<dyn OutputStream>, BackendError>;

    /// Creates an input stream.
    fn create_input(
        &self,
        request: &InputStreamRequest,
    ) -> Result<Arc<dyn InputStream>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_handle_display() {
        assert_eq!(IoHandle::new(29).to_string(), "29");
        assert_eq!(IoHandle::default(), IoHandle::NONE);
    }

    #[test]
    fn test_output_flags() {
        let flags = OutputFlags::PRIMARY | OutputFlags::FAST;
        assert!(flags.contains(OutputFlags::PRIMARY));
        assert!(!flags.intersects(OutputFlags::COMPRESS_OFFLOAD | OutputFlags::DIRECT));
    }

    #[test]
    fn test_teardown_request() {
        assert!(RouteRequest::teardown().is_teardown());
    }

    #[test]
    fn test_format_classes() {
        assert!(AudioFormat::PcmFloat.is_high_resolution());
        assert!(!AudioFormat::Pcm16Bit.is_high_resolution());
        assert!(AudioFormat::Pcm8_24Bit.is_24_bit());
        assert!(!AudioFormat::Pcm32Bit.is_24_bit());
    }

    #[test]
    fn test_stream_traits_are_object_safe() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<Arc<dyn OutputStream>>();
        assert_send_sync::<Arc<dyn InputStream>>();
        assert_send_sync::<Arc<dyn StreamFactory>>();
    }
}
