//! Audio patches: port configurations, the patch table and routing.
//!
//! A patch connects one source port to one or more sink ports. Only two
//! shapes are routed: a mix (stream) feeding devices ([`PatchType::Playback`])
//! and a device feeding a mix ([`PatchType::Capture`]).

mod coordinator;
mod handle;
mod table;

pub use coordinator::RoutingCoordinator;
pub use handle::PatchHandleGenerator;
pub use table::PatchTable;

use crate::device::{DeviceSet, LogicalDevice};
use crate::stream::{AudioSource, IoHandle};

/// Host-visible identifier of an active patch.
///
/// Handles are positive; [`PatchHandle::NONE`] asks for a new patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PatchHandle(i32);

impl PatchHandle {
    /// "No patch" sentinel.
    pub const NONE: Self = Self(0);

    /// Wraps a raw handle.
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw handle.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Returns `true` for the sentinel.
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl std::fmt::Display for PatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a port produces or consumes audio within a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRole {
    /// The port feeds the patch.
    Source,
    /// The port is fed by the patch.
    Sink,
}

/// Kind of a port, derived from its [`PortExt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    /// Physical device.
    Device,
    /// Stream mix.
    Mix,
    /// Audio session.
    Session,
    /// Unset.
    None,
}

/// Type-specific part of a port configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortExt {
    /// A physical device endpoint.
    Device {
        /// Logical device of the port.
        device: LogicalDevice,
        /// Device address, empty when not applicable.
        address: String,
    },
    /// A stream mix.
    Mix {
        /// I/O handle of the stream.
        io_handle: IoHandle,
        /// Capture use case, meaningful on capture sinks.
        source: AudioSource,
    },
    /// An audio session.
    Session {
        /// Session id.
        session: i32,
    },
    /// No extension.
    None,
}

/// One endpoint of a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    /// Port id as the host numbers it.
    pub id: i32,
    /// Source or sink.
    pub role: PortRole,
    /// Type-specific data.
    pub ext: PortExt,
}

impl PortConfig {
    /// A device port.
    pub fn device(role: PortRole, device: LogicalDevice) -> Self {
        Self {
            id: 0,
            role,
            ext: PortExt::Device {
                device,
                address: String::new(),
            },
        }
    }

    /// A mix port for the stream with `io_handle`.
    pub fn mix(role: PortRole, io_handle: IoHandle) -> Self {
        Self {
            id: 0,
            role,
            ext: PortExt::Mix {
                io_handle,
                source: AudioSource::Default,
            },
        }
    }

    /// A session port.
    pub fn session(role: PortRole, session: i32) -> Self {
        Self {
            id: 0,
            role,
            ext: PortExt::Session { session },
        }
    }

    /// Sets the host port id.
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = id;
        self
    }

    /// Sets the device address. No effect on non-device ports.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        if let PortExt::Device { address: current, .. } = &mut self.ext {
            *current = address.into();
        }
        self
    }

    /// Sets the capture use case. No effect on non-mix ports.
    pub fn with_source(mut self, source: AudioSource) -> Self {
        if let PortExt::Mix { source: current, .. } = &mut self.ext {
            *current = source;
        }
        self
    }

    /// The port's kind.
    pub fn port_type(&self) -> PortType {
        match self.ext {
            PortExt::Device { .. } => PortType::Device,
            PortExt::Mix { .. } => PortType::Mix,
            PortExt::Session { .. } => PortType::Session,
            PortExt::None => PortType::None,
        }
    }

    /// The logical device, for device ports.
    pub fn logical_device(&self) -> Option<LogicalDevice> {
        match self.ext {
            PortExt::Device { device, .. } => Some(device),
            _ => None,
        }
    }

    /// The stream's I/O handle, for mix ports.
    pub fn io_handle(&self) -> Option<IoHandle> {
        match self.ext {
            PortExt::Mix { io_handle, .. } => Some(io_handle),
            _ => None,
        }
    }
}

/// Shape of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchType {
    /// Stream mix to devices.
    Playback,
    /// Device to stream mix.
    Capture,
    /// Device to device. Never routed.
    DeviceLoopback,
}

/// An active routing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Handle the host refers to this patch by.
    pub handle: PatchHandle,
    /// Shape of the patch.
    pub patch_type: PatchType,
    /// Source ports; always exactly one.
    pub sources: Vec<PortConfig>,
    /// Sink ports.
    pub sinks: Vec<PortConfig>,
}

impl Patch {
    /// The I/O handle of the stream this patch routes.
    ///
    /// Playback uses the source mix, capture the first sink mix. Other shapes
    /// have no stream.
    pub fn mix_io_handle(&self) -> Option<IoHandle> {
        match self.patch_type {
            PatchType::Playback => self.sources.first()?.io_handle(),
            PatchType::Capture => self.sinks.first()?.io_handle(),
            PatchType::DeviceLoopback => None,
        }
    }

    /// Logical devices the patch routes to (playback) or from (capture).
    pub fn devices(&self) -> DeviceSet {
        let ports = match self.patch_type {
            PatchType::Playback => &self.sinks,
            PatchType::Capture | PatchType::DeviceLoopback => &self.sources,
        };
        ports.iter().filter_map(PortConfig::logical_device).collect()
    }
}
