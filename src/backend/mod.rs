//! The platform audio backend the core drives.
//!
//! The backend owns the hardware graph. The core only initialises it, pushes
//! typed parameters into it and listens to its global event callback.

pub mod mock;

use std::sync::Arc;

use crate::device::{DigitalOutputSelection, PlatformDevice};
use crate::state::{CardStatus, Rotation};
use crate::{BackendError, HalError};

/// Where a connecting device lives, when the host says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceAddress {
    /// No address information.
    #[default]
    None,
    /// A USB audio device.
    Usb {
        /// ALSA card number.
        card: i32,
        /// ALSA device number.
        device: i32,
    },
    /// A digital (HDMI / DP) output.
    Digital(DigitalOutputSelection),
}

/// Channel layout of a true-wireless-stereo A2DP sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwsChannelMode {
    /// Both earbuds play a mono downmix.
    Mono,
    /// Each earbud plays one channel.
    DualMono,
}

/// A typed parameter pushed into the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformParam {
    /// Display on/off.
    ScreenState {
        /// `true` when the screen is on.
        on: bool,
    },
    /// A platform device was plugged or unplugged.
    DeviceConnection {
        /// The platform device.
        device: PlatformDevice,
        /// `true` on connect.
        connected: bool,
        /// USB or digital address, if any.
        address: DeviceAddress,
    },
    /// Speaker orientation changed.
    DeviceRotation {
        /// New orientation.
        rotation: Rotation,
    },
    /// Bluetooth SCO on/off.
    BtSco {
        /// `true` when SCO is up.
        on: bool,
    },
    /// Bluetooth SCO wideband speech.
    BtScoWideband {
        /// `true` when wideband is enabled.
        enabled: bool,
    },
    /// Bluetooth SCO super-wideband speech mode.
    BtScoSuperWideband {
        /// Codec mode as reported by the host.
        mode: i32,
    },
    /// A2DP needs to be reconfigured.
    A2dpReconfig,
    /// A2DP suspended or resumed.
    A2dpSuspended {
        /// `true` when suspended.
        suspended: bool,
    },
    /// TWS channel layout.
    TwsChannelMode(TwsChannelMode),
    /// Battery charging state.
    ChargingState {
        /// `true` while charging.
        charging: bool,
    },
}

/// A value read from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformQuery {
    /// Whether the A2DP sink supports reconfiguration.
    A2dpReconfigSupported,
}

/// The backend's answer to a [`PlatformQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformValue {
    /// Answer to [`PlatformQuery::A2dpReconfigSupported`].
    A2dpReconfigSupported(bool),
}

/// Asynchronous notifications raised by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The sound card went online or offline.
    SoundCardState(CardStatus),
    /// An event id the core does not handle.
    Unknown {
        /// Raw event id.
        id: u32,
    },
}

/// Receiver for [`PlatformEvent`]s.
///
/// May be invoked on any thread. Unhandled events are rejected with
/// [`HalError::InvalidArgument`].
pub type PlatformCallback = Arc<dyn Fn(PlatformEvent) -> Result<(), HalError> + Send + Sync>;

/// The low-level platform audio backend.
///
/// Calls are blocking and expected to return quickly. None is made while a
/// stream registry, the patch table or the routing state is locked.
/// [`init()`](Self::init), [`deinit()`](Self::deinit) and
/// [`register_global_callback()`](Self::register_global_callback) run under
/// the module's init lock.
pub trait PlatformBackend: Send + Sync {
    /// Brings the backend up. Called on first module open.
    fn init(&self) -> Result<(), BackendError>;

    /// Shuts the backend down. Called on last module close.
    fn deinit(&self);

    /// Pushes a parameter.
    fn set_param(&self, param: &PlatformParam) -> Result<(), BackendError>;

    /// Reads a value.
    fn get_param(&self, query: PlatformQuery) -> Result<PlatformValue, BackendError>;

    /// Installs the receiver for asynchronous platform events.
    fn register_global_callback(&self, callback: PlatformCallback) -> Result<(), BackendError>;
}
