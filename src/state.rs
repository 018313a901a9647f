//! Routing state shared between the host entry points and platform events.

use parking_lot::Mutex;

use crate::device::{DigitalOutputSelection, Direction};

/// Sound card availability as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardStatus {
    /// The card serves requests.
    #[default]
    Online,
    /// The card is down (e.g. during a DSP restart).
    Offline,
}

impl CardStatus {
    /// Decodes the platform's raw card state (0 offline, anything else online).
    pub fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            Self::Offline
        } else {
            Self::Online
        }
    }
}

/// Speaker orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// Left/right speakers as built.
    #[default]
    Normal,
    /// Left/right speakers swapped (inverted landscape).
    Inverted,
}

/// USB audio address and whether its input path is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbState {
    /// ALSA card number of the last connected USB device, `-1` if none.
    pub card: i32,
    /// ALSA device number of the last connected USB device, `-1` if none.
    pub device: i32,
    /// `true` once the USB headset input path was enabled.
    pub input_enabled: bool,
}

impl Default for UsbState {
    fn default() -> Self {
        Self {
            card: -1,
            device: -1,
            input_enabled: false,
        }
    }
}

/// A copy of every field of [`SharedRoutingState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutingSnapshot {
    /// Sound card availability.
    pub card_status: CardStatus,
    /// Speaker orientation.
    pub rotation: Rotation,
    /// USB address and input path state.
    pub usb: UsbState,
    /// Digital output controller/stream.
    pub digital: DigitalOutputSelection,
    /// Microphone mute.
    pub mic_muted: bool,
    /// Battery charging.
    pub charging: bool,
}

/// Fields written by platform events and parameter updates, read while
/// routing and opening streams.
///
/// One short lock covers all fields. Every method copies in or out and
/// releases it before returning.
#[derive(Debug, Default)]
pub struct SharedRoutingState {
    inner: Mutex<RoutingSnapshot>,
}

impl SharedRoutingState {
    /// Creates the initial state: card online, normal rotation, no USB device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out every field.
    pub fn snapshot(&self) -> RoutingSnapshot {
        *self.inner.lock()
    }

    /// Current card status.
    pub fn card_status(&self) -> CardStatus {
        self.inner.lock().card_status
    }

    /// Stores a card status and returns the previous one.
    pub fn set_card_status(&self, status: CardStatus) -> CardStatus {
        std::mem::replace(&mut self.inner.lock().card_status, status)
    }

    /// Current speaker orientation.
    pub fn rotation(&self) -> Rotation {
        self.inner.lock().rotation
    }

    /// Stores an orientation. Returns `true` if it changed.
    pub fn update_rotation(&self, rotation: Rotation) -> bool {
        let mut inner = self.inner.lock();
        if inner.rotation == rotation {
            return false;
        }
        inner.rotation = rotation;
        true
    }

    /// Current USB state.
    pub fn usb(&self) -> UsbState {
        self.inner.lock().usb
    }

    /// Records a USB connect unless it repeats the enabled card.
    ///
    /// Returns `false` (and changes nothing) for an input device on the
    /// recorded card while its input path is enabled. Otherwise the address
    /// is recorded and, when `enables_input` is set, the input path is marked
    /// enabled under the same lock.
    pub fn record_usb_connect(
        &self,
        card: i32,
        device: i32,
        direction: Direction,
        enables_input: bool,
    ) -> bool {
        let mut inner = self.inner.lock();
        if direction == Direction::Input && inner.usb.input_enabled && inner.usb.card == card {
            return false;
        }
        inner.usb.card = card;
        inner.usb.device = device;
        if enables_input {
            inner.usb.input_enabled = true;
        }
        true
    }

    /// Marks the USB headset input path enabled.
    pub fn set_usb_input_enabled(&self, enabled: bool) {
        self.inner.lock().usb.input_enabled = enabled;
    }

    /// Clears the USB input flag when an input device on the recorded card
    /// goes away.
    ///
    /// Returns `true` if the flag was cleared.
    pub fn record_usb_disconnect(&self, card: i32, direction: Direction) -> bool {
        let mut inner = self.inner.lock();
        if direction == Direction::Input && inner.usb.card == card && inner.usb.input_enabled {
            inner.usb.input_enabled = false;
            return true;
        }
        false
    }

    /// Current digital output selection.
    pub fn digital_selection(&self) -> DigitalOutputSelection {
        self.inner.lock().digital
    }

    /// Stores the digital output selection.
    pub fn set_digital_selection(&self, selection: DigitalOutputSelection) {
        self.inner.lock().digital = selection;
    }

    /// Microphone mute flag.
    pub fn mic_muted(&self) -> bool {
        self.inner.lock().mic_muted
    }

    /// Stores the microphone mute flag.
    pub fn set_mic_muted(&self, muted: bool) {
        self.inner.lock().mic_muted = muted;
    }

    /// Battery charging flag.
    pub fn charging(&self) -> bool {
        self.inner.lock().charging
    }

    /// Stores the battery charging flag.
    pub fn set_charging(&self, charging: bool) {
        self.inner.lock().charging = charging;
    }
}
