//! Platform (hardware graph) audio device identifiers.

use super::Direction;

/// An endpoint in the platform's audio device graph.
///
/// Several [`LogicalDevice`](super::LogicalDevice) values can share one
/// platform device. The digital output exists twice: [`OutAuxDigital`] for the
/// first controller/stream and [`OutAuxDigital1`] for every other one.
///
/// [`OutAuxDigital`]: PlatformDevice::OutAuxDigital
/// [`OutAuxDigital1`]: PlatformDevice::OutAuxDigital1
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlatformDevice {
    /// No device.
    None,

    OutHandset,
    OutSpeaker,
    OutWiredHeadset,
    OutWiredHeadphone,
    OutBluetoothSco,
    OutBluetoothA2dp,
    OutAuxDigital,
    OutAuxDigital1,
    OutUsbDevice,
    OutUsbHeadset,
    OutSpdif,
    OutFm,
    OutAuxLine,
    OutProxy,

    InHandsetMic,
    InSpeakerMic,
    InBluetoothScoHeadset,
    InWiredHeadset,
    InAuxDigital,
    InUsbAccessory,
    InUsbHeadset,
    InFmTuner,
    InLine,
    InSpdif,
    InProxy,
}

impl PlatformDevice {
    /// Returns the direction of this device, or `None` for [`PlatformDevice::None`].
    pub fn direction(self) -> Option<Direction> {
        use PlatformDevice::*;
        match self {
            Self::None => Option::None,
            OutHandset | OutSpeaker | OutWiredHeadset | OutWiredHeadphone
            | OutBluetoothSco | OutBluetoothA2dp | OutAuxDigital | OutAuxDigital1
            | OutUsbDevice | OutUsbHeadset | OutSpdif | OutFm | OutAuxLine | OutProxy => {
                Some(Direction::Output)
            }
            InHandsetMic | InSpeakerMic | InBluetoothScoHeadset | InWiredHeadset
            | InAuxDigital | InUsbAccessory | InUsbHeadset | InFmTuner | InLine
            | InSpdif | InProxy => Some(Direction::Input),
        }
    }

    /// Returns `true` for the digital (HDMI / DisplayPort) output class.
    pub fn is_digital_out(self) -> bool {
        self == Self::OutAuxDigital
    }
}
