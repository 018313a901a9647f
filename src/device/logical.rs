//! Logical (host-facing) audio device identifiers.

use super::Direction;

/// Bit set on every raw input device code.
const RAW_IN_BIT: u32 = 0x8000_0000;

/// An audio endpoint as the host operating system names it.
///
/// Output and input devices share one enum; [`LogicalDevice::direction()`]
/// tells them apart. The raw integer codes are the ones carried by the host's
/// device-connect parameters.
///
/// # Example
///
/// ```
/// use hal_route::device::{Direction, LogicalDevice};
///
/// let speaker = LogicalDevice::from_raw(0x2).unwrap();
/// assert_eq!(speaker, LogicalDevice::OutSpeaker);
/// assert_eq!(speaker.direction(), Some(Direction::Output));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicalDevice {
    /// "No device" sentinel; routing to it tears a route down.
    None,

    /// Handset earpiece.
    OutEarpiece,
    /// Loudspeaker.
    OutSpeaker,
    /// Wired headset (with microphone).
    OutWiredHeadset,
    /// Wired headphone (no microphone).
    OutWiredHeadphone,
    /// Bluetooth SCO link.
    OutBluetoothSco,
    /// Bluetooth SCO headset.
    OutBluetoothScoHeadset,
    /// Bluetooth SCO car kit.
    OutBluetoothScoCarkit,
    /// Bluetooth A2DP sink.
    OutBluetoothA2dp,
    /// HDMI / DisplayPort output.
    OutAuxDigital,
    /// USB accessory mode.
    OutUsbAccessory,
    /// USB audio device.
    OutUsbDevice,
    /// Remote submix.
    OutRemoteSubmix,
    /// Telephony uplink.
    OutTelephonyTx,
    /// Analog line out.
    OutLine,
    /// S/PDIF output.
    OutSpdif,
    /// FM transmitter.
    OutFm,
    /// Auxiliary line out.
    OutAuxLine,
    /// Proxy (e.g. wireless display) output.
    OutProxy,
    /// USB headset.
    OutUsbHeadset,
    /// Default output.
    OutDefault,

    /// Communication device.
    InCommunication,
    /// Built-in microphone.
    InBuiltinMic,
    /// Bluetooth SCO headset microphone.
    InBluetoothScoHeadset,
    /// Wired headset microphone.
    InWiredHeadset,
    /// HDMI / DisplayPort input.
    InAuxDigital,
    /// Voice call downlink.
    InVoiceCall,
    /// Back microphone.
    InBackMic,
    /// Remote submix.
    InRemoteSubmix,
    /// USB accessory mode.
    InUsbAccessory,
    /// USB audio device.
    InUsbDevice,
    /// FM tuner.
    InFmTuner,
    /// Analog line in.
    InLine,
    /// S/PDIF input.
    InSpdif,
    /// Proxy input.
    InProxy,
    /// USB headset microphone.
    InUsbHeadset,
}

/// Raw host codes, in declaration order.
const RAW_CODES: &[(LogicalDevice, u32)] = &[
    (LogicalDevice::None, 0x0),
    (LogicalDevice::OutEarpiece, 0x1),
    (LogicalDevice::OutSpeaker, 0x2),
    (LogicalDevice::OutWiredHeadset, 0x4),
    (LogicalDevice::OutWiredHeadphone, 0x8),
    (LogicalDevice::OutBluetoothSco, 0x10),
    (LogicalDevice::OutBluetoothScoHeadset, 0x20),
    (LogicalDevice::OutBluetoothScoCarkit, 0x40),
    (LogicalDevice::OutBluetoothA2dp, 0x80),
    (LogicalDevice::OutAuxDigital, 0x400),
    (LogicalDevice::OutUsbAccessory, 0x2000),
    (LogicalDevice::OutUsbDevice, 0x4000),
    (LogicalDevice::OutRemoteSubmix, 0x8000),
    (LogicalDevice::OutTelephonyTx, 0x1_0000),
    (LogicalDevice::OutLine, 0x2_0000),
    (LogicalDevice::OutSpdif, 0x8_0000),
    (LogicalDevice::OutFm, 0x10_0000),
    (LogicalDevice::OutAuxLine, 0x20_0000),
    (LogicalDevice::OutProxy, 0x200_0000),
    (LogicalDevice::OutUsbHeadset, 0x400_0000),
    (LogicalDevice::OutDefault, 0x4000_0000),
    (LogicalDevice::InCommunication, RAW_IN_BIT | 0x1),
    (LogicalDevice::InBuiltinMic, RAW_IN_BIT | 0x4),
    (LogicalDevice::InBluetoothScoHeadset, RAW_IN_BIT | 0x8),
    (LogicalDevice::InWiredHeadset, RAW_IN_BIT | 0x10),
    (LogicalDevice::InAuxDigital, RAW_IN_BIT | 0x20),
    (LogicalDevice::InVoiceCall, RAW_IN_BIT | 0x40),
    (LogicalDevice::InBackMic, RAW_IN_BIT | 0x80),
    (LogicalDevice::InRemoteSubmix, RAW_IN_BIT | 0x100),
    (LogicalDevice::InUsbAccessory, RAW_IN_BIT | 0x800),
    (LogicalDevice::InUsbDevice, RAW_IN_BIT | 0x1000),
    (LogicalDevice::InFmTuner, RAW_IN_BIT | 0x2000),
    (LogicalDevice::InLine, RAW_IN_BIT | 0x8000),
    (LogicalDevice::InSpdif, RAW_IN_BIT | 0x1_0000),
    (LogicalDevice::InProxy, RAW_IN_BIT | 0x100_0000),
    (LogicalDevice::InUsbHeadset, RAW_IN_BIT | 0x200_0000),
];

impl LogicalDevice {
    /// Parses a raw host device code. Unknown codes yield `None`.
    pub fn from_raw(raw: u32) -> Option<Self> {
        RAW_CODES
            .iter()
            .find(|(_, code)| *code == raw)
            .map(|(device, _)| *device)
    }

    /// Returns the raw host device code.
    pub fn raw(self) -> u32 {
        RAW_CODES
            .iter()
            .find(|(device, _)| *device == self)
            .map_or(0, |(_, code)| *code)
    }

    /// Returns the direction of this device, or `None` for the sentinel.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::None => None,
            _ if self.raw() & RAW_IN_BIT != 0 => Some(Direction::Input),
            _ => Some(Direction::Output),
        }
    }

    /// Returns `true` for any USB output device.
    pub fn is_usb_out(self) -> bool {
        matches!(
            self,
            Self::OutUsbAccessory | Self::OutUsbDevice | Self::OutUsbHeadset
        )
    }

    /// Returns `true` for any USB input device.
    pub fn is_usb_in(self) -> bool {
        matches!(
            self,
            Self::InUsbAccessory | Self::InUsbDevice | Self::InUsbHeadset
        )
    }

    /// Returns `true` for any USB device regardless of direction.
    pub fn is_usb(self) -> bool {
        self.is_usb_out() || self.is_usb_in()
    }

    /// Returns `true` for the HDMI / DisplayPort output.
    pub fn is_digital_out(self) -> bool {
        self == Self::OutAuxDigital
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_round_trip_for_known_codes() {
        assert_eq!(LogicalDevice::from_raw(0x2), Some(LogicalDevice::OutSpeaker));
        assert_eq!(LogicalDevice::OutAuxDigital.raw(), 0x400);
        assert_eq!(
            LogicalDevice::from_raw(0x8000_0004),
            Some(LogicalDevice::InBuiltinMic)
        );
    }

    #[test]
    fn test_unknown_raw_code() {
        assert_eq!(LogicalDevice::from_raw(0x3), None);
    }

    #[test]
    fn test_direction() {
        assert_eq!(LogicalDevice::None.direction(), None);
        assert_eq!(
            LogicalDevice::OutUsbHeadset.direction(),
            Some(Direction::Output)
        );
        assert_eq!(
            LogicalDevice::InUsbHeadset.direction(),
            Some(Direction::Input)
        );
    }

    #[test]
    fn test_raw_codes_are_unique() {
        let mut codes: Vec<u32> = RAW_CODES.iter().map(|(_, c)| *c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), RAW_CODES.len());
    }

    #[test]
    fn test_usb_classification() {
        assert!(LogicalDevice::OutUsbHeadset.is_usb_out());
        assert!(LogicalDevice::InUsbDevice.is_usb_in());
        assert!(!LogicalDevice::OutSpeaker.is_usb());
        assert!(LogicalDevice::OutAuxDigital.is_digital_out());
    }
}
