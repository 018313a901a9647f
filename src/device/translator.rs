//! Logical-to-platform device id translation.

use std::collections::HashMap;

use super::{DeviceSet, DigitalOutputSelection, LogicalDevice, PlatformDevice};
use crate::HalError;

/// Static logical → platform mapping, built once per translator.
const DEVICE_MAP: &[(LogicalDevice, PlatformDevice)] = &[
    (LogicalDevice::OutEarpiece, PlatformDevice::OutHandset),
    (LogicalDevice::OutSpeaker, PlatformDevice::OutSpeaker),
    (LogicalDevice::OutWiredHeadset, PlatformDevice::OutWiredHeadset),
    (LogicalDevice::OutWiredHeadphone, PlatformDevice::OutWiredHeadphone),
    (LogicalDevice::OutBluetoothSco, PlatformDevice::OutBluetoothSco),
    (LogicalDevice::OutBluetoothScoHeadset, PlatformDevice::OutBluetoothSco),
    (LogicalDevice::OutBluetoothA2dp, PlatformDevice::OutBluetoothA2dp),
    (LogicalDevice::OutAuxDigital, PlatformDevice::OutAuxDigital),
    (LogicalDevice::OutUsbDevice, PlatformDevice::OutUsbDevice),
    (LogicalDevice::OutTelephonyTx, PlatformDevice::None),
    (LogicalDevice::OutLine, PlatformDevice::OutWiredHeadphone),
    (LogicalDevice::OutSpdif, PlatformDevice::OutSpdif),
    (LogicalDevice::OutFm, PlatformDevice::OutFm),
    (LogicalDevice::OutAuxLine, PlatformDevice::OutAuxLine),
    (LogicalDevice::OutProxy, PlatformDevice::OutProxy),
    (LogicalDevice::OutUsbHeadset, PlatformDevice::OutUsbHeadset),
    (LogicalDevice::OutDefault, PlatformDevice::OutSpeaker),
    (LogicalDevice::InBuiltinMic, PlatformDevice::InHandsetMic),
    (LogicalDevice::InBackMic, PlatformDevice::InSpeakerMic),
    (
        LogicalDevice::InBluetoothScoHeadset,
        PlatformDevice::InBluetoothScoHeadset,
    ),
    (LogicalDevice::InWiredHeadset, PlatformDevice::InWiredHeadset),
    (LogicalDevice::InAuxDigital, PlatformDevice::InAuxDigital),
    (LogicalDevice::InVoiceCall, PlatformDevice::InHandsetMic),
    (LogicalDevice::InUsbAccessory, PlatformDevice::InUsbAccessory),
    (LogicalDevice::InUsbDevice, PlatformDevice::InUsbHeadset),
    (LogicalDevice::InFmTuner, PlatformDevice::InFmTuner),
    (LogicalDevice::InLine, PlatformDevice::InLine),
    (LogicalDevice::InSpdif, PlatformDevice::InSpdif),
    (LogicalDevice::InProxy, PlatformDevice::InProxy),
    (LogicalDevice::InUsbHeadset, PlatformDevice::InUsbHeadset),
];

/// Translates host device sets into platform device ids.
///
/// The mapping itself is static. Two policies sit on top of it:
///
/// - **Digital outputs**: HDMI/DP resolves to [`PlatformDevice::OutAuxDigital1`]
///   whenever the current [`DigitalOutputSelection`] is not controller 0 / stream 0.
/// - **USB headsets**: enabling a USB headset output also needs its input path,
///   see [`augment_for_usb_headset_loopback()`](Self::augment_for_usb_headset_loopback).
///
/// # Example
///
/// ```
/// use hal_route::device::{DeviceIdTranslator, DeviceSet, DigitalOutputSelection};
/// use hal_route::device::{LogicalDevice, PlatformDevice};
///
/// let translator = DeviceIdTranslator::new(2);
/// let devices: DeviceSet = [LogicalDevice::OutSpeaker].into_iter().collect();
///
/// let ids = translator.translate(&devices, DigitalOutputSelection::default());
/// assert_eq!(ids, vec![PlatformDevice::OutSpeaker]);
/// ```
#[derive(Debug, Clone)]
pub struct DeviceIdTranslator {
    map: HashMap<LogicalDevice, PlatformDevice>,
    max_streams_per_controller: i32,
}

impl DeviceIdTranslator {
    /// Builds the translator with the platform's streams-per-controller limit.
    pub fn new(max_streams_per_controller: i32) -> Self {
        Self {
            map: DEVICE_MAP.iter().copied().collect(),
            max_streams_per_controller,
        }
    }

    /// Looks up a single logical device.
    ///
    /// Returns `None` for the sentinel, for unmapped devices and for mappings
    /// whose direction does not match the logical device.
    pub fn lookup(
        &self,
        device: LogicalDevice,
        digital: DigitalOutputSelection,
    ) -> Option<PlatformDevice> {
        if device == LogicalDevice::None {
            return None;
        }

        let platform = *self.map.get(&device)?;
        match (device.direction(), platform.direction()) {
            (Some(logical), Some(physical)) if logical == physical => {}
            _ => return None,
        }

        if platform.is_digital_out() && digital.selects_alternate(self.max_streams_per_controller)
        {
            tracing::debug!(
                controller = digital.controller,
                stream = digital.stream,
                "using alternate digital output"
            );
            return Some(PlatformDevice::OutAuxDigital1);
        }
        Some(platform)
    }

    /// Translates a device set, keeping one slot per input entry.
    ///
    /// Slot `i` holds the platform id of the `i`-th device in set order, or
    /// `None` when that device is the sentinel or has no mapping.
    pub fn translate_aligned(
        &self,
        devices: &DeviceSet,
        digital: DigitalOutputSelection,
    ) -> Vec<Option<PlatformDevice>> {
        devices
            .iter()
            .map(|device| self.lookup(*device, digital))
            .collect()
    }

    /// Translates a device set, dropping entries without a mapping.
    pub fn translate(
        &self,
        devices: &DeviceSet,
        digital: DigitalOutputSelection,
    ) -> Vec<PlatformDevice> {
        let ids: Vec<PlatformDevice> = self
            .translate_aligned(devices, digital)
            .into_iter()
            .flatten()
            .collect();
        tracing::trace!(requested = devices.len(), resolved = ids.len(), "translated devices");
        ids
    }

    /// Appends the USB headset input when a USB headset output is present.
    ///
    /// Returns `true` if the input was appended; the caller then records the
    /// USB input path as enabled.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::ResourceExhausted`] if the buffer cannot grow.
    pub fn augment_for_usb_headset_loopback(
        &self,
        ids: &mut Vec<PlatformDevice>,
    ) -> Result<bool, HalError> {
        if !ids.contains(&PlatformDevice::OutUsbHeadset) {
            return Ok(false);
        }

        ids.try_reserve(1)
            .map_err(|_| HalError::ResourceExhausted {
                context: "appending the usb headset input",
            })?;
        ids.push(PlatformDevice::InUsbHeadset);
        Ok(true)
    }
}
