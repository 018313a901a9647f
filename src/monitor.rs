//! Absorbs platform events and device notifications into the shared state.

use std::sync::{Arc, Weak};

use crate::backend::{DeviceAddress, PlatformBackend, PlatformCallback, PlatformEvent, PlatformParam};
use crate::config::HalConfig;
use crate::device::{DeviceIdTranslator, DeviceSet, Direction, LogicalDevice};
use crate::event::{EventSink, HalEvent};
use crate::state::{Rotation, SharedRoutingState};
use crate::HalError;

/// Keeps [`SharedRoutingState`] in step with the hardware.
///
/// Handles the platform's global callback (card status) and the host's
/// device, rotation and charging notifications, forwarding each to the
/// backend as a typed parameter.
pub struct DeviceStateMonitor {
    backend: Arc<dyn PlatformBackend>,
    state: Arc<SharedRoutingState>,
    translator: DeviceIdTranslator,
    events: EventSink,
}

impl DeviceStateMonitor {
    /// Creates a monitor writing into `state`.
    pub fn new(
        config: &HalConfig,
        backend: Arc<dyn PlatformBackend>,
        state: Arc<SharedRoutingState>,
    ) -> Self {
        Self {
            backend,
            state,
            translator: DeviceIdTranslator::new(config.max_streams_per_controller),
            events: EventSink::default(),
        }
    }

    pub(crate) fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// The state this monitor writes.
    pub fn state(&self) -> &Arc<SharedRoutingState> {
        &self.state
    }

    /// Builds the receiver to register with the backend.
    ///
    /// The callback holds only a weak reference to the state; once the state
    /// is dropped, late events are logged and ignored.
    pub fn platform_callback(&self) -> PlatformCallback {
        let state = Arc::downgrade(&self.state);
        let events = self.events.clone();
        Arc::new(move |event| dispatch_platform_event(&state, &events, event))
    }

    /// Applies a platform event.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidArgument`] for events the core does not handle.
    pub fn handle_platform_event(&self, event: PlatformEvent) -> Result<(), HalError> {
        apply_platform_event(&self.state, &self.events, event)
    }

    /// Normalises a physical orientation and notifies the backend on change.
    ///
    /// 270 degrees means inverted; 0, 90 and 180 mean normal.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidArgument`] for any other angle, or the
    /// backend's error if the notification fails (the new orientation is
    /// kept).
    pub fn set_rotation(&self, degrees: i32) -> Result<(), HalError> {
        let rotation = match degrees {
            270 => Rotation::Inverted,
            0 | 90 | 180 => Rotation::Normal,
            other => {
                tracing::error!(degrees = other, "unexpected rotation");
                return Err(HalError::invalid(format!("unexpected rotation of {other}")));
            }
        };

        if !self.state.update_rotation(rotation) {
            tracing::trace!(degrees, "rotation unchanged");
            return Ok(());
        }

        tracing::debug!(?rotation, "swapping speakers");
        self.events.emit(HalEvent::RotationChanged { rotation });
        self.backend
            .set_param(&PlatformParam::DeviceRotation { rotation })?;
        Ok(())
    }

    /// Handles a device plugged in by the host.
    ///
    /// A USB input connect for the card whose input path is already enabled
    /// is acknowledged without notifying the backend. USB outputs are always
    /// forwarded.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::ResourceExhausted`] if the device id buffer cannot
    /// grow, or the first backend error after every platform device was
    /// notified.
    pub fn device_connected(
        &self,
        device: LogicalDevice,
        address: DeviceAddress,
    ) -> Result<(), HalError> {
        if device == LogicalDevice::None {
            return Ok(());
        }

        if let DeviceAddress::Digital(selection) = address {
            if device.is_digital_out() {
                self.state.set_digital_selection(selection);
                tracing::info!(
                    controller = selection.controller,
                    stream = selection.stream,
                    "digital output plugin"
                );
            }
        }

        let mut ids = self.translate(device);
        let enables_input = self.translator.augment_for_usb_headset_loopback(&mut ids)?;

        match address {
            DeviceAddress::Usb { card, device: num } if device.is_usb() => {
                let direction = if device.is_usb_in() {
                    Direction::Input
                } else {
                    Direction::Output
                };
                // check and enable under one lock
                if !self
                    .state
                    .record_usb_connect(card, num, direction, enables_input)
                {
                    tracing::info!(card, device = num, "usb device already added");
                    return Ok(());
                }
                tracing::info!(card, device = num, "usb plugin");
            }
            _ if enables_input => self.state.set_usb_input_enabled(true),
            _ => {}
        }

        let result = self.notify_connection(&ids, true, address);
        self.events.emit(HalEvent::DeviceConnectionChanged {
            device,
            connected: true,
        });
        result
    }

    /// Handles a device unplugged by the host.
    ///
    /// # Errors
    ///
    /// Returns the first backend error after every platform device was
    /// notified.
    pub fn device_disconnected(
        &self,
        device: LogicalDevice,
        address: DeviceAddress,
    ) -> Result<(), HalError> {
        if device == LogicalDevice::None {
            return Ok(());
        }

        match address {
            DeviceAddress::Usb { card, .. } if device.is_usb_in() => {
                if self.state.record_usb_disconnect(card, Direction::Input) {
                    tracing::info!(card, "usb input path disabled");
                }
            }
            DeviceAddress::Digital(selection) if device.is_digital_out() => {
                self.state.set_digital_selection(selection);
            }
            _ => {}
        }

        let ids = self.translate(device);
        let result = self.notify_connection(&ids, false, address);
        self.events.emit(HalEvent::DeviceConnectionChanged {
            device,
            connected: false,
        });
        result
    }

    /// Records the charging state and forwards it to the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's error; the flag is recorded regardless.
    pub fn set_charging(&self, charging: bool) -> Result<(), HalError> {
        tracing::debug!(charging, "charging state changed");
        self.state.set_charging(charging);
        self.backend
            .set_param(&PlatformParam::ChargingState { charging })
            .map_err(|err| {
                tracing::warn!(error = %err, "backend rejected charging state");
                HalError::from(err)
            })
    }

    fn translate(&self, device: LogicalDevice) -> Vec<crate::device::PlatformDevice> {
        let devices: DeviceSet = [device].into_iter().collect();
        self.translator
            .translate(&devices, self.state.digital_selection())
    }

    fn notify_connection(
        &self,
        ids: &[crate::device::PlatformDevice],
        connected: bool,
        address: DeviceAddress,
    ) -> Result<(), HalError> {
        let mut first_error = None;
        for &id in ids {
            let param = PlatformParam::DeviceConnection {
                device: id,
                connected,
                address,
            };
            match self.backend.set_param(&param) {
                Ok(()) => tracing::info!(device = ?id, connected, "device connection notified"),
                Err(err) => {
                    tracing::error!(device = ?id, connected, error = %err, "device connection rejected");
                    if first_error.is_none() {
                        first_error = Some(HalError::from(err));
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for DeviceStateMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStateMonitor")
            .field("state", &self.state.snapshot())
            .finish()
    }
}

fn dispatch_platform_event(
    state: &Weak<SharedRoutingState>,
    events: &EventSink,
    event: PlatformEvent,
) -> Result<(), HalError> {
    match state.upgrade() {
        Some(state) => apply_platform_event(&state, events, event),
        None => {
            tracing::warn!(?event, "platform event after shutdown dropped");
            Ok(())
        }
    }
}

fn apply_platform_event(
    state: &SharedRoutingState,
    events: &EventSink,
    event: PlatformEvent,
) -> Result<(), HalError> {
    match event {
        PlatformEvent::SoundCardState(status) => {
            let previous = state.set_card_status(status);
            tracing::info!(?previous, ?status, "sound card status changed");
            if previous != status {
                events.emit(HalEvent::CardStatusChanged { status });
            }
            Ok(())
        }
        PlatformEvent::Unknown { id } => {
            tracing::error!(id, "invalid platform event id");
            Err(HalError::invalid(format!("unknown platform event id {id}")))
        }
    }
}
