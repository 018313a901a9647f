//! The voice-call path.
//!
//! Call audio is processed elsewhere; the core only keeps the voice path on
//! the same devices as playback and forwards a few host controls to it.

pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;

use crate::params::ParameterUpdate;
use crate::stream::{OutputStream, RouteRequest};
use crate::BackendError;

/// Telephony mode of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioMode {
    /// No call.
    #[default]
    Normal,
    /// Incoming call ringing.
    Ringtone,
    /// Cellular call.
    InCall,
    /// VoIP call.
    InCommunication,
    /// Call screening.
    CallScreen,
}

/// Routes and controls the voice-call path.
#[async_trait]
pub trait VoiceRouter: Send + Sync {
    /// Moves the voice path onto a new set of devices.
    async fn route_stream(&self, route: &RouteRequest) -> Result<(), BackendError>;

    /// Mutes or unmutes the uplink.
    fn set_mic_mute(&self, muted: bool) -> Result<(), BackendError>;

    /// Sets the downlink volume (0.0 to 1.0).
    fn set_voice_volume(&self, volume: f32) -> Result<(), BackendError>;

    /// Switches telephony mode.
    fn set_mode(&self, mode: AudioMode) -> Result<(), BackendError>;

    /// Sees every host parameter update before the core handles it.
    fn set_parameters(&self, _updates: &[ParameterUpdate]) -> Result<(), BackendError> {
        Ok(())
    }

    /// Receives the primary output stream when it is opened.
    fn attach_primary_output(&self, _stream: Arc<dyn OutputStream>) {}
}
