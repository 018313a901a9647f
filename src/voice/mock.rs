//! Mock voice router for testing.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{AudioMode, VoiceRouter};
use crate::params::ParameterUpdate;
use crate::stream::{IoHandle, OutputStream, RouteRequest, Stream};
use crate::BackendError;

/// A voice router that records what it was told.
#[derive(Default)]
pub struct MockVoiceRouter {
    routes: Mutex<Vec<RouteRequest>>,
    route_failure: Mutex<Option<BackendError>>,
    mic_mute: Mutex<Vec<bool>>,
    volume: Mutex<Option<f32>>,
    mode: Mutex<Option<AudioMode>>,
    updates: Mutex<Vec<ParameterUpdate>>,
    primary_output: Mutex<Option<IoHandle>>,
}

impl MockVoiceRouter {
    /// Creates a router that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following route request fail with `error`.
    pub fn fail_routes_with(&self, error: BackendError) {
        *self.route_failure.lock() = Some(error);
    }

    /// Every route request received.
    pub fn routes(&self) -> Vec<RouteRequest> {
        self.routes.lock().clone()
    }

    /// Every mic mute value received, in order.
    pub fn mic_mute_calls(&self) -> Vec<bool> {
        self.mic_mute.lock().clone()
    }

    /// Last voice volume received.
    pub fn volume(&self) -> Option<f32> {
        *self.volume.lock()
    }

    /// Last mode received.
    pub fn mode(&self) -> Option<AudioMode> {
        *self.mode.lock()
    }

    /// Every parameter update seen.
    pub fn updates(&self) -> Vec<ParameterUpdate> {
        self.updates.lock().clone()
    }

    /// I/O handle of the attached primary output.
    pub fn primary_output(&self) -> Option<IoHandle> {
        *self.primary_output.lock()
    }
}

#[async_trait]
impl VoiceRouter for MockVoiceRouter {
    async fn route_stream(&self, route: &RouteRequest) -> Result<(), BackendError> {
        self.routes.lock().push(route.clone());
        match self.route_failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn set_mic_mute(&self, muted: bool) -> Result<(), BackendError> {
        self.mic_mute.lock().push(muted);
        Ok(())
    }

    fn set_voice_volume(&self, volume: f32) -> Result<(), BackendError> {
        *self.volume.lock() = Some(volume);
        Ok(())
    }

    fn set_mode(&self, mode: AudioMode) -> Result<(), BackendError> {
        *self.mode.lock() = Some(mode);
        Ok(())
    }

    fn set_parameters(&self, updates: &[ParameterUpdate]) -> Result<(), BackendError> {
        self.updates.lock().extend_from_slice(updates);
        Ok(())
    }

    fn attach_primary_output(&self, stream: Arc<dyn OutputStream>) {
        *self.primary_output.lock() = Some(stream.io_handle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_route_failure_is_recorded() {
        let voice = MockVoiceRouter::new();
        voice.fail_routes_with(BackendError::rejected(-5));

        let result = voice.route_stream(&RouteRequest::teardown()).await;
        assert_eq!(result, Err(BackendError::rejected(-5)));
        assert_eq!(voice.routes().len(), 1);
    }

    #[test]
    fn test_controls() {
        let voice = MockVoiceRouter::new();
        voice.set_mic_mute(true).unwrap();
        voice.set_voice_volume(0.5).unwrap();
        voice.set_mode(AudioMode::InCall).unwrap();

        assert_eq!(voice.mic_mute_calls(), vec![true]);
        assert_eq!(voice.volume(), Some(0.5));
        assert_eq!(voice.mode(), Some(AudioMode::InCall));
    }
}
