//! Host-facing entry points.

use std::sync::Arc;

use crate::backend::{PlatformBackend, PlatformEvent, PlatformParam, PlatformQuery, PlatformValue};
use crate::device::Direction;
use crate::event::{EventSink, HalEvent};
use crate::module::ModuleParts;
use crate::monitor::DeviceStateMonitor;
use crate::params::{ParameterQuery, ParameterReply, ParameterUpdate, KEY_A2DP_RECONFIG_SUPPORTED};
use crate::patch::{PatchHandle, PortConfig, RoutingCoordinator};
use crate::state::{CardStatus, RoutingSnapshot, SharedRoutingState};
use crate::stats::{HalStats, StatsState};
use crate::stream::{
    AudioConfig, AudioFormat, AudioSource, InputStream, InputStreamRequest, OutputFlags,
    OutputStream, OutputStreamRequest, Stream, StreamFactory, StreamLifecycleObserver,
    StreamRef, StreamRegistry,
};
use crate::voice::{AudioMode, VoiceRouter};
use crate::{HalConfig, HalError};

/// The opened audio device: stream registries, patches and shared state.
///
/// Obtained from [`HalModule::open()`](crate::HalModule::open). Every method
/// may be called concurrently from any thread.
pub struct HalDevice {
    config: HalConfig,
    backend: Arc<dyn PlatformBackend>,
    stream_factory: Arc<dyn StreamFactory>,
    voice: Option<Arc<dyn VoiceRouter>>,
    observers: Vec<Arc<dyn StreamLifecycleObserver>>,
    outputs: Arc<StreamRegistry<dyn OutputStream>>,
    inputs: Arc<StreamRegistry<dyn InputStream>>,
    state: Arc<SharedRoutingState>,
    coordinator: RoutingCoordinator,
    monitor: DeviceStateMonitor,
    stats: Arc<StatsState>,
    events: EventSink,
}

impl HalDevice {
    pub(crate) fn new(parts: &ModuleParts) -> Self {
        let outputs = Arc::new(StreamRegistry::new(Direction::Output));
        let inputs = Arc::new(StreamRegistry::new(Direction::Input));
        let state = Arc::new(SharedRoutingState::new());
        let stats = Arc::new(StatsState::new());
        let events = EventSink::new(parts.event_callback.clone());

        let mut coordinator = RoutingCoordinator::new(
            &parts.config,
            Arc::clone(&outputs),
            Arc::clone(&inputs),
            Arc::clone(&state),
        )
        .with_observability(Arc::clone(&stats), events.clone());
        if let Some(voice) = &parts.voice {
            coordinator = coordinator.with_voice(Arc::clone(voice));
        }

        let monitor = DeviceStateMonitor::new(
            &parts.config,
            Arc::clone(&parts.backend),
            Arc::clone(&state),
        )
        .with_events(events.clone());

        Self {
            config: parts.config.clone(),
            backend: Arc::clone(&parts.backend),
            stream_factory: Arc::clone(&parts.stream_factory),
            voice: parts.voice.clone(),
            observers: parts.observers.clone(),
            outputs,
            inputs,
            state,
            coordinator,
            monitor,
            stats,
            events,
        }
    }

    /// Opens an output stream, or returns the one already open for the I/O handle.
    ///
    /// # Errors
    ///
    /// - [`HalError::NoDevice`] for direct or compress-offload outputs while
    ///   the sound card is offline.
    /// - [`HalError::Backend`] if the stream factory fails.
    pub fn open_output_stream(
        &self,
        request: OutputStreamRequest,
    ) -> Result<Arc<dyn OutputStream>, HalError> {
        tracing::debug!(
            io_handle = %request.io_handle,
            flags = ?request.flags,
            format = ?request.config.format,
            sample_rate = request.config.sample_rate,
            devices = ?request.devices,
            address = %request.address,
            "open output stream"
        );

        if self.state.card_status() == CardStatus::Offline
            && request
                .flags
                .intersects(OutputFlags::COMPRESS_OFFLOAD | OutputFlags::DIRECT)
        {
            tracing::error!(io_handle = %request.io_handle, "sound card offline");
            return Err(HalError::NoDevice {
                reason: "sound card offline".to_string(),
            });
        }

        if let Some(existing) = self.outputs.find_by_io_handle(request.io_handle) {
            tracing::info!(io_handle = %request.io_handle, "reusing output stream");
            return Ok(existing);
        }

        let created = self
            .stream_factory
            .create_output(&request, &self.observers)?;
        let (stream, inserted) = self.outputs.insert_if_absent(created);
        if inserted {
            StatsState::bump(&self.stats.streams_opened);
            self.events.emit(HalEvent::StreamOpened {
                direction: Direction::Output,
                io_handle: request.io_handle,
            });
            if request.flags.contains(OutputFlags::PRIMARY) {
                if let Some(voice) = &self.voice {
                    voice.attach_primary_output(Arc::clone(&stream));
                }
            }
            tracing::info!(
                io_handle = %request.io_handle,
                open = self.outputs.len(),
                "output stream opened"
            );
        }
        Ok(stream)
    }

    /// Opens an input stream, or returns the one already open for the I/O handle.
    ///
    /// # Errors
    ///
    /// - [`HalError::UnsupportedConfig`] with a configuration to retry with
    ///   when the requested format does not suit the capture source.
    /// - [`HalError::Backend`] if the stream factory fails.
    pub fn open_input_stream(
        &self,
        request: InputStreamRequest,
    ) -> Result<Arc<dyn InputStream>, HalError> {
        tracing::debug!(
            io_handle = %request.io_handle,
            source = ?request.source,
            format = ?request.config.format,
            sample_rate = request.config.sample_rate,
            devices = ?request.devices,
            "open input stream"
        );

        self.check_input_config(&request.config, request.source)?;

        if let Some(existing) = self.inputs.find_by_io_handle(request.io_handle) {
            tracing::info!(io_handle = %request.io_handle, "reusing input stream");
            return Ok(existing);
        }

        let created = self.stream_factory.create_input(&request)?;
        let (stream, inserted) = self.inputs.insert_if_absent(created);
        if inserted {
            StatsState::bump(&self.stats.streams_opened);
            self.events.emit(HalEvent::StreamOpened {
                direction: Direction::Input,
                io_handle: request.io_handle,
            });
            tracing::info!(
                io_handle = %request.io_handle,
                open = self.inputs.len(),
                "input stream opened"
            );
        }
        Ok(stream)
    }

    /// Closes an output stream. Unknown streams are logged and ignored.
    pub fn close_output_stream(&self, stream_ref: StreamRef) {
        let Some(stream) = self.outputs.find_by_stream_ref(stream_ref) else {
            self.unknown_close(Direction::Output, stream_ref);
            return;
        };
        let io_handle = stream.io_handle();
        if let Err(err) = self.outputs.remove(&stream) {
            tracing::warn!(error = %err, "output stream already removed");
            return;
        }
        self.closed(Direction::Output, io_handle);
    }

    /// Closes an input stream. Unknown streams are logged and ignored.
    pub fn close_input_stream(&self, stream_ref: StreamRef) {
        let Some(stream) = self.inputs.find_by_stream_ref(stream_ref) else {
            self.unknown_close(Direction::Input, stream_ref);
            return;
        };
        let io_handle = stream.io_handle();
        if let Err(err) = self.inputs.remove(&stream) {
            tracing::warn!(error = %err, "input stream already removed");
            return;
        }
        self.closed(Direction::Input, io_handle);
    }

    /// Creates a patch and returns its handle.
    ///
    /// # Errors
    ///
    /// See [`RoutingCoordinator::create_or_update_patch()`].
    pub async fn create_audio_patch(
        &self,
        sources: &[PortConfig],
        sinks: &[PortConfig],
    ) -> Result<PatchHandle, HalError> {
        let mut handle = PatchHandle::NONE;
        self.coordinator
            .create_or_update_patch(&mut handle, sources, sinks)
            .await?;
        Ok(handle)
    }

    /// Re-routes an existing patch.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidArgument`] for [`PatchHandle::NONE`]; see
    /// [`RoutingCoordinator::create_or_update_patch()`] otherwise.
    pub async fn update_audio_patch(
        &self,
        handle: PatchHandle,
        sources: &[PortConfig],
        sinks: &[PortConfig],
    ) -> Result<(), HalError> {
        if handle.is_none() {
            return Err(HalError::invalid("cannot update the none patch handle"));
        }
        let mut handle = handle;
        self.coordinator
            .create_or_update_patch(&mut handle, sources, sinks)
            .await
    }

    /// Creates or updates a patch depending on `*handle`.
    ///
    /// # Errors
    ///
    /// See [`RoutingCoordinator::create_or_update_patch()`].
    pub async fn create_or_update_patch(
        &self,
        handle: &mut PatchHandle,
        sources: &[PortConfig],
        sinks: &[PortConfig],
    ) -> Result<(), HalError> {
        self.coordinator
            .create_or_update_patch(handle, sources, sinks)
            .await
    }

    /// Releases a patch.
    ///
    /// # Errors
    ///
    /// See [`RoutingCoordinator::release_patch()`].
    pub async fn release_audio_patch(&self, handle: PatchHandle) -> Result<(), HalError> {
        self.coordinator.release_patch(handle).await
    }

    /// Applies host parameters in order.
    ///
    /// The voice path sees the whole batch first. Every update is attempted
    /// even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub fn set_parameters(&self, updates: &[ParameterUpdate]) -> Result<(), HalError> {
        tracing::debug!(count = updates.len(), "set parameters");

        if let Some(voice) = &self.voice {
            if let Err(err) = voice.set_parameters(updates) {
                tracing::error!(error = %err, "voice path rejected parameters");
            }
        }

        let mut first_error = None;
        for update in updates {
            if let Err(err) = self.apply_parameter(update) {
                tracing::error!(parameter = update.name(), error = %err, "parameter failed");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Answers host queries. Queries the backend cannot answer are left out.
    pub fn get_parameters(&self, queries: &[ParameterQuery]) -> ParameterReply {
        let mut reply = ParameterReply::new();
        for query in queries {
            match query {
                ParameterQuery::A2dpReconfigSupported => {
                    match self.backend.get_param(PlatformQuery::A2dpReconfigSupported) {
                        Ok(PlatformValue::A2dpReconfigSupported(supported)) => {
                            tracing::trace!(supported, "a2dp reconfig support");
                            reply.insert_int(KEY_A2DP_RECONFIG_SUPPORTED, i64::from(supported));
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "a2dp reconfig support query failed");
                        }
                    }
                }
            }
        }
        reply
    }

    /// Mutes or unmutes the microphone.
    ///
    /// The flag is recorded even if the voice path rejects it.
    pub fn set_mic_mute(&self, muted: bool) -> Result<(), HalError> {
        self.state.set_mic_muted(muted);
        if let Some(voice) = &self.voice {
            if let Err(err) = voice.set_mic_mute(muted) {
                tracing::warn!(error = %err, muted, "voice path rejected mic mute");
            }
        }
        Ok(())
    }

    /// Microphone mute flag.
    pub fn mic_mute(&self) -> bool {
        self.state.mic_muted()
    }

    /// Sets the voice call volume.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::NotImplemented`] without a voice path, or the
    /// voice path's error.
    pub fn set_voice_volume(&self, volume: f32) -> Result<(), HalError> {
        let voice = self.voice_router("set voice volume")?;
        voice.set_voice_volume(volume)?;
        Ok(())
    }

    /// Switches telephony mode.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::NotImplemented`] without a voice path, or the
    /// voice path's error.
    pub fn set_mode(&self, mode: AudioMode) -> Result<(), HalError> {
        tracing::debug!(?mode, "set mode");
        let voice = self.voice_router("set mode")?;
        voice.set_mode(mode)?;
        Ok(())
    }

    /// Not supported.
    pub fn set_master_volume(&self, _volume: f32) -> Result<(), HalError> {
        Err(HalError::NotImplemented {
            operation: "set master volume",
        })
    }

    /// Not supported.
    pub fn master_volume(&self) -> Result<f32, HalError> {
        Err(HalError::NotImplemented {
            operation: "get master volume",
        })
    }

    /// Not supported.
    pub fn set_master_mute(&self, _muted: bool) -> Result<(), HalError> {
        Err(HalError::NotImplemented {
            operation: "set master mute",
        })
    }

    /// Not supported.
    pub fn master_mute(&self) -> Result<bool, HalError> {
        Err(HalError::NotImplemented {
            operation: "get master mute",
        })
    }

    /// Not supported.
    pub fn microphones(&self) -> Result<Vec<String>, HalError> {
        Err(HalError::NotImplemented {
            operation: "get microphones",
        })
    }

    /// Capture buffer size in bytes for `config`.
    pub fn input_buffer_size(&self, _config: &AudioConfig) -> usize {
        self.config.input_buffer_size
    }

    /// Records the battery charging state and forwards it to the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub fn set_charging(&self, charging: bool) -> Result<(), HalError> {
        self.monitor.set_charging(charging)
    }

    /// Applies a platform event directly, as the registered callback would.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidArgument`] for unknown events.
    pub fn handle_platform_event(&self, event: PlatformEvent) -> Result<(), HalError> {
        self.monitor.handle_platform_event(event)
    }

    /// Current routing counters.
    pub fn stats(&self) -> HalStats {
        self.stats.snapshot()
    }

    /// Copy of the shared routing state.
    pub fn routing_state(&self) -> RoutingSnapshot {
        self.state.snapshot()
    }

    /// Number of open output streams.
    pub fn output_stream_count(&self) -> usize {
        self.outputs.len()
    }

    /// Number of open input streams.
    pub fn input_stream_count(&self) -> usize {
        self.inputs.len()
    }

    /// The patch coordinator.
    pub fn coordinator(&self) -> &RoutingCoordinator {
        &self.coordinator
    }

    /// The device state monitor.
    pub fn monitor(&self) -> &DeviceStateMonitor {
        &self.monitor
    }

    fn apply_parameter(&self, update: &ParameterUpdate) -> Result<(), HalError> {
        tracing::debug!(parameter = update.name(), ?update, "applying parameter");
        let param = match update {
            ParameterUpdate::DeviceConnect { device, address } => {
                return self.monitor.device_connected(*device, *address);
            }
            ParameterUpdate::DeviceDisconnect { device, address } => {
                return self.monitor.device_disconnected(*device, *address);
            }
            ParameterUpdate::Rotation { degrees } => {
                return self.monitor.set_rotation(*degrees);
            }
            ParameterUpdate::ScreenState { on } => PlatformParam::ScreenState { on: *on },
            ParameterUpdate::BtSco { on } => PlatformParam::BtSco { on: *on },
            ParameterUpdate::BtScoWideband { on } => PlatformParam::BtScoWideband { enabled: *on },
            ParameterUpdate::BtScoSuperWideband { mode } => {
                PlatformParam::BtScoSuperWideband { mode: *mode }
            }
            ParameterUpdate::A2dpReconfigure => PlatformParam::A2dpReconfig,
            ParameterUpdate::A2dpSuspended { suspended } => PlatformParam::A2dpSuspended {
                suspended: *suspended,
            },
            ParameterUpdate::TwsChannelMode(mode) => PlatformParam::TwsChannelMode(*mode),
        };
        self.backend.set_param(&param)?;
        Ok(())
    }

    fn check_input_config(&self, config: &AudioConfig, source: AudioSource) -> Result<(), HalError> {
        if !config.format.is_high_resolution() {
            return Ok(());
        }

        let mut suggested = *config;
        if !matches!(source, AudioSource::Unprocessed | AudioSource::Camcorder) {
            suggested.format = AudioFormat::Pcm16Bit;
            suggested.sample_rate = suggested.sample_rate.min(self.config.max_capture_sample_rate);
        } else if !config.format.is_24_bit() {
            suggested.format = AudioFormat::Pcm24BitPacked;
        } else {
            return Ok(());
        }

        tracing::warn!(
            requested = ?config.format,
            suggested = ?suggested.format,
            ?source,
            "input format not supported"
        );
        Err(HalError::UnsupportedConfig { suggested })
    }

    fn voice_router(&self, operation: &'static str) -> Result<&Arc<dyn VoiceRouter>, HalError> {
        self.voice
            .as_ref()
            .ok_or(HalError::NotImplemented { operation })
    }

    fn unknown_close(&self, direction: Direction, stream_ref: StreamRef) {
        tracing::warn!(?direction, stream_ref = stream_ref.raw(), "closing unknown stream");
        self.events.emit(HalEvent::UnknownStreamClosed {
            direction,
            stream_ref,
        });
    }

    fn closed(&self, direction: Direction, io_handle: crate::stream::IoHandle) {
        StatsState::bump(&self.stats.streams_closed);
        tracing::info!(?direction, io_handle = %io_handle, "stream closed");
        self.events.emit(HalEvent::StreamClosed {
            direction,
            io_handle,
        });
    }
}

impl std::fmt::Debug for HalDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HalDevice")
            .field("outputs", &self.outputs.len())
            .field("inputs", &self.inputs.len())
            .field("patches", &self.coordinator.table().len())
            .field("state", &self.state.snapshot())
            .finish()
    }
}
