//! Patch creation, update and release.

use std::sync::Arc;

use super::{Patch, PatchHandle, PatchTable, PatchType, PortConfig, PortType};
use crate::config::HalConfig;
use crate::device::{DeviceIdTranslator, DeviceSet};
use crate::event::{EventSink, HalEvent};
use crate::state::SharedRoutingState;
use crate::stats::StatsState;
use crate::stream::{InputStream, IoHandle, OutputStream, RouteRequest, Stream, StreamRegistry};
use crate::voice::VoiceRouter;
use crate::HalError;

/// The stream a patch routes, resolved from its mix port.
enum PatchStream {
    Output(Arc<dyn OutputStream>),
    Input(Arc<dyn InputStream>),
}

impl PatchStream {
    async fn route(&self, request: &RouteRequest) -> Result<(), crate::BackendError> {
        match self {
            Self::Output(stream) => stream.route_stream(request).await,
            Self::Input(stream) => stream.route_stream(request).await,
        }
    }
}

/// What a validated port list describes.
struct Classified {
    patch_type: PatchType,
    io_handle: IoHandle,
    devices: DeviceSet,
}

/// Creates, updates and releases patches.
///
/// The coordinator resolves the stream behind a patch, translates the
/// patch's devices and asks the stream (and, for playback, the voice path)
/// to re-route. The patch table is only locked around lookups and
/// insertions; routing runs with no lock held.
pub struct RoutingCoordinator {
    max_patch_ports: usize,
    translator: DeviceIdTranslator,
    outputs: Arc<StreamRegistry<dyn OutputStream>>,
    inputs: Arc<StreamRegistry<dyn InputStream>>,
    table: PatchTable,
    state: Arc<SharedRoutingState>,
    voice: Option<Arc<dyn VoiceRouter>>,
    stats: Arc<StatsState>,
    events: EventSink,
}

impl RoutingCoordinator {
    /// Creates a coordinator over the given registries and shared state.
    pub fn new(
        config: &HalConfig,
        outputs: Arc<StreamRegistry<dyn OutputStream>>,
        inputs: Arc<StreamRegistry<dyn InputStream>>,
        state: Arc<SharedRoutingState>,
    ) -> Self {
        Self {
            max_patch_ports: config.max_patch_ports,
            translator: DeviceIdTranslator::new(config.max_streams_per_controller),
            outputs,
            inputs,
            table: PatchTable::new(),
            state,
            voice: None,
            stats: Arc::new(StatsState::new()),
            events: EventSink::default(),
        }
    }

    /// Routes playback through `voice` as well.
    pub fn with_voice(mut self, voice: Arc<dyn VoiceRouter>) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Uses `table` instead of an empty default table.
    pub fn with_table(mut self, table: PatchTable) -> Self {
        self.table = table;
        self
    }

    pub(crate) fn with_observability(mut self, stats: Arc<StatsState>, events: EventSink) -> Self {
        self.stats = stats;
        self.events = events;
        self
    }

    /// The active patches.
    pub fn table(&self) -> &PatchTable {
        &self.table
    }

    /// The device translator in use.
    pub fn translator(&self) -> &DeviceIdTranslator {
        &self.translator
    }

    /// Creates a patch when `*handle` is [`PatchHandle::NONE`], otherwise
    /// re-routes the existing patch.
    ///
    /// A new handle is written to `*handle` before routing. If routing then
    /// fails the patch is discarded but `*handle` keeps the generated value;
    /// the caller must not reuse it.
    ///
    /// # Errors
    ///
    /// - [`HalError::InvalidArgument`] for empty, oversized or multi-source
    ///   port lists, unsupported port shapes, unknown streams or unknown
    ///   handles. Nothing is changed.
    /// - [`HalError::NotImplemented`] for device-to-device patches.
    /// - [`HalError::RoutingFailure`] if the stream or the voice path
    ///   rejected the route. An updated patch keeps its new ports.
    pub async fn create_or_update_patch(
        &self,
        handle: &mut PatchHandle,
        sources: &[PortConfig],
        sinks: &[PortConfig],
    ) -> Result<(), HalError> {
        tracing::debug!(
            handle = %handle,
            sources = sources.len(),
            sinks = sinks.len(),
            "create or update patch"
        );

        self.validate_ports(sources, sinks)?;
        let classified = Self::classify(sources, sinks)?;
        let stream = self.resolve(classified.patch_type, classified.io_handle)?;

        let fresh = if handle.is_none() {
            let patch = self.table.allocate(classified.patch_type, sources, sinks);
            *handle = patch.handle;
            Some(patch)
        } else {
            self.table
                .update(*handle, classified.patch_type, sources, sinks)?;
            None
        };

        let routed = self
            .route(
                classified.patch_type,
                classified.io_handle,
                &stream,
                &classified.devices,
            )
            .await;

        match (routed, fresh) {
            (Err(err), Some(patch)) => {
                tracing::warn!(
                    handle = %patch.handle,
                    io_handle = %classified.io_handle,
                    "discarding new patch after routing failure"
                );
                Err(err)
            }
            (Err(err), None) => Err(err),
            (Ok(()), Some(patch)) => {
                let handle = patch.handle;
                self.table.insert(patch);
                StatsState::bump(&self.stats.patches_created);
                tracing::info!(
                    handle = %handle,
                    patch_type = ?classified.patch_type,
                    io_handle = %classified.io_handle,
                    "patch created"
                );
                self.events.emit(HalEvent::PatchCreated {
                    handle,
                    patch_type: classified.patch_type,
                    io_handle: classified.io_handle,
                });
                Ok(())
            }
            (Ok(()), None) => {
                StatsState::bump(&self.stats.patches_updated);
                tracing::info!(handle = %handle, "patch updated");
                self.events.emit(HalEvent::PatchUpdated {
                    handle: *handle,
                    patch_type: classified.patch_type,
                    io_handle: classified.io_handle,
                });
                Ok(())
            }
        }
    }

    /// Tears a patch's route down and removes it.
    ///
    /// Once the stream is found the patch is removed whatever the teardown
    /// outcome, so the handle never leaks.
    ///
    /// # Errors
    ///
    /// - [`HalError::InvalidArgument`] for [`PatchHandle::NONE`], unknown
    ///   handles or a patch whose stream is gone. Nothing is changed.
    /// - [`HalError::RoutingFailure`] if the teardown was rejected. The
    ///   patch is removed anyway.
    pub async fn release_patch(&self, handle: PatchHandle) -> Result<(), HalError> {
        tracing::debug!(handle = %handle, "release patch");

        if handle.is_none() {
            return Err(HalError::invalid("cannot release the none patch handle"));
        }

        let (patch_type, io_handle) = {
            let patch = self
                .table
                .get(handle)
                .ok_or_else(|| HalError::invalid(format!("patch handle {handle} not found")))?;
            let io_handle = Self::release_io_handle(&patch)?;
            (patch.patch_type, io_handle)
        };

        let stream = self.resolve(patch_type, io_handle)?;
        let teardown = self
            .route(patch_type, io_handle, &stream, &DeviceSet::new())
            .await;

        self.table.remove(handle);
        StatsState::bump(&self.stats.patches_released);
        self.events.emit(HalEvent::PatchReleased { handle });

        match &teardown {
            Ok(()) => tracing::info!(handle = %handle, "patch released"),
            Err(err) => tracing::warn!(
                handle = %handle,
                error = %err,
                "patch released after failed teardown"
            ),
        }
        teardown
    }

    fn validate_ports(&self, sources: &[PortConfig], sinks: &[PortConfig]) -> Result<(), HalError> {
        if sources.is_empty() || sinks.is_empty() {
            return Err(HalError::invalid("a patch needs at least one source and one sink"));
        }
        if sources.len() > self.max_patch_ports || sinks.len() > self.max_patch_ports {
            return Err(HalError::invalid(format!(
                "a patch accepts at most {} ports per side",
                self.max_patch_ports
            )));
        }
        if sources.len() > 1 {
            return Err(HalError::invalid("multiple sources are not supported"));
        }
        Ok(())
    }

    fn classify(sources: &[PortConfig], sinks: &[PortConfig]) -> Result<Classified, HalError> {
        let source = &sources[0];
        match source.port_type() {
            PortType::Device => {
                let sink = &sinks[0];
                let Some(io_handle) = sink.io_handle() else {
                    tracing::error!("device to device patches are not supported");
                    return Err(HalError::NotImplemented {
                        operation: "device to device patch",
                    });
                };
                let devices = source.logical_device().into_iter().collect();
                Ok(Classified {
                    patch_type: PatchType::Capture,
                    io_handle,
                    devices,
                })
            }
            PortType::Mix => {
                let io_handle = source
                    .io_handle()
                    .ok_or_else(|| HalError::invalid("mix source without io handle"))?;
                let devices = sinks
                    .iter()
                    .map(|sink| {
                        sink.logical_device().ok_or_else(|| {
                            HalError::invalid(format!(
                                "playback sink {} is not a device port",
                                sink.id
                            ))
                        })
                    })
                    .collect::<Result<DeviceSet, _>>()?;
                Ok(Classified {
                    patch_type: PatchType::Playback,
                    io_handle,
                    devices,
                })
            }
            PortType::Session | PortType::None => Err(HalError::invalid(format!(
                "unsupported source port type {:?}",
                source.port_type()
            ))),
        }
    }

    fn release_io_handle(patch: &Patch) -> Result<IoHandle, HalError> {
        match patch.sources.first().map(PortConfig::port_type) {
            Some(PortType::Mix | PortType::Device) => patch.mix_io_handle().ok_or_else(|| {
                HalError::invalid(format!("patch {} has no stream", patch.handle))
            }),
            other => Err(HalError::invalid(format!(
                "patch {} has unsupported source port type {:?}",
                patch.handle, other
            ))),
        }
    }

    fn resolve(&self, patch_type: PatchType, io_handle: IoHandle) -> Result<PatchStream, HalError> {
        let stream = match patch_type {
            PatchType::Playback => self
                .outputs
                .find_by_io_handle(io_handle)
                .map(PatchStream::Output),
            PatchType::Capture | PatchType::DeviceLoopback => self
                .inputs
                .find_by_io_handle(io_handle)
                .map(PatchStream::Input),
        };
        stream.ok_or_else(|| {
            tracing::error!(io_handle = %io_handle, "no stream for io handle");
            HalError::invalid(format!("no stream with io handle {io_handle}"))
        })
    }

    async fn route(
        &self,
        patch_type: PatchType,
        io_handle: IoHandle,
        stream: &PatchStream,
        devices: &DeviceSet,
    ) -> Result<(), HalError> {
        let request = RouteRequest {
            devices: devices.clone(),
            platform_devices: self
                .translator
                .translate(devices, self.state.digital_selection()),
        };

        let stream_result = stream.route(&request).await;
        let voice_result = match (&self.voice, patch_type) {
            (Some(voice), PatchType::Playback) => voice.route_stream(&request).await,
            _ => Ok(()),
        };

        let mut first_error = None;
        for (path, result) in [("stream", stream_result), ("voice", voice_result)] {
            if let Err(err) = result {
                tracing::error!(io_handle = %io_handle, path, error = %err, "routing failed");
                StatsState::bump(&self.stats.routing_failures);
                self.events.emit(HalEvent::RoutingFailed {
                    io_handle,
                    error: err.to_string(),
                });
                if first_error.is_none() {
                    first_error = Some(HalError::routing(io_handle, err));
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for RoutingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingCoordinator")
            .field("max_patch_ports", &self.max_patch_ports)
            .field("patches", &self.table.len())
            .field("voice", &self.voice.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Direction, LogicalDevice, PlatformDevice};
    use crate::patch::PortRole;
    use crate::stream::mock::MockStream;
    use crate::stream::StreamRef;
    use crate::voice::mock::MockVoiceRouter;
    use crate::BackendError;

    struct Fixture {
        coordinator: RoutingCoordinator,
        output: Arc<MockStream>,
        input: Arc<MockStream>,
        voice: Arc<MockVoiceRouter>,
    }

    fn fixture() -> Fixture {
        let outputs = Arc::new(StreamRegistry::<dyn OutputStream>::new(Direction::Output));
        let inputs = Arc::new(StreamRegistry::<dyn InputStream>::new(Direction::Input));

        let output = Arc::new(MockStream::output(IoHandle::new(13), StreamRef::new(1)));
        let input = Arc::new(MockStream::input(IoHandle::new(21), StreamRef::new(2)));
        outputs.add(output.clone());
        inputs.add(input.clone());

        let voice = Arc::new(MockVoiceRouter::new());
        let coordinator = RoutingCoordinator::new(
            &HalConfig::default(),
            outputs,
            inputs,
            Arc::new(SharedRoutingState::new()),
        )
        .with_voice(voice.clone());

        Fixture {
            coordinator,
            output,
            input,
            voice,
        }
    }

    fn mix_source(io: i32) -> Vec<PortConfig> {
        vec![PortConfig::mix(PortRole::Source, IoHandle::new(io))]
    }

    fn speaker_sink() -> Vec<PortConfig> {
        vec![PortConfig::device(PortRole::Sink, LogicalDevice::OutSpeaker)]
    }

    #[tokio::test]
    async fn test_create_playback_patch() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;
        f.coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &speaker_sink())
            .await
            .unwrap();

        assert!(!handle.is_none());
        let patch = f.coordinator.table().get(handle).unwrap();
        assert_eq!(patch.patch_type, PatchType::Playback);

        let route = f.output.last_route().unwrap();
        assert_eq!(route.platform_devices, vec![PlatformDevice::OutSpeaker]);
        assert_eq!(f.voice.routes(), vec![route]);
    }

    #[tokio::test]
    async fn test_create_capture_patch_skips_voice() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;
        let sources = vec![PortConfig::device(
            PortRole::Source,
            LogicalDevice::InBuiltinMic,
        )];
        let sinks = vec![PortConfig::mix(PortRole::Sink, IoHandle::new(21))];

        f.coordinator
            .create_or_update_patch(&mut handle, &sources, &sinks)
            .await
            .unwrap();

        assert_eq!(
            f.coordinator.table().get(handle).unwrap().patch_type,
            PatchType::Capture
        );
        assert_eq!(
            f.input.last_route().unwrap().platform_devices,
            vec![PlatformDevice::InHandsetMic]
        );
        assert!(f.voice.routes().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_bad_cardinality() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;

        let err = f
            .coordinator
            .create_or_update_patch(&mut handle, &[], &speaker_sink())
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidArgument { .. }));

        let two_sources = vec![
            PortConfig::mix(PortRole::Source, IoHandle::new(13)),
            PortConfig::mix(PortRole::Source, IoHandle::new(13)),
        ];
        let err = f
            .coordinator
            .create_or_update_patch(&mut handle, &two_sources, &speaker_sink())
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidArgument { .. }));

        let too_many: Vec<_> = (0..17)
            .map(|_| PortConfig::device(PortRole::Sink, LogicalDevice::OutSpeaker))
            .collect();
        let err = f
            .coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &too_many)
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidArgument { .. }));

        assert!(handle.is_none());
        assert!(f.coordinator.table().is_empty());
        assert!(f.output.routes().is_empty());
    }

    #[tokio::test]
    async fn test_device_loopback_not_implemented() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;
        let sources = vec![PortConfig::device(
            PortRole::Source,
            LogicalDevice::InBuiltinMic,
        )];

        let err = f
            .coordinator
            .create_or_update_patch(&mut handle, &sources, &speaker_sink())
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::NotImplemented { .. }));
        assert!(f.coordinator.table().is_empty());
    }

    #[tokio::test]
    async fn test_session_source_rejected() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;
        let sources = vec![PortConfig::session(PortRole::Source, 5)];

        let err = f
            .coordinator
            .create_or_update_patch(&mut handle, &sources, &speaker_sink())
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_playback_sink_must_be_device() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;
        let sinks = vec![PortConfig::mix(PortRole::Sink, IoHandle::new(21))];

        let err = f
            .coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &sinks)
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_unknown_stream_rejected() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;
        let err = f
            .coordinator
            .create_or_update_patch(&mut handle, &mix_source(99), &speaker_sink())
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidArgument { .. }));
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn test_failed_creation_rolls_back() {
        let f = fixture();
        f.output.fail_routes_with(BackendError::rejected(-110));

        let mut handle = PatchHandle::NONE;
        let err = f
            .coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &speaker_sink())
            .await
            .unwrap_err();

        assert!(matches!(err, HalError::RoutingFailure { .. }));
        assert_eq!(err.status_code(), -110);
        // the generated handle is reported but never inserted
        assert!(!handle.is_none());
        assert!(!f.coordinator.table().contains(handle));
        assert!(f.coordinator.table().is_empty());
    }

    #[tokio::test]
    async fn test_voice_failure_fails_creation() {
        let f = fixture();
        f.voice.fail_routes_with(BackendError::custom("voice path down"));

        let mut handle = PatchHandle::NONE;
        let err = f
            .coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &speaker_sink())
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::RoutingFailure { .. }));
        // the stream was still asked to route
        assert_eq!(f.output.routes().len(), 1);
        assert!(f.coordinator.table().is_empty());
    }

    #[tokio::test]
    async fn test_update_existing_patch() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;
        f.coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &speaker_sink())
            .await
            .unwrap();
        let created = handle;

        let headset = vec![PortConfig::device(
            PortRole::Sink,
            LogicalDevice::OutWiredHeadset,
        )];
        f.coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &headset)
            .await
            .unwrap();

        assert_eq!(handle, created);
        assert_eq!(f.coordinator.table().len(), 1);
        assert_eq!(f.coordinator.table().get(handle).unwrap().sinks, headset);
        assert_eq!(
            f.output.last_route().unwrap().platform_devices,
            vec![PlatformDevice::OutWiredHeadset]
        );
    }

    #[tokio::test]
    async fn test_update_unknown_handle() {
        let f = fixture();
        let mut handle = PatchHandle::new(77);
        let err = f
            .coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &speaker_sink())
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidArgument { .. }));
        assert_eq!(handle, PatchHandle::new(77));
        assert!(f.output.routes().is_empty());
    }

    #[tokio::test]
    async fn test_release() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;
        f.coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &speaker_sink())
            .await
            .unwrap();

        f.coordinator.release_patch(handle).await.unwrap();
        assert!(f.coordinator.table().is_empty());
        assert!(f.output.last_route().unwrap().is_teardown());
        assert!(f.voice.routes().last().unwrap().is_teardown());

        let err = f.coordinator.release_patch(handle).await.unwrap_err();
        assert!(matches!(err, HalError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_release_none_and_unknown() {
        let f = fixture();
        assert!(matches!(
            f.coordinator.release_patch(PatchHandle::NONE).await,
            Err(HalError::InvalidArgument { .. })
        ));
        assert!(matches!(
            f.coordinator.release_patch(PatchHandle::new(5)).await,
            Err(HalError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_release_removes_patch_even_if_teardown_fails() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;
        f.coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &speaker_sink())
            .await
            .unwrap();

        f.output.fail_routes_with(BackendError::rejected(-5));
        let err = f.coordinator.release_patch(handle).await.unwrap_err();
        assert!(matches!(err, HalError::RoutingFailure { .. }));
        assert!(!f.coordinator.table().contains(handle));
    }

    #[tokio::test]
    async fn test_release_with_closed_stream_keeps_patch() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;
        f.coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &speaker_sink())
            .await
            .unwrap();

        let stream: Arc<dyn OutputStream> = f.output.clone();
        f.coordinator.outputs.remove(&stream).unwrap();

        let err = f.coordinator.release_patch(handle).await.unwrap_err();
        assert!(matches!(err, HalError::InvalidArgument { .. }));
        assert!(f.coordinator.table().contains(handle));
    }

    #[tokio::test]
    async fn test_stats_follow_lifecycle() {
        let f = fixture();
        let mut handle = PatchHandle::NONE;
        f.coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &speaker_sink())
            .await
            .unwrap();
        f.coordinator
            .create_or_update_patch(&mut handle, &mix_source(13), &speaker_sink())
            .await
            .unwrap();
        f.coordinator.release_patch(handle).await.unwrap();

        let stats = f.coordinator.stats.snapshot();
        assert_eq!(stats.patches_created, 1);
        assert_eq!(stats.patches_updated, 1);
        assert_eq!(stats.patches_released, 1);
        assert_eq!(stats.routing_failures, 0);
    }
}
