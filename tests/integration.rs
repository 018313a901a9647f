//! Integration tests for hal-route.
//!
//! Everything runs against the mock backend, stream factory and voice path.

use std::sync::Arc;

use hal_route::backend::mock::MockBackend;
use hal_route::backend::{DeviceAddress, PlatformEvent, PlatformParam};
use hal_route::device::{DigitalOutputSelection, Direction, LogicalDevice, PlatformDevice};
use hal_route::params::{ParameterQuery, ParameterUpdate};
use hal_route::patch::{PatchType, PortConfig, PortRole};
use hal_route::stream::mock::MockStreamFactory;
use hal_route::stream::{
    AudioConfig, AudioFormat, AudioSource, InputStreamRequest, IoHandle, OutputFlags,
    OutputStreamRequest, Stream,
};
use hal_route::voice::mock::MockVoiceRouter;
use hal_route::{
    BackendError, CardStatus, HalDevice, HalError, HalEvent, HalModule, PatchHandle, Rotation,
};
use parking_lot::Mutex;

struct Harness {
    module: HalModule,
    device: Arc<HalDevice>,
    backend: Arc<MockBackend>,
    factory: Arc<MockStreamFactory>,
    voice: Arc<MockVoiceRouter>,
    events: Arc<Mutex<Vec<HalEvent>>>,
}

fn harness() -> Harness {
    let backend = Arc::new(MockBackend::new());
    let factory = Arc::new(MockStreamFactory::new());
    let voice = Arc::new(MockVoiceRouter::new());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let module = HalModule::builder()
        .backend(backend.clone())
        .stream_factory(factory.clone())
        .voice_router(voice.clone())
        .on_event(move |event| sink.lock().push(event))
        .build()
        .unwrap();
    let device = module.open().unwrap();

    Harness {
        module,
        device,
        backend,
        factory,
        voice,
        events,
    }
}

fn open_output(device: &HalDevice, io: i32) {
    device
        .open_output_stream(OutputStreamRequest {
            io_handle: IoHandle::new(io),
            ..Default::default()
        })
        .unwrap();
}

fn mix(io: i32) -> PortConfig {
    PortConfig::mix(PortRole::Source, IoHandle::new(io))
}

fn sink(device: LogicalDevice) -> PortConfig {
    PortConfig::device(PortRole::Sink, device)
}

fn connection_params(backend: &MockBackend) -> Vec<(PlatformDevice, bool)> {
    backend
        .params()
        .into_iter()
        .filter_map(|param| match param {
            PlatformParam::DeviceConnection {
                device, connected, ..
            } => Some((device, connected)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_playback_patch_routes_translated_devices() {
    let h = harness();
    open_output(&h.device, 13);

    let handle = h
        .device
        .create_audio_patch(&[mix(13)], &[sink(LogicalDevice::OutSpeaker)])
        .await
        .unwrap();
    assert!(!handle.is_none());

    let stream = h.factory.output(IoHandle::new(13)).unwrap();
    let route = stream.last_route().unwrap();
    assert_eq!(route.platform_devices, vec![PlatformDevice::OutSpeaker]);
    assert_eq!(h.voice.routes().len(), 1);

    let patch = h.device.coordinator().table().get(handle).unwrap();
    assert_eq!(patch.patch_type, PatchType::Playback);
    assert_eq!(patch.mix_io_handle(), Some(IoHandle::new(13)));
}

#[tokio::test]
async fn test_rejected_patches_leave_table_unchanged() {
    let h = harness();
    open_output(&h.device, 13);

    let err = h
        .device
        .create_audio_patch(&[], &[sink(LogicalDevice::OutSpeaker)])
        .await
        .unwrap_err();
    assert!(matches!(err, HalError::InvalidArgument { .. }));

    let err = h
        .device
        .create_audio_patch(&[mix(13), mix(14)], &[sink(LogicalDevice::OutSpeaker)])
        .await
        .unwrap_err();
    assert!(matches!(err, HalError::InvalidArgument { .. }));

    let err = h
        .device
        .create_audio_patch(&[mix(99)], &[sink(LogicalDevice::OutSpeaker)])
        .await
        .unwrap_err();
    assert!(matches!(err, HalError::InvalidArgument { .. }));

    assert!(h.device.coordinator().table().is_empty());
    assert!(h.factory.output(IoHandle::new(13)).unwrap().routes().is_empty());
}

#[tokio::test]
async fn test_failed_route_is_rolled_back() {
    let h = harness();
    open_output(&h.device, 13);
    h.factory
        .output(IoHandle::new(13))
        .unwrap()
        .fail_routes_with(BackendError::rejected(-5));

    let err = h
        .device
        .create_audio_patch(&[mix(13)], &[sink(LogicalDevice::OutSpeaker)])
        .await
        .unwrap_err();
    assert!(matches!(err, HalError::RoutingFailure { .. }));
    assert_eq!(err.status_code(), -5);
    assert!(h.device.coordinator().table().is_empty());
    assert_eq!(h.device.stats().routing_failures, 1);
    assert!(h
        .events
        .lock()
        .iter()
        .any(|event| matches!(event, HalEvent::RoutingFailed { .. })));
}

#[tokio::test]
async fn test_release_tears_down_and_rejects_repeats() {
    let h = harness();
    open_output(&h.device, 13);
    let handle = h
        .device
        .create_audio_patch(&[mix(13)], &[sink(LogicalDevice::OutSpeaker)])
        .await
        .unwrap();

    h.device.release_audio_patch(handle).await.unwrap();
    let stream = h.factory.output(IoHandle::new(13)).unwrap();
    assert!(stream.last_route().unwrap().is_teardown());
    assert!(stream.routed_devices().is_empty());

    let err = h.device.release_audio_patch(handle).await.unwrap_err();
    assert!(matches!(err, HalError::InvalidArgument { .. }));
    let err = h
        .device
        .release_audio_patch(PatchHandle::new(4242))
        .await
        .unwrap_err();
    assert!(matches!(err, HalError::InvalidArgument { .. }));
}

#[tokio::test]
async fn test_release_unknown_handle_keeps_live_patch() {
    let h = harness();
    open_output(&h.device, 13);
    let live = h
        .device
        .create_audio_patch(&[mix(13)], &[sink(LogicalDevice::OutSpeaker)])
        .await
        .unwrap();
    let routes_before = h.factory.output(IoHandle::new(13)).unwrap().routes().len();

    let err = h
        .device
        .release_audio_patch(PatchHandle::new(4242))
        .await
        .unwrap_err();
    assert!(matches!(err, HalError::InvalidArgument { .. }));

    let table = h.device.coordinator().table();
    assert_eq!(table.len(), 1);
    assert!(table.contains(live));
    assert_eq!(
        h.factory.output(IoHandle::new(13)).unwrap().routes().len(),
        routes_before
    );
    assert_eq!(h.device.stats().patches_released, 0);
}

#[tokio::test]
async fn test_update_reroutes_existing_patch() {
    let h = harness();
    open_output(&h.device, 13);
    let handle = h
        .device
        .create_audio_patch(&[mix(13)], &[sink(LogicalDevice::OutSpeaker)])
        .await
        .unwrap();

    h.device
        .update_audio_patch(handle, &[mix(13)], &[sink(LogicalDevice::OutWiredHeadset)])
        .await
        .unwrap();

    let stream = h.factory.output(IoHandle::new(13)).unwrap();
    assert_eq!(
        stream.last_route().unwrap().platform_devices,
        vec![PlatformDevice::OutWiredHeadset]
    );
    assert_eq!(h.device.coordinator().table().len(), 1);
    assert_eq!(h.device.stats().patches_updated, 1);
}

#[tokio::test]
async fn test_capture_patch_routes_input_stream() {
    let h = harness();
    h.device
        .open_input_stream(InputStreamRequest {
            io_handle: IoHandle::new(21),
            source: AudioSource::Mic,
            ..Default::default()
        })
        .unwrap();

    let handle = h
        .device
        .create_audio_patch(
            &[PortConfig::device(PortRole::Source, LogicalDevice::InBuiltinMic)],
            &[PortConfig::mix(PortRole::Sink, IoHandle::new(21))],
        )
        .await
        .unwrap();

    let stream = h.factory.input(IoHandle::new(21)).unwrap();
    assert_eq!(
        stream.last_route().unwrap().platform_devices,
        vec![PlatformDevice::InHandsetMic]
    );
    assert!(h.voice.routes().is_empty());
    assert_eq!(
        h.device.coordinator().table().get(handle).unwrap().patch_type,
        PatchType::Capture
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_patch_creation_yields_unique_handles() {
    let h = harness();
    for io in 1..=16 {
        open_output(&h.device, io);
    }

    let tasks = (1..=16).map(|io| {
        let device = Arc::clone(&h.device);
        tokio::spawn(async move {
            device
                .create_audio_patch(&[mix(io)], &[sink(LogicalDevice::OutSpeaker)])
                .await
        })
    });
    let mut handles: Vec<i32> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().raw())
        .collect();

    handles.sort_unstable();
    handles.dedup();
    assert_eq!(handles.len(), 16);
    assert_eq!(h.device.coordinator().table().len(), 16);
    assert_eq!(h.device.stats().patches_created, 16);
}

#[test]
fn test_rotation_sequence_notifies_only_on_change() {
    let h = harness();
    for degrees in [0, 90, 270, 180] {
        h.device
            .set_parameters(&[ParameterUpdate::Rotation { degrees }])
            .unwrap();
    }

    let rotations: Vec<Rotation> = h
        .backend
        .params()
        .into_iter()
        .filter_map(|param| match param {
            PlatformParam::DeviceRotation { rotation } => Some(rotation),
            _ => None,
        })
        .collect();
    assert_eq!(rotations, vec![Rotation::Inverted, Rotation::Normal]);
    assert_eq!(h.device.routing_state().rotation, Rotation::Normal);
}

#[test]
fn test_usb_input_connect_on_enabled_card_is_deduplicated() {
    let h = harness();
    let address = DeviceAddress::Usb { card: 3, device: 1 };

    h.device
        .set_parameters(&[ParameterUpdate::DeviceConnect {
            device: LogicalDevice::OutUsbHeadset,
            address,
        }])
        .unwrap();
    assert_eq!(
        connection_params(&h.backend),
        vec![
            (PlatformDevice::OutUsbHeadset, true),
            (PlatformDevice::InUsbHeadset, true),
        ]
    );
    let usb = h.device.routing_state().usb;
    assert_eq!((usb.card, usb.device, usb.input_enabled), (3, 1, true));

    h.backend.clear_params();
    h.device
        .set_parameters(&[ParameterUpdate::DeviceConnect {
            device: LogicalDevice::InUsbHeadset,
            address,
        }])
        .unwrap();
    assert!(connection_params(&h.backend).is_empty());

    // outputs on the enabled card still reach the backend
    h.device
        .set_parameters(&[ParameterUpdate::DeviceConnect {
            device: LogicalDevice::OutUsbDevice,
            address,
        }])
        .unwrap();
    assert_eq!(
        connection_params(&h.backend),
        vec![(PlatformDevice::OutUsbDevice, true)]
    );

    h.device
        .set_parameters(&[ParameterUpdate::DeviceDisconnect {
            device: LogicalDevice::OutUsbHeadset,
            address,
        }])
        .unwrap();
    assert!(h.device.routing_state().usb.input_enabled);

    h.device
        .set_parameters(&[ParameterUpdate::DeviceDisconnect {
            device: LogicalDevice::InUsbHeadset,
            address,
        }])
        .unwrap();
    assert!(!h.device.routing_state().usb.input_enabled);
}

#[test]
fn test_offline_card_blocks_offload_outputs_only() {
    let h = harness();
    h.backend
        .raise(PlatformEvent::SoundCardState(CardStatus::Offline))
        .unwrap();
    assert_eq!(h.device.routing_state().card_status, CardStatus::Offline);

    let err = h
        .device
        .open_output_stream(OutputStreamRequest {
            io_handle: IoHandle::new(13),
            flags: OutputFlags::COMPRESS_OFFLOAD,
            ..Default::default()
        })
        .err().expect("expected open_output_stream to fail");
    assert!(matches!(err, HalError::NoDevice { .. }));

    open_output(&h.device, 14);
    assert_eq!(h.device.output_stream_count(), 1);

    h.backend
        .raise(PlatformEvent::SoundCardState(CardStatus::Online))
        .unwrap();
    h.device
        .open_output_stream(OutputStreamRequest {
            io_handle: IoHandle::new(13),
            flags: OutputFlags::COMPRESS_OFFLOAD,
            ..Default::default()
        })
        .unwrap();
    assert!(h
        .events
        .lock()
        .contains(&HalEvent::CardStatusChanged {
            status: CardStatus::Online
        }));
}

#[tokio::test]
async fn test_digital_selection_picks_alternate_output() {
    let h = harness();
    h.device
        .set_parameters(&[ParameterUpdate::DeviceConnect {
            device: LogicalDevice::OutAuxDigital,
            address: DeviceAddress::Digital(DigitalOutputSelection::new(1, 0)),
        }])
        .unwrap();
    assert_eq!(
        connection_params(&h.backend),
        vec![(PlatformDevice::OutAuxDigital1, true)]
    );

    open_output(&h.device, 13);
    h.device
        .create_audio_patch(&[mix(13)], &[sink(LogicalDevice::OutAuxDigital)])
        .await
        .unwrap();
    let stream = h.factory.output(IoHandle::new(13)).unwrap();
    assert_eq!(
        stream.last_route().unwrap().platform_devices,
        vec![PlatformDevice::OutAuxDigital1]
    );
}

#[test]
fn test_stream_open_close_events() {
    let h = harness();
    open_output(&h.device, 13);
    let stream = h.factory.output(IoHandle::new(13)).unwrap();

    h.device.close_output_stream(stream.stream_ref());
    h.device.close_output_stream(stream.stream_ref());

    let events = h.events.lock().clone();
    assert!(events.contains(&HalEvent::StreamOpened {
        direction: Direction::Output,
        io_handle: IoHandle::new(13),
    }));
    assert!(events.contains(&HalEvent::StreamClosed {
        direction: Direction::Output,
        io_handle: IoHandle::new(13),
    }));
    assert!(events
        .iter()
        .any(|event| matches!(event, HalEvent::UnknownStreamClosed { .. })));
    assert_eq!(h.device.stats().streams_closed, 1);
}

#[test]
fn test_input_format_suggestion() {
    let h = harness();
    let err = h
        .device
        .open_input_stream(InputStreamRequest {
            io_handle: IoHandle::new(21),
            source: AudioSource::VoiceRecognition,
            config: AudioConfig {
                sample_rate: 192_000,
                channels: 1,
                format: AudioFormat::Pcm32Bit,
            },
            ..Default::default()
        })
        .err().expect("expected open_input_stream to fail");

    match err {
        HalError::UnsupportedConfig { suggested } => {
            assert_eq!(suggested.format, AudioFormat::Pcm16Bit);
            assert_eq!(suggested.sample_rate, 48_000);
            assert_eq!(suggested.channels, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.device.input_stream_count(), 0);
}

#[test]
fn test_get_parameters_renders_reply() {
    let h = harness();
    let reply = h
        .device
        .get_parameters(&[ParameterQuery::A2dpReconfigSupported]);
    assert_eq!(reply.to_kv_string(), "isReconfigA2dpSupported=1");
}

#[test]
fn test_module_close_drops_platform_callback_state() {
    let h = harness();
    let Harness {
        module,
        device,
        backend,
        ..
    } = h;

    module.close().unwrap();
    assert_eq!(backend.deinit_calls(), 1);
    drop(device);

    let result = backend.raise(PlatformEvent::SoundCardState(CardStatus::Offline));
    assert!(result.is_ok());
}
