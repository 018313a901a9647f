//! Patch walkthrough example.
//!
//! Opens the routing core against mock collaborators, connects a USB headset,
//! routes a playback stream to it and back to the speaker, then releases
//! everything.
//!
//! Run with: RUST_LOG=hal_route=debug cargo run --example patch_walkthrough

use std::sync::Arc;

use hal_route::backend::mock::MockBackend;
use hal_route::backend::DeviceAddress;
use hal_route::device::LogicalDevice;
use hal_route::params::{ParameterQuery, ParameterUpdate};
use hal_route::patch::{PortConfig, PortRole};
use hal_route::stream::mock::MockStreamFactory;
use hal_route::stream::{IoHandle, OutputFlags, OutputStreamRequest, StreamLifecycleObserver};
use hal_route::voice::mock::MockVoiceRouter;
use hal_route::HalModule;
use tracing_subscriber::EnvFilter;

/// Prints when a stream starts or stops producing audio.
struct PrintingObserver;

impl StreamLifecycleObserver for PrintingObserver {
    fn name(&self) -> &str {
        "printer"
    }

    fn on_output_started(&self, io_handle: IoHandle) {
        println!("  [observer] output {io_handle} started");
    }

    fn on_output_stopped(&self, io_handle: IoHandle) {
        println!("  [observer] output {io_handle} stopped");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let backend = Arc::new(MockBackend::new());
    let factory = Arc::new(MockStreamFactory::new());

    let module = HalModule::builder()
        .backend(backend.clone())
        .stream_factory(factory.clone())
        .voice_router(Arc::new(MockVoiceRouter::new()))
        .observer(Arc::new(PrintingObserver))
        .on_event(|event| println!("  [event] {event:?}"))
        .build()?;
    let device = module.open()?;

    println!("Connecting USB headset on card 3, device 1...");
    device.set_parameters(&[ParameterUpdate::DeviceConnect {
        device: LogicalDevice::OutUsbHeadset,
        address: DeviceAddress::Usb { card: 3, device: 1 },
    }])?;

    println!("Opening primary output 13...");
    let io_handle = IoHandle::new(13);
    device.open_output_stream(OutputStreamRequest {
        io_handle,
        flags: OutputFlags::PRIMARY,
        ..Default::default()
    })?;

    let source = [PortConfig::mix(PortRole::Source, io_handle)];
    let handle = device
        .create_audio_patch(
            &source,
            &[PortConfig::device(PortRole::Sink, LogicalDevice::OutUsbHeadset)],
        )
        .await?;
    println!("Patch {handle} routes output 13 to the USB headset");

    device
        .update_audio_patch(
            handle,
            &source,
            &[PortConfig::device(PortRole::Sink, LogicalDevice::OutSpeaker)],
        )
        .await?;
    if let Some(stream) = factory.output(io_handle) {
        println!("Now routed to {:?}", stream.last_route().map(|r| r.platform_devices));
    }

    device.release_audio_patch(handle).await?;

    let reply = device.get_parameters(&[ParameterQuery::A2dpReconfigSupported]);
    println!("Parameters: {}", reply.to_kv_string());
    println!("Backend saw {} parameter calls", backend.params().len());
    println!("Stats: {:?}", device.stats());

    module.close()?;
    Ok(())
}
