//! Mock streams for testing without a platform backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    AudioSource, InputFlags, InputStream, InputStreamRequest, IoHandle, OutputFlags,
    OutputStream, OutputStreamRequest, RouteRequest, Stream, StreamFactory,
    StreamLifecycleObserver, StreamRef,
};
use crate::device::{DeviceSet, Direction};
use crate::BackendError;

/// A stream that records every route request it receives.
///
/// Route failures can be injected with [`fail_routes_with()`](Self::fail_routes_with).
///
/// # Example
///
/// ```
/// use hal_route::stream::mock::MockStream;
/// use hal_route::stream::{IoHandle, StreamRef};
///
/// let stream = MockStream::output(IoHandle::new(13), StreamRef::new(1));
/// assert!(stream.routes().is_empty());
/// ```
pub struct MockStream {
    io_handle: IoHandle,
    stream_ref: StreamRef,
    direction: Direction,
    output_flags: OutputFlags,
    input_flags: InputFlags,
    source: AudioSource,
    observers: Vec<Arc<dyn StreamLifecycleObserver>>,
    routed: Mutex<DeviceSet>,
    routes: Mutex<Vec<RouteRequest>>,
    failure: Mutex<Option<BackendError>>,
}

impl MockStream {
    fn new(io_handle: IoHandle, stream_ref: StreamRef, direction: Direction) -> Self {
        Self {
            io_handle,
            stream_ref,
            direction,
            output_flags: OutputFlags::empty(),
            input_flags: InputFlags::empty(),
            source: AudioSource::Default,
            observers: Vec::new(),
            routed: Mutex::new(DeviceSet::new()),
            routes: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    /// Creates an output stream.
    pub fn output(io_handle: IoHandle, stream_ref: StreamRef) -> Self {
        Self::new(io_handle, stream_ref, Direction::Output)
    }

    /// Creates an input stream.
    pub fn input(io_handle: IoHandle, stream_ref: StreamRef) -> Self {
        Self::new(io_handle, stream_ref, Direction::Input)
    }

    /// Sets the output flags.
    pub fn with_output_flags(mut self, flags: OutputFlags) -> Self {
        self.output_flags = flags;
        self
    }

    /// Sets the input flags.
    pub fn with_input_flags(mut self, flags: InputFlags) -> Self {
        self.input_flags = flags;
        self
    }

    /// Sets the capture use case.
    pub fn with_source(mut self, source: AudioSource) -> Self {
        self.source = source;
        self
    }

    /// Sets the initial devices.
    pub fn with_devices(self, devices: DeviceSet) -> Self {
        *self.routed.lock() = devices;
        self
    }

    /// Binds lifecycle observers, notified when the route starts or stops.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn StreamLifecycleObserver>>) -> Self {
        self.observers = observers;
        self
    }

    /// Direction of the stream.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of bound lifecycle observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Makes every following route request fail with `error`.
    pub fn fail_routes_with(&self, error: BackendError) {
        *self.failure.lock() = Some(error);
    }

    /// Lets route requests succeed again.
    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    /// Every route request received, failed ones included.
    pub fn routes(&self) -> Vec<RouteRequest> {
        self.routes.lock().clone()
    }

    /// The most recent route request.
    pub fn last_route(&self) -> Option<RouteRequest> {
        self.routes.lock().last().cloned()
    }
}

#[async_trait]
impl Stream for MockStream {
    fn io_handle(&self) -> IoHandle {
        self.io_handle
    }

    fn stream_ref(&self) -> StreamRef {
        self.stream_ref
    }

    fn routed_devices(&self) -> DeviceSet {
        self.routed.lock().clone()
    }

    async fn route_stream(&self, route: &RouteRequest) -> Result<(), BackendError> {
        self.routes.lock().push(route.clone());

        let failure = self.failure.lock().clone();
        if let Some(err) = failure {
            return Err(err);
        }

        *self.routed.lock() = route.devices.clone();
        for observer in &self.observers {
            if route.is_teardown() {
                observer.on_output_stopped(self.io_handle);
            } else {
                observer.on_output_started(self.io_handle);
            }
        }
        Ok(())
    }
}

impl OutputStream for MockStream {
    fn flags(&self) -> OutputFlags {
        self.output_flags
    }
}

impl InputStream for MockStream {
    fn flags(&self) -> InputFlags {
        self.input_flags
    }

    fn source(&self) -> AudioSource {
        self.source
    }
}

/// A [`StreamFactory`] producing [`MockStream`]s.
///
/// Created streams stay reachable through [`output()`](Self::output) and
/// [`input()`](Self::input) so tests can inspect or sabotage them.
pub struct MockStreamFactory {
    next_ref: AtomicU64,
    fail_create: AtomicBool,
    outputs: Mutex<Vec<Arc<MockStream>>>,
    inputs: Mutex<Vec<Arc<MockStream>>>,
}

impl MockStreamFactory {
    /// Creates a factory. Public handles start at 1.
    pub fn new() -> Self {
        Self {
            next_ref: AtomicU64::new(1),
            fail_create: AtomicBool::new(false),
            outputs: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Makes stream creation fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::Relaxed);
    }

    /// The most recently created output stream for `io_handle`.
    pub fn output(&self, io_handle: IoHandle) -> Option<Arc<MockStream>> {
        self.outputs
            .lock()
            .iter()
            .rev()
            .find(|s| s.io_handle == io_handle)
            .cloned()
    }

    /// The most recently created input stream for `io_handle`.
    pub fn input(&self, io_handle: IoHandle) -> Option<Arc<MockStream>> {
        self.inputs
            .lock()
            .iter()
            .rev()
            .find(|s| s.io_handle == io_handle)
            .cloned()
    }

    /// Number of output streams created so far.
    pub fn outputs_created(&self) -> usize {
        self.outputs.lock().len()
    }

    /// Number of input streams created so far.
    pub fn inputs_created(&self) -> usize {
        self.inputs.lock().len()
    }

    fn next_ref(&self) -> StreamRef {
        StreamRef::new(self.next_ref.fetch_add(1, Ordering::Relaxed))
    }

    fn check_create(&self) -> Result<(), BackendError> {
        if self.fail_create.load(Ordering::Relaxed) {
            return Err(BackendError::custom("mock stream creation disabled"));
        }
        Ok(())
    }
}

impl Default for MockStreamFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamFactory for MockStreamFactory {
    fn create_output(
        &self,
        request: &OutputStreamRequest,
        observers: &[Arc<dyn StreamLifecycleObserver>],
    ) -> Result<Arc<dyn OutputStream>, BackendError> {
        self.check_create()?;
        let stream = Arc::new(
            MockStream::output(request.io_handle, self.next_ref())
                .with_output_flags(request.flags)
                .with_devices(request.devices.clone())
                .with_observers(observers.to_vec()),
        );
        self.outputs.lock().push(Arc::clone(&stream));
        Ok(stream)
    }

    fn create_input(
        &self,
        request: &InputStreamRequest,
    ) -> Result<Arc<dyn InputStream>, BackendError> {
        self.check_create()?;
        let stream = Arc::new(
            MockStream::input(request.io_handle, self.next_ref())
                .with_input_flags(request.flags)
                .with_source(request.source)
                .with_devices(request.devices.clone()),
        );
        self.inputs.lock().push(Arc::clone(&stream));
        Ok(stream)
    }
}
