//! Thread-safe collection of live streams.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{IoHandle, Stream, StreamRef};
use crate::device::Direction;
use crate::HalError;

/// A registered stream with its lookup keys.
///
/// Keys are read once at registration so that scans never call back into a
/// stream while the registry lock is held.
struct Entry<S: ?Sized> {
    io_handle: IoHandle,
    stream_ref: StreamRef,
    stream: Arc<S>,
}

/// Live streams of one direction, looked up by I/O handle or public handle.
///
/// One mutex guards the whole collection. It is held only for the scan or
/// the mutation itself and released before any result is returned.
pub struct StreamRegistry<S: ?Sized> {
    direction: Direction,
    entries: Mutex<Vec<Entry<S>>>,
}

impl<S: Stream + ?Sized> StreamRegistry<S> {
    /// Creates an empty registry for the given direction.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Direction of the streams held here.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Registers a stream unconditionally.
    pub fn add(&self, stream: Arc<S>) {
        let entry = Self::entry(stream);
        tracing::debug!(
            direction = ?self.direction,
            io_handle = %entry.io_handle,
            "registering stream"
        );
        self.entries.lock().push(entry);
    }

    /// Registers `stream` unless one with the same I/O handle is present.
    ///
    /// Returns the registered stream and whether `stream` was inserted. When
    /// two opens for one handle race, both callers end up with the same stream.
    pub fn insert_if_absent(&self, stream: Arc<S>) -> (Arc<S>, bool) {
        let entry = Self::entry(stream);
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.iter().find(|e| e.io_handle == entry.io_handle) {
            return (Arc::clone(&existing.stream), false);
        }
        let registered = Arc::clone(&entry.stream);
        entries.push(entry);
        (registered, true)
    }

    /// Unregisters a stream.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::StreamNotRegistered`] if the stream is not held.
    pub fn remove(&self, stream: &Arc<S>) -> Result<(), HalError> {
        let stream_ref = stream.stream_ref();
        let io_handle = stream.io_handle();

        let removed = {
            let mut entries = self.entries.lock();
            entries
                .iter()
                .position(|e| e.stream_ref == stream_ref)
                .map(|index| entries.remove(index))
        };

        match removed {
            Some(_) => Ok(()),
            None => Err(HalError::StreamNotRegistered { io_handle }),
        }
    }

    /// Finds a stream by its I/O handle.
    pub fn find_by_io_handle(&self, io_handle: IoHandle) -> Option<Arc<S>> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.io_handle == io_handle)
            .map(|e| Arc::clone(&e.stream))
    }

    /// Finds a stream by its public handle.
    pub fn find_by_stream_ref(&self, stream_ref: StreamRef) -> Option<Arc<S>> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.stream_ref == stream_ref)
            .map(|e| Arc::clone(&e.stream))
    }

    /// Number of registered streams.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no stream is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns every registered stream, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<S>> {
        self.entries
            .lock()
            .iter()
            .map(|e| Arc::clone(&e.stream))
            .collect()
    }

    fn entry(stream: Arc<S>) -> Entry<S> {
        Entry {
            io_handle: stream.io_handle(),
            stream_ref: stream.stream_ref(),
            stream,
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for StreamRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("direction", &self.direction)
            .field("len", &self.entries.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::mock::MockStream;
    use crate::stream::OutputStream;

    fn output(io: i32, stream_ref: u64) -> Arc<dyn OutputStream> {
        Arc::new(MockStream::output(
            IoHandle::new(io),
            StreamRef::new(stream_ref),
        ))
    }

    #[test]
    fn test_add_and_find() {
        let registry = StreamRegistry::<dyn OutputStream>::new(Direction::Output);
        assert!(registry.is_empty());

        registry.add(output(13, 1));
        registry.add(output(21, 2));

        assert_eq!(registry.len(), 2);
        let found = registry.find_by_io_handle(IoHandle::new(21)).unwrap();
        assert_eq!(found.stream_ref(), StreamRef::new(2));
        let found = registry.find_by_stream_ref(StreamRef::new(1)).unwrap();
        assert_eq!(found.io_handle(), IoHandle::new(13));
    }

    #[test]
    fn test_lookup_miss() {
        let registry = StreamRegistry::<dyn OutputStream>::new(Direction::Output);
        registry.add(output(13, 1));
        assert!(registry.find_by_io_handle(IoHandle::new(14)).is_none());
        assert!(registry.find_by_stream_ref(StreamRef::new(9)).is_none());
    }

    #[test]
    fn test_remove() {
        let registry = StreamRegistry::<dyn OutputStream>::new(Direction::Output);
        let stream = output(13, 1);
        registry.add(Arc::clone(&stream));

        registry.remove(&stream).unwrap();
        assert!(registry.is_empty());

        let err = registry.remove(&stream).unwrap_err();
        assert!(matches!(
            err,
            HalError::StreamNotRegistered { io_handle } if io_handle == IoHandle::new(13)
        ));
    }

    #[test]
    fn test_insert_if_absent_keeps_first() {
        let registry = StreamRegistry::<dyn OutputStream>::new(Direction::Output);
        let (first, inserted) = registry.insert_if_absent(output(13, 1));
        assert!(inserted);

        let (second, inserted) = registry.insert_if_absent(output(13, 2));
        assert!(!inserted);
        assert_eq!(second.stream_ref(), first.stream_ref());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_order() {
        let registry = StreamRegistry::<dyn OutputStream>::new(Direction::Output);
        registry.add(output(5, 1));
        registry.add(output(3, 2));

        let handles: Vec<_> = registry.snapshot().iter().map(|s| s.io_handle()).collect();
        assert_eq!(handles, vec![IoHandle::new(5), IoHandle::new(3)]);
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(StreamRegistry::<dyn OutputStream>::new(Direction::Output));
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.add(output(i, i as u64)))
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(registry.len(), 8);
    }
}
