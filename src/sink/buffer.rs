//! In-memory staging buffer between the synchronous encoders and the upload

use bytes::{BufMut, Bytes, BytesMut};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// A buffer with interior mutability.
///
/// The encoder owns one handle and writes into it; the sink keeps another
/// and drains whatever was encoded into the upload stream.
#[derive(Clone, Debug)]
pub(crate) struct SharedBuffer {
    buffer: Arc<Mutex<bytes::buf::Writer<BytesMut>>>,
}

impl SharedBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(BytesMut::with_capacity(capacity).writer())),
        }
    }

    /// Take everything written so far, leaving the buffer empty
    pub(crate) fn take(&self) -> Bytes {
        match self.buffer.lock() {
            Ok(mut guard) => guard.get_mut().split().freeze(),
            Err(poisoned) => poisoned.into_inner().get_mut().split().freeze(),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.buffer.lock().map(|g| g.get_ref().len()).unwrap_or(0)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| std::io::Error::other("shared buffer lock poisoned"))?;
        Write::write(&mut *buffer, buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
