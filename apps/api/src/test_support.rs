//! Shared helpers for unit tests.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::Subscriber;

/// Collects formatted log lines in memory.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Plain-text subscriber writing into this capture; install it with
    /// `tracing::subscriber::set_default` or `with_default`.
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync {
        let buffer = Arc::clone(&self.buffer);
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .with_writer(move || CaptureWriter(Arc::clone(&buffer)))
            .finish()
    }

    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
