//! In-memory log capture for tests that assert on emitted output.
//!
//! ```rust
//! use gantry_observe::capture::CapturedLogs;
//!
//! let logs = CapturedLogs::new();
//! tracing::subscriber::with_default(logs.subscriber("debug"), || {
//!     tracing::info!(stage = "volume", "stage finished");
//! });
//! assert!(logs.contents().contains("stage finished"));
//! ```
use std::{
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, fmt::MakeWriter, layer::SubscriberExt};

/// Shared buffer every captured line is appended to.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    /// Text subscriber writing into this buffer, with span fields included.
    ///
    /// Install it with `tracing::subscriber::set_default` or `with_default`.
    pub fn subscriber(&self, filter: &str) -> impl Subscriber + Send + Sync + use<> {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_target(true);
        let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("trace"));
        tracing_subscriber::registry().with(filter).with(layer)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Writer handle returned to the fmt layer.
pub struct CaptureWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            buf: Arc::clone(&self.buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_events_and_span_fields() {
        let logs = CapturedLogs::new();
        tracing::subscriber::with_default(logs.subscriber("debug"), || {
            let span = tracing::info_span!("deploy", env = "staging");
            let _enter = span.enter();
            tracing::debug!(id = "vol-1", "reusing existing volume");
            tracing::trace!("filtered out");
        });

        let out = logs.contents();
        assert!(out.contains("reusing existing volume"));
        assert!(out.contains("env=\"staging\""));
        assert!(out.contains("vol-1"));
        assert!(!out.contains("filtered out"));
    }
}
