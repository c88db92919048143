use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// In-memory log sink for asserting on what got logged.
///
/// ```ignore
/// let logs = CapturedLogs::default();
/// let _guard = tracing::subscriber::set_default(logs.subscriber("debug"));
/// // ... run code ...
/// assert!(logs.contents().contains("hello"));
/// ```
///
/// `set_default` is thread-local, so use it with the current-thread runtime
/// (the `#[tokio::test]` default).
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// A fmt subscriber filtered by `directive` that writes into this sink.
    pub fn subscriber(&self, directive: &str) -> impl tracing::Subscriber + Send + Sync + use<> {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(directive))
            .with_writer(self.clone())
            .with_ansi(false)
            .with_target(true)
            .finish()
    }

    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
