// src/exec/output.rs

//! Where command output goes.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// A cloneable, thread-safe destination for command output.
///
/// Both streams of a running command are copied here chunk by chunk, so
/// lines of stdout and stderr may interleave.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::discard()
    }
}

impl OutputSink {
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// The process's standard output.
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn discard() -> Self {
        Self::from_writer(io::sink())
    }

    pub fn write(&self, data: &[u8]) -> io::Result<()> {
        let mut w = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        w.write_all(data)?;
        w.flush()
    }
}

/// In-memory writer whose contents can be inspected while it is shared.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// A sink writing into this buffer.
    pub fn sink(&self) -> OutputSink {
        OutputSink::from_writer(self.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
