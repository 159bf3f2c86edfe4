//! Shared helpers for integration tests: deterministic payloads, an
//! in-memory source handle with controllable read behavior, and recording
//! listeners.

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ferry::events::ManagerListener;
use ferry::transfer::Transfer;
use ferry::vfs::FileHandle;

static LOG_INIT: std::sync::Once = std::sync::Once::new();

/// Route crate logs to stderr once per test binary.
pub fn init_test_logging() {
    LOG_INIT.call_once(ferry::logging::init_logging_stderr);
}

/// Repeating byte pattern so offset mistakes show up as content mismatches.
pub fn patterned(len: usize) -> Vec<u8> {
    (0u8..251).cycle().take(len).collect()
}

/// Poll `cond` until it holds or a 10 second deadline passes.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// In-memory read-only source. `read_delay` slows each chunk so tests can
/// pause mid-transfer; `zero_read_at` injects one bogus zero-length read at
/// an absolute offset to exercise the end-of-stream probe.
pub struct MemSource {
    uri: String,
    data: Vec<u8>,
    read_delay: Option<Duration>,
    zero_read_at: Option<u64>,
}

impl MemSource {
    pub fn new(name: &str, data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            uri: format!("mem://sources/{}", name),
            data,
            read_delay: None,
            zero_read_at: None,
        })
    }

    pub fn slow(name: &str, data: Vec<u8>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            uri: format!("mem://sources/{}", name),
            data,
            read_delay: Some(delay),
            zero_read_at: None,
        })
    }

    pub fn with_zero_read(name: &str, data: Vec<u8>, at: u64) -> Arc<Self> {
        Arc::new(Self {
            uri: format!("mem://sources/{}", name),
            data,
            read_delay: None,
            zero_read_at: Some(at),
        })
    }
}

impl FileHandle for MemSource {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn name(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or_default()
    }

    fn exists(&self) -> io::Result<bool> {
        Ok(true)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn is_container(&self) -> io::Result<bool> {
        Ok(false)
    }

    fn children(&self) -> io::Result<Vec<Arc<dyn FileHandle>>> {
        Ok(Vec::new())
    }

    fn parent(&self) -> Option<Arc<dyn FileHandle>> {
        None
    }

    fn create_container(&self) -> io::Result<()> {
        Ok(())
    }

    fn open_read_at(&self, offset: u64) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(MemReader {
            data: self.data.clone(),
            pos: offset as usize,
            delay: self.read_delay,
            zero_read_at: self.zero_read_at,
            zero_read_done: false,
        }))
    }

    fn open_append(&self) -> io::Result<Box<dyn Write + Send>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "mem source is read-only",
        ))
    }
}

struct MemReader {
    data: Vec<u8>,
    pos: usize,
    delay: Option<Duration>,
    zero_read_at: Option<u64>,
    zero_read_done: bool,
}

impl Read for MemReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(at) = self.zero_read_at {
            if !self.zero_read_done && self.pos == at as usize {
                self.zero_read_done = true;
                return Ok(0);
            }
        }
        let n = buf.len().min(self.data.len().saturating_sub(self.pos));
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Manager listener appending `"<tag>:<name>"` lines to a shared log.
pub struct EventLog {
    tag: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new(tag: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self { tag, log })
    }

    fn push(&self, event: &str, transfer: &Arc<Transfer>) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}:{}", self.tag, event, transfer.name()));
    }
}

impl ManagerListener for EventLog {
    fn started(&self, transfer: &Arc<Transfer>) {
        self.push("started", transfer);
    }

    fn paused(&self, transfer: &Arc<Transfer>) {
        self.push("paused", transfer);
    }

    fn finished(&self, transfer: &Arc<Transfer>) {
        self.push("finished", transfer);
    }

    fn progress(&self, transfer: &Arc<Transfer>) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:progress:{}", self.tag, transfer.percent()));
    }
}

/// Tracks how many transfers are in flight at once; the serial queue must
/// never let the maximum exceed one.
#[derive(Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn max_seen(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

impl ManagerListener for ConcurrencyProbe {
    fn started(&self, _transfer: &Arc<Transfer>) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn paused(&self, _transfer: &Arc<Transfer>) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn finished(&self, _transfer: &Arc<Transfer>) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}
