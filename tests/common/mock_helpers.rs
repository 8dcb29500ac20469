//! Mock construction helpers
//!
//! [`ScriptedLink`] is an in-memory device link: tests push inbound lines
//! and inspect the commands the backend wrote. It works without the
//! `mock-device` feature.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use gascal_rs::backend::{LineReader, Transport, TransportFactory};
use gascal_rs::error::{CalibrationError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared control over every transport the factory hands out
#[derive(Clone)]
pub struct ScriptedLink {
    inbound_tx: Sender<String>,
    inbound_rx: Receiver<String>,
    written: Arc<Mutex<Vec<String>>>,
    fail_open: Arc<AtomicBool>,
    opens: Arc<AtomicUsize>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = unbounded();
        Self {
            inbound_tx,
            inbound_rx,
            written: Arc::new(Mutex::new(Vec::new())),
            fail_open: Arc::new(AtomicBool::new(false)),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a line as if the device had printed it
    pub fn push_line(&self, line: impl Into<String>) {
        self.inbound_tx.send(line.into()).unwrap();
    }

    /// Commands written so far, without newlines
    pub fn written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// How many times a transport was opened
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Factory that gives every port a transport on this link
    pub fn factory(&self) -> TransportFactory {
        let link = self.clone();
        Box::new(move |_port: &str| -> Box<dyn Transport> {
            Box::new(ScriptedTransport {
                link: link.clone(),
                open: false,
            })
        })
    }
}

impl Default for ScriptedLink {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ScriptedTransport {
    link: ScriptedLink,
    open: bool,
}

impl Transport for ScriptedTransport {
    fn open(&mut self, port: &str, _baud_rate: u32) -> Result<Box<dyn LineReader>> {
        if self.link.fail_open.load(Ordering::SeqCst) {
            return Err(CalibrationError::Transport(format!("{} is busy", port)));
        }
        self.open = true;
        self.link.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedReader {
            inbound: self.link.inbound_rx.clone(),
        }))
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        if !self.open {
            return Err(CalibrationError::Transport("Port not open".to_string()));
        }
        self.link.written.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

struct ScriptedReader {
    inbound: Receiver<String>,
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        match self.inbound.recv_timeout(timeout) {
            Ok(line) => Ok(Some(line)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(CalibrationError::Transport("Link closed".to_string()))
            }
        }
    }
}
