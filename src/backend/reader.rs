//! Dedicated line-reader thread
//!
//! The reader owns the read half of the transport and does nothing but move
//! complete lines into a bounded channel. All parsing and state changes
//! happen on the worker thread that drains the channel.

use crate::backend::transport::LineReader;
use crossbeam_channel::{SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Output of the reader thread
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    /// One complete inbound line
    Line(String),
    /// The read half failed; the thread has exited
    Failed(String),
}

/// Owner's handle on a running reader thread.
///
/// Dropping the handle stops and joins the thread.
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Ask the thread to stop and wait for it.
    ///
    /// Returns within roughly one poll interval.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Line reader thread panicked");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn a thread that reads lines with `poll_interval` timeouts until
/// stopped, the channel closes, or the reader fails.
pub fn spawn_reader(
    mut reader: Box<dyn LineReader>,
    lines: Sender<ReaderEvent>,
    poll_interval: Duration,
) -> ReaderHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let thread = std::thread::Builder::new()
        .name("gascal-line-reader".to_string())
        .spawn(move || {
            tracing::debug!("Line reader started");
            while !stop_flag.load(Ordering::SeqCst) {
                match reader.read_line(poll_interval) {
                    Ok(Some(line)) => {
                        if !forward(&lines, ReaderEvent::Line(line), &stop_flag, poll_interval) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("Line reader failed: {}", e);
                        let _ = forward(
                            &lines,
                            ReaderEvent::Failed(e.to_string()),
                            &stop_flag,
                            poll_interval,
                        );
                        break;
                    }
                }
            }
            tracing::debug!("Line reader stopped");
        });

    let thread = match thread {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!("Failed to spawn line reader: {}", e);
            None
        }
    };

    ReaderHandle { stop, thread }
}

/// Send with backpressure while still observing the stop flag.
///
/// Returns false when the event could not be delivered.
fn forward(
    lines: &Sender<ReaderEvent>,
    mut event: ReaderEvent,
    stop: &AtomicBool,
    poll_interval: Duration,
) -> bool {
    loop {
        match lines.send_timeout(event, poll_interval) {
            Ok(()) => return true,
            Err(SendTimeoutError::Disconnected(_)) => return false,
            Err(SendTimeoutError::Timeout(returned)) => {
                if stop.load(Ordering::SeqCst) {
                    return false;
                }
                event = returned;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CalibrationError, Result};
    use crossbeam_channel::bounded;
    use std::collections::VecDeque;
    use std::time::Instant;

    struct ScriptedReader {
        lines: VecDeque<Result<Option<String>>>,
    }

    impl LineReader for ScriptedReader {
        fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
            match self.lines.pop_front() {
                Some(item) => item,
                None => {
                    std::thread::sleep(timeout);
                    Ok(None)
                }
            }
        }
    }

    fn scripted(items: Vec<Result<Option<String>>>) -> Box<dyn LineReader> {
        Box::new(ScriptedReader {
            lines: items.into(),
        })
    }

    #[test]
    fn test_reader_forwards_lines_in_order() {
        let (tx, rx) = bounded(16);
        let mut handle = spawn_reader(
            scripted(vec![
                Ok(Some("one".into())),
                Ok(None),
                Ok(Some("two".into())),
            ]),
            tx,
            Duration::from_millis(5),
        );

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)),
            Ok(ReaderEvent::Line("one".into()))
        );
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)),
            Ok(ReaderEvent::Line("two".into()))
        );
        handle.stop();
        assert!(handle.is_finished());
    }

    #[test]
    fn test_reader_reports_failure_and_exits() {
        let (tx, rx) = bounded(16);
        let handle = spawn_reader(
            scripted(vec![Err(CalibrationError::Transport("unplugged".into()))]),
            tx,
            Duration::from_millis(5),
        );

        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(ReaderEvent::Failed(msg)) => assert!(msg.contains("unplugged")),
            other => panic!("unexpected {:?}", other),
        }
        let start = Instant::now();
        while !handle.is_finished() && start.elapsed() < Duration::from_secs(1) {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(handle.is_finished());
    }

    #[test]
    fn test_stop_with_full_channel_returns_promptly() {
        let (tx, _rx) = bounded(1);
        let lines = (0..10).map(|i| Ok(Some(format!("line {}", i)))).collect();
        let mut handle = spawn_reader(scripted(lines), tx, Duration::from_millis(10));

        std::thread::sleep(Duration::from_millis(30));
        let start = Instant::now();
        handle.stop();
        assert!(start.elapsed() < Duration::from_millis(200));
    }
}
