//! Capture multiplexer: many interfaces, one inbox.
//!
//! One worker per listen interface reads raw frames, decodes them under the
//! configured layout, and pushes every successful decode into a single
//! shared unbounded FIFO channel. Cross-interface ordering is arrival
//! order; the channel is the only concurrently-mutated resource in the
//! harness.
//!
//! ```text
//! iface A ─► worker ─┐
//! iface B ─► worker ─┼─► mpsc (unbounded, FIFO) ─► Inbox::take(timeout)
//! iface C ─► worker ─┘
//! ```
//!
//! Workers are OS threads because the datalink receive call is blocking;
//! a read timeout on the channel lets them observe the stop flag promptly.
//! Frames that fail to decode (foreign ethertype, wrong length) are
//! discarded without counting as anything.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{AnnwireError, Result};
use crate::protocol::{AnnFrame, WireLayout};
use crate::transport::{CapturePort, DatalinkRx};

/// Single consumer side of the shared inbox.
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<AnnFrame>,
}

impl Inbox {
    /// Build an inbox from an existing channel receiver.
    ///
    /// Tests use this to feed the correlation engine by hand.
    pub fn from_channel(rx: mpsc::UnboundedReceiver<AnnFrame>) -> Self {
        Self { rx }
    }

    /// Take the next decoded frame, waiting at most `timeout`.
    ///
    /// Returns `Ok(Some(frame))` on arrival, `Ok(None)` on timeout, and
    /// `Err(CaptureStopped)` if every capture worker has shut down.
    pub async fn take(&mut self, timeout: Duration) -> Result<Option<AnnFrame>> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => Err(AnnwireError::CaptureStopped),
            Err(_elapsed) => Ok(None),
        }
    }
}

/// Handle to the running capture workers.
///
/// `stop()` is cooperative: it raises a flag and joins every worker, which
/// releases the interface handles. Dropping the multiplexer performs a
/// best-effort stop.
pub struct CaptureMux {
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl CaptureMux {
    /// Open every listen interface and start one capture worker per
    /// interface.
    ///
    /// All channels are opened before any worker starts, so an open failure
    /// is fatal up front and leaves no threads behind.
    pub fn start(layout: WireLayout, ifaces: &[String]) -> Result<(Self, Inbox)> {
        let mut ports: Vec<(String, DatalinkRx)> = Vec::with_capacity(ifaces.len());
        for name in ifaces {
            ports.push((name.clone(), DatalinkRx::open(name)?));
        }

        let (mux, inbox) = Self::start_with_ports(
            layout,
            ports
                .into_iter()
                .map(|(name, port)| (name, Box::new(port) as Box<dyn CapturePort>))
                .collect(),
        );
        Ok((mux, inbox))
    }

    /// Start workers over already-open ports. Seam for tests.
    pub fn start_with_ports(
        layout: WireLayout,
        ports: Vec<(String, Box<dyn CapturePort>)>,
    ) -> (Self, Inbox) {
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::unbounded_channel();

        let workers = ports
            .into_iter()
            .map(|(name, port)| {
                let stop = stop.clone();
                let tx = tx.clone();
                std::thread::spawn(move || capture_loop(name, port, layout, stop, tx))
            })
            .collect();

        (Self { stop, workers }, Inbox::from_channel(rx))
    }

    /// Halt all capture workers and release their interface handles.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("capture worker panicked during shutdown");
            }
        }
    }
}

impl Drop for CaptureMux {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Per-interface worker loop: read, decode, forward.
fn capture_loop(
    iface: String,
    mut port: Box<dyn CapturePort>,
    layout: WireLayout,
    stop: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<AnnFrame>,
) {
    tracing::debug!(iface = %iface, "capture worker started");

    while !stop.load(Ordering::Acquire) {
        match port.next_frame() {
            Ok(raw) => {
                if let Some(frame) = AnnFrame::decode_ethernet(&layout, raw) {
                    if tx.send(frame).is_err() {
                        // Inbox dropped, nobody left to consume.
                        break;
                    }
                }
                // Non-ANN traffic is discarded, not counted.
            }
            Err(e) if is_read_timeout(&e) => continue,
            Err(e) => {
                tracing::warn!(iface = %iface, error = %e, "capture read error");
            }
        }
    }

    tracing::debug!(iface = %iface, "capture worker stopped");
}

fn is_read_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
