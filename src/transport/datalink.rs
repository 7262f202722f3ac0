//! Raw Ethernet datalink access via `pnet`.
//!
//! All raw-socket work goes through two small traits so the dispatcher and
//! capture workers can be exercised in tests without live interfaces:
//!
//! - [`StimulusPort`]: fire-and-forget transmit on one interface
//! - [`CapturePort`]: blocking receive of the next raw frame
//!
//! Opening either kind of port fails fast: the harness cannot run without
//! its declared interfaces, so a missing interface or a channel-open error
//! at startup is fatal, never retried.

use std::io;
use std::time::Duration;

use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};
use pnet::util::MacAddr;

use crate::error::{AnnwireError, Result};

/// Read timeout applied to capture channels so workers can observe the
/// stop flag between packets.
pub const CAPTURE_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// One-way stimulus transmission on a single interface.
pub trait StimulusPort: Send {
    /// The interface's hardware address, used as the Ethernet source.
    fn source_mac(&self) -> MacAddr;

    /// Transmit one raw Ethernet frame. No acknowledgment is expected.
    fn transmit(&mut self, frame: &[u8]) -> Result<()>;
}

/// Blocking receive of raw Ethernet frames from a single interface.
pub trait CapturePort: Send {
    /// Block until the next frame arrives or the read timeout elapses.
    ///
    /// A timeout surfaces as `io::ErrorKind::TimedOut` (or `WouldBlock`,
    /// depending on the platform backend).
    fn next_frame(&mut self) -> io::Result<&[u8]>;
}

/// Resolve an interface name against the host networking stack.
pub fn resolve_interface(name: &str) -> Result<NetworkInterface> {
    datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| AnnwireError::InterfaceNotFound(name.to_string()))
}

/// Enumerate the names of all host interfaces.
pub fn interface_names() -> Vec<String> {
    datalink::interfaces()
        .into_iter()
        .map(|iface| iface.name)
        .collect()
}

fn open_channel(
    iface: &NetworkInterface,
    read_timeout: Option<Duration>,
) -> Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>)> {
    let config = datalink::Config {
        read_timeout,
        ..Default::default()
    };

    match datalink::channel(iface, config) {
        Ok(Channel::Ethernet(tx, rx)) => Ok((tx, rx)),
        Ok(_) => Err(AnnwireError::ChannelOpen {
            iface: iface.name.clone(),
            source: io::Error::new(io::ErrorKind::Unsupported, "non-Ethernet channel"),
        }),
        Err(source) => Err(AnnwireError::ChannelOpen {
            iface: iface.name.clone(),
            source,
        }),
    }
}

/// `StimulusPort` backed by a pnet datalink channel.
pub struct DatalinkTx {
    iface: String,
    mac: MacAddr,
    tx: Box<dyn DataLinkSender>,
}

impl DatalinkTx {
    /// Open a transmit port on the named interface. Fatal on failure.
    pub fn open(name: &str) -> Result<Self> {
        let iface = resolve_interface(name)?;
        let mac = iface.mac.ok_or_else(|| AnnwireError::ChannelOpen {
            iface: name.to_string(),
            source: io::Error::new(io::ErrorKind::Other, "interface has no MAC address"),
        })?;
        let (tx, _rx) = open_channel(&iface, None)?;

        Ok(Self {
            iface: name.to_string(),
            mac,
            tx,
        })
    }

    /// The interface name this port transmits on.
    pub fn iface(&self) -> &str {
        &self.iface
    }
}

impl StimulusPort for DatalinkTx {
    fn source_mac(&self) -> MacAddr {
        self.mac
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        match self.tx.send_to(frame, None) {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(AnnwireError::Transmit {
                iface: self.iface.clone(),
                reason: e.to_string(),
            }),
            None => Err(AnnwireError::Transmit {
                iface: self.iface.clone(),
                reason: "datalink sender queued no packet".to_string(),
            }),
        }
    }
}

/// `CapturePort` backed by a pnet datalink channel.
pub struct DatalinkRx {
    rx: Box<dyn DataLinkReceiver>,
}

impl DatalinkRx {
    /// Open a capture port on the named interface with the worker read
    /// timeout. Fatal on failure.
    pub fn open(name: &str) -> Result<Self> {
        let iface = resolve_interface(name)?;
        let (_tx, rx) = open_channel(&iface, Some(CAPTURE_READ_TIMEOUT))?;
        Ok(Self { rx })
    }
}

impl CapturePort for DatalinkRx {
    fn next_frame(&mut self) -> io::Result<&[u8]> {
        self.rx.next()
    }
}
