//! Transport module - raw Ethernet interface access.
//!
//! Provides the trait seams ([`StimulusPort`], [`CapturePort`]) and their
//! pnet datalink implementations.

mod datalink;

pub use datalink::{
    interface_names, resolve_interface, CapturePort, DatalinkRx, DatalinkTx, StimulusPort,
    CAPTURE_READ_TIMEOUT,
};
