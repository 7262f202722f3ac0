//! ANN frame struct with payload and Ethernet codecs.
//!
//! An [`AnnFrame`] is the decoded form of one stimulus or response frame.
//! Encoding is deterministic: the same field values always produce the same
//! bytes, which is what makes retransmission idempotent on the wire.
//!
//! # Example
//!
//! ```
//! use annwire::protocol::{AnnFrame, WireLayout};
//!
//! let layout = WireLayout::new(32, 1, 8);
//! let frame = AnnFrame::new(126, vec![1000], 7);
//! let payload = frame.encode(&layout);
//! assert_eq!(payload.len(), layout.payload_len());
//! assert_eq!(AnnFrame::decode(&layout, &payload), Some(frame));
//! ```

use bytes::Bytes;
use pnet::packet::ethernet::{EtherType, EthernetPacket, MutableEthernetPacket};
use pnet::packet::Packet;
use pnet::util::MacAddr;

use super::wire_format::{
    BitReader, BitWriter, WireLayout, ETHERTYPE_ANN, NEURON_ID_BITS, RUN_ID_BITS,
};

/// Ethernet header size in bytes.
const ETHERNET_HEADER_LEN: usize = 14;

/// A decoded ANN stimulus/response frame.
///
/// The slack field is not represented: it is zero on encode and ignored on
/// decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnFrame {
    /// Source/destination compute unit, or the harness-reserved value for
    /// stimulus frames.
    pub neuron_id: u32,
    /// Raw data fields; length equals the layout's data-field count.
    pub data: Vec<u64>,
    /// Per-test-case correlation identifier.
    pub run_id: u16,
}

impl AnnFrame {
    /// Create a new frame from field values.
    pub fn new(neuron_id: u32, data: Vec<u64>, run_id: u16) -> Self {
        Self {
            neuron_id,
            data,
            run_id,
        }
    }

    /// Get the first data field.
    ///
    /// Every valid layout has at least one data field, so a decoded frame
    /// always has one.
    #[inline]
    pub fn data_1(&self) -> u64 {
        self.data[0]
    }

    /// Encode the payload bit fields under `layout`.
    ///
    /// # Panics
    ///
    /// Debug-asserts that the data-field count matches the layout and that
    /// every value fits the word size; the dispatcher validates both before
    /// reaching this point.
    pub fn encode(&self, layout: &WireLayout) -> Bytes {
        debug_assert_eq!(self.data.len(), layout.data_fields);

        let mut w = BitWriter::with_capacity(layout.payload_len());
        w.put(self.neuron_id as u64, NEURON_ID_BITS);
        for &value in &self.data {
            debug_assert!(layout.fits_word(value));
            w.put(value, layout.word_size);
        }
        w.put(self.run_id as u64, RUN_ID_BITS);
        w.put(0, layout.slack_bits);
        Bytes::from(w.finish())
    }

    /// Decode a payload under `layout`.
    ///
    /// Returns `None` if the byte length does not match the configured
    /// layout. Not an error: a mismatched frame is simply not an ANN frame.
    pub fn decode(layout: &WireLayout, payload: &[u8]) -> Option<Self> {
        if payload.len() != layout.payload_len() {
            return None;
        }

        let mut r = BitReader::new(payload);
        let neuron_id = r.take(NEURON_ID_BITS)? as u32;
        let mut data = Vec::with_capacity(layout.data_fields);
        for _ in 0..layout.data_fields {
            data.push(r.take(layout.word_size)?);
        }
        let run_id = r.take(RUN_ID_BITS)? as u16;
        // Slack is ignored.

        Some(Self {
            neuron_id,
            data,
            run_id,
        })
    }

    /// Build a complete Ethernet frame carrying this payload.
    ///
    /// Destination is the broadcast address and the ethertype is the
    /// reserved ANN value, matching what the emulated switches expect.
    pub fn encode_ethernet(&self, layout: &WireLayout, src: MacAddr) -> Bytes {
        let payload = self.encode(layout);
        let mut buf = vec![0u8; ETHERNET_HEADER_LEN + payload.len()];

        {
            let mut eth = MutableEthernetPacket::new(&mut buf)
                .expect("buffer sized for an Ethernet frame");
            eth.set_destination(MacAddr::broadcast());
            eth.set_source(src);
            eth.set_ethertype(EtherType(ETHERTYPE_ANN));
            eth.set_payload(&payload);
        }

        Bytes::from(buf)
    }

    /// Decode an ANN frame out of a raw Ethernet frame.
    ///
    /// Returns `None` (frame discarded, not counted) when the ethertype is
    /// not the reserved ANN value or the payload is shorter than the
    /// configured layout. Trailing bytes beyond the layout are tolerated:
    /// Ethernet pads short frames to the 60-byte minimum on the wire.
    pub fn decode_ethernet(layout: &WireLayout, frame: &[u8]) -> Option<Self> {
        let eth = EthernetPacket::new(frame)?;
        if eth.get_ethertype() != EtherType(ETHERTYPE_ANN) {
            return None;
        }

        let payload = eth.payload();
        let want = layout.payload_len();
        if payload.len() < want {
            return None;
        }
        Self::decode(layout, &payload[..want])
    }
}
