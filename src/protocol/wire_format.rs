//! Wire layout for ANN stimulus/response frames.
//!
//! The payload of an ANN frame is a sequence of big-endian bit fields:
//!
//! ```text
//! ┌───────────┬──────────┬────────────┬─────────┬─────────┐
//! │ neuron_id │ data_1   │ [data_2]   │ run_id  │ slack   │
//! │ 32 bits   │ W bits   │ W bits     │ 16 bits │ S bits  │
//! └───────────┴──────────┴────────────┴─────────┴─────────┘
//! ```
//!
//! `W` (word size) and `S` (slack width) are configuration constants shared
//! by encoder and decoder; the default layout is `W = 32`, two data fields,
//! `S = 8`, giving a 15-byte payload. Slack is padding: zero on encode,
//! ignored on decode.

use crate::error::{AnnwireError, Result};

/// Reserved ethertype carrying ANN frames.
pub const ETHERTYPE_ANN: u16 = 0x88B5;

/// `neuron_id` field width in bits (fixed).
pub const NEURON_ID_BITS: u32 = 32;

/// `run_id` field width in bits (fixed).
pub const RUN_ID_BITS: u32 = 16;

/// Harness-reserved `neuron_id` used for stimulus frames.
pub const STIMULUS_NEURON_ID: u32 = 0;

/// Default data-field width in bits.
pub const DEFAULT_WORD_SIZE: u32 = 32;

/// Default number of data fields per frame.
pub const DEFAULT_DATA_FIELDS: usize = 2;

/// Default slack (padding) width in bits.
pub const DEFAULT_SLACK_BITS: u32 = 8;

/// Maximum supported data-field width.
pub const MAX_WORD_SIZE: u32 = 64;

/// Maximum supported number of data fields.
pub const MAX_DATA_FIELDS: usize = 2;

/// Configured bit layout of an ANN frame payload.
///
/// Immutable for the duration of a run; both the stimulus dispatcher and the
/// capture workers hold a copy, so encode and decode can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLayout {
    /// Width of each data field in bits (1-64).
    pub word_size: u32,
    /// Number of data fields (1 or 2).
    pub data_fields: usize,
    /// Width of the trailing slack field in bits.
    pub slack_bits: u32,
}

impl Default for WireLayout {
    fn default() -> Self {
        Self {
            word_size: DEFAULT_WORD_SIZE,
            data_fields: DEFAULT_DATA_FIELDS,
            slack_bits: DEFAULT_SLACK_BITS,
        }
    }
}

impl WireLayout {
    /// Create a new layout. Call [`WireLayout::validate`] before use.
    pub fn new(word_size: u32, data_fields: usize, slack_bits: u32) -> Self {
        Self {
            word_size,
            data_fields,
            slack_bits,
        }
    }

    /// Validate the layout for protocol compliance.
    ///
    /// Checks:
    /// - Word size is 1-64 bits
    /// - One or two data fields
    /// - Total payload bit count is byte-aligned
    pub fn validate(&self) -> Result<()> {
        if self.word_size == 0 || self.word_size > MAX_WORD_SIZE {
            return Err(AnnwireError::Config(format!(
                "word_size must be 1-{}, got {}",
                MAX_WORD_SIZE, self.word_size
            )));
        }

        if self.data_fields == 0 || self.data_fields > MAX_DATA_FIELDS {
            return Err(AnnwireError::Config(format!(
                "data_fields must be 1-{}, got {}",
                MAX_DATA_FIELDS, self.data_fields
            )));
        }

        if self.payload_bits() % 8 != 0 {
            return Err(AnnwireError::Config(format!(
                "frame layout is {} bits, which is not byte-aligned",
                self.payload_bits()
            )));
        }

        Ok(())
    }

    /// Total payload width in bits.
    #[inline]
    pub fn payload_bits(&self) -> u32 {
        NEURON_ID_BITS + self.word_size * self.data_fields as u32 + RUN_ID_BITS + self.slack_bits
    }

    /// Total payload width in bytes.
    #[inline]
    pub fn payload_len(&self) -> usize {
        (self.payload_bits() as usize).div_ceil(8)
    }

    /// Check whether a raw value fits a data field of this layout.
    #[inline]
    pub fn fits_word(&self, value: u64) -> bool {
        self.word_size >= 64 || value < (1u64 << self.word_size)
    }
}

/// MSB-first bit writer used by the payload encoder.
///
/// Frame payloads are at most a few tens of bytes, so this favors clarity
/// over throughput.
pub(crate) struct BitWriter {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    pub(crate) fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bits: 0,
        }
    }

    /// Append the low `width` bits of `value`, most significant bit first.
    pub(crate) fn put(&mut self, value: u64, width: u32) {
        debug_assert!(width <= 64);
        debug_assert!(width >= 64 || value < (1u64 << width), "value exceeds field width");

        for shift in (0..width).rev() {
            let bit = ((value >> shift) & 1) as u8;
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            let byte = self.bits / 8;
            self.bytes[byte] |= bit << (7 - (self.bits % 8) as u8);
            self.bits += 1;
        }
    }

    /// Finish writing and return the accumulated bytes.
    ///
    /// Any bits of the final partial byte stay zero.
    pub(crate) fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// MSB-first bit reader used by the payload decoder.
pub(crate) struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Read the next `width` bits as an unsigned value.
    ///
    /// Returns `None` if the buffer is exhausted.
    pub(crate) fn take(&mut self, width: u32) -> Option<u64> {
        if self.pos + width as usize > self.bytes.len() * 8 {
            return None;
        }

        let mut value = 0u64;
        for _ in 0..width {
            let byte = self.bytes[self.pos / 8];
            let bit = (byte >> (7 - (self.pos % 8) as u8)) & 1;
            value = (value << 1) | bit as u64;
            self.pos += 1;
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_matches_reference() {
        let layout = WireLayout::default();
        assert_eq!(layout.word_size, 32);
        assert_eq!(layout.data_fields, 2);
        assert_eq!(layout.slack_bits, 8);
        // 32 + 32 + 32 + 16 + 8 = 120 bits = 15 bytes
        assert_eq!(layout.payload_bits(), 120);
        assert_eq!(layout.payload_len(), 15);
        layout.validate().unwrap();
    }

    #[test]
    fn test_single_field_layout_len() {
        // 32 + 32 + 16 + 8 = 88 bits = 11 bytes
        let layout = WireLayout::new(32, 1, 8);
        assert_eq!(layout.payload_len(), 11);
        layout.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_word_size() {
        assert!(WireLayout::new(0, 1, 8).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wide_word() {
        assert!(WireLayout::new(65, 1, 8).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_three_data_fields() {
        assert!(WireLayout::new(32, 3, 8).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unaligned_layout() {
        // 32 + 5 + 16 + 8 = 61 bits
        let layout = WireLayout::new(5, 1, 8);
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("byte-aligned"));
    }

    #[test]
    fn test_validate_accepts_unaligned_word_with_matching_slack() {
        // 32 + 5 + 16 + 3 = 56 bits = 7 bytes: slack absorbs the misalignment
        let layout = WireLayout::new(5, 1, 3);
        layout.validate().unwrap();
        assert_eq!(layout.payload_len(), 7);
    }

    #[test]
    fn test_fits_word() {
        let layout = WireLayout::new(8, 1, 8);
        assert!(layout.fits_word(255));
        assert!(!layout.fits_word(256));

        let wide = WireLayout::new(64, 1, 8);
        assert!(wide.fits_word(u64::MAX));
    }

    #[test]
    fn test_bit_writer_byte_aligned_fields() {
        let mut w = BitWriter::with_capacity(4);
        w.put(0x0102, 16);
        w.put(0xAB, 8);
        assert_eq!(w.finish(), vec![0x01, 0x02, 0xAB]);
    }

    #[test]
    fn test_bit_writer_unaligned_fields() {
        let mut w = BitWriter::with_capacity(2);
        w.put(0b101, 3);
        w.put(0b11111, 5);
        w.put(0xFF, 8);
        assert_eq!(w.finish(), vec![0b1011_1111, 0xFF]);
    }

    #[test]
    fn test_bit_reader_roundtrip() {
        let mut w = BitWriter::with_capacity(16);
        w.put(126, 32);
        w.put(0xDEAD_BEEF, 32);
        w.put(7, 16);
        w.put(0, 8);
        let bytes = w.finish();

        let mut r = BitReader::new(&bytes);
        assert_eq!(r.take(32), Some(126));
        assert_eq!(r.take(32), Some(0xDEAD_BEEF));
        assert_eq!(r.take(16), Some(7));
        assert_eq!(r.take(8), Some(0));
        assert_eq!(r.take(1), None);
    }

    #[test]
    fn test_bit_reader_short_buffer() {
        let bytes = [0u8; 2];
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.take(16), Some(0));
        assert!(r.take(8).is_none());
    }

    #[test]
    fn test_bit_writer_full_width_word() {
        let mut w = BitWriter::with_capacity(8);
        w.put(u64::MAX, 64);
        let bytes = w.finish();
        assert_eq!(bytes, vec![0xFF; 8]);

        let mut r = BitReader::new(&bytes);
        assert_eq!(r.take(64), Some(u64::MAX));
    }
}
