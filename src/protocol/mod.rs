//! Protocol module - ANN frame layout, codecs, and fixed-point conversion.
//!
//! This module implements the binary protocol spoken with the data plane:
//! - Configurable bit-field payload layout (encode/decode)
//! - Ethernet encapsulation under the reserved ethertype
//! - Q-format fixed-point to engineering-unit conversion

mod fixed_point;
mod frame;
mod wire_format;

pub use fixed_point::{q_to_f64, Conversion};
pub use frame::AnnFrame;
pub use wire_format::{
    WireLayout, DEFAULT_DATA_FIELDS, DEFAULT_SLACK_BITS, DEFAULT_WORD_SIZE, ETHERTYPE_ANN,
    MAX_DATA_FIELDS, MAX_WORD_SIZE, NEURON_ID_BITS, RUN_ID_BITS, STIMULUS_NEURON_ID,
};
