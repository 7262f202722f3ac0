//! Stimulus dispatcher.
//!
//! Builds one frame per feature binding for a test case and transmits it on
//! the bound interface. Frame construction is a pure function of the test
//! case and the configuration, so re-invoking [`StimulusDispatcher::send`]
//! for the same case (retransmission after a receive timeout) reproduces
//! byte-identical frames.

use bytes::Bytes;

use crate::config::FeatureBinding;
use crate::dataset::TestCase;
use crate::error::{AnnwireError, Result};
use crate::protocol::{AnnFrame, WireLayout, STIMULUS_NEURON_ID};
use crate::transport::{DatalinkTx, StimulusPort};

/// Transmits the stimulus frames for one test case.
pub struct StimulusDispatcher {
    layout: WireLayout,
    ports: Vec<(FeatureBinding, Box<dyn StimulusPort>)>,
}

impl StimulusDispatcher {
    /// Open a transmit port for every feature binding.
    ///
    /// Open failures are fatal: the harness cannot stimulate the data plane
    /// without its declared interfaces.
    pub fn open(layout: WireLayout, features: &[FeatureBinding]) -> Result<Self> {
        let mut ports: Vec<(FeatureBinding, Box<dyn StimulusPort>)> =
            Vec::with_capacity(features.len());
        for binding in features {
            let port = DatalinkTx::open(&binding.iface)?;
            ports.push((binding.clone(), Box::new(port)));
        }
        Ok(Self { layout, ports })
    }

    /// Build a dispatcher over already-open ports. Seam for tests.
    pub fn with_ports(
        layout: WireLayout,
        ports: Vec<(FeatureBinding, Box<dyn StimulusPort>)>,
    ) -> Self {
        Self { layout, ports }
    }

    /// Build the wire bytes for every feature frame of `case`.
    ///
    /// Frame fields: `neuron_id` = harness-reserved stimulus value, data
    /// fields from the binding's dataset columns, `run_id` = the case's
    /// correlation id. Values that do not fit the configured word size are
    /// rejected rather than truncated.
    pub fn frames_for(&self, case: &TestCase) -> Result<Vec<Bytes>> {
        self.ports
            .iter()
            .map(|(binding, port)| {
                let mut data = Vec::with_capacity(binding.columns.len());
                for column in &binding.columns {
                    let value = case.value(column).ok_or_else(|| AnnwireError::MalformedRow {
                        row: case.ordinal,
                        reason: format!("missing column '{}'", column),
                    })?;
                    if !self.layout.fits_word(value) {
                        return Err(AnnwireError::ValueOutOfRange {
                            column: column.clone(),
                            value,
                            word_size: self.layout.word_size,
                        });
                    }
                    data.push(value);
                }

                let frame = AnnFrame::new(STIMULUS_NEURON_ID, data, case.run_id);
                Ok(frame.encode_ethernet(&self.layout, port.source_mac()))
            })
            .collect()
    }

    /// Transmit one stimulus frame per feature binding.
    ///
    /// Fire-and-forget; may be invoked repeatedly for the same case.
    pub fn send(&mut self, case: &TestCase) -> Result<()> {
        let frames = self.frames_for(case)?;
        for ((binding, port), frame) in self.ports.iter_mut().zip(&frames) {
            tracing::trace!(
                feature = %binding.name,
                iface = %binding.iface,
                run_id = case.run_id,
                "transmitting stimulus frame"
            );
            port.transmit(frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use pnet::util::MacAddr;
    use std::sync::{Arc, Mutex};

    /// Recording port shared with the test via an `Arc`.
    #[derive(Clone)]
    pub(crate) struct RecordingPort {
        pub(crate) mac: MacAddr,
        pub(crate) sent: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl RecordingPort {
        pub(crate) fn new(mac: MacAddr) -> Self {
            Self {
                mac,
                sent: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl StimulusPort for RecordingPort {
        fn source_mac(&self) -> MacAddr {
            self.mac
        }

        fn transmit(&mut self, frame: &[u8]) -> Result<()> {
            self.sent.lock().unwrap().push(frame.to_vec());
            Ok(())
        }
    }
}
