//! Correlation engine.
//!
//! Drives the per-test-case protocol against the data plane:
//!
//! 1. Dispatch every feature frame for the case.
//! 2. Take frames from the inbox with a bounded wait.
//! 3. A frame matches when its `run_id` equals the case's and its
//!    `neuron_id` belongs to an output binding whose name is not yet
//!    recorded; the bound conversion turns the raw first data field into
//!    the reported value. Everything else is discarded silently.
//! 4. On a receive timeout the full stimulus is retransmitted and the wait
//!    continues. There is deliberately no retry bound or backoff: a
//!    permanently silent data plane stalls the run visibly on one case
//!    rather than producing a placeholder row.
//! 5. The case completes exactly when the pending result's key set equals
//!    the declared output-name set; the row is appended and the engine
//!    advances.
//!
//! Test cases are processed strictly one at a time, so the pending result
//! and the result table are owned by this single consumer and need no
//! locking. A stale frame from an earlier case that arrives after the next
//! case has started is rejected by the `run_id` check. When a late and a
//! fresh frame share `run_id` and `neuron_id` (overlapping retransmissions)
//! nothing distinguishes them; first arrival wins and later ones are
//! ignored.

use std::collections::HashMap;
use std::time::Duration;

use crate::capture::Inbox;
use crate::config::OutputBinding;
use crate::dataset::TestCase;
use crate::dispatch::StimulusDispatcher;
use crate::error::Result;
use crate::protocol::AnnFrame;

/// Partial outputs for the test case currently in flight.
///
/// Populated incrementally as matching frames arrive; a duplicate name is
/// ignored, never overwritten.
#[derive(Debug, Default)]
pub struct PendingResult {
    values: HashMap<String, f64>,
}

impl PendingResult {
    /// Create an empty pending result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an output name has already been recorded.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Record a converted output value. First write wins.
    pub fn record(&mut self, name: &str, value: f64) {
        self.values.entry(name.to_string()).or_insert(value);
    }

    /// Number of outputs recorded so far.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Complete iff the key set equals the declared output-name set.
    pub fn is_complete(&self, outputs: &[OutputBinding]) -> bool {
        self.values.len() == outputs.len() && outputs.iter().all(|o| self.contains(&o.name))
    }

    /// Materialize a result row with columns in declaration order.
    fn into_row(mut self, case: &TestCase, outputs: &[OutputBinding]) -> ResultRow {
        ResultRow {
            ordinal: case.ordinal,
            run_id: case.run_id,
            values: outputs
                .iter()
                .map(|o| self.values.remove(&o.name).expect("row is complete"))
                .collect(),
        }
    }
}

/// One completed test case, values in output-declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// 0-based dataset ordinal.
    pub ordinal: usize,
    /// Wire correlation identifier the case ran under.
    pub run_id: u16,
    /// Converted output values, one per declared output binding.
    pub values: Vec<f64>,
}

/// Append-only table of completed test cases.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    /// Output column names in declaration order.
    pub columns: Vec<String>,
    /// One row per completed test case, in run order.
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Create an empty table with the declared output columns.
    pub fn new(outputs: &[OutputBinding]) -> Self {
        Self {
            columns: outputs.iter().map(|o| o.name.clone()).collect(),
            rows: Vec::new(),
        }
    }
}

/// The per-test-case protocol driver.
pub struct CorrelationEngine {
    dispatcher: StimulusDispatcher,
    inbox: Inbox,
    outputs: Vec<OutputBinding>,
    word_size: u32,
    precision: u32,
    timeout: Duration,
}

impl CorrelationEngine {
    /// Assemble an engine from its collaborators.
    pub fn new(
        dispatcher: StimulusDispatcher,
        inbox: Inbox,
        outputs: Vec<OutputBinding>,
        word_size: u32,
        precision: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            dispatcher,
            inbox,
            outputs,
            word_size,
            precision,
            timeout,
        }
    }

    /// Run a single test case to completion.
    ///
    /// Retries transmission without bound; see the module docs for why a
    /// silent data plane makes this stall rather than fail.
    pub async fn run_case(&mut self, case: &TestCase) -> Result<ResultRow> {
        self.dispatcher.send(case)?;
        let mut pending = PendingResult::new();
        let mut retransmissions = 0u64;

        while !pending.is_complete(&self.outputs) {
            match self.inbox.take(self.timeout).await? {
                Some(frame) => self.absorb(case, &mut pending, frame),
                None => {
                    retransmissions += 1;
                    tracing::debug!(
                        run_id = case.run_id,
                        retransmissions,
                        received = pending.len(),
                        expected = self.outputs.len(),
                        "receive timeout, retransmitting stimulus"
                    );
                    self.dispatcher.send(case)?;
                }
            }
        }

        Ok(pending.into_row(case, &self.outputs))
    }

    /// Apply one captured frame to the pending result, or discard it.
    fn absorb(&self, case: &TestCase, pending: &mut PendingResult, frame: AnnFrame) {
        if frame.run_id != case.run_id {
            tracing::trace!(
                frame_run_id = frame.run_id,
                active_run_id = case.run_id,
                "discarding frame for another test case"
            );
            return;
        }

        let Some(binding) = self.outputs.iter().find(|o| o.neuron_id == frame.neuron_id) else {
            tracing::trace!(neuron_id = frame.neuron_id, "discarding unbound neuron_id");
            return;
        };

        if pending.contains(&binding.name) {
            tracing::trace!(output = %binding.name, "ignoring duplicate output frame");
            return;
        }

        let value = binding
            .conversion
            .apply(frame.data_1(), self.word_size, self.precision);
        pending.record(&binding.name, value);
    }

    /// Run every test case in order, appending completed rows.
    ///
    /// `on_complete` is invoked with (completed, total) after each case,
    /// which is how the harness reports k/N progress.
    pub async fn run(
        &mut self,
        cases: &[TestCase],
        mut on_complete: impl FnMut(usize, usize),
    ) -> Result<ResultTable> {
        let mut table = ResultTable::new(&self.outputs);

        for case in cases {
            let row = self.run_case(case).await?;
            table.rows.push(row);
            tracing::info!(
                completed = table.rows.len(),
                total = cases.len(),
                run_id = case.run_id,
                "test case complete"
            );
            on_complete(table.rows.len(), cases.len());
        }

        Ok(table)
    }
}
