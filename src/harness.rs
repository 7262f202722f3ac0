//! Harness lifecycle: config in, result CSV out.
//!
//! Wires the collaborators together in a fixed order and tears them down
//! when the dataset is exhausted:
//!
//! 1. Load and cap the dataset
//! 2. Open one transmit port per feature binding (fatal on failure)
//! 3. Start one capture worker per listen interface (fatal on failure)
//! 4. Run the correlation engine over every test case
//! 5. Stop capture, releasing interface handles
//! 6. Write the result table once
//!
//! If the run aborts mid-case the incomplete pending result is discarded;
//! only completed rows ever reach the CSV.

use indicatif::{ProgressBar, ProgressStyle};

use crate::capture::CaptureMux;
use crate::config::HarnessConfig;
use crate::dataset::load_dataset;
use crate::dispatch::StimulusDispatcher;
use crate::engine::{CorrelationEngine, ResultTable};
use crate::error::Result;
use crate::report::write_results;

/// A configured harness, ready to run.
pub struct Harness {
    config: HarnessConfig,
}

impl Harness {
    /// Build a harness from a validated configuration.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the full dataset and write the result table.
    pub async fn run(self) -> Result<ResultTable> {
        let config = &self.config;
        let layout = config.layout();

        let cases = load_dataset(&config.input_dataset, &config.features, config.limit)?;
        tracing::info!(
            cases = cases.len(),
            dataset = %config.input_dataset.display(),
            "dataset loaded"
        );

        let dispatcher = StimulusDispatcher::open(layout, &config.features)?;
        let (mut mux, inbox) = CaptureMux::start(layout, &config.listen_ifaces())?;

        let mut engine = CorrelationEngine::new(
            dispatcher,
            inbox,
            config.outputs.clone(),
            config.word_size,
            config.precision,
            config.timeout(),
        );

        let progress = ProgressBar::new(cases.len() as u64).with_style(
            ProgressStyle::with_template("{pos}/{len} test cases {bar:30}")
                .expect("static progress template"),
        );
        let run = engine
            .run(&cases, |done, _total| progress.set_position(done as u64))
            .await;
        progress.finish();

        // Release interface handles even if a case failed mid-wait.
        mux.stop();

        let table = run?;
        write_results(&config.output_csv, &table)?;
        tracing::info!(
            rows = table.rows.len(),
            output = %config.output_csv.display(),
            "result table written"
        );

        Ok(table)
    }
}
