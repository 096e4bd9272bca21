//! Run driver
//!
//! Feeds samples one at a time into the configured strategy, optionally
//! re-resolving along the way to hand progressive output to a reporter.
//! Progress work reads the accumulated state and never changes it.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::input::{Sample, SampleSource};
use crate::naming::FieldNamer;
use crate::render::render_go;
use crate::schema::{derive_type, extract_structs, merge_types, order_fields, Resolver};
use crate::stats::StructStats;
use crate::types::{GeneratorConfig, ResolvedType, Schema, Strategy};

/// Sample counts that always trigger an update
const MILESTONES: [usize; 6] = [10, 100, 1_000, 10_000, 100_000, 1_000_000];

/// Leading samples that always trigger an update
const EAGER_UPDATES: usize = 5;

const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Receives rendered snapshots while a run is in progress
pub trait ProgressReporter {
    /// `total` is `None` when the input length is not known up front
    fn update(&mut self, text: &str, current: usize, total: Option<usize>);

    /// Reporters returning false are never handed snapshots
    fn wants_updates(&self) -> bool {
        true
    }
}

/// Reporter that discards every update
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn update(&mut self, _text: &str, _current: usize, _total: Option<usize>) {}

    fn wants_updates(&self) -> bool {
        false
    }
}

/// Decides after each sample whether a snapshot is worth rendering
#[derive(Debug)]
pub struct UpdatePolicy {
    interval: Duration,
    last_update: Instant,
}

impl UpdatePolicy {
    pub fn new(interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            interval
        };
        UpdatePolicy {
            interval,
            last_update: Instant::now(),
        }
    }

    pub fn should_update(&self, processed: usize, now: Instant) -> bool {
        now.duration_since(self.last_update) >= self.interval
            || processed % batch_size(processed) == 0
            || processed <= EAGER_UPDATES
            || MILESTONES.contains(&processed)
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_update = now;
    }
}

/// Batch size grows with the number of samples seen
fn batch_size(processed: usize) -> usize {
    match processed {
        n if n > 100_000 => 10_000,
        n if n > 10_000 => 1_000,
        n if n > 1_000 => 100,
        _ => 10,
    }
}

/// Running state of one strategy
enum State {
    Accumulate(StructStats),
    Merge(Option<ResolvedType>),
}

/// Drives a single run with an explicitly owned configuration
pub struct Pipeline<'a> {
    config: &'a GeneratorConfig,
    namer: FieldNamer,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Pipeline {
            config,
            namer: FieldNamer::new(),
        }
    }

    /// Run over an opened source, reporting skipped lines on empty input
    pub fn run_source(
        &mut self,
        mut source: SampleSource<'_>,
        reporter: &mut dyn ProgressReporter,
        cancel: Option<&AtomicBool>,
    ) -> Result<Schema> {
        let total = source.total_hint();
        match self.run(&mut source, total, reporter, cancel) {
            Err(Error::NoSamples { .. }) => Err(Error::NoSamples {
                skipped: source.skipped(),
            }),
            other => other,
        }
    }

    /// Fold every sample and produce the final schema
    ///
    /// Cancellation is checked between samples; a cancelled run resolves
    /// whatever it has seen so far.
    pub fn run<I>(
        &mut self,
        samples: I,
        total_hint: Option<usize>,
        reporter: &mut dyn ProgressReporter,
        cancel: Option<&AtomicBool>,
    ) -> Result<Schema>
    where
        I: IntoIterator<Item = Result<Sample>>,
    {
        let mut state = match self.config.strategy {
            Strategy::Accumulate => State::Accumulate(StructStats::new()),
            Strategy::Merge => State::Merge(None),
        };
        let mut policy = UpdatePolicy::new(self.config.update_interval);
        let mut last_text = String::new();
        let mut processed = 0usize;
        let progressive = reporter.wants_updates();

        for sample in samples {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                warn!(processed, "run cancelled");
                break;
            }

            let sample = sample?;
            self.observe(&mut state, sample);
            processed += 1;

            if !progressive {
                continue;
            }
            let now = Instant::now();
            if policy.should_update(processed, now) {
                let text = self.snapshot_text(&state);
                if text != last_text {
                    debug!(processed, "progress update");
                    reporter.update(&text, processed, total_hint);
                    last_text = text;
                    policy.mark(now);
                }
            }
        }

        if processed == 0 {
            return Err(Error::NoSamples { skipped: 0 });
        }

        info!(samples = processed, names = self.namer.cached(), "run complete");
        Ok(self.schema(&state))
    }

    fn observe(&mut self, state: &mut State, sample: Sample) {
        match state {
            State::Accumulate(stats) => stats.observe_sample(&mut self.namer, &sample),
            State::Merge(running) => {
                let derived = derive_type(&self.config.type_name, &Value::Object(sample), &mut self.namer);
                *running = Some(match running.take() {
                    Some(current) => merge_types(current, derived),
                    None => derived,
                });
            }
        }
    }

    fn schema(&mut self, state: &State) -> Schema {
        let root = match state {
            State::Accumulate(stats) => Resolver::new(self.config, &mut self.namer).resolve(stats),
            State::Merge(running) => {
                let mut root = running
                    .clone()
                    .unwrap_or_else(|| ResolvedType::record(self.config.type_name.clone(), Vec::new()));
                order_fields(&mut root, self.config.field_order);
                root
            }
        };

        if self.config.extract_structs {
            extract_structs(root, self.config)
        } else {
            Schema::new(root)
        }
    }

    /// Rendered text for a progress update; render failures fall back to the raw text
    fn snapshot_text(&mut self, state: &State) -> String {
        let schema = self.schema(state);
        match render_go(&schema, self.config) {
            Ok(text) => text,
            Err(Error::Render { text, .. }) => text,
            Err(err) => {
                debug!(error = %err, "progress render failed");
                String::new()
            }
        }
    }
}
