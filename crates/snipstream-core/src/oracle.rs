// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Full-history scoring: the semantic oracle for the online engine and the
//! binned "persistent items in data streams" baseline.
//!
//! Everything here stores every occurrence timestamp of every key, so memory
//! grows with the stream. Use it for validation and small comparisons.
use rustc_hash::FxHashMap;

use crate::clock::Clock;
use crate::config::MinerConfig;
use crate::error::{ConfigError, UpdateError};
use crate::extractor::{Extractor, OccurrenceSink};
use crate::persistence::{coverage, frequency};
use crate::update::{Timestamp, Update};

/// Number of equal-width periods the binned baseline splits the stream into.
pub const DEFAULT_MEASUREMENT_PERIODS: usize = 60;

/// Occurrence lists per key and batch recomputation of persistence.
#[derive(Debug)]
pub struct ReferenceOracle {
    alpha: f64,
    beta: f64,
    gamma: f64,
    occurrences: FxHashMap<String, Vec<Timestamp>>,
    stream_start: Option<Timestamp>,
    now: Timestamp,
}

impl ReferenceOracle {
    /// Oracle scoring with the exponents of `config`.
    pub fn new(config: &MinerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            alpha: config.alpha,
            beta: config.beta,
            gamma: config.gamma,
            occurrences: FxHashMap::default(),
            stream_start: None,
            now: 0,
        })
    }

    /// Moves the clock to `now`; the first call fixes the stream start.
    pub fn advance(&mut self, now: Timestamp) {
        self.now = now;
        self.stream_start.get_or_insert(now);
    }

    /// Appends an occurrence of `key` at `ts`.
    pub fn record_occurrence(&mut self, key: &str, ts: Timestamp) {
        match self.occurrences.get_mut(key) {
            Some(times) => times.push(ts),
            None => {
                self.occurrences.insert(key.to_owned(), vec![ts]);
            }
        }
    }

    /// Persistence of `key` over `[stream_start, now]`, recomputed from its
    /// full occurrence list.
    pub fn persistence(&self, key: &str) -> Option<f64> {
        self.persistence_of(self.occurrences.get(key)?)
    }

    /// Persistence of every key, in arbitrary order.
    pub fn persistence_all(&self) -> impl Iterator<Item = (&str, f64)> {
        self.occurrences
            .iter()
            .filter_map(|(key, times)| Some((key.as_str(), self.persistence_of(times)?)))
    }

    /// Number of measurement periods in which each key occurred, with
    /// `[stream_start, now]` split into `periods` equal-width bins.
    pub fn binned_persistence(&self, periods: usize) -> impl Iterator<Item = (&str, u64)> {
        let start = self.stream_start.unwrap_or(self.now);
        let width = (self.now - start) as f64 / periods.max(1) as f64;
        let edges: Vec<f64> = (0..periods.max(1))
            .map(|i| start as f64 + width * i as f64)
            .collect();
        self.occurrences.iter().map(move |(key, times)| {
            let mut bins: Vec<usize> = times
                .iter()
                .map(|&t| edges.partition_point(|&edge| edge <= t as f64))
                .collect();
            bins.sort_unstable();
            bins.dedup();
            (key.as_str(), bins.len() as u64)
        })
    }

    /// Stored occurrence times of `key`, in recording order.
    pub fn occurrences(&self, key: &str) -> Option<&[Timestamp]> {
        self.occurrences.get(key).map(Vec::as_slice)
    }

    /// Every key with its occurrence times.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Timestamp])> {
        self.occurrences
            .iter()
            .map(|(key, times)| (key.as_str(), times.as_slice()))
    }

    /// Number of occurrences of `key`, duplicates included.
    pub fn frequency(&self, key: &str) -> Option<u64> {
        self.occurrences.get(key).map(|times| times.len() as u64)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    /// True before any occurrence was recorded.
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    fn persistence_of(&self, times: &[Timestamp]) -> Option<f64> {
        let start = self.stream_start?;
        let mut sorted = times.to_vec();
        sorted.sort_unstable();
        let (&first, &last) = (sorted.first()?, sorted.last()?);
        let w = coverage(first, last, self.now - start);
        let f = frequency(sorted.len() as u64);
        sorted.dedup();
        let s = if sorted.len() <= 2 {
            1.0
        } else {
            let gaps: Vec<f64> = sorted.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
            gap_entropy(&gaps) / (gaps.len() as f64).log2() + 1.0
        };
        Some(w.powf(self.alpha) * f.powf(self.beta) * s.powf(self.gamma))
    }
}

impl OccurrenceSink for ReferenceOracle {
    fn record(&mut self, key: &str) {
        self.record_occurrence(key, self.now);
    }
}

/// Shannon entropy (bits) of the gaps normalized by their total.
fn gap_entropy(gaps: &[f64]) -> f64 {
    let total: f64 = gaps.iter().sum();
    -gaps
        .iter()
        .map(|gap| gap / total)
        .filter(|&p| p > 0.0)
        .map(|p| p * p.log2())
        .sum::<f64>()
}

/// Offline pipeline: extraction into a [`ReferenceOracle`], scored after the
/// stream ends.
#[derive(Debug)]
pub struct OfflineMiner {
    clock: Clock,
    extractor: Extractor,
    oracle: ReferenceOracle,
    processed: u64,
}

impl OfflineMiner {
    /// Builds an offline miner, rejecting invalid configurations.
    pub fn new(config: &MinerConfig) -> Result<Self, ConfigError> {
        let extractor = Extractor::new(config)?;
        let oracle = ReferenceOracle::new(config)?;
        config.warn_if_capped();
        Ok(Self {
            clock: Clock::default(),
            extractor,
            oracle,
            processed: 0,
        })
    }

    /// Extracts one update and records its occurrences.
    pub fn process_update(&mut self, update: Update) {
        let now = self.clock.tick(update.timestamp);
        self.oracle.advance(now);
        self.extractor.process_update(update, now, &mut self.oracle);
        self.processed += 1;
    }

    /// Processes a reader record, propagating ingestion errors.
    pub fn process_record(&mut self, record: Result<Update, UpdateError>) -> Result<(), UpdateError> {
        self.process_update(record?);
        Ok(())
    }

    /// Recorded occurrences.
    pub fn oracle(&self) -> &ReferenceOracle {
        &self.oracle
    }

    /// Extractor state.
    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Current stream time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Consumes the miner, keeping the recorded occurrences.
    pub fn into_oracle(self) -> ReferenceOracle {
        self.oracle
    }

    /// Number of updates processed.
    pub fn processed(&self) -> u64 {
        self.processed
    }
}
