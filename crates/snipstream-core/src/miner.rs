// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Online mining pipeline: clock, extraction, batched scoring.
use tracing::debug;

use crate::clock::Clock;
use crate::config::MinerConfig;
use crate::error::{ConfigError, UpdateError};
use crate::extractor::Extractor;
use crate::persistence::PersistenceEngine;
use crate::update::{Timestamp, Update};

/// One snippet touched by an update, with its score after the update.
#[derive(Clone, Debug, PartialEq)]
pub struct OccurrenceEvent {
    /// Canonical snippet key.
    pub key: String,
    /// Time of the update that produced the occurrence.
    pub timestamp: Timestamp,
    /// Persistence after folding in this update's occurrences.
    pub score: f64,
    /// Total occurrences so far.
    pub frequency: u64,
}

impl OccurrenceEvent {
    /// `[score, log10(frequency + 1)]`, the point handed to anomaly scoring.
    pub fn feature_point(&self) -> [f64; 2] {
        [self.score, ((self.frequency + 1) as f64).log10()]
    }
}

/// Streams updates through extraction and incremental scoring.
///
/// Every occurrence an update produces is recorded first; scores are then
/// recomputed once per distinct key so that several occurrences of one key
/// within an update count as a single new distinct timestamp.
#[derive(Debug)]
pub struct SnippetMiner {
    config: MinerConfig,
    clock: Clock,
    extractor: Extractor,
    engine: PersistenceEngine,
    events: Vec<OccurrenceEvent>,
    processed: u64,
}

impl SnippetMiner {
    /// Builds a miner, rejecting invalid configurations.
    pub fn new(config: MinerConfig) -> Result<Self, ConfigError> {
        let extractor = Extractor::new(&config)?;
        let engine = PersistenceEngine::new(&config)?;
        config.warn_if_capped();
        Ok(Self {
            config,
            clock: Clock::default(),
            extractor,
            engine,
            events: Vec::new(),
            processed: 0,
        })
    }

    /// Processes one update and returns an event per distinct snippet it
    /// touched, in discovery order.
    pub fn process_update(&mut self, update: Update) -> &[OccurrenceEvent] {
        let now = self.clock.tick(update.timestamp);
        self.engine.begin_batch(now);
        self.extractor.process_update(update, now, &mut self.engine);

        let events = &mut self.events;
        events.clear();
        self.engine.flush(|key, state| {
            events.push(OccurrenceEvent {
                key: key.to_owned(),
                timestamp: now,
                score: state.score,
                frequency: state.occ_count,
            });
        });
        self.processed += 1;
        debug!(
            time = now,
            snippets = self.events.len(),
            buffered = self.extractor.len(),
            known = self.engine.len(),
            "update processed"
        );
        &self.events
    }

    /// Processes a record from an [`UpdateReader`](crate::UpdateReader),
    /// propagating ingestion errors untouched.
    pub fn process_record(
        &mut self,
        record: Result<Update, UpdateError>,
    ) -> Result<&[OccurrenceEvent], UpdateError> {
        Ok(self.process_update(record?))
    }

    /// Current persistence of `key`, decayed to the current time.
    pub fn score(&self, key: &str) -> Option<f64> {
        self.engine.score(key)
    }

    /// Number of occurrences of `key` so far.
    pub fn frequency(&self, key: &str) -> Option<u64> {
        self.engine.frequency(key)
    }

    /// Every known key with its current (decayed) persistence.
    pub fn scores(&self) -> impl Iterator<Item = (&str, f64)> {
        self.engine
            .iter()
            .filter_map(|(key, _)| self.engine.score(key).map(|score| (key, score)))
    }

    /// Every known key with its occurrence count.
    pub fn frequencies(&self) -> impl Iterator<Item = (&str, u64)> {
        self.engine.iter().map(|(key, state)| (key, state.occ_count))
    }

    /// Scoring engine.
    pub fn engine(&self) -> &PersistenceEngine {
        &self.engine
    }

    /// Extractor state.
    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Configuration in use.
    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Current stream time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Number of updates processed.
    pub fn processed(&self) -> u64 {
        self.processed
    }
}
