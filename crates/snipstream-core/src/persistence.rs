// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Incremental persistence scoring.
//!
//! The persistence of a snippet is `P = W^α · F^β · S^γ`:
//!
//! - `W = (tl − tf + 1) / (T + 1)`: coverage of the elapsed stream, where
//!   `tf`/`tl` are the first/last occurrence and `T = now − stream_start`.
//!   The scoring interval only grows; it is not the extractor window.
//! - `F = log10(n + 1)`: frequency over all `n` occurrences.
//! - `S`: regularity. `1` until the snippet has occurred at three distinct
//!   times, then `H / log2(gaps) + 1` where `H` is the Shannon entropy (bits)
//!   of the inter-occurrence gaps weighted by their length.
//!
//! `H` is carried forward with a closed-form recurrence over the running gap
//! total, so no occurrence history is stored. Per-key state is created on
//! first sight and never evicted.
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::config::MinerConfig;
use crate::error::ConfigError;
use crate::extractor::OccurrenceSink;
use crate::update::Timestamp;

/// Where a snippet is in its scoring life cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Seen at one distinct time; `S = 1`.
    FirstOccurrence,
    /// Seen at two distinct times (one gap); `S = 1`.
    SecondOccurrence,
    /// Three or more distinct times; `S` follows the entropy recurrence.
    SteadyState,
}

/// Scalar state kept per snippet key.
///
/// Invariants
/// - `first_occ <= last_occ` for time-ordered streams.
/// - `occ_count >= 1` once the key has been processed.
/// - `entropy` is the unnormalized gap entropy over `gap_count` gaps.
#[derive(Clone, Debug, PartialEq)]
pub struct PersistenceState {
    /// Time of the first occurrence.
    pub first_occ: Timestamp,
    /// Time of the most recent processed occurrence.
    pub last_occ: Timestamp,
    /// Total processed occurrences.
    pub occ_count: u64,
    /// Number of gaps between distinct occurrence times.
    pub gap_count: u64,
    /// Unnormalized gap entropy in bits.
    pub entropy: f64,
    /// Score computed at the last processed occurrence.
    pub score: f64,
    /// Occurrences recorded in the current batch, not yet processed.
    pending: u64,
}

impl PersistenceState {
    fn new(first: Timestamp) -> Self {
        Self {
            first_occ: first,
            last_occ: first,
            occ_count: 0,
            gap_count: 0,
            entropy: 0.0,
            score: 0.0,
            pending: 0,
        }
    }

    /// Current life-cycle phase.
    pub fn phase(&self) -> Phase {
        match self.gap_count {
            0 => Phase::FirstOccurrence,
            1 => Phase::SecondOccurrence,
            _ => Phase::SteadyState,
        }
    }
}

/// Counters describing the work the engine has done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Full coverage/frequency/regularity recomputes.
    pub recomputes: u64,
    /// Updates that only swapped the frequency factor.
    pub fast_path: u64,
    /// Entropy updates that hit a non-finite intermediate and were recovered.
    pub degeneracies: u64,
}

/// Per-snippet persistence state and its update recurrences.
///
/// Occurrences arrive through [`record_occurrence`](Self::record_occurrence)
/// (or the [`OccurrenceSink`] impl) while one update is being extracted.
/// They are coalesced per key and scored once by [`flush`](Self::flush).
#[derive(Debug)]
pub struct PersistenceEngine {
    alpha: f64,
    beta: f64,
    gamma: f64,
    states: FxHashMap<String, PersistenceState>,
    /// Keys with pending occurrences, in discovery order.
    batch: Vec<String>,
    stream_start: Option<Timestamp>,
    now: Timestamp,
    stats: EngineStats,
}

impl PersistenceEngine {
    /// Engine scoring with the exponents of `config`.
    pub fn new(config: &MinerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            alpha: config.alpha,
            beta: config.beta,
            gamma: config.gamma,
            states: FxHashMap::default(),
            batch: Vec::new(),
            stream_start: None,
            now: 0,
            stats: EngineStats::default(),
        })
    }

    /// Starts the batch for an update arriving at `now`.
    ///
    /// The first call fixes the stream start used by the coverage term.
    /// Batch times are monotone: an earlier `now` keeps the current time.
    pub fn begin_batch(&mut self, now: Timestamp) {
        if self.stream_start.is_none() || now > self.now {
            self.now = now;
        }
        self.stream_start.get_or_insert(now);
    }

    /// Records one occurrence of `key` at `ts` into the current batch.
    pub fn record_occurrence(&mut self, key: &str, ts: Timestamp) {
        if let Some(state) = self.states.get_mut(key) {
            if state.pending == 0 {
                self.batch.push(key.to_owned());
            }
            state.pending += 1;
            return;
        }
        let mut state = PersistenceState::new(ts);
        state.pending = 1;
        self.states.insert(key.to_owned(), state);
        self.batch.push(key.to_owned());
    }

    /// Folds the pending occurrences of `key` into its score at time `ts`.
    ///
    /// Returns the new score, or `None` for an unknown key. Calling it with
    /// nothing pending leaves the state untouched. A `ts` earlier than the
    /// last processed occurrence is scored at that occurrence instead.
    pub fn process(&mut self, key: &str, ts: Timestamp) -> Option<f64> {
        let state = self.states.get_mut(key)?;
        let ts = ts.max(state.last_occ);
        let new = std::mem::take(&mut state.pending);
        if new == 0 {
            return (state.occ_count > 0).then_some(state.score);
        }
        let old_count = state.occ_count;
        let old_last = state.last_occ;
        if ts == old_last && old_count > 0 {
            // Same distinct time as the last score: coverage and regularity
            // are unchanged, only the frequency factor moves.
            state.score = state.score / frequency(old_count).powf(self.beta)
                * frequency(old_count + new).powf(self.beta);
            self.stats.fast_path += 1;
        } else {
            let start = self.stream_start.unwrap_or(state.first_occ);
            let w = coverage(state.first_occ, ts, ts - start);
            let f = frequency(old_count + new);
            let s = regularity(state, key, old_last, ts, &mut self.stats);
            state.score = w.powf(self.alpha) * f.powf(self.beta) * s.powf(self.gamma);
            self.stats.recomputes += 1;
        }
        state.last_occ = ts;
        state.occ_count += new;
        Some(state.score)
    }

    /// Scores every key touched in the current batch, once each, in
    /// discovery order, handing each to `on_scored`.
    pub fn flush<F>(&mut self, mut on_scored: F)
    where
        F: FnMut(&str, &PersistenceState),
    {
        let now = self.now;
        let mut batch = std::mem::take(&mut self.batch);
        for key in &batch {
            if self.process(key, now).is_some() {
                if let Some(state) = self.states.get(key) {
                    on_scored(key, state);
                }
            }
        }
        batch.clear();
        self.batch = batch;
    }

    /// Current persistence of `key` without recording an occurrence.
    ///
    /// The stored score is decayed to the current clock by swapping the
    /// coverage factor computed at the last occurrence for one computed
    /// against `now`; frequency and regularity are left as they were.
    pub fn score(&self, key: &str) -> Option<f64> {
        let state = self.states.get(key).filter(|s| s.occ_count > 0)?;
        let start = self.stream_start?;
        let then = coverage(state.first_occ, state.last_occ, state.last_occ - start);
        let now = coverage(state.first_occ, state.last_occ, self.now - start);
        Some(state.score / then.powf(self.alpha) * now.powf(self.alpha))
    }

    /// Number of processed occurrences of `key`.
    pub fn frequency(&self, key: &str) -> Option<u64> {
        self.states.get(key).map(|s| s.occ_count)
    }

    /// Full state of `key`.
    pub fn state(&self, key: &str) -> Option<&PersistenceState> {
        self.states.get(key)
    }

    /// All known keys and their states, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PersistenceState)> {
        self.states.iter().map(|(k, s)| (k.as_str(), s))
    }

    /// Number of distinct keys ever seen.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True before any occurrence was recorded.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Time of the first batch.
    pub fn stream_start(&self) -> Option<Timestamp> {
        self.stream_start
    }

    /// Time of the current batch.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Work counters.
    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}

impl OccurrenceSink for PersistenceEngine {
    fn record(&mut self, key: &str) {
        self.record_occurrence(key, self.now);
    }
}

/// `(last − first + 1) / (elapsed + 1)`.
pub(crate) fn coverage(first: Timestamp, last: Timestamp, elapsed: Timestamp) -> f64 {
    (last - first + 1) as f64 / (elapsed + 1) as f64
}

/// `log10(count + 1)`.
pub(crate) fn frequency(count: u64) -> f64 {
    ((count + 1) as f64).log10()
}

fn regularity(
    state: &mut PersistenceState,
    key: &str,
    old_last: Timestamp,
    ts: Timestamp,
    stats: &mut EngineStats,
) -> f64 {
    if ts == state.first_occ {
        return 1.0;
    }
    if old_last == state.first_occ {
        state.gap_count = 1;
        state.entropy = 0.0;
        return 1.0;
    }
    let total = (old_last - state.first_occ) as f64;
    let gap = (ts - old_last) as f64;
    state.gap_count += 1;
    if let Some(entropy) = entropy_step(state.entropy, total, gap) {
        state.entropy = entropy;
        return entropy / (state.gap_count as f64).log2() + 1.0;
    }
    warn!(
        key,
        entropy = state.entropy,
        total,
        gap,
        "gap entropy update degenerate; regularity reset"
    );
    stats.degeneracies += 1;
    state.entropy = 0.0;
    1.0
}

/// Entropy of the gap distribution after appending `gap` to gaps summing to
/// `total`, given their entropy `h`. `None` when a logarithm argument is not
/// positive or the result is not finite.
fn entropy_step(h: f64, total: f64, gap: f64) -> Option<f64> {
    if !(total > 0.0 && gap > 0.0) {
        return None;
    }
    let next_total = total + gap;
    let share = gap / next_total;
    let next = h + (total / next_total) * next_total.log2() - total.log2()
        + ((1.0 / total) - (1.0 / next_total)) * (total.log2() - h) * total
        - share * share.log2();
    next.is_finite().then_some(next)
}
