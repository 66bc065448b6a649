// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! snipstream-core: windowed activity-snippet mining over graph edge streams.
//!
//! An update stream is folded into small connected "activity snippets"
//! (one to three recent updates that share nodes). Every distinct snippet
//! carries a persistence score `W^α · F^β · S^γ` blending coverage,
//! frequency and temporal regularity, maintained in amortized constant time
//! per occurrence.
//!
//! The online path is [`SnippetMiner`]: [`Clock`] → [`Extractor`] →
//! [`PersistenceEngine`] batch flush → [`OccurrenceEvent`]s. The
//! [`OfflineMiner`] / [`ReferenceOracle`] pair recomputes the same scores from
//! full occurrence history and exists for validation and baselines.
#![forbid(unsafe_code)]

mod clock;
mod codec;
mod config;
mod error;
mod extractor;
mod miner;
mod oracle;
mod persistence;
pub mod report;
mod source;
mod update;

// Re-exports for stable public API
pub use clock::Clock;
pub use codec::{NameMap, Singleton, SnippetCodec, View, KEY_SEPARATOR, TOKEN_SEPARATOR};
pub use config::{MinerConfig, MAX_ENUMERATED_SIZE};
pub use error::{ConfigError, UpdateError};
pub use extractor::{Extractor, OccurrenceSink};
pub use miner::{OccurrenceEvent, SnippetMiner};
pub use oracle::{OfflineMiner, ReferenceOracle, DEFAULT_MEASUREMENT_PERIODS};
pub use persistence::{EngineStats, PersistenceEngine, PersistenceState, Phase};
pub use source::{UpdateReader, DEFAULT_DELIMITER};
pub use update::{NodeId, Timestamp, Update};
