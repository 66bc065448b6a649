// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Windowed snippet extraction.
//!
//! The extractor keeps the singletons that arrived within `window_size` of
//! the newest update, oldest first, together with a compatibility graph over
//! them: each buffered singleton lists backward offsets to the older
//! singletons it shares a node with. Offsets are relative to the owning
//! entry, so evicting from the front never rewrites a link; a link whose
//! target has been evicted simply reaches past the front of the buffer and
//! is skipped.
//!
//! For every new update the extractor reports, through an
//! [`OccurrenceSink`], one occurrence per connected snippet of size 1, 2 or 3
//! that contains the new update.
use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::codec::{Singleton, SnippetCodec, View};
use crate::config::MinerConfig;
use crate::error::ConfigError;
use crate::update::{Timestamp, Update};

/// Receives snippet occurrences discovered while processing one update.
pub trait OccurrenceSink {
    /// Records one occurrence of `key` at the current update's time.
    fn record(&mut self, key: &str);
}

impl OccurrenceSink for Vec<String> {
    fn record(&mut self, key: &str) {
        self.push(key.to_owned());
    }
}

#[derive(Debug)]
struct Slot {
    singleton: Singleton,
    /// Backward offsets to compatible older entries (size-3 mode only).
    links: Vec<usize>,
}

/// Sliding buffer of singletons plus bounded connected-subgraph enumeration.
#[derive(Debug)]
pub struct Extractor {
    codec: SnippetCodec,
    buffer: VecDeque<Slot>,
    window_size: Timestamp,
    max_size: usize,
    /// Canonical `(older offset, newer offset)` pairs already emitted as
    /// triples for the current update.
    seen_triples: FxHashSet<(usize, usize)>,
}

impl Extractor {
    /// Builds an extractor from a validated configuration.
    pub fn new(config: &MinerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            codec: SnippetCodec::new(config.view),
            buffer: VecDeque::new(),
            window_size: config.window_size,
            max_size: config.effective_max_size(),
            seen_triples: FxHashSet::default(),
        })
    }

    /// Processes one update arriving at `now`, reporting every snippet
    /// occurrence that contains it.
    ///
    /// Order of reports: the singleton, then pairs (oldest partner first),
    /// then triples.
    pub fn process_update<S>(&mut self, update: Update, now: Timestamp, sink: &mut S)
    where
        S: OccurrenceSink + ?Sized,
    {
        let singleton = self.codec.build_singleton(update, now);
        sink.record(&singleton.key);
        if self.max_size < 2 {
            return;
        }
        self.buffer.push_back(Slot {
            singleton,
            links: Vec::new(),
        });
        let keep_links = self.max_size >= 3;
        self.create_pairs(now, keep_links, sink);
        if keep_links {
            self.create_triples(now, sink);
        }
    }

    /// Scans every older buffered singleton: stale ones are counted, live
    /// compatible ones form a pair with the newest. The stale count is then
    /// chopped from the front in one step.
    fn create_pairs<S>(&mut self, now: Timestamp, keep_links: bool, sink: &mut S)
    where
        S: OccurrenceSink + ?Sized,
    {
        let newest = self.buffer.len() - 1;
        let mut stale = 0;
        let mut links = Vec::new();
        let new_update = &self.buffer[newest].singleton.update;
        for (i, slot) in self.buffer.iter().take(newest).enumerate() {
            if now - slot.singleton.age > self.window_size {
                stale += 1;
                continue;
            }
            if slot.singleton.is_compatible_with(new_update) {
                if keep_links {
                    links.push(newest - i);
                }
                sink.record(&self.codec.pair_key(&slot.singleton, new_update));
            }
        }
        self.buffer[newest].links = links;
        if stale > 0 {
            self.buffer.drain(..stale);
            trace!(evicted = stale, buffered = self.buffer.len(), "evicted stale singletons");
        }
    }

    /// Enumerates connected triples containing the newest singleton.
    ///
    /// Two searches cover every shape: pairs of direct neighbours (the
    /// newest is a hub) and neighbour-of-neighbour paths (the newest is an
    /// endpoint). Each unordered pair of partners is emitted once.
    fn create_triples<S>(&mut self, now: Timestamp, sink: &mut S)
    where
        S: OccurrenceSink + ?Sized,
    {
        let newest = self.buffer.len() - 1;
        self.seen_triples.clear();

        let pairs = self.codec.pairs(&self.buffer[newest].links);
        for &(first, second) in pairs.iter() {
            if first > newest || second > newest {
                continue;
            }
            self.seen_triples.insert(canonical(first, second));
            emit_triple(
                &self.buffer,
                &self.codec,
                [newest, newest - first, newest - second],
                sink,
            );
        }

        for &hop in &self.buffer[newest].links {
            if hop > newest {
                continue;
            }
            let one_hop = newest - hop;
            for &next in &self.buffer[one_hop].links {
                let total = hop + next;
                if total > newest {
                    continue;
                }
                let two_hop = newest - total;
                if now - self.buffer[two_hop].singleton.age > self.window_size {
                    continue;
                }
                if !self.seen_triples.insert(canonical(hop, total)) {
                    continue;
                }
                emit_triple(&self.buffer, &self.codec, [newest, one_hop, two_hop], sink);
            }
        }
    }

    /// Number of buffered singletons.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Buffered singletons, oldest first.
    pub fn singletons(&self) -> impl Iterator<Item = &Singleton> {
        self.buffer.iter().map(|slot| &slot.singleton)
    }

    /// Singleton `back` positions behind the newest (0 is the newest).
    pub fn singleton(&self, back: usize) -> Option<&Singleton> {
        self.position(back).map(|pos| &self.buffer[pos].singleton)
    }

    /// Backward compatibility offsets of the singleton `back` positions
    /// behind the newest. Empty unless the maximum snippet size is 3.
    pub fn links(&self, back: usize) -> Option<&[usize]> {
        self.position(back).map(|pos| self.buffer[pos].links.as_slice())
    }

    /// Structural window.
    pub fn window_size(&self) -> Timestamp {
        self.window_size
    }

    /// Largest snippet size enumerated (1 to 3).
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Active view.
    pub fn view(&self) -> View {
        self.codec.view()
    }

    fn position(&self, back: usize) -> Option<usize> {
        self.buffer.len().checked_sub(back + 1)
    }
}

fn canonical(a: usize, b: usize) -> (usize, usize) {
    (a.max(b), a.min(b))
}

/// Orders `[newest, first, second]` by age then key and records the key.
///
/// The sort is stable over `[second, first, newest]`, so fully tied
/// candidates keep that order.
fn emit_triple<S>(
    buffer: &VecDeque<Slot>,
    codec: &SnippetCodec,
    [newest, first, second]: [usize; 3],
    sink: &mut S,
) where
    S: OccurrenceSink + ?Sized,
{
    let mut ordered = [
        &buffer[second].singleton,
        &buffer[first].singleton,
        &buffer[newest].singleton,
    ];
    ordered.sort_by(|a, b| a.combination_order(b));
    sink.record(&codec.triple_key(ordered));
}
