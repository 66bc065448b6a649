// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ranked snippet lists and their plain-text form.
//!
//! Lists are sorted by value descending; equal values are ordered by key
//! ascending so output is reproducible across runs.
use std::fmt::Display;
use std::io::{self, Write};

use crate::update::Timestamp;

/// Ranks `(key, score)` pairs, best first. NaN scores sort last.
pub fn rank_by_score<'a, I>(scores: I) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut ranked: Vec<(String, f64)> = scores
        .into_iter()
        .map(|(key, score)| (key.to_owned(), score))
        .collect();
    ranked.sort_by(|(ka, a), (kb, b)| {
        nan_last(*a)
            .total_cmp(&nan_last(*b))
            .reverse()
            .then_with(|| ka.cmp(kb))
    });
    ranked
}

/// Ranks `(key, count)` pairs, most frequent first.
pub fn rank_by_frequency<'a, I>(counts: I) -> Vec<(String, u64)>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut ranked: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(key, count)| (key.to_owned(), count))
        .collect();
    ranked.sort_by(|(ka, a), (kb, b)| b.cmp(a).then_with(|| ka.cmp(kb)));
    ranked
}

/// Writes one `key,value` line per entry.
pub fn write_ranked<W, V>(out: &mut W, ranked: &[(String, V)]) -> io::Result<()>
where
    W: Write,
    V: Display,
{
    for (key, value) in ranked {
        writeln!(out, "{key},{value}")?;
    }
    Ok(())
}

/// Writes one `key,t1,t2,...` line per key, keys in ascending order.
pub fn write_occurrences<'a, W, I>(out: &mut W, occurrences: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, &'a [Timestamp])>,
{
    let mut rows: Vec<_> = occurrences.into_iter().collect();
    rows.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
    for (key, times) in rows {
        write!(out, "{key}")?;
        for t in times {
            write!(out, ",{t}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn nan_last(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}
