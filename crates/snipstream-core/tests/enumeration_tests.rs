// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use std::collections::BTreeMap;

use proptest::prelude::*;

use snipstream_core::{
    Extractor, MinerConfig, OccurrenceSink, SnippetMiner, Timestamp, Update, View,
};

fn timed(u: u8, v: u8, t: Timestamp) -> Update {
    Update::edge("1", &u.to_string(), &v.to_string(), "1").at(t)
}

fn stream(edges: &[(u8, u8, Timestamp)]) -> Vec<Update> {
    let mut t = 1;
    edges
        .iter()
        .map(|&(u, v, dt)| {
            t += dt;
            timed(u, v, t)
        })
        .collect()
}

#[derive(Default)]
struct Tally(BTreeMap<String, u64>);

impl OccurrenceSink for Tally {
    fn record(&mut self, key: &str) {
        *self.0.entry(key.to_owned()).or_default() += 1;
    }
}

fn id_key(update: &Update) -> String {
    format!("{}_{}_{}_{}", update.op, update.u, update.v, update.edge_label)
}

/// Quadratic re-enumeration of every snippet containing each update, over
/// the updates no older than `window` at that moment.
fn brute_force(updates: &[Update], window: Timestamp, max_size: usize) -> Tally {
    let mut tally = Tally::default();
    let time = |i: usize| updates[i].timestamp.unwrap();
    let adjacent = |a: usize, b: usize| updates[a].shares_node_with(&updates[b]);
    for (n, update) in updates.iter().enumerate() {
        tally.record(&id_key(update));
        if max_size < 2 {
            continue;
        }
        let live: Vec<usize> = (0..n).filter(|&j| time(n) - time(j) <= window).collect();
        for &j in &live {
            if adjacent(j, n) {
                tally.record(&format!("{}|{}", id_key(&updates[j]), id_key(update)));
            }
        }
        if max_size < 3 {
            continue;
        }
        for (a, &j) in live.iter().enumerate() {
            for &k in &live[a + 1..] {
                // j is older than k: either the newest links both, or it
                // links k and k links back to j.
                let hub = adjacent(n, j) && adjacent(n, k);
                let path = adjacent(n, k) && adjacent(k, j);
                if !(hub || path) {
                    continue;
                }
                let mut members = [j, k, n];
                members.sort_by(|&x, &y| {
                    time(x)
                        .cmp(&time(y))
                        .then_with(|| id_key(&updates[x]).cmp(&id_key(&updates[y])))
                });
                let key = members
                    .iter()
                    .map(|&m| id_key(&updates[m]))
                    .collect::<Vec<_>>()
                    .join("|");
                tally.record(&key);
            }
        }
    }
    tally
}

fn extract(updates: &[Update], config: &MinerConfig) -> (Tally, Extractor) {
    let mut extractor = Extractor::new(config).unwrap();
    let mut tally = Tally::default();
    for update in updates {
        let now = update.timestamp.unwrap();
        extractor.process_update(update.clone(), now, &mut tally);
    }
    (tally, extractor)
}

fn edges_strategy() -> impl Strategy<Value = Vec<(u8, u8, Timestamp)>> {
    prop::collection::vec((0_u8..8, 0_u8..8, 0_i64..=3), 1..80)
}

proptest! {
    #[test]
    fn extraction_matches_brute_force(
        edges in edges_strategy(),
        window in 1_i64..=5,
        max_size in 1_usize..=3,
    ) {
        let updates = stream(&edges);
        let (tally, extractor) = extract(&updates, &MinerConfig::new(window, max_size));
        prop_assert_eq!(&tally.0, &brute_force(&updates, window, max_size).0);

        // Everything still buffered is inside the window of the newest update.
        let now = updates[updates.len() - 1].timestamp.unwrap();
        prop_assert!(extractor.singletons().all(|s| now - s.age <= window));
    }

    #[test]
    fn order_view_is_invariant_under_relabeling(
        edges in prop::collection::vec((0_u8..11, 0_u8..11, 0_i64..=2), 1..60),
        window in 1_i64..=4,
    ) {
        let config = MinerConfig::new(window, 3).with_view(View::Order);
        let relabeled: Vec<_> = edges
            .iter()
            .map(|&(u, v, dt)| ((7 * u + 3) % 11, (7 * v + 3) % 11, dt))
            .collect();
        let mut original = SnippetMiner::new(config.clone()).unwrap();
        let mut renamed = SnippetMiner::new(config).unwrap();
        for (a, b) in stream(&edges).into_iter().zip(stream(&relabeled)) {
            let left: Vec<String> = original.process_update(a).iter().map(|e| e.key.clone()).collect();
            let right: Vec<String> = renamed.process_update(b).iter().map(|e| e.key.clone()).collect();
            prop_assert_eq!(left, right);
        }
    }
}

#[test]
fn relabeling_changes_id_keys_but_not_order_keys() {
    let updates = stream(&[(1, 2, 0), (2, 3, 1), (3, 1, 1)]);
    let renamed = stream(&[(4, 5, 0), (5, 6, 1), (6, 4, 1)]);
    let (ids, _) = extract(&updates, &MinerConfig::new(3, 3));
    let (renamed_ids, _) = extract(&renamed, &MinerConfig::new(3, 3));
    assert_ne!(ids.0, renamed_ids.0);

    let order = MinerConfig::new(3, 3).with_view(View::Order);
    assert_eq!(extract(&updates, &order).0 .0, extract(&renamed, &order).0 .0);
}

#[test]
fn label_view_ignores_node_ids() {
    let mut a = Update::edge("1", "10", "11", "e");
    a.label_u = "user".into();
    a.label_v = "item".into();
    let mut b = Update::edge("1", "20", "21", "e");
    b.label_u = "user".into();
    b.label_v = "item".into();
    let (tally, _) = extract(
        &[a.at(1), b.at(2)],
        &MinerConfig::new(3, 1).with_view(View::Label),
    );
    assert_eq!(tally.0.get("1_user_item_e"), Some(&2));
}
