// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use snipstream_core::{MinerConfig, OfflineMiner, SnippetMiner, Update, View};

fn edge(u: &str, v: &str) -> Update {
    Update::edge("1", u, v, "1")
}

/// Feeds `updates` on the logical clock and returns the offline miner.
fn mine(config: &MinerConfig, updates: impl IntoIterator<Item = Update>) -> OfflineMiner {
    let mut miner = OfflineMiner::new(config).unwrap();
    for update in updates {
        miner.process_update(update);
    }
    miner
}

fn count(miner: &OfflineMiner, key: &str) -> u64 {
    miner.oracle().frequency(key).unwrap_or(0)
}

fn cycle<'a>(edges: [(&'a str, &'a str); 3], times: usize) -> impl Iterator<Item = Update> + 'a {
    std::iter::repeat(edges)
        .take(times)
        .flat_map(|round| round.into_iter().map(|(u, v)| edge(u, v)))
}

#[test]
fn repeating_self_loop_reaches_steady_state() {
    // Window 3 admits the current update and the three before it.
    let miner = mine(
        &MinerConfig::new(3, 4),
        std::iter::repeat_with(|| edge("1", "1")).take(100),
    );
    assert_eq!(miner.extractor().len(), 4);
    assert_eq!(count(&miner, "1_1_1_1"), 100);
    // 1 + 2 + 3 * 97 partners.
    assert_eq!(count(&miner, "1_1_1_1|1_1_1_1"), 294);
    // C(2,2) + C(3,2) * 97 partner pairs.
    assert_eq!(count(&miner, "1_1_1_1|1_1_1_1|1_1_1_1"), 292);
}

#[test]
fn online_miner_counts_repeating_self_loop() {
    let mut miner = SnippetMiner::new(MinerConfig::new(3, 4)).unwrap();
    for _ in 0..100 {
        miner.process_update(edge("1", "1"));
    }
    assert_eq!(miner.extractor().len(), 4);
    assert_eq!(miner.frequency("1_1_1_1"), Some(100));
    assert_eq!(miner.frequency("1_1_1_1|1_1_1_1"), Some(294));
    assert_eq!(miner.frequency("1_1_1_1|1_1_1_1|1_1_1_1"), Some(292));
    assert_eq!(miner.engine().len(), 3);
}

#[test]
fn disjoint_pair_never_combines_but_joins_a_triple() {
    let miner = mine(
        &MinerConfig::new(3, 3),
        cycle([("1", "2"), ("3", "4"), ("1", "4")], 100),
    );
    assert_eq!(miner.extractor().len(), 4);
    for key in ["1_1_2_1", "1_3_4_1", "1_1_4_1"] {
        assert_eq!(count(&miner, key), 100, "{key}");
    }
    assert_eq!(count(&miner, "1_1_2_1|1_3_4_1"), 0);
    assert_eq!(count(&miner, "1_1_2_1|1_1_4_1"), 100);
    assert_eq!(count(&miner, "1_1_2_1|1_3_4_1|1_1_4_1"), 100);
}

#[test]
fn triangle_rotations_are_distinct_keys() {
    let miner = mine(
        &MinerConfig::new(3, 3),
        cycle([("1", "2"), ("3", "1"), ("1", "4")], 100),
    );
    assert_eq!(miner.extractor().len(), 4);
    for key in [
        "1_1_2_1",
        "1_3_1_1",
        "1_1_4_1",
        "1_1_2_1|1_3_1_1",
        "1_1_2_1|1_1_4_1",
        "1_3_1_1|1_1_4_1",
        "1_1_2_1|1_3_1_1|1_1_4_1",
    ] {
        assert_eq!(count(&miner, key), 100, "{key}");
    }
    // The rotation starting at the second edge has no round before it.
    assert_eq!(count(&miner, "1_3_1_1|1_1_4_1|1_1_2_1"), 99);
}

#[test]
fn path_triple_through_the_middle_edge() {
    let miner = mine(
        &MinerConfig::new(3, 3),
        cycle([("1", "2"), ("3", "1"), ("3", "4")], 100),
    );
    assert_eq!(miner.extractor().len(), 4);
    assert_eq!(count(&miner, "1_1_2_1|1_3_1_1"), 100);
    assert_eq!(count(&miner, "1_3_1_1|1_3_4_1"), 100);
    assert_eq!(count(&miner, "1_1_2_1|1_3_4_1"), 0);
    assert_eq!(count(&miner, "1_1_2_1|1_3_1_1|1_3_4_1"), 100);
}

#[test]
fn size_one_emits_only_singletons() {
    let miner = mine(
        &MinerConfig::new(1, 1),
        cycle([("1", "2"), ("3", "1"), ("3", "4")], 100),
    );
    assert!(miner.extractor().is_empty());
    assert_eq!(miner.oracle().len(), 3);
    assert_eq!(count(&miner, "1_1_2_1|1_3_1_1"), 0);
    assert_eq!(count(&miner, "1_1_2_1|1_3_1_1|1_3_4_1"), 0);
}

#[test]
fn size_two_emits_no_triples() {
    let miner = mine(
        &MinerConfig::new(3, 2),
        cycle([("1", "2"), ("3", "1"), ("3", "4")], 100),
    );
    assert_eq!(miner.extractor().len(), 4);
    assert_eq!(count(&miner, "1_1_2_1|1_3_1_1"), 100);
    assert_eq!(count(&miner, "1_3_1_1|1_3_4_1"), 100);
    assert_eq!(count(&miner, "1_1_2_1|1_3_1_1|1_3_4_1"), 0);
    assert!(miner
        .oracle()
        .iter()
        .all(|(key, _)| key.matches('|').count() <= 1));
}

#[test]
fn order_view_names_nodes_by_first_encounter() {
    let config = MinerConfig::new(3, 3).with_view(View::Order);
    let miner = mine(
        &config,
        [edge("1", "2").at(1), edge("3", "1").at(2), edge("3", "4").at(3)],
    );
    assert_eq!(count(&miner, "1_0_1_1"), 3);
    assert_eq!(count(&miner, "1_0_1_1|1_2_0_1|1_2_3_1"), 1);
}

#[test]
fn triples_keep_age_order_under_id_view() {
    let miner = mine(
        &MinerConfig::new(3, 3),
        [edge("1", "3").at(1), edge("4", "2").at(2), edge("2", "1").at(3)],
    );
    assert_eq!(count(&miner, "1_1_3_1|1_4_2_1"), 0);
    assert_eq!(count(&miner, "1_1_3_1|1_4_2_1|1_2_1_1"), 1);
}

#[test]
fn triples_share_one_naming_under_order_view() {
    let config = MinerConfig::new(3, 3).with_view(View::Order);
    let miner = mine(
        &config,
        [edge("1", "3").at(1), edge("4", "2").at(2), edge("2", "1").at(3)],
    );
    assert_eq!(count(&miner, "1_0_1_1|1_2_3_1"), 0);
    assert_eq!(count(&miner, "1_0_1_1|1_2_0_1"), 1);
    assert_eq!(count(&miner, "1_0_1_1|1_2_3_1|1_3_0_1"), 1);
}

#[test]
fn explicit_timestamps_set_the_clock() {
    let mut miner = SnippetMiner::new(MinerConfig::new(3, 3)).unwrap();
    miner.process_update(edge("1", "2").at(1));
    assert_eq!(miner.now(), 1);
    miner.process_update(edge("3", "4").at(10));
    assert_eq!(miner.now(), 10);
}

fn distinct_keys(config: MinerConfig, updates: &[(&str, &str)]) -> SnippetMiner {
    let mut miner = SnippetMiner::new(config).unwrap();
    for &(u, v) in updates {
        miner.process_update(edge(u, v));
    }
    miner
}

#[test]
fn disconnected_updates_stay_singletons() {
    let miner = distinct_keys(MinerConfig::new(3, 3), &[("1", "2"), ("3", "4")]);
    assert_eq!(miner.engine().len(), 2);
}

#[test]
fn connected_updates_form_a_pair() {
    let miner = distinct_keys(MinerConfig::new(3, 3), &[("1", "2"), ("3", "1")]);
    assert_eq!(miner.engine().len(), 3);
}

#[test]
fn unrelated_updates_inside_the_window() {
    let miner = distinct_keys(
        MinerConfig::new(3, 3),
        &[("1", "2"), ("3", "4"), ("5", "6"), ("7", "8")],
    );
    assert_eq!(miner.engine().len(), 4);
}

#[test]
fn late_bridge_connects_earlier_updates() {
    let miner = distinct_keys(
        MinerConfig::new(4, 4),
        &[("1", "2"), ("3", "4"), ("3", "1")],
    );
    assert_eq!(miner.engine().len(), 6);
    assert!(miner.frequency("1_1_2_1|1_3_1_1").is_some());
    assert!(miner.frequency("1_1_2_1|1_3_4_1|1_3_1_1").is_some());
}

#[test]
fn bridge_followed_by_unrelated_update() {
    let miner = distinct_keys(
        MinerConfig::new(3, 3),
        &[("1", "2"), ("3", "4"), ("3", "1"), ("5", "6")],
    );
    assert_eq!(miner.engine().len(), 7);
}
