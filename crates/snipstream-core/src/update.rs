// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Update records: one edge event from the input stream.
use std::sync::Arc;

/// Stream time. Explicit timestamps and the logical clock share this domain.
pub type Timestamp = i64;

/// Node identifier as it appears in the stream.
///
/// Shared so that name maps and buffered singletons can hold node ids
/// without copying the underlying text.
pub type NodeId = Arc<str>;

/// One edge update `(op, u, v, w, label_u, label_v, edge_label[, timestamp])`.
///
/// Invariants
/// - `u` and `v` are non-empty; they may be equal (self-loop).
/// - `timestamp` is `None` when the record carried only seven fields; the
///   miner's logical clock supplies the time in that case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Update {
    /// Operation tag (e.g. insertion / deletion marker).
    pub op: String,
    /// Source node.
    pub u: NodeId,
    /// Destination node.
    pub v: NodeId,
    /// Edge weight as given by the producer. Carried, never interpreted.
    pub weight: String,
    /// Label of `u`.
    pub label_u: String,
    /// Label of `v`.
    pub label_v: String,
    /// Edge label.
    pub edge_label: String,
    /// Optional explicit timestamp.
    pub timestamp: Option<Timestamp>,
}

impl Update {
    /// Builds an update whose labels equal the node ids, with unit weight.
    ///
    /// Convenient for synthetic streams where labels carry no extra meaning.
    pub fn edge(op: &str, u: &str, v: &str, edge_label: &str) -> Self {
        Self {
            op: op.to_owned(),
            u: Arc::from(u),
            v: Arc::from(v),
            weight: "1".to_owned(),
            label_u: u.to_owned(),
            label_v: v.to_owned(),
            edge_label: edge_label.to_owned(),
            timestamp: None,
        }
    }

    /// Returns the same update stamped with an explicit timestamp.
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// True when source and destination are the same node.
    pub fn is_self_loop(&self) -> bool {
        self.u == self.v
    }

    /// True when `node` is one of this update's endpoints.
    pub fn touches(&self, node: &str) -> bool {
        &*self.u == node || &*self.v == node
    }

    /// True when the two updates share at least one endpoint.
    pub fn shares_node_with(&self, other: &Self) -> bool {
        other.touches(&self.u) || other.touches(&self.v)
    }
}
