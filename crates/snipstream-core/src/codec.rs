// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snippet keys: canonical strings for one or more updates under a view.
//!
//! A key is the concatenation of one token per update, `op_a_b_edgeLabel`,
//! joined by [`KEY_SEPARATOR`] in combination order. What `a`/`b` are depends
//! on the [`View`]:
//!
//! - `id`: the raw node identifiers.
//! - `label`: the node labels.
//! - `order`: small integers handed out in first-encounter order while the
//!   snippet is assembled, so snippets with the same connectivity collapse
//!   to one key regardless of which concrete nodes took part.
//!
//! `order` naming is first-encounter, not a full canonical form: the same
//! three updates combined in a different order may name nodes differently.
//! The extractor avoids this for a single occurrence by always combining in
//! (age, key) order.
use std::cmp::Ordering;
use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::update::{NodeId, Timestamp, Update};

/// Separator between the fields of one update's token.
pub const TOKEN_SEPARATOR: char = '_';
/// Separator between update tokens inside a multi-update key.
pub const KEY_SEPARATOR: char = '|';

/// How node identity is folded into a snippet key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Raw node identifiers.
    #[default]
    Id,
    /// Node labels.
    Label,
    /// First-encounter integer names.
    Order,
}

impl View {
    /// Lowercase name as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Label => "label",
            Self::Order => "order",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "label" => Ok(Self::Label),
            "order" => Ok(Self::Order),
            other => Err(ConfigError::UnknownView(other.to_owned())),
        }
    }
}

/// First-encounter naming of nodes inside one snippet.
///
/// The name of a node is its position in the encounter list. Snippets hold
/// at most six distinct nodes, so lookup is a linear scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameMap {
    nodes: Vec<NodeId>,
}

impl NameMap {
    /// Empty naming.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name already assigned to `node`, if any.
    pub fn name_of(&self, node: &str) -> Option<usize> {
        self.nodes.iter().position(|n| &**n == node)
    }

    /// Returns the name of `node`, allocating the next integer when unseen.
    pub fn assign(&mut self, node: &NodeId) -> usize {
        if let Some(name) = self.name_of(node) {
            return name;
        }
        self.nodes.push(Arc::clone(node));
        self.nodes.len() - 1
    }

    /// Number of named nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node has been named.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The size-1 snippet derived from one update.
///
/// Immutable once built; lives in the extractor buffer until evicted.
#[derive(Clone, Debug)]
pub struct Singleton {
    /// Time at which the update arrived.
    pub age: Timestamp,
    /// The underlying update.
    pub update: Update,
    /// Node naming, present only under [`View::Order`].
    pub names: Option<NameMap>,
    /// Size-1 snippet key.
    pub key: String,
}

impl Singleton {
    /// Endpoints of the update (one entry for a self-loop).
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        let v = (!self.update.is_self_loop()).then_some(&self.update.v);
        std::iter::once(&self.update.u).chain(v)
    }

    /// True when `update` shares an endpoint with this singleton.
    pub fn is_compatible_with(&self, update: &Update) -> bool {
        self.update.shares_node_with(update)
    }

    /// Combination order: age ascending, then key ascending.
    pub fn combination_order(&self, other: &Self) -> Ordering {
        self.age
            .cmp(&other.age)
            .then_with(|| self.key.cmp(&other.key))
    }
}

/// Most index sets whose pairs are kept memoized at once.
pub(crate) const PAIR_MEMO_LIMIT: usize = 1024;

/// Builds snippet keys for one view.
///
/// Also memoizes the unordered index pairs of small index sets, which the
/// size-3 enumeration asks for once per update. The memo is dropped
/// wholesale once it holds [`PAIR_MEMO_LIMIT`] sets.
#[derive(Debug)]
pub struct SnippetCodec {
    view: View,
    pair_memo: FxHashMap<Box<[usize]>, Arc<[(usize, usize)]>>,
}

impl SnippetCodec {
    /// Codec for `view` with an empty memo.
    pub fn new(view: View) -> Self {
        Self {
            view,
            pair_memo: FxHashMap::default(),
        }
    }

    /// Active view.
    pub fn view(&self) -> View {
        self.view
    }

    /// Builds the size-1 snippet for `update` arriving at `age`.
    ///
    /// Under the order view the source is named 0 and, unless the update is
    /// a self-loop, the destination is named 1.
    pub fn build_singleton(&self, update: Update, age: Timestamp) -> Singleton {
        let mut names = (self.view == View::Order).then(NameMap::new);
        let mut key = String::new();
        self.write_token(&mut key, &update, names.as_mut());
        Singleton {
            age,
            update,
            names,
            key,
        }
    }

    /// Appends `next` to an existing key.
    ///
    /// Under the order view `names` carries the naming of `base_key` and is
    /// extended with any endpoint of `next` not yet named; it is `None` for
    /// the other views.
    pub fn extend(
        &self,
        base_key: &str,
        names: Option<NameMap>,
        next: &Update,
    ) -> (String, Option<NameMap>) {
        let mut names = match self.view {
            View::Order => Some(names.unwrap_or_default()),
            View::Id | View::Label => None,
        };
        let mut key = String::with_capacity(base_key.len() * 2 + 1);
        key.push_str(base_key);
        key.push(KEY_SEPARATOR);
        self.write_token(&mut key, next, names.as_mut());
        (key, names)
    }

    /// Key of the size-2 snippet formed by an older singleton and a newer update.
    pub fn pair_key(&self, older: &Singleton, newer: &Update) -> String {
        self.extend(&older.key, older.names.clone(), newer).0
    }

    /// Key of three singletons already placed in combination order.
    pub fn triple_key(&self, ordered: [&Singleton; 3]) -> String {
        let [first, second, third] = ordered;
        if self.view == View::Id {
            let mut key =
                String::with_capacity(first.key.len() + second.key.len() + third.key.len() + 2);
            key.push_str(&first.key);
            key.push(KEY_SEPARATOR);
            key.push_str(&second.key);
            key.push(KEY_SEPARATOR);
            key.push_str(&third.key);
            return key;
        }
        let (key, names) = self.extend(&first.key, first.names.clone(), &second.update);
        self.extend(&key, names, &third.update).0
    }

    /// All unordered pairs of `set`, in `(set[i], set[j])`, `i < j` order.
    pub fn pairs(&mut self, set: &[usize]) -> Arc<[(usize, usize)]> {
        if let Some(pairs) = self.pair_memo.get(set) {
            return Arc::clone(pairs);
        }
        let pairs: Arc<[(usize, usize)]> = set
            .iter()
            .enumerate()
            .flat_map(|(i, &a)| set[i + 1..].iter().map(move |&b| (a, b)))
            .collect();
        if self.pair_memo.len() >= PAIR_MEMO_LIMIT {
            self.pair_memo.clear();
        }
        self.pair_memo.insert(set.into(), Arc::clone(&pairs));
        pairs
    }

    /// Number of index sets whose pairs are memoized.
    pub fn memoized_sets(&self) -> usize {
        self.pair_memo.len()
    }

    fn write_token(&self, out: &mut String, update: &Update, names: Option<&mut NameMap>) {
        out.push_str(&update.op);
        out.push(TOKEN_SEPARATOR);
        match (self.view, names) {
            (View::Order, Some(names)) => {
                let a = names.assign(&update.u);
                let b = names.assign(&update.v);
                let _ = write!(out, "{a}{TOKEN_SEPARATOR}{b}");
            }
            (View::Label, _) => {
                out.push_str(&update.label_u);
                out.push(TOKEN_SEPARATOR);
                out.push_str(&update.label_v);
            }
            _ => {
                out.push_str(&update.u);
                out.push(TOKEN_SEPARATOR);
                out.push_str(&update.v);
            }
        }
        out.push(TOKEN_SEPARATOR);
        out.push_str(&update.edge_label);
    }
}
