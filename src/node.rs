use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::descriptor::Descriptor;
use crate::key::Key;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub(crate) fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// The two node shapes the tree's invariants distinguish by construction:
/// a leaf never has children, an internal node always has exactly two.
pub(crate) enum Body<K, V> {
    Leaf { value: Option<V> },
    Internal {
        left: ArcSwap<Node<K, V>>,
        right: ArcSwap<Node<K, V>>,
    },
}

/// A node in the persistent version chain. `prev` links to the node this one
/// replaced, and `version_seq` is the global counter value stamped at the
/// moment of replacement, so a reader can walk back to any still-live
/// snapshot's view of an edge.
pub(crate) struct Node<K, V> {
    pub(crate) key: Key<K>,
    pub(crate) body: Body<K, V>,
    pub(crate) prev: Option<Arc<Node<K, V>>>,
    pub(crate) version_seq: u64,
    pub(crate) info: ArcSwap<Descriptor<K, V>>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.body, Body::Leaf { .. })
    }

    pub(crate) fn child(&self, side: Side) -> &ArcSwap<Node<K, V>> {
        match &self.body {
            Body::Internal { left, right } => match side {
                Side::Left => left,
                Side::Right => right,
            },
            Body::Leaf { .. } => unreachable!("leaf nodes have no children"),
        }
    }

    pub(crate) fn leaf_value(&self) -> Option<&V> {
        match &self.body {
            Body::Leaf { value } => value.as_ref(),
            Body::Internal { .. } => None,
        }
    }
}

pub(crate) fn new_leaf<K, V>(
    key: Key<K>,
    value: Option<V>,
    version_seq: u64,
    prev: Option<Arc<Node<K, V>>>,
) -> Arc<Node<K, V>> {
    Arc::new(Node {
        key,
        body: Body::Leaf { value },
        prev,
        version_seq,
        info: ArcSwap::new(Descriptor::dummy()),
    })
}

pub(crate) fn new_internal<K, V>(
    key: Key<K>,
    left: Arc<Node<K, V>>,
    right: Arc<Node<K, V>>,
    version_seq: u64,
    prev: Option<Arc<Node<K, V>>>,
) -> Arc<Node<K, V>> {
    Arc::new(Node {
        key,
        body: Body::Internal {
            left: ArcSwap::new(left),
            right: ArcSwap::new(right),
        },
        prev,
        version_seq,
        info: ArcSwap::new(Descriptor::dummy()),
    })
}
