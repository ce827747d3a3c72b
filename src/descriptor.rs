use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use crate::node::{Node, Side};

/// A descriptor's lifecycle state. Transitions are CAS-only, so `help` can
/// be invoked redundantly by any number of threads without double-applying
/// an effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum State {
    Null = 0,
    Try = 1,
    Commit = 2,
    Abort = 3,
}

impl State {
    fn from_u8(value: u8) -> State {
        match value {
            0 => State::Null,
            1 => State::Try,
            2 => State::Commit,
            3 => State::Abort,
            _ => unreachable!("descriptor state byte out of range"),
        }
    }
}

/// One of up to three nodes a descriptor logically owns for the duration of
/// an operation. `node` is a `Weak` handle: the node's `info` field is the
/// only thing that keeps a strong reference to this descriptor, so a strong
/// handle back the other way would make every marked node and its
/// descriptor into an uncollectable reference cycle.
/// `old_info` is the descriptor witness the mark's owning operation observed
/// on the node before installing `self` there, used as the CAS-expected
/// value in the marking step.
pub(crate) struct Mark<K, V> {
    pub(crate) node: Weak<Node<K, V>>,
    pub(crate) old_info: Arc<Descriptor<K, V>>,
}

/// A multi-word-CAS descriptor: the single shared record all helpers race to
/// drive to a terminal state.
pub(crate) struct Descriptor<K, V> {
    state: AtomicU8,
    /// The node whose child pointer gets swung from the (first) marked node
    /// to `new_node` once every mark lands. `None` only for the shared dummy
    /// descriptor every node starts with.
    pub(crate) connector: Option<Arc<Node<K, V>>>,
    pub(crate) connector_side: Side,
    pub(crate) marks: [Option<Mark<K, V>>; 3],
    pub(crate) new_node: Option<Arc<Node<K, V>>>,
    pub(crate) handshaking_seq: u64,
}

impl<K, V> Descriptor<K, V> {
    /// The descriptor every freshly constructed node starts with: already
    /// aborted, marks nothing, so it never makes a node appear busy.
    pub(crate) fn dummy() -> Arc<Self> {
        Arc::new(Descriptor {
            state: AtomicU8::new(State::Abort as u8),
            connector: None,
            connector_side: Side::Left,
            marks: [None, None, None],
            new_node: None,
            handshaking_seq: 0,
        })
    }

    pub(crate) fn new(
        connector: Arc<Node<K, V>>,
        connector_side: Side,
        marks: [Option<Mark<K, V>>; 3],
        new_node: Arc<Node<K, V>>,
        handshaking_seq: u64,
    ) -> Arc<Self> {
        Arc::new(Descriptor {
            state: AtomicU8::new(State::Null as u8),
            connector: Some(connector),
            connector_side,
            marks,
            new_node: Some(new_node),
            handshaking_seq,
        })
    }

    pub(crate) fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    fn cas_state(&self, expected: State, new: State) -> bool {
        self.state
            .compare_exchange(expected as u8, new as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn try_mark_try(&self) -> bool {
        self.cas_state(State::Null, State::Try)
    }

    pub(crate) fn try_mark_abort_from_null(&self) -> bool {
        self.cas_state(State::Null, State::Abort)
    }

    pub(crate) fn try_mark_commit(&self) -> bool {
        self.cas_state(State::Try, State::Commit)
    }

    pub(crate) fn try_mark_abort_from_try(&self) -> bool {
        self.cas_state(State::Try, State::Abort)
    }

    /// Whether `self` marks `node` (i.e. `node` is one of the up-to-three
    /// victims this descriptor owns), identified by pointer rather than by
    /// upgrading the `Weak`. A dropped mark target can only mean it was
    /// already unlinked by this same descriptor's own commit.
    pub(crate) fn marks_node(&self, node: &Arc<Node<K, V>>) -> bool {
        let ptr = Arc::as_ptr(node);
        self.marks
            .iter()
            .flatten()
            .any(|mark| mark.node.as_ptr() == ptr)
    }
}
