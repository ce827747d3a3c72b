use std::sync::Arc;

use crate::counter::Counter;
use crate::descriptor::{Descriptor, State};
use crate::help::help;
use crate::key::goes_left;
use crate::node::{Node, Side};

/// The leaf a search landed on, plus enough of its ancestry to validate and
/// later drive a commit: `p` is the leaf's parent, `gp` its grandparent.
/// The dummy scaffolding guarantees a grandparent always exists once the
/// search has descended to a leaf, so `gp` is carried as `Option` only to
/// keep the type honest about the general case, not because this crate's
/// fixed three-level scaffold ever produces `None` in practice.
pub(crate) struct SeekRecord<K, V> {
    pub(crate) gp: Option<Arc<Node<K, V>>>,
    pub(crate) p: Arc<Node<K, V>>,
    pub(crate) p_side: Side,
    pub(crate) l: Arc<Node<K, V>>,
    pub(crate) l_side: Side,
}

/// Reads `parent`'s child on `side` as it stood at sequence `seq`, walking
/// the version chain backward past any replacement newer than `seq`.
pub(crate) fn read_child<K, V>(parent: &Node<K, V>, side: Side, seq: u64) -> Arc<Node<K, V>> {
    let mut child = parent.child(side).load_full();
    while child.version_seq > seq {
        child = child
            .prev
            .clone()
            .expect("a node's version chain must reach back to every sequence number live readers can request");
    }
    child
}

/// Descends from `root` to the leaf that would hold `key`, as of `seq`.
pub(crate) fn search<K: Ord, V>(root: &Arc<Node<K, V>>, key: &K, seq: u64) -> SeekRecord<K, V> {
    let mut gp: Option<Arc<Node<K, V>>> = None;
    let mut p = root.clone();
    let mut p_side = Side::Left; // unused until gp is Some
    let first_side = if goes_left(key, &p.key) { Side::Left } else { Side::Right };
    let mut l = read_child(&p, first_side, seq);
    let mut l_side = first_side;

    while !l.is_leaf() {
        let side = if goes_left(key, &l.key) { Side::Left } else { Side::Right };
        let next = read_child(&l, side, seq);
        gp = Some(p);
        p_side = l_side;
        p = l;
        l_side = side;
        l = next;
    }

    SeekRecord { gp, p, p_side, l, l_side }
}

/// Checks `node` is neither busy nor logically removed, helping it to a
/// terminal state first if it is busy. Returns the descriptor witness
/// observed on success.
pub(crate) fn check_live<K: Ord, V>(node: &Arc<Node<K, V>>, counter: &Counter) -> Option<Arc<Descriptor<K, V>>> {
    let info = node.info.load_full();
    match info.state() {
        State::Null | State::Try => {
            help(&info, counter);
            None
        }
        State::Commit => {
            if info.marks_node(node) {
                None
            } else {
                Some(info)
            }
        }
        State::Abort => Some(info),
    }
}

/// Certifies that `parent`'s child on `side` is still `expected_child` and
/// that `parent` itself is live, returning the descriptor observed on
/// `parent`.
pub(crate) fn validate_link<K: Ord, V>(
    parent: &Arc<Node<K, V>>,
    expected_child: &Arc<Node<K, V>>,
    side: Side,
    counter: &Counter,
) -> Option<Arc<Descriptor<K, V>>> {
    let info = check_live(parent, counter)?;
    let current = parent.child(side).load_full();
    if Arc::ptr_eq(&current, expected_child) {
        Some(info)
    } else {
        None
    }
}

/// The descriptor witnesses `validate_leaf` observed on `p` and `gp`, used
/// both as this attempt's linearization check and as CAS-expected values by
/// the caller's subsequent `execute_*` step.
pub(crate) struct LeafWitness<K, V> {
    pub(crate) p_info: Arc<Descriptor<K, V>>,
    pub(crate) gp_info: Option<Arc<Descriptor<K, V>>>,
}

/// Validates a [`SeekRecord`]: both links `gp -> p` and `p -> l` must still
/// be intact and neither `p` nor `gp` may be busy or removed. A second read
/// of each node's `info` after both links check out catches the case where
/// either became busy in the interim; this second read is the linearization
/// point for read-only operations that resolve to this leaf.
pub(crate) fn validate_leaf<K: Ord, V>(record: &SeekRecord<K, V>, counter: &Counter) -> Option<LeafWitness<K, V>> {
    let p_info = validate_link(&record.p, &record.l, record.l_side, counter)?;
    let gp_info = match &record.gp {
        Some(gp) => Some(validate_link(gp, &record.p, record.p_side, counter)?),
        None => None,
    };

    let p_info_again = record.p.info.load_full();
    if !Arc::ptr_eq(&p_info_again, &p_info) {
        return None;
    }
    if let (Some(gp), Some(gp_info)) = (&record.gp, &gp_info) {
        let gp_info_again = gp.info.load_full();
        if !Arc::ptr_eq(&gp_info_again, gp_info) {
            return None;
        }
    }

    Some(LeafWitness { p_info, gp_info })
}
