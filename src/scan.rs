use std::sync::Arc;

use crate::buffers::ValueStack;
use crate::counter::Counter;
use crate::descriptor::State;
use crate::help::help;
use crate::key::Key;
use crate::node::{Node, Side};
use crate::search::read_child;

/// A wait-free snapshot range scan over `[lo, hi]`. The only write in the
/// whole operation is the single `fetch_add` that reserves this scan's
/// sequence number; everything after that is read-only, resumable,
/// helper-assisted traversal.
///
/// Callers must pass `lo <= hi`; this is a programmer error, not a runtime
/// failure mode, so it is enforced with a debug assertion rather than
/// absorbed into the result.
pub(crate) fn range_scan<K: Ord, V: Clone>(
    root: &Arc<Node<K, V>>,
    counter: &Counter,
    lo: &K,
    hi: &K,
) -> Vec<V> {
    debug_assert!(lo <= hi, "range_scan requires lo <= hi");

    let seq = counter.fetch_advance();
    let mut out = ValueStack::new();
    walk(root, lo, hi, seq, counter, &mut out);
    out.into_vec()
}

fn walk<K: Ord, V: Clone>(
    node: &Arc<Node<K, V>>,
    lo: &K,
    hi: &K,
    seq: u64,
    counter: &Counter,
    out: &mut ValueStack<V>,
) {
    if node.is_leaf() {
        if let Key::Real(k) = &node.key {
            if lo <= k && k <= hi {
                if let Some(value) = node.leaf_value() {
                    out.push(value.clone());
                }
            }
        }
        return;
    }

    // A busy internal node might be mid-swing; help it along so this scan's
    // own traversal doesn't have to reason about a half-installed edge.
    let info = node.info.load_full();
    if matches!(info.state(), State::Null | State::Try) {
        help(&info, counter);
    }

    // Pruning treats the sentinel routing key as -inf: a real `lo` is never
    // less than it, so a sentinel-keyed node always prunes to its right
    // subtree, matching the left subtree always being empty under that same
    // convention (see key::goes_left).
    let (descend_right, descend_left) = match &node.key {
        Key::NegInf => (true, false),
        Key::Real(k) => (lo >= k, hi < k),
    };

    if descend_right {
        walk(&read_child(node, Side::Right, seq), lo, hi, seq, counter, out);
    } else if descend_left {
        walk(&read_child(node, Side::Left, seq), lo, hi, seq, counter, out);
    } else {
        walk(&read_child(node, Side::Left, seq), lo, hi, seq, counter, out);
        walk(&read_child(node, Side::Right, seq), lo, hi, seq, counter, out);
    }
}
