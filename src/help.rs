use std::sync::Arc;

use crate::cas::{cas_arc, cas_arc_ptr};
use crate::counter::Counter;
use crate::descriptor::{Descriptor, Mark, State};

/// Drives `d` to a terminal state and returns whether it committed. Safe to
/// call redundantly from any number of threads on the same descriptor: every
/// step is a CAS guarded by the state it expects to find, so a thread that
/// arrives after the work is already done just observes its CAS lose and
/// moves on.
pub(crate) fn help<K: Ord, V>(d: &Arc<Descriptor<K, V>>, counter: &Counter) -> bool {
    if d.state() == State::Null {
        if counter.load() == d.handshaking_seq {
            d.try_mark_try();
        } else {
            d.try_mark_abort_from_null();
        }
    }

    if d.state() == State::Try {
        let mut all_marked = true;
        for mark in d.marks.iter().flatten() {
            if !mark_one(d, mark) {
                all_marked = false;
                break;
            }
        }

        if all_marked {
            swing_child(d);
            d.try_mark_commit();
        } else {
            d.try_mark_abort_from_try();
        }
    }

    d.state() == State::Commit
}

fn mark_one<K, V>(d: &Arc<Descriptor<K, V>>, mark: &Mark<K, V>) -> bool {
    let Some(node) = mark.node.upgrade() else {
        // The node is gone, which can only happen after it was unlinked from
        // the tree by this very descriptor's own commit (or a would-be
        // helper's redundant replay of one) -- nothing left to mark.
        return true;
    };
    match cas_arc(&node.info, &mark.old_info, d.clone()) {
        Ok(()) => true,
        Err(actual) => Arc::ptr_eq(&actual, d),
    }
}

fn swing_child<K, V>(d: &Descriptor<K, V>) {
    let (Some(connector), Some(new_node), Some(first_mark)) =
        (&d.connector, &d.new_node, &d.marks[0])
    else {
        return;
    };
    let expected_ptr = first_mark.node.as_ptr();
    let _ = cas_arc_ptr(connector.child(d.connector_side), expected_ptr, new_node.clone());
}
