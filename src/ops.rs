use std::sync::Arc;

use crate::cas::cas_arc;
use crate::counter::Counter;
use crate::descriptor::{Descriptor, Mark};
use crate::help::help;
use crate::key::Key;
use crate::node::{new_internal, new_leaf, Node, Side};
use crate::search::{check_live, read_child, search, validate_leaf, validate_link, SeekRecord};

pub(crate) fn get<K: Ord, V: Clone>(root: &Arc<Node<K, V>>, counter: &Counter, key: &K) -> Option<V> {
    loop {
        let seq = counter.load();
        let record = search(root, key, seq);
        if validate_leaf(&record, counter).is_none() {
            continue;
        }
        return match &record.l.key {
            Key::Real(k) if k == key => record.l.leaf_value().cloned(),
            _ => None,
        };
    }
}

pub(crate) fn put_if_absent<K: Ord + Clone, V: Clone>(
    root: &Arc<Node<K, V>>,
    counter: &Counter,
    key: K,
    value: V,
) -> Option<V> {
    loop {
        let seq = counter.load();
        let record = search(root, &key, seq);
        let witness = match validate_leaf(&record, counter) {
            Some(w) => w,
            None => continue,
        };

        if let Key::Real(existing) = &record.l.key {
            if *existing == key {
                return record.l.leaf_value().cloned();
            }
        }

        if counter.load() != seq {
            continue;
        }

        let new_internal_node = build_insert_triad(&record.l, &key, &value, seq);
        let l_info_witness = record.l.info.load_full();

        if execute_insert(counter, &record, &witness.p_info, l_info_witness, new_internal_node, seq) {
            return None;
        }
    }
}

fn build_insert_triad<K: Ord + Clone, V: Clone>(
    old_leaf: &Arc<Node<K, V>>,
    key: &K,
    value: &V,
    seq: u64,
) -> Arc<Node<K, V>> {
    let new_key = Key::Real(key.clone());
    let sibling = new_leaf(old_leaf.key.clone(), old_leaf.leaf_value().cloned(), seq, None);
    let fresh = new_leaf(new_key.clone(), Some(value.clone()), seq, None);

    let (left, right) = if new_key < old_leaf.key {
        (fresh, sibling)
    } else {
        (sibling, fresh)
    };
    let routing_key = right.key.clone();
    new_internal(routing_key, left, right, seq, Some(old_leaf.clone()))
}

fn execute_insert<K: Ord, V>(
    counter: &Counter,
    record: &SeekRecord<K, V>,
    p_info: &Arc<Descriptor<K, V>>,
    l_info_witness: Arc<Descriptor<K, V>>,
    new_internal_node: Arc<Node<K, V>>,
    seq: u64,
) -> bool {
    if check_live(&record.p, counter).is_none() {
        return false;
    }
    if check_live(&record.l, counter).is_none() {
        return false;
    }
    if counter.load() != seq {
        return false;
    }

    let mark = Mark { node: Arc::downgrade(&record.l), old_info: l_info_witness };
    let descriptor = Descriptor::new(record.p.clone(), record.l_side, [Some(mark), None, None], new_internal_node, seq);

    match cas_arc(&record.p.info, p_info, descriptor.clone()) {
        Ok(()) => help(&descriptor, counter),
        Err(_) => false,
    }
}

pub(crate) fn remove<K: Ord + Clone, V: Clone>(root: &Arc<Node<K, V>>, counter: &Counter, key: &K) -> Option<V> {
    loop {
        let seq = counter.load();
        let record = search(root, key, seq);
        let witness = match validate_leaf(&record, counter) {
            Some(w) => w,
            None => continue,
        };

        let found_value = match &record.l.key {
            Key::Real(k) if k == key => record.l.leaf_value().cloned(),
            _ => return None,
        };

        let sibling_side = record.l_side.opposite();
        let sibling = read_child(&record.p, sibling_side, seq);
        if validate_link(&record.p, &sibling, sibling_side, counter).is_none() {
            continue;
        }

        if counter.load() != seq {
            continue;
        }

        let sibling_children = if sibling.is_leaf() {
            None
        } else {
            let left = read_child(&sibling, Side::Left, seq);
            let right = read_child(&sibling, Side::Right, seq);
            if validate_link(&sibling, &left, Side::Left, counter).is_none() {
                continue;
            }
            if validate_link(&sibling, &right, Side::Right, counter).is_none() {
                continue;
            }
            Some((left, right))
        };

        let s_info_witness = sibling.info.load_full();
        let l_info_witness = record.l.info.load_full();
        let new_sibling = clone_sibling(&sibling, sibling_children, seq, record.p.clone());

        let gp = record
            .gp
            .as_ref()
            .expect("the dummy scaffolding guarantees a grandparent for every leaf search reaches");
        let gp_info = witness
            .gp_info
            .as_ref()
            .expect("validate_leaf always validates gp alongside p when gp is Some");

        if execute_delete(
            counter,
            &record,
            gp,
            sibling.clone(),
            gp_info,
            witness.p_info.clone(),
            l_info_witness,
            s_info_witness,
            new_sibling,
            seq,
        ) {
            return found_value;
        }
    }
}

fn clone_sibling<K: Clone, V: Clone>(
    sibling: &Arc<Node<K, V>>,
    children: Option<(Arc<Node<K, V>>, Arc<Node<K, V>>)>,
    seq: u64,
    prev: Arc<Node<K, V>>,
) -> Arc<Node<K, V>> {
    match children {
        None => new_leaf(sibling.key.clone(), sibling.leaf_value().cloned(), seq, Some(prev)),
        Some((left, right)) => new_internal(sibling.key.clone(), left, right, seq, Some(prev)),
    }
}

#[allow(clippy::too_many_arguments)]
fn execute_delete<K: Ord, V>(
    counter: &Counter,
    record: &SeekRecord<K, V>,
    gp: &Arc<Node<K, V>>,
    sibling: Arc<Node<K, V>>,
    gp_info: &Arc<Descriptor<K, V>>,
    p_info_witness: Arc<Descriptor<K, V>>,
    l_info_witness: Arc<Descriptor<K, V>>,
    s_info_witness: Arc<Descriptor<K, V>>,
    new_sibling: Arc<Node<K, V>>,
    seq: u64,
) -> bool {
    if check_live(gp, counter).is_none() {
        return false;
    }
    if check_live(&record.p, counter).is_none() {
        return false;
    }
    if check_live(&record.l, counter).is_none() {
        return false;
    }
    if check_live(&sibling, counter).is_none() {
        return false;
    }
    if counter.load() != seq {
        return false;
    }

    let marks = [
        Some(Mark { node: Arc::downgrade(&record.p), old_info: p_info_witness }),
        Some(Mark { node: Arc::downgrade(&record.l), old_info: l_info_witness }),
        Some(Mark { node: Arc::downgrade(&sibling), old_info: s_info_witness }),
    ];
    let descriptor = Descriptor::new(gp.clone(), record.p_side, marks, new_sibling, seq);

    match cas_arc(&gp.info, gp_info, descriptor.clone()) {
        Ok(()) => help(&descriptor, counter),
        Err(_) => false,
    }
}
