use ordtree::{Config, OrderedTree, VerifyLevel};
use quickcheck::quickcheck;

use crate::Op;

/// Keys of the tree in in-order, read off its snapshot.
fn in_order<K: Clone, C>(tree: &OrderedTree<K, C>) -> Vec<K> {
    let snapshot = tree.snapshot();
    let mut keys = Vec::new();
    let mut stack = Vec::new();
    let mut cur = snapshot.root();
    while cur.is_some() || !stack.is_empty() {
        while let Some(node) = cur {
            stack.push(node);
            cur = node.left.and_then(|id| snapshot.get(id));
        }
        let node = stack.pop().expect("loop condition guarantees a node");
        keys.push(node.key.clone());
        cur = node.right.and_then(|id| snapshot.get(id));
    }
    keys
}

/// Applies a set of operations to a tree and a sorted vector.
/// This way we can ensure that after a random smattering of inserts
/// and resets the tree holds the same keys in the same order.
fn do_ops<K>(ops: &[Op<K>], mut tree: OrderedTree<K>, model: &mut Vec<K>) -> OrderedTree<K>
where
    K: Clone + Ord,
{
    for op in ops {
        match op {
            Op::Insert(k) => {
                tree.insert(k.clone()).expect("insertion can't fail here");
                let at = model.partition_point(|x| x <= k);
                model.insert(at, k.clone());
            }
            Op::Reset => {
                assert_eq!(tree.destroy(), model.len());
                model.clear();
                tree = fresh();
            }
        }
    }

    tree
}

fn fresh<K: Ord>() -> OrderedTree<K> {
    OrderedTree::natural().with_config(Config {
        verify: VerifyLevel::Deep,
        ..Config::production()
    })
}

#[test]
fn quickcheck_fuzz_multiple_operations_i8() {
    fn prop(ops: Vec<Op<i8>>) -> bool {
        let mut model = Vec::new();
        let tree = do_ops(&ops, fresh(), &mut model);

        tree.len() == model.len() && in_order(&tree) == model
    }
    quickcheck(prop as fn(Vec<Op<i8>>) -> bool);
}

#[test]
fn quickcheck_sorted_by_custom_order() {
    fn prop(xs: Vec<i16>) -> bool {
        let mut tree = OrderedTree::new(|a: &i16, b: &i16| b.cmp(a));
        for &x in &xs {
            tree.insert(x).unwrap();
        }
        let mut expected = xs;
        expected.sort_by(|a, b| b.cmp(a));

        in_order(&tree) == expected
    }
    quickcheck(prop as fn(Vec<i16>) -> bool);
}

#[test]
fn quickcheck_snapshot_counts_every_node() {
    fn prop(xs: Vec<u8>) -> bool {
        let mut tree = fresh();
        xs.iter().all(|&x| {
            tree.insert(x).is_ok()
                && tree.snapshot().len() == tree.len()
                && tree.snapshot().size() == tree.len()
        })
    }
    quickcheck(prop as fn(Vec<u8>) -> bool);
}

#[test]
fn example_sequence_in_order() {
    let mut tree = fresh();
    for key in [6, 2, 0, 4, 8, 5] {
        tree.insert(key).unwrap();
    }

    assert_eq!(in_order(&tree), vec![0, 2, 4, 5, 6, 8]);
}

#[test]
fn boolean_comparators_work_too() {
    let mut tree = OrderedTree::new(ordtree::ordered::from_less(|a: &u32, b: &u32| a < b));
    for key in [3, 1, 2] {
        tree.insert(key).unwrap();
    }

    assert_eq!(in_order(&tree), vec![1, 2, 3]);
    let root = tree.snapshot().root().map(|n| *n.key);
    assert_eq!(root, Some(3));
}

#[test]
fn ranks_match_depth_of_sorted_insertion() {
    let mut tree = fresh();
    for key in 0..64u32 {
        tree.insert(key).unwrap();
    }
    let snapshot = tree.snapshot();
    let deepest = snapshot.nodes().iter().map(|n| n.rank).max();

    assert_eq!(deepest, Some(64));
    assert_eq!(
        snapshot.nodes().iter().map(|n| *n.key).collect::<Vec<_>>(),
        (0..64).collect::<Vec<_>>()
    );
}
