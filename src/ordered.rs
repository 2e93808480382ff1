//! Order-statistics index.
//!
//! Entries `{rank_key, character}` are kept in a treap whose nodes carry their
//! subtree size, giving expected O(log n) insert, erase, rank-of and
//! select-by-rank. Entries order by rank key first and character second, so
//! equal rank keys still form a stable total order.
//!
//! The rank key is computed from the item's *current* state on every call.
//! Callers must erase an item before mutating the fields its strategy reads
//! and insert it again afterwards.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

/// Fixed seed so node priorities, and therefore tree shapes, are reproducible.
const PRIORITY_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Computes the value an index sorts items by.
pub trait RankStrategy<T>: Send + Sync {
    type Key: Ord + Clone + fmt::Debug;

    fn rank_key(&self, item: &T) -> Self::Key;
}

/// Items that can be indexed carry a stable identity.
pub trait Indexed {
    fn index_id(&self) -> &str;
}

/// One position in an [`OrderedIndex`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexEntry<K> {
    pub rank_key: K,
    pub character: String,
}

type Link<K> = Option<Box<Node<K>>>;

struct Node<K> {
    entry: IndexEntry<K>,
    priority: u64,
    size: usize,
    left: Link<K>,
    right: Link<K>,
}

impl<K> Node<K> {
    fn new(entry: IndexEntry<K>, priority: u64) -> Self {
        Self {
            entry,
            priority,
            size: 1,
            left: None,
            right: None,
        }
    }

    fn update(&mut self) {
        self.size = 1 + size(&self.left) + size(&self.right);
    }
}

fn size<K>(link: &Link<K>) -> usize {
    link.as_ref().map_or(0, |node| node.size)
}

/// Split into entries below `pivot` and the rest. With `inclusive`, entries
/// equal to `pivot` go left as well.
fn split<K: Ord>(link: Link<K>, pivot: &IndexEntry<K>, inclusive: bool) -> (Link<K>, Link<K>) {
    let Some(mut node) = link else {
        return (None, None);
    };

    let goes_left = match node.entry.cmp(pivot) {
        Ordering::Less => true,
        Ordering::Equal => inclusive,
        Ordering::Greater => false,
    };

    if goes_left {
        let (left, right) = split(node.right.take(), pivot, inclusive);
        node.right = left;
        node.update();
        (Some(node), right)
    } else {
        let (left, right) = split(node.left.take(), pivot, inclusive);
        node.left = right;
        node.update();
        (left, Some(node))
    }
}

/// Join two treaps where every entry of `left` sorts before every entry of `right`.
fn merge<K>(left: Link<K>, right: Link<K>) -> Link<K> {
    match (left, right) {
        (None, right) => right,
        (left, None) => left,
        (Some(mut l), Some(mut r)) => {
            if l.priority > r.priority {
                l.right = merge(l.right.take(), Some(r));
                l.update();
                Some(l)
            } else {
                r.left = merge(Some(l), r.left.take());
                r.update();
                Some(r)
            }
        }
    }
}

/// Order-statistics container ranked by a [`RankStrategy`].
pub struct OrderedIndex<T, S: RankStrategy<T>> {
    root: Link<S::Key>,
    strategy: S,
    rng: StdRng,
    _item: PhantomData<fn(&T)>,
}

impl<T: Indexed, S: RankStrategy<T>> OrderedIndex<T, S> {
    pub fn new(strategy: S) -> Self {
        Self {
            root: None,
            strategy,
            rng: StdRng::seed_from_u64(PRIORITY_SEED),
            _item: PhantomData,
        }
    }

    /// Build an index seeded with `items`.
    pub fn with_items<'a, I>(strategy: S, items: I) -> Self
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut index = Self::new(strategy);
        for item in items {
            index.insert(item);
        }
        index
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn len(&self) -> usize {
        size(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn clear(&mut self) {
        self.root = None;
    }

    /// The entry `item` maps to in its current state.
    pub fn entry_for(&self, item: &T) -> IndexEntry<S::Key> {
        IndexEntry {
            rank_key: self.strategy.rank_key(item),
            character: item.index_id().to_string(),
        }
    }

    /// Add `item`. Returns false if the identical entry is already present.
    pub fn insert(&mut self, item: &T) -> bool {
        let entry = self.entry_for(item);
        if self.rank_of_entry(&entry).is_some() {
            return false;
        }

        let priority: u64 = self.rng.gen();
        let (left, right) = split(self.root.take(), &entry, false);
        let node = Some(Box::new(Node::new(entry, priority)));
        self.root = merge(merge(left, node), right);
        true
    }

    /// Remove the entry `item` maps to in its current state.
    ///
    /// Returns false when no such entry exists, which is what happens if the
    /// item was mutated after it was inserted.
    pub fn erase(&mut self, item: &T) -> bool {
        let entry = self.entry_for(item);
        let (left, rest) = split(self.root.take(), &entry, false);
        let (matched, right) = split(rest, &entry, true);
        self.root = merge(left, right);
        matched.is_some()
    }

    /// Zero-based ascending rank of `item`'s current entry.
    pub fn order_of_key(&self, item: &T) -> Option<usize> {
        self.rank_of_entry(&self.entry_for(item))
    }

    pub fn rank_of_entry(&self, entry: &IndexEntry<S::Key>) -> Option<usize> {
        let mut link = &self.root;
        let mut rank = 0;

        while let Some(node) = link {
            match entry.cmp(&node.entry) {
                Ordering::Less => link = &node.left,
                Ordering::Equal => return Some(rank + size(&node.left)),
                Ordering::Greater => {
                    rank += size(&node.left) + 1;
                    link = &node.right;
                }
            }
        }
        None
    }

    /// Entry at zero-based ascending `rank`, or `None` when out of bounds.
    pub fn find_by_order(&self, rank: usize) -> Option<&IndexEntry<S::Key>> {
        if rank >= self.len() {
            return None;
        }

        let mut link = &self.root;
        let mut rank = rank;

        while let Some(node) = link {
            let left = size(&node.left);
            match rank.cmp(&left) {
                Ordering::Less => link = &node.left,
                Ordering::Equal => return Some(&node.entry),
                Ordering::Greater => {
                    rank -= left + 1;
                    link = &node.right;
                }
            }
        }
        None
    }

    /// Entries in ascending order.
    pub fn iter(&self) -> Iter<'_, S::Key> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(&self.root);
        iter
    }
}

impl<T, S> fmt::Debug for OrderedIndex<T, S>
where
    S: RankStrategy<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedIndex")
            .field("len", &size(&self.root))
            .finish()
    }
}

/// In-order iterator over an [`OrderedIndex`].
pub struct Iter<'a, K> {
    stack: Vec<&'a Node<K>>,
}

impl<'a, K> Iter<'a, K> {
    fn push_left(&mut self, mut link: &'a Link<K>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = &node.left;
        }
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a IndexEntry<K>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(&node.right);
        Some(&node.entry)
    }
}
