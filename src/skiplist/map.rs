use std::{
    fmt,
    fmt::Debug,
    iter::FusedIterator,
    mem,
};

use tracing::trace;

use crate::{
    arena::{
        Arena,
        NodeId,
    },
    skiplist::{
        level_generator::{
            GeometricLevels,
            LevelGenerator,
        },
        node::Node,
    },
    DEFAULT_MAX_LEVEL,
    DEFAULT_P,
};

/// An ordered map backed by an arena-allocated skip list.
///
/// Entries are kept sorted by key at all times. Point lookup, insertion, and
/// removal run in expected O(log n) time (worst case O(n) under pathological
/// level draws); iteration walks the level-0 chain and is always ascending.
///
/// All nodes live in an internal [`Arena`] and reference each other through
/// stable slot handles, so removing an entry reclaims its slot without
/// leaving dangling links anywhere else in the structure.
///
/// The map provides no internal synchronization; share it across threads
/// behind a lock or confine it to a single owner.
///
/// Cloning a map duplicates the arena and the generator state, so a clone
/// and its source draw identical level sequences from that point on.
#[derive(Clone)]
pub struct SkipMap<K, V, G = GeometricLevels> {
    arena: Arena<Node<K, V>>,
    /// The sentinel's tower: `head[i]` is the first node on level `i`. The
    /// sentinel carries no key or value, which is why it is a bare pointer
    /// array rather than a `Node`.
    head: Vec<Option<NodeId>>,
    /// Highest level currently populated, always `<=` the generator ceiling.
    level: usize,
    len: usize,
    levels: G,
}

impl<K: Ord, V> SkipMap<K, V> {
    /// An empty map whose towers never exceed `max_level`, with the default
    /// fair-coin level distribution. The ceiling is fixed for the lifetime of
    /// the map; `log2` of the expected entry count is a good choice.
    pub fn new(max_level: usize) -> Self {
        Self::with_generator(GeometricLevels::new(max_level, DEFAULT_P))
    }
}

impl<K: Ord, V> Default for SkipMap<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEVEL)
    }
}

impl<K: Ord, V, G: LevelGenerator> SkipMap<K, V, G> {
    /// An empty map drawing tower heights from `levels`. Injecting a seeded
    /// generator makes the map's shape fully deterministic.
    pub fn with_generator(levels: G) -> Self {
        SkipMap {
            arena: Arena::new(),
            head: vec![None; levels.max_level() + 1],
            level: 0,
            len: 0,
            levels,
        }
    }

    /// Inserts `key` with `value`, returning the previous value if the key
    /// was already present.
    ///
    /// A duplicate key overwrites in place: the existing tower is untouched,
    /// no level is drawn, and `len` does not change. A fresh key gets a tower
    /// of random height spliced in between its per-level predecessors.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut update = vec![None; self.head.len()];
        let pred = self.descend(&key, Some(update.as_mut_slice()));

        if let Some(id) = self.forward(pred, 0) {
            if self.arena[id].key == key {
                return Some(mem::replace(&mut self.arena[id].value, value));
            }
        }

        let level = self.levels.random_level();
        debug_assert!(level < self.head.len(), "generator exceeded its ceiling");
        let id = self.arena.insert(Node::new(key, value, level));
        trace!(level, len = self.len + 1, "splicing in a new tower");

        // Link bottom-up between each predecessor and its old successor. The
        // new node is simply absent from every chain above its own height.
        for (i, &pred) in update.iter().enumerate().take(level + 1) {
            let next = self.forward(pred, i);
            self.arena[id].forward[i] = next;
            self.set_forward(pred, i, Some(id));
        }

        if level > self.level {
            self.level = level;
        }
        self.len += 1;
        None
    }

    /// Removes `key` and returns its value, or `None` if it was not present.
    /// Removing an absent key is a no-op, not an error.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut update = vec![None; self.head.len()];
        let pred = self.descend(key, Some(update.as_mut_slice()));

        let target = self.forward(pred, 0)?;
        if self.arena[target].key != *key {
            return None;
        }

        // Unlink only the chains the target participates in; neighboring
        // towers keep their height and links.
        let height = self.arena[target].level();
        for (i, &pred) in update.iter().enumerate().take(height + 1) {
            if self.forward(pred, i) == Some(target) {
                let next = self.arena[target].forward[i];
                self.set_forward(pred, i, next);
            }
        }

        while self.level > 0 && self.head[self.level].is_none() {
            self.level -= 1;
        }
        self.len -= 1;
        trace!(height, len = self.len, "spliced out a tower");

        // every live reference is gone, the slot can be reclaimed
        Some(self.arena.remove(target).value)
    }
}

impl<K: Ord, V, G> SkipMap<K, V, G> {
    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a reference to the value for `key`. Absence is a normal
    /// outcome, not an error.
    pub fn get(&self, key: &K) -> Option<&V> {
        let id = self.find(key)?;
        Some(&self.arena[id].value)
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.find(key)?;
        Some(&mut self.arena[id].value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// The smallest entry, i.e. the front of the level-0 chain.
    pub fn first(&self) -> Option<(&K, &V)> {
        let id = self.head[0]?;
        let node = &self.arena[id];
        Some((&node.key, &node.value))
    }

    /// The rightmost entry whose key is strictly less than `key`, if any.
    pub fn predecessor(&self, key: &K) -> Option<(&K, &V)> {
        let id = self.descend(key, None)?;
        let node = &self.arena[id];
        Some((&node.key, &node.value))
    }

    /// Drops every entry and resets all towers, keeping the arena allocation.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.head.fill(None);
        self.level = 0;
        self.len = 0;
        trace!("cleared all towers");
    }

    /// Ascending iterator over `(&key, &value)` pairs.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            arena: &self.arena,
            next: self.head[0],
            remaining: self.len,
        }
    }

    /// Ascending iterator over `(&key, &mut value)` pairs. Keys stay
    /// immutable, since rewriting one could break the sort order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            next: self.head[0],
            remaining: self.len,
            arena: &mut self.arena,
        }
    }

    /// Ascending iterator over keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Iterator over values, in ascending order of their keys.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Mutable iterator over values, in ascending order of their keys.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// The classic top-down descent. Starting at the sentinel on the highest
    /// populated level, run forward while the next key is still strictly
    /// smaller, then drop a level and continue from the same node; never move
    /// backward. Returns the rightmost node with key strictly less than
    /// `key` (`None` meaning the sentinel) and, when `update` is supplied,
    /// records that per-level predecessor for every level in one pass.
    fn descend(&self, key: &K, mut update: Option<&mut [Option<NodeId>]>) -> Option<NodeId> {
        let mut pred: Option<NodeId> = None;
        for i in (0..=self.level).rev() {
            let mut next = self.forward(pred, i);
            while let Some(id) = next {
                let node = &self.arena[id];
                if node.key >= *key {
                    break;
                }
                pred = Some(id);
                next = node.forward[i];
            }
            if let Some(update) = update.as_deref_mut() {
                update[i] = pred;
            }
        }
        pred
    }

    /// Point lookup: only the level-0 successor of the predecessor path can
    /// carry `key`.
    fn find(&self, key: &K) -> Option<NodeId> {
        let pred = self.descend(key, None);
        let candidate = self.forward(pred, 0)?;
        (self.arena[candidate].key == *key).then_some(candidate)
    }

    /// Successor of `pred` on `level`, where `None` is the sentinel.
    fn forward(&self, pred: Option<NodeId>, level: usize) -> Option<NodeId> {
        match pred {
            Some(id) => self.arena[id].forward[level],
            None => self.head[level],
        }
    }

    fn set_forward(&mut self, pred: Option<NodeId>, level: usize, next: Option<NodeId>) {
        match pred {
            Some(id) => self.arena[id].forward[level] = next,
            None => self.head[level] = next,
        }
    }
}

impl<K: Ord, V, G: LevelGenerator> Extend<(K, V)> for SkipMap<K, V, G> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for SkipMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = SkipMap::default();
        map.extend(iter);
        map
    }
}

impl<K: Ord + Debug, V: Debug, G> Debug for SkipMap<K, V, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Borrowing iterator over the level-0 chain; see [`SkipMap::iter`].
pub struct Iter<'a, K, V> {
    arena: &'a Arena<Node<K, V>>,
    next: Option<NodeId>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = &self.arena[id];
        self.next = node.forward[0];
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<'a, K: Ord, V, G> IntoIterator for &'a SkipMap<K, V, G> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

/// Mutable borrowing iterator over the level-0 chain; see
/// [`SkipMap::iter_mut`].
pub struct IterMut<'a, K, V> {
    arena: &'a mut Arena<Node<K, V>>,
    next: Option<NodeId>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = &mut self.arena[id] as *mut Node<K, V>;
        // Safety: the level-0 chain is acyclic and strictly ascending, so
        // each node is visited exactly once and the yielded references
        // never alias.
        let node = unsafe { &mut *node };
        self.next = node.forward[0];
        self.remaining -= 1;
        Some((&node.key, &mut node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

impl<'a, K: Ord, V, G> IntoIterator for &'a mut SkipMap<K, V, G> {
    type IntoIter = IterMut<'a, K, V>;
    type Item = (&'a K, &'a mut V);

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

/// Consuming iterator; entries are drained from the arena in key order.
pub struct IntoIter<K, V> {
    arena: Arena<Node<K, V>>,
    next: Option<NodeId>,
    remaining: usize,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.arena.remove(id);
        self.next = node.forward[0];
        self.remaining -= 1;
        Some((node.key, node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K: Ord, V, G> IntoIterator for SkipMap<K, V, G> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter {
            next: self.head[0],
            remaining: self.len,
            arena: self.arena,
        }
    }
}

/// Ascending iterator over keys; see [`SkipMap::keys`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over values in key order; see [`SkipMap::values`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Mutable iterator over values in key order; see [`SkipMap::values_mut`].
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::{
        collection::vec,
        prelude::*,
    };
    use rand::{
        rngs::StdRng,
        seq::SliceRandom,
        SeedableRng,
    };

    use crate::{
        skiplist::level_generator::GeometricLevels,
        SkipMap,
    };

    #[test]
    fn test_concrete_scenario() {
        let mut map = SkipMap::new(3);
        map.insert(3, 2);
        map.insert(1, 3);
        map.insert(4, 1);
        map.insert(7, 4);

        assert_eq!(map.get(&3), Some(&2));
        assert_eq!(map.get(&0), None);
        assert_eq!(
            map.iter().map(|(&k, &v)| (k, v)).collect::<Vec<_>>(),
            vec![(1, 3), (3, 2), (4, 1), (7, 4)]
        );

        assert_eq!(map.remove(&3), Some(2));
        assert_eq!(map.get(&3), None);
        assert_eq!(
            map.iter().map(|(&k, &v)| (k, v)).collect::<Vec<_>>(),
            vec![(1, 3), (4, 1), (7, 4)]
        );
    }

    #[test]
    fn test_round_trip() {
        let mut map = SkipMap::new(8);
        for k in 0..100 {
            map.insert(k, k * 10);
        }
        for k in 0..100 {
            assert_eq!(map.get(&k), Some(&(k * 10)));
        }
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let mut map = SkipMap::new(4);
        assert_eq!(map.insert("k", 1), None);
        assert_eq!(map.insert("k", 2), Some(1));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&"k"), Some(&2));
        assert_eq!(map.iter().count(), 1);
    }

    #[test]
    fn test_deletion_completeness() {
        let mut map = SkipMap::new(4);
        map.insert(5, "five");
        map.insert(9, "nine");

        assert_eq!(map.remove(&5), Some("five"));
        assert_eq!(map.get(&5), None);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&9), Some(&"nine"));
    }

    #[test]
    fn test_remove_absent_is_a_noop() {
        let mut map = SkipMap::new(4);
        map.insert(1, 1);

        assert_eq!(map.remove(&2), None);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&1));

        map.remove(&1);
        assert_eq!(map.remove(&1), None);
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_get_mut() {
        let mut map = SkipMap::new(4);
        map.insert(1, 10);
        if let Some(v) = map.get_mut(&1) {
            *v = 20;
        }
        assert_eq!(map.get(&1), Some(&20));
        assert_eq!(map.get_mut(&99), None);
    }

    #[test]
    fn test_sorted_after_churn() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut map = SkipMap::new(8);

        let mut keys: Vec<u32> = (0..500).collect();
        keys.shuffle(&mut rng);
        for &k in &keys {
            map.insert(k, k);
        }
        keys.shuffle(&mut rng);
        for &k in keys.iter().take(250) {
            map.remove(&k);
        }

        let collected: Vec<u32> = map.keys().copied().collect();
        assert_eq!(collected.len(), 250);
        assert!(collected.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_height_containment() {
        let levels = GeometricLevels::from_seed(3, 0.5, 99).unwrap();
        let mut map = SkipMap::with_generator(levels);
        for k in 0..500u32 {
            map.insert(k, ());
        }

        assert_eq!(map.head.len(), 4);
        let mut next = map.head[0];
        while let Some(id) = next {
            let node = &map.arena[id];
            assert!(node.level() <= 3);
            next = node.forward[0];
        }
    }

    #[test]
    fn test_randomized_stress() {
        let mut rng = StdRng::seed_from_u64(0xA5A5);
        let keys = rand::seq::index::sample(&mut rng, 100_000, 10_000).into_vec();

        let mut map = SkipMap::new(16);
        for &k in &keys {
            map.insert(k, k * 3);
        }
        assert_eq!(map.len(), 10_000);
        for &k in &keys {
            assert_eq!(map.get(&k), Some(&(k * 3)));
        }

        let mut removal = keys.clone();
        removal.shuffle(&mut rng);
        for &k in &removal {
            assert_eq!(map.remove(&k), Some(k * 3));
        }

        assert_eq!(map.len(), 0);
        assert_eq!(map.level, 0);
        for &k in &keys {
            assert_eq!(map.get(&k), None);
        }
    }

    #[test]
    fn test_first_and_predecessor() {
        let mut map = SkipMap::new(4);
        assert_eq!(map.first(), None);
        assert_eq!(map.predecessor(&10), None);

        for k in [10, 20, 30] {
            map.insert(k, k + 1);
        }

        assert_eq!(map.first(), Some((&10, &11)));
        assert_eq!(map.predecessor(&5), None);
        assert_eq!(map.predecessor(&20), Some((&10, &11)));
        assert_eq!(map.predecessor(&25), Some((&20, &21)));
        assert_eq!(map.predecessor(&99), Some((&30, &31)));
    }

    #[test]
    fn test_clear() {
        let mut map = SkipMap::new(4);
        for k in 0..50 {
            map.insert(k, k);
        }
        map.clear();

        assert!(map.is_empty());
        assert_eq!(map.iter().next(), None);

        map.insert(1, 1);
        assert_eq!(map.get(&1), Some(&1));
    }

    #[test]
    fn test_collect_and_into_iter() {
        let map: SkipMap<i32, &str> = vec![(2, "b"), (1, "a"), (3, "c")].into_iter().collect();
        assert_eq!(map.len(), 3);

        let drained: Vec<_> = map.into_iter().collect();
        assert_eq!(drained, vec![(1, "a"), (2, "b"), (3, "c")]);
    }

    #[test]
    fn test_iter_mut() {
        let mut map = SkipMap::new(4);
        for k in 0..10 {
            map.insert(k, k);
        }

        for (_, v) in map.iter_mut() {
            *v *= 2;
        }
        for k in 0..10 {
            assert_eq!(map.get(&k), Some(&(k * 2)));
        }

        let keys: Vec<i32> = map.iter_mut().map(|(&k, _)| k).collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_values_mut() {
        let mut map = SkipMap::new(4);
        map.insert("a", 1);
        map.insert("b", 2);

        for v in map.values_mut() {
            *v += 10;
        }

        assert_eq!(map.get(&"a"), Some(&11));
        assert_eq!(map.get(&"b"), Some(&12));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut map = SkipMap::new(4);
        for k in 0..20 {
            map.insert(k, k);
        }
        let snapshot = map.clone();

        map.remove(&5);
        map.insert(3, 99);

        assert_eq!(snapshot.len(), 20);
        assert_eq!(snapshot.get(&5), Some(&5));
        assert_eq!(snapshot.get(&3), Some(&3));

        let keys: Vec<i32> = snapshot.keys().copied().collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));

        // the clone keeps accepting mutations on its own
        let mut snapshot = snapshot;
        snapshot.insert(100, 100);
        assert_eq!(snapshot.get(&100), Some(&100));
        assert_eq!(map.get(&100), None);
    }

    #[test]
    fn test_iter_is_exact_size() {
        let mut map = SkipMap::new(4);
        for k in 0..10 {
            map.insert(k, k);
        }
        let mut iter = map.iter();
        assert_eq!(iter.len(), 10);
        iter.next();
        assert_eq!(iter.len(), 9);
    }

    #[test]
    fn test_debug_formats_in_order() {
        let mut map = SkipMap::new(4);
        map.insert(2, 'b');
        map.insert(1, 'a');
        assert_eq!(format!("{map:?}"), "{1: 'a', 2: 'b'}");
    }

    proptest! {
        #[test]
        fn test_matches_btreemap_model(
            ops in vec((0..3u8, 0..64u16, any::<u32>()), 1..200)
        ) {
            let mut map = SkipMap::new(8);
            let mut model = BTreeMap::new();

            for (op, key, value) in ops {
                match op {
                    | 0 => prop_assert_eq!(map.insert(key, value), model.insert(key, value)),
                    | 1 => prop_assert_eq!(map.remove(&key), model.remove(&key)),
                    | _ => prop_assert_eq!(map.get(&key), model.get(&key)),
                }
            }

            prop_assert_eq!(map.len(), model.len());
            let collected: Vec<_> = map.iter().map(|(&k, &v)| (k, v)).collect();
            let expected: Vec<_> = model.iter().map(|(&k, &v)| (k, v)).collect();
            prop_assert_eq!(collected, expected);
        }
    }
}
