use crate::arena::NodeId;

/// A single entry plus its tower of forward references.
///
/// `forward[i]` names the next node on level `i`, or `None` when this node is
/// the last one on that chain. Towers are contiguous: a node present on level
/// `i` is present on every level below it, so the tower height is just
/// `forward.len()`. Every populated `forward[i]` points at a node with a
/// strictly greater key and a tower of at least `i + 1` links.
#[derive(Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) forward: Vec<Option<NodeId>>,
}

impl<K, V> Node<K, V> {
    /// A detached node reaching up to `level`, inclusive. All links start
    /// empty and are spliced in by the owning map.
    pub(crate) fn new(key: K, value: V, level: usize) -> Self {
        Node {
            key,
            value,
            forward: vec![None; level + 1],
        }
    }

    /// The highest level this node participates in.
    pub(crate) fn level(&self) -> usize {
        self.forward.len() - 1
    }
}
