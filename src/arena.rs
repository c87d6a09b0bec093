use std::ops::{
    Index,
    IndexMut,
};

/// A stable handle to an occupied [`Arena`] slot.
///
/// Handles stay valid across unrelated insertions and removals; a handle is
/// only invalidated when its own entry is removed, and its slot may be reused
/// by a later insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(u32);

#[derive(Clone)]
enum Slot<T> {
    Occupied(T),
    Vacant { next_free: Option<u32> },
}

/// A slot arena with a free list.
///
/// Entries are addressed by [`NodeId`] rather than by reference, so a
/// structure threading handles through itself can unlink and reclaim an entry
/// without leaving dangling references behind. Removed slots go on the free
/// list and are reused by subsequent insertions.
///
/// Cloning preserves slot positions, so handles into the source arena are
/// equally valid for the clone.
#[derive(Clone)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Stores `value`, reusing a vacant slot when one is available.
    pub(crate) fn insert(&mut self, value: T) -> NodeId {
        self.len += 1;
        match self.free_head {
            Some(idx) => {
                match self.slots[idx as usize] {
                    Slot::Vacant { next_free } => self.free_head = next_free,
                    Slot::Occupied(_) => unreachable!("occupied slot on the free list"),
                }
                self.slots[idx as usize] = Slot::Occupied(value);
                NodeId(idx)
            },
            None => {
                let idx = u32::try_from(self.slots.len()).expect("arena exceeded u32 handle space");
                self.slots.push(Slot::Occupied(value));
                NodeId(idx)
            },
        }
    }

    /// Vacates the slot behind `id` and returns its entry. The slot joins the
    /// free list; the caller must have unlinked every handle to it first.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not name an occupied slot.
    pub(crate) fn remove(&mut self, id: NodeId) -> T {
        let slot = std::mem::replace(
            &mut self.slots[id.0 as usize],
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        match slot {
            Slot::Occupied(value) => {
                self.free_head = Some(id.0);
                self.len -= 1;
                value
            },
            Slot::Vacant { next_free } => {
                // put the free list back the way it was before panicking
                self.slots[id.0 as usize] = Slot::Vacant { next_free };
                panic!("removed a vacant arena slot");
            },
        }
    }

    /// Drops every entry and resets the free list, keeping the allocation.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
        self.len = 0;
    }
}

impl<T> Index<NodeId> for Arena<T> {
    type Output = T;

    fn index(&self, id: NodeId) -> &T {
        match &self.slots[id.0 as usize] {
            Slot::Occupied(value) => value,
            Slot::Vacant { .. } => panic!("indexed a vacant arena slot"),
        }
    }
}

impl<T> IndexMut<NodeId> for Arena<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut T {
        match &mut self.slots[id.0 as usize] {
            Slot::Occupied(value) => value,
            Slot::Vacant { .. } => panic!("indexed a vacant arena slot"),
        }
    }
}
