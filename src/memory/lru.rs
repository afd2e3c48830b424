//! LRU List Module
//!
//! Recency list backing the bounded memory store. Keys live in a doubly
//! linked list, most recently used at the front; each entry in the store
//! keeps the [`NodeId`] of its list node so reads can move it to the front
//! in O(1).
//!
//! Nodes are kept in a slab (a plain `Vec` plus a free list), so handles are
//! indices and no `unsafe` pointer juggling is needed.

// == Node Handle ==
/// Opaque handle to a node in the LRU list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(usize);

// == Internal Node ==
#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
enum Slot {
    Occupied(Node),
    Vacant,
}

// == LRU List ==
/// Doubly linked key list with O(1) push/move/remove given a handle.
///
/// Front = most recently used, back = least recently used.
#[derive(Debug, Default)]
pub(crate) struct LruList {
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl LruList {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Length ==
    /// Returns the number of tracked keys.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no keys are tracked.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Push Front ==
    /// Inserts a key at the front (most recently used) and returns its handle.
    pub fn push_front(&mut self, key: String) -> NodeId {
        let node = Node {
            key,
            prev: None,
            next: self.head,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Slot::Occupied(node);
                idx
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                self.slots.len() - 1
            }
        };
        if let Some(old_head) = self.head {
            self.node_mut(old_head).prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
        self.len += 1;
        NodeId(idx)
    }

    // == Move To Front ==
    /// Marks a node as most recently used.
    pub fn move_to_front(&mut self, id: NodeId) {
        if self.head == Some(id.0) {
            return;
        }
        self.unlink(id.0);
        // Relink at the front. Unlinking a non-head node cannot empty the
        // list, so the old head is always present here.
        self.node_mut(id.0).prev = None;
        self.node_mut(id.0).next = self.head;
        if let Some(old_head) = self.head {
            self.node_mut(old_head).prev = Some(id.0);
        }
        self.head = Some(id.0);
    }

    // == Remove ==
    /// Removes a node, returning its key. The handle must not be reused.
    pub fn remove(&mut self, id: NodeId) -> String {
        self.unlink(id.0);
        let slot = std::mem::replace(&mut self.slots[id.0], Slot::Vacant);
        self.free.push(id.0);
        self.len -= 1;
        match slot {
            Slot::Occupied(node) => node.key,
            Slot::Vacant => unreachable!("LRU remove on vacant slot {}", id.0),
        }
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used key.
    ///
    /// Returns None if the list is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let idx = self.tail?;
        Some(self.remove(NodeId(idx)))
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&str> {
        self.tail.map(|idx| self.node(idx).key.as_str())
    }

    // == Key Lookup ==
    /// Returns the key stored at a handle.
    #[cfg(test)]
    pub fn key_of(&self, id: NodeId) -> &str {
        self.node(id.0).key.as_str()
    }

    // == Iteration ==
    /// Iterates keys from most to least recently used.
    pub fn iter(&self) -> Keys<'_> {
        Keys {
            list: self,
            next: self.head,
        }
    }

    // == Clear ==
    /// Drops every node and releases the slab.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    // == Internal Helpers ==
    /// Detaches a node from the chain without freeing its slot.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    fn node(&self, idx: usize) -> &Node {
        match &self.slots[idx] {
            Slot::Occupied(node) => node,
            Slot::Vacant => unreachable!("LRU access to vacant slot {}", idx),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        match &mut self.slots[idx] {
            Slot::Occupied(node) => node,
            Slot::Vacant => unreachable!("LRU access to vacant slot {}", idx),
        }
    }
}

/// Iterator over keys, most recently used first.
pub(crate) struct Keys<'a> {
    list: &'a LruList,
    next: Option<usize>,
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let idx = self.next?;
        let node = self.list.node(idx);
        self.next = node.next;
        Some(node.key.as_str())
    }
}
