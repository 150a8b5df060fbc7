//! Arena-Backed Recency List
//!
//! A doubly-linked list of keys ordered from most- to least-recently used.
//! Nodes live in a `Vec` and link to each other with integer handles instead
//! of pointers, so there are no reference cycles and no `unsafe`. Freed slots
//! are recycled through a free list.
//!
//! ```text
//!  head (MRU)                                  tail (LRU)
//!   ┌─────┐  next  ┌─────┐  next  ┌─────┐
//!   │ "c" │ ─────> │ "a" │ ─────> │ "b" │
//!   │     │ <───── │     │ <───── │     │
//!   └─────┘  prev  └─────┘  prev  └─────┘
//! ```
//!
//! All operations are O(1).

/// Handle to a node in an [`LruList`].
pub type NodeId = usize;

#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Recency order over a set of keys.
#[derive(Debug, Default)]
pub struct LruList {
    /// Node storage; `None` marks a free slot
    nodes: Vec<Option<Node>>,
    /// Indices of free slots available for reuse
    free: Vec<NodeId>,
    /// Most recently used
    head: Option<NodeId>,
    /// Least recently used
    tail: Option<NodeId>,
    len: usize,
}

impl LruList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `key` as the most recently used element.
    pub fn push_front(&mut self, key: String) -> NodeId {
        let node = Node {
            key,
            prev: None,
            next: self.head,
        };

        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };

        if let Some(old_head) = self.head {
            self.node_mut(old_head).prev = Some(id);
        }
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
        self.len += 1;
        id
    }

    /// Moves an existing node to the front.
    pub fn move_to_front(&mut self, id: NodeId) {
        if self.head == Some(id) {
            return;
        }
        self.unlink(id);

        let old_head = self.head;
        {
            let node = self.node_mut(id);
            node.prev = None;
            node.next = old_head;
        }
        if let Some(old_head) = old_head {
            self.node_mut(old_head).prev = Some(id);
        }
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
    }

    /// Removes a node and returns its key.
    pub fn remove(&mut self, id: NodeId) -> String {
        self.unlink(id);
        let node = self.nodes[id].take().expect("LRU node handle is stale");
        self.free.push(id);
        self.len -= 1;
        node.key
    }

    /// Removes and returns the least recently used key.
    pub fn pop_back(&mut self) -> Option<String> {
        let tail = self.tail?;
        Some(self.remove(tail))
    }

    /// Returns the least recently used key without removing it.
    pub fn back(&self) -> Option<&str> {
        self.tail.map(|id| self.node(id).key.as_str())
    }

    /// Returns the most recently used key.
    pub fn front(&self) -> Option<&str> {
        self.head.map(|id| self.node(id).key.as_str())
    }

    /// Iterates keys from most- to least-recently used.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.node(cursor?);
            cursor = node.next;
            Some(node.key.as_str())
        })
    }

    /// Detaches a node from its neighbours, patching head/tail.
    fn unlink(&mut self, id: NodeId) {
        let (prev, next) = {
            let node = self.node(id);
            (node.prev, node.next)
        };

        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }

    #[inline]
    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id].as_ref().expect("LRU node handle is stale")
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id].as_mut().expect("LRU node handle is stale")
    }
}
