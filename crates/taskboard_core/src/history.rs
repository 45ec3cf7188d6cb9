use crate::model::{Entity, TaskId};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Node {
    entity: Entity,
    prev: Option<usize>,
    next: Option<usize>,
}

/// View log of distinct entities, oldest-viewed-first. A repeated view moves
/// the single existing entry to the most-recent end. Backed by a slab of
/// doubly-linked nodes plus an id→slot map, so both `record` and `remove`
/// run in O(1).
#[derive(Debug, Default, Clone)]
pub struct HistoryTracker {
    nodes: Vec<Option<Node>>,
    slots: HashMap<TaskId, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Vec<usize>,
}

impl HistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entity: Entity) {
        let id = entity.id();
        if let Some(&slot) = self.slots.get(&id) {
            self.unlink(slot);
            if let Some(node) = self.nodes[slot].as_mut() {
                node.entity = entity;
            }
            self.link_tail(slot);
            return;
        }

        let node = Node {
            entity,
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.slots.insert(id, slot);
        self.link_tail(slot);
    }

    pub fn remove(&mut self, id: TaskId) {
        let Some(slot) = self.slots.remove(&id) else {
            return;
        };
        self.unlink(slot);
        self.nodes[slot] = None;
        self.free.push(slot);
    }

    /// Independent copy of the current view order; mutating it leaves the
    /// tracker untouched.
    pub fn snapshot(&self) -> Vec<Entity> {
        let mut entities = Vec::with_capacity(self.slots.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let Some(node) = self.nodes[slot].as_ref() else {
                break;
            };
            entities.push(node.entity.clone());
            cursor = node.next;
        }
        entities
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = match self.nodes[slot].as_ref() {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_slot) => {
                if let Some(node) = self.nodes[prev_slot].as_mut() {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next_slot) => {
                if let Some(node) = self.nodes[next_slot].as_mut() {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(node) = self.nodes[slot].as_mut() {
            node.prev = None;
            node.next = None;
        }
    }

    fn link_tail(&mut self, slot: usize) {
        let tail = self.tail;
        if let Some(node) = self.nodes[slot].as_mut() {
            node.prev = tail;
            node.next = None;
        }
        match tail {
            Some(tail_slot) => {
                if let Some(node) = self.nodes[tail_slot].as_mut() {
                    node.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }
}
