use std::{
    collections::{HashSet, VecDeque},
    hash::Hash,
};

/// Bounded FIFO of recently visited solutions.
///
/// Membership is checked by structural equality. Inserting past capacity evicts
/// the oldest entry; inserting an entry that is already present is a no-op and
/// does not refresh its position.
#[derive(Debug, Clone)]
pub struct TabuList<T> {
    capacity: usize,
    set: HashSet<T>,
    order: VecDeque<T>,
}

impl<T> TabuList<T>
where
    T: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            set: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `false` if `value` was already present or the list has no room
    /// at all.
    pub fn insert(&mut self, value: T) -> bool {
        if self.capacity == 0 || self.set.contains(&value) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.set.insert(value.clone());
        self.order.push_back(value);
        true
    }

    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.set.contains(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
