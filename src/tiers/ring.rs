// Fixed-capacity FIFO: slots allocated once, oldest entry overwritten when full.

/// Bounded ring buffer over a preallocated slot array.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Ring with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1);
        Self {
            slots: (0..cap).map(|_| None).collect(),
            head: 0,
            len: 0,
        }
    }

    /// Appends `item`; returns the evicted oldest entry when the ring was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = self.slots[self.head].replace(item);
        self.head = (self.head + 1) % self.slots.len();
        if self.len < self.slots.len() {
            self.len += 1;
        }
        evicted
    }

    /// Oldest-first iteration.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let cap = self.slots.len();
        let start = (self.head + cap - self.len) % cap;
        (0..self.len).filter_map(move |i| self.slots[(start + i) % cap].as_ref())
    }

    /// Most recently pushed entry.
    pub fn last(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        let cap = self.slots.len();
        self.slots[(self.head + cap - 1) % cap].as_ref()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Owned copy in insertion order.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
