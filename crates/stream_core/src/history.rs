pub const DEFAULT_MAX_ITEMS: usize = 50;

/// Newest-first, capacity-limited history of one event kind.
///
/// Pushing never mutates the receiver: every push returns a new buffer, so a
/// previously handed-out snapshot stays valid and two snapshots can be
/// compared structurally.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> HistoryBuffer<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ITEMS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Most recently pushed item.
    pub fn latest(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn clear(&self) -> Self {
        Self::with_capacity(self.capacity)
    }
}

impl<T: Clone> HistoryBuffer<T> {
    /// Returns a new buffer with `item` at index 0, dropping the oldest
    /// entries past capacity.
    #[must_use]
    pub fn push(&self, item: T) -> Self {
        if self.capacity == 0 {
            return self.clear();
        }
        let keep = self.items.len().min(self.capacity - 1);
        let mut items = Vec::with_capacity(keep + 1);
        items.push(item);
        items.extend(self.items[..keep].iter().cloned());
        Self {
            items,
            capacity: self.capacity,
        }
    }
}

impl<T> Default for HistoryBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a HistoryBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
