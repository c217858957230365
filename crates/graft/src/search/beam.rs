use crate::scoring::Scored;
use std::fmt;
use tracing::trace;

/// Bounded best-list of scored hypotheses
///
/// Items are kept in ascending score order: index 0 is the worst retained
/// hypothesis. Once the beam is full a new item is accepted only if it scores
/// at least as well as the current worst, which it then evicts. The beam never
/// holds more than its capacity and always holds the best items offered so
/// far. NaN scores are never accepted, and a zero-capacity beam accepts
/// nothing.
#[derive(Clone)]
pub struct Beam<H> {
    items: Vec<H>,
    capacity: usize,
}

impl<H: Scored> Beam<H> {
    /// Create an empty beam holding at most `capacity` items
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Offer `item`; returns whether it was kept
    pub fn add(&mut self, item: H) -> bool {
        let score = item.log_prob();
        if self.capacity == 0 || score.is_nan() {
            return false;
        }
        let full = self.items.len() >= self.capacity;
        if full && score < self.worst_score() {
            return false;
        }

        let mut index = self.items.partition_point(|h| h.log_prob() <= score);
        if full {
            let evicted = self.items.remove(0);
            trace!(
                evicted = evicted.log_prob(),
                admitted = score,
                "beam eviction"
            );
            index = index.saturating_sub(1);
        }
        self.items.insert(index, item);
        true
    }

    /// Highest-scoring item
    #[must_use]
    pub fn best(&self) -> Option<&H> {
        self.items.last()
    }

    /// Lowest-scoring retained item
    #[must_use]
    pub fn worst(&self) -> Option<&H> {
        self.items.first()
    }

    /// Score of the best item, or negative infinity when empty
    #[must_use]
    pub fn best_score(&self) -> f64 {
        self.best().map_or(f64::NEG_INFINITY, Scored::log_prob)
    }

    /// Score of the worst item, or positive infinity when empty
    #[must_use]
    pub fn worst_score(&self) -> f64 {
        self.worst().map_or(f64::INFINITY, Scored::log_prob)
    }

    /// Number of items currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether another item would have to evict the worst one
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Maximum number of items
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items in ascending score order
    pub fn iter(&self) -> std::slice::Iter<'_, H> {
        self.items.iter()
    }

    /// Items in descending score order
    pub fn iter_best_first(&self) -> std::iter::Rev<std::slice::Iter<'_, H>> {
        self.items.iter().rev()
    }

    /// Consume the beam, best item first
    #[must_use]
    pub fn into_sorted_vec(mut self) -> Vec<H> {
        self.items.reverse();
        self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<H: Scored> Extend<H> for Beam<H> {
    fn extend<I: IntoIterator<Item = H>>(&mut self, iter: I) {
        for item in iter {
            self.add(item);
        }
    }
}

impl<H> IntoIterator for Beam<H> {
    type Item = H;
    type IntoIter = std::vec::IntoIter<H>;

    /// Ascending score order
    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, H> IntoIterator for &'a Beam<H> {
    type Item = &'a H;
    type IntoIter = std::slice::Iter<'a, H>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<H: Scored> fmt::Debug for Beam<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scores: Vec<f64> = self.items.iter().map(Scored::log_prob).collect();
        f.debug_struct("Beam")
            .field("capacity", &self.capacity)
            .field("scores", &scores)
            .finish()
    }
}
