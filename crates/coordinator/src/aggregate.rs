//! Result aggregation.

/// Accumulator for per-unit results.
///
/// The coordinator builds the aggregate incrementally as units succeed but
/// only ever hands it to the caller whole: on any abort the partially
/// merged value is dropped. Implementations therefore never need to
/// support "un-merging".
pub trait Aggregate: Default + Send {
    /// The per-unit result type merged into this aggregate.
    type Item: Send;

    /// Merges one unit's result into the accumulator.
    fn merge(&mut self, item: Self::Item);

    /// Number of unit results merged so far.
    fn len(&self) -> usize;

    /// Returns true if nothing has been merged yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The simplest useful aggregate: collect every unit result in merge order.
impl<T: Send> Aggregate for Vec<T> {
    type Item = T;

    fn merge(&mut self, item: T) {
        self.push(item);
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}
