//! Bounded-size batching of ordered record collections.

use std::num::NonZeroUsize;

use crate::{
    config::BatchSizes,
    errors::LoaderError,
    model::{BatchCategory, EntityKind},
};

/// One slice of a type's records, tagged with its position in the type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Batch<'a, T> {
    pub index: usize,
    pub offset: usize,
    pub items: &'a [T],
}

impl<T> Batch<'_, T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Lazy batch sequence over a borrowed slice. Cloning (or [`Batches::restart`])
/// yields the same sequence again from the start.
#[derive(Clone, Debug)]
pub struct Batches<'a, T> {
    items: &'a [T],
    size: NonZeroUsize,
    cursor: usize,
}

impl<'a, T> Batches<'a, T> {
    pub fn new(items: &'a [T], size: NonZeroUsize) -> Self {
        Self {
            items,
            size,
            cursor: 0,
        }
    }

    pub fn restart(&self) -> Self {
        Self::new(self.items, self.size)
    }

    pub fn batch_size(&self) -> usize {
        self.size.get()
    }
}

impl<'a, T> Iterator for Batches<'a, T> {
    type Item = Batch<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.cursor * self.size.get();
        if offset >= self.items.len() {
            return None;
        }
        let end = (offset + self.size.get()).min(self.items.len());
        let batch = Batch {
            index: self.cursor,
            offset,
            items: &self.items[offset..end],
        };
        self.cursor += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total = self.items.len().div_ceil(self.size.get());
        let remaining = total.saturating_sub(self.cursor);
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Batches<'_, T> {}

/// Chooses the batch size per entity category and slices collections.
#[derive(Clone, Copy, Debug)]
pub struct BatchPartitioner {
    entities: NonZeroUsize,
    transactions: NonZeroUsize,
}

impl BatchPartitioner {
    pub fn new(sizes: &BatchSizes) -> Result<Self, LoaderError> {
        let entities = NonZeroUsize::new(sizes.entities)
            .ok_or_else(|| LoaderError::config("entity batch size must be positive"))?;
        let transactions = NonZeroUsize::new(sizes.transactions)
            .ok_or_else(|| LoaderError::config("transaction batch size must be positive"))?;
        Ok(Self {
            entities,
            transactions,
        })
    }

    pub fn size_for(&self, kind: EntityKind) -> NonZeroUsize {
        match kind.category() {
            BatchCategory::Entities => self.entities,
            BatchCategory::Transactions => self.transactions,
        }
    }

    pub fn partition<'a, T>(&self, kind: EntityKind, items: &'a [T]) -> Batches<'a, T> {
        Batches::new(items, self.size_for(kind))
    }

    pub fn batch_count(&self, kind: EntityKind, len: usize) -> usize {
        len.div_ceil(self.size_for(kind).get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(entities: usize, transactions: usize) -> BatchSizes {
        BatchSizes {
            entities,
            transactions,
        }
    }

    #[test]
    fn last_batch_carries_the_remainder() {
        let items: Vec<u32> = (0..10).collect();
        let batches: Vec<_> = Batches::new(&items, NonZeroUsize::new(4).unwrap()).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].items, &[8, 9]);
        assert_eq!(batches[2].offset, 8);
        assert_eq!(batches[2].index, 2);
    }

    #[test]
    fn restart_replays_the_same_sequence() {
        let items: Vec<u32> = (0..5).collect();
        let mut batches = Batches::new(&items, NonZeroUsize::new(2).unwrap());
        let first: Vec<_> = batches.by_ref().map(|b| b.items.to_vec()).collect();
        assert!(batches.next().is_none());
        let again: Vec<_> = batches.restart().map(|b| b.items.to_vec()).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        let items: Vec<u32> = Vec::new();
        assert_eq!(Batches::new(&items, NonZeroUsize::new(3).unwrap()).count(), 0);
    }

    #[test]
    fn transactions_use_their_own_size() {
        let partitioner = BatchPartitioner::new(&sizes(2, 50)).unwrap();
        let items: Vec<u32> = (0..100).collect();
        assert_eq!(partitioner.partition(EntityKind::Transaction, &items).len(), 2);
        assert_eq!(partitioner.partition(EntityKind::Account, &items).len(), 50);
        assert_eq!(partitioner.batch_count(EntityKind::Account, 5), 3);
    }

    #[test]
    fn zero_batch_size_is_a_config_error() {
        assert!(matches!(
            BatchPartitioner::new(&sizes(0, 10)),
            Err(LoaderError::Config(_))
        ));
    }
}
