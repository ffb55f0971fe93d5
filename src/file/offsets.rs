//! Collections of data-pool blocks that are only reachable through offsets
//! stored elsewhere in the file.
//!
//! An [`OffsetList`] owns every decoded block (the arena) and keeps two keys
//! into it: the position of each original request and the block's offset.
//! Requests that share an offset share the decoded block.

use std::collections::BTreeMap;

use crate::{error::DexError, Result};

use super::{list::bounded_capacity, Component, Cursor, Resolver, Span};

/// A block that could not be decoded, together with every request that
/// pointed at it.
#[derive(Debug)]
pub struct BlockFailure {
    pub offset: u32,
    pub requests: Vec<usize>,
    pub error: DexError,
}

#[derive(Debug)]
pub struct OffsetList<T> {
    name: &'static str,
    span: Span,
    factory: fn() -> T,
    requested: Vec<u32>,
    items: Vec<T>,
    by_offset: BTreeMap<u32, usize>,
    slots: Vec<Option<usize>>,
    failures: Vec<BlockFailure>,
}

impl<T: Component> OffsetList<T> {
    pub fn new<I>(name: &'static str, offsets: I, factory: fn() -> T) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        Self {
            name,
            span: Span::default(),
            factory,
            requested: offsets.into_iter().collect(),
            items: Vec::new(),
            by_offset: BTreeMap::new(),
            slots: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Number of distinct blocks that were decoded.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of offsets this collection was asked to decode, duplicates
    /// included.
    #[inline(always)]
    pub fn num_requests(&self) -> usize {
        self.requested.len()
    }

    /// The offsets in original request order.
    pub fn requested(&self) -> &[u32] {
        &self.requested
    }

    /// The block decoded for the request at `position`, `None` if the
    /// position is out of range or its block failed.
    pub fn get(&self, position: usize) -> Option<&T> {
        let slot = (*self.slots.get(position)?)?;
        self.items.get(slot)
    }

    pub fn get_by_offset(&self, offset: u32) -> Option<&T> {
        self.by_offset.get(&offset).and_then(|slot| self.items.get(*slot))
    }

    /// Decoded blocks in ascending offset order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// `(offset, block)` pairs in ascending offset order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &T)> {
        self.by_offset
            .iter()
            .filter_map(|(offset, slot)| Some((*offset, self.items.get(*slot)?)))
    }

    pub fn failures(&self) -> &[BlockFailure] {
        &self.failures
    }

    /// Decodes one block per distinct offset in ascending offset order.
    /// Failed blocks are recorded, the cursor position is restored.
    fn decode(&mut self, cursor: &mut Cursor<'_>) {
        let mut pending: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (position, offset) in self.requested.iter().enumerate() {
            pending.entry(*offset).or_default().push(position);
        }

        let capacity = bounded_capacity::<T>(pending.len(), cursor.remaining());
        self.items = Vec::with_capacity(capacity);
        self.slots = vec![None; self.requested.len()];
        self.by_offset.clear();
        self.failures.clear();

        let saved = cursor.position();
        for (offset, requests) in pending {
            if offset == 0 {
                log::warn!(
                    "{}: {} request(s) carry the absent offset",
                    self.name,
                    requests.len()
                );
                self.failures.push(BlockFailure {
                    offset,
                    requests,
                    error: DexError::DanglingOffset {
                        offset,
                        item_ty: self.name,
                    },
                });
                continue;
            }

            cursor.set_position(offset as usize);
            let mut item = (self.factory)();
            match item.read(cursor) {
                Ok(()) => {
                    let slot = self.items.len();
                    for position in &requests {
                        self.slots[*position] = Some(slot);
                    }
                    self.by_offset.insert(offset, slot);
                    self.items.push(item);
                }
                Err(err) => {
                    let error = DexError::TruncatedList {
                        item_ty: self.name,
                        index: requests[0],
                        offset: offset as usize,
                        source: Box::new(err),
                    };
                    log::warn!("{}: skipping block at {:#x}: {}", self.name, offset, error);
                    self.failures.push(BlockFailure {
                        offset,
                        requests,
                        error,
                    });
                }
            }
        }
        cursor.set_position(saved);

        self.span = match (self.items.first(), self.items.last()) {
            (Some(first), Some(last)) => {
                let start = first.span().offset;
                Span::new(start, last.span().end().saturating_sub(start))
            }
            _ => Span::default(),
        };
    }
}

impl<T: Component + Default> Default for OffsetList<T> {
    fn default() -> Self {
        OffsetList::new("", std::iter::empty(), T::default)
    }
}

impl<T: Component> Component for OffsetList<T> {
    fn read(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        self.decode(cursor);
        Ok(())
    }

    fn resolve(&mut self, resolver: &mut Resolver<'_>) {
        for item in &mut self.items {
            item.resolve(resolver);
        }
    }

    fn children(&self) -> Vec<&dyn Component> {
        self.items.iter().map(|item| item as &dyn Component).collect()
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn span(&self) -> Span {
        self.span
    }
}

impl<'a> Cursor<'a> {
    /// Decodes one block per distinct offset. Block failures are recorded on
    /// the returned collection, the cursor position is left untouched.
    pub fn read_offset_list<T, I>(
        &mut self,
        name: &'static str,
        offsets: I,
        factory: fn() -> T,
    ) -> OffsetList<T>
    where
        T: Component,
        I: IntoIterator<Item = u32>,
    {
        let mut list = OffsetList::new(name, offsets, factory);
        list.decode(self);
        list
    }
}
