use std::{mem, ops::Deref};

use crate::{dex_err, Result};

use super::{Component, Cursor, Resolver, Span};

/// Initial capacity for up to `count` elements of `T`, bounded so the
/// reservation never exceeds `remaining` bytes. Declared counts come straight
/// from the file; the vector grows past this as reads succeed.
pub(crate) fn bounded_capacity<T>(count: usize, remaining: usize) -> usize {
    count.min(remaining / mem::size_of::<T>().max(1))
}

/// Reads `count` consecutive components. Nothing is returned unless every
/// element could be read.
fn read_items<T: Component>(
    cursor: &mut Cursor<'_>,
    name: &'static str,
    count: usize,
    factory: fn() -> T,
) -> Result<Vec<T>> {
    let mut items = Vec::with_capacity(bounded_capacity::<T>(count, cursor.remaining()));
    for index in 0..count {
        let offset = cursor.position();
        let mut item = factory();
        if let Err(err) = item.read(cursor) {
            return dex_err!(TruncatedList {
                item_ty: name,
                index,
                offset,
                source: Box::new(err),
            });
        }
        items.push(item);
    }
    Ok(items)
}

/// A list whose element count is known before reading, e.g. from the header.
#[derive(Debug)]
pub struct FixedList<T> {
    name: &'static str,
    span: Span,
    count: usize,
    factory: fn() -> T,
    items: Vec<T>,
}

impl<T: Component> FixedList<T> {
    pub fn new(name: &'static str, count: usize, factory: fn() -> T) -> Self {
        Self {
            name,
            span: Span::default(),
            count,
            factory,
            items: Vec::new(),
        }
    }

    pub(crate) fn items_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T> Deref for FixedList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T: Component + Default> Default for FixedList<T> {
    fn default() -> Self {
        FixedList::new("", 0, T::default)
    }
}

impl<T: Component> Component for FixedList<T> {
    fn read(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        let start = cursor.position();
        self.items = read_items(cursor, self.name, self.count, self.factory)?;
        self.span = cursor.span_from(start);
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

/// A list prefixed with its own `u32` element count.
#[derive(Debug)]
pub struct SizedList<T> {
    name: &'static str,
    span: Span,
    size: u32,
    factory: fn() -> T,
    items: Vec<T>,
}

impl<T: Component> SizedList<T> {
    pub fn new(name: &'static str, factory: fn() -> T) -> Self {
        Self {
            name,
            span: Span::default(),
            size: 0,
            factory,
            items: Vec::new(),
        }
    }

    /// The element count as encoded in the file.
    #[inline(always)]
    pub fn size(&self) -> u32 {
        self.size
    }
}

impl<T> Deref for SizedList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T: Component + Default> Default for SizedList<T> {
    fn default() -> Self {
        SizedList::new("", T::default)
    }
}

impl<T: Component> Component for SizedList<T> {
    fn read(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        let start = cursor.position();
        let size = cursor.read_u32()?;
        self.items = read_items(cursor, self.name, size as usize, self.factory)?;
        self.size = size;
        self.span = cursor.span_from(start);
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
    pub fn read_fixed_list<T: Component>(
        &mut self,
        name: &'static str,
        count: usize,
        factory: fn() -> T,
    ) -> Result<FixedList<T>> {
        let mut list = FixedList::new(name, count, factory);
        list.read(self)?;
        Ok(list)
    }

    pub fn read_sized_list<T: Component>(
        &mut self,
        name: &'static str,
        factory: fn() -> T,
    ) -> Result<SizedList<T>> {
        let mut list = SizedList::new(name, factory);
        list.read(self)?;
        Ok(list)
    }
}
