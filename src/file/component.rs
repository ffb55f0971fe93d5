//! The component tree protocol.
//!
//! Every structure of a dex file is a [`Component`]. Decoding happens in two
//! passes: [`Component::read`] consumes the component's bytes and builds its
//! children, then, once the whole file is structurally read,
//! [`Component::resolve`] turns the indices it holds into human readable
//! descriptions using a [`Resolver`]. The resolution pass never re-reads
//! bytes and never fails; unresolved references are recorded as [`Issue`]s.

use std::ops::Deref;

use plain::Plain;
use serde::Serialize;

use crate::{error::DexError, Result};

use super::{Cursor, DexFile, TypeIndex};

/// The bytes a component was decoded from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub const fn new(offset: usize, len: usize) -> Self {
        Span { offset, len }
    }

    #[inline(always)]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

pub trait Component {
    /// Structural read. Consumes exactly the bytes of this component starting
    /// at the cursor's position and leaves the cursor right after them.
    fn read(&mut self, cursor: &mut Cursor<'_>) -> Result<()>;

    /// Cross-reference resolution, run once the whole file has been read.
    fn resolve(&mut self, _resolver: &mut Resolver<'_>) {}

    /// Child components in read order.
    fn children(&self) -> Vec<&dyn Component> {
        Vec::new()
    }

    fn name(&self) -> &'static str;

    fn span(&self) -> Span;

    /// Description cached by the resolution pass.
    fn desc(&self) -> Option<&str> {
        None
    }
}

/// A reference that could not be resolved, attributed to the component that
/// holds it.
#[derive(Debug)]
pub struct Issue {
    pub offset: usize,
    pub component: &'static str,
    pub error: DexError,
}

/// Read-only view of a structurally decoded file handed to
/// [`Component::resolve`]; collects the issues found along the way.
pub struct Resolver<'a> {
    dex: &'a DexFile,
    offset: usize,
    component: &'static str,
    issues: Vec<Issue>,
}

impl<'a> Resolver<'a> {
    pub fn new(dex: &'a DexFile) -> Self {
        Self {
            dex,
            offset: 0,
            component: "",
            issues: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn dex(&self) -> &'a DexFile {
        self.dex
    }

    /// Attributes subsequent issues to the component at `offset`.
    pub fn focus(&mut self, offset: usize, component: &'static str) {
        self.offset = offset;
        self.component = component;
    }

    /// Records the error of a failed lookup and returns `None` in its place.
    pub fn check<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.issues.push(Issue {
                    offset: self.offset,
                    component: self.component,
                    error,
                });
                None
            }
        }
    }

    pub fn string(&mut self, idx: u32) -> Option<String> {
        let dex = self.dex;
        self.check(dex.get_string(idx).map(str::to_string))
    }

    pub fn type_desc(&mut self, idx: TypeIndex) -> Option<String> {
        let dex = self.dex;
        self.check(dex.get_type_desc(idx).map(str::to_string))
    }

    pub fn field(&mut self, idx: u32) -> Option<String> {
        let dex = self.dex;
        self.check(dex.pretty_field_opt_at(idx))
    }

    pub fn method(&mut self, idx: u32) -> Option<String> {
        let dex = self.dex;
        self.check(dex.pretty_method_opt_at(idx))
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn finish(self) -> Vec<Issue> {
        self.issues
    }
}

/// A fixed-layout record that is decoded by copying its bytes.
pub trait RawItem: Plain + Default {
    const NAME: &'static str;

    fn describe(&self, _resolver: &mut Resolver<'_>) -> Option<String> {
        None
    }
}

/// Component wrapper for [`RawItem`] records such as table rows.
#[derive(Debug, Clone, Default)]
pub struct Item<T> {
    span: Span,
    raw: T,
    desc: Option<String>,
}

impl<T> Item<T> {
    #[inline(always)]
    pub fn raw(&self) -> &T {
        &self.raw
    }

    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.span.offset
    }
}

impl<T> Deref for Item<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.raw
    }
}

impl<T: RawItem> Component for Item<T> {
    fn read(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        let start = cursor.position();
        self.raw = cursor.read_plain()?;
        self.span = cursor.span_from(start);
        Ok(())
    }

    fn resolve(&mut self, resolver: &mut Resolver<'_>) {
        resolver.focus(self.span.offset, T::NAME);
        self.desc = self.raw.describe(resolver);
    }

    fn name(&self) -> &'static str {
        T::NAME
    }

    fn span(&self) -> Span {
        self.span
    }

    fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }
}
