//! Variable-length blocks of the data section: string bodies and per-class
//! field/method layouts. Both are self-delimiting and are read through an
//! [`OffsetList`](super::OffsetList).

use crate::{dex_err, error::DexError, utf, Result};

use super::{
    access_flags_str, AccessKind, Component, Cursor, FixedList, Resolver, Span,
};

/// `string_data_item`: ULEB128 UTF-16 length followed by NUL-terminated
/// MUTF-8 bytes.
#[derive(Debug, Clone, Default)]
pub struct StringDataItem {
    span: Span,
    pub utf16_size: u32,
    pub value: String,
}

impl StringDataItem {
    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl Component for StringDataItem {
    fn read(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        let start = cursor.position();
        let utf16_size = cursor.read_uleb128()?;
        let data_start = cursor.position();
        let data = match cursor.read_until(|b| b == 0) {
            Ok(data) => data,
            Err(err) => {
                cursor.set_position(start);
                return Err(err);
            }
        };
        self.value = match utf::mutf8_to_str(data) {
            Ok(value) => value,
            Err(DexError::MalformedMUTF8Sequence { offset }) => {
                cursor.set_position(start);
                return dex_err!(MalformedMUTF8Sequence {
                    offset: data_start + offset
                });
            }
            Err(err) => {
                cursor.set_position(start);
                return Err(err);
            }
        };
        self.utf16_size = utf16_size;
        self.span = cursor.span_from(start);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "string_data_item"
    }

    fn span(&self) -> Span {
        self.span
    }

    fn desc(&self) -> Option<&str> {
        Some(&self.value)
    }
}

/// Adds a ULEB128 index delta to the running index of its list.
fn next_index(prev: Option<u32>, diff: u32, item_ty: &'static str) -> Result<u32> {
    match prev {
        None => Ok(diff),
        Some(index) => match index.checked_add(diff) {
            Some(next) => Ok(next),
            None => dex_err!(BadEncodedIndex {
                index,
                next_index: diff,
                item_ty
            }),
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct EncodedField {
    span: Span,
    pub field_idx_diff: u32,
    pub access_flags: u32,
    /// Absolute index into the field ids, accumulated from the diffs.
    pub field_idx: u32,
    desc: Option<String>,
}

impl Component for EncodedField {
    fn read(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        let start = cursor.position();
        self.field_idx_diff = cursor.read_uleb128()?;
        self.access_flags = cursor.read_uleb128()?;
        self.span = cursor.span_from(start);
        Ok(())
    }

    fn resolve(&mut self, resolver: &mut Resolver<'_>) {
        resolver.focus(self.span.offset, "encoded_field");
        let field = resolver.field(self.field_idx);
        self.desc = field.map(|field| {
            let flags = access_flags_str(self.access_flags, AccessKind::Field);
            if flags.is_empty() {
                field
            } else {
                format!("{flags} {field}")
            }
        });
    }

    fn name(&self) -> &'static str {
        "encoded_field"
    }

    fn span(&self) -> Span {
        self.span
    }

    fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EncodedMethod {
    span: Span,
    pub method_idx_diff: u32,
    pub access_flags: u32,
    /// Offset of the method's `code_item`, zero for abstract and native
    /// methods. Code items themselves are not decoded.
    pub code_off: u32,
    /// Absolute index into the method ids, accumulated from the diffs.
    pub method_idx: u32,
    desc: Option<String>,
}

impl Component for EncodedMethod {
    fn read(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        let start = cursor.position();
        self.method_idx_diff = cursor.read_uleb128()?;
        self.access_flags = cursor.read_uleb128()?;
        self.code_off = cursor.read_uleb128()?;
        self.span = cursor.span_from(start);
        Ok(())
    }

    fn resolve(&mut self, resolver: &mut Resolver<'_>) {
        resolver.focus(self.span.offset, "encoded_method");
        let method = resolver.method(self.method_idx);
        self.desc = method.map(|method| {
            let flags = access_flags_str(self.access_flags, AccessKind::Method);
            if flags.is_empty() {
                method
            } else {
                format!("{flags} {method}")
            }
        });
    }

    fn name(&self) -> &'static str {
        "encoded_method"
    }

    fn span(&self) -> Span {
        self.span
    }

    fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }
}

/// `class_data_item`: the fields and methods a class defines.
#[derive(Debug, Default)]
pub struct ClassDataItem {
    span: Span,
    pub static_fields_size: u32,
    pub instance_fields_size: u32,
    pub direct_methods_size: u32,
    pub virtual_methods_size: u32,
    pub static_fields: FixedList<EncodedField>,
    pub instance_fields: FixedList<EncodedField>,
    pub direct_methods: FixedList<EncodedMethod>,
    pub virtual_methods: FixedList<EncodedMethod>,
}

impl ClassDataItem {
    pub fn num_fields(&self) -> usize {
        self.static_fields.len() + self.instance_fields.len()
    }

    pub fn num_methods(&self) -> usize {
        self.direct_methods.len() + self.virtual_methods.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &EncodedField> {
        self.static_fields.iter().chain(self.instance_fields.iter())
    }

    pub fn methods(&self) -> impl Iterator<Item = &EncodedMethod> {
        self.direct_methods.iter().chain(self.virtual_methods.iter())
    }
}

fn link_fields(fields: &mut FixedList<EncodedField>) -> Result<()> {
    let mut prev = None;
    for field in fields.items_mut() {
        let index = next_index(prev, field.field_idx_diff, "encoded_field")?;
        field.field_idx = index;
        prev = Some(index);
    }
    Ok(())
}

fn link_methods(methods: &mut FixedList<EncodedMethod>) -> Result<()> {
    let mut prev = None;
    for method in methods.items_mut() {
        let index = next_index(prev, method.method_idx_diff, "encoded_method")?;
        method.method_idx = index;
        prev = Some(index);
    }
    Ok(())
}

impl Component for ClassDataItem {
    fn read(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        let start = cursor.position();
        self.static_fields_size = cursor.read_uleb128()?;
        self.instance_fields_size = cursor.read_uleb128()?;
        self.direct_methods_size = cursor.read_uleb128()?;
        self.virtual_methods_size = cursor.read_uleb128()?;

        self.static_fields = cursor.read_fixed_list(
            "static_fields",
            self.static_fields_size as usize,
            EncodedField::default,
        )?;
        self.instance_fields = cursor.read_fixed_list(
            "instance_fields",
            self.instance_fields_size as usize,
            EncodedField::default,
        )?;
        self.direct_methods = cursor.read_fixed_list(
            "direct_methods",
            self.direct_methods_size as usize,
            EncodedMethod::default,
        )?;
        self.virtual_methods = cursor.read_fixed_list(
            "virtual_methods",
            self.virtual_methods_size as usize,
            EncodedMethod::default,
        )?;

        // indices restart with every list
        link_fields(&mut self.static_fields)?;
        link_fields(&mut self.instance_fields)?;
        link_methods(&mut self.direct_methods)?;
        link_methods(&mut self.virtual_methods)?;

        self.span = cursor.span_from(start);
        Ok(())
    }

    fn resolve(&mut self, resolver: &mut Resolver<'_>) {
        self.static_fields.resolve(resolver);
        self.instance_fields.resolve(resolver);
        self.direct_methods.resolve(resolver);
        self.virtual_methods.resolve(resolver);
    }

    fn children(&self) -> Vec<&dyn Component> {
        vec![
            &self.static_fields,
            &self.instance_fields,
            &self.direct_methods,
            &self.virtual_methods,
        ]
    }

    fn name(&self) -> &'static str {
        "class_data_item"
    }

    fn span(&self) -> Span {
        self.span
    }
}
