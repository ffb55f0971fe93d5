//! Human readable renderings of decoded items and of the component tree.

use std::fmt::Write;

use serde::Serialize;

use crate::{desc_names::pretty_desc, Result};

use super::{Component, DexFile, FieldId, MethodId, ProtoId, ProtoIndex, TypeIndex};

pub mod prettify {

    #[derive(Copy, Clone, PartialEq, Eq)]
    pub enum Field {
        WithType,
        NoType,
    }

    #[derive(Copy, Clone, PartialEq, Eq)]
    pub enum Method {
        WithSig,
        NoSig,
    }
}

impl DexFile {
    // -- descriptor form, as used in component descriptions

    /// `(params)ret` using raw descriptors, e.g. `(ILjava/lang/String;)V`.
    pub fn pretty_proto_opt(&self, proto_id: &ProtoId) -> Result<String> {
        let mut result = String::from("(");
        if let Some(params) = self.get_parameters(proto_id)? {
            for param in params.iter() {
                result.push_str(self.get_type_desc(param.type_idx)?);
            }
        }
        result.push(')');
        result.push_str(self.get_type_desc(proto_id.return_type_idx)?);
        Ok(result)
    }

    pub fn pretty_proto_opt_at(&self, idx: ProtoIndex) -> Result<String> {
        self.pretty_proto_opt(self.get_proto_id(idx)?)
    }

    /// `Lcls;->name:type`
    pub fn pretty_field_opt(&self, field_id: &FieldId) -> Result<String> {
        Ok(format!(
            "{}->{}:{}",
            self.get_type_desc(field_id.class_idx)?,
            self.get_string(field_id.name_idx)?,
            self.get_type_desc(field_id.type_idx)?
        ))
    }

    pub fn pretty_field_opt_at(&self, idx: u32) -> Result<String> {
        self.pretty_field_opt(self.get_field_id(idx)?)
    }

    /// `Lcls;->name(params)ret`
    pub fn pretty_method_opt(&self, method_id: &MethodId) -> Result<String> {
        let proto_id = self.get_proto_id(method_id.proto_idx)?;
        Ok(format!(
            "{}->{}{}",
            self.get_type_desc(method_id.class_idx)?,
            self.get_string(method_id.name_idx)?,
            self.pretty_proto_opt(proto_id)?
        ))
    }

    pub fn pretty_method_opt_at(&self, idx: u32) -> Result<String> {
        self.pretty_method_opt(self.get_method_id(idx)?)
    }

    // -- source form, used by the command line tool

    pub fn pretty_type_opt_at(&self, type_idx: TypeIndex) -> Result<String> {
        Ok(pretty_desc(self.get_type_desc(type_idx)?))
    }

    pub fn pretty_type_at(&self, type_idx: TypeIndex) -> String {
        match self.pretty_type_opt_at(type_idx) {
            Ok(s) => s,
            Err(_) => format!("<<invalid-type-idx-{type_idx}>>"),
        }
    }

    pub fn pretty_utf16_at(&self, idx: u32) -> String {
        match self.get_string(idx) {
            Ok(s) => s.to_string(),
            Err(_) => format!("<<invalid-string-idx-{idx}>>"),
        }
    }

    pub fn pretty_field_at(&self, field_idx: u32, opts: prettify::Field) -> String {
        match self.pretty_java_field(field_idx, opts) {
            Ok(s) => s,
            Err(_) => format!("<<invalid-field-idx-{field_idx}>>"),
        }
    }

    fn pretty_java_field(&self, field_idx: u32, opts: prettify::Field) -> Result<String> {
        let field_id = self.get_field_id(field_idx)?;
        let mut result = String::new();
        if opts == prettify::Field::WithType {
            result.push_str(&self.pretty_type_opt_at(field_id.type_idx)?);
            result.push(' ');
        }

        result.push_str(&self.pretty_type_opt_at(field_id.class_idx)?);
        result.push('.');
        result.push_str(self.get_string(field_id.name_idx)?);
        Ok(result)
    }

    pub fn pretty_method_at(&self, method_idx: u32, opts: prettify::Method) -> String {
        match self.pretty_java_method(method_idx, opts) {
            Ok(s) => s,
            Err(_) => format!("<<invalid-method-idx-{method_idx}>>"),
        }
    }

    fn pretty_java_method(&self, method_idx: u32, opts: prettify::Method) -> Result<String> {
        let method_id = self.get_method_id(method_idx)?;
        let proto_id = match opts {
            prettify::Method::WithSig => Some(self.get_proto_id(method_id.proto_idx)?),
            prettify::Method::NoSig => None,
        };

        let mut result = String::new();
        if let Some(proto_id) = proto_id {
            result.push_str(&self.pretty_type_at(proto_id.return_type_idx));
            result.push(' ');
        }

        result.push_str(&self.pretty_type_at(method_id.class_idx));
        result.push('.');
        result.push_str(self.get_string(method_id.name_idx)?);

        if let Some(proto_id) = proto_id {
            let params = match self.get_parameters(proto_id)? {
                Some(params) => params
                    .iter()
                    .map(|param| self.pretty_type_at(param.type_idx))
                    .collect::<Vec<_>>(),
                None => Vec::new(),
            };
            result.push('(');
            result.push_str(&params.join(", "));
            result.push(')');
        }
        Ok(result)
    }

    /// Snapshot of the whole component tree, see [`TreeNode::from_component`].
    pub fn tree(&self, max_depth: Option<usize>) -> TreeNode {
        TreeNode::from_component(self, max_depth)
    }
}

/// An owned, serialisable copy of a component subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,
    pub offset: usize,
    pub len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Copies `component` and its children. With `max_depth` set, children
    /// deeper than that many levels below `component` are left out.
    pub fn from_component(component: &dyn Component, max_depth: Option<usize>) -> TreeNode {
        let span = component.span();
        let children = match max_depth {
            Some(0) => Vec::new(),
            _ => component
                .children()
                .into_iter()
                .map(|child| TreeNode::from_component(child, max_depth.map(|d| d - 1)))
                .collect(),
        };
        TreeNode {
            name: component.name().to_string(),
            offset: span.offset,
            len: span.len,
            desc: component.desc().map(str::to_string),
            children,
        }
    }
}

/// Indented text dump of a component tree, one component per line.
pub fn render_tree(component: &dyn Component, max_depth: Option<usize>) -> String {
    let mut output = String::new();
    render_node(&mut output, component, 0, max_depth);
    output
}

fn render_node(
    output: &mut String,
    component: &dyn Component,
    depth: usize,
    max_depth: Option<usize>,
) {
    let span = component.span();
    let _ = write!(
        output,
        "{:indent$}{} @ {:#x} [{}]",
        "",
        component.name(),
        span.offset,
        span.len,
        indent = depth * 2
    );
    if let Some(desc) = component.desc() {
        let _ = write!(output, " {desc:?}");
    }
    output.push('\n');

    if max_depth.is_some_and(|max| depth >= max) {
        return;
    }
    for child in component.children() {
        render_node(output, child, depth + 1, max_depth);
    }
}
