/* XML element trees
 *
 * A slot is written as an element named after it. Types flagged `untagged`
 * contribute their children directly, `attribute` and `list` sequences are
 * whitespace separated text, and `use-type` unions name the alternative in
 * a `type` attribute of their own element. */

use super::{
    bound_element, make_record, make_seq, make_union, parse_primitive, primitive_text, record_fields, seq_elements,
    union_selection, unsupported,
};
use crate::errors::{ContextFrame, DecodeContext, DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::registry::Registry;
use crate::value::Value;
use structgen_gen::codegen::shared::plan::{TypePlan, XmlPlan};
use structgen_gen::schema::{ElementType, Format, ResolvedElement, ResolvedTypeKind};
use tracing::trace;

const TYPE_ATTRIBUTE: &str = "type";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    fn push(&mut self, items: Vec<Item>) {
        for item in items {
            match item {
                Item::Element(element) => self.children.push(XmlNode::Element(element)),
                Item::Attribute(key, value) => self.attributes.push((key, value)),
            }
        }
    }

    fn write(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape(value, true, out);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.write(out),
                XmlNode::Text(text) => escape(text, false, out),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn escape(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}

fn xml_plan(plan: &TypePlan) -> Result<&XmlPlan, super::Unsupported> {
    plan.xml.as_ref().ok_or_else(|| unsupported(plan, Format::Xml))
}

/* ----------------------------------------------------------------- encode */

enum Item {
    Element(XmlElement),
    Attribute(String, String),
}

pub fn encode(registry: &Registry, plan: &TypePlan, value: &Value) -> EncodeResult<String> {
    let xml = xml_plan(plan)?;
    let items = if xml.attribute {
        /* No enclosing element to carry the attribute */
        let mut element = XmlElement::new(&xml.element_name);
        fill_content(registry, plan, xml, value, &mut element)?;
        vec![Item::Element(element)]
    } else {
        encode_named(registry, plan, &xml.element_name, value)?
    };

    let mut out = String::new();
    for item in items {
        if let Item::Element(element) = item {
            element.write(&mut out);
        }
    }
    Ok(out)
}

fn encode_slot(registry: &Registry, name: &str, ty: &ElementType, value: &Value) -> EncodeResult<Vec<Item>> {
    match ty {
        ElementType::Primitive(spec) => {
            let mut element = XmlElement::new(name);
            let text = primitive_text(spec.prim_type, value)?;
            if !text.is_empty() {
                element.children.push(XmlNode::Text(text));
            }
            Ok(vec![Item::Element(element)])
        }
        ElementType::Named(type_name) => encode_named(registry, registry.plan(type_name)?, name, value),
    }
}

fn encode_named(registry: &Registry, plan: &TypePlan, name: &str, value: &Value) -> EncodeResult<Vec<Item>> {
    let xml = xml_plan(plan)?;
    if xml.attribute {
        return Ok(vec![Item::Attribute(name.to_string(), list_text(plan, value)?)]);
    }
    if !xml.untagged {
        let mut element = XmlElement::new(name);
        fill_content(registry, plan, xml, value, &mut element)?;
        return Ok(vec![Item::Element(element)]);
    }

    let mut items = Vec::new();
    match &plan.kind {
        ResolvedTypeKind::Union { alternatives, .. } => {
            let (index, inner) = union_selection(plan, value)?;
            items.extend(encode_slot(registry, &alternatives[index].display_name, &alternatives[index].ty, inner)?);
        }
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
            for (index, item) in seq_elements(plan, value)?.iter().enumerate() {
                let item = bound_element(plan, item, ContextFrame::Index(index))?;
                items.extend(encode_slot(registry, &element.display_name, &element.ty, item)?);
            }
        }
        ResolvedTypeKind::Record { fields, .. } => items.extend(encode_fields(registry, plan, fields, value)?),
    }
    Ok(items)
}

fn encode_fields(registry: &Registry, plan: &TypePlan, fields: &[ResolvedElement], value: &Value) -> EncodeResult<Vec<Item>> {
    let mut items = Vec::new();
    for (field, item) in fields.iter().zip(record_fields(plan, value)?) {
        match item {
            Some(item) => items.extend(encode_slot(registry, &field.display_name, &field.ty, item)?),
            None if field.optional => {}
            None => {
                bound_element(plan, item, ContextFrame::Field(field.name.clone()))?;
            }
        }
    }
    Ok(items)
}

fn fill_content(registry: &Registry, plan: &TypePlan, xml: &XmlPlan, value: &Value, element: &mut XmlElement) -> EncodeResult<()> {
    match &plan.kind {
        ResolvedTypeKind::RecordOf { .. } | ResolvedTypeKind::SetOf { .. } if xml.list || xml.attribute => {
            let text = list_text(plan, value)?;
            if !text.is_empty() {
                element.children.push(XmlNode::Text(text));
            }
        }
        ResolvedTypeKind::RecordOf { element: slot } | ResolvedTypeKind::SetOf { element: slot } => {
            for (index, item) in seq_elements(plan, value)?.iter().enumerate() {
                let item = bound_element(plan, item, ContextFrame::Index(index))?;
                element.push(encode_slot(registry, &slot.display_name, &slot.ty, item)?);
            }
        }
        ResolvedTypeKind::Record { fields, .. } => element.push(encode_fields(registry, plan, fields, value)?),
        ResolvedTypeKind::Union { alternatives, .. } => {
            let (index, inner) = union_selection(plan, value)?;
            let alternative = &alternatives[index];
            if xml.use_type {
                element
                    .attributes
                    .push((TYPE_ATTRIBUTE.to_string(), alternative.display_name.clone()));
                match &alternative.ty {
                    ElementType::Primitive(spec) => {
                        let text = primitive_text(spec.prim_type, inner)?;
                        if !text.is_empty() {
                            element.children.push(XmlNode::Text(text));
                        }
                    }
                    ElementType::Named(type_name) => {
                        let inner_plan = registry.plan(type_name)?;
                        fill_content(registry, inner_plan, xml_plan(inner_plan)?, inner, element)?;
                    }
                }
            } else {
                element.push(encode_slot(registry, &alternative.display_name, &alternative.ty, inner)?);
            }
        }
    }
    Ok(())
}

/* Whitespace separated primitives of a list or attribute sequence */
fn list_text(plan: &TypePlan, value: &Value) -> EncodeResult<String> {
    let element = match &plan.kind {
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => element,
        _ => return Ok(String::new()),
    };
    let ElementType::Primitive(spec) = &element.ty else {
        return Ok(String::new());
    };
    let mut words = Vec::new();
    for (index, item) in seq_elements(plan, value)?.iter().enumerate() {
        let word = primitive_text(spec.prim_type, bound_element(plan, item, ContextFrame::Index(index))?)?;
        /* items are split on whitespace when read back */
        if word.is_empty() || word.contains(char::is_whitespace) {
            return Err(EncodeError::Invalid {
                type_name: plan.type_name.clone(),
                reason: format!("list item {} is empty or contains whitespace", index),
            });
        }
        words.push(word);
    }
    Ok(words.join(" "))
}

/* ----------------------------------------------------------------- reader */

struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn error(&self, message: &str) -> DecodeError {
        DecodeError::malformed(format!("{} at offset {}", message, self.pos))
    }

    fn skip_past(&mut self, terminator: &str) -> DecodeResult<()> {
        match self.rest().find(terminator) {
            Some(offset) => {
                self.pos += offset + terminator.len();
                Ok(())
            }
            None => Err(DecodeError::unexpected_end()),
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn name(&mut self) -> DecodeResult<&'a str> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '/' | '>' | '='))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    /* Nodes up to the end tag of `closing`, or to the end of input */
    fn nodes(&mut self, closing: Option<&str>) -> DecodeResult<Vec<XmlNode>> {
        let mut nodes = Vec::new();
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return match closing {
                    Some(_) => Err(DecodeError::unexpected_end()),
                    None => Ok(nodes),
                };
            }
            if rest.starts_with("</") {
                self.pos += 2;
                let name = self.name()?;
                self.skip_ws();
                if closing != Some(name) || !self.rest().starts_with('>') {
                    return Err(self.error(&format!("unexpected end tag </{}>", name)));
                }
                self.pos += 1;
                return Ok(nodes);
            }
            if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if rest.starts_with("<?") {
                self.skip_past("?>")?;
            } else if rest.starts_with('<') {
                nodes.push(XmlNode::Element(self.element()?));
            } else {
                let len = rest.find('<').unwrap_or(rest.len());
                self.pos += len;
                nodes.push(XmlNode::Text(unescape(&rest[..len])?));
            }
        }
    }

    fn element(&mut self) -> DecodeResult<XmlElement> {
        self.pos += 1;
        let mut element = XmlElement::new(self.name()?);
        loop {
            self.skip_ws();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok(element);
            }
            if rest.starts_with('>') {
                self.pos += 1;
                element.children = self.nodes(Some(&element.name))?;
                return Ok(element);
            }
            let key = self.name()?.to_string();
            self.skip_ws();
            if !self.rest().starts_with('=') {
                return Err(self.error("expected '='"));
            }
            self.pos += 1;
            self.skip_ws();
            let quote = match self.rest().chars().next() {
                Some(quote @ ('"' | '\'')) => quote,
                _ => return Err(self.error("expected a quoted attribute value")),
            };
            self.pos += 1;
            let rest = self.rest();
            let len = rest.find(quote).ok_or_else(DecodeError::unexpected_end)?;
            self.pos += len + 1;
            element.attributes.push((key, unescape(&rest[..len])?));
        }
    }
}

fn unescape(text: &str) -> DecodeResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| DecodeError::malformed("unterminated entity reference"))?;
        let entity = &after[..semi];
        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(decimal) = entity.strip_prefix('#') {
                    decimal.parse().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| DecodeError::malformed(format!("unknown entity &{};", entity)))?
            }
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/* ----------------------------------------------------------------- decode */

/* Child elements of one parent; text between them is skipped */
#[derive(Clone, Copy)]
struct Children<'a> {
    nodes: &'a [XmlNode],
    pos: usize,
}

impl<'a> Children<'a> {
    fn new(nodes: &'a [XmlNode]) -> Self {
        Self { nodes, pos: 0 }
    }

    fn peek(&self) -> Option<&'a XmlElement> {
        self.nodes[self.pos..].iter().find_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    fn next(&mut self) -> Option<&'a XmlElement> {
        while let Some(node) = self.nodes.get(self.pos) {
            self.pos += 1;
            if let XmlNode::Element(element) = node {
                return Some(element);
            }
        }
        None
    }

    fn take(&mut self, name: &str) -> DecodeResult<&'a XmlElement> {
        match self.peek() {
            Some(element) if element.name == name => Ok(self.next().unwrap_or(element)),
            Some(element) => Err(DecodeError::malformed(format!("expected <{}>, found <{}>", name, element.name))),
            None => Err(DecodeError::unexpected_end()),
        }
    }

    fn finish(&self) -> DecodeResult<()> {
        match self.peek() {
            Some(element) => Err(DecodeError::malformed(format!("unexpected element <{}>", element.name))),
            None => Ok(()),
        }
    }
}

pub fn decode(registry: &Registry, plan: &TypePlan, input: &str) -> DecodeResult<Value> {
    let mut reader = Reader { input, pos: 0 };
    let nodes = reader.nodes(None)?;
    let mut children = Children::new(&nodes);
    let xml = xml_plan(plan)?;
    let value = if xml.attribute {
        let element = children.take(&xml.element_name)?;
        decode_content(registry, plan, xml, element)?
    } else {
        decode_named(registry, plan, &xml.element_name, &mut children, None)?
    };
    children.finish()?;
    Ok(value)
}

fn decode_slot(
    registry: &Registry,
    name: &str,
    ty: &ElementType,
    children: &mut Children<'_>,
    parent: Option<&XmlElement>,
) -> DecodeResult<Value> {
    match ty {
        ElementType::Primitive(spec) => {
            let element = children.take(name)?;
            parse_primitive(spec.prim_type, &element.text())
        }
        ElementType::Named(type_name) => decode_named(registry, registry.plan(type_name)?, name, children, parent),
    }
}

fn decode_named(
    registry: &Registry,
    plan: &TypePlan,
    name: &str,
    children: &mut Children<'_>,
    parent: Option<&XmlElement>,
) -> DecodeResult<Value> {
    let xml = xml_plan(plan)?;
    if let (true, Some(parent)) = (xml.attribute, parent) {
        let text = parent
            .attribute(name)
            .ok_or_else(|| DecodeError::malformed(format!("missing attribute '{}'", name)))?;
        return decode_list(registry, plan, text);
    }
    if !xml.untagged {
        let element = children.take(name)?;
        return decode_content(registry, plan, xml, element);
    }

    match &plan.kind {
        ResolvedTypeKind::Union { alternatives, .. } => decode_alternative(registry, plan, xml, alternatives, children, parent),
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
            let mut elements = Vec::new();
            while children.peek().is_some() {
                let mark = *children;
                let index = elements.len();
                match decode_slot(registry, &element.display_name, &element.ty, children, parent) {
                    Ok(value) => elements.push(Some(value)),
                    Err(err) if !err.recoverable => return Err(err.within(ContextFrame::Index(index))),
                    Err(_) => {
                        *children = mark;
                        break;
                    }
                }
            }
            Ok(make_seq(registry, plan, elements))
        }
        ResolvedTypeKind::Record { fields, .. } => decode_fields(registry, plan, fields, children, parent),
    }
}

fn decode_content(registry: &Registry, plan: &TypePlan, xml: &XmlPlan, element: &XmlElement) -> DecodeResult<Value> {
    let mut children = Children::new(&element.children);
    let value = match &plan.kind {
        ResolvedTypeKind::RecordOf { .. } | ResolvedTypeKind::SetOf { .. } if xml.list || xml.attribute => {
            return decode_list(registry, plan, &element.text());
        }
        ResolvedTypeKind::RecordOf { element: slot } | ResolvedTypeKind::SetOf { element: slot } => {
            let mut elements = Vec::new();
            while children.peek().is_some() {
                let index = elements.len();
                let value = decode_slot(registry, &slot.display_name, &slot.ty, &mut children, Some(element))
                    .within(|| ContextFrame::Index(index))?;
                elements.push(Some(value));
            }
            make_seq(registry, plan, elements)
        }
        ResolvedTypeKind::Record { fields, .. } => decode_fields(registry, plan, fields, &mut children, Some(element))?,
        ResolvedTypeKind::Union { alternatives, .. } if xml.use_type => {
            let selected = element
                .attribute(TYPE_ATTRIBUTE)
                .ok_or_else(|| DecodeError::malformed(format!("<{}> has no type attribute", element.name)))?;
            let index = alternatives
                .iter()
                .position(|alt| alt.display_name == selected || alt.name == selected)
                .ok_or_else(|| DecodeError::malformed(format!("type attribute names unknown alternative '{}'", selected)))?;
            let alternative = &alternatives[index];
            let value = match &alternative.ty {
                ElementType::Primitive(spec) => parse_primitive(spec.prim_type, &element.text()),
                ElementType::Named(type_name) => {
                    let inner = registry.plan(type_name)?;
                    decode_content(registry, inner, xml_plan(inner)?, element)
                }
            }
            .within(|| ContextFrame::Alternative(alternative.name.clone()))?;
            return Ok(make_union(registry, plan, index, value));
        }
        ResolvedTypeKind::Union { alternatives, .. } => {
            decode_alternative(registry, plan, xml, alternatives, &mut children, Some(element))?
        }
    };
    children.finish()?;
    Ok(value)
}

/* The first alternative that can start with the next start tag is decoded;
 * its failure is final */
fn decode_alternative(
    registry: &Registry,
    plan: &TypePlan,
    xml: &XmlPlan,
    alternatives: &[ResolvedElement],
    children: &mut Children<'_>,
    parent: Option<&XmlElement>,
) -> DecodeResult<Value> {
    let identity = children.peek().map(|element| element.name.as_str()).ok_or_else(DecodeError::unexpected_end)?;
    let index = xml
        .alternatives
        .iter()
        .position(|alternative| alternative.can_start_with(identity))
        .ok_or_else(|| DecodeError::malformed(format!("no alternative of '{}' starts with <{}>", plan.type_name, identity)))?;
    let alternative = &alternatives[index];
    trace!(type_name = %plan.type_name, alternative = %alternative.name, identity, "XML alternative selected");
    let value = decode_slot(registry, &alternative.display_name, &alternative.ty, children, parent)
        .map_err(|err| err.within(ContextFrame::Alternative(alternative.name.clone())).terminal())?;
    Ok(make_union(registry, plan, index, value))
}

fn decode_fields(
    registry: &Registry,
    plan: &TypePlan,
    fields: &[ResolvedElement],
    children: &mut Children<'_>,
    parent: Option<&XmlElement>,
) -> DecodeResult<Value> {
    let mut decoded = Vec::with_capacity(fields.len());
    for field in fields {
        let mark = *children;
        match decode_slot(registry, &field.display_name, &field.ty, children, parent) {
            Ok(value) => decoded.push(Some(value)),
            Err(err) if field.optional && err.recoverable => {
                *children = mark;
                decoded.push(None);
            }
            Err(err) => return Err(err.within(ContextFrame::Field(field.name.clone()))),
        }
    }
    Ok(make_record(registry, plan, decoded))
}

fn decode_list(registry: &Registry, plan: &TypePlan, text: &str) -> DecodeResult<Value> {
    let element = match &plan.kind {
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => element,
        _ => return Err(DecodeError::malformed(format!("'{}' cannot be decoded from a list", plan.type_name))),
    };
    let ElementType::Primitive(spec) = &element.ty else {
        return Err(DecodeError::malformed(format!("'{}' list elements must be primitive", plan.type_name)));
    };
    let mut elements = Vec::new();
    for (index, word) in text.split_whitespace().enumerate() {
        elements.push(Some(parse_primitive(spec.prim_type, word).within(|| ContextFrame::Index(index))?));
    }
    Ok(make_seq(registry, plan, elements))
}
