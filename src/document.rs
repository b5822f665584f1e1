//! Namespace-aware read-only XML tree
//!
//! Decoding works on a small element tree built with quick-xml's `NsReader`.
//! Each element remembers its resolved namespace, its byte span in the source
//! text (so opaque fragments such as `description` payloads can be recovered
//! verbatim), the namespace bindings in scope and its unescaped text content.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::reader::NsReader;
use serde::Serialize;

use crate::error::{OaiError, Result};

/// Prefix to namespace URI; the default namespace is keyed by `""`
type Bindings = Arc<BTreeMap<String, String>>;

/// One element of a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    namespace: Option<String>,
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
    span: Range<usize>,
    /// Bindings in scope on this element, its own declarations included
    scope: Bindings,
    /// Prefixes of the element name and its attributes (`""` for an unprefixed name)
    prefixes: Vec<String>,
    /// Prefixes this element declares itself
    declared: Vec<String>,
}

impl XmlElement {
    fn open(
        namespace: Option<String>,
        start: &BytesStart<'_>,
        offset: usize,
        inherited: &Bindings,
    ) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut prefixes = vec![prefix_of(start.name().prefix())];

        let mut attributes = Vec::new();
        let mut declarations = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            if let Some(binding) = attr.key.as_namespace_binding() {
                let prefix = match binding {
                    PrefixDeclaration::Default => String::new(),
                    PrefixDeclaration::Named(prefix) => String::from_utf8_lossy(prefix).into_owned(),
                };
                declarations.push((prefix, attr.unescape_value()?.into_owned()));
                continue;
            }
            // Only unprefixed attributes carry protocol data; xsi and friends are plumbing
            if let Some(prefix) = attr.key.prefix() {
                prefixes.push(prefix_of(Some(prefix)));
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        let scope = if declarations.is_empty() {
            Arc::clone(inherited)
        } else {
            let mut scope = (**inherited).clone();
            scope.extend(declarations.iter().cloned());
            Arc::new(scope)
        };

        Ok(Self {
            namespace,
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
            span: offset..offset,
            scope,
            prefixes,
            declared: declarations.into_iter().map(|(prefix, _)| prefix).collect(),
        })
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.name
    }

    /// Whether this element has the given namespace and local name
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Text content with surrounding whitespace removed
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    pub fn children_named<'a, 'b>(
        &'a self,
        namespace: &'b str,
        name: &'b str,
    ) -> impl Iterator<Item = &'a XmlElement> + use<'a, 'b> {
        self.children
            .iter()
            .filter(move |child| child.is(namespace, name))
    }

    /// The single child with this name; zero or several matches is a malformed document
    pub fn exactly_one(&self, namespace: &str, name: &str) -> Result<&XmlElement> {
        let mut matches = self.children_named(namespace, name);
        match (matches.next(), matches.next()) {
            (Some(child), None) => Ok(child),
            (None, _) => Err(OaiError::malformed(format!(
                "<{}> is missing required element <{}>",
                self.name, name
            ))),
            (Some(_), Some(_)) => Err(OaiError::malformed(format!(
                "<{}> contains more than one <{}>",
                self.name, name
            ))),
        }
    }

    /// The child with this name if present; several matches is a malformed document
    pub fn at_most_one(&self, namespace: &str, name: &str) -> Result<Option<&XmlElement>> {
        let mut matches = self.children_named(namespace, name);
        let first = matches.next();
        if matches.next().is_some() {
            return Err(OaiError::malformed(format!(
                "<{}> contains more than one <{}>",
                self.name, name
            )));
        }
        Ok(first)
    }

    /// Byte range of this element in the source text
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Prefixes used in this subtree whose declaration lies outside it
    fn free_prefixes(&self, declared: &mut Vec<String>, free: &mut BTreeSet<String>) {
        let depth = declared.len();
        declared.extend(self.declared.iter().cloned());
        for prefix in &self.prefixes {
            if prefix != "xml" && !declared.contains(prefix) {
                free.insert(prefix.clone());
            }
        }
        for child in &self.children {
            child.free_prefixes(declared, free);
        }
        declared.truncate(depth);
    }
}

fn prefix_of(prefix: Option<quick_xml::name::Prefix<'_>>) -> String {
    prefix
        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
        .unwrap_or_default()
}

/// A parsed document together with its source text
#[derive(Debug, Clone)]
pub struct XmlDocument {
    source: String,
    root: XmlElement,
}

impl XmlDocument {
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let root = build_tree(&source)?;
        Ok(Self { source, root })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Verbatim source text of an element of this document
    pub fn raw(&self, element: &XmlElement) -> &str {
        &self.source[element.span()]
    }

    /// The opaque payload of a wrapper element such as `description` or `metadata`,
    /// which must hold exactly one namespaced child element. Bindings the payload
    /// inherits from its ancestors are declared on the payload root, so the
    /// fragment stands on its own.
    pub fn fragment_of(&self, wrapper: &XmlElement) -> Result<XmlFragment> {
        match wrapper.children() {
            [payload] if payload.namespace.is_none() => Err(OaiError::malformed(format!(
                "<{}> payload <{}> has no namespace",
                wrapper.local_name(),
                payload.local_name()
            ))),
            [payload] => Ok(XmlFragment {
                xml: self.standalone(payload),
            }),
            [] => Err(OaiError::malformed(format!(
                "<{}> must contain one element",
                wrapper.local_name()
            ))),
            _ => Err(OaiError::malformed(format!(
                "<{}> must contain exactly one element",
                wrapper.local_name()
            ))),
        }
    }
}

impl XmlDocument {
    fn standalone(&self, payload: &XmlElement) -> String {
        let raw = self.raw(payload);

        let mut free = BTreeSet::new();
        payload.free_prefixes(&mut Vec::new(), &mut free);
        if free.is_empty() {
            return raw.to_string();
        }

        let mut declarations = String::new();
        for prefix in &free {
            let uri = payload.scope.get(prefix).map(String::as_str).unwrap_or("");
            if prefix.is_empty() {
                declarations.push_str(&format!(" xmlns=\"{}\"", escape(uri)));
            } else {
                declarations.push_str(&format!(" xmlns:{}=\"{}\"", prefix, escape(uri)));
            }
        }

        // Declarations go right after the root's qualified name
        let name_end = raw[1..]
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .map_or(raw.len(), |i| i + 1);
        let mut xml = String::with_capacity(raw.len() + declarations.len());
        xml.push_str(&raw[..name_end]);
        xml.push_str(&declarations);
        xml.push_str(&raw[name_end..]);
        xml
    }
}

fn resolved_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.0).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(OaiError::malformed(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(OaiError::malformed("document has more than one root element"));
    }
    *root = Some(element);
    Ok(())
}

fn build_tree(source: &str) -> Result<XmlElement> {
    let mut reader = NsReader::from_str(source);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let empty_scope = Bindings::default();

    loop {
        let offset = reader.buffer_position() as usize;
        let (resolved, event) = reader.read_resolved_event()?;
        let namespace = resolved_namespace(resolved)?;
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(start) => {
                let inherited = stack.last().map_or(&empty_scope, |parent| &parent.scope);
                let element = XmlElement::open(namespace, &start, offset, inherited)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let inherited = stack.last().map_or(&empty_scope, |parent| &parent.scope);
                let mut element = XmlElement::open(namespace, &start, offset, inherited)?;
                element.span.end = end;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| OaiError::malformed("unexpected closing tag"))?;
                element.span.end = end;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                push_text(&mut stack, text)?;
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(data.as_ref()).into_owned();
                push_text(&mut stack, Cow::Owned(text))?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(OaiError::malformed(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| OaiError::malformed("document has no root element"))
}

fn push_text(stack: &mut [XmlElement], text: Cow<'_, str>) -> Result<()> {
    match stack.last_mut() {
        Some(current) => {
            current.text.push_str(&text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(OaiError::malformed("text outside the root element")),
    }
}

/// A well-formed XML fragment with a single namespaced root element, carried
/// opaquely (an Identify `description`, a record's `metadata` or `about`, a
/// set's `setDescription`). The fragment declares the namespaces it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct XmlFragment {
    xml: String,
}

impl XmlFragment {
    /// Checks that `xml` is well-formed with exactly one root element in a namespace
    pub fn new(xml: impl Into<String>) -> Result<Self> {
        let xml = xml.into();
        let doc = XmlDocument::parse(xml.as_str())?;
        if doc.root().namespace().is_none() {
            return Err(OaiError::malformed(format!(
                "fragment root <{}> has no namespace",
                doc.root().local_name()
            )));
        }
        Ok(Self {
            xml: xml.trim().to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.xml
    }

    /// Parses the fragment into an element tree
    pub fn parse(&self) -> Result<XmlDocument> {
        XmlDocument::parse(self.xml.as_str())
    }
}

impl fmt::Display for XmlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xml)
    }
}
