//! Owned, namespace-resolved XML element tree.
//!
//! Character data is kept in the text/tail layout: `text` holds what comes
//! before an element's first child, `tail` what follows its end tag up to the
//! next sibling. Lookups match on (namespace URI, local name) and ignore the
//! prefixes a document happens to use.

use anyhow::{anyhow, bail, Context, Result};
use lazy_static::lazy_static;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

lazy_static! {
    static ref ENTITY_DECL_RE: Regex =
        Regex::new(r#"<!ENTITY\s+([^\s%"']+)\s+(?:"([^"]*)"|'([^']*)')\s*>"#).unwrap();
}

/// A (namespace URI, local name) pair known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub namespace: &'static str,
    pub local: &'static str,
}

impl Tag {
    pub const fn new(namespace: &'static str, local: &'static str) -> Self {
        Self { namespace, local }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn matches(&self, tag: Tag) -> bool {
        self.local == tag.local && self.namespace.as_deref() == Some(tag.namespace)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub name: QName,
    pub text: String,
    pub tail: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn new(name: QName) -> Self {
        Self {
            name,
            text: String::new(),
            tail: String::new(),
            children: Vec::new(),
        }
    }

    /// All descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    pub fn find_first(&self, tag: Tag) -> Option<&XmlNode> {
        self.descendants().find(|node| node.name.matches(tag))
    }

    pub fn find_all(&self, tag: Tag) -> impl Iterator<Item = &XmlNode> {
        self.descendants().filter(move |node| node.name.matches(tag))
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a XmlNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Joins a node's leading text with the text and tail of each direct child.
/// Grandchildren are not visited. Fragments are trimmed, empty ones dropped.
pub fn flatten_text(node: Option<&XmlNode>) -> String {
    let Some(node) = node else {
        return String::new();
    };

    let mut parts: Vec<&str> = Vec::with_capacity(1 + node.children.len() * 2);
    parts.push(node.text.trim());
    for child in &node.children {
        parts.push(child.text.trim());
        parts.push(child.tail.trim());
    }
    parts.retain(|part| !part.is_empty());
    parts.join(" ")
}

pub fn parse_file(path: &Path) -> Result<XmlNode> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = NsReader::from_reader(BufReader::new(file));
    build_tree(reader)
}

pub fn parse_str(xml: &str) -> Result<XmlNode> {
    build_tree(NsReader::from_str(xml))
}

fn build_tree<R: BufRead>(mut reader: NsReader<R>) -> Result<XmlNode> {
    let mut open: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut entities: HashMap<String, String> = HashMap::new();
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position();
        let (resolved, event) = match reader.read_resolved_event_into(&mut buf) {
            Ok(pair) => pair,
            Err(e) => bail!("Malformed XML near byte {}: {}", position, e),
        };

        match event {
            Event::Start(e) => {
                let name = qualified_name(&resolved, e.local_name().as_ref())?;
                open.push(XmlNode::new(name));
            }
            Event::Empty(e) => {
                let name = qualified_name(&resolved, e.local_name().as_ref())?;
                attach(&mut open, &mut root, XmlNode::new(name))?;
            }
            Event::End(_) => {
                let node = open
                    .pop()
                    .ok_or_else(|| anyhow!("Unexpected closing tag near byte {}", position))?;
                attach(&mut open, &mut root, node)?;
            }
            Event::Text(e) => {
                let text = e
                    .unescape_with(|name| {
                        entities
                            .get(name)
                            .map(String::as_str)
                            .or_else(|| resolve_predefined_entity(name))
                    })
                    .map_err(|err| anyhow!("Invalid character data near byte {}: {}", position, err))?;
                append_text(&mut open, &text)?;
            }
            Event::CData(e) => {
                let raw = e.into_inner();
                append_text(&mut open, &String::from_utf8_lossy(&raw))?;
            }
            Event::DocType(e) => {
                collect_entities(&String::from_utf8_lossy(&e), &mut entities);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(unclosed) = open.last() {
        bail!("Unexpected end of document: <{}> is never closed", unclosed.name.local);
    }
    root.ok_or_else(|| anyhow!("No root element found"))
}

fn qualified_name(resolved: &ResolveResult, local: &[u8]) -> Result<QName> {
    let namespace = match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.0).into_owned()),
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(prefix) => {
            bail!("Unbound namespace prefix '{}'", String::from_utf8_lossy(prefix))
        }
    };
    Ok(QName {
        namespace,
        local: String::from_utf8_lossy(local).into_owned(),
    })
}

fn attach(open: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    if root.is_some() {
        bail!("Junk after document element: <{}>", node.name.local);
    }
    *root = Some(node);
    Ok(())
}

// Outside the root element only whitespace is allowed.
fn append_text(open: &mut [XmlNode], text: &str) -> Result<()> {
    let Some(current) = open.last_mut() else {
        if !text.trim().is_empty() {
            bail!("Character data outside the document element: '{}'", text.trim());
        }
        return Ok(());
    };
    match current.children.last_mut() {
        Some(previous) => previous.tail.push_str(text),
        None => current.text.push_str(text),
    }
    Ok(())
}

/// Internal-subset `<!ENTITY name "value">` declarations. Parameter entities
/// and external (SYSTEM/PUBLIC) entities are not expanded.
fn collect_entities(doctype: &str, entities: &mut HashMap<String, String>) {
    for caps in ENTITY_DECL_RE.captures_iter(doctype) {
        let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        // The first declaration of an entity is binding.
        entities
            .entry(caps[1].to_string())
            .or_insert_with(|| value.to_string());
    }
}
