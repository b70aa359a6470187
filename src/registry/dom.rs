//! A small element tree on top of the `xml-rs` event stream. The registry is read in several
//! passes, so the events are collected into a tree first, keeping the line of every element.
use std::collections::BTreeMap;

use xml::common::Position;
use xml::reader::{EventReader, ParserConfig, XmlEvent};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Node>,
    pub line: u64,
}

impl Element {
    /// Parses a whole document and returns its root element.
    pub fn parse(source: &[u8]) -> Result<Element> {
        let config = ParserConfig::new()
            .trim_whitespace(false)
            .whitespace_to_characters(true)
            .cdata_to_characters(true)
            .coalesce_characters(true)
            .ignore_comments(true);
        let mut reader = EventReader::new_with_config(source, config);

        let mut stack: Vec<Element> = Vec::with_capacity(16);
        loop {
            match reader.next()? {
                XmlEvent::StartElement { name, attributes, .. } => {
                    let line = reader.position().row + 1;
                    stack.push(Element {
                        name: name.local_name,
                        attributes: attributes.into_iter()
                            .map(|a| (a.name.local_name, a.value))
                            .collect(),
                        children: Vec::new(),
                        line,
                    });
                }
                XmlEvent::EndElement { .. } => {
                    let line = reader.position().row + 1;
                    let element = stack.pop()
                        .ok_or_else(|| Error::spec(line, "unexpected closing tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => return Ok(element),
                    }
                }
                XmlEvent::Characters(text) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Text(text));
                    }
                }
                XmlEvent::EndDocument => {
                    return Err(Error::spec(reader.position().row + 1, "document has no root element"));
                }
                _ => (),
            }
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Child elements, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match *node {
            Node::Element(ref e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Child elements with the given tag name.
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.name == name)
    }

    pub fn first_element(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text of this element and all of its descendants.
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, text: &mut String) {
        for child in &self.children {
            match *child {
                Node::Text(ref t) => text.push_str(t),
                Node::Element(ref e) => e.collect_text(text),
            }
        }
    }

    /// Text of the last direct text child, if any.
    pub fn last_text(&self) -> Option<&str> {
        self.children.iter().rev().find_map(|node| match *node {
            Node::Text(ref t) => Some(t.as_str()),
            Node::Element(_) => None,
        })
    }
}
