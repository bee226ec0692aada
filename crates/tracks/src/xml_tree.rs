//! Minimal owned XML element tree built on `quick-xml`.
//!
//! GPX lookups need parent/child queries ("trk > name", nested extension
//! paths), which a streaming reader alone makes awkward. Documents are small,
//! so the whole tree is materialized once per parse.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Element {
    /// Qualified name as written, e.g. `gpxtpx:hr`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum XmlError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("Document has no root element")]
    NoRoot,
    #[error("Unclosed element <{0}> at end of document")]
    Unclosed(String),
}

impl Element {
    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// First direct child with the given local name.
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == local_name)
    }

    /// Follows a path of local names through direct children.
    pub fn path(&self, local_names: &[&str]) -> Option<&Element> {
        local_names
            .iter()
            .try_fold(self, |element, name| element.child(name))
    }

    /// All descendants in document order (pre-order, excluding `self`).
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// First descendant, in document order, matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&Element) -> bool) -> Option<&Element> {
        self.descendants().find(|&e| predicate(e))
    }

    /// First element named `child` whose parent is named `parent`, searching
    /// the whole subtree in document order (CSS `parent > child`).
    pub fn find_child_of(&self, parent: &str, child: &str) -> Option<&Element> {
        std::iter::once(self)
            .chain(self.descendants())
            .filter(|e| e.local_name() == parent)
            .find_map(|e| e.child(child))
    }
}

pub(crate) struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, quick_xml::Error> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        ..Default::default()
    })
}

/// Parses `content` into its root element.
pub(crate) fn parse(content: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let syntax = |reader: &Reader<&[u8]>, e: quick_xml::Error| XmlError::Syntax {
        position: reader.buffer_position(),
        message: e.to_string(),
    };

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| syntax(&reader, e))?;
        match event {
            Event::Start(ref e) => {
                let element = open_element(e).map_err(|err| syntax(&reader, err))?;
                stack.push(element);
            }
            Event::Empty(ref e) => {
                let element = open_element(e).map_err(|err| syntax(&reader, err))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = root.or(Some(element)),
                }
            }
            Event::Text(ref e) => {
                if let Some(current) = stack.last_mut() {
                    let text = e.unescape().map_err(|err| syntax(&reader, err))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                if let Some(finished) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(finished),
                        None => root = root.or(Some(finished)),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::NoRoot)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<root xmlns:ns="urn:x">
  <a id="1"><name>first</name></a>
  <b><a id="2"><name> second </name><ns:leaf>x &amp; y</ns:leaf></a></b>
  <empty flag="yes"/>
</root>"#;

    #[test]
    fn test_parse_tree() {
        let root = parse(DOC).unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.child("empty").unwrap().attribute("flag"), Some("yes"));
        assert_eq!(root.path(&["b", "a", "name"]).unwrap().text(), "second");
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = parse(DOC).unwrap();
        let ids: Vec<&str> = root
            .descendants()
            .filter(|e| e.local_name() == "a")
            .filter_map(|e| e.attribute("id"))
            .collect();
        assert_eq!(ids, ["1", "2"]);
    }

    #[test]
    fn test_prefixed_names_and_entities() {
        let root = parse(DOC).unwrap();
        let leaf = root.find(|e| e.local_name() == "leaf").unwrap();
        assert_eq!(leaf.prefix(), Some("ns"));
        assert_eq!(leaf.text(), "x & y");
    }

    #[test]
    fn test_find_child_of() {
        let root = parse(DOC).unwrap();
        assert_eq!(root.find_child_of("a", "name").unwrap().text(), "first");
        assert!(root.find_child_of("empty", "name").is_none());
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse("<gpx><trk></gpx>").is_err());
        assert!(matches!(parse("<gpx><trk>"), Err(XmlError::Unclosed(_))));
        assert!(matches!(parse(""), Err(XmlError::NoRoot)));
    }
}
