//! Base node model - identity, attributes, kind-independent state
//!
//! Every node in a sentence (syntactic or semantic) carries the same
//! base: a sentence-scoped ID, an element name, a string attribute map,
//! a flag marking raw text, and the "kith" - unrecognized child markup
//! preserved verbatim for lossless round-tripping.

use crate::markup::{Fragment, escape_attr};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Shared state of every node in the annotation graph.
#[derive(Debug, Clone)]
pub struct NodeBase {
    id: String,
    /// Element name; for text nodes, the text itself.
    name: String,
    attributes: BTreeMap<String, String>,
    is_text: bool,
    kith: Vec<Fragment>,
}

impl NodeBase {
    /// Create an element node.
    pub fn element(
        name: impl Into<String>,
        attributes: BTreeMap<String, String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes,
            is_text: false,
            kith: Vec::new(),
        }
    }

    /// Create a text node. Text nodes cannot carry attributes.
    pub fn text(content: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: content.into(),
            attributes: BTreeMap::new(),
            is_text: true,
            kith: Vec::new(),
        }
    }

    /// Build a base from a parsed markup fragment.
    pub fn from_fragment(frag: &Fragment, id: impl Into<String>) -> Result<Self> {
        if frag.is_text() {
            Ok(Self::text(frag.raw(), id))
        } else {
            let name = frag
                .name()
                .ok_or_else(|| Error::Parse(format!("element without a name: {frag}")))?
                .to_string();
            Ok(Self::element(name, frag.attributes()?, id))
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn element_name(&self) -> &str {
        &self.name
    }

    pub fn is_text(&self) -> bool {
        self.is_text
    }

    /// The sentence ID this node belongs to, read off the fixed prefix
    /// convention of its own ID (everything before the first `_`).
    pub fn sentence_id(&self) -> Option<&str> {
        self.id.split_once('_').map(|(sid, _)| sid)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Set an attribute. Fatal on text nodes.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        if self.is_text {
            return Err(Error::TextAttribute(self.id.clone()));
        }
        self.attributes.insert(name.into(), value.into());
        Ok(())
    }

    pub fn del_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    /// Keep an unrecognized child fragment for verbatim re-emission.
    pub fn add_kith(&mut self, frag: Fragment) {
        self.kith.push(frag);
    }

    pub fn kith(&self) -> &[Fragment] {
        &self.kith
    }

    /// Open tag with escaped attribute values, or the raw text for a
    /// text node (which has no tags at all).
    pub fn open_tag(&self) -> String {
        if self.is_text {
            return self.name.clone();
        }
        format_open_tag(&self.name, &self.attributes)
    }

    pub fn close_tag(&self) -> String {
        if self.is_text {
            return String::new();
        }
        format!("</{}>\n", self.name)
    }

    /// The preserved unrecognized fragments, re-emitted in encounter order.
    pub fn kith_markup(&self) -> String {
        let mut s = String::new();
        for frag in &self.kith {
            s.push_str(frag.raw());
            s.push('\n');
        }
        s
    }
}

/// The ID an element fragment carries. Reference elements (`edge`,
/// `fenode`, `uspitem`, `splitword`, `other_edge`) name their node in
/// `idref`; every other element uses `id`. Text carries none.
pub(crate) fn fragment_id(frag: &Fragment) -> Result<Option<String>> {
    if frag.is_text() {
        return Ok(None);
    }
    let attr = match frag.name() {
        Some("edge" | "fenode" | "uspitem" | "splitword" | "other_edge") => "idref",
        _ => "id",
    };
    frag.attribute(attr)
}

/// Render an open tag from a name and attribute map.
pub(crate) fn format_open_tag(name: &str, attributes: &BTreeMap<String, String>) -> String {
    let mut s = String::new();
    s.push('<');
    s.push_str(name);
    for (attr, value) in attributes {
        s.push(' ');
        s.push_str(attr);
        s.push_str("='");
        s.push_str(&escape_attr(value));
        s.push('\'');
    }
    s.push_str(">\n");
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_node_rejects_attributes() {
        let mut node = NodeBase::text("some words", "s1_99");
        assert!(matches!(
            node.set_attribute("word", "x"),
            Err(Error::TextAttribute(_))
        ));
    }

    #[test]
    fn test_attribute_roundtrip() {
        let mut node = NodeBase::element("t", BTreeMap::new(), "s1_1");
        node.set_attribute("word", "cat").unwrap();
        assert_eq!(node.attribute("word"), Some("cat"));
        assert_eq!(node.del_attribute("word"), Some("cat".to_string()));
        assert_eq!(node.attribute("word"), None);
    }

    #[test]
    fn test_sentence_id_prefix() {
        let node = NodeBase::element("t", BTreeMap::new(), "s42_501");
        assert_eq!(node.sentence_id(), Some("s42"));
        let odd = NodeBase::element("t", BTreeMap::new(), "noprefix");
        assert_eq!(odd.sentence_id(), None);
    }

    #[test]
    fn test_open_tag_escapes_values() {
        let mut node = NodeBase::element("t", BTreeMap::new(), "s1_1");
        node.set_attribute("word", "l'eau").unwrap();
        assert_eq!(node.open_tag(), "<t word='l&apos;eau'>\n");
    }
}
