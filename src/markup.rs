//! Markup fragments - the textual boundary format of the engine
//!
//! A sentence arrives as a single markup element (a subset of XML).
//! `Fragment` wraps one element or one run of raw text and parses its
//! name, attributes and children on demand, keeping the original string
//! around so unrecognized content can be re-emitted verbatim.

use crate::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<\s*([\w-]+)[\s/>]").unwrap());
static UNARY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*<.*/>\s*$").unwrap());
static AFTER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*<\s*[\w-]+").unwrap());
static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*([\w-]+)=(?:'([^']*)'|"([^"]*)")"#).unwrap());
static TAG_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*/?>").unwrap());
static TEXT_SHAVE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(.*?)(<.*$|$)").unwrap());
static CHILD_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(<\s*([\w-]+)(?:\s+[\w-]+=(?:'[^']*'|"[^"]*"))*\s*)"#).unwrap()
});

/// One parsed markup fragment: either an element (with its complete
/// source text, open tag to close tag) or a run of raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    raw: String,
    is_text: bool,
}

impl Fragment {
    /// Wrap a string holding exactly one markup element.
    ///
    /// Newlines are normalized to spaces; the string is checked to be a
    /// single element with balanced angle brackets.
    pub fn element(s: &str) -> Result<Fragment> {
        let raw = s.replace('\n', " ");
        element_test(&raw)?;
        dyck_test(&raw)?;
        Ok(Fragment {
            raw,
            is_text: false,
        })
    }

    /// Wrap a run of raw text.
    pub fn text(s: &str) -> Fragment {
        Fragment {
            raw: s.to_string(),
            is_text: true,
        }
    }

    pub fn is_text(&self) -> bool {
        self.is_text
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Element name, `None` for text fragments.
    pub fn name(&self) -> Option<&str> {
        if self.is_text {
            return None;
        }
        NAME_RE
            .captures(&self.raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// Attribute map of the element; empty for text fragments.
    ///
    /// Values are taken verbatim, entities included: the engine never
    /// decodes `&apos;`, it only produces it on emission.
    pub fn attributes(&self) -> Result<BTreeMap<String, String>> {
        let mut map = BTreeMap::new();
        if self.is_text {
            return Ok(map);
        }
        let m = AFTER_NAME_RE
            .find(&self.raw)
            .ok_or_else(|| parse_err(&self.raw))?;
        let mut rest = &self.raw[m.end()..];
        while !TAG_END_RE.is_match(rest) {
            let caps = ATTR_RE.captures(rest).ok_or_else(|| parse_err(rest))?;
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or("");
            map.insert(caps[1].to_string(), value.to_string());
            rest = &rest[caps.get(0).map(|m| m.end()).unwrap_or(0)..];
        }
        Ok(map)
    }

    /// Convenience lookup of a single attribute.
    pub fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.attributes()?.remove(name))
    }

    /// The element's direct children, elements and text interleaved in
    /// source order. Whitespace-only text is dropped. Empty for text
    /// fragments and self-closing elements.
    pub fn children_and_text(&self) -> Result<Vec<Fragment>> {
        if self.is_text || UNARY_RE.is_match(&self.raw) {
            return Ok(Vec::new());
        }

        let name = self.name().ok_or_else(|| parse_err(&self.raw))?;
        let content_re = dynamic_regex(&format!(
            r#"^\s*<\s*{0}(?:\s+[\w-]+=(?:'[^']*'|"[^"]*"))*\s*>(.*?)</\s*{0}\s*>\s*$"#,
            regex::escape(name)
        ))?;
        let caps = content_re
            .captures(&self.raw)
            .ok_or_else(|| parse_err(&self.raw))?;
        let mut rest = caps[1].to_string();

        let mut out = Vec::new();
        while !rest.trim().is_empty() {
            // shave off the next run of text
            let tcaps = TEXT_SHAVE_RE
                .captures(&rest)
                .ok_or_else(|| parse_err(&rest))?;
            let text = tcaps.get(1).map(|m| m.as_str()).unwrap_or("");
            if !text.trim().is_empty() {
                let after = tcaps.get(2).map(|m| m.as_str()).unwrap_or("").to_string();
                out.push(Fragment::text(text));
                rest = after;
            }
            if rest.trim().is_empty() {
                break;
            }

            // shave off the next child element
            let ccaps = CHILD_START_RE
                .captures(&rest)
                .ok_or_else(|| parse_err(&rest))?;
            let prefix = ccaps[1].to_string();
            let child_name = ccaps[2].to_string();
            let tail = rest[ccaps.get(0).map(|m| m.end()).unwrap_or(0)..].to_string();

            if let Some(after) = tail.strip_prefix("/>") {
                out.push(Fragment::element(&format!("{prefix}/>"))?);
                rest = after.to_string();
            } else {
                let close_re = dynamic_regex(&format!(
                    r"^(>.*?<\s*/\s*{}\s*>)(.*)$",
                    regex::escape(&child_name)
                ))?;
                let c2 = close_re.captures(&tail).ok_or_else(|| parse_err(&rest))?;
                out.push(Fragment::element(&format!("{}{}", prefix, &c2[1]))?);
                rest = c2[2].to_string();
            }
        }
        Ok(out)
    }

    /// First child element with the given name, if any.
    pub fn first_child_matching(&self, name: &str) -> Result<Option<Fragment>> {
        Ok(self
            .children_and_text()?
            .into_iter()
            .find(|c| c.name() == Some(name)))
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Escape an attribute value for emission.
///
/// Both quote characters map onto the apostrophe entity; this is the
/// format's historical convention and must not be widened into general
/// XML escaping.
pub fn escape_attr(value: &str) -> String {
    value.replace('\'', "&apos;").replace('"', "&apos;&apos;")
}

fn element_test(raw: &str) -> Result<()> {
    if UNARY_RE.is_match(raw) {
        // <bla/>
        return Ok(());
    }
    // <bla ...> ... </bla>
    let name = NAME_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| parse_err(raw))?;
    let close_re = dynamic_regex(&format!(r"</\s*{}\s*>\s*$", regex::escape(name)))?;
    if close_re.is_match(raw) {
        Ok(())
    } else {
        Err(parse_err(raw))
    }
}

fn dyck_test(raw: &str) -> Result<()> {
    // every prefix must have at least as many < as >
    let mut opening = 0usize;
    let mut closing = 0usize;
    for c in raw.chars() {
        match c {
            '<' => opening += 1,
            '>' => {
                closing += 1;
                if closing > opening {
                    return Err(Error::Parse(format!(
                        "More closing than opening brackets in prefix of: {}",
                        readable(raw)
                    )));
                }
            }
            _ => {}
        }
    }
    if opening != closing {
        return Err(Error::Parse(format!(
            "Unequal number of brackets in: {}",
            readable(raw)
        )));
    }
    Ok(())
}

fn dynamic_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Parse(format!("internal pattern error: {e}")))
}

fn parse_err(s: &str) -> Error {
    Error::Parse(format!("Cannot parse: {}", readable(s)))
}

fn readable(s: &str) -> String {
    s.replace('>', ">\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_name_and_attributes() {
        let frag = Fragment::element("<t id='s1_1' word=\"the\" pos='DT'/>").unwrap();
        assert_eq!(frag.name(), Some("t"));
        let attrs = frag.attributes().unwrap();
        assert_eq!(attrs.get("id").map(String::as_str), Some("s1_1"));
        assert_eq!(attrs.get("word").map(String::as_str), Some("the"));
        assert_eq!(attrs.get("pos").map(String::as_str), Some("DT"));
        assert!(frag.children_and_text().unwrap().is_empty());
    }

    #[test]
    fn test_mixed_quotes_in_values() {
        let frag = Fragment::element("<x a='he said \"hi\"' b=\"it's\"/>").unwrap();
        let attrs = frag.attributes().unwrap();
        assert_eq!(attrs.get("a").map(String::as_str), Some("he said \"hi\""));
        assert_eq!(attrs.get("b").map(String::as_str), Some("it's"));
    }

    #[test]
    fn test_children_and_text() {
        let frag = Fragment::element(
            "<bla blupp='a'>\n<lalala> </lalala>\ntexttext\n<lala blupp='b'/>\nnochtext\n<la> <l/> </la>\n</bla>",
        )
        .unwrap();
        let children = frag.children_and_text().unwrap();
        let names: Vec<Option<&str>> = children.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![Some("lalala"), None, Some("lala"), None, Some("la")]
        );
        assert!(children[1].is_text());
        assert_eq!(children[1].raw().trim(), "texttext");
        // nested children parse too
        let inner = children[4].children_and_text().unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].name(), Some("l"));
    }

    #[test]
    fn test_unbalanced_brackets_rejected() {
        assert!(Fragment::element("<a>>bad</a>").is_err());
        assert!(Fragment::element("no element at all").is_err());
        // an unclosed child surfaces when the children are walked
        let frag = Fragment::element("<a><b></a>").unwrap();
        assert!(frag.children_and_text().is_err());
    }

    #[test]
    fn test_first_child_matching() {
        let frag = Fragment::element("<s id='x'><graph/><sem/></s>").unwrap();
        let graph = frag.first_child_matching("graph").unwrap().unwrap();
        assert_eq!(graph.name(), Some("graph"));
        assert!(frag.first_child_matching("nothing").unwrap().is_none());
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("a'b"), "a&apos;b");
        assert_eq!(escape_attr("a\"b"), "a&apos;&apos;b");
        assert_eq!(escape_attr("plain"), "plain");
    }
}
