//! Syntax graph - the dominance tree of one sentence
//!
//! Owns every syntactic node, keyed by ID. Terminals and nonterminals
//! form a labeled tree; splitword parts hang beneath terminals and are
//! excluded from normal yield computation; link edges record labeled
//! relations outside the dominance tree.

use crate::markup::{Fragment, escape_attr};
use crate::node::{NodeBase, format_open_tag, fragment_id};
use crate::order;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// The four kinds of syntactic node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SynKind {
    /// Leaf of the tree, carries word and part of speech
    Terminal,
    /// Internal node, carries a syntactic category
    Nonterminal,
    /// Sub-token unit attached beneath a terminal
    Splitword,
    /// Immutable stand-in for a node that lives in another sentence
    Outside,
}

impl SynKind {
    /// The markup element name for this kind.
    pub fn element_name(&self) -> &'static str {
        match self {
            SynKind::Terminal => "t",
            SynKind::Nonterminal => "nt",
            SynKind::Splitword => "part",
            SynKind::Outside => "OTHER_SENTENCE",
        }
    }
}

/// A labeled non-tree reference to another syntactic node.
#[derive(Debug, Clone)]
pub struct Link {
    pub label: Option<String>,
    pub target: String,
    /// Further attribute-value pairs carried by the edge
    pub attributes: BTreeMap<String, String>,
}

/// One node of the syntax graph.
///
/// Tree edges are owned here as `(label, child ID)` pairs with a single
/// parent back-reference; frame elements pointing at this node are
/// recorded as a non-owning list of their IDs.
#[derive(Debug, Clone)]
pub struct SynNode {
    base: NodeBase,
    kind: SynKind,
    children: Vec<(Option<String>, String)>,
    parent: Option<(Option<String>, String)>,
    links: Vec<Link>,
    sem_refs: Vec<String>,
}

impl SynNode {
    pub(crate) fn new(kind: SynKind, base: NodeBase) -> Self {
        Self {
            base,
            kind,
            children: Vec::new(),
            parent: None,
            links: Vec::new(),
            sem_refs: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.base.id()
    }

    pub fn kind(&self) -> SynKind {
        self.kind
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == SynKind::Terminal
    }

    pub fn is_nonterminal(&self) -> bool {
        self.kind == SynKind::Nonterminal
    }

    pub fn is_splitword(&self) -> bool {
        self.kind == SynKind::Splitword
    }

    pub fn is_outside_sentence(&self) -> bool {
        self.kind == SynKind::Outside
    }

    /// Word of a terminal or splitword part; the fixed sentinel
    /// `<unknown>` for cross-sentence placeholders.
    pub fn word(&self) -> Option<&str> {
        if self.kind == SynKind::Outside {
            return Some("<unknown>");
        }
        self.base.attribute("word").map(str::trim)
    }

    pub fn part_of_speech(&self) -> Option<&str> {
        self.base.attribute("pos").map(str::trim)
    }

    pub fn category(&self) -> Option<&str> {
        self.base.attribute("cat").map(str::trim)
    }

    /// Punctuation test used when projecting constituents: checks the
    /// part-of-speech conventions first, then known punctuation words.
    pub fn is_punct(&self) -> bool {
        if self.is_nonterminal() {
            return false;
        }
        if let Some(pos) = self.part_of_speech() {
            if matches!(pos, "$." | "$," | "$(") || pos.starts_with("PUNC") {
                return true;
            }
        }
        matches!(
            self.word(),
            Some(
                "." | ";"
                    | ","
                    | ":"
                    | "?"
                    | "!"
                    | "("
                    | ")"
                    | "["
                    | "]"
                    | "{"
                    | "}"
                    | "-"
                    | "''"
                    | "``"
                    | "\""
                    | "'"
            )
        )
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.base.attribute(name)
    }

    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        self.base.set_attribute(name, value)
    }

    pub fn base(&self) -> &NodeBase {
        &self.base
    }

    /// Outgoing tree edges as `(label, child ID)` pairs, in order.
    pub fn children_with_labels(&self) -> &[(Option<String>, String)] {
        &self.children
    }

    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(_, id)| id.as_str())
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_ref().map(|(_, id)| id.as_str())
    }

    /// The incoming tree edge: `(label, parent ID)`.
    pub fn parent_edge(&self) -> Option<(Option<&str>, &str)> {
        self.parent
            .as_ref()
            .map(|(label, id)| (label.as_deref(), id.as_str()))
    }

    pub fn add_link(&mut self, label: Option<String>, target: impl Into<String>) {
        self.links.push(Link {
            label,
            target: target.into(),
            attributes: BTreeMap::new(),
        });
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Links with a given label.
    pub fn linked(&self, label: &str) -> Vec<&Link> {
        self.links
            .iter()
            .filter(|l| l.label.as_deref() == Some(label))
            .collect()
    }

    /// IDs of the frame elements pointing at this node.
    pub fn sem_refs(&self) -> &[String] {
        &self.sem_refs
    }

    pub(crate) fn add_sem_ref(&mut self, fe_id: &str) {
        self.sem_refs.push(fe_id.to_string());
    }

    pub(crate) fn remove_sem_ref(&mut self, fe_id: &str) {
        self.sem_refs.retain(|r| r != fe_id);
    }

    pub(crate) fn clear_sem_refs(&mut self) {
        self.sem_refs.clear();
    }
}

/// The complete set of syntactic nodes of one sentence, keyed by ID.
#[derive(Debug, Clone)]
pub struct SynGraph {
    base: NodeBase,
    nodes: HashMap<String, SynNode>,
    /// Registration order, for deterministic iteration and output
    order: Vec<String>,
    sentence_id: String,
    next_auto: u64,
}

impl SynGraph {
    pub(crate) fn empty(sentence_id: &str) -> Self {
        Self {
            base: NodeBase::element("graph", BTreeMap::new(), format!("{sentence_id}_graph")),
            nodes: HashMap::new(),
            order: Vec::new(),
            sentence_id: sentence_id.to_string(),
            next_auto: 0,
        }
    }

    /// Build the graph from the `graph` element of a sentence, if present.
    pub(crate) fn from_fragment(frag: Option<&Fragment>, sentence_id: &str) -> Result<Self> {
        let mut graph = Self::empty(sentence_id);
        let Some(frag) = frag else {
            return Ok(graph);
        };
        graph.base = NodeBase::from_fragment(frag, format!("{sentence_id}_graph"))?;

        let children = frag.children_and_text()?;
        for child in &children {
            match child.name() {
                Some("terminals") => {
                    graph.make_nodes(child, SynKind::Terminal, "s/graph/terminals", true)?;
                }
                Some("nonterminals") => {
                    graph.make_nodes(child, SynKind::Nonterminal, "s/graph/nonterminals", false)?;
                }
                _ => graph.base.add_kith(child.clone()),
            }
        }

        // second pass: edges between nodes
        for child in &children {
            if child.name() != Some("nonterminals") {
                continue;
            }
            for nt in child.children_and_text()? {
                if nt.name() != Some("nt") {
                    // already warned in make_nodes
                    continue;
                }
                match fragment_id(&nt)? {
                    Some(id) => graph.syn_add_children(&id, &nt)?,
                    None => tracing::warn!(sentence = %sentence_id, "nonterminal without an ID, edges skipped"),
                }
            }
        }
        Ok(graph)
    }

    /// Attach splitword parts from the `splitwords` element of the
    /// `sem` section: part nodes are created and hung beneath the
    /// terminal each `splitword` element refers to.
    pub(crate) fn add_splitwords(&mut self, frag: &Fragment) -> Result<()> {
        for splitword in frag.children_and_text()? {
            if splitword.name() != Some("splitword") {
                tracing::warn!(
                    "additional material in s/sem/splitwords will be ignored: {splitword}"
                );
                continue;
            }
            self.make_nodes(&splitword, SynKind::Splitword, "s/sem/splitwords/splitword", true)?;
            let terminal_id = fragment_id(&splitword)?.ok_or_else(|| {
                Error::Parse(format!("splitword without an idref: {splitword}"))
            })?;
            if !self.nodes.contains_key(&terminal_id) {
                return Err(Error::UnknownNode {
                    sentence: self.sentence_id.clone(),
                    id: terminal_id,
                    context: splitword.to_string(),
                });
            }
            self.syn_add_children(&terminal_id, &splitword)?;
        }
        Ok(())
    }

    pub fn sentence_id(&self) -> &str {
        &self.sentence_id
    }

    pub fn node(&self, id: &str) -> Option<&SynNode> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut SynNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &SynNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// All nodes with no parent. Normally exactly one; multiplicity is
    /// tolerated. Cross-sentence placeholders never count as roots.
    pub fn roots(&self) -> Vec<&SynNode> {
        self.nodes()
            .filter(|n| n.parent.is_none() && n.kind != SynKind::Outside)
            .collect()
    }

    pub fn terminals(&self) -> Vec<&SynNode> {
        self.nodes().filter(|n| n.is_terminal()).collect()
    }

    /// Terminals in sentence order (by the position encoded in their IDs).
    pub fn terminals_sorted(&self) -> Vec<&SynNode> {
        let mut ts = self.terminals();
        ts.sort_by_key(|n| order::position_key(n.id(), false));
        ts
    }

    pub fn nonterminals(&self) -> Vec<&SynNode> {
        self.nodes().filter(|n| n.is_nonterminal()).collect()
    }

    /// Create and register a new terminal or nonterminal.
    ///
    /// When no ID is given, one is synthesized from a per-sentence
    /// counter, skipping IDs already taken.
    pub fn add_node(
        &mut self,
        kind: SynKind,
        cat: Option<&str>,
        word: Option<&str>,
        pos: Option<&str>,
        id: Option<&str>,
    ) -> Result<String> {
        if !matches!(kind, SynKind::Terminal | SynKind::Nonterminal) {
            return Err(Error::SyntaxNodeKind);
        }
        let new_id = match id {
            Some(suffix) => format!("{}_{}", self.sentence_id, suffix),
            None => self.synth_id(),
        };
        let mut attrs = BTreeMap::new();
        attrs.insert("id".to_string(), new_id.clone());
        if let Some(c) = cat {
            attrs.insert("cat".to_string(), c.to_string());
        }
        if let Some(w) = word {
            attrs.insert("word".to_string(), w.to_string());
        }
        if let Some(p) = pos {
            attrs.insert("pos".to_string(), p.to_string());
        }
        self.register(SynNode::new(
            kind,
            NodeBase::element(kind.element_name(), attrs, &new_id),
        ));
        Ok(new_id)
    }

    /// Remove a node. Its children are re-parented onto its former
    /// parent, each keeping its own original edge label; the removed
    /// node's incoming edge is dropped.
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        let node = self.nodes.remove(id).ok_or_else(|| Error::UnknownNode {
            sentence: self.sentence_id.clone(),
            id: id.to_string(),
            context: "remove_node".to_string(),
        })?;
        self.order.retain(|n| n != id);

        if let Some((plabel, pid)) = &node.parent {
            if let Some(parent) = self.nodes.get_mut(pid) {
                parent.children.retain(|(l, c)| !(c == id && l == plabel));
            }
        }
        for (_, cid) in &node.children {
            if let Some(child) = self.nodes.get_mut(cid) {
                child.parent = None;
            }
        }
        if let Some((_, pid)) = &node.parent {
            let pid = pid.clone();
            for (clabel, cid) in &node.children {
                self.attach(&pid, cid, clabel.clone())?;
            }
        }
        Ok(())
    }

    /// Ordered leaf descendants of a node: descent stops at nodes with
    /// no expandable children, and splitword parts never count as
    /// children (a terminal with only splitword parts yields itself).
    /// Terminals and splitword parts come back in sentence order, other
    /// leaves after them.
    pub fn yield_nodes(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_yield(id, &mut out);
        let (mut positional, rest): (Vec<String>, Vec<String>) = out.into_iter().partition(|nid| {
            self.nodes
                .get(nid)
                .map(|n| n.is_terminal() || n.is_splitword())
                .unwrap_or(false)
        });
        positional.sort_by_key(|nid| {
            let splitword = self
                .nodes
                .get(nid)
                .map(|n| n.is_splitword())
                .unwrap_or(false);
            order::position_key(nid, splitword)
        });
        positional.extend(rest);
        positional
    }

    fn collect_yield(&self, id: &str, out: &mut Vec<String>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let expandable: Vec<&str> = node
            .children
            .iter()
            .filter(|(_, cid)| !self.is_splitword_id(cid))
            .map(|(_, cid)| cid.as_str())
            .collect();
        if expandable.is_empty() {
            out.push(id.to_string());
            return;
        }
        for cid in expandable {
            let child_expands = self
                .nodes
                .get(cid)
                .map(|c| c.children.iter().any(|(_, gid)| !self.is_splitword_id(gid)))
                .unwrap_or(false);
            if child_expands {
                self.collect_yield(cid, out);
            } else {
                out.push(cid.to_string());
            }
        }
    }

    fn is_splitword_id(&self, id: &str) -> bool {
        self.nodes.get(id).map(|n| n.is_splitword()).unwrap_or(false)
    }

    /// Serialize the `graph` element. Terminals and nonterminals are
    /// written in two blocks; the `root` attribute is recomputed to
    /// point at the first root.
    pub fn to_markup(&self) -> String {
        let mut attrs = self.base.attributes().clone();
        let roots = self.roots();
        match roots.first() {
            Some(root) => {
                if roots.len() > 1 {
                    tracing::warn!(
                        sentence = %self.sentence_id,
                        "graph has {} roots, serializing only the first",
                        roots.len()
                    );
                }
                attrs.insert("root".to_string(), root.id().to_string());
            }
            None => {
                attrs.remove("root");
            }
        }

        let mut s = format_open_tag(self.base.element_name(), &attrs);
        s.push_str("<terminals>\n");
        for t in self.terminals_sorted() {
            s.push_str(&self.node_markup(t));
        }
        s.push_str("</terminals>\n");
        s.push_str("<nonterminals>\n");
        for nt in self.nonterminals() {
            s.push_str(&self.node_markup(nt));
        }
        s.push_str("</nonterminals>\n");
        s.push_str(&self.base.kith_markup());
        s.push_str(&self.base.close_tag());
        s
    }

    fn node_markup(&self, node: &SynNode) -> String {
        let mut s = node.base.open_tag();
        for (label, cid) in &node.children {
            // splitword parts round-trip through the sem section
            if self.is_splitword_id(cid) {
                continue;
            }
            s.push_str(&format!(
                "<edge label='{}' idref='{}'/>\n",
                escape_attr(label.as_deref().unwrap_or("-")),
                escape_attr(cid)
            ));
        }
        for link in &node.links {
            s.push_str(&format!(
                "<other_edge label='{}' idref='{}'",
                escape_attr(link.label.as_deref().unwrap_or("-")),
                escape_attr(&link.target)
            ));
            for (attr, value) in &link.attributes {
                s.push_str(&format!(" {}='{}'", attr, escape_attr(value)));
            }
            s.push_str("/>\n");
        }
        s.push_str(&node.base.kith_markup());
        s.push_str(&node.base.close_tag());
        s
    }

    /// Register a placeholder for a node living in another sentence.
    pub(crate) fn insert_outside(&mut self, id: &str) {
        if self.nodes.contains_key(id) {
            return;
        }
        let mut attrs = BTreeMap::new();
        attrs.insert("id".to_string(), id.to_string());
        self.register(SynNode::new(
            SynKind::Outside,
            NodeBase::element("OTHER_SENTENCE", attrs, id),
        ));
    }

    pub(crate) fn clear_all_sem_refs(&mut self) {
        for node in self.nodes.values_mut() {
            node.clear_sem_refs();
        }
    }

    fn register(&mut self, node: SynNode) {
        let id = node.id().to_string();
        if !self.nodes.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.nodes.insert(id, node);
    }

    fn synth_id(&mut self) -> String {
        loop {
            let candidate = format!("{}_auto{}", self.sentence_id, self.next_auto);
            self.next_auto += 1;
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn make_nodes(
        &mut self,
        container: &Fragment,
        kind: SynKind,
        location: &str,
        keep_children_as_kith: bool,
    ) -> Result<()> {
        for elt in container.children_and_text()? {
            if elt.name() != Some(kind.element_name()) {
                tracing::warn!("additional material in {location} will be ignored: {elt}");
                continue;
            }
            let id = match fragment_id(&elt)? {
                Some(id) => id,
                None => self.synth_id(),
            };
            let mut node = SynNode::new(kind, NodeBase::from_fragment(&elt, &id)?);
            if keep_children_as_kith {
                for child in elt.children_and_text()? {
                    node.base.add_kith(child);
                }
            }
            self.register(node);
        }
        Ok(())
    }

    fn syn_add_children(&mut self, parent_id: &str, frag: &Fragment) -> Result<()> {
        for edge in frag.children_and_text()? {
            match edge.name() {
                Some("edge") | Some("part") => {
                    let child_id = fragment_id(&edge)?.ok_or_else(|| {
                        Error::Parse(format!("edge without an idref: {edge}"))
                    })?;
                    if !self.nodes.contains_key(&child_id) {
                        return Err(Error::UnknownNode {
                            sentence: self.sentence_id.clone(),
                            id: child_id,
                            context: edge.to_string(),
                        });
                    }
                    let label = edge.attribute("label")?;
                    self.attach(parent_id, &child_id, label)?;
                }
                Some("other_edge") => {
                    let target = fragment_id(&edge)?.ok_or_else(|| {
                        Error::Parse(format!("other_edge without an idref: {edge}"))
                    })?;
                    if !self.nodes.contains_key(&target) {
                        return Err(Error::UnknownNode {
                            sentence: self.sentence_id.clone(),
                            id: target,
                            context: edge.to_string(),
                        });
                    }
                    let mut attributes = edge.attributes()?;
                    let label = attributes.remove("label");
                    attributes.remove("idref");
                    if let Some(node) = self.nodes.get_mut(parent_id) {
                        node.links.push(Link {
                            label,
                            target,
                            attributes,
                        });
                    }
                }
                _ => {
                    if let Some(node) = self.nodes.get_mut(parent_id) {
                        node.base.add_kith(edge);
                    }
                }
            }
        }
        Ok(())
    }

    fn attach(&mut self, parent_id: &str, child_id: &str, label: Option<String>) -> Result<()> {
        let parent = self.nodes.get(parent_id).ok_or_else(|| Error::UnknownNode {
            sentence: self.sentence_id.clone(),
            id: parent_id.to_string(),
            context: "edge source".to_string(),
        })?;
        if parent.kind == SynKind::Outside {
            return Err(Error::OutsideSentence(parent_id.to_string()));
        }
        if !self.nodes.contains_key(child_id) {
            return Err(Error::UnknownNode {
                sentence: self.sentence_id.clone(),
                id: child_id.to_string(),
                context: "edge target".to_string(),
            });
        }

        // a node has at most one parent: detach from any previous one
        let previous = self
            .nodes
            .get(child_id)
            .and_then(|c| c.parent.clone());
        if let Some((old_label, old_pid)) = previous {
            if let Some(old_parent) = self.nodes.get_mut(&old_pid) {
                old_parent
                    .children
                    .retain(|(l, c)| !(c == child_id && *l == old_label));
            }
        }
        if let Some(child) = self.nodes.get_mut(child_id) {
            child.parent = Some((label.clone(), parent_id.to_string()));
        }
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.push((label, child_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_chain() -> SynGraph {
        // P -SB-> N, N -HD-> C1, N -MO-> C2
        let mut g = SynGraph::empty("s1");
        let p = g
            .add_node(SynKind::Nonterminal, Some("S"), None, None, Some("500"))
            .unwrap();
        let n = g
            .add_node(SynKind::Nonterminal, Some("NP"), None, None, Some("501"))
            .unwrap();
        let c1 = g
            .add_node(SynKind::Terminal, None, Some("cat"), Some("NN"), Some("1"))
            .unwrap();
        let c2 = g
            .add_node(SynKind::Terminal, None, Some("sat"), Some("VB"), Some("2"))
            .unwrap();
        g.attach(&p, &n, Some("SB".to_string())).unwrap();
        g.attach(&n, &c1, Some("HD".to_string())).unwrap();
        g.attach(&n, &c2, Some("MO".to_string())).unwrap();
        g
    }

    #[test]
    fn test_remove_node_reparents_with_child_labels() {
        let mut g = graph_with_chain();
        g.remove_node("s1_501").unwrap();

        let p = g.node("s1_500").unwrap();
        let mut edges: Vec<(Option<String>, String)> = p.children_with_labels().to_vec();
        edges.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(
            edges,
            vec![
                (Some("HD".to_string()), "s1_1".to_string()),
                (Some("MO".to_string()), "s1_2".to_string()),
            ]
        );
        assert_eq!(g.node("s1_1").unwrap().parent_id(), Some("s1_500"));
        assert!(g.node("s1_501").is_none());
    }

    #[test]
    fn test_remove_root_orphans_children() {
        let mut g = graph_with_chain();
        g.remove_node("s1_500").unwrap();
        // N becomes a root
        let roots: Vec<&str> = g.roots().iter().map(|n| n.id()).collect();
        assert_eq!(roots, vec!["s1_501"]);
    }

    #[test]
    fn test_yield_order_is_sentence_position() {
        let mut g = SynGraph::empty("s1");
        let root = g
            .add_node(SynKind::Nonterminal, Some("S"), None, None, Some("500"))
            .unwrap();
        let vp = g
            .add_node(SynKind::Nonterminal, Some("VP"), None, None, Some("501"))
            .unwrap();
        // attach terminals out of order and nested at different depths
        for i in [4u32, 1, 5, 2, 3] {
            g.add_node(
                SynKind::Terminal,
                None,
                Some("w"),
                Some("NN"),
                Some(&i.to_string()),
            )
            .unwrap();
        }
        g.attach(&root, &vp, None).unwrap();
        g.attach(&vp, "s1_4", None).unwrap();
        g.attach(&root, "s1_1", None).unwrap();
        g.attach(&vp, "s1_5", None).unwrap();
        g.attach(&root, "s1_2", None).unwrap();
        g.attach(&vp, "s1_3", None).unwrap();

        assert_eq!(
            g.yield_nodes(&root),
            vec!["s1_1", "s1_2", "s1_3", "s1_4", "s1_5"]
        );
    }

    #[test]
    fn test_terminal_with_only_splitword_parts_yields_itself() {
        let mut g = SynGraph::empty("s1");
        let t = g
            .add_node(SynKind::Terminal, None, Some("zum"), Some("APPRART"), Some("3"))
            .unwrap();
        let markup = Fragment::element(
            "<splitwords><splitword idref='s1_3'><part id='s1_3_s1' word='zu'/><part id='s1_3_s2' word='dem'/></splitword></splitwords>",
        )
        .unwrap();
        g.add_splitwords(&markup).unwrap();

        assert!(g.node("s1_3_s1").unwrap().is_splitword());
        assert_eq!(g.node("s1_3_s1").unwrap().parent_id(), Some("s1_3"));
        assert_eq!(g.yield_nodes(&t), vec!["s1_3"]);
    }

    #[test]
    fn test_outside_placeholder_is_no_root_and_takes_no_children() {
        let mut g = graph_with_chain();
        g.insert_outside("s9_1");
        assert!(g.node("s9_1").unwrap().is_outside_sentence());
        assert_eq!(g.node("s9_1").unwrap().word(), Some("<unknown>"));
        assert_eq!(g.roots().len(), 1);
        assert!(matches!(
            g.attach("s9_1", "s1_1", None),
            Err(Error::OutsideSentence(_))
        ));
    }

    #[test]
    fn test_add_node_synthesizes_unique_ids() {
        let mut g = SynGraph::empty("s1");
        let a = g
            .add_node(SynKind::Terminal, None, Some("a"), None, None)
            .unwrap();
        let b = g
            .add_node(SynKind::Terminal, None, Some("b"), None, None)
            .unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("s1_"));
    }

    #[test]
    fn test_edge_to_unknown_id_is_fatal() {
        let frag = Fragment::element(
            "<graph><terminals><t id='s1_1' word='a' pos='X'/></terminals>\
             <nonterminals><nt id='s1_500' cat='S'><edge label='-' idref='s1_99'/></nt></nonterminals></graph>",
        )
        .unwrap();
        let err = SynGraph::from_fragment(Some(&frag), "s1").unwrap_err();
        assert!(matches!(err, Error::UnknownNode { id, .. } if id == "s1_99"));
    }

    #[test]
    fn test_punctuation() {
        let mut g = SynGraph::empty("s1");
        let dot = g
            .add_node(SynKind::Terminal, None, Some("."), Some("$."), Some("9"))
            .unwrap();
        let word = g
            .add_node(SynKind::Terminal, None, Some("cat"), Some("NN"), Some("1"))
            .unwrap();
        assert!(g.node(&dot).unwrap().is_punct());
        assert!(!g.node(&word).unwrap().is_punct());
    }

    #[test]
    fn test_graph_markup_recomputes_root() {
        let g = graph_with_chain();
        let markup = g.to_markup();
        assert!(markup.contains("root='s1_500'"));
        assert!(markup.contains("<terminals>"));
        assert!(markup.contains("<edge label='HD' idref='s1_1'/>"));
    }
}
