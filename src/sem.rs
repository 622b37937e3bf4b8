//! Semantic graph - frames and roles overlaid on the syntax graph
//!
//! Frames group a target with frame elements; frame elements point into
//! the syntax graph by node ID, never by ownership. Underspecification
//! blocks tie together frames (or frame elements) that are mutually
//! unresolved alternatives. Sentence-level flags live here too.

use crate::markup::{Fragment, escape_attr};
use crate::node::{NodeBase, fragment_id};
use crate::syn::SynGraph;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// What an underspecification block ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UspKind {
    Frame,
    Fe,
}

impl UspKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UspKind::Frame => "frame",
            UspKind::Fe => "fe",
        }
    }
}

/// A sentence-level flag: a type with an optional parameter and an
/// optional free-text payload. Flags are compared as exact triples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceFlag {
    pub flag_type: String,
    pub param: Option<String>,
    pub text: Option<String>,
}

/// A frame: a name, at most one target, and any number of frame
/// elements. FE membership is kept as an ordered ID list.
#[derive(Debug, Clone)]
pub struct FrameNode {
    base: NodeBase,
    target: Option<String>,
    fe_ids: Vec<String>,
    flags: Vec<String>,
    usp_blocks: Vec<String>,
}

impl FrameNode {
    fn new(base: NodeBase) -> Self {
        Self {
            base,
            target: None,
            fe_ids: Vec::new(),
            flags: Vec::new(),
            usp_blocks: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.base.id()
    }

    pub fn name(&self) -> Option<&str> {
        self.base.attribute("name")
    }

    /// ID of the target FE, if the frame has one yet.
    pub fn target_id(&self) -> Option<&str> {
        if self.target.is_none() {
            tracing::warn!(frame = %self.id(), "frame without a target");
        }
        self.target.as_deref()
    }

    /// IDs of all FEs of this frame, target included, in order.
    pub fn fe_ids(&self) -> &[String] {
        &self.fe_ids
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn add_flag(&mut self, name: impl Into<String>) {
        self.flags.push(name.into());
    }

    pub fn remove_flag(&mut self, name: &str) -> bool {
        let before = self.flags.len();
        self.flags.retain(|f| f != name);
        self.flags.len() != before
    }

    /// IDs of the underspecification blocks this frame belongs to.
    pub fn usp_blocks(&self) -> &[String] {
        &self.usp_blocks
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.base.attribute(name)
    }

    pub fn base(&self) -> &NodeBase {
        &self.base
    }
}

/// A frame element (the target is one too). Points at syntactic nodes
/// by ID; the back-references live on the syntactic nodes themselves.
#[derive(Debug, Clone)]
pub struct FeNode {
    base: NodeBase,
    is_target: bool,
    frame_id: String,
    syn_nodes: Vec<String>,
    /// Extra attributes some pointer elements carry beyond the idref
    pointer_attrs: HashMap<String, BTreeMap<String, String>>,
    flags: Vec<String>,
    usp_blocks: Vec<String>,
}

impl FeNode {
    fn new(base: NodeBase, is_target: bool, frame_id: &str) -> Self {
        Self {
            base,
            is_target,
            frame_id: frame_id.to_string(),
            syn_nodes: Vec::new(),
            pointer_attrs: HashMap::new(),
            flags: Vec::new(),
            usp_blocks: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.base.id()
    }

    /// Role name: the fixed name `target` for targets, the `name`
    /// attribute otherwise, the empty string when unnamed.
    pub fn name(&self) -> &str {
        if self.is_target {
            return "target";
        }
        self.base.attribute("name").unwrap_or("")
    }

    pub fn is_target(&self) -> bool {
        self.is_target
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    /// IDs of the syntactic nodes this FE covers, in pointer order.
    pub fn syn_nodes(&self) -> &[String] {
        &self.syn_nodes
    }

    /// Extra attributes the pointer to a given syntactic node carried.
    pub fn pointer_attributes(&self, syn_id: &str) -> Option<&BTreeMap<String, String>> {
        self.pointer_attrs.get(syn_id)
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn add_flag(&mut self, name: impl Into<String>) {
        self.flags.push(name.into());
    }

    pub fn remove_flag(&mut self, name: &str) -> bool {
        let before = self.flags.len();
        self.flags.retain(|f| f != name);
        self.flags.len() != before
    }

    pub fn usp_blocks(&self) -> &[String] {
        &self.usp_blocks
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.base.attribute(name)
    }

    pub fn base(&self) -> &NodeBase {
        &self.base
    }
}

/// An underspecification block: a set of frames or of FEs that are
/// alternatives for one another. Membership is an explicit ID list on
/// both sides.
#[derive(Debug, Clone)]
pub struct UspNode {
    base: NodeBase,
    applies_to: UspKind,
    members: Vec<String>,
}

impl UspNode {
    pub fn id(&self) -> &str {
        self.base.id()
    }

    pub fn applies_to(&self) -> UspKind {
        self.applies_to
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// Any node of the semantic graph.
#[derive(Debug, Clone)]
pub enum SemNode {
    Frame(FrameNode),
    Fe(FeNode),
    Usp(UspNode),
}

impl SemNode {
    pub fn id(&self) -> &str {
        match self {
            SemNode::Frame(n) => n.id(),
            SemNode::Fe(n) => n.id(),
            SemNode::Usp(n) => n.id(),
        }
    }

    pub fn as_frame(&self) -> Option<&FrameNode> {
        match self {
            SemNode::Frame(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_fe(&self) -> Option<&FeNode> {
        match self {
            SemNode::Fe(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_usp(&self) -> Option<&UspNode> {
        match self {
            SemNode::Usp(n) => Some(n),
            _ => None,
        }
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        match self {
            SemNode::Frame(n) => &mut n.base,
            SemNode::Fe(n) => &mut n.base,
            SemNode::Usp(n) => &mut n.base,
        }
    }
}

/// The semantic annotation of one sentence.
#[derive(Debug, Clone)]
pub struct SemGraph {
    base: NodeBase,
    nodes: HashMap<String, SemNode>,
    frame_ids: Vec<String>,
    uspframe_ids: Vec<String>,
    uspfe_ids: Vec<String>,
    globals: Vec<SentenceFlag>,
    sentence_id: String,
    next_frame: u64,
    next_fe: u64,
    next_usp: u64,
}

impl SemGraph {
    pub(crate) fn empty(sentence_id: &str) -> Self {
        Self {
            base: NodeBase::element("sem", BTreeMap::new(), format!("{sentence_id}_sem")),
            nodes: HashMap::new(),
            frame_ids: Vec::new(),
            uspframe_ids: Vec::new(),
            uspfe_ids: Vec::new(),
            globals: Vec::new(),
            sentence_id: sentence_id.to_string(),
            next_frame: 0,
            next_fe: 0,
            next_usp: 0,
        }
    }

    /// Build the semantic graph from the `sem` element of a sentence.
    /// FE pointers are resolved against the syntax graph; pointers into
    /// other sentences create immutable placeholders there.
    pub(crate) fn from_fragment(
        frag: Option<&Fragment>,
        sentence_id: &str,
        syn: &mut SynGraph,
    ) -> Result<Self> {
        let mut sem = Self::empty(sentence_id);
        let Some(frag) = frag else {
            return Ok(sem);
        };
        sem.base = NodeBase::from_fragment(frag, format!("{sentence_id}_sem"))?;

        for child in frag.children_and_text()? {
            match child.name() {
                Some("frames") => sem.parse_frames(&child, syn)?,
                Some("usp") => sem.parse_usp(&child)?,
                Some("globals") => sem.parse_globals(&child)?,
                // splitwords have already gone into the syntax graph;
                // the original element is kept for verbatim re-emission
                _ => sem.base.add_kith(child),
            }
        }
        Ok(sem)
    }

    pub fn frames(&self) -> impl Iterator<Item = &FrameNode> {
        self.frame_ids
            .iter()
            .filter_map(|id| self.nodes.get(id).and_then(SemNode::as_frame))
    }

    pub fn frame(&self, id: &str) -> Option<&FrameNode> {
        self.nodes.get(id).and_then(SemNode::as_frame)
    }

    pub fn fe(&self, id: &str) -> Option<&FeNode> {
        self.nodes.get(id).and_then(SemNode::as_fe)
    }

    pub fn node(&self, id: &str) -> Option<&SemNode> {
        self.nodes.get(id)
    }

    pub fn usp_frame_blocks(&self) -> impl Iterator<Item = &UspNode> {
        self.uspframe_ids
            .iter()
            .filter_map(|id| self.nodes.get(id).and_then(SemNode::as_usp))
    }

    pub fn usp_fe_blocks(&self) -> impl Iterator<Item = &UspNode> {
        self.uspfe_ids
            .iter()
            .filter_map(|id| self.nodes.get(id).and_then(SemNode::as_usp))
    }

    pub fn globals(&self) -> &[SentenceFlag] {
        &self.globals
    }

    pub fn add_global(&mut self, flag: SentenceFlag) {
        self.globals.push(flag);
    }

    /// Remove the first flag matching the exact triple.
    pub fn remove_global(&mut self, flag: &SentenceFlag) -> bool {
        match self.globals.iter().position(|g| g == flag) {
            Some(i) => {
                self.globals.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn frame_flag(&mut self, frame_id: &str, name: &str) -> Result<()> {
        match self.nodes.get_mut(frame_id) {
            Some(SemNode::Frame(f)) => {
                f.add_flag(name);
                Ok(())
            }
            _ => Err(self.not_a(frame_id, "frame")),
        }
    }

    pub fn fe_flag(&mut self, fe_id: &str, name: &str) -> Result<()> {
        match self.nodes.get_mut(fe_id) {
            Some(SemNode::Fe(f)) => {
                f.add_flag(name);
                Ok(())
            }
            _ => Err(self.not_a(fe_id, "frame element")),
        }
    }

    /// Create a new frame. IDs are synthesized from a counter when not
    /// given; given IDs are prefixed with the sentence ID.
    pub fn add_frame(&mut self, name: &str, id: Option<&str>) -> Result<String> {
        let frame_id = match id {
            Some(suffix) => format!("{}_{}", self.sentence_id, suffix),
            None => self.synth_id("f"),
        };
        let mut attrs = BTreeMap::new();
        attrs.insert("id".to_string(), frame_id.clone());
        attrs.insert("name".to_string(), name.to_string());
        let frame = FrameNode::new(NodeBase::element("frame", attrs, &frame_id));
        self.frame_ids.push(frame_id.clone());
        self.nodes.insert(frame_id.clone(), SemNode::Frame(frame));
        Ok(frame_id)
    }

    /// Create a frame element under a frame, covering the given
    /// syntactic nodes. The name `target` creates the frame's target;
    /// a second target is fatal. All syntactic nodes must exist.
    pub fn add_fe(
        &mut self,
        syn: &mut SynGraph,
        frame_id: &str,
        name: &str,
        syn_node_ids: &[String],
        id: Option<&str>,
    ) -> Result<String> {
        let is_target = name == "target";
        match self.nodes.get(frame_id) {
            Some(SemNode::Frame(f)) => {
                if is_target && f.target.is_some() {
                    return Err(Error::DuplicateTarget(frame_id.to_string()));
                }
            }
            _ => return Err(self.not_a(frame_id, "frame")),
        }
        for syn_id in syn_node_ids {
            if !syn.contains(syn_id) {
                return Err(Error::UnknownNode {
                    sentence: self.sentence_id.clone(),
                    id: syn_id.clone(),
                    context: format!("new FE {name} of frame {frame_id}"),
                });
            }
        }

        let fe_id = match id {
            Some(suffix) => format!("{}_{}", self.sentence_id, suffix),
            None => self.synth_fe_id(frame_id),
        };
        let mut attrs = BTreeMap::new();
        attrs.insert("id".to_string(), fe_id.clone());
        let element_name = if is_target {
            "target"
        } else {
            attrs.insert("name".to_string(), name.to_string());
            "fe"
        };
        let mut fe = FeNode::new(
            NodeBase::element(element_name, attrs, &fe_id),
            is_target,
            frame_id,
        );
        for syn_id in syn_node_ids {
            fe.syn_nodes.push(syn_id.clone());
            if let Some(node) = syn.node_mut(syn_id) {
                node.add_sem_ref(&fe_id);
            }
        }
        if let Some(SemNode::Frame(f)) = self.nodes.get_mut(frame_id) {
            if is_target {
                f.target = Some(fe_id.clone());
            }
            f.fe_ids.push(fe_id.clone());
        }
        self.nodes.insert(fe_id.clone(), SemNode::Fe(fe));
        Ok(fe_id)
    }

    /// Remove a frame element: detach it from its frame, clear the
    /// back-references on the syntactic nodes, and drop it from any
    /// underspecification blocks.
    pub fn remove_fe(&mut self, syn: &mut SynGraph, fe_id: &str) -> Result<()> {
        let fe = match self.nodes.remove(fe_id) {
            Some(SemNode::Fe(fe)) => fe,
            Some(other) => {
                self.nodes.insert(fe_id.to_string(), other);
                return Err(self.not_a(fe_id, "frame element"));
            }
            None => return Err(self.not_a(fe_id, "frame element")),
        };
        if let Some(SemNode::Frame(f)) = self.nodes.get_mut(&fe.frame_id) {
            f.fe_ids.retain(|id| id != fe_id);
            if f.target.as_deref() == Some(fe_id) {
                f.target = None;
            }
        }
        for syn_id in &fe.syn_nodes {
            if let Some(node) = syn.node_mut(syn_id) {
                node.remove_sem_ref(fe_id);
            }
        }
        for block_id in &fe.usp_blocks {
            if let Some(SemNode::Usp(block)) = self.nodes.get_mut(block_id) {
                block.members.retain(|m| m != fe_id);
            }
        }
        Ok(())
    }

    /// Remove a frame and all its frame elements.
    pub fn remove_frame(&mut self, syn: &mut SynGraph, frame_id: &str) -> Result<()> {
        let fe_ids = match self.nodes.get(frame_id) {
            Some(SemNode::Frame(f)) => f.fe_ids.clone(),
            _ => return Err(self.not_a(frame_id, "frame")),
        };
        for fe_id in fe_ids {
            self.remove_fe(syn, &fe_id)?;
        }
        if let Some(SemNode::Frame(frame)) = self.nodes.remove(frame_id) {
            for block_id in &frame.usp_blocks {
                if let Some(SemNode::Usp(block)) = self.nodes.get_mut(block_id) {
                    block.members.retain(|m| m != frame_id);
                }
            }
        }
        self.frame_ids.retain(|id| id != frame_id);
        Ok(())
    }

    /// Create an empty underspecification block.
    pub fn add_usp(&mut self, applies_to: UspKind) -> String {
        let block_id = self.synth_id("usp");
        let block = UspNode {
            base: NodeBase::element("uspblock", BTreeMap::new(), &block_id),
            applies_to,
            members: Vec::new(),
        };
        match applies_to {
            UspKind::Frame => self.uspframe_ids.push(block_id.clone()),
            UspKind::Fe => self.uspfe_ids.push(block_id.clone()),
        }
        self.nodes.insert(block_id.clone(), SemNode::Usp(block));
        block_id
    }

    /// Add a frame or FE to a block. The member's kind must match what
    /// the block ranges over; membership marks the member `usp=yes`.
    pub fn usp_add_member(&mut self, block_id: &str, member_id: &str) -> Result<()> {
        let applies_to = match self.nodes.get(block_id) {
            Some(SemNode::Usp(b)) => b.applies_to,
            _ => return Err(self.not_a(block_id, "underspecification block")),
        };
        let member_ok = match (applies_to, self.nodes.get(member_id)) {
            (UspKind::Frame, Some(SemNode::Frame(_))) => true,
            (UspKind::Fe, Some(SemNode::Fe(_))) => true,
            _ => false,
        };
        if !member_ok {
            return Err(self.not_a(member_id, applies_to.as_str()));
        }

        if let Some(member) = self.nodes.get_mut(member_id) {
            member.base_mut().set_attribute("usp", "yes")?;
            match member {
                SemNode::Frame(f) => f.usp_blocks.push(block_id.to_string()),
                SemNode::Fe(f) => f.usp_blocks.push(block_id.to_string()),
                SemNode::Usp(_) => {}
            }
        }
        if let Some(SemNode::Usp(block)) = self.nodes.get_mut(block_id) {
            block.members.push(member_id.to_string());
        }
        Ok(())
    }

    /// Drop a member from a block. The `usp` attribute comes off only
    /// when the member belongs to no block at all anymore.
    pub fn usp_remove_member(&mut self, block_id: &str, member_id: &str) -> Result<()> {
        match self.nodes.get_mut(block_id) {
            Some(SemNode::Usp(block)) => block.members.retain(|m| m != member_id),
            _ => return Err(self.not_a(block_id, "underspecification block")),
        }
        if let Some(member) = self.nodes.get_mut(member_id) {
            let remaining = match member {
                SemNode::Frame(f) => {
                    f.usp_blocks.retain(|b| b != block_id);
                    f.usp_blocks.len()
                }
                SemNode::Fe(f) => {
                    f.usp_blocks.retain(|b| b != block_id);
                    f.usp_blocks.len()
                }
                SemNode::Usp(_) => 0,
            };
            if remaining == 0 {
                member.base_mut().del_attribute("usp");
            }
        }
        Ok(())
    }

    /// Remove a whole block, releasing all its members.
    pub fn remove_usp(&mut self, block_id: &str) -> Result<()> {
        let members = match self.nodes.get(block_id) {
            Some(SemNode::Usp(b)) => b.members.clone(),
            _ => return Err(self.not_a(block_id, "underspecification block")),
        };
        for member_id in members {
            self.usp_remove_member(block_id, &member_id)?;
        }
        self.nodes.remove(block_id);
        self.uspframe_ids.retain(|id| id != block_id);
        self.uspfe_ids.retain(|id| id != block_id);
        Ok(())
    }

    /// Drop all frames, FEs, blocks and sentence flags. Preserved
    /// unrecognized markup stays.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.frame_ids.clear();
        self.uspframe_ids.clear();
        self.uspfe_ids.clear();
        self.globals.clear();
    }

    /// Serialize the `sem` element.
    pub fn to_markup(&self) -> String {
        let mut s = self.base.open_tag();
        if !self.globals.is_empty() {
            s.push_str("<globals>\n");
            for flag in &self.globals {
                s.push_str("<global type='");
                s.push_str(&escape_attr(&flag.flag_type));
                s.push('\'');
                if let Some(param) = &flag.param {
                    s.push_str(" param='");
                    s.push_str(&escape_attr(param));
                    s.push('\'');
                }
                match &flag.text {
                    Some(text) => s.push_str(&format!(">{text}</global>\n")),
                    None => s.push_str("/>\n"),
                }
            }
            s.push_str("</globals>\n");
        }
        if !self.frame_ids.is_empty() {
            s.push_str("<frames>\n");
            for frame in self.frames() {
                s.push_str(&self.frame_markup(frame));
            }
            s.push_str("</frames>\n");
        }
        if !self.uspframe_ids.is_empty() || !self.uspfe_ids.is_empty() {
            s.push_str("<usp>\n<uspframes>\n");
            for block in self.usp_frame_blocks() {
                s.push_str(&self.usp_markup(block));
            }
            s.push_str("</uspframes>\n<uspfes>\n");
            for block in self.usp_fe_blocks() {
                s.push_str(&self.usp_markup(block));
            }
            s.push_str("</uspfes>\n</usp>\n");
        }
        s.push_str(&self.base.kith_markup());
        s.push_str(&self.base.close_tag());
        s
    }

    fn frame_markup(&self, frame: &FrameNode) -> String {
        let mut s = frame.base.open_tag();
        for fe_id in &frame.fe_ids {
            if let Some(fe) = self.fe(fe_id) {
                s.push_str(&self.fe_markup(fe));
            }
        }
        for flag in &frame.flags {
            s.push_str(&format!("<flag name='{}'/>\n", escape_attr(flag)));
        }
        s.push_str(&frame.base.kith_markup());
        s.push_str(&frame.base.close_tag());
        s
    }

    fn fe_markup(&self, fe: &FeNode) -> String {
        let mut s = fe.base.open_tag();
        for syn_id in &fe.syn_nodes {
            s.push_str(&format!("<fenode idref='{}'", escape_attr(syn_id)));
            if let Some(extra) = fe.pointer_attrs.get(syn_id) {
                for (attr, value) in extra {
                    s.push_str(&format!(" {}='{}'", attr, escape_attr(value)));
                }
            }
            s.push_str("/>\n");
        }
        for flag in &fe.flags {
            s.push_str(&format!("<flag name='{}'/>\n", escape_attr(flag)));
        }
        s.push_str(&fe.base.kith_markup());
        s.push_str(&fe.base.close_tag());
        s
    }

    fn usp_markup(&self, block: &UspNode) -> String {
        let mut s = block.base.open_tag();
        for member in &block.members {
            s.push_str(&format!("<uspitem idref='{}'/>\n", escape_attr(member)));
        }
        s.push_str(&block.base.kith_markup());
        s.push_str(&block.base.close_tag());
        s
    }

    fn parse_frames(&mut self, container: &Fragment, syn: &mut SynGraph) -> Result<()> {
        for frame_frag in container.children_and_text()? {
            if frame_frag.name() != Some("frame") {
                tracing::warn!("additional material in s/sem/frames will be ignored: {frame_frag}");
                continue;
            }
            let frame_id = match fragment_id(&frame_frag)? {
                Some(id) => id,
                None => self.synth_id("f"),
            };
            let mut frame = FrameNode::new(NodeBase::from_fragment(&frame_frag, &frame_id)?);
            let mut fes = Vec::new();
            for child in frame_frag.children_and_text()? {
                match child.name() {
                    Some("target") | Some("fe") => {
                        let is_target = child.name() == Some("target");
                        if is_target && frame.target.is_some() {
                            return Err(Error::DuplicateTarget(frame_id));
                        }
                        let fe = self.parse_fe(&child, &frame_id, is_target, syn)?;
                        if is_target {
                            frame.target = Some(fe.id().to_string());
                        }
                        frame.fe_ids.push(fe.id().to_string());
                        fes.push(fe);
                    }
                    Some("flag") => match child.attribute("name")? {
                        Some(name) => frame.flags.push(name),
                        None => tracing::warn!("flag without a name on frame {frame_id}"),
                    },
                    _ => frame.base.add_kith(child),
                }
            }
            for fe in fes {
                self.nodes.insert(fe.id().to_string(), SemNode::Fe(fe));
            }
            self.frame_ids.push(frame_id.clone());
            self.nodes.insert(frame_id, SemNode::Frame(frame));
        }
        Ok(())
    }

    fn parse_fe(
        &mut self,
        frag: &Fragment,
        frame_id: &str,
        is_target: bool,
        syn: &mut SynGraph,
    ) -> Result<FeNode> {
        let fe_id = match fragment_id(frag)? {
            Some(id) => id,
            None => self.synth_fe_id(frame_id),
        };
        let mut fe = FeNode::new(NodeBase::from_fragment(frag, &fe_id)?, is_target, frame_id);
        for child in frag.children_and_text()? {
            match child.name() {
                Some("fenode") => {
                    let syn_id = fragment_id(&child)?.ok_or_else(|| {
                        Error::Parse(format!("fenode without an idref: {child}"))
                    })?;
                    // a pointer into another sentence gets a placeholder
                    if !syn.contains(&syn_id) {
                        syn.insert_outside(&syn_id);
                    }
                    let mut extra = child.attributes()?;
                    extra.remove("idref");
                    if !extra.is_empty() {
                        fe.pointer_attrs.insert(syn_id.clone(), extra);
                    }
                    if let Some(node) = syn.node_mut(&syn_id) {
                        node.add_sem_ref(&fe_id);
                    }
                    fe.syn_nodes.push(syn_id);
                }
                Some("flag") => match child.attribute("name")? {
                    Some(name) => fe.flags.push(name),
                    None => tracing::warn!("flag without a name on FE {fe_id}"),
                },
                _ => fe.base.add_kith(child),
            }
        }
        Ok(fe)
    }

    fn parse_usp(&mut self, container: &Fragment) -> Result<()> {
        for group in container.children_and_text()? {
            let applies_to = match group.name() {
                Some("uspframes") => UspKind::Frame,
                Some("uspfes") => UspKind::Fe,
                _ => {
                    tracing::warn!("additional material in s/sem/usp will be ignored: {group}");
                    continue;
                }
            };
            for block_frag in group.children_and_text()? {
                if block_frag.name() != Some("uspblock") {
                    tracing::warn!("unexpected element in usp group will be ignored: {block_frag}");
                    continue;
                }
                let block_id = self.add_usp(applies_to);
                for item in block_frag.children_and_text()? {
                    if item.name() != Some("uspitem") {
                        if let Some(SemNode::Usp(block)) = self.nodes.get_mut(&block_id) {
                            block.base.add_kith(item);
                        }
                        continue;
                    }
                    let raw_id = fragment_id(&item)?.ok_or_else(|| {
                        Error::Parse(format!("uspitem without an idref: {item}"))
                    })?;
                    let member_id = normalize_usp_idref(&raw_id);
                    if self.nodes.contains_key(&member_id) {
                        self.usp_add_member(&block_id, &member_id)?;
                    } else {
                        tracing::error!(
                            sentence = %self.sentence_id,
                            "underspecification member {member_id} not found, skipping"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_globals(&mut self, container: &Fragment) -> Result<()> {
        for global in container.children_and_text()? {
            if global.name() != Some("global") {
                tracing::warn!("additional material in s/sem/globals will be ignored: {global}");
                continue;
            }
            let Some(flag_type) = global.attribute("type")? else {
                tracing::warn!("global without a type will be ignored: {global}");
                continue;
            };
            let param = global.attribute("param")?;
            let text: String = global
                .children_and_text()?
                .into_iter()
                .filter(|c| c.is_text())
                .map(|c| c.raw().trim().to_string())
                .collect::<Vec<_>>()
                .join(" ");
            self.globals.push(SentenceFlag {
                flag_type,
                param,
                text: if text.is_empty() { None } else { Some(text) },
            });
        }
        Ok(())
    }

    fn synth_id(&mut self, infix: &str) -> String {
        let counter = match infix {
            "f" => &mut self.next_frame,
            _ => &mut self.next_usp,
        };
        loop {
            let candidate = format!("{}_{}{}", self.sentence_id, infix, counter);
            *counter += 1;
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn synth_fe_id(&mut self, frame_id: &str) -> String {
        loop {
            let candidate = format!("{}_fe{}", frame_id, self.next_fe);
            self.next_fe += 1;
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn not_a(&self, id: &str, expected: &'static str) -> Error {
        Error::NodeKind {
            id: id.to_string(),
            expected,
        }
    }
}

/// Normalize an underspecification idref to the sentence-level ID
/// convention: everything through the last `_s` is replaced by `s`.
fn normalize_usp_idref(id: &str) -> String {
    match id.rfind("_s") {
        Some(pos) => format!("s{}", &id[pos + 2..]),
        None => id.to_string(),
    }
}
