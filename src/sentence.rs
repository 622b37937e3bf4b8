//! Sentence - one annotated sentence, syntax and semantics together
//!
//! The sentence owns both graphs and is the only place where the two
//! are mutated in step: FE pointers and their back-references, and the
//! splitword parts that arrive in the semantic section but live in the
//! syntax graph.

use crate::markup::Fragment;
use crate::node::NodeBase;
use crate::order;
use crate::sem::{FeNode, FrameNode, SemGraph, SentenceFlag, UspKind, UspNode};
use crate::syn::{SynGraph, SynKind, SynNode};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// One sentence of an annotated corpus.
#[derive(Debug, Clone)]
pub struct Sentence {
    base: NodeBase,
    syn: SynGraph,
    sem: SemGraph,
}

impl Sentence {
    /// Parse a sentence from its markup element.
    ///
    /// The sentence must carry an `id` attribute; everything inside it
    /// that is not the syntax or semantics section is preserved
    /// verbatim.
    pub fn parse(markup: &str) -> Result<Sentence> {
        let frag = Fragment::element(markup)?;
        if frag.name() != Some("s") {
            return Err(Error::Parse(format!(
                "expected an s element, got: {:?}",
                frag.name()
            )));
        }
        let id = frag
            .attribute("id")?
            .ok_or_else(|| Error::Parse("sentence without an id attribute".to_string()))?;
        let mut base = NodeBase::from_fragment(&frag, &id)?;

        let mut graph_frag = None;
        let mut sem_frag = None;
        for child in frag.children_and_text()? {
            match child.name() {
                Some("graph") if graph_frag.is_none() => graph_frag = Some(child),
                Some("sem") if sem_frag.is_none() => sem_frag = Some(child),
                _ => base.add_kith(child),
            }
        }

        let mut syn = SynGraph::from_fragment(graph_frag.as_ref(), &id)?;
        // splitwords live in the sem section but belong to the syntax graph
        if let Some(sem) = &sem_frag {
            if let Some(splitwords) = sem.first_child_matching("splitwords")? {
                syn.add_splitwords(&splitwords)?;
            }
        }
        let sem = SemGraph::from_fragment(sem_frag.as_ref(), &id, &mut syn)?;
        Ok(Sentence { base, syn, sem })
    }

    /// A fresh sentence with the given ID and no annotation.
    pub fn empty(id: &str) -> Sentence {
        let mut attrs = BTreeMap::new();
        attrs.insert("id".to_string(), id.to_string());
        Sentence {
            base: NodeBase::element("s", attrs, id),
            syn: SynGraph::empty(id),
            sem: SemGraph::empty(id),
        }
    }

    pub fn id(&self) -> &str {
        self.base.id()
    }

    pub fn syn(&self) -> &SynGraph {
        &self.syn
    }

    pub fn sem(&self) -> &SemGraph {
        &self.sem
    }

    // ---- syntax ----

    pub fn syn_node(&self, id: &str) -> Option<&SynNode> {
        self.syn.node(id)
    }

    pub fn terminals(&self) -> Vec<&SynNode> {
        self.syn.terminals()
    }

    pub fn terminals_sorted(&self) -> Vec<&SynNode> {
        self.syn.terminals_sorted()
    }

    pub fn nonterminals(&self) -> Vec<&SynNode> {
        self.syn.nonterminals()
    }

    pub fn syn_roots(&self) -> Vec<&SynNode> {
        self.syn.roots()
    }

    pub fn yield_nodes(&self, id: &str) -> Vec<String> {
        self.syn.yield_nodes(id)
    }

    pub fn add_syn_node(
        &mut self,
        kind: SynKind,
        cat: Option<&str>,
        word: Option<&str>,
        pos: Option<&str>,
        id: Option<&str>,
    ) -> Result<String> {
        self.syn.add_node(kind, cat, word, pos, id)
    }

    pub fn remove_syn_node(&mut self, id: &str) -> Result<()> {
        self.syn.remove_node(id)
    }

    // ---- semantics ----

    pub fn frames(&self) -> impl Iterator<Item = &FrameNode> {
        self.sem.frames()
    }

    pub fn frame(&self, id: &str) -> Option<&FrameNode> {
        self.sem.frame(id)
    }

    pub fn fe(&self, id: &str) -> Option<&FeNode> {
        self.sem.fe(id)
    }

    pub fn usp_frame_blocks(&self) -> impl Iterator<Item = &UspNode> {
        self.sem.usp_frame_blocks()
    }

    pub fn usp_fe_blocks(&self) -> impl Iterator<Item = &UspNode> {
        self.sem.usp_fe_blocks()
    }

    pub fn add_frame(&mut self, name: &str, id: Option<&str>) -> Result<String> {
        self.sem.add_frame(name, id)
    }

    pub fn remove_frame(&mut self, frame_id: &str) -> Result<()> {
        self.sem.remove_frame(&mut self.syn, frame_id)
    }

    pub fn add_fe(
        &mut self,
        frame_id: &str,
        name: &str,
        syn_node_ids: &[String],
        id: Option<&str>,
    ) -> Result<String> {
        self.sem.add_fe(&mut self.syn, frame_id, name, syn_node_ids, id)
    }

    pub fn remove_fe(&mut self, fe_id: &str) -> Result<()> {
        self.sem.remove_fe(&mut self.syn, fe_id)
    }

    pub fn add_usp(&mut self, applies_to: UspKind) -> String {
        self.sem.add_usp(applies_to)
    }

    pub fn remove_usp(&mut self, block_id: &str) -> Result<()> {
        self.sem.remove_usp(block_id)
    }

    pub fn add_to_usp(&mut self, block_id: &str, member_id: &str) -> Result<()> {
        self.sem.usp_add_member(block_id, member_id)
    }

    pub fn remove_from_usp(&mut self, block_id: &str, member_id: &str) -> Result<()> {
        self.sem.usp_remove_member(block_id, member_id)
    }

    pub fn frame_flag(&mut self, frame_id: &str, name: &str) -> Result<()> {
        self.sem.frame_flag(frame_id, name)
    }

    pub fn fe_flag(&mut self, fe_id: &str, name: &str) -> Result<()> {
        self.sem.fe_flag(fe_id, name)
    }

    pub fn flags(&self) -> &[SentenceFlag] {
        self.sem.globals()
    }

    pub fn add_flag(&mut self, flag: SentenceFlag) {
        self.sem.add_global(flag);
    }

    pub fn remove_flag(&mut self, flag: &SentenceFlag) -> bool {
        self.sem.remove_global(flag)
    }

    /// Drop the whole semantic annotation, leaving the parse tree and
    /// any preserved unrecognized markup untouched.
    pub fn remove_semantics(&mut self) {
        self.sem.clear();
        self.syn.clear_all_sem_refs();
    }

    // ---- rendering ----

    /// Serialize the sentence back to its markup element.
    pub fn to_markup(&self) -> String {
        let mut s = self.base.open_tag();
        s.push_str(&self.syn.to_markup());
        s.push_str(&self.sem.to_markup());
        s.push_str(&self.base.kith_markup());
        s.push_str(&self.base.close_tag());
        s
    }

    /// The words covered by an FE, in sentence order.
    pub fn words_for_fe(&self, fe_id: &str) -> Result<String> {
        let fe = self.sem.fe(fe_id).ok_or_else(|| Error::NodeKind {
            id: fe_id.to_string(),
            expected: "frame element",
        })?;
        Ok(self.words_for_nodes(fe.syn_nodes()))
    }

    /// The words under a set of syntactic nodes, in sentence order.
    ///
    /// Splitword parts collapse back to their terminal's word when all
    /// parts of that terminal are covered; otherwise the part words
    /// appear individually.
    pub fn words_for_nodes(&self, node_ids: &[String]) -> String {
        let mut leaves: Vec<String> = Vec::new();
        for id in node_ids {
            if self.syn.node(id).is_some() {
                leaves.extend(self.syn.yield_nodes(id));
            } else {
                tracing::warn!(sentence = %self.id(), "unknown node {id} in word rendering");
            }
        }
        leaves.sort_by_key(|id| {
            let splitword = self
                .syn
                .node(id)
                .map(|n| n.is_splitword())
                .unwrap_or(false);
            order::position_key(id, splitword)
        });
        leaves.dedup();

        let leaf_set: HashSet<&str> = leaves.iter().map(String::as_str).collect();
        let mut collapsed: HashSet<String> = HashSet::new();
        let mut words = Vec::new();
        for id in &leaves {
            let Some(node) = self.syn.node(id) else { continue };
            if node.is_splitword() {
                if let Some(pid) = node.parent_id() {
                    let parent = self.syn.node(pid);
                    let all_parts_covered = parent
                        .map(|p| {
                            p.child_ids()
                                .filter(|c| {
                                    self.syn
                                        .node(c)
                                        .map(|n| n.is_splitword())
                                        .unwrap_or(false)
                                })
                                .all(|c| leaf_set.contains(c))
                        })
                        .unwrap_or(false);
                    if all_parts_covered {
                        if collapsed.insert(pid.to_string()) {
                            if let Some(word) = parent.and_then(|p| p.word()) {
                                words.push(word.to_string());
                            }
                        }
                        continue;
                    }
                }
            }
            if let Some(word) = node.word() {
                words.push(word.to_string());
            }
        }
        words.join(" ")
    }

    /// Summary counts over the annotation.
    pub fn stats(&self) -> SentenceStats {
        let splitwords = self.syn.nodes().filter(|n| n.is_splitword()).count();
        let frames = self.sem.frames().count();
        let frame_elements = self
            .sem
            .frames()
            .map(|f| f.fe_ids().len())
            .sum::<usize>();
        let usp_blocks = self.sem.usp_frame_blocks().count() + self.sem.usp_fe_blocks().count();
        SentenceStats {
            id: self.id().to_string(),
            terminals: self.syn.terminals().len(),
            nonterminals: self.syn.nonterminals().len(),
            splitwords,
            frames,
            frame_elements,
            usp_blocks,
            flags: self.sem.globals().len(),
        }
    }
}

/// Counts reported by `Sentence::stats`.
#[derive(Debug, Clone, Serialize)]
pub struct SentenceStats {
    pub id: String,
    pub terminals: usize,
    pub nonterminals: usize,
    pub splitwords: usize,
    pub frames: usize,
    pub frame_elements: usize,
    pub usp_blocks: usize,
    pub flags: usize,
}

impl fmt::Display for SentenceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} terminals, {} nonterminals, {} splitwords, {} frames, {} FEs, {} usp blocks, {} flags",
            self.id,
            self.terminals,
            self.nonterminals,
            self.splitwords,
            self.frames,
            self.frame_elements,
            self.usp_blocks,
            self.flags
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENT: &str = "<s id='s1'>\
<graph root='s1_500'>\
<terminals>\
<t id='s1_1' word='der' pos='ART'/>\
<t id='s1_2' word='Hund' pos='NN'/>\
<t id='s1_3' word='schl&apos;ft' pos='VVFIN'/>\
</terminals>\
<nonterminals>\
<nt id='s1_500' cat='S'><edge label='SB' idref='s1_501'/><edge label='HD' idref='s1_3'/></nt>\
<nt id='s1_501' cat='NP'><edge label='NK' idref='s1_1'/><edge label='NK' idref='s1_2'/></nt>\
</nonterminals>\
</graph>\
<sem>\
<frames>\
<frame id='s1_f1' name='Sleep'>\
<target id='s1_f1_t'><fenode idref='s1_3'/></target>\
<fe id='s1_f1_e1' name='Sleeper'><fenode idref='s1_501'/></fe>\
</frame>\
</frames>\
<wordtags><tag idref='s1_2' pos='noun'/></wordtags>\
</sem>\
<match score='0.8'/>\
</s>";

    #[test]
    fn test_parse_full_sentence() {
        let sent = Sentence::parse(SENT).unwrap();
        assert_eq!(sent.id(), "s1");
        assert_eq!(sent.terminals().len(), 3);
        assert_eq!(sent.nonterminals().len(), 2);
        assert_eq!(sent.frames().count(), 1);
        let roots: Vec<&str> = sent.syn_roots().iter().map(|n| n.id()).collect();
        assert_eq!(roots, vec!["s1_500"]);
        assert_eq!(sent.yield_nodes("s1_501"), vec!["s1_1", "s1_2"]);
    }

    #[test]
    fn test_roundtrip_preserves_structure_and_kith() {
        let sent = Sentence::parse(SENT).unwrap();
        let markup = sent.to_markup();
        // unrecognized elements survive verbatim
        assert!(markup.contains("<wordtags><tag idref='s1_2' pos='noun'/></wordtags>"));
        assert!(markup.contains("<match score='0.8'/>"));
        // entities pass through without decoding
        assert!(markup.contains("word='schl&apos;ft'"));

        let again = Sentence::parse(&markup).unwrap();
        assert_eq!(again.id(), "s1");
        assert_eq!(again.terminals().len(), 3);
        assert_eq!(again.frames().count(), 1);
        let frame = again.frame("s1_f1").unwrap();
        assert_eq!(frame.name(), Some("Sleep"));
        assert_eq!(frame.target_id(), Some("s1_f1_t"));
        // stability: a second rendering is identical
        assert_eq!(again.to_markup(), markup);
    }

    #[test]
    fn test_sentence_without_id_is_fatal() {
        assert!(matches!(
            Sentence::parse("<s><graph/></s>"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_empty_sentence_grows() {
        let mut sent = Sentence::empty("s7");
        let t = sent
            .add_syn_node(SynKind::Terminal, None, Some("hi"), Some("UH"), Some("1"))
            .unwrap();
        let frame = sent.add_frame("Greeting", None).unwrap();
        sent.add_fe(&frame, "target", &[t.clone()], None).unwrap();
        assert_eq!(sent.terminals().len(), 1);
        let markup = sent.to_markup();
        assert!(markup.contains("name='Greeting'"));
        assert!(markup.contains(&format!("<fenode idref='{t}'/>")));
    }

    #[test]
    fn test_words_for_fe_in_sentence_order() {
        let sent = Sentence::parse(SENT).unwrap();
        assert_eq!(sent.words_for_fe("s1_f1_e1").unwrap(), "der Hund");
        // whole clause through the root
        assert_eq!(
            sent.words_for_nodes(&["s1_500".to_string()]),
            "der Hund schl&apos;ft"
        );
    }

    #[test]
    fn test_words_collapse_complete_splitwords() {
        let markup = "<s id='s1'>\
<graph><terminals><t id='s1_1' word='zum' pos='APPRART'/><t id='s1_2' word='Haus' pos='NN'/></terminals>\
<nonterminals></nonterminals></graph>\
<sem><splitwords><splitword idref='s1_1'>\
<part id='s1_1_s1' word='zu'/><part id='s1_1_s2' word='dem'/>\
</splitword></splitwords></sem></s>";
        let sent = Sentence::parse(markup).unwrap();
        // both parts covered: the terminal's own word comes back
        assert_eq!(
            sent.words_for_nodes(&["s1_1_s1".to_string(), "s1_1_s2".to_string()]),
            "zum"
        );
        // one part only: the part word stands alone
        assert_eq!(sent.words_for_nodes(&["s1_1_s2".to_string()]), "dem");
        // splitwords element round-trips verbatim
        assert!(sent.to_markup().contains("<part id='s1_1_s1' word='zu'/>"));
    }

    #[test]
    fn test_remove_semantics_keeps_syntax() {
        let mut sent = Sentence::parse(SENT).unwrap();
        sent.remove_semantics();
        assert_eq!(sent.frames().count(), 0);
        assert_eq!(sent.terminals().len(), 3);
        assert!(sent.syn_node("s1_3").unwrap().sem_refs().is_empty());
    }

    #[test]
    fn test_stats() {
        let sent = Sentence::parse(SENT).unwrap();
        let stats = sent.stats();
        assert_eq!(stats.terminals, 3);
        assert_eq!(stats.nonterminals, 2);
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.frame_elements, 2);
        let rendered = format!("{stats}");
        assert!(rendered.contains("3 terminals"));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["frames"], 1);
    }
}
