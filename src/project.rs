//! Maximal-constituent projection
//!
//! Given a set of annotated word nodes, find the smallest set of
//! constituents whose combined yield covers exactly those words.
//! Punctuation never counts against a constituent, and splitword parts
//! in the input pass through atomically since no constituent's yield
//! contains them.
//!
//! Two variants: a top-down worklist walk, and a recursive tri-state
//! classification that can optionally absorb a single missing child or
//! consult a caller-supplied acceptance hook.

use crate::sentence::Sentence;
use crate::syn::SynGraph;
use std::collections::{HashSet, VecDeque};

/// Top-down projection. Starting from the roots: a constituent whose
/// yield is fully inside the word set is accepted and its words are
/// spent; a constituent with partial overlap is expanded into its
/// children. Words no constituent accounts for come back as themselves.
pub fn max_constituents_for_nodes(
    sentence: &Sentence,
    node_ids: &[String],
    ignore_empty_terminals: bool,
) -> Vec<String> {
    let syn = sentence.syn();
    let (splitwords, mut words) = split_input(sentence, node_ids);

    let mut constituents = splitwords;
    let mut queue: VecDeque<String> = syn.roots().iter().map(|n| n.id().to_string()).collect();
    while let Some(node_id) = queue.pop_front() {
        let covered: Vec<String> = syn
            .yield_nodes(&node_id)
            .into_iter()
            .filter(|yid| !excluded(syn, yid, ignore_empty_terminals))
            .collect();
        if covered.is_empty() {
            continue;
        }
        if covered.iter().all(|yid| words.contains(yid)) {
            constituents.push(node_id);
            words.retain(|w| !covered.contains(w));
        } else if covered.iter().any(|yid| words.contains(yid)) {
            if let Some(node) = syn.node(&node_id) {
                queue.extend(
                    node.child_ids()
                        .filter(|c| !is_splitword(syn, c))
                        .map(str::to_string),
                );
            }
        }
    }
    constituents.extend(words);
    constituents
}

/// Recursive projection. Every node is classified as inside, outside or
/// ignorable; an inside node absorbs its whole subtree. With
/// `include_single_missing_children`, a node with exactly one outside
/// child among at least two inside ones still counts as inside. The
/// `accept_anyway` hook gets a final say over nodes about to be
/// classified outside, seeing the node ID, its inside children and its
/// outside children. Words no accepted constituent covers come back as
/// themselves.
pub fn max_constituents_smc(
    sentence: &Sentence,
    node_ids: &[String],
    include_single_missing_children: bool,
    ignore_empty_terminals: bool,
    accept_anyway: Option<&dyn Fn(&Sentence, &str, &[String], &[String]) -> bool>,
) -> Vec<String> {
    let syn = sentence.syn();
    let (splitwords, words) = split_input(sentence, node_ids);

    let walk = SmcWalk {
        sentence,
        words: words.iter().cloned().collect(),
        include_single_missing_children,
        ignore_empty_terminals,
        accept_anyway,
    };
    let mut constituents = splitwords;
    for root in syn.roots() {
        let (cover, gathered) = walk.classify(root.id());
        match cover {
            Cover::In => constituents.push(root.id().to_string()),
            Cover::Out | Cover::Ignore => constituents.extend(gathered),
        }
    }

    // words no constituent accounts for come back as themselves;
    // nodes outside the dominance tree are never reached from a root
    let mut covered: HashSet<String> = HashSet::new();
    for id in &constituents {
        covered.extend(syn.yield_nodes(id));
    }
    for word in words {
        if !covered.contains(&word) {
            constituents.push(word);
        }
    }
    constituents
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cover {
    In,
    Out,
    Ignore,
}

struct SmcWalk<'a> {
    sentence: &'a Sentence,
    words: HashSet<String>,
    include_single_missing_children: bool,
    ignore_empty_terminals: bool,
    accept_anyway: Option<&'a dyn Fn(&Sentence, &str, &[String], &[String]) -> bool>,
}

impl SmcWalk<'_> {
    /// Classify a subtree. The returned list holds the maximal inside
    /// constituents found beneath a node that itself ends up outside.
    fn classify(&self, id: &str) -> (Cover, Vec<String>) {
        let syn = self.sentence.syn();
        let Some(node) = syn.node(id) else {
            return (Cover::Ignore, Vec::new());
        };

        if node.is_terminal() || node.is_splitword() || node.is_outside_sentence() {
            // explicit membership wins over every exclusion
            if self.words.contains(id) {
                return (Cover::In, vec![id.to_string()]);
            }
            if node.is_outside_sentence() || node.is_punct() {
                return (Cover::Ignore, Vec::new());
            }
            if self.ignore_empty_terminals && node.word().map(str::is_empty).unwrap_or(true) {
                return (Cover::Ignore, Vec::new());
            }
            return (Cover::Out, Vec::new());
        }

        let mut inside_children = Vec::new();
        let mut outside_children = Vec::new();
        let mut gathered = Vec::new();
        for child_id in node.child_ids().filter(|c| !is_splitword(syn, c)) {
            let (cover, consts) = self.classify(child_id);
            match cover {
                Cover::In => {
                    inside_children.push(child_id.to_string());
                    gathered.extend(consts);
                }
                Cover::Out => {
                    outside_children.push(child_id.to_string());
                    gathered.extend(consts);
                }
                Cover::Ignore => {}
            }
        }

        if outside_children.is_empty() && !inside_children.is_empty() {
            return (Cover::In, vec![id.to_string()]);
        }
        if outside_children.is_empty() && inside_children.is_empty() {
            return (Cover::Ignore, Vec::new());
        }
        if self.include_single_missing_children
            && outside_children.len() == 1
            && inside_children.len() >= 2
        {
            return (Cover::In, vec![id.to_string()]);
        }
        if let Some(accept) = self.accept_anyway {
            if accept(self.sentence, id, &inside_children, &outside_children) {
                return (Cover::In, vec![id.to_string()]);
            }
        }
        (Cover::Out, gathered)
    }
}

/// Split the input into splitword parts (returned atomically) and the
/// word set proper: every other node is expanded to its yield with
/// punctuation dropped, so nonterminal inputs and inputs that cover
/// each other reduce to one flat set of leaves. Unknown IDs are
/// dropped with a warning.
fn split_input(sentence: &Sentence, node_ids: &[String]) -> (Vec<String>, Vec<String>) {
    let syn = sentence.syn();
    let mut splitwords = Vec::new();
    let mut words = Vec::new();
    let mut seen = HashSet::new();
    for id in node_ids {
        match syn.node(id) {
            Some(n) if n.is_splitword() => splitwords.push(id.clone()),
            Some(_) => {
                for yid in syn.yield_nodes(id) {
                    let punct = syn.node(&yid).map(|n| n.is_punct()).unwrap_or(false);
                    if punct {
                        continue;
                    }
                    if seen.insert(yid.clone()) {
                        words.push(yid);
                    }
                }
            }
            None => {
                tracing::warn!(
                    sentence = %sentence.id(),
                    "unknown node {id} in projection input, skipping"
                );
            }
        }
    }
    (splitwords, words)
}

fn excluded(syn: &SynGraph, id: &str, ignore_empty_terminals: bool) -> bool {
    match syn.node(id) {
        Some(n) => {
            n.is_punct()
                || (ignore_empty_terminals
                    && n.is_terminal()
                    && n.word().map(str::is_empty).unwrap_or(true))
        }
        None => true,
    }
}

fn is_splitword(syn: &SynGraph, id: &str) -> bool {
    syn.node(id).map(|n| n.is_splitword()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    // S(NP(t1 t2) VP(t3 NP2(t4 t5)) t6=",")
    fn sentence() -> Sentence {
        Sentence::parse(
            "<s id='s1'><graph root='s1_500'>\
<terminals>\
<t id='s1_1' word='the' pos='DT'/>\
<t id='s1_2' word='cat' pos='NN'/>\
<t id='s1_3' word='ate' pos='VB'/>\
<t id='s1_4' word='a' pos='DT'/>\
<t id='s1_5' word='mouse' pos='NN'/>\
<t id='s1_6' word=',' pos='$,'/>\
</terminals>\
<nonterminals>\
<nt id='s1_500' cat='S'><edge label='SB' idref='s1_501'/><edge label='-' idref='s1_502'/><edge label='-' idref='s1_6'/></nt>\
<nt id='s1_501' cat='NP'><edge label='-' idref='s1_1'/><edge label='-' idref='s1_2'/></nt>\
<nt id='s1_502' cat='VP'><edge label='HD' idref='s1_3'/><edge label='OA' idref='s1_503'/></nt>\
<nt id='s1_503' cat='NP'><edge label='-' idref='s1_4'/><edge label='-' idref='s1_5'/></nt>\
</nonterminals>\
</graph><sem/></s>",
        )
        .unwrap()
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn test_exact_constituent_is_projected() {
        let sent = sentence();
        let got = max_constituents_for_nodes(&sent, &ids(&["s1_1", "s1_2"]), false);
        assert_eq!(got, vec!["s1_501"]);
    }

    #[test]
    fn test_whole_sentence_projects_to_root_despite_punctuation() {
        let sent = sentence();
        let words = ids(&["s1_1", "s1_2", "s1_3", "s1_4", "s1_5"]);
        assert_eq!(max_constituents_for_nodes(&sent, &words, false), vec!["s1_500"]);
        assert_eq!(
            max_constituents_smc(&sent, &words, false, false, None),
            vec!["s1_500"]
        );
    }

    #[test]
    fn test_discontinuous_words_come_back_piecewise() {
        let sent = sentence();
        // "the cat ... mouse": NP covers the first two, mouse stands alone
        let words = ids(&["s1_1", "s1_2", "s1_5"]);
        let expected = sorted(ids(&["s1_501", "s1_5"]));
        let got = sorted(max_constituents_for_nodes(&sent, &words, false));
        assert_eq!(got, expected);
        let got = sorted(max_constituents_smc(&sent, &words, false, false, None));
        assert_eq!(got, expected);
    }

    #[test]
    fn test_coverage_is_exact_and_disjoint() {
        let sent = sentence();
        let words = ids(&["s1_3", "s1_4", "s1_5"]);
        let got = max_constituents_for_nodes(&sent, &words, false);
        assert_eq!(got, vec!["s1_502"]);
        // yields of the result reproduce exactly the input words
        let mut covered: Vec<String> = got
            .iter()
            .flat_map(|id| sent.yield_nodes(id))
            .collect();
        covered.sort();
        assert_eq!(covered, sorted(words));
    }

    #[test]
    fn test_single_missing_child_absorbed_only_when_asked() {
        let sent = sentence();
        // VP has children ate + NP2; inside NP2 only "a" is missing
        let words = ids(&["s1_1", "s1_2", "s1_3", "s1_5"]);
        let strict = sorted(max_constituents_smc(&sent, &words, false, false, None));
        assert_eq!(strict, sorted(ids(&["s1_501", "s1_3", "s1_5"])));

        // NP2 = {a(out), mouse(in)}: one outside child but only one
        // inside child, so even smc leaves it apart
        let smc = sorted(max_constituents_smc(&sent, &words, true, false, None));
        assert_eq!(smc, strict);

        // S = {NP(in), VP(out), comma(ignored)}; with "ate" and "a"
        // missing nothing changes, but with only "a" missing the VP has
        // ate(in) + NP2(out) and S has NP(in) + VP(out)
        let words = ids(&["s1_1", "s1_2", "s1_3"]);
        let smc = sorted(max_constituents_smc(&sent, &words, true, false, None));
        assert_eq!(smc, sorted(ids(&["s1_501", "s1_3"])));
    }

    #[test]
    fn test_accept_anyway_hook_forces_inclusion() {
        let sent = sentence();
        let words = ids(&["s1_4"]);
        // without the hook: the bare terminal
        assert_eq!(
            max_constituents_smc(&sent, &words, false, false, None),
            vec!["s1_4"]
        );
        // hook accepts a partially covered NP
        let accept = |s: &Sentence, id: &str, ins: &[String], _outs: &[String]| {
            !ins.is_empty() && s.syn_node(id).and_then(|n| n.category()) == Some("NP")
        };
        let got = max_constituents_smc(&sent, &words, false, false, Some(&accept));
        assert_eq!(got, vec!["s1_503"]);
    }

    #[test]
    fn test_splitword_parts_pass_through() {
        let sent = Sentence::parse(
            "<s id='s1'><graph><terminals><t id='s1_1' word='zum' pos='APPRART'/></terminals>\
<nonterminals></nonterminals></graph>\
<sem><splitwords><splitword idref='s1_1'>\
<part id='s1_1_s1' word='zu'/><part id='s1_1_s2' word='dem'/>\
</splitword></splitwords></sem></s>",
        )
        .unwrap();
        let got = max_constituents_for_nodes(&sent, &ids(&["s1_1_s2"]), false);
        assert_eq!(got, vec!["s1_1_s2"]);
        let got = max_constituents_smc(&sent, &ids(&["s1_1_s2"]), false, false, None);
        assert_eq!(got, vec!["s1_1_s2"]);
    }

    #[test]
    fn test_nonterminal_input_expands_to_its_yield() {
        let sent = sentence();
        let got = max_constituents_smc(&sent, &ids(&["s1_501"]), false, false, None);
        assert_eq!(got, vec!["s1_501"]);
        let got = max_constituents_for_nodes(&sent, &ids(&["s1_501"]), false);
        assert_eq!(got, vec!["s1_501"]);
    }

    #[test]
    fn test_overlapping_inputs_collapse_to_one_constituent() {
        let sent = sentence();
        // the NP plus one of its own terminals is still one flat word set
        let words = ids(&["s1_501", "s1_1"]);
        assert_eq!(max_constituents_for_nodes(&sent, &words, false), vec!["s1_501"]);
        assert_eq!(
            max_constituents_smc(&sent, &words, false, false, None),
            vec!["s1_501"]
        );
    }

    #[test]
    fn test_punctuation_input_is_filtered_out() {
        let sent = sentence();
        assert!(max_constituents_for_nodes(&sent, &ids(&["s1_6"]), false).is_empty());
        assert!(max_constituents_smc(&sent, &ids(&["s1_6"]), false, false, None).is_empty());
    }

    #[test]
    fn test_cross_sentence_placeholder_comes_back_atomically() {
        let sent = Sentence::parse(
            "<s id='s1'><graph><terminals><t id='s1_1' word='hi' pos='UH'/></terminals>\
<nonterminals></nonterminals></graph>\
<sem><frames><frame id='s1_f1' name='X'>\
<fe id='s1_f1_e1' name='R'><fenode idref='s9_4'/><fenode idref='s1_1'/></fe>\
</frame></frames></sem></s>",
        )
        .unwrap();
        // the placeholder is reachable from no root, so it survives as
        // a leftover word in both variants
        let words = ids(&["s1_1", "s9_4"]);
        let expected = sorted(ids(&["s1_1", "s9_4"]));
        assert_eq!(sorted(max_constituents_smc(&sent, &words, false, false, None)), expected);
        assert_eq!(sorted(max_constituents_for_nodes(&sent, &words, false)), expected);
    }

    #[test]
    fn test_unknown_input_ids_are_skipped() {
        let sent = sentence();
        let got = max_constituents_for_nodes(&sent, &ids(&["s1_1", "s1_2", "nope"]), false);
        assert_eq!(got, vec!["s1_501"]);
    }
}
