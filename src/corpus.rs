//! Corpus access - pulling sentences out of a corpus file
//!
//! A corpus file is a sequence of sentence elements, usually wrapped in
//! corpus/body markup the engine does not model. Sentences are located
//! textually and parsed one at a time, so one broken sentence never
//! takes down the rest of the file.

use crate::sentence::Sentence;
use crate::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\s*s(?:\s[^>]*)?>.*?<\s*/\s*s\s*>").unwrap());

/// A corpus: the raw markup of every sentence element found in a file.
#[derive(Debug, Clone)]
pub struct Corpus {
    chunks: Vec<String>,
}

impl Corpus {
    /// Collect all sentence elements from a markup string.
    pub fn from_markup(text: &str) -> Corpus {
        let chunks = SENTENCE_RE
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        Corpus { chunks }
    }

    /// Read a corpus file.
    pub fn open(path: impl AsRef<Path>) -> Result<Corpus> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_markup(&text))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The unparsed markup of each sentence, in file order.
    pub fn raw_sentences(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(String::as_str)
    }

    /// Parse each sentence, yielding per-sentence results.
    pub fn sentences(&self) -> impl Iterator<Item = Result<Sentence>> + '_ {
        self.chunks.iter().map(|chunk| Sentence::parse(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CORPUS: &str = "<corpus corpusname='demo'>\n<head><meta/></head>\n<body>\n\
<s id='s1'><graph><terminals><t id='s1_1' word='hi' pos='UH'/></terminals>\
<nonterminals></nonterminals></graph><sem/></s>\n\
<s id='s2'><graph><terminals><t id='s2_1' word='bye' pos='UH'/></terminals>\
<nonterminals></nonterminals></graph><sem/></s>\n\
</body>\n</corpus>\n";

    #[test]
    fn test_sentences_are_found_inside_wrappers() {
        let corpus = Corpus::from_markup(CORPUS);
        assert_eq!(corpus.len(), 2);
        let ids: Vec<String> = corpus
            .sentences()
            .map(|s| s.unwrap().id().to_string())
            .collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[test]
    fn test_sem_and_splitword_elements_do_not_confuse_the_scan() {
        let text = "<s id='s1'><graph><terminals>\
<t id='s1_1' word='zum' pos='APPRART'/></terminals><nonterminals></nonterminals></graph>\
<sem><splitwords><splitword idref='s1_1'><part id='s1_1_s1' word='zu'/>\
<part id='s1_1_s2' word='dem'/></splitword></splitwords></sem></s>";
        let corpus = Corpus::from_markup(text);
        assert_eq!(corpus.len(), 1);
        let sent = corpus.sentences().next().unwrap().unwrap();
        assert_eq!(sent.id(), "s1");
        assert!(sent.syn_node("s1_1_s2").unwrap().is_splitword());
    }

    #[test]
    fn test_one_broken_sentence_does_not_take_down_the_rest() {
        let text = "<s id='s1'><graph><terminals><t id='s1_1' word='a' pos='X'/></terminals>\
<nonterminals><nt id='s1_500' cat='S'><edge label='-' idref='s1_99'/></nt></nonterminals>\
</graph><sem/></s>\
<s id='s2'><graph/><sem/></s>";
        let corpus = Corpus::from_markup(text);
        let results: Vec<Result<Sentence>> = corpus.sentences().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().id(), "s2");
    }

    #[test]
    fn test_open_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CORPUS.as_bytes()).unwrap();
        let corpus = Corpus::open(file.path()).unwrap();
        assert_eq!(corpus.len(), 2);
    }
}
