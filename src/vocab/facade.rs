//! Vocabulary facade: owns one trie and one BK-tree over the same
//! word stream and exposes the lookup surface Core B's external callers use.

use crate::vocab::bktree::BkTree;
use crate::vocab::trie::Trie;

pub const DEFAULT_MAX_DISTANCE: usize = 2;
const MAX_SUGGESTIONS: usize = 5;

pub struct VocabularyFacade {
    trie: Trie,
    bk_tree: BkTree,
}

impl VocabularyFacade {
    /// Builds both indexes from a word stream: each non-empty, case-folded
    /// line is inserted into both. The iterator is fully consumed.
    pub fn from_words<I>(words: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut trie = Trie::new();
        let mut bk_tree = BkTree::new();
        for line in words {
            let word = line.as_ref().trim().to_lowercase();
            if word.is_empty() {
                continue;
            }
            trie.insert(&word);
            bk_tree.insert(&word);
        }
        VocabularyFacade { trie, bk_tree }
    }

    pub fn is_valid(&self, word: &str) -> bool {
        self.trie.contains(word)
    }

    /// Nearest candidates within `max_distance`, limited to 5 ordered by
    /// length ascending (stable) on top of the BK-tree's own distance-first
    /// ordering.
    pub fn suggestions(&self, word: &str, max_distance: usize) -> Vec<String> {
        let mut results = self.bk_tree.search(word, max_distance);
        results.sort_by_key(|w| w.len());
        results.truncate(MAX_SUGGESTIONS);
        results
    }

    pub fn suggestions_default(&self, word: &str) -> Vec<String> {
        self.suggestions(word, DEFAULT_MAX_DISTANCE)
    }

    pub fn len(&self) -> usize {
        self.trie.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> VocabularyFacade {
        VocabularyFacade::from_words(["hello", "help", "hell", "world", "yellow"])
    }

    #[test]
    fn is_valid_checks_the_trie() {
        let vocab = vocab();
        assert!(vocab.is_valid("HELLO"));
        assert!(!vocab.is_valid("goodbye"));
    }

    #[test]
    fn suggestions_match_scenario() {
        let vocab = vocab();
        let mut results = vocab.suggestions("hell", 1);
        results.sort();
        assert_eq!(results, vec!["hello".to_string(), "help".to_string()]);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let vocab = VocabularyFacade::from_words(["hello", "", "   ", "world"]);
        assert_eq!(vocab.len(), 2);
        assert!(!vocab.is_empty());
    }
}
