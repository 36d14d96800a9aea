//! Core B behavioral scenarios: trie membership, BK-tree distance search,
//! and the vocabulary facade combining both.

use pretty_assertions::assert_eq;
use relalg_translator::vocab::{levenshtein, BkTree, Trie, VocabularyFacade};
use rstest::rstest;

/// `search("hell", 1)` over {hello, help, hell, world, yellow} returns
/// exactly {"hello", "help"}.
#[test]
fn bk_tree_search_matches_scenario() {
    let mut tree = BkTree::new();
    for w in ["hello", "help", "hell", "world", "yellow"] {
        tree.insert(w);
    }
    let mut results = tree.search("hell", 1);
    results.sort();
    assert_eq!(results, vec!["hello".to_string(), "help".to_string()]);
}

/// For any inserted pair (a, b) with Levenshtein distance d, a search for
/// `a` at max_distance d returns b.
#[rstest]
#[case("cat", "bat")]
#[case("kitten", "sitting")]
#[case("flaw", "lawn")]
fn bk_tree_finds_known_distance_pairs(#[case] a: &str, #[case] b: &str) {
    let d = levenshtein(a, b);
    let mut tree = BkTree::new();
    tree.insert(a);
    tree.insert(b);
    let results = tree.search(a, d);
    assert!(results.contains(&b.to_string()), "expected {b} within distance {d} of {a}, got {results:?}");
}

/// Membership holds for inserted words and fails for absent ones.
#[test]
fn trie_contains_reflects_insertions() {
    let mut trie = Trie::new();
    for w in ["alpha", "beta", "gamma"] {
        trie.insert(w);
    }
    for w in ["alpha", "beta", "gamma"] {
        assert!(trie.contains(w));
    }
    assert!(!trie.contains("delta"));
}

/// Idempotence: insert then remove the only word leaves an empty trie with
/// reverted statistics.
#[test]
fn insert_then_remove_reverts_trie_to_empty() {
    let mut trie = Trie::new();
    trie.insert("solitary");
    assert_eq!(trie.statistics(), (1, 8, 8));
    assert!(trie.remove("solitary"));
    assert_eq!(trie.statistics(), (0, 0, 0));
    assert!(!trie.contains("solitary"));
}

#[test]
fn facade_prefers_trie_then_falls_back_to_suggestions() {
    let vocab = VocabularyFacade::from_words(["hello", "help", "hell", "world", "yellow"]);
    assert!(vocab.is_valid("hello"));
    assert!(!vocab.is_valid("helo"));
    let mut suggestions = vocab.suggestions("helo", 2);
    suggestions.sort();
    assert!(suggestions.contains(&"hell".to_string()));
    assert!(suggestions.len() <= 5);
}

#[test]
fn facade_caps_suggestions_and_orders_by_length() {
    let vocab = VocabularyFacade::from_words(["cat", "bat", "hat", "mat", "rat", "sat", "fatter"]);
    let suggestions = vocab.suggestions("cat", 1);
    assert!(suggestions.len() <= 5);
    for pair in suggestions.windows(2) {
        assert!(pair[0].len() <= pair[1].len());
    }
}
