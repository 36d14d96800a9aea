//! Metric tree keyed by a pluggable distance function, default Levenshtein.
//! Each node owns a word plus a map from edge distance to child node;
//! insertion and search both work by descending edges keyed by distance
//! from the current node, pruning by the triangle inequality on search.

use std::collections::HashMap;

/// Minimum number of single-character insertions, deletions, or
/// substitutions needed to turn `a` into `b`.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=m {
        dp[0][j] = j;
    }
    for i in 1..=n {
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1).min(dp[i][j - 1] + 1).min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[n][m]
}

struct BkNode {
    word: String,
    children: HashMap<usize, BkNode>,
}

/// Metric tree over a pluggable distance function. Insertion descends to
/// the child keyed by the distance from the current node to the new word;
/// search prunes subtrees outside `[d - max_distance, d + max_distance]`.
pub struct BkTree {
    root: Option<BkNode>,
    distance: Box<dyn Fn(&str, &str) -> usize>,
}

impl Default for BkTree {
    fn default() -> Self {
        BkTree::new()
    }
}

impl BkTree {
    pub fn new() -> Self {
        BkTree::with_distance(levenshtein)
    }

    pub fn with_distance(distance: impl Fn(&str, &str) -> usize + 'static) -> Self {
        BkTree {
            root: None,
            distance: Box::new(distance),
        }
    }

    pub fn insert(&mut self, word: &str) {
        match &mut self.root {
            None => {
                self.root = Some(BkNode {
                    word: word.to_string(),
                    children: HashMap::new(),
                })
            }
            Some(root) => insert_rec(root, word.to_string(), self.distance.as_ref()),
        }
    }

    /// Returns candidates within `max_distance` of `query`, sorted by
    /// distance ascending then length ascending, capped at 5.
    pub fn search(&self, query: &str, max_distance: usize) -> Vec<String> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let mut results = Vec::new();
        search_rec(root, query, max_distance, self.distance.as_ref(), &mut results);
        results.sort_by(|a, b| {
            let da = (self.distance)(a, query);
            let db = (self.distance)(b, query);
            da.cmp(&db).then(a.len().cmp(&b.len()))
        });
        results.truncate(5);
        results
    }
}

fn insert_rec(node: &mut BkNode, word: String, distance: &dyn Fn(&str, &str) -> usize) {
    let d = distance(&node.word, &word);
    if d == 0 {
        return;
    }
    match node.children.get_mut(&d) {
        Some(child) => insert_rec(child, word, distance),
        None => {
            node.children.insert(d, BkNode { word, children: HashMap::new() });
        }
    }
}

fn search_rec(
    node: &BkNode,
    query: &str,
    max_distance: usize,
    distance: &dyn Fn(&str, &str) -> usize,
    out: &mut Vec<String>,
) {
    let d = distance(&node.word, query);
    if d > 0 && d <= max_distance {
        out.push(node.word.clone());
    }
    let lo = d.saturating_sub(max_distance).max(1);
    let hi = d + max_distance;
    for (&edge, child) in &node.children {
        if edge >= lo && edge <= hi {
            search_rec(child, query, max_distance, distance, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_basic() {
        assert_eq!(levenshtein("hello", "hello"), 0);
        assert_eq!(levenshtein("hell", "hello"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn search_within_distance() {
        let mut tree = BkTree::new();
        for w in ["hello", "help", "hell", "world", "yellow"] {
            tree.insert(w);
        }
        let mut results = tree.search("hell", 1);
        results.sort();
        assert_eq!(results, vec!["hello".to_string(), "help".to_string()]);
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let mut tree = BkTree::new();
        tree.insert("hello");
        tree.insert("hello");
        assert_eq!(tree.search("hello", 0), Vec::<String>::new());
    }

    #[test]
    fn results_capped_at_five() {
        let mut tree = BkTree::new();
        for w in ["cat", "bat", "hat", "mat", "rat", "sat", "fat"] {
            tree.insert(w);
        }
        let results = tree.search("cat", 1);
        assert!(results.len() <= 5);
    }
}
