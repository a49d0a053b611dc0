use dashmap::DashMap;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Ranked `(word, count)` pairs, most popular first
pub type WordCounts = Vec<(String, u64)>;

/// Running word totals shared by every task of a crawl
#[derive(Debug, Default)]
pub struct WordAggregator {
    tally: DashMap<String, u64>,
}

impl WordAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every count into the tally. Each key is updated under its shard lock, so
    /// concurrent merges of overlapping word sets never lose an update.
    pub fn merge<I>(&self, counts: I)
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        for (word, count) in counts {
            *self.tally.entry(word).or_insert(0) += count;
        }
    }

    pub fn get(&self, word: &str) -> Option<u64> {
        self.tally.get(word).map(|count| *count)
    }

    pub fn len(&self) -> usize {
        self.tally.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tally.is_empty()
    }

    /// Unranked copy of the tally
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.tally
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// The `k` most popular words.
    /// Ordered by count descending, then word length descending, then alphabetically.
    pub fn top_k(&self, k: usize) -> WordCounts {
        rank(self.snapshot(), k)
    }
}

pub fn rank(counts: HashMap<String, u64>, k: usize) -> WordCounts {
    let mut ranked: WordCounts = counts.into_iter().collect();
    ranked.sort_unstable_by(|a, b| compare_popularity(a, b));
    ranked.truncate(k);
    ranked
}

fn compare_popularity(a: &(String, u64), b: &(String, u64)) -> Ordering {
    b.1.cmp(&a.1)
        .then_with(|| b.0.chars().count().cmp(&a.0.chars().count()))
        .then_with(|| a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u64)]) -> Vec<(String, u64)> {
        pairs.iter().map(|(w, c)| (w.to_string(), *c)).collect()
    }

    #[test]
    fn test_merge_sums_overlapping_words() {
        let words = WordAggregator::new();
        words.merge(counts(&[("cat", 2)]));
        words.merge(counts(&[("cat", 1), ("dog", 3)]));
        assert_eq!(words.get("cat"), Some(3));
        assert_eq!(words.get("dog"), Some(3));
        assert_eq!(words.get("bird"), None);
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn test_merge_order_does_not_change_totals() {
        let pages = vec![
            counts(&[("alpha", 1), ("beta", 2)]),
            counts(&[("beta", 5), ("gamma", 1)]),
            counts(&[("alpha", 4), ("gamma", 7), ("delta", 1)]),
        ];

        let forward = WordAggregator::new();
        pages.iter().cloned().for_each(|p| forward.merge(p));

        let backward = WordAggregator::new();
        pages.iter().rev().cloned().for_each(|p| backward.merge(p));

        let parallel = WordAggregator::new();
        std::thread::scope(|s| {
            for page in &pages {
                let parallel = &parallel;
                s.spawn(move || parallel.merge(page.clone()));
            }
        });

        assert_eq!(forward.snapshot(), backward.snapshot());
        assert_eq!(forward.snapshot(), parallel.snapshot());
    }

    #[test]
    fn test_top_k_tie_breaks() {
        let words = WordAggregator::new();
        words.merge(counts(&[
            ("cat", 3),
            ("dog", 3),
            ("zebra", 3),
            ("ox", 9),
            ("a", 1),
        ]));

        assert_eq!(
            words.top_k(10),
            counts(&[("ox", 9), ("zebra", 3), ("cat", 3), ("dog", 3), ("a", 1)])
        );
        assert_eq!(words.top_k(2), counts(&[("ox", 9), ("zebra", 3)]));
        assert!(words.top_k(0).is_empty());
    }

    #[test]
    fn test_top_k_is_deterministic() {
        let input = counts(&[("bb", 2), ("aa", 2), ("cc", 2), ("b", 2), ("dddd", 1)]);
        let first = WordAggregator::new();
        first.merge(input.clone());
        let second = WordAggregator::new();
        second.merge(input.into_iter().rev());

        let expected = counts(&[("aa", 2), ("bb", 2), ("cc", 2), ("b", 2), ("dddd", 1)]);
        assert_eq!(first.top_k(5), expected);
        assert_eq!(second.top_k(5), expected);
    }

    #[test]
    fn test_empty_tally_ranks_to_nothing() {
        let words = WordAggregator::new();
        assert!(words.is_empty());
        assert!(words.top_k(5).is_empty());
        assert!(words.snapshot().is_empty());
    }
}
