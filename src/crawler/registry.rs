use dashmap::DashSet;

/// Set of locations already claimed by a task during one crawl.
///
/// Claims are a single insert-if-absent on a sharded set, so two tasks racing on the
/// same location are linearized without a crawl-wide lock.
#[derive(Debug, Default)]
pub struct ClaimRegistry {
    visited: DashSet<String>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for exactly one caller per location
    pub fn try_claim(&self, location: &str) -> bool {
        if self.visited.contains(location) {
            return false;
        }
        self.visited.insert(location.to_owned())
    }

    pub fn is_claimed(&self, location: &str) -> bool {
        self.visited.contains(location)
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_first_claim_wins() {
        let registry = ClaimRegistry::new();
        assert!(registry.try_claim("https://example.com/a"));
        assert!(!registry.try_claim("https://example.com/a"));
        assert!(registry.try_claim("https://example.com/b"));
        assert!(registry.is_claimed("https://example.com/a"));
        assert!(!registry.is_claimed("https://example.com/c"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_concurrent_claims_on_same_location() {
        let registry = Arc::new(ClaimRegistry::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    for i in 0..100 {
                        if registry.try_claim(&format!("https://example.com/{}", i)) {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 100);
        assert_eq!(registry.len(), 100);
    }
}
