// crates/core/src/id.rs
//! Job identifiers.
//!
//! Ids are decimal renderings of a nanosecond timestamp, bumped forward when
//! two jobs land in the same nanosecond so every id handed out by one
//! generator is unique and strictly increasing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic timestamp-based id source.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id: `max(now_nanos, previous + 1)`.
    pub fn next_id(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return candidate.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Shape check for ids arriving from clients: ASCII alphanumeric, 8-32 chars.
pub fn is_valid_job_id(id: &str) -> bool {
    (8..=32).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let ids = IdGenerator::new();
        let mut prev: u64 = 0;
        for _ in 0..1_000 {
            let id: u64 = ids.next_id().parse().unwrap();
            assert!(id > prev);
            prev = id;
        }
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let ids = Arc::new(IdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..500).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id");
            }
        }
        assert_eq!(seen.len(), 2_000);
    }

    #[test]
    fn test_generated_ids_pass_validation() {
        let ids = IdGenerator::new();
        assert!(is_valid_job_id(&ids.next_id()));
    }

    #[test]
    fn test_id_shape_validation() {
        assert!(is_valid_job_id("12345678"));
        assert!(is_valid_job_id("abcDEF1234567890"));
        assert!(!is_valid_job_id("1234567"));
        assert!(!is_valid_job_id(&"9".repeat(33)));
        assert!(!is_valid_job_id("1234-5678"));
        assert!(!is_valid_job_id("../../etc/passwd"));
        assert!(!is_valid_job_id(""));
    }
}
