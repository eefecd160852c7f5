// Repetition guard
//
// Remembers the last few accepted candidates and rejects near-duplicates.

use similar::{Algorithm, DiffOp, TextDiff};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const DEFAULT_HISTORY_CAPACITY: usize = 5;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

/// Sequence similarity of two texts (0.0 = disjoint, 1.0 = identical)
///
/// Character-level LCS ratio `2 * matches / (len(a) + len(b))` over the
/// lowercased strings. Two empty strings are identical.
pub fn sequence_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Lcs)
        .diff_chars(a.as_str(), b.as_str());

    // Counted in f64: `TextDiff::ratio` is f32 and overshoots exact boundaries.
    let matches: usize = diff
        .ops()
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();
    let total = a.chars().count() + b.chars().count();

    (2 * matches) as f64 / total as f64
}

/// Bounded FIFO history of accepted candidates
///
/// Shared by every turn in the process. All reads and the evict-then-append
/// happen under one lock.
#[derive(Debug)]
pub struct RepetitionGuard {
    history: Mutex<VecDeque<String>>,
    capacity: usize,
    threshold: f64,
}

impl Default for RepetitionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl RepetitionGuard {
    pub fn new(capacity: usize, threshold: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            threshold,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        // A poisoned lock only means another turn panicked mid-append; the
        // deque itself is still well formed.
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn repeats_any(&self, history: &VecDeque<String>, candidate: &str) -> bool {
        history
            .iter()
            .any(|previous| sequence_similarity(candidate, previous) > self.threshold)
    }

    /// Whether the candidate is too close to any remembered reply
    pub fn is_repetitive(&self, candidate: &str) -> bool {
        let history = self.lock();
        self.repeats_any(&history, candidate)
    }

    /// Check and record a candidate in one step
    ///
    /// Returns `false` (and records nothing) when the candidate repeats a
    /// remembered reply.
    pub fn accept(&self, candidate: &str) -> bool {
        let mut history = self.lock();
        if self.repeats_any(&history, candidate) {
            return false;
        }

        history.push_back(candidate.to_string());
        while history.len() > self.capacity {
            history.pop_front();
        }
        true
    }

    /// Copy of the history, oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
