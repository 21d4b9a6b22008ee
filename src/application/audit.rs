//! Append-only adaptation log plus the rolling pattern cache.
//!
//! Not internally locked: the engine owns the single coarse lock and this
//! store is only ever touched under it.

use crate::domain::adaptation::AdaptationRecord;
use crate::domain::pattern::{DetectedPattern, PatternFilter};
use std::collections::VecDeque;

pub struct AuditStore {
    pattern_cache: VecDeque<DetectedPattern>,
    pattern_cache_cap: usize, // 0 = unbounded
    records: Vec<AdaptationRecord>,
}

impl AuditStore {
    pub fn new(pattern_cache_cap: usize) -> Self {
        Self {
            pattern_cache: VecDeque::new(),
            pattern_cache_cap,
            records: Vec::new(),
        }
    }

    /// Append freshly detected patterns, evicting the oldest entries once
    /// the soft cap is reached
    pub fn record_patterns(&mut self, patterns: &[DetectedPattern]) {
        for pattern in patterns {
            if self.pattern_cache_cap > 0 && self.pattern_cache.len() >= self.pattern_cache_cap {
                self.pattern_cache.pop_front();
            }
            self.pattern_cache.push_back(pattern.clone());
        }
    }

    /// Linear scan of the recent window, in insertion (detection) order
    pub fn patterns_matching(&self, filter: &PatternFilter) -> Vec<DetectedPattern> {
        self.pattern_cache
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect()
    }

    pub fn append(&mut self, record: AdaptationRecord) {
        self.records.push(record);
    }

    /// Most-recent-first history; `limit == 0` means all records
    pub fn history(&self, limit: usize) -> Vec<AdaptationRecord> {
        let take = if limit == 0 { self.records.len() } else { limit };
        self.records.iter().rev().take(take).cloned().collect()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}
