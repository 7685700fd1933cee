//! リモートクエリの鮮度管理
//!
//! データ本体は各キャッシュが持ち、ここでは「いつ取得したか」「無効化されたか」だけを追う。
//! 無効化されたクエリは次の読み出しでサーバーから取り直す。

use crate::domain::PersonId;
use std::collections::HashMap;

/// キャッシュ対象のクエリ
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Credits,
    CardFamilies,
    ExperienceCards,
    RecentSearches,
    Person(PersonId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueryState {
    fetched_at_ms: u64,
    invalidated: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryCache {
    entries: HashMap<QueryKey, QueryState>,
    invalidations: HashMap<QueryKey, u64>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_fresh(&mut self, key: QueryKey, now_ms: u64) {
        self.entries.insert(
            key,
            QueryState {
                fetched_at_ms: now_ms,
                invalidated: false,
            },
        );
    }

    pub fn invalidate(&mut self, key: &QueryKey) {
        if let Some(state) = self.entries.get_mut(key) {
            state.invalidated = true;
        }
        *self.invalidations.entry(key.clone()).or_insert(0) += 1;
    }

    /// 取得済みで無効化されておらず、`max_age_ms` 以内なら true（`None` は期限なし）
    pub fn is_fresh(&self, key: &QueryKey, now_ms: u64, max_age_ms: Option<u64>) -> bool {
        match self.entries.get(key) {
            Some(state) if !state.invalidated => match max_age_ms {
                Some(max_age) => now_ms.saturating_sub(state.fetched_at_ms) <= max_age,
                None => true,
            },
            _ => false,
        }
    }

    /// これまでに無効化された回数
    pub fn invalidation_count(&self, key: &QueryKey) -> u64 {
        self.invalidations.get(key).copied().unwrap_or(0)
    }

    /// 取得開始時の無効化回数 `seen` から変わっていなければ鮮度を記録して true。
    /// 取得中に無効化が入っていれば何もせず false（次の読み出しで取り直す）。
    pub fn mark_fresh_since(&mut self, key: QueryKey, now_ms: u64, seen: u64) -> bool {
        if self.invalidation_count(&key) != seen {
            return false;
        }
        self.mark_fresh(key, now_ms);
        true
    }
}
