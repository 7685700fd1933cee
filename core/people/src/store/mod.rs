//! セッションストア
//!
//! 認証済みセッション 1 つにつき 1 つ作り、ログアウト時に `teardown` で破棄する。
//! Mutation Coordinator と Search Session Manager に注入して使い、グローバルには置かない。
//! 内部の Mutex はメモリ安全のためだけで、ネットワーク呼び出しをまたいで保持しない。

pub mod card_family_cache;
pub mod query_cache;

pub use card_family_cache::{CardFamilyCache, EditingTarget, RemovedChild, RemovedFamily};
pub use query_cache::{QueryCache, QueryKey};

use crate::domain::{PersonId, PersonProfile, RecentSearch, SearchPhase, SearchSession};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// 検索セッションの状態（フェーズ + 現在のセッション）
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub phase: SearchPhase,
    pub session: Option<SearchSession>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            phase: SearchPhase::Idle,
            session: None,
        }
    }
}

/// ストアの中身
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub cards: CardFamilyCache,
    pub queries: QueryCache,
    /// 最後にサーバーから読んだ残高（ローカルでは決して増減させない）
    pub credits: Option<i64>,
    pub search: SearchState,
    pub recent_searches: Vec<RecentSearch>,
    pub profiles: HashMap<PersonId, PersonProfile>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    state: Mutex<StoreState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 読み取り（何箇所から呼んでもよい）
    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.lock())
    }

    /// 書き込み（usecase からのみ呼ぶ）
    pub fn write<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        f(&mut self.lock())
    }

    /// クエリを無効化する
    pub fn invalidate(&self, keys: &[QueryKey]) {
        self.write(|s| {
            for key in keys {
                s.queries.invalidate(key);
            }
        });
    }

    /// ログアウト時の破棄（すべてのキャッシュを空にする）
    pub fn teardown(&self) {
        self.write(|s| *s = StoreState::default());
    }
}
