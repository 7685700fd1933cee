//! 検索履歴（新しい検索が成功するまでキャッシュを使う）

use common::error::Error;
use common::http::RequestOptions;

use super::Deps;
use crate::domain::search::RecentSearchesResponse;
use crate::domain::RecentSearch;
use crate::store::QueryKey;

pub struct RecentSearches {
    deps: Deps,
}

impl RecentSearches {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// GET /me/searches
    pub fn list(&self) -> Result<Vec<RecentSearch>, Error> {
        let now = self.deps.clock.now_ms();
        let key = QueryKey::RecentSearches;
        let (fresh, seen) = self
            .deps
            .store
            .read(|s| (s.queries.is_fresh(&key, now, None), s.queries.invalidation_count(&key)));
        if fresh {
            return Ok(self.deps.store.read(|s| s.recent_searches.clone()));
        }
        let resp: RecentSearchesResponse = self
            .deps
            .client
            .call("/me/searches", RequestOptions::get())
            .inspect_err(|e| self.deps.emit_failure("search", "recent searches fetch failed", e))?;
        self.deps.store.write(|s| {
            if s.queries.mark_fresh_since(key, now, seen) {
                s.recent_searches = resp.searches.clone();
            }
        });
        Ok(resp.searches)
    }
}
