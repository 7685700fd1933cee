use common::error::Error;
use common::http::{path_segment, RequestOptions};

use super::Deps;
use crate::domain::{PersonId, PersonProfile};
use crate::store::QueryKey;

/// 検索結果から開くプロフィール（人物ごとにキャッシュ）
pub struct ProfileQueries {
    deps: Deps,
}

impl ProfileQueries {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// GET /people/{id}
    pub fn open(&self, person_id: &PersonId) -> Result<PersonProfile, Error> {
        let key = QueryKey::Person(person_id.clone());
        let now = self.deps.clock.now_ms();
        let (cached, seen) = self.deps.store.read(|s| {
            let cached = s
                .profiles
                .get(person_id)
                .filter(|_| s.queries.is_fresh(&key, now, None))
                .cloned();
            (cached, s.queries.invalidation_count(&key))
        });
        if let Some(profile) = cached {
            return Ok(profile);
        }
        let path = format!("/people/{}", path_segment(person_id.as_str()));
        let profile: PersonProfile = self.deps.client.call(&path, RequestOptions::get())?;
        self.deps.store.write(|s| {
            if s.queries.mark_fresh_since(key, now, seen) {
                s.profiles.insert(person_id.clone(), profile.clone());
            }
        });
        Ok(profile)
    }
}
