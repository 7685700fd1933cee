//! カード一覧の読み出し（無効化されていればサーバーから取り直す）

use common::error::Error;
use common::http::RequestOptions;
use common::ports::outbound::{LogLevel, LogRecord};
use serde_json::Value;

use super::Deps;
use crate::domain::{normalize_families, CardFamily, ExperienceCard};
use crate::store::QueryKey;

pub struct CardQueries {
    deps: Deps,
}

impl CardQueries {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// 新鮮なら `None`、取り直すなら取得前の無効化回数
    fn needs_fetch(&self, key: &QueryKey) -> Option<u64> {
        let now = self.deps.clock.now_ms();
        self.deps.store.read(|s| {
            if s.queries.is_fresh(key, now, None) {
                None
            } else {
                Some(s.queries.invalidation_count(key))
            }
        })
    }

    /// GET /me/experience-card-families
    ///
    /// 取得中に無効化が入った応答は反映せず、手元のキャッシュを返す。
    pub fn families(&self) -> Result<Vec<CardFamily>, Error> {
        if let Some(seen) = self.needs_fetch(&QueryKey::CardFamilies) {
            let body: Value = self
                .deps
                .client
                .call("/me/experience-card-families", RequestOptions::get())
                .inspect_err(|e| self.deps.emit_failure("cards", "card families fetch failed", e))?;
            let normalized = normalize_families(body)?;
            if normalized.dropped_families > 0 || normalized.dropped_children > 0 {
                self.deps.emit(
                    LogRecord::new(LogLevel::Warn, "inconsistent card families dropped")
                        .kind("cards")
                        .field("dropped_families", normalized.dropped_families)
                        .field("dropped_children", normalized.dropped_children),
                );
            }
            let now = self.deps.clock.now_ms();
            let applied = self.deps.store.write(|s| {
                let applied = s.queries.mark_fresh_since(QueryKey::CardFamilies, now, seen);
                if applied {
                    s.cards.replace_persisted(normalized.families);
                }
                applied
            });
            if !applied {
                self.deps.emit(
                    LogRecord::new(LogLevel::Debug, "card families invalidated during fetch")
                        .kind("cards"),
                );
            }
        }
        Ok(self.deps.store.read(|s| s.cards.families().to_vec()))
    }

    /// GET /me/experience-cards（親カードのフラット一覧）
    pub fn cards(&self) -> Result<Vec<ExperienceCard>, Error> {
        if let Some(seen) = self.needs_fetch(&QueryKey::ExperienceCards) {
            let body: Value = self
                .deps
                .client
                .call("/me/experience-cards", RequestOptions::get())
                .inspect_err(|e| self.deps.emit_failure("cards", "experience cards fetch failed", e))?;
            let list = match body {
                Value::Object(mut obj) => obj.remove("cards").unwrap_or(Value::Array(Vec::new())),
                Value::Null => Value::Array(Vec::new()),
                other => other,
            };
            let cards: Vec<ExperienceCard> = serde_json::from_value(list)?;
            let now = self.deps.clock.now_ms();
            self.deps.store.write(|s| {
                if s.queries.mark_fresh_since(QueryKey::ExperienceCards, now, seen) {
                    s.cards.replace_cards(cards);
                }
            });
        }
        Ok(self.deps.store.read(|s| s.cards.cards().to_vec()))
    }
}
