//! 下書きワークフロー（自由記述 → 構造化 → 承認）

use common::error::Error;
use common::http::{path_segment, RequestOptions};
use common::ports::outbound::{LogLevel, LogRecord, Method};
use serde_json::{json, Value};

use super::Deps;
use crate::domain::{normalize_families, CardFamily, CardId, ExperienceCard};
use crate::store::QueryKey;

/// まとめて承認した結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApprovalReport {
    pub approved: Vec<CardId>,
    /// 失敗した下書きとエラーメッセージ（下書きには残っている）
    pub failed: Vec<(CardId, String)>,
}

impl ApprovalReport {
    pub fn all_approved(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct DraftWorkflow {
    deps: Deps,
}

impl DraftWorkflow {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    pub fn drafts(&self) -> Vec<CardFamily> {
        self.deps.store.read(|s| s.cards.drafts().to_vec())
    }

    /// 自由記述を構造化し、下書きを丸ごと置き換える
    pub fn structure_text(&self, raw_text: &str) -> Result<Vec<CardFamily>, Error> {
        let raw_text = raw_text.trim();
        if raw_text.is_empty() {
            return Err(Error::invalid_argument("Text to structure must not be empty"));
        }
        let body: Value = self
            .deps
            .client
            .call(
                "/experience-cards/draft-v1",
                RequestOptions::post(json!({ "raw_text": raw_text })),
            )
            .inspect_err(|e| self.deps.emit_failure("draft", "structuring failed", e))?;
        let normalized = normalize_families(body)?;
        self.deps.emit(
            LogRecord::new(LogLevel::Info, "draft families structured")
                .kind("draft")
                .field("families", normalized.families.len())
                .field("dropped_families", normalized.dropped_families)
                .field("dropped_children", normalized.dropped_children),
        );
        let families = normalized.families;
        self.deps.store.write(|s| s.cards.replace_drafts(families));
        Ok(self.drafts())
    }

    /// 下書き 1 件を承認する（失敗した分だけを再試行するときにも使う）
    ///
    /// このセッションで構造化していない下書きでも、サーバーにあれば承認できる。
    pub fn approve_draft(&self, id: &CardId) -> Result<ExperienceCard, Error> {
        let path = format!("/experience-cards/{}/approve", path_segment(id.as_str()));
        let result: Result<Value, Error> = self.deps.client.call(&path, RequestOptions::new(Method::Post));
        let card = match result {
            Ok(Value::Null) => self
                .deps
                .store
                .read(|s| s.cards.draft(id).map(|f| f.parent.clone()))
                .unwrap_or_else(|| ExperienceCard::new_parent(id.as_str())),
            Ok(body) => serde_json::from_value::<ExperienceCard>(body)?,
            Err(e) => {
                self.deps
                    .emit_failure("draft", &format!("approving draft {} failed", id), &e);
                return Err(e);
            }
        };

        // 承認自体はサーバーで済んでいるので、昇格できなくてもクエリは無効化する
        let promoted = self.deps.store.write(|s| {
            let promoted = s.cards.promote_draft(card.clone());
            s.queries.invalidate(&QueryKey::CardFamilies);
            s.queries.invalidate(&QueryKey::ExperienceCards);
            s.queries.invalidate(&QueryKey::Credits);
            promoted
        });
        if !promoted {
            self.deps.emit(
                LogRecord::new(LogLevel::Warn, "approved card is not a parent; draft kept")
                    .kind("draft")
                    .field("card_id", id.as_str())
                    .field("returned_parent_id", card.parent_id.as_ref().map(CardId::as_str)),
            );
            return Err(Error::json(format!("approval of {} returned a child card", id)));
        }
        self.deps.emit(
            LogRecord::new(LogLevel::Info, "draft approved")
                .kind("draft")
                .field("card_id", id.as_str()),
        );
        Ok(card)
    }

    /// 下書きを 1 件ずつ承認する。途中で失敗しても残りは続ける。
    pub fn approve_drafts(&self, ids: &[CardId]) -> ApprovalReport {
        let mut report = ApprovalReport::default();
        for id in ids {
            match self.approve_draft(id) {
                Ok(_) => report.approved.push(id.clone()),
                Err(e) => report.failed.push((id.clone(), e.to_string())),
            }
        }
        report
    }

    /// すべての下書きを承認する
    pub fn approve_all(&self) -> ApprovalReport {
        let ids: Vec<CardId> = self
            .deps
            .store
            .read(|s| s.cards.drafts().iter().map(|f| f.id().clone()).collect());
        self.approve_drafts(&ids)
    }

    /// 下書きをローカルで捨てる
    pub fn discard_draft(&self, id: &CardId) -> bool {
        self.deps.store.write(|s| s.cards.discard_draft(id))
    }
}
