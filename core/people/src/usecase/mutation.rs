//! Mutation Coordinator（楽観的更新 → 送信 → 確定 or ロールバック → 再検証）
//!
//! 1 つの変更を `PendingMutation` というコマンドオブジェクトで表す。
//! - `begin`: 対象エンティティのスナップショットを取り、キャッシュへ楽観的に反映する
//! - `send`: Resource Client でサーバーへ送る
//! - `commit` / `rollback`: サーバーの正規値をマージするか、スナップショットをそのまま戻す
//! - `settle`: 成否にかかわらずカード系クエリを無効化し、次の読み出しでサーバーと突き合わせる
//!
//! スナップショットは対象エンティティの部分木だけを持つので、兄弟の応答が後から届いても
//! 削除済みのカードが復活することはない。同じ id への並行変更はキューイングせず、
//! 最後に届いた応答が勝つ。

use common::error::Error;
use common::http::{path_segment, RequestOptions};
use common::ports::outbound::{LogLevel, LogRecord, Method};

use super::Deps;
use crate::domain::{CardId, CardPatch, ExperienceCard};
use crate::store::{EditingTarget, QueryKey, RemovedChild, RemovedFamily};

/// カードへの変更 1 件
#[derive(Debug, Clone, PartialEq)]
pub enum CardMutation {
    DeleteParent(CardId),
    PatchParent { id: CardId, patch: CardPatch },
    HideParent(CardId),
    DeleteChild(CardId),
    PatchChild { id: CardId, patch: CardPatch },
}

impl CardMutation {
    pub fn target(&self) -> &CardId {
        match self {
            Self::DeleteParent(id)
            | Self::HideParent(id)
            | Self::DeleteChild(id)
            | Self::PatchParent { id, .. }
            | Self::PatchChild { id, .. } => id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DeleteParent(_) => "delete_parent",
            Self::PatchParent { .. } => "patch_parent",
            Self::HideParent(_) => "hide_parent",
            Self::DeleteChild(_) => "delete_child",
            Self::PatchChild { .. } => "patch_child",
        }
    }

    fn is_delete(&self) -> bool {
        matches!(self, Self::DeleteParent(_) | Self::DeleteChild(_))
    }

    fn path(&self) -> String {
        match self {
            Self::DeleteParent(id) | Self::PatchParent { id, .. } => {
                format!("/experience-cards/{}", path_segment(id.as_str()))
            }
            Self::HideParent(id) => format!("/experience-cards/{}/hide", path_segment(id.as_str())),
            Self::DeleteChild(id) | Self::PatchChild { id, .. } => {
                format!("/experience-card-children/{}", path_segment(id.as_str()))
            }
        }
    }

    fn request(&self) -> Result<RequestOptions, Error> {
        Ok(match self {
            Self::DeleteParent(_) | Self::DeleteChild(_) => RequestOptions::delete(),
            Self::HideParent(_) => RequestOptions::new(Method::Post),
            Self::PatchParent { patch, .. } | Self::PatchChild { patch, .. } => {
                RequestOptions::patch(serde_json::to_value(patch)?)
            }
        })
    }
}

/// 楽観的更新の前に取った、対象エンティティだけのスナップショット
#[derive(Debug, Clone, PartialEq)]
enum Snapshot {
    Family(Option<RemovedFamily>),
    Child(Option<RemovedChild>),
    Parent {
        family: Option<ExperienceCard>,
        flat: Option<ExperienceCard>,
    },
    ChildFields(Option<ExperienceCard>),
}

/// 送信待ち（または送信中）の変更
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    mutation: CardMutation,
    snapshot: Snapshot,
    editing: Option<EditingTarget>,
}

impl PendingMutation {
    pub fn mutation(&self) -> &CardMutation {
        &self.mutation
    }
}

/// サーバーの応答
#[derive(Debug, Clone, PartialEq)]
pub enum ServerAck {
    /// 正規のエンティティが返ってきた
    Card(ExperienceCard),
    /// 204 など本文なし
    NoContent,
    /// 削除しようとしたら既に無かった（冪等な削除として成功扱い）
    AlreadyRemoved,
}

pub struct MutationCoordinator {
    deps: Deps,
}

impl MutationCoordinator {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// スナップショットを取り、キャッシュへ楽観的に反映する
    pub fn begin(&self, mutation: CardMutation) -> PendingMutation {
        self.deps.store.write(|s| {
            let cache = &mut s.cards;
            let editing = cache.editing().cloned();
            let snapshot = match &mutation {
                CardMutation::DeleteParent(id) => Snapshot::Family(cache.remove_family(id)),
                CardMutation::DeleteChild(id) => Snapshot::Child(cache.remove_child(id)),
                CardMutation::PatchParent { id, patch } => {
                    let snapshot = Snapshot::Parent {
                        family: cache.parent(id).cloned(),
                        flat: cache.flat_card(id).cloned(),
                    };
                    cache.apply_parent_patch(id, patch);
                    snapshot
                }
                CardMutation::HideParent(id) => {
                    let snapshot = Snapshot::Parent {
                        family: cache.parent(id).cloned(),
                        flat: cache.flat_card(id).cloned(),
                    };
                    let hide = CardPatch {
                        visible: Some(false),
                        ..Default::default()
                    };
                    cache.apply_parent_patch(id, &hide);
                    snapshot
                }
                CardMutation::PatchChild { id, patch } => {
                    let snapshot = Snapshot::ChildFields(cache.child(id).cloned());
                    cache.apply_child_patch(id, patch);
                    snapshot
                }
            };
            cache.clear_editing_for(&[mutation.target()]);
            PendingMutation {
                mutation,
                snapshot,
                editing,
            }
        })
    }

    /// サーバーへ送る（ストアには触れない）
    pub fn send(&self, pending: &PendingMutation) -> Result<ServerAck, Error> {
        let mutation = &pending.mutation;
        let result: Result<serde_json::Value, Error> =
            self.deps.client.call(&mutation.path(), mutation.request()?);
        match result {
            Ok(serde_json::Value::Null) => Ok(ServerAck::NoContent),
            Ok(_) if mutation.is_delete() => Ok(ServerAck::NoContent),
            Ok(body) => {
                let card: ExperienceCard = serde_json::from_value(body)?;
                Ok(ServerAck::Card(card))
            }
            Err(e) if mutation.is_delete() && e.is_not_found() => Ok(ServerAck::AlreadyRemoved),
            Err(e) => Err(e),
        }
    }

    /// サーバーの正規値をマージする（サーバーのフィールドが楽観的な推測より優先）
    pub fn commit(&self, pending: PendingMutation, ack: ServerAck) {
        let ServerAck::Card(card) = ack else {
            return;
        };
        self.deps.store.write(|s| match pending.mutation {
            CardMutation::PatchParent { .. } | CardMutation::HideParent(_) => {
                s.cards.merge_parent(card);
            }
            CardMutation::PatchChild { .. } => {
                s.cards.merge_child(card);
            }
            CardMutation::DeleteParent(_) | CardMutation::DeleteChild(_) => {}
        });
    }

    /// スナップショットをそのまま戻す（部分的なマージはしない）
    pub fn rollback(&self, pending: PendingMutation) {
        self.deps.store.write(|s| {
            let cache = &mut s.cards;
            match pending.snapshot {
                Snapshot::Family(Some(removed)) => cache.restore_family(removed),
                Snapshot::Child(Some(removed)) => cache.restore_child(removed),
                Snapshot::Parent { family, flat } => cache.restore_parent(family, flat),
                Snapshot::ChildFields(Some(card)) => cache.restore_child_fields(card),
                Snapshot::Family(None) | Snapshot::Child(None) | Snapshot::ChildFields(None) => {}
            }
            if cache.editing().is_none() {
                cache.set_editing(pending.editing);
            }
        });
    }

    /// 成否にかかわらずカード系のクエリを無効化する
    pub fn settle(&self) {
        self.deps
            .store
            .invalidate(&[QueryKey::CardFamilies, QueryKey::ExperienceCards]);
    }

    /// begin → send → commit/rollback → settle を一続きで行う
    pub fn run(&self, mutation: CardMutation) -> Result<ServerAck, Error> {
        let label = mutation.label();
        let target = mutation.target().to_string();
        let pending = self.begin(mutation);
        let result = self.send(&pending);
        let outcome = match result {
            Ok(ack) => {
                self.deps.emit(
                    LogRecord::new(LogLevel::Info, "card mutation committed")
                        .kind("mutation")
                        .field("op", label)
                        .field("card_id", target.as_str())
                        .field("already_removed", ack == ServerAck::AlreadyRemoved),
                );
                self.commit(pending, ack.clone());
                Ok(ack)
            }
            Err(e) => {
                self.rollback(pending);
                self.deps.emit_failure(
                    "mutation",
                    &format!("card mutation {} on {} rolled back", label, target),
                    &e,
                );
                Err(e)
            }
        };
        self.settle();
        outcome
    }

    pub fn delete_parent(&self, id: &CardId) -> Result<ServerAck, Error> {
        self.run(CardMutation::DeleteParent(id.clone()))
    }

    pub fn patch_parent(&self, id: &CardId, patch: CardPatch) -> Result<ServerAck, Error> {
        self.run(CardMutation::PatchParent {
            id: id.clone(),
            patch,
        })
    }

    pub fn hide_parent(&self, id: &CardId) -> Result<ServerAck, Error> {
        self.run(CardMutation::HideParent(id.clone()))
    }

    pub fn delete_child(&self, id: &CardId) -> Result<ServerAck, Error> {
        self.run(CardMutation::DeleteChild(id.clone()))
    }

    pub fn patch_child(&self, id: &CardId, patch: CardPatch) -> Result<ServerAck, Error> {
        self.run(CardMutation::PatchChild {
            id: id.clone(),
            patch,
        })
    }
}
