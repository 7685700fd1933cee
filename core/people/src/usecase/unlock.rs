//! 連絡先のアンロック
//!
//! クレジットを消費する操作なので冪等キー付きで送る。
//! 失敗した送信のキーは人物ごとに保持し、`retry_unlock` で同じキーを再送する。

use common::domain::IdempotencyKey;
use common::error::Error;
use common::http::{path_segment, RequestOptions};
use common::ports::outbound::{LogLevel, LogRecord, Method};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::Deps;
use crate::domain::{PersonId, UnlockResponse};
use crate::store::QueryKey;

pub struct ContactUnlocker {
    deps: Deps,
    pending: Mutex<HashMap<PersonId, IdempotencyKey>>,
}

impl ContactUnlocker {
    pub fn new(deps: Deps) -> Self {
        Self {
            deps,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<PersonId, IdempotencyKey>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 再送待ちのキー
    pub fn pending_key(&self, person_id: &PersonId) -> Option<IdempotencyKey> {
        self.pending().get(person_id).cloned()
    }

    /// 新しい操作として送る（毎回新しいキー）
    pub fn unlock_contact(&self, person_id: &PersonId) -> Result<UnlockResponse, Error> {
        let key = self.deps.keys.next_key();
        self.submit(person_id, key)
    }

    /// 直前に失敗した送信を同じキーで送り直す
    pub fn retry_unlock(&self, person_id: &PersonId) -> Result<UnlockResponse, Error> {
        let key = self
            .pending_key(person_id)
            .ok_or_else(|| Error::invalid_argument(format!("No failed unlock to retry for {}", person_id)))?;
        self.submit(person_id, key)
    }

    fn submit(&self, person_id: &PersonId, key: IdempotencyKey) -> Result<UnlockResponse, Error> {
        let path = format!("/people/{}/unlock-contact", path_segment(person_id.as_str()));
        let result: Result<UnlockResponse, Error> =
            self.deps
                .client
                .with_idempotency(&path, &key, RequestOptions::new(Method::Post));
        match result {
            Ok(resp) => {
                self.pending().remove(person_id);
                self.deps.store.invalidate(&[QueryKey::Credits]);
                self.deps.emit(
                    LogRecord::new(LogLevel::Info, "contact unlocked")
                        .kind("unlock")
                        .field("person_id", person_id.as_str())
                        .field("unlocked", resp.unlocked),
                );
                Ok(resp)
            }
            Err(e) => {
                self.pending().insert(person_id.clone(), key);
                self.deps.emit_failure("unlock", "contact unlock failed", &e);
                Err(e)
            }
        }
    }
}
