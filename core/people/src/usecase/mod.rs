//! ユースケース（アダプター経由で I/O を行い、結果をセッションストアへ書き込む）

pub mod cards;
pub mod credits;
pub mod drafts;
pub mod mutation;
pub mod profile;
pub mod recent;
pub mod search;
pub mod unlock;

use common::http::ResourceClient;
use common::ports::outbound::{Clock, KeyGenerator, Log, LogLevel, LogRecord};
use std::sync::Arc;

use crate::store::SessionStore;

/// 各ユースケースが共有する依存（wiring が組み立てて渡す）
#[derive(Clone)]
pub struct Deps {
    pub client: Arc<ResourceClient>,
    pub store: Arc<SessionStore>,
    pub clock: Arc<dyn Clock>,
    pub keys: Arc<dyn KeyGenerator>,
    pub log: Arc<dyn Log>,
    pub settings: Settings,
}

/// ユースケースの調整値（ClientConfig から取り出す）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub page_size: usize,
    pub credits_stale_ms: u64,
}

impl Deps {
    /// usecase 層のログを 1 行出す（失敗は無視）
    pub(crate) fn emit(&self, record: LogRecord) {
        let _ = self.log.log(&record.layer("usecase"));
    }

    /// 失敗をログに残す。到達不能だけは kind を分けてテレメトリで数えられるようにする。
    pub(crate) fn emit_failure(&self, kind: &str, message: &str, err: &common::error::Error) {
        let kind = if err.is_unreachable() { "unreachable" } else { kind };
        self.emit(
            LogRecord::new(LogLevel::Warn, message)
                .kind(kind)
                .field("error", err.to_string()),
        );
    }
}
