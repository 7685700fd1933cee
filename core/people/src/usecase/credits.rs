//! クレジット残高ビュー
//!
//! 残高はサーバーから読み直すだけで、ローカルでは決して差し引かない。
//! 消費が分かっている操作の後は `invalidate` し、次の `balance` で取り直す。

use common::error::Error;
use common::http::RequestOptions;
use common::ports::outbound::{LogLevel, LogRecord};
use serde::Deserialize;

use super::Deps;
use crate::store::QueryKey;

#[derive(Debug, Deserialize)]
struct CreditsResponse {
    #[serde(alias = "credits", alias = "remaining")]
    balance: i64,
}

pub struct CreditLedgerView {
    deps: Deps,
}

impl CreditLedgerView {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// I/O なしで最後に読んだ残高を返す（未取得なら `None`）
    pub fn cached_balance(&self) -> Option<i64> {
        self.deps.store.read(|s| s.credits)
    }

    /// 残高を返す。未取得・無効化済み・鮮度切れのときだけ GET /me/credits を呼ぶ。
    pub fn balance(&self) -> Result<i64, Error> {
        let now = self.deps.clock.now_ms();
        let max_age = Some(self.deps.settings.credits_stale_ms);
        let (cached, seen) = self.deps.store.read(|s| {
            let cached = s
                .credits
                .filter(|_| s.queries.is_fresh(&QueryKey::Credits, now, max_age));
            (cached, s.queries.invalidation_count(&QueryKey::Credits))
        });
        if let Some(balance) = cached {
            return Ok(balance);
        }

        let resp: CreditsResponse = self
            .deps
            .client
            .call("/me/credits", RequestOptions::get())
            .inspect_err(|e| self.deps.emit_failure("credits", "credit balance fetch failed", e))?;
        // 取得中に残高が変わった可能性があるなら、この値は保存せず古いまま残す
        let stored = self.deps.store.write(|s| {
            let stored = s.queries.mark_fresh_since(QueryKey::Credits, now, seen);
            if stored {
                s.credits = Some(resp.balance);
            }
            stored
        });
        self.deps.emit(
            LogRecord::new(LogLevel::Debug, "credit balance refreshed")
                .kind("credits")
                .field("balance", resp.balance)
                .field("stored", stored),
        );
        Ok(resp.balance)
    }

    /// 残高を古いものとして扱う（値は変えない）
    pub fn invalidate(&self) {
        self.deps.store.invalidate(&[QueryKey::Credits]);
    }
}
