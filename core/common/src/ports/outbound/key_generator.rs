//! 冪等キー生成 Outbound ポート
//!
//! usecase は KeyGenerator を注入し、テストでは連番のキーを返す実装を渡せる。

use crate::domain::IdempotencyKey;

/// IdempotencyKey を生成する抽象（Outbound ポート）
pub trait KeyGenerator: Send + Sync {
    /// 新しい論理操作のためのキーを返す（呼ぶたびに異なる値）
    fn next_key(&self) -> IdempotencyKey;
}
