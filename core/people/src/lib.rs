//! people: 人物検索クライアントの状態同期レイヤー
//!
//! 検索セッション・カードファミリー・クレジット残高をサーバーと同期させる。
//! ネットワークは common の ResourceClient 経由、状態は SessionStore に集約する。

pub mod adapter;
pub mod domain;
pub mod store;
pub mod usecase;
pub mod wiring;

#[cfg(test)]
mod tests;
