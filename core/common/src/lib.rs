//! people クライアント共通ライブラリ
//!
//! `people` コマンドと状態同期レイヤーで共有される機能を提供します。

/// エラーハンドリング
pub mod error;

/// ドメイン型（Newtype）
pub mod domain;

/// Ports & Adapters のポート定義
pub mod ports;

/// ポートの標準実装
pub mod adapter;

/// リソースクライアント（HTTP/JSON 境界）
pub mod http;

/// config.json 用の設定型
pub mod config;
