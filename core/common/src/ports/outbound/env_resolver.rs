//! 環境変数解決 Outbound ポート
//!
//! ホームディレクトリ・API ベース URL・トークンを環境変数から解決する。
//! usecase はこの trait 経由でのみ環境変数にアクセスする。

use crate::domain::{AuthToken, HomeDir};
use crate::error::Error;
use std::path::PathBuf;

/// 環境変数解決抽象（Outbound ポート）
///
/// 実装は `common::adapter::StdEnvResolver` やテスト用のモックなど。
pub trait EnvResolver: Send + Sync {
    /// ホームディレクトリを環境変数から解決する
    ///
    /// 優先順位:
    /// 1. PEOPLE_HOME（設定されていれば）
    /// 2. $XDG_CONFIG_HOME/people（XDG_CONFIG_HOME が設定されていれば）
    /// 3. $HOME/.config/people
    fn resolve_home_dir(&self) -> Result<HomeDir, Error>;

    /// 設定ファイルのパス（resolve_home_dir() 直下の config.json）
    fn resolve_config_path(&self) -> Result<PathBuf, Error> {
        Ok(self.resolve_home_dir()?.join("config.json"))
    }

    /// PEOPLE_API_BASE_URL（設定ファイルより優先）
    fn api_base_url(&self) -> Option<String>;

    /// PEOPLE_API_TOKEN
    fn api_token(&self) -> Option<AuthToken>;
}
