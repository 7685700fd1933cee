//! config.json 用の設定型
//!
//! API ベース URL・ページサイズ・クレジット残高の鮮度・ログ出力先を解決するための構造体。
//! ファイルが無ければ既定値、環境変数があればファイルより優先する。

use crate::domain::AuthToken;
use crate::error::Error;
use crate::ports::outbound::{EnvResolver, FileSystem};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_PAGE_SIZE: usize = 6;
pub const DEFAULT_CREDITS_STALE_MS: u64 = 30_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// 解決済みのクライアント設定
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// 検索結果 1 ページの件数（`has_more` の判定にも使う）
    pub page_size: usize,
    /// クレジット残高のキャッシュを新鮮とみなす時間
    pub credits_stale_ms: u64,
    pub request_timeout_secs: u64,
    /// JSONL ログの出力先（未指定ならログを出さない）
    pub log_file: Option<PathBuf>,
    pub token: Option<AuthToken>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            credits_stale_ms: DEFAULT_CREDITS_STALE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_file: None,
            token: None,
        }
    }
}

/// serde 用の内部構造（全項目省略可）
#[derive(Debug, Default, Deserialize)]
struct ClientConfigRaw {
    #[serde(alias = "base_url", alias = "api_url")]
    api_base_url: Option<String>,
    #[serde(alias = "search_page_size")]
    page_size: Option<usize>,
    credits_stale_ms: Option<u64>,
    #[serde(alias = "timeout_secs")]
    request_timeout_secs: Option<u64>,
    log_file: Option<PathBuf>,
}

impl ClientConfig {
    /// JSON 文字列からパース（ファイル読みは `load` で行う）
    pub fn parse(json: &str) -> Result<Self, Error> {
        let raw: ClientConfigRaw = serde_json::from_str(json)?;
        let defaults = Self::default();
        let page_size = raw.page_size.unwrap_or(defaults.page_size);
        if page_size == 0 {
            return Err(Error::invalid_argument("page_size must be at least 1"));
        }
        Ok(Self {
            api_base_url: raw.api_base_url.unwrap_or(defaults.api_base_url),
            page_size,
            credits_stale_ms: raw.credits_stale_ms.unwrap_or(defaults.credits_stale_ms),
            request_timeout_secs: raw
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            log_file: raw.log_file,
            token: None,
        })
    }

    /// 設定ファイルと環境変数から解決する
    ///
    /// 優先順位: 環境変数 > config.json > 既定値
    pub fn load(fs: &dyn FileSystem, env: &dyn EnvResolver) -> Result<Self, Error> {
        let path = env.resolve_config_path()?;
        let mut config = if fs.is_file(&path) {
            let text = fs.read_to_string(&path)?;
            Self::parse(&text).map_err(|e| {
                Error::invalid_argument(format!("Invalid config '{}': {}", path.display(), e))
            })?
        } else {
            Self::default()
        };
        if let Some(url) = env.api_base_url() {
            config.api_base_url = url;
        }
        config.token = env.api_token();
        Ok(config)
    }
}
