//! HTTP 送受信 Outbound ポート
//!
//! ResourceClient はこの trait 経由でのみネットワークに触れる。
//! 実装は `common::adapter::ReqwestTransport` やテスト用のスクリプト化された偽実装など。

use crate::error::Error;

/// HTTP メソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// 送信する 1 リクエスト（URL は base_url 結合済み）
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// シリアライズ済み JSON
    pub body: Option<String>,
}

impl HttpRequest {
    /// ヘッダー値を名前で引く（大文字小文字は区別しない）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 受信したレスポンス（ステータスと本文のみ）
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP 送受信の抽象（Outbound ポート）
pub trait HttpTransport: Send + Sync {
    /// リクエストを送り、ステータスにかかわらずレスポンスを返す。
    /// 接続できなかった場合のみ `Error::Unreachable` を返す。
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;
}
