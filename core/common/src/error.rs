//! エラーハンドリング
//!
//! すべての層が同じ `Error` を返す。表示用メッセージは `Display` に 1 本化し、
//! 終了コードは `exit_code()` で sysexits 相当の値に変換する。

/// サーバーが返したエラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 4xx（detail 付きのペイロード不正など）
    Validation,
    /// 404（リモートで既に削除済みなど）
    NotFound,
    /// クレジット不足（402、または detail がクレジットに言及する 4xx）
    InsufficientCredits,
    /// 401 / 403
    Unauthorized,
    /// 5xx
    Server,
}

impl ApiErrorKind {
    /// HTTP ステータスとメッセージから分類する
    pub fn classify(status: u16, message: &str) -> Self {
        let mentions_credits = message.to_lowercase().contains("credit");
        match status {
            402 => Self::InsufficientCredits,
            404 | 410 => Self::NotFound,
            400 | 403 | 409 | 422 if mentions_credits => Self::InsufficientCredits,
            401 | 403 => Self::Unauthorized,
            400..=499 => Self::Validation,
            _ => Self::Server,
        }
    }
}

/// エラー型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// DNS / 接続失敗など、サービスに到達できなかった
    #[error("Service unreachable: {0}")]
    Unreachable(String),
    /// サーバーが非 2xx を返した
    #[error("{message}")]
    Api {
        status: u16,
        kind: ApiErrorKind,
        message: String,
    },
    #[error("Invalid JSON: {0}")]
    Json(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Env(String),
}

impl Error {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Api {
            status,
            kind: ApiErrorKind::classify(status, &message),
            message,
        }
    }

    pub fn io_msg(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn env(msg: impl Into<String>) -> Self {
        Self::Env(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn json(e: impl std::fmt::Display) -> Self {
        Self::Json(e.to_string())
    }

    pub fn kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// ネットワーク層の失敗か（テレメトリ用に区別する唯一のクラス）
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ApiErrorKind::NotFound)
    }

    /// 終了コード（64: 引数・環境、70: 内部、74: I/O・リモート）
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) | Self::Env(_) => 64,
            Self::Json(_) => 70,
            Self::Unreachable(_) | Self::Api { .. } | Self::Io(_) => 74,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::json(e)
    }
}
