//! リソースクライアント
//!
//! 認証ヘッダーの付与・JSON ボディのシリアライズ・サーバーエラーの正規化を 1 か所に集める。
//! ネットワークそのものは HttpTransport ポートに委譲する。

use crate::domain::{AuthToken, IdempotencyKey};
use crate::error::Error;
use crate::ports::outbound::{HttpRequest, HttpResponse, HttpTransport, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;

/// 冪等キーを載せるヘッダー名
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// 1 リクエスト分のオプション（メソッド・ボディ・追加ヘッダー）
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::Get)
    }

    pub fn post(body: Value) -> Self {
        Self::new(Method::Post).body(body)
    }

    pub fn patch(body: Value) -> Self {
        Self::new(Method::Patch).body(body)
    }

    pub fn delete() -> Self {
        Self::new(Method::Delete)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// HTTP/JSON 境界のクライアント
pub struct ResourceClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    token: Option<AuthToken>,
}

impl ResourceClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>, token: Option<AuthToken>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
            token,
        }
    }

    /// リクエストを送り、成功時の JSON を `T` にデコードする。
    /// 204 や空ボディは JSON `null` として扱う（`()` や `Option<T>` で受けられる）。
    pub fn call<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T, Error> {
        let value = self.call_value(path, options)?;
        serde_json::from_value(value).map_err(|e| Error::json(format!("{}: {}", path, e)))
    }

    /// `call` の冪等キー付き版。重複排除はサーバーの責務で、クライアントはキーを渡すだけ。
    pub fn with_idempotency<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &IdempotencyKey,
        options: RequestOptions,
    ) -> Result<T, Error> {
        self.call(path, options.header(IDEMPOTENCY_HEADER, key.as_str()))
    }

    fn call_value(&self, path: &str, options: RequestOptions) -> Result<Value, Error> {
        let request = self.build_request(path, options)?;
        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(error_from_response(&response));
        }
        if response.status == 204 || response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| Error::json(format!("{}: {}", path, e)))
    }

    fn build_request(&self, path: &str, options: RequestOptions) -> Result<HttpRequest, Error> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(token) = &self.token {
            headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", token.expose()),
            ));
        }
        let body = match options.body {
            Some(body) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                Some(serde_json::to_string(&body)?)
            }
            None => None,
        };
        headers.extend(options.headers);
        let url = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Ok(HttpRequest {
            method: options.method,
            url,
            headers,
            body,
        })
    }
}

/// 非 2xx レスポンスを 1 本のメッセージを持つ Error に変換する
pub fn error_from_response(response: &HttpResponse) -> Error {
    let message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|v| error_message_from_envelope(&v))
        .unwrap_or_else(|| format!("HTTP {}", response.status));
    Error::api(response.status, message)
}

/// エラーエンベロープからメッセージを取り出す
///
/// - `{"detail": "..."}`
/// - `{"detail": [{"msg": "..."}, ...]}`（`; ` で連結）
/// - `{"message": "..."}`
pub fn error_message_from_envelope(v: &Value) -> Option<String> {
    match v.get("detail") {
        Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
        Some(Value::Array(items)) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    other => other.get("msg").and_then(Value::as_str).map(str::to_string),
                })
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }
    v.get("message")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// パスの 1 セグメントとして埋め込む値をエンコードする（`/` や `?` も逃がす）
pub fn path_segment(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorKind;
    use serde_json::json;
    use std::sync::Mutex;

    /// 固定レスポンスを返し、受け取ったリクエストを記録する
    struct OneShot {
        response: Result<HttpResponse, Error>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl OneShot {
        fn new(response: Result<HttpResponse, Error>) -> Arc<Self> {
            Arc::new(Self {
                response,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl HttpTransport for OneShot {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
            self.seen.lock().unwrap().push(request.clone());
            self.response.clone()
        }
    }

    fn client(t: Arc<OneShot>, token: Option<&str>) -> ResourceClient {
        ResourceClient::new(t, "http://api.test/", token.map(AuthToken::new))
    }

    #[test]
    fn test_attaches_bearer_and_serializes_body() {
        let t = OneShot::new(Ok(HttpResponse::new(200, r#"{"balance": 12}"#)));
        let c = client(t.clone(), Some("tok"));
        let v: Value = c.call("/me/credits", RequestOptions::post(json!({"a": 1}))).unwrap();
        assert_eq!(v["balance"], 12);

        let seen = t.seen.lock().unwrap();
        assert_eq!(seen[0].url, "http://api.test/me/credits");
        assert_eq!(seen[0].header("authorization"), Some("Bearer tok"));
        assert_eq!(seen[0].header("Content-Type"), Some("application/json"));
        assert_eq!(seen[0].body.as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_no_token_no_authorization_header() {
        let t = OneShot::new(Ok(HttpResponse::new(200, "{}")));
        let c = client(t.clone(), None);
        let _: Value = c.call("me/credits", RequestOptions::get()).unwrap();
        let seen = t.seen.lock().unwrap();
        assert_eq!(seen[0].header("Authorization"), None);
        assert_eq!(seen[0].url, "http://api.test/me/credits");
        assert!(seen[0].body.is_none());
    }

    #[test]
    fn test_idempotency_header() {
        let t = OneShot::new(Ok(HttpResponse::new(200, "{}")));
        let c = client(t.clone(), None);
        let key = IdempotencyKey::new("1-abc");
        let _: Value = c
            .with_idempotency("/search", &key, RequestOptions::post(json!({})))
            .unwrap();
        assert_eq!(t.seen.lock().unwrap()[0].header(IDEMPOTENCY_HEADER), Some("1-abc"));
    }

    #[test]
    fn test_no_content_decodes_as_unit() {
        let t = OneShot::new(Ok(HttpResponse::new(204, "")));
        let c = client(t, None);
        let r: Result<(), Error> = c.call("/experience-cards/c1", RequestOptions::delete());
        assert!(r.is_ok());
    }

    #[test]
    fn test_string_detail() {
        let t = OneShot::new(Ok(HttpResponse::new(404, r#"{"detail": "Card not found"}"#)));
        let err = client(t, None)
            .call::<Value>("/x", RequestOptions::get())
            .unwrap_err();
        assert_eq!(err.to_string(), "Card not found");
        assert_eq!(err.kind(), Some(ApiErrorKind::NotFound));
    }

    #[test]
    fn test_list_detail_is_joined() {
        let body = r#"{"detail": [{"loc": ["body","title"], "msg": "field required"}, {"msg": "too long"}]}"#;
        let t = OneShot::new(Ok(HttpResponse::new(422, body)));
        let err = client(t, None)
            .call::<Value>("/x", RequestOptions::get())
            .unwrap_err();
        assert_eq!(err.to_string(), "field required; too long");
        assert_eq!(err.kind(), Some(ApiErrorKind::Validation));
    }

    #[test]
    fn test_non_json_error_falls_back_to_status() {
        let t = OneShot::new(Ok(HttpResponse::new(502, "<html>bad gateway</html>")));
        let err = client(t, None)
            .call::<Value>("/x", RequestOptions::get())
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502");
        assert_eq!(err.kind(), Some(ApiErrorKind::Server));
    }

    #[test]
    fn test_insufficient_credits() {
        let t = OneShot::new(Ok(HttpResponse::new(400, r#"{"detail": "Insufficient credits"}"#)));
        let err = client(t, None)
            .call::<Value>("/search", RequestOptions::post(json!({})))
            .unwrap_err();
        assert_eq!(err.kind(), Some(ApiErrorKind::InsufficientCredits));
    }

    #[test]
    fn test_transport_failure_passes_through() {
        let t = OneShot::new(Err(Error::Unreachable("dns".to_string())));
        let err = client(t, None)
            .call::<Value>("/x", RequestOptions::get())
            .unwrap_err();
        assert!(err.is_unreachable());
    }

    #[test]
    fn test_path_segment_escapes_separators() {
        assert_eq!(path_segment("abc-123"), "abc-123");
        assert_eq!(path_segment("a b/c?d"), "a%20b%2Fc%3Fd");
    }
}
