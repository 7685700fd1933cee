//! reqwest（blocking）による HttpTransport 実装

use crate::error::Error;
use crate::ports::outbound::{HttpRequest, HttpResponse, HttpTransport, Method};
use std::time::Duration;

/// reqwest::blocking::Client を委譲する HttpTransport 実装
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// タイムアウト付きのクライアントを作る
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::env(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        // 接続前後のどこで落ちても到達不能として扱う
        let response = builder
            .send()
            .map_err(|e| Error::Unreachable(format!("{} {}: {}", request.method.as_str(), request.url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| Error::Unreachable(format!("Failed to read response: {}", e)))?;
        Ok(HttpResponse { status, body })
    }
}
