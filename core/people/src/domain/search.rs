//! 検索セッションと人物まわりの型

use super::family::CardFamily;
use super::ids::{PersonId, SearchId};
use serde::{Deserialize, Serialize};

/// 検索結果 1 件（一覧表示用の最小射影）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSearchResult {
    #[serde(alias = "person_id")]
    pub id: PersonId,
    #[serde(default, alias = "name")]
    pub display_name: String,
    #[serde(default)]
    pub open_to_work: bool,
    #[serde(default)]
    pub open_to_contact: bool,
}

/// POST /search のレスポンス
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub search_id: SearchId,
    #[serde(default)]
    pub people: Vec<PersonSearchResult>,
}

/// GET /search/{id}/more のレスポンス
#[derive(Debug, Clone, Deserialize)]
pub struct MoreResponse {
    #[serde(default)]
    pub people: Vec<PersonSearchResult>,
}

/// 検索セッション
///
/// `has_more` は「直前のページが満杯だったか」からの推測で、サーバーの件数ではない。
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSession {
    pub search_id: SearchId,
    pub query_text: String,
    pub open_to_work_only: bool,
    pub results: Vec<PersonSearchResult>,
    pub has_more: bool,
    /// 検索履歴から開いたセッション（追加取得に `history=true` を付ける）
    pub from_history: bool,
}

/// 検索セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Submitting,
    Active,
    Appending,
    /// サーバー側でセッションが失効した
    Expired,
}

/// ページが満杯なら続きがあるとみなす。空ページは常に「続きなし」。
pub fn page_suggests_more(page_len: usize, page_size: usize) -> bool {
    page_len > 0 && page_len >= page_size
}

/// 検索履歴 1 件（GET /me/searches）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecentSearch {
    #[serde(alias = "id")]
    pub search_id: SearchId,
    #[serde(default, alias = "query")]
    pub query_text: String,
    pub created_at: Option<String>,
    #[serde(default)]
    pub open_to_work_only: bool,
    pub result_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecentSearchesResponse {
    #[serde(default)]
    pub searches: Vec<RecentSearch>,
}

/// 連絡先
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ContactDetails {
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(alias = "linkedin")]
    pub linkedin_url: Option<String>,
}

/// POST /people/{id}/unlock-contact のレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnlockResponse {
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub contact: Option<ContactDetails>,
}

/// 検索結果を開いたときに取得するプロフィール
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PersonProfile {
    #[serde(alias = "person_id")]
    pub id: PersonId,
    #[serde(default, alias = "name")]
    pub display_name: String,
    pub headline: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "deserialize_families")]
    pub families: Vec<CardFamily>,
}

fn deserialize_families<'de, D>(deserializer: D) -> Result<Vec<CardFamily>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    super::family::normalize_families(value)
        .map(|n| n.families)
        .map_err(serde::de::Error::custom)
}
