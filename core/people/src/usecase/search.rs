//! Search Session Manager
//!
//! 状態遷移: `Idle → Submitting → Active → Appending → Active`、失効時は `Active → Expired`。
//!
//! `has_more` は「直前のページが満杯だったか」からの推測にすぎない。
//! 残り件数がページサイズのちょうど倍数のときは、空ページを 1 回取ってはじめて「続きなし」が確定する。
//! 空ページは推測より優先する。

use common::domain::IdempotencyKey;
use common::error::Error;
use common::http::{path_segment, RequestOptions};
use common::ports::outbound::{LogLevel, LogRecord};
use serde_json::json;
use std::sync::Mutex;

use super::Deps;
use crate::domain::{
    page_suggests_more, MoreResponse, RecentSearch, SearchId, SearchPhase, SearchResponse, SearchSession,
};
use crate::store::QueryKey;

/// 送信中の検索 1 件（同じ操作の再送は同じキーを使う）
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTicket {
    key: IdempotencyKey,
    query_text: String,
    open_to_work_only: bool,
    previous_phase: SearchPhase,
}

impl SearchTicket {
    pub fn key(&self) -> &IdempotencyKey {
        &self.key
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }
}

/// 送信中の追加ページ取得 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    search_id: SearchId,
    offset: usize,
    limit: usize,
    from_history: bool,
}

impl PageTicket {
    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Started {
        search_id: SearchId,
        result_count: usize,
        has_more: bool,
    },
    /// 送信中のため何もしなかった
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMoreOutcome {
    Appended { added: usize, has_more: bool },
    /// セッションなし・取得中・続きなし
    Ignored,
    /// 別の検索に置き換わった後に届いたページを捨てた
    Discarded,
}

pub struct SearchSessionManager {
    deps: Deps,
    failed: Mutex<Option<SearchTicket>>,
}

impl SearchSessionManager {
    pub fn new(deps: Deps) -> Self {
        Self {
            deps,
            failed: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> SearchPhase {
        self.deps.store.read(|s| s.search.phase)
    }

    pub fn session(&self) -> Option<SearchSession> {
        self.deps.store.read(|s| s.search.session.clone())
    }

    fn page_size(&self) -> usize {
        self.deps.settings.page_size
    }

    // --- 新規検索

    /// 送信を開始する。空の検索語はエラー、送信中なら `None`。
    /// 新しい操作なので毎回新しい冪等キーを作る。
    pub fn begin_search(&self, text: &str, open_to_work_only: bool) -> Result<Option<SearchTicket>, Error> {
        let query_text = text.trim();
        if query_text.is_empty() {
            return Err(Error::invalid_argument("Search query must not be empty"));
        }
        let ticket = self.enter_submitting().map(|previous_phase| SearchTicket {
            key: self.deps.keys.next_key(),
            query_text: query_text.to_string(),
            open_to_work_only,
            previous_phase,
        });
        Ok(ticket)
    }

    /// 送信中へ移る。すでに送信中なら `None`、そうでなければ失敗時に戻すフェーズを返す。
    /// 取得中の追加ページは置き換わるので、戻り先は `Active` になる。
    fn enter_submitting(&self) -> Option<SearchPhase> {
        self.deps.store.write(|s| {
            if s.search.phase == SearchPhase::Submitting {
                return None;
            }
            let previous = match s.search.phase {
                SearchPhase::Appending => SearchPhase::Active,
                other => other,
            };
            s.search.phase = SearchPhase::Submitting;
            Some(previous)
        })
    }

    /// POST /search（冪等キー付き）
    pub fn send_search(&self, ticket: &SearchTicket) -> Result<SearchResponse, Error> {
        let body = json!({
            "query": ticket.query_text,
            "open_to_work_only": ticket.open_to_work_only,
        });
        self.deps
            .client
            .with_idempotency("/search", &ticket.key, RequestOptions::post(body))
    }

    /// 応答を反映する。失敗時はセッションを変えず、クレジットも消費されたとはみなさない。
    pub fn complete_search(
        &self,
        ticket: SearchTicket,
        result: Result<SearchResponse, Error>,
    ) -> Result<SearchOutcome, Error> {
        match result {
            Ok(resp) => {
                let has_more = page_suggests_more(resp.people.len(), self.page_size());
                let outcome = SearchOutcome::Started {
                    search_id: resp.search_id.clone(),
                    result_count: resp.people.len(),
                    has_more,
                };
                self.deps.store.write(|s| {
                    s.search.session = Some(SearchSession {
                        search_id: resp.search_id,
                        query_text: ticket.query_text.clone(),
                        open_to_work_only: ticket.open_to_work_only,
                        results: resp.people,
                        has_more,
                        from_history: false,
                    });
                    s.search.phase = SearchPhase::Active;
                    s.queries.invalidate(&QueryKey::Credits);
                    s.queries.invalidate(&QueryKey::RecentSearches);
                });
                self.set_failed(None);
                if let SearchOutcome::Started { search_id, result_count, .. } = &outcome {
                    self.deps.emit(
                        LogRecord::new(LogLevel::Info, "search completed")
                            .kind("search")
                            .field("search_id", search_id.as_str())
                            .field("result_count", *result_count)
                            .field("has_more", has_more),
                    );
                }
                Ok(outcome)
            }
            Err(e) => {
                self.deps
                    .store
                    .write(|s| s.search.phase = ticket.previous_phase);
                self.deps.emit_failure("search", "search submission failed", &e);
                self.set_failed(Some(ticket));
                Err(e)
            }
        }
    }

    /// 検索を送信して結果をセッションに反映する
    pub fn perform_search(&self, text: &str, open_to_work_only: bool) -> Result<SearchOutcome, Error> {
        let Some(ticket) = self.begin_search(text, open_to_work_only)? else {
            return Ok(SearchOutcome::Ignored);
        };
        let result = self.send_search(&ticket);
        self.complete_search(ticket, result)
    }

    /// 直前に失敗した送信を、同じ検索語・同じ冪等キーで送り直す
    pub fn retry_search(&self) -> Result<SearchOutcome, Error> {
        let Some(failed) = self.take_failed() else {
            return Err(Error::invalid_argument("No failed search to retry"));
        };
        let ticket = self.enter_submitting().map(|previous_phase| SearchTicket {
            previous_phase,
            ..failed.clone()
        });
        let Some(ticket) = ticket else {
            self.set_failed(Some(failed));
            return Ok(SearchOutcome::Ignored);
        };
        let result = self.send_search(&ticket);
        self.complete_search(ticket, result)
    }

    /// 再送待ちの検索（失敗した送信のキーを保持している）
    pub fn failed_search(&self) -> Option<SearchTicket> {
        self.failed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn take_failed(&self) -> Option<SearchTicket> {
        self.failed.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn set_failed(&self, ticket: Option<SearchTicket>) {
        *self.failed.lock().unwrap_or_else(|e| e.into_inner()) = ticket;
    }

    // --- 追加ページ

    /// 追加取得を開始する。セッションなし・取得中・続きなしなら `None`。
    pub fn begin_load_more(&self) -> Option<PageTicket> {
        let limit = self.page_size();
        self.deps.store.write(|s| {
            if s.search.phase != SearchPhase::Active {
                return None;
            }
            let session = s.search.session.as_ref().filter(|sess| sess.has_more)?;
            let ticket = PageTicket {
                search_id: session.search_id.clone(),
                offset: session.results.len(),
                limit,
                from_history: session.from_history,
            };
            s.search.phase = SearchPhase::Appending;
            Some(ticket)
        })
    }

    /// GET /search/{id}/more?offset&limit[&history]
    pub fn send_load_more(&self, ticket: &PageTicket) -> Result<MoreResponse, Error> {
        self.deps.client.call(&more_path(ticket), RequestOptions::get())
    }

    pub fn complete_load_more(
        &self,
        ticket: PageTicket,
        result: Result<MoreResponse, Error>,
    ) -> Result<LoadMoreOutcome, Error> {
        let is_current = self.deps.store.read(|s| {
            s.search
                .session
                .as_ref()
                .is_some_and(|sess| sess.search_id == ticket.search_id)
        });
        if !is_current {
            return match result {
                Ok(_) => Ok(LoadMoreOutcome::Discarded),
                Err(e) => Err(e),
            };
        }

        match result {
            Ok(page) => {
                let added = page.people.len();
                let has_more = page_suggests_more(added, ticket.limit);
                self.deps.store.write(|s| {
                    if let Some(session) = s.search.session.as_mut() {
                        session.results.extend(page.people);
                        session.has_more = has_more;
                    }
                    settle_appending(&mut s.search.phase, SearchPhase::Active);
                    s.queries.invalidate(&QueryKey::Credits);
                });
                self.deps.emit(
                    LogRecord::new(LogLevel::Debug, "search page appended")
                        .kind("search")
                        .field("search_id", ticket.search_id.as_str())
                        .field("offset", ticket.offset)
                        .field("added", added)
                        .field("has_more", has_more),
                );
                Ok(LoadMoreOutcome::Appended { added, has_more })
            }
            Err(e) => {
                let expired = e.is_not_found();
                self.deps.store.write(|s| {
                    if expired {
                        if let Some(session) = s.search.session.as_mut() {
                            session.has_more = false;
                        }
                        settle_appending(&mut s.search.phase, SearchPhase::Expired);
                    } else {
                        settle_appending(&mut s.search.phase, SearchPhase::Active);
                    }
                });
                self.deps.emit_failure("search", "loading more results failed", &e);
                Err(e)
            }
        }
    }

    /// 次のページを取得して末尾に追加する
    pub fn load_more(&self) -> Result<LoadMoreOutcome, Error> {
        let Some(ticket) = self.begin_load_more() else {
            return Ok(LoadMoreOutcome::Ignored);
        };
        let result = self.send_load_more(&ticket);
        self.complete_load_more(ticket, result)
    }

    // --- 検索履歴から開く

    /// 検索履歴から 1 件を開く（最初のページを `history=true` で取り直す。新しいキーは作らない）
    pub fn open_recent_search(&self, recent: &RecentSearch) -> Result<SearchOutcome, Error> {
        let Some(previous_phase) = self.enter_submitting() else {
            return Ok(SearchOutcome::Ignored);
        };

        let ticket = PageTicket {
            search_id: recent.search_id.clone(),
            offset: 0,
            limit: self.page_size(),
            from_history: true,
        };
        match self.send_load_more(&ticket) {
            Ok(page) => {
                let has_more = page_suggests_more(page.people.len(), ticket.limit);
                let result_count = page.people.len();
                self.deps.store.write(|s| {
                    s.search.session = Some(SearchSession {
                        search_id: recent.search_id.clone(),
                        query_text: recent.query_text.clone(),
                        open_to_work_only: recent.open_to_work_only,
                        results: page.people,
                        has_more,
                        from_history: true,
                    });
                    s.search.phase = SearchPhase::Active;
                    s.queries.invalidate(&QueryKey::Credits);
                });
                Ok(SearchOutcome::Started {
                    search_id: recent.search_id.clone(),
                    result_count,
                    has_more,
                })
            }
            Err(e) => {
                self.deps.store.write(|s| s.search.phase = previous_phase);
                self.deps.emit_failure("search", "opening recent search failed", &e);
                Err(e)
            }
        }
    }
}

/// 追加取得の完了で動かすのは `Appending` のときだけ。
/// 取得中に新しい検索が始まっていれば `Submitting` のまま残す。
fn settle_appending(phase: &mut SearchPhase, next: SearchPhase) {
    if *phase == SearchPhase::Appending {
        *phase = next;
    }
}

fn more_path(ticket: &PageTicket) -> String {
    let mut path = format!(
        "/search/{}/more?offset={}&limit={}",
        path_segment(ticket.search_id.as_str()),
        ticket.offset,
        ticket.limit
    );
    if ticket.from_history {
        path.push_str("&history=true");
    }
    path
}
