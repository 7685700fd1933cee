//! シナリオテスト（台本化した Transport で usecase を通しで動かす）

mod card_query_tests;
mod mutation_tests;

use std::sync::Arc;

use common::adapter::NoopLog;
use common::config::ClientConfig;
use common::ports::outbound::Method;
use serde_json::{json, Value};

use crate::adapter::{FixedClock, ScriptedTransport, SeqKeyGenerator};
use crate::wiring::{deps_with, App};

pub(crate) const T0: u64 = 1_700_000_000_000;

pub(crate) struct Harness {
    pub app: App,
    pub transport: Arc<ScriptedTransport>,
    pub clock: Arc<FixedClock>,
}

pub(crate) fn harness() -> Harness {
    harness_with(ClientConfig::default())
}

pub(crate) fn harness_with(config: ClientConfig) -> Harness {
    let transport = Arc::new(ScriptedTransport::new());
    let clock = Arc::new(FixedClock::new(T0));
    let deps = deps_with(
        &config,
        transport.clone(),
        clock.clone(),
        Arc::new(SeqKeyGenerator::default()),
        Arc::new(NoopLog),
    );
    Harness {
        app: App::from_deps(deps),
        transport,
        clock,
    }
}

/// `n` 人分の検索結果
pub(crate) fn people(prefix: &str, n: usize) -> Value {
    Value::Array(
        (0..n)
            .map(|i| json!({"id": format!("{}{}", prefix, i), "display_name": format!("Person {}", i)}))
            .collect(),
    )
}

/// p1(c1, c2) と p2(c3) の 2 ファミリー
pub(crate) fn two_families() -> Value {
    json!([
        {
            "parent": {"id": "p1", "title": "Backend at Acme", "start_date": "2020-01", "end_date": "2021-03"},
            "children": [
                {"id": "c1", "parent_id": "p1", "relation_type": "skill_applied", "title": "Rust"},
                {"id": "c2", "parent_id": "p1", "relation_type": "tool_used", "title": "Postgres"}
            ]
        },
        {
            "parent": {"id": "p2", "title": "Intern at Beta"},
            "children": [
                {"id": "c3", "parent_id": "p2", "relation_type": "responsibility", "title": "On-call"}
            ]
        }
    ])
}

/// ファミリー一覧とフラットな親カード一覧を台本に載せて読み込んでおく
pub(crate) fn load_families(h: &Harness) {
    let families = two_families();
    let parents: Vec<Value> = families
        .as_array()
        .map(|list| list.iter().map(|f| f["parent"].clone()).collect())
        .unwrap_or_default();
    h.transport
        .respond(Method::Get, "/me/experience-card-families", 200, families)
        .respond(Method::Get, "/me/experience-cards", 200, Value::Array(parents));
    h.app.cards.families().unwrap();
    h.app.cards.cards().unwrap();
}
