use common::ports::outbound::Method;
use serde_json::json;

use super::{harness, load_families, two_families};
use crate::domain::{CardId, PersonId};
use crate::store::QueryKey;

#[test]
fn test_families_cached_until_invalidated() {
    let h = harness();
    load_families(&h);
    assert_eq!(h.app.cards.families().unwrap().len(), 2);
    assert_eq!(
        h.transport
            .requests_to(Method::Get, "/me/experience-card-families")
            .len(),
        1
    );

    h.transport
        .respond(Method::Delete, "/experience-cards/p2", 204, json!(null))
        .respond(
            Method::Get,
            "/me/experience-card-families",
            200,
            json!({"families": [two_families()[0].clone()]}),
        );
    h.app.mutations.delete_parent(&CardId::new("p2")).unwrap();
    let families = h.app.cards.families().unwrap();
    assert_eq!(families.len(), 1);
    assert_eq!(
        h.transport
            .requests_to(Method::Get, "/me/experience-card-families")
            .len(),
        2
    );
}

#[test]
fn test_inconsistent_server_families_are_dropped_at_the_boundary() {
    let h = harness();
    h.transport.respond(
        Method::Get,
        "/me/experience-card-families",
        200,
        json!([
            {"card": {"id": "p1", "company_name": "Acme", "headline": "  "}, "child_cards": [
                {"id": "c1", "parent_id": "p1", "relation_type": "tool_used"},
                {"id": "c9", "parent_id": "elsewhere"}
            ]},
            {"parent": {"id": "x", "parent_id": "p1"}}
        ]),
    );
    let families = h.app.cards.families().unwrap();
    assert_eq!(families.len(), 1);
    assert_eq!(families[0].parent.company.as_deref(), Some("Acme"));
    assert_eq!(families[0].parent.title, None);
    assert_eq!(families[0].children.len(), 1);
    assert!(h.app.store.read(|s| s.cards.is_consistent()));
}

#[test]
fn test_flat_cards_skip_children() {
    let h = harness();
    h.transport.respond(
        Method::Get,
        "/me/experience-cards",
        200,
        json!([{"id": "p1"}, {"id": "c1", "parent_id": "p1"}]),
    );
    let cards = h.app.cards.cards().unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].depth, 0);
}

#[test]
fn test_profile_cached_per_person() {
    let h = harness();
    h.transport
        .respond(
            Method::Get,
            "/people/a1",
            200,
            json!({"person_id": "a1", "name": "Asha", "headline": "Backend", "families": two_families()}),
        )
        .respond(Method::Get, "/people/b2", 404, json!({"detail": "Person not found"}));

    let profile = h.app.profiles.open(&PersonId::new("a1")).unwrap();
    assert_eq!(profile.display_name, "Asha");
    assert_eq!(profile.families.len(), 2);
    h.app.profiles.open(&PersonId::new("a1")).unwrap();
    assert_eq!(h.transport.requests_to(Method::Get, "/people/a1").len(), 1);

    assert!(h.app.profiles.open(&PersonId::new("b2")).unwrap_err().is_not_found());
}

#[test]
fn test_requests_carry_bearer_token() {
    use common::config::ClientConfig;
    use common::domain::AuthToken;

    let config = ClientConfig {
        token: Some(AuthToken::new("secret")),
        ..ClientConfig::default()
    };
    let h = super::harness_with(config);
    h.transport
        .respond(Method::Get, "/me/credits", 200, json!({"balance": 1}));
    h.app.credits.balance().unwrap();
    let sent = h.transport.requests();
    assert_eq!(sent[0].header("authorization"), Some("Bearer secret"));
    assert!(sent[0].url.starts_with("http://localhost:8000/me/credits"));
}

#[test]
fn test_delete_landing_during_families_fetch_is_not_overwritten() {
    let h = harness();
    load_families(&h);
    h.app.store.invalidate(&[QueryKey::CardFamilies]);
    h.transport
        .respond(Method::Get, "/me/experience-card-families", 200, two_families())
        .respond(
            Method::Get,
            "/me/experience-card-families",
            200,
            json!([two_families()[0].clone()]),
        );

    let store = h.app.store.clone();
    h.transport.on_send(move |req| {
        let p2 = CardId::new("p2");
        if req.url.contains("/me/experience-card-families") && store.read(|s| s.cards.family(&p2).is_some()) {
            store.write(|s| s.cards.remove_family(&p2));
            store.invalidate(&[QueryKey::CardFamilies]);
        }
    });

    let families = h.app.cards.families().unwrap();
    assert_eq!(families.len(), 1);
    assert_eq!(families[0].id(), &CardId::new("p1"));
    assert!(!h.app.store.read(|s| s.queries.is_fresh(&QueryKey::CardFamilies, super::T0, None)));

    assert_eq!(h.app.cards.families().unwrap().len(), 1);
    assert_eq!(
        h.transport
            .requests_to(Method::Get, "/me/experience-card-families")
            .len(),
        3
    );
    assert!(h.app.store.read(|s| s.queries.is_fresh(&QueryKey::CardFamilies, super::T0, None)));
}

#[test]
fn test_person_id_is_escaped_in_profile_path() {
    let h = harness();
    h.transport.respond(
        Method::Get,
        "/people/a%2F1%3Fx",
        200,
        json!({"person_id": "a/1?x", "name": "Asha"}),
    );
    let profile = h.app.profiles.open(&PersonId::new("a/1?x")).unwrap();
    assert_eq!(profile.display_name, "Asha");
    assert!(h.transport.requests()[0].url.ends_with("/people/a%2F1%3Fx"));
}
