use common::ports::outbound::Method;
use serde_json::json;

use super::{harness, load_families, Harness};
use crate::domain::{CardId, CardPatch};
use crate::store::{CardFamilyCache, EditingTarget, QueryKey};
use crate::usecase::mutation::{CardMutation, ServerAck};

fn cache(h: &Harness) -> CardFamilyCache {
    h.app.store.read(|s| s.cards.clone())
}

fn id(s: &str) -> CardId {
    CardId::new(s)
}

fn title_patch(title: &str) -> CardPatch {
    CardPatch {
        title: Some(title.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_failed_mutations_restore_cache_exactly() {
    let cases = vec![
        (CardMutation::DeleteParent(id("p1")), Method::Delete, "/experience-cards/p1"),
        (
            CardMutation::PatchParent {
                id: id("p1"),
                patch: title_patch("Staff at Acme"),
            },
            Method::Patch,
            "/experience-cards/p1",
        ),
        (CardMutation::HideParent(id("p2")), Method::Post, "/experience-cards/p2/hide"),
        (CardMutation::DeleteChild(id("c2")), Method::Delete, "/experience-card-children/c2"),
        (
            CardMutation::PatchChild {
                id: id("c1"),
                patch: title_patch("Async Rust"),
            },
            Method::Patch,
            "/experience-card-children/c1",
        ),
    ];
    for (mutation, method, path) in cases {
        let h = harness();
        load_families(&h);
        let before = cache(&h);
        h.transport
            .respond(method, path, 500, json!({"detail": "boom"}));

        let label = mutation.label();
        let err = h.app.mutations.run(mutation).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(cache(&h), before, "rollback of {} must restore the snapshot", label);
        assert!(cache(&h).is_consistent());
    }
}

#[test]
fn test_unreachable_delete_rolls_back() {
    let h = harness();
    load_families(&h);
    let before = cache(&h);
    h.transport.unreachable(Method::Delete, "/experience-cards/p2");

    let err = h.app.mutations.delete_parent(&id("p2")).unwrap_err();
    assert!(err.is_unreachable());
    assert_eq!(cache(&h), before);
}

#[test]
fn test_optimistic_delete_removes_family_before_server_answers() {
    let h = harness();
    load_families(&h);
    let pending = h.app.mutations.begin(CardMutation::DeleteParent(id("p1")));
    h.app.store.read(|s| {
        assert!(s.cards.family(&id("p1")).is_none());
        assert!(s.cards.child(&id("c1")).is_none());
        assert!(s.cards.is_consistent());
    });
    h.app.mutations.rollback(pending);
    assert!(cache(&h).family(&id("p1")).is_some());
}

#[test]
fn test_delete_not_found_is_success() {
    let h = harness();
    load_families(&h);
    h.transport
        .respond(Method::Delete, "/experience-card-children/c3", 404, json!({"detail": "Not found"}));

    let ack = h.app.mutations.delete_child(&id("c3")).unwrap();
    assert_eq!(ack, ServerAck::AlreadyRemoved);
    assert!(cache(&h).child(&id("c3")).is_none());
}

#[test]
fn test_patch_not_found_is_an_error() {
    let h = harness();
    load_families(&h);
    h.transport
        .respond(Method::Patch, "/experience-cards/p1", 404, json!({"detail": "Not found"}));
    let err = h.app.mutations.patch_parent(&id("p1"), title_patch("x")).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        cache(&h).parent(&id("p1")).unwrap().title.as_deref(),
        Some("Backend at Acme")
    );
}

#[test]
fn test_settle_invalidates_card_queries_on_success_and_failure() {
    let h = harness();
    load_families(&h);
    h.transport
        .respond(Method::Delete, "/experience-cards/p2", 204, json!(null))
        .respond(Method::Delete, "/experience-cards/p1", 500, json!({"detail": "x"}));

    h.app.mutations.delete_parent(&id("p2")).unwrap();
    let after_ok = h
        .app
        .store
        .read(|s| s.queries.invalidation_count(&QueryKey::CardFamilies));
    assert_eq!(after_ok, 1);

    h.app.mutations.delete_parent(&id("p1")).unwrap_err();
    h.app.store.read(|s| {
        assert_eq!(s.queries.invalidation_count(&QueryKey::CardFamilies), 2);
        assert_eq!(s.queries.invalidation_count(&QueryKey::ExperienceCards), 2);
    });
}

#[test]
fn test_patch_body_carries_only_changed_fields() {
    let h = harness();
    load_families(&h);
    h.transport.respond(
        Method::Patch,
        "/experience-cards/p2",
        200,
        json!({"id": "p2", "title": "Intern at Beta Corp"}),
    );
    h.app
        .mutations
        .patch_parent(&id("p2"), title_patch("Intern at Beta Corp"))
        .unwrap();
    let sent = h.transport.requests_to(Method::Patch, "/experience-cards/p2");
    let body: serde_json::Value = serde_json::from_str(sent[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"title": "Intern at Beta Corp"}));
}

#[test]
fn test_server_dates_win_over_optimistic_guess() {
    let h = harness();
    load_families(&h);
    let patch = CardPatch {
        start_date: Some("2019-05".to_string()),
        end_date: Some("2020-08".to_string()),
        ..Default::default()
    };
    let pending = h.app.mutations.begin(CardMutation::PatchParent {
        id: id("p1"),
        patch,
    });
    assert_eq!(
        cache(&h).parent(&id("p1")).unwrap().time_range.as_deref(),
        Some("May 2019 - Aug 2020")
    );

    // サーバーが日付を補正して返し、ラベルは古いまま
    h.transport.respond(
        Method::Patch,
        "/experience-cards/p1",
        200,
        json!({
            "id": "p1",
            "title": "Backend at Acme",
            "start_date": "2019-06",
            "end_date": "2020-09",
            "time_range": "May 2019 - Aug 2020"
        }),
    );
    let ack = h.app.mutations.send(&pending).unwrap();
    h.app.mutations.commit(pending, ack);

    let c = cache(&h);
    assert_eq!(
        c.parent(&id("p1")).unwrap().time_range.as_deref(),
        Some("Jun 2019 - Sep 2020")
    );
    assert_eq!(
        c.flat_card(&id("p1")).unwrap().time_range.as_deref(),
        Some("Jun 2019 - Sep 2020")
    );
    // 子は触らない
    assert_eq!(c.family(&id("p1")).unwrap().children.len(), 2);
}

#[test]
fn test_sibling_patch_failure_does_not_resurrect_deleted_child() {
    let h = harness();
    load_families(&h);
    let patch = h.app.mutations.begin(CardMutation::PatchChild {
        id: id("c1"),
        patch: title_patch("Async Rust"),
    });

    h.transport
        .respond(Method::Delete, "/experience-card-children/c2", 204, json!(null));
    h.app.mutations.delete_child(&id("c2")).unwrap();

    h.transport
        .respond(Method::Patch, "/experience-card-children/c1", 500, json!({"detail": "x"}));
    let result = h.app.mutations.send(&patch);
    assert!(result.is_err());
    h.app.mutations.rollback(patch);

    let c = cache(&h);
    assert!(c.child(&id("c2")).is_none());
    assert_eq!(c.child(&id("c1")).unwrap().title.as_deref(), Some("Rust"));
    assert!(c.is_consistent());
}

#[test]
fn test_sibling_patch_success_does_not_resurrect_deleted_child() {
    let h = harness();
    load_families(&h);
    let parent_patch = h.app.mutations.begin(CardMutation::PatchParent {
        id: id("p1"),
        patch: title_patch("Lead at Acme"),
    });
    let sibling_patch = h.app.mutations.begin(CardMutation::PatchChild {
        id: id("c1"),
        patch: title_patch("Async Rust"),
    });

    h.transport
        .respond(Method::Delete, "/experience-card-children/c2", 204, json!(null));
    h.app.mutations.delete_child(&id("c2")).unwrap();

    h.transport
        .respond(
            Method::Patch,
            "/experience-card-children/c1",
            200,
            json!({"id": "c1", "parent_id": "p1", "relation_type": "skill_applied", "title": "Async Rust"}),
        )
        .respond(
            Method::Patch,
            "/experience-cards/p1",
            200,
            json!({"id": "p1", "title": "Lead at Acme"}),
        );
    let ack = h.app.mutations.send(&sibling_patch).unwrap();
    h.app.mutations.commit(sibling_patch, ack);
    let ack = h.app.mutations.send(&parent_patch).unwrap();
    h.app.mutations.commit(parent_patch, ack);

    let c = cache(&h);
    let family = c.family(&id("p1")).unwrap();
    assert_eq!(family.parent.title.as_deref(), Some("Lead at Acme"));
    assert_eq!(family.children.len(), 1);
    assert_eq!(family.children[0].title.as_deref(), Some("Async Rust"));
    assert!(c.is_consistent());
}

#[test]
fn test_late_patch_of_deleted_child_is_dropped() {
    let h = harness();
    load_families(&h);
    let patch = h.app.mutations.begin(CardMutation::PatchChild {
        id: id("c2"),
        patch: title_patch("Postgres 16"),
    });
    h.transport
        .respond(Method::Delete, "/experience-card-children/c2", 204, json!(null));
    h.app.mutations.delete_child(&id("c2")).unwrap();

    h.transport.respond(
        Method::Patch,
        "/experience-card-children/c2",
        200,
        json!({"id": "c2", "parent_id": "p1", "title": "Postgres 16"}),
    );
    let ack = h.app.mutations.send(&patch).unwrap();
    h.app.mutations.commit(patch, ack);
    assert!(cache(&h).child(&id("c2")).is_none());
}

#[test]
fn test_editing_pointer_cleared_then_restored_on_rollback() {
    let h = harness();
    load_families(&h);
    h.app.store.write(|s| {
        s.cards.set_editing(Some(EditingTarget::Child {
            parent_id: id("p1"),
            child_id: id("c1"),
        }))
    });
    let pending = h.app.mutations.begin(CardMutation::DeleteParent(id("p1")));
    assert!(cache(&h).editing().is_none());

    h.app.mutations.rollback(pending);
    assert_eq!(
        cache(&h).editing(),
        Some(&EditingTarget::Child {
            parent_id: id("p1"),
            child_id: id("c1"),
        })
    );
}

#[test]
fn test_hide_marks_card_invisible() {
    let h = harness();
    load_families(&h);
    h.transport.respond(
        Method::Post,
        "/experience-cards/p2/hide",
        200,
        json!({"id": "p2", "title": "Intern at Beta", "visibility": false}),
    );
    h.app.mutations.hide_parent(&id("p2")).unwrap();
    let c = cache(&h);
    assert_eq!(c.parent(&id("p2")).unwrap().visible, Some(false));
    assert_eq!(c.family(&id("p2")).unwrap().children.len(), 1);
}

#[test]
fn test_interleaved_mutations_across_families_keep_cache_consistent() {
    let h = harness();
    load_families(&h);
    h.transport
        .respond(
            Method::Patch,
            "/experience-card-children/c1",
            200,
            json!({"id": "c1", "parent_id": "p1", "relation_type": "skill_applied", "title": "Async Rust"}),
        )
        .respond(Method::Delete, "/experience-cards/p2", 500, json!({"detail": "boom"}))
        .respond(Method::Delete, "/experience-card-children/c2", 204, json!(null))
        .respond(Method::Patch, "/experience-cards/p1", 200, json!({"id": "p1", "title": "Staff at Acme"}))
        .respond(Method::Delete, "/experience-card-children/c3", 204, json!(null))
        .respond(
            Method::Post,
            "/experience-cards/draft-v1",
            200,
            json!({"families": [{"parent": {"id": "d1", "title": "Side project"}, "children": [
                {"id": "d1a", "relation_type": "tool_used", "title": "Tokio"}
            ]}]}),
        )
        .respond(Method::Post, "/experience-cards/d1/approve", 200, json!({"id": "d1", "title": "Side project"}));

    let step = |name: &str| assert!(cache(&h).is_consistent(), "cache inconsistent after {}", name);
    let m = &h.app.mutations;

    let patch_c1 = m.begin(CardMutation::PatchChild {
        id: id("c1"),
        patch: title_patch("Async Rust"),
    });
    step("begin patch c1");
    let delete_p2 = m.begin(CardMutation::DeleteParent(id("p2")));
    step("begin delete p2");
    let delete_c3 = m.begin(CardMutation::DeleteChild(id("c3")));
    step("begin delete c3");
    let delete_c2 = m.begin(CardMutation::DeleteChild(id("c2")));
    step("begin delete c2");

    assert!(m.send(&delete_p2).is_err());
    m.rollback(delete_p2);
    step("rollback delete p2");
    assert!(cache(&h).family(&id("p2")).is_some());

    let ack = m.send(&patch_c1).unwrap();
    m.commit(patch_c1, ack);
    step("commit patch c1");

    let ack = m.send(&delete_c2).unwrap();
    m.commit(delete_c2, ack);
    step("commit delete c2");

    let patch_p1 = m.begin(CardMutation::PatchParent {
        id: id("p1"),
        patch: title_patch("Staff at Acme"),
    });
    step("begin patch p1");
    let ack = m.send(&patch_p1).unwrap();
    m.commit(patch_p1, ack);
    step("commit patch p1");

    let ack = m.send(&delete_c3).unwrap();
    m.commit(delete_c3, ack);
    m.settle();
    step("commit delete c3");

    h.app.drafts.structure_text("side project").unwrap();
    step("structure drafts");
    h.app.drafts.approve_draft(&id("d1")).unwrap();
    step("promote d1");

    let after = cache(&h);
    let p1 = after.family(&id("p1")).unwrap();
    assert_eq!(p1.parent.title.as_deref(), Some("Staff at Acme"));
    assert_eq!(p1.children.len(), 1);
    assert_eq!(p1.children[0].title.as_deref(), Some("Async Rust"));
    assert_eq!(after.family(&id("d1")).unwrap().children.len(), 1);
    assert!(after.drafts().is_empty());
    assert_eq!(after.families().len(), 3);
    assert_eq!(h.transport.remaining(), 0);
}
