use qualityguard::core::config::{PasswordConfig, QualityConfig};
use qualityguard::core::error::QualityError;
use qualityguard::core::store::Store;
use qualityguard::plugins::lifecycle::{
    self, create, delete, submit_commitment, submit_feedback, update,
};
use qualityguard::plugins::policy::Role;
use qualityguard::plugins::records::{
    self, NewRecord, RecordFilter, RecordPatch, RecordStatus,
};
use qualityguard::plugins::users::{self, Actor};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

fn fast_config() -> QualityConfig {
    QualityConfig {
        password: PasswordConfig {
            min_length: 8,
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            argon2_parallelism: 1,
        },
        ..Default::default()
    }
}

struct Cast {
    analyst: Actor,
    supervisor: Actor,
    agent: Actor,
}

fn setup(root: &std::path::Path, config: QualityConfig) -> (Store, Cast) {
    let store = Store::open_with_config(root, config).unwrap();
    let actor = |email: &str, role: Role| {
        users::register(&store, email, "password1", Some(role)).unwrap();
        users::authenticate(&store, email, "password1").unwrap()
    };
    let cast = Cast {
        analyst: actor("ana@example.com", Role::QualityAnalyst),
        supervisor: actor("sofia@example.com", Role::Supervisor),
        agent: actor("luis@example.com", Role::Agent),
    };
    (store, cast)
}

fn new_record(agent_name: &str, call_date: &str) -> NewRecord {
    NewRecord {
        call_details: "Customer asked to cancel roaming".into(),
        agent_name: agent_name.into(),
        call_date: call_date.into(),
        coordinator: "Marta".into(),
        monitoring_id: Some("MON-42".into()),
        end_user_error: "Wrong plan quoted".into(),
        business_critical_error: "none".into(),
        compliance_error: "Missing disclosure".into(),
        non_critical_error: "Long hold".into(),
        ..Default::default()
    }
}

#[test]
fn test_full_lifecycle_scenario() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());

    let r1 = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();
    assert_eq!(r1.status, RecordStatus::PendingFeedback);
    assert_eq!(r1.creator_email, "ana@example.com");
    assert_eq!(r1.service_level.as_deref(), Some("E-Care Movil"));
    assert!(r1.feedback.is_none() && r1.commitment.is_none());
    assert_eq!(r1.registration_date.len(), 10);

    let r1 = submit_feedback(&store, &cast.supervisor, r1.id, "Improve call opening").unwrap();
    assert_eq!(r1.status, RecordStatus::PendingCommitment);
    let feedback = r1.feedback.clone().unwrap();
    assert_eq!(feedback.text, "Improve call opening");
    assert_eq!(feedback.signature, "sofia@example.com");

    let r1 = submit_commitment(&store, &cast.agent, r1.id, "Will review script").unwrap();
    assert_eq!(r1.status, RecordStatus::Completed);
    assert_eq!(r1.commitment.as_ref().unwrap().signature, "luis@example.com");

    let err = submit_feedback(&store, &cast.supervisor, r1.id, "Again").unwrap_err();
    assert!(matches!(err, QualityError::InvalidState { .. }));
    let stored = records::get_record(&store, r1.id).unwrap();
    assert_eq!(stored.feedback.unwrap().text, "Improve call opening");

    let events: Vec<String> = records::list_events(&store, r1.id)
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        events,
        vec!["record.created", "record.feedback", "record.commitment"]
    );
}

#[test]
fn test_second_feedback_never_overwrites() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    users::register(&store, "other@example.com", "password1", Some(Role::Supervisor)).unwrap();
    let other = users::authenticate(&store, "other@example.com", "password1").unwrap();

    let rec = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();
    submit_feedback(&store, &cast.supervisor, rec.id, "First").unwrap();
    let err = submit_feedback(&store, &other, rec.id, "Second").unwrap_err();
    match err {
        QualityError::InvalidState { id, status, .. } => {
            assert_eq!(id, rec.id);
            assert_eq!(status, "PENDING_COMMITMENT");
        }
        other => panic!("expected InvalidState, got {other:?}"),
    }

    let stored = records::get_record(&store, rec.id).unwrap();
    let fb = stored.feedback.unwrap();
    assert_eq!(fb.text, "First");
    assert_eq!(fb.signature, "sofia@example.com");
}

#[test]
fn test_second_commitment_never_overwrites() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    users::register(&store, "eva@example.com", "password1", Some(Role::Agent)).unwrap();
    let other = users::authenticate(&store, "eva@example.com", "password1").unwrap();

    let rec = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();
    submit_feedback(&store, &cast.supervisor, rec.id, "Greet first").unwrap();
    let done = submit_commitment(&store, &cast.agent, rec.id, "Will greet").unwrap();
    let first = done.commitment.clone().unwrap();

    let err = submit_commitment(&store, &other, rec.id, "Overwrite").unwrap_err();
    match err {
        QualityError::InvalidState { id, status, .. } => {
            assert_eq!(id, rec.id);
            assert_eq!(status, "COMPLETED");
        }
        other => panic!("expected InvalidState, got {other:?}"),
    }

    let stored = records::get_record(&store, rec.id).unwrap();
    let commitment = stored.commitment.unwrap();
    assert_eq!(commitment.text, "Will greet");
    assert_eq!(commitment.signature, "luis@example.com");
    assert_eq!(commitment.date, first.date);
    assert_eq!(stored.status, RecordStatus::Completed);

    let commitment_events = records::list_events(&store, rec.id)
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == "record.commitment")
        .count();
    assert_eq!(commitment_events, 1);
}

#[test]
fn test_concurrent_feedback_has_exactly_one_winner() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    let rec = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();

    let store = Arc::new(store);
    let supervisor = Arc::new(cast.supervisor);
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let store = Arc::clone(&store);
            let supervisor = Arc::clone(&supervisor);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                submit_feedback(&store, &supervisor, rec.id, &format!("feedback {i}"))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for r in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(r, Err(QualityError::InvalidState { .. })));
    }

    let stored = records::get_record(&store, rec.id).unwrap();
    assert_eq!(
        stored.feedback.unwrap().text,
        winners[0].feedback.as_ref().unwrap().text
    );
    let feedback_events = records::list_events(&store, rec.id)
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == "record.feedback")
        .count();
    assert_eq!(feedback_events, 1);
}

#[test]
fn test_agent_create_is_forbidden_and_persists_nothing() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();
    let before = records::count_records(&store).unwrap();

    for actor in [&cast.agent, &cast.supervisor] {
        let err = create(&store, actor, &new_record("Luis", "2026-10-02")).unwrap_err();
        assert!(matches!(err, QualityError::Forbidden { .. }));
    }
    // Forbidden wins even over an invalid payload.
    let err = create(&store, &cast.agent, &NewRecord::default()).unwrap_err();
    assert!(matches!(err, QualityError::Forbidden { .. }));

    assert_eq!(records::count_records(&store).unwrap(), before);
}

#[test]
fn test_create_requires_every_field() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());

    let mut rec = new_record("Luis", "2026-10-01");
    rec.compliance_error = String::new();
    match create(&store, &cast.analyst, &rec).unwrap_err() {
        QualityError::Validation { field, .. } => assert_eq!(field, "compliance_error"),
        other => panic!("unexpected: {other}"),
    }

    let bad_date = new_record("Luis", "01/10/2026");
    match create(&store, &cast.analyst, &bad_date).unwrap_err() {
        QualityError::Validation { field, .. } => assert_eq!(field, "call_date"),
        other => panic!("unexpected: {other}"),
    }
    assert_eq!(records::count_records(&store).unwrap(), 0);
}

#[test]
fn test_delete_past_pending_feedback_is_invalid_state() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    let rec = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();
    let rec = submit_feedback(&store, &cast.supervisor, rec.id, "Greet properly").unwrap();

    for actor in [&cast.analyst, &cast.supervisor, &cast.agent] {
        let err = delete(&store, actor, rec.id).unwrap_err();
        assert!(matches!(err, QualityError::InvalidState { .. }));
    }
    assert_eq!(records::get_record(&store, rec.id).unwrap(), rec);
}

#[test]
fn test_update_past_pending_feedback_is_invalid_state_for_any_role() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    let rec = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();
    submit_feedback(&store, &cast.supervisor, rec.id, "Greet properly").unwrap();

    let patch = RecordPatch {
        call_details: Some("edited".into()),
        ..Default::default()
    };
    for actor in [&cast.analyst, &cast.supervisor, &cast.agent] {
        let err = update(&store, actor, rec.id, &patch).unwrap_err();
        assert!(matches!(err, QualityError::InvalidState { .. }));
    }
}

#[test]
fn test_update_edits_only_allowed_fields() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    let rec = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();

    let err = update(
        &store,
        &cast.supervisor,
        rec.id,
        &RecordPatch {
            agent_name: Some("Pedro".into()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, QualityError::Forbidden { .. }));

    let patch = RecordPatch {
        agent_name: Some("Pedro".into()),
        call_date: Some("2026-10-03".into()),
        attachment_name: Some("call.wav".into()),
        attachment_data: Some("data:audio/wav;base64,AAAA".into()),
        ..Default::default()
    };
    let edited = update(&store, &cast.analyst, rec.id, &patch).unwrap();
    assert_eq!(edited.agent_name, "Pedro");
    assert_eq!(edited.call_date, "2026-10-03");
    assert_eq!(edited.attachment.unwrap().name, "call.wav");
    assert_eq!(edited.status, RecordStatus::PendingFeedback);
    assert_eq!(edited.id, rec.id);
    assert_eq!(edited.creator_email, rec.creator_email);
    assert_eq!(edited.errors, rec.errors);

    assert!(matches!(
        update(&store, &cast.analyst, 9999, &patch),
        Err(QualityError::NotFound(_))
    ));
}

#[test]
fn test_patch_payload_rejects_privileged_keys() {
    let injected = serde_json::json!({
        "call_details": "edited",
        "status": "COMPLETED",
    });
    assert!(serde_json::from_value::<RecordPatch>(injected).is_err());

    let injected = serde_json::json!({ "feedback_signature": "boss@example.com" });
    assert!(serde_json::from_value::<RecordPatch>(injected).is_err());
}

#[test]
fn test_delete_is_open_unless_restricted() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    let rec = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();
    let removed = delete(&store, &cast.agent, rec.id).unwrap();
    assert_eq!(removed.id, rec.id);
    assert!(matches!(
        records::get_record(&store, rec.id),
        Err(QualityError::NotFound(_))
    ));
    assert!(matches!(
        delete(&store, &cast.analyst, rec.id),
        Err(QualityError::NotFound(_))
    ));

    let tmp = tempdir().unwrap();
    let mut config = fast_config();
    config.records.restrict_delete_to_analyst = true;
    let (store, cast) = setup(tmp.path(), config);
    let rec = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();
    let err = delete(&store, &cast.supervisor, rec.id).unwrap_err();
    assert!(matches!(err, QualityError::Forbidden { .. }));
    assert!(records::get_record(&store, rec.id).is_ok());
    delete(&store, &cast.analyst, rec.id).unwrap();
    assert_eq!(records::count_records(&store).unwrap(), 0);
}

#[test]
fn test_sign_off_role_and_order_checks() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    let rec = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();

    // Commitment before feedback.
    assert!(matches!(
        submit_commitment(&store, &cast.agent, rec.id, "Will do"),
        Err(QualityError::InvalidState { .. })
    ));
    // Wrong roles.
    assert!(matches!(
        submit_feedback(&store, &cast.agent, rec.id, "x"),
        Err(QualityError::Forbidden { .. })
    ));
    assert!(matches!(
        submit_commitment(&store, &cast.supervisor, rec.id, "x"),
        Err(QualityError::Forbidden { .. })
    ));
    // Empty text.
    assert!(matches!(
        submit_feedback(&store, &cast.supervisor, rec.id, "   "),
        Err(QualityError::Validation { .. })
    ));
    // Unknown record.
    assert!(matches!(
        submit_feedback(&store, &cast.supervisor, 4242, "x"),
        Err(QualityError::NotFound(_))
    ));

    let unchanged = records::get_record(&store, rec.id).unwrap();
    assert_eq!(unchanged, rec);
}

#[test]
fn test_list_is_newest_created_first() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    let first = create(&store, &cast.analyst, &new_record("Ana", "2026-12-31")).unwrap();
    let second = create(&store, &cast.analyst, &new_record("Bea", "2026-01-01")).unwrap();
    let third = create(&store, &cast.analyst, &new_record("Carla", "2026-06-15")).unwrap();

    // Mutating the oldest must not move it up.
    submit_feedback(&store, &cast.supervisor, first.id, "Recent change").unwrap();

    let ids: Vec<i64> = lifecycle::list(&store, &RecordFilter::default())
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
}

#[test]
fn test_list_filters_and_facets() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    let mut a = new_record("Luis", "2026-10-01");
    a.coordinator = "Marta".into();
    let mut b = new_record("Pedro", "2026-10-02");
    b.coordinator = "Jorge".into();
    let a = create(&store, &cast.analyst, &a).unwrap();
    create(&store, &cast.analyst, &b).unwrap();
    submit_feedback(&store, &cast.supervisor, a.id, "ok").unwrap();

    let by_coord = lifecycle::list(
        &store,
        &RecordFilter {
            coordinator: Some("Jorge".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(by_coord.len(), 1);
    assert_eq!(by_coord[0].agent_name, "Pedro");

    let pending_commitment = lifecycle::list(
        &store,
        &RecordFilter {
            status: Some(RecordStatus::PendingCommitment),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(pending_commitment.len(), 1);
    assert_eq!(pending_commitment[0].id, a.id);

    assert_eq!(
        records::distinct_coordinators(&store).unwrap(),
        vec!["Jorge", "Marta"]
    );
    assert_eq!(records::distinct_agents(&store).unwrap(), vec!["Luis", "Pedro"]);
}

#[test]
fn test_status_always_matches_sign_offs() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    let a = create(&store, &cast.analyst, &new_record("A", "2026-10-01")).unwrap();
    let b = create(&store, &cast.analyst, &new_record("B", "2026-10-01")).unwrap();
    create(&store, &cast.analyst, &new_record("C", "2026-10-01")).unwrap();
    submit_feedback(&store, &cast.supervisor, a.id, "fb").unwrap();
    submit_feedback(&store, &cast.supervisor, b.id, "fb").unwrap();
    submit_commitment(&store, &cast.agent, b.id, "ok").unwrap();

    for rec in lifecycle::list(&store, &RecordFilter::default()).unwrap() {
        let expected =
            RecordStatus::derive(rec.feedback.is_some(), rec.commitment.is_some()).unwrap();
        assert_eq!(rec.status, expected, "record {}", rec.id);
    }
}

#[test]
fn test_inconsistent_row_is_reported_corrupt() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    let rec = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();

    let conn = rusqlite::Connection::open(tmp.path().join("quality.db")).unwrap();
    conn.execute(
        "UPDATE monitoring_records SET agent_commitment = 'sneaky' WHERE id = ?1",
        [rec.id],
    )
    .unwrap();
    drop(conn);

    assert!(matches!(
        records::get_record(&store, rec.id),
        Err(QualityError::Corrupt(_))
    ));
}

#[test]
fn test_events_are_mirrored_to_jsonl() {
    let tmp = tempdir().unwrap();
    let (store, cast) = setup(tmp.path(), fast_config());
    let rec = create(&store, &cast.analyst, &new_record("Luis", "2026-10-01")).unwrap();
    delete(&store, &cast.analyst, rec.id).unwrap();

    let content = std::fs::read_to_string(tmp.path().join("records.events.jsonl")).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event_type"], "record.created");
    assert_eq!(lines[1]["event_type"], "record.deleted");
    assert_eq!(lines[1]["payload"]["snapshot"]["id"], rec.id);
}
