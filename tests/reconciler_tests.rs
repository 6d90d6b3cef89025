//! # Reconciler Tests
//!
//! Drives full reconciliation passes against the in-memory store.

mod common;

use std::time::Duration;

use chrono::DateTime;
use common::{setup, RequestBuilder, NAMESPACE};
use secret_generator_controller::controller::generator::{
    FIELD_JWT, FIELD_PASSWORD, FIELD_USERNAME, PASSWORD_ALPHABET,
};
use secret_generator_controller::controller::reconciler::{
    ReconcileOutcome, ReconcilerError, WriteMode,
};
use secret_generator_controller::crd::CustomSecretStatus;
use secret_generator_controller::store::RequestId;
use tokio_util::sync::CancellationToken;

mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_auth_with_rotation() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(
                RequestBuilder::basic_auth("alice", 12)
                    .username("")
                    .rotation_period("1h")
                    .build(),
            )
            .await;

        let outcome = reconciler
            .reconcile(&id, &CancellationToken::new())
            .await
            .expect("reconcile should succeed");
        assert_eq!(outcome, ReconcileOutcome::RequeueAfter(Duration::from_secs(3600)));

        let material = store
            .container(NAMESPACE, "alice-secret")
            .await
            .expect("alice-secret should exist");
        assert_eq!(material.get_str(FIELD_USERNAME), Some("admin"));
        let password = material.get(FIELD_PASSWORD).expect("password present");
        assert_eq!(password.len(), 12);
        assert!(password.iter().all(|b| PASSWORD_ALPHABET.contains(b)));

        let status = store.request(&id).await.and_then(|r| r.status).expect("status set");
        assert_eq!(status.secret_name, "alice-secret");
        DateTime::parse_from_rfc3339(&status.last_updated).expect("lastUpdated is RFC 3339");
    }

    #[tokio::test]
    async fn test_jwt_without_rotation() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store.put_request(RequestBuilder::jwt("bob").build()).await;

        let outcome = reconciler
            .reconcile(&id, &CancellationToken::new())
            .await
            .expect("reconcile should succeed");
        assert_eq!(outcome, ReconcileOutcome::Done);

        let material = store.container(NAMESPACE, "bob-secret").await.expect("bob-secret");
        assert_eq!(material.get_str(FIELD_JWT), Some("dummy-jwt-token"));
        assert_eq!(material.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_rotation_period_after_status_write() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(
                RequestBuilder::basic_auth("carol", 8)
                    .rotation_period("not-a-duration")
                    .build(),
            )
            .await;

        let err = reconciler
            .reconcile(&id, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ReconcilerError::InvalidDuration { ref value, .. } if value == "not-a-duration")
        );

        // The secret and status were written before the period was parsed
        assert!(store.container(NAMESPACE, "carol-secret").await.is_some());
        let status = store.request(&id).await.and_then(|r| r.status).expect("status set");
        assert_eq!(status.secret_name, "carol-secret");
    }

    #[tokio::test]
    async fn test_secret_name_is_derived_from_request() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store.put_request(RequestBuilder::jwt("foo").build()).await;

        reconciler.reconcile(&id, &CancellationToken::new()).await.expect("reconcile");

        assert!(store.container(NAMESPACE, "foo-secret").await.is_some());
        assert_eq!(store.container_count().await, 1);
    }
}

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_kind_leaves_store_untouched() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store.put_request(RequestBuilder::new("dave", "oauth2").build()).await;

        let err = reconciler
            .reconcile(&id, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcilerError::UnsupportedKind(ref kind) if kind == "oauth2"));

        assert_eq!(store.write_count().await, 0);
        assert_eq!(store.container_count().await, 0);
        assert_eq!(store.request(&id).await.and_then(|r| r.status), None);
    }

    #[tokio::test]
    async fn test_negative_password_length_is_rejected() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store.put_request(RequestBuilder::basic_auth("erin", -1).build()).await;

        let err = reconciler
            .reconcile(&id, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcilerError::InvalidPasswordLength(-1)));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_request_is_done() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = RequestId::new(NAMESPACE, "ghost");

        let outcome = reconciler
            .reconcile(&id, &CancellationToken::new())
            .await
            .expect("missing request is not an error");
        assert_eq!(outcome, ReconcileOutcome::Done);
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_status_conflict_keeps_secret() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store.put_request(RequestBuilder::jwt("frank").build()).await;
        store.inject_status_conflict(&id).await;

        let err = reconciler
            .reconcile(&id, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcilerError::Conflict(ref conflicted) if *conflicted == id));

        assert!(store.container(NAMESPACE, "frank-secret").await.is_some());
        assert_eq!(store.request(&id).await.and_then(|r| r.status), None);
    }

    #[tokio::test]
    async fn test_cancelled_pass_writes_nothing() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store.put_request(RequestBuilder::jwt("grace").build()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = reconciler.reconcile(&id, &cancel).await.unwrap_err();
        assert!(matches!(err, ReconcilerError::Cancelled(ref cancelled) if *cancelled == id));
        assert_eq!(store.write_count().await, 0);
    }
}

mod write_mode_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_only_second_pass_already_exists() {
        let (store, reconciler) = setup(WriteMode::CreateOnly);
        let id = store
            .put_request(RequestBuilder::basic_auth("heidi", 16).rotation_period("1h").build())
            .await;
        let cancel = CancellationToken::new();

        reconciler.reconcile(&id, &cancel).await.expect("first pass creates");
        let first = store.container(NAMESPACE, "heidi-secret").await;

        let err = reconciler.reconcile(&id, &cancel).await.unwrap_err();
        assert!(matches!(err, ReconcilerError::AlreadyExists(ref name) if name == "heidi-secret"));
        assert_eq!(store.container(NAMESPACE, "heidi-secret").await, first);

        // Once the old Secret is gone the next pass recreates it
        store.remove_container(NAMESPACE, "heidi-secret").await;
        let outcome = reconciler.reconcile(&id, &cancel).await.expect("recreated");
        assert_eq!(outcome, ReconcileOutcome::RequeueAfter(Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn test_upsert_rotation_replaces_material() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(RequestBuilder::basic_auth("ivan", 32).rotation_period("30m").build())
            .await;
        let cancel = CancellationToken::new();

        reconciler.reconcile(&id, &cancel).await.expect("first pass");
        let first = store.container(NAMESPACE, "ivan-secret").await.expect("first");

        reconciler.reconcile(&id, &cancel).await.expect("rotation");
        let second = store.container(NAMESPACE, "ivan-secret").await.expect("second");

        assert_ne!(first.get(FIELD_PASSWORD), second.get(FIELD_PASSWORD));
        assert_eq!(store.container_count().await, 1);
    }
}

mod status_tests {
    use super::*;

    #[tokio::test]
    async fn test_last_updated_never_regresses() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let mut request = RequestBuilder::jwt("judy").build();
        request.status = Some(CustomSecretStatus {
            last_updated: "2999-01-01T00:00:00Z".to_string(),
            secret_name: "judy-secret".to_string(),
            observed_generation: None,
        });
        let id = store.put_request(request).await;

        reconciler.reconcile(&id, &CancellationToken::new()).await.expect("reconcile");

        let status = store.request(&id).await.and_then(|r| r.status).expect("status");
        assert_eq!(status.last_updated, "2999-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_zero_rotation_period_is_done() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(RequestBuilder::jwt("ken").rotation_period("0s").build())
            .await;

        let outcome = reconciler
            .reconcile(&id, &CancellationToken::new())
            .await
            .expect("reconcile");
        assert_eq!(outcome, ReconcileOutcome::Done);
    }

    #[tokio::test]
    async fn test_negative_rotation_period_is_done() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(RequestBuilder::jwt("liam").rotation_period("-1h").build())
            .await;

        let outcome = reconciler
            .reconcile(&id, &CancellationToken::new())
            .await
            .expect("negative period is not an error");
        assert_eq!(outcome, ReconcileOutcome::Done);

        let status = store.request(&id).await.and_then(|r| r.status).expect("status");
        assert_eq!(status.secret_name, "liam-secret");
    }

    #[tokio::test]
    async fn test_whitespace_rotation_period_is_invalid() {
        for (name, period) in [("lucy", "   "), ("luke", " 1h")] {
            let (store, reconciler) = setup(WriteMode::Upsert);
            let id = store
                .put_request(RequestBuilder::jwt(name).rotation_period(period).build())
                .await;

            let err = reconciler
                .reconcile(&id, &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(
                matches!(err, ReconcilerError::InvalidDuration { ref value, .. } if value == period),
                "rotationPeriod {period:?} gave {err:?}"
            );
            assert!(store.container(NAMESPACE, &format!("{name}-secret")).await.is_some());
        }
    }

    #[tokio::test]
    async fn test_status_records_observed_generation() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(RequestBuilder::jwt("lisa").generation(4).build())
            .await;

        reconciler.reconcile(&id, &CancellationToken::new()).await.expect("reconcile");

        let status = store.request(&id).await.and_then(|r| r.status).expect("status");
        assert_eq!(status.observed_generation, Some(4));
    }

    #[tokio::test]
    async fn test_empty_rotation_period_is_done() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(RequestBuilder::jwt("lena").rotation_period("").build())
            .await;

        let outcome = reconciler
            .reconcile(&id, &CancellationToken::new())
            .await
            .expect("reconcile");
        assert_eq!(outcome, ReconcileOutcome::Done);
    }

    #[tokio::test]
    async fn test_zero_password_length_gives_empty_password() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(RequestBuilder::basic_auth("mallory", 0).username("svc").build())
            .await;

        reconciler.reconcile(&id, &CancellationToken::new()).await.expect("reconcile");

        let material = store.container(NAMESPACE, "mallory-secret").await.expect("secret");
        assert_eq!(material.get_str(FIELD_USERNAME), Some("svc"));
        assert_eq!(material.get(FIELD_PASSWORD), Some(&b""[..]));
    }
}

mod trigger_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_event_runs_a_pass() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store.put_request(RequestBuilder::jwt("nina").generation(1).build()).await;

        let outcome = reconciler
            .reconcile_when_due(&id, &CancellationToken::new())
            .await
            .expect("reconcile");
        assert_eq!(outcome, ReconcileOutcome::Done);
        assert!(store.container(NAMESPACE, "nina-secret").await.is_some());
    }

    #[tokio::test]
    async fn test_events_from_own_writes_do_not_regenerate() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(RequestBuilder::basic_auth("oscar", 16).generation(1).build())
            .await;
        let cancel = CancellationToken::new();

        reconciler.reconcile_when_due(&id, &cancel).await.expect("first pass");
        let writes = store.write_count().await;
        let first = store.container(NAMESPACE, "oscar-secret").await;

        for _ in 0..3 {
            let outcome = reconciler.reconcile_when_due(&id, &cancel).await.expect("skip");
            assert_eq!(outcome, ReconcileOutcome::Done);
        }

        assert_eq!(store.write_count().await, writes);
        assert_eq!(store.container(NAMESPACE, "oscar-secret").await, first);
    }

    #[tokio::test]
    async fn test_pending_rotation_is_kept_without_writing() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(RequestBuilder::jwt("peggy").rotation_period("1h").generation(1).build())
            .await;
        let cancel = CancellationToken::new();

        reconciler.reconcile_when_due(&id, &cancel).await.expect("first pass");
        let writes = store.write_count().await;

        let outcome = reconciler.reconcile_when_due(&id, &cancel).await.expect("skip");
        let ReconcileOutcome::RequeueAfter(remaining) = outcome else {
            panic!("expected a pending rotation, got {outcome:?}");
        };
        assert!(remaining <= Duration::from_secs(3600));
        assert!(remaining > Duration::from_secs(3500));
        assert_eq!(store.write_count().await, writes);
    }

    #[tokio::test]
    async fn test_deleted_secret_is_recreated() {
        let (store, reconciler) = setup(WriteMode::CreateOnly);
        let id = store.put_request(RequestBuilder::jwt("quinn").generation(1).build()).await;
        let cancel = CancellationToken::new();

        reconciler.reconcile_when_due(&id, &cancel).await.expect("first pass");
        store.remove_container(NAMESPACE, "quinn-secret").await;

        reconciler.reconcile_when_due(&id, &cancel).await.expect("recreate");
        assert!(store.container(NAMESPACE, "quinn-secret").await.is_some());
    }

    #[tokio::test]
    async fn test_spec_change_regenerates() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(RequestBuilder::basic_auth("rita", 8).generation(1).build())
            .await;
        let cancel = CancellationToken::new();

        reconciler.reconcile_when_due(&id, &cancel).await.expect("first pass");

        let mut edited = store.request(&id).await.expect("stored");
        edited.spec.password_length = Some(24);
        edited.metadata.generation = Some(2);
        store.put_request(edited).await;

        reconciler.reconcile_when_due(&id, &cancel).await.expect("second pass");

        let material = store.container(NAMESPACE, "rita-secret").await.expect("secret");
        assert_eq!(material.get(FIELD_PASSWORD).map(<[u8]>::len), Some(24));
        let status = store.request(&id).await.and_then(|r| r.status).expect("status");
        assert_eq!(status.observed_generation, Some(2));
    }

    #[tokio::test]
    async fn test_elapsed_rotation_regenerates() {
        let (store, reconciler) = setup(WriteMode::Upsert);
        let id = store
            .put_request(
                RequestBuilder::basic_auth("sam", 32)
                    .rotation_period("1h")
                    .generation(1)
                    .build(),
            )
            .await;
        let cancel = CancellationToken::new();

        reconciler.reconcile_when_due(&id, &cancel).await.expect("first pass");
        let first = store.container(NAMESPACE, "sam-secret").await.expect("first");

        // Pretend the last pass happened long ago
        let mut aged = store.request(&id).await.expect("stored");
        if let Some(status) = aged.status.as_mut() {
            status.last_updated = "2000-01-01T00:00:00Z".to_string();
        }
        store.put_request(aged).await;

        let outcome = reconciler.reconcile_when_due(&id, &cancel).await.expect("rotation");
        assert_eq!(outcome, ReconcileOutcome::RequeueAfter(Duration::from_secs(3600)));

        let second = store.container(NAMESPACE, "sam-secret").await.expect("second");
        assert_ne!(first.get(FIELD_PASSWORD), second.get(FIELD_PASSWORD));
        let status = store.request(&id).await.and_then(|r| r.status).expect("status");
        assert_ne!(status.last_updated, "2000-01-01T00:00:00Z");
    }
}
