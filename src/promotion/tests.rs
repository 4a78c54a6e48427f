//! Unit tests for the promotion transition table and executor.

use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;
use crate::resolver::SlotExistence;
use crate::test_support::{Call, FakeControlPlane, FixedCredentialGenerator};
use crate::waiter::{WaitError, WaitPolicy};

const BASE: &str = "sitedb";
const SECRET: &str = "Gen3rated5ecret000abc";

fn cluster(id: &str) -> ClusterId {
    ClusterId::from(id)
}

fn instance(id: &str) -> InstanceId {
    InstanceId::from(id)
}

fn slots(dev: bool, test: bool, prod: bool) -> SlotExistence {
    SlotExistence { dev, test, prod }
}

#[fixture]
fn plane() -> FakeControlPlane {
    let plane = FakeControlPlane::new();
    plane.set_settle_polls(2);
    plane.set_rename_lag(1);
    plane
}

fn policy() -> WaitPolicy {
    WaitPolicy {
        poll_interval: Duration::from_secs(10),
        rename_settle_delay: Duration::from_secs(40),
        not_found_retry_interval: Duration::from_secs(2),
        max_not_found_retries: 5,
        timeout: Duration::from_secs(600),
    }
}

async fn promote(
    plane: &FakeControlPlane,
    target: Environment,
) -> Result<PromotionReport, PromotionError<crate::test_support::FakeControlPlaneError>> {
    let generator = FixedCredentialGenerator::new(SECRET);
    let request = PromotionRequest::new(target, BASE)
        .unwrap_or_else(|err| panic!("request should be valid: {err}"));
    Promoter::new(
        plane,
        &generator,
        Waiter::new(policy()),
        ProvisionSettings::new(BASE, "admin"),
    )
    .promote(&request)
    .await
}

#[rstest]
#[case(Environment::Dev, slots(false, false, false), Route::CreateFreshDev)]
#[case(Environment::Dev, slots(true, false, false), Route::CreateFreshDev)]
#[case(Environment::Dev, slots(false, false, true), Route::CloneProdIntoDev)]
#[case(Environment::Dev, slots(true, true, true), Route::CloneProdIntoDev)]
#[case(Environment::Dev, slots(false, true, false), Route::RenameTestIntoDev)]
#[case(Environment::Dev, slots(true, true, false), Route::RenameTestIntoDev)]
#[case(Environment::Test, slots(true, false, false), Route::RenameDevIntoTest)]
#[case(Environment::Test, slots(false, true, false), Route::TestAlreadyPresent)]
#[case(Environment::Test, slots(true, true, true), Route::TestAlreadyPresent)]
#[case(Environment::Prod, slots(false, true, false), Route::RenameTestIntoProd)]
#[case(Environment::Prod, slots(false, false, true), Route::ProdAlreadyPresent)]
fn transition_table_selects_route(
    #[case] target: Environment,
    #[case] existence: SlotExistence,
    #[case] expected: Route,
) {
    assert_eq!(Route::select(target, existence), expected);
}

#[test]
fn planning_is_deterministic() {
    for target in Environment::ALL {
        for bits in 0_u8..8 {
            let existence = slots(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            assert_eq!(
                Plan::new(target, existence, BASE),
                Plan::new(target, existence, BASE)
            );
        }
    }
}

#[test]
fn dev_routes_ignore_existing_dev_slot() {
    for bits in 0_u8..4 {
        let test = bits & 1 != 0;
        let prod = bits & 2 != 0;
        assert_eq!(
            Route::select(Environment::Dev, slots(true, test, prod)),
            Route::select(Environment::Dev, slots(false, test, prod)),
        );
    }
}

#[test]
fn blank_base_name_is_rejected() {
    let err = PromotionRequest::new(Environment::Dev, "   ").expect_err("blank base");
    assert_eq!(err, RequestError::EmptyBaseName);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn fresh_dev_creates_cluster_and_instance_without_rotation(plane: FakeControlPlane) {
    let report = promote(&plane, Environment::Dev)
        .await
        .unwrap_or_else(|err| panic!("promotion should succeed: {err}"));

    assert_eq!(
        plane.mutating_calls(),
        vec![
            Call::CreateCluster(cluster("sitedb-dev")),
            Call::CreateInstance {
                cluster: cluster("sitedb-dev"),
                instance: instance("sitedb-dev"),
                public: true,
            },
        ]
    );
    assert_eq!(report.route, Route::CreateFreshDev);
    assert_eq!(report.endpoint, "sitedb-dev.cluster-fake.local");
    assert_eq!(
        report.credential.as_ref().map(Credential::expose),
        Some(SECRET)
    );
    assert_eq!(
        plane.cluster_password(&cluster("sitedb-dev")).as_deref(),
        Some(SECRET)
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn prod_present_clones_into_dev_and_rotates(plane: FakeControlPlane) {
    plane.seed(&cluster("sitedb"), false);

    let report = promote(&plane, Environment::Dev)
        .await
        .unwrap_or_else(|err| panic!("promotion should succeed: {err}"));

    assert_eq!(
        plane.mutating_calls(),
        vec![
            Call::CloneCluster {
                source: cluster("sitedb"),
                dest: cluster("sitedb-dev"),
            },
            Call::CreateInstance {
                cluster: cluster("sitedb-dev"),
                instance: instance("sitedb-dev"),
                public: true,
            },
            Call::ModifyClusterPassword(cluster("sitedb-dev")),
        ]
    );
    assert!(plane.has_cluster(&cluster("sitedb")));
    assert_eq!(report.route, Route::CloneProdIntoDev);
    assert!(report.credential.is_some());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_present_is_renamed_into_dev_and_rotated(plane: FakeControlPlane) {
    plane.seed(&cluster("sitedb-test"), false);

    promote(&plane, Environment::Dev)
        .await
        .unwrap_or_else(|err| panic!("promotion should succeed: {err}"));

    assert_eq!(
        plane.mutating_calls(),
        vec![
            Call::RenameCluster {
                from: cluster("sitedb-test"),
                to: cluster("sitedb-dev"),
            },
            Call::RenameInstance {
                from: instance("sitedb-test"),
                to: instance("sitedb-dev"),
                public: Some(true),
            },
            Call::ModifyClusterPassword(cluster("sitedb-dev")),
        ]
    );
    assert_eq!(
        plane.instance_is_public(&instance("sitedb-dev")),
        Some(true)
    );
    assert!(!plane.has_cluster(&cluster("sitedb-test")));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn dev_is_renamed_into_test_and_made_private(plane: FakeControlPlane) {
    plane.seed(&cluster("sitedb-dev"), true);

    promote(&plane, Environment::Test)
        .await
        .unwrap_or_else(|err| panic!("promotion should succeed: {err}"));

    assert_eq!(
        plane.mutating_calls(),
        vec![
            Call::RenameCluster {
                from: cluster("sitedb-dev"),
                to: cluster("sitedb-test"),
            },
            Call::RenameInstance {
                from: instance("sitedb-dev"),
                to: instance("sitedb-test"),
                public: None,
            },
            Call::ModifyInstanceAccessibility {
                id: instance("sitedb-test"),
                public: false,
            },
        ]
    );
    assert_eq!(
        plane.instance_is_public(&instance("sitedb-test")),
        Some(false)
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_is_renamed_into_prod_without_other_changes(plane: FakeControlPlane) {
    plane.seed(&cluster("sitedb-test"), false);

    let report = promote(&plane, Environment::Prod)
        .await
        .unwrap_or_else(|err| panic!("promotion should succeed: {err}"));

    assert_eq!(
        plane.mutating_calls(),
        vec![
            Call::RenameCluster {
                from: cluster("sitedb-test"),
                to: cluster("sitedb"),
            },
            Call::RenameInstance {
                from: instance("sitedb-test"),
                to: instance("sitedb"),
                public: None,
            },
        ]
    );
    assert!(report.credential.is_none());
    assert_eq!(report.endpoint, "sitedb.cluster-fake.local");
}

#[rstest]
#[case(Environment::Test, "sitedb-test")]
#[case(Environment::Prod, "sitedb")]
#[tokio::test]
async fn occupied_test_or_prod_issues_no_mutations(
    plane: FakeControlPlane,
    #[case] target: Environment,
    #[case] occupant: &str,
) {
    plane.seed(&cluster(occupant), false);

    let report = promote(&plane, target)
        .await
        .unwrap_or_else(|err| panic!("promotion should succeed: {err}"));

    assert!(report.is_noop());
    assert!(report.steps.is_empty());
    assert!(plane.mutating_calls().is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn repeated_fresh_dev_treats_existing_resources_as_noops(plane: FakeControlPlane) {
    promote(&plane, Environment::Dev)
        .await
        .unwrap_or_else(|err| panic!("first run should succeed: {err}"));

    let report = promote(&plane, Environment::Dev)
        .await
        .unwrap_or_else(|err| panic!("second run should succeed: {err}"));

    assert_eq!(report.route, Route::CreateFreshDev);
    assert!(report.steps.iter().all(|step| !step.applied));
    assert!(report.credential.is_none());
    assert_eq!(
        plane.cluster_password(&cluster("sitedb-dev")).as_deref(),
        Some(SECRET)
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn clone_into_existing_dev_skips_create_and_still_rotates(plane: FakeControlPlane) {
    plane.seed(&cluster("sitedb"), false);
    plane.seed(&cluster("sitedb-dev"), true);
    let started = tokio::time::Instant::now();

    let report = promote(&plane, Environment::Dev)
        .await
        .unwrap_or_else(|err| panic!("promotion should succeed: {err}"));

    assert_eq!(report.route, Route::CloneProdIntoDev);
    let applied: Vec<bool> = report.steps.iter().map(|step| step.applied).collect();
    assert_eq!(applied, [false, false, true]);
    assert!(
        plane
            .mutating_calls()
            .contains(&Call::ModifyClusterPassword(cluster("sitedb-dev")))
    );
    assert_eq!(
        report.credential.as_ref().map(Credential::expose),
        Some(SECRET)
    );
    assert_eq!(
        plane.cluster_password(&cluster("sitedb-dev")).as_deref(),
        Some(SECRET)
    );
    // Only the rotation settles: two pending polls at the 10s interval.
    assert_eq!(started.elapsed(), Duration::from_secs(20));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn rename_onto_existing_dev_waits_in_place(plane: FakeControlPlane) {
    plane.seed(&cluster("sitedb-test"), false);
    plane.seed(&cluster("sitedb-dev"), true);
    let started = tokio::time::Instant::now();

    let report = promote(&plane, Environment::Dev)
        .await
        .unwrap_or_else(|err| panic!("promotion should succeed: {err}"));

    assert_eq!(report.route, Route::RenameTestIntoDev);
    let applied: Vec<bool> = report.steps.iter().map(|step| step.applied).collect();
    assert_eq!(applied, [false, false, true]);
    assert!(plane.has_cluster(&cluster("sitedb-test")));
    assert!(
        plane
            .mutating_calls()
            .contains(&Call::ModifyClusterPassword(cluster("sitedb-dev")))
    );
    assert_eq!(
        report.credential.as_ref().map(Credential::expose),
        Some(SECRET)
    );
    // No rename settle delay: the skipped renames are polled at once.
    assert_eq!(started.elapsed(), Duration::from_secs(20));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failing_step_aborts_without_running_later_steps(plane: FakeControlPlane) {
    plane.seed(&cluster("sitedb-dev"), true);
    plane.fail_operation("rename_instance");

    let err = promote(&plane, Environment::Test)
        .await
        .expect_err("rename failure should abort");

    let (index, step) = match err {
        PromotionError::Step { index, step, .. } => (index, step),
        other => panic!("expected step failure, got {other}"),
    };
    assert_eq!(index, 2);
    assert!(matches!(step, Step::RenameInstance { .. }));
    assert!(
        !plane
            .mutating_calls()
            .iter()
            .any(|call| matches!(call, Call::ModifyInstanceAccessibility { .. }))
    );
    assert!(plane.has_cluster(&cluster("sitedb-test")));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn terminal_status_reports_step_and_status(plane: FakeControlPlane) {
    plane.seed(&cluster("sitedb"), false);
    plane.seed(&cluster("sitedb-dev"), true);
    plane.set_cluster_terminal_status(&cluster("sitedb-dev"), "incompatible-restore");

    let err = promote(&plane, Environment::Dev)
        .await
        .expect_err("terminal status should abort");

    let (index, last_status, source) = match err {
        PromotionError::Step {
            index,
            last_status,
            source,
            ..
        } => (index, last_status, source),
        other => panic!("expected step failure, got {other}"),
    };
    assert_eq!(index, 1);
    assert_eq!(last_status.as_deref(), Some("incompatible-restore"));
    assert!(matches!(
        source,
        StepError::Wait(WaitError::TerminalStatus { .. })
    ));
}

#[rstest]
#[tokio::test]
async fn unresolvable_slot_aborts_before_any_mutation(plane: FakeControlPlane) {
    plane.fail_operation("describe_cluster");

    let err = promote(&plane, Environment::Dev)
        .await
        .expect_err("resolver failure should abort");

    assert!(matches!(err, PromotionError::Resolve(_)), "got {err}");
    assert!(plane.mutating_calls().is_empty());
}
