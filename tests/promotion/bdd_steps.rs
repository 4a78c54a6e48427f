//! BDD step definitions for the promotion workflow.

use std::time::Duration;

use rds_promote::test_support::{Call, FixedCredentialGenerator};
use rds_promote::{
    Environment, InstanceId, PromotionError, PromotionRequest, Promoter, ProvisionSettings,
    WaitPolicy, Waiter,
};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Builder;

use super::test_helpers::{BASE_NAME, GENERATED_SECRET, PromotionContext, PromotionOutcome};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn parse_slot(value: &str) -> Result<Environment, StepError> {
    value
        .parse()
        .map_err(|err| StepError::Assertion(format!("unknown slot {value}: {err}")))
}

fn policy() -> WaitPolicy {
    WaitPolicy {
        poll_interval: Duration::from_secs(10),
        rename_settle_delay: Duration::from_secs(40),
        not_found_retry_interval: Duration::from_secs(2),
        max_not_found_retries: 5,
        timeout: Duration::from_secs(900),
    }
}

#[given("an empty provider")]
fn empty_provider(promotion_context: PromotionContext) -> PromotionContext {
    promotion_context
}

#[given("a provider holding the \"{slot}\" slot")]
fn provider_holding(promotion_context: PromotionContext, slot: String) -> PromotionContext {
    let env = parse_slot(&slot).unwrap_or_else(|err| panic!("{err}"));
    promotion_context
        .plane
        .seed(&env.cluster_id(BASE_NAME), env.publicly_accessible());
    promotion_context
}

#[given("renamed resources stay invisible for \"{polls}\" polls")]
fn renamed_resources_lag(promotion_context: PromotionContext, polls: u32) -> PromotionContext {
    promotion_context.plane.set_rename_lag(polls);
    promotion_context
}

#[given("\"{operation}\" calls fail")]
fn operation_fails(promotion_context: PromotionContext, operation: String) -> PromotionContext {
    promotion_context.plane.fail_operation(&operation);
    promotion_context
}

#[when("I promote to \"{target}\"")]
fn promote_to(
    promotion_context: PromotionContext,
    target: String,
) -> Result<PromotionContext, StepError> {
    let env = parse_slot(&target)?;
    let request = PromotionRequest::new(env, BASE_NAME)
        .map_err(|err| StepError::Assertion(err.to_string()))?;
    let runtime = Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(|err| StepError::Assertion(err.to_string()))?;

    let PromotionContext { plane, .. } = promotion_context;
    let generator = FixedCredentialGenerator::new(GENERATED_SECRET);
    let promoter = Promoter::new(
        &plane,
        &generator,
        Waiter::new(policy()),
        ProvisionSettings::new(BASE_NAME, "admin"),
    );
    let result = runtime.block_on(promoter.promote(&request));
    let outcome = match result {
        Ok(report) => PromotionOutcome::Success(report),
        Err(err) => PromotionOutcome::Failure {
            step: match &err {
                PromotionError::Step { index, .. } => Some(*index),
                _ => None,
            },
            message: err.to_string(),
        },
    };

    Ok(PromotionContext {
        plane,
        outcome: Some(outcome),
    })
}

fn report(
    promotion_context: &PromotionContext,
) -> Result<&rds_promote::PromotionReport, StepError> {
    match &promotion_context.outcome {
        Some(PromotionOutcome::Success(report)) => Ok(report),
        Some(PromotionOutcome::Failure { message, .. }) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the promotion succeeds")]
fn promotion_succeeds(promotion_context: &PromotionContext) -> Result<(), StepError> {
    report(promotion_context).map(|_| ())
}

#[then("the promotion is a no-op")]
fn promotion_is_noop(promotion_context: &PromotionContext) -> Result<(), StepError> {
    if report(promotion_context)?.is_noop() {
        Ok(())
    } else {
        Err(StepError::Assertion(String::from(
            "expected a no-op route",
        )))
    }
}

#[then("the mutating calls are \"{calls}\"")]
fn mutating_calls_are(promotion_context: &PromotionContext, calls: String) -> Result<(), StepError> {
    let observed = promotion_context
        .plane
        .mutating_calls()
        .iter()
        .map(Call::operation)
        .collect::<Vec<_>>()
        .join(", ");
    if observed == calls {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected calls [{calls}], got [{observed}]"
        )))
    }
}

#[then("no mutating calls are made")]
fn no_mutating_calls(promotion_context: &PromotionContext) -> Result<(), StepError> {
    let calls = promotion_context.plane.mutating_calls();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no mutating calls, got {calls:?}"
        )))
    }
}

#[then("no \"{operation}\" call is made")]
fn operation_not_called(
    promotion_context: &PromotionContext,
    operation: String,
) -> Result<(), StepError> {
    let called = promotion_context
        .plane
        .calls()
        .iter()
        .any(|call| call.operation() == operation);
    if called {
        Err(StepError::Assertion(format!(
            "{operation} should not be called"
        )))
    } else {
        Ok(())
    }
}

#[then("the \"{instance}\" instance is publicly accessible")]
fn instance_public(
    promotion_context: &PromotionContext,
    instance: String,
) -> Result<(), StepError> {
    expect_accessibility(promotion_context, &instance, true)
}

#[then("the \"{instance}\" instance is private")]
fn instance_private(
    promotion_context: &PromotionContext,
    instance: String,
) -> Result<(), StepError> {
    expect_accessibility(promotion_context, &instance, false)
}

fn expect_accessibility(
    promotion_context: &PromotionContext,
    instance: &str,
    expected: bool,
) -> Result<(), StepError> {
    match promotion_context
        .plane
        .instance_is_public(&InstanceId::from(instance))
    {
        Some(public) if public == expected => Ok(()),
        Some(public) => Err(StepError::Assertion(format!(
            "{instance} public access is {public}, expected {expected}"
        ))),
        None => Err(StepError::Assertion(format!("{instance} does not exist"))),
    }
}

#[then("a master password is reported")]
fn password_reported(promotion_context: &PromotionContext) -> Result<(), StepError> {
    match &report(promotion_context)?.credential {
        Some(credential) if credential.expose() == GENERATED_SECRET => Ok(()),
        Some(_) => Err(StepError::Assertion(String::from(
            "unexpected credential reported",
        ))),
        None => Err(StepError::Assertion(String::from("no credential reported"))),
    }
}

#[then("no master password is reported")]
fn no_password_reported(promotion_context: &PromotionContext) -> Result<(), StepError> {
    if report(promotion_context)?.credential.is_none() {
        Ok(())
    } else {
        Err(StepError::Assertion(String::from(
            "no credential should be reported",
        )))
    }
}

#[then("the promotion fails at step \"{index}\"")]
fn promotion_fails_at(promotion_context: &PromotionContext, index: usize) -> Result<(), StepError> {
    match &promotion_context.outcome {
        Some(PromotionOutcome::Failure { step, .. }) if *step == Some(index) => Ok(()),
        Some(PromotionOutcome::Failure { step, message }) => Err(StepError::Assertion(format!(
            "expected failure at step {index}, got {step:?}: {message}"
        ))),
        Some(PromotionOutcome::Success(_)) => Err(StepError::Assertion(String::from(
            "expected failure, got success",
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}
