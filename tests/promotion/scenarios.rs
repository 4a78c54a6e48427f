//! BDD scenarios for the promotion workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{PromotionContext, promotion_context};

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Create a fresh dev deployment"
)]
fn scenario_fresh_dev(promotion_context: PromotionContext) {
    drop(promotion_context);
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Refresh dev from production"
)]
fn scenario_clone_prod_into_dev(promotion_context: PromotionContext) {
    drop(promotion_context);
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Move test back into dev"
)]
fn scenario_rename_test_into_dev(promotion_context: PromotionContext) {
    drop(promotion_context);
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Promote dev into test"
)]
fn scenario_dev_into_test(promotion_context: PromotionContext) {
    drop(promotion_context);
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Promote test into prod"
)]
fn scenario_test_into_prod(promotion_context: PromotionContext) {
    drop(promotion_context);
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Leave an occupied test slot alone"
)]
fn scenario_test_occupied(promotion_context: PromotionContext) {
    drop(promotion_context);
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Tolerate a renamed cluster that is slow to appear"
)]
fn scenario_rename_lag(promotion_context: PromotionContext) {
    drop(promotion_context);
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Abort when a step fails"
)]
fn scenario_step_failure(promotion_context: PromotionContext) {
    drop(promotion_context);
}
