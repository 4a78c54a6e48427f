//! Shared fixtures for promotion BDD scenarios.

use rds_promote::PromotionReport;
use rds_promote::test_support::FakeControlPlane;
use rstest::fixture;

pub const BASE_NAME: &str = "sitedb";
pub const GENERATED_SECRET: &str = "Bdd5ecret12345abcdefg";

#[derive(Clone, Debug)]
pub struct PromotionContext {
    pub plane: FakeControlPlane,
    pub outcome: Option<PromotionOutcome>,
}

#[derive(Clone, Debug)]
pub enum PromotionOutcome {
    Success(PromotionReport),
    Failure {
        step: Option<usize>,
        message: String,
    },
}

#[fixture]
pub fn promotion_context() -> PromotionContext {
    let plane = FakeControlPlane::new();
    plane.set_settle_polls(2);
    plane.set_rename_lag(1);
    PromotionContext {
        plane,
        outcome: None,
    }
}
