//! Promotion BDD support: fixtures, step definitions and scenarios.

mod bdd_steps;
mod scenarios;
mod test_helpers;
