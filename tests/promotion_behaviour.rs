//! Behavioural scenarios for promoting a deployment between slots.

mod promotion;
