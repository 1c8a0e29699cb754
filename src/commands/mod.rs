//! Command implementations
//!
//! - `audit`: discovers candidate repositories, audits them concurrently and
//!   prints the current-state and recommended-checkout reports
//! - `checkout`: the force or interactive pass applying the recommendations

pub mod audit;
pub mod checkout;
