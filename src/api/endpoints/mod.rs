//! API endpoint handlers, one module per resource.

pub mod claimants;
pub mod health;
pub mod ledger;
pub mod records;
pub mod roles;
pub mod submissions;
