//! Fact base for the glyco treatment recommendation engine.
//!
//! A [`PatientFact`] is built per request from a raw field-value record
//! supplied by the caller, validated against a [`FactSchema`], and discarded
//! once evaluation finishes. Nothing here persists patient data.

pub mod config;
pub mod error;
pub mod fact;
mod normalize;
pub mod schema;

pub use config::Config;
pub use error::*;
pub use fact::*;
pub use normalize::normalize;
pub use schema::*;
