//! knowdebug-core: Adaptive assessment engine, session state, and traits.
//!
//! This crate defines the data model, the per-domain difficulty and progress
//! state machines, and the generator interface that the rest of knowdebug
//! builds on.

pub mod difficulty;
pub mod driver;
pub mod error;
pub mod model;
pub mod parser;
pub mod policy;
pub mod progress;
pub mod session;
pub mod traits;

pub use error::{AssessmentError, GeneratorError};
