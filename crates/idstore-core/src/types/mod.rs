//! Core types for Idstore

mod common;
mod credential;
mod validation;

pub use common::*;
pub use credential::*;
pub use validation::*;
