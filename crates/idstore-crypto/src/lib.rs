//! Cryptography utilities for Idstore

pub mod password;

pub use password::*;
