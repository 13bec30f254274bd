//! Integration test crate for the playout framework.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the playout crates to verify they work together.

#[cfg(test)]
mod animation;

#[cfg(test)]
mod scheduling;
