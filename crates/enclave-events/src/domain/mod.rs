//! # Domain Layer
//!
//! Authorization, relevance and filtering logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod config;
pub mod entities;
pub mod errors;
pub mod filter;
pub mod relevance;
pub mod viewing_key;
