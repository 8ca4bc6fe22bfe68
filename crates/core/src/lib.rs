//! Core types for the photo-to-recipe relay.
//!
//! Holds the job protocol (submit, poll, extract), the layered output
//! envelope, the local task records, and the traits every external
//! collaborator is reached through. No HTTP or database code lives here.

pub mod backends;
pub mod envelope;
pub mod error;
pub mod job;
pub mod protocol;
pub mod task;
pub mod types;
pub mod upload;
