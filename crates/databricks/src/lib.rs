//! Databricks REST client library.
//!
//! Wraps the Jobs API (notebook runs used as the remote recipe backend)
//! and the SQL Statement Execution API (durable image records), and
//! adapts both to the `recipe-core` traits.

pub mod api;
pub mod backend;
pub mod statements;
