//! # Halberd
//!
//! A search request compiler. Requests are described by named configuration
//! fragments with `$placeholder$` parameters; Halberd binds them, resolves
//! references between them, maps them onto typed queries, aggregations and
//! sort orders, and compiles those into the search backend's JSON query DSL.
//!
//! ## Features
//!
//! - Parameter binding that drops fragments left incomplete
//! - Fragment references between queries, filters and buckets
//! - Typed queries, span queries, buckets, metrics and sort orders
//! - Fulltext query assembly driven by field mapping and relevance settings
//! - A command line compiler

pub mod aggregation;
pub mod cli;
pub mod config;
pub mod dsl;
pub mod error;
pub mod fragment;
pub mod fulltext;
pub mod mapping;
pub mod query;
pub mod request;
pub mod sort;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
