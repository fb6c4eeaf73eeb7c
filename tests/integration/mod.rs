//! Integration test suite for stencil
//!
//! End-to-end tests driving the engine over real template trees in
//! temporary directories, and the `stencil` binary through `assert_cmd`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! RUST_LOG=stencil_cli=debug cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: `stencil` commands and their output
//! - **concurrency**: async and bulk rendering, render-once under contention
//! - **graph**: include graph scans, roots and rebuild behavior
//! - **invalidation**: cache hits, invalidation and file-change hooks
//! - **outline**: outlines of rendered roots
//! - **recursion**: self-including and cyclic templates
//! - **rendering**: data model, preview markers and diagnostic fallback

mod cli;
mod concurrency;
mod graph;
mod invalidation;
mod outline;
mod recursion;
mod rendering;
