//! Configuration management for stencil.
//!
//! Projects describe where their templates live and how previews are
//! rendered in a `stencil.toml` file, looked up from the working directory
//! upwards (or passed with `--config`). See [`StencilConfig`] for the keys.

pub mod project;

pub use project::StencilConfig;
