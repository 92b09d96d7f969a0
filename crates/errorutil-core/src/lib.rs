//! Core engine for errorutil.
//!
//! This crate provides the language-agnostic parts of the tool:
//! - Error declaration / detail data model and the per-walk `InfoAll` snapshot
//! - Language adapter trait for pluggable source matchers
//! - Tree walker with skip lists
//! - Package-scoped binding of detail records to code declarations
//! - Convention validation and the analysis summary
//! - Sequential code assignment against the component counter
//! - Span-exact source rewriting with atomic file replacement
//! - Component metadata registry and documentation export
//! - The analyze/update run pipeline

pub mod adapter;
pub mod assign;
pub mod binding;
pub mod component;
pub mod config;
pub mod error;
pub mod export;
pub mod info;
pub mod model;
pub mod pipeline;
pub mod rewrite;
pub mod summary;
pub mod text;
pub mod types;
pub mod validate;
pub mod walker;
