//! Go language support for errorutil.
//!
//! This crate provides the Go side of error code extraction:
//! - Parsing with tree-sitter's Go grammar, rejecting files with syntax errors
//! - A visitor over top-level value specs and call expressions
//! - [`GoAdapter`], the [`LanguageAdapter`](errorutil_core::adapter::LanguageAdapter)
//!   implementation that matches declarations and `errors.New` detail calls

pub mod error;
pub mod matcher;
pub mod syntax;
pub mod visitor;

pub use error::ParseError;
pub use matcher::GoAdapter;
