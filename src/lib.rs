//! errorutil: structured error codes for Go source trees.
//!
//! Finds error code declarations and their `errors.New` detail records,
//! validates them against the MeshKit convention, assigns numeric codes from
//! a per-component counter, and exports the result for documentation.

// Engine - re-exported from errorutil-core
pub use errorutil_core::adapter;
pub use errorutil_core::assign;
pub use errorutil_core::component;
pub use errorutil_core::config;
pub use errorutil_core::error;
pub use errorutil_core::export;
pub use errorutil_core::info;
pub use errorutil_core::model;
pub use errorutil_core::pipeline;
pub use errorutil_core::summary;
pub use errorutil_core::types;
pub use errorutil_core::validate;

// Language adapters
pub use errorutil_go as go;
pub use errorutil_go::GoAdapter;

// Front door
pub mod doc;
pub mod output;
