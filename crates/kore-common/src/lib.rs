//! Common types shared by every kore crate.
//!
//! This crate contains:
//! - [`Name`], [`FqName`] and [`ClassId`]: the identity model every cache key is built from
//! - [`NameTable`]: the sharded interner backing [`Name`]
//! - [`Diagnostic`]: non-fatal problems reported while resolving declarations
//! - [`limits`]: recursion ceilings shared by the resolver

pub mod class_id;
pub mod diagnostics;
pub mod fq_name;
pub mod interner;
pub mod limits;
pub mod name;

pub use class_id::ClassId;
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use fq_name::FqName;
pub use interner::NameTable;
pub use name::{Name, NameError};
