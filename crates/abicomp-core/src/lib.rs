//! # abicomp-core
//!
//! ELF symbol tables, suppression rules and ABI comparison for abicomp.
//!
//! This crate provides the building blocks of an ABI checker:
//! - Loading and filtering the symbol table of an ELF binary ([`symtab`])
//! - Suppression rules that hide known or intended changes ([`suppression`])
//! - The in-memory description of a binary's interface ([`ir`])
//! - Comparing two binaries and reporting the differences ([`comparison`],
//!   [`report`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use abicomp_core::comparison::{compute_diff, DiffContext};
//! use abicomp_core::ir::ReadContext;
//! use abicomp_core::report::write_report;
//!
//! let old = ReadContext::new("libfoo.so.1").read_corpus()?;
//! let new = ReadContext::new("libfoo.so.2").read_corpus()?;
//!
//! let ctx = DiffContext::default();
//! let diff = compute_diff(&old, &new, &ctx);
//! write_report(&diff, ctx.options(), &mut std::io::stdout())?;
//! std::process::exit(diff.status().exit_code());
//! # Ok::<(), abicomp_core::error::AbiError>(())
//! ```
//!
//! ## Platform Support
//!
//! Binaries are read with the `object` crate, so any host can inspect ELF
//! files of any architecture. PowerPC64 ELFv1 function descriptors are
//! resolved to their entry points.

pub mod comparison;
pub mod error;
pub mod ir;
pub mod prelude;
pub mod report;
pub mod suppression;
pub mod symtab;
pub mod types;
pub mod workers;

// Re-export commonly used types
pub use comparison::{compute_diff, CorpusDiff, DiffContext, DiffOptions};
pub use error::{AbiError, Result};
pub use ir::{Corpus, ReadContext};
pub use report::DiffStatus;
pub use symtab::{ElfSymbol, Symtab, SymtabFilter};
