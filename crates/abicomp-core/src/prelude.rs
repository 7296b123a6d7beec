//! Common module for library exports

pub use crate::comparison::{compute_diff, CorpusDiff, DiffContext, DiffOptions};
pub use crate::error::{AbiError, Result, SuppressionError, SymtabError};
pub use crate::ir::{Corpus, ReadContext};
pub use crate::report::{write_report, DiffStatus};
pub use crate::suppression::{load_suppression_file, Suppression};
pub use crate::symtab::{ElfSymbol, SymbolId, Symtab, SymtabFilter, SymtabFilterBuilder};
pub use crate::types::{Address, Architecture};
