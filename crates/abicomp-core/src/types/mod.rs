//! # Types
//!
//! Small value types shared by the symtab, the IR and the comparison engine.

pub mod address;
pub mod arch;
pub mod symbols;

// Re-export all public types
pub use address::Address;
pub use arch::Architecture;
pub use symbols::{SourceLocation, SymbolLanguage, SymbolName};
