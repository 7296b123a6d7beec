//! # Error Types
//!
//! General error handling for abicomp.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages. Each subsystem has its own error enum; `AbiError`
//! wraps them so callers that drive the whole pipeline only deal with one type.

use thiserror::Error;

/// Errors raised while building a [`Symtab`](crate::symtab::Symtab).
///
/// A symtab load either succeeds completely or fails with one of these. There
/// is no such thing as a partially loaded symbol table.
#[derive(Error, Debug)]
pub enum SymtabError
{
    /// The binary could not be parsed as an ELF file at all.
    #[error("Failed to parse ELF file: {0}")]
    Parse(String),

    /// The binary has no `.symtab` section.
    #[error("No symbol table found")]
    NoSymbolTable,

    /// The `.symtab` section header is bogus (e.g. `sh_entsize == 0`).
    #[error("Invalid symtab header: {0}")]
    InvalidHeader(String),

    /// A symbol table entry could not be read.
    #[error("Could not load symbol with index {index}: {details}")]
    UnreadableSymbol
    {
        /// Index of the entry in `.symtab`
        index: usize,
        /// What went wrong
        details: String,
    },

    /// Two input maps both define the same symbol name.
    ///
    /// This happens when building a symtab from a function map and a variable
    /// map that overlap.
    #[error("Duplicate symbol name in symbol maps: {0}")]
    DuplicateName(String),
}

/// Errors raised while loading suppression specifications.
#[derive(Error, Debug)]
pub enum SuppressionError
{
    /// The suppression file could not be read.
    #[error("Failed to read suppression file {path}: {source}")]
    Read
    {
        /// Path of the file
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The suppression file is not valid TOML or has unknown keys.
    #[error("Failed to parse suppression file {path}: {details}")]
    Parse
    {
        /// Path (or a descriptive name) of the input
        path: String,
        /// Parser message
        details: String,
    },

    /// A property holds a regular expression that does not compile.
    #[error("Invalid regular expression for '{property}' in suppression '{label}': {details}")]
    InvalidRegex
    {
        /// Label of the suppression (may be empty)
        label: String,
        /// Property name, e.g. `name_regexp`
        property: &'static str,
        /// Compiler message
        details: String,
    },

    /// A property holds a value that cannot be interpreted.
    #[error("Invalid value for '{property}' in suppression '{label}': {value}")]
    InvalidValue
    {
        /// Label of the suppression (may be empty)
        label: String,
        /// Property name
        property: &'static str,
        /// The offending value
        value: String,
    },
}

/// Main error type for abicomp operations
#[derive(Error, Debug)]
pub enum AbiError
{
    /// Symbol table could not be loaded.
    #[error("Symtab error: {0}")]
    Symtab(#[from] SymtabError),

    /// Suppression specifications could not be loaded.
    #[error("Suppression error: {0}")]
    Suppression(#[from] SuppressionError),

    /// Invalid argument passed to an abicomp function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error (for file operations, report output, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker thread pool could not be started.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

/// Convenience type alias for `Result<T, AbiError>`
///
/// ```rust
/// use abicomp_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, AbiError>;
