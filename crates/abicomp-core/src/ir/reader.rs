//! Building a [`Corpus`] from an ELF binary.

use std::fs;

use object::Object;
use tracing::{debug, info};

use super::Corpus;
use crate::error::{AbiError, Result, SymtabError};
use crate::suppression::{is_elf_symbol_suppressed, Suppression, SuppressionContext};
use crate::symtab::{read_dynamic_info, ElfSymbol, Symtab};
use crate::types::Architecture;

/// State for reading one binary.
///
/// Suppressions that drop artifacts from the IR are consulted while the
/// symbol table loads: a function or variable symbol matched by name is kept
/// out of the corpus's iteration order, so the comparison never sees it.
/// Other suppressions only hide changes and are left to the diff.
///
/// ```rust,no_run
/// use abicomp_core::ir::ReadContext;
///
/// let corpus = ReadContext::new("/usr/lib/libz.so.1").read_corpus()?;
/// println!("{} exports {} symbols", corpus.soname(), corpus.symtab().len());
/// # Ok::<(), abicomp_core::error::AbiError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReadContext
{
    path: String,
    soname: String,
    suppressions: Vec<Suppression>,
}

impl ReadContext
{
    pub fn new(path: impl Into<String>) -> Self
    {
        Self {
            path: path.into(),
            soname: String::new(),
            suppressions: Vec::new(),
        }
    }

    /// Keep the suppressions that drop artifacts; the rest are ignored here.
    #[must_use]
    pub fn with_suppressions(mut self, suppressions: Vec<Suppression>) -> Self
    {
        self.suppressions = suppressions
            .into_iter()
            .filter(|suppression| suppression.base().drops_artifact_from_ir())
            .collect();
        self
    }

    pub fn path(&self) -> &str
    {
        &self.path
    }

    /// Read the file at [`path`](Self::path) and build its corpus.
    ///
    /// ## Errors
    ///
    /// I/O failures, and anything [`read_corpus_from`](Self::read_corpus_from)
    /// rejects.
    pub fn read_corpus(&mut self) -> Result<Corpus>
    {
        let data = fs::read(&self.path)?;
        self.read_corpus_from(&data)
    }

    /// Build a corpus from an in-memory ELF image.
    ///
    /// The corpus carries the symbol table, SONAME, DT_NEEDED entries and
    /// architecture of the image. It has no declarations.
    ///
    /// ## Errors
    ///
    /// Fails when the image is not ELF or its symbol table cannot be loaded.
    pub fn read_corpus_from(&mut self, data: &[u8]) -> Result<Corpus>
    {
        let dynamic = read_dynamic_info(data)?;
        self.soname = dynamic.soname.unwrap_or_default();

        let architecture = object::File::parse(data)
            .map(|file| Architecture::from_object(file.architecture()))
            .map_err(|err| AbiError::from(SymtabError::Parse(err.to_string())))?;

        let ctx: &Self = self;
        let is_suppressed = |symbol: &ElfSymbol| is_elf_symbol_suppressed(ctx, symbol.name(), symbol.symbol_type());
        let symtab = if ctx.suppressions.is_empty() {
            Symtab::load(data, None)?
        } else {
            Symtab::load(data, Some(&is_suppressed))?
        };

        info!(
            path = %self.path,
            soname = %self.soname,
            %architecture,
            symbols = symtab.len(),
            "read corpus"
        );
        debug!(needed = ?dynamic.needed, "DT_NEEDED entries");

        Ok(Corpus::new(self.path.clone(), symtab)
            .with_soname(self.soname.clone())
            .with_architecture(architecture)
            .with_needed(dynamic.needed))
    }
}

impl SuppressionContext for ReadContext
{
    fn suppressions(&self) -> &[Suppression]
    {
        &self.suppressions
    }

    fn soname(&self) -> &str
    {
        &self.soname
    }

    fn binary_path(&self) -> &str
    {
        &self.path
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_missing_file_is_io_error()
    {
        let err = ReadContext::new("/nonexistent/libnothing.so").read_corpus().unwrap_err();
        assert!(matches!(err, AbiError::Io(_)));
    }

    #[test]
    fn test_garbage_is_parse_error()
    {
        let err = ReadContext::new("garbage").read_corpus_from(b"garbage bytes").unwrap_err();
        assert!(matches!(err, AbiError::Symtab(SymtabError::Parse(_))));
    }

    #[test]
    fn test_only_dropping_suppressions_are_kept()
    {
        use crate::suppression::{ChangeKind, FunctionSuppression, SuppressionBase};

        let ctx = ReadContext::new("libapi.so").with_suppressions(vec![
            FunctionSuppression::new(SuppressionBase::new("hide"))
                .symbol_name("api_close")
                .change_kind(ChangeKind::ADDED)
                .into(),
            FunctionSuppression::new(SuppressionBase::new("drop").drops_artifact(true))
                .symbol_name("api_internal")
                .into(),
        ]);

        assert_eq!(ctx.suppressions().len(), 1);
        assert_eq!(ctx.suppressions()[0].base().label(), "drop");
    }
}
