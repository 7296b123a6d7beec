//! # ABI Corpus
//!
//! In-memory representation of the ABI of one binary: its symbol table, the
//! types it declares, and the functions and variables it exports.
//!
//! A corpus is built either by [`ReadContext`] from an ELF file, which yields
//! a symbol-only corpus, or programmatically by producers that decode debug
//! information and add declarations through [`Corpus::add_function`] and
//! [`Corpus::add_variable`].

mod reader;
mod types;

pub use reader::ReadContext;
pub use types::{
    DataMember, EnumType, Enumerator, FunctionType, Qualifiers, RecordKind, RecordType, Type, TypeGraph, TypeId,
};

use crate::symtab::{ElfSymbol, Symtab};
use crate::types::{Architecture, SourceLocation};

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter
{
    pub name: Option<String>,
    pub type_id: TypeId,
}

impl Parameter
{
    pub fn new(name: impl Into<String>, type_id: TypeId) -> Self
    {
        Self {
            name: Some(name.into()),
            type_id,
        }
    }

    pub fn unnamed(type_id: TypeId) -> Self
    {
        Self { name: None, type_id }
    }
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl
{
    pub name: String,
    /// Mangled name, or the plain name for C functions
    pub linkage_name: Option<String>,
    pub return_type: TypeId,
    pub parameters: Vec<Parameter>,
    pub location: Option<SourceLocation>,
}

impl FunctionDecl
{
    pub fn new(name: impl Into<String>, return_type: TypeId) -> Self
    {
        Self {
            name: name.into(),
            linkage_name: None,
            return_type,
            parameters: Vec::new(),
            location: None,
        }
    }

    #[must_use]
    pub fn linkage_name(mut self, name: impl Into<String>) -> Self
    {
        self.linkage_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self
    {
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn location(mut self, location: SourceLocation) -> Self
    {
        self.location = Some(location);
        self
    }

    pub fn parameter_types(&self) -> Vec<TypeId>
    {
        self.parameters.iter().map(|parameter| parameter.type_id).collect()
    }
}

/// A global variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl
{
    pub name: String,
    pub linkage_name: Option<String>,
    pub type_id: TypeId,
    pub location: Option<SourceLocation>,
}

impl VariableDecl
{
    pub fn new(name: impl Into<String>, type_id: TypeId) -> Self
    {
        Self {
            name: name.into(),
            linkage_name: None,
            type_id,
            location: None,
        }
    }

    #[must_use]
    pub fn linkage_name(mut self, name: impl Into<String>) -> Self
    {
        self.linkage_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn location(mut self, location: SourceLocation) -> Self
    {
        self.location = Some(location);
        self
    }
}

/// ABI of one binary.
#[derive(Debug, Default)]
pub struct Corpus
{
    path: String,
    soname: String,
    architecture: Option<Architecture>,
    needed: Vec<String>,
    symtab: Symtab,
    types: TypeGraph,
    functions: Vec<FunctionDecl>,
    variables: Vec<VariableDecl>,
}

impl Corpus
{
    pub fn new(path: impl Into<String>, symtab: Symtab) -> Self
    {
        Self {
            path: path.into(),
            symtab,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_soname(mut self, soname: impl Into<String>) -> Self
    {
        self.soname = soname.into();
        self
    }

    #[must_use]
    pub fn with_architecture(mut self, architecture: Architecture) -> Self
    {
        self.architecture = Some(architecture);
        self
    }

    #[must_use]
    pub fn with_needed(mut self, needed: Vec<String>) -> Self
    {
        self.needed = needed;
        self
    }

    #[must_use]
    pub fn with_types(mut self, types: TypeGraph) -> Self
    {
        self.types = types;
        self
    }

    pub fn path(&self) -> &str
    {
        &self.path
    }

    /// DT_SONAME, or the empty string.
    pub fn soname(&self) -> &str
    {
        &self.soname
    }

    pub fn architecture(&self) -> Option<Architecture>
    {
        self.architecture
    }

    /// DT_NEEDED entries, in file order.
    pub fn needed(&self) -> &[String]
    {
        &self.needed
    }

    pub fn symtab(&self) -> &Symtab
    {
        &self.symtab
    }

    pub fn types(&self) -> &TypeGraph
    {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeGraph
    {
        &mut self.types
    }

    pub fn functions(&self) -> &[FunctionDecl]
    {
        &self.functions
    }

    pub fn variables(&self) -> &[VariableDecl]
    {
        &self.variables
    }

    pub fn add_function(&mut self, function: FunctionDecl)
    {
        self.functions.push(function);
    }

    pub fn add_variable(&mut self, variable: VariableDecl)
    {
        self.variables.push(variable);
    }

    /// The symbol a declaration with that linkage name is bound to.
    ///
    /// When several symbols share the name (versioned symbols), the default
    /// version wins, then the first one in file order.
    pub fn symbol_for(&self, linkage_name: Option<&str>) -> Option<&ElfSymbol>
    {
        let ids = self.symtab.lookup_symbol(linkage_name?);
        ids.iter()
            .map(|id| self.symtab.symbol(*id))
            .find(|symbol| symbol.version().is_default())
            .or_else(|| ids.first().map(|id| self.symtab.symbol(*id)))
    }

    pub fn function_symbol(&self, function: &FunctionDecl) -> Option<&ElfSymbol>
    {
        self.symbol_for(function.linkage_name.as_deref())
    }

    pub fn variable_symbol(&self, variable: &VariableDecl) -> Option<&ElfSymbol>
    {
        self.symbol_for(variable.linkage_name.as_deref())
    }
}

#[cfg(test)]
mod tests
{
    use object::elf::STT_FUNC;

    use super::*;
    use crate::symtab::{RawSymbol, SymbolVersion, SymtabFlags};

    #[test]
    fn test_symbol_for_prefers_default_version()
    {
        let mut old = RawSymbol::new(1, "frob", STT_FUNC, 0x1000);
        old.version = SymbolVersion::new("V1", false);
        let mut current = RawSymbol::new(2, "frob", STT_FUNC, 0x2000);
        current.version = SymbolVersion::new("V2", true);
        let symtab = Symtab::from_entries([old, current], SymtabFlags::default(), None);

        let mut corpus = Corpus::new("libfrob.so", symtab);
        let void = corpus.types_mut().void();
        let decl = FunctionDecl::new("frob", void).linkage_name("frob");

        let symbol = corpus.function_symbol(&decl).map(ElfSymbol::id_string);
        assert_eq!(symbol.as_deref(), Some("frob@@V2"));
        assert!(corpus.symbol_for(Some("missing")).is_none());
        assert!(corpus.symbol_for(None).is_none());
    }
}
