//! ELF symbol model.

use std::fmt;

use crate::types::{Address, SymbolName};

use super::demangle::make_symbol_name;

/// Index of a symbol in a [`Symtab`](super::Symtab) arena.
///
/// Ids are only meaningful for the symtab that handed them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub(crate) usize);

impl SymbolId
{
    /// Raw arena index.
    pub fn index(self) -> usize
    {
        self.0
    }
}

/// Symbol type (`STT_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType
{
    NoType,
    Object,
    Func,
    Section,
    File,
    Common,
    Tls,
    GnuIfunc,
}

impl SymbolType
{
    /// Map a raw `st_type` value.
    pub fn from_st_type(st_type: u8) -> Self
    {
        match st_type {
            object::elf::STT_OBJECT => SymbolType::Object,
            object::elf::STT_FUNC => SymbolType::Func,
            object::elf::STT_SECTION => SymbolType::Section,
            object::elf::STT_FILE => SymbolType::File,
            object::elf::STT_COMMON => SymbolType::Common,
            object::elf::STT_TLS => SymbolType::Tls,
            object::elf::STT_GNU_IFUNC => SymbolType::GnuIfunc,
            _ => SymbolType::NoType,
        }
    }

    /// Functions and indirect functions.
    pub fn is_function(self) -> bool
    {
        matches!(self, SymbolType::Func | SymbolType::GnuIfunc)
    }

    /// Data objects, including thread-local and common ones.
    pub fn is_variable(self) -> bool
    {
        matches!(self, SymbolType::Object | SymbolType::Tls | SymbolType::Common)
    }
}

impl fmt::Display for SymbolType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolType::NoType => "no-type",
            SymbolType::Object => "object-type",
            SymbolType::Func => "func-type",
            SymbolType::Section => "section-type",
            SymbolType::File => "file-type",
            SymbolType::Common => "common-type",
            SymbolType::Tls => "tls-type",
            SymbolType::GnuIfunc => "gnu-ifunc-type",
        };
        write!(f, "{label}")
    }
}

/// Symbol binding (`STB_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolBinding
{
    Local,
    Global,
    Weak,
    GnuUnique,
}

impl SymbolBinding
{
    /// Map a raw `st_bind` value. Unknown bindings are treated as global.
    pub fn from_st_bind(st_bind: u8) -> Self
    {
        match st_bind {
            object::elf::STB_LOCAL => SymbolBinding::Local,
            object::elf::STB_WEAK => SymbolBinding::Weak,
            object::elf::STB_GNU_UNIQUE => SymbolBinding::GnuUnique,
            _ => SymbolBinding::Global,
        }
    }
}

impl fmt::Display for SymbolBinding
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolBinding::Local => "local-binding",
            SymbolBinding::Global => "global-binding",
            SymbolBinding::Weak => "weak-binding",
            SymbolBinding::GnuUnique => "gnu-unique-binding",
        };
        write!(f, "{label}")
    }
}

/// Symbol visibility (`STV_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolVisibility
{
    Default,
    Internal,
    Hidden,
    Protected,
}

impl SymbolVisibility
{
    /// Map a raw `st_other & 0x3` value.
    pub fn from_st_visibility(st_visibility: u8) -> Self
    {
        match st_visibility {
            object::elf::STV_INTERNAL => SymbolVisibility::Internal,
            object::elf::STV_HIDDEN => SymbolVisibility::Hidden,
            object::elf::STV_PROTECTED => SymbolVisibility::Protected,
            _ => SymbolVisibility::Default,
        }
    }
}

impl fmt::Display for SymbolVisibility
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolVisibility::Default => "default-visibility",
            SymbolVisibility::Internal => "internal-visibility",
            SymbolVisibility::Hidden => "hidden-visibility",
            SymbolVisibility::Protected => "protected-visibility",
        };
        write!(f, "{label}")
    }
}

/// GNU symbol version attached to a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SymbolVersion
{
    name: String,
    is_default: bool,
}

impl SymbolVersion
{
    /// Build a version. `is_default` is true for `foo@@VER`, false for `foo@VER`.
    pub fn new(name: impl Into<String>, is_default: bool) -> Self
    {
        Self {
            name: name.into(),
            is_default,
        }
    }

    /// Version string, empty for unversioned symbols.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    pub fn is_default(&self) -> bool
    {
        self.is_default
    }

    pub fn is_empty(&self) -> bool
    {
        self.name.is_empty()
    }
}

/// An entry of the ELF symbol table that abicomp cares about.
///
/// Symbols are created while a [`Symtab`](super::Symtab) loads and are not
/// modified afterwards. Alias and common-instance relations live in the owning
/// symtab, indexed by [`SymbolId`].
#[derive(Debug, Clone)]
pub struct ElfSymbol
{
    pub(crate) id: SymbolId,
    pub(crate) index: usize,
    pub(crate) name: SymbolName,
    pub(crate) size: u64,
    pub(crate) address: Option<Address>,
    pub(crate) symbol_type: SymbolType,
    pub(crate) binding: SymbolBinding,
    pub(crate) visibility: SymbolVisibility,
    pub(crate) version: SymbolVersion,
    pub(crate) is_defined: bool,
    pub(crate) is_common: bool,
    pub(crate) is_suppressed: bool,
    pub(crate) is_in_ksymtab: bool,
}

impl ElfSymbol
{
    /// Create a standalone symbol, not yet part of a symtab.
    ///
    /// This is the entry point for producers that reconstruct symbols from
    /// another representation. The id is assigned when the symbol is handed
    /// to [`Symtab::from_maps`](super::Symtab::from_maps).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: usize,
        name: impl Into<String>,
        size: u64,
        symbol_type: SymbolType,
        binding: SymbolBinding,
        visibility: SymbolVisibility,
        version: SymbolVersion,
        is_defined: bool,
    ) -> Self
    {
        Self {
            id: SymbolId(usize::MAX),
            index,
            name: make_symbol_name(name.into()),
            size,
            address: None,
            symbol_type,
            binding,
            visibility,
            version,
            is_defined,
            is_common: false,
            is_suppressed: false,
            is_in_ksymtab: false,
        }
    }

    pub fn id(&self) -> SymbolId
    {
        self.id
    }

    /// Index of the entry in the original `.symtab`.
    pub fn index(&self) -> usize
    {
        self.index
    }

    /// Raw linkage name.
    pub fn name(&self) -> &str
    {
        self.name.raw()
    }

    /// Linkage name with demangling metadata.
    pub fn symbol_name(&self) -> &SymbolName
    {
        &self.name
    }

    pub fn size(&self) -> u64
    {
        self.size
    }

    /// Address the symbol was indexed under, if it is defined and not common.
    pub fn address(&self) -> Option<Address>
    {
        self.address
    }

    pub fn symbol_type(&self) -> SymbolType
    {
        self.symbol_type
    }

    pub fn binding(&self) -> SymbolBinding
    {
        self.binding
    }

    pub fn visibility(&self) -> SymbolVisibility
    {
        self.visibility
    }

    pub fn version(&self) -> &SymbolVersion
    {
        &self.version
    }

    pub fn is_function(&self) -> bool
    {
        self.symbol_type.is_function()
    }

    pub fn is_variable(&self) -> bool
    {
        self.symbol_type.is_variable()
    }

    pub fn is_defined(&self) -> bool
    {
        self.is_defined
    }

    pub fn is_common_symbol(&self) -> bool
    {
        self.is_common
    }

    /// Whether a suppression predicate dropped this symbol at load time.
    pub fn is_suppressed(&self) -> bool
    {
        self.is_suppressed
    }

    /// Whether a `__ksymtab_<name>` marker exported this symbol (kernel only).
    pub fn is_in_ksymtab(&self) -> bool
    {
        self.is_in_ksymtab
    }

    /// Defined, globally bound and visible from outside the binary.
    pub fn is_public(&self) -> bool
    {
        self.is_defined
            && matches!(
                self.binding,
                SymbolBinding::Global | SymbolBinding::Weak | SymbolBinding::GnuUnique
            )
            && matches!(self.visibility, SymbolVisibility::Default | SymbolVisibility::Protected)
    }

    /// Identity of the symbol: `name`, `name@version` or `name@@version`.
    pub fn id_string(&self) -> String
    {
        if self.version.is_empty() {
            return self.name().to_string();
        }
        let separator = if self.version.is_default() { "@@" } else { "@" };
        format!("{}{separator}{}", self.name(), self.version.name())
    }
}

impl fmt::Display for ElfSymbol
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.id_string())
    }
}
