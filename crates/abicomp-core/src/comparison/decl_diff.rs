//! Function, variable and symbol level changes.

use std::fmt;

use super::TypeDiff;
use crate::symtab::{ElfSymbol, SymbolBinding, SymbolType, SymbolVisibility};
use crate::types::SourceLocation;

/// A change to the ELF symbol behind a function or variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolAttributeChange
{
    Version
    {
        old: String,
        new: String,
    },
    Binding
    {
        old: SymbolBinding,
        new: SymbolBinding,
    },
    Type
    {
        old: SymbolType,
        new: SymbolType,
    },
    Visibility
    {
        old: SymbolVisibility,
        new: SymbolVisibility,
    },
    /// Size in bytes (variables only)
    Size
    {
        old: u64,
        new: u64,
    },
}

impl fmt::Display for SymbolAttributeChange
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SymbolAttributeChange::Version { old, new } => {
                write!(f, "symbol version changed from '{old}' to '{new}'")
            }
            SymbolAttributeChange::Binding { old, new } => write!(f, "symbol binding changed from {old} to {new}"),
            SymbolAttributeChange::Type { old, new } => write!(f, "symbol type changed from {old} to {new}"),
            SymbolAttributeChange::Visibility { old, new } => {
                write!(f, "symbol visibility changed from {old} to {new}")
            }
            SymbolAttributeChange::Size { old, new } => {
                write!(f, "size of symbol changed from {old} to {new} (in bytes)")
            }
        }
    }
}

/// Attribute changes between the symbols of a function or variable.
///
/// Missing symbols on either side compare equal: there is nothing to say.
pub(crate) fn symbol_changes(
    old: Option<&ElfSymbol>,
    new: Option<&ElfSymbol>,
    compare_size: bool,
) -> Vec<SymbolAttributeChange>
{
    let (Some(old), Some(new)) = (old, new) else {
        return Vec::new();
    };
    let mut changes = Vec::new();
    if old.version().name() != new.version().name() {
        changes.push(SymbolAttributeChange::Version {
            old: old.version().name().to_string(),
            new: new.version().name().to_string(),
        });
    }
    if old.binding() != new.binding() {
        changes.push(SymbolAttributeChange::Binding {
            old: old.binding(),
            new: new.binding(),
        });
    }
    if old.symbol_type() != new.symbol_type() {
        changes.push(SymbolAttributeChange::Type {
            old: old.symbol_type(),
            new: new.symbol_type(),
        });
    }
    if old.visibility() != new.visibility() {
        changes.push(SymbolAttributeChange::Visibility {
            old: old.visibility(),
            new: new.visibility(),
        });
    }
    if compare_size && old.size() != new.size() {
        changes.push(SymbolAttributeChange::Size {
            old: old.size(),
            new: new.size(),
        });
    }
    changes
}

/// A function or variable that exists on one side only.
#[derive(Debug, Clone)]
pub struct EntityChange
{
    /// Signature (functions) or `type name` (variables)
    pub pretty_name: String,
    /// Symbol id string, linkage name or name, whichever is known
    pub id: String,
    pub symbol: Option<ElfSymbol>,
    pub location: Option<SourceLocation>,
    pub suppressed_by: Option<String>,
}

impl EntityChange
{
    pub fn is_suppressed(&self) -> bool
    {
        self.suppressed_by.is_some()
    }
}

/// A function or variable symbol that no declaration refers to, and that
/// exists on one side only.
#[derive(Debug, Clone)]
pub struct SymbolChange
{
    pub symbol: ElfSymbol,
    pub suppressed_by: Option<String>,
}

impl SymbolChange
{
    pub fn is_suppressed(&self) -> bool
    {
        self.suppressed_by.is_some()
    }
}

/// What happened to one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterChange
{
    /// Same position, different type
    TypeChanged(TypeDiff),
    Added
    {
        type_name: String,
    },
    Removed
    {
        type_name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDiff
{
    /// Zero-based position
    pub index: usize,
    pub name: Option<String>,
    pub change: ParameterChange,
    /// Label of the function suppression whose parameter spec elided this
    pub suppressed_by: Option<String>,
}

impl ParameterDiff
{
    pub fn has_reportable_changes(&self) -> bool
    {
        if self.suppressed_by.is_some() {
            return false;
        }
        match &self.change {
            ParameterChange::TypeChanged(diff) => diff.has_reportable_changes(),
            ParameterChange::Added { .. } | ParameterChange::Removed { .. } => true,
        }
    }
}

/// Changes to a function present in both corpora.
#[derive(Debug, Clone)]
pub struct FunctionDiff
{
    /// Signature in the first corpus
    pub pretty_name: String,
    pub id: String,
    pub location: Option<SourceLocation>,
    pub return_type: Option<TypeDiff>,
    pub parameters: Vec<ParameterDiff>,
    pub symbol_changes: Vec<SymbolAttributeChange>,
    /// Label of the function suppression that elided the whole diff
    pub suppressed_by: Option<String>,
}

impl FunctionDiff
{
    pub fn is_suppressed(&self) -> bool
    {
        self.suppressed_by.is_some()
    }

    pub fn has_changes(&self) -> bool
    {
        self.return_type.is_some() || !self.parameters.is_empty() || !self.symbol_changes.is_empty()
    }

    /// Whether anything survives suppression.
    pub fn has_reportable_changes(&self) -> bool
    {
        !self.is_suppressed()
            && (self.return_type.as_ref().is_some_and(TypeDiff::has_reportable_changes)
                || self.parameters.iter().any(ParameterDiff::has_reportable_changes)
                || !self.symbol_changes.is_empty())
    }

    /// Changed, but every change was suppressed somewhere in the tree.
    pub fn is_filtered_out(&self) -> bool
    {
        self.has_changes() && !self.has_reportable_changes()
    }
}

/// Changes to a variable present in both corpora.
#[derive(Debug, Clone)]
pub struct VariableDiff
{
    /// `type name` in the first corpus
    pub pretty_name: String,
    pub id: String,
    pub location: Option<SourceLocation>,
    pub type_diff: Option<TypeDiff>,
    pub symbol_changes: Vec<SymbolAttributeChange>,
    pub suppressed_by: Option<String>,
}

impl VariableDiff
{
    pub fn is_suppressed(&self) -> bool
    {
        self.suppressed_by.is_some()
    }

    pub fn has_changes(&self) -> bool
    {
        self.type_diff.is_some() || !self.symbol_changes.is_empty()
    }

    pub fn has_reportable_changes(&self) -> bool
    {
        !self.is_suppressed()
            && (self.type_diff.as_ref().is_some_and(TypeDiff::has_reportable_changes)
                || !self.symbol_changes.is_empty())
    }

    pub fn is_filtered_out(&self) -> bool
    {
        self.has_changes() && !self.has_reportable_changes()
    }
}
