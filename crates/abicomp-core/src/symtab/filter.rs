//! # Symtab Filters
//!
//! Predicate-based selection of symbols while iterating a [`Symtab`].
//!
//! A filter is a conjunction of optional flags. A flag that is not set does
//! not constrain anything, neither inclusively nor exclusively. A flag that is
//! set must be equal to the corresponding property of the symbol.
//!
//! ```rust
//! use abicomp_core::symtab::{SymtabFilter, SymtabFilterBuilder};
//!
//! let filter: SymtabFilter = SymtabFilterBuilder::new().functions(true).public_symbols(true).build();
//! assert_eq!(filter.functions, Some(true));
//! assert_eq!(filter.variables, None);
//! ```

use std::slice;

use super::symbol::{ElfSymbol, SymbolId};
use super::Symtab;

/// Conjunction of optional symbol predicates.
///
/// The default filter has no flag set and matches every symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymtabFilter
{
    /// The symbol is a function (FUNC or GNU_IFUNC)
    pub functions: Option<bool>,
    /// The symbol is a variable (OBJECT, TLS or COMMON)
    pub variables: Option<bool>,
    /// The symbol is publicly accessible (global/weak with default/protected visibility)
    pub public_symbols: Option<bool>,
    /// The symbol is not defined (declared only)
    pub undefined_symbols: Option<bool>,
    /// The symbol is listed in the ksymtab (Linux kernel binaries)
    pub kernel_symbols: Option<bool>,
}

impl SymtabFilter
{
    /// Whether `symbol` passes every flag that is set.
    ///
    /// In filter terms, a symbol for which this returns `true` is kept.
    pub fn matches(&self, symbol: &ElfSymbol) -> bool
    {
        if self.functions.is_some_and(|want| want != symbol.is_function()) {
            return false;
        }
        if self.variables.is_some_and(|want| want != symbol.is_variable()) {
            return false;
        }
        if self.public_symbols.is_some_and(|want| want != symbol.is_public()) {
            return false;
        }
        if self.undefined_symbols.is_some_and(|want| want == symbol.is_defined()) {
            return false;
        }
        if self.kernel_symbols.is_some_and(|want| want != symbol.is_in_ksymtab()) {
            return false;
        }
        true
    }
}

/// Fluent builder for [`SymtabFilter`].
///
/// ```rust
/// use abicomp_core::symtab::SymtabFilterBuilder;
///
/// // Exported kernel functions only
/// let filter = SymtabFilterBuilder::new().functions(true).kernel_symbols(true).build();
/// assert_eq!(filter.kernel_symbols, Some(true));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SymtabFilterBuilder
{
    filter: SymtabFilter,
}

impl SymtabFilterBuilder
{
    /// Builder for a filter that matches everything.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Enable inclusive / exclusive filtering for functions.
    #[must_use]
    pub fn functions(mut self, value: bool) -> Self
    {
        self.filter.functions = Some(value);
        self
    }

    /// Enable inclusive / exclusive filtering for variables.
    #[must_use]
    pub fn variables(mut self, value: bool) -> Self
    {
        self.filter.variables = Some(value);
        self
    }

    /// Enable inclusive / exclusive filtering for public symbols.
    #[must_use]
    pub fn public_symbols(mut self, value: bool) -> Self
    {
        self.filter.public_symbols = Some(value);
        self
    }

    /// Enable inclusive / exclusive filtering for undefined symbols.
    #[must_use]
    pub fn undefined_symbols(mut self, value: bool) -> Self
    {
        self.filter.undefined_symbols = Some(value);
        self
    }

    /// Enable inclusive / exclusive filtering for kernel symbols.
    #[must_use]
    pub fn kernel_symbols(mut self, value: bool) -> Self
    {
        self.filter.kernel_symbols = Some(value);
        self
    }

    /// Finish building.
    pub fn build(self) -> SymtabFilter
    {
        self.filter
    }
}

impl From<SymtabFilterBuilder> for SymtabFilter
{
    fn from(builder: SymtabFilterBuilder) -> Self
    {
        builder.build()
    }
}

/// Iterator over the ordered symbols of a [`Symtab`] that match a filter.
///
/// The iterator is always positioned on a matching symbol or at the end: it
/// skips ahead when it is created and again every time it advances.
#[derive(Debug, Clone)]
pub struct SymtabIter<'a>
{
    symtab: &'a Symtab,
    ids: slice::Iter<'a, SymbolId>,
    filter: SymtabFilter,
    current: Option<&'a ElfSymbol>,
}

impl<'a> SymtabIter<'a>
{
    pub(crate) fn new(symtab: &'a Symtab, ids: &'a [SymbolId], filter: SymtabFilter) -> Self
    {
        let mut iter = Self {
            symtab,
            ids: ids.iter(),
            filter,
            current: None,
        };
        iter.skip_to_next();
        iter
    }

    /// The symbol the iterator is positioned on, `None` at the end.
    pub fn peek(&self) -> Option<&'a ElfSymbol>
    {
        self.current
    }

    fn skip_to_next(&mut self)
    {
        let symtab = self.symtab;
        self.current = None;
        for id in self.ids.by_ref() {
            let symbol = symtab.symbol(*id);
            if self.filter.matches(symbol) {
                self.current = Some(symbol);
                break;
            }
        }
    }
}

impl<'a> Iterator for SymtabIter<'a>
{
    type Item = &'a ElfSymbol;

    fn next(&mut self) -> Option<Self::Item>
    {
        let result = self.current?;
        self.skip_to_next();
        Some(result)
    }
}

/// A symtab together with a filter, usable directly in `for` loops.
///
/// ```rust,no_run
/// use abicomp_core::symtab::Symtab;
///
/// # fn run(tab: &Symtab) {
/// let filter = tab.make_filter().functions(true).build();
/// for symbol in tab.filtered(filter) {
///     println!("{}", symbol.name());
/// }
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FilteredSymtab<'a>
{
    symtab: &'a Symtab,
    filter: SymtabFilter,
}

impl<'a> FilteredSymtab<'a>
{
    pub(crate) fn new(symtab: &'a Symtab, filter: SymtabFilter) -> Self
    {
        Self { symtab, filter }
    }
}

impl<'a> IntoIterator for FilteredSymtab<'a>
{
    type Item = &'a ElfSymbol;
    type IntoIter = SymtabIter<'a>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.symtab.iter(&self.filter)
    }
}
