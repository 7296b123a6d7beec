//! # Corpus Comparison
//!
//! Computes the ABI differences between two corpora and decides which of
//! them survive the suppressions in effect.
//!
//! ## Overview
//!
//! [`compute_diff`] walks both corpora and produces a [`CorpusDiff`]:
//!
//! - binary-level changes: SONAME, architecture, DT_NEEDED
//! - functions and variables removed, added or changed
//! - function and variable symbols that no declaration refers to, removed or
//!   added
//!
//! Functions and variables are matched by the id string of their symbol
//! (`name@@VERSION`), falling back to the linkage name and then the plain
//! name for declarations without a symbol. Only declarations whose symbol is
//! in the comparison set ([`Symtab::make_filter`](crate::symtab::Symtab::make_filter))
//! take part.
//!
//! ## Suppressions
//!
//! Every change carries the label of the suppression that elided it, if any.
//! Nothing is dropped from the diff: reports decide whether to show
//! suppressed changes, and statistics count them separately.
//!
//! ```rust
//! use abicomp_core::comparison::{compute_diff, DiffContext};
//! use abicomp_core::ir::Corpus;
//! use abicomp_core::symtab::{RawSymbol, Symtab, SymtabFlags};
//! use object::elf::STT_FUNC;
//!
//! let old = Symtab::from_entries([RawSymbol::new(1, "legacy_api", STT_FUNC, 0x1000)], SymtabFlags::default(), None);
//! let new = Symtab::from_entries(Vec::new(), SymtabFlags::default(), None);
//!
//! let diff = compute_diff(&Corpus::new("old.so", old), &Corpus::new("new.so", new), &DiffContext::default());
//! assert_eq!(diff.removed_function_symbols.len(), 1);
//! assert!(diff.has_incompatible_changes());
//! ```

mod decl_diff;
mod type_diff;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

pub use decl_diff::{
    EntityChange, FunctionDiff, ParameterChange, ParameterDiff, SymbolAttributeChange, SymbolChange, VariableDiff,
};
pub use type_diff::{TypeChangeDetail, TypeDiff, TypeDiffChild};

use self::decl_diff::symbol_changes;
use self::type_diff::TypeComparer;
use crate::ir::{Corpus, FunctionDecl, VariableDecl};
use crate::report::DiffStatus;
use crate::suppression::{
    ChangeKind, FunctionDescription, Reach, Suppression, SuppressionContext, VariableDescription,
};
use crate::symtab::ElfSymbol;
use crate::types::Architecture;

/// What a comparison reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions
{
    /// Print declaration sites in reports
    pub show_locations: bool,
    /// Compare symbols that no declaration refers to
    pub show_unreferenced_symbols: bool,
    /// List suppressed changes in reports instead of only counting them
    pub show_suppressed: bool,
}

impl Default for DiffOptions
{
    fn default() -> Self
    {
        Self {
            show_locations: true,
            show_unreferenced_symbols: true,
            show_suppressed: false,
        }
    }
}

/// Suppressions and options of a comparison.
///
/// The suppression list is shared: cloning a context, or handing it to
/// several worker threads, does not copy the suppressions nor their compiled
/// regexes.
#[derive(Debug, Clone, Default)]
pub struct DiffContext
{
    suppressions: Arc<[Suppression]>,
    options: DiffOptions,
    /// SONAME and path of the first corpus of the pair being compared
    soname: String,
    path: String,
}

impl DiffContext
{
    pub fn new(suppressions: impl Into<Arc<[Suppression]>>) -> Self
    {
        Self {
            suppressions: suppressions.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: DiffOptions) -> Self
    {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DiffOptions
    {
        &self.options
    }

    /// The suppression list, for building other contexts around it.
    pub fn shared_suppressions(&self) -> Arc<[Suppression]>
    {
        Arc::clone(&self.suppressions)
    }

    /// Same suppressions and options, matched against `corpus`'s SONAME and
    /// path.
    fn bound_to(&self, corpus: &Corpus) -> Self
    {
        Self {
            suppressions: Arc::clone(&self.suppressions),
            options: self.options,
            soname: corpus.soname().to_string(),
            path: corpus.path().to_string(),
        }
    }
}

impl SuppressionContext for DiffContext
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

/// Number of changes of one category, and how many of them are suppressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCount
{
    pub total: usize,
    pub suppressed: usize,
}

impl ChangeCount
{
    fn count<T>(items: &[T], is_suppressed: impl Fn(&T) -> bool) -> Self
    {
        Self {
            total: items.len(),
            suppressed: items.iter().filter(|item| is_suppressed(*item)).count(),
        }
    }

    pub fn reportable(self) -> usize
    {
        self.total - self.suppressed
    }
}

/// Change counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats
{
    pub removed_functions: ChangeCount,
    pub added_functions: ChangeCount,
    pub changed_functions: ChangeCount,
    pub removed_variables: ChangeCount,
    pub added_variables: ChangeCount,
    pub changed_variables: ChangeCount,
    pub removed_function_symbols: ChangeCount,
    pub added_function_symbols: ChangeCount,
    pub removed_variable_symbols: ChangeCount,
    pub added_variable_symbols: ChangeCount,
}

/// Everything that changed between two corpora.
#[derive(Debug, Clone, Default)]
pub struct CorpusDiff
{
    pub first_path: String,
    pub second_path: String,
    pub soname_change: Option<(String, String)>,
    pub architecture_change: Option<(Architecture, Architecture)>,
    pub removed_needed: Vec<String>,
    pub added_needed: Vec<String>,
    pub removed_functions: Vec<EntityChange>,
    pub added_functions: Vec<EntityChange>,
    pub changed_functions: Vec<FunctionDiff>,
    pub removed_variables: Vec<EntityChange>,
    pub added_variables: Vec<EntityChange>,
    pub changed_variables: Vec<VariableDiff>,
    pub removed_function_symbols: Vec<SymbolChange>,
    pub added_function_symbols: Vec<SymbolChange>,
    pub removed_variable_symbols: Vec<SymbolChange>,
    pub added_variable_symbols: Vec<SymbolChange>,
}

impl CorpusDiff
{
    fn has_binary_changes(&self) -> bool
    {
        self.soname_change.is_some()
            || self.architecture_change.is_some()
            || !self.removed_needed.is_empty()
            || !self.added_needed.is_empty()
    }

    /// Whether anything changed, suppressed or not.
    pub fn has_changes(&self) -> bool
    {
        let stats = self.stats();
        self.has_binary_changes()
            || [
                stats.removed_functions,
                stats.added_functions,
                stats.changed_functions,
                stats.removed_variables,
                stats.added_variables,
                stats.changed_variables,
                stats.removed_function_symbols,
                stats.added_function_symbols,
                stats.removed_variable_symbols,
                stats.added_variable_symbols,
            ]
            .iter()
            .any(|count| count.total > 0)
    }

    /// Whether at least one change survives suppression.
    pub fn has_reportable_changes(&self) -> bool
    {
        self.has_binary_changes()
            || self.has_incompatible_changes()
            || self.added_functions.iter().any(|change| !change.is_suppressed())
            || self.added_variables.iter().any(|change| !change.is_suppressed())
            || self.added_function_symbols.iter().any(|change| !change.is_suppressed())
            || self.added_variable_symbols.iter().any(|change| !change.is_suppressed())
            || self.changed_functions.iter().any(FunctionDiff::has_reportable_changes)
            || self.changed_variables.iter().any(VariableDiff::has_reportable_changes)
    }

    /// Whether something users of the first binary rely on is gone.
    pub fn has_incompatible_changes(&self) -> bool
    {
        self.removed_functions.iter().any(|change| !change.is_suppressed())
            || self.removed_variables.iter().any(|change| !change.is_suppressed())
            || self.removed_function_symbols.iter().any(|change| !change.is_suppressed())
            || self.removed_variable_symbols.iter().any(|change| !change.is_suppressed())
    }

    /// Exit status bits for this diff.
    pub fn status(&self) -> DiffStatus
    {
        let mut status = DiffStatus::OK;
        if self.has_reportable_changes() {
            status |= DiffStatus::ABI_CHANGE;
        }
        if self.has_incompatible_changes() {
            status |= DiffStatus::ABI_INCOMPATIBLE_CHANGE;
        }
        status
    }

    pub fn stats(&self) -> DiffStats
    {
        DiffStats {
            removed_functions: ChangeCount::count(&self.removed_functions, EntityChange::is_suppressed),
            added_functions: ChangeCount::count(&self.added_functions, EntityChange::is_suppressed),
            changed_functions: ChangeCount::count(&self.changed_functions, FunctionDiff::is_filtered_out),
            removed_variables: ChangeCount::count(&self.removed_variables, EntityChange::is_suppressed),
            added_variables: ChangeCount::count(&self.added_variables, EntityChange::is_suppressed),
            changed_variables: ChangeCount::count(&self.changed_variables, VariableDiff::is_filtered_out),
            removed_function_symbols: ChangeCount::count(&self.removed_function_symbols, SymbolChange::is_suppressed),
            added_function_symbols: ChangeCount::count(&self.added_function_symbols, SymbolChange::is_suppressed),
            removed_variable_symbols: ChangeCount::count(&self.removed_variable_symbols, SymbolChange::is_suppressed),
            added_variable_symbols: ChangeCount::count(&self.added_variable_symbols, SymbolChange::is_suppressed),
        }
    }
}

/// Compare two corpora.
///
/// Suppressions of `ctx` are matched against the SONAME and path of `first`.
pub fn compute_diff(first: &Corpus, second: &Corpus, ctx: &DiffContext) -> CorpusDiff
{
    let ctx = ctx.bound_to(first);
    let old = Side::new(first);
    let new = Side::new(second);
    let mut types = TypeComparer::new(first.types(), second.types(), &ctx);

    let mut diff = CorpusDiff {
        first_path: first.path().to_string(),
        second_path: second.path().to_string(),
        ..Default::default()
    };
    diff_binaries(first, second, &mut diff);
    diff_functions(&ctx, &old, &new, &mut types, &mut diff);
    diff_variables(&ctx, &old, &new, &mut types, &mut diff);
    if ctx.options.show_unreferenced_symbols {
        diff_unreferenced_symbols(&ctx, &old, &new, &mut diff);
    }

    let stats = diff.stats();
    info!(
        first = first.path(),
        second = second.path(),
        removed_functions = stats.removed_functions.total,
        added_functions = stats.added_functions.total,
        changed_functions = stats.changed_functions.total,
        removed_variables = stats.removed_variables.total,
        added_variables = stats.added_variables.total,
        changed_variables = stats.changed_variables.total,
        "computed corpus diff"
    );
    diff
}

/// One corpus, indexed for comparison.
struct Side<'a>
{
    corpus: &'a Corpus,
    /// Symbols in the comparison set, by id string
    eligible: BTreeMap<String, &'a ElfSymbol>,
    /// Id strings of symbols some declaration refers to
    referenced: HashSet<String>,
    functions: BTreeMap<String, (&'a FunctionDecl, Option<&'a ElfSymbol>)>,
    variables: BTreeMap<String, (&'a VariableDecl, Option<&'a ElfSymbol>)>,
}

impl<'a> Side<'a>
{
    fn new(corpus: &'a Corpus) -> Self
    {
        let symtab = corpus.symtab();
        let eligible: BTreeMap<_, _> = symtab
            .filtered(symtab.make_filter())
            .into_iter()
            .map(|symbol| (symbol.id_string(), symbol))
            .collect();

        let mut side = Side {
            corpus,
            eligible,
            referenced: HashSet::new(),
            functions: BTreeMap::new(),
            variables: BTreeMap::new(),
        };
        for function in corpus.functions() {
            let symbol = corpus.function_symbol(function);
            if let Some(key) = side.decl_key(symbol, function.linkage_name.as_deref(), &function.name) {
                side.functions.entry(key).or_insert((function, symbol));
            }
        }
        for variable in corpus.variables() {
            let symbol = corpus.variable_symbol(variable);
            if let Some(key) = side.decl_key(symbol, variable.linkage_name.as_deref(), &variable.name) {
                side.variables.entry(key).or_insert((variable, symbol));
            }
        }
        side
    }

    /// Matching key of a declaration, `None` if it is out of the comparison.
    fn decl_key(&mut self, symbol: Option<&ElfSymbol>, linkage_name: Option<&str>, name: &str) -> Option<String>
    {
        match symbol {
            Some(symbol) => {
                let id = symbol.id_string();
                self.referenced.insert(id.clone());
                if self.eligible.contains_key(&id) {
                    Some(id)
                } else {
                    debug!(symbol = %id, "declaration bound to a symbol outside the comparison set");
                    None
                }
            }
            None => Some(linkage_name.filter(|linkage| !linkage.is_empty()).unwrap_or(name).to_string()),
        }
    }
}

fn diff_binaries(first: &Corpus, second: &Corpus, diff: &mut CorpusDiff)
{
    if first.soname() != second.soname() {
        diff.soname_change = Some((first.soname().to_string(), second.soname().to_string()));
    }
    if let (Some(old), Some(new)) = (first.architecture(), second.architecture()) {
        if old != new {
            diff.architecture_change = Some((old, new));
        }
    }
    diff.removed_needed = first
        .needed()
        .iter()
        .filter(|needed| !second.needed().contains(needed))
        .cloned()
        .collect();
    diff.added_needed = second
        .needed()
        .iter()
        .filter(|needed| !first.needed().contains(needed))
        .cloned()
        .collect();
}

fn describe_function<'a>(
    corpus: &'a Corpus,
    function: &'a FunctionDecl,
    symbol: Option<&'a ElfSymbol>,
) -> FunctionDescription<'a>
{
    let types = corpus.types();
    FunctionDescription {
        name: &function.name,
        linkage_name: function.linkage_name.as_deref().unwrap_or_default(),
        symbol,
        alias_names: alias_names(corpus, symbol),
        return_type: Some(types.type_name(function.return_type)),
        parameter_types: function
            .parameters
            .iter()
            .map(|parameter| types.type_name(parameter.type_id))
            .collect(),
    }
}

fn alias_names<'a>(corpus: &'a Corpus, symbol: Option<&ElfSymbol>) -> Vec<&'a str>
{
    let Some(symbol) = symbol else {
        return Vec::new();
    };
    let symtab = corpus.symtab();
    symtab
        .aliases(symbol.id())
        .into_iter()
        .map(|id| symtab.symbol(id).name())
        .collect()
}

fn function_suppression(ctx: &DiffContext, function: &FunctionDescription<'_>, kind: ChangeKind) -> Option<String>
{
    ctx.suppressions()
        .iter()
        .filter_map(Suppression::as_function)
        .find(|suppression| suppression.suppresses_function(ctx, function, kind, true))
        .map(|suppression| suppression.base().label().to_string())
}

fn variable_suppression(ctx: &DiffContext, variable: &VariableDescription<'_>, kind: ChangeKind) -> Option<String>
{
    ctx.suppressions()
        .iter()
        .filter_map(Suppression::as_variable)
        .find(|suppression| suppression.suppresses_variable(ctx, variable, kind))
        .map(|suppression| suppression.base().label().to_string())
}

fn function_entity(
    ctx: &DiffContext,
    corpus: &Corpus,
    key: &str,
    (function, symbol): (&FunctionDecl, Option<&ElfSymbol>),
    kind: ChangeKind,
) -> EntityChange
{
    let description = describe_function(corpus, function, symbol);
    EntityChange {
        pretty_name: corpus
            .types()
            .signature(&function.name, function.return_type, &function.parameter_types()),
        id: key.to_string(),
        symbol: symbol.cloned(),
        location: function.location.clone(),
        suppressed_by: function_suppression(ctx, &description, kind),
    }
}

fn diff_functions(
    ctx: &DiffContext,
    old: &Side<'_>,
    new: &Side<'_>,
    types: &mut TypeComparer<'_, DiffContext>,
    diff: &mut CorpusDiff,
)
{
    for (key, &(function, symbol)) in &old.functions {
        match new.functions.get(key) {
            None => diff.removed_functions.push(function_entity(
                ctx,
                old.corpus,
                key,
                (function, symbol),
                ChangeKind::DELETED,
            )),
            Some(&(counterpart, counterpart_symbol)) => {
                let changed = function_diff(
                    ctx,
                    types,
                    old.corpus,
                    key,
                    (function, symbol),
                    (counterpart, counterpart_symbol),
                );
                diff.changed_functions.extend(changed);
            }
        }
    }
    for (key, &entry) in &new.functions {
        if !old.functions.contains_key(key) {
            diff.added_functions
                .push(function_entity(ctx, new.corpus, key, entry, ChangeKind::ADDED));
        }
    }
}

fn function_diff(
    ctx: &DiffContext,
    types: &mut TypeComparer<'_, DiffContext>,
    corpus: &Corpus,
    key: &str,
    (old, old_symbol): (&FunctionDecl, Option<&ElfSymbol>),
    (new, new_symbol): (&FunctionDecl, Option<&ElfSymbol>),
) -> Option<FunctionDiff>
{
    let return_type = types.compare(old.return_type, new.return_type, Reach::Direct);

    let mut parameters = Vec::new();
    for (index, (a, b)) in old.parameters.iter().zip(&new.parameters).enumerate() {
        if let Some(type_diff) = types.compare(a.type_id, b.type_id, Reach::Direct) {
            parameters.push(ParameterDiff {
                index,
                name: a.name.clone(),
                change: ParameterChange::TypeChanged(type_diff),
                suppressed_by: None,
            });
        }
    }
    for (index, removed) in old.parameters.iter().enumerate().skip(new.parameters.len()) {
        parameters.push(ParameterDiff {
            index,
            name: removed.name.clone(),
            change: ParameterChange::Removed {
                type_name: types.first().type_name(removed.type_id),
            },
            suppressed_by: None,
        });
    }
    for (index, added) in new.parameters.iter().enumerate().skip(old.parameters.len()) {
        parameters.push(ParameterDiff {
            index,
            name: added.name.clone(),
            change: ParameterChange::Added {
                type_name: types.second().type_name(added.type_id),
            },
            suppressed_by: None,
        });
    }

    let mut diff = FunctionDiff {
        pretty_name: corpus.types().signature(&old.name, old.return_type, &old.parameter_types()),
        id: key.to_string(),
        location: old.location.clone(),
        return_type,
        parameters,
        symbol_changes: symbol_changes(old_symbol, new_symbol, false),
        suppressed_by: None,
    };
    if !diff.has_changes() {
        return None;
    }

    let description = describe_function(corpus, old, old_symbol);
    apply_function_suppressions(ctx, &description, &mut diff);
    Some(diff)
}

/// Suppressions with parameter specs elide individual parameter changes;
/// the others elide the whole function diff.
fn apply_function_suppressions(ctx: &DiffContext, function: &FunctionDescription<'_>, diff: &mut FunctionDiff)
{
    for suppression in ctx.suppressions().iter().filter_map(Suppression::as_function) {
        let label = suppression.base().label();
        if suppression.parameter_specs().is_empty() {
            if suppression.suppresses_function(ctx, function, ChangeKind::SUBTYPE, true) {
                debug!(label, function = %diff.pretty_name, "function change suppressed");
                diff.suppressed_by = Some(label.to_string());
                return;
            }
            continue;
        }
        if !suppression.suppresses_function(ctx, function, ChangeKind::SUBTYPE, false) {
            continue;
        }
        for parameter in diff.parameters.iter_mut().filter(|parameter| parameter.suppressed_by.is_none()) {
            let Some(type_name) = function.parameter_types.get(parameter.index) else {
                continue;
            };
            if suppression.suppresses_parameter(parameter.index, type_name) {
                debug!(label, function = %diff.pretty_name, index = parameter.index, "parameter change suppressed");
                parameter.suppressed_by = Some(label.to_string());
            }
        }
    }
}

fn describe_variable<'a>(
    corpus: &'a Corpus,
    variable: &'a VariableDecl,
    symbol: Option<&'a ElfSymbol>,
) -> VariableDescription<'a>
{
    VariableDescription {
        name: &variable.name,
        linkage_name: variable.linkage_name.as_deref().unwrap_or_default(),
        symbol,
        type_name: Some(corpus.types().type_name(variable.type_id)),
    }
}

fn variable_pretty_name(corpus: &Corpus, variable: &VariableDecl) -> String
{
    format!("{} {}", corpus.types().type_name(variable.type_id), variable.name)
}

fn variable_entity(
    ctx: &DiffContext,
    corpus: &Corpus,
    key: &str,
    (variable, symbol): (&VariableDecl, Option<&ElfSymbol>),
    kind: ChangeKind,
) -> EntityChange
{
    let description = describe_variable(corpus, variable, symbol);
    EntityChange {
        pretty_name: variable_pretty_name(corpus, variable),
        id: key.to_string(),
        symbol: symbol.cloned(),
        location: variable.location.clone(),
        suppressed_by: variable_suppression(ctx, &description, kind),
    }
}

fn diff_variables(
    ctx: &DiffContext,
    old: &Side<'_>,
    new: &Side<'_>,
    types: &mut TypeComparer<'_, DiffContext>,
    diff: &mut CorpusDiff,
)
{
    for (key, &(variable, symbol)) in &old.variables {
        let Some(&(counterpart, counterpart_symbol)) = new.variables.get(key) else {
            diff.removed_variables.push(variable_entity(
                ctx,
                old.corpus,
                key,
                (variable, symbol),
                ChangeKind::DELETED,
            ));
            continue;
        };

        let mut changed = VariableDiff {
            pretty_name: variable_pretty_name(old.corpus, variable),
            id: key.clone(),
            location: variable.location.clone(),
            type_diff: types.compare(variable.type_id, counterpart.type_id, Reach::Direct),
            symbol_changes: symbol_changes(symbol, counterpart_symbol, true),
            suppressed_by: None,
        };
        if !changed.has_changes() {
            continue;
        }
        let description = describe_variable(old.corpus, variable, symbol);
        changed.suppressed_by = variable_suppression(ctx, &description, ChangeKind::SUBTYPE);
        diff.changed_variables.push(changed);
    }
    for (key, &entry) in &new.variables {
        if !old.variables.contains_key(key) {
            diff.added_variables
                .push(variable_entity(ctx, new.corpus, key, entry, ChangeKind::ADDED));
        }
    }
}

fn symbol_suppression(ctx: &DiffContext, corpus: &Corpus, symbol: &ElfSymbol, kind: ChangeKind) -> Option<String>
{
    if symbol.is_function() {
        let description = FunctionDescription {
            linkage_name: symbol.name(),
            symbol: Some(symbol),
            alias_names: alias_names(corpus, Some(symbol)),
            ..Default::default()
        };
        function_suppression(ctx, &description, kind)
    } else {
        let description = VariableDescription {
            linkage_name: symbol.name(),
            symbol: Some(symbol),
            ..Default::default()
        };
        variable_suppression(ctx, &description, kind)
    }
}

fn diff_unreferenced_symbols(ctx: &DiffContext, old: &Side<'_>, new: &Side<'_>, diff: &mut CorpusDiff)
{
    for (id, symbol) in &old.eligible {
        if old.referenced.contains(id) || new.eligible.contains_key(id) {
            continue;
        }
        let change = SymbolChange {
            symbol: (*symbol).clone(),
            suppressed_by: symbol_suppression(ctx, old.corpus, symbol, ChangeKind::DELETED),
        };
        if symbol.is_function() {
            diff.removed_function_symbols.push(change);
        } else {
            diff.removed_variable_symbols.push(change);
        }
    }
    for (id, symbol) in &new.eligible {
        if new.referenced.contains(id) || old.eligible.contains_key(id) {
            continue;
        }
        let change = SymbolChange {
            symbol: (*symbol).clone(),
            suppressed_by: symbol_suppression(ctx, new.corpus, symbol, ChangeKind::ADDED),
        };
        if symbol.is_function() {
            diff.added_function_symbols.push(change);
        } else {
            diff.added_variable_symbols.push(change);
        }
    }
}

#[cfg(test)]
mod tests
{
    use object::elf::{STT_FUNC, STT_OBJECT};

    use super::*;
    use crate::ir::{DataMember, Parameter, RecordKind, RecordType, TypeGraph};
    use crate::suppression::{FunctionSuppression, ParameterSpec, SuppressionBase, VariableSuppression};
    use crate::symtab::{RawSymbol, Symtab, SymtabFlags};

    fn symtab(functions: &[&str], variables: &[&str]) -> Symtab
    {
        let mut entries = Vec::new();
        for (i, name) in functions.iter().enumerate() {
            entries.push(RawSymbol::new(i + 1, *name, STT_FUNC, 0x1000 + 0x10 * i as u64));
        }
        for (i, name) in variables.iter().enumerate() {
            entries.push(RawSymbol::new(100 + i, *name, STT_OBJECT, 0x8000 + 0x10 * i as u64));
        }
        Symtab::from_entries(entries, SymtabFlags::default(), None)
    }

    fn context(suppressions: Vec<Suppression>) -> DiffContext
    {
        DiffContext::new(suppressions)
    }

    /// `void configure(struct options*, int)` where `struct options` grows a
    /// member in the second corpus.
    fn configure_corpus(path: &str, grown: bool) -> Corpus
    {
        let mut types = TypeGraph::default();
        let void = types.void();
        let int = types.builtin("int", 32);
        let long = types.builtin("long", 64);
        let mut options = RecordType::new(RecordKind::Struct, "options", if grown { 64 } else { 32 })
            .member(DataMember::new("flags", int, 0));
        if grown {
            options = options.member(DataMember::new("extra", int, 32));
        }
        let options = types.record(options);
        let options_ptr = types.pointer_to(options);
        let level = if grown { long } else { int };

        let mut corpus = Corpus::new(path, symtab(&["configure"], &[])).with_types(types);
        corpus.add_function(
            FunctionDecl::new("configure", void)
                .linkage_name("configure")
                .parameter(Parameter::new("opts", options_ptr))
                .parameter(Parameter::new("level", level)),
        );
        corpus
    }

    #[test]
    fn test_symbol_only_removal()
    {
        let first = Corpus::new("libfoo.so.1", symtab(&["foo_open", "foo_close"], &["foo_errno"]));
        let second = Corpus::new("libfoo.so.1", symtab(&["foo_open"], &["foo_errno"]));

        let diff = compute_diff(&first, &second, &context(Vec::new()));
        assert_eq!(diff.removed_function_symbols.len(), 1);
        assert_eq!(diff.removed_function_symbols[0].symbol.name(), "foo_close");
        assert!(diff.added_function_symbols.is_empty());
        assert_eq!(diff.status(), DiffStatus::ABI_CHANGE | DiffStatus::ABI_INCOMPATIBLE_CHANGE);
    }

    #[test]
    fn test_symbol_suppression_hides_removal()
    {
        let first = Corpus::new("libfoo.so.1", symtab(&["foo_open", "foo_close"], &[]));
        let second = Corpus::new("libfoo.so.1", symtab(&["foo_open"], &[]));
        let suppression = FunctionSuppression::new(SuppressionBase::new("close is gone")).symbol_name("foo_close");

        let diff = compute_diff(&first, &second, &context(vec![suppression.into()]));
        assert_eq!(diff.removed_function_symbols.len(), 1);
        assert_eq!(
            diff.removed_function_symbols[0].suppressed_by.as_deref(),
            Some("close is gone")
        );
        assert!(!diff.has_reportable_changes());
        assert!(diff.has_changes());
        assert_eq!(diff.status(), DiffStatus::OK);
        assert_eq!(diff.stats().removed_function_symbols.reportable(), 0);
    }

    #[test]
    fn test_unreferenced_symbols_can_be_skipped()
    {
        let first = Corpus::new("a", symtab(&["gone"], &[]));
        let second = Corpus::new("b", symtab(&[], &[]));
        let ctx = context(Vec::new()).with_options(DiffOptions {
            show_unreferenced_symbols: false,
            ..Default::default()
        });
        assert!(!compute_diff(&first, &second, &ctx).has_changes());
    }

    #[test]
    fn test_changed_function_parameters()
    {
        let first = configure_corpus("libconf.so.1", false);
        let second = configure_corpus("libconf.so.1", true);

        let diff = compute_diff(&first, &second, &context(Vec::new()));
        assert_eq!(diff.changed_functions.len(), 1);
        let function = &diff.changed_functions[0];
        assert_eq!(function.pretty_name, "void configure(struct options*, int)");
        assert_eq!(function.parameters.len(), 2);
        assert!(function.has_reportable_changes());
        assert!(diff.removed_function_symbols.is_empty());
        assert_eq!(diff.status(), DiffStatus::ABI_CHANGE);
    }

    #[test]
    fn test_parameter_spec_elides_one_parameter()
    {
        let first = configure_corpus("libconf.so.1", false);
        let second = configure_corpus("libconf.so.1", true);
        let suppression = FunctionSuppression::new(SuppressionBase::new("level widened"))
            .name("configure")
            .parameter(ParameterSpec::new(1, "int"));

        let diff = compute_diff(&first, &second, &context(vec![suppression.into()]));
        let function = &diff.changed_functions[0];
        assert!(!function.is_suppressed());
        let suppressed: Vec<_> = function
            .parameters
            .iter()
            .map(|parameter| (parameter.index, parameter.suppressed_by.is_some()))
            .collect();
        assert_eq!(suppressed, [(0, false), (1, true)]);
        assert!(function.has_reportable_changes());
    }

    #[test]
    fn test_whole_function_suppression()
    {
        let first = configure_corpus("libconf.so.1", false);
        let second = configure_corpus("libconf.so.1", true);
        let suppression = FunctionSuppression::new(SuppressionBase::new("configure is internal"))
            .name_regex("^conf")
            .change_kind(ChangeKind::SUBTYPE);

        let diff = compute_diff(&first, &second, &context(vec![suppression.into()]));
        assert!(diff.changed_functions[0].is_suppressed());
        assert_eq!(diff.stats().changed_functions, ChangeCount { total: 1, suppressed: 1 });
        assert_eq!(diff.status(), DiffStatus::OK);
    }

    #[test]
    fn test_soname_scoped_suppression_does_not_apply_elsewhere()
    {
        let first = configure_corpus("libconf.so.1", false).with_soname("libconf.so.1");
        let second = configure_corpus("libconf.so.1", true).with_soname("libconf.so.1");
        let suppression = FunctionSuppression::new(SuppressionBase::new("other lib").soname_regex("^libother"))
            .name("configure");

        let diff = compute_diff(&first, &second, &context(vec![suppression.into()]));
        assert!(!diff.changed_functions[0].is_suppressed());
    }

    #[test]
    fn test_variable_changes()
    {
        let build = |path: &str, size: u64| {
            let mut types = TypeGraph::default();
            let counter = types.builtin("counter_t", size);
            let mut corpus = Corpus::new(path, symtab(&[], &["hits"])).with_types(types);
            corpus.add_variable(VariableDecl::new("hits", counter).linkage_name("hits"));
            corpus
        };
        let first = build("a", 32);
        let second = build("b", 64);

        let diff = compute_diff(&first, &second, &context(Vec::new()));
        assert_eq!(diff.changed_variables.len(), 1);
        assert_eq!(diff.changed_variables[0].pretty_name, "counter_t hits");
        assert!(diff.removed_variable_symbols.is_empty());

        let suppression = VariableSuppression::new(SuppressionBase::new("counters")).type_name("counter_t");
        let diff = compute_diff(&first, &second, &context(vec![suppression.into()]));
        assert!(diff.changed_variables[0].is_filtered_out());
        assert!(!diff.has_reportable_changes());
    }

    #[test]
    fn test_binary_level_changes()
    {
        let first = Corpus::new("a", Symtab::default())
            .with_soname("libx.so.1")
            .with_needed(vec![String::from("libc.so.6"), String::from("libm.so.6")]);
        let second = Corpus::new("b", Symtab::default())
            .with_soname("libx.so.2")
            .with_needed(vec![String::from("libc.so.6"), String::from("libz.so.1")]);

        let diff = compute_diff(&first, &second, &context(Vec::new()));
        assert_eq!(
            diff.soname_change,
            Some((String::from("libx.so.1"), String::from("libx.so.2")))
        );
        assert_eq!(diff.removed_needed, ["libm.so.6"]);
        assert_eq!(diff.added_needed, ["libz.so.1"]);
        assert_eq!(diff.status(), DiffStatus::ABI_CHANGE);
    }
}
