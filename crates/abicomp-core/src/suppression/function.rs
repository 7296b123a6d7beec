//! Function suppressions.

use super::{matches_name_criteria, ChangeKind, LazyRegex, SuppressionBase, SuppressionContext};
use crate::symtab::ElfSymbol;

/// Criterion on one parameter of a function, by position and type name.
///
/// Indexes start at 0 for the first declared parameter.
#[derive(Debug, Clone, Default)]
pub struct ParameterSpec
{
    index: usize,
    type_name: Option<String>,
    type_name_regex: LazyRegex,
}

impl ParameterSpec
{
    /// Parameter `index` of exactly type `type_name`.
    pub fn new(index: usize, type_name: impl Into<String>) -> Self
    {
        Self {
            index,
            type_name: Some(type_name.into()),
            type_name_regex: LazyRegex::default(),
        }
    }

    /// Parameter `index` whose type name matches `pattern`.
    pub fn with_regex(index: usize, pattern: impl Into<LazyRegex>) -> Self
    {
        Self {
            index,
            type_name: None,
            type_name_regex: pattern.into(),
        }
    }

    pub fn index(&self) -> usize
    {
        self.index
    }

    /// Whether `type_name` satisfies this spec. A spec without a type
    /// criterion matches nothing.
    pub fn matches_type(&self, type_name: &str) -> bool
    {
        if let Some(re) = self.type_name_regex.get() {
            return re.is_match(type_name);
        }
        self.type_name
            .as_deref()
            .is_some_and(|expected| !expected.is_empty() && expected == type_name)
    }

    pub(crate) fn type_name_regex(&self) -> &LazyRegex
    {
        &self.type_name_regex
    }
}

/// What a function suppression needs to know about a function.
///
/// For a function known only from its ELF symbol, `name` is empty and
/// `linkage_name` is the symbol name.
#[derive(Debug, Clone, Default)]
pub struct FunctionDescription<'a>
{
    pub name: &'a str,
    pub linkage_name: &'a str,
    pub symbol: Option<&'a ElfSymbol>,
    /// Names of the other symbols at the same address
    pub alias_names: Vec<&'a str>,
    pub return_type: Option<String>,
    pub parameter_types: Vec<String>,
}

/// Suppression of function changes.
///
/// ```rust
/// use abicomp_core::suppression::{ChangeKind, FunctionSuppression, SuppressionBase};
///
/// let suppression = FunctionSuppression::new(SuppressionBase::new("experimental API"))
///     .name_regex("^experimental_")
///     .change_kind(ChangeKind::ADDED);
/// assert!(suppression.matches_name("experimental_feature"));
/// ```
#[derive(Debug, Clone)]
pub struct FunctionSuppression
{
    base: SuppressionBase,
    change_kind: ChangeKind,
    name: Option<String>,
    name_regex: LazyRegex,
    name_not_regex: LazyRegex,
    return_type_name: Option<String>,
    return_type_regex: LazyRegex,
    parameter_specs: Vec<ParameterSpec>,
    symbol_name: Option<String>,
    symbol_name_regex: LazyRegex,
    symbol_name_not_regex: LazyRegex,
    symbol_version: Option<String>,
    symbol_version_regex: LazyRegex,
    allow_other_aliases: bool,
}

impl FunctionSuppression
{
    pub fn new(base: SuppressionBase) -> Self
    {
        Self {
            base,
            change_kind: ChangeKind::ALL,
            name: None,
            name_regex: LazyRegex::default(),
            name_not_regex: LazyRegex::default(),
            return_type_name: None,
            return_type_regex: LazyRegex::default(),
            parameter_specs: Vec::new(),
            symbol_name: None,
            symbol_name_regex: LazyRegex::default(),
            symbol_name_not_regex: LazyRegex::default(),
            symbol_version: None,
            symbol_version_regex: LazyRegex::default(),
            allow_other_aliases: true,
        }
    }

    #[must_use]
    pub fn change_kind(mut self, kind: ChangeKind) -> Self
    {
        self.change_kind = kind;
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self
    {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn name_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.name_regex = pattern.into();
        self
    }

    #[must_use]
    pub fn name_not_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.name_not_regex = pattern.into();
        self
    }

    #[must_use]
    pub fn return_type_name(mut self, name: impl Into<String>) -> Self
    {
        self.return_type_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn return_type_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.return_type_regex = pattern.into();
        self
    }

    #[must_use]
    pub fn parameter(mut self, spec: ParameterSpec) -> Self
    {
        self.parameter_specs.push(spec);
        self
    }

    #[must_use]
    pub fn symbol_name(mut self, name: impl Into<String>) -> Self
    {
        self.symbol_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn symbol_name_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.symbol_name_regex = pattern.into();
        self
    }

    #[must_use]
    pub fn symbol_name_not_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.symbol_name_not_regex = pattern.into();
        self
    }

    #[must_use]
    pub fn symbol_version(mut self, version: impl Into<String>) -> Self
    {
        self.symbol_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn symbol_version_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.symbol_version_regex = pattern.into();
        self
    }

    /// When false, a function is only suppressed if all its aliases match
    /// the symbol name criteria too.
    #[must_use]
    pub fn allow_other_aliases(mut self, value: bool) -> Self
    {
        self.allow_other_aliases = value;
        self
    }

    pub fn base(&self) -> &SuppressionBase
    {
        &self.base
    }

    pub fn parameter_specs(&self) -> &[ParameterSpec]
    {
        &self.parameter_specs
    }

    /// Match `name` against the name criteria.
    pub fn matches_name(&self, name: &str) -> bool
    {
        matches_name_criteria(&self.name_regex, &self.name_not_regex, self.name.as_deref(), name)
    }

    /// Match a linkage name against the symbol name criteria.
    pub fn matches_symbol_name(&self, linkage_name: &str) -> bool
    {
        matches_name_criteria(
            &self.symbol_name_regex,
            &self.symbol_name_not_regex,
            self.symbol_name.as_deref(),
            linkage_name,
        )
    }

    /// Match a symbol version. Without version criteria any version matches.
    pub fn matches_symbol_version(&self, version: &str) -> bool
    {
        if let Some(re) = self.symbol_version_regex.get() {
            return re.is_match(version);
        }
        match self.symbol_version.as_deref() {
            Some(expected) if !expected.is_empty() => expected == version,
            _ => true,
        }
    }

    fn has_name_criteria(&self) -> bool
    {
        self.name.as_deref().is_some_and(|name| !name.is_empty())
            || self.name_regex.is_set()
            || self.name_not_regex.is_set()
    }

    fn has_symbol_name_criteria(&self) -> bool
    {
        self.symbol_name.as_deref().is_some_and(|name| !name.is_empty())
            || self.symbol_name_regex.is_set()
            || self.symbol_name_not_regex.is_set()
    }

    fn has_symbol_version_criteria(&self) -> bool
    {
        self.symbol_version.as_deref().is_some_and(|version| !version.is_empty()) || self.symbol_version_regex.is_set()
    }

    fn has_return_type_criteria(&self) -> bool
    {
        self.return_type_name.as_deref().is_some_and(|name| !name.is_empty()) || self.return_type_regex.is_set()
    }

    /// Whether the suppression constrains anything at all.
    pub fn has_criteria(&self) -> bool
    {
        self.change_kind != ChangeKind::ALL
            || self.has_name_criteria()
            || self.has_symbol_name_criteria()
            || self.has_symbol_version_criteria()
            || self.has_return_type_criteria()
            || !self.parameter_specs.is_empty()
            || self.base.has_soname_related_property()
            || self.base.has_file_name_related_property()
    }

    /// Whether a change of kind `kind` to `function` is suppressed.
    ///
    /// Every criterion present must be satisfied. Parameter specs are
    /// checked only when `check_parameters` is set; for changed functions
    /// they are applied per parameter instead, see
    /// [`suppresses_parameter`](Self::suppresses_parameter).
    pub fn suppresses_function<C>(
        &self,
        ctx: &C,
        function: &FunctionDescription<'_>,
        kind: ChangeKind,
        check_parameters: bool,
    ) -> bool
    where
        C: SuppressionContext + ?Sized,
    {
        if !self.change_kind.intersects(kind) || !self.has_criteria() {
            return false;
        }
        if !ctx.suppression_can_match(&self.base) {
            return false;
        }

        if self.has_name_criteria() {
            let name = if function.name.is_empty() {
                function.linkage_name
            } else {
                function.name
            };
            if name.is_empty() || !self.matches_name(name) {
                return false;
            }
        }

        if self.has_symbol_name_criteria() {
            let symbol_name = function.symbol.map_or(function.linkage_name, ElfSymbol::name);
            if symbol_name.is_empty() || !self.matches_symbol_name(symbol_name) {
                return false;
            }
            if !self.allow_other_aliases && !function.alias_names.iter().all(|alias| self.matches_symbol_name(alias)) {
                return false;
            }
        }

        if self.has_symbol_version_criteria() {
            let Some(symbol) = function.symbol else {
                return false;
            };
            if !self.matches_symbol_version(symbol.version().name()) {
                return false;
            }
        }

        if self.has_return_type_criteria() {
            let Some(return_type) = function.return_type.as_deref() else {
                return false;
            };
            let matches = match self.return_type_regex.get() {
                Some(re) => re.is_match(return_type),
                None => self.return_type_name.as_deref() == Some(return_type),
            };
            if !matches {
                return false;
            }
        }

        if check_parameters {
            for spec in &self.parameter_specs {
                let Some(type_name) = function.parameter_types.get(spec.index) else {
                    return false;
                };
                if !spec.matches_type(type_name) {
                    return false;
                }
            }
        }

        true
    }

    /// Whether a change of parameter `index`, of type `type_name` in the
    /// first binary, is covered by one of the parameter specs.
    pub fn suppresses_parameter(&self, index: usize, type_name: &str) -> bool
    {
        self.parameter_specs
            .iter()
            .any(|spec| spec.index == index && spec.matches_type(type_name))
    }

    /// Regexes of this suppression, tagged with their property name.
    pub(crate) fn regexes(&self) -> Vec<(&'static str, &LazyRegex)>
    {
        let mut regexes = self.base.regexes().to_vec();
        regexes.extend([
            ("name_regexp", &self.name_regex),
            ("name_not_regexp", &self.name_not_regex),
            ("return_type_regexp", &self.return_type_regex),
            ("symbol_name_regexp", &self.symbol_name_regex),
            ("symbol_name_not_regexp", &self.symbol_name_not_regex),
            ("symbol_version_regexp", &self.symbol_version_regex),
        ]);
        regexes.extend(
            self.parameter_specs
                .iter()
                .map(|spec| ("parameter.type_name_regexp", spec.type_name_regex())),
        );
        regexes
    }
}

impl Default for FunctionSuppression
{
    fn default() -> Self
    {
        Self::new(SuppressionBase::default())
    }
}
