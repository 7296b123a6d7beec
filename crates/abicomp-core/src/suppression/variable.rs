//! Variable suppressions.

use super::{matches_name_criteria, ChangeKind, LazyRegex, SuppressionBase, SuppressionContext};
use crate::symtab::ElfSymbol;

/// What a variable suppression needs to know about a variable.
#[derive(Debug, Clone, Default)]
pub struct VariableDescription<'a>
{
    pub name: &'a str,
    pub linkage_name: &'a str,
    pub symbol: Option<&'a ElfSymbol>,
    pub type_name: Option<String>,
}

/// Suppression of variable changes.
#[derive(Debug, Clone)]
pub struct VariableSuppression
{
    base: SuppressionBase,
    change_kind: ChangeKind,
    name: Option<String>,
    name_regex: LazyRegex,
    name_not_regex: LazyRegex,
    symbol_name: Option<String>,
    symbol_name_regex: LazyRegex,
    symbol_name_not_regex: LazyRegex,
    symbol_version: Option<String>,
    symbol_version_regex: LazyRegex,
    type_name: Option<String>,
    type_name_regex: LazyRegex,
}

impl VariableSuppression
{
    pub fn new(base: SuppressionBase) -> Self
    {
        Self {
            base,
            change_kind: ChangeKind::ALL,
            name: None,
            name_regex: LazyRegex::default(),
            name_not_regex: LazyRegex::default(),
            symbol_name: None,
            symbol_name_regex: LazyRegex::default(),
            symbol_name_not_regex: LazyRegex::default(),
            symbol_version: None,
            symbol_version_regex: LazyRegex::default(),
            type_name: None,
            type_name_regex: LazyRegex::default(),
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

    #[must_use]
    pub fn type_name(mut self, name: impl Into<String>) -> Self
    {
        self.type_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn type_name_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.type_name_regex = pattern.into();
        self
    }

    pub fn base(&self) -> &SuppressionBase
    {
        &self.base
    }

    pub fn matches_name(&self, name: &str) -> bool
    {
        matches_name_criteria(&self.name_regex, &self.name_not_regex, self.name.as_deref(), name)
    }

    pub fn matches_symbol_name(&self, linkage_name: &str) -> bool
    {
        matches_name_criteria(
            &self.symbol_name_regex,
            &self.symbol_name_not_regex,
            self.symbol_name.as_deref(),
            linkage_name,
        )
    }

    /// Without version criteria any version matches.
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

    /// Without type criteria any type matches.
    pub fn matches_type_name(&self, type_name: &str) -> bool
    {
        if let Some(re) = self.type_name_regex.get() {
            return re.is_match(type_name);
        }
        match self.type_name.as_deref() {
            Some(expected) if !expected.is_empty() => expected == type_name,
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

    fn has_type_criteria(&self) -> bool
    {
        self.type_name.as_deref().is_some_and(|name| !name.is_empty()) || self.type_name_regex.is_set()
    }

    /// Whether the suppression constrains anything at all.
    pub fn has_criteria(&self) -> bool
    {
        self.change_kind != ChangeKind::ALL
            || self.has_name_criteria()
            || self.has_symbol_name_criteria()
            || self.has_symbol_version_criteria()
            || self.has_type_criteria()
            || self.base.has_soname_related_property()
            || self.base.has_file_name_related_property()
    }

    /// Whether a change of kind `kind` to `variable` is suppressed.
    pub fn suppresses_variable<C>(&self, ctx: &C, variable: &VariableDescription<'_>, kind: ChangeKind) -> bool
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
            let name = if variable.name.is_empty() {
                variable.linkage_name
            } else {
                variable.name
            };
            if name.is_empty() || !self.matches_name(name) {
                return false;
            }
        }

        if self.has_symbol_name_criteria() {
            let symbol_name = variable.symbol.map_or(variable.linkage_name, ElfSymbol::name);
            if symbol_name.is_empty() || !self.matches_symbol_name(symbol_name) {
                return false;
            }
        }

        if self.has_symbol_version_criteria() {
            match variable.symbol {
                Some(symbol) if self.matches_symbol_version(symbol.version().name()) => {}
                _ => return false,
            }
        }

        if self.has_type_criteria() {
            match variable.type_name.as_deref() {
                Some(type_name) if self.matches_type_name(type_name) => {}
                _ => return false,
            }
        }

        true
    }

    pub(crate) fn regexes(&self) -> Vec<(&'static str, &LazyRegex)>
    {
        let mut regexes = self.base.regexes().to_vec();
        regexes.extend([
            ("name_regexp", &self.name_regex),
            ("name_not_regexp", &self.name_not_regex),
            ("symbol_name_regexp", &self.symbol_name_regex),
            ("symbol_name_not_regexp", &self.symbol_name_not_regex),
            ("symbol_version_regexp", &self.symbol_version_regex),
            ("type_name_regexp", &self.type_name_regex),
        ]);
        regexes
    }
}

impl Default for VariableSuppression
{
    fn default() -> Self
    {
        Self::new(SuppressionBase::default())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::suppression::tests::TestContext;

    fn describe<'a>(name: &'a str, type_name: &str) -> VariableDescription<'a>
    {
        VariableDescription {
            name,
            linkage_name: name,
            symbol: None,
            type_name: Some(type_name.to_string()),
        }
    }

    #[test]
    fn test_type_name_criteria()
    {
        let ctx = TestContext::new(Vec::new());
        let suppression = VariableSuppression::default().type_name_regex("^struct stats");
        assert!(suppression.suppresses_variable(&ctx, &describe("g_stats", "struct stats_v2"), ChangeKind::ALL));
        assert!(!suppression.suppresses_variable(&ctx, &describe("g_count", "int"), ChangeKind::ALL));

        let mut unknown_type = describe("g_stats", "");
        unknown_type.type_name = None;
        assert!(!suppression.suppresses_variable(&ctx, &unknown_type, ChangeKind::ALL));
    }

    #[test]
    fn test_name_not_regex()
    {
        let ctx = TestContext::new(Vec::new());
        let suppression = VariableSuppression::default()
            .name_not_regex("^public_")
            .change_kind(ChangeKind::ADDED);
        assert!(suppression.suppresses_variable(&ctx, &describe("cache_slot", "int"), ChangeKind::ADDED));
        assert!(!suppression.suppresses_variable(&ctx, &describe("public_flag", "int"), ChangeKind::ADDED));
        assert!(!suppression.suppresses_variable(&ctx, &describe("cache_slot", "int"), ChangeKind::DELETED));
    }

    #[test]
    fn test_empty_suppression_matches_nothing()
    {
        let ctx = TestContext::new(Vec::new());
        assert!(!VariableSuppression::default().suppresses_variable(&ctx, &describe("x", "int"), ChangeKind::ALL));
    }

    #[test]
    fn test_malformed_regex_fails_open()
    {
        let ctx = TestContext::new(Vec::new());
        let suppression = VariableSuppression::default().name_regex("g_[");
        assert!(!suppression.suppresses_variable(&ctx, &describe("g_x", "int"), ChangeKind::ALL));
    }
}
