//! # Suppressions
//!
//! Declarative rules that hide ABI changes from a comparison report, and
//! optionally drop the matching artifacts before the comparison even starts.
//!
//! There are three kinds of suppression, all sharing a [`SuppressionBase`]:
//!
//! - [`FunctionSuppression`]: added, removed or changed functions
//! - [`VariableSuppression`]: added, removed or changed variables
//! - [`TypeSuppression`]: changes to types, wherever they are reached from
//!
//! ## Matching policy
//!
//! Every criterion is optional. A criterion that is not given does not
//! constrain anything, but a suppression needs at least one criterion to
//! suppress anything at all: an empty suppression never matches. On the
//! binary axis (file name and SONAME) a suppression without the corresponding
//! properties does not match either, see [`SuppressionBase::matches_soname`].
//!
//! Regular expressions are compiled on first use ([`LazyRegex`]). A pattern
//! that does not compile is treated as absent, which means the change it was
//! meant to hide is reported.
//!
//! ## Contexts
//!
//! The composite tests ([`function_is_suppressed`], [`variable_is_suppressed`],
//! [`type_is_suppressed`], [`is_elf_symbol_suppressed`]) run against a
//! [`SuppressionContext`]: whoever holds the suppressions and knows which
//! binary is being looked at. Both the corpus reader and the diff context
//! implement it.

mod file;
mod function;
mod lazy_regex;
mod type_suppr;
mod variable;

use bitflags::bitflags;
use tracing::trace;

pub use file::{load_suppression_file, parse_suppressions};
pub use function::{FunctionDescription, FunctionSuppression, ParameterSpec};
pub use lazy_regex::LazyRegex;
pub use type_suppr::{
    Boundary, InsertionRange, Reach, ReachKind, TypeChange, TypeKind, TypeSuppression, TypeSuppressionReason,
    PRIVATE_TYPES_SUPPRESSION_LABEL,
};
pub use variable::{VariableDescription, VariableSuppression};

use crate::symtab::SymbolType;
use crate::types::SourceLocation;

bitflags! {
    /// The kinds of change a function or variable suppression applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangeKind: u8
    {
        /// The entity exists on both sides but something it uses changed
        const SUBTYPE = 1;
        /// The entity only exists in the second binary
        const ADDED = 1 << 1;
        /// The entity only exists in the first binary
        const DELETED = 1 << 2;
        const ALL = Self::SUBTYPE.bits() | Self::ADDED.bits() | Self::DELETED.bits();
    }
}

impl Default for ChangeKind
{
    fn default() -> Self
    {
        ChangeKind::ALL
    }
}

/// Properties common to all suppressions.
///
/// ```rust
/// use abicomp_core::suppression::SuppressionBase;
///
/// let base = SuppressionBase::new("libfoo internals").soname_regex("^libfoo\\.so");
/// assert!(base.matches_soname("libfoo.so.2"));
/// assert!(!base.matches_soname("libbar.so.1"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SuppressionBase
{
    label: String,
    is_artificial: bool,
    drops_artifact: bool,
    file_name_regex: LazyRegex,
    file_name_not_regex: LazyRegex,
    soname_regex: LazyRegex,
    soname_not_regex: LazyRegex,
}

impl SuppressionBase
{
    pub fn new(label: impl Into<String>) -> Self
    {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Mark the suppression as generated by the tool rather than written by a user.
    #[must_use]
    pub fn artificial(mut self, value: bool) -> Self
    {
        self.is_artificial = value;
        self
    }

    /// Drop matching artifacts from the IR instead of only hiding their changes.
    #[must_use]
    pub fn drops_artifact(mut self, value: bool) -> Self
    {
        self.drops_artifact = value;
        self
    }

    #[must_use]
    pub fn file_name_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.file_name_regex = pattern.into();
        self
    }

    #[must_use]
    pub fn file_name_not_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.file_name_not_regex = pattern.into();
        self
    }

    #[must_use]
    pub fn soname_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.soname_regex = pattern.into();
        self
    }

    #[must_use]
    pub fn soname_not_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.soname_not_regex = pattern.into();
        self
    }

    pub fn label(&self) -> &str
    {
        &self.label
    }

    pub fn is_artificial(&self) -> bool
    {
        self.is_artificial
    }

    pub fn drops_artifact_from_ir(&self) -> bool
    {
        self.drops_artifact
    }

    pub fn has_soname_related_property(&self) -> bool
    {
        self.soname_regex.is_set() || self.soname_not_regex.is_set()
    }

    pub fn has_file_name_related_property(&self) -> bool
    {
        self.file_name_regex.is_set() || self.file_name_not_regex.is_set()
    }

    /// Whether the SONAME properties match `soname`.
    ///
    /// False when the suppression has no (usable) SONAME property at all.
    pub fn matches_soname(&self, soname: &str) -> bool
    {
        matches_regex_pair(&self.soname_regex, &self.soname_not_regex, soname)
    }

    /// Whether the file name properties match the full path of a binary.
    ///
    /// False when the suppression has no (usable) file name property at all.
    pub fn matches_binary_name(&self, path: &str) -> bool
    {
        matches_regex_pair(&self.file_name_regex, &self.file_name_not_regex, path)
    }

    /// Whether the suppression may apply to artifacts of the given binary.
    ///
    /// Only binary properties that are present can rule a binary out.
    pub fn can_match(&self, soname: &str, path: &str) -> bool
    {
        if self.has_soname_related_property() && !self.matches_soname(soname) {
            return false;
        }
        if self.has_file_name_related_property() && !self.matches_binary_name(path) {
            return false;
        }
        true
    }

    /// Regexes of this base, tagged with their property name.
    pub(crate) fn regexes(&self) -> [(&'static str, &LazyRegex); 4]
    {
        [
            ("file_name_regexp", &self.file_name_regex),
            ("file_name_not_regexp", &self.file_name_not_regex),
            ("soname_regexp", &self.soname_regex),
            ("soname_not_regexp", &self.soname_not_regex),
        ]
    }
}

/// Positive regex must match, negative regex must not, and at least one of
/// them must be usable.
fn matches_regex_pair(regex: &LazyRegex, not_regex: &LazyRegex, text: &str) -> bool
{
    let mut has_regex = false;
    if let Some(re) = regex.get() {
        has_regex = true;
        if !re.is_match(text) {
            return false;
        }
    }
    if let Some(re) = not_regex.get() {
        has_regex = true;
        if re.is_match(text) {
            return false;
        }
    }
    has_regex
}

/// Name matching shared by functions and variables: the regex if there is
/// one, else the negative regex, else the exact name, else no match.
pub(crate) fn matches_name_criteria(
    regex: &LazyRegex,
    not_regex: &LazyRegex,
    exact: Option<&str>,
    name: &str,
) -> bool
{
    if let Some(re) = regex.get() {
        return re.is_match(name);
    }
    if let Some(re) = not_regex.get() {
        return !re.is_match(name);
    }
    exact.is_some_and(|exact| !exact.is_empty() && exact == name)
}

/// A suppression of any kind.
#[derive(Debug, Clone)]
pub enum Suppression
{
    Function(FunctionSuppression),
    Variable(VariableSuppression),
    Type(TypeSuppression),
}

impl Suppression
{
    pub fn base(&self) -> &SuppressionBase
    {
        match self {
            Suppression::Function(s) => s.base(),
            Suppression::Variable(s) => s.base(),
            Suppression::Type(s) => s.base(),
        }
    }

    pub fn label(&self) -> &str
    {
        self.base().label()
    }

    pub fn as_function(&self) -> Option<&FunctionSuppression>
    {
        match self {
            Suppression::Function(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableSuppression>
    {
        match self {
            Suppression::Variable(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeSuppression>
    {
        match self {
            Suppression::Type(s) => Some(s),
            _ => None,
        }
    }
}

impl From<FunctionSuppression> for Suppression
{
    fn from(value: FunctionSuppression) -> Self
    {
        Suppression::Function(value)
    }
}

impl From<VariableSuppression> for Suppression
{
    fn from(value: VariableSuppression) -> Self
    {
        Suppression::Variable(value)
    }
}

impl From<TypeSuppression> for Suppression
{
    fn from(value: TypeSuppression) -> Self
    {
        Suppression::Type(value)
    }
}

/// Something that holds suppressions and knows which binary is being examined.
///
/// The provided methods combine the binary-level check
/// ([`SuppressionBase::can_match`]) with the entity-level matchers.
pub trait SuppressionContext
{
    fn suppressions(&self) -> &[Suppression];

    /// SONAME of the binary under examination (empty if it has none).
    fn soname(&self) -> &str;

    /// Path of the binary under examination.
    fn binary_path(&self) -> &str;

    fn suppression_can_match(&self, base: &SuppressionBase) -> bool
    {
        base.can_match(self.soname(), self.binary_path())
    }

    fn suppression_matches_function_name(&self, suppression: &FunctionSuppression, name: &str) -> bool
    {
        self.suppression_can_match(suppression.base()) && suppression.matches_name(name)
    }

    fn suppression_matches_function_sym_name(&self, suppression: &FunctionSuppression, linkage_name: &str) -> bool
    {
        self.suppression_can_match(suppression.base()) && suppression.matches_symbol_name(linkage_name)
    }

    fn suppression_matches_variable_name(&self, suppression: &VariableSuppression, name: &str) -> bool
    {
        self.suppression_can_match(suppression.base()) && suppression.matches_name(name)
    }

    fn suppression_matches_variable_sym_name(&self, suppression: &VariableSuppression, linkage_name: &str) -> bool
    {
        self.suppression_can_match(suppression.base()) && suppression.matches_symbol_name(linkage_name)
    }

    fn suppression_matches_type_name_or_location(
        &self,
        suppression: &TypeSuppression,
        type_name: &str,
        location: Option<&SourceLocation>,
    ) -> bool
    {
        self.suppression_can_match(suppression.base())
            && suppression.has_criteria()
            && suppression.matches_type_name_or_location(type_name, location)
    }
}

/// Whether a function with that name or linkage name is suppressed.
///
/// With `require_drop`, only suppressions that drop artifacts from the IR
/// are considered.
pub fn function_is_suppressed<C>(ctx: &C, name: &str, linkage_name: &str, require_drop: bool) -> bool
where
    C: SuppressionContext + ?Sized,
{
    for suppression in ctx.suppressions().iter().filter_map(Suppression::as_function) {
        if require_drop && !suppression.base().drops_artifact_from_ir() {
            continue;
        }
        if !name.is_empty() && ctx.suppression_matches_function_name(suppression, name) {
            trace!(label = suppression.base().label(), name, "function suppressed by name");
            return true;
        }
        if !linkage_name.is_empty() && ctx.suppression_matches_function_sym_name(suppression, linkage_name) {
            trace!(label = suppression.base().label(), linkage_name, "function suppressed by symbol");
            return true;
        }
    }
    false
}

/// Whether a variable with that name or linkage name is suppressed.
pub fn variable_is_suppressed<C>(ctx: &C, name: &str, linkage_name: &str, require_drop: bool) -> bool
where
    C: SuppressionContext + ?Sized,
{
    for suppression in ctx.suppressions().iter().filter_map(Suppression::as_variable) {
        if require_drop && !suppression.base().drops_artifact_from_ir() {
            continue;
        }
        if !name.is_empty() && ctx.suppression_matches_variable_name(suppression, name) {
            trace!(label = suppression.base().label(), name, "variable suppressed by name");
            return true;
        }
        if !linkage_name.is_empty() && ctx.suppression_matches_variable_sym_name(suppression, linkage_name) {
            trace!(label = suppression.base().label(), linkage_name, "variable suppressed by symbol");
            return true;
        }
    }
    false
}

/// Whether a type is suppressed, and why.
///
/// Returns [`TypeSuppressionReason::Private`] when the matching suppression
/// is the one generated for types that are not declared in public headers.
pub fn type_is_suppressed<C>(
    ctx: &C,
    type_name: &str,
    location: Option<&SourceLocation>,
    require_drop: bool,
) -> Option<TypeSuppressionReason>
where
    C: SuppressionContext + ?Sized,
{
    for suppression in ctx.suppressions().iter().filter_map(Suppression::as_type) {
        if require_drop && !suppression.base().drops_artifact_from_ir() {
            continue;
        }
        if ctx.suppression_matches_type_name_or_location(suppression, type_name, location) {
            return Some(if suppression.is_private_types_suppression() {
                TypeSuppressionReason::Private
            } else {
                TypeSuppressionReason::Filtered
            });
        }
    }
    None
}

/// Whether an ELF symbol is suppressed, judging by its name alone.
///
/// Function symbols are checked against function suppressions, variable
/// symbols against variable suppressions. Anything else is never suppressed.
pub fn is_elf_symbol_suppressed<C>(ctx: &C, name: &str, symbol_type: SymbolType) -> bool
where
    C: SuppressionContext + ?Sized,
{
    if symbol_type.is_function() {
        function_is_suppressed(ctx, "", name, false)
    } else if symbol_type.is_variable() {
        variable_is_suppressed(ctx, "", name, false)
    } else {
        false
    }
}

#[cfg(test)]
pub(crate) mod tests
{
    use super::*;

    /// Minimal context over a list of suppressions.
    pub(crate) struct TestContext
    {
        pub suppressions: Vec<Suppression>,
        pub soname: String,
        pub path: String,
    }

    impl TestContext
    {
        pub fn new(suppressions: Vec<Suppression>) -> Self
        {
            Self {
                suppressions,
                soname: "libtest.so.1".to_string(),
                path: "/usr/lib/libtest.so.1".to_string(),
            }
        }
    }

    impl SuppressionContext for TestContext
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

    #[test]
    fn test_empty_soname_properties_never_match()
    {
        let base = SuppressionBase::new("empty");
        assert!(!base.matches_soname(""));
        assert!(!base.matches_soname("libc.so.6"));
        assert!(!base.matches_binary_name("/lib/libc.so.6"));
        // without binary properties nothing rules a binary out
        assert!(base.can_match("libc.so.6", "/lib/libc.so.6"));
    }

    #[test]
    fn test_soname_regex_pair()
    {
        let base = SuppressionBase::new("pair")
            .soname_regex("^lib")
            .soname_not_regex("private");
        assert!(base.matches_soname("libfoo.so"));
        assert!(!base.matches_soname("libprivate.so"));
        assert!(!base.matches_soname("foo.so"));

        let negative_only = SuppressionBase::new("negative").soname_not_regex("^libc\\.");
        assert!(negative_only.matches_soname("libm.so.6"));
        assert!(!negative_only.matches_soname("libc.so.6"));
    }

    #[test]
    fn test_can_match_rules_out_other_binaries()
    {
        let base = SuppressionBase::new("only libfoo")
            .soname_regex("^libfoo")
            .file_name_regex("/opt/");
        assert!(base.can_match("libfoo.so.1", "/opt/lib/libfoo.so.1"));
        assert!(!base.can_match("libbar.so.1", "/opt/lib/libbar.so.1"));
        assert!(!base.can_match("libfoo.so.1", "/usr/lib/libfoo.so.1"));
    }

    #[test]
    fn test_malformed_soname_regex_fails_open()
    {
        let base = SuppressionBase::new("broken").soname_regex("lib(");
        assert!(base.has_soname_related_property());
        assert!(!base.matches_soname("libfoo.so"));
        assert!(!base.can_match("libfoo.so", "/lib/libfoo.so"));
    }

    #[test]
    fn test_name_criteria_precedence()
    {
        let regex = LazyRegex::new("^foo");
        let not_regex = LazyRegex::new("bar");
        let none = LazyRegex::default();

        // regex wins over everything else
        assert!(matches_name_criteria(&regex, &not_regex, Some("zzz"), "foobar"));
        assert!(!matches_name_criteria(&none, &not_regex, Some("foobar"), "foobar"));
        assert!(matches_name_criteria(&none, &none, Some("exact"), "exact"));
        assert!(!matches_name_criteria(&none, &none, None, "anything"));
        assert!(!matches_name_criteria(&none, &none, Some(""), ""));
    }

    #[test]
    fn test_function_is_suppressed_by_name_or_symbol()
    {
        let ctx = TestContext::new(vec![
            FunctionSuppression::new(SuppressionBase::new("by name")).name("internal_helper").into(),
            FunctionSuppression::new(SuppressionBase::new("by symbol"))
                .symbol_name_regex("^_Z.*detail")
                .into(),
        ]);

        assert!(function_is_suppressed(&ctx, "internal_helper", "", false));
        assert!(function_is_suppressed(&ctx, "", "_ZN3foo6detail3barEv", false));
        assert!(!function_is_suppressed(&ctx, "public_api", "public_api", false));
        assert!(!function_is_suppressed(&ctx, "", "", false));
    }

    #[test]
    fn test_require_drop_skips_hiding_suppressions()
    {
        let ctx = TestContext::new(vec![
            VariableSuppression::new(SuppressionBase::new("hide")).name("hidden_var").into(),
            VariableSuppression::new(SuppressionBase::new("drop").drops_artifact(true))
                .name("dropped_var")
                .into(),
        ]);

        assert!(variable_is_suppressed(&ctx, "hidden_var", "", false));
        assert!(!variable_is_suppressed(&ctx, "hidden_var", "", true));
        assert!(variable_is_suppressed(&ctx, "dropped_var", "", true));
    }

    #[test]
    fn test_suppression_for_other_binary_does_not_apply()
    {
        let ctx = TestContext::new(vec![FunctionSuppression::new(
            SuppressionBase::new("other lib").soname_regex("^libother"),
        )
        .name("f")
        .into()]);
        assert!(!function_is_suppressed(&ctx, "f", "f", false));
    }

    #[test]
    fn test_type_is_suppressed_reports_private_types()
    {
        let ctx = TestContext::new(vec![
            TypeSuppression::private_types(["include/public.h".to_string()]).into(),
            TypeSuppression::new(SuppressionBase::new("opaque")).name("opaque_t").into(),
        ]);

        let private = SourceLocation::new("src/impl.h", 10);
        let public = SourceLocation::new("/usr/include/public.h", 3);

        assert_eq!(
            type_is_suppressed(&ctx, "struct impl_state", Some(&private), false),
            Some(TypeSuppressionReason::Private)
        );
        assert_eq!(type_is_suppressed(&ctx, "struct api", Some(&public), false), None);
        assert_eq!(
            type_is_suppressed(&ctx, "opaque_t", Some(&public), false),
            Some(TypeSuppressionReason::Filtered)
        );
    }

    #[test]
    fn test_is_elf_symbol_suppressed_dispatches_on_type()
    {
        let ctx = TestContext::new(vec![
            FunctionSuppression::new(SuppressionBase::new("fn")).symbol_name("shared_name").into(),
        ]);
        assert!(is_elf_symbol_suppressed(&ctx, "shared_name", SymbolType::Func));
        assert!(is_elf_symbol_suppressed(&ctx, "shared_name", SymbolType::GnuIfunc));
        assert!(!is_elf_symbol_suppressed(&ctx, "shared_name", SymbolType::Object));
        assert!(!is_elf_symbol_suppressed(&ctx, "shared_name", SymbolType::NoType));
    }

    #[test]
    fn test_change_kind_default_is_all()
    {
        assert_eq!(ChangeKind::default(), ChangeKind::ALL);
        assert!(ChangeKind::ALL.contains(ChangeKind::ADDED | ChangeKind::DELETED));
    }
}
