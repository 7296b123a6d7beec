//! Type suppressions.
//!
//! A type suppression applies to a changed type wherever the comparison finds
//! it: as the type of a variable, a parameter, a data member, behind a
//! pointer, and so on. How the type was reached is part of what a suppression
//! can constrain ([`ReachKind`]).

use std::collections::HashSet;
use std::fmt;

use super::{LazyRegex, SuppressionBase, SuppressionContext};
use crate::types::SourceLocation;

/// Label of the suppression generated to hide types that are not declared in
/// public headers.
pub const PRIVATE_TYPES_SUPPRESSION_LABEL: &str = "Artificial private types suppression specification";

/// Why [`type_is_suppressed`](super::type_is_suppressed) suppressed a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSuppressionReason
{
    /// An ordinary suppression matched
    Filtered,
    /// The type is private: not declared in any public header
    Private,
}

/// Kind of type a suppression is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind
{
    Class,
    Struct,
    Union,
    Enum,
    Array,
    Typedef,
    Builtin,
}

impl TypeKind
{
    /// Parse the keyword used in suppression files.
    pub fn from_keyword(keyword: &str) -> Option<Self>
    {
        Some(match keyword {
            "class" => TypeKind::Class,
            "struct" => TypeKind::Struct,
            "union" => TypeKind::Union,
            "enum" => TypeKind::Enum,
            "array" => TypeKind::Array,
            "typedef" => TypeKind::Typedef,
            "builtin" => TypeKind::Builtin,
            _ => return None,
        })
    }
}

impl fmt::Display for TypeKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let keyword = match self {
            TypeKind::Class => "class",
            TypeKind::Struct => "struct",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::Array => "array",
            TypeKind::Typedef => "typedef",
            TypeKind::Builtin => "builtin",
        };
        write!(f, "{keyword}")
    }
}

/// How a changed type was reached from the function or variable that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Reach
{
    /// Without going through a pointer or a reference
    #[default]
    Direct,
    /// Through at least one pointer
    Pointer,
    /// Through a reference, and no pointer
    Reference,
}

/// Which reaches a type suppression applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReachKind
{
    Direct,
    Pointer,
    Reference,
    /// Pointer or reference
    Indirect,
}

impl ReachKind
{
    /// Parse the keyword used in suppression files (`accessed_through`).
    pub fn from_keyword(keyword: &str) -> Option<Self>
    {
        Some(match keyword {
            "direct" => ReachKind::Direct,
            "pointer" => ReachKind::Pointer,
            "reference" => ReachKind::Reference,
            "reference-or-pointer" | "indirect" => ReachKind::Indirect,
            _ => return None,
        })
    }

    pub fn admits(self, reach: Reach) -> bool
    {
        match self {
            ReachKind::Direct => reach == Reach::Direct,
            ReachKind::Pointer => reach == Reach::Pointer,
            ReachKind::Reference => reach == Reach::Reference,
            ReachKind::Indirect => reach != Reach::Direct,
        }
    }
}

/// One end of a data member insertion range, in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary
{
    Offset(u64),
    /// The end of the type, as laid out in the first binary
    End,
}

/// Range of offsets where data members may be inserted without the change
/// being reported. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionRange
{
    pub begin: Boundary,
    pub end: Boundary,
}

impl InsertionRange
{
    pub fn new(begin: Boundary, end: Boundary) -> Self
    {
        Self { begin, end }
    }

    /// Whether `offset` falls in the range for a type of `type_size` bits.
    pub fn contains(&self, offset: u64, type_size: u64) -> bool
    {
        let begin = match self.begin {
            Boundary::Offset(value) => value,
            Boundary::End => type_size,
        };
        let end = match self.end {
            Boundary::Offset(value) => value,
            Boundary::End => u64::MAX,
        };
        begin <= offset && offset <= end
    }
}

/// What a type suppression needs to know about a changed type.
#[derive(Debug, Clone, Default)]
pub struct TypeChange<'a>
{
    /// Name of the type in the first binary
    pub name: &'a str,
    pub kind: Option<TypeKind>,
    pub location: Option<&'a SourceLocation>,
    pub reach: Reach,
    /// Size of the type in the first binary, in bits
    pub size_in_bits: u64,
    /// Offsets (bits) of inserted data members, set only when the change
    /// consists of data member insertions and nothing else
    pub inserted_member_offsets: Option<Vec<u64>>,
    /// Enumerators whose value changed, set only when the change is to an enum
    /// and consists of enumerator additions and value changes
    pub changed_enumerators: Option<Vec<&'a str>>,
}

/// Suppression of type changes.
///
/// ```rust
/// use abicomp_core::suppression::{ReachKind, SuppressionBase, TypeSuppression};
///
/// // Changes to `struct opaque_handle` are fine as long as users only ever
/// // hold a pointer to it.
/// let suppression = TypeSuppression::new(SuppressionBase::new("opaque"))
///     .name("struct opaque_handle")
///     .reach_kind(ReachKind::Pointer);
/// assert!(suppression.matches_type_name("struct opaque_handle"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeSuppression
{
    base: SuppressionBase,
    name: Option<String>,
    name_regex: LazyRegex,
    name_not_regex: LazyRegex,
    type_kind: Option<TypeKind>,
    reach_kind: Option<ReachKind>,
    insertion_ranges: Vec<InsertionRange>,
    source_locations_to_keep: HashSet<String>,
    source_location_to_keep_regex: LazyRegex,
    changed_enumerator_names: Vec<String>,
}

impl TypeSuppression
{
    pub fn new(base: SuppressionBase) -> Self
    {
        Self {
            base,
            ..Default::default()
        }
    }

    /// The suppression that hides every type not declared in one of
    /// `public_headers`.
    ///
    /// Headers are compared by file name, so `include/foo.h` keeps types
    /// declared in `/usr/include/foo.h`.
    pub fn private_types(public_headers: impl IntoIterator<Item = String>) -> Self
    {
        let base = SuppressionBase::new(PRIVATE_TYPES_SUPPRESSION_LABEL)
            .artificial(true)
            .drops_artifact(true);
        let keep = public_headers
            .into_iter()
            .map(|header| SourceLocation::from_file(header).base_name().to_string())
            .collect();
        Self {
            base,
            source_locations_to_keep: keep,
            ..Default::default()
        }
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
    pub fn type_kind(mut self, kind: TypeKind) -> Self
    {
        self.type_kind = Some(kind);
        self
    }

    #[must_use]
    pub fn reach_kind(mut self, kind: ReachKind) -> Self
    {
        self.reach_kind = Some(kind);
        self
    }

    #[must_use]
    pub fn insertion_range(mut self, range: InsertionRange) -> Self
    {
        self.insertion_ranges.push(range);
        self
    }

    /// Keep (do not suppress) types declared in this file, given by path or
    /// by file name.
    #[must_use]
    pub fn source_location_not_in(mut self, file: impl Into<String>) -> Self
    {
        self.source_locations_to_keep.insert(file.into());
        self
    }

    #[must_use]
    pub fn source_location_not_regex(mut self, pattern: impl Into<LazyRegex>) -> Self
    {
        self.source_location_to_keep_regex = pattern.into();
        self
    }

    #[must_use]
    pub fn changed_enumerator(mut self, name: impl Into<String>) -> Self
    {
        self.changed_enumerator_names.push(name.into());
        self
    }

    pub fn base(&self) -> &SuppressionBase
    {
        &self.base
    }

    pub fn is_private_types_suppression(&self) -> bool
    {
        self.base.label() == PRIVATE_TYPES_SUPPRESSION_LABEL
    }

    fn has_name_criteria(&self) -> bool
    {
        self.name.as_deref().is_some_and(|name| !name.is_empty())
            || self.name_regex.is_set()
            || self.name_not_regex.is_set()
    }

    fn has_location_criteria(&self) -> bool
    {
        !self.source_locations_to_keep.is_empty() || self.source_location_to_keep_regex.is_set()
    }

    /// Whether the suppression constrains anything at all.
    pub fn has_criteria(&self) -> bool
    {
        self.has_name_criteria()
            || self.has_location_criteria()
            || self.type_kind.is_some()
            || self.reach_kind.is_some()
            || !self.insertion_ranges.is_empty()
            || !self.changed_enumerator_names.is_empty()
            || self.base.has_soname_related_property()
            || self.base.has_file_name_related_property()
    }

    /// Match `type_name` against the name criteria.
    ///
    /// An exact name takes precedence over the regexes. Without any name
    /// criterion every name matches.
    pub fn matches_type_name(&self, type_name: &str) -> bool
    {
        if let Some(expected) = self.name.as_deref().filter(|name| !name.is_empty()) {
            return expected == type_name;
        }
        if let Some(re) = self.name_regex.get() {
            if !re.is_match(type_name) {
                return false;
            }
        }
        if let Some(re) = self.name_not_regex.get() {
            if re.is_match(type_name) {
                return false;
            }
        }
        true
    }

    /// Match the location a type is declared at against the keep-list.
    ///
    /// A type declared in a kept file is not matched. A type without a
    /// location is not matched when there is a keep-list: nothing proves it
    /// lives outside of it.
    pub fn matches_location(&self, location: Option<&SourceLocation>) -> bool
    {
        let Some(location) = location else {
            return !self.has_location_criteria();
        };
        if let Some(re) = self.source_location_to_keep_regex.get() {
            if re.is_match(&location.file) {
                return false;
            }
        }
        if self.source_locations_to_keep.contains(location.base_name())
            || self.source_locations_to_keep.contains(&location.file)
        {
            return false;
        }
        true
    }

    pub fn matches_type_name_or_location(&self, type_name: &str, location: Option<&SourceLocation>) -> bool
    {
        self.matches_type_name(type_name) && self.matches_location(location)
    }

    /// Whether `change` is suppressed.
    pub fn suppresses_type_change<C>(&self, ctx: &C, change: &TypeChange<'_>) -> bool
    where
        C: SuppressionContext + ?Sized,
    {
        if !self.has_criteria() || !ctx.suppression_can_match(&self.base) {
            return false;
        }
        if let Some(kind) = self.type_kind {
            if change.kind != Some(kind) {
                return false;
            }
        }
        if let Some(reach_kind) = self.reach_kind {
            if !reach_kind.admits(change.reach) {
                return false;
            }
        }
        if !self.matches_type_name_or_location(change.name, change.location) {
            return false;
        }
        if !self.insertion_ranges.is_empty() {
            let Some(offsets) = &change.inserted_member_offsets else {
                return false;
            };
            let all_in_range = offsets.iter().all(|offset| {
                self.insertion_ranges
                    .iter()
                    .any(|range| range.contains(*offset, change.size_in_bits))
            });
            if offsets.is_empty() || !all_in_range {
                return false;
            }
        }
        if !self.changed_enumerator_names.is_empty() {
            let Some(changed) = &change.changed_enumerators else {
                return false;
            };
            if !changed
                .iter()
                .all(|name| self.changed_enumerator_names.iter().any(|kept| kept == name))
            {
                return false;
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
            ("source_location_not_regexp", &self.source_location_to_keep_regex),
        ]);
        regexes
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::suppression::tests::TestContext;

    fn change(name: &str, reach: Reach) -> TypeChange<'_>
    {
        TypeChange {
            name,
            kind: Some(TypeKind::Struct),
            reach,
            size_in_bits: 64,
            ..Default::default()
        }
    }

    #[test]
    fn test_reach_kind_direct_vs_indirect()
    {
        let ctx = TestContext::new(Vec::new());
        let direct = TypeSuppression::default().name("struct s").reach_kind(ReachKind::Direct);
        let indirect = TypeSuppression::default().name("struct s").reach_kind(ReachKind::Indirect);

        let through_pointer = change("struct s", Reach::Pointer);
        assert!(!direct.suppresses_type_change(&ctx, &through_pointer));
        assert!(indirect.suppresses_type_change(&ctx, &through_pointer));

        let by_value = change("struct s", Reach::Direct);
        assert!(direct.suppresses_type_change(&ctx, &by_value));
        assert!(!indirect.suppresses_type_change(&ctx, &by_value));
    }

    #[test]
    fn test_reach_kind_admits()
    {
        assert!(ReachKind::Indirect.admits(Reach::Reference));
        assert!(ReachKind::Pointer.admits(Reach::Pointer));
        assert!(!ReachKind::Pointer.admits(Reach::Reference));
        assert!(!ReachKind::Reference.admits(Reach::Direct));
    }

    #[test]
    fn test_type_kind_restricts()
    {
        let ctx = TestContext::new(Vec::new());
        let only_unions = TypeSuppression::default().name_regex("^union ").type_kind(TypeKind::Union);
        assert!(!only_unions.suppresses_type_change(&ctx, &change("union u", Reach::Direct)));

        let mut union_change = change("union u", Reach::Direct);
        union_change.kind = Some(TypeKind::Union);
        assert!(only_unions.suppresses_type_change(&ctx, &union_change));
    }

    #[test]
    fn test_exact_name_wins_over_regex()
    {
        let suppression = TypeSuppression::default().name("foo_t").name_regex("^bar");
        assert!(suppression.matches_type_name("foo_t"));
        assert!(!suppression.matches_type_name("bar_t"));
    }

    #[test]
    fn test_location_keep_list()
    {
        let suppression = TypeSuppression::default()
            .source_location_not_in("api.h")
            .source_location_not_regex("^/usr/include/");

        assert!(!suppression.matches_location(Some(&SourceLocation::new("/src/include/api.h", 4))));
        assert!(!suppression.matches_location(Some(&SourceLocation::new("/usr/include/stdio.h", 1))));
        assert!(suppression.matches_location(Some(&SourceLocation::new("/src/lib/impl.c", 9))));
        assert!(!suppression.matches_location(None));
        assert!(TypeSuppression::default().name("x").matches_location(None));
    }

    #[test]
    fn test_insertion_ranges()
    {
        let ctx = TestContext::new(Vec::new());
        let at_end = TypeSuppression::default()
            .name("struct s")
            .insertion_range(InsertionRange::new(Boundary::End, Boundary::End));

        let mut appended = change("struct s", Reach::Direct);
        appended.inserted_member_offsets = Some(vec![64, 96]);
        assert!(at_end.suppresses_type_change(&ctx, &appended));

        let mut inserted_in_middle = change("struct s", Reach::Direct);
        inserted_in_middle.inserted_member_offsets = Some(vec![32]);
        assert!(!at_end.suppresses_type_change(&ctx, &inserted_in_middle));

        // members were also removed or changed
        assert!(!at_end.suppresses_type_change(&ctx, &change("struct s", Reach::Direct)));

        let between = InsertionRange::new(Boundary::Offset(32), Boundary::Offset(48));
        assert!(between.contains(32, 64));
        assert!(between.contains(48, 64));
        assert!(!between.contains(49, 64));
    }

    #[test]
    fn test_changed_enumerators()
    {
        let ctx = TestContext::new(Vec::new());
        let suppression = TypeSuppression::default()
            .name("enum color")
            .changed_enumerator("COLOR_COUNT");

        let mut last_moved = change("enum color", Reach::Direct);
        last_moved.changed_enumerators = Some(vec!["COLOR_COUNT"]);
        assert!(suppression.suppresses_type_change(&ctx, &last_moved));

        let mut renumbered = change("enum color", Reach::Direct);
        renumbered.changed_enumerators = Some(vec!["COLOR_RED", "COLOR_COUNT"]);
        assert!(!suppression.suppresses_type_change(&ctx, &renumbered));
    }

    #[test]
    fn test_private_types_suppression()
    {
        let suppression = TypeSuppression::private_types(["include/api.h".to_string()]);
        assert!(suppression.is_private_types_suppression());
        assert!(suppression.base().is_artificial());
        assert!(suppression.base().drops_artifact_from_ir());
        assert!(!suppression.matches_type_name_or_location("struct api", Some(&SourceLocation::new("/x/api.h", 1))));
        assert!(suppression.matches_type_name_or_location("struct impl", Some(&SourceLocation::new("/x/impl.h", 1))));
    }

    #[test]
    fn test_keywords()
    {
        assert_eq!(TypeKind::from_keyword("struct"), Some(TypeKind::Struct));
        assert_eq!(TypeKind::from_keyword("pointer"), None);
        assert_eq!(ReachKind::from_keyword("reference-or-pointer"), Some(ReachKind::Indirect));
        assert_eq!(TypeKind::Typedef.to_string(), "typedef");
    }
}
