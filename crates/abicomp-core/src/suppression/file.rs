//! Suppression files.
//!
//! Suppressions are written in TOML, one array of tables per kind. Property
//! names follow the ones users know from `.abignore` files:
//!
//! ```toml
//! [[suppress_function]]
//! label = "internal helpers"
//! soname_regexp = "^libfoo\\.so"
//! name_regexp = "^foo_internal_"
//! change_kind = "deleted-function"
//!
//! [[suppress_function]]
//! name = "foo_log"
//! parameter = [{ index = 0, type_name_regexp = "char\\*$" }]
//!
//! [[suppress_variable]]
//! symbol_name = "foo_debug_level"
//!
//! [[suppress_type]]
//! name = "struct foo_options"
//! accessed_through = "pointer"
//! has_data_member_inserted_at = "end"
//! ```
//!
//! Unlike suppressions built in code, a file is fully validated when it is
//! loaded: unknown properties, bad keywords and regular expressions that do
//! not compile are errors.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use toml::Spanned;
use tracing::{debug, info};

use super::{
    Boundary, ChangeKind, FunctionSuppression, InsertionRange, LazyRegex, ParameterSpec, ReachKind, Suppression,
    SuppressionBase, TypeKind, TypeSuppression, VariableSuppression,
};
use crate::error::SuppressionError;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuppressionFile
{
    #[serde(default)]
    suppress_function: Vec<Spanned<FunctionSpec>>,
    #[serde(default)]
    suppress_variable: Vec<Spanned<VariableSpec>>,
    #[serde(default)]
    suppress_type: Vec<Spanned<TypeSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FunctionSpec
{
    #[serde(default)]
    label: String,
    #[serde(default)]
    drop: bool,
    file_name_regexp: Option<String>,
    file_name_not_regexp: Option<String>,
    soname_regexp: Option<String>,
    soname_not_regexp: Option<String>,
    change_kind: Option<String>,
    name: Option<String>,
    name_regexp: Option<String>,
    name_not_regexp: Option<String>,
    return_type_name: Option<String>,
    return_type_regexp: Option<String>,
    #[serde(default)]
    parameter: Vec<ParameterEntry>,
    symbol_name: Option<String>,
    symbol_name_regexp: Option<String>,
    symbol_name_not_regexp: Option<String>,
    symbol_version: Option<String>,
    symbol_version_regexp: Option<String>,
    allow_other_aliases: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParameterEntry
{
    index: usize,
    type_name: Option<String>,
    type_name_regexp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VariableSpec
{
    #[serde(default)]
    label: String,
    #[serde(default)]
    drop: bool,
    file_name_regexp: Option<String>,
    file_name_not_regexp: Option<String>,
    soname_regexp: Option<String>,
    soname_not_regexp: Option<String>,
    change_kind: Option<String>,
    name: Option<String>,
    name_regexp: Option<String>,
    name_not_regexp: Option<String>,
    symbol_name: Option<String>,
    symbol_name_regexp: Option<String>,
    symbol_name_not_regexp: Option<String>,
    symbol_version: Option<String>,
    symbol_version_regexp: Option<String>,
    type_name: Option<String>,
    type_name_regexp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeSpec
{
    #[serde(default)]
    label: String,
    #[serde(default)]
    drop: bool,
    file_name_regexp: Option<String>,
    file_name_not_regexp: Option<String>,
    soname_regexp: Option<String>,
    soname_not_regexp: Option<String>,
    name: Option<String>,
    name_regexp: Option<String>,
    name_not_regexp: Option<String>,
    type_kind: Option<String>,
    accessed_through: Option<String>,
    #[serde(default)]
    source_location_not_in: Vec<String>,
    source_location_not_regexp: Option<String>,
    has_data_member_inserted_at: Option<BoundaryValue>,
    #[serde(default)]
    has_data_member_inserted_between: Vec<[BoundaryValue; 2]>,
    #[serde(default)]
    changed_enumerators: Vec<String>,
}

/// `end` or an offset in bits.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BoundaryValue
{
    Offset(u64),
    Keyword(String),
}

/// Load the suppressions of a TOML file.
///
/// ## Errors
///
/// [`SuppressionError::Read`] if the file cannot be read, any other
/// [`SuppressionError`] if its contents are invalid.
pub fn load_suppression_file(path: impl AsRef<Path>) -> Result<Vec<Suppression>, SuppressionError>
{
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| SuppressionError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let suppressions = parse_suppressions(&text, &path.display().to_string())?;
    info!(path = %path.display(), count = suppressions.len(), "Loaded suppressions");
    Ok(suppressions)
}

/// Parse suppressions from TOML text. `origin` names the input in errors.
///
/// Suppressions come back in the order they are written, whatever their
/// kind; the first one to match a change is the one reported.
pub fn parse_suppressions(text: &str, origin: &str) -> Result<Vec<Suppression>, SuppressionError>
{
    let file: SuppressionFile = toml::from_str(text).map_err(|err| SuppressionError::Parse {
        path: origin.to_string(),
        details: err.to_string(),
    })?;

    let mut positioned = Vec::new();
    for spec in file.suppress_function {
        let start = spec.span().start;
        positioned.push((start, Suppression::Function(spec.into_inner().into_suppression()?)));
    }
    for spec in file.suppress_variable {
        let start = spec.span().start;
        positioned.push((start, Suppression::Variable(spec.into_inner().into_suppression()?)));
    }
    for spec in file.suppress_type {
        let start = spec.span().start;
        positioned.push((start, Suppression::Type(spec.into_inner().into_suppression()?)));
    }
    positioned.sort_by_key(|(start, _)| *start);
    let suppressions: Vec<_> = positioned.into_iter().map(|(_, suppression)| suppression).collect();

    for suppression in &suppressions {
        check_regexes(suppression)?;
    }
    debug!(origin, count = suppressions.len(), "Parsed suppressions");
    Ok(suppressions)
}

fn check_regexes(suppression: &Suppression) -> Result<(), SuppressionError>
{
    let regexes = match suppression {
        Suppression::Function(s) => s.regexes(),
        Suppression::Variable(s) => s.regexes(),
        Suppression::Type(s) => s.regexes(),
    };
    for (property, regex) in regexes {
        regex.check().map_err(|err| SuppressionError::InvalidRegex {
            label: suppression.label().to_string(),
            property,
            details: err.to_string(),
        })?;
    }
    Ok(())
}

/// Properties shared by every `[[suppress_*]]` table.
struct BaseProperties
{
    label: String,
    drop: bool,
    file_name_regexp: Option<String>,
    file_name_not_regexp: Option<String>,
    soname_regexp: Option<String>,
    soname_not_regexp: Option<String>,
}

impl BaseProperties
{
    fn into_base(self) -> SuppressionBase
    {
        let mut base = SuppressionBase::new(self.label).drops_artifact(self.drop);
        if let Some(pattern) = self.file_name_regexp {
            base = base.file_name_regex(pattern);
        }
        if let Some(pattern) = self.file_name_not_regexp {
            base = base.file_name_not_regex(pattern);
        }
        if let Some(pattern) = self.soname_regexp {
            base = base.soname_regex(pattern);
        }
        if let Some(pattern) = self.soname_not_regexp {
            base = base.soname_not_regex(pattern);
        }
        base
    }
}

macro_rules! base_properties {
    ($spec:expr) => {
        BaseProperties {
            label: $spec.label,
            drop: $spec.drop,
            file_name_regexp: $spec.file_name_regexp,
            file_name_not_regexp: $spec.file_name_not_regexp,
            soname_regexp: $spec.soname_regexp,
            soname_not_regexp: $spec.soname_not_regexp,
        }
    };
}

fn parse_change_kind(
    label: &str,
    value: Option<String>,
    added: &str,
    deleted: &str,
    subtype: &str,
) -> Result<ChangeKind, SuppressionError>
{
    let Some(value) = value else {
        return Ok(ChangeKind::ALL);
    };
    match value.as_str() {
        "all" => Ok(ChangeKind::ALL),
        v if v == added => Ok(ChangeKind::ADDED),
        v if v == deleted => Ok(ChangeKind::DELETED),
        v if v == subtype => Ok(ChangeKind::SUBTYPE),
        _ => Err(SuppressionError::InvalidValue {
            label: label.to_string(),
            property: "change_kind",
            value,
        }),
    }
}

impl FunctionSpec
{
    fn into_suppression(self) -> Result<FunctionSuppression, SuppressionError>
    {
        let label = self.label.clone();
        let kind = parse_change_kind(
            &label,
            self.change_kind,
            "added-function",
            "deleted-function",
            "function-subtype-change",
        )?;

        let mut suppression = FunctionSuppression::new(base_properties!(self).into_base()).change_kind(kind);
        if let Some(name) = self.name {
            suppression = suppression.name(name);
        }
        if let Some(pattern) = self.name_regexp {
            suppression = suppression.name_regex(pattern);
        }
        if let Some(pattern) = self.name_not_regexp {
            suppression = suppression.name_not_regex(pattern);
        }
        if let Some(name) = self.return_type_name {
            suppression = suppression.return_type_name(name);
        }
        if let Some(pattern) = self.return_type_regexp {
            suppression = suppression.return_type_regex(pattern);
        }
        for entry in self.parameter {
            let spec = match (entry.type_name, entry.type_name_regexp) {
                (_, Some(pattern)) => ParameterSpec::with_regex(entry.index, LazyRegex::new(pattern)),
                (Some(type_name), None) => ParameterSpec::new(entry.index, type_name),
                (None, None) => {
                    return Err(SuppressionError::InvalidValue {
                        label,
                        property: "parameter",
                        value: format!("index {} has no type_name or type_name_regexp", entry.index),
                    });
                }
            };
            suppression = suppression.parameter(spec);
        }
        if let Some(name) = self.symbol_name {
            suppression = suppression.symbol_name(name);
        }
        if let Some(pattern) = self.symbol_name_regexp {
            suppression = suppression.symbol_name_regex(pattern);
        }
        if let Some(pattern) = self.symbol_name_not_regexp {
            suppression = suppression.symbol_name_not_regex(pattern);
        }
        if let Some(version) = self.symbol_version {
            suppression = suppression.symbol_version(version);
        }
        if let Some(pattern) = self.symbol_version_regexp {
            suppression = suppression.symbol_version_regex(pattern);
        }
        if let Some(allow) = self.allow_other_aliases {
            suppression = suppression.allow_other_aliases(allow);
        }
        Ok(suppression)
    }
}

impl VariableSpec
{
    fn into_suppression(self) -> Result<VariableSuppression, SuppressionError>
    {
        let kind = parse_change_kind(
            &self.label,
            self.change_kind,
            "added-variable",
            "deleted-variable",
            "variable-subtype-change",
        )?;

        let mut suppression = VariableSuppression::new(base_properties!(self).into_base()).change_kind(kind);
        if let Some(name) = self.name {
            suppression = suppression.name(name);
        }
        if let Some(pattern) = self.name_regexp {
            suppression = suppression.name_regex(pattern);
        }
        if let Some(pattern) = self.name_not_regexp {
            suppression = suppression.name_not_regex(pattern);
        }
        if let Some(name) = self.symbol_name {
            suppression = suppression.symbol_name(name);
        }
        if let Some(pattern) = self.symbol_name_regexp {
            suppression = suppression.symbol_name_regex(pattern);
        }
        if let Some(pattern) = self.symbol_name_not_regexp {
            suppression = suppression.symbol_name_not_regex(pattern);
        }
        if let Some(version) = self.symbol_version {
            suppression = suppression.symbol_version(version);
        }
        if let Some(pattern) = self.symbol_version_regexp {
            suppression = suppression.symbol_version_regex(pattern);
        }
        if let Some(name) = self.type_name {
            suppression = suppression.type_name(name);
        }
        if let Some(pattern) = self.type_name_regexp {
            suppression = suppression.type_name_regex(pattern);
        }
        Ok(suppression)
    }
}

impl TypeSpec
{
    fn into_suppression(self) -> Result<TypeSuppression, SuppressionError>
    {
        let label = self.label.clone();
        let mut suppression = TypeSuppression::new(base_properties!(self).into_base());

        if let Some(name) = self.name {
            suppression = suppression.name(name);
        }
        if let Some(pattern) = self.name_regexp {
            suppression = suppression.name_regex(pattern);
        }
        if let Some(pattern) = self.name_not_regexp {
            suppression = suppression.name_not_regex(pattern);
        }
        if let Some(keyword) = self.type_kind {
            let kind = TypeKind::from_keyword(&keyword).ok_or_else(|| SuppressionError::InvalidValue {
                label: label.clone(),
                property: "type_kind",
                value: keyword.clone(),
            })?;
            suppression = suppression.type_kind(kind);
        }
        if let Some(keyword) = self.accessed_through {
            let reach = ReachKind::from_keyword(&keyword).ok_or_else(|| SuppressionError::InvalidValue {
                label: label.clone(),
                property: "accessed_through",
                value: keyword.clone(),
            })?;
            suppression = suppression.reach_kind(reach);
        }
        for file in self.source_location_not_in {
            suppression = suppression.source_location_not_in(file);
        }
        if let Some(pattern) = self.source_location_not_regexp {
            suppression = suppression.source_location_not_regex(pattern);
        }
        if let Some(at) = self.has_data_member_inserted_at {
            let boundary = parse_boundary(&label, "has_data_member_inserted_at", at)?;
            suppression = suppression.insertion_range(InsertionRange::new(boundary, boundary));
        }
        for [begin, end] in self.has_data_member_inserted_between {
            let begin = parse_boundary(&label, "has_data_member_inserted_between", begin)?;
            let end = parse_boundary(&label, "has_data_member_inserted_between", end)?;
            suppression = suppression.insertion_range(InsertionRange::new(begin, end));
        }
        for name in self.changed_enumerators {
            suppression = suppression.changed_enumerator(name);
        }
        Ok(suppression)
    }
}

fn parse_boundary(label: &str, property: &'static str, value: BoundaryValue) -> Result<Boundary, SuppressionError>
{
    match value {
        BoundaryValue::Offset(offset) => Ok(Boundary::Offset(offset)),
        BoundaryValue::Keyword(keyword) if keyword == "end" => Ok(Boundary::End),
        BoundaryValue::Keyword(keyword) => Err(SuppressionError::InvalidValue {
            label: label.to_string(),
            property,
            value: keyword,
        }),
    }
}

#[cfg(test)]
mod tests
{
    use std::io::Write;

    use super::*;
    use crate::suppression::{Reach, TypeChange};

    #[test]
    fn test_parse_all_kinds()
    {
        let text = r#"
            [[suppress_function]]
            label = "internal"
            name_regexp = "^internal_"
            change_kind = "deleted-function"

            [[suppress_variable]]
            symbol_name = "debug_level"
            drop = true

            [[suppress_type]]
            name = "struct options"
            accessed_through = "pointer"
            type_kind = "struct"
        "#;
        let suppressions = parse_suppressions(text, "inline").unwrap();
        assert_eq!(suppressions.len(), 3);

        let function = suppressions[0].as_function().unwrap();
        assert_eq!(function.base().label(), "internal");
        assert!(function.matches_name("internal_reset"));

        let variable = suppressions[1].as_variable().unwrap();
        assert!(variable.base().drops_artifact_from_ir());
        assert!(variable.matches_symbol_name("debug_level"));

        assert!(suppressions[2].as_type().is_some());
    }

    #[test]
    fn test_malformed_regex_is_rejected()
    {
        let text = r#"
            [[suppress_function]]
            label = "broken"
            symbol_name_regexp = "foo("
        "#;
        let err = parse_suppressions(text, "inline").unwrap_err();
        assert!(matches!(
            err,
            SuppressionError::InvalidRegex { ref label, property: "symbol_name_regexp", .. } if label == "broken"
        ));
    }

    #[test]
    fn test_unknown_property_is_rejected()
    {
        let text = r#"
            [[suppress_type]]
            nmae = "typo"
        "#;
        assert!(matches!(
            parse_suppressions(text, "inline"),
            Err(SuppressionError::Parse { .. })
        ));
    }

    #[test]
    fn test_bad_keywords_are_rejected()
    {
        let bad_kind = "[[suppress_function]]\nname = \"f\"\nchange_kind = \"renamed-function\"\n";
        assert!(matches!(
            parse_suppressions(bad_kind, "inline"),
            Err(SuppressionError::InvalidValue { property: "change_kind", .. })
        ));

        let bad_reach = "[[suppress_type]]\nname = \"t\"\naccessed_through = \"telepathy\"\n";
        assert!(matches!(
            parse_suppressions(bad_reach, "inline"),
            Err(SuppressionError::InvalidValue { property: "accessed_through", .. })
        ));
    }

    #[test]
    fn test_parameters_and_insertion_ranges()
    {
        let text = r#"
            [[suppress_function]]
            name = "log_message"
            parameter = [{ index = 0, type_name = "const char*" }]

            [[suppress_type]]
            name = "struct s"
            has_data_member_inserted_between = [[64, "end"]]
        "#;
        let suppressions = parse_suppressions(text, "inline").unwrap();

        let function = suppressions[0].as_function().unwrap();
        assert!(function.suppresses_parameter(0, "const char*"));

        let ty = suppressions[1].as_type().unwrap();
        let ctx = crate::suppression::tests::TestContext::new(Vec::new());
        let change = TypeChange {
            name: "struct s",
            reach: Reach::Direct,
            size_in_bits: 64,
            inserted_member_offsets: Some(vec![128]),
            ..Default::default()
        };
        assert!(ty.suppresses_type_change(&ctx, &change));
    }

    #[test]
    fn test_load_from_disk()
    {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[suppress_variable]]\nname_regexp = \"^tmp_\"").unwrap();

        let suppressions = load_suppression_file(file.path()).unwrap();
        assert_eq!(suppressions.len(), 1);

        let missing = load_suppression_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(SuppressionError::Read { .. })));
    }

    #[test]
    fn test_file_order_is_kept_across_kinds()
    {
        let text = r#"
            [[suppress_type]]
            label = "first"
            name = "struct a"

            [[suppress_function]]
            label = "second"
            name = "f"

            [[suppress_variable]]
            label = "third"
            name = "v"

            [[suppress_function]]
            label = "fourth"
            name = "g"
        "#;
        let labels: Vec<_> = parse_suppressions(text, "inline")
            .unwrap()
            .iter()
            .map(|suppression| suppression.label().to_string())
            .collect();
        assert_eq!(labels, ["first", "second", "third", "fourth"]);
    }

    #[test]
    fn test_empty_file()
    {
        assert!(parse_suppressions("", "empty").unwrap().is_empty());
    }
}
