//! # Reports
//!
//! Text rendering of a [`CorpusDiff`] and the exit status of a comparison.
//!
//! The layout follows the classic ABI checker reports: a summary block with
//! one line per category, then one section per non-empty category. Entries
//! are tagged `[D]` (deleted), `[A]` (added) or `[C]` (changed).
//!
//! ```text
//! Functions changes summary: 0 Removed, 1 Changed, 0 Added function
//! Variables changes summary: 0 Removed, 0 Changed, 0 Added variable
//!
//! 1 function with some sub-type change:
//!
//!   [C] 'function void configure(struct options*, int)' has some sub-type changes:
//!     parameter 1 of type 'struct options*' has sub-type changes:
//!       in pointed-to type 'struct options':
//!         type size changed from 32 to 64 (in bits)
//! ```

use std::io::{self, Write};

use bitflags::bitflags;

use crate::comparison::{
    ChangeCount, CorpusDiff, DiffOptions, EntityChange, FunctionDiff, ParameterChange, SymbolChange, TypeDiff,
    VariableDiff,
};
use crate::types::SourceLocation;

bitflags! {
    /// Outcome of a comparison, also used as the process exit code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DiffStatus: u8 {
        const OK = 0;
        /// The tool failed
        const ERROR = 1;
        /// The tool was invoked wrongly
        const USAGE_ERROR = 1 << 1;
        /// The ABIs differ
        const ABI_CHANGE = 1 << 2;
        /// The ABIs differ in a way that breaks existing users
        const ABI_INCOMPATIBLE_CHANGE = 1 << 3;
    }
}

impl DiffStatus
{
    pub fn exit_code(self) -> i32
    {
        i32::from(self.bits())
    }
}

fn plural(count: usize, word: &str) -> String
{
    if count > 1 {
        format!("{count} {word}s")
    } else {
        format!("{count} {word}")
    }
}

fn summary_count(count: ChangeCount, what: &str) -> String
{
    if count.suppressed > 0 {
        format!("{} {what} ({} filtered out)", count.reportable(), count.suppressed)
    } else {
        format!("{} {what}", count.reportable())
    }
}

fn location_suffix(location: Option<&SourceLocation>, options: &DiffOptions) -> String
{
    match location {
        Some(location) if options.show_locations => format!(" at {location}"),
        _ => String::new(),
    }
}

fn suppression_suffix(label: Option<&str>) -> String
{
    match label {
        Some("") => String::from(" [suppressed]"),
        Some(label) => format!(" [suppressed by '{label}']"),
        None => String::new(),
    }
}

/// Write the text report of `diff` to `out`.
///
/// Suppressed changes are only counted, unless `options.show_suppressed` is
/// set, in which case they are listed with the label that suppressed them.
///
/// ## Errors
///
/// Whatever `out` returns.
pub fn write_report<W: Write>(diff: &CorpusDiff, options: &DiffOptions, out: &mut W) -> io::Result<()>
{
    if let Some((old, new)) = &diff.soname_change {
        writeln!(out, "ELF SONAME changed from '{old}' to '{new}'")?;
    }
    if let Some((old, new)) = &diff.architecture_change {
        writeln!(out, "architecture changed from '{old}' to '{new}'")?;
    }
    for needed in &diff.removed_needed {
        writeln!(out, "needed library '{needed}' removed")?;
    }
    for needed in &diff.added_needed {
        writeln!(out, "needed library '{needed}' added")?;
    }
    if diff.soname_change.is_some()
        || diff.architecture_change.is_some()
        || !diff.removed_needed.is_empty()
        || !diff.added_needed.is_empty()
    {
        writeln!(out)?;
    }

    write_summary(diff, options, out)?;

    write_entities(out, options, &diff.removed_functions, "Removed function", "D", "function")?;
    write_entities(out, options, &diff.added_functions, "Added function", "A", "function")?;
    write_changed_functions(out, options, &diff.changed_functions)?;
    write_entities(out, options, &diff.removed_variables, "Removed variable", "D", "variable")?;
    write_entities(out, options, &diff.added_variables, "Added variable", "A", "variable")?;
    write_changed_variables(out, options, &diff.changed_variables)?;

    if options.show_unreferenced_symbols {
        write_symbols(out, options, &diff.removed_function_symbols, "Removed function symbol", "D")?;
        write_symbols(out, options, &diff.added_function_symbols, "Added function symbol", "A")?;
        write_symbols(out, options, &diff.removed_variable_symbols, "Removed variable symbol", "D")?;
        write_symbols(out, options, &diff.added_variable_symbols, "Added variable symbol", "A")?;
    }
    Ok(())
}

fn write_summary<W: Write>(diff: &CorpusDiff, options: &DiffOptions, out: &mut W) -> io::Result<()>
{
    let stats = diff.stats();
    writeln!(
        out,
        "Functions changes summary: {}, {}, {}",
        summary_count(stats.removed_functions, "Removed"),
        summary_count(stats.changed_functions, "Changed"),
        plural(stats.added_functions.reportable(), "Added function")
            + &added_filtered(stats.added_functions)
    )?;
    writeln!(
        out,
        "Variables changes summary: {}, {}, {}",
        summary_count(stats.removed_variables, "Removed"),
        summary_count(stats.changed_variables, "Changed"),
        plural(stats.added_variables.reportable(), "Added variable") + &added_filtered(stats.added_variables)
    )?;
    if options.show_unreferenced_symbols {
        writeln!(
            out,
            "Function symbols changes summary: {}, {} not referenced by debug info",
            summary_count(stats.removed_function_symbols, "Removed"),
            plural(stats.added_function_symbols.reportable(), "Added function symbol")
                + &added_filtered(stats.added_function_symbols)
        )?;
        writeln!(
            out,
            "Variable symbols changes summary: {}, {} not referenced by debug info",
            summary_count(stats.removed_variable_symbols, "Removed"),
            plural(stats.added_variable_symbols.reportable(), "Added variable symbol")
                + &added_filtered(stats.added_variable_symbols)
        )?;
    }
    writeln!(out)
}

fn added_filtered(count: ChangeCount) -> String
{
    if count.suppressed > 0 {
        format!(" ({} filtered out)", count.suppressed)
    } else {
        String::new()
    }
}

fn write_entities<W: Write>(
    out: &mut W,
    options: &DiffOptions,
    entities: &[EntityChange],
    heading: &str,
    tag: &str,
    what: &str,
) -> io::Result<()>
{
    let shown: Vec<_> = entities
        .iter()
        .filter(|entity| options.show_suppressed || !entity.is_suppressed())
        .collect();
    if shown.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}:\n", plural(shown.len(), heading))?;
    for entity in shown {
        let symbol = entity
            .symbol
            .as_ref()
            .map(|symbol| format!("    {{{}}}", symbol.id_string()))
            .unwrap_or_default();
        writeln!(
            out,
            "  [{tag}] '{what} {}'{symbol}{}{}",
            entity.pretty_name,
            location_suffix(entity.location.as_ref(), options),
            suppression_suffix(entity.suppressed_by.as_deref())
        )?;
    }
    writeln!(out)
}

fn write_changed_functions<W: Write>(out: &mut W, options: &DiffOptions, functions: &[FunctionDiff]) -> io::Result<()>
{
    let shown: Vec<_> = functions
        .iter()
        .filter(|function| function.has_reportable_changes() || (options.show_suppressed && function.has_changes()))
        .collect();
    if shown.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}:\n", plural(shown.len(), "function with some sub-type change"))?;
    for function in shown {
        writeln!(
            out,
            "  [C] 'function {}'{} has some sub-type changes:{}",
            function.pretty_name,
            location_suffix(function.location.as_ref(), options),
            suppression_suffix(function.suppressed_by.as_deref())
        )?;
        if function.is_suppressed() {
            continue;
        }
        for change in &function.symbol_changes {
            writeln!(out, "    {change}")?;
        }
        if let Some(diff) = &function.return_type {
            write_type_change(out, options, diff, "return type changed", 4)?;
        }
        for parameter in &function.parameters {
            if !parameter.has_reportable_changes() && !options.show_suppressed {
                continue;
            }
            let suffix = suppression_suffix(parameter.suppressed_by.as_deref());
            let position = parameter.index + 1;
            match &parameter.change {
                ParameterChange::TypeChanged(diff) => {
                    let heading = format!("parameter {position} of type '{}'", diff.first_name);
                    if parameter.suppressed_by.is_some() {
                        writeln!(out, "    {heading} has sub-type changes{suffix}")?;
                    } else {
                        write_type_change(out, options, diff, &heading, 4)?;
                    }
                }
                ParameterChange::Removed { type_name } => {
                    writeln!(out, "    parameter {position} of type '{type_name}' was removed{suffix}")?;
                }
                ParameterChange::Added { type_name } => {
                    writeln!(out, "    parameter {position} of type '{type_name}' was added{suffix}")?;
                }
            }
        }
    }
    writeln!(out)
}

fn write_changed_variables<W: Write>(out: &mut W, options: &DiffOptions, variables: &[VariableDiff]) -> io::Result<()>
{
    let shown: Vec<_> = variables
        .iter()
        .filter(|variable| variable.has_reportable_changes() || (options.show_suppressed && variable.has_changes()))
        .collect();
    if shown.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}:\n", plural(shown.len(), "Changed variable"))?;
    for variable in shown {
        writeln!(
            out,
            "  [C] '{}'{} was changed:{}",
            variable.pretty_name,
            location_suffix(variable.location.as_ref(), options),
            suppression_suffix(variable.suppressed_by.as_deref())
        )?;
        if variable.is_suppressed() {
            continue;
        }
        for change in &variable.symbol_changes {
            writeln!(out, "    {change}")?;
        }
        if let Some(diff) = &variable.type_diff {
            write_type_change(out, options, diff, "type of variable changed", 4)?;
        }
    }
    writeln!(out)
}

/// A heading line for `diff`, then its subtree one level deeper.
fn write_type_change<W: Write>(
    out: &mut W,
    options: &DiffOptions,
    diff: &TypeDiff,
    heading: &str,
    indent: usize,
) -> io::Result<()>
{
    let pad = " ".repeat(indent);
    if diff.is_suppressed() {
        if options.show_suppressed {
            writeln!(out, "{pad}{heading}{}", suppression_suffix(diff.suppressed_by.as_deref()))?;
        }
        return Ok(());
    }
    if !diff.has_reportable_changes() && !options.show_suppressed {
        return Ok(());
    }
    writeln!(out, "{pad}{heading}:")?;
    write_type_diff(out, options, diff, indent + 2)
}

fn write_type_diff<W: Write>(out: &mut W, options: &DiffOptions, diff: &TypeDiff, indent: usize) -> io::Result<()>
{
    let pad = " ".repeat(indent);
    if diff.first_name != diff.second_name && diff.changes.is_empty() {
        writeln!(out, "{pad}type changed from '{}' to '{}'", diff.first_name, diff.second_name)?;
    }
    for change in &diff.changes {
        writeln!(out, "{pad}{change}")?;
    }
    for child in &diff.children {
        let heading = format!(
            "in {} '{}'{}",
            child.role,
            child.diff.first_name,
            location_suffix(child.diff.location.as_ref(), options)
        );
        write_type_change(out, options, &child.diff, &heading, indent)?;
    }
    Ok(())
}

fn write_symbols<W: Write>(
    out: &mut W,
    options: &DiffOptions,
    symbols: &[SymbolChange],
    heading: &str,
    tag: &str,
) -> io::Result<()>
{
    let shown: Vec<_> = symbols
        .iter()
        .filter(|change| options.show_suppressed || !change.is_suppressed())
        .collect();
    if shown.is_empty() {
        return Ok(());
    }
    writeln!(out, "{} not referenced by debug info:\n", plural(shown.len(), heading))?;
    for change in shown {
        let symbol = &change.symbol;
        let demangled = symbol
            .symbol_name()
            .demangled()
            .map(|name| format!("{{{name}}}"))
            .unwrap_or_default();
        writeln!(
            out,
            "  [{tag}] {}{demangled}{}",
            symbol.id_string(),
            suppression_suffix(change.suppressed_by.as_deref())
        )?;
    }
    writeln!(out)
}

/// Render the report into a string.
pub fn render_report(diff: &CorpusDiff, options: &DiffOptions) -> String
{
    let mut buffer = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = write_report(diff, options, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}
