//! Loading real ELF objects and comparing them end to end

use std::io::Write;

use abicomp_core::comparison::{compute_diff, DiffContext};
use abicomp_core::error::SuppressionError;
use abicomp_core::ir::ReadContext;
use abicomp_core::report::{render_report, DiffStatus};
use abicomp_core::suppression::{load_suppression_file, parse_suppressions};
use abicomp_core::symtab::Symtab;
use abicomp_core::types::Architecture;
use object::write::{Object, StandardSection, Symbol, SymbolSection};
use object::{BinaryFormat, Endianness, SymbolFlags, SymbolKind, SymbolScope};

/// A relocatable x86-64 object exporting `functions` and `variables`, plus
/// one hidden helper function.
fn build_object(functions: &[&str], variables: &[&str]) -> Vec<u8>
{
    let mut obj = Object::new(BinaryFormat::Elf, object::Architecture::X86_64, Endianness::Little);
    let text = obj.section_id(StandardSection::Text);
    let data = obj.section_id(StandardSection::Data);

    let add = |obj: &mut Object<'_>, name: &str, kind: SymbolKind, scope: SymbolScope| {
        let (section, size) = if kind == SymbolKind::Text { (text, 16) } else { (data, 8) };
        let offset = obj.append_section_data(section, &vec![0; size], 8);
        obj.add_symbol(Symbol {
            name: name.as_bytes().to_vec(),
            value: offset,
            size: size as u64,
            kind,
            scope,
            weak: false,
            section: SymbolSection::Section(section),
            flags: SymbolFlags::None,
        });
    };
    for name in functions {
        add(&mut obj, name, SymbolKind::Text, SymbolScope::Dynamic);
    }
    for name in variables {
        add(&mut obj, name, SymbolKind::Data, SymbolScope::Dynamic);
    }
    add(&mut obj, "internal_helper", SymbolKind::Text, SymbolScope::Linkage);

    obj.write().unwrap()
}

fn names(tab: &Symtab, functions: bool) -> Vec<String>
{
    let filter = if functions {
        tab.make_filter().functions(true)
    } else {
        tab.make_filter().variables(true)
    };
    tab.filtered(filter).into_iter().map(|sym| sym.name().to_string()).collect()
}

#[test]
fn test_load_relocatable_object()
{
    let data = build_object(&["zeta_close", "alpha_open"], &["counter"]);
    let tab = Symtab::load(&data, None).unwrap();

    assert_eq!(names(&tab, true), ["alpha_open", "zeta_close"]);
    assert_eq!(names(&tab, false), ["counter"]);
    assert_eq!(tab.lookup_symbol("alpha_open").len(), 1);

    // hidden symbols are loaded but not public
    let helper = tab.lookup_symbol("internal_helper");
    assert_eq!(helper.len(), 1);
    assert!(!tab.symbol(helper[0]).is_public());
}

#[test]
fn test_read_corpus_from_disk()
{
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&build_object(&["api_open"], &[])).unwrap();

    let corpus = ReadContext::new(file.path().to_string_lossy()).read_corpus().unwrap();
    assert_eq!(corpus.architecture(), Some(Architecture::X86_64));
    assert_eq!(corpus.soname(), "");
    assert!(corpus.needed().is_empty());
    assert_eq!(corpus.symtab().lookup_symbol("api_open").len(), 1);
}

#[test]
fn test_suppression_decides_reportable_changes()
{
    let old = ReadContext::new("libapi.so.1")
        .read_corpus_from(&build_object(&["api_open", "api_close"], &[]))
        .unwrap();
    let new = ReadContext::new("libapi.so.2")
        .read_corpus_from(&build_object(&["api_open"], &[]))
        .unwrap();

    let diff = compute_diff(&old, &new, &DiffContext::default());
    assert_eq!(diff.stats().removed_function_symbols.reportable(), 1);
    assert_eq!(diff.status(), DiffStatus::ABI_CHANGE | DiffStatus::ABI_INCOMPATIBLE_CHANGE);
    assert!(render_report(&diff, &Default::default()).contains("[D] api_close"));

    let suppressions = parse_suppressions("[[suppress_function]]\nsymbol_name = \"api_close\"\n", "inline").unwrap();
    let diff = compute_diff(&old, &new, &DiffContext::new(suppressions));
    let removed = diff.stats().removed_function_symbols;
    assert_eq!((removed.total, removed.suppressed), (1, 1));
    assert_eq!(diff.status(), DiffStatus::OK);
}

#[test]
fn test_load_time_suppression_hides_symbol()
{
    let suppressions =
        parse_suppressions("[[suppress_function]]\ndrop = true\nsymbol_name_regexp = \"_close$\"\n", "inline").unwrap();
    let old = ReadContext::new("libapi.so.1")
        .with_suppressions(suppressions)
        .read_corpus_from(&build_object(&["api_open", "api_close"], &[]))
        .unwrap();
    let new = ReadContext::new("libapi.so.2")
        .read_corpus_from(&build_object(&["api_open"], &[]))
        .unwrap();

    assert_eq!(names(old.symtab(), true), ["api_open"]);
    // still reachable by name
    assert_eq!(old.symtab().lookup_symbol("api_close").len(), 1);

    let diff = compute_diff(&old, &new, &DiffContext::default());
    assert!(!diff.has_changes());
}

#[test]
fn test_hiding_suppression_leaves_removal_to_the_diff()
{
    let text = "[[suppress_function]]\nlabel = \"retired\"\nsymbol_name = \"api_close\"\n\n\
                [[suppress_function]]\nlabel = \"new only\"\nsymbol_name = \"api_open\"\nchange_kind = \"added-function\"\n";
    let suppressions = parse_suppressions(text, "inline").unwrap();

    let old = ReadContext::new("libapi.so.1")
        .with_suppressions(suppressions.clone())
        .read_corpus_from(&build_object(&["api_open", "api_close"], &[]))
        .unwrap();
    let new = ReadContext::new("libapi.so.2")
        .with_suppressions(suppressions.clone())
        .read_corpus_from(&build_object(&["api_sync"], &[]))
        .unwrap();
    assert_eq!(names(old.symtab(), true), ["api_close", "api_open"]);

    let diff = compute_diff(&old, &new, &DiffContext::new(suppressions));
    let removed: Vec<_> = diff
        .removed_function_symbols
        .iter()
        .map(|change| (change.symbol.name().to_string(), change.suppressed_by.clone()))
        .collect();
    assert_eq!(
        removed,
        [
            ("api_close".to_string(), Some("retired".to_string())),
            ("api_open".to_string(), None),
        ]
    );
    assert!(diff.status().contains(DiffStatus::ABI_INCOMPATIBLE_CHANGE));
}

#[test]
fn test_variable_symbols_compare_separately()
{
    let old = ReadContext::new("a").read_corpus_from(&build_object(&["f"], &["v1"])).unwrap();
    let new = ReadContext::new("b").read_corpus_from(&build_object(&["f"], &["v2"])).unwrap();

    let diff = compute_diff(&old, &new, &DiffContext::default());
    assert_eq!(diff.removed_variable_symbols.len(), 1);
    assert_eq!(diff.added_variable_symbols.len(), 1);
    assert!(diff.removed_function_symbols.is_empty());
}

#[test]
fn test_malformed_regex_in_file_is_an_error()
{
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[[suppress_type]]\nlabel = \"bad\"\nname_regexp = \"struct (\"").unwrap();

    let err = load_suppression_file(file.path()).unwrap_err();
    assert!(matches!(err, SuppressionError::InvalidRegex { property: "name_regexp", .. }));
}
