//! Running the abicomp binary against generated objects

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use object::write::{Object, StandardSection, Symbol, SymbolSection};
use object::{BinaryFormat, Endianness, SymbolFlags, SymbolKind, SymbolScope};

fn write_object(dir: &Path, file_name: &str, functions: &[&str]) -> PathBuf
{
    let mut obj = Object::new(BinaryFormat::Elf, object::Architecture::X86_64, Endianness::Little);
    let text = obj.section_id(StandardSection::Text);
    for name in functions {
        let offset = obj.append_section_data(text, &[0xc3; 16], 16);
        obj.add_symbol(Symbol {
            name: name.as_bytes().to_vec(),
            value: offset,
            size: 16,
            kind: SymbolKind::Text,
            scope: SymbolScope::Dynamic,
            weak: false,
            section: SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }
    let path = dir.join(file_name);
    std::fs::write(&path, obj.write().unwrap()).unwrap();
    path
}

fn abicomp(args: &[&str]) -> Output
{
    Command::new(env!("CARGO_BIN_EXE_abicomp"))
        .args(args)
        // keep a per-user default file out of the way
        .env("ABICOMP_DEFAULT_SUPPRESSIONS", "")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn arg(path: &Path) -> &str
{
    path.to_str().unwrap()
}

#[test]
fn test_diff_reports_removed_symbol()
{
    let dir = tempfile::tempdir().unwrap();
    let old = write_object(dir.path(), "old.o", &["api_open", "api_close"]);
    let new = write_object(dir.path(), "new.o", &["api_open"]);

    let output = abicomp(&["diff", arg(&old), arg(&new)]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(12), "{stdout}");
    assert!(stdout.contains("[D] api_close"));
}

#[test]
fn test_diff_with_suppression_file()
{
    let dir = tempfile::tempdir().unwrap();
    let old = write_object(dir.path(), "old.o", &["api_open", "api_close"]);
    let new = write_object(dir.path(), "new.o", &["api_open"]);
    let suppressions = dir.path().join("known.toml");
    std::fs::write(
        &suppressions,
        "[[suppress_function]]\nlabel = \"retired\"\nsymbol_name = \"api_close\"\n",
    )
    .unwrap();

    let output = abicomp(&["diff", arg(&old), arg(&new), "--suppressions", arg(&suppressions)]);
    assert_eq!(output.status.code(), Some(0));

    let output = abicomp(&[
        "diff",
        arg(&old),
        arg(&new),
        "-s",
        arg(&suppressions),
        "--show-suppressed",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[suppressed by 'retired']"));
}

#[test]
fn test_bad_suppression_file_is_an_error()
{
    let dir = tempfile::tempdir().unwrap();
    let old = write_object(dir.path(), "old.o", &["f"]);
    let suppressions = dir.path().join("bad.toml");
    std::fs::write(&suppressions, "[[suppress_function]]\nname_regexp = \"(\"\n").unwrap();

    let output = abicomp(&["diff", arg(&old), arg(&old), "-s", arg(&suppressions)]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_symbols_lists_exported_functions()
{
    let dir = tempfile::tempdir().unwrap();
    let binary = write_object(dir.path(), "lib.o", &["beta", "alpha"]);

    let output = abicomp(&["symbols", arg(&binary), "--functions"]);
    assert_eq!(output.status.code(), Some(0));
    let names: Vec<_> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| line.split('\t').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, ["alpha", "beta"]);
}

#[test]
fn test_batch_combines_statuses()
{
    let dir = tempfile::tempdir().unwrap();
    let a1 = write_object(dir.path(), "a1.o", &["f"]);
    let a2 = write_object(dir.path(), "a2.o", &["f"]);
    let b1 = write_object(dir.path(), "b1.o", &["g", "h"]);
    let b2 = write_object(dir.path(), "b2.o", &["g"]);

    let same = format!("{}:{}", arg(&a1), arg(&a2));
    let changed = format!("{}:{}", arg(&b1), arg(&b2));
    let output = abicomp(&["batch", &same, &changed]);
    assert_eq!(output.status.code(), Some(12));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.find("a1.o vs").unwrap();
    let second = stdout.find("b1.o vs").unwrap();
    assert!(first < second);
}

#[test]
fn test_batch_rejects_malformed_pair()
{
    let output = abicomp(&["batch", "no-colon-here"]);
    assert_eq!(output.status.code(), Some(2));
}
