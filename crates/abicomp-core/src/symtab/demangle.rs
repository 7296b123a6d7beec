//! Symbol demangling utilities.
//!
//! Linkage names are kept raw for matching and identity; the demangled form
//! is only used for presentation in reports.
//!
//! - **Rust**: legacy (`_ZN...17h<hash>E`) and v0 (`_R...`) manglings, demangled with `rustc_demangle`
//! - **C++**: Itanium ABI mangling (`_Z...`), detected but left raw
//! - **C**: everything else

use rustc_demangle::try_demangle;

use crate::types::{SymbolLanguage, SymbolName};

/// Create a `SymbolName` from a raw linkage name.
pub(crate) fn make_symbol_name(raw: String) -> SymbolName
{
    let demangled = try_demangle(&raw).ok().map(|d| format!("{d:#}"));
    let language = if raw.starts_with("_R") || (raw.starts_with("_ZN") && demangled.is_some()) {
        SymbolLanguage::Rust
    } else if raw.starts_with("_Z") {
        SymbolLanguage::Cpp
    } else {
        SymbolLanguage::C
    };

    SymbolName::new(raw, demangled, language)
}
