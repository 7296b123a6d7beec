//! # Symbol Tables
//!
//! The ELF symbol table of a binary, reduced to the entries that make up its
//! ABI surface (functions and variables), with lookup by name and by address.
//!
//! ## Construction
//!
//! - [`Symtab::load`]: decode `.symtab` from an ELF image
//! - [`Symtab::from_entries`]: build from already decoded [`RawSymbol`]s
//! - [`Symtab::from_maps`]: build from name-to-symbols maps produced elsewhere
//!
//! A symtab never changes once built. Symbols live in an arena and are
//! referred to by [`SymbolId`]; alias groups and common-symbol instances are
//! side tables keyed by id.
//!
//! ## Iteration
//!
//! Symbols are iterated in a stable order (sorted by id string, see
//! [`ElfSymbol::id_string`]) through a [`SymtabFilter`]:
//!
//! ```rust
//! use abicomp_core::symtab::{RawSymbol, Symtab, SymtabFlags};
//! use object::elf::{STT_FUNC, STT_OBJECT};
//!
//! let entries = vec![
//!     RawSymbol::new(1, "open", STT_FUNC, 0x1000),
//!     RawSymbol::new(2, "errno_value", STT_OBJECT, 0x4000),
//! ];
//! let tab = Symtab::from_entries(entries, SymtabFlags::default(), None);
//!
//! let functions = tab.make_filter().functions(true).build();
//! let names: Vec<_> = tab.iter(&functions).map(|sym| sym.name()).collect();
//! assert_eq!(names, ["open"]);
//! ```

mod demangle;
mod elf;
mod filter;
mod symbol;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use object::elf::{STT_FUNC, STT_GNU_IFUNC, STT_OBJECT, STT_TLS};
use smallvec::SmallVec;
use tracing::{debug, error, info};

pub(crate) use elf::read_dynamic_info;
pub use elf::{RawSymbol, SymbolSection, SymtabFlags};
pub use filter::{FilteredSymtab, SymtabFilter, SymtabFilterBuilder, SymtabIter};
pub use symbol::{ElfSymbol, SymbolBinding, SymbolId, SymbolType, SymbolVersion, SymbolVisibility};

use crate::error::SymtabError;
use crate::types::Address;

/// Predicate deciding, at load time, whether a symbol is suppressed.
pub type SymbolPredicate<'a> = &'a dyn Fn(&ElfSymbol) -> bool;

/// Name to symbols map, the input of [`Symtab::from_maps`].
pub type SymbolMap = BTreeMap<String, Vec<ElfSymbol>>;

type SymbolGroup = SmallVec<[SymbolId; 2]>;

const KSYMTAB_PREFIX: &str = "__ksymtab_";

/// Symbol table of one binary.
#[derive(Debug, Default)]
pub struct Symtab
{
    symbols: Vec<ElfSymbol>,
    ordered: Vec<SymbolId>,
    by_name: HashMap<String, Vec<SymbolId>>,
    by_address: HashMap<Address, SymbolId>,
    by_entry_address: HashMap<Address, SymbolId>,
    /// main symbol -> its aliases (main excluded)
    alias_groups: HashMap<SymbolId, SymbolGroup>,
    /// alias -> main symbol
    main_of: HashMap<SymbolId, SymbolId>,
    /// first common symbol of a name -> other instances
    common_groups: HashMap<SymbolId, SymbolGroup>,
    is_kernel_binary: bool,
    is_ppc64_elfv1: bool,
    has_ksymtab_entries: bool,
}

impl Symtab
{
    /// Load the symbol table of an ELF image.
    ///
    /// `is_suppressed` is asked about every kept symbol. Suppressed symbols
    /// stay reachable through the lookup functions but are never iterated.
    ///
    /// ## Errors
    ///
    /// Fails if the image is not ELF, has no `.symtab`, or an entry cannot be
    /// read. Nothing is returned in that case, not even a partial table.
    pub fn load(data: &[u8], is_suppressed: Option<SymbolPredicate<'_>>) -> Result<Self, SymtabError>
    {
        let (entries, flags) = elf::read_symbol_table(data).inspect_err(|err| {
            error!("Failed to load symtab: {err}");
        })?;
        Ok(Self::from_entries(entries, flags, is_suppressed))
    }

    /// Build a symtab from decoded `.symtab` entries.
    ///
    /// ## Panics
    ///
    /// On kernel binaries, if the same `__ksymtab_<name>` marker shows up twice.
    pub fn from_entries(
        entries: impl IntoIterator<Item = RawSymbol>,
        flags: SymtabFlags,
        is_suppressed: Option<SymbolPredicate<'_>>,
    ) -> Self
    {
        let mut tab = Symtab {
            is_kernel_binary: flags.is_kernel_binary,
            is_ppc64_elfv1: flags.is_ppc64_elfv1,
            ..Default::default()
        };
        let mut exported_kernel_symbols = HashSet::new();

        for raw in entries {
            if raw.name.is_empty() {
                continue;
            }

            if tab.is_kernel_binary {
                if let Some(exported) = raw.name.strip_prefix(KSYMTAB_PREFIX) {
                    let newly_seen = exported_kernel_symbols.insert(exported.to_string());
                    assert!(newly_seen, "duplicate ksymtab entry for {exported}");
                    continue;
                }
            }

            let keep = match raw.st_type {
                STT_FUNC | STT_GNU_IFUNC | STT_TLS => true,
                STT_OBJECT => raw.section != SymbolSection::Absolute,
                _ => false,
            };
            if !keep {
                continue;
            }

            let mut symbol = ElfSymbol::new(
                raw.index,
                raw.name,
                raw.size,
                SymbolType::from_st_type(raw.st_type),
                SymbolBinding::from_st_bind(raw.st_bind),
                SymbolVisibility::from_st_visibility(raw.st_visibility),
                raw.version,
                raw.section != SymbolSection::Undefined,
            );
            symbol.is_common = raw.section == SymbolSection::Common;
            let id = tab.push(symbol, is_suppressed);

            let symbol = &tab.symbols[id.0];
            if symbol.is_common {
                tab.link_common_instance(id);
            } else if symbol.is_defined {
                tab.index_address(id, Address::new(raw.value));
                if tab.is_ppc64_elfv1 && tab.symbols[id.0].is_function() {
                    let entry = raw.entry_address.unwrap_or(raw.value);
                    tab.index_entry_address(id, Address::new(entry));
                }
            }
        }

        if tab.is_kernel_binary && !exported_kernel_symbols.is_empty() {
            tab.mark_ksymtab_symbols(&exported_kernel_symbols);
        }

        tab.sort();
        info!(
            total = tab.symbols.len(),
            visible = tab.ordered.len(),
            kernel = tab.is_kernel_binary,
            "Loaded symtab"
        );
        tab
    }

    /// Build a symtab from name-to-symbols maps, typically one for functions
    /// and one for variables.
    ///
    /// The result has no address information.
    ///
    /// ## Errors
    ///
    /// [`SymtabError::DuplicateName`] if a name appears in both maps.
    pub fn from_maps(functions: Option<SymbolMap>, variables: Option<SymbolMap>) -> Result<Self, SymtabError>
    {
        let mut tab = Symtab::default();

        for map in [functions, variables].into_iter().flatten() {
            for (name, symbols) in map {
                if tab.by_name.contains_key(&name) {
                    error!(name = %name, "Symbol name present in more than one map");
                    return Err(SymtabError::DuplicateName(name));
                }
                let mut ids = Vec::with_capacity(symbols.len());
                for mut symbol in symbols {
                    let id = SymbolId(tab.symbols.len());
                    symbol.id = id;
                    if !symbol.is_suppressed {
                        tab.ordered.push(id);
                    }
                    tab.symbols.push(symbol);
                    ids.push(id);
                }
                tab.by_name.insert(name, ids);
            }
        }

        tab.sort();
        debug!(total = tab.symbols.len(), "Built symtab from symbol maps");
        Ok(tab)
    }

    /// Filter builder seeded with the defaults every ABI comparison wants:
    /// public symbols only, and on kernel binaries only ksymtab-exported ones.
    pub fn make_filter(&self) -> SymtabFilterBuilder
    {
        let builder = SymtabFilterBuilder::new().public_symbols(true);
        if self.is_kernel_binary {
            builder.kernel_symbols(true)
        } else {
            builder
        }
    }

    /// Iterate the ordered (non-suppressed) symbols matching `filter`.
    pub fn iter(&self, filter: &SymtabFilter) -> SymtabIter<'_>
    {
        SymtabIter::new(self, &self.ordered, *filter)
    }

    /// Pair this symtab with a filter, for use in `for` loops.
    pub fn filtered(&self, filter: impl Into<SymtabFilter>) -> FilteredSymtab<'_>
    {
        FilteredSymtab::new(self, filter.into())
    }

    /// The symbol behind an id handed out by this symtab.
    ///
    /// ## Panics
    ///
    /// If `id` comes from another symtab and is out of range.
    pub fn symbol(&self, id: SymbolId) -> &ElfSymbol
    {
        &self.symbols[id.0]
    }

    /// All symbols with that exact linkage name, suppressed ones included.
    pub fn lookup_symbol(&self, name: &str) -> &[SymbolId]
    {
        self.by_name.get(name).map_or(&[], Vec::as_slice)
    }

    /// The main symbol at `address`.
    ///
    /// On PPC64 ELFv1 the address is first looked up as a function entry
    /// point, so that the code address of `foo` yields `foo` and not `.foo`.
    pub fn lookup_address(&self, address: Address) -> Option<SymbolId>
    {
        if self.is_ppc64_elfv1 {
            if let Some(id) = self.by_entry_address.get(&address) {
                return Some(*id);
            }
        }
        self.by_address.get(&address).copied()
    }

    /// Whether the table has anything worth comparing.
    ///
    /// Kernel binaries count only if they export symbols through the ksymtab.
    pub fn has_symbols(&self) -> bool
    {
        if self.is_kernel_binary {
            self.has_ksymtab_entries
        } else {
            !self.ordered.is_empty()
        }
    }

    /// Number of iterable (non-suppressed) symbols.
    pub fn len(&self) -> usize
    {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.ordered.is_empty()
    }

    pub fn is_kernel_binary(&self) -> bool
    {
        self.is_kernel_binary
    }

    /// Main symbol of the alias group `id` belongs to (itself if it has no alias).
    pub fn main_symbol(&self, id: SymbolId) -> SymbolId
    {
        self.main_of.get(&id).copied().unwrap_or(id)
    }

    /// Other symbols sharing the address of `id`, main symbol included when
    /// `id` is not the main symbol itself.
    pub fn aliases(&self, id: SymbolId) -> Vec<SymbolId>
    {
        let main = self.main_symbol(id);
        let mut group = Vec::new();
        if main != id {
            group.push(main);
        }
        if let Some(members) = self.alias_groups.get(&main) {
            group.extend(members.iter().copied().filter(|member| *member != id));
        }
        group
    }

    /// Whether `a` and `b` live at the same address.
    pub fn does_alias(&self, a: SymbolId, b: SymbolId) -> bool
    {
        a == b || self.main_symbol(a) == self.main_symbol(b)
    }

    /// Other instances of the common symbol `id` (relocatable objects only).
    pub fn common_instances(&self, id: SymbolId) -> &[SymbolId]
    {
        self.common_groups.get(&id).map_or(&[], |group| group.as_slice())
    }

    fn push(&mut self, mut symbol: ElfSymbol, is_suppressed: Option<SymbolPredicate<'_>>) -> SymbolId
    {
        let id = SymbolId(self.symbols.len());
        symbol.id = id;
        if is_suppressed.is_some_and(|predicate| predicate(&symbol)) {
            debug!(symbol = %symbol, "Symbol suppressed at load time");
            symbol.is_suppressed = true;
        } else {
            self.ordered.push(id);
        }
        self.by_name.entry(symbol.name().to_string()).or_default().push(id);
        self.symbols.push(symbol);
        id
    }

    fn link_common_instance(&mut self, id: SymbolId)
    {
        let name = self.symbols[id.0].name();
        let Some(&first) = self.by_name.get(name).and_then(|ids| ids.first()) else {
            return;
        };
        if first != id && self.symbols[first.0].is_common {
            self.common_groups.entry(first).or_default().push(id);
        }
    }

    fn index_address(&mut self, id: SymbolId, address: Address)
    {
        self.symbols[id.0].address = Some(address);
        match self.by_address.get(&address).copied() {
            None => {
                self.by_address.insert(address, id);
            }
            Some(existing) => {
                let main = self.main_symbol(existing);
                debug!(
                    alias = %self.symbols[id.0],
                    main = %self.symbols[main.0],
                    "Symbol aliases an earlier one"
                );
                self.alias_groups.entry(main).or_default().push(id);
                self.main_of.insert(id, main);
            }
        }
    }

    /// Record the entry point of a PPC64 ELFv1 function.
    ///
    /// Both `foo` (descriptor in `.opd`) and `.foo` (code) resolve to the same
    /// entry point; `foo` wins regardless of the order they are seen in.
    fn index_entry_address(&mut self, id: SymbolId, entry: Address)
    {
        match self.by_entry_address.get(&entry).copied() {
            None => {
                self.by_entry_address.insert(entry, id);
            }
            Some(existing) => {
                let existing_name = self.symbols[existing.0].name();
                let new_name = self.symbols[id.0].name();
                if existing_name.strip_prefix('.') == Some(new_name) {
                    self.by_entry_address.insert(entry, id);
                } else if new_name.strip_prefix('.') != Some(existing_name) && !self.does_alias(existing, id) {
                    debug!(
                        entry = %entry,
                        kept = existing_name,
                        ignored = new_name,
                        "Unrelated symbols share a function entry address"
                    );
                }
            }
        }
    }

    fn mark_ksymtab_symbols(&mut self, exported: &HashSet<String>)
    {
        for name in exported {
            let Some(ids) = self.by_name.get(name) else {
                debug!(name = %name, "ksymtab entry without a matching symbol");
                continue;
            };
            for id in ids {
                let symbol = &mut self.symbols[id.0];
                if symbol.is_public() {
                    symbol.is_in_ksymtab = true;
                }
            }
        }
        self.has_ksymtab_entries = true;
    }

    fn sort(&mut self)
    {
        let symbols = &self.symbols;
        self.ordered
            .sort_by(|left, right| compare_by_id_string(&symbols[left.0], &symbols[right.0]));
    }
}

/// Ordering of iterated symbols: lexicographic on the id string.
fn compare_by_id_string(left: &ElfSymbol, right: &ElfSymbol) -> Ordering
{
    left.id_string().cmp(&right.id_string())
}

#[cfg(test)]
mod tests
{
    use object::elf::{STB_LOCAL, STT_FILE, STT_SECTION};

    use super::*;

    fn func(index: usize, name: &str, value: u64) -> RawSymbol
    {
        RawSymbol::new(index, name, STT_FUNC, value)
    }

    fn var(index: usize, name: &str, value: u64) -> RawSymbol
    {
        RawSymbol::new(index, name, STT_OBJECT, value)
    }

    fn names(tab: &Symtab, filter: &SymtabFilter) -> Vec<String>
    {
        tab.iter(filter).map(|sym| sym.name().to_string()).collect()
    }

    #[test]
    fn test_kept_symbol_kinds()
    {
        let mut absolute = var(4, "abs_value", 0x10);
        absolute.section = SymbolSection::Absolute;
        let entries = vec![
            func(1, "f", 0x1000),
            var(2, "v", 0x2000),
            RawSymbol::new(3, "t", STT_TLS, 0x10),
            absolute,
            RawSymbol::new(5, "file.c", STT_FILE, 0),
            RawSymbol::new(6, ".text", STT_SECTION, 0),
            func(7, "", 0x3000),
            RawSymbol::new(8, "ifunc", STT_GNU_IFUNC, 0x4000),
        ];
        let tab = Symtab::from_entries(entries, SymtabFlags::default(), None);

        assert_eq!(names(&tab, &SymtabFilter::default()), ["f", "ifunc", "t", "v"]);
        assert!(tab.lookup_symbol("abs_value").is_empty());
        assert!(tab.lookup_symbol("file.c").is_empty());
    }

    #[test]
    fn test_suppressed_symbols_stay_in_lookup_maps()
    {
        let entries = vec![func(1, "keep", 0x1000), func(2, "drop_me", 0x2000)];
        let predicate = |sym: &ElfSymbol| sym.name() == "drop_me";
        let tab = Symtab::from_entries(entries, SymtabFlags::default(), Some(&predicate));

        assert_eq!(names(&tab, &SymtabFilter::default()), ["keep"]);
        assert_eq!(tab.len(), 1);

        let ids = tab.lookup_symbol("drop_me");
        assert_eq!(ids.len(), 1);
        assert!(tab.symbol(ids[0]).is_suppressed());
        assert_eq!(tab.lookup_address(Address::new(0x2000)), Some(ids[0]));
    }

    #[test]
    fn test_aliases_share_an_address()
    {
        let entries = vec![func(1, "impl", 0x1000), func(2, "alias_a", 0x1000), func(3, "alias_b", 0x1000)];
        let tab = Symtab::from_entries(entries, SymtabFlags::default(), None);

        let main = tab.lookup_symbol("impl")[0];
        let alias_a = tab.lookup_symbol("alias_a")[0];
        let alias_b = tab.lookup_symbol("alias_b")[0];

        assert_eq!(tab.lookup_address(Address::new(0x1000)), Some(main));
        assert_eq!(tab.main_symbol(alias_b), main);
        assert_eq!(tab.aliases(main), vec![alias_a, alias_b]);
        assert_eq!(tab.aliases(alias_a), vec![main, alias_b]);
        assert!(tab.does_alias(alias_a, alias_b));
        assert_eq!(tab.len(), 3);
    }

    #[test]
    fn test_common_instances_are_linked_by_name()
    {
        let mut first = var(1, "shared", 8);
        first.section = SymbolSection::Common;
        let mut second = var(5, "shared", 8);
        second.section = SymbolSection::Common;
        let tab = Symtab::from_entries(vec![first, second], SymtabFlags::default(), None);

        let ids = tab.lookup_symbol("shared");
        assert_eq!(ids.len(), 2);
        assert_eq!(tab.common_instances(ids[0]), &[ids[1]]);
        assert!(tab.symbol(ids[0]).is_common_symbol());
        assert_eq!(tab.symbol(ids[0]).address(), None);
    }

    #[test]
    fn test_undefined_symbols()
    {
        let mut undefined = func(2, "printf", 0);
        undefined.section = SymbolSection::Undefined;
        let tab = Symtab::from_entries(vec![func(1, "main", 0x1000), undefined], SymtabFlags::default(), None);

        let filter = SymtabFilterBuilder::new().undefined_symbols(true).build();
        assert_eq!(names(&tab, &filter), ["printf"]);
        // undefined symbols are never public
        assert_eq!(names(&tab, &tab.make_filter().build()), ["main"]);
    }

    #[test]
    fn test_kernel_ksymtab_marking()
    {
        let mut local = func(3, "helper", 0x3000);
        local.st_bind = STB_LOCAL;
        let entries = vec![
            func(1, "exported_fn", 0x1000),
            func(2, "internal_fn", 0x2000),
            local,
            var(4, "__ksymtab_exported_fn", 0x8000),
            var(5, "__ksymtab_helper", 0x8010),
        ];
        let flags = SymtabFlags {
            is_kernel_binary: true,
            ..Default::default()
        };
        let tab = Symtab::from_entries(entries, flags, None);

        assert!(tab.has_symbols());
        assert!(tab.lookup_symbol("__ksymtab_exported_fn").is_empty());
        assert_eq!(tab.make_filter().build().kernel_symbols, Some(true));
        assert_eq!(names(&tab, &tab.make_filter().build()), ["exported_fn"]);
        // local symbols are not public, so the ksymtab does not mark them
        assert!(!tab.symbol(tab.lookup_symbol("helper")[0]).is_in_ksymtab());
    }

    #[test]
    fn test_kernel_without_ksymtab_has_no_symbols()
    {
        let flags = SymtabFlags {
            is_kernel_binary: true,
            ..Default::default()
        };
        let tab = Symtab::from_entries(vec![func(1, "f", 0x1000)], flags, None);
        assert!(!tab.has_symbols());
        assert!(!tab.is_empty());
    }

    #[test]
    #[should_panic(expected = "duplicate ksymtab entry")]
    fn test_duplicate_ksymtab_marker_panics()
    {
        let flags = SymtabFlags {
            is_kernel_binary: true,
            ..Default::default()
        };
        let entries = vec![var(1, "__ksymtab_f", 0x10), var(2, "__ksymtab_f", 0x20)];
        let _ = Symtab::from_entries(entries, flags, None);
    }

    #[test]
    fn test_ppc64_descriptor_symbol_wins_entry_lookup()
    {
        let flags = SymtabFlags {
            is_ppc64_elfv1: true,
            ..Default::default()
        };
        let descriptor = || {
            let mut sym = func(1, "foo", 0x20000);
            sym.entry_address = Some(0x1000);
            sym
        };
        let code = || func(2, ".foo", 0x1000);

        for entries in [vec![descriptor(), code()], vec![code(), descriptor()]] {
            let tab = Symtab::from_entries(entries, flags, None);
            let foo = tab.lookup_symbol("foo")[0];
            assert_eq!(tab.lookup_address(Address::new(0x1000)), Some(foo));
            assert_eq!(tab.lookup_address(Address::new(0x20000)), Some(foo));
        }
    }

    #[test]
    fn test_ordering_is_by_id_string_and_stable()
    {
        let mut v1 = func(3, "sym", 0x3000);
        v1.version = SymbolVersion::new("V1", false);
        let mut v2 = func(4, "sym", 0x4000);
        v2.version = SymbolVersion::new("V2", true);
        let entries = vec![func(1, "zeta", 0x1000), v2, func(2, "alpha", 0x2000), v1];
        let mut tab = Symtab::from_entries(entries, SymtabFlags::default(), None);

        let ids: Vec<_> = tab.iter(&SymtabFilter::default()).map(ElfSymbol::id_string).collect();
        assert_eq!(ids, ["alpha", "sym@@V2", "sym@V1", "zeta"]);

        let before = tab.ordered.clone();
        tab.sort();
        assert_eq!(tab.ordered, before);
    }

    #[test]
    fn test_filtered_iteration_counts()
    {
        let mut weak_local = var(4, "local_var", 0x5000);
        weak_local.st_bind = STB_LOCAL;
        let entries = vec![
            func(1, "f1", 0x1000),
            func(2, "f2", 0x2000),
            var(3, "v1", 0x3000),
            weak_local,
        ];
        let tab = Symtab::from_entries(entries, SymtabFlags::default(), None);

        let functions = SymtabFilterBuilder::new().functions(true).build();
        let variables = SymtabFilterBuilder::new().variables(true).build();
        let public_variables = tab.make_filter().variables(true).build();

        assert_eq!(tab.iter(&functions).count(), 2);
        assert!(tab.iter(&functions).all(ElfSymbol::is_function));
        assert_eq!(tab.filtered(variables).into_iter().count(), 2);
        assert_eq!(names(&tab, &public_variables), ["v1"]);

        let iter = tab.iter(&public_variables);
        assert_eq!(iter.peek().map(ElfSymbol::name), Some("v1"));
    }

    #[test]
    fn test_from_maps()
    {
        let make = |name: &str, symbol_type| {
            ElfSymbol::new(
                0,
                name,
                0,
                symbol_type,
                SymbolBinding::Global,
                SymbolVisibility::Default,
                SymbolVersion::default(),
                true,
            )
        };
        let mut functions = SymbolMap::new();
        functions.insert("b_fn".into(), vec![make("b_fn", SymbolType::Func)]);
        functions.insert("a_fn".into(), vec![make("a_fn", SymbolType::Func)]);
        let mut variables = SymbolMap::new();
        variables.insert("c_var".into(), vec![make("c_var", SymbolType::Object)]);

        let tab = Symtab::from_maps(Some(functions), Some(variables)).unwrap();
        assert_eq!(names(&tab, &SymtabFilter::default()), ["a_fn", "b_fn", "c_var"]);
        assert_eq!(tab.lookup_address(Address::new(0)), None);
        let id = tab.lookup_symbol("c_var")[0];
        assert_eq!(tab.symbol(id).id(), id);
    }

    #[test]
    fn test_from_maps_rejects_duplicate_names()
    {
        let make = || {
            vec![ElfSymbol::new(
                0,
                "dup",
                0,
                SymbolType::Func,
                SymbolBinding::Global,
                SymbolVisibility::Default,
                SymbolVersion::default(),
                true,
            )]
        };
        let functions = SymbolMap::from([("dup".to_string(), make())]);
        let variables = SymbolMap::from([("dup".to_string(), make())]);

        let err = Symtab::from_maps(Some(functions), Some(variables)).unwrap_err();
        assert!(matches!(err, SymtabError::DuplicateName(name) if name == "dup"));
    }

    #[test]
    fn test_lookup_miss()
    {
        let tab = Symtab::from_entries(vec![func(1, "f", 0x1000)], SymtabFlags::default(), None);
        assert!(tab.lookup_symbol("nope").is_empty());
        assert_eq!(tab.lookup_address(Address::new(0xdead)), None);
    }
}
