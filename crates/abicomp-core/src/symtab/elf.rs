//! Raw `.symtab` extraction through the `object` crate.
//!
//! This is the only place that looks at ELF structures. It turns the symbol
//! table of a binary into a list of [`RawSymbol`] records plus a few facts about
//! the binary ([`SymtabFlags`]); [`Symtab::from_entries`](super::Symtab::from_entries)
//! does the rest.

use object::elf;
use object::read::elf::{Dyn, FileHeader, SectionHeader, SectionTable, Sym};
use object::{Endian, Endianness, FileKind, SymbolIndex};
use tracing::debug;

use super::symbol::SymbolVersion;
use crate::error::SymtabError;

/// Where a symbol lives, as far as symtab construction is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSection
{
    /// `SHN_UNDEF`: declared, defined elsewhere
    Undefined,
    /// `SHN_ABS`
    Absolute,
    /// `SHN_COMMON`: tentative definition in a relocatable object
    Common,
    /// A regular section index
    Index(usize),
}

/// One `.symtab` entry, decoded but not yet interpreted.
#[derive(Debug, Clone)]
pub struct RawSymbol
{
    /// Index in `.symtab`
    pub index: usize,
    pub name: String,
    /// Symbol value, already adjusted to be unique per section in relocatable objects
    pub value: u64,
    pub size: u64,
    /// `STT_*`
    pub st_type: u8,
    /// `STB_*`
    pub st_bind: u8,
    /// `STV_*`
    pub st_visibility: u8,
    pub section: SymbolSection,
    pub version: SymbolVersion,
    /// Entry point read from the function descriptor (PPC64 ELFv1 `.opd` only)
    pub entry_address: Option<u64>,
}

impl RawSymbol
{
    /// A defined, global, default-visibility entry in section 1.
    ///
    /// Handy for producers that synthesize symbol tables; adjust the fields
    /// that matter afterwards.
    pub fn new(index: usize, name: impl Into<String>, st_type: u8, value: u64) -> Self
    {
        Self {
            index,
            name: name.into(),
            value,
            size: 0,
            st_type,
            st_bind: elf::STB_GLOBAL,
            st_visibility: elf::STV_DEFAULT,
            section: SymbolSection::Index(1),
            version: SymbolVersion::default(),
            entry_address: None,
        }
    }
}

/// Binary-wide facts that change how a symbol table is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymtabFlags
{
    /// Linux kernel image or module (`__ksymtab_strings` present)
    pub is_kernel_binary: bool,
    /// PPC64 using function descriptors (`.opd` present, ELFv1 ABI)
    pub is_ppc64_elfv1: bool,
}

/// Decode the `.symtab` of an ELF image.
pub(crate) fn read_symbol_table(data: &[u8]) -> Result<(Vec<RawSymbol>, SymtabFlags), SymtabError>
{
    match FileKind::parse(data) {
        Ok(FileKind::Elf32) => read_elf::<elf::FileHeader32<Endianness>>(data),
        Ok(FileKind::Elf64) => read_elf::<elf::FileHeader64<Endianness>>(data),
        Ok(other) => Err(SymtabError::Parse(format!("not an ELF file ({other:?})"))),
        Err(err) => Err(SymtabError::Parse(err.to_string())),
    }
}

fn read_elf<Elf: FileHeader<Endian = Endianness>>(data: &[u8]) -> Result<(Vec<RawSymbol>, SymtabFlags), SymtabError>
{
    let header = Elf::parse(data).map_err(|err| SymtabError::Parse(err.to_string()))?;
    let endian = header.endian().map_err(|err| SymtabError::Parse(err.to_string()))?;
    let sections = header
        .sections(endian, data)
        .map_err(|err| SymtabError::Parse(err.to_string()))?;

    let symtab_header = sections
        .iter()
        .find(|section| section.sh_type(endian) == elf::SHT_SYMTAB)
        .ok_or(SymtabError::NoSymbolTable)?;
    let entsize: u64 = symtab_header.sh_entsize(endian).into();
    if entsize == 0 {
        return Err(SymtabError::InvalidHeader("sh_entsize is 0".to_string()));
    }

    let symbols = sections
        .symbols(endian, data, elf::SHT_SYMTAB)
        .map_err(|err| SymtabError::InvalidHeader(err.to_string()))?;
    let versions = sections
        .versions(endian, data)
        .map_err(|err| SymtabError::InvalidHeader(format!("bad symbol version sections: {err}")))?;

    let flags = SymtabFlags {
        is_kernel_binary: sections.section_by_name(endian, b"__ksymtab_strings").is_some(),
        is_ppc64_elfv1: is_ppc64_elfv1(header, endian, &sections),
    };
    let is_relocatable = header.e_type(endian) == elf::ET_REL;
    let opd = if flags.is_ppc64_elfv1 {
        opd_section(endian, data, &sections)
    } else {
        None
    };

    let mut entries = Vec::with_capacity(symbols.len());
    for (index, sym) in symbols.symbols().iter().enumerate() {
        let name = sym
            .name(endian, symbols.strings())
            .map_err(|err| SymtabError::UnreadableSymbol {
                index,
                details: err.to_string(),
            })?;
        // no name, no game
        if name.is_empty() {
            continue;
        }
        let name = String::from_utf8_lossy(name).into_owned();

        let section = match sym.st_shndx(endian) {
            elf::SHN_UNDEF => SymbolSection::Undefined,
            elf::SHN_ABS => SymbolSection::Absolute,
            elf::SHN_COMMON => SymbolSection::Common,
            shndx => SymbolSection::Index(usize::from(shndx)),
        };

        let mut value: u64 = sym.st_value(endian).into();
        let entry_address = match &opd {
            Some(opd) if sym.st_type() == elf::STT_FUNC => opd.entry_address(endian, value),
            _ => None,
        };
        if is_relocatable {
            if let SymbolSection::Index(shndx) = section {
                if let Ok(section_header) = sections.section(object::SectionIndex(shndx)) {
                    let offset: u64 = section_header.sh_offset(endian).into();
                    value = value.wrapping_add(offset);
                }
            }
        }

        let version = versions
            .as_ref()
            .and_then(|table| {
                let version_index = table.version_index(endian, SymbolIndex(index));
                let is_default = section != SymbolSection::Undefined && !version_index.is_hidden();
                table
                    .version(version_index)
                    .ok()
                    .flatten()
                    .map(|version| SymbolVersion::new(String::from_utf8_lossy(version.name()), is_default))
            })
            .unwrap_or_default();

        entries.push(RawSymbol {
            index,
            name,
            value,
            size: sym.st_size(endian).into(),
            st_type: sym.st_type(),
            st_bind: sym.st_bind(),
            st_visibility: sym.st_visibility(),
            section,
            version,
            entry_address,
        });
    }

    debug!(
        entries = entries.len(),
        kernel = flags.is_kernel_binary,
        ppc64_elfv1 = flags.is_ppc64_elfv1,
        "decoded .symtab"
    );
    Ok((entries, flags))
}

fn is_ppc64_elfv1<Elf: FileHeader<Endian = Endianness>>(
    header: &Elf,
    endian: Endianness,
    sections: &SectionTable<'_, Elf>,
) -> bool
{
    header.e_machine(endian) == elf::EM_PPC64
        && header.e_flags(endian) & elf::EF_PPC64_ABI != 2
        && sections.section_by_name(endian, b".opd").is_some()
}

/// The `.opd` section: an array of function descriptors, the first word of
/// each being the entry address of the function.
struct OpdSection<'data>
{
    address: u64,
    data: &'data [u8],
}

impl OpdSection<'_>
{
    fn entry_address(&self, endian: Endianness, descriptor: u64) -> Option<u64>
    {
        let offset = usize::try_from(descriptor.checked_sub(self.address)?).ok()?;
        let bytes: [u8; 8] = self.data.get(offset..offset.checked_add(8)?)?.try_into().ok()?;
        Some(if endian.is_big_endian() {
            u64::from_be_bytes(bytes)
        } else {
            u64::from_le_bytes(bytes)
        })
    }
}

fn opd_section<'data, Elf: FileHeader<Endian = Endianness>>(
    endian: Endianness,
    data: &'data [u8],
    sections: &SectionTable<'data, Elf>,
) -> Option<OpdSection<'data>>
{
    let (_, header) = sections.section_by_name(endian, b".opd")?;
    let bytes = header.data(endian, data).ok()?;
    Some(OpdSection {
        address: header.sh_addr(endian).into(),
        data: bytes,
    })
}

/// Dynamic section facts: who the binary is and what it links against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DynamicInfo
{
    pub soname: Option<String>,
    pub needed: Vec<String>,
}

/// Read `DT_SONAME` and `DT_NEEDED` from an ELF image.
///
/// Relocatable objects and static executables have no dynamic section and
/// yield an empty [`DynamicInfo`].
pub(crate) fn read_dynamic_info(data: &[u8]) -> Result<DynamicInfo, SymtabError>
{
    match FileKind::parse(data) {
        Ok(FileKind::Elf32) => dynamic_info::<elf::FileHeader32<Endianness>>(data),
        Ok(FileKind::Elf64) => dynamic_info::<elf::FileHeader64<Endianness>>(data),
        Ok(other) => Err(SymtabError::Parse(format!("not an ELF file ({other:?})"))),
        Err(err) => Err(SymtabError::Parse(err.to_string())),
    }
}

fn dynamic_info<Elf: FileHeader<Endian = Endianness>>(data: &[u8]) -> Result<DynamicInfo, SymtabError>
{
    let parse_error = |err: object::Error| SymtabError::Parse(err.to_string());
    let header = Elf::parse(data).map_err(parse_error)?;
    let endian = header.endian().map_err(parse_error)?;
    let sections = header.sections(endian, data).map_err(parse_error)?;

    let mut info = DynamicInfo::default();
    for section in sections.iter() {
        let Some((entries, link)) = section.dynamic(endian, data).map_err(parse_error)? else {
            continue;
        };
        let strings = sections.strings(endian, data, link).map_err(parse_error)?;
        for entry in entries {
            match entry.tag32(endian) {
                Some(elf::DT_NULL) => break,
                Some(tag @ (elf::DT_SONAME | elf::DT_NEEDED)) => {
                    let value = entry.string(endian, strings).map_err(parse_error)?;
                    let value = String::from_utf8_lossy(value).into_owned();
                    if tag == elf::DT_SONAME {
                        info.soname = Some(value);
                    } else {
                        info.needed.push(value);
                    }
                }
                _ => {}
            }
        }
    }
    debug!(soname = ?info.soname, needed = info.needed.len(), "decoded dynamic section");
    Ok(info)
}
