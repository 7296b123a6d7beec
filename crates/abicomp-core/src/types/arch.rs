//! Target architecture of a binary.

use std::fmt;

/// CPU architecture an ELF binary was built for.
///
/// Only the architectures that change how symbols are read get a variant of
/// their own. Everything else is carried by name so that an architecture
/// change between two corpora can still be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// 64-bit x86 (Intel/AMD)
    X86_64,
    /// 64-bit ARM
    Arm64,
    /// 64-bit PowerPC
    ///
    /// Big-endian PPC64 binaries use the ELFv1 ABI, where a function symbol
    /// points at a descriptor in `.opd` rather than at its code.
    PowerPc64,
    /// Any other architecture
    Unknown(&'static str),
}

impl Architecture
{
    /// Map the `object` crate's architecture onto ours.
    pub fn from_object(arch: object::Architecture) -> Self
    {
        match arch {
            object::Architecture::X86_64 => Architecture::X86_64,
            object::Architecture::Aarch64 => Architecture::Arm64,
            object::Architecture::PowerPc64 => Architecture::PowerPc64,
            object::Architecture::I386 => Architecture::Unknown("i386"),
            object::Architecture::Arm => Architecture::Unknown("arm"),
            object::Architecture::PowerPc => Architecture::Unknown("powerpc"),
            object::Architecture::Riscv64 => Architecture::Unknown("riscv64"),
            object::Architecture::S390x => Architecture::Unknown("s390x"),
            _ => Architecture::Unknown("unknown"),
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::Arm64 => write!(f, "aarch64"),
            Architecture::PowerPc64 => write!(f, "ppc64"),
            Architecture::Unknown(name) => write!(f, "{name}"),
        }
    }
}
