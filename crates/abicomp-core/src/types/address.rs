//! Symbol address type.

use std::fmt;
use std::ops::Add;

/// Strongly typed symbol address
///
/// This wrapper around `u64` keeps symbol values (`st_value`) apart from sizes,
/// section indices and file offsets, which are all `u64` too in an ELF file.
///
/// For relocatable objects the address is section-relative plus the section's
/// file offset, see [`Symtab::load`](crate::symtab::Symtab::load). For PPC64
/// ELFv1 function descriptors there are two addresses per function: the one of
/// the descriptor in `.opd` and the entry point it points to.
///
/// ## Example
///
/// ```rust
/// use abicomp_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let next_addr = addr + 0x100;
/// assert_eq!(next_addr.value(), 0x1100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// Create a new address from a `u64` value
    ///
    /// ```rust
    /// use abicomp_core::types::Address;
    ///
    /// const OPD_BASE: Address = Address::new(0x20000);
    /// ```
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}
