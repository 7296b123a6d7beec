//! # Type Diffs
//!
//! Structural comparison of two types, one from each corpus's
//! [`TypeGraph`]. The result is a tree: a [`TypeDiff`] holds the changes local
//! to the type (size, name, members added) and one child per sub-type that
//! changed (pointed-to type, data member types, element type, ...).
//!
//! ## Reach
//!
//! Every node remembers how it was reached from the declaration being
//! compared. Going through a pointer makes everything below
//! [`Reach::Pointer`]; going through a reference, and no pointer, makes it
//! [`Reach::Reference`]. Type suppressions use this to tell a change to a
//! struct passed by value from a change to a struct only seen through a
//! pointer.
//!
//! ## Cycles
//!
//! A pair of types already being compared higher up the current path is not
//! entered again. For `struct node { struct node* next; }` the change to
//! `struct node` is reported once, at the top.
//!
//! ## Sharing
//!
//! A finished comparison is remembered per `(first, second, reach)` and
//! reused wherever the same pair shows up again, so a type reached through
//! many members or parameters is compared once. Children hold the shared
//! node through an [`Arc`]. A result that was cut short by the cycle guard
//! for a pair further up the path is not remembered.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::ir::{EnumType, FunctionType, Qualifiers, RecordType, Type, TypeGraph, TypeId};
use crate::suppression::{Reach, Suppression, SuppressionContext, TypeChange};
use crate::types::SourceLocation;

/// A change local to one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeChangeDetail
{
    /// The two types are different kinds of things altogether
    Kind
    {
        old: &'static str,
        new: &'static str,
    },
    Name
    {
        old: String,
        new: String,
    },
    Size
    {
        old: u64,
        new: u64,
    },
    /// A complete type became a forward declaration, or the reverse
    DeclarationOnly
    {
        old: bool,
        new: bool,
    },
    Qualifiers
    {
        old: String,
        new: String,
    },
    /// lvalue vs rvalue reference
    ReferenceKind
    {
        old_rvalue: bool,
        new_rvalue: bool,
    },
    ArrayBound
    {
        old: Option<u64>,
        new: Option<u64>,
    },
    MemberAdded
    {
        name: String,
        type_name: String,
        offset_in_bits: u64,
    },
    MemberRemoved
    {
        name: String,
        type_name: String,
        offset_in_bits: u64,
    },
    MemberOffset
    {
        name: String,
        old: u64,
        new: u64,
    },
    EnumeratorAdded
    {
        name: String,
        value: i64,
    },
    EnumeratorRemoved
    {
        name: String,
        value: i64,
    },
    EnumeratorValue
    {
        name: String,
        old: i64,
        new: i64,
    },
    ParameterCount
    {
        old: usize,
        new: usize,
    },
    Variadic
    {
        old: bool,
        new: bool,
    },
}

impl fmt::Display for TypeChangeDetail
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            TypeChangeDetail::Kind { old, new } => write!(f, "type kind changed from {old} to {new}"),
            TypeChangeDetail::Name { old, new } => write!(f, "type name changed from '{old}' to '{new}'"),
            TypeChangeDetail::Size { old, new } => write!(f, "type size changed from {old} to {new} (in bits)"),
            TypeChangeDetail::DeclarationOnly { new: true, .. } => write!(f, "type became declaration-only"),
            TypeChangeDetail::DeclarationOnly { .. } => write!(f, "type is no longer declaration-only"),
            TypeChangeDetail::Qualifiers { old, new } => write!(f, "qualifiers changed from '{old}' to '{new}'"),
            TypeChangeDetail::ReferenceKind { new_rvalue: true, .. } => {
                write!(f, "lvalue reference became rvalue reference")
            }
            TypeChangeDetail::ReferenceKind { .. } => write!(f, "rvalue reference became lvalue reference"),
            TypeChangeDetail::ArrayBound { old, new } => {
                let bound = |count: &Option<u64>| count.map_or_else(|| String::from("unknown"), |c| c.to_string());
                write!(f, "array bound changed from {} to {}", bound(old), bound(new))
            }
            TypeChangeDetail::MemberAdded {
                name,
                type_name,
                offset_in_bits,
            } => write!(f, "data member '{type_name} {name}' inserted at offset {offset_in_bits} (in bits)"),
            TypeChangeDetail::MemberRemoved {
                name,
                type_name,
                offset_in_bits,
            } => write!(f, "data member '{type_name} {name}' at offset {offset_in_bits} (in bits) removed"),
            TypeChangeDetail::MemberOffset { name, old, new } => {
                write!(f, "data member '{name}' offset changed from {old} to {new} (in bits)")
            }
            TypeChangeDetail::EnumeratorAdded { name, value } => write!(f, "enumerator '{name}' ({value}) inserted"),
            TypeChangeDetail::EnumeratorRemoved { name, value } => write!(f, "enumerator '{name}' ({value}) removed"),
            TypeChangeDetail::EnumeratorValue { name, old, new } => {
                write!(f, "enumerator '{name}' value changed from {old} to {new}")
            }
            TypeChangeDetail::ParameterCount { old, new } => {
                write!(f, "parameter count changed from {old} to {new}")
            }
            TypeChangeDetail::Variadic { new: true, .. } => write!(f, "function type became variadic"),
            TypeChangeDetail::Variadic { .. } => write!(f, "function type is no longer variadic"),
        }
    }
}

/// A changed sub-type, with the role it plays in its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDiffChild
{
    /// e.g. `pointed-to type`, `data member 'next'`, `parameter 2`
    pub role: String,
    pub diff: Arc<TypeDiff>,
}

/// Difference between two types.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDiff
{
    pub first_name: String,
    pub second_name: String,
    pub reach: Reach,
    /// Declaration site of the type in the first corpus
    pub location: Option<SourceLocation>,
    pub changes: Vec<TypeChangeDetail>,
    pub children: Vec<TypeDiffChild>,
    /// Label of the type suppression that elided this node
    pub suppressed_by: Option<String>,
}

impl TypeDiff
{
    fn new(first_name: String, second_name: String, reach: Reach, location: Option<SourceLocation>) -> Self
    {
        Self {
            first_name,
            second_name,
            reach,
            location,
            changes: Vec::new(),
            children: Vec::new(),
            suppressed_by: None,
        }
    }

    pub fn is_suppressed(&self) -> bool
    {
        self.suppressed_by.is_some()
    }

    /// Whether anything in this subtree survives suppression.
    ///
    /// A node whose only changes are in suppressed children has nothing left
    /// to report, even though it is not suppressed itself.
    pub fn has_reportable_changes(&self) -> bool
    {
        !self.is_suppressed()
            && (!self.changes.is_empty() || self.children.iter().any(|child| child.diff.has_reportable_changes()))
    }

    /// Whether the subtree holds at least one suppressed node.
    pub fn has_suppressed_changes(&self) -> bool
    {
        self.is_suppressed() || self.children.iter().any(|child| child.diff.has_suppressed_changes())
    }
}

/// Compares types of two graphs, applying type suppressions as it goes.
pub(crate) struct TypeComparer<'a, C: SuppressionContext + ?Sized>
{
    first: &'a TypeGraph,
    second: &'a TypeGraph,
    ctx: &'a C,
    /// Pairs being compared on the current path, with their depth
    on_path: HashMap<(TypeId, TypeId), usize>,
    /// Depth of the shallowest pair the cycle guard stopped at
    shallowest_cut: Option<usize>,
    done: HashMap<(TypeId, TypeId, Reach), Option<Arc<TypeDiff>>>,
}

impl<'a, C: SuppressionContext + ?Sized> TypeComparer<'a, C>
{
    pub(crate) fn new(first: &'a TypeGraph, second: &'a TypeGraph, ctx: &'a C) -> Self
    {
        Self {
            first,
            second,
            ctx,
            on_path: HashMap::new(),
            shallowest_cut: None,
            done: HashMap::new(),
        }
    }

    pub(crate) fn first(&self) -> &'a TypeGraph
    {
        self.first
    }

    pub(crate) fn second(&self) -> &'a TypeGraph
    {
        self.second
    }

    /// Compare `a` (first graph) to `b` (second graph).
    ///
    /// `None` when the two are structurally equal.
    pub(crate) fn compare(&mut self, a: TypeId, b: TypeId, reach: Reach) -> Option<TypeDiff>
    {
        self.compare_shared(a, b, reach).map(Arc::unwrap_or_clone)
    }

    fn compare_shared(&mut self, a: TypeId, b: TypeId, reach: Reach) -> Option<Arc<TypeDiff>>
    {
        if let Some(done) = self.done.get(&(a, b, reach)) {
            return done.clone();
        }
        if let Some(&depth) = self.on_path.get(&(a, b)) {
            self.shallowest_cut = Some(self.shallowest_cut.map_or(depth, |cut| cut.min(depth)));
            return None;
        }

        let depth = self.on_path.len();
        self.on_path.insert((a, b), depth);
        let outer_cut = self.shallowest_cut.take();

        let mut diff = TypeDiff::new(
            self.first.type_name(a),
            self.second.type_name(b),
            reach,
            self.first.location(a).cloned(),
        );
        self.compare_nodes(a, b, &mut diff);
        self.on_path.remove(&(a, b));

        let result = if diff.changes.is_empty() && diff.children.is_empty() {
            None
        } else {
            diff.suppressed_by = self.matching_suppression(a, &diff);
            Some(Arc::new(diff))
        };

        // Cuts at this pair or below it are resolved now; shallower ones
        // leave the result incomplete and propagate to the caller.
        let inner_cut = self.shallowest_cut.filter(|&cut| cut < depth);
        if inner_cut.is_none() {
            self.done.insert((a, b, reach), result.clone());
        }
        self.shallowest_cut = match (outer_cut, inner_cut) {
            (Some(outer), Some(inner)) => Some(outer.min(inner)),
            (outer, inner) => outer.or(inner),
        };
        result
    }

    fn compare_nodes(&mut self, a: TypeId, b: TypeId, diff: &mut TypeDiff)
    {
        let reach = diff.reach;
        let (first, second) = (self.first, self.second);
        match (first.get(a), second.get(b)) {
            (Type::Void, Type::Void) => {}
            (
                Type::Builtin {
                    name: old_name,
                    size_in_bits: old_size,
                },
                Type::Builtin {
                    name: new_name,
                    size_in_bits: new_size,
                },
            ) => {
                if old_name != new_name {
                    diff.changes.push(TypeChangeDetail::Name {
                        old: old_name.clone(),
                        new: new_name.clone(),
                    });
                }
                if old_size != new_size {
                    diff.changes.push(TypeChangeDetail::Size {
                        old: *old_size,
                        new: *new_size,
                    });
                }
            }
            (Type::Pointer { pointee: old }, Type::Pointer { pointee: new }) => {
                self.child(diff, "pointed-to type", *old, *new, through(reach, Reach::Pointer));
            }
            (
                Type::Reference {
                    referenced: old,
                    rvalue: old_rvalue,
                },
                Type::Reference {
                    referenced: new,
                    rvalue: new_rvalue,
                },
            ) => {
                if old_rvalue != new_rvalue {
                    diff.changes.push(TypeChangeDetail::ReferenceKind {
                        old_rvalue: *old_rvalue,
                        new_rvalue: *new_rvalue,
                    });
                }
                self.child(diff, "referenced type", *old, *new, through(reach, Reach::Reference));
            }
            (
                Type::Qualified {
                    underlying: old,
                    qualifiers: old_qualifiers,
                },
                Type::Qualified {
                    underlying: new,
                    qualifiers: new_qualifiers,
                },
            ) => {
                if old_qualifiers != new_qualifiers {
                    diff.changes.push(TypeChangeDetail::Qualifiers {
                        old: qualifier_names(*old_qualifiers),
                        new: qualifier_names(*new_qualifiers),
                    });
                }
                self.child(diff, "unqualified underlying type", *old, *new, reach);
            }
            (
                Type::Typedef {
                    name: old_name,
                    underlying: old,
                    ..
                },
                Type::Typedef {
                    name: new_name,
                    underlying: new,
                    ..
                },
            ) => {
                if old_name != new_name {
                    diff.changes.push(TypeChangeDetail::Name {
                        old: old_name.clone(),
                        new: new_name.clone(),
                    });
                }
                self.child(diff, "underlying type", *old, *new, reach);
            }
            (
                Type::Array {
                    element: old,
                    count: old_count,
                },
                Type::Array {
                    element: new,
                    count: new_count,
                },
            ) => {
                if old_count != new_count {
                    diff.changes.push(TypeChangeDetail::ArrayBound {
                        old: *old_count,
                        new: *new_count,
                    });
                }
                self.child(diff, "array element type", *old, *new, reach);
            }
            (Type::Record(old), Type::Record(new)) => self.compare_records(old, new, diff),
            (Type::Enum(old), Type::Enum(new)) => compare_enums(old, new, diff),
            (Type::Function(old), Type::Function(new)) => self.compare_function_types(old, new, diff),
            (old, new) => diff.changes.push(TypeChangeDetail::Kind {
                old: old.shape(),
                new: new.shape(),
            }),
        }
    }

    fn child(&mut self, diff: &mut TypeDiff, role: impl Into<String>, a: TypeId, b: TypeId, reach: Reach)
    {
        if let Some(child) = self.compare_shared(a, b, reach) {
            diff.children.push(TypeDiffChild {
                role: role.into(),
                diff: child,
            });
        }
    }

    fn compare_records(&mut self, old: &RecordType, new: &RecordType, diff: &mut TypeDiff)
    {
        let reach = diff.reach;
        if old.kind != new.kind {
            diff.changes.push(TypeChangeDetail::Kind {
                old: old.kind.keyword(),
                new: new.kind.keyword(),
            });
        }
        if old.name != new.name {
            diff.changes.push(TypeChangeDetail::Name {
                old: old.name.clone(),
                new: new.name.clone(),
            });
        }
        if old.declaration_only != new.declaration_only {
            diff.changes.push(TypeChangeDetail::DeclarationOnly {
                old: old.declaration_only,
                new: new.declaration_only,
            });
        }
        // Layout of a forward declaration is unknown; nothing more to compare.
        if old.declaration_only || new.declaration_only {
            return;
        }
        if old.size_in_bits != new.size_in_bits {
            diff.changes.push(TypeChangeDetail::Size {
                old: old.size_in_bits,
                new: new.size_in_bits,
            });
        }

        for member in &old.members {
            match new.members.iter().find(|candidate| candidate.name == member.name) {
                None => diff.changes.push(TypeChangeDetail::MemberRemoved {
                    name: member.name.clone(),
                    type_name: self.first.type_name(member.type_id),
                    offset_in_bits: member.offset_in_bits,
                }),
                Some(counterpart) => {
                    if member.offset_in_bits != counterpart.offset_in_bits {
                        diff.changes.push(TypeChangeDetail::MemberOffset {
                            name: member.name.clone(),
                            old: member.offset_in_bits,
                            new: counterpart.offset_in_bits,
                        });
                    }
                    let role = format!("data member '{}'", member.name);
                    self.child(diff, role, member.type_id, counterpart.type_id, reach);
                }
            }
        }
        for member in &new.members {
            if !old.members.iter().any(|candidate| candidate.name == member.name) {
                diff.changes.push(TypeChangeDetail::MemberAdded {
                    name: member.name.clone(),
                    type_name: self.second.type_name(member.type_id),
                    offset_in_bits: member.offset_in_bits,
                });
            }
        }
    }

    fn compare_function_types(&mut self, old: &FunctionType, new: &FunctionType, diff: &mut TypeDiff)
    {
        let reach = diff.reach;
        self.child(diff, "return type", old.return_type, new.return_type, reach);
        for (index, (a, b)) in old.parameters.iter().zip(&new.parameters).enumerate() {
            self.child(diff, format!("parameter {}", index + 1), *a, *b, reach);
        }
        if old.parameters.len() != new.parameters.len() {
            diff.changes.push(TypeChangeDetail::ParameterCount {
                old: old.parameters.len(),
                new: new.parameters.len(),
            });
        }
        if old.variadic != new.variadic {
            diff.changes.push(TypeChangeDetail::Variadic {
                old: old.variadic,
                new: new.variadic,
            });
        }
    }

    /// Label of the first type suppression that elides `diff`.
    fn matching_suppression(&self, a: TypeId, diff: &TypeDiff) -> Option<String>
    {
        let change = TypeChange {
            name: &diff.first_name,
            kind: self.first.suppression_kind(a),
            location: diff.location.as_ref(),
            reach: diff.reach,
            size_in_bits: self.first.size_in_bits(a).unwrap_or(0),
            inserted_member_offsets: inserted_member_offsets(diff),
            changed_enumerators: changed_enumerators(diff),
        };
        let suppression = self
            .ctx
            .suppressions()
            .iter()
            .filter_map(Suppression::as_type)
            .find(|suppression| suppression.suppresses_type_change(self.ctx, &change))?;
        debug!(
            label = suppression.base().label(),
            type_name = %diff.first_name,
            reach = ?diff.reach,
            "type change suppressed"
        );
        Some(suppression.base().label().to_string())
    }
}

fn compare_enums(old: &EnumType, new: &EnumType, diff: &mut TypeDiff)
{
    if old.name != new.name {
        diff.changes.push(TypeChangeDetail::Name {
            old: old.name.clone(),
            new: new.name.clone(),
        });
    }
    if old.size_in_bits != new.size_in_bits {
        diff.changes.push(TypeChangeDetail::Size {
            old: old.size_in_bits,
            new: new.size_in_bits,
        });
    }
    for enumerator in &old.enumerators {
        match new.enumerators.iter().find(|candidate| candidate.name == enumerator.name) {
            None => diff.changes.push(TypeChangeDetail::EnumeratorRemoved {
                name: enumerator.name.clone(),
                value: enumerator.value,
            }),
            Some(counterpart) if counterpart.value != enumerator.value => {
                diff.changes.push(TypeChangeDetail::EnumeratorValue {
                    name: enumerator.name.clone(),
                    old: enumerator.value,
                    new: counterpart.value,
                });
            }
            Some(_) => {}
        }
    }
    for enumerator in &new.enumerators {
        if !old.enumerators.iter().any(|candidate| candidate.name == enumerator.name) {
            diff.changes.push(TypeChangeDetail::EnumeratorAdded {
                name: enumerator.name.clone(),
                value: enumerator.value,
            });
        }
    }
}

fn through(reach: Reach, via: Reach) -> Reach
{
    if reach == Reach::Direct {
        via
    } else {
        reach
    }
}

fn qualifier_names(qualifiers: Qualifiers) -> String
{
    qualifiers
        .iter_names()
        .map(|(name, _)| name.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Offsets of the inserted members, when the change is data member
/// insertions (and the resulting growth) and nothing else.
fn inserted_member_offsets(diff: &TypeDiff) -> Option<Vec<u64>>
{
    if !diff.children.is_empty() {
        return None;
    }
    let mut offsets = Vec::new();
    for change in &diff.changes {
        match change {
            TypeChangeDetail::MemberAdded { offset_in_bits, .. } => offsets.push(*offset_in_bits),
            TypeChangeDetail::Size { .. } => {}
            _ => return None,
        }
    }
    (!offsets.is_empty()).then_some(offsets)
}

/// Enumerators whose value changed, when the change is enumerator additions
/// and value changes and nothing else.
///
/// A removal, a size change or any change to a non-enum type gives `None`.
fn changed_enumerators(diff: &TypeDiff) -> Option<Vec<&str>>
{
    if !diff.children.is_empty() || diff.changes.is_empty() {
        return None;
    }
    let mut changed = Vec::new();
    for change in &diff.changes {
        match change {
            TypeChangeDetail::EnumeratorValue { name, .. } => changed.push(name.as_str()),
            TypeChangeDetail::EnumeratorAdded { .. } => {}
            _ => return None,
        }
    }
    Some(changed)
}
