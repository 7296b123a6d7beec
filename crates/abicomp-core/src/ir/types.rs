//! # Type Graph
//!
//! Arena of the types a corpus declares. Types refer to each other through
//! [`TypeId`], so recursive types (a struct holding a pointer to itself) are
//! plain cycles in the arena rather than reference-counted loops.
//!
//! ## Naming
//!
//! [`TypeGraph::type_name`] renders the C spelling of a type:
//! `const char*`, `struct node`, `int[4]`, `int (int, char*)`. Suppressions
//! match against these names.

use std::fmt::Write as _;

use bitflags::bitflags;

use crate::suppression::TypeKind;
use crate::types::SourceLocation;

/// Index of a type in its [`TypeGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId
{
    /// Position of the type in the graph.
    pub fn index(self) -> usize
    {
        self.0
    }
}

bitflags! {
    /// cv-qualifiers of a [`Type::Qualified`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Qualifiers: u8 {
        const CONST = 1;
        const VOLATILE = 1 << 1;
        const RESTRICT = 1 << 2;
    }
}

impl Qualifiers
{
    fn spelling(self) -> String
    {
        let mut words = Vec::new();
        if self.contains(Qualifiers::CONST) {
            words.push("const");
        }
        if self.contains(Qualifiers::VOLATILE) {
            words.push("volatile");
        }
        if self.contains(Qualifiers::RESTRICT) {
            words.push("restrict");
        }
        words.join(" ")
    }
}

/// Flavour of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind
{
    Struct,
    Class,
    Union,
}

impl RecordKind
{
    pub fn keyword(self) -> &'static str
    {
        match self {
            RecordKind::Struct => "struct",
            RecordKind::Class => "class",
            RecordKind::Union => "union",
        }
    }
}

/// A data member of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMember
{
    pub name: String,
    pub type_id: TypeId,
    pub offset_in_bits: u64,
}

impl DataMember
{
    pub fn new(name: impl Into<String>, type_id: TypeId, offset_in_bits: u64) -> Self
    {
        Self {
            name: name.into(),
            type_id,
            offset_in_bits,
        }
    }
}

/// struct, class or union.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType
{
    pub kind: RecordKind,
    pub name: String,
    pub size_in_bits: u64,
    pub members: Vec<DataMember>,
    /// Only a forward declaration was seen
    pub declaration_only: bool,
    pub location: Option<SourceLocation>,
}

impl RecordType
{
    pub fn new(kind: RecordKind, name: impl Into<String>, size_in_bits: u64) -> Self
    {
        Self {
            kind,
            name: name.into(),
            size_in_bits,
            members: Vec::new(),
            declaration_only: false,
            location: None,
        }
    }

    #[must_use]
    pub fn member(mut self, member: DataMember) -> Self
    {
        self.members.push(member);
        self
    }

    #[must_use]
    pub fn declaration_only(mut self, value: bool) -> Self
    {
        self.declaration_only = value;
        self
    }

    #[must_use]
    pub fn location(mut self, location: SourceLocation) -> Self
    {
        self.location = Some(location);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerator
{
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType
{
    pub name: String,
    pub size_in_bits: u64,
    pub enumerators: Vec<Enumerator>,
    pub location: Option<SourceLocation>,
}

impl EnumType
{
    pub fn new(name: impl Into<String>, size_in_bits: u64) -> Self
    {
        Self {
            name: name.into(),
            size_in_bits,
            enumerators: Vec::new(),
            location: None,
        }
    }

    #[must_use]
    pub fn enumerator(mut self, name: impl Into<String>, value: i64) -> Self
    {
        self.enumerators.push(Enumerator {
            name: name.into(),
            value,
        });
        self
    }

    #[must_use]
    pub fn location(mut self, location: SourceLocation) -> Self
    {
        self.location = Some(location);
        self
    }
}

/// Signature of a function, as pointed to by function pointers.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType
{
    pub return_type: TypeId,
    pub parameters: Vec<TypeId>,
    pub variadic: bool,
}

/// One node of the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Type
{
    Void,
    Builtin
    {
        name: String,
        size_in_bits: u64,
    },
    Pointer
    {
        pointee: TypeId,
    },
    Reference
    {
        referenced: TypeId,
        rvalue: bool,
    },
    Qualified
    {
        underlying: TypeId,
        qualifiers: Qualifiers,
    },
    Typedef
    {
        name: String,
        underlying: TypeId,
        location: Option<SourceLocation>,
    },
    Array
    {
        element: TypeId,
        /// `None` for `T[]`
        count: Option<u64>,
    },
    Record(RecordType),
    Enum(EnumType),
    Function(FunctionType),
}

impl Type
{
    /// Short description of the node's shape, used when two types differ in
    /// kind.
    pub fn shape(&self) -> &'static str
    {
        match self {
            Type::Void => "void",
            Type::Builtin { .. } => "builtin type",
            Type::Pointer { .. } => "pointer type",
            Type::Reference { .. } => "reference type",
            Type::Qualified { .. } => "qualified type",
            Type::Typedef { .. } => "typedef",
            Type::Array { .. } => "array type",
            Type::Record(record) => record.kind.keyword(),
            Type::Enum(_) => "enum",
            Type::Function(_) => "function type",
        }
    }
}

/// All types of one corpus.
#[derive(Debug, Clone)]
pub struct TypeGraph
{
    nodes: Vec<Type>,
    pointer_size_in_bits: u64,
}

impl Default for TypeGraph
{
    fn default() -> Self
    {
        Self::new(64)
    }
}

impl TypeGraph
{
    pub fn new(pointer_size_in_bits: u64) -> Self
    {
        Self {
            nodes: Vec::new(),
            pointer_size_in_bits,
        }
    }

    /// Add a node and return its id.
    pub fn add(&mut self, ty: Type) -> TypeId
    {
        let id = TypeId(self.nodes.len());
        self.nodes.push(ty);
        id
    }

    /// Replace the node behind `id`.
    ///
    /// Producers use this to close cycles: add a declaration-only record,
    /// build the types that point to it, then fill it in.
    pub fn replace(&mut self, id: TypeId, ty: Type)
    {
        self.nodes[id.0] = ty;
    }

    pub fn get(&self, id: TypeId) -> &Type
    {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize
    {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.nodes.is_empty()
    }

    pub fn pointer_size_in_bits(&self) -> u64
    {
        self.pointer_size_in_bits
    }

    pub fn void(&mut self) -> TypeId
    {
        self.add(Type::Void)
    }

    pub fn builtin(&mut self, name: impl Into<String>, size_in_bits: u64) -> TypeId
    {
        self.add(Type::Builtin {
            name: name.into(),
            size_in_bits,
        })
    }

    pub fn pointer_to(&mut self, pointee: TypeId) -> TypeId
    {
        self.add(Type::Pointer { pointee })
    }

    pub fn reference_to(&mut self, referenced: TypeId, rvalue: bool) -> TypeId
    {
        self.add(Type::Reference { referenced, rvalue })
    }

    pub fn qualified(&mut self, underlying: TypeId, qualifiers: Qualifiers) -> TypeId
    {
        self.add(Type::Qualified { underlying, qualifiers })
    }

    pub fn typedef(&mut self, name: impl Into<String>, underlying: TypeId) -> TypeId
    {
        self.add(Type::Typedef {
            name: name.into(),
            underlying,
            location: None,
        })
    }

    pub fn array_of(&mut self, element: TypeId, count: Option<u64>) -> TypeId
    {
        self.add(Type::Array { element, count })
    }

    pub fn record(&mut self, record: RecordType) -> TypeId
    {
        self.add(Type::Record(record))
    }

    pub fn enumeration(&mut self, enumeration: EnumType) -> TypeId
    {
        self.add(Type::Enum(enumeration))
    }

    pub fn function_type(&mut self, return_type: TypeId, parameters: Vec<TypeId>, variadic: bool) -> TypeId
    {
        self.add(Type::Function(FunctionType {
            return_type,
            parameters,
            variadic,
        }))
    }

    /// C spelling of a type.
    pub fn type_name(&self, id: TypeId) -> String
    {
        let mut visiting = Vec::new();
        self.render(id, &mut visiting)
    }

    fn render(&self, id: TypeId, visiting: &mut Vec<TypeId>) -> String
    {
        // Only named types can close a cycle, and those render without
        // recursing, so this is purely a guard against malformed graphs.
        if visiting.contains(&id) {
            return String::from("<cycle>");
        }
        visiting.push(id);
        let name = match self.get(id) {
            Type::Void => String::from("void"),
            Type::Builtin { name, .. } | Type::Typedef { name, .. } => name.clone(),
            Type::Record(record) => format!("{} {}", record.kind.keyword(), record.name),
            Type::Enum(enumeration) => format!("enum {}", enumeration.name),
            Type::Pointer { pointee } => match self.get(*pointee) {
                Type::Function(function) => self.render_function(function, "(*)", visiting),
                _ => format!("{}*", self.render(*pointee, visiting)),
            },
            Type::Reference { referenced, rvalue } => {
                let sigil = if *rvalue { "&&" } else { "&" };
                format!("{}{sigil}", self.render(*referenced, visiting))
            }
            Type::Qualified { underlying, qualifiers } => {
                let inner = self.render(*underlying, visiting);
                // `char* const`, but `const char`
                if matches!(self.get(*underlying), Type::Pointer { .. } | Type::Reference { .. }) {
                    format!("{inner} {}", qualifiers.spelling())
                } else {
                    format!("{} {inner}", qualifiers.spelling())
                }
            }
            Type::Array { element, count } => {
                let inner = self.render(*element, visiting);
                match count {
                    Some(count) => format!("{inner}[{count}]"),
                    None => format!("{inner}[]"),
                }
            }
            Type::Function(function) => self.render_function(function, "", visiting),
        };
        visiting.pop();
        name
    }

    fn render_function(&self, function: &FunctionType, declarator: &str, visiting: &mut Vec<TypeId>) -> String
    {
        let mut out = self.render(function.return_type, visiting);
        out.push(' ');
        out.push_str(declarator);
        out.push('(');
        for (i, parameter) in function.parameters.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&self.render(*parameter, visiting));
        }
        if function.variadic {
            if !function.parameters.is_empty() {
                out.push_str(", ");
            }
            out.push_str("...");
        }
        out.push(')');
        out
    }

    /// Size of a type in bits, following typedefs and qualifiers.
    ///
    /// `None` for `void`, function types and arrays of unknown bound.
    pub fn size_in_bits(&self, id: TypeId) -> Option<u64>
    {
        let mut current = id;
        // A chain of typedefs and qualifiers cannot be longer than the graph.
        for _ in 0..=self.nodes.len() {
            match self.get(current) {
                Type::Void | Type::Function(_) => return None,
                Type::Builtin { size_in_bits, .. } => return Some(*size_in_bits),
                Type::Pointer { .. } | Type::Reference { .. } => return Some(self.pointer_size_in_bits),
                Type::Record(record) => return Some(record.size_in_bits),
                Type::Enum(enumeration) => return Some(enumeration.size_in_bits),
                Type::Array { element, count } => {
                    return count.and_then(|count| self.size_in_bits(*element).map(|size| size * count));
                }
                Type::Qualified { underlying, .. } | Type::Typedef { underlying, .. } => current = *underlying,
            }
        }
        None
    }

    /// Where the type is declared, if it is a named type that records it.
    pub fn location(&self, id: TypeId) -> Option<&SourceLocation>
    {
        match self.get(id) {
            Type::Record(record) => record.location.as_ref(),
            Type::Enum(enumeration) => enumeration.location.as_ref(),
            Type::Typedef { location, .. } => location.as_ref(),
            _ => None,
        }
    }

    /// The kind a type suppression's `type_kind` property refers to.
    pub fn suppression_kind(&self, id: TypeId) -> Option<TypeKind>
    {
        match self.get(id) {
            Type::Record(record) => Some(match record.kind {
                RecordKind::Struct => TypeKind::Struct,
                RecordKind::Class => TypeKind::Class,
                RecordKind::Union => TypeKind::Union,
            }),
            Type::Enum(_) => Some(TypeKind::Enum),
            Type::Array { .. } => Some(TypeKind::Array),
            Type::Typedef { .. } => Some(TypeKind::Typedef),
            Type::Builtin { .. } => Some(TypeKind::Builtin),
            _ => None,
        }
    }

    /// Render `return name(params)` for a function declaration.
    pub fn signature(&self, name: &str, return_type: TypeId, parameters: &[TypeId]) -> String
    {
        let mut out = self.type_name(return_type);
        let _ = write!(out, " {name}(");
        for (i, parameter) in parameters.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&self.type_name(*parameter));
        }
        out.push(')');
        out
    }
}
