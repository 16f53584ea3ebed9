// types.rs: Flow IR value types and the type-rules oracle
//
// `Type` is the fully-assigned type of an endpoint, variable or expression.
// The checker never decides type equality or castability on its own; it asks
// a `TypeRules` implementation. `StandardTypeRules` is the default used by
// the driver and the tests.
//
// Preconditions: none (pure functions over types).
// Postconditions: none.
// Failure modes: none.
// Side effects: none.

use std::fmt;

// ── Types ───────────────────────────────────────────────────────────────────

/// Scalar element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Void,
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
}

/// A value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(Primitive),
    /// Fixed-width SIMD-style vector, e.g. `float32<4>`.
    Vector(Primitive, u32),
    /// Fixed-size array, e.g. `float32[8]`.
    Array(Box<Type>, u32),
    /// Reference to a value, e.g. `float32&`.
    Reference(Box<Type>),
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Void => "void",
            Primitive::Bool => "bool",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::Float32 => "float32",
            Primitive::Float64 => "float64",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "void" => Some(Primitive::Void),
            "bool" => Some(Primitive::Bool),
            "int32" => Some(Primitive::Int32),
            "int64" => Some(Primitive::Int64),
            "float32" => Some(Primitive::Float32),
            "float64" => Some(Primitive::Float64),
            _ => None,
        }
    }
}

impl Type {
    pub const VOID: Type = Type::Primitive(Primitive::Void);
    pub const BOOL: Type = Type::Primitive(Primitive::Bool);
    pub const INT32: Type = Type::Primitive(Primitive::Int32);
    pub const INT64: Type = Type::Primitive(Primitive::Int64);
    pub const FLOAT32: Type = Type::Primitive(Primitive::Float32);
    pub const FLOAT64: Type = Type::Primitive(Primitive::Float64);

    pub fn array_of(element: Type, size: u32) -> Type {
        Type::Array(Box::new(element), size)
    }

    pub fn reference_to(target: Type) -> Type {
        Type::Reference(Box::new(target))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Void))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(..))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Reference(_))
    }

    /// Element type of an array, `None` for anything else.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(element, _) => Some(element),
            _ => None,
        }
    }

    /// Strip one level of reference, if any.
    pub fn dereferenced(&self) -> &Type {
        match self {
            Type::Reference(target) => target,
            other => other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p.name()),
            Type::Vector(p, n) => write!(f, "{}<{}>", p.name(), n),
            Type::Array(element, n) => write!(f, "{}[{}]", element, n),
            Type::Reference(target) => write!(f, "{}&", target),
        }
    }
}

// ── Oracle ──────────────────────────────────────────────────────────────────

/// How strictly two types are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equality {
    Exact,
    /// `T<1>` and `T` compare equal.
    IgnoreVectorSize1,
}

/// The type-system predicates the checker relies on.
pub trait TypeRules {
    fn is_equal(&self, a: &Type, b: &Type, equality: Equality) -> bool;

    /// Can a value of type `source` be used where `target` is expected,
    /// without explicit conversion syntax?
    fn can_silently_cast_to(&self, target: &Type, source: &Type) -> bool;
}

/// Default rules: exact structural equality plus a numeric widening chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTypeRules;

/// Safe implicit widening chain: int32 → int64 → float64, float32 → float64.
/// `bool` and `void` never widen.
fn widening_rank(p: Primitive) -> Option<u8> {
    match p {
        Primitive::Int32 => Some(0),
        Primitive::Int64 => Some(1),
        Primitive::Float32 => Some(1),
        Primitive::Float64 => Some(2),
        Primitive::Bool | Primitive::Void => None,
    }
}

/// Check if a `from` scalar can be widened to `to` without loss.
pub fn can_widen(from: Primitive, to: Primitive) -> bool {
    if from == to {
        return true;
    }
    // int64 → float32 loses precision, int32 → float32 as well
    if to == Primitive::Float32 {
        return false;
    }
    match (widening_rank(from), widening_rank(to)) {
        (Some(rank_from), Some(rank_to)) => rank_from < rank_to,
        _ => false,
    }
}

impl StandardTypeRules {
    fn normalise(t: &Type, equality: Equality) -> Type {
        match (t, equality) {
            (Type::Vector(p, 1), Equality::IgnoreVectorSize1) => Type::Primitive(*p),
            _ => t.clone(),
        }
    }
}

impl TypeRules for StandardTypeRules {
    fn is_equal(&self, a: &Type, b: &Type, equality: Equality) -> bool {
        match (a, b) {
            (Type::Array(ea, na), Type::Array(eb, nb)) => {
                na == nb && self.is_equal(ea, eb, equality)
            }
            (Type::Reference(ta), Type::Reference(tb)) => self.is_equal(ta, tb, equality),
            _ => Self::normalise(a, equality) == Self::normalise(b, equality),
        }
    }

    fn can_silently_cast_to(&self, target: &Type, source: &Type) -> bool {
        let target = target.dereferenced();
        let source = source.dereferenced();

        if self.is_equal(target, source, Equality::IgnoreVectorSize1) {
            return true;
        }

        match (target, source) {
            (Type::Primitive(to), Type::Primitive(from)) => can_widen(*from, *to),
            (Type::Vector(to, n), Type::Vector(from, m)) => n == m && can_widen(*from, *to),
            // Scalars broadcast into every lane.
            (Type::Vector(to, _), Type::Primitive(from)) => can_widen(*from, *to),
            (Type::Array(to, n), Type::Array(from, m)) => {
                n == m && self.is_equal(to, from, Equality::IgnoreVectorSize1)
            }
            _ => false,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
