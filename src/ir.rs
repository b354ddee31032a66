//! Strongly-typed response model handed to renderers. No apollo types here.

use serde::Serialize;

/// Resolved type of one struct member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum TargetType {
    /// Mapped scalar (`String`, `i32`, user-supplied type, ...).
    Leaf(String),
    /// Schema enum or input object, referenced by name.
    Named(String),
    /// Struct synthesized for a selection set.
    Struct(String),
    /// Struct owned by a named fragment.
    Fragment(String),
    List(Box<TargetType>),
    Optional(Box<TargetType>),
}

impl TargetType {
    /// Name of the generated struct this type points at, through wrappers.
    pub fn struct_name(&self) -> Option<&str> {
        match self {
            TargetType::Struct(name) | TargetType::Fragment(name) => Some(name),
            TargetType::List(inner) | TargetType::Optional(inner) => inner.struct_name(),
            TargetType::Leaf(_) | TargetType::Named(_) => None,
        }
    }

    /// Innermost type with every list/optional wrapper peeled off.
    pub fn base(&self) -> &TargetType {
        match self {
            TargetType::List(inner) | TargetType::Optional(inner) => inner.base(),
            other => other,
        }
    }

    /// Same wrapper chain around a different base.
    pub fn rebase(&self, base: TargetType) -> TargetType {
        match self {
            TargetType::List(inner) => TargetType::List(Box::new(inner.rebase(base))),
            TargetType::Optional(inner) => TargetType::Optional(Box::new(inner.rebase(base))),
            _ => base,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar,
    Object,
    FragmentSpread,
    InlineFragment,
}

impl FieldKind {
    /// Embedded members contribute their children to the parent's JSON object.
    pub fn is_embedded(self) -> bool {
        matches!(self, FieldKind::FragmentSpread | FieldKind::InlineFragment)
    }
}

/// One emitted struct member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Field {
    /// Response key (alias or field name); fragment name / `On<Type>` for embedded members.
    pub name: String,
    pub ident: String,
    pub ty: TargetType,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Field>,
}

/// A uniquely-named generated struct: one level of a response tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedType {
    pub name: String,
    pub fields: Vec<Field>,
}

impl NamedType {
    /// Struct names this type's members point at.
    pub fn references(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().filter_map(|f| f.ty.struct_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn suffix(self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub name: String,
    pub ident: String,
    pub ty: TargetType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub name: String,
    pub kind: OperationKind,
    pub type_name: String,
    pub arguments: Vec<Argument>,
    pub fields: Vec<Field>,
    /// Operation text plus every fragment it spreads.
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub name: String,
    pub type_condition: String,
    pub type_name: String,
    pub fields: Vec<Field>,
}

/// Everything a renderer needs: emitted types in dependency order plus the roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generated {
    pub types: Vec<NamedType>,
    pub fragments: Vec<Fragment>,
    pub operations: Vec<Operation>,
}

impl Generated {
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn named_type(&self, name: &str) -> Option<&NamedType> {
        self.types.iter().find(|ty| ty.name == name)
    }
}
