//! GraphQL type references → target types.
use apollo_compiler::Schema;
use apollo_compiler::ast::Type;
use apollo_compiler::schema::ExtendedType;
use heck::ToUpperCamelCase;
use indexmap::IndexMap;

use crate::error::BuildError;
use crate::ir::TargetType;

pub struct TypeResolver<'a> {
    schema: &'a Schema,
    scalars: IndexMap<String, String>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(schema: &'a Schema, scalars: IndexMap<String, String>) -> Self {
        Self { schema, scalars }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Leaf (scalar/enum/input) type with its list and null modifiers applied.
    pub fn resolve(&self, ty: &Type) -> Result<TargetType, BuildError> {
        let base = self.resolve_named(ty.inner_named_type().as_str())?;
        Ok(wrap(ty, base))
    }

    /// Panics on names the schema does not define; validated documents never reach that.
    pub fn resolve_named(&self, name: &str) -> Result<TargetType, BuildError> {
        let Some(definition) = self.schema.types.get(name) else {
            panic!("type `{name}` is not defined in the schema");
        };
        match definition {
            ExtendedType::Scalar(_) => self
                .scalars
                .get(name)
                .map(|ty| TargetType::Leaf(ty.clone()))
                .ok_or_else(|| BuildError::UnmappedScalar { scalar: name.to_string() }),
            ExtendedType::Enum(_) | ExtendedType::InputObject(_) => {
                Ok(TargetType::Named(name.to_upper_camel_case()))
            }
            ExtendedType::Object(_) | ExtendedType::Interface(_) | ExtendedType::Union(_) => {
                panic!("composite type `{name}` resolved as a leaf")
            }
        }
    }
}

/// Applies the modifier chain of `ty` around `base`, outermost first:
/// nullable → `Optional`, list → `List`.
pub fn wrap(ty: &Type, base: TargetType) -> TargetType {
    match ty {
        Type::Named(_) => TargetType::Optional(Box::new(base)),
        Type::NonNullNamed(_) => base,
        Type::List(item) => TargetType::Optional(Box::new(TargetType::List(Box::new(wrap(item, base))))),
        Type::NonNullList(item) => TargetType::List(Box::new(wrap(item, base))),
    }
}
