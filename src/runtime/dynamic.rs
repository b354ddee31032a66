//! Destinations shaped at runtime from a generated field tree.
//!
//! Lets a response be decoded against an operation without compiling the
//! rendered structs: each [`Field`] becomes one member, fragment spreads and
//! inline fragments stay embedded and receive keys through fan-out.
use serde_json::{Map, Number};

use super::target::{Destination, Embed, Member, OptionalTarget, Scalar, ScalarTarget, SequenceTarget, StructTarget, Target};
use crate::ir::{Field, FieldKind, Operation, TargetType};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Leaf(Leaf),
    List(List),
    Nullable(Nullable),
    Record(Record),
}

impl Value {
    pub fn for_operation(operation: &Operation) -> Value {
        Value::for_fields(&operation.fields)
    }

    pub fn for_fields(fields: &[Field]) -> Value {
        Value::Record(Record::for_fields(fields))
    }

    /// Empty value of type `ty`; `children` shape any struct at its base.
    pub fn for_type(ty: &TargetType, children: &[Field]) -> Value {
        match ty {
            TargetType::Leaf(name) | TargetType::Named(name) => Value::Leaf(Leaf {
                ty: name.clone(),
                value: serde_json::Value::Null,
            }),
            TargetType::Struct(_) | TargetType::Fragment(_) => Value::Record(Record::for_fields(children)),
            TargetType::List(inner) => Value::List(List {
                template: Box::new(Value::for_type(inner, children)),
                items: Vec::new(),
            }),
            TargetType::Optional(inner) => Value::Nullable(Nullable {
                template: Box::new(Value::for_type(inner, children)),
                value: None,
            }),
        }
    }

    /// Plain JSON with embedded members flattened into their parent object.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Leaf(leaf) => leaf.value.clone(),
            Value::List(list) => serde_json::Value::Array(list.items.iter().map(Value::to_json).collect()),
            Value::Nullable(nullable) => nullable.value.as_ref().map_or(serde_json::Value::Null, |v| v.to_json()),
            Value::Record(record) => {
                let mut object = Map::new();
                record.flatten_into(&mut object);
                serde_json::Value::Object(object)
            }
        }
    }

    fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            Value::Nullable(nullable) => nullable.value.as_deref().and_then(Value::as_record),
            Value::Leaf(_) | Value::List(_) => None,
        }
    }
}

impl Destination for Value {
    fn target(&mut self) -> Target<'_> {
        match self {
            Value::Leaf(leaf) => Target::Scalar(leaf),
            Value::List(list) => Target::Sequence(list),
            Value::Nullable(nullable) => Target::Optional(nullable),
            Value::Record(record) => Target::Struct(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// Rendered type name; built-ins are checked, everything else is taken as is.
    ty: String,
    value: serde_json::Value,
}

impl ScalarTarget for Leaf {
    fn assign(&mut self, value: Scalar<'_>) -> Result<(), String> {
        let accepted = match (self.ty.as_str(), value) {
            (_, Scalar::Null) => return Ok(()),
            ("bool", Scalar::Bool(_)) => true,
            ("bool", _) => false,
            ("i32", Scalar::Int(i)) => i32::try_from(i).is_ok(),
            ("i32", _) => false,
            ("f64", Scalar::Int(_) | Scalar::UInt(_) | Scalar::Float(_)) => true,
            ("f64", _) => false,
            ("String", Scalar::String(_)) => true,
            ("String", _) => false,
            _ => true,
        };
        if !accepted {
            return Err(format!("expected {}, found {} `{value}`", self.ty, value.kind()));
        }
        self.value = match value {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Bool(b) => b.into(),
            Scalar::Int(i) => i.into(),
            Scalar::UInt(u) => u.into(),
            Scalar::Float(f) => Number::from_f64(f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| format!("{f} is not a finite number"))?,
            Scalar::String(s) => s.into(),
        };
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    template: Box<Value>,
    items: Vec<Value>,
}

impl SequenceTarget for List {
    fn clear(&mut self) {
        self.items.clear();
    }

    fn push_default(&mut self) -> &mut (dyn Destination + 'static) {
        let index = self.items.len();
        self.items.push((*self.template).clone());
        &mut self.items[index]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Nullable {
    template: Box<Value>,
    value: Option<Box<Value>>,
}

impl OptionalTarget for Nullable {
    fn set_none(&mut self) {
        self.value = None;
    }

    fn get_or_insert_default(&mut self) -> &mut (dyn Destination + 'static) {
        let template = &self.template;
        &mut **self.value.get_or_insert_with(|| template.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MemberSpec {
    name: String,
    embed: Embed,
}

/// Specs and values live side by side so members can borrow each value mutably.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    specs: Vec<MemberSpec>,
    values: Vec<Value>,
}

impl Record {
    pub fn for_fields(fields: &[Field]) -> Record {
        let specs = fields
            .iter()
            .map(|field| MemberSpec {
                name: field.name.clone(),
                embed: match field.kind {
                    FieldKind::FragmentSpread => Embed::FragmentSpread,
                    FieldKind::InlineFragment => Embed::InlineFragment,
                    FieldKind::Scalar | FieldKind::Object => Embed::None,
                },
            })
            .collect();
        let values = fields
            .iter()
            .map(|field| Value::for_type(&field.ty, &field.children))
            .collect();
        Record { specs, values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.specs
            .iter()
            .position(|spec| spec.name == name)
            .map(|index| &self.values[index])
    }

    fn flatten_into(&self, object: &mut Map<String, serde_json::Value>) {
        for (spec, value) in self.specs.iter().zip(&self.values) {
            if spec.embed.is_embedded() {
                if let Some(record) = value.as_record() {
                    record.flatten_into(object);
                }
            } else {
                object.insert(spec.name.clone(), value.to_json());
            }
        }
    }
}

impl StructTarget for Record {
    fn members(&mut self) -> Vec<Member<'_>> {
        self.specs
            .iter()
            .zip(self.values.iter_mut())
            .map(|(spec, slot)| Member {
                name: &spec.name,
                graphql_tag: Some(&spec.name),
                json_tag: None,
                embed: spec.embed,
                slot,
            })
            .collect()
    }
}
