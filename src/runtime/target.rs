//! Destinations the response decoder writes into.
//!
//! Every destination reports one of a closed set of kinds through
//! [`Destination::target`]; the decoder dispatches on that instead of
//! inspecting concrete types.
use std::fmt;

use indexmap::IndexMap;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A JSON scalar as the decoder saw it. Integers are tried before floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    String(&'a str),
}

impl Scalar<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Int(_) | Scalar::UInt(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::String(_) => "string",
        }
    }
}

impl fmt::Display for Scalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::UInt(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::String(v) => write!(f, "{v:?}"),
        }
    }
}

pub enum Target<'a> {
    Struct(&'a mut dyn StructTarget),
    Sequence(&'a mut dyn SequenceTarget),
    Map(&'a mut dyn MapTarget),
    Optional(&'a mut dyn OptionalTarget),
    Scalar(&'a mut dyn ScalarTarget),
    Custom(&'a mut dyn UnmarshalGraphql),
}

impl Target<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Target::Struct(_) => "struct",
            Target::Sequence(_) => "sequence",
            Target::Map(_) => "map",
            Target::Optional(_) => "optional",
            Target::Scalar(_) => "scalar",
            Target::Custom(_) => "custom scalar",
        }
    }
}

pub trait Destination {
    fn target(&mut self) -> Target<'_>;
}

/// How a struct member takes part in decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Embed {
    /// Matched against object keys.
    #[default]
    None,
    /// `...Fragment`: its own members are matched instead.
    FragmentSpread,
    /// `... on Type`: its own members are matched instead.
    InlineFragment,
    /// Anonymous substruct, flattened like a fragment.
    Anonymous,
}

impl Embed {
    pub fn is_embedded(self) -> bool {
        !matches!(self, Embed::None)
    }
}

pub struct Member<'a> {
    pub name: &'a str,
    /// Selection key; checked first.
    pub graphql_tag: Option<&'a str>,
    /// Generic serialization name (`name,omitempty` style options are ignored).
    pub json_tag: Option<&'a str>,
    pub embed: Embed,
    pub slot: &'a mut (dyn Destination + 'static),
}

impl Member<'_> {
    /// Wire-name match: GraphQL tag, then JSON tag, then case-insensitive member name.
    pub fn matches(&self, key: &str) -> bool {
        if self.embed.is_embedded() {
            return false;
        }
        if let Some(tag) = self.graphql_tag {
            return tag == key;
        }
        if let Some(tag) = self.json_tag {
            return tag.split(',').next() == Some(key);
        }
        self.name.eq_ignore_ascii_case(key)
    }
}

pub trait StructTarget {
    /// All members with disjoint mutable slots.
    fn members(&mut self) -> Vec<Member<'_>>;
}

pub trait SequenceTarget {
    fn clear(&mut self);
    /// Appends a default element and returns it.
    fn push_default(&mut self) -> &mut (dyn Destination + 'static);
}

pub trait MapTarget {
    fn clear(&mut self);
    /// Inserts (or reuses) the entry for `key`.
    fn entry(&mut self, key: &str) -> &mut (dyn Destination + 'static);
}

pub trait OptionalTarget {
    fn set_none(&mut self);
    fn get_or_insert_default(&mut self) -> &mut (dyn Destination + 'static);
}

pub trait ScalarTarget {
    /// `null` leaves the value untouched.
    fn assign(&mut self, value: Scalar<'_>) -> Result<(), String>;
}

/// Custom scalar hook; receives the raw scalar, including `null`.
pub trait UnmarshalGraphql {
    fn unmarshal_graphql(&mut self, value: Scalar<'_>) -> Result<(), BoxError>;
}

// ------------------------------ std impls -------------------------------- //

fn mismatch(expected: &str, found: Scalar<'_>) -> String {
    format!("expected {expected}, found {} `{found}`", found.kind())
}

impl Destination for String {
    fn target(&mut self) -> Target<'_> {
        Target::Scalar(self)
    }
}

impl ScalarTarget for String {
    fn assign(&mut self, value: Scalar<'_>) -> Result<(), String> {
        match value {
            Scalar::String(s) => {
                self.clear();
                self.push_str(s);
                Ok(())
            }
            Scalar::Null => Ok(()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl Destination for bool {
    fn target(&mut self) -> Target<'_> {
        Target::Scalar(self)
    }
}

impl ScalarTarget for bool {
    fn assign(&mut self, value: Scalar<'_>) -> Result<(), String> {
        match value {
            Scalar::Bool(b) => {
                *self = b;
                Ok(())
            }
            Scalar::Null => Ok(()),
            other => Err(mismatch("boolean", other)),
        }
    }
}

macro_rules! integer_targets {
    ($($ty:ty),* $(,)?) => {$(
        impl Destination for $ty {
            fn target(&mut self) -> Target<'_> {
                Target::Scalar(self)
            }
        }

        impl ScalarTarget for $ty {
            fn assign(&mut self, value: Scalar<'_>) -> Result<(), String> {
                let converted = match value {
                    Scalar::Int(i) => <$ty>::try_from(i).ok(),
                    Scalar::UInt(u) => <$ty>::try_from(u).ok(),
                    Scalar::Null => return Ok(()),
                    other => return Err(mismatch(stringify!($ty), other)),
                };
                *self = converted
                    .ok_or_else(|| format!("{value} is out of range for {}", stringify!($ty)))?;
                Ok(())
            }
        }
    )*};
}

integer_targets!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

macro_rules! float_targets {
    ($($ty:ty),* $(,)?) => {$(
        impl Destination for $ty {
            fn target(&mut self) -> Target<'_> {
                Target::Scalar(self)
            }
        }

        impl ScalarTarget for $ty {
            fn assign(&mut self, value: Scalar<'_>) -> Result<(), String> {
                *self = match value {
                    Scalar::Int(i) => i as $ty,
                    Scalar::UInt(u) => u as $ty,
                    Scalar::Float(f) => f as $ty,
                    Scalar::Null => return Ok(()),
                    other => return Err(mismatch(stringify!($ty), other)),
                };
                Ok(())
            }
        }
    )*};
}

float_targets!(f32, f64);

impl<T: Destination + Default + 'static> Destination for Option<T> {
    fn target(&mut self) -> Target<'_> {
        Target::Optional(self)
    }
}

impl<T: Destination + Default + 'static> OptionalTarget for Option<T> {
    fn set_none(&mut self) {
        *self = None;
    }

    fn get_or_insert_default(&mut self) -> &mut (dyn Destination + 'static) {
        self.get_or_insert_with(T::default)
    }
}

impl<T: Destination + Default + 'static> Destination for Vec<T> {
    fn target(&mut self) -> Target<'_> {
        Target::Sequence(self)
    }
}

impl<T: Destination + Default + 'static> SequenceTarget for Vec<T> {
    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn push_default(&mut self) -> &mut (dyn Destination + 'static) {
        let index = self.len();
        self.push(T::default());
        &mut self[index]
    }
}

impl<T: Destination + Default + 'static> Destination for IndexMap<String, T> {
    fn target(&mut self) -> Target<'_> {
        Target::Map(self)
    }
}

impl<T: Destination + Default + 'static> MapTarget for IndexMap<String, T> {
    fn clear(&mut self) {
        IndexMap::clear(self);
    }

    fn entry(&mut self, key: &str) -> &mut (dyn Destination + 'static) {
        IndexMap::entry(self, key.to_string()).or_default()
    }
}
