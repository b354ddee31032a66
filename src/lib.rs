//! GraphQL client generation core.
//!
//! Generation turns a validated schema and query document into a [`Generated`]
//! plan: every selection set becomes a uniquely named struct, fragment
//! spreads mixed with other selections are flattened, and the registry emits
//! the surviving structs in dependency order. The [`runtime`] module decodes
//! responses into such shapes in one streaming pass.
pub mod build;
pub mod config;
pub mod error;
pub mod generate;
pub mod ir;
pub mod registry;
pub mod render;
pub mod resolve;
pub mod runtime;

pub use config::GeneratorConfig;
pub use error::{BuildError, ConfigError, GenerateError};
pub use generate::{generate, load_document, load_schema};
pub use ir::{Field, FieldKind, Fragment, Generated, NamedType, Operation, TargetType};
