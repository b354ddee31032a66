//! Whole-document generation: fragments first, then operations.
use std::collections::HashSet;

use apollo_compiler::ast::OperationType;
use apollo_compiler::executable::{self, Selection, SelectionSet};
use apollo_compiler::validation::Valid;
use apollo_compiler::{ExecutableDocument, Schema};
use heck::{ToSnakeCase, ToUpperCamelCase};
use tracing::{debug, info};

use crate::build::{Builder, fragment_type_name};
use crate::config::GeneratorConfig;
use crate::error::GenerateError;
use crate::ir::{Argument, Fragment, Generated, Operation, OperationKind};
use crate::registry::Registry;
use crate::resolve::TypeResolver;

pub fn load_schema(source: &str, path: &str) -> Result<Valid<Schema>, GenerateError> {
    Schema::parse_and_validate(source, path).map_err(|invalid| GenerateError::Schema(invalid.errors.to_string()))
}

pub fn load_document(
    schema: &Valid<Schema>,
    source: &str,
    path: &str,
) -> Result<Valid<ExecutableDocument>, GenerateError> {
    ExecutableDocument::parse_and_validate(schema, source, path)
        .map_err(|invalid| GenerateError::Document(invalid.errors.to_string()))
}

pub fn generate(
    schema: &Valid<Schema>,
    document: &Valid<ExecutableDocument>,
    config: &GeneratorConfig,
) -> Result<Generated, GenerateError> {
    let resolver = TypeResolver::new(schema, config.scalar_table());
    let mut registry = Registry::new();

    let mut fragments = Vec::with_capacity(document.fragments.len());
    for (name, fragment) in &document.fragments {
        debug!(fragment = %name, "building fragment");
        let type_name = fragment_type_name(name.as_str());
        let fields = Builder::new(&resolver, document, &mut registry)
            .fragment_fields(name.as_str())
            .map_err(|source| GenerateError::Fragment {
                name: name.to_string(),
                source,
            })?;
        fragments.push(Fragment {
            name: name.to_string(),
            type_condition: fragment.type_condition().to_string(),
            type_name,
            fields,
        });
    }

    let mut operations = Vec::new();
    for operation in document.operations.iter() {
        let Some(name) = operation.name.as_ref().map(|n| n.to_string()) else {
            return Err(GenerateError::AnonymousOperation);
        };
        debug!(operation = %name, "building operation");
        let kind = operation_kind(operation);
        let type_name = root_type_name(&name, kind);
        let wrap = |source| GenerateError::Operation {
            name: name.clone(),
            source,
        };
        let fields = Builder::new(&resolver, document, &mut registry)
            .build_root(&operation.selection_set, &type_name)
            .map_err(wrap)?;
        let arguments = operation
            .variables
            .iter()
            .map(|variable| {
                Ok(Argument {
                    name: variable.name.to_string(),
                    ident: variable.name.as_str().to_snake_case(),
                    ty: resolver.resolve(&variable.ty).map_err(wrap)?,
                })
            })
            .collect::<Result<Vec<_>, GenerateError>>()?;
        operations.push(Operation {
            query: query_text(document, operation),
            name,
            kind,
            type_name,
            arguments,
            fields,
        });
    }

    let types = registry.emit();
    info!(
        types = types.len(),
        fragments = fragments.len(),
        operations = operations.len(),
        "generation finished"
    );
    Ok(Generated { types, fragments, operations })
}

/// `GetUser` + query → `GetUserQuery`; names already ending in the suffix keep it once.
pub fn root_type_name(operation: &str, kind: OperationKind) -> String {
    let base = operation.to_upper_camel_case();
    if base.ends_with(kind.suffix()) {
        base
    } else {
        format!("{base}{}", kind.suffix())
    }
}

fn operation_kind(operation: &executable::Operation) -> OperationKind {
    match operation.operation_type {
        OperationType::Query => OperationKind::Query,
        OperationType::Mutation => OperationKind::Mutation,
        OperationType::Subscription => OperationKind::Subscription,
    }
}

/// The operation followed by every fragment it reaches, in document order.
fn query_text(document: &ExecutableDocument, operation: &executable::Operation) -> String {
    let mut used = HashSet::new();
    collect_spreads(document, &operation.selection_set, &mut used);

    let mut parts = vec![operation.serialize().to_string()];
    parts.extend(
        document
            .fragments
            .iter()
            .filter(|(name, _)| used.contains(name.as_str()))
            .map(|(_, fragment)| fragment.serialize().to_string()),
    );
    parts.join("\n")
}

fn collect_spreads<'a>(document: &'a ExecutableDocument, selection_set: &'a SelectionSet, used: &mut HashSet<&'a str>) {
    for selection in &selection_set.selections {
        match selection {
            Selection::Field(field) => collect_spreads(document, &field.selection_set, used),
            Selection::InlineFragment(inline) => collect_spreads(document, &inline.selection_set, used),
            Selection::FragmentSpread(spread) => {
                if used.insert(spread.fragment_name.as_str()) {
                    if let Some(fragment) = document.fragments.get(&spread.fragment_name) {
                        collect_spreads(document, &fragment.selection_set, used);
                    }
                }
            }
        }
    }
}
