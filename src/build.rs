//! Selection sets → field trees.
//!
//! Walks one selection set against the schema, names every struct it has to
//! synthesize, runs the fragment merge where spreads meet other selections,
//! and records each struct in the [`Registry`] it is given.
pub mod merge;

use std::collections::{HashMap, HashSet};

use apollo_compiler::ExecutableDocument;
use apollo_compiler::executable::{self, InlineFragment, Selection, SelectionSet};
use heck::{ToSnakeCase, ToUpperCamelCase};
use indexmap::IndexMap;
use tracing::debug;

use crate::error::BuildError;
use crate::ir::{Field, FieldKind, NamedType, TargetType};
use crate::registry::Registry;
use crate::resolve::{self, TypeResolver};

pub use merge::{MergeOutcome, merge, merge_fields, needs_merge};

/// Struct name of a fragment's root.
pub fn fragment_type_name(fragment: &str) -> String {
    fragment.to_upper_camel_case()
}

pub struct Builder<'a> {
    resolver: &'a TypeResolver<'a>,
    document: &'a ExecutableDocument,
    registry: &'a mut Registry,
}

impl<'a> Builder<'a> {
    pub fn new(
        resolver: &'a TypeResolver<'a>,
        document: &'a ExecutableDocument,
        registry: &'a mut Registry,
    ) -> Self {
        Self { resolver, document, registry }
    }

    /// Root fields of an operation or fragment. The root struct is always registered.
    pub fn build_root(&mut self, selection_set: &SelectionSet, type_name: &str) -> Result<Vec<Field>, BuildError> {
        let fields = self.build_fields(selection_set, type_name)?;
        Ok(self.settle(type_name, fields))
    }

    /// Settled root fields of a fragment. Built on first use; every later use
    /// takes the cached fields and re-claims the fragment's structs.
    pub fn fragment_fields(&mut self, fragment_name: &str) -> Result<Vec<Field>, BuildError> {
        let type_name = fragment_type_name(fragment_name);
        if let Some(fields) = self.registry.fragment(fragment_name).map(<[Field]>::to_vec) {
            self.registry.reclaim(&type_name);
            return Ok(fields);
        }
        let Some(fragment) = self.document.fragments.get(fragment_name) else {
            panic!("fragment `{fragment_name}` is not defined in the document");
        };
        let fields = self.build_root(&fragment.selection_set, &type_name)?;
        self.registry.cache_fragment(fragment_name, fields.clone());
        Ok(fields)
    }

    /// One field per response key or fragment, in selection order, before any merging.
    pub fn build_fields(&mut self, selection_set: &SelectionSet, parent: &str) -> Result<Vec<Field>, BuildError> {
        let selections: Vec<&Selection> = selection_set.selections.iter().collect();
        self.build_selections(selection_set.ty.as_str(), &selections, parent)
    }

    fn build_selections(&mut self, ty: &str, selections: &[&Selection], parent: &str) -> Result<Vec<Field>, BuildError> {
        let mut same_key: IndexMap<&str, Vec<&executable::Field>> = IndexMap::new();
        for selection in selections {
            if let Selection::Field(field) = selection {
                same_key.entry(field.response_key().as_str()).or_default().push(field);
            }
        }
        // inline structs share the parent's namespace with field structs
        let mut taken: HashSet<String> = same_key.keys().map(|key| key.to_upper_camel_case()).collect();
        let mut conditions: HashMap<String, usize> = HashMap::new();

        let mut fields = Vec::with_capacity(selections.len());
        for selection in selections {
            let field = match selection {
                Selection::Field(field) => {
                    // repeated response keys were grouped at their first occurrence
                    let Some(group) = same_key.shift_remove(field.response_key().as_str()) else {
                        continue;
                    };
                    self.build_field(&group, parent)?
                }
                Selection::FragmentSpread(spread) => self.build_spread(spread.fragment_name.as_str())?,
                Selection::InlineFragment(inline) => {
                    let condition = inline
                        .type_condition
                        .as_ref()
                        .map_or(ty, |condition| condition.as_str())
                        .to_upper_camel_case();
                    let seen = conditions.entry(condition.clone()).or_default();
                    let suffix = loop {
                        *seen += 1;
                        let candidate = match *seen {
                            1 => format!("On{condition}"),
                            n => format!("On{condition}{n}"),
                        };
                        if taken.insert(candidate.clone()) {
                            break candidate;
                        }
                    };
                    self.build_inline(inline, parent, suffix)?
                }
            };
            fields.push(field);
        }
        Ok(fields)
    }

    /// `group` holds every selection of one response key; validation guarantees
    /// they select the same field, so their sub-selections are concatenated.
    fn build_field(&mut self, group: &[&executable::Field], parent: &str) -> Result<Field, BuildError> {
        let field = group[0];
        let name = field.response_key().as_str().to_string();
        let ident = name.to_snake_case();
        let selections: Vec<&Selection> = group
            .iter()
            .copied()
            .flat_map(|field| &field.selection_set.selections)
            .collect();
        if selections.is_empty() {
            return Ok(Field {
                ty: self.resolver.resolve(field.ty())?,
                kind: FieldKind::Scalar,
                children: Vec::new(),
                name,
                ident,
            });
        }

        let type_name = format!("{parent}{}", name.to_upper_camel_case());
        let children = self.build_selections(field.selection_set.ty.as_str(), &selections, &type_name)?;
        let (base, children) = self.classify(&type_name, children);
        Ok(Field {
            ty: resolve::wrap(field.ty(), base),
            kind: FieldKind::Object,
            children,
            name,
            ident,
        })
    }

    fn build_spread(&mut self, fragment_name: &str) -> Result<Field, BuildError> {
        let children = self.fragment_fields(fragment_name)?;
        Ok(Field {
            name: fragment_name.to_string(),
            ident: fragment_name.to_snake_case(),
            ty: TargetType::Fragment(fragment_type_name(fragment_name)),
            kind: FieldKind::FragmentSpread,
            children,
        })
    }

    fn build_inline(&mut self, inline: &InlineFragment, parent: &str, suffix: String) -> Result<Field, BuildError> {
        let type_name = format!("{parent}{suffix}");
        let ident = suffix.to_snake_case();
        let mut children = self.build_fields(&inline.selection_set, &type_name)?;

        // `... on T { ...Frag }` is transparent: it takes the fragment's type
        if children.len() == 1 && children[0].kind == FieldKind::FragmentSpread {
            if let Some(spread) = children.pop() {
                return Ok(Field {
                    name: suffix,
                    ident,
                    ty: spread.ty,
                    kind: FieldKind::InlineFragment,
                    children: spread.children,
                });
            }
        }

        let children = self.settle(&type_name, children);
        Ok(Field {
            name: suffix,
            ident,
            ty: TargetType::Struct(type_name),
            kind: FieldKind::InlineFragment,
            children,
        })
    }

    /// Base type of a field with a selection set: a lone embedded child hands
    /// over its own type, anything else becomes the struct `type_name`.
    fn classify(&mut self, type_name: &str, mut children: Vec<Field>) -> (TargetType, Vec<Field>) {
        if children.len() == 1 && children[0].kind.is_embedded() {
            if let Some(only) = children.pop() {
                return (only.ty, only.children);
            }
        }
        let children = self.settle(type_name, children);
        (TargetType::Struct(type_name.to_string()), children)
    }

    /// Merges spreads when needed, then records the struct `type_name`.
    fn settle(&mut self, type_name: &str, fields: Vec<Field>) -> Vec<Field> {
        if !needs_merge(&fields) {
            self.registry.register(NamedType {
                name: type_name.to_string(),
                fields: fields.clone(),
            });
            return fields;
        }
        let MergeOutcome { fields, superseded, introduced } = merge(type_name, fields);
        debug!(
            type_name,
            superseded = ?superseded,
            introduced = introduced.len(),
            "merged fragment spreads"
        );
        self.registry.supersede(&superseded, introduced);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use apollo_compiler::Schema;
    use apollo_compiler::validation::Valid;
    use pretty_assertions::assert_eq;

    const SDL: &str = r#"
        type Query { viewer: User! node(id: ID!): Node }
        interface Node { id: ID! }
        type User implements Node {
            id: ID!
            login: String!
            databaseId: Int
            profile: Profile
            friends: [User!]!
        }
        type Profile { bio: String avatar: String }
    "#;

    struct Fixture {
        schema: Valid<Schema>,
        document: Valid<ExecutableDocument>,
    }

    fn fixture(query: &str) -> Fixture {
        let schema = Schema::parse_and_validate(SDL, "schema.graphql").unwrap();
        let document = ExecutableDocument::parse_and_validate(&schema, query, "query.graphql").unwrap();
        Fixture { schema, document }
    }

    /// Builds the first operation's selection set under `root` with a fresh registry.
    fn build(fixture: &Fixture, root: &str) -> (Vec<Field>, Registry) {
        let resolver = TypeResolver::new(&fixture.schema, GeneratorConfig::default().scalar_table());
        let mut registry = Registry::new();
        let operation = fixture.document.operations.iter().next().unwrap();
        let fields = Builder::new(&resolver, &fixture.document, &mut registry)
            .build_root(&operation.selection_set, root)
            .unwrap();
        (fields, registry)
    }

    fn names(fields: &[Field]) -> Vec<&str> {
        fields.iter().map(|f| f.name.as_str()).collect()
    }

    fn emitted(registry: &Registry) -> Vec<String> {
        registry.emit().into_iter().map(|t| t.name).collect()
    }

    #[test]
    fn leaf_selections_are_scalars() {
        let fixture = fixture("query Q { viewer { login databaseId } }");
        let (fields, _) = build(&fixture, "Q");
        let viewer = &fields[0];
        assert_eq!(viewer.kind, FieldKind::Object);
        assert_eq!(viewer.ty, TargetType::Struct("QViewer".into()));
        for child in &viewer.children {
            assert_eq!(child.kind, FieldKind::Scalar);
            assert!(child.children.is_empty());
        }
        assert_eq!(
            viewer.children[1].ty,
            TargetType::Optional(Box::new(TargetType::Leaf("i32".into())))
        );
        assert_eq!(viewer.children[1].ident, "database_id");
    }

    #[test]
    fn aliases_name_members_and_structs() {
        let fixture = fixture("query Q { me: viewer { login } }");
        let (fields, registry) = build(&fixture, "Q");
        assert_eq!(fields[0].name, "me");
        assert_eq!(fields[0].ty, TargetType::Struct("QMe".into()));
        assert_eq!(emitted(&registry), vec!["QMe", "Q"]);
    }

    #[test]
    fn single_spread_delegates_to_the_fragment_type() {
        let fixture = fixture(
            "query Q { viewer { ...UserFields } } fragment UserFields on User { login }",
        );
        let (fields, registry) = build(&fixture, "Q");
        let viewer = &fields[0];
        assert_eq!(viewer.ty, TargetType::Fragment("UserFields".into()));
        assert_eq!(names(&viewer.children), vec!["login"]);
        assert!(!registry.is_live("QViewer"));
        assert_eq!(emitted(&registry), vec!["UserFields", "Q"]);
    }

    #[test]
    fn single_inline_fragment_delegates_to_its_struct() {
        let fixture = fixture("query Q { node(id: \"1\") { ... on User { login } } }");
        let (fields, registry) = build(&fixture, "Q");
        let node = &fields[0];
        assert_eq!(
            node.ty,
            TargetType::Optional(Box::new(TargetType::Struct("QNodeOnUser".into())))
        );
        assert!(!registry.is_live("QNode"));
        assert!(registry.is_live("QNodeOnUser"));
    }

    #[test]
    fn inline_fragment_around_one_spread_is_transparent() {
        let fixture = fixture(
            "query Q { node(id: \"1\") { id ... on User { ...UserFields } } }
             fragment UserFields on User { login }",
        );
        let (fields, registry) = build(&fixture, "Q");
        let inline = &fields[0].children[1];
        assert_eq!(inline.kind, FieldKind::InlineFragment);
        assert_eq!(inline.name, "OnUser");
        assert_eq!(inline.ty, TargetType::Fragment("UserFields".into()));
        assert!(!registry.is_live("QNodeOnUser"));
    }

    #[test]
    fn repeated_type_conditions_get_ordinals() {
        let fixture = fixture(
            "query Q { node(id: \"1\") { ... on User { login } ... on User { databaseId } } }",
        );
        let (fields, _) = build(&fixture, "Q");
        let node = &fields[0];
        assert_eq!(names(&node.children), vec!["OnUser", "OnUser2"]);
        assert_eq!(node.children[1].ty, TargetType::Struct("QNodeOnUser2".into()));
        assert_eq!(node.children[1].ident, "on_user2");
    }

    #[test]
    fn fragments_are_flattened_into_mixed_selections() {
        let fixture = fixture(
            "query Q { viewer { id ...A ...B } }
             fragment A on User { login databaseId }
             fragment B on User { databaseId id }",
        );
        let (fields, registry) = build(&fixture, "Q");
        let viewer = &fields[0];
        assert_eq!(names(&viewer.children), vec!["databaseId", "id", "login"]);
        assert!(viewer.children.iter().all(|f| f.kind == FieldKind::Scalar));
        assert!(!registry.is_live("A"));
        assert!(!registry.is_live("B"));
        assert_eq!(emitted(&registry), vec!["QViewer", "Q"]);
    }

    #[test]
    fn nested_overlap_merges_in_the_parent_scope() {
        let fixture = fixture(
            "query Q { viewer { ...A ...B } }
             fragment A on User { profile { bio } }
             fragment B on User { profile { avatar } }",
        );
        let (fields, registry) = build(&fixture, "Q");
        let profile = &fields[0].children[0];
        assert_eq!(
            profile.ty,
            TargetType::Optional(Box::new(TargetType::Struct("QViewerProfile".into())))
        );
        assert_eq!(names(&profile.children), vec!["avatar", "bio"]);
        assert_eq!(emitted(&registry), vec!["QViewerProfile", "QViewer", "Q"]);
    }

    #[test]
    fn list_fields_wrap_their_struct() {
        let fixture = fixture("query Q { viewer { friends { login } } }");
        let (fields, _) = build(&fixture, "Q");
        assert_eq!(
            fields[0].children[0].ty,
            TargetType::List(Box::new(TargetType::Struct("QViewerFriends".into())))
        );
    }

    #[test]
    fn inline_names_step_around_aliased_fields() {
        let fixture = fixture("query Q { viewer { onUser: profile { bio } ... on User { login } } }");
        let (fields, registry) = build(&fixture, "Q");
        let viewer = &fields[0];
        assert_eq!(names(&viewer.children), vec!["onUser", "OnUser2"]);
        assert_eq!(
            viewer.children[0].ty,
            TargetType::Optional(Box::new(TargetType::Struct("QViewerOnUser".into())))
        );
        assert_eq!(viewer.children[1].ty, TargetType::Struct("QViewerOnUser2".into()));
        assert!(registry.is_live("QViewerOnUser"));
        assert!(registry.is_live("QViewerOnUser2"));
    }

    #[test]
    fn repeated_response_keys_become_one_field() {
        let fixture = fixture("query Q { viewer { login profile { bio } login profile { avatar } } }");
        let (fields, _) = build(&fixture, "Q");
        let viewer = &fields[0];
        assert_eq!(names(&viewer.children), vec!["login", "profile"]);
        assert_eq!(names(&viewer.children[1].children), vec!["bio", "avatar"]);
    }

    #[test]
    fn later_spreads_reuse_the_built_fragment() {
        let fixture = fixture(
            "query Q { viewer { ...F } me: viewer { ...F } }
             fragment F on User { profile { bio } ...G }
             fragment G on User { profile { avatar } }",
        );
        let (fields, registry) = build(&fixture, "Q");
        assert_eq!(fields[0].ty, TargetType::Fragment("F".into()));
        assert_eq!(fields[0].children, fields[1].children);
        let profile = registry.get("FProfile").unwrap();
        assert_eq!(names(&profile.fields), vec!["avatar", "bio"]);
    }
}
