//! Flattening of fragment spreads into their parent's field set.
//!
//! Pure: takes the parent's fields by value and returns the merged list plus
//! the registry bookkeeping (structs superseded, structs introduced). The
//! caller applies the bookkeeping to its registry.
use heck::ToUpperCamelCase;
use indexmap::IndexMap;
use tracing::trace;

use crate::ir::{Field, FieldKind, NamedType, TargetType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Deduplicated fields, sorted by name.
    pub fields: Vec<Field>,
    /// Pre-merge struct names, one entry per claim to release.
    pub superseded: Vec<String>,
    /// Post-merge structs, dependencies first; the last entry is the merged parent itself.
    pub introduced: Vec<NamedType>,
}

/// A selection needs merging when it spreads a fragment next to anything else.
pub fn needs_merge(fields: &[Field]) -> bool {
    fields.len() > 1 && fields.iter().any(|f| f.kind == FieldKind::FragmentSpread)
}

/// Flattens every fragment spread in `fields` into one field set named `scope`.
pub fn merge(scope: &str, fields: Vec<Field>) -> MergeOutcome {
    let mut books = Bookkeeping::default();
    let mut direct = Vec::new();
    let mut spread_children = Vec::new();
    for field in fields {
        if field.kind == FieldKind::FragmentSpread {
            books.retire(&field.ty);
            spread_children.extend(field.children);
        } else {
            direct.push(field);
        }
    }
    let fields = union(scope, direct, spread_children, &mut books);
    books.finish(fields)
}

/// Merges `source` into `target` as the struct `scope`; neither input is a spread.
pub fn merge_fields(scope: &str, target: Vec<Field>, source: Vec<Field>) -> MergeOutcome {
    let mut books = Bookkeeping::default();
    let fields = union(scope, target, source, &mut books);
    books.finish(fields)
}

// ------------------------------ Internals -------------------------------- //

#[derive(Default)]
struct Bookkeeping {
    superseded: Vec<String>,
    introduced: Vec<NamedType>,
}

impl Bookkeeping {
    /// Marks the struct behind `ty` as pre-merge. Structs introduced earlier in
    /// this same merge were never registered, so they are dropped instead.
    fn retire(&mut self, ty: &TargetType) {
        let Some(name) = ty.struct_name() else {
            return;
        };
        match self.introduced.iter().position(|t| t.name == name) {
            Some(index) => {
                self.introduced.remove(index);
            }
            None => self.superseded.push(name.to_string()),
        }
    }

    fn finish(self, fields: Vec<Field>) -> MergeOutcome {
        MergeOutcome {
            fields,
            superseded: self.superseded,
            introduced: self.introduced,
        }
    }
}

fn union(scope: &str, target: Vec<Field>, source: Vec<Field>, books: &mut Bookkeeping) -> Vec<Field> {
    let mut by_name: IndexMap<String, Field> =
        target.into_iter().map(|f| (f.name.clone(), f)).collect();

    for incoming in source {
        match by_name.get_mut(&incoming.name) {
            None => {
                by_name.insert(incoming.name.clone(), incoming);
            }
            Some(existing) if existing.kind == FieldKind::Scalar => {
                // same-named scalars are assumed identical; the first one wins
                trace!(scope, field = %incoming.name, "dropped duplicate scalar");
            }
            Some(existing) => {
                books.retire(&existing.ty);
                books.retire(&incoming.ty);
                let merged = format!("{scope}{}", existing.name.to_upper_camel_case());
                trace!(scope, field = %incoming.name, %merged, "merging structured field");
                let children = std::mem::take(&mut existing.children);
                existing.children = union(&merged, children, incoming.children, books);
                existing.ty = existing.ty.rebase(TargetType::Struct(merged));
            }
        }
    }

    let mut fields: Vec<Field> = by_name.into_values().collect();
    fields.sort_by(|a, b| a.name.cmp(&b.name));
    books.introduced.push(NamedType {
        name: scope.to_string(),
        fields: fields.clone(),
    });
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scalar(name: &str) -> Field {
        Field {
            name: name.into(),
            ident: name.into(),
            ty: TargetType::Leaf("String".into()),
            kind: FieldKind::Scalar,
            children: vec![],
        }
    }

    fn object(name: &str, ty: &str, children: Vec<Field>) -> Field {
        Field {
            name: name.into(),
            ident: name.into(),
            ty: TargetType::Optional(Box::new(TargetType::Struct(ty.into()))),
            kind: FieldKind::Object,
            children,
        }
    }

    fn spread(fragment: &str, children: Vec<Field>) -> Field {
        Field {
            name: fragment.into(),
            ident: fragment.to_lowercase(),
            ty: TargetType::Fragment(fragment.into()),
            kind: FieldKind::FragmentSpread,
            children,
        }
    }

    fn names(fields: &[Field]) -> Vec<&str> {
        fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn only_mixed_spreads_need_merging() {
        assert!(!needs_merge(&[spread("A", vec![scalar("x")])]));
        assert!(!needs_merge(&[scalar("x"), scalar("y")]));
        assert!(needs_merge(&[scalar("x"), spread("A", vec![scalar("y")])]));
        assert!(needs_merge(&[spread("A", vec![]), spread("B", vec![])]));
    }

    #[test]
    fn overlapping_fragments_union_into_one_struct() {
        let outcome = merge(
            "QUser",
            vec![
                spread("A", vec![scalar("x"), scalar("y")]),
                spread("B", vec![scalar("y"), scalar("z")]),
            ],
        );

        assert_eq!(names(&outcome.fields), vec!["x", "y", "z"]);
        assert_eq!(outcome.superseded, vec!["A", "B"]);
        assert_eq!(outcome.introduced.len(), 1);
        assert_eq!(outcome.introduced[0].name, "QUser");
        assert_eq!(outcome.introduced[0].fields, outcome.fields);
    }

    #[test]
    fn structured_overlap_merges_recursively() {
        let outcome = merge(
            "QUser",
            vec![
                spread("A", vec![object("profile", "AProfile", vec![scalar("id")])]),
                spread("B", vec![object("profile", "BProfile", vec![scalar("name")])]),
            ],
        );

        let profile = &outcome.fields[0];
        assert_eq!(profile.name, "profile");
        assert_eq!(names(&profile.children), vec!["id", "name"]);
        assert_eq!(
            profile.ty,
            TargetType::Optional(Box::new(TargetType::Struct("QUserProfile".into())))
        );
        assert_eq!(outcome.superseded, vec!["A", "B", "AProfile", "BProfile"]);
        let introduced: Vec<&str> = outcome.introduced.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(introduced, vec!["QUserProfile", "QUser"]);
    }

    #[test]
    fn direct_fields_win_over_spread_scalars() {
        let mut direct = scalar("id");
        direct.ty = TargetType::Leaf("u64".into());
        let outcome = merge("Q", vec![direct.clone(), spread("A", vec![scalar("id"), scalar("login")])]);
        assert_eq!(outcome.fields, vec![direct, scalar("login")]);
    }

    #[test]
    fn direct_struct_is_superseded_by_its_merged_shape() {
        let outcome = merge(
            "QUser",
            vec![
                object("profile", "QUserProfile", vec![scalar("id")]),
                spread("B", vec![object("profile", "BProfile", vec![scalar("bio")])]),
            ],
        );
        assert_eq!(outcome.superseded, vec!["B", "QUserProfile", "BProfile"]);
        assert_eq!(outcome.introduced[0].name, "QUserProfile");
        assert_eq!(names(&outcome.introduced[0].fields), vec!["bio", "id"]);
    }

    #[test]
    fn three_way_overlap_reuses_the_struct_it_just_built() {
        let outcome = merge(
            "QUser",
            vec![
                spread("A", vec![object("profile", "AProfile", vec![scalar("id")])]),
                spread("B", vec![object("profile", "BProfile", vec![scalar("name")])]),
                spread("C", vec![object("profile", "CProfile", vec![scalar("bio")])]),
            ],
        );
        assert_eq!(names(&outcome.fields[0].children), vec!["bio", "id", "name"]);
        assert_eq!(
            outcome.superseded,
            vec!["A", "B", "C", "AProfile", "BProfile", "CProfile"]
        );
        let introduced: Vec<&str> = outcome.introduced.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(introduced, vec!["QUserProfile", "QUser"]);
    }

    #[test]
    fn merge_fields_leaves_inputs_untouched_elsewhere() {
        let target = vec![scalar("a")];
        let source = vec![scalar("b"), scalar("a")];
        let outcome = merge_fields("T", target.clone(), source);
        assert_eq!(names(&outcome.fields), vec!["a", "b"]);
        assert!(outcome.superseded.is_empty());
        assert_eq!(target, vec![scalar("a")]);
    }
}
