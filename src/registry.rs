//! Deduplicated set of generated structs.
//!
//! Every `register` call is a claim by one build site (a fragment root, an
//! operation, a spread site). Merging releases the claims of the structs it
//! flattened away; a struct is emitted while anything still claims it.
//!
//! Fragments are built once. Later spread sites take the cached field list
//! and [`Registry::reclaim`] the fragment's structs instead of rebuilding.
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::trace;

use crate::ir::{Field, NamedType};

#[derive(Debug)]
struct Entry {
    ty: NamedType,
    claims: usize,
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: IndexMap<String, Entry>,
    /// Settled root fields per fragment name.
    fragments: HashMap<String, Vec<Field>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panics when a live entry with the same name has a different shape.
    pub fn register(&mut self, ty: NamedType) {
        match self.entries.get_mut(&ty.name) {
            Some(entry) if entry.claims > 0 => {
                assert!(
                    entry.ty == ty,
                    "naming collision: two different structs named `{}`\n  first: {:?}\n second: {:?}",
                    ty.name,
                    entry.ty.fields,
                    ty.fields,
                );
                entry.claims += 1;
                trace!(name = %ty.name, claims = entry.claims, "claimed type");
            }
            Some(_) => {
                // dead entry: the new shape takes over, appended after its dependencies
                let name = ty.name.clone();
                self.entries.shift_remove(&name);
                trace!(%name, "revived type");
                self.entries.insert(name, Entry { ty, claims: 1 });
            }
            None => {
                trace!(name = %ty.name, "registered type");
                self.entries.insert(ty.name.clone(), Entry { ty, claims: 1 });
            }
        }
    }

    /// Releases one claim on every `old` name, then registers the post-merge types.
    pub fn supersede<S: AsRef<str>>(&mut self, old: &[S], new: Vec<NamedType>) {
        for name in old {
            let name = name.as_ref();
            let Some(entry) = self.entries.get_mut(name) else {
                panic!("superseding unregistered type `{name}`");
            };
            entry.claims = entry.claims.saturating_sub(1);
            trace!(%name, claims = entry.claims, "released type");
        }
        for ty in new {
            self.register(ty);
        }
    }

    /// Adds one claim to `root` and to every struct reachable from it, live or not.
    pub fn reclaim(&mut self, root: &str) {
        let mut seen = HashSet::new();
        let mut stack = vec![root.to_string()];
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(entry) = self.entries.get_mut(&name) else {
                panic!("reclaiming unregistered type `{name}`");
            };
            entry.claims += 1;
            trace!(%name, claims = entry.claims, "reclaimed type");
            stack.extend(entry.ty.references().map(str::to_string));
        }
    }

    pub fn cache_fragment(&mut self, name: &str, fields: Vec<Field>) {
        self.fragments.insert(name.to_string(), fields);
    }

    pub fn fragment(&self, name: &str) -> Option<&[Field]> {
        self.fragments.get(name).map(Vec::as_slice)
    }

    pub fn is_live(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.claims > 0)
    }

    pub fn get(&self, name: &str) -> Option<&NamedType> {
        self.entries.get(name).filter(|e| e.claims > 0).map(|e| &e.ty)
    }

    /// Live types, each after every type it references.
    pub fn emit(&self) -> Vec<NamedType> {
        let mut visited = HashSet::new();
        let mut out = Vec::new();
        for name in self.entries.keys() {
            self.visit(name, &mut visited, &mut out);
        }
        out
    }

    fn visit<'a>(&'a self, name: &'a str, visited: &mut HashSet<&'a str>, out: &mut Vec<NamedType>) {
        let Some(entry) = self.entries.get(name).filter(|e| e.claims > 0) else {
            return;
        };
        if !visited.insert(name) {
            return;
        }
        for dep in entry.ty.references() {
            self.visit(dep, visited, out);
        }
        out.push(entry.ty.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Field, FieldKind, TargetType};
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

    fn named(name: &str, fields: Vec<Field>) -> NamedType {
        NamedType { name: name.into(), fields }
    }

    fn names(types: &[NamedType]) -> Vec<&str> {
        types.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn identical_registrations_collapse() {
        let mut registry = Registry::new();
        registry.register(named("User", vec![scalar("id")]));
        registry.register(named("User", vec![scalar("id")]));
        assert_eq!(names(&registry.emit()), vec!["User"]);
    }

    #[test]
    #[should_panic(expected = "naming collision")]
    fn differing_shapes_under_one_name_panic() {
        let mut registry = Registry::new();
        registry.register(named("User", vec![scalar("id")]));
        registry.register(named("User", vec![scalar("name")]));
    }

    #[test]
    fn superseded_types_drop_out_once_unclaimed() {
        let mut registry = Registry::new();
        registry.register(named("A", vec![scalar("x")]));
        registry.register(named("A", vec![scalar("x")]));
        registry.register(named("B", vec![scalar("y")]));

        registry.supersede(&["A", "B"], vec![named("Merged", vec![scalar("x"), scalar("y")])]);

        assert!(registry.is_live("A"));
        assert!(!registry.is_live("B"));
        assert_eq!(names(&registry.emit()), vec!["A", "Merged"]);
    }

    #[test]
    fn dead_names_can_take_a_new_shape() {
        let mut registry = Registry::new();
        registry.register(named("QUserProfile", vec![scalar("id")]));
        registry.supersede(
            &["QUserProfile"],
            vec![named("QUserProfile", vec![scalar("id"), scalar("name")])],
        );
        assert_eq!(registry.get("QUserProfile").unwrap().fields.len(), 2);
    }

    #[test]
    fn references_are_emitted_before_referrers() {
        let mut registry = Registry::new();
        registry.register(named("Root", vec![object("user", "RootUser", vec![scalar("id")])]));
        registry.register(named("RootUser", vec![scalar("id")]));
        assert_eq!(names(&registry.emit()), vec!["RootUser", "Root"]);
    }

    #[test]
    fn reclaim_keeps_fragment_structs_alive_through_a_merge() {
        let mut registry = Registry::new();
        registry.register(named("FProfile", vec![scalar("bio")]));
        registry.register(named("F", vec![object("profile", "FProfile", vec![scalar("bio")])]));

        // a spread site re-uses F, then merges it away
        registry.reclaim("F");
        registry.supersede(&["F", "FProfile"], vec![named("QViewer", vec![scalar("bio")])]);

        assert!(registry.is_live("F"));
        assert!(registry.is_live("FProfile"));
        assert_eq!(names(&registry.emit()), vec!["FProfile", "F", "QViewer"]);
    }

    #[test]
    fn reclaim_revives_released_structs() {
        let mut registry = Registry::new();
        registry.register(named("G", vec![scalar("id")]));
        registry.supersede(&["G"], vec![]);
        assert!(!registry.is_live("G"));
        registry.reclaim("G");
        assert!(registry.is_live("G"));
    }
}
