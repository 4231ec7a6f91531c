//! # Class Registries
//!
//! One registry per polymorphic family maps class ids to concrete schemas. A family
//! is the root schema plus every schema that descends from it. Only members that are
//! not abstract and that declare their own id are registered.
//!
//! When two members share an id and one descends from the other, the descendant
//! wins. When they are unrelated the declarations are rejected.

use std::collections::BTreeMap;
use std::collections::HashMap;

use tracing::warn;

use crate::types::ClassId;
use crate::types::DeclarationError;

/// A family member as seen by the class registry builder.
pub(crate) struct Candidate<'a> {
    pub name: &'a str,
    /// Strict ancestors, nearest first.
    pub ancestors: &'a [String],
    pub class_id: Option<ClassId>,
    pub is_abstract: bool,
}

#[derive(Debug, Clone)]
pub struct ClassRegistry {
    root: String,
    by_id: BTreeMap<ClassId, String>,
    /// Declared ids of every registered member, including ones whose id was later
    /// taken over by a descendant.
    members: HashMap<String, ClassId>,
}

impl ClassRegistry {
    pub(crate) fn build<'a>(
        root: &str,
        candidates: impl IntoIterator<Item = Candidate<'a>>,
    ) -> Result<Self, DeclarationError> {
        let mut members: Vec<Candidate<'a>> = candidates
            .into_iter()
            .filter(|c| c.name == root || c.ancestors.iter().any(|a| a == root))
            .filter(|c| !c.is_abstract)
            .filter(|c| c.class_id.is_some())
            .collect();
        // Shallow types first so a descendant always meets its ancestor's entry.
        members.sort_by(|a, b| {
            a.ancestors
                .len()
                .cmp(&b.ancestors.len())
                .then_with(|| a.name.cmp(b.name))
        });

        let mut by_id: BTreeMap<ClassId, String> = BTreeMap::new();
        let mut declared: HashMap<String, ClassId> = HashMap::new();

        for member in &members {
            let Some(id) = member.class_id else { continue };
            if id.is_absent() {
                return Err(DeclarationError::ReservedClassId {
                    schema: member.name.to_owned(),
                });
            }
            declared.insert(member.name.to_owned(), id);

            let Some(existing) = by_id.get(&id).cloned() else {
                by_id.insert(id, member.name.to_owned());
                continue;
            };

            if member.ancestors.iter().any(|a| *a == existing) {
                warn!(
                    family = root,
                    id = id.0,
                    kept = member.name,
                    replaced = %existing,
                    "class id redeclared by a descendant; the descendant wins"
                );
                by_id.insert(id, member.name.to_owned());
            } else {
                return Err(DeclarationError::ClassIdCollision {
                    family: root.to_owned(),
                    id,
                    first: existing,
                    second: member.name.to_owned(),
                });
            }
        }

        Ok(Self {
            root: root.to_owned(),
            by_id,
            members: declared,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// The concrete schema a wire id decodes to.
    pub fn resolve(&self, id: ClassId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// The id a registered member is encoded with.
    pub fn class_of(&self, schema: &str) -> Option<ClassId> {
        self.members.get(schema).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &str)> {
        self.by_id.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
