//! Type-level write ordering.
//!
//! Builds a directed graph over entity *types* with an edge from each
//! referencing type to every type it references, then runs Kahn's algorithm.
//! The resulting order depends only on schema shape, never on record volume.

use std::collections::{BTreeSet, VecDeque};

use ahash::AHashMap;

use crate::{errors::LoaderError, model::EntityKind};

#[derive(Clone, Debug)]
pub struct DependencySequencer {
    order: Vec<EntityKind>,
    dependencies: AHashMap<EntityKind, Vec<EntityKind>>,
}

impl DependencySequencer {
    /// Sequencer for the fixed compliance schema.
    pub fn for_schema() -> Result<Self, LoaderError> {
        let declarations: Vec<(EntityKind, Vec<EntityKind>)> = EntityKind::ALL
            .iter()
            .map(|kind| (*kind, kind.references().to_vec()))
            .collect();
        Self::from_declarations(&declarations)
    }

    /// Builds the order from explicit `(type, referenced types)` declarations.
    /// Ties are broken by declaration order so the result is deterministic.
    pub fn from_declarations(
        declarations: &[(EntityKind, Vec<EntityKind>)],
    ) -> Result<Self, LoaderError> {
        let position: AHashMap<EntityKind, usize> = declarations
            .iter()
            .enumerate()
            .map(|(idx, (kind, _))| (*kind, idx))
            .collect();
        if position.len() != declarations.len() {
            return Err(LoaderError::schema_dependency(
                "entity type declared more than once",
            ));
        }

        let mut in_degree = vec![0usize; declarations.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); declarations.len()];
        let mut dependencies = AHashMap::new();
        for (idx, (kind, refs)) in declarations.iter().enumerate() {
            let mut unique = Vec::new();
            for referenced in refs {
                if referenced == kind {
                    // Self references (e.g. a subsidiary that is its parent's
                    // customer) are row-level, not type-level, dependencies.
                    continue;
                }
                let Some(&target) = position.get(referenced) else {
                    return Err(LoaderError::schema_dependency(format!(
                        "{kind} references undeclared type {referenced}"
                    )));
                };
                if unique.contains(referenced) {
                    continue;
                }
                unique.push(*referenced);
                in_degree[idx] += 1;
                dependents[target].push(idx);
            }
            dependencies.insert(*kind, unique);
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| idx)
            .collect();
        let mut order = Vec::with_capacity(declarations.len());
        while let Some(idx) = ready.pop_first() {
            order.push(declarations[idx].0);
            for &dependent in &dependents[idx] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != declarations.len() {
            let stuck: Vec<String> = declarations
                .iter()
                .enumerate()
                .filter(|(idx, _)| in_degree[*idx] > 0)
                .map(|(_, (kind, _))| kind.to_string())
                .collect();
            return Err(LoaderError::schema_dependency(format!(
                "cyclic dependency among [{}]",
                stuck.join(", ")
            )));
        }

        Ok(Self {
            order,
            dependencies,
        })
    }

    pub fn write_order(&self) -> &[EntityKind] {
        &self.order
    }

    /// Direct dependencies of `kind`.
    pub fn dependencies_of(&self, kind: EntityKind) -> &[EntityKind] {
        self.dependencies
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every type that transitively depends on `kind`, in write order.
    pub fn dependents_of(&self, kind: EntityKind) -> Vec<EntityKind> {
        let mut affected = BTreeSet::new();
        let mut queue = VecDeque::from([kind]);
        while let Some(current) = queue.pop_front() {
            for candidate in &self.order {
                if self.dependencies_of(*candidate).contains(&current)
                    && affected.insert(*candidate)
                {
                    queue.push_back(*candidate);
                }
            }
        }
        self.order
            .iter()
            .copied()
            .filter(|k| affected.contains(k))
            .collect()
    }

    pub fn position(&self, kind: EntityKind) -> Option<usize> {
        self.order.iter().position(|k| *k == kind)
    }
}
