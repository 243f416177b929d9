//! Module dependency graph.
//!
//! Modules name the modules they depend on. Loading follows a topological
//! order with dependencies first; ties are broken by module name so the
//! order is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ModuleError;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module<I, S>(&mut self, name: impl Into<String>, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edges
            .entry(name.into())
            .or_default()
            .extend(dependencies.into_iter().map(Into::into));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Direct dependencies of `name`.
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(name)
    }

    /// `(module, dependency)` pairs naming modules not in the graph.
    #[must_use]
    pub fn missing_dependencies(&self) -> Vec<(String, String)> {
        self.edges
            .iter()
            .flat_map(|(module, deps)| {
                deps.iter()
                    .filter(|d| !self.edges.contains_key(*d))
                    .map(move |d| (module.clone(), d.clone()))
            })
            .collect()
    }

    /// One dependency cycle, listed from its first module back to itself.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = BTreeMap::new();
        let mut path = Vec::new();
        for name in self.edges.keys() {
            if let Err(cycle) = self.visit(name, &mut marks, &mut path, &mut Vec::new()) {
                return Some(cycle);
            }
        }
        None
    }

    /// Modules ordered so that each comes after all of its dependencies.
    ///
    /// # Errors
    ///
    /// [`ModuleError::MissingDependency`] for an unknown dependency and
    /// [`ModuleError::Cycle`] for a circular one.
    pub fn topological_order(&self) -> Result<Vec<String>, ModuleError> {
        if let Some((module, dependency)) = self.missing_dependencies().into_iter().next() {
            return Err(ModuleError::MissingDependency { module, dependency });
        }
        let mut marks = BTreeMap::new();
        let mut order = Vec::with_capacity(self.edges.len());
        for name in self.edges.keys() {
            self.visit(name, &mut marks, &mut Vec::new(), &mut order)
                .map_err(ModuleError::Cycle)?;
        }
        Ok(order)
    }

    fn visit<'g>(
        &'g self,
        name: &'g str,
        marks: &mut BTreeMap<&'g str, Mark>,
        path: &mut Vec<&'g str>,
        order: &mut Vec<String>,
    ) -> Result<(), Vec<String>> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|p| *p == name).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| (*s).to_owned()).collect();
                cycle.push(name.to_owned());
                return Err(cycle);
            }
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        path.push(name);
        if let Some(deps) = self.edges.get(name) {
            for dep in deps {
                if self.edges.contains_key(dep.as_str()) {
                    self.visit(dep, marks, path, order)?;
                }
            }
        }
        path.pop();
        marks.insert(name, Mark::Done);
        order.push(name.to_owned());
        Ok(())
    }
}
