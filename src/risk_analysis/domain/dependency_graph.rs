use super::{ExactVersion, PackageName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A package discovered while walking the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    pub name: PackageName,
    pub version: ExactVersion,
    /// Root = 0, direct dependencies = 1
    pub depth: usize,
    /// `name@version` of the node that introduced this one (path tracking only)
    pub parent: Option<String>,
}

impl DependencyNode {
    pub fn new(
        name: PackageName,
        version: ExactVersion,
        depth: usize,
        parent: Option<String>,
    ) -> Self {
        Self {
            name,
            version,
            depth,
            parent,
        }
    }

    /// Visited-set key
    pub fn key(&self) -> String {
        node_key(self.name.as_str(), self.version.as_str())
    }
}

pub fn node_key(name: &str, version: &str) -> String {
    format!("{}@{}", name, version)
}

/// Flat mapping of package name to exact version, root excluded.
///
/// Holds at most one version per name; the first version inserted wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedDependencySet {
    entries: BTreeMap<PackageName, ExactVersion>,
}

impl ResolvedDependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts unless the name is already present. Returns whether it was added.
    pub fn insert_if_absent(&mut self, name: PackageName, version: ExactVersion) -> bool {
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, version);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ExactVersion> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PackageName, &ExactVersion)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// DependencyGraph aggregate produced by the resolver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub resolved: ResolvedDependencySet,
    /// Every expanded node, in discovery order
    pub nodes: Vec<DependencyNode>,
    /// Names of direct dependencies
    pub direct: Vec<PackageName>,
    /// Direct dependencies that could not be pinned by any resolution tier
    pub skipped: Vec<String>,
}

impl DependencyGraph {
    pub fn direct_dependency_count(&self) -> usize {
        self.direct.len()
    }

    pub fn total_package_count(&self) -> usize {
        self.resolved.len()
    }

    pub fn transitive_dependency_count(&self) -> usize {
        self.resolved
            .iter()
            .filter(|(name, _)| !self.direct.contains(*name))
            .count()
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}
