use crate::ports::outbound::PackageRegistry;
use crate::risk_analysis::domain::{
    node_key, DependencyGraph, DependencyNode, ExactVersion, PackageMetadata, PackageName,
};
use dashmap::{DashMap, DashSet};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum depth of transitive traversal (root = 0, direct = 1)
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Upper bound of metadata fetches in flight at any time
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    pub max_depth: usize,
    pub max_concurrency: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// A dependency edge waiting to be expanded
#[derive(Debug, Clone)]
struct PendingEdge {
    name: String,
    range: String,
    depth: usize,
    parent: String,
}

/// Result of expanding one edge: the node plus the edges it introduces
struct Expansion {
    node: DependencyNode,
    children: Vec<PendingEdge>,
}

/// ResolveDependenciesUseCase - pins a package's dependency graph to exact versions
///
/// The walk is breadth-first and level by level. Within a level, edges are
/// expanded concurrently with at most `max_concurrency` fetches outstanding.
/// A shared visited set keyed by `name@version` makes sure a node reached
/// through several parents (diamond dependencies, cycles) is expanded once.
///
/// Direct dependencies are then pinned with a three-tier fallback:
/// 1. the version discovered for the name at depth 1 during the walk
/// 2. `resolve_range` against the registry
/// 3. the registry's `latest` version
///
/// A direct dependency for which every tier fails is skipped and logged. It
/// never reaches the vulnerability lookup as a range.
pub struct ResolveDependenciesUseCase<R: PackageRegistry> {
    registry: Arc<R>,
    options: ResolverOptions,
}

impl<R: PackageRegistry> ResolveDependenciesUseCase<R> {
    pub fn new(registry: Arc<R>, options: ResolverOptions) -> Self {
        let options = ResolverOptions {
            max_depth: options.max_depth.max(1),
            max_concurrency: options.max_concurrency.max(1),
        };
        Self { registry, options }
    }

    /// Resolves the dependency graph below `root`
    pub async fn execute(&self, root: &PackageMetadata) -> DependencyGraph {
        let root_key = node_key(root.name.as_str(), root.version.as_str());
        let visited: DashSet<String> = DashSet::new();
        visited.insert(root_key.clone());
        let discovered_direct: DashMap<String, ExactVersion> = DashMap::new();

        let nodes = self
            .walk(root, &root_key, &visited, &discovered_direct)
            .await;

        let mut graph = DependencyGraph {
            nodes,
            ..Default::default()
        };

        // Direct entries first so they win over transitive versions of the same name
        let pinned = self.pin_direct_dependencies(root, &discovered_direct).await;
        for (name, range, outcome) in pinned {
            match outcome {
                Some(version) => {
                    if node_key(name.as_str(), version.as_str()) == root_key {
                        continue;
                    }
                    graph.direct.push(name.clone());
                    graph.resolved.insert_if_absent(name, version);
                }
                None => {
                    warn!(
                        package = %name,
                        range = %range,
                        "Skipping dependency: no exact version could be resolved; it will not be checked for vulnerabilities"
                    );
                    graph.skipped.push(format!("{}@{}", name, range));
                }
            }
        }

        for node in &graph.nodes {
            if node.key() == root_key {
                continue;
            }
            graph
                .resolved
                .insert_if_absent(node.name.clone(), node.version.clone());
        }

        info!(
            package = %root.name,
            resolved = graph.total_package_count(),
            direct = graph.direct_dependency_count(),
            skipped = graph.skipped.len(),
            max_depth = graph.max_depth(),
            "Dependency resolution finished"
        );

        graph
    }

    /// Breadth-first walk. Returns every expanded node in discovery order.
    async fn walk(
        &self,
        root: &PackageMetadata,
        root_key: &str,
        visited: &DashSet<String>,
        discovered_direct: &DashMap<String, ExactVersion>,
    ) -> Vec<DependencyNode> {
        let mut nodes = Vec::new();
        let mut frontier = Self::edges_of(&root.dependencies, 1, root_key);

        while !frontier.is_empty() {
            let level = frontier.first().map(|edge| edge.depth).unwrap_or_default();
            debug!(depth = level, edges = frontier.len(), "Expanding dependency level");

            let expansions: Vec<Option<Expansion>> = stream::iter(frontier)
                .map(|edge| self.expand(edge, visited, discovered_direct))
                .buffer_unordered(self.options.max_concurrency)
                .collect()
                .await;

            let mut next = Vec::new();
            for expansion in expansions.into_iter().flatten() {
                next.extend(expansion.children);
                nodes.push(expansion.node);
            }
            frontier = next;
        }

        nodes
    }

    /// Pins one edge to an exact version and fetches its manifest.
    ///
    /// Returns `None` when the node was already visited or when a fetch
    /// failed; a failed subtree is pruned without further retries.
    async fn expand(
        &self,
        edge: PendingEdge,
        visited: &DashSet<String>,
        discovered_direct: &DashMap<String, ExactVersion>,
    ) -> Option<Expansion> {
        let name = match PackageName::new(edge.name.as_str()) {
            Ok(name) => name,
            Err(e) => {
                warn!(package = %edge.name, error = %e, "Ignoring dependency with invalid name");
                return None;
            }
        };

        let version = match self.registry.resolve_range(&name, &edge.range).await {
            Ok(version) => version,
            Err(e) => {
                warn!(
                    package = %name,
                    range = %edge.range,
                    depth = edge.depth,
                    error = %e,
                    "Failed to resolve dependency range; pruning subtree"
                );
                return None;
            }
        };

        let key = node_key(name.as_str(), version.as_str());
        if !visited.insert(key.clone()) {
            debug!(node = %key, "Already visited");
            return None;
        }

        let metadata = match self.registry.fetch_metadata(&name, Some(&version)).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    node = %key,
                    depth = edge.depth,
                    error = %e,
                    "Failed to fetch dependency metadata; pruning subtree"
                );
                return None;
            }
        };

        if edge.depth == 1 {
            discovered_direct
                .entry(name.as_str().to_string())
                .or_insert_with(|| version.clone());
        }

        let children = if edge.depth < self.options.max_depth {
            Self::edges_of(&metadata.dependencies, edge.depth + 1, &key)
        } else {
            Vec::new()
        };

        Some(Expansion {
            node: DependencyNode::new(name, version, edge.depth, Some(edge.parent)),
            children,
        })
    }

    /// Runs the three-tier fallback for every direct dependency, in manifest order
    async fn pin_direct_dependencies(
        &self,
        root: &PackageMetadata,
        discovered_direct: &DashMap<String, ExactVersion>,
    ) -> Vec<(PackageName, String, Option<ExactVersion>)> {
        let direct: Vec<(PackageName, String)> = root
            .dependencies
            .iter()
            .filter_map(|(name, range)| match PackageName::new(name.as_str()) {
                Ok(name) => Some((name, range.clone())),
                Err(e) => {
                    warn!(package = %name, error = %e, "Ignoring direct dependency with invalid name");
                    None
                }
            })
            .collect();

        stream::iter(direct)
            .map(|(name, range)| async move {
                let version = self.pin_direct(&name, &range, discovered_direct).await;
                (name, range, version)
            })
            .buffered(self.options.max_concurrency)
            .collect()
            .await
    }

    async fn pin_direct(
        &self,
        name: &PackageName,
        range: &str,
        discovered_direct: &DashMap<String, ExactVersion>,
    ) -> Option<ExactVersion> {
        if let Some(version) = discovered_direct.get(name.as_str()) {
            return Some(version.clone());
        }

        match self.registry.resolve_range(name, range).await {
            Ok(version) => return Some(version),
            Err(e) => {
                debug!(package = %name, range = %range, error = %e, "Range resolution failed, trying latest");
            }
        }

        match self.registry.fetch_metadata(name, None).await {
            Ok(metadata) => Some(metadata.version),
            Err(e) => {
                debug!(package = %name, error = %e, "Latest version lookup failed");
                None
            }
        }
    }

    fn edges_of(
        dependencies: &std::collections::BTreeMap<String, String>,
        depth: usize,
        parent: &str,
    ) -> Vec<PendingEdge> {
        dependencies
            .iter()
            .map(|(name, range)| PendingEdge {
                name: name.clone(),
                range: range.clone(),
                depth,
                parent: parent.to_string(),
            })
            .collect()
    }
}
