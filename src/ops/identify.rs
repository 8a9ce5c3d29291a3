//! Implementation of `quay id` and `quay graph`.
//!
//! Identity computation for one recipe, and for a set of recipes that depend
//! on each other by name. The set is ordered so every recipe is identified
//! after the recipes it depends on; no version solving happens here.

use std::collections::HashMap;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::builder::fingerprint::{canonical_inputs, IdentityError, IdentityInputs};
use crate::core::{DependencyIdentities, Identity, RecipeDescriptor, SettingsModel};

/// Error identifying a set of recipes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("recipe `{name}` is defined more than once")]
    DuplicateRecipe { name: String },

    #[error("`{package}` requires {dependency}/{required}, the set holds {found}")]
    VersionMismatch {
        package: String,
        dependency: String,
        required: String,
        found: String,
    },

    #[error("dependency cycle between {}", packages.join(", "))]
    Cycle { packages: Vec<String> },

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// An identity together with the inputs it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identified {
    pub identity: Identity,
    pub inputs: IdentityInputs,
}

/// Compute the identity of a single recipe.
pub fn identify(
    recipe: &RecipeDescriptor,
    settings: &SettingsModel,
    dependencies: &DependencyIdentities,
) -> Result<Identified, IdentityError> {
    let inputs = canonical_inputs(recipe, settings, dependencies)?;
    let identity = inputs.identity();
    tracing::debug!(
        package = %recipe.display_name(),
        settings = %inputs.settings,
        identity = %identity,
        "identified"
    );
    Ok(Identified { identity, inputs })
}

/// Identify every recipe of a set, dependencies first.
///
/// Dependencies between recipes of the set are resolved from the set itself
/// and must name the version the set holds; any other dependency must be
/// supplied in `external`. A recipe in the set shadows an `external` entry of
/// the same name.
pub fn identify_graph<'a>(
    recipes: &'a [RecipeDescriptor],
    settings: &SettingsModel,
    external: &DependencyIdentities,
) -> Result<Vec<(&'a RecipeDescriptor, Identified)>, GraphError> {
    let mut graph: DiGraph<&RecipeDescriptor, ()> = DiGraph::new();
    let mut by_name: HashMap<&str, NodeIndex> = HashMap::new();

    for recipe in recipes {
        let node = graph.add_node(recipe);
        if by_name.insert(recipe.name(), node).is_some() {
            return Err(GraphError::DuplicateRecipe {
                name: recipe.name().to_string(),
            });
        }
    }

    // Edges point from a dependency to its dependents
    for node in graph.node_indices() {
        let recipe = graph[node];
        for dep in recipe.dependencies() {
            if let Some(&dep_node) = by_name.get(dep.name()) {
                let found = graph[dep_node].version();
                if dep.reference().version() != found {
                    return Err(GraphError::VersionMismatch {
                        package: recipe.display_name(),
                        dependency: dep.name().to_string(),
                        required: dep.reference().version().to_string(),
                        found: found.to_string(),
                    });
                }
                tracing::trace!("{} depends on {}", recipe.name(), dep.name());
                graph.add_edge(dep_node, node, ());
            }
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| GraphError::Cycle {
        packages: cycle_members(&graph, cycle.node_id()),
    })?;

    let mut known = external.clone();
    let mut identified = Vec::with_capacity(order.len());
    for node in order {
        let recipe = graph[node];
        let result = identify(recipe, settings, &known)?;
        known.insert(recipe.name().to_string(), result.identity.clone());
        identified.push((recipe, result));
    }

    Ok(identified)
}

/// Names of the recipes on the cycle through `node`, sorted.
fn cycle_members(graph: &DiGraph<&RecipeDescriptor, ()>, node: NodeIndex) -> Vec<String> {
    let mut members: Vec<String> = tarjan_scc(graph)
        .into_iter()
        .find(|scc| scc.contains(&node))
        .unwrap_or_else(|| vec![node])
        .into_iter()
        .map(|n| graph[n].name().to_string())
        .collect();
    members.sort();
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DependencyRef, Sensitivity};

    fn recipe(name: &str, deps: &[&str], sensitivity: Sensitivity) -> RecipeDescriptor {
        let deps = deps
            .iter()
            .map(|d| DependencyRef::new(format!("{}/1.0", d).parse().unwrap()))
            .collect();
        RecipeDescriptor::new(name, "1.0", deps, sensitivity).unwrap()
    }

    fn settings() -> SettingsModel {
        SettingsModel::new()
            .with("compiler", "gcc")
            .with("build_type", "Release")
    }

    fn names(result: &[(&RecipeDescriptor, Identified)]) -> Vec<String> {
        result.iter().map(|(r, _)| r.name().to_string()).collect()
    }

    #[test]
    fn test_identify_matches_compute_identity() {
        let r = recipe("celaeno", &[], Sensitivity::ConfigInvariant);
        let result = identify(&r, &settings(), &DependencyIdentities::new()).unwrap();

        assert_eq!(result.identity, result.inputs.identity());
        assert!(result.inputs.settings.is_empty());
    }

    #[test]
    fn test_graph_orders_dependencies_first() {
        let recipes = vec![
            recipe("app", &["fmt", "celaeno"], Sensitivity::ConfigSensitive),
            recipe("celaeno", &["range-v3"], Sensitivity::ConfigInvariant),
            recipe("range-v3", &[], Sensitivity::ConfigInvariant),
            recipe("fmt", &[], Sensitivity::ConfigSensitive),
        ];

        let result =
            identify_graph(&recipes, &settings(), &DependencyIdentities::new()).unwrap();
        let order = names(&result);
        let pos = |n: &str| order.iter().position(|o| o == n).unwrap();

        assert_eq!(order.len(), 4);
        assert!(pos("range-v3") < pos("celaeno"));
        assert!(pos("celaeno") < pos("app"));
        assert!(pos("fmt") < pos("app"));
    }

    #[test]
    fn test_graph_feeds_identities_to_dependents() {
        let recipes = vec![
            recipe("celaeno", &["range-v3"], Sensitivity::ConfigInvariant),
            recipe("range-v3", &[], Sensitivity::ConfigInvariant),
        ];

        let result =
            identify_graph(&recipes, &settings(), &DependencyIdentities::new()).unwrap();
        let range = &result[0].1;
        let celaeno = &result[1].1;

        assert_eq!(celaeno.inputs.dependencies[0].identity, range.identity);

        // Same identity as computing celaeno directly with range-v3 supplied
        let mut deps = DependencyIdentities::new();
        deps.insert("range-v3".into(), range.identity.clone());
        let direct = identify(&recipes[0], &settings(), &deps).unwrap();
        assert_eq!(direct.identity, celaeno.identity);
    }

    #[test]
    fn test_graph_uses_external_identities() {
        let recipes = vec![recipe("celaeno", &["range-v3"], Sensitivity::ConfigInvariant)];

        let err =
            identify_graph(&recipes, &settings(), &DependencyIdentities::new()).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Identity(IdentityError::InvalidDependencyIdentity { .. })
        ));

        let range = recipe("range-v3", &[], Sensitivity::ConfigInvariant);
        let range_id = identify(&range, &settings(), &DependencyIdentities::new())
            .unwrap()
            .identity;
        let mut external = DependencyIdentities::new();
        external.insert("range-v3".into(), range_id);

        assert!(identify_graph(&recipes, &settings(), &external).is_ok());
    }

    #[test]
    fn test_graph_rejects_cycles() {
        let recipes = vec![
            recipe("a", &["b"], Sensitivity::ConfigSensitive),
            recipe("b", &["c"], Sensitivity::ConfigSensitive),
            recipe("c", &["a"], Sensitivity::ConfigSensitive),
            recipe("d", &[], Sensitivity::ConfigSensitive),
        ];

        let err =
            identify_graph(&recipes, &settings(), &DependencyIdentities::new()).unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle {
                packages: vec!["a".into(), "b".into(), "c".into()]
            }
        );
    }

    #[test]
    fn test_graph_rejects_other_version_in_set() {
        let celaeno = RecipeDescriptor::new(
            "celaeno",
            "0.1",
            vec![DependencyRef::new("range-v3/0.9.6".parse().unwrap())],
            Sensitivity::ConfigInvariant,
        )
        .unwrap();
        let range =
            RecipeDescriptor::new("range-v3", "0.10.0", vec![], Sensitivity::ConfigInvariant)
                .unwrap();

        let err = identify_graph(
            &[celaeno, range],
            &settings(),
            &DependencyIdentities::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            GraphError::VersionMismatch {
                package: "celaeno/0.1".into(),
                dependency: "range-v3".into(),
                required: "0.9.6".into(),
                found: "0.10.0".into(),
            }
        );
        assert_eq!(
            err.to_string(),
            "`celaeno/0.1` requires range-v3/0.9.6, the set holds 0.10.0"
        );
    }

    #[test]
    fn test_graph_rejects_duplicates() {
        let recipes = vec![
            recipe("fmt", &[], Sensitivity::ConfigSensitive),
            recipe("fmt", &[], Sensitivity::ConfigInvariant),
        ];

        let err =
            identify_graph(&recipes, &settings(), &DependencyIdentities::new()).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateRecipe { .. }));
    }
}
