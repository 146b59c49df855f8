//! Kahn-style levelization of the agent dependency graph.
//!
//! Turns `(execution_plan, dependencies)` into `parallel_groups`: repeatedly
//! emit the agents whose dependencies are all already emitted, removing
//! them from consideration and iterating. A round that emits nothing while
//! agents remain means there is a cycle.

use std::collections::{HashMap, HashSet};

use crate::error::KernelError;

/// Levelize `plan` under `dependencies` into parallel-safe groups.
///
/// Ties within a level are broken by `plan`'s order (the canonical order),
/// so the result is deterministic for a given plan and dependency map.
pub fn levelize(
    plan: &[String],
    dependencies: &HashMap<String, HashSet<String>>,
) -> Result<Vec<Vec<String>>, KernelError> {
    let plan_set: HashSet<&str> = plan.iter().map(String::as_str).collect();
    let canonical_index: HashMap<&str, usize> =
        plan.iter().enumerate().map(|(i, a)| (a.as_str(), i)).collect();

    let mut remaining_deps: HashMap<&str, HashSet<&str>> = plan
        .iter()
        .map(|a| {
            let deps = dependencies
                .get(a)
                .map(|d| d.iter().map(String::as_str).filter(|d| plan_set.contains(d)).collect())
                .unwrap_or_default();
            (a.as_str(), deps)
        })
        .collect();

    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut emitted: HashSet<&str> = HashSet::new();

    while emitted.len() < plan.len() {
        let mut ready: Vec<&str> = remaining_deps
            .iter()
            .filter(|(a, deps)| !emitted.contains(*a) && deps.is_empty())
            .map(|(a, _)| *a)
            .collect();

        if ready.is_empty() {
            let stuck: Vec<String> = plan
                .iter()
                .filter(|a| !emitted.contains(a.as_str()))
                .cloned()
                .collect();
            return Err(KernelError::cyclic_plan(stuck));
        }

        ready.sort_by_key(|a| canonical_index[a]);
        for a in &ready {
            emitted.insert(a);
        }
        for deps in remaining_deps.values_mut() {
            for a in &ready {
                deps.remove(a);
            }
        }
        groups.push(ready.into_iter().map(String::from).collect());
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(pairs: &[(&str, &[&str])]) -> HashMap<String, HashSet<String>> {
        pairs
            .iter()
            .map(|(a, ds)| (a.to_string(), ds.iter().map(|d| d.to_string()).collect()))
            .collect()
    }

    #[test]
    fn independent_agents_land_in_one_group() {
        let plan = vec!["search".to_string(), "analytics".to_string()];
        let groups = levelize(&plan, &HashMap::new()).unwrap();
        assert_eq!(groups, vec![vec!["search".to_string(), "analytics".to_string()]]);
    }

    #[test]
    fn chain_produces_one_group_per_agent() {
        let plan = vec!["search".to_string(), "document".to_string(), "compliance".to_string()];
        let dependencies = deps(&[("document", &["search"]), ("compliance", &["document"])]);
        let groups = levelize(&plan, &dependencies).unwrap();
        assert_eq!(
            groups,
            vec![
                vec!["search".to_string()],
                vec!["document".to_string()],
                vec!["compliance".to_string()],
            ]
        );
    }

    #[test]
    fn cycle_is_detected() {
        let plan = vec!["a".to_string(), "b".to_string()];
        let dependencies = deps(&[("a", &["b"]), ("b", &["a"])]);
        let err = levelize(&plan, &dependencies).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CyclicPlan);
    }

    #[test]
    fn ties_break_by_canonical_plan_order() {
        let plan = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        let groups = levelize(&plan, &HashMap::new()).unwrap();
        assert_eq!(groups, vec![vec!["c".to_string(), "a".to_string(), "b".to_string()]]);
    }

    #[test]
    fn dependency_outside_plan_is_ignored() {
        let plan = vec!["document".to_string()];
        let dependencies = deps(&[("document", &["search"])]);
        let groups = levelize(&plan, &dependencies).unwrap();
        assert_eq!(groups, vec![vec!["document".to_string()]]);
    }
}
