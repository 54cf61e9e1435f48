//! Dependency ordering: every fragment after its parent, siblings highest
//! selector index first.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use kinema_core::{KinemaError, KinemaResult};
use kinema_ir::{EntityDefinition, SceneDescriptor};

/// Compute the processing order of a scene's entities.
///
/// Entities without a parent come first in declaration order. Each placed
/// entity is followed, transitively, by its fragments sorted from the highest
/// to the lowest selector index.
pub fn resolve(scene: &SceneDescriptor) -> KinemaResult<Vec<String>> {
    let defined: HashSet<&str> = scene.entities.iter().map(|e| e.name.as_str()).collect();

    let mut order: Vec<String> = Vec::with_capacity(scene.len());
    let mut groups: HashMap<&str, Vec<&EntityDefinition>> = HashMap::new();
    for entity in &scene.entities {
        match entity.parent() {
            None => order.push(entity.name.clone()),
            Some(parent) if !defined.contains(parent) => {
                return Err(KinemaError::UnknownParent {
                    entity: entity.name.clone(),
                    parent: parent.to_string(),
                })
            }
            Some(parent) => groups.entry(parent).or_default().push(entity),
        }
    }

    // Parents in declaration order so the reported tie does not depend on hashing.
    for parent in scene.entities.iter().map(|e| e.name.as_str()) {
        let Some(siblings) = groups.get_mut(parent) else {
            continue;
        };
        siblings.sort_by_key(|e| Reverse(e.split_index()));
        if let Some(pair) = siblings
            .windows(2)
            .find(|pair| pair[0].split_index() == pair[1].split_index())
        {
            return Err(KinemaError::AmbiguousSplitOrder {
                parent: parent.to_string(),
                first: pair[0].name.clone(),
                second: pair[1].name.clone(),
                index: pair[0].split_index().unwrap_or_default(),
            });
        }
    }

    let mut next = 0;
    while next < order.len() {
        if let Some(siblings) = groups.remove(order[next].as_str()) {
            order.extend(siblings.into_iter().map(|e| e.name.clone()));
        }
        next += 1;
    }

    if !groups.is_empty() {
        return Err(KinemaError::CyclicDependency {
            cycle: find_cycle(scene, &order),
        });
    }

    tracing::debug!("Resolved dependency order: {}", order.join(", "));
    Ok(order)
}

/// Follow parent links from the first unplaced fragment until a name repeats.
fn find_cycle(scene: &SceneDescriptor, placed: &[String]) -> Vec<String> {
    let placed: HashSet<&str> = placed.iter().map(String::as_str).collect();
    let Some(start) = scene
        .entities
        .iter()
        .find(|e| !placed.contains(e.name.as_str()))
    else {
        return Vec::new();
    };

    let mut path: Vec<&str> = vec![start.name.as_str()];
    let mut current = start;
    while let Some(parent) = current.parent().and_then(|p| scene.get(p)) {
        if let Some(pos) = path.iter().position(|n| *n == parent.name) {
            let mut cycle: Vec<String> = path[pos..].iter().map(|n| n.to_string()).collect();
            cycle.push(parent.name.clone());
            return cycle;
        }
        path.push(parent.name.as_str());
        current = parent;
    }
    path.into_iter().map(String::from).collect()
}
