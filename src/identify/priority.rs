//! The format priority relation.
//!
//! `has_priority_over` edges form a directed graph. It is validated once at load time:
//! every target must exist and the graph must be acyclic. Filtering then uses the
//! precomputed transitive closure.

use crate::core::{FileFormat, IdentificationResultCollection};
use crate::signature::SignatureLoadError;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct PriorityGraph {
    /// Every format each format outranks, directly or through a chain.
    closure: HashMap<String, HashSet<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl PriorityGraph {
    pub fn build(formats: &[FileFormat]) -> Result<Self, SignatureLoadError> {
        let known: HashSet<&str> = formats.iter().map(|f| f.puid.as_str()).collect();
        let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
        for format in formats {
            for target in &format.has_priority_over {
                if !known.contains(target.as_str()) {
                    return Err(SignatureLoadError::UnknownFormat {
                        owner: format!("priority of {}", format.puid),
                        puid: target.clone(),
                    });
                }
            }
            edges.insert(
                format.puid.as_str(),
                format.has_priority_over.iter().map(String::as_str).collect(),
            );
        }

        // Depth-first post-order; a node's closure is ready once all its targets are.
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut closure: HashMap<String, HashSet<String>> = HashMap::new();
        for format in formats {
            let root = format.puid.as_str();
            if marks.contains_key(root) {
                continue;
            }
            let mut path: Vec<&str> = vec![root];
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
            marks.insert(root, Mark::Visiting);
            while let Some(&(node, next)) = stack.last() {
                let targets = edges.get(node).map(Vec::as_slice).unwrap_or(&[]);
                if let Some(&target) = targets.get(next) {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    match marks.get(target).copied() {
                        Some(Mark::Visiting) => {
                            let start = path.iter().position(|p| *p == target).unwrap_or(0);
                            let mut cycle: Vec<String> =
                                path[start..].iter().map(|p| p.to_string()).collect();
                            cycle.push(target.to_string());
                            return Err(SignatureLoadError::PriorityCycle(cycle));
                        }
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(target, Mark::Visiting);
                            path.push(target);
                            stack.push((target, 0));
                        }
                    }
                } else {
                    let mut reach: HashSet<String> = HashSet::new();
                    for target in targets {
                        reach.insert(target.to_string());
                        if let Some(further) = closure.get(*target) {
                            reach.extend(further.iter().cloned());
                        }
                    }
                    if !reach.is_empty() {
                        closure.insert(node.to_string(), reach);
                    }
                    marks.insert(node, Mark::Done);
                    path.pop();
                    stack.pop();
                }
            }
        }

        debug!(
            formats = formats.len(),
            ranked = closure.len(),
            "Built format priority graph"
        );
        Ok(Self { closure })
    }

    /// True when `higher` outranks `lower`, directly or transitively.
    pub fn outranks(&self, higher: &str, lower: &str) -> bool {
        self.closure
            .get(higher)
            .is_some_and(|set| set.contains(lower))
    }

    /// Remove every result outranked by another result in the same collection,
    /// repeating until nothing more goes. Returns the number removed.
    pub fn remove_lower_priority_hits(&self, results: &mut IdentificationResultCollection) -> usize {
        let mut removed = 0;
        loop {
            let present: Vec<String> = results.puids().into_iter().map(str::to_string).collect();
            let outranked: HashSet<String> = present
                .iter()
                .filter(|lower| present.iter().any(|higher| self.outranks(higher, lower)))
                .cloned()
                .collect();
            if outranked.is_empty() {
                return removed;
            }
            removed += results.remove_where(|r| outranked.contains(&r.puid));
        }
    }
}
