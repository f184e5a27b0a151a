//! Dependency Resolver
//!
//! Builds the dependency graph of a descriptor set (front-end -> backend,
//! backend -> bus controller) and computes the instantiation order.
//!
//! # Design
//!
//! - **Backends first**: every referenced component precedes each component
//!   that references it
//! - **Stable**: when two descriptors have no ordering constraint between
//!   them, declaration order wins, so output is deterministic and diff-friendly
//! - **All or nothing**: a dangling reference, a type mismatch or a cycle
//!   fails the whole set; no partial order is returned
//! - **Pure logic**: No I/O, no side effects
//!
//! # Algorithm
//!
//! Kahn's algorithm where the ready set is ordered by declaration index:
//! the next descriptor emitted is always the earliest-declared one whose
//! dependencies are all placed. This yields the lexicographically smallest
//! topological order.

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::error::WiringError;
use crate::identifier::Identifier;
use crate::schema::ComponentDescriptor;

// ============================================================================
// Resolved Plan
// ============================================================================

/// Descriptors in a valid instantiation order.
///
/// Only `resolve` can build one, so anything holding a `ResolvedPlan` knows
/// every dependency of a descriptor appears before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlan {
    descriptors: Vec<ComponentDescriptor>,
}

impl ResolvedPlan {
    /// Descriptors in instantiation order
    pub fn descriptors(&self) -> &[ComponentDescriptor] {
        &self.descriptors
    }

    /// Identifiers in instantiation order
    pub fn order(&self) -> Vec<&Identifier> {
        self.descriptors.iter().map(|d| d.identifier()).collect()
    }

    pub fn get(&self, identifier: &Identifier) -> Option<&ComponentDescriptor> {
        self.descriptors.iter().find(|d| d.identifier() == identifier)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve a descriptor set into instantiation order.
///
/// # Errors
///
/// - `DuplicateIdentifier` if two descriptors share an identifier
/// - `UnresolvedReference` if a reference names no descriptor in the set
/// - `IncompatibleReference` if a reference names a descriptor of the wrong type
/// - `CyclicDependency` if descriptors depend on each other in a loop
///
/// References are checked in declaration order (descriptor, then field), so
/// the first offending reference is the one reported.
pub fn resolve(descriptors: Vec<ComponentDescriptor>) -> Result<ResolvedPlan, WiringError> {
    let count = descriptors.len();

    let mut index: HashMap<&Identifier, usize> = HashMap::with_capacity(count);
    for (i, desc) in descriptors.iter().enumerate() {
        if index.insert(desc.identifier(), i).is_some() {
            return Err(WiringError::DuplicateIdentifier {
                identifier: desc.identifier().clone(),
            });
        }
    }

    // deps[i]: descriptors that must be constructed before i
    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (i, desc) in descriptors.iter().enumerate() {
        for dep in desc.dependency_refs() {
            let Some(&target) = index.get(&dep.target) else {
                return Err(WiringError::UnresolvedReference {
                    identifier: dep.target.clone(),
                    component: desc.identifier().clone(),
                    field: dep.field.clone(),
                });
            };
            let found = descriptors[target].component_type();
            if found != dep.expected {
                return Err(WiringError::IncompatibleReference {
                    component: desc.identifier().clone(),
                    field: dep.field.clone(),
                    identifier: dep.target.clone(),
                    expected: dep.expected,
                    found,
                });
            }
            if !deps[i].contains(&target) {
                deps[i].push(target);
            }
        }
    }

    let order = stable_topological_order(&deps).map_err(|remaining| {
        let cycle = find_cycle(&deps, &remaining)
            .into_iter()
            .map(|i| descriptors[i].identifier().clone())
            .collect();
        WiringError::CyclicDependency { cycle }
    })?;

    let mut slots: Vec<Option<ComponentDescriptor>> = descriptors.into_iter().map(Some).collect();
    let ordered: Vec<ComponentDescriptor> = order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect();

    debug!(
        "Resolved {} components: {}",
        ordered.len(),
        ordered
            .iter()
            .map(|d| d.identifier().as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(ResolvedPlan {
        descriptors: ordered,
    })
}

/// Kahn's algorithm with the ready set ordered by declaration index.
///
/// Returns the order, or the set of indices that could not be placed.
fn stable_topological_order(deps: &[Vec<usize>]) -> Result<Vec<usize>, BTreeSet<usize>> {
    let count = deps.len();
    let mut pending: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (i, targets) in deps.iter().enumerate() {
        for &target in targets {
            dependents[target].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..count).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == count {
        Ok(order)
    } else {
        let placed: HashSet<usize> = order.into_iter().collect();
        Err((0..count).filter(|i| !placed.contains(i)).collect())
    }
}

/// Walk dependency edges inside the unplaceable set until a node repeats.
///
/// Every unplaceable node has at least one unplaceable dependency, so the
/// walk always closes a loop. The returned path starts and ends with the
/// same index.
fn find_cycle(deps: &[Vec<usize>], remaining: &BTreeSet<usize>) -> Vec<usize> {
    let Some(&start) = remaining.first() else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(&next) = deps[current].iter().find(|&&d| remaining.contains(&d)) else {
            return path;
        };
        if let Some(pos) = path.iter().position(|&p| p == next) {
            let mut cycle = path.split_off(pos);
            cycle.push(next);
            return cycle;
        }
        path.push(next);
        current = next;
    }
}

// ============================================================================
// Tests
// ============================================================================
