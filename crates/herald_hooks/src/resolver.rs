//! Call-order resolution from needs/provides declarations.
//!
//! The resolver is a pure function over any [`Dependencies`] item. Its input
//! is already sorted by priority; its output is that order permuted so that
//! every provider of a key runs before every registration that needs it.
//!
//! Among items the graph leaves unconstrained, the input order wins, so the
//! priority order survives whenever the declarations allow it.

use core::fmt;

use hashbrown::{HashMap, HashSet};

use crate::tags::NameSet;

/// Something that declares dependency keys.
pub trait Dependencies {
    /// Keys that must be provided before this item runs.
    fn needs(&self) -> &NameSet;

    /// Keys this item provides.
    fn provides(&self) -> &NameSet;

    /// A short label used when reporting cycles.
    fn label(&self) -> String;

    /// Returns `true` if the item declares any needs or provides.
    fn is_constrained(&self) -> bool {
        !self.needs().is_empty() || !self.provides().is_empty()
    }
}

impl<T: Dependencies + ?Sized> Dependencies for std::sync::Arc<T> {
    fn needs(&self) -> &NameSet {
        (**self).needs()
    }

    fn provides(&self) -> &NameSet {
        (**self).provides()
    }

    fn label(&self) -> String {
        (**self).label()
    }
}

/// Placement of items without needs/provides relative to items with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnconstrainedPriority {
    /// Unconstrained items run before every constrained item.
    First,
    /// Unconstrained items run after every constrained item.
    Last,
    /// No extra ordering is imposed.
    #[default]
    DontCare,
}

impl fmt::Display for UnconstrainedPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnconstrainedPriority::First => f.write_str("first"),
            UnconstrainedPriority::Last => f.write_str("last"),
            UnconstrainedPriority::DontCare => f.write_str("dont-care"),
        }
    }
}

/// Errors produced by dependency resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The needs/provides graph contains a cycle.
    #[error("cyclic dependency detected among {}", .involved.join(", "))]
    Cycle {
        /// Labels of the items that could not be ordered.
        involved: Vec<String>,
    },
}

/// Orders `items` so that providers precede needers.
///
/// # Errors
///
/// Returns [`ResolveError::Cycle`] if no valid order exists. An item that
/// needs a key it provides itself is a cycle.
pub fn resolve<T: Dependencies>(
    items: Vec<T>,
    unconstrained: UnconstrainedPriority,
) -> Result<Vec<T>, ResolveError> {
    let edges = dependency_edges(&items, unconstrained);
    let order = topological_order(items.len(), &edges).map_err(|stuck| ResolveError::Cycle {
        involved: stuck.into_iter().map(|index| items[index].label()).collect(),
    })?;

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect())
}

/// Returns the keys needed by `items` that none of them provides.
#[must_use]
pub fn unmet_needs<'a, T, I>(items: I) -> NameSet
where
    T: Dependencies + 'a + ?Sized,
    I: IntoIterator<Item = &'a T>,
{
    let mut needs = NameSet::new();
    let mut provides = NameSet::new();
    for item in items {
        needs.extend_from(item.needs());
        provides.extend_from(item.provides());
    }
    needs.difference(&provides)
}

/// Builds the deduplicated `provider -> needer` edge set.
fn dependency_edges<T: Dependencies>(
    items: &[T],
    unconstrained: UnconstrainedPriority,
) -> HashSet<(usize, usize)> {
    let mut providers: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        for key in item.provides().iter() {
            providers.entry(key).or_default().push(index);
        }
    }

    let mut edges = HashSet::new();
    for (needer, item) in items.iter().enumerate() {
        for key in item.needs().iter() {
            for &provider in providers.get(key).into_iter().flatten() {
                edges.insert((provider, needer));
            }
        }
    }

    if unconstrained != UnconstrainedPriority::DontCare {
        let (constrained, free): (Vec<usize>, Vec<usize>) =
            (0..items.len()).partition(|&index| items[index].is_constrained());
        for &c in &constrained {
            for &u in &free {
                match unconstrained {
                    UnconstrainedPriority::First => edges.insert((u, c)),
                    _ => edges.insert((c, u)),
                };
            }
        }
    }

    edges
}

/// Kahn's algorithm with a LIFO work list.
///
/// Independent nodes are seeded in descending order and popped from the end;
/// nodes freed by a pop are pushed in ascending order. On failure returns the
/// nodes that still had incoming edges.
fn topological_order(count: usize, edges: &HashSet<(usize, usize)>) -> Result<Vec<usize>, Vec<usize>> {
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut incoming = vec![0_usize; count];
    for &(from, to) in edges {
        successors[from].push(to);
        incoming[to] += 1;
    }
    for list in &mut successors {
        list.sort_unstable();
    }

    let mut independent: Vec<usize> = (0..count).rev().filter(|&n| incoming[n] == 0).collect();
    let mut order = Vec::with_capacity(count);

    while let Some(node) = independent.pop() {
        order.push(node);
        for &next in &successors[node] {
            incoming[next] -= 1;
            if incoming[next] == 0 {
                independent.push(next);
            }
        }
    }

    if order.len() == count {
        Ok(order)
    } else {
        Err((0..count).filter(|&n| incoming[n] > 0).collect())
    }
}
