use packrat_utils::Id;
use petgraph::{
    Direction::Incoming,
    graph::{DiGraph, NodeIndex},
};
use std::collections::{HashMap, HashSet};

/// What is known about a production during a [GreatestFixpoint].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Referenced, but never described.
    Unknown,
    /// Holds unless one of its dependencies turns out not to.
    Tentative,
    Settled(bool),
}

/// The greatest fixed point of a property that holds for a production if
/// it holds for the production's own body and for every production the
/// body depends on.
///
/// Every candidate starts out [Status::Tentative]. Failures are then
/// propagated backwards along the dependency edges; whatever is still
/// tentative afterwards holds. Mutually recursive candidates therefore
/// hold together unless one of them fails.
#[derive(Default, Debug)]
pub struct GreatestFixpoint {
    nodes: HashMap<Id, NodeIndex>,
    /// An edge `X -> Y` means that `X` depends on `Y`.
    graph: DiGraph<Id, ()>,
    status: HashMap<Id, Status>,
}

impl GreatestFixpoint {
    fn node(&mut self, name: Id) -> NodeIndex {
        let GreatestFixpoint {
            nodes,
            graph,
            status,
        } = self;
        *nodes.entry(name).or_insert_with(|| {
            status.insert(name, Status::Unknown);
            graph.add_node(name)
        })
    }

    /// Describe `name`: [None] if its body disqualifies it, otherwise the
    /// productions it depends on.
    pub fn candidate(&mut self, name: Id, deps: Option<Vec<Id>>) {
        let src = self.node(name);
        match deps {
            None => {
                self.status.insert(name, Status::Settled(false));
            }
            Some(deps) => {
                self.status.insert(name, Status::Tentative);
                for dep in deps {
                    let dst = self.node(dep);
                    self.graph.update_edge(src, dst, ());
                }
            }
        }
    }

    /// Fix the outcome for `name` regardless of its body.
    pub fn settle(&mut self, name: Id, holds: bool) {
        self.node(name);
        self.status.insert(name, Status::Settled(holds));
    }

    pub fn status(&self, name: Id) -> Status {
        self.status.get(&name).copied().unwrap_or(Status::Unknown)
    }

    /// Propagate all failures and return the productions that hold.
    pub fn solve(mut self) -> HashSet<Id> {
        let mut worklist = Vec::new();
        for (name, status) in self.status.iter_mut() {
            match status {
                Status::Unknown => {
                    *status = Status::Settled(false);
                    worklist.push(*name);
                }
                Status::Settled(false) => worklist.push(*name),
                _ => (),
            }
        }

        while let Some(name) = worklist.pop() {
            let idx = self.nodes[&name];
            for dependent in self.graph.neighbors_directed(idx, Incoming) {
                let dependent = self.graph[dependent];
                if let Some(status @ Status::Tentative) =
                    self.status.get_mut(&dependent)
                {
                    *status = Status::Settled(false);
                    worklist.push(dependent);
                }
            }
        }

        self.status
            .into_iter()
            .filter_map(|(name, status)| match status {
                Status::Tentative | Status::Settled(true) => Some(name),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Id {
        Id::new(s)
    }

    #[test]
    fn cycles_hold_together() {
        let mut fp = GreatestFixpoint::default();
        fp.candidate(id("A"), Some(vec![id("B")]));
        fp.candidate(id("B"), Some(vec![id("A"), id("C")]));
        fp.settle(id("C"), true);
        assert_eq!(fp.status(id("A")), Status::Tentative);
        let holds = fp.solve();
        assert_eq!(holds.len(), 3);
    }

    #[test]
    fn failures_propagate() {
        let mut fp = GreatestFixpoint::default();
        fp.candidate(id("A"), Some(vec![id("B")]));
        fp.candidate(id("B"), Some(vec![id("A"), id("C")]));
        fp.candidate(id("C"), None);
        fp.candidate(id("D"), Some(vec![]));
        fp.candidate(id("E"), Some(vec![id("Missing")]));
        let holds = fp.solve();
        assert_eq!(holds, [id("D")].into_iter().collect());
    }
}
