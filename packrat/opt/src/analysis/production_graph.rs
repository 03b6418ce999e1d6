use packrat_ir::{self as ir, Analyzer, Element};
use packrat_utils::Id;
use petgraph::{
    Direction::{Incoming, Outgoing},
    graph::{DiGraph, NodeIndex},
    visit::Dfs,
};
use std::collections::{HashMap, HashSet};

/// A petgraph::DiGraph where productions are the nodes and an edge
/// `X -> Y` means that `X` references `Y`.
pub type ReferenceGraph = DiGraph<Id, ()>;

/// The reference structure of a module. Nodes are named by the
/// productions' qualified names; references that do not resolve to a
/// single production have no edge.
#[derive(Clone, Default, Debug)]
pub struct ProductionGraph {
    nodes: HashMap<Id, NodeIndex>,
    graph: ReferenceGraph,
}

impl ProductionGraph {
    /// Build the graph over the module's productions. Productions that are
    /// currently borrowed mutably contribute no edges.
    pub fn new(module: &ir::Module, analyzer: &Analyzer) -> Self {
        let mut pg = ProductionGraph::default();
        for prod in &module.productions {
            if let Ok(p) = prod.try_borrow() {
                pg.node(p.qualified_name());
            }
        }
        for prod in &module.productions {
            let Ok(p) = prod.try_borrow() else {
                continue;
            };
            let src = pg.node(p.qualified_name());
            for alt in &p.choice.alternatives {
                for e in &alt.elements {
                    e.walk(&mut |e| {
                        if let Element::NonTerminal(nt) = e {
                            if let Some(target) = Self::resolve(analyzer, nt.name) {
                                let dst = pg.node(target);
                                pg.graph.update_edge(src, dst, ());
                            }
                        }
                    });
                }
            }
        }
        pg
    }

    /// The qualified name of the production `name` refers to.
    pub fn resolve(analyzer: &Analyzer, name: Id) -> Option<Id> {
        let prod = analyzer.lookup(name).ok()?;
        prod.try_borrow().ok().map(|p| p.qualified_name())
    }

    fn node(&mut self, name: Id) -> NodeIndex {
        let ProductionGraph { nodes, graph } = self;
        *nodes.entry(name).or_insert_with(|| graph.add_node(name))
    }

    pub fn contains(&self, name: Id) -> bool {
        self.nodes.contains_key(&name)
    }

    /// The productions reachable from `roots`, including the roots.
    pub fn reachable_from(
        &self,
        roots: impl IntoIterator<Item = Id>,
    ) -> HashSet<Id> {
        let mut reached = HashSet::new();
        for root in roots {
            let Some(&start) = self.nodes.get(&root) else {
                continue;
            };
            if reached.contains(&root) {
                continue;
            }
            let mut dfs = Dfs::new(&self.graph, start);
            while let Some(idx) = dfs.next(&self.graph) {
                reached.insert(self.graph[idx]);
            }
        }
        reached
    }

    /// The productions `name` references directly.
    pub fn references(&self, name: Id) -> impl Iterator<Item = Id> + '_ {
        self.neighbors(name, Outgoing)
    }

    /// The productions referencing `name` directly.
    pub fn referrers(&self, name: Id) -> impl Iterator<Item = Id> + '_ {
        self.neighbors(name, Incoming)
    }

    fn neighbors(
        &self,
        name: Id,
        dir: petgraph::Direction,
    ) -> impl Iterator<Item = Id> + '_ {
        self.nodes
            .get(&name)
            .into_iter()
            .flat_map(move |idx| self.graph.neighbors_directed(*idx, dir))
            .map(|idx| self.graph[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packrat_ir::{OrderedChoice, Production, Sequence, Type};

    fn prod(name: &str, refs: &[&str]) -> Production {
        Production::new(
            Id::new(name),
            Type::Void,
            OrderedChoice::new(vec![Sequence::new(
                refs.iter()
                    .map(|r| Element::star(Element::nonterminal(Id::new(*r))))
                    .collect(),
            )]),
        )
    }

    #[test]
    fn reachability() {
        let m = ir::Module::new(
            Id::new("M"),
            vec![
                prod("A", &["B"]),
                prod("B", &["C", "Undefined"]),
                prod("C", &["B"]),
                prod("D", &["A"]),
            ],
        );
        let analyzer = Analyzer::new(&m);
        let pg = ProductionGraph::new(&m, &analyzer);
        let reached = pg.reachable_from([Id::new("A")]);
        assert_eq!(reached.len(), 3);
        assert!(!reached.contains(&Id::new("D")));
        assert!(!pg.contains(Id::new("Undefined")));
        let mut refs: Vec<_> = pg.referrers(Id::new("B")).collect();
        refs.sort();
        assert_eq!(refs, vec![Id::new("A"), Id::new("C")]);
        assert_eq!(pg.references(Id::new("D")).count(), 1);
    }
}
