// cycle.rs: Generic cycle detection over named nodes and located edges
//
// `CycleDetector` is parameterised over the node type (anything with a
// name) and the edge type (anything with a source location). The processor
// graph check and the call-graph recursion check both build one.
//
// Preconditions: edges reference node indices returned by `add_node`.
// Postconditions: `find_cycle` returns the first cycle found by a
//   three-colour DFS that visits roots and successors in insertion order.
// Failure modes: none; the zero-delay graph check turns a cycle into a
//   `ProcessorGraphCycle` diagnostic.
// Side effects: trace logging only.

use std::collections::HashMap;

use crate::diag::{CheckResult, Diagnostic, ErrorKind};
use crate::ir::{Connection, Module, ProcessorInstance, Span};

/// A graph node that can be named in a cycle description.
pub trait CycleNode {
    fn cycle_name(&self) -> &str;
}

/// A graph edge with a source location.
pub trait CycleEdge {
    fn cycle_location(&self) -> Span;
}

/// A closed path. `edges[i]` leads from `nodes[i]` to `nodes[i + 1]`; the
/// last edge returns to `nodes[0]`.
#[derive(Debug)]
pub struct Cycle<'g, N, E> {
    pub nodes: Vec<&'g N>,
    pub edges: Vec<&'g E>,
}

impl<'g, N: CycleNode, E: CycleEdge> Cycle<'g, N, E> {
    /// The edge that closed the cycle during the search.
    pub fn closing_edge(&self) -> &'g E {
        self.edges[self.edges.len() - 1]
    }

    pub fn names(&self) -> Vec<&'g str> {
        self.nodes.iter().map(|&n| n.cycle_name()).collect()
    }

    /// `a -> b -> a`
    pub fn describe(&self) -> String {
        let first: &'g N = self.nodes[0];
        let mut names = self.names();
        names.push(first.cycle_name());
        names.join(" -> ")
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

pub struct CycleDetector<'g, N, E> {
    nodes: Vec<&'g N>,
    successors: Vec<Vec<(usize, &'g E)>>,
}

impl<'g, N: CycleNode, E: CycleEdge> Default for CycleDetector<'g, N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'g, N: CycleNode, E: CycleEdge> CycleDetector<'g, N, E> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            successors: Vec::new(),
        }
    }

    /// Add a node and return its index.
    pub fn add_node(&mut self, node: &'g N) -> usize {
        self.nodes.push(node);
        self.successors.push(Vec::new());
        self.nodes.len() - 1
    }

    pub fn add_edge(&mut self, from: usize, to: usize, edge: &'g E) {
        self.successors[from].push((to, edge));
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterative DFS, so path depth is bounded by the heap rather than the
    /// thread stack.
    pub fn find_cycle(&self) -> Option<Cycle<'g, N, E>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        // (node, index of its next successor); the stack is the current path.
        let mut stack: Vec<(usize, usize)> = Vec::new();
        // `path_edges[i]` leads from `stack[i]` to `stack[i + 1]`.
        let mut path_edges: Vec<&'g E> = Vec::new();

        for root in 0..self.nodes.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let Some(&(next, edge)) = self.successors[node].get(frame.1) else {
                    stack.pop();
                    path_edges.pop();
                    marks[node] = Mark::Done;
                    continue;
                };
                frame.1 += 1;

                match marks[next] {
                    Mark::Unvisited => {
                        marks[next] = Mark::InProgress;
                        path_edges.push(edge);
                        stack.push((next, 0));
                    }
                    Mark::InProgress => {
                        let pos = stack.iter().position(|&(n, _)| n == next)?;
                        log::trace!(
                            "back edge {} -> {}",
                            self.nodes[node].cycle_name(),
                            self.nodes[next].cycle_name()
                        );
                        let mut edges = path_edges[pos..].to_vec();
                        edges.push(edge);
                        return Some(Cycle {
                            nodes: stack[pos..].iter().map(|&(n, _)| self.nodes[n]).collect(),
                            edges,
                        });
                    }
                    Mark::Done => {}
                }
            }
        }
        None
    }
}

// ── Processor graphs ──

impl CycleNode for ProcessorInstance {
    fn cycle_name(&self) -> &str {
        &self.name
    }
}

impl CycleEdge for Connection {
    fn cycle_location(&self) -> Span {
        self.span
    }
}

/// Reject a zero-delay feedback loop between the instances of `graph`.
///
/// Only connections with delay 0 between two named instances are edges;
/// connections to the graph's own I/O never close a loop.
pub fn check_graph_for_cycles(graph: &Module) -> CheckResult<()> {
    let mut detector = CycleDetector::new();
    let mut index = HashMap::new();
    for instance in &graph.instances {
        index.insert(instance.name.as_str(), detector.add_node(instance));
    }

    for connection in &graph.connections {
        if connection.delay != 0 {
            continue;
        }
        let (Some(src), Some(dst)) = (&connection.source.processor, &connection.dest.processor)
        else {
            continue;
        };
        if let (Some(&from), Some(&to)) = (index.get(src.as_str()), index.get(dst.as_str())) {
            detector.add_edge(from, to, connection);
        }
    }

    let Some(cycle) = detector.find_cycle() else {
        return Ok(());
    };

    let mut diag = Diagnostic::new(
        ErrorKind::ProcessorGraphCycle,
        cycle.closing_edge().cycle_location(),
        format!(
            "feedback cycle with zero delay in graph '{}': {}",
            graph.name,
            cycle.describe()
        ),
    )
    .with_hint("add a delay to one of the connections in the loop");
    for edge in &cycle.edges {
        diag = diag.with_cause(
            format!("{} -> {}", edge.source.description(), edge.dest.description()),
            Some(edge.span),
        );
    }
    diag.fail()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EndpointRef, ModuleKind};
    use chumsky::span::Span as _;

    struct Node(&'static str);
    struct Edge(usize);

    impl CycleNode for Node {
        fn cycle_name(&self) -> &str {
            self.0
        }
    }

    impl CycleEdge for Edge {
        fn cycle_location(&self) -> Span {
            Span::new((), self.0..self.0 + 1)
        }
    }

    #[test]
    fn acyclic_graph_has_no_cycle() {
        let nodes = [Node("a"), Node("b"), Node("c")];
        let edges = [Edge(0), Edge(1), Edge(2)];
        let mut d = CycleDetector::new();
        let ids: Vec<usize> = nodes.iter().map(|n| d.add_node(n)).collect();
        d.add_edge(ids[0], ids[1], &edges[0]);
        d.add_edge(ids[1], ids[2], &edges[1]);
        d.add_edge(ids[0], ids[2], &edges[2]);
        assert!(d.find_cycle().is_none());
    }

    #[test]
    fn self_loop() {
        let nodes = [Node("a")];
        let edges = [Edge(7)];
        let mut d = CycleDetector::new();
        let a = d.add_node(&nodes[0]);
        d.add_edge(a, a, &edges[0]);
        let cycle = d.find_cycle().expect("cycle");
        assert_eq!(cycle.describe(), "a -> a");
        assert_eq!(cycle.closing_edge().0, 7);
    }

    #[test]
    fn cycle_excludes_path_prefix() {
        // x -> a -> b -> c -> a: the reported cycle starts at the re-entered node.
        let nodes = [Node("x"), Node("a"), Node("b"), Node("c")];
        let edges = [Edge(0), Edge(1), Edge(2), Edge(3)];
        let mut d = CycleDetector::new();
        let ids: Vec<usize> = nodes.iter().map(|n| d.add_node(n)).collect();
        d.add_edge(ids[0], ids[1], &edges[0]);
        d.add_edge(ids[1], ids[2], &edges[1]);
        d.add_edge(ids[2], ids[3], &edges[2]);
        d.add_edge(ids[3], ids[1], &edges[3]);
        let cycle = d.find_cycle().expect("cycle");
        assert_eq!(cycle.names(), vec!["a", "b", "c"]);
        let spans: Vec<usize> = cycle.edges.iter().map(|e| e.0).collect();
        assert_eq!(spans, vec![1, 2, 3]);
    }

    #[test]
    fn first_cycle_in_insertion_order() {
        let nodes = [Node("a"), Node("b"), Node("c")];
        let edges = [Edge(0), Edge(1), Edge(2), Edge(3)];
        let mut d = CycleDetector::new();
        let ids: Vec<usize> = nodes.iter().map(|n| d.add_node(n)).collect();
        d.add_edge(ids[0], ids[2], &edges[0]);
        d.add_edge(ids[2], ids[0], &edges[1]);
        d.add_edge(ids[0], ids[1], &edges[2]);
        d.add_edge(ids[1], ids[0], &edges[3]);
        assert_eq!(d.find_cycle().expect("cycle").describe(), "a -> c -> a");
    }

    const DEEP: usize = 200_000;

    fn deep_chain<'g>(nodes: &'g [Node], edges: &'g [Edge]) -> CycleDetector<'g, Node, Edge> {
        let mut d = CycleDetector::new();
        for n in nodes {
            d.add_node(n);
        }
        for i in 0..DEEP - 1 {
            d.add_edge(i, i + 1, &edges[i]);
        }
        d
    }

    #[test]
    fn deep_chain_does_not_exhaust_the_stack() {
        let nodes: Vec<Node> = (0..DEEP).map(|_| Node("n")).collect();
        let edges: Vec<Edge> = (0..DEEP).map(Edge).collect();
        assert!(deep_chain(&nodes, &edges).find_cycle().is_none());
    }

    #[test]
    fn deep_chain_closed_near_the_bottom() {
        let nodes: Vec<Node> = (0..DEEP).map(|_| Node("n")).collect();
        let edges: Vec<Edge> = (0..DEEP).map(Edge).collect();
        let mut d = deep_chain(&nodes, &edges);
        d.add_edge(DEEP - 1, DEEP - 3, &edges[DEEP - 1]);
        let cycle = d.find_cycle().expect("cycle");
        assert_eq!(cycle.nodes.len(), 3);
        let spans: Vec<usize> = cycle.edges.iter().map(|e| e.0).collect();
        assert_eq!(spans, vec![DEEP - 3, DEEP - 2, DEEP - 1]);
    }

    fn sp() -> Span {
        Span::new((), 0..1)
    }

    fn instance(name: &str) -> ProcessorInstance {
        ProcessorInstance {
            name: name.into(),
            module: "P".into(),
            array_size: 1,
            span: sp(),
        }
    }

    fn connect(from: Option<&str>, to: Option<&str>, delay: u32, at: usize) -> Connection {
        let side = |p: Option<&str>, ep: &str| EndpointRef {
            processor: p.map(String::from),
            endpoint: ep.into(),
            index: None,
        };
        Connection {
            source: side(from, "out"),
            dest: side(to, "in"),
            delay,
            span: Span::new((), at..at + 1),
        }
    }

    #[test]
    fn zero_delay_loop_rejected_at_closing_connection() {
        let mut g = Module::new("G", ModuleKind::Graph, sp());
        g.instances = vec![instance("a"), instance("b")];
        g.connections = vec![
            connect(None, Some("a"), 0, 1),
            connect(Some("a"), Some("b"), 0, 2),
            connect(Some("b"), Some("a"), 0, 3),
        ];
        let err = check_graph_for_cycles(&g).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProcessorGraphCycle);
        assert_eq!(err.span.start, 3);
        assert!(err.message.ends_with("a -> b -> a"), "{}", err.message);
        assert_eq!(err.cause_chain.len(), 2);
    }

    #[test]
    fn delayed_or_boundary_edges_ignored() {
        let mut g = Module::new("G", ModuleKind::Graph, sp());
        g.instances = vec![instance("a"), instance("b")];
        g.connections = vec![
            connect(Some("a"), Some("b"), 0, 1),
            connect(Some("b"), Some("a"), 1, 2),
            connect(Some("b"), None, 0, 3),
        ];
        assert!(check_graph_for_cycles(&g).is_ok());
    }
}
