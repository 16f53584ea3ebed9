// callflow.rs: Call-graph recursion and control-flow infinite-loop analysis
//
// Recursion: one node per function (module order, then function order) and
// one edge per call statement, fed to the generic `CycleDetector`.
//
// Infinite loops: per function, a block terminates if it returns or contains
// an `advance` (the scheduler regains control each frame). A function loops
// forever iff some block reachable from the entry cannot reach a terminating
// block.
//
// Preconditions: none; unresolved names are reported, not assumed away.
// Postconditions: the first cycle in declaration order is the one reported.
// Failure modes: `RecursiveCallCycle`, `UnknownFunction`, `UnknownBlock`.
// Side effects: debug logging only.

use std::collections::{HashMap, VecDeque};

use crate::cycle::{Cycle, CycleDetector, CycleEdge, CycleNode};
use crate::diag::{CheckResult, Diagnostic, ErrorKind, Recursion};
use crate::id::FunctionId;
use crate::ir::{
    Block, Function, FunctionRef, Program, Span, Statement, StatementKind, Terminator,
};

impl CycleNode for Function {
    fn cycle_name(&self) -> &str {
        &self.name
    }
}

impl CycleEdge for Statement {
    fn cycle_location(&self) -> Span {
        self.span
    }
}

/// Report a call to a function that does not exist.
pub(crate) fn unknown_function(caller: &Function, callee: &FunctionRef, at: Span) -> Box<Diagnostic> {
    Box::new(Diagnostic::new(
        ErrorKind::UnknownFunction,
        at,
        format!(
            "cannot find function '{}' called from '{}'",
            callee.description(),
            caller.name
        ),
    ))
}

// ── Recursion ──

/// Build the whole-program call graph.
pub fn build_call_graph(program: &Program) -> CheckResult<CycleDetector<'_, Function, Statement>> {
    let mut detector = CycleDetector::new();
    let mut nodes: HashMap<FunctionId, usize> = HashMap::new();
    for (id, function) in program.functions() {
        nodes.insert(id, detector.add_node(function));
    }

    for (id, function) in program.functions() {
        for statement in function.statements() {
            let StatementKind::FunctionCall { function: callee, .. } = &statement.kind else {
                continue;
            };
            let target = program
                .resolve_function(id.module, callee)
                .and_then(|target| nodes.get(&target).copied())
                .ok_or_else(|| unknown_function(function, callee, statement.span))?;
            detector.add_edge(nodes[&id], target, statement);
        }
    }

    log::debug!("call graph: {} functions", detector.node_count());
    Ok(detector)
}

fn recursion_diagnostic(cycle: &Cycle<'_, Function, Statement>) -> Box<Diagnostic> {
    let names = cycle.names();
    let (kind, message) = match names.as_slice() {
        [only] => (
            Recursion::SelfCall,
            format!("function '{}' calls itself recursively", only),
        ),
        [a, b] => (
            Recursion::Mutual,
            format!("functions '{}' and '{}' call each other recursively", a, b),
        ),
        chain => {
            let quoted: Vec<String> = chain.iter().map(|n| format!("'{}'", n)).collect();
            (
                Recursion::Chain,
                format!("recursive call sequence: {}", quoted.join(", ")),
            )
        }
    };

    let mut diag = Diagnostic::new(ErrorKind::RecursiveCallCycle(kind), cycle.nodes[0].span, message);
    for (i, call) in cycle.edges.iter().enumerate() {
        let from = names[i];
        let to = names[(i + 1) % names.len()];
        diag = diag.with_cause(format!("'{}' calls '{}'", from, to), Some(call.span));
    }
    Box::new(diag)
}

/// Reject any cycle in the call graph.
pub fn check_recursion(program: &Program) -> CheckResult<()> {
    let graph = build_call_graph(program)?;
    match graph.find_cycle() {
        Some(cycle) => Err(recursion_diagnostic(&cycle)),
        None => Ok(()),
    }
}

// ── Infinite loops ──

fn terminates(block: &Block) -> bool {
    matches!(block.terminator, Terminator::Return { .. }) || block.contains_advance()
}

/// Successor block indices of every block, in block order.
fn control_flow_graph(function: &Function) -> CheckResult<Vec<Vec<usize>>> {
    function
        .blocks
        .iter()
        .map(|block| {
            block
                .terminator
                .successors()
                .into_iter()
                .map(|label| match function.find_block(label) {
                    Some((index, _)) => Ok(index),
                    None => Diagnostic::new(
                        ErrorKind::UnknownBlock,
                        block.span,
                        format!(
                            "block '@{}' in function '{}' branches to unknown block '@{}'",
                            block.name, function.name, label
                        ),
                    )
                    .fail(),
                })
                .collect::<CheckResult<Vec<usize>>>()
        })
        .collect()
}

/// Does `function` contain a loop it can never leave?
pub fn contains_infinite_loop(function: &Function) -> CheckResult<bool> {
    if function.blocks.is_empty() {
        return Ok(false);
    }
    let successors = control_flow_graph(function)?;
    let count = successors.len();

    // Forward reachability from the entry block.
    let mut reachable = vec![false; count];
    let mut queue = VecDeque::from([0]);
    reachable[0] = true;
    while let Some(block) = queue.pop_front() {
        for &next in &successors[block] {
            if !reachable[next] {
                reachable[next] = true;
                queue.push_back(next);
            }
        }
    }

    // Backward reachability from every terminating block.
    let mut predecessors = vec![Vec::new(); count];
    for (from, targets) in successors.iter().enumerate() {
        for &to in targets {
            predecessors[to].push(from);
        }
    }
    let mut exits = vec![false; count];
    let mut queue: VecDeque<usize> = (0..count)
        .filter(|&i| terminates(&function.blocks[i]))
        .collect();
    for &i in &queue {
        exits[i] = true;
    }
    while let Some(block) = queue.pop_front() {
        for &prev in &predecessors[block] {
            if !exits[prev] {
                exits[prev] = true;
                queue.push_back(prev);
            }
        }
    }

    Ok((0..count).any(|i| reachable[i] && !exits[i]))
}

/// Reject every function with a loop that never exits or advances.
pub fn check_infinite_loops(program: &Program) -> CheckResult<()> {
    for (_, function) in program.functions() {
        if contains_infinite_loop(function)? {
            return Diagnostic::new(
                ErrorKind::InfiniteLoop,
                function.span,
                format!("function '{}' contains an infinite loop", function.name),
            )
            .with_hint("every loop must be able to reach a 'ret' or an 'advance'")
            .fail();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn program(source: &str) -> Program {
        let result = parse(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        result.program.expect("program")
    }

    #[test]
    fn self_recursion() {
        let p = program("namespace N { fn f() { @entry: call f() ret } }");
        let err = check_recursion(&p).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RecursiveCallCycle(Recursion::SelfCall));
        assert_eq!(err.message, "function 'f' calls itself recursively");
        assert_eq!(err.cause_chain.len(), 1);
    }

    #[test]
    fn mutual_recursion_across_modules() {
        let p = program(
            "namespace A { fn a() { @entry: call B::b() ret } }
             namespace B { fn b() { @entry: call A::a() ret } }",
        );
        let err = check_recursion(&p).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RecursiveCallCycle(Recursion::Mutual));
        assert_eq!(err.message, "functions 'a' and 'b' call each other recursively");
        assert_eq!(err.span, p.modules[0].functions[0].span);
    }

    #[test]
    fn call_chain_lists_functions_in_call_order() {
        let p = program(
            "namespace N {
                fn a() { @entry: call b() ret }
                fn b() { @entry: call c() ret }
                fn c() { @entry: call d() ret }
                fn d() { @entry: call a() ret }
            }",
        );
        let err = check_recursion(&p).unwrap_err();
        assert_eq!(err.message, "recursive call sequence: 'a', 'b', 'c', 'd'");
        assert_eq!(err.cause_chain[3].message, "'d' calls 'a'");
    }

    #[test]
    fn diamond_calls_are_not_recursive() {
        let p = program(
            "namespace N {
                fn a() { @entry: call b() call c() ret }
                fn b() { @entry: call d() ret }
                fn c() { @entry: call d() ret }
                fn d() { @entry: ret }
            }",
        );
        assert!(check_recursion(&p).is_ok());
    }

    #[test]
    fn unknown_callee_reported() {
        let p = program("namespace N { fn a() { @entry: call missing() ret } }");
        let err = check_recursion(&p).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownFunction);
    }

    #[test]
    fn self_branch_without_exit_loops_forever() {
        let p = program("namespace N { fn f() { @entry: br @entry } }");
        assert!(contains_infinite_loop(&p.modules[0].functions[0]).unwrap());
        let err = check_infinite_loops(&p).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InfiniteLoop);
    }

    #[test]
    fn loop_with_conditional_exit_terminates() {
        let p = program(
            "namespace N {
                fn f($c: bool) {
                    @entry: br @loop
                    @loop: br_if $c, @loop, @done
                    @done: ret
                }
            }",
        );
        assert!(!contains_infinite_loop(&p.modules[0].functions[0]).unwrap());
    }

    #[test]
    fn advancing_loop_terminates() {
        let p = program("processor P { run fn run() { @entry: advance br @entry } }");
        assert!(!contains_infinite_loop(&p.modules[0].functions[0]).unwrap());
    }

    #[test]
    fn unreachable_loop_is_ignored() {
        let p = program(
            "namespace N {
                fn f() {
                    @entry: ret
                    @island: br @island
                }
            }",
        );
        assert!(!contains_infinite_loop(&p.modules[0].functions[0]).unwrap());
    }

    #[test]
    fn branch_to_unknown_block() {
        let p = program("namespace N { fn f() { @entry: br @nowhere } }");
        let err = contains_infinite_loop(&p.modules[0].functions[0]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownBlock);
        assert!(err.message.contains("'@nowhere'"));
    }
}
