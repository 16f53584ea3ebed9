// checker.rs: Sanity check orchestration and the per-function legality passes
//
// Runs the 7 passes of `pass::ALL_PASSES` in order and stops at the first
// violation. Passes are stateless; the order only decides which diagnostic
// a program with several problems gets.
//
// Preconditions: every expression in the program carries its final type.
// Postconditions: `Ok(())` means the program may be handed to code generation.
// Failure modes: exactly one `Diagnostic`; an optional round-trip self test
//   reports `RoundTripError` instead.
// Side effects: `log` output only. The program is never mutated.

use std::fmt;

use crate::callflow;
use crate::connections;
use crate::cycle;
use crate::diag::{CheckResult, Diagnostic, ErrorKind};
use crate::id::ModuleId;
use crate::ir::{Function, FunctionKind, IoDeclaration, Program, StatementKind, Terminator};
use crate::pass::{descriptor, PassId, ALL_PASSES};
use crate::types::TypeRules;

// ── Options and errors ─────────────────────────────────────────────────────

/// Library-side configuration of a check run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Print, clone and re-parse the program before checking it.
    pub round_trip: bool,
}

/// The print/parse self test found a difference.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundTripError {
    /// A clone of the program prints differently from the program.
    CloneMismatch { line: usize, expected: String, found: String },
    /// The printed text does not parse.
    Unparseable { errors: Vec<String> },
    /// The re-parsed program prints differently.
    ReparseMismatch { line: usize, expected: String, found: String },
}

impl fmt::Display for RoundTripError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundTripError::CloneMismatch {
                line,
                expected,
                found,
            } => write!(
                f,
                "cloned program prints differently at line {}: expected `{}`, found `{}`",
                line, expected, found
            ),
            RoundTripError::Unparseable { errors } => {
                write!(f, "printed program does not parse")?;
                if let Some(first) = errors.first() {
                    write!(f, ": {}", first)?;
                }
                Ok(())
            }
            RoundTripError::ReparseMismatch {
                line,
                expected,
                found,
            } => write!(
                f,
                "re-parsed program prints differently at line {}: expected `{}`, found `{}`",
                line, expected, found
            ),
        }
    }
}

impl std::error::Error for RoundTripError {}

/// Why `check` rejected a program.
#[derive(Debug)]
pub enum CheckError {
    Rejected(Box<Diagnostic>),
    RoundTrip(RoundTripError),
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Rejected(diag) => write!(f, "{}", diag),
            CheckError::RoundTrip(err) => write!(f, "round-trip self test failed: {}", err),
        }
    }
}

impl std::error::Error for CheckError {}

// ── Entry points ───────────────────────────────────────────────────────────

/// Run every pass in order; the first violation wins.
pub fn sanity_check(program: &Program, rules: &dyn TypeRules) -> CheckResult<()> {
    for pass in ALL_PASSES {
        log::debug!("running pass '{}'", descriptor(pass).name);
        run_pass(pass, program, rules)?;
    }
    log::info!(
        "program accepted ({} modules, {} functions)",
        program.modules.len(),
        program.functions().count()
    );
    Ok(())
}

/// `sanity_check` plus the optional round-trip self test.
pub fn check(program: &Program, rules: &dyn TypeRules, options: &CheckOptions) -> Result<(), CheckError> {
    if options.round_trip {
        test_round_trip(program).map_err(CheckError::RoundTrip)?;
        log::debug!("round-trip self test passed");
    }
    sanity_check(program, rules).map_err(CheckError::Rejected)
}

/// Run a single pass.
pub fn run_pass(pass: PassId, program: &Program, rules: &dyn TypeRules) -> CheckResult<()> {
    match pass {
        PassId::TopLevelEndpoints => check_top_level_endpoints(program),
        PassId::Connections => connections::check_connections(program, rules),
        PassId::AdvanceAndStreams => check_advance_and_streams(program),
        PassId::Recursion => callflow::check_recursion(program),
        PassId::InfiniteLoops => callflow::check_infinite_loops(program),
        PassId::BlockParameters => check_block_parameters(program, rules),
        PassId::GraphCycles => check_graph_cycles(program),
    }
}

// ── Round trip ─────────────────────────────────────────────────────────────

/// First differing line (1-based) of two texts.
fn first_difference(expected: &str, found: &str) -> (usize, String, String) {
    let mut a = expected.lines();
    let mut b = found.lines();
    let mut line = 1;
    loop {
        match (a.next(), b.next()) {
            (Some(x), Some(y)) if x == y => line += 1,
            (x, y) => {
                return (
                    line,
                    x.unwrap_or("<end>").trim().to_string(),
                    y.unwrap_or("<end>").trim().to_string(),
                )
            }
        }
    }
}

/// Print the program, check a clone prints the same, re-parse the text and
/// check the result prints the same again.
pub fn test_round_trip(program: &Program) -> Result<(), RoundTripError> {
    let text = program.to_string();

    let cloned = program.clone().to_string();
    if cloned != text {
        let (line, expected, found) = first_difference(&text, &cloned);
        return Err(RoundTripError::CloneMismatch {
            line,
            expected,
            found,
        });
    }

    let parsed = crate::parser::parse(&text);
    let reparsed = match parsed.program {
        Some(p) if parsed.errors.is_empty() => p,
        _ => {
            return Err(RoundTripError::Unparseable {
                errors: parsed.errors.iter().map(|e| e.to_string()).collect(),
            })
        }
    };

    let reprinted = reparsed.to_string();
    if reprinted != text {
        let (line, expected, found) = first_difference(&text, &reprinted);
        return Err(RoundTripError::ReparseMismatch {
            line,
            expected,
            found,
        });
    }
    Ok(())
}

// ── Pass 1: top-level endpoints ────────────────────────────────────────────

fn check_top_level_endpoint(io: &IoDeclaration, direction: &str) -> CheckResult<()> {
    if io.array_size.is_some() {
        return Diagnostic::new(
            ErrorKind::TopLevelArrayNotSupported,
            io.span,
            format!(
                "top-level arrays of {}s are not yet supported ('{}')",
                direction, io.name
            ),
        )
        .fail();
    }
    if io.data_types.len() != 1 {
        return Diagnostic::new(
            ErrorKind::TopLevelMultiTypeNotSupported,
            io.span,
            format!(
                "top-level {} '{}' must have exactly one data type, found {}",
                direction,
                io.name,
                io.types_description()
            ),
        )
        .fail();
    }
    Ok(())
}

fn check_top_level_endpoints(program: &Program) -> CheckResult<()> {
    let Some(main) = program.main_processor() else {
        return Diagnostic::new(
            ErrorKind::MissingMainProcessor,
            (0..0).into(),
            "program has no main processor",
        )
        .with_hint("mark a processor or graph with 'main'")
        .fail();
    };
    for input in &main.inputs {
        check_top_level_endpoint(input, "input")?;
    }
    for output in &main.outputs {
        check_top_level_endpoint(output, "output")?;
    }
    Ok(())
}

// ── Pass 3: advance and stream usage ───────────────────────────────────────

fn check_calls(program: &Program, module: ModuleId, function: &Function) -> CheckResult<()> {
    for statement in function.statements() {
        let StatementKind::FunctionCall { function: callee, .. } = &statement.kind else {
            continue;
        };
        let target = program
            .resolve_function(module, callee)
            .and_then(|id| program.function(id))
            .ok_or_else(|| callflow::unknown_function(function, callee, statement.span))?;
        if target.kind.is_scheduler_entry() {
            return Diagnostic::new(
                ErrorKind::IllegalCallTarget,
                statement.span,
                format!("cannot call function '{}' directly", callee.description()),
            )
            .with_related(target.span, format!("'{}' declared here", target.name))
            .with_hint("run, init and event functions are only invoked by the scheduler")
            .fail();
        }
    }
    Ok(())
}

fn check_advance_and_streams(program: &Program) -> CheckResult<()> {
    for module_id in program.module_ids() {
        let module = &program.modules[module_id.index()];
        for function in &module.functions {
            let first_advance = function.find_first_advance();

            if function.kind == FunctionKind::Run && first_advance.is_none() {
                return Diagnostic::new(
                    ErrorKind::RunFunctionMissingAdvance,
                    function.span,
                    format!("run function '{}' must call advance", function.name),
                )
                .fail();
            }

            if let Some(advance) = first_advance {
                if !module.is_processor() {
                    return Diagnostic::new(
                        ErrorKind::AdvanceCalledOutsideProcessor,
                        advance.span,
                        format!(
                            "advance can only be called from inside a processor ('{}' is in {} '{}')",
                            function.name, module.kind, module.name
                        ),
                    )
                    .fail();
                }
            }

            if function.kind != FunctionKind::SystemInit {
                check_calls(program, module_id, function)?;
            }

            if function.kind == FunctionKind::UserInit {
                if let Some(access) = function.find_first_stream_access() {
                    return Diagnostic::new(
                        ErrorKind::StreamAccessDuringInit,
                        access.span,
                        format!(
                            "streams cannot be read or written during init ('{}')",
                            function.name
                        ),
                    )
                    .fail();
                }
            }
        }
    }
    Ok(())
}

// ── Pass 6: block parameters ───────────────────────────────────────────────

fn check_function_blocks(function: &Function, rules: &dyn TypeRules) -> CheckResult<()> {
    let Some(entry) = function.blocks.first() else {
        return Ok(());
    };
    if !entry.params.is_empty() {
        return Diagnostic::new(
            ErrorKind::EntryBlockParameterised,
            function.span,
            format!(
                "entry block '@{}' of function '{}' cannot have parameters",
                entry.name, function.name
            ),
        )
        .fail();
    }

    for block in &function.blocks {
        if let Some(param) = block
            .params
            .iter()
            .find(|p| p.ty.is_reference() || p.ty.is_void())
        {
            return Diagnostic::new(
                ErrorKind::InvalidBlockParameterType,
                block.span,
                format!(
                    "parameter '${}' of block '@{}' has type {}; block parameters cannot be references or void",
                    param.name, block.name, param.ty
                ),
            )
            .fail();
        }

        match &block.terminator {
            Terminator::Branch { target, args } => {
                let Some((_, target_block)) = function.find_block(target) else {
                    return Diagnostic::new(
                        ErrorKind::UnknownBlock,
                        block.span,
                        format!(
                            "block '@{}' in function '{}' branches to unknown block '@{}'",
                            block.name, function.name, target
                        ),
                    )
                    .fail();
                };
                if args.len() != target_block.params.len() {
                    return Diagnostic::new(
                        ErrorKind::BranchArgumentMismatch,
                        block.span,
                        format!(
                            "branch from block '@{}' to '@{}' passes {} arguments, expected {}",
                            block.name,
                            target,
                            args.len(),
                            target_block.params.len()
                        ),
                    )
                    .with_related(target_block.span, format!("'@{}' declared here", target))
                    .fail();
                }
                for (i, (arg, param)) in args.iter().zip(&target_block.params).enumerate() {
                    let arg_type = arg.ty();
                    if !rules.can_silently_cast_to(&param.ty, &arg_type) {
                        return Diagnostic::new(
                            ErrorKind::BranchArgumentMismatch,
                            block.span,
                            format!(
                                "branch from block '@{}' to '@{}': argument {} has type {}, which cannot be passed as {}",
                                block.name,
                                target,
                                i + 1,
                                arg_type,
                                param.ty
                            ),
                        )
                        .with_related(target_block.span, format!("'@{}' declared here", target))
                        .fail();
                    }
                }
            }
            Terminator::BranchIf { target_args, .. } => {
                if target_args.iter().any(|args| !args.is_empty()) {
                    return Diagnostic::new(
                        ErrorKind::ParameterisedConditionalBranchUnsupported,
                        block.span,
                        format!(
                            "conditional branch in block '@{}' passes arguments; parameterised conditional branches are not yet implemented",
                            block.name
                        ),
                    )
                    .with_hint("branch to an intermediate block that passes the arguments")
                    .fail();
                }
            }
            Terminator::Return { .. } => {}
        }
    }
    Ok(())
}

fn check_block_parameters(program: &Program, rules: &dyn TypeRules) -> CheckResult<()> {
    for (_, function) in program.functions() {
        check_function_blocks(function, rules)?;
    }
    Ok(())
}

// ── Pass 7: graph cycles ───────────────────────────────────────────────────

fn check_graph_cycles(program: &Program) -> CheckResult<()> {
    for graph in program.modules.iter().filter(|m| m.is_graph()) {
        log::debug!("graph '{}': checking for zero-delay cycles", graph.name);
        cycle::check_graph_for_cycles(graph)?;
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────
