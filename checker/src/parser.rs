// Parser for flow IR `.fir` source files.
//
// Parses a token stream (from the lexer) into a `Program`. Uses chumsky
// combinators. The grammar, informally:
//
//   program    := module*
//   module     := 'main'? ('processor' | 'graph' | 'namespace') IDENT '{' member* '}'
//   member     := io_decl | node | connection | function
//   io_decl    := ('input' | 'output') ('stream' | 'event' | 'value') IDENT ('[' INT ']')?
//                 ':' (type | '(' type (',' type)* ')')
//   node       := 'node' IDENT '=' IDENT ('[' INT ']')?
//   connection := 'connect' ref '->' ref ('delay' INT)?
//   ref        := IDENT ('.' IDENT)? ('[' INT ']')?
//   function   := ('run' | 'init' | 'sysinit' | 'event')? 'fn' NAME params ('->' type)?
//                 '{' block* '}'
//   block      := LABEL params? ':' statement* terminator
//   statement  := VAR ':' type '=' (call | 'read' IDENT | expr)
//               | call | 'write' IDENT ('[' INT ']')? expr | 'advance'
//   terminator := 'br' target | 'br_if' expr ',' target ',' target | 'ret' expr?
//   target     := LABEL args?
//   call       := 'call' (IDENT '::')? NAME args
//   expr       := atom | OP atom ',' atom
//   type       := PRIM ('<' INT '>')? ('[' INT ']')* '&'?
//
// Variables are function-scoped. Each one is declared exactly once per type
// (function parameter, block parameter, or typed assignment target); every
// use is given the declared type once the whole function has been parsed.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns a `Program` plus any parse errors (non-fatal).
// Failure modes: syntax errors, unknown types/variables and duplicate `main`
//                markers produce `Rich` diagnostics.
// Side effects: none.

use std::collections::HashMap;

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::id::ModuleId;
use crate::ir::*;
use crate::lexer::Token;
use crate::types::{Primitive, Type};

/// Result of parsing: program plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub program: Option<Program>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a `.fir` source string. Lexes then parses.
///
/// Returns a program (if parsing succeeded) plus any errors.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = program_parser(source);
    let (program, parse_errors) = parser.parse(stream).into_output_errors();

    // Merge lex errors + parse errors.
    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        program,
        errors: all_errors,
    }
}

// ── Intermediate shapes ──

enum Member {
    Input(IoDeclaration),
    Output(IoDeclaration),
    Instance(ProcessorInstance),
    Connection(Connection),
    Function(Function),
}

enum Rhs {
    Call(FunctionRef, Vec<Expr>),
    Read(String),
    Value(Expr),
}

// ── Main parser builder ──
//
// All grammar rules are built inside `program_parser` so that the `source`
// reference is captured once and shared by all combinators.

fn program_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Program, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    // `skip` drops the `$` / `@` sigil of variables and labels.
    let text = move |span: SimpleSpan, skip: usize| source[span.start() + skip..span.end()].to_string();

    // ── Names ──

    let ident = just(Token::Ident).map_with(move |_, e| text(e.span(), 0));

    // `run` and `init` are keywords but also conventional function names.
    let fn_name = just(Token::Ident)
        .or(just(Token::Run))
        .or(just(Token::Init))
        .map_with(move |_, e| text(e.span(), 0));

    let var = just(Token::Var).map_with(move |_, e| text(e.span(), 1));

    let label = just(Token::Label).map_with(move |_, e| text(e.span(), 1));

    let size = select! {
        Token::Int(n) if n >= 0 && n <= u32::MAX as i64 => n as u32,
    };

    let array_suffix = size
        .clone()
        .delimited_by(just(Token::LBracket), just(Token::RBracket));

    // ── Types ──

    let primitive = just(Token::Ident)
        .map_with(move |_, e| text(e.span(), 0))
        .try_map(|name, span| {
            Primitive::from_name(&name).ok_or_else(|| {
                Rich::custom(
                    span,
                    format!(
                        "expected a type (void, bool, int32, int64, float32, float64), found '{}'",
                        name
                    ),
                )
            })
        });

    let ty = primitive
        .then(
            size.clone()
                .delimited_by(just(Token::Lt), just(Token::Gt))
                .or_not(),
        )
        .then(array_suffix.clone().repeated().collect::<Vec<_>>())
        .then(just(Token::Amp).or_not())
        .map(|(((prim, width), dims), amp)| {
            let mut t = match width {
                Some(n) => Type::Vector(prim, n),
                None => Type::Primitive(prim),
            };
            for n in dims {
                t = Type::array_of(t, n);
            }
            if amp.is_some() {
                t = Type::reference_to(t);
            }
            t
        });

    let typed_var = var
        .clone()
        .then_ignore(just(Token::Colon))
        .then(ty.clone())
        .map(|(name, ty)| Variable { name, ty });

    let params = typed_var
        .clone()
        .separated_by(just(Token::Comma))
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen));

    // ── Expressions ──

    let literal = select! {
        Token::Int(n) if n >= i32::MIN as i64 && n <= i32::MAX as i64 => Literal::Int32(n as i32),
        Token::Int64(n) => Literal::Int64(n),
        Token::Float32(v) => Literal::Float32(v),
        Token::Float64(v) => Literal::Float64(v),
        Token::True => Literal::Bool(true),
        Token::False => Literal::Bool(false),
    };

    // Uses are typed after the whole function is parsed.
    let atom = literal.map(Expr::Literal).or(var
        .clone()
        .map(|name| Expr::Variable(Variable { name, ty: Type::VOID })));

    let binary_op = just(Token::Ident)
        .map_with(move |_, e| text(e.span(), 0))
        .try_map(|name, span| {
            BinaryOp::from_name(&name)
                .ok_or_else(|| Rich::custom(span, format!("unknown operator '{}'", name)))
        });

    let binary = binary_op
        .then(atom.clone())
        .then_ignore(just(Token::Comma))
        .then(atom.clone())
        .map(|((op, lhs), rhs)| Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        });

    let expr = binary.or(atom);

    let args = expr
        .clone()
        .separated_by(just(Token::Comma))
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen));

    // ── Statements ──

    let function_ref = fn_name
        .clone()
        .then(just(Token::PathSep).ignore_then(fn_name.clone()).or_not())
        .map(|(first, second)| match second {
            Some(name) => FunctionRef {
                module: Some(first),
                name,
            },
            None => FunctionRef {
                module: None,
                name: first,
            },
        });

    let call = just(Token::Call)
        .ignore_then(function_ref)
        .then(args.clone());

    let rhs = choice((
        call.clone().map(|(function, args)| Rhs::Call(function, args)),
        just(Token::Read).ignore_then(ident.clone()).map(Rhs::Read),
        expr.clone().map(Rhs::Value),
    ));

    let assign = typed_var
        .clone()
        .then_ignore(just(Token::Equals))
        .then(rhs)
        .map(|(target, rhs)| match rhs {
            Rhs::Call(function, args) => StatementKind::FunctionCall {
                target: Some(target),
                function,
                args,
            },
            Rhs::Read(endpoint) => StatementKind::ReadStream { target, endpoint },
            Rhs::Value(value) => StatementKind::Assign { target, value },
        });

    let call_stmt = call.map(|(function, args)| StatementKind::FunctionCall {
        target: None,
        function,
        args,
    });

    let write_stmt = just(Token::Write)
        .ignore_then(ident.clone())
        .then(array_suffix.clone().or_not())
        .then(expr.clone())
        .map(|((endpoint, index), value)| StatementKind::WriteStream {
            endpoint,
            index,
            value,
        });

    let advance = just(Token::Advance).to(StatementKind::AdvanceClock);

    let statement = choice((assign, call_stmt, write_stmt, advance)).map_with(|kind, e| {
        Statement {
            kind,
            span: e.span(),
        }
    });

    // ── Terminators ──

    let target = label
        .clone()
        .then(args.clone().or_not())
        .map(|(label, args)| (label, args.unwrap_or_default()));

    let branch = just(Token::Br)
        .ignore_then(target.clone())
        .map(|(target, args)| Terminator::Branch { target, args });

    let branch_if = just(Token::BrIf)
        .ignore_then(expr.clone())
        .then_ignore(just(Token::Comma))
        .then(target.clone())
        .then_ignore(just(Token::Comma))
        .then(target)
        .map(
            |((condition, (if_true, true_args)), (if_false, false_args))| Terminator::BranchIf {
                condition,
                targets: [if_true, if_false],
                target_args: [true_args, false_args],
            },
        );

    let ret = just(Token::Ret)
        .ignore_then(expr.or_not())
        .map(|value| Terminator::Return { value });

    let terminator = choice((branch, branch_if, ret));

    // ── Blocks and functions ──

    let block = label
        .then(params.clone().or_not())
        .then_ignore(just(Token::Colon))
        .then(statement.repeated().collect::<Vec<_>>())
        .then(terminator)
        .map_with(|(((name, params), statements), terminator), e| Block {
            name,
            params: params.unwrap_or_default(),
            statements,
            terminator,
            span: e.span(),
        });

    let function_kind = choice((
        just(Token::Run).to(FunctionKind::Run),
        just(Token::Init).to(FunctionKind::UserInit),
        just(Token::SysInit).to(FunctionKind::SystemInit),
        just(Token::Event).to(FunctionKind::Event),
    ))
    .or_not()
    .map(|kind| kind.unwrap_or(FunctionKind::Plain));

    let function = function_kind
        .then_ignore(just(Token::Fn))
        .then(fn_name)
        .then(params)
        .then(just(Token::Arrow).ignore_then(ty.clone()).or_not())
        .then(
            block
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBrace), just(Token::RBrace)),
        )
        .map_with(
            |((((kind, name), params), return_type), blocks), e| Function {
                name,
                kind,
                params,
                return_type,
                blocks,
                span: e.span(),
            },
        )
        .try_map(|function, span| {
            assign_variable_types(function).map_err(|message| Rich::custom(span, message))
        });

    // ── Module members ──

    let endpoint_kind = choice((
        just(Token::Stream).to(EndpointKind::Stream),
        just(Token::Event).to(EndpointKind::Event),
        just(Token::Value).to(EndpointKind::Value),
    ));

    let type_list = ty.clone().map(|t| vec![t]).or(ty
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen)));

    let io_decl = just(Token::Input)
        .to(true)
        .or(just(Token::Output).to(false))
        .then(endpoint_kind)
        .then(ident.clone())
        .then(array_suffix.clone().or_not())
        .then_ignore(just(Token::Colon))
        .then(type_list)
        .map_with(|((((is_input, kind), name), array_size), data_types), e| {
            let decl = IoDeclaration {
                name,
                kind,
                array_size,
                data_types,
                span: e.span(),
            };
            if is_input {
                Member::Input(decl)
            } else {
                Member::Output(decl)
            }
        });

    let node = just(Token::Node)
        .ignore_then(ident.clone())
        .then_ignore(just(Token::Equals))
        .then(ident.clone())
        .then(array_suffix.clone().or_not())
        .map_with(|((name, module), array_size), e| {
            Member::Instance(ProcessorInstance {
                name,
                module,
                array_size: array_size.unwrap_or(1),
                span: e.span(),
            })
        });

    let endpoint_ref = ident
        .clone()
        .then(just(Token::Dot).ignore_then(ident.clone()).or_not())
        .then(array_suffix.or_not())
        .map(|((first, second), index)| match second {
            Some(endpoint) => EndpointRef {
                processor: Some(first),
                endpoint,
                index,
            },
            None => EndpointRef {
                processor: None,
                endpoint: first,
                index,
            },
        });

    let connection = just(Token::Connect)
        .ignore_then(endpoint_ref.clone())
        .then_ignore(just(Token::Arrow))
        .then(endpoint_ref)
        .then(just(Token::Delay).ignore_then(size).or_not())
        .map_with(|((source, dest), delay), e| {
            Member::Connection(Connection {
                source,
                dest,
                delay: delay.unwrap_or(0),
                span: e.span(),
            })
        });

    let member = choice((io_decl, node, connection, function.map(Member::Function)));

    // ── Modules ──

    let module_kind = choice((
        just(Token::Processor).to(ModuleKind::Processor),
        just(Token::Graph).to(ModuleKind::Graph),
        just(Token::Namespace).to(ModuleKind::Namespace),
    ));

    let module = just(Token::Main)
        .or_not()
        .map(|m| m.is_some())
        .then(module_kind)
        .then(ident)
        .then(
            member
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBrace), just(Token::RBrace)),
        )
        .map_with(|(((is_main, kind), name), members), e| {
            let mut module = Module::new(name, kind, e.span());
            for member in members {
                match member {
                    Member::Input(io) => module.inputs.push(io),
                    Member::Output(io) => module.outputs.push(io),
                    Member::Instance(p) => module.instances.push(p),
                    Member::Connection(c) => module.connections.push(c),
                    Member::Function(f) => module.functions.push(f),
                }
            }
            (is_main, module)
        });

    // ── Program ──

    module
        .repeated()
        .collect::<Vec<_>>()
        .try_map(|modules, span| {
            build_program(modules).map_err(|message| Rich::custom(span, message))
        })
}

// ── Post-parse resolution ──

/// Pick the main processor: the one marked `main`, else the last processor
/// or graph.
fn build_program(modules: Vec<(bool, Module)>) -> Result<Program, String> {
    let marked: Vec<&str> = modules
        .iter()
        .filter(|(is_main, _)| *is_main)
        .map(|(_, m)| m.name.as_str())
        .collect();
    if marked.len() > 1 {
        return Err(format!(
            "only one module can be marked 'main', found: {}",
            marked.join(", ")
        ));
    }

    let main = modules
        .iter()
        .position(|(is_main, _)| *is_main)
        .or_else(|| {
            modules
                .iter()
                .rposition(|(_, m)| m.kind != ModuleKind::Namespace)
        })
        .map(|i| ModuleId(i as u32));

    Ok(Program {
        modules: modules.into_iter().map(|(_, m)| m).collect(),
        main,
    })
}

fn declare(scope: &mut HashMap<String, Type>, var: &Variable) -> Result<(), String> {
    match scope.get(&var.name) {
        Some(existing) if *existing != var.ty => Err(format!(
            "variable '${}' declared as {} but previously as {}",
            var.name, var.ty, existing
        )),
        Some(_) => Ok(()),
        None => {
            scope.insert(var.name.clone(), var.ty.clone());
            Ok(())
        }
    }
}

fn resolve_uses(expr: &mut Expr, scope: &HashMap<String, Type>) -> Result<(), String> {
    for var in expr.variables_mut() {
        match scope.get(&var.name) {
            Some(ty) => var.ty = ty.clone(),
            None => return Err(format!("unknown variable '${}'", var.name)),
        }
    }
    Ok(())
}

/// Give every variable use the type of its declaration.
fn assign_variable_types(mut function: Function) -> Result<Function, String> {
    let mut scope = HashMap::new();

    for param in &function.params {
        declare(&mut scope, param)?;
    }
    for block in &function.blocks {
        for param in &block.params {
            declare(&mut scope, param)?;
        }
        for statement in &block.statements {
            match &statement.kind {
                StatementKind::Assign { target, .. }
                | StatementKind::ReadStream { target, .. }
                | StatementKind::FunctionCall {
                    target: Some(target),
                    ..
                } => declare(&mut scope, target)?,
                _ => {}
            }
        }
    }

    for block in &mut function.blocks {
        for statement in &mut block.statements {
            match &mut statement.kind {
                StatementKind::Assign { value, .. } | StatementKind::WriteStream { value, .. } => {
                    resolve_uses(value, &scope)?
                }
                StatementKind::FunctionCall { args, .. } => {
                    for arg in args {
                        resolve_uses(arg, &scope)?;
                    }
                }
                StatementKind::ReadStream { .. } | StatementKind::AdvanceClock => {}
            }
        }
        match &mut block.terminator {
            Terminator::Branch { args, .. } => {
                for arg in args {
                    resolve_uses(arg, &scope)?;
                }
            }
            Terminator::BranchIf {
                condition,
                target_args,
                ..
            } => {
                resolve_uses(condition, &scope)?;
                for arg in target_args.iter_mut().flatten() {
                    resolve_uses(arg, &scope)?;
                }
            }
            Terminator::Return { value } => {
                if let Some(value) = value {
                    resolve_uses(value, &scope)?;
                }
            }
        }
    }

    Ok(function)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        let result = parse(source);
        assert!(
            result.errors.is_empty(),
            "unexpected errors: {:#?}",
            result.errors
        );
        result.program.expect("expected program")
    }

    fn parse_err(source: &str) -> Vec<String> {
        let result = parse(source);
        assert!(!result.errors.is_empty(), "expected parse errors");
        result.errors.iter().map(|e| e.to_string()).collect()
    }

    fn only_function(program: &Program) -> &Function {
        &program.modules[0].functions[0]
    }

    // ── Modules ──

    #[test]
    fn empty_program() {
        let program = parse_ok("");
        assert!(program.modules.is_empty());
        assert_eq!(program.main, None);
    }

    #[test]
    fn io_declarations() {
        let program = parse_ok(
            "processor P {
                input stream audio: float32<2>
                input event control[4]: (float32, int32)
                output value level: float64
            }",
        );
        let p = &program.modules[0];
        assert_eq!(p.kind, ModuleKind::Processor);
        assert_eq!(p.inputs.len(), 2);
        assert_eq!(
            p.inputs[0].data_types,
            vec![Type::Vector(Primitive::Float32, 2)]
        );
        assert_eq!(p.inputs[1].kind, EndpointKind::Event);
        assert_eq!(p.inputs[1].array_size, Some(4));
        assert_eq!(p.inputs[1].data_types, vec![Type::FLOAT32, Type::INT32]);
        assert_eq!(p.outputs[0].kind, EndpointKind::Value);
    }

    #[test]
    fn graph_nodes_and_connections() {
        let program = parse_ok(
            "graph G {
                node osc = Osc[3]
                node mix = Mixer
                connect in -> osc.freq
                connect osc.out[2] -> mix.in delay 16
            }",
        );
        let g = &program.modules[0];
        assert!(g.is_graph());
        assert_eq!(g.instances[0].array_size, 3);
        assert_eq!(g.instances[1].array_size, 1);
        assert_eq!(g.connections[0].source.processor, None);
        assert_eq!(g.connections[0].dest.description(), "osc.freq");
        assert_eq!(g.connections[1].source.index, Some(2));
        assert_eq!(g.connections[1].delay, 16);
        assert_eq!(g.connections[0].delay, 0);
    }

    #[test]
    fn main_defaults_to_last_processor_or_graph() {
        let program = parse_ok("processor A {} graph B {} namespace N {}");
        assert_eq!(program.main, Some(ModuleId(1)));
    }

    #[test]
    fn explicit_main_marker() {
        let program = parse_ok("main processor A {} graph B {}");
        assert_eq!(program.main, Some(ModuleId(0)));
    }

    #[test]
    fn duplicate_main_rejected() {
        let errors = parse_err("main processor A {} main processor B {}");
        assert!(errors[0].contains("only one module"), "{:?}", errors);
    }

    // ── Functions ──

    #[test]
    fn function_kinds() {
        let program = parse_ok(
            "processor P {
                run fn run() {}
                init fn init() {}
                sysinit fn setup() {}
                event fn gain($g: float32) {}
                fn helper() -> int32 {}
            }",
        );
        let kinds: Vec<FunctionKind> = program.modules[0]
            .functions
            .iter()
            .map(|f| f.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                FunctionKind::Run,
                FunctionKind::UserInit,
                FunctionKind::SystemInit,
                FunctionKind::Event,
                FunctionKind::Plain,
            ]
        );
        assert_eq!(program.modules[0].functions[0].name, "run");
        assert_eq!(
            program.modules[0].functions[4].return_type,
            Some(Type::INT32)
        );
    }

    #[test]
    fn statements_and_terminators() {
        let program = parse_ok(
            "processor P {
                input stream in: float32
                output stream out: float32
                run fn run() {
                    @entry:
                        br @loop
                    @loop:
                        $x: float32 = read in
                        $y: float32 = mul $x, 0.5f
                        write out $y
                        call P::helper($y)
                        advance
                        br @loop
                }
                fn helper($v: float32) {
                    @entry:
                        ret
                }
            }",
        );
        let run = only_function(&program);
        assert_eq!(run.blocks.len(), 2);
        let body = &run.blocks[1];
        assert_eq!(body.statements.len(), 5);
        assert!(matches!(
            body.statements[0].kind,
            StatementKind::ReadStream { .. }
        ));
        assert!(matches!(
            &body.statements[3].kind,
            StatementKind::FunctionCall { function, .. } if function.module.as_deref() == Some("P")
        ));
        assert!(matches!(
            body.statements[4].kind,
            StatementKind::AdvanceClock
        ));
        assert_eq!(
            body.terminator,
            Terminator::Branch {
                target: "loop".into(),
                args: Vec::new()
            }
        );
    }

    #[test]
    fn variable_uses_get_declared_types() {
        let program = parse_ok(
            "namespace N {
                fn count($n: int64) {
                    @entry:
                        br @head(0i64)
                    @head($i: int64):
                        $done: bool = ge $i, $n
                        br_if $done, @exit, @next
                    @next:
                        $j: int64 = add $i, 1i64
                        br @head($j)
                    @exit:
                        ret
                }
            }",
        );
        let f = only_function(&program);
        match &f.blocks[1].terminator {
            Terminator::BranchIf { condition, .. } => assert_eq!(condition.ty(), Type::BOOL),
            other => panic!("expected br_if, got {:?}", other),
        }
        match &f.blocks[2].terminator {
            Terminator::Branch { args, .. } => assert_eq!(args[0].ty(), Type::INT64),
            other => panic!("expected br, got {:?}", other),
        }
    }

    #[test]
    fn block_params_and_conditional_args() {
        let program = parse_ok(
            "namespace N {
                fn f($c: bool) {
                    @entry:
                        br_if $c, @a(1), @b
                    @a($x: int32):
                        ret
                    @b:
                        ret
                }
            }",
        );
        let f = only_function(&program);
        assert_eq!(f.blocks[1].params.len(), 1);
        match &f.blocks[0].terminator {
            Terminator::BranchIf { target_args, .. } => {
                assert_eq!(target_args[0].len(), 1);
                assert!(target_args[1].is_empty());
            }
            other => panic!("expected br_if, got {:?}", other),
        }
    }

    #[test]
    fn compound_types() {
        let program = parse_ok(
            "namespace N {
                fn f($a: float32[4][2], $r: int32&) {}
            }",
        );
        let f = only_function(&program);
        assert_eq!(
            f.params[0].ty,
            Type::array_of(Type::array_of(Type::FLOAT32, 4), 2)
        );
        assert_eq!(f.params[1].ty, Type::reference_to(Type::INT32));
    }

    #[test]
    fn unknown_variable_rejected() {
        let errors = parse_err(
            "namespace N {
                fn f() {
                    @entry:
                        ret $missing
                }
            }",
        );
        assert!(errors[0].contains("unknown variable '$missing'"), "{:?}", errors);
    }

    #[test]
    fn conflicting_declaration_rejected() {
        let errors = parse_err(
            "namespace N {
                fn f($x: int32) {
                    @entry:
                        $x: float32 = 1.0f
                        ret
                }
            }",
        );
        assert!(errors[0].contains("previously as int32"), "{:?}", errors);
    }

    #[test]
    fn unknown_type_rejected() {
        let errors = parse_err("processor P { input stream x: complex }");
        assert!(errors.iter().any(|e| e.contains("expected a type")), "{:?}", errors);
    }

    #[test]
    fn spans_cover_constructs() {
        let src = "graph G {\n  connect a.out -> b.in\n}";
        let program = parse_ok(src);
        let span = program.modules[0].connections[0].span;
        assert_eq!(&src[span.start..span.end], "connect a.out -> b.in");
    }

    #[test]
    fn missing_terminator_is_an_error() {
        parse_err("namespace N { fn f() { @entry: advance } }");
    }
}
