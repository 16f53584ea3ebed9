// print.rs: Textual form of the flow IR
//
// `Display` for `Program` emits `.fir` text the parser accepts. The main
// processor is always marked `main` explicitly, so printing a parsed program
// and parsing the result again yields an identical program.
//
// Preconditions: none.
// Postconditions: `parse(program.to_string())` reproduces `program` up to spans.
// Failure modes: non-finite float literals print but do not re-parse.
// Side effects: none.

use std::fmt;

use crate::ir::*;

const INDENT: &str = "    ";

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, module) in self.modules.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            if self.main.map(|id| id.index()) == Some(i) {
                write!(f, "main ")?;
            }
            write!(f, "{}", module)?;
        }
        Ok(())
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModuleKind::Processor => "processor",
            ModuleKind::Graph => "graph",
            ModuleKind::Namespace => "namespace",
        })
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} {{", self.kind, self.name)?;
        for io in &self.inputs {
            writeln!(f, "{INDENT}input {}", io)?;
        }
        for io in &self.outputs {
            writeln!(f, "{INDENT}output {}", io)?;
        }
        for instance in &self.instances {
            write!(f, "{INDENT}node {} = {}", instance.name, instance.module)?;
            if instance.array_size != 1 {
                write!(f, "[{}]", instance.array_size)?;
            }
            writeln!(f)?;
        }
        for connection in &self.connections {
            writeln!(f, "{INDENT}{}", connection)?;
        }
        for function in &self.functions {
            write!(f, "{}", function)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for IoDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.name(), self.name)?;
        if let Some(size) = self.array_size {
            write!(f, "[{}]", size)?;
        }
        write!(f, ": {}", self.types_description())
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())?;
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connect {} -> {}", self.source, self.dest)?;
        if self.delay > 0 {
            write!(f, " delay {}", self.delay)?;
        }
        Ok(())
    }
}

// ── Functions ──

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FunctionKind::Plain => "",
            FunctionKind::Run => "run ",
            FunctionKind::UserInit => "init ",
            FunctionKind::SystemInit => "sysinit ",
            FunctionKind::Event => "event ",
        })
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[Variable]) -> fmt::Result {
    write!(f, "(")?;
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "${}: {}", p.name, p.ty)?;
    }
    write!(f, ")")
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    write!(f, "(")?;
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", a)?;
    }
    write!(f, ")")
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{INDENT}{}fn {}", self.kind, self.name)?;
        write_params(f, &self.params)?;
        if let Some(ret) = &self.return_type {
            write!(f, " -> {}", ret)?;
        }
        writeln!(f, " {{")?;
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        writeln!(f, "{INDENT}}}")
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{INDENT}{INDENT}@{}", self.name)?;
        if !self.params.is_empty() {
            write_params(f, &self.params)?;
        }
        writeln!(f, ":")?;
        for statement in &self.statements {
            writeln!(f, "{INDENT}{INDENT}{INDENT}{}", statement.kind)?;
        }
        writeln!(f, "{INDENT}{INDENT}{INDENT}{}", self.terminator)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Assign { target, value } => {
                write!(f, "${}: {} = {}", target.name, target.ty, value)
            }
            StatementKind::FunctionCall {
                target,
                function,
                args,
            } => {
                if let Some(target) = target {
                    write!(f, "${}: {} = ", target.name, target.ty)?;
                }
                write!(f, "call {}", function.description())?;
                write_args(f, args)
            }
            StatementKind::ReadStream { target, endpoint } => {
                write!(f, "${}: {} = read {}", target.name, target.ty, endpoint)
            }
            StatementKind::WriteStream {
                endpoint,
                index,
                value,
            } => {
                write!(f, "write {}", endpoint)?;
                if let Some(index) = index {
                    write!(f, "[{}]", index)?;
                }
                write!(f, " {}", value)
            }
            StatementKind::AdvanceClock => write!(f, "advance"),
        }
    }
}

fn write_target(f: &mut fmt::Formatter<'_>, label: &str, args: &[Expr]) -> fmt::Result {
    write!(f, "@{}", label)?;
    if !args.is_empty() {
        write_args(f, args)?;
    }
    Ok(())
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Branch { target, args } => {
                write!(f, "br ")?;
                write_target(f, target, args)
            }
            Terminator::BranchIf {
                condition,
                targets,
                target_args,
            } => {
                write!(f, "br_if {}, ", condition)?;
                write_target(f, &targets[0], &target_args[0])?;
                write!(f, ", ")?;
                write_target(f, &targets[1], &target_args[1])
            }
            Terminator::Return { value: Some(value) } => write!(f, "ret {}", value),
            Terminator::Return { value: None } => write!(f, "ret"),
        }
    }
}

// ── Expressions ──

/// Float text that always lexes as a float: `1` becomes `1.0`, `1e20`
/// becomes `1.0e20`.
fn float_text(debug: String) -> String {
    if debug.contains('.') || !debug.bytes().any(|b| b.is_ascii_digit()) {
        return debug;
    }
    match debug.find('e') {
        Some(pos) => format!("{}.0{}", &debug[..pos], &debug[pos..]),
        None => format!("{}.0", debug),
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int32(v) => write!(f, "{}", v),
            Literal::Int64(v) => write!(f, "{}i64", v),
            Literal::Float32(v) => write!(f, "{}f", float_text(format!("{:?}", v))),
            Literal::Float64(v) => write!(f, "{}", float_text(format!("{:?}", v))),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Variable(v) => write!(f, "${}", v.name),
            Expr::Binary { op, lhs, rhs } => write!(f, "{} {}, {}", op.name(), lhs, rhs),
        }
    }
}
