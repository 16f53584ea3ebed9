// ir.rs: Flow IR: processors, graphs, functions, blocks and connections.
//
// The checker consumes this structure read-only. Ownership is strictly
// hierarchical (program → module → function → block); every cross reference
// (instance → module, connection → instance/endpoint, call → function,
// branch → block) is a name resolved through the lookup helpers below.
//
// Preconditions: produced by the parser or built directly by a front end.
// Postconditions: every checkable node carries a `Span`.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;

use crate::id::{FunctionId, ModuleId};
use crate::types::Type;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Program ──

/// A whole program: all modules plus the designated main processor.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub modules: Vec<Module>,
    pub main: Option<ModuleId>,
}

impl Program {
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.index())
    }

    pub fn main_processor(&self) -> Option<&Module> {
        self.main.and_then(|id| self.module(id))
    }

    pub fn find_module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        (0..self.modules.len()).map(|i| ModuleId(i as u32))
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.module(id.module)?.functions.get(id.index as usize)
    }

    /// All functions in declaration order, paired with their IDs.
    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> + '_ {
        self.module_ids().flat_map(move |mid| {
            self.modules[mid.index()]
                .functions
                .iter()
                .enumerate()
                .map(move |(i, f)| (FunctionId::new(mid, i), f))
        })
    }

    /// Resolve a call reference made from inside module `from`.
    /// Unqualified names are looked up in the calling module.
    pub fn resolve_function(&self, from: ModuleId, callee: &FunctionRef) -> Option<FunctionId> {
        let module_id = match &callee.module {
            Some(name) => ModuleId(self.modules.iter().position(|m| &m.name == name)? as u32),
            None => from,
        };
        let module = self.module(module_id)?;
        let index = module.functions.iter().position(|f| f.name == callee.name)?;
        Some(FunctionId::new(module_id, index))
    }
}

// ── Modules ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Processor,
    Graph,
    Namespace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub kind: ModuleKind,
    pub inputs: Vec<IoDeclaration>,
    pub outputs: Vec<IoDeclaration>,
    pub instances: Vec<ProcessorInstance>,
    pub connections: Vec<Connection>,
    pub functions: Vec<Function>,
    pub span: Span,
}

impl Module {
    pub fn new(name: impl Into<String>, kind: ModuleKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            instances: Vec::new(),
            connections: Vec::new(),
            functions: Vec::new(),
            span,
        }
    }

    pub fn is_graph(&self) -> bool {
        self.kind == ModuleKind::Graph
    }

    pub fn is_processor(&self) -> bool {
        self.kind == ModuleKind::Processor
    }

    pub fn find_input(&self, name: &str) -> Option<&IoDeclaration> {
        self.inputs.iter().find(|io| io.name == name)
    }

    pub fn find_output(&self, name: &str) -> Option<&IoDeclaration> {
        self.outputs.iter().find(|io| io.name == name)
    }

    pub fn find_instance(&self, name: &str) -> Option<&ProcessorInstance> {
        self.instances.iter().find(|p| p.name == name)
    }
}

// ── Endpoints ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Stream,
    Event,
    Value,
}

impl EndpointKind {
    pub fn name(self) -> &'static str {
        match self {
            EndpointKind::Stream => "stream",
            EndpointKind::Event => "event",
            EndpointKind::Value => "value",
        }
    }
}

/// An input or output of a module.
#[derive(Debug, Clone, PartialEq)]
pub struct IoDeclaration {
    pub name: String,
    pub kind: EndpointKind,
    pub array_size: Option<u32>,
    /// Candidate data types. Streams and values carry exactly one; events may
    /// accept a union of message types.
    pub data_types: Vec<Type>,
    pub span: Span,
}

impl IoDeclaration {
    pub fn is_event(&self) -> bool {
        self.kind == EndpointKind::Event
    }

    /// The per-frame sample type of a stream, or the type of a value.
    pub fn frame_or_value_type(&self) -> Option<&Type> {
        self.data_types.first()
    }

    /// `float32` for a single type, `(float32, int32)` for a union.
    pub fn types_description(&self) -> String {
        match self.data_types.as_slice() {
            [single] => single.to_string(),
            types => {
                let names: Vec<String> = types.iter().map(|t| t.to_string()).collect();
                format!("({})", names.join(", "))
            }
        }
    }
}

// ── Graph structure ──

/// An instantiation of a module inside a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorInstance {
    pub name: String,
    /// Name of the instantiated module.
    pub module: String,
    /// Number of parallel copies.
    pub array_size: u32,
    pub span: Span,
}

/// One side of a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRef {
    /// Processor instance name; `None` refers to the graph's own I/O.
    pub processor: Option<String>,
    pub endpoint: String,
    pub index: Option<u32>,
}

impl EndpointRef {
    /// `inst.endpoint` or `endpoint` for the graph's own I/O.
    pub fn description(&self) -> String {
        match &self.processor {
            Some(p) => format!("{}.{}", p, self.endpoint),
            None => self.endpoint.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub source: EndpointRef,
    pub dest: EndpointRef,
    /// Buffering depth in frames; zero means an instantaneous edge.
    pub delay: u32,
    pub span: Span,
}

// ── Functions ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Plain,
    Run,
    UserInit,
    SystemInit,
    Event,
}

impl FunctionKind {
    /// Functions only the runtime scheduler may invoke.
    pub fn is_scheduler_entry(self) -> bool {
        matches!(
            self,
            FunctionKind::Run | FunctionKind::UserInit | FunctionKind::Event
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub kind: FunctionKind,
    pub params: Vec<Variable>,
    pub return_type: Option<Type>,
    pub blocks: Vec<Block>,
    pub span: Span,
}

impl Function {
    pub fn find_block(&self, label: &str) -> Option<(usize, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .find(|(_, b)| b.name == label)
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> + '_ {
        self.blocks.iter().flat_map(|b| b.statements.iter())
    }

    /// First `advance` in block order. Only the first one matters.
    pub fn find_first_advance(&self) -> Option<&Statement> {
        self.statements()
            .find(|s| matches!(s.kind, StatementKind::AdvanceClock))
    }

    /// First read or write of a stream endpoint in block order.
    pub fn find_first_stream_access(&self) -> Option<&Statement> {
        self.statements().find(|s| {
            matches!(
                s.kind,
                StatementKind::ReadStream { .. } | StatementKind::WriteStream { .. }
            )
        })
    }
}

// ── Blocks ──

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub params: Vec<Variable>,
    pub statements: Vec<Statement>,
    pub terminator: Terminator,
    pub span: Span,
}

impl Block {
    pub fn contains_advance(&self) -> bool {
        self.statements
            .iter()
            .any(|s| matches!(s.kind, StatementKind::AdvanceClock))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Branch {
        target: String,
        args: Vec<Expr>,
    },
    BranchIf {
        condition: Expr,
        targets: [String; 2],
        target_args: [Vec<Expr>; 2],
    },
    Return {
        value: Option<Expr>,
    },
}

impl Terminator {
    /// Labels this terminator can transfer control to.
    pub fn successors(&self) -> Vec<&str> {
        match self {
            Terminator::Branch { target, .. } => vec![target.as_str()],
            Terminator::BranchIf { targets, .. } => {
                vec![targets[0].as_str(), targets[1].as_str()]
            }
            Terminator::Return { .. } => Vec::new(),
        }
    }
}

// ── Statements ──

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

/// Reference to a callee; `module: None` means the caller's own module.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRef {
    pub module: Option<String>,
    pub name: String,
}

impl FunctionRef {
    pub fn description(&self) -> String {
        match &self.module {
            Some(m) => format!("{}::{}", m, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Assign {
        target: Variable,
        value: Expr,
    },
    FunctionCall {
        target: Option<Variable>,
        function: FunctionRef,
        args: Vec<Expr>,
    },
    ReadStream {
        target: Variable,
        endpoint: String,
    },
    WriteStream {
        endpoint: String,
        index: Option<u32>,
        value: Expr,
    },
    AdvanceClock,
}

// ── Expressions ──

/// A function-scoped variable together with its assigned type.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "add" => BinaryOp::Add,
            "sub" => BinaryOp::Sub,
            "mul" => BinaryOp::Mul,
            "div" => BinaryOp::Div,
            "lt" => BinaryOp::Lt,
            "le" => BinaryOp::Le,
            "gt" => BinaryOp::Gt,
            "ge" => BinaryOp::Ge,
            "eq" => BinaryOp::Eq,
            "ne" => BinaryOp::Ne,
            _ => return None,
        })
    }

    pub fn is_comparison(self) -> bool {
        !matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Variable(Variable),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn ty(&self) -> Type {
        match self {
            Expr::Literal(Literal::Bool(_)) => Type::BOOL,
            Expr::Literal(Literal::Int32(_)) => Type::INT32,
            Expr::Literal(Literal::Int64(_)) => Type::INT64,
            Expr::Literal(Literal::Float32(_)) => Type::FLOAT32,
            Expr::Literal(Literal::Float64(_)) => Type::FLOAT64,
            Expr::Variable(v) => v.ty.clone(),
            Expr::Binary { op, .. } if op.is_comparison() => Type::BOOL,
            Expr::Binary { lhs, .. } => lhs.ty(),
        }
    }

    pub(crate) fn variables_mut(&mut self) -> Vec<&mut Variable> {
        match self {
            Expr::Literal(_) => Vec::new(),
            Expr::Variable(v) => vec![v],
            Expr::Binary { lhs, rhs, .. } => {
                let mut vars = lhs.variables_mut();
                vars.extend(rhs.variables_mut());
                vars
            }
        }
    }
}

// ── Tests ──
