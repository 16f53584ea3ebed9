// flowck: semantic sanity checker for flow IR programs
//
// Library root. `parser::parse` builds a `ir::Program` from `.fir` text and
// `checker::sanity_check` accepts it or returns the first `diag::Diagnostic`.

pub mod callflow;
pub mod checker;
pub mod connections;
pub mod cycle;
pub mod diag;
pub mod id;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod pass;
pub mod print;
pub mod types;
