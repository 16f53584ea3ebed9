// diag.rs: Diagnostics model for the sanity checker
//
// A rejected program yields exactly one `Diagnostic`: an `ErrorKind`, the
// stable code derived from it, a message with quoted identifiers and the span
// of the offending construct. `DiagnosticReport` is the serializable view
// used by the driver's JSON output.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use serde::Serialize;

use crate::ir::Span;

/// Result of a checker pass. The first violation aborts the pass.
pub type CheckResult<T> = Result<T, Box<Diagnostic>>;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0401`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    // E01xx: top-level shape
    pub const E0100: DiagCode = DiagCode("E0100");
    pub const E0101: DiagCode = DiagCode("E0101");
    pub const E0102: DiagCode = DiagCode("E0102");
    // E02xx: connections
    pub const E0200: DiagCode = DiagCode("E0200");
    pub const E0201: DiagCode = DiagCode("E0201");
    pub const E0202: DiagCode = DiagCode("E0202");
    pub const E0203: DiagCode = DiagCode("E0203");
    pub const E0204: DiagCode = DiagCode("E0204");
    // E03xx: advance, stream usage and call targets
    pub const E0300: DiagCode = DiagCode("E0300");
    pub const E0301: DiagCode = DiagCode("E0301");
    pub const E0302: DiagCode = DiagCode("E0302");
    pub const E0303: DiagCode = DiagCode("E0303");
    pub const E0304: DiagCode = DiagCode("E0304");
    // E04xx: call flow
    pub const E0400: DiagCode = DiagCode("E0400");
    pub const E0401: DiagCode = DiagCode("E0401");
    pub const E0402: DiagCode = DiagCode("E0402");
    // E05xx: block parameters
    pub const E0500: DiagCode = DiagCode("E0500");
    pub const E0501: DiagCode = DiagCode("E0501");
    pub const E0502: DiagCode = DiagCode("E0502");
    pub const E0503: DiagCode = DiagCode("E0503");
    // E06xx: processor graphs
    pub const E0600: DiagCode = DiagCode("E0600");
}

// ── Error kinds ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Destination,
}

impl Side {
    pub fn name(self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Destination => "destination",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recursion {
    SelfCall,
    Mutual,
    Chain,
}

/// Every way the checker can reject a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ErrorKind {
    TopLevelArrayNotSupported,
    TopLevelMultiTypeNotSupported,
    MissingMainProcessor,
    UnknownProcessor,
    UnknownEndpoint(Side),
    EndpointIndexOutOfRange(Side),
    IncompatibleEndpointKinds,
    IncompatibleConnectionTypes,
    RunFunctionMissingAdvance,
    AdvanceCalledOutsideProcessor,
    IllegalCallTarget,
    StreamAccessDuringInit,
    UnknownFunction,
    RecursiveCallCycle(Recursion),
    InfiniteLoop,
    UnknownBlock,
    EntryBlockParameterised,
    InvalidBlockParameterType,
    BranchArgumentMismatch,
    ParameterisedConditionalBranchUnsupported,
    ProcessorGraphCycle,
}

impl ErrorKind {
    pub fn code(self) -> DiagCode {
        match self {
            ErrorKind::TopLevelArrayNotSupported => codes::E0100,
            ErrorKind::TopLevelMultiTypeNotSupported => codes::E0101,
            ErrorKind::MissingMainProcessor => codes::E0102,
            ErrorKind::UnknownProcessor => codes::E0200,
            ErrorKind::UnknownEndpoint(_) => codes::E0201,
            ErrorKind::EndpointIndexOutOfRange(_) => codes::E0202,
            ErrorKind::IncompatibleEndpointKinds => codes::E0203,
            ErrorKind::IncompatibleConnectionTypes => codes::E0204,
            ErrorKind::RunFunctionMissingAdvance => codes::E0300,
            ErrorKind::AdvanceCalledOutsideProcessor => codes::E0301,
            ErrorKind::IllegalCallTarget => codes::E0302,
            ErrorKind::StreamAccessDuringInit => codes::E0303,
            ErrorKind::UnknownFunction => codes::E0304,
            ErrorKind::RecursiveCallCycle(_) => codes::E0400,
            ErrorKind::InfiniteLoop => codes::E0401,
            ErrorKind::UnknownBlock => codes::E0402,
            ErrorKind::EntryBlockParameterised => codes::E0500,
            ErrorKind::InvalidBlockParameterType => codes::E0501,
            ErrorKind::BranchArgumentMismatch => codes::E0502,
            ErrorKind::ParameterisedConditionalBranchUnsupported => codes::E0503,
            ErrorKind::ProcessorGraphCycle => codes::E0600,
        }
    }
}

// ── Related span ─────────────────────────────────────────────────────────

/// A secondary source location providing context for a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedSpan {
    pub span: Span,
    pub label: String,
}

// ── Cause record ─────────────────────────────────────────────────────────

/// One link in a chain explaining a cycle (a call edge, a connection).
#[derive(Debug, Clone)]
pub struct CauseRecord {
    pub message: String,
    pub span: Option<Span>,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A checker diagnostic. Always a hard error.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
    pub related_spans: Vec<RelatedSpan>,
    pub cause_chain: Vec<CauseRecord>,
}

impl Diagnostic {
    /// Create a new diagnostic with no hint, related spans, or causes.
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
            hint: None,
            related_spans: Vec::new(),
            cause_chain: Vec::new(),
        }
    }

    pub fn code(&self) -> DiagCode {
        self.kind.code()
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a related span.
    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related_spans.push(RelatedSpan {
            span,
            label: label.into(),
        });
        self
    }

    /// Attach a cause record to the chain.
    pub fn with_cause(mut self, message: impl Into<String>, span: Option<Span>) -> Self {
        self.cause_chain.push(CauseRecord {
            message: message.into(),
            span,
        });
        self
    }

    /// Finish building and fail the current pass with this diagnostic.
    pub fn fail<T>(self) -> CheckResult<T> {
        Err(Box::new(self))
    }

    /// Render with `file:line:col` prefixes resolved against `source`.
    pub fn render(&self, file: &str, source: &str) -> String {
        let (line, col) = line_col(source, self.span.start);
        let mut out = format!("{}:{}:{}: {}", file, line, col, self);
        for related in &self.related_spans {
            let (line, col) = line_col(source, related.span.start);
            out.push_str(&format!(
                "\n  note: {}:{}:{}: {}",
                file, line, col, related.label
            ));
        }
        for cause in &self.cause_chain {
            match cause.span {
                Some(span) => {
                    let (line, col) = line_col(source, span.start);
                    out.push_str(&format!(
                        "\n  - {}:{}:{}: {}",
                        file, line, col, cause.message
                    ));
                }
                None => out.push_str(&format!("\n  - {}", cause.message)),
            }
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.code(), self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

/// 1-based line and column of a byte offset. Offsets past the end clamp to
/// the last position.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let col = before[line_start..].chars().count() + 1;
    (line, col)
}

// ── JSON report ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct LocationReport {
    pub line: usize,
    pub column: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteReport {
    pub message: String,
    pub location: Option<LocationReport>,
}

/// Serializable form of a diagnostic with resolved locations.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub code: DiagCode,
    #[serde(flatten)]
    pub kind: ErrorKind,
    pub message: String,
    pub hint: Option<String>,
    pub location: LocationReport,
    pub notes: Vec<NoteReport>,
}

impl DiagnosticReport {
    pub fn new(diag: &Diagnostic, source: &str) -> Self {
        let locate = |span: Span| {
            let (line, column) = line_col(source, span.start);
            LocationReport {
                line,
                column,
                start: span.start,
                end: span.end,
            }
        };
        let notes = diag
            .related_spans
            .iter()
            .map(|r| NoteReport {
                message: r.label.clone(),
                location: Some(locate(r.span)),
            })
            .chain(diag.cause_chain.iter().map(|c| NoteReport {
                message: c.message.clone(),
                location: c.span.map(locate),
            }))
            .collect();
        Self {
            code: diag.code(),
            kind: diag.kind,
            message: diag.message.clone(),
            hint: diag.hint.clone(),
            location: locate(diag.span),
            notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        use chumsky::span::Span as _;
        Span::new((), start..end)
    }

    #[test]
    fn display_with_code() {
        let d = Diagnostic::new(ErrorKind::InfiniteLoop, span(0, 1), "loops forever");
        assert_eq!(format!("{d}"), "error[E0401]: loops forever");
    }

    #[test]
    fn display_with_hint() {
        let d = Diagnostic::new(ErrorKind::RunFunctionMissingAdvance, span(0, 1), "no advance")
            .with_hint("call advance() once per frame");
        assert_eq!(
            format!("{d}"),
            "error[E0300]: no advance\n  hint: call advance() once per frame"
        );
    }

    #[test]
    fn builder_chain() {
        let d = Diagnostic::new(ErrorKind::ProcessorGraphCycle, span(0, 1), "cycle")
            .with_related(span(2, 3), "instance declared here")
            .with_cause("a -> b", Some(span(4, 5)));

        assert_eq!(d.code(), codes::E0600);
        assert_eq!(d.related_spans.len(), 1);
        assert_eq!(d.cause_chain.len(), 1);
    }

    #[test]
    fn codes_are_unique() {
        let kinds = [
            ErrorKind::TopLevelArrayNotSupported,
            ErrorKind::TopLevelMultiTypeNotSupported,
            ErrorKind::MissingMainProcessor,
            ErrorKind::UnknownProcessor,
            ErrorKind::UnknownEndpoint(Side::Source),
            ErrorKind::EndpointIndexOutOfRange(Side::Source),
            ErrorKind::IncompatibleEndpointKinds,
            ErrorKind::IncompatibleConnectionTypes,
            ErrorKind::RunFunctionMissingAdvance,
            ErrorKind::AdvanceCalledOutsideProcessor,
            ErrorKind::IllegalCallTarget,
            ErrorKind::StreamAccessDuringInit,
            ErrorKind::UnknownFunction,
            ErrorKind::RecursiveCallCycle(Recursion::Chain),
            ErrorKind::InfiniteLoop,
            ErrorKind::UnknownBlock,
            ErrorKind::EntryBlockParameterised,
            ErrorKind::InvalidBlockParameterType,
            ErrorKind::BranchArgumentMismatch,
            ErrorKind::ParameterisedConditionalBranchUnsupported,
            ErrorKind::ProcessorGraphCycle,
        ];
        let mut seen = std::collections::HashSet::new();
        for kind in kinds {
            assert!(seen.insert(kind.code()), "duplicate code for {:?}", kind);
        }
    }

    #[test]
    fn line_col_counts_from_one() {
        let src = "ab\ncd\n";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 4), (2, 2));
        assert_eq!(line_col(src, 100), (3, 1));
    }

    #[test]
    fn render_resolves_locations() {
        let src = "graph G {\n  connect a.out -> a.in\n}\n";
        let d = Diagnostic::new(ErrorKind::ProcessorGraphCycle, span(12, 33), "cycle")
            .with_cause("a -> a", None);
        assert_eq!(
            d.render("g.fir", src),
            "g.fir:2:3: error[E0600]: cycle\n  - a -> a"
        );
    }

    #[test]
    fn report_serializes_kind_and_detail() {
        let d = Diagnostic::new(
            ErrorKind::UnknownEndpoint(Side::Destination),
            span(0, 2),
            "cannot find destination 'x'",
        );
        let json = serde_json::to_value(DiagnosticReport::new(&d, "x\n")).unwrap();
        assert_eq!(json["code"], "E0201");
        assert_eq!(json["kind"], "unknown_endpoint");
        assert_eq!(json["detail"], "destination");
        assert_eq!(json["location"]["line"], 1);
    }
}
