// pass.rs: Pass descriptor module: identity, order and metadata of checker passes
//
// Declares the checker's 7 passes in their fixed execution order. The order
// only decides which diagnostic wins when a program breaks several rules;
// passes share no state. Used by the checker for logging and by the driver
// for `--list-passes`.

use serde::Serialize;

use crate::diag::{codes, DiagCode};

// ── Pass identifiers ───────────────────────────────────────────────────────

/// Identifies each checker pass (parsing happens before the checker runs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassId {
    TopLevelEndpoints,
    Connections,
    AdvanceAndStreams,
    Recursion,
    InfiniteLoops,
    BlockParameters,
    GraphCycles,
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a checker pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassDescriptor {
    /// Human-readable name for verbose output.
    pub name: &'static str,
    /// What the pass scans.
    pub scope: &'static str,
    /// Diagnostic codes this pass can report.
    pub codes: &'static [DiagCode],
    /// What holds once the pass accepts.
    pub invariants: &'static str,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::TopLevelEndpoints => PassDescriptor {
            name: "top_level_endpoints",
            scope: "main processor",
            codes: &[codes::E0102, codes::E0100, codes::E0101],
            invariants: "main processor exists, its endpoints are scalar and single-typed",
        },
        PassId::Connections => PassDescriptor {
            name: "connections",
            scope: "every graph connection",
            codes: &[
                codes::E0200,
                codes::E0201,
                codes::E0202,
                codes::E0203,
                codes::E0204,
            ],
            invariants: "every connection joins existing, compatible endpoints",
        },
        PassId::AdvanceAndStreams => PassDescriptor {
            name: "advance_and_streams",
            scope: "every function",
            codes: &[
                codes::E0300,
                codes::E0301,
                codes::E0302,
                codes::E0303,
                codes::E0304,
            ],
            invariants: "run functions advance, only processors advance, scheduler entries are never called",
        },
        PassId::Recursion => PassDescriptor {
            name: "recursion",
            scope: "whole-program call graph",
            codes: &[codes::E0400, codes::E0304],
            invariants: "the call graph is acyclic",
        },
        PassId::InfiniteLoops => PassDescriptor {
            name: "infinite_loops",
            scope: "control flow of every function",
            codes: &[codes::E0401, codes::E0402],
            invariants: "every reachable block can reach a return or an advance",
        },
        PassId::BlockParameters => PassDescriptor {
            name: "block_parameters",
            scope: "blocks and branches of every function",
            codes: &[
                codes::E0500,
                codes::E0501,
                codes::E0502,
                codes::E0503,
                codes::E0402,
            ],
            invariants: "branch arguments match target parameters",
        },
        PassId::GraphCycles => PassDescriptor {
            name: "graph_cycles",
            scope: "every graph's zero-delay connections",
            codes: &[codes::E0600],
            invariants: "every feedback loop is broken by a delay",
        },
    }
}

/// All 7 passes in execution order.
pub const ALL_PASSES: [PassId; 7] = [
    PassId::TopLevelEndpoints,
    PassId::Connections,
    PassId::AdvanceAndStreams,
    PassId::Recursion,
    PassId::InfiniteLoops,
    PassId::BlockParameters,
    PassId::GraphCycles,
];

// ── Tests ──────────────────────────────────────────────────────────────────
