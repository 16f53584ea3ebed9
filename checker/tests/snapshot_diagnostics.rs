// Snapshot tests: lock rendered diagnostics and printed programs.
//
// Uses the library API (parse → sanity_check → render) and snapshots the
// text a user sees on stderr. Snapshots are managed by `insta` and stored
// under `checker/tests/snapshots/`.
//
// Run `cargo insta review` after intentional output changes to update baselines.

use std::path::{Path, PathBuf};

use flowck::checker::sanity_check;
use flowck::ir::Program;
use flowck::types::StandardTypeRules;

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn parse(source: &str) -> Program {
    let parse_result = flowck::parser::parse(source);
    assert!(
        parse_result.errors.is_empty(),
        "parse errors: {:?}",
        parse_result.errors
    );
    parse_result.program.unwrap()
}

/// Check `source` and render the resulting diagnostic as `file` would show it.
fn rejection(file: &str, source: &str) -> String {
    let program = parse(source);
    match sanity_check(&program, &StandardTypeRules) {
        Ok(()) => panic!("{} was accepted", file),
        Err(diag) => diag.render(file, source),
    }
}

// ── Diagnostics ─────────────────────────────────────────────────────────────

#[test]
fn snapshot_feedback_cycle() {
    let source = std::fs::read_to_string(project_root().join("demos/feedback.fir")).unwrap();
    insta::assert_snapshot!("feedback_cycle", rejection("feedback.fir", &source));
}

const MUTUAL_RECURSION: &str = "\
processor P {
    fn ping() {
        @entry:
            call pong()
            ret
    }
    fn pong() {
        @entry:
            call ping()
            ret
    }
}
";

#[test]
fn snapshot_mutual_recursion() {
    insta::assert_snapshot!("mutual_recursion", rejection("rec.fir", MUTUAL_RECURSION));
}

const INDEX_OUT_OF_RANGE: &str = "\
processor Voice {
    output stream out: float32
}
processor Mix {
    input stream in[2]: float32
}
main graph G {
    node v = Voice
    node m = Mix
    connect v.out -> m.in[2]
}
";

#[test]
fn snapshot_index_out_of_range() {
    insta::assert_snapshot!("index_out_of_range", rejection("g.fir", INDEX_OUT_OF_RANGE));
}

const ILLEGAL_CALL: &str = "\
processor P {
    event fn gain($g: float32) {
        @entry:
            ret
    }
    fn helper() {
        @entry:
            call gain(1.0f)
            ret
    }
}
";

#[test]
fn snapshot_illegal_call() {
    insta::assert_snapshot!("illegal_call", rejection("p.fir", ILLEGAL_CALL));
}

// ── Printed programs ────────────────────────────────────────────────────────

#[test]
fn snapshot_gain_dump() {
    let source = std::fs::read_to_string(project_root().join("demos/gain.fir")).unwrap();
    insta::assert_snapshot!("gain_dump", parse(&source).to_string());
}
