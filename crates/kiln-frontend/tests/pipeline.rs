// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! End-to-end tests: files on disk through lex, parse and bind.

use std::fs;

use kiln_ast::dump::program_sexpr;
use kiln_ast::Source;
use kiln_diagnostics::{codes, Log};
use kiln_frontend::{compile, compile_path, LoadError, Phase};

const SHAPES: &str = r#"
// Geometry helpers.
struct Point[T] {
    x: T
    y: T
    func len() -> T => x * x + y * y
}

enum Shape: u8 { Circle = 1, Square }

type Scalar = i32 | f64

/* Sum every point's length.
   /* nested comments are fine */ */
func total(points: Point[i32][]) -> i32 {
    var sum = 0
    for (var i = 0; i < 10; i++) {
        if const p = points[i] {
            sum += p.len()
        } else {
            break
        }
    }
    defer log(`sum=${sum}`)
    return sum
}

func log(message: string) {}
"#;

#[test]
fn compiles_a_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shapes.kn");
    fs::write(&path, SHAPES).unwrap();

    let (source, compilation) = compile_path(&path).unwrap();
    assert!(compilation.is_ok(), "{}", compilation.render(&source));
    assert_eq!(compilation.phase, Phase::Bind);
    assert_eq!(source.name(), path.display().to_string());

    let summary = compilation.summary.unwrap();
    assert_eq!(summary.scopes_opened, summary.scopes_closed);
    assert!(summary.resolved > 10);
    assert!(summary.frames_allocated <= summary.max_depth);
    assert_eq!(compilation.program.items.len(), 5);
}

#[test]
fn missing_file_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.kn");

    let err = compile_path(&path).unwrap_err();
    let LoadError::Io { path: reported, .. } = &err;
    assert_eq!(reported, &path);
    assert!(err.to_string().starts_with("reading "));
}

#[test]
fn recovered_program_keeps_good_declarations() {
    let source = Source::new(
        "broken.kn",
        "func ok() { return 1 }\nvar = 3\nfunc also_ok(a: i32) => a\nstruct S { x: }\nvar last = 1",
    );
    let compilation = compile(&source);

    assert_eq!(compilation.phase, Phase::Parse);
    assert_eq!(compilation.log.error_count(), 2);
    assert_eq!(
        program_sexpr(&compilation.program),
        "(func ok (sig) (block (return 1)))\n\
         (func also_ok (sig (param a i32)) a)\n\
         (var last 1)"
    );
}

#[test]
fn bind_errors_render_with_labels() {
    colored::control::set_override(false);
    let source = Source::new("main.kn", "func main() {\n    var count = 1\n    var count = 2\n    cout\n}");
    let compilation = compile(&source);

    let found: Vec<_> = compilation
        .log
        .diagnostics()
        .iter()
        .filter_map(|d| d.code.as_ref().map(|c| c.0.clone()))
        .collect();
    assert_eq!(found, vec![codes::REDEFINITION, codes::UNDEFINED_IDENTIFIER]);

    let rendered = compilation.render(&source);
    assert!(rendered.contains("error[E0201]: redefinition of 'count'"));
    assert!(rendered.contains("--> main.kn:3:9"));
    assert!(rendered.contains("first declared here"));
    assert!(rendered.contains("= help: did you mean 'count'?"));
}

#[test]
fn json_report_names_the_last_phase() {
    let source = Source::new("main.kn", "func f() { break }");
    let compilation = compile(&source);
    let report = compilation.json_report(&source);

    assert!(!report.success);
    assert_eq!(report.phase, "bind");
    assert_eq!(report.error_count, 1);

    let value: serde_json::Value =
        serde_json::from_str(&kiln_diagnostics::json::to_json_string(&report)).unwrap();
    assert_eq!(value["diagnostics"][0]["code"], "E0204");
    assert_eq!(value["diagnostics"][0]["category"], "Resolution");
    assert_eq!(value["diagnostics"][0]["location"]["line"], 1);
}

#[test]
fn each_file_gets_its_own_log() {
    let files = ["var a = 1", "var b = missing", "func f( {"];
    let errors: Vec<usize> = files
        .iter()
        .enumerate()
        .map(|(i, text)| compile(&Source::new(format!("f{}.kn", i), *text)).log.error_count())
        .collect();
    assert_eq!(errors[0], 0);
    assert_eq!(errors[1], 1);
    assert!(errors[2] >= 1);
}
