// tests/cli_transform.rs
//! End-to-end tests for the numapin binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const NODE_HPP: &str = r#"class Node {
    int data;
    Node* link;
public:
    Node(int d);
    ~Node();
};
"#;

const NODE_CPP: &str = r#"#include "node.hpp"

Node::Node(int d) : data(d), link(nullptr) {}

Node::~Node() { delete link; }
"#;

const MAIN_CPP: &str = r#"#include "node.hpp"

int main() {
    pinned_ptr<Node> p = new pinned<Node, 1>(5);
    pinned_ptr<Node> q = new pinned<Node, 1>(5);
    return 0;
}
"#;

const CONFIG: &str = r#"wrapper = "pinned"
handle_aliases = ["pinned_ptr"]
"#;

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    write(&src, "node.hpp", NODE_HPP);
    write(&src, "node.cpp", NODE_CPP);
    write(&src, "main.cpp", MAIN_CPP);
    write(dir.path(), "numapin.toml", CONFIG);
    dir
}

fn numapin(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_numapin"))
        .current_dir(dir)
        .arg("--color=never")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn transform_emits_one_pinned_specialization() {
    let dir = project();
    let output = numapin(dir.path(), &["transform", "src", "--out-dir", "out"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {}", stderr);

    let header = fs::read_to_string(dir.path().join("out/node.hpp")).unwrap();
    let original = header.strip_prefix("#include \"numatype.hpp\"\n").unwrap();
    assert!(original.starts_with(NODE_HPP.trim_end()));
    assert_eq!(header.matches("class pinned<Node, 1>").count(), 1);
    assert!(header.contains("pinned<Node, 1>* link = nullptr;"));
    assert!(header.contains("pinned(int d) : data(d), link(nullptr) {}"));
    assert!(header.contains("if (link != nullptr) {"));
    assert!(header.contains("delete link;"));
    assert!(header.contains("numa_alloc_onnode(size, 1)"));
    assert!(!header.contains("pinned()"), "no implicit default constructor expected");
}

#[test]
fn files_without_sites_are_copied_byte_identical() {
    let dir = project();
    let output = numapin(dir.path(), &["transform", "src", "--out-dir", "out"]);
    assert!(output.status.success());

    assert_eq!(fs::read_to_string(dir.path().join("out/main.cpp")).unwrap(), MAIN_CPP);
    assert_eq!(fs::read_to_string(dir.path().join("out/node.cpp")).unwrap(), NODE_CPP);
}

#[test]
fn wrapper_flag_overrides_config() {
    let dir = project();
    let output = numapin(
        dir.path(),
        &["transform", "src", "--out-dir", "out", "--wrapper", "numa"],
    );
    assert!(output.status.success());
    // No `numa<...>` sites exist, so nothing changes.
    let header = fs::read_to_string(dir.path().join("out/node.hpp")).unwrap();
    assert_eq!(header, NODE_HPP);
}

#[test]
fn parse_error_fails_but_still_writes_other_outputs() {
    let dir = project();
    write(&dir.path().join("src"), "broken.hpp", "class Broken { int x;\n");
    let output = numapin(dir.path(), &["transform", "src", "--out-dir", "out"]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.hpp"), "stderr: {}", stderr);
    assert_eq!(
        fs::read_to_string(dir.path().join("out/broken.hpp")).unwrap(),
        "class Broken { int x;\n"
    );
    let header = fs::read_to_string(dir.path().join("out/node.hpp")).unwrap();
    assert!(header.contains("class pinned<Node, 1>"));
}

#[test]
fn unknown_config_key_is_rejected() {
    let dir = project();
    write(dir.path(), "numapin.toml", "wrapper = \"pinned\"\nnodes = 4\n");
    let output = numapin(dir.path(), &["transform", "src", "--out-dir", "out"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid config"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn scan_lists_sites() {
    let dir = project();
    let output = numapin(dir.path(), &["scan", "src/main.cpp"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "stdout: {}", stdout);
    assert_eq!(lines[0], "src/main.cpp:4:22  p  Node @ node 1");
    assert_eq!(lines[1], "src/main.cpp:5:22  q  Node @ node 1");
    assert!(!dir.path().join("out").exists());
}

#[test]
fn no_inputs_is_an_error() {
    let dir = TempDir::new().unwrap();
    let output = numapin(dir.path(), &["scan", "nothing/*.cpp"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no C++ source files found"));
}
