//! Production Code Enforcement
//!
//! Library and binary sources must propagate errors instead of panicking and
//! must not silence dead code. Everything from the first `#[cfg(test)]` line
//! on is test code and exempt, as are the test doubles in `testing.rs`.

use std::fs;
use std::path::{Path, PathBuf};

const FORBIDDEN: [(&str, &str); 3] = [
    (".unwrap()", "unwrap in production code"),
    (".expect(", "expect in production code"),
    ("allow(dead_code", "dead code allowance"),
];

#[derive(Debug)]
struct Violation {
    file_path: String,
    line_number: usize,
    rule: &'static str,
    context: String,
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".."))
}

/// Source directories of every `trawl-*` crate except this one.
fn crate_sources(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .unwrap()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with("trawl-"))
                .unwrap_or(false)
        })
        .map(|path| path.join("src"))
        .filter(|src| src.is_dir())
        .collect();
    dirs.sort();
    dirs
}

fn find_rust_files(dir: &Path, files: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).unwrap().filter_map(Result::ok) {
        let path = entry.path();
        if path.is_dir() {
            find_rust_files(&path, files);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
}

fn is_exempt(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == "testing.rs")
}

fn check_file(path: &Path, violations: &mut Vec<Violation>) {
    let content = fs::read_to_string(path).unwrap();

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }
        for (pattern, rule) in FORBIDDEN {
            if trimmed.contains(pattern) {
                violations.push(Violation {
                    file_path: path.to_string_lossy().into_owned(),
                    line_number: index + 1,
                    rule,
                    context: trimmed.to_string(),
                });
            }
        }
    }
}

#[test]
fn test_production_code_does_not_panic_or_hide_dead_code() {
    let root = workspace_root();
    let sources = crate_sources(&root);
    assert!(
        sources.len() >= 4,
        "expected the trawl crates under {}",
        root.display()
    );

    let mut files = Vec::new();
    for dir in &sources {
        find_rust_files(dir, &mut files);
    }

    let mut violations = Vec::new();
    for file in files.iter().filter(|f| !is_exempt(f)) {
        check_file(file, &mut violations);
    }

    if !violations.is_empty() {
        for v in &violations {
            eprintln!("{}:{}: {}: {}", v.file_path, v.line_number, v.rule, v.context);
        }
        panic!("{} production code violations found", violations.len());
    }
    println!(
        "Production code enforcement: {} files checked, no violations found",
        files.len()
    );
}

#[test]
fn test_cfg_test_marks_end_of_production_code() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("sample.rs");
    fs::write(
        &path,
        "fn ok() -> Option<u8> { None }\n\
         // a comment mentioning .unwrap() is fine\n\
         fn bad() { ok().unwrap(); }\n\
         #[cfg(test)]\n\
         mod tests { fn t() { super::ok().expect(\"x\"); } }\n",
    )
    .unwrap();

    let mut violations = Vec::new();
    check_file(&path, &mut violations);

    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].line_number, 3);
    assert_eq!(violations[0].rule, "unwrap in production code");
}
