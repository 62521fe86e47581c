//! Shared test helpers for integration tests

use std::fs;
use std::path::{Path, PathBuf};

use moonspec::{ExecutionResult, Runner};

/// Write a Lua script into `dir` and return its path.
#[allow(dead_code)]
pub fn write_script(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Discover one script, collecting any diagnostic messages.
#[allow(dead_code)]
pub fn discover(runner: &mut Runner, script: &Path) -> Vec<String> {
    let mut messages = Vec::new();
    runner.discover_file(script, &mut |message: &str| messages.push(message.to_string()));
    messages
}

/// Execute one test, discarding sink output (the result carries the
/// diagnostics anyway).
#[allow(dead_code)]
pub fn execute(runner: &Runner, suite: &str, test: &str) -> ExecutionResult {
    runner.execute(suite, test, &mut |_message: &str| {})
}
