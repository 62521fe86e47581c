//! Test runner and catalog
//!
//! The [`Runner`] owns the catalog: the cross-session view of every suite
//! and test discovered so far. Discovery runs a script once in a throwaway
//! session and keeps only metadata; execution re-runs the same source in
//! another fresh session to reconstruct the test body, because callables
//! never survive the session that created them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config;
use crate::report::{CaseReport, Report, SuiteReport};
use crate::session::{ScriptDir, Session};

/// Everything the catalog keeps about one discovered test.
#[derive(Debug, Clone)]
pub struct Test {
    /// Suite the test belongs to.
    pub suite_name: String,
    /// Test name within the suite.
    pub test_name: String,
    /// Path of the script that registered the test.
    pub source_file: PathBuf,
    /// Full source of that script, re-executed when the test runs.
    pub source_text: Arc<str>,
    /// Line where the test body was defined.
    pub line: u32,
}

/// Outcome of executing one test.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// True when the body completed with no failed expectation.
    pub passed: bool,
    /// Diagnostics recorded during the run, in order.
    pub diagnostics: Vec<String>,
}

/// Discovers tests from Lua scripts and runs them on request.
#[derive(Debug, Default)]
pub struct Runner {
    suites: BTreeMap<String, BTreeMap<String, Test>>,
}

impl Runner {
    /// Create an empty runner.
    pub fn new() -> Runner {
        Runner::default()
    }

    /// Resolve a configuration file into script paths and discover each
    /// one. Per-file problems go to `sink`; the pass never aborts early.
    pub fn configure(&mut self, configuration_file: &Path, sink: &mut dyn FnMut(&str)) {
        for script in config::collect_script_files(configuration_file, sink) {
            self.discover_file(&script, sink);
        }
    }

    /// Run one script in a fresh session and merge the tests it registers
    /// into the catalog. Load failures are reported through `sink` and the
    /// file is skipped; sibling files are unaffected.
    pub fn discover_file(&mut self, path: &Path, sink: &mut dyn FnMut(&str)) {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                sink(&format!(
                    "ERROR: Unable to read script file '{}': {}",
                    path.display(),
                    e
                ));
                return;
            }
        };
        let source: Arc<str> = Arc::from(source);

        let discovered = Session::with(|session| {
            let _dir = ScriptDir::enter(path);
            session.load_and_run(&source, path)?;
            Ok(session.discovered_tests())
        });
        match discovered {
            Ok(tests) => {
                debug!(script = %path.display(), count = tests.len(), "discovered tests");
                for test in tests {
                    self.suites.entry(test.suite_name.clone()).or_default().insert(
                        test.test_name.clone(),
                        Test {
                            suite_name: test.suite_name,
                            test_name: test.test_name,
                            source_file: path.to_path_buf(),
                            source_text: Arc::clone(&source),
                            line: test.line,
                        },
                    );
                }
            }
            Err(e) => sink(&format!(
                "ERROR: Unable to load script file '{}': {}",
                path.display(),
                e
            )),
        }
    }

    /// Execute one test by (suite, name).
    ///
    /// The script that registered the test is reloaded in a brand-new
    /// session, re-registering its callables, and the requested body is
    /// invoked under the interpreter's error boundary. A normal return
    /// with the failure flag clear passes; anything else fails. All
    /// diagnostics are forwarded to `sink` in order.
    pub fn execute(
        &self,
        suite_name: &str,
        test_name: &str,
        sink: &mut dyn FnMut(&str),
    ) -> ExecutionResult {
        let Some(test) = self
            .suites
            .get(suite_name)
            .and_then(|suite| suite.get(test_name))
        else {
            let message = if self.suites.contains_key(suite_name) {
                format!(
                    "ERROR: No test '{}' found in test suite '{}'",
                    test_name, suite_name
                )
            } else {
                format!("ERROR: No test suite '{}' found", suite_name)
            };
            sink(&message);
            return ExecutionResult {
                passed: false,
                diagnostics: vec![message],
            };
        };

        debug!(suite = suite_name, test = test_name, "running test");
        let mut diagnostics = Vec::new();
        let mut passed = false;
        let outcome = Session::with(|session| {
            let _dir = ScriptDir::enter(&test.source_file);
            session.load_and_run(&test.source_text, &test.source_file)?;
            let call_error = match session.registered_body(suite_name, test_name) {
                Some(body) => session.call(&body).err().map(|e| e.to_string()),
                None => Some(format!(
                    "No test '{}' found in test suite '{}' after reloading '{}'",
                    test_name,
                    suite_name,
                    test.source_file.display()
                )),
            };
            Ok((session.drain_diagnostics(), session.failed(), call_error))
        });
        match outcome {
            Ok((recorded, failed, call_error)) => {
                diagnostics = recorded;
                match call_error {
                    Some(message) => diagnostics.push(format!("ERROR: {}", message)),
                    None => passed = !failed,
                }
            }
            Err(e) => diagnostics.push(format!(
                "ERROR: Unable to load script file '{}': {}",
                test.source_file.display(),
                e
            )),
        }

        for message in &diagnostics {
            sink(message);
        }
        ExecutionResult {
            passed,
            diagnostics,
        }
    }

    /// Names of every suite in the catalog, in display order.
    pub fn suite_names(&self) -> impl Iterator<Item = &str> {
        self.suites.keys().map(String::as_str)
    }

    /// Names of every test in one suite, in display order. Empty when the
    /// suite does not exist.
    pub fn test_names(&self, suite_name: &str) -> Vec<&str> {
        self.suites
            .get(suite_name)
            .map(|suite| suite.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// The catalog record for (suite, test), if discovered.
    pub fn test(&self, suite_name: &str, test_name: &str) -> Option<&Test> {
        self.suites.get(suite_name)?.get(test_name)
    }

    /// Total number of tests across all suites.
    pub fn total_tests(&self) -> usize {
        self.suites.values().map(BTreeMap::len).sum()
    }

    /// Build the report model for the current catalog. Execution history
    /// is not required: a test that was only discovered is still listed.
    pub fn report(&self) -> Report {
        Report::new(
            self.suites
                .iter()
                .map(|(suite_name, tests)| {
                    SuiteReport::new(
                        suite_name.clone(),
                        tests
                            .values()
                            .map(|test| CaseReport {
                                name: test.test_name.clone(),
                                file: test.source_file.display().to_string(),
                                line: test.line,
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_script(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn quiet() -> impl FnMut(&str) {
        |_message: &str| {}
    }

    #[test]
    fn discovery_merges_registered_tests_into_the_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            &dir,
            "math.lua",
            "moonspec.test('math', 'adds', function() end)\n\
             moonspec.test('math', 'subtracts', function() end)\n\
             moonspec.test('strings', 'concats', function() end)",
        );
        let mut runner = Runner::new();
        runner.discover_file(&script, &mut quiet());

        assert_eq!(runner.suite_names().collect::<Vec<_>>(), ["math", "strings"]);
        assert_eq!(runner.test_names("math"), ["adds", "subtracts"]);
        assert_eq!(runner.total_tests(), 3);
        assert_eq!(runner.test("math", "adds").unwrap().line, 1);
    }

    #[test]
    fn load_failures_are_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write_script(&dir, "bad.lua", "this is not lua");
        let good = write_script(
            &dir,
            "good.lua",
            "moonspec.test('ok', 'works', function() end)",
        );
        let mut runner = Runner::new();
        let mut messages = Vec::new();
        runner.discover_file(&bad, &mut |m: &str| messages.push(m.to_string()));
        runner.discover_file(&good, &mut quiet());

        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Unable to load script file"));
        assert!(messages[0].contains("bad.lua"));
        assert_eq!(runner.total_tests(), 1);
    }

    #[test]
    fn execute_reports_missing_suites_without_panicking() {
        let runner = Runner::new();
        let mut messages = Vec::new();
        let result = runner.execute("ghost", "none", &mut |m: &str| messages.push(m.to_string()));
        assert!(!result.passed);
        assert_eq!(messages, ["ERROR: No test suite 'ghost' found"]);
    }

    #[test]
    fn execute_runs_the_registered_body() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            &dir,
            "square.lua",
            "moonspec.test('math', 'square_zero', function()\n\
                 local result = 0 * 0\n\
                 moonspec.expect_eq(0, result)\n\
             end)",
        );
        let mut runner = Runner::new();
        runner.discover_file(&script, &mut quiet());
        let result = runner.execute("math", "square_zero", &mut quiet());
        assert!(result.passed);
        assert!(result.diagnostics.is_empty());
    }
}
