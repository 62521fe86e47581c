//! Test registry protocol
//!
//! Scripts declare tests by calling `moonspec.test(suite, name, body)`;
//! the callable lands here, in storage private to the current session.
//! After the script's top-level code has finished, the discovery walk
//! extracts (suite, name, definition line) metadata. Only that metadata
//! outlives the session — the callables die with their interpreter.

use mlua::Function;
use rustc_hash::FxHashMap;

/// Session-private storage: suite name → test name → callable.
pub(crate) type RegistryMap = FxHashMap<String, FxHashMap<String, Function>>;

/// Metadata extracted from one registered test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTest {
    /// Name of the suite the test was registered under.
    pub suite_name: String,
    /// Name of the test within its suite.
    pub test_name: String,
    /// Line in the script where the test body was defined.
    pub line: u32,
}

/// Store a callable under (suite, test). Re-registration of the same pair
/// overwrites the previous entry — last registration wins.
pub(crate) fn register(registry: &mut RegistryMap, suite: String, name: String, body: Function) {
    registry.entry(suite).or_default().insert(name, body);
}

/// Fetch the callable registered for (suite, test), if any.
pub(crate) fn lookup(registry: &RegistryMap, suite: &str, name: &str) -> Option<Function> {
    registry.get(suite).and_then(|tests| tests.get(name)).cloned()
}

/// Walk the registry and recover source-location metadata for every
/// registered test via the interpreter's debug information.
pub(crate) fn walk(registry: &RegistryMap) -> Vec<DiscoveredTest> {
    let mut discovered = Vec::new();
    for (suite_name, tests) in registry {
        for (test_name, body) in tests {
            let line = body.info().line_defined.unwrap_or(0) as u32;
            discovered.push(DiscoveredTest {
                suite_name: suite_name.clone(),
                test_name: test_name.clone(),
                line,
            });
        }
    }
    discovered
}
