//! Interpreter session management
//!
//! A [`Session`] owns one fresh Lua interpreter for exactly one unit of
//! work — loading a script for discovery, or loading it again to run a
//! single test. Sessions are never reused: every `Session::with` call
//! builds a new interpreter and drops it when the closure returns, so
//! global state written by one test can never leak into another.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard};

use mlua::{Function, Lua};
use tracing::{debug, warn};

use crate::bindings;
use crate::error::{Error, Result, ScriptError};
use crate::registry::{self, DiscoveredTest, RegistryMap};

/// Mutable state shared between a session and the bindings installed in
/// its interpreter.
#[derive(Default)]
pub(crate) struct SessionState {
    /// Set by any failing expectation; read by the runner after the test
    /// body returns (or after a fatal assertion unwinds to the boundary).
    pub(crate) failed: bool,
    /// Diagnostic messages recorded by non-fatal expectations.
    pub(crate) diagnostics: Vec<String>,
    /// Tests registered by the script's top-level code.
    pub(crate) registry: RegistryMap,
}

/// One interpreter instance plus its failure-tracking state, scoped to a
/// single load-or-execute operation.
pub struct Session {
    lua: Lua,
    state: Rc<RefCell<SessionState>>,
}

impl Session {
    fn new() -> Result<Session> {
        let lua = Lua::new();
        let state = Rc::new(RefCell::new(SessionState::default()));
        bindings::install(&lua, Rc::clone(&state))
            .map_err(|e| Error::Script(ScriptError::from_lua(e)))?;
        Ok(Session { lua, state })
    }

    /// Run `f` against a fresh interpreter with the script-facing
    /// namespace installed, then tear the interpreter down. Teardown is
    /// unconditional — the interpreter is dropped whether `f` succeeds,
    /// fails, or panics.
    pub fn with<T>(f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut session = Session::new()?;
        debug!("session opened");
        let result = f(&mut session);
        debug!("session closed");
        result
    }

    /// Compile `source` as a single chunk named after its originating file
    /// (so tracebacks point at the right place) and execute its top-level
    /// code to completion.
    pub fn load_and_run(&mut self, source: &str, origin: &Path) -> Result<()> {
        debug!(script = %origin.display(), "loading script chunk");
        self.lua
            .load(source)
            .set_name(format!("@{}", origin.display()))
            .exec()
            .map_err(|e| Error::Script(ScriptError::from_lua(e)))
    }

    /// Invoke a registered test body under the interpreter's error
    /// boundary. A fatal assertion or uncaught script error comes back as
    /// a [`ScriptError`]; it never unwinds past this call.
    pub(crate) fn call(&self, body: &Function) -> std::result::Result<(), ScriptError> {
        body.call::<()>(()).map_err(ScriptError::from_lua)
    }

    /// The callable registered for (suite, test) in this session, if any.
    pub(crate) fn registered_body(&self, suite: &str, name: &str) -> Option<Function> {
        registry::lookup(&self.state.borrow().registry, suite, name)
    }

    /// Metadata for every test registered by the script run in this
    /// session. The callables themselves stay behind.
    pub fn discovered_tests(&self) -> Vec<DiscoveredTest> {
        registry::walk(&self.state.borrow().registry)
    }

    /// Whether any expectation has failed in this session.
    pub fn failed(&self) -> bool {
        self.state.borrow().failed
    }

    /// Take the diagnostics recorded so far, leaving the buffer empty.
    pub fn drain_diagnostics(&self) -> Vec<String> {
        std::mem::take(&mut self.state.borrow_mut().diagnostics)
    }

    #[cfg(test)]
    pub(crate) fn lua(&self) -> &Lua {
        &self.lua
    }
}

// ---------------------------------------------------------------------------
// Working-directory context
// ---------------------------------------------------------------------------

// The process working directory is global state; sessions holding a
// ScriptDir are serialized so concurrent test binaries stay deterministic.
static CWD_LOCK: Mutex<()> = Mutex::new(());

/// RAII guard that runs a script with the working directory set to the
/// script's containing folder, restoring the previous directory on drop
/// regardless of how the scope exits.
pub(crate) struct ScriptDir {
    original: Option<PathBuf>,
    _lock: MutexGuard<'static, ()>,
}

impl ScriptDir {
    pub(crate) fn enter(script_path: &Path) -> ScriptDir {
        let lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut original = None;
        if let Some(parent) = script_path.parent() {
            if !parent.as_os_str().is_empty() {
                match std::env::current_dir() {
                    Ok(previous) => {
                        if std::env::set_current_dir(parent).is_ok() {
                            original = Some(previous);
                        } else {
                            warn!(dir = %parent.display(), "could not enter script directory");
                        }
                    }
                    Err(e) => warn!("could not read the working directory: {}", e),
                }
            }
        }
        ScriptDir {
            original,
            _lock: lock,
        }
    }
}

impl Drop for ScriptDir {
    fn drop(&mut self) {
        if let Some(previous) = self.original.take() {
            let _ = std::env::set_current_dir(previous);
        }
    }
}
