//! Moonspec: a Lua unit-test discovery and execution engine
//!
//! Moonspec loads Lua scripts, discovers the tests they declare through
//! the `moonspec.test(suite, name, body)` primitive, executes each test
//! inside its own fresh Lua interpreter, and renders a Google Test
//! compatible XML report. Scripts get a single global namespace with
//! `test` plus sixteen expectation operations (`assert_eq`, `expect_lt`,
//! `assert_true`, ...); `assert_*` failures abort the current test,
//! `expect_*` failures are recorded and execution continues.
//!
//! # Quick Start
//!
//! ```no_run
//! use moonspec::Runner;
//!
//! let mut runner = Runner::new();
//! let mut sink = |message: &str| eprintln!("{}", message);
//! runner.discover_file("tests/math.lua".as_ref(), &mut sink);
//! for suite in runner.suite_names().map(String::from).collect::<Vec<_>>() {
//!     for test in runner.test_names(&suite).into_iter().map(String::from).collect::<Vec<_>>() {
//!         let result = runner.execute(&suite, &test, &mut sink);
//!         println!("{}.{}: {}", suite, test, if result.passed { "ok" } else { "FAILED" });
//!     }
//! }
//! println!("{}", runner.report().to_xml().unwrap());
//! ```
//!
//! # Module Overview
//!
//! | Category | Modules |
//! |----------|---------|
//! | **Core** | [`runner`], [`session`], [`registry`] |
//! | **Values** | [`value`], [`compare`] |
//! | **Output** | [`report`], [`error`] |
//! | **Input** | [`config`] |

pub mod compare;
pub mod config;
pub mod error;
pub mod registry;
pub mod report;
pub mod runner;
pub mod session;
pub mod value;

mod bindings;

pub use crate::compare::{deep_compare, Diff};
pub use crate::error::{Error, Result, ScriptError};
pub use crate::registry::DiscoveredTest;
pub use crate::report::{CaseReport, Report, SuiteReport};
pub use crate::runner::{ExecutionResult, Runner, Test};
pub use crate::session::Session;
pub use crate::value::{BridgeMode, ScriptValue};

/// Crate version, exposed for the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
