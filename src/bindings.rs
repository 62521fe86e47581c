//! Script-facing bindings
//!
//! Installs the `moonspec` namespace into a fresh interpreter: the `test`
//! registration primitive plus the sixteen expectation operations. The
//! operations are generated from a small kind × severity table so every
//! one of them formats failures through the same code path.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::{Function, Lua, Table, Value, Variadic};

use crate::compare::deep_compare;
use crate::registry;
use crate::session::SessionState;
use crate::value::{BridgeMode, ScriptValue};

/// Name of the single global object visible to test authors.
pub(crate) const NAMESPACE: &str = "moonspec";

/// Lua helpers giving the expectation operations the interpreter's own
/// equality, ordering, rendering, and traceback semantics (metamethods
/// included). Loaded once per session.
const COMPARE_PRELUDE: &str = r#"
local helpers = {}
function helpers.eq(a, b) return a == b end
function helpers.lt(a, b) return a < b end
function helpers.le(a, b) return a <= b end
function helpers.str(v) return tostring(v) end
function helpers.traceback() return debug.traceback(nil, 1) end
return helpers
"#;

/// The eight comparison kinds.
#[derive(Debug, Clone, Copy)]
enum CmpKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    IsTrue,
    IsFalse,
}

/// Fatal (`assert_*`) aborts the test body; sticky (`expect_*`) records
/// the failure and lets the body continue.
#[derive(Debug, Clone, Copy)]
enum Severity {
    Fatal,
    Sticky,
}

impl Severity {
    fn prefix(self) -> &'static str {
        match self {
            Severity::Fatal => "assert",
            Severity::Sticky => "expect",
        }
    }
}

const OPERATIONS: &[(&str, CmpKind)] = &[
    ("eq", CmpKind::Eq),
    ("ne", CmpKind::Ne),
    ("lt", CmpKind::Lt),
    ("le", CmpKind::Le),
    ("gt", CmpKind::Gt),
    ("ge", CmpKind::Ge),
    ("true", CmpKind::IsTrue),
    ("false", CmpKind::IsFalse),
];

/// Install the namespace object and its members into `lua`, wired to the
/// given session state.
pub(crate) fn install(lua: &Lua, state: Rc<RefCell<SessionState>>) -> mlua::Result<()> {
    let helpers: Table = lua
        .load(COMPARE_PRELUDE)
        .set_name("=moonspec.prelude")
        .eval()?;
    let namespace = lua.create_table()?;

    let registration_state = Rc::clone(&state);
    let test_fn = lua.create_function(
        move |_, (suite, name, body): (String, String, Function)| {
            registry::register(&mut registration_state.borrow_mut().registry, suite, name, body);
            Ok(())
        },
    )?;
    namespace.set("test", test_fn)?;

    for &(suffix, kind) in OPERATIONS {
        for severity in [Severity::Fatal, Severity::Sticky] {
            let state = Rc::clone(&state);
            let helpers = helpers.clone();
            let op = lua.create_function(move |lua, args: Variadic<Value>| {
                let Some(message) = evaluate(lua, &helpers, kind, &args)? else {
                    return Ok(());
                };
                state.borrow_mut().failed = true;
                match severity {
                    Severity::Fatal => Err(mlua::Error::RuntimeError(message)),
                    Severity::Sticky => {
                        state.borrow_mut().diagnostics.push(message);
                        let traceback: String =
                            helpers.get::<Function>("traceback")?.call(())?;
                        state.borrow_mut().diagnostics.push(traceback);
                        Ok(())
                    }
                }
            })?;
            namespace.set(format!("{}_{}", severity.prefix(), suffix), op)?;
        }
    }

    lua.globals().set(NAMESPACE, namespace)
}

// ---------------------------------------------------------------------------
// Comparison evaluation — shared by all sixteen operations
// ---------------------------------------------------------------------------

/// Evaluate one comparison. `None` means success; `Some(message)` carries
/// the failure diagnostic. The first operand is the expected value.
fn evaluate(
    lua: &Lua,
    helpers: &Table,
    kind: CmpKind,
    args: &[Value],
) -> mlua::Result<Option<String>> {
    let lhs = args.first().cloned().unwrap_or(Value::Nil);
    let rhs = args.get(1).cloned().unwrap_or(Value::Nil);
    match kind {
        CmpKind::Eq | CmpKind::Ne => evaluate_equality(lua, helpers, kind, &lhs, &rhs),
        CmpKind::Lt => evaluate_ordering(helpers, "lt", "<", &lhs, &rhs, true),
        CmpKind::Le => evaluate_ordering(helpers, "le", "<=", &lhs, &rhs, true),
        // gt and ge are the negated forms of le and lt, so only the two
        // native ordering primitives are ever consulted.
        CmpKind::Gt => evaluate_ordering(helpers, "le", ">", &lhs, &rhs, false),
        CmpKind::Ge => evaluate_ordering(helpers, "lt", ">=", &lhs, &rhs, false),
        CmpKind::IsTrue => {
            if truthy(&lhs) {
                Ok(None)
            } else {
                Ok(Some(format!(
                    "Expected '{}' to be true",
                    render(helpers, &lhs)?
                )))
            }
        }
        CmpKind::IsFalse => {
            if truthy(&lhs) {
                Ok(Some(format!(
                    "Expected '{}' to be false",
                    render(helpers, &lhs)?
                )))
            } else {
                Ok(None)
            }
        }
    }
}

fn evaluate_equality(
    lua: &Lua,
    helpers: &Table,
    kind: CmpKind,
    lhs: &Value,
    rhs: &Value,
) -> mlua::Result<Option<String>> {
    if let (Value::Table(_), Value::Table(_)) = (lhs, rhs) {
        let expected =
            ScriptValue::from_lua(lua, lhs, BridgeMode::Lenient).map_err(mlua::Error::external)?;
        let actual =
            ScriptValue::from_lua(lua, rhs, BridgeMode::Lenient).map_err(mlua::Error::external)?;
        let diff = deep_compare(&expected, &actual);
        return Ok(match (kind, diff) {
            (CmpKind::Eq, Some(diff)) => Some(format!(
                "Tables differ (path: {}) -- {}",
                diff.path_display(),
                diff.description
            )),
            (CmpKind::Ne, None) => Some("Tables should differ but are the same".to_string()),
            _ => None,
        });
    }

    let equal: bool = helpers
        .get::<Function>("eq")?
        .call((lhs.clone(), rhs.clone()))?;
    Ok(match kind {
        CmpKind::Eq if !equal => Some(format!(
            "Expected '{}', actual was '{}'",
            render(helpers, lhs)?,
            render(helpers, rhs)?
        )),
        CmpKind::Ne if equal => Some(format!(
            "Expected not '{}', actual was '{}'",
            render(helpers, lhs)?,
            render(helpers, rhs)?
        )),
        _ => None,
    })
}

/// Run one of the native ordering primitives. Operands whose types have no
/// order raise the interpreter's own comparison error, which propagates
/// out of this call and aborts the test body.
fn evaluate_ordering(
    helpers: &Table,
    primitive: &str,
    display_op: &str,
    lhs: &Value,
    rhs: &Value,
    expect_outcome: bool,
) -> mlua::Result<Option<String>> {
    let outcome: bool = helpers
        .get::<Function>(primitive)?
        .call((lhs.clone(), rhs.clone()))?;
    if outcome == expect_outcome {
        Ok(None)
    } else {
        Ok(Some(format!(
            "expected '{}' {} '{}'",
            render(helpers, lhs)?,
            display_op,
            render(helpers, rhs)?
        )))
    }
}

/// Lua truthiness: everything but nil and false.
fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Nil | Value::Boolean(false))
}

fn render(helpers: &Table, value: &Value) -> mlua::Result<String> {
    let rendered: mlua::String = helpers.get::<Function>("str")?.call(value.clone())?;
    Ok(rendered.to_string_lossy().to_string())
}
