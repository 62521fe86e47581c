//! Bridged script values
//!
//! This module defines [`ScriptValue`], the host-side representation of Lua
//! values used by the deep comparator and its diagnostics. Values are
//! bridged out of the interpreter transiently, compared, rendered, and
//! dropped; nothing here is ever persisted.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use mlua::Lua;

use crate::error::{Error, Result, ScriptError};

/// How the bridge treats a native value with no structured representation
/// (a function, userdata, or coroutine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMode {
    /// Fail with [`Error::UnsupportedType`]. Used for table keys and any
    /// other value that must be rendered structurally in diagnostics.
    Strict,
    /// Substitute [`ScriptValue::Opaque`] carrying the interpreter's own
    /// `tostring` rendering. Used for values inside compared composites,
    /// where the rendering (which embeds the object address) stands in for
    /// identity equality.
    Lenient,
}

/// A bridged script value
#[derive(Debug, Clone)]
pub enum ScriptValue {
    /// nil
    Nil,
    /// Boolean value
    Boolean(bool),
    /// Integer-subtype number (Lua 5.4 distinguishes these from floats)
    Integer(i64),
    /// Float-subtype number
    Float(f64),
    /// String
    String(String),
    /// Dense 1..=n array
    List(Vec<ScriptValue>),
    /// Any other table shape, keyed in display order
    Map(BTreeMap<ScriptValue, ScriptValue>),
    /// The native rendering of a value the bridge cannot represent.
    /// Only produced in [`BridgeMode::Lenient`]; never bridged back.
    Opaque(String),
}

impl ScriptValue {
    /// Bridge a native interpreter value into a [`ScriptValue`].
    ///
    /// Table keys always bridge strictly regardless of `mode`; only the
    /// values inside a table inherit the caller's mode.
    pub fn from_lua(lua: &Lua, value: &mlua::Value, mode: BridgeMode) -> Result<ScriptValue> {
        match value {
            mlua::Value::Nil => Ok(ScriptValue::Nil),
            mlua::Value::Boolean(b) => Ok(ScriptValue::Boolean(*b)),
            mlua::Value::Integer(i) => Ok(ScriptValue::Integer(*i)),
            mlua::Value::Number(n) => Ok(ScriptValue::Float(*n)),
            mlua::Value::String(s) => Ok(ScriptValue::String(s.to_string_lossy().to_string())),
            mlua::Value::Table(table) => Self::from_table(lua, table, mode),
            other => match mode {
                BridgeMode::Strict => Err(Error::UnsupportedType {
                    type_name: other.type_name(),
                }),
                BridgeMode::Lenient => Ok(ScriptValue::Opaque(native_render(lua, other)?)),
            },
        }
    }

    /// Bridge a table, classifying it as a dense list or a map.
    fn from_table(lua: &Lua, table: &mlua::Table, mode: BridgeMode) -> Result<ScriptValue> {
        let mut entries = BTreeMap::new();
        for pair in table.clone().pairs::<mlua::Value, mlua::Value>() {
            let (key, value) = pair.map_err(|e| Error::Script(ScriptError::from_lua(e)))?;
            let key = Self::from_lua(lua, &key, BridgeMode::Strict)?;
            let value = Self::from_lua(lua, &value, mode)?;
            entries.insert(key, value);
        }
        let dense = !entries.is_empty()
            && entries
                .keys()
                .enumerate()
                .all(|(i, k)| matches!(k, ScriptValue::Integer(n) if *n == i as i64 + 1));
        if dense {
            Ok(ScriptValue::List(entries.into_values().collect()))
        } else {
            Ok(ScriptValue::Map(entries))
        }
    }

    /// Bridge a [`ScriptValue`] back into a native interpreter value.
    ///
    /// [`ScriptValue::Opaque`] refuses: it is a rendering of a value, not
    /// a value.
    pub fn into_lua(&self, lua: &Lua) -> mlua::Result<mlua::Value> {
        match self {
            ScriptValue::Nil => Ok(mlua::Value::Nil),
            ScriptValue::Boolean(b) => Ok(mlua::Value::Boolean(*b)),
            ScriptValue::Integer(i) => Ok(mlua::Value::Integer(*i)),
            ScriptValue::Float(n) => Ok(mlua::Value::Number(*n)),
            ScriptValue::String(s) => Ok(mlua::Value::String(lua.create_string(s)?)),
            ScriptValue::List(items) => {
                let table = lua.create_table()?;
                for (i, item) in items.iter().enumerate() {
                    table.set(i + 1, item.into_lua(lua)?)?;
                }
                Ok(mlua::Value::Table(table))
            }
            ScriptValue::Map(entries) => {
                let table = lua.create_table()?;
                for (key, value) in entries {
                    table.set(key.into_lua(lua)?, value.into_lua(lua)?)?;
                }
                Ok(mlua::Value::Table(table))
            }
            ScriptValue::Opaque(rendering) => Err(mlua::Error::RuntimeError(format!(
                "cannot convert opaque value '{}' back into a script value",
                rendering
            ))),
        }
    }

    /// Returns true for the composite shapes the comparator descends into.
    pub fn is_composite(&self) -> bool {
        matches!(self, ScriptValue::List(_) | ScriptValue::Map(_))
    }

    /// Leaf equality with the interpreter's numeric semantics: an integer
    /// equals a float of the same mathematical value, NaN equals nothing,
    /// and strings never equal numbers.
    pub fn leaf_eq(&self, other: &ScriptValue) -> bool {
        match (self, other) {
            (ScriptValue::Integer(a), ScriptValue::Float(b))
            | (ScriptValue::Float(b), ScriptValue::Integer(a)) => (*a as f64) == *b,
            (ScriptValue::Float(a), ScriptValue::Float(b)) => a == b,
            _ => self.cmp(other) == Ordering::Equal,
        }
    }

    /// Render a key the way JSON would: strings quoted, numbers bare.
    /// Used for "missing key" / "extra key" messages and key-paths.
    pub fn key_encoding(&self) -> String {
        let json = match self {
            ScriptValue::Nil => serde_json::Value::Null,
            ScriptValue::Boolean(b) => serde_json::Value::Bool(*b),
            ScriptValue::Integer(i) => serde_json::Value::from(*i),
            ScriptValue::Float(n) => match serde_json::Number::from_f64(*n) {
                Some(number) => serde_json::Value::Number(number),
                None => serde_json::Value::String(self.to_string()),
            },
            ScriptValue::String(s) => serde_json::Value::String(s.clone()),
            // Composite and opaque keys never survive the strict bridge;
            // fall back to the display rendering for completeness.
            other => return other.to_string(),
        };
        json.to_string()
    }

    fn rank(&self) -> u8 {
        match self {
            ScriptValue::Nil => 0,
            ScriptValue::Boolean(_) => 1,
            ScriptValue::Integer(_) | ScriptValue::Float(_) => 2,
            ScriptValue::String(_) => 3,
            ScriptValue::List(_) => 4,
            ScriptValue::Map(_) => 5,
            ScriptValue::Opaque(_) => 6,
        }
    }
}

/// Render a native value through the interpreter's `tostring`, honoring
/// `__tostring` metamethods.
pub(crate) fn native_render(lua: &Lua, value: &mlua::Value) -> Result<String> {
    let tostring: mlua::Function = lua
        .globals()
        .get("tostring")
        .map_err(|e| Error::Script(ScriptError::from_lua(e)))?;
    let rendered: mlua::String = tostring
        .call(value.clone())
        .map_err(|e| Error::Script(ScriptError::from_lua(e)))?;
    Ok(rendered.to_string_lossy().to_string())
}

// ---------------------------------------------------------------------------
// Ordering — the "native default ordering for display purposes"
// ---------------------------------------------------------------------------

impl Ord for ScriptValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ScriptValue::Boolean(a), ScriptValue::Boolean(b)) => a.cmp(b),
            (ScriptValue::Integer(a), ScriptValue::Integer(b)) => a.cmp(b),
            (ScriptValue::Float(a), ScriptValue::Float(b)) => a.total_cmp(b),
            // Mixed numerics order by value; an integer sorts before the
            // equal float so the order stays total.
            (ScriptValue::Integer(a), ScriptValue::Float(b)) => {
                (*a as f64).total_cmp(b).then(Ordering::Less)
            }
            (ScriptValue::Float(a), ScriptValue::Integer(b)) => {
                a.total_cmp(&(*b as f64)).then(Ordering::Greater)
            }
            (ScriptValue::String(a), ScriptValue::String(b)) => a.cmp(b),
            (ScriptValue::List(a), ScriptValue::List(b)) => a.iter().cmp(b.iter()),
            (ScriptValue::Map(a), ScriptValue::Map(b)) => a.iter().cmp(b.iter()),
            (ScriptValue::Opaque(a), ScriptValue::Opaque(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for ScriptValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScriptValue {}

// ---------------------------------------------------------------------------
// Display — mirrors the interpreter's tostring for scalars
// ---------------------------------------------------------------------------

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Nil => write!(f, "nil"),
            ScriptValue::Boolean(b) => write!(f, "{}", b),
            ScriptValue::Integer(i) => write!(f, "{}", i),
            ScriptValue::Float(n) => {
                if n.is_nan() {
                    write!(f, "nan")
                } else if n.is_infinite() {
                    write!(f, "{}", if *n < 0.0 { "-inf" } else { "inf" })
                } else if n.fract() == 0.0 {
                    // Lua 5.4 keeps the float subtype visible: 1.0, not 1
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            ScriptValue::String(s) => write!(f, "{}", s),
            ScriptValue::List(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
            ScriptValue::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[{}] = {}", key.key_encoding(), value)?;
                }
                write!(f, "}}")
            }
            ScriptValue::Opaque(rendering) => write!(f, "{}", rendering),
        }
    }
}
