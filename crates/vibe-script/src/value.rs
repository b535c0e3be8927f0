//! Runtime values.
//!
//! Scalars are copied; lists and maps are shared handles, so mutation through
//! one binding is visible through every other. Locks on shared containers
//! are never held while another value is inspected: readers take a snapshot
//! first, which keeps self-referencing containers from deadlocking.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ast::FunctionDef;
use crate::builtins::Builtin;
use crate::error::{RuntimeError, RuntimeResult};

/// Containers nested deeper than this render as `...`.
const DISPLAY_DEPTH: usize = 32;

pub type ListRef = Arc<Mutex<Vec<Value>>>;
pub type MapRef = Arc<Mutex<Map>>;

/// Host function callable from scripts.
pub type NativeFn = dyn Fn(&[Value]) -> RuntimeResult<Value> + Send + Sync;

pub struct NativeFunction {
    name: String,
    func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> RuntimeResult<Value> {
        (self.func)(args)
    }
}

/// Anything that can be called.
#[derive(Clone)]
pub enum Function {
    Script(Arc<FunctionDef>),
    Native(Arc<NativeFunction>),
    Builtin(Builtin),
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Self::Script(def) => &def.name,
            Self::Native(native) => native.name(),
            Self::Builtin(builtin) => builtin.name(),
        }
    }

    fn same(&self, other: &Function) -> bool {
        match (self, other) {
            (Self::Script(a), Self::Script(b)) => Arc::ptr_eq(a, b),
            (Self::Native(a), Self::Native(b)) => Arc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Script(_) => "script",
            Self::Native(_) => "native",
            Self::Builtin(_) => "builtin",
        };
        write!(f, "<{kind} fn {}>", self.name())
    }
}

/// Map key. Floats, containers and functions cannot be keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Key {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// Insertion-ordered map.
#[derive(Clone, Debug, Default)]
pub struct Map {
    entries: Vec<(Key, Value)>,
    index: HashMap<Key, usize>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or replace. A replaced key keeps its position.
    pub fn insert(&mut self, key: Key, value: Value) -> Option<Value> {
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        let i = self.index.remove(key)?;
        let (_, value) = self.entries.remove(i);
        for (k, _) in &self.entries[i..] {
            if let Some(pos) = self.index.get_mut(k) {
                *pos -= 1;
            }
        }
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl FromIterator<(Key, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (Key, Value)>>(iter: I) -> Self {
        let mut map = Map::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// A vibescript value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(ListRef),
    Map(MapRef),
    Function(Function),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Arc::new(Mutex::new(items)))
    }

    pub fn map(map: Map) -> Self {
        Self::Map(Arc::new(Mutex::new(map)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Function(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Nil => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.lock().is_empty(),
            Self::Map(map) => !map.lock().is_empty(),
            Self::Function(_) => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Copy of a list's elements.
    pub fn list_snapshot(&self) -> Option<Vec<Value>> {
        match self {
            Self::List(items) => Some(items.lock().clone()),
            _ => None,
        }
    }

    pub fn to_key(&self) -> RuntimeResult<Key> {
        match self {
            Self::Bool(b) => Ok(Key::Bool(*b)),
            Self::Int(i) => Ok(Key::Int(*i)),
            Self::Str(s) => Ok(Key::Str(s.clone())),
            other => Err(RuntimeError::type_error(format!(
                "{} cannot be used as a map key",
                other.type_name()
            ))),
        }
    }

    /// Structural equality. Ints and floats compare numerically.
    pub fn equals(&self, other: &Value) -> bool {
        self.equals_at(other, 0)
    }

    fn equals_at(&self, other: &Value, depth: usize) -> bool {
        if depth > DISPLAY_DEPTH {
            return false;
        }
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                self.as_float() == other.as_float()
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                let left = a.lock().clone();
                let right = b.lock().clone();
                left.len() == right.len()
                    && left.iter().zip(&right).all(|(x, y)| x.equals_at(y, depth + 1))
            }
            (Self::Map(a), Self::Map(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                let left = a.lock().clone();
                let right = b.lock().clone();
                left.len() == right.len()
                    && left.iter().all(|(k, v)| {
                        right.get(k).is_some_and(|w| v.equals_at(w, depth + 1))
                    })
            }
            (Self::Function(a), Self::Function(b)) => a.same(b),
            _ => false,
        }
    }

    /// Ordering for numbers, strings, bools and lists of those.
    pub fn compare(&self, other: &Value) -> RuntimeResult<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Ok(a.cmp(b)),
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                let (a, b) = (self.as_float(), other.as_float());
                a.partial_cmp(&b)
                    .ok_or_else(|| RuntimeError::Value("cannot order NaN".into()))
            }
            (Self::Str(a), Self::Str(b)) => Ok(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Ok(a.cmp(b)),
            (Self::List(_), Self::List(_)) => {
                let left = self.list_snapshot().unwrap_or_default();
                let right = other.list_snapshot().unwrap_or_default();
                for (x, y) in left.iter().zip(&right) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        unequal => return Ok(unequal),
                    }
                }
                Ok(left.len().cmp(&right.len()))
            }
            _ => Err(RuntimeError::type_error(format!(
                "cannot compare {} with {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Source-like rendering: strings quoted.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, true, 0);
        out
    }

    fn render(&self, out: &mut String, quote_strings: bool, depth: usize) {
        use std::fmt::Write;

        if depth > DISPLAY_DEPTH {
            out.push_str("...");
            return;
        }
        match self {
            Self::Nil => out.push_str("nil"),
            Self::Bool(b) => {
                let _ = write!(out, "{b}");
            }
            Self::Int(i) => {
                let _ = write!(out, "{i}");
            }
            Self::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
                    let _ = write!(out, "{f:.1}");
                } else {
                    let _ = write!(out, "{f}");
                }
            }
            Self::Str(s) if quote_strings => {
                let _ = write!(out, "{s:?}");
            }
            Self::Str(s) => out.push_str(s),
            Self::List(items) => {
                let items = items.lock().clone();
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render(out, true, depth + 1);
                }
                out.push(']');
            }
            Self::Map(map) => {
                let map = map.lock().clone();
                out.push('{');
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    key.to_value().render(out, true, depth + 1);
                    out.push_str(": ");
                    value.render(out, true, depth + 1);
                }
                out.push('}');
            }
            Self::Function(function) => {
                let _ = write!(out, "{function:?}");
            }
        }
    }

    /// Convert from JSON. Object keys become string keys.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Nil,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Str(s.clone()),
            serde_json::Value::Array(items) => Self::list(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(fields) => Self::map(
                fields
                    .iter()
                    .map(|(k, v)| (Key::Str(k.clone()), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON. Non-string keys are rendered as strings.
    pub fn to_json(&self) -> RuntimeResult<serde_json::Value> {
        self.to_json_at(0)
    }

    fn to_json_at(&self, depth: usize) -> RuntimeResult<serde_json::Value> {
        if depth > DISPLAY_DEPTH {
            return Err(RuntimeError::Value("value is nested too deeply for JSON".into()));
        }
        Ok(match self {
            Self::Nil => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| RuntimeError::Value(format!("{f} has no JSON representation")))?,
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => {
                let items = items.lock().clone();
                serde_json::Value::Array(
                    items
                        .iter()
                        .map(|v| v.to_json_at(depth + 1))
                        .collect::<RuntimeResult<_>>()?,
                )
            }
            Self::Map(map) => {
                let map = map.lock().clone();
                let mut object = serde_json::Map::new();
                for (key, value) in map.iter() {
                    object.insert(key.to_string(), value.to_json_at(depth + 1)?);
                }
                serde_json::Value::Object(object)
            }
            Self::Function(function) => {
                return Err(RuntimeError::type_error(format!(
                    "function '{}' cannot be converted to JSON",
                    function.name()
                )))
            }
        })
    }
}

/// Plain rendering: top-level strings unquoted, as `str()` and `print` show them.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out, false, 0);
        f.write_str(&out)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::list(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lists_are_shared() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = a.clone();
        if let Value::List(items) = &b {
            items.lock().push(Value::Int(2));
        }
        assert_eq!(a.list_snapshot().unwrap().len(), 2);
    }

    #[test]
    fn numeric_equality_crosses_types() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(2), Value::Str("2".into()));
        assert_ne!(Value::Nil, Value::Bool(false));
    }

    #[test]
    fn self_referencing_list_does_not_hang() {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.lock().push(list.clone());
        }
        assert!(list.repr().contains("..."));
        assert!(list.equals(&list));
    }

    #[test]
    fn map_keeps_insertion_order() {
        let mut map = Map::new();
        map.insert("b".into(), Value::Int(1));
        map.insert("a".into(), Value::Int(2));
        map.insert(Key::Int(3), Value::Int(3));
        map.insert("b".into(), Value::Int(10));
        let keys: Vec<String> = map.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["b", "a", "3"]);
        assert_eq!(map.get(&"b".into()), Some(&Value::Int(10)));

        assert_eq!(map.remove(&"b".into()), Some(Value::Int(10)));
        assert_eq!(map.get(&Key::Int(3)), Some(&Value::Int(3)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn display_and_repr() {
        let value = Value::list(vec![
            Value::Str("a".into()),
            Value::Float(2.0),
            Value::Nil,
            Value::map(Map::from_iter([(Key::Str("k".into()), Value::Bool(true))])),
        ]);
        assert_eq!(value.to_string(), r#"["a", 2.0, nil, {"k": true}]"#);
        assert_eq!(Value::Str("plain".into()).to_string(), "plain");
        assert_eq!(Value::Str("plain".into()).repr(), "\"plain\"");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::list(Vec::new()).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::Str("x".into()).is_truthy());
    }

    #[test]
    fn compare_lists_lexicographically() {
        let a = Value::list(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::list(vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
        assert!(Value::Int(1).compare(&Value::Str("1".into())).is_err());
    }

    #[test]
    fn json_conversion() {
        let json = json!({"name": "Ada", "tags": ["x", 1, 2.5, null, true]});
        let value = Value::from_json(&json);
        assert_eq!(value.to_json().unwrap(), json);

        let mut map = Map::new();
        map.insert(Key::Int(1), Value::Int(2));
        assert_eq!(Value::map(map).to_json().unwrap(), json!({"1": 2}));

        assert!(Value::Float(f64::NAN).to_json().is_err());
    }
}
