//! Builtin functions, resolved after locals and module bindings.

use std::cmp::Ordering;

use tracing::info;

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{Key, Map, Value};

/// Longest list `range` will build.
const MAX_RANGE_LEN: usize = 10_000_000;

macro_rules! builtins {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// A builtin function.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Builtin {
            $($variant),*
        }

        impl Builtin {
            pub const ALL: &'static [Builtin] = &[$(Builtin::$variant),*];

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

builtins! {
    Len => "len",
    Range => "range",
    Str => "str",
    Int => "int",
    Float => "float",
    Abs => "abs",
    Min => "min",
    Max => "max",
    Push => "push",
    Pop => "pop",
    Insert => "insert",
    Remove => "remove",
    Keys => "keys",
    Values => "values",
    Contains => "contains",
    Join => "join",
    Split => "split",
    Upper => "upper",
    Lower => "lower",
    Trim => "trim",
    StartsWith => "starts_with",
    EndsWith => "ends_with",
    Replace => "replace",
    Sqrt => "sqrt",
    Pow => "pow",
    Floor => "floor",
    Ceil => "ceil",
    Round => "round",
    Sum => "sum",
    Sorted => "sorted",
    Reversed => "reversed",
    TypeOf => "type_of",
    Print => "print",
    Get => "get",
    Slice => "slice",
}

impl Builtin {
    pub fn call(self, args: &[Value]) -> RuntimeResult<Value> {
        match self {
            Self::Len => {
                let [value] = self.exact::<1>(args)?;
                let len = match value {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) => items.lock().len(),
                    Value::Map(map) => map.lock().len(),
                    other => return Err(self.bad_arg(other)),
                };
                Ok(Value::Int(to_int(len)))
            }
            Self::Range => range(self, args),
            Self::Str => {
                let [value] = self.exact::<1>(args)?;
                Ok(Value::Str(value.to_string()))
            }
            Self::Int => {
                let [value] = self.exact::<1>(args)?;
                match value {
                    Value::Int(i) => Ok(Value::Int(*i)),
                    Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                    Value::Float(f) => float_to_int(f.trunc(), "int"),
                    Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                        RuntimeError::Value(format!("invalid integer literal: {s:?}"))
                    }),
                    other => Err(self.bad_arg(other)),
                }
            }
            Self::Float => {
                let [value] = self.exact::<1>(args)?;
                match value {
                    Value::Int(_) | Value::Float(_) => Ok(Value::Float(value.as_float().unwrap_or_default())),
                    Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                        RuntimeError::Value(format!("invalid float literal: {s:?}"))
                    }),
                    other => Err(self.bad_arg(other)),
                }
            }
            Self::Abs => {
                let [value] = self.exact::<1>(args)?;
                match value {
                    Value::Int(i) => i.checked_abs().map(Value::Int).ok_or(RuntimeError::Overflow("abs")),
                    Value::Float(f) => Ok(Value::Float(f.abs())),
                    other => Err(self.bad_arg(other)),
                }
            }
            Self::Min => extreme(self, args, Ordering::Less),
            Self::Max => extreme(self, args, Ordering::Greater),
            Self::Push => {
                let [list, value] = self.exact::<2>(args)?;
                self.list_arg(list)?.lock().push(value.clone());
                Ok(Value::Nil)
            }
            Self::Pop => {
                self.arity(args, 1, 2)?;
                let list = self.list_arg(&args[0])?;
                let mut items = list.lock();
                let len = items.len();
                if len == 0 {
                    return Err(RuntimeError::Value("pop from empty list".into()));
                }
                let index = match args.get(1) {
                    Some(index) => normalize_index(self.int_arg(index)?, len)?,
                    None => len - 1,
                };
                Ok(items.remove(index))
            }
            Self::Insert => {
                let [container, position, value] = self.exact::<3>(args)?;
                match container {
                    Value::List(items) => {
                        let mut items = items.lock();
                        let index = clamp_index(self.int_arg(position)?, items.len());
                        items.insert(index, value.clone());
                    }
                    Value::Map(map) => {
                        let key = position.to_key()?;
                        map.lock().insert(key, value.clone());
                    }
                    other => return Err(self.bad_arg(other)),
                }
                Ok(Value::Nil)
            }
            Self::Remove => {
                let [container, selector] = self.exact::<2>(args)?;
                match container {
                    Value::List(items) => {
                        let mut items = items.lock();
                        let index = normalize_index(self.int_arg(selector)?, items.len())?;
                        Ok(items.remove(index))
                    }
                    Value::Map(map) => {
                        let key = selector.to_key()?;
                        map.lock()
                            .remove(&key)
                            .ok_or_else(|| RuntimeError::KeyNotFound(key.to_string()))
                    }
                    other => Err(self.bad_arg(other)),
                }
            }
            Self::Keys => {
                let [map] = self.exact::<1>(args)?;
                let map = self.map_arg(map)?;
                let keys = map.keys().map(Key::to_value).collect();
                Ok(Value::list(keys))
            }
            Self::Values => {
                let [map] = self.exact::<1>(args)?;
                let map = self.map_arg(map)?;
                Ok(Value::list(map.values().cloned().collect()))
            }
            Self::Contains => {
                let [container, item] = self.exact::<2>(args)?;
                let found = match container {
                    Value::List(_) => container
                        .list_snapshot()
                        .unwrap_or_default()
                        .iter()
                        .any(|v| v.equals(item)),
                    Value::Map(map) => match item.to_key() {
                        Ok(key) => map.lock().contains_key(&key),
                        Err(_) => false,
                    },
                    Value::Str(s) => s.contains(self.str_arg(item)?),
                    other => return Err(self.bad_arg(other)),
                };
                Ok(Value::Bool(found))
            }
            Self::Join => {
                self.arity(args, 1, 2)?;
                let items = self.list_snapshot(&args[0])?;
                let sep = match args.get(1) {
                    Some(sep) => self.str_arg(sep)?,
                    None => "",
                };
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                Ok(Value::Str(parts.join(sep)))
            }
            Self::Split => {
                self.arity(args, 1, 2)?;
                let s = self.str_arg(&args[0])?;
                let parts: Vec<Value> = match args.get(1) {
                    None | Some(Value::Nil) => s.split_whitespace().map(Value::from).collect(),
                    Some(sep) => {
                        let sep = self.str_arg(sep)?;
                        if sep.is_empty() {
                            return Err(RuntimeError::Value("empty separator".into()));
                        }
                        s.split(sep).map(Value::from).collect()
                    }
                };
                Ok(Value::list(parts))
            }
            Self::Upper => self.map_str(args, |s| s.to_uppercase()),
            Self::Lower => self.map_str(args, |s| s.to_lowercase()),
            Self::Trim => self.map_str(args, |s| s.trim().to_string()),
            Self::StartsWith => {
                let [s, prefix] = self.exact::<2>(args)?;
                Ok(Value::Bool(self.str_arg(s)?.starts_with(self.str_arg(prefix)?)))
            }
            Self::EndsWith => {
                let [s, suffix] = self.exact::<2>(args)?;
                Ok(Value::Bool(self.str_arg(s)?.ends_with(self.str_arg(suffix)?)))
            }
            Self::Replace => {
                let [s, from, to] = self.exact::<3>(args)?;
                let from = self.str_arg(from)?;
                if from.is_empty() {
                    return Err(RuntimeError::Value("cannot replace an empty string".into()));
                }
                Ok(Value::Str(self.str_arg(s)?.replace(from, self.str_arg(to)?)))
            }
            Self::Sqrt => {
                let [value] = self.exact::<1>(args)?;
                let x = self.number_arg(value)?;
                if x < 0.0 {
                    return Err(RuntimeError::Value("square root of a negative number".into()));
                }
                Ok(Value::Float(x.sqrt()))
            }
            Self::Pow => {
                let [base, exp] = self.exact::<2>(args)?;
                match (base, exp) {
                    (Value::Int(b), Value::Int(e)) if *e >= 0 => {
                        let e = u32::try_from(*e).map_err(|_| RuntimeError::Overflow("pow"))?;
                        b.checked_pow(e).map(Value::Int).ok_or(RuntimeError::Overflow("pow"))
                    }
                    _ => Ok(Value::Float(self.number_arg(base)?.powf(self.number_arg(exp)?))),
                }
            }
            Self::Floor => self.round_with(args, f64::floor),
            Self::Ceil => self.round_with(args, f64::ceil),
            Self::Round => self.round_with(args, f64::round),
            Self::Sum => {
                let [list] = self.exact::<1>(args)?;
                let mut total = Value::Int(0);
                for item in self.list_snapshot(list)? {
                    total = crate::ops::binary(crate::ast::BinaryOp::Add, &total, &item)?;
                }
                Ok(total)
            }
            Self::Sorted => {
                self.arity(args, 1, 2)?;
                let mut items = match &args[0] {
                    Value::Map(map) => map.lock().keys().map(Key::to_value).collect(),
                    other => self.list_snapshot(other)?,
                };
                let descending = args.get(1).is_some_and(Value::is_truthy);
                let mut failure = None;
                items.sort_by(|a, b| match a.compare(b) {
                    Ok(order) => order,
                    Err(e) => {
                        failure.get_or_insert(e);
                        Ordering::Equal
                    }
                });
                if let Some(e) = failure {
                    return Err(e);
                }
                if descending {
                    items.reverse();
                }
                Ok(Value::list(items))
            }
            Self::Reversed => {
                let [value] = self.exact::<1>(args)?;
                match value {
                    Value::Str(s) => Ok(Value::Str(s.chars().rev().collect())),
                    other => {
                        let mut items = self.list_snapshot(other)?;
                        items.reverse();
                        Ok(Value::list(items))
                    }
                }
            }
            Self::TypeOf => {
                let [value] = self.exact::<1>(args)?;
                Ok(Value::from(value.type_name()))
            }
            Self::Print => {
                let line: Vec<String> = args.iter().map(ToString::to_string).collect();
                info!(target: "vibescript", "{}", line.join(" "));
                Ok(Value::Nil)
            }
            Self::Get => {
                self.arity(args, 2, 3)?;
                let default = args.get(2).cloned().unwrap_or_default();
                match &args[0] {
                    Value::Map(map) => {
                        let found = match args[1].to_key() {
                            Ok(key) => map.lock().get(&key).cloned(),
                            Err(_) => None,
                        };
                        Ok(found.unwrap_or(default))
                    }
                    Value::List(items) => {
                        let items = items.lock();
                        let found = self
                            .int_arg(&args[1])
                            .ok()
                            .and_then(|i| normalize_index(i, items.len()).ok())
                            .map(|i| items[i].clone());
                        Ok(found.unwrap_or(default))
                    }
                    Value::Nil => Ok(default),
                    other => Err(self.bad_arg(other)),
                }
            }
            Self::Slice => {
                self.arity(args, 2, 3)?;
                let start = self.int_arg(&args[1])?;
                let end = match args.get(2) {
                    None | Some(Value::Nil) => None,
                    Some(end) => Some(self.int_arg(end)?),
                };
                match &args[0] {
                    Value::Str(s) => {
                        let chars: Vec<char> = s.chars().collect();
                        let (from, to) = slice_bounds(start, end, chars.len());
                        Ok(Value::Str(chars[from..to].iter().collect()))
                    }
                    other => {
                        let items = self.list_snapshot(other)?;
                        let (from, to) = slice_bounds(start, end, items.len());
                        Ok(Value::list(items[from..to].to_vec()))
                    }
                }
            }
        }
    }

    fn arity(self, args: &[Value], min: usize, max: usize) -> RuntimeResult<()> {
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min} to {max}")
            };
            return Err(RuntimeError::Arity {
                name: self.name().to_string(),
                expected,
                found: args.len(),
            });
        }
        Ok(())
    }

    fn exact<'a, const N: usize>(self, args: &'a [Value]) -> RuntimeResult<&'a [Value; N]> {
        self.arity(args, N, N)?;
        args.try_into().map_err(|_| RuntimeError::Arity {
            name: self.name().to_string(),
            expected: N.to_string(),
            found: args.len(),
        })
    }

    fn bad_arg(self, value: &Value) -> RuntimeError {
        RuntimeError::type_error(format!(
            "{}() does not accept {}",
            self.name(),
            value.type_name()
        ))
    }

    fn int_arg(self, value: &Value) -> RuntimeResult<i64> {
        value.as_int().ok_or_else(|| self.bad_arg(value))
    }

    fn number_arg(self, value: &Value) -> RuntimeResult<f64> {
        value.as_float().ok_or_else(|| self.bad_arg(value))
    }

    fn str_arg(self, value: &Value) -> RuntimeResult<&str> {
        value.as_str().ok_or_else(|| self.bad_arg(value))
    }

    fn list_arg(self, value: &Value) -> RuntimeResult<&crate::value::ListRef> {
        match value {
            Value::List(items) => Ok(items),
            other => Err(self.bad_arg(other)),
        }
    }

    fn list_snapshot(self, value: &Value) -> RuntimeResult<Vec<Value>> {
        value.list_snapshot().ok_or_else(|| self.bad_arg(value))
    }

    fn map_arg(self, value: &Value) -> RuntimeResult<Map> {
        match value {
            Value::Map(map) => Ok(map.lock().clone()),
            other => Err(self.bad_arg(other)),
        }
    }

    fn map_str(self, args: &[Value], f: impl Fn(&str) -> String) -> RuntimeResult<Value> {
        let [value] = self.exact::<1>(args)?;
        Ok(Value::Str(f(self.str_arg(value)?)))
    }

    fn round_with(self, args: &[Value], f: fn(f64) -> f64) -> RuntimeResult<Value> {
        let [value] = self.exact::<1>(args)?;
        match value {
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::Float(x) => float_to_int(f(*x), self.name()),
            other => Err(self.bad_arg(other)),
        }
    }
}

fn range(builtin: Builtin, args: &[Value]) -> RuntimeResult<Value> {
    builtin.arity(args, 1, 3)?;
    let ints = args
        .iter()
        .map(|a| builtin.int_arg(a))
        .collect::<RuntimeResult<Vec<i64>>>()?;
    let (start, end, step) = match ints.as_slice() {
        [end] => (0, *end, 1),
        [start, end] => (*start, *end, 1),
        [start, end, step, ..] => (*start, *end, *step),
        [] => (0, 0, 1),
    };
    if step == 0 {
        return Err(RuntimeError::Value("range() step must not be zero".into()));
    }

    let span = if step > 0 {
        i128::from(end) - i128::from(start)
    } else {
        i128::from(start) - i128::from(end)
    };
    let step_abs = i128::from(step).abs();
    let len = if span <= 0 { 0 } else { (span + step_abs - 1) / step_abs };
    if len > MAX_RANGE_LEN as i128 {
        return Err(RuntimeError::Value(format!(
            "range() would produce more than {MAX_RANGE_LEN} elements"
        )));
    }

    let items = (0..len)
        .map(|i| Value::Int((i128::from(start) + i * i128::from(step)) as i64))
        .collect();
    Ok(Value::list(items))
}

fn extreme(builtin: Builtin, args: &[Value], want: Ordering) -> RuntimeResult<Value> {
    let items = match args {
        [single] => builtin.list_snapshot(single)?,
        _ => args.to_vec(),
    };
    let mut iter = items.into_iter();
    let mut best = iter.next().ok_or_else(|| {
        RuntimeError::Value(format!("{}() of an empty sequence", builtin.name()))
    })?;
    for item in iter {
        if item.compare(&best)? == want {
            best = item;
        }
    }
    Ok(best)
}

fn to_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn float_to_int(x: f64, op: &'static str) -> RuntimeResult<Value> {
    if !x.is_finite() || x < i64::MIN as f64 || x >= i64::MAX as f64 {
        return Err(RuntimeError::Overflow(op));
    }
    Ok(Value::Int(x as i64))
}

/// Resolve a possibly negative index against `len`.
pub(crate) fn normalize_index(index: i64, len: usize) -> RuntimeResult<usize> {
    let len_i = to_int(len);
    let resolved = if index < 0 { index + len_i } else { index };
    if resolved < 0 || resolved >= len_i {
        return Err(RuntimeError::IndexOutOfRange { index, len });
    }
    Ok(resolved as usize)
}

fn clamp_index(index: i64, len: usize) -> usize {
    let len_i = to_int(len);
    let resolved = if index < 0 { index + len_i } else { index };
    resolved.clamp(0, len_i) as usize
}

fn slice_bounds(start: i64, end: Option<i64>, len: usize) -> (usize, usize) {
    let from = clamp_index(start, len);
    let to = end.map_or(len, |e| clamp_index(e, len));
    (from, to.max(from))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> RuntimeResult<Value> {
        Builtin::from_name(name).unwrap().call(args)
    }

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().map(|&i| Value::Int(i)).collect())
    }

    #[test]
    fn names_round_trip() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(*builtin));
        }
        assert_eq!(Builtin::from_name("eval"), None);
    }

    #[test]
    fn range_forms() {
        assert_eq!(call("range", &[Value::Int(3)]).unwrap(), ints(&[0, 1, 2]));
        assert_eq!(call("range", &[Value::Int(1), Value::Int(4)]).unwrap(), ints(&[1, 2, 3]));
        assert_eq!(
            call("range", &[Value::Int(5), Value::Int(0), Value::Int(-2)]).unwrap(),
            ints(&[5, 3, 1])
        );
        assert_eq!(call("range", &[Value::Int(3), Value::Int(1)]).unwrap(), ints(&[]));
        assert!(call("range", &[Value::Int(0), Value::Int(1), Value::Int(0)]).is_err());
        assert!(call("range", &[Value::Int(i64::MAX)]).is_err());
    }

    #[test]
    fn list_mutation_in_place() {
        let xs = ints(&[1, 2]);
        call("push", &[xs.clone(), Value::Int(3)]).unwrap();
        call("insert", &[xs.clone(), Value::Int(0), Value::Int(0)]).unwrap();
        assert_eq!(xs, ints(&[0, 1, 2, 3]));
        assert_eq!(call("pop", &[xs.clone()]).unwrap(), Value::Int(3));
        assert_eq!(call("remove", &[xs.clone(), Value::Int(0)]).unwrap(), Value::Int(0));
        assert_eq!(xs, ints(&[1, 2]));
        assert!(call("pop", &[ints(&[])]).is_err());
    }

    #[test]
    fn map_helpers() {
        let map = Value::map(Map::new());
        call("insert", &[map.clone(), Value::from("a"), Value::Int(1)]).unwrap();
        call("insert", &[map.clone(), Value::Int(7), Value::Int(2)]).unwrap();
        assert_eq!(call("keys", &[map.clone()]).unwrap(), Value::list(vec![Value::from("a"), Value::Int(7)]));
        assert_eq!(call("values", &[map.clone()]).unwrap(), ints(&[1, 2]));
        assert_eq!(call("contains", &[map.clone(), Value::Int(7)]).unwrap(), Value::Bool(true));
        assert_eq!(call("get", &[map.clone(), Value::from("zz"), Value::Int(0)]).unwrap(), Value::Int(0));
        assert_eq!(call("remove", &[map.clone(), Value::from("a")]).unwrap(), Value::Int(1));
        assert!(matches!(
            call("remove", &[map, Value::from("a")]),
            Err(RuntimeError::KeyNotFound(_))
        ));
    }

    #[test]
    fn string_helpers() {
        assert_eq!(call("upper", &[Value::from("abc")]).unwrap(), Value::from("ABC"));
        assert_eq!(call("trim", &[Value::from("  x ")]).unwrap(), Value::from("x"));
        assert_eq!(
            call("split", &[Value::from("a,b,,c"), Value::from(",")]).unwrap(),
            Value::list(vec!["a".into(), "b".into(), "".into(), "c".into()])
        );
        assert_eq!(
            call("split", &[Value::from(" a  b ")]).unwrap(),
            Value::list(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            call("join", &[ints(&[1, 2, 3]), Value::from("-")]).unwrap(),
            Value::from("1-2-3")
        );
        assert_eq!(
            call("replace", &[Value::from("aXbX"), Value::from("X"), Value::from("_")]).unwrap(),
            Value::from("a_b_")
        );
        assert_eq!(call("len", &[Value::from("héllo")]).unwrap(), Value::Int(5));
        assert_eq!(call("reversed", &[Value::from("abc")]).unwrap(), Value::from("cba"));
        assert_eq!(
            call("slice", &[Value::from("abcdef"), Value::Int(1), Value::Int(-1)]).unwrap(),
            Value::from("bcde")
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(call("int", &[Value::from(" 42 ")]).unwrap(), Value::Int(42));
        assert_eq!(call("int", &[Value::Float(-2.7)]).unwrap(), Value::Int(-2));
        assert!(call("int", &[Value::from("4x")]).is_err());
        assert_eq!(call("float", &[Value::Int(2)]).unwrap(), Value::Float(2.0));
        assert_eq!(call("str", &[Value::Float(1.5)]).unwrap(), Value::from("1.5"));
        assert_eq!(call("round", &[Value::Float(2.5)]).unwrap(), Value::Int(3));
        assert_eq!(call("floor", &[Value::Float(-0.5)]).unwrap(), Value::Int(-1));
        assert!(call("ceil", &[Value::Float(f64::INFINITY)]).is_err());
    }

    #[test]
    fn numeric_helpers() {
        assert_eq!(call("pow", &[Value::Int(2), Value::Int(10)]).unwrap(), Value::Int(1024));
        assert_eq!(call("pow", &[Value::Int(2), Value::Int(-1)]).unwrap(), Value::Float(0.5));
        assert!(call("pow", &[Value::Int(10), Value::Int(40)]).is_err());
        assert_eq!(call("sqrt", &[Value::Int(9)]).unwrap(), Value::Float(3.0));
        assert_eq!(call("abs", &[Value::Int(-4)]).unwrap(), Value::Int(4));
        assert_eq!(call("sum", &[ints(&[1, 2, 3])]).unwrap(), Value::Int(6));
        assert_eq!(call("min", &[Value::Int(3), Value::Int(1), Value::Int(2)]).unwrap(), Value::Int(1));
        assert_eq!(call("max", &[ints(&[3, 9, 2])]).unwrap(), Value::Int(9));
        assert!(call("max", &[ints(&[])]).is_err());
    }

    #[test]
    fn sorting() {
        assert_eq!(call("sorted", &[ints(&[3, 1, 2])]).unwrap(), ints(&[1, 2, 3]));
        assert_eq!(
            call("sorted", &[ints(&[3, 1, 2]), Value::Bool(true)]).unwrap(),
            ints(&[3, 2, 1])
        );
        let mixed = Value::list(vec![Value::Int(1), Value::from("a")]);
        assert!(call("sorted", &[mixed]).is_err());
    }

    #[test]
    fn arity_is_checked() {
        let err = call("len", &[]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::Arity {
                name: "len".into(),
                expected: "1".into(),
                found: 0
            }
        );
    }

    #[test]
    fn index_normalization() {
        assert_eq!(normalize_index(-1, 3).unwrap(), 2);
        assert!(normalize_index(3, 3).is_err());
        assert!(normalize_index(-4, 3).is_err());
    }
}
