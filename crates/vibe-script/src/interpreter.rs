//! Tree-walking evaluator.
//!
//! Every statement, loop iteration and call spends one step from the budget
//! in [`Limits`]; script-to-script calls also count against the call depth.
//! Each evaluated expression, statement and call is one level of nesting,
//! and invocations run on a thread whose stack fits the nesting limit.
//! Running out of any of these is a [`RuntimeError`], never a hang or a crash.

use std::collections::HashMap;
use std::thread;

use crate::ast::{BinaryOp, Expr, FunctionDef, LogicalOp, Stmt};
use crate::builtins::{normalize_index, Builtin};
use crate::error::{RuntimeError, RuntimeResult};
use crate::ops;
use crate::module::Module;
use crate::value::{Function, Key, Map, Value};

/// Execution bounds for one top-level invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Nested script function calls allowed.
    pub max_call_depth: usize,
    /// Statements, loop iterations and calls allowed.
    pub max_steps: u64,
}

/// Nesting levels granted per unit of call depth.
const NESTING_PER_CALL: usize = 16;
/// Levels available to top-level `let` initializers and argument defaults.
const NESTING_BASE: usize = 64;
const MAX_NESTING: usize = 8_192;
/// Stack reserved per nesting level; one level spans a few Rust frames.
const STACK_PER_LEVEL: usize = 32 * 1024;
const STACK_BASE: usize = 256 * 1024;

impl Limits {
    pub fn new(max_call_depth: usize, max_steps: u64) -> Self {
        Self {
            max_call_depth,
            max_steps,
        }
    }

    /// Evaluator recursion allowed in one invocation, counting calls,
    /// statements and expressions. Exceeding it reports
    /// [`RuntimeError::CallDepthExceeded`].
    pub fn max_nesting(&self) -> usize {
        self.max_call_depth
            .saturating_mul(NESTING_PER_CALL)
            .saturating_add(NESTING_BASE)
            .min(MAX_NESTING)
    }

    fn stack_size(&self) -> usize {
        STACK_BASE + self.max_nesting() * STACK_PER_LEVEL
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_call_depth: 128,
            max_steps: 10_000_000,
        }
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Local variables of one call. Blocks push scopes; plain assignment to an
/// unknown name creates it in the function scope.
struct Frame {
    scopes: Vec<HashMap<String, Value>>,
}

impl Frame {
    fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn declare(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    fn declare_in_function_scope(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.first_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    fn assign(&mut self, name: &str, value: Value) {
        if let Some(slot) = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
        {
            *slot = value;
        }
    }

    fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }
}

/// Run `f` against a fresh interpreter on a dedicated thread sized for
/// `limits`. The caller's tracing span carries over to the thread.
pub(crate) fn run_bounded<'m, T, F>(module: &'m Module, limits: Limits, f: F) -> RuntimeResult<T>
where
    T: Send,
    F: FnOnce(&mut Interpreter<'m>) -> RuntimeResult<T> + Send,
{
    let span = tracing::Span::current();
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name("vibescript".to_string())
            .stack_size(limits.stack_size())
            .spawn_scoped(scope, move || {
                let _entered = span.enter();
                f(&mut Interpreter::new(module, limits))
            })
            .map_err(|err| RuntimeError::Host(err.to_string()))?;
        handle
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}

pub(crate) struct Interpreter<'m> {
    module: &'m Module,
    limits: Limits,
    max_nesting: usize,
    depth: usize,
    nesting: usize,
    steps: u64,
}

impl<'m> Interpreter<'m> {
    pub(crate) fn new(module: &'m Module, limits: Limits) -> Self {
        Self {
            module,
            limits,
            max_nesting: limits.max_nesting(),
            depth: 0,
            nesting: 0,
            steps: 0,
        }
    }

    pub(crate) fn call_function(&mut self, function: &Function, args: Vec<Value>) -> RuntimeResult<Value> {
        self.tick()?;
        match function {
            Function::Script(def) => self.call_script(def, args),
            Function::Native(native) => native.call(&args),
            Function::Builtin(builtin) => builtin.call(&args),
        }
    }

    /// Evaluate an expression with no local variables.
    pub(crate) fn eval_standalone(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        let mut frame = Frame::new();
        self.eval(expr, &mut frame)
    }

    fn tick(&mut self) -> RuntimeResult<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(RuntimeError::StepLimitExceeded(self.limits.max_steps));
        }
        Ok(())
    }

    fn enter(&mut self) -> RuntimeResult<()> {
        if self.nesting >= self.max_nesting {
            return Err(RuntimeError::CallDepthExceeded(self.limits.max_call_depth));
        }
        self.nesting += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn call_script(&mut self, def: &FunctionDef, args: Vec<Value>) -> RuntimeResult<Value> {
        let (required, max) = (def.required_arity(), def.max_arity());
        if args.len() < required || args.len() > max {
            let expected = if required == max {
                max.to_string()
            } else {
                format!("{required} to {max}")
            };
            return Err(RuntimeError::Arity {
                name: def.name.clone(),
                expected,
                found: args.len(),
            });
        }
        if self.depth >= self.limits.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded(self.limits.max_call_depth));
        }

        self.enter()?;
        self.depth += 1;
        let result = self.run_body(def, args);
        self.depth -= 1;
        self.leave();
        result
    }

    fn run_body(&mut self, def: &FunctionDef, args: Vec<Value>) -> RuntimeResult<Value> {
        let mut frame = Frame::new();
        let mut args = args.into_iter();
        for param in &def.params {
            let value = match (args.next(), &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => self.eval(default, &mut frame)?,
                (None, None) => Value::Nil,
            };
            frame.declare(&param.name, value);
        }

        match self.exec_block(&def.body, &mut frame)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
            Flow::Break => Err(RuntimeError::LoopControl("break")),
            Flow::Continue => Err(RuntimeError::LoopControl("continue")),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], frame: &mut Frame) -> RuntimeResult<Flow> {
        for stmt in stmts {
            match self.exec(stmt, frame)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn scoped_block(&mut self, stmts: &[Stmt], frame: &mut Frame) -> RuntimeResult<Flow> {
        frame.push();
        let flow = self.exec_block(stmts, frame);
        frame.pop();
        flow
    }

    fn exec(&mut self, stmt: &Stmt, frame: &mut Frame) -> RuntimeResult<Flow> {
        self.tick()?;
        self.enter()?;
        let flow = self.exec_stmt(stmt, frame);
        self.leave();
        flow
    }

    fn exec_stmt(&mut self, stmt: &Stmt, frame: &mut Frame) -> RuntimeResult<Flow> {
        match stmt {
            Stmt::Let { name, value } => {
                let value = self.eval(value, frame)?;
                frame.declare(name, value);
                Ok(Flow::Normal)
            }
            Stmt::Assign { target, op, value } => {
                self.assign(target, *op, value, frame)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if self.eval(condition, frame)?.is_truthy() {
                        return self.scoped_block(body, frame);
                    }
                }
                match otherwise {
                    Some(body) => self.scoped_block(body, frame),
                    None => Ok(Flow::Normal),
                }
            }
            Stmt::While { condition, body } => self.exec_while(condition, body, frame),
            Stmt::For {
                var,
                iterable,
                body,
            } => self.exec_for(var, iterable, body, frame),
            Stmt::Function(def) => {
                frame.declare(&def.name, Value::Function(Function::Script(def.clone())));
                Ok(Flow::Normal)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, frame)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Expr(expr) => {
                self.eval(expr, frame)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn exec_while(&mut self, condition: &Expr, body: &[Stmt], frame: &mut Frame) -> RuntimeResult<Flow> {
        loop {
            self.tick()?;
            if !self.eval(condition, frame)?.is_truthy() {
                return Ok(Flow::Normal);
            }
            match self.scoped_block(body, frame)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
    }

    fn exec_for(
        &mut self,
        var: &str,
        iterable: &Expr,
        body: &[Stmt],
        frame: &mut Frame,
    ) -> RuntimeResult<Flow> {
        let items = match self.eval(iterable, frame)? {
            list @ Value::List(_) => list.list_snapshot().unwrap_or_default(),
            Value::Map(map) => map.lock().keys().map(Key::to_value).collect(),
            Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
            other => {
                return Err(RuntimeError::type_error(format!(
                    "cannot iterate over {}",
                    other.type_name()
                )))
            }
        };

        for item in items {
            self.tick()?;
            frame.push();
            frame.declare(var, item);
            let flow = self.exec_block(body, frame);
            frame.pop();
            match flow? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn assign(
        &mut self,
        target: &Expr,
        op: Option<BinaryOp>,
        value: &Expr,
        frame: &mut Frame,
    ) -> RuntimeResult<()> {
        match target {
            Expr::Name(name) => {
                let new = match op {
                    Some(op) => {
                        let current = self.lookup(name, frame)?;
                        let rhs = self.eval(value, frame)?;
                        ops::binary(op, &current, &rhs)?
                    }
                    None => self.eval(value, frame)?,
                };
                if frame.has(name) {
                    frame.assign(name, new);
                } else if !self.module.assign_global(name, new.clone()) {
                    frame.declare_in_function_scope(name, new);
                }
                Ok(())
            }
            Expr::Index { target, index } => {
                let container = self.eval(target, frame)?;
                let key = self.eval(index, frame)?;
                let new = match op {
                    Some(op) => {
                        let current = index_get(&container, &key)?;
                        let rhs = self.eval(value, frame)?;
                        ops::binary(op, &current, &rhs)?
                    }
                    None => self.eval(value, frame)?,
                };
                index_set(&container, &key, new)
            }
            Expr::Field { target, name } => {
                let container = self.eval(target, frame)?;
                let key = Value::Str(name.clone());
                let new = match op {
                    Some(op) => {
                        let current = field_get(&container, name)?;
                        let rhs = self.eval(value, frame)?;
                        ops::binary(op, &current, &rhs)?
                    }
                    None => self.eval(value, frame)?,
                };
                match &container {
                    Value::Map(_) => index_set(&container, &key, new),
                    other => Err(RuntimeError::type_error(format!(
                        "cannot set field '{name}' on {}",
                        other.type_name()
                    ))),
                }
            }
            _ => Err(RuntimeError::type_error("invalid assignment target")),
        }
    }

    fn eval(&mut self, expr: &Expr, frame: &mut Frame) -> RuntimeResult<Value> {
        self.enter()?;
        let value = self.eval_expr(expr, frame);
        self.leave();
        value
    }

    fn eval_expr(&mut self, expr: &Expr, frame: &mut Frame) -> RuntimeResult<Value> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::List(items) => {
                let items = self.eval_all(items, frame)?;
                Ok(Value::list(items))
            }
            Expr::Map(entries) => self.eval_map(entries, frame),
            Expr::Name(name) => self.lookup(name, frame),
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand, frame)?;
                ops::unary(*op, &operand)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                ops::binary(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, frame)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, frame)
                }
            }
            Expr::Call { callee, args } => {
                let callee = self.eval(callee, frame)?;
                let args = self.eval_all(args, frame)?;
                self.call_value(callee, args)
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => self.eval_method_call(receiver, method, args, frame),
            Expr::Index { target, index } => {
                let target = self.eval(target, frame)?;
                let index = self.eval(index, frame)?;
                index_get(&target, &index)
            }
            Expr::Field { target, name } => {
                let target = self.eval(target, frame)?;
                field_get(&target, name)
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr], frame: &mut Frame) -> RuntimeResult<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e, frame)).collect()
    }

    fn eval_map(&mut self, entries: &[(Expr, Expr)], frame: &mut Frame) -> RuntimeResult<Value> {
        let mut map = Map::new();
        for (key, value) in entries {
            let key = self.eval(key, frame)?.to_key()?;
            let value = self.eval(value, frame)?;
            map.insert(key, value);
        }
        Ok(Value::map(map))
    }

    /// A map field holding a function is called directly; anything else is
    /// `method(receiver, args...)`.
    fn eval_method_call(
        &mut self,
        receiver: &Expr,
        method: &str,
        args: &[Expr],
        frame: &mut Frame,
    ) -> RuntimeResult<Value> {
        let receiver = self.eval(receiver, frame)?;
        if let Value::Map(map) = &receiver {
            let field = map.lock().get(&Key::Str(method.to_string())).cloned();
            if let Some(function @ Value::Function(_)) = field {
                let args = self.eval_all(args, frame)?;
                return self.call_value(function, args);
            }
        }

        let function = self.lookup(method, frame)?;
        let mut all_args = Vec::with_capacity(args.len() + 1);
        all_args.push(receiver);
        all_args.extend(self.eval_all(args, frame)?);
        self.call_value(function, all_args)
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>) -> RuntimeResult<Value> {
        match callee {
            Value::Function(function) => self.call_function(&function, args),
            other => Err(RuntimeError::NotCallable(other.repr())),
        }
    }

    /// Locals, then module bindings, then builtins.
    fn lookup(&self, name: &str, frame: &Frame) -> RuntimeResult<Value> {
        if let Some(value) = frame.lookup(name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.module.get(name) {
            return Ok(value);
        }
        Builtin::from_name(name)
            .map(|builtin| Value::Function(Function::Builtin(builtin)))
            .ok_or_else(|| RuntimeError::UndefinedName(name.to_string()))
    }
}

fn index_get(container: &Value, index: &Value) -> RuntimeResult<Value> {
    match container {
        Value::List(items) => {
            let i = list_index(index)?;
            let items = items.lock();
            let i = normalize_index(i, items.len())?;
            Ok(items[i].clone())
        }
        Value::Map(map) => {
            let key = index.to_key()?;
            map.lock()
                .get(&key)
                .cloned()
                .ok_or_else(|| RuntimeError::KeyNotFound(key.to_string()))
        }
        Value::Str(s) => {
            let i = list_index(index)?;
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index(i, chars.len())?;
            Ok(Value::Str(chars[i].to_string()))
        }
        other => Err(RuntimeError::type_error(format!(
            "cannot index into {}",
            other.type_name()
        ))),
    }
}

fn index_set(container: &Value, index: &Value, value: Value) -> RuntimeResult<()> {
    match container {
        Value::List(items) => {
            let i = list_index(index)?;
            let mut items = items.lock();
            let i = normalize_index(i, items.len())?;
            items[i] = value;
            Ok(())
        }
        Value::Map(map) => {
            let key = index.to_key()?;
            map.lock().insert(key, value);
            Ok(())
        }
        Value::Str(_) => Err(RuntimeError::type_error("strings cannot be modified in place")),
        other => Err(RuntimeError::type_error(format!(
            "cannot assign into {}",
            other.type_name()
        ))),
    }
}

fn list_index(index: &Value) -> RuntimeResult<i64> {
    index.as_int().ok_or_else(|| {
        RuntimeError::type_error(format!("indices must be int, not {}", index.type_name()))
    })
}

fn field_get(target: &Value, name: &str) -> RuntimeResult<Value> {
    match target {
        Value::Map(map) => map
            .lock()
            .get(&Key::Str(name.to_string()))
            .cloned()
            .ok_or_else(|| RuntimeError::KeyNotFound(name.to_string())),
        other => Err(RuntimeError::type_error(format!(
            "{} has no field '{name}'",
            other.type_name()
        ))),
    }
}
