//! Binding parsed source into a [`Module`].

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::debug;

use crate::ast::{Item, Program};
use crate::error::{LoadError, LoadResult, RuntimeResult};
use crate::interpreter::{run_bounded, Limits};
use crate::module::Module;
use crate::parser::Parser;
use crate::value::{Function, Value};

/// A loaded function, invocable from the host.
///
/// Each call runs with a fresh step budget and call depth. Other functions
/// the callable refers to are resolved through its module at call time.
#[derive(Clone)]
pub struct Callable {
    name: String,
    function: Function,
    module: Arc<Module>,
    limits: Limits,
}

impl Callable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub fn call(&self, args: &[Value]) -> RuntimeResult<Value> {
        run_bounded(&self.module, self.limits, |interp| {
            interp.call_function(&self.function, args.to_vec())
        })
    }

    /// Whether a call with `arity` positional arguments is accepted.
    pub fn accepts(&self, arity: usize) -> bool {
        match &self.function {
            Function::Script(def) => (def.required_arity()..=def.max_arity()).contains(&arity),
            Function::Native(_) | Function::Builtin(_) => true,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("module", &self.module.name())
            .field("limits", &self.limits)
            .finish()
    }
}

/// Parses source and registers its items into a module.
#[derive(Clone, Copy, Debug, Default)]
pub struct CodeLoader {
    limits: Limits,
}

impl CodeLoader {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Load `source` into `module` and return the function `name`.
    ///
    /// Nothing is registered unless the source parses and defines `name`.
    /// After that every top-level `fn` and `let` is bound, replacing
    /// existing bindings with the same name.
    pub fn load(&self, source: &str, module: &Arc<Module>, name: &str) -> LoadResult<Callable> {
        self.load_inner(source, module, name, None)
    }

    /// Like [`load`](Self::load), but also rejects a function that cannot be
    /// called with every arity in `arity`. The check runs before anything is
    /// registered.
    pub fn load_checked(
        &self,
        source: &str,
        module: &Arc<Module>,
        name: &str,
        arity: RangeInclusive<usize>,
    ) -> LoadResult<Callable> {
        self.load_inner(source, module, name, Some(arity))
    }

    /// Register every item of `source` without requiring a particular
    /// function. Returns the bound names in source order.
    pub fn load_items(&self, source: &str, module: &Module) -> LoadResult<Vec<String>> {
        let program = Parser::parse(source)?;
        self.install(&program, module)?;
        Ok(program.binding_names().into_iter().map(str::to_string).collect())
    }

    fn load_inner(
        &self,
        source: &str,
        module: &Arc<Module>,
        name: &str,
        arity: Option<RangeInclusive<usize>>,
    ) -> LoadResult<Callable> {
        let program = Parser::parse(source)?;
        let def = program
            .function(name)
            .cloned()
            .ok_or_else(|| LoadError::MissingBinding(name.to_string()))?;

        if let Some(arity) = arity {
            let accepts = def.required_arity()..=def.max_arity();
            if !(accepts.contains(arity.start()) && accepts.contains(arity.end())) {
                return Err(LoadError::ArityMismatch {
                    function: name.to_string(),
                    declared: describe_arity(&arity),
                    accepts: describe_arity(&accepts),
                });
            }
        }

        self.install(&program, module)?;
        debug!(
            function = name,
            module = module.name(),
            bindings = program.items.len(),
            "Loaded generated source"
        );

        Ok(Callable {
            name: name.to_string(),
            function: Function::Script(def),
            module: Arc::clone(module),
            limits: self.limits,
        })
    }

    /// Functions first so `let` initializers can call them.
    fn install(&self, program: &Program, module: &Module) -> LoadResult<()> {
        for item in &program.items {
            if let Item::Function(def) = item {
                module.define(def.name.clone(), Value::Function(Function::Script(Arc::clone(def))));
            }
        }
        for item in &program.items {
            if let Item::Let { name, value, .. } = item {
                let value = run_bounded(module, self.limits, |interp| interp.eval_standalone(value))
                    .map_err(|source| LoadError::Initialization {
                        name: name.clone(),
                        source,
                    })?;
                module.define(name.clone(), value);
            }
        }
        Ok(())
    }
}

fn describe_arity(arity: &RangeInclusive<usize>) -> String {
    if arity.start() == arity.end() {
        arity.start().to_string()
    } else {
        format!("{} to {}", arity.start(), arity.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RuntimeError, SyntaxError};

    #[test]
    fn load_and_call() {
        let module = Module::shared("app");
        let callable = CodeLoader::default()
            .load("fn add(a, b) { return a + b }", &module, "add")
            .unwrap();
        assert_eq!(callable.name(), "add");
        assert_eq!(callable.call(&[Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));
        assert!(callable.accepts(2));
        assert!(!callable.accepts(1));
        assert!(module.contains("add"));
    }

    #[test]
    fn syntax_error_leaves_module_untouched() {
        let module = Module::shared("app");
        module.set_global("keep", 1i64);
        let err = CodeLoader::default()
            .load("fn broken( { }", &module, "broken")
            .unwrap_err();
        assert!(matches!(err, LoadError::Syntax(SyntaxError { line: 1, .. })));
        assert_eq!(module.names(), vec!["keep"]);
    }

    #[test]
    fn missing_binding_leaves_module_untouched() {
        let module = Module::shared("app");
        let err = CodeLoader::default()
            .load("fn other() { return 1 }", &module, "wanted")
            .unwrap_err();
        assert_eq!(err, LoadError::MissingBinding("wanted".into()));
        assert!(module.is_empty());
    }

    #[test]
    fn helpers_and_constants_are_bound() {
        let module = Module::shared("app");
        let source = r#"
            let SQUARES = [square(1), square(2), square(3)]
            fn square(x) { return x * x }
            fn total() { return sum(SQUARES) }
        "#;
        let callable = CodeLoader::default().load(source, &module, "total").unwrap();
        assert_eq!(callable.call(&[]).unwrap(), Value::Int(14));
        assert_eq!(module.names(), vec!["SQUARES", "square", "total"]);
    }

    #[test]
    fn later_loads_replace_bindings() {
        let module = Module::shared("app");
        let loader = CodeLoader::default();
        loader.load("fn f() { return 1 }", &module, "f").unwrap();
        loader.load("fn f() { return 2 }", &module, "f").unwrap();
        let caller = loader.load("fn g() { return f() }", &module, "g").unwrap();
        assert_eq!(caller.call(&[]).unwrap(), Value::Int(2));
        assert_eq!(module.names(), vec!["f", "g"]);
    }

    #[test]
    fn initialization_failure() {
        let module = Module::shared("app");
        let err = CodeLoader::default()
            .load("let BAD = 1 / 0\nfn f() { return BAD }", &module, "f")
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::Initialization {
                name: "BAD".into(),
                source: RuntimeError::DivisionByZero,
            }
        );
    }

    #[test]
    fn arity_is_checked_before_registration() {
        let module = Module::shared("app");
        let loader = CodeLoader::default();
        let err = loader
            .load_checked("fn f(a) { return a }", &module, "f", 2..=2)
            .unwrap_err();
        assert!(matches!(err, LoadError::ArityMismatch { ref declared, ref accepts, .. }
            if declared == "2" && accepts == "1"));
        assert!(module.is_empty());

        let ok = loader
            .load_checked("fn f(a, b = 2, c = 3) { return a + b + c }", &module, "f", 1..=2)
            .unwrap();
        assert_eq!(ok.call(&[Value::Int(1)]).unwrap(), Value::Int(6));
    }

    #[test]
    fn natives_are_visible_to_loaded_code() {
        let module = Module::shared("app");
        module.register_native("twice", |args: &[Value]| match args {
            [Value::Int(i)] => Ok(Value::Int(i * 2)),
            _ => Err(RuntimeError::native("twice", "expected an int")),
        });
        let callable = CodeLoader::default()
            .load("fn f(x) { return twice(x) + 1 }", &module, "f")
            .unwrap();
        assert_eq!(callable.call(&[Value::Int(20)]).unwrap(), Value::Int(41));
    }

    #[test]
    fn load_items_returns_names_in_order() {
        let module = Module::new("ctx");
        let names = CodeLoader::default()
            .load_items("let ORIGIN = 0\nfn step(x) { return x + 1 }", &module)
            .unwrap();
        assert_eq!(names, vec!["ORIGIN", "step"]);
        assert!(module.contains("step"));
    }
}
