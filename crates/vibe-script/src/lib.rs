//! # vibe-script
//!
//! vibescript, the language generated function bodies are written in, and
//! the loader that binds them into an explicit [`Module`].
//!
//! ```text
//! source ──► Lexer ──► Parser ──► Program
//!                                    │
//!                                    ▼
//!                    CodeLoader ──► Module (fns, lets, natives, globals)
//!                                    │
//!                                    ▼
//!                                 Callable ──► Interpreter (bounded by Limits)
//! ```
//!
//! Execution is bounded: every call gets a step budget and a maximum call
//! depth, so runaway generated code fails with a [`RuntimeError`] instead of
//! hanging the host.

#![deny(unsafe_code)]

pub mod ast;
pub mod builtins;
pub mod error;
mod interpreter;
pub mod lexer;
pub mod loader;
pub mod module;
pub mod ops;
pub mod parser;
pub mod value;

pub use builtins::Builtin;
pub use error::{LoadError, LoadResult, RuntimeError, RuntimeResult, SyntaxError, SyntaxResult};
pub use interpreter::Limits;
pub use loader::{Callable, CodeLoader};
pub use module::Module;
pub use parser::Parser;
pub use value::{Function, Key, Map, NativeFunction, Value};
