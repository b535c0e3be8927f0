//! # vibe-core
//!
//! Declarations and everything derived from them without I/O beyond reading
//! an optional context file.
//!
//! ```text
//! FunctionDeclaration
//!     │
//!     ▼
//! IdentityExtractor ──► IdentityDescriptor ──┬──► CacheKeyDeriver ──► CacheKey
//!                                            └──► PromptBuilder   ──► prompt text
//! ```

#![deny(unsafe_code)]

pub mod declaration;
pub mod error;
pub mod identity;
pub mod key;
pub mod normalize;
pub mod prompt;

pub use declaration::{ContextSource, FunctionDeclaration, Parameter, TypeDefinition};
pub use error::{IdentityError, IdentityResult};
pub use identity::{render_signature, IdentityDescriptor, IdentityExtractor, TypeRegistry};
pub use key::{CacheKey, CacheKeyDeriver, KeyPolicy};
pub use prompt::PromptBuilder;
