//! # vibe-runtime
//!
//! The orchestrator behind `materialize`: a declared function goes in, a
//! callable bound into the caller's [`Module`](vibe_script::Module) comes out.
//!
//! ```text
//! FunctionDeclaration
//!     │  identify (vibe-core)
//!     ▼
//! CacheKey ──► CacheStore.lookup ──hit──────────────────────┐
//!                  │ miss                                   │
//!                  ▼                                        ▼
//!             in-flight slot ──► CodeGenerator ──► store ──► CodeLoader ──► Artifact
//! ```
//!
//! Configuration comes from [`VibeConfig`]; nothing is read from ambient
//! globals.

#![deny(unsafe_code)]

pub mod artifact;
pub mod config;
pub mod error;
pub mod orchestrator;

pub use artifact::{Artifact, Resolution, ResolutionState};
pub use config::{CacheFailurePolicy, VibeConfig};
pub use error::{VibeError, VibeResult};
pub use orchestrator::Orchestrator;
