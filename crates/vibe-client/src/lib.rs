//! # vibe-client
//!
//! Sends prompts to the generation service and extracts the source text
//! from its answer.
//!
//! ```text
//! prompt ──► HttpGenerationClient ──POST──► /v1/chat/completions
//!                    │
//!                    ▼
//!        choices[0].message.content ──► extract_code_block ──► source
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod extract;
pub mod http;
mod traits;

pub use error::{GenerationError, GenerationResult};
pub use extract::extract_code_block;
pub use http::{HttpClientConfig, HttpGenerationClient};
pub use traits::CodeGenerator;
