//! AI text-generation boundary.
//!
//! # Responsibility
//! - Define the provider contract (`TextProvider`) and its request/response
//!   shapes.
//! - Provide the HTTP provider implementation.
//! - Provide the stateless augmentation operations built on any provider.
//!
//! # Invariants
//! - No retries happen at this layer.
//! - Prompts, contents and API keys are never logged.

pub mod client;
pub mod gemini;
pub mod provider;
