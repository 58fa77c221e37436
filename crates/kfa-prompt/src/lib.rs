//! Deterministic layered prompt assembly.
//!
//! The outbound prompt is built from four layers in a fixed order:
//! system persona, category task template, video context, output contract.

pub mod assembler;
pub mod template;

pub use assembler::{PromptAssembler, OUTPUT_FORMAT_PROMPT, SYSTEM_PROMPT};
pub use template::{PromptTemplate, TemplateError, TemplateStore, TemplateVariable};
