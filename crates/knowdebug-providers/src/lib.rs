//! knowdebug-providers: Question generator integrations.
//!
//! Implements the `QuestionGenerator` trait on top of Gemini and
//! OpenAI-compatible APIs, plus an offline mock, and loads the generator
//! configuration.

pub mod config;
pub mod gemini;
pub mod generator;
mod http;
pub mod mock;
pub mod openai;
pub mod prompts;

pub use config::{
    create_generator, load_config, load_config_from, resolve_generator, GeneratorConfig,
    KnowdebugConfig,
};
pub use generator::{JsonBackend, PromptedGenerator};
pub use knowdebug_core::GeneratorError;
pub use mock::MockGenerator;
