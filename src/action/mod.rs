//! The action language: spatial-call tokenizer, element references and
//! resolution of a parsed action into executable statements.
pub mod lexer;
pub mod reference;
pub mod resolver;

pub use reference::{ElementReference, ReferenceDialect};
pub use resolver::{ActionResolver, ResolvedAction};
