//! Cache key derivation from call arguments

pub mod args;
pub mod expander;
pub mod hash;
pub mod parser;

pub use args::{Argument, CallArguments, ForceRefresh};
pub use expander::KeyExpander;
pub use hash::{canonical_json, content_hash};
