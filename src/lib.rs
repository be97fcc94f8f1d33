//! cutdata - machining parameter evaluator for tool steels
//!
//! A catalog of tool steel records (base alloy plus heat-treatment overlay)
//! and the empirical models evaluated against it:
//! Kienzle cutting force, Johnson-Cook flow stress, extended Taylor tool life
//! and per-operation speed/feed recommendations. Job scripts batch several
//! queries in a small line-oriented language.

pub mod ast;
pub mod catalog;
pub mod config;
pub mod handbook;
pub mod lexer;
pub mod parser;
pub mod report;

pub use catalog::{Catalog, CatalogError, MaterialRecord, Operation};
pub use config::{ConfigError, EvaluatorConfig};
pub use handbook::{EvalError, Evaluated, Handbook, ModelWarning, Recommendation};
pub use parser::{parse_script, ParseError};
pub use report::{run_script, ScriptReport};
