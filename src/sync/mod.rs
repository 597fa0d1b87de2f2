//! Declarative schema sync: rule strings in, DDL out.

pub mod applier;
pub mod ddl;
pub mod diff;
pub mod orchestrator;
pub mod rule_parser;
pub mod type_map;
pub mod validator;

pub use orchestrator::TableSync;
