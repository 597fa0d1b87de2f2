pub mod connections;
pub mod definition;
pub mod plan;
pub mod rule;
pub mod schema;
