pub mod schema;

pub use schema::{Config, DemoConfig, SearchConfig};
