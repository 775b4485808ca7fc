//! Process configuration namespace.
//!
//! Layered, read-only property sources (command line, resolved secrets,
//! environment variables, static `application*` files) queried first-wins.

mod defaults;
mod environment;
mod io;
pub mod properties;
mod types;

pub use defaults::*;
pub use environment::*;
pub use io::*;
pub use properties::{parse_properties, parse_properties_bytes, PropertiesError};
pub use types::*;
