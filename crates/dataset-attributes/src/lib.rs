//! Declared configuration attributes.
//!
//! Each configurable type declares a [`Schema`] (names plus defaults) once,
//! through the [`Attributes`] trait. Instances are configured by filtering an
//! arbitrary [`AttributeMap`] through that schema: unknown keys are dropped,
//! missing ones take their defaults, and the resulting [`Configuration`]
//! always has exactly the schema's keys.

mod configuration;
pub mod error;
mod schema;

pub use configuration::{value_to_string, AttributeMap, Configuration};
pub use error::{AttributeError, Result};
pub use schema::{Attributes, Field, Schema};
