//! Built-in series functions
//!
//! Each module registers its names (aliases included) with a
//! [`FunctionRegistry`]; [`register_builtins`] wires them all up.

pub mod aggregate;
pub mod ewma;
pub mod filter_series;
pub mod group_by_node;
pub mod summarize;

use crate::error::Result;
use crate::query::registry::FunctionRegistry;

/// Register every built-in function
pub fn register_builtins(registry: &mut FunctionRegistry) -> Result<()> {
    aggregate::register(registry)?;
    summarize::register(registry)?;
    filter_series::register(registry)?;
    group_by_node::register(registry)?;
    ewma::register(registry)?;
    Ok(())
}
