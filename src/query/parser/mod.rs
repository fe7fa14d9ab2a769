//! Target Parser Module
//!
//! The evaluator consumes parsing through the [`ExprParser`] trait; GroupByNode
//! uses it to synthesize sub-expressions at run time. [`TargetParser`] is the
//! built-in implementation for Graphite target syntax.
//!
//! # Example
//!
//! ```rust
//! use kuba_graphite::query::parser::{parse_target, ExprParser, TargetParser};
//!
//! let expr = parse_target("averageSeries(servers.*.cpu)");
//! assert!(expr.is_ok());
//!
//! let expr = TargetParser.parse("summarize(a.b, '1h', 'max')");
//! assert!(expr.is_ok());
//! ```

pub mod interval;
pub mod target;

pub use interval::parse_interval;
pub use target::parse_target;

use crate::error::Result;
use crate::query::ast::Expr;

/// Turns target text into an expression tree
pub trait ExprParser: Send + Sync {
    /// Parse `text`, reporting `Error::Parse` on malformed input
    fn parse(&self, text: &str) -> Result<Expr>;
}

/// Built-in Graphite target parser
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetParser;

impl ExprParser for TargetParser {
    fn parse(&self, text: &str) -> Result<Expr> {
        parse_target(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_object_parses() {
        let parser: Box<dyn ExprParser> = Box::new(TargetParser);
        assert!(parser.parse("sumSeries(a.b)").is_ok());
        assert!(parser.parse("sumSeries(").is_err());
    }
}
