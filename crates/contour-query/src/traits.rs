//! Query engine traits

use crate::ast::Compiled;
use crate::engine::Response;
use contour_core::{Graph, Query};

pub use crate::error::{QueryError, QueryResult as Result};

/// Trait for query back ends
pub trait QueryEngine: Send + Sync {
    /// Compile a query without running it
    fn compile(&self, query: &Query) -> Result<Compiled>;

    /// Run a query against a consistent graph snapshot
    fn execute(&self, query: &Query, graph: &dyn Graph) -> Result<Response>;

    /// Render the compiled query as text, when the engine has a textual form
    fn explain(&self, query: &Query) -> Result<String> {
        Ok(format!("{:#?}", self.compile(query)?))
    }
}
