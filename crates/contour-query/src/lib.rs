//! Contour Query - Shape-driven query compiler and evaluator
//!
//! Compiles edges, stats and items queries into a graph-pattern algebra,
//! renders them as SPARQL and evaluates them over any [`contour_core::Graph`].

pub mod ast;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod eval;
pub mod sparql;
pub mod traits;

pub use ast::{Compiled, Kind};
pub use compiler::{compile, prune, Compiler, CompilerOptions};
pub use engine::{EdgesReport, GraphEngine, Item, ItemsReport, Resource, Response, StatsReport, TypeStats};
pub use error::{QueryError, QueryResult};
pub use eval::{Binding, Evaluator};
pub use sparql::render;
pub use traits::QueryEngine;
