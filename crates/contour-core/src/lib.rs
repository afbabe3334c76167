//! Contour Core - Shape constraint engine
//!
//! This crate provides the shape constraint algebra, its optimizer and
//! redactor, the validator producing structured reports, and the query
//! descriptors compiled by `contour-query`.

pub mod alias;
pub mod codec;
pub mod edge;
pub mod error;
pub mod focus;
pub mod graph;
pub mod inspect;
pub mod limits;
pub mod optimizer;
pub mod pattern;
pub mod query;
pub mod redactor;
pub mod shape;
pub mod validator;
pub mod value;
pub mod vocab;

pub use edge::{Direction, Edge, Path};
pub use error::{Error, Result};
pub use focus::{Focus, Frame, Issue, Level};
pub use graph::{Graph, Model};
pub use optimizer::{optimize, Optimizer};
pub use query::{Order, Query, Sort};
pub use redactor::{redact, Context};
pub use shape::{Axis, Derivation, Field, Shape};
pub use validator::Validator;
pub use value::{Iri, Literal, Statement, Value};
