//! Query descriptors
//!
//! A query pairs a shape with the kind of read to perform. The shape carries
//! both the projection and the filter, told apart by `mode` guards.

use crate::edge::{Edge, Path};
use crate::shape::Shape;
use serde::{Deserialize, Serialize};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    #[default]
    Increasing,
    Decreasing,
}

/// Sorting criterion; an empty path sorts by the root value itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub path: Path,

    #[serde(default)]
    pub sort: Sort,
}

impl Order {
    pub fn increasing(path: impl IntoIterator<Item = Edge>) -> Self {
        Self {
            path: path.into_iter().collect(),
            sort: Sort::Increasing,
        }
    }

    pub fn decreasing(path: impl IntoIterator<Item = Edge>) -> Self {
        Self {
            path: path.into_iter().collect(),
            sort: Sort::Decreasing,
        }
    }

    pub fn is_decreasing(&self) -> bool {
        self.sort == Sort::Decreasing
    }
}

/// Read request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Query {
    /// Paginated resource listing with the projected description of each resource
    Edges {
        shape: Shape,

        #[serde(default)]
        orders: Vec<Order>,

        #[serde(default)]
        offset: usize,

        /// Maximum number of resources; 0 for no limit
        #[serde(default)]
        limit: usize,
    },

    /// Count, min and max of the values reached by `path`
    Stats {
        shape: Shape,

        #[serde(default)]
        path: Path,
    },

    /// Distinct values reached by `path` with occurrence counts
    Items {
        shape: Shape,

        #[serde(default)]
        path: Path,
    },
}

impl Query {
    pub fn edges(shape: Shape) -> Self {
        Self::Edges {
            shape,
            orders: Vec::new(),
            offset: 0,
            limit: 0,
        }
    }

    pub fn stats(shape: Shape, path: impl IntoIterator<Item = Edge>) -> Self {
        Self::Stats {
            shape,
            path: path.into_iter().collect(),
        }
    }

    pub fn items(shape: Shape, path: impl IntoIterator<Item = Edge>) -> Self {
        Self::Items {
            shape,
            path: path.into_iter().collect(),
        }
    }

    /// Add a sorting criterion to an edges query; later criteria break ties
    pub fn with_order(mut self, order: Order) -> Self {
        if let Self::Edges { orders, .. } = &mut self {
            orders.push(order);
        }
        self
    }

    pub fn with_offset(mut self, value: usize) -> Self {
        if let Self::Edges { offset, .. } = &mut self {
            *offset = value;
        }
        self
    }

    pub fn with_limit(mut self, value: usize) -> Self {
        if let Self::Edges { limit, .. } = &mut self {
            *limit = value;
        }
        self
    }

    pub fn shape(&self) -> &Shape {
        match self {
            Self::Edges { shape, .. } | Self::Stats { shape, .. } | Self::Items { shape, .. } => shape,
        }
    }

    pub fn is_paged(&self) -> bool {
        matches!(self, Self::Edges { offset, limit, .. } if *offset > 0 || *limit > 0)
    }
}
