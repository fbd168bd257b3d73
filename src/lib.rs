//! # bilz
//!
//! Bicriteria LZ77 compression: produce the smallest parsing of a text
//! whose estimated decompression time stays under a bound, or the
//! fastest one under a size bound.
//!
//! The engine couples a suffix-array-driven forward star generator
//! (streaming, per position, the maximal copy edges that dominate every
//! shorter alternative in their cost class) with a shortest-path
//! bit-optimal parser, and wraps both in a Lagrangian dual iteration
//! whose basis is turned into a feasible parsing by path swapping.
//!
//! ## Example
//!
//! ```rust
//! let data = b"mississippibananamississippi";
//! let compressed = bilz::compress("soda09", data).unwrap();
//! let restored = bilz::decompress(&compressed).unwrap();
//! assert_eq!(restored, data);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod bicriteria;
pub mod bits;
pub mod decompress;
pub mod encoders;
pub mod error;
pub mod fsg;
pub mod integrator;
pub mod meter;
pub mod model;
pub mod parser;
pub mod parsing;
pub mod suffix;
pub mod swapper;
pub mod text;

pub use api::{compress, compress_buffer, decompress, decompress_buffer};
pub use error::{Error, Result};
pub use model::{CostModel, Edge};
pub use text::Text;
