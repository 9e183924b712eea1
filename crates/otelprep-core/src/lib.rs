//! Structured document model for otelprep.
//!
//! Both the input configuration file and the collector documents otelprep
//! patches are loaded into a [`Document`]: an order-preserving tree of
//! scalars, sequences and mappings. Path accessors turn a missing scaffold key
//! into a [`DocumentError`] that names the whole path, and [`TargetFile`]
//! performs the read, rewind, write and truncate cycle used to update a
//! collector's file in place.
//!
//! # Example
//!
//! ```
//! use otelprep_core::{parse_str, Document, Format};
//!
//! let mut doc = parse_str(
//!     "exporters:\n  prometheusremotewrite:\n    headers: {}\n",
//!     Format::Yaml,
//!     "inline",
//! )
//! .unwrap();
//!
//! doc.set_path(
//!     &["exporters", "prometheusremotewrite", "headers", "Authorization"],
//!     "Bearer abc",
//! )
//! .unwrap();
//!
//! assert!(doc.set_path(&["receivers", "otlp", "endpoint"], "x").is_err());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod document;
mod error;
mod io;

pub use document::{Document, Mapping};
pub use error::DocumentError;
pub use io::{load, parse_str, read_text, render, write_text, Format, TargetFile};
