//! Testing utilities for symbol reading
//!
//! - **ImageBuilder**: writes small but structurally real managed
//!   assemblies with Portable PDBs (standalone or embedded)
//! - **encode_sequence_points**: encodes sequence point blobs
//!
//! # Example
//!
//! ```ignore
//! use testbridge_symbols::testing::{Base, ImageBuilder, Point};
//!
//! let mut builder = ImageBuilder::new();
//! let doc = builder.document("/src/Tests/CalculatorTests.cs");
//! let fixture = builder.add_type("Acme.Tests", "CalculatorTests", Base::Object);
//! builder.add_method(fixture, "Adds", doc, &[Point::Hidden, Point::line(14, 9)]);
//! let image = builder.build()?;
//! image.write_to(dir.path(), "Acme.Tests")?;
//! ```

mod encode;
mod image;
mod sequence_points;

pub use image::{Base, BuiltImage, ImageBuilder, TypeHandle};
pub use sequence_points::{encode_sequence_points, Point};
