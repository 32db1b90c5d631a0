//! # CortexMap Core
//!
//! Surface meshes, point sources (e.g. intracranial electrodes) and the
//! projection engine that turns radius-limited source activity into
//! per-face modulation and repartition fields.
//!
//! Everything here is pure computation; GPU state lives in
//! `cortexmap-renderer`.

pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod projection;
pub mod range;
pub mod sources;
pub mod spatial;

pub use color::{ColorInput, Rgba};
pub use config::{ProjectionConfig, SourceConfig};
pub use error::{Error, ErrorKind, Result};
pub use geometry::{BBox3, Vec3};
pub use mesh::{Face, FaceCorners, Hemisphere, Mesh};
pub use projection::{FaceField, ProjectOn, Projection, Projector, Rescale, VertexValues};
pub use range::ValueRange;
pub use sources::{SourceSet, SourceSubset};
