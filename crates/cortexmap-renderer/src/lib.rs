//! # CortexMap Renderer
//!
//! Overlay compositing and GPU-resident surface state.
//! Handles colormap lookup tables, overlay slots, background classes,
//! hemisphere index buffers and lighting.
//!
//! Nothing here talks to a graphics API directly: the renderer emits
//! JSON-serializable upload commands that the frontend WebGPU canvas
//! consumes, together with the WGSL shader in [`SURFACE_SHADER`].

pub mod background;
pub mod colormap;
pub mod lighting;
pub mod overlay;
pub mod render_data;
pub mod surface;

pub use background::{Background, BackgroundClass};
pub use colormap::{build_lut, BuiltinColormap, Colormap, ColormapParams, LUT_LEN};
pub use lighting::{CameraTransform, FrameUniforms, IdentityCamera, LightingParams};
pub use overlay::{OverlayChange, OverlayStore, VertexSelection};
pub use render_data::{GpuUpload, RenderFrame, UploadBatch, SURFACE_SHADER};
pub use surface::{SurfaceConfig, SurfaceRenderer};
