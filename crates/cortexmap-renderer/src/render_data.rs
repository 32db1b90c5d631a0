use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cortexmap_core::{Hemisphere, Rgba};

use crate::lighting::FrameUniforms;

/// WGSL source of the surface pipeline.
pub const SURFACE_SHADER: &str = include_str!("shaders/surface.wgsl");

/// One write into GPU memory, consumed by the frontend WebGPU canvas.
///
/// Overlay tables are slot-major: entry `slot * n_vertices + vertex`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GpuUpload {
    /// Flat `[x0, y0, z0, x1, ...]` vertex positions.
    Positions { data: Vec<f32> },
    /// Flat per-vertex normals.
    Normals { data: Vec<f32> },
    /// Background table rows for vertices `start..start + data.len()`.
    BackgroundClasses { start: usize, data: Vec<u32> },
    /// The 3-row background color table.
    BackgroundTable { rgba: [[f32; 4]; 3] },
    /// Full coordinate and weight tables (re)allocated with `n_slots` columns.
    OverlayTables {
        n_slots: usize,
        coords: Vec<f32>,
        alphas: Vec<f32>,
    },
    /// Partial write of one slot column, vertices `start..start + coords.len()`.
    OverlayColumn {
        slot: usize,
        start: usize,
        coords: Vec<f32>,
        alphas: Vec<f32>,
    },
    /// One LUT row of the overlay texture.
    OverlayLut { slot: usize, rgba: Vec<[f32; 4]> },
    /// Whole overlay texture (re)allocated with `n_slots` rows.
    OverlayLutTexture { n_slots: usize, rgba: Vec<[f32; 4]> },
    /// Number of slots the vertex stage loops over. Slot `i` reads texture
    /// row `i`, so `count <= n_slots` always holds.
    OverlayCount { count: usize, n_slots: usize },
    /// Triangle index buffer for the current hemisphere.
    Index { data: Vec<u32> },
    BlendState { depth_test: bool, alpha: f32 },
}

impl GpuUpload {
    pub fn kind(&self) -> &'static str {
        match self {
            GpuUpload::Positions { .. } => "positions",
            GpuUpload::Normals { .. } => "normals",
            GpuUpload::BackgroundClasses { .. } => "background_classes",
            GpuUpload::BackgroundTable { .. } => "background_table",
            GpuUpload::OverlayTables { .. } => "overlay_tables",
            GpuUpload::OverlayColumn { .. } => "overlay_column",
            GpuUpload::OverlayLut { .. } => "overlay_lut",
            GpuUpload::OverlayLutTexture { .. } => "overlay_lut_texture",
            GpuUpload::OverlayCount { .. } => "overlay_count",
            GpuUpload::Index { .. } => "index",
            GpuUpload::BlendState { .. } => "blend_state",
        }
    }
}

/// Uploads drained from one surface renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadBatch {
    pub surface: Uuid,
    pub uploads: Vec<GpuUpload>,
}

impl UploadBatch {
    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Complete state snapshot of a surface, sent from Rust to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderFrame {
    pub surface: Uuid,
    pub hemisphere: Hemisphere,
    pub translucent: bool,
    pub depth_test: bool,
    pub n_triangles: usize,
    pub n_overlays: usize,
    /// Composited per-vertex colors before lighting.
    pub colors: Vec<Rgba>,
    pub uniforms: FrameUniforms,
}

impl RenderFrame {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub(crate) fn flatten_rgba(colors: &[Rgba]) -> Vec<[f32; 4]> {
    colors.iter().map(Rgba::to_array).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_json_is_tagged() {
        let upload = GpuUpload::BlendState {
            depth_test: false,
            alpha: 0.1,
        };
        let json = serde_json::to_value(&upload).unwrap();
        assert_eq!(json["kind"], "blend_state");
        assert_eq!(json["depth_test"], false);
        assert_eq!(upload.kind(), "blend_state");
    }

    #[test]
    fn test_batch_roundtrip() {
        let batch = UploadBatch {
            surface: Uuid::new_v4(),
            uploads: vec![GpuUpload::Index { data: vec![0, 1, 2] }],
        };
        let json = batch.to_json().unwrap();
        let back: UploadBatch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, batch);
    }

    #[test]
    fn test_shader_declares_both_stages() {
        assert!(SURFACE_SHADER.contains("@vertex"));
        assert!(SURFACE_SHADER.contains("@fragment"));
    }

    #[test]
    fn test_shader_reads_lut_row_by_slot() {
        assert!(SURFACE_SHADER.contains("textureLoad(overlay_lut, vec2<i32>(texel, i32(i)), 0)"));
        assert!(!SURFACE_SHADER.contains("textureSample"));
    }
}
