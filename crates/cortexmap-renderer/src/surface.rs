//! GPU-resident state of one surface mesh.
//!
//! [`SurfaceRenderer`] is the only writer of GPU memory. Every mutation
//! updates the CPU mirror and queues the smallest [`GpuUpload`] that brings
//! the GPU copy back in sync; the frontend drains them with
//! [`SurfaceRenderer::take_uploads`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cortexmap_core::error::{check_len, Error, Result};
use cortexmap_core::{Hemisphere, Mesh, Rgba};

use crate::background::Background;
use crate::colormap::{Colormap, ColormapParams};
use crate::lighting::{shade, CameraTransform, FrameUniforms, LightingParams};
use crate::overlay::{OverlayChange, OverlayStore, VertexSelection, DEFAULT_CAPACITY};
use crate::render_data::{flatten_rgba, GpuUpload, RenderFrame, UploadBatch};

/// Alpha ceiling in translucent mode.
pub const TRANSLUCENT_ALPHA: f32 = 0.1;

/// Initial settings of a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub hemisphere: Hemisphere,
    pub alpha: f32,
    /// See-through mode: low alpha and no depth test.
    pub translucent: bool,
    pub default_color: String,
    pub mask_color: String,
    pub sulcus_color: String,
    /// Maximum number of overlay slots (at least 2).
    pub overlay_capacity: usize,
    pub invert_normals: bool,
    pub lighting: LightingParams,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            hemisphere: Hemisphere::Both,
            alpha: 1.0,
            translucent: false,
            default_color: "white".to_string(),
            mask_color: "orange".to_string(),
            sulcus_color: "#666666".to_string(),
            overlay_capacity: DEFAULT_CAPACITY,
            invert_normals: false,
            lighting: LightingParams::default(),
        }
    }
}

pub struct SurfaceRenderer {
    id: Uuid,
    mesh: Mesh,
    hemisphere: Hemisphere,
    translucent: bool,
    alpha: f32,
    lighting: LightingParams,
    background: Background,
    overlays: OverlayStore,
    index: Vec<u32>,
    pending: Vec<GpuUpload>,
}

impl SurfaceRenderer {
    /// Build the renderer state and queue the full initial upload.
    pub fn new(mut mesh: Mesh, config: &SurfaceConfig) -> Result<Self> {
        let overlays = OverlayStore::new(mesh.vertex_count(), config.overlay_capacity)?;
        let background = Background::new(
            mesh.vertex_count(),
            Rgba::parse(&config.default_color)?,
            Rgba::parse(&config.mask_color)?,
            Rgba::parse(&config.sulcus_color)?,
        );
        if config.invert_normals {
            mesh.invert_normals();
        }
        let index = mesh.index_buffer(config.hemisphere);

        let mut renderer = Self {
            id: Uuid::new_v4(),
            mesh,
            hemisphere: config.hemisphere,
            translucent: config.translucent,
            alpha: 1.0,
            lighting: config.lighting,
            background,
            overlays,
            index,
            pending: Vec::new(),
        };
        renderer.alpha = renderer.alpha_policy(config.alpha)?;
        renderer.queue_full_upload();
        log::info!(
            "Surface {} created: {} vertices, {} faces",
            renderer.id,
            renderer.mesh.vertex_count(),
            renderer.mesh.face_count()
        );
        Ok(renderer)
    }

    fn queue_full_upload(&mut self) {
        let flat = |points: &[cortexmap_core::Vec3]| -> Vec<f32> {
            points.iter().flat_map(|p| p.to_array()).collect()
        };
        self.pending.push(GpuUpload::Positions {
            data: flat(self.mesh.vertices()),
        });
        self.pending.push(GpuUpload::Normals {
            data: flat(self.mesh.normals()),
        });
        self.queue_background_table();
        self.pending.push(GpuUpload::BackgroundClasses {
            start: 0,
            data: self.background.rows(),
        });
        self.queue_overlay_tables();
        self.pending.push(GpuUpload::Index {
            data: self.index.clone(),
        });
        self.queue_blend_state();
    }

    fn queue_background_table(&mut self) {
        let t = self.background.table();
        self.pending.push(GpuUpload::BackgroundTable {
            rgba: [t[0].to_array(), t[1].to_array(), t[2].to_array()],
        });
    }

    /// Upload the class rows spanning `changed` (sorted).
    fn queue_background_span(&mut self, changed: &[usize]) {
        if let (Some(&start), Some(&end)) = (changed.first(), changed.last()) {
            let rows = self.background.rows();
            self.pending.push(GpuUpload::BackgroundClasses {
                start,
                data: rows[start..=end].to_vec(),
            });
        }
    }

    fn queue_overlay_tables(&mut self) {
        let n_slots = self.overlays.slot_count();
        self.pending.push(GpuUpload::OverlayTables {
            n_slots,
            coords: self.overlays.coords_table(),
            alphas: self.overlays.alphas_table(),
        });
        self.pending.push(GpuUpload::OverlayLutTexture {
            n_slots,
            rgba: self.overlays.lut_texture(),
        });
        self.pending.push(GpuUpload::OverlayCount {
            count: self.overlays.used(),
            n_slots,
        });
    }

    fn queue_blend_state(&mut self) {
        self.pending.push(GpuUpload::BlendState {
            depth_test: self.depth_test(),
            alpha: self.alpha,
        });
    }

    fn queue_lut(&mut self, slot: usize) {
        if let Some(lut) = self.overlays.lut(slot) {
            self.pending.push(GpuUpload::OverlayLut {
                slot,
                rgba: flatten_rgba(lut),
            });
        }
    }

    fn alpha_policy(&self, alpha: f32) -> Result<f32> {
        if !alpha.is_finite() {
            return Err(Error::NonFinite("surface alpha"));
        }
        Ok(if self.translucent {
            alpha.min(TRANSLUCENT_ALPHA)
        } else {
            1.0
        })
    }

    /// Restrict drawing to one hemisphere. Only the index buffer is rebuilt.
    pub fn set_hemisphere(&mut self, hemisphere: Hemisphere) {
        self.index = self.mesh.index_buffer(hemisphere);
        self.hemisphere = hemisphere;
        log::debug!(
            "Hemisphere set to {:?} ({} triangles)",
            hemisphere,
            self.index.len() / 3
        );
        self.pending.push(GpuUpload::Index {
            data: self.index.clone(),
        });
    }

    /// Set the global alpha. Translucent mode caps it at
    /// [`TRANSLUCENT_ALPHA`]; opaque mode always draws at 1.
    pub fn set_alpha(&mut self, alpha: f32) -> Result<()> {
        self.alpha = self.alpha_policy(alpha)?;
        self.queue_blend_state();
        Ok(())
    }

    /// Toggle see-through mode. Translucent surfaces are drawn without
    /// depth testing.
    pub fn set_translucent(&mut self, translucent: bool) {
        self.translucent = translucent;
        self.alpha = if translucent { TRANSLUCENT_ALPHA } else { 1.0 };
        log::info!("Surface {} translucent: {}", self.id, translucent);
        self.queue_blend_state();
    }

    pub fn set_mask_color(&mut self, color: Rgba) {
        self.background.set_mask_color(color);
        self.queue_background_table();
    }

    pub fn set_sulcus_color(&mut self, color: Rgba) {
        self.background.set_sulcus_color(color);
        self.queue_background_table();
    }

    /// Mark sulcus vertices (one flag per vertex).
    pub fn set_sulcus(&mut self, sulcus: &[bool]) -> Result<()> {
        let changed = self.background.mark_sulcus(sulcus)?;
        self.queue_background_span(&changed);
        Ok(())
    }

    /// Clear every sulcus and mask mark.
    pub fn reset_background(&mut self) {
        self.background.reset();
        self.pending.push(GpuUpload::BackgroundClasses {
            start: 0,
            data: self.background.rows(),
        });
    }

    /// Write an overlay and queue the uploads covering what changed.
    ///
    /// `mask_data` (one flag per vertex) paints the flagged vertices with
    /// the mask color underneath the overlays.
    pub fn add_overlay(
        &mut self,
        values: &[f32],
        selection: &VertexSelection,
        slot: Option<usize>,
        colormap: &dyn Colormap,
        params: &ColormapParams,
        mask_data: Option<&[bool]>,
    ) -> Result<OverlayChange> {
        if let Some(mask) = mask_data {
            check_len("mask data", self.mesh.vertex_count(), mask.len())?;
        }
        let used = self.overlays.used();
        let change = self
            .overlays
            .add_overlay(values, selection, slot, colormap, params)?;

        if change.grown {
            self.queue_overlay_tables();
        } else {
            if let (Some(&start), Some(&end)) = (change.vertices.first(), change.vertices.last()) {
                let coords = self.overlays.coords(change.slot).unwrap_or_default();
                let alphas = self.overlays.alphas(change.slot).unwrap_or_default();
                self.pending.push(GpuUpload::OverlayColumn {
                    slot: change.slot,
                    start,
                    coords: coords[start..=end].to_vec(),
                    alphas: alphas[start..=end].to_vec(),
                });
            }
            self.queue_lut(change.slot);
            if self.overlays.used() != used {
                self.pending.push(GpuUpload::OverlayCount {
                    count: self.overlays.used(),
                    n_slots: self.overlays.slot_count(),
                });
            }
        }

        if let Some(mask) = mask_data {
            let changed = self.background.mark_masked(mask)?;
            self.queue_background_span(&changed);
        }
        Ok(change)
    }

    /// Recolor one overlay from its recorded range. Only its LUT row is
    /// re-uploaded.
    pub fn update_colormap(
        &mut self,
        slot: Option<usize>,
        colormap: &dyn Colormap,
        params: &ColormapParams,
    ) -> Result<Option<usize>> {
        let updated = self.overlays.update_colormap(slot, colormap, params)?;
        if let Some(slot) = updated {
            self.queue_lut(slot);
        }
        Ok(updated)
    }

    /// Per-vertex colors after overlay compositing, before lighting.
    pub fn vertex_colors(&self) -> Vec<Rgba> {
        self.background
            .colors()
            .into_iter()
            .enumerate()
            .map(|(v, bg)| self.overlays.blend(v, bg))
            .collect()
    }

    /// Per-vertex colors with lighting applied.
    pub fn shade_vertices(&self, camera: &dyn CameraTransform) -> Vec<Rgba> {
        let uniforms = self.frame_uniforms(camera);
        self.vertex_colors()
            .into_iter()
            .zip(self.mesh.vertices().iter().zip(self.mesh.normals()))
            .map(|(color, (&p, &n))| shade(color, p, n, &uniforms))
            .collect()
    }

    pub fn frame_uniforms(&self, camera: &dyn CameraTransform) -> FrameUniforms {
        FrameUniforms::new(&self.lighting, camera, self.alpha)
    }

    /// Drain every upload queued since the last call.
    pub fn take_uploads(&mut self) -> UploadBatch {
        UploadBatch {
            surface: self.id,
            uploads: std::mem::take(&mut self.pending),
        }
    }

    pub fn frame(&self, camera: &dyn CameraTransform) -> RenderFrame {
        RenderFrame {
            surface: self.id,
            hemisphere: self.hemisphere,
            translucent: self.translucent,
            depth_test: self.depth_test(),
            n_triangles: self.index.len() / 3,
            n_overlays: self.overlays.used(),
            colors: self.vertex_colors(),
            uniforms: self.frame_uniforms(camera),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn translucent(&self) -> bool {
        self.translucent
    }

    pub fn depth_test(&self) -> bool {
        !self.translucent
    }

    pub fn index(&self) -> &[u32] {
        &self.index
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn overlays(&self) -> &OverlayStore {
        &self.overlays
    }

    pub fn lighting(&self) -> &LightingParams {
        &self.lighting
    }
}
