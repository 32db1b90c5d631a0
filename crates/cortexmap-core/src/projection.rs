//! Projection of point-source activity onto mesh face corners.
//!
//! Every face corner `k` in `{0, 1, 2}` is processed as an independent slab:
//! the distance matrix held in memory is `(n_faces, n_sources)`, never
//! `(n_faces, 3, n_sources)`.

use serde::{Deserialize, Serialize};

use crate::config::{ProjectionConfig, SourceConfig};
use crate::error::{check_len, Error, Result};
use crate::geometry::{x_sign, Vec3};
use crate::mesh::{Face, FaceCorners};
use crate::range::ValueRange;
use crate::sources::{SourceSet, SourceSubset};
use crate::spatial::SourceIndex;

/// Which projection to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectOn {
    /// Distance-weighted average of source values.
    #[default]
    Modulation,
    /// Number of sources reaching each corner.
    Repartition,
}

/// Target range of the modulation after projection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rescale {
    /// Data range of the sources that reach at least one corner.
    #[default]
    CoveredData,
    /// A caller supplied range, e.g. `[0, 1]`.
    Range(ValueRange),
    /// Keep raw modulation values.
    Identity,
}

/// A face-indexed `(n_faces, 3)` field with one validity flag per entry.
///
/// An invalid entry is a corner that no source reaches. Its value is the
/// floor (`0`), never NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceField<T> {
    pub values: Vec<[T; 3]>,
    pub valid: Vec<[bool; 3]>,
}

impl<T: Copy + Default> FaceField<T> {
    fn zeros(n_faces: usize) -> Self {
        Self {
            values: vec![[T::default(); 3]; n_faces],
            valid: vec![[false; 3]; n_faces],
        }
    }

    pub fn face_count(&self) -> usize {
        self.values.len()
    }

    /// Value at a corner, `None` when no source reaches it.
    pub fn get(&self, face: usize, corner: usize) -> Option<T> {
        self.valid[face][corner].then(|| self.values[face][corner])
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().flatten().filter(|v| **v).count()
    }
}

impl FaceField<u32> {
    pub fn to_f32(&self) -> FaceField<f32> {
        FaceField {
            values: self
                .values
                .iter()
                .map(|c| [c[0] as f32, c[1] as f32, c[2] as f32])
                .collect(),
            valid: self.valid.clone(),
        }
    }
}

/// Scalar values for a subset of mesh vertices, ready for an overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexValues {
    pub indices: Vec<usize>,
    pub values: Vec<f32>,
}

impl FaceField<f32> {
    /// Scatter valid corner values onto the vertices of `faces`.
    ///
    /// A vertex shared by several faces takes the mean of its valid corners.
    /// Vertices without any valid corner are left out.
    pub fn to_vertex_values(&self, faces: &[Face], n_vertices: usize) -> Result<VertexValues> {
        check_len("face field", faces.len(), self.values.len())?;
        check_len("face field validity", faces.len(), self.valid.len())?;
        let mut sum = vec![0.0f64; n_vertices];
        let mut count = vec![0u32; n_vertices];
        for (f, face) in faces.iter().enumerate() {
            for k in 0..3 {
                let v = face[k] as usize;
                if v >= n_vertices {
                    return Err(Error::IndexOutOfBounds {
                        what: "mesh vertices",
                        index: v,
                        len: n_vertices,
                    });
                }
                if self.valid[f][k] {
                    sum[v] += self.values[f][k] as f64;
                    count[v] += 1;
                }
            }
        }
        let indices: Vec<usize> = (0..n_vertices).filter(|&v| count[v] > 0).collect();
        let values = indices
            .iter()
            .map(|&v| (sum[v] / count[v] as f64) as f32)
            .collect();
        Ok(VertexValues { indices, values })
    }
}

/// Result of [`Projector::project`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    Modulation(FaceField<f32>),
    Repartition(FaceField<u32>),
}

impl Projection {
    pub fn as_f32(&self) -> FaceField<f32> {
        match self {
            Projection::Modulation(field) => field.clone(),
            Projection::Repartition(field) => field.to_f32(),
        }
    }
}

/// Reshape a flat `(n_faces * 9)` buffer into face corners.
pub fn corners_from_flat(flat: &[f32]) -> Result<Vec<FaceCorners>> {
    if flat.len() % 9 != 0 {
        return Err(Error::LengthMismatch {
            what: "face vertices (n_faces, 3, 3)",
            expected: flat.len() / 9 * 9 + 9,
            found: flat.len(),
        });
    }
    Ok(flat
        .chunks_exact(9)
        .map(|c| {
            [
                Vec3::new(c[0], c[1], c[2]),
                Vec3::new(c[3], c[4], c[5]),
                Vec3::new(c[6], c[7], c[8]),
            ]
        })
        .collect())
}

/// Stateless projection engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    radius: f32,
    contribute: bool,
    rescale: Rescale,
}

/// Distances from one corner slab to every source.
struct CornerSlab {
    /// Row-major `(n_faces, n_sources)`.
    distances: Vec<f32>,
    max: f32,
}

impl Projector {
    pub fn new(radius: f32, contribute: bool) -> Result<Self> {
        if !(radius > 0.0) {
            return Err(Error::NonPositiveRadius(radius));
        }
        Ok(Self {
            radius,
            contribute,
            rescale: Rescale::default(),
        })
    }

    pub fn from_config(config: &ProjectionConfig) -> Result<Self> {
        Ok(Self::new(config.radius, config.contribute)?.with_rescale(config.rescale))
    }

    pub fn with_rescale(mut self, rescale: Rescale) -> Self {
        self.rescale = rescale;
        self
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn contribute(&self) -> bool {
        self.contribute
    }

    pub fn project(
        &self,
        sources: &SourceSet,
        corners: &[FaceCorners],
        on: ProjectOn,
    ) -> Result<Projection> {
        Ok(match on {
            ProjectOn::Modulation => Projection::Modulation(self.modulation(sources, corners)?),
            ProjectOn::Repartition => Projection::Repartition(self.repartition(sources, corners)?),
        })
    }

    /// [`Self::project`] with the projection kind chosen by the source
    /// display settings.
    pub fn project_sources(
        &self,
        sources: &SourceSet,
        corners: &[FaceCorners],
        config: &SourceConfig,
    ) -> Result<Projection> {
        self.project(sources, corners, config.project_on)
    }

    /// Distance-weighted activity of the active sources at every corner.
    pub fn modulation(&self, sources: &SourceSet, corners: &[FaceCorners]) -> Result<FaceField<f32>> {
        let active = active_sources(sources)?;
        check_corners(corners)?;
        let n_faces = corners.len();
        let ns = active.len();
        let source_signs: Vec<i8> = active.positions.iter().map(|p| x_sign(p.x)).collect();

        let mut field = FaceField::<f32>::zeros(n_faces);
        let mut covered = vec![false; ns];

        for k in 0..3 {
            let slab = corner_slab(corners, k, &active.positions);
            let inv_max = if slab.max > 0.0 { 1.0 / slab.max } else { 0.0 };
            for f in 0..n_faces {
                let corner_sign = x_sign(corners[f][k].x);
                let row = &slab.distances[f * ns..(f + 1) * ns];
                let mut weighted = 0.0f32;
                let mut contributors = 0u32;
                for (s, &d) in row.iter().enumerate() {
                    if !self.includes(d, corner_sign, source_signs[s]) {
                        continue;
                    }
                    weighted += (1.0 - d * inv_max) * active.data[s];
                    contributors += 1;
                    covered[s] = true;
                }
                field.values[f][k] = weighted / contributors.max(1) as f32;
                field.valid[f][k] = contributors > 0;
            }
        }

        let covered_range = ValueRange::spanning(
            covered
                .iter()
                .zip(&active.data)
                .filter(|(c, _)| **c)
                .map(|(_, &v)| v),
        );
        self.rescale_field(&mut field, covered_range);

        log::debug!(
            "Modulation: {} faces, {} active sources, {} covered corners",
            n_faces,
            ns,
            field.valid_count()
        );
        Ok(field)
    }

    /// Number of active sources reaching every corner.
    pub fn repartition(&self, sources: &SourceSet, corners: &[FaceCorners]) -> Result<FaceField<u32>> {
        let active = active_sources(sources)?;
        check_corners(corners)?;
        let n_faces = corners.len();
        let ns = active.len();
        let source_signs: Vec<i8> = active.positions.iter().map(|p| x_sign(p.x)).collect();

        let mut field = FaceField::<u32>::zeros(n_faces);
        for k in 0..3 {
            let slab = corner_slab(corners, k, &active.positions);
            for f in 0..n_faces {
                let corner_sign = x_sign(corners[f][k].x);
                let row = &slab.distances[f * ns..(f + 1) * ns];
                let count = row
                    .iter()
                    .zip(&source_signs)
                    .filter(|&(&d, &s)| self.includes(d, corner_sign, s))
                    .count() as u32;
                field.values[f][k] = count;
                field.valid[f][k] = count > 0;
            }
        }

        log::debug!(
            "Repartition: {} faces, {} active sources, {} covered corners",
            n_faces,
            ns,
            field.valid_count()
        );
        Ok(field)
    }

    /// Corners reached by at least one excluded source.
    ///
    /// Hemisphere filtering does not apply here. Without any excluded source
    /// every corner is reported as uncovered.
    pub fn masked_coverage(&self, sources: &SourceSet, corners: &[FaceCorners]) -> Result<Vec<[bool; 3]>> {
        check_corners(corners)?;
        let excluded = sources.excluded();
        let index = SourceIndex::build(&excluded.positions);
        Ok(corners
            .iter()
            .map(|c| {
                [
                    index.any_within(&c[0], self.radius),
                    index.any_within(&c[1], self.radius),
                    index.any_within(&c[2], self.radius),
                ]
            })
            .collect())
    }

    fn includes(&self, distance: f32, corner_sign: i8, source_sign: i8) -> bool {
        if distance > self.radius {
            return false;
        }
        self.contribute || corner_sign == 0 || source_sign == 0 || corner_sign == source_sign
    }

    fn rescale_field(&self, field: &mut FaceField<f32>, covered: Option<ValueRange>) {
        let target = match (self.rescale, covered) {
            (Rescale::Identity, _) | (_, None) => return,
            (Rescale::CoveredData, Some(range)) => range,
            (Rescale::Range(range), Some(_)) => range,
        };
        let valid_values = field
            .values
            .iter()
            .zip(&field.valid)
            .flat_map(|(v, ok)| (0..3).filter(move |&k| ok[k]).map(move |k| v[k]));
        let Some(current) = ValueRange::spanning(valid_values) else {
            return;
        };
        for (values, valid) in field.values.iter_mut().zip(&field.valid) {
            for k in 0..3 {
                if valid[k] {
                    values[k] = current.rescale(values[k], &target);
                }
            }
        }
    }
}

fn active_sources(sources: &SourceSet) -> Result<SourceSubset> {
    let active = sources.active();
    if active.is_empty() {
        return Err(Error::NoActiveSources);
    }
    Ok(active)
}

fn check_corners(corners: &[FaceCorners]) -> Result<()> {
    if corners.iter().flatten().all(Vec3::is_finite) {
        Ok(())
    } else {
        Err(Error::NonFinite("face vertices"))
    }
}

fn corner_slab(corners: &[FaceCorners], k: usize, positions: &[Vec3]) -> CornerSlab {
    let mut distances = Vec::with_capacity(corners.len() * positions.len());
    let mut max = 0.0f32;
    for face in corners {
        for p in positions {
            let d = face[k].distance_to(p);
            max = max.max(d);
            distances.push(d);
        }
    }
    CornerSlab { distances, max }
}
