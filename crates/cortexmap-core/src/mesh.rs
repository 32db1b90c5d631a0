use serde::{Deserialize, Serialize};

use crate::error::{check_len, Error, Result};
use crate::geometry::{BBox3, Vec3};

/// Three vertex indices of a triangular face.
pub type Face = [u32; 3];

/// Corner positions of one face, indexed like its [`Face`].
pub type FaceCorners = [Vec3; 3];

/// Hemisphere selection for display filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    #[default]
    Both,
    Left,
    Right,
}

/// Camera placement that frames the whole mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraFit {
    pub center: Vec3,
    pub scale_factor: Vec3,
}

/// A validated triangulated surface.
///
/// Every face index is within vertex bounds and there is one normal per
/// vertex. Each vertex carries a left/right hemisphere bit that is inferred
/// from its x coordinate unless overridden with [`Mesh::with_hemisphere`].
#[derive(Debug, Clone, Serialize)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    faces: Vec<Face>,
    normals: Vec<Vec3>,
    /// `true` for left-hemisphere vertices.
    left: Vec<bool>,
    /// `true` for faces whose first vertex is in the left hemisphere.
    face_left: Vec<bool>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vec3>, faces: Vec<Face>, normals: Vec<Vec3>) -> Result<Self> {
        check_len("normals", vertices.len(), normals.len())?;
        if !vertices.iter().all(Vec3::is_finite) {
            return Err(Error::NonFinite("mesh vertices"));
        }
        let n = vertices.len();
        for face in &faces {
            for &index in face {
                if index as usize >= n {
                    return Err(Error::IndexOutOfBounds {
                        what: "mesh vertices",
                        index: index as usize,
                        len: n,
                    });
                }
            }
        }

        let left = infer_left(&vertices);
        log::debug!("Left/right hemispheres inferred from {} vertices", n);
        let face_left = face_membership(&faces, &left);
        Ok(Self {
            vertices,
            faces,
            normals,
            left,
            face_left,
        })
    }

    /// Override the inferred hemisphere bits (`true` = left).
    pub fn with_hemisphere(mut self, left: Vec<bool>) -> Result<Self> {
        check_len("hemisphere index", self.vertices.len(), left.len())?;
        self.face_left = face_membership(&self.faces, &left);
        self.left = left;
        Ok(self)
    }

    /// Flip every normal. Useful for meshes exported with inward normals.
    pub fn invert_normals(&mut self) {
        for n in &mut self.normals {
            *n = n.scale(-1.0);
        }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_left(&self, vertex: usize) -> bool {
        self.left[vertex]
    }

    pub fn face_is_left(&self, face: usize) -> bool {
        self.face_left[face]
    }

    /// Corner positions of every face, shaped `(n_faces, 3, 3)`.
    pub fn face_corners(&self) -> Vec<FaceCorners> {
        self.faces
            .iter()
            .map(|f| {
                [
                    self.vertices[f[0] as usize],
                    self.vertices[f[1] as usize],
                    self.vertices[f[2] as usize],
                ]
            })
            .collect()
    }

    /// Flattened triangle index buffer for the selected hemisphere.
    pub fn index_buffer(&self, hemisphere: Hemisphere) -> Vec<u32> {
        self.faces
            .iter()
            .zip(&self.face_left)
            .filter(|&(_, &left)| match hemisphere {
                Hemisphere::Both => true,
                Hemisphere::Left => left,
                Hemisphere::Right => !left,
            })
            .flat_map(|(face, _)| face.iter().copied())
            .collect()
    }

    pub fn bbox(&self) -> Option<BBox3> {
        BBox3::from_points(&self.vertices)
    }

    pub fn camera_fit(&self) -> Option<CameraFit> {
        let fit = self.bbox().map(|bb| CameraFit {
            center: bb.center(),
            scale_factor: bb.extent(),
        });
        log::debug!("Optimal camera state: {:?}", fit);
        fit
    }
}

fn infer_left(vertices: &[Vec3]) -> Vec<bool> {
    if vertices.is_empty() {
        return Vec::new();
    }
    let mean = vertices.iter().map(|v| v.x as f64).sum::<f64>() / vertices.len() as f64;
    vertices.iter().map(|v| (v.x as f64) <= mean).collect()
}

fn face_membership(faces: &[Face], left: &[bool]) -> Vec<bool> {
    faces.iter().map(|f| left[f[0] as usize]).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two triangles on each side of x = 0.
    pub(crate) fn two_sided_mesh() -> Mesh {
        let vertices = vec![
            Vec3::new(-10.0, 0.0, 0.0),
            Vec3::new(-10.0, 1.0, 0.0),
            Vec3::new(-9.0, 0.0, 0.0),
            Vec3::new(-9.0, 1.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 1.0, 0.0),
            Vec3::new(9.0, 0.0, 0.0),
            Vec3::new(9.0, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [1, 3, 2], [4, 5, 6], [5, 7, 6]];
        let normals = vec![Vec3::new(0.0, 0.0, 1.0); 8];
        Mesh::new(vertices, faces, normals).unwrap()
    }

    #[test]
    fn test_mesh_rejects_bad_face_index() {
        let err = Mesh::new(
            vec![Vec3::ZERO; 3],
            vec![[0, 1, 3]],
            vec![Vec3::new(0.0, 0.0, 1.0); 3],
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::IndexOutOfBounds {
                what: "mesh vertices",
                index: 3,
                len: 3
            }
        );
    }

    #[test]
    fn test_mesh_rejects_normal_mismatch() {
        let err = Mesh::new(vec![Vec3::ZERO; 3], vec![[0, 1, 2]], vec![]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_hemisphere_inferred_from_mean() {
        let mesh = two_sided_mesh();
        assert!(mesh.is_left(0));
        assert!(!mesh.is_left(4));
        assert!(mesh.face_is_left(0));
        assert!(!mesh.face_is_left(3));
    }

    #[test]
    fn test_hemisphere_override() {
        let mesh = two_sided_mesh().with_hemisphere(vec![false; 8]).unwrap();
        assert!(!mesh.face_is_left(0));
        assert!(two_sided_mesh().with_hemisphere(vec![true; 2]).is_err());
    }

    #[test]
    fn test_index_buffer_partition() {
        let mesh = two_sided_mesh();
        let both = mesh.index_buffer(Hemisphere::Both);
        let left = mesh.index_buffer(Hemisphere::Left);
        let right = mesh.index_buffer(Hemisphere::Right);
        assert_eq!(both.len(), 12);
        assert_eq!(left, vec![0, 1, 2, 1, 3, 2]);
        assert_eq!(right, vec![4, 5, 6, 5, 7, 6]);
    }

    #[test]
    fn test_face_corners_and_camera() {
        let mesh = two_sided_mesh();
        let corners = mesh.face_corners();
        assert_eq!(corners.len(), 4);
        assert_eq!(corners[2][0], Vec3::new(10.0, 0.0, 0.0));
        let fit = mesh.camera_fit().unwrap();
        assert_eq!(fit.center, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(fit.scale_factor, Vec3::new(20.0, 1.0, 0.0));
    }

    #[test]
    fn test_invert_normals() {
        let mut mesh = two_sided_mesh();
        mesh.invert_normals();
        assert!(mesh.normals().iter().all(|n| n.z == -1.0));
    }
}
