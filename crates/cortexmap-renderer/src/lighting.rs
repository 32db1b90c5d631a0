use serde::{Deserialize, Serialize};

use cortexmap_core::{Rgba, Vec3};

/// Exponent of the specular highlight.
pub const SHININESS: f32 = 40.0;

/// Light and material coefficients of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingParams {
    /// Light position in scene coordinates, before the camera transform.
    pub light_position: Vec3,
    /// RGB intensity of the light.
    pub intensity: Vec3,
    /// Ambient coefficient.
    pub ambient: f32,
    /// Specular coefficient (0 disables highlights).
    pub specular: f32,
}

impl Default for LightingParams {
    fn default() -> Self {
        Self {
            light_position: Vec3::new(100.0, 100.0, 100.0),
            intensity: Vec3::new(1.0, 1.0, 1.0),
            ambient: 0.05,
            specular: 0.0,
        }
    }
}

/// Camera transform applied to the light position every frame.
pub trait CameraTransform {
    fn map(&self, point: Vec3) -> Vec3;
}

/// No camera attached: the light stays where it was placed.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCamera;

impl CameraTransform for IdentityCamera {
    fn map(&self, point: Vec3) -> Vec3 {
        point
    }
}

/// Per-frame uniforms of the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameUniforms {
    pub light_position: Vec3,
    pub intensity: Vec3,
    pub ambient: f32,
    pub specular: f32,
    pub alpha: f32,
}

impl FrameUniforms {
    pub fn new(params: &LightingParams, camera: &dyn CameraTransform, alpha: f32) -> Self {
        Self {
            light_position: camera.map(params.light_position),
            intensity: params.intensity,
            ambient: params.ambient,
            specular: params.specular,
            alpha,
        }
    }
}

/// CPU reference of the fragment stage: ambient, clamped diffuse and
/// specular terms. `normal` must be non-zero.
pub fn shade(color: Rgba, position: Vec3, normal: Vec3, uniforms: &FrameUniforms) -> Rgba {
    let rgb = Vec3::new(color.r, color.g, color.b);
    let light = uniforms.intensity;
    let tint = |a: Vec3, s: f32| Vec3::new(a.x * light.x * s, a.y * light.y * s, a.z * light.z * s);

    let ambient = tint(rgb, uniforms.ambient);

    let to_light = uniforms.light_position.sub(&position);
    let brightness = (normal.dot(&to_light) / (to_light.length() * normal.length())).clamp(0.0, 1.0);
    let diffuse = tint(rgb, brightness);

    let to_camera = Vec3::new(0.0, 0.0, 1.0).sub(&position);
    let k = to_light.normalized().add(&to_camera.normalized()).normalized();
    let highlight = normal.dot(&k).abs().powf(SHININESS).clamp(0.0, 1.0) * uniforms.specular;
    let specular = tint(Vec3::new(1.0, 1.0, 1.0), highlight);

    let out = ambient.add(&diffuse).add(&specular);
    Rgba::new(out.x, out.y, out.z, uniforms.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shift(Vec3);

    impl CameraTransform for Shift {
        fn map(&self, point: Vec3) -> Vec3 {
            point.add(&self.0)
        }
    }

    #[test]
    fn test_frame_uniforms_follow_camera() {
        let params = LightingParams::default();
        let u = FrameUniforms::new(&params, &IdentityCamera, 1.0);
        assert_eq!(u.light_position, Vec3::new(100.0, 100.0, 100.0));
        let u = FrameUniforms::new(&params, &Shift(Vec3::new(-100.0, 0.0, 0.0)), 0.5);
        assert_eq!(u.light_position, Vec3::new(0.0, 100.0, 100.0));
        assert_eq!(u.alpha, 0.5);
    }

    #[test]
    fn test_facing_light_is_ambient_plus_diffuse() {
        let params = LightingParams {
            light_position: Vec3::new(0.0, 0.0, 10.0),
            ..Default::default()
        };
        let u = FrameUniforms::new(&params, &IdentityCamera, 1.0);
        let c = shade(Rgba::WHITE, Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), &u);
        assert!((c.r - 1.05).abs() < 1e-5);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn test_back_facing_is_ambient_only() {
        let params = LightingParams {
            light_position: Vec3::new(0.0, 0.0, 10.0),
            ..Default::default()
        };
        let u = FrameUniforms::new(&params, &IdentityCamera, 0.1);
        let c = shade(Rgba::gray(0.5), Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), &u);
        assert!((c.g - 0.025).abs() < 1e-6);
        assert_eq!(c.a, 0.1);
    }

    #[test]
    fn test_specular_highlight() {
        let params = LightingParams {
            light_position: Vec3::new(0.0, 0.0, 10.0),
            specular: 1.0,
            ambient: 0.0,
            ..Default::default()
        };
        let u = FrameUniforms::new(&params, &IdentityCamera, 1.0);
        let c = shade(Rgba::BLACK, Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), &u);
        assert!((c.r - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_params_json_defaults() {
        let params: LightingParams = serde_json::from_str("{\"ambient\": 0.2}").unwrap();
        assert_eq!(params.ambient, 0.2);
        assert_eq!(params.specular, 0.0);
        assert_eq!(params.intensity, Vec3::new(1.0, 1.0, 1.0));
    }
}
