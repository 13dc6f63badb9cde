use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Tunables for the decorative hero scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub camera_position: Vec3,
    /// Radians added to the knot's x and y rotation every frame.
    pub rotation_step: f32,
    pub knot: KnotParams,
    pub renderer: RendererOptions,
}

impl Default for HeroConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            camera_position: Vec3::new(0.0, 0.0, 10.0),
            rotation_step: 0.01,
            knot: KnotParams::default(),
            renderer: RendererOptions::default(),
        }
    }
}

/// Shape of the (p, q) torus knot drawn in the hero region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnotParams {
    pub radius: f32,
    pub tube: f32,
    pub tubular_segments: u32,
    pub radial_segments: u32,
    pub p: u32,
    pub q: u32,
}

impl Default for KnotParams {
    fn default() -> Self {
        Self {
            radius: 3.0,
            tube: 1.0,
            tubular_segments: 100,
            radial_segments: 16,
            p: 2,
            q: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    /// Clear to a fully transparent background so the page shows through.
    pub alpha: bool,
    /// Multisample the output surface.
    pub antialias: bool,
}

impl RendererOptions {
    pub fn sample_count(&self) -> u32 {
        if self.antialias {
            4
        } else {
            1
        }
    }
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            alpha: true,
            antialias: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Offset in pixels the page has to scroll past before the navbar
    /// switches to its scrolled look.
    pub scroll_threshold: f64,
    /// Duration of emulated smooth scrolling on hosts without native support.
    pub smooth_scroll_ms: f64,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            scroll_threshold: 10.0,
            smooth_scroll_ms: 600.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_hero_page() {
        let config = HeroConfig::default();
        assert_eq!(config.fov_degrees, 75.0);
        assert_eq!(config.camera_position.z, 10.0);
        assert_eq!(config.knot.tubular_segments, 100);
        assert_eq!(config.renderer.sample_count(), 4);
        assert_eq!(NavConfig::default().scroll_threshold, 10.0);
    }

    #[test]
    fn aliasing_disabled_uses_single_sample() {
        let options = RendererOptions {
            alpha: false,
            antialias: false,
        };
        assert_eq!(options.sample_count(), 1);
    }
}
