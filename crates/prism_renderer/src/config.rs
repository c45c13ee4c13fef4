//! Renderer-level configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a configuration is rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_depth must be at least 1")]
    ZeroMaxDepth,

    #[error("max_depth {max_depth} exceeds the limit of {limit}")]
    ExcessiveDepth { max_depth: u32, limit: u32 },

    #[error("rr_depth {rr_depth} is beyond max_depth {max_depth}")]
    RouletteBeyondDepth { rr_depth: u32, max_depth: u32 },

    #[error("ao_distance must be positive and finite, got {0}")]
    InvalidAoDistance(f32),

    #[error("camera look_from and look_at must be finite and distinct")]
    DegenerateCamera,
}

/// Upper bound on path depth; scene content never drives the loop beyond it.
pub const MAX_PATH_DEPTH_LIMIT: u32 = 1024;

/// Integration strategy used for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    AmbientOcclusion,
    #[default]
    PathTracer,
    RayCaster,
    RayMarcher,
    RayTracer,
}

/// How much accumulated history a reset throws away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    /// Zero the running means and the sample counts.
    Full,
    /// Keep the means and re-seed every sample count to 1.
    Partial,
}

impl RenderMode {
    pub const ALL: [RenderMode; 5] = [
        RenderMode::AmbientOcclusion,
        RenderMode::PathTracer,
        RenderMode::RayCaster,
        RenderMode::RayMarcher,
        RenderMode::RayTracer,
    ];

    /// Stochastic modes jitter the pixel sample and converge over frames.
    pub fn is_progressive(self) -> bool {
        matches!(self, RenderMode::PathTracer | RenderMode::AmbientOcclusion)
    }

    /// Reset policy: stochastic modes start over, low-variance modes blend.
    pub fn reset_kind(self) -> ResetKind {
        if self.is_progressive() {
            ResetKind::Full
        } else {
            ResetKind::Partial
        }
    }
}

/// Normal reconstruction for triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingMode {
    Flat,
    #[default]
    Gouraud,
}

/// Tone-mapping operator applied by the display pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMapping {
    Linear,
    #[default]
    Reinhard,
    ReinhardExtended,
    HejlDawson,
    Hable,
}

/// Renderer-level options, replaced wholesale between frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub mode: RenderMode,
    /// Path-tracer bounce limit
    pub max_depth: u32,
    /// Depth at which Russian roulette starts
    pub rr_depth: u32,
    /// Occlusion radius for ambient occlusion
    pub ao_distance: f32,
    pub normal_mapping: bool,
    pub wireframe: bool,
    pub shading: ShadingMode,
    pub tone_mapping: ToneMapping,
    pub grayscale: bool,
    pub sepia: bool,
    pub sky: bool,
    pub sun: bool,
    pub clouds: bool,
    /// Base seed for the per-pixel generators
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::PathTracer,
            max_depth: 8,
            rr_depth: 3,
            ao_distance: 1.0,
            normal_mapping: true,
            wireframe: false,
            shading: ShadingMode::Gouraud,
            tone_mapping: ToneMapping::Reinhard,
            grayscale: false,
            sepia: false,
            sky: true,
            sun: true,
            clouds: false,
            seed: 0,
        }
    }
}

impl RenderConfig {
    /// Builder method to set the render mode.
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder method to set path depth and Russian-roulette onset.
    pub fn with_depth(mut self, max_depth: u32, rr_depth: u32) -> Self {
        self.max_depth = max_depth;
        self.rr_depth = rr_depth;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroMaxDepth);
        }
        if self.max_depth > MAX_PATH_DEPTH_LIMIT {
            return Err(ConfigError::ExcessiveDepth {
                max_depth: self.max_depth,
                limit: MAX_PATH_DEPTH_LIMIT,
            });
        }
        if self.rr_depth > self.max_depth {
            return Err(ConfigError::RouletteBeyondDepth {
                rr_depth: self.rr_depth,
                max_depth: self.max_depth,
            });
        }
        if !(self.ao_distance.is_finite() && self.ao_distance > 0.0) {
            return Err(ConfigError::InvalidAoDistance(self.ao_distance));
        }
        Ok(())
    }

    /// True when switching from `self` to `other` invalidates accumulated samples.
    ///
    /// Display-only options (tone mapping, grayscale, sepia) never do.
    pub fn affects_samples(&self, other: &RenderConfig) -> bool {
        let display_only = |c: &RenderConfig| RenderConfig {
            tone_mapping: ToneMapping::default(),
            grayscale: false,
            sepia: false,
            ..c.clone()
        };
        display_only(self) != display_only(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(RenderConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects() {
        let config = RenderConfig::default().with_depth(0, 0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxDepth));

        let config = RenderConfig::default().with_depth(5000, 3);
        assert!(matches!(config.validate(), Err(ConfigError::ExcessiveDepth { .. })));

        let config = RenderConfig::default().with_depth(2, 3);
        assert_eq!(
            config.validate(),
            Err(ConfigError::RouletteBeyondDepth {
                rr_depth: 3,
                max_depth: 2
            })
        );

        let config = RenderConfig {
            ao_distance: -1.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidAoDistance(-1.0)));
    }

    #[test]
    fn test_display_options_do_not_affect_samples() {
        let base = RenderConfig::default();
        let display = RenderConfig {
            tone_mapping: ToneMapping::Hable,
            sepia: true,
            ..base.clone()
        };
        assert!(!base.affects_samples(&display));

        let depth = base.clone().with_depth(4, 2);
        assert!(base.affects_samples(&depth));
    }

    #[test]
    fn test_reset_kinds() {
        assert_eq!(RenderMode::PathTracer.reset_kind(), ResetKind::Full);
        assert_eq!(RenderMode::AmbientOcclusion.reset_kind(), ResetKind::Full);
        assert_eq!(RenderMode::RayCaster.reset_kind(), ResetKind::Partial);
        assert_eq!(RenderMode::RayTracer.reset_kind(), ResetKind::Partial);
        assert_eq!(RenderMode::RayMarcher.reset_kind(), ResetKind::Partial);
    }

    #[test]
    fn test_json_uses_snake_case_and_defaults() {
        let config: RenderConfig =
            serde_json::from_str(r#"{ "mode": "ray_tracer", "tone_mapping": "hable" }"#).unwrap();
        assert_eq!(config.mode, RenderMode::RayTracer);
        assert_eq!(config.tone_mapping, ToneMapping::Hable);
        assert_eq!(config.max_depth, RenderConfig::default().max_depth);
    }
}
