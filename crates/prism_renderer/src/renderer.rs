//! Progressive frame driver.
//!
//! A frame is two data-parallel passes over the image: the accumulation
//! pass runs the integrator once per pixel and folds the sample into the
//! running mean, the display pass tone-maps the means into BGRA bytes.
//! Camera, sky and configuration only change between frames, through
//! `&mut self`, and each change applies the reset policy of the render mode.

use crate::accumulator::{AccumCell, Accumulator};
use crate::camera::Camera;
use crate::config::{ConfigError, RenderConfig, ResetKind, ShadingMode};
use crate::display::{display_pixel, Bgra8, DisplaySettings};
use crate::hittable::ShadingOptions;
use crate::integrators::shade_pixel;
use crate::material::Color;
use crate::sampling::pixel_rng;
use crate::scene::{PrimitiveId, Scene};
use crate::scheduler::{Scheduler, ThreadPoolScheduler};
use crate::sky::Sky;
use crate::terrain::Terrain;
use std::time::Instant;

/// Seed of the height field marched when the scene has no terrain.
const FALLBACK_TERRAIN_SEED: u32 = 1337;

/// Everything one frame reads; never mutated while the frame renders.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub config: RenderConfig,
    pub camera: Camera,
    pub sky: Sky,
    /// Frames rendered so far; feeds the per-pixel seeds
    pub frame: u32,
    pub selected: Option<PrimitiveId>,
    fallback_terrain: Terrain,
}

impl RenderContext {
    pub fn new(config: RenderConfig, camera: Camera, sky: Sky) -> Self {
        Self {
            config,
            camera,
            sky,
            frame: 0,
            selected: None,
            fallback_terrain: Terrain::new(-2.0, 1.5, 0.15).with_seed(FALLBACK_TERRAIN_SEED),
        }
    }

    pub fn shading_options(&self) -> ShadingOptions {
        ShadingOptions {
            normal_mapping: self.config.normal_mapping,
            smooth: self.config.shading == ShadingMode::Gouraud,
        }
    }

    pub fn display_settings(&self) -> DisplaySettings {
        DisplaySettings {
            tone_mapping: self.config.tone_mapping,
            grayscale: self.config.grayscale,
            sepia: self.config.sepia,
        }
    }

    /// Height field for the ray marcher: the scene's first terrain, or a
    /// built-in one.
    pub fn terrain<'a>(&'a self, scene: &'a Scene) -> &'a Terrain {
        scene.terrain().unwrap_or(&self.fallback_terrain)
    }
}

/// Owns the per-pixel buffers that persist across frames.
pub struct Renderer<S: Scheduler = ThreadPoolScheduler> {
    scheduler: S,
    context: RenderContext,
    accumulator: Accumulator,
    /// Primitive hit by each pixel's primary ray in the last frame (-1 = none)
    last_primitive: Vec<i32>,
    pixels: Vec<Bgra8>,
}

impl Renderer<ThreadPoolScheduler> {
    /// Renderer on the global rayon pool.
    pub fn new(camera: Camera, config: RenderConfig) -> Result<Self, ConfigError> {
        Self::with_scheduler(camera, config, ThreadPoolScheduler::new())
    }
}

impl<S: Scheduler> Renderer<S> {
    pub fn with_scheduler(camera: Camera, config: RenderConfig, scheduler: S) -> Result<Self, ConfigError> {
        config.validate()?;
        camera.validate()?;
        let (width, height) = (camera.image_width, camera.image_height);
        let count = camera.pixel_count();
        log::info!(
            "renderer: {}x{} {:?} on {} scheduler",
            width,
            height,
            config.mode,
            scheduler.name()
        );
        Ok(Self {
            scheduler,
            context: RenderContext::new(config, camera, Sky::default()),
            accumulator: Accumulator::new(width, height),
            last_primitive: vec![-1; count],
            pixels: vec![Bgra8::BLACK; count],
        })
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn config(&self) -> &RenderConfig {
        &self.context.config
    }

    pub fn width(&self) -> u32 {
        self.context.camera.image_width
    }

    pub fn height(&self) -> u32 {
        self.context.camera.image_height
    }

    /// Frames rendered since the renderer was created.
    pub fn frame(&self) -> u32 {
        self.context.frame
    }

    /// Replace the configuration.
    ///
    /// A mode switch fully resets the accumulator, other sample-affecting
    /// changes use the mode's reset kind and display-only changes keep it.
    pub fn set_config(&mut self, config: RenderConfig) -> Result<(), ConfigError> {
        if let Err(err) = config.validate() {
            log::warn!("rejected render config: {}", err);
            return Err(err);
        }

        let old = &self.context.config;
        let reset = if old.mode != config.mode {
            log::info!("render mode {:?} -> {:?}", old.mode, config.mode);
            Some(ResetKind::Full)
        } else if old.affects_samples(&config) {
            Some(config.mode.reset_kind())
        } else {
            None
        };

        self.context.config = config;
        if let Some(kind) = reset {
            self.reset_with(kind);
        }
        Ok(())
    }

    /// Replace the camera; a new resolution reallocates every buffer.
    pub fn set_camera(&mut self, camera: Camera) -> Result<(), ConfigError> {
        if let Err(err) = camera.validate() {
            log::warn!("rejected camera: {}", err);
            return Err(err);
        }
        if camera == self.context.camera {
            return Ok(());
        }
        let resized = camera.image_width != self.width() || camera.image_height != self.height();
        self.context.camera = camera;

        if resized {
            let (width, height) = (self.width(), self.height());
            log::info!("resolution changed to {}x{}", width, height);
            let count = self.context.camera.pixel_count();
            self.accumulator.resize(width, height);
            self.last_primitive = vec![-1; count];
            self.pixels = vec![Bgra8::BLACK; count];
        } else {
            self.reset();
        }
        Ok(())
    }

    pub fn set_sky(&mut self, sky: Sky) {
        self.context.sky = sky;
        self.reset();
    }

    /// Highlight a primitive in the display pass; samples are kept.
    pub fn select(&mut self, primitive: Option<PrimitiveId>) {
        self.context.selected = primitive;
    }

    /// Reset with the current mode's policy.
    pub fn reset(&mut self) {
        self.reset_with(self.context.config.mode.reset_kind());
    }

    pub fn reset_with(&mut self, kind: ResetKind) {
        log::info!("accumulator reset ({:?})", kind);
        self.accumulator.reset(kind);
    }

    /// Render one progressive frame and return the packed BGRA bytes.
    pub fn render_frame(&mut self, scene: &Scene) -> &[u8] {
        let start = Instant::now();
        let ctx = &self.context;
        let width = ctx.camera.image_width.max(1) as usize;

        {
            let mut cells: Vec<(&mut AccumCell, &mut i32)> = self
                .accumulator
                .cells_mut()
                .iter_mut()
                .zip(self.last_primitive.iter_mut())
                .collect();

            self.scheduler.dispatch(&mut cells, &|index, (cell, primitive)| {
                let (x, y) = ((index % width) as u32, (index / width) as u32);
                let mut rng = pixel_rng(ctx.config.seed, ctx.frame, index);
                match shade_pixel(scene, ctx, x, y, &mut rng) {
                    Some(sample) => {
                        cell.add(sample.color);
                        **primitive = sample.primitive;
                    }
                    None => {
                        // No ray for this pixel: a single black sample
                        cell.reset(ResetKind::Full);
                        cell.add(Color::ZERO);
                        **primitive = -1;
                    }
                }
            });
        }

        let settings = ctx.display_settings();
        let selected = ctx.selected.map(|id| id.0 as i32);
        let cells = self.accumulator.cells();
        let last = &self.last_primitive;
        self.scheduler.dispatch(&mut self.pixels, &|index, px| {
            let highlighted = selected.is_some_and(|id| last[index] == id);
            *px = display_pixel(cells[index].mean, &settings, highlighted);
        });

        log::debug!(
            "frame {} ({:?}) in {:.1?}",
            self.context.frame,
            self.context.config.mode,
            start.elapsed()
        );
        self.context.frame = self.context.frame.wrapping_add(1);
        self.bytes()
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn last_primitives(&self) -> &[i32] {
        &self.last_primitive
    }

    /// Primitive under pixel (x, y) in the last frame, -1 for none.
    pub fn pick(&self, x: u32, y: u32) -> i32 {
        if x >= self.width() || y >= self.height() {
            return -1;
        }
        self.last_primitive
            .get(y as usize * self.width() as usize + x as usize)
            .copied()
            .unwrap_or(-1)
    }

    pub fn pixels(&self) -> &[Bgra8] {
        &self.pixels
    }

    /// Output image as row-major BGRA bytes.
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}
