//! Operation chains.
//!
//! An [`OperationChain`] owns one source image and an ordered list of
//! [`Step`]s. Builder calls validate what they can without pixel data and
//! append a step; [`OperationChain::build`] folds the steps over the source
//! in order. Checks that depend on real dimensions (crop bounds, padding
//! overflow) surface from `build`.
//!
//! Intermediate buffers are recycled through a private scratch slot, and a
//! run of same-shape steps after the first stays on a single buffer.
//!
//! # Example
//!
//! ```
//! use rasterchain::chain::OperationChain;
//! use rasterchain::raster::{Color, PixelLayout, RasterImage};
//! use rasterchain::transform::ResizeMode;
//!
//! let source = RasterImage::filled(200, 100, PixelLayout::Rgb8, Color::white());
//! let out = OperationChain::new(source)?
//!     .mode(ResizeMode::Fit)
//!     .resize(150, 150)?
//!     .pad_with_color(10, Color::black())?
//!     .build()?;
//!
//! assert_eq!((out.width(), out.height()), (170, 95));
//! # Ok::<(), rasterchain::ChainError>(())
//! ```

pub mod scratch;
pub mod step;

pub use scratch::BufferUse;
pub use step::Step;

use serde::Deserialize;
use std::fmt;

use crate::error::{ChainError, Result};
use crate::raster::{BufferId, Color, Dimensions, PixelLayout, RasterImage};
use crate::transform::{CropRegion, ExifOrientation, FlipAxis, Padding, Quality, ResizeMode};
use crate::watermark::Watermark;

use scratch::ScratchBuffer;

/// Resize settings captured by steps that do not specify their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ChainDefaults {
    pub mode: ResizeMode,
    pub quality: Quality,
}

/// Record of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTrace {
    pub name: &'static str,
    pub buffer: BufferId,
    pub dimensions: Dimensions,
    pub layout: PixelLayout,
    pub buffer_use: BufferUse,
}

/// Per-step record of a chain run plus scratch counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainTrace {
    pub source: Option<BufferId>,
    pub steps: Vec<StepTrace>,
    pub reuses: usize,
    pub allocations: usize,
}

impl ChainTrace {
    /// Buffer ids in step order.
    pub fn buffers(&self) -> Vec<BufferId> {
        self.steps.iter().map(|s| s.buffer).collect()
    }
}

/// Result of [`OperationChain::execute`].
#[derive(Debug)]
pub struct ChainOutput {
    pub image: RasterImage,
    pub trace: ChainTrace,
}

/// Ordered transforms over one source image.
pub struct OperationChain {
    source: RasterImage,
    steps: Vec<Step>,
    defaults: ChainDefaults,
}

impl OperationChain {
    /// Start a chain. Empty images are rejected.
    pub fn new(source: RasterImage) -> Result<Self> {
        if source.is_empty() {
            return Err(ChainError::construction(format!(
                "source image is empty ({}x{})",
                source.width(),
                source.height()
            )));
        }
        Ok(Self {
            source,
            steps: Vec::new(),
            defaults: ChainDefaults::default(),
        })
    }

    /// Start a chain from an optional source, failing when it is absent.
    pub fn load(source: Option<RasterImage>) -> Result<Self> {
        match source {
            Some(image) => Self::new(image),
            None => Err(ChainError::construction("source image is missing")),
        }
    }

    pub fn with_defaults(mut self, defaults: ChainDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Default mode for resize steps appended after this call.
    pub fn mode(mut self, mode: ResizeMode) -> Self {
        self.defaults.mode = mode;
        self
    }

    /// Default quality for resize steps appended after this call.
    pub fn quality(mut self, quality: Quality) -> Self {
        self.defaults.quality = quality;
        self
    }

    pub fn defaults(&self) -> ChainDefaults {
        self.defaults
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn source_dimensions(&self) -> Dimensions {
        self.source.dimensions()
    }

    /// Validate and append a step.
    pub fn append(mut self, step: Step) -> Result<Self> {
        step.validate()?;
        self.steps.push(step);
        Ok(self)
    }

    /// Resize with the current default mode and quality.
    pub fn resize(self, width: u32, height: u32) -> Result<Self> {
        let mode = self.defaults.mode;
        self.resize_with(width, height, mode)
    }

    pub fn resize_with(self, width: u32, height: u32, mode: ResizeMode) -> Result<Self> {
        let quality = self.defaults.quality;
        self.append(Step::Resize {
            width,
            height,
            mode,
            quality,
        })
    }

    /// Scale to cover `width` x `height`, then trim the overflow from the center.
    pub fn cover(self, width: u32, height: u32) -> Result<Self> {
        self.resize_with(width, height, ResizeMode::Fill)?
            .append(Step::CenterCrop { width, height })
    }

    pub fn crop(self, x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        let region = CropRegion::new(x, y, width, height)?;
        self.append(Step::Crop(region))
    }

    pub fn center_crop(self, width: u32, height: u32) -> Result<Self> {
        self.append(Step::CenterCrop { width, height })
    }

    /// Rotate clockwise. Uncovered corners of non-right angles are transparent.
    pub fn rotate(self, degrees: f64) -> Result<Self> {
        self.append(Step::Rotate {
            degrees,
            background: None,
        })
    }

    pub fn rotate_with_background(self, degrees: f64, background: Color) -> Result<Self> {
        self.append(Step::Rotate {
            degrees,
            background: Some(background),
        })
    }

    /// Pad with a transparent border.
    pub fn pad(self, padding: impl Into<Padding>) -> Result<Self> {
        self.append(Step::Pad {
            padding: padding.into(),
            background: None,
        })
    }

    pub fn pad_with_color(self, padding: impl Into<Padding>, background: Color) -> Result<Self> {
        self.append(Step::Pad {
            padding: padding.into(),
            background: Some(background),
        })
    }

    pub fn flip_horizontal(self) -> Result<Self> {
        self.append(Step::Flip(FlipAxis::Horizontal))
    }

    pub fn flip_vertical(self) -> Result<Self> {
        self.append(Step::Flip(FlipAxis::Vertical))
    }

    pub fn auto_orient(self, orientation: ExifOrientation) -> Result<Self> {
        self.append(Step::AutoOrient(orientation))
    }

    pub fn watermark(self, watermark: Watermark) -> Result<Self> {
        self.append(Step::Watermark(watermark))
    }

    /// Run every step and return the final image.
    pub fn build(self) -> Result<RasterImage> {
        self.run(false).map(|output| output.image)
    }

    /// Run every step, also returning a per-step trace.
    pub fn execute(self) -> Result<ChainOutput> {
        self.run(true)
    }

    /// Run [`build`](Self::build) on tokio's blocking pool.
    pub async fn build_async(self) -> Result<RasterImage> {
        tokio::task::spawn_blocking(move || self.build())
            .await
            .map_err(|e| ChainError::processing(format!("chain task failed: {}", e)))?
    }

    fn run(self, record: bool) -> Result<ChainOutput> {
        let OperationChain { source, steps, .. } = self;

        let span = tracing::debug_span!(
            "chain.build",
            steps = steps.len(),
            width = source.width(),
            height = source.height()
        );
        let _enter = span.enter();

        let source_id = source.id();
        let mut scratch = ScratchBuffer::new(source_id);
        let mut trace = ChainTrace {
            source: Some(source_id),
            ..ChainTrace::default()
        };
        let mut current = source;

        for (index, step) in steps.iter().enumerate() {
            let input_id = current.id();
            let output = step.apply(current, &mut scratch)?;
            let buffer_use = scratch.settle(input_id, output.id());

            tracing::debug!(
                step = index,
                name = step.name(),
                width = output.width(),
                height = output.height(),
                buffer = %output.id(),
                buffer_use = buffer_use.as_str(),
                "Applied chain step"
            );

            if record {
                trace.steps.push(StepTrace {
                    name: step.name(),
                    buffer: output.id(),
                    dimensions: output.dimensions(),
                    layout: output.layout(),
                    buffer_use,
                });
            }
            current = output;
        }

        trace.reuses = scratch.reuses();
        trace.allocations = scratch.allocations();
        Ok(ChainOutput {
            image: current,
            trace,
        })
    }
}

impl fmt::Debug for OperationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationChain")
            .field("source", &self.source)
            .field("steps", &self.steps.iter().map(Step::name).collect::<Vec<_>>())
            .field("defaults", &self.defaults)
            .finish()
    }
}
