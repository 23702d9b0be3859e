//! Composable raster image transformation pipeline.
//!
//! Start an [`chain::OperationChain`] from a [`raster::RasterImage`], append
//! resize, crop, rotate, pad, flip, orientation and watermark steps, then
//! `build()`. Use [`batch::BatchBuilder`] to run one chain recipe over many
//! images on a thread pool, synchronously or as futures.

pub mod batch;
pub mod chain;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod raster;
pub mod transform;
pub mod watermark;

pub use batch::{BatchBuilder, BatchJob, BatchOutput, ConcurrencyStrategy, ImageTask};
pub use chain::{ChainDefaults, OperationChain, Step};
pub use error::{ChainError, Result};
pub use raster::{Color, PixelLayout, RasterImage};
