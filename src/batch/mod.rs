//! Batch execution of operation chains.
//!
//! A [`BatchJob`] applies one chain factory to many images. The factory runs
//! once per image, on whichever thread processes that image, so no two images
//! share chain state. The concurrency strategy is fixed when the job is built.
//!
//! # Example
//!
//! ```
//! use rasterchain::batch::BatchBuilder;
//! use rasterchain::chain::OperationChain;
//! use rasterchain::raster::{Color, PixelLayout, RasterImage};
//!
//! let images = (0..4).map(|_| RasterImage::filled(40, 20, PixelLayout::Rgb8, Color::white()));
//! let outputs = BatchBuilder::new()
//!     .images(images)
//!     .apply(|img| OperationChain::new(img)?.rotate(90.0))
//!     .parallel(2)?
//!     .build()?
//!     .execute()?;
//!
//! assert_eq!(outputs.len(), 4);
//! assert!(outputs.iter().all(|o| (o.image.width(), o.image.height()) == (20, 40)));
//! # Ok::<(), rasterchain::ChainError>(())
//! ```

pub mod strategy;
pub mod task;

pub use strategy::ConcurrencyStrategy;
pub use task::{BatchOutput, ImageTask};

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::chain::OperationChain;
use crate::config::{BatchConfig, StrategyKind};
use crate::error::{ChainError, Result};
use crate::raster::RasterImage;

use strategy::PoolHandle;

type ChainFactory = Arc<dyn Fn(RasterImage) -> Result<OperationChain> + Send + Sync>;

/// Collects images, a chain factory and execution options.
pub struct BatchBuilder {
    images: Vec<RasterImage>,
    factory: Option<ChainFactory>,
    strategy: Option<ConcurrencyStrategy>,
    preserve_order: bool,
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            factory: None,
            strategy: None,
            preserve_order: true,
        }
    }

    /// Add images. Input indices follow the order they are added in.
    pub fn images(mut self, images: impl IntoIterator<Item = RasterImage>) -> Self {
        self.images.extend(images);
        self
    }

    /// Chain factory invoked once for each image.
    pub fn apply<F>(mut self, factory: F) -> Self
    where
        F: Fn(RasterImage) -> Result<OperationChain> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    pub fn sequential(self) -> Self {
        self.strategy(ConcurrencyStrategy::Sequential)
    }

    /// Run on a job-owned pool of `threads` workers.
    pub fn parallel(self, threads: usize) -> Result<Self> {
        let threads = NonZeroUsize::new(threads).ok_or_else(|| {
            ChainError::invalid_param("threads", "parallelism must be at least 1")
        })?;
        Ok(self.strategy(ConcurrencyStrategy::FixedPool(threads)))
    }

    pub fn elastic(self) -> Self {
        self.strategy(ConcurrencyStrategy::ElasticPool)
    }

    /// Run on a caller-owned pool. The job never shuts it down.
    pub fn executor(self, pool: Arc<ThreadPool>) -> Self {
        self.strategy(ConcurrencyStrategy::Executor(pool))
    }

    pub fn strategy(mut self, strategy: ConcurrencyStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// When false, results are delivered as they complete.
    pub fn preserve_order(mut self, preserve: bool) -> Self {
        self.preserve_order = preserve;
        self
    }

    /// Apply the strategy and ordering options from configuration.
    pub fn from_config(self, config: &BatchConfig) -> Result<Self> {
        let builder = match config.strategy {
            StrategyKind::Sequential => self.sequential(),
            StrategyKind::Elastic => self.elastic(),
            StrategyKind::Fixed => {
                let threads = config.threads.ok_or_else(|| {
                    ChainError::invalid_param("threads", "fixed strategy requires a thread count")
                })?;
                self.parallel(threads)?
            }
        };
        Ok(builder.preserve_order(config.preserve_order))
    }

    pub fn build(self) -> Result<BatchJob> {
        let factory = self
            .factory
            .ok_or_else(|| ChainError::construction("batch has no chain factory"))?;
        Ok(BatchJob {
            images: self.images,
            factory,
            strategy: self.strategy,
            preserve_order: self.preserve_order,
        })
    }
}

/// A configured batch, ready to run once.
pub struct BatchJob {
    images: Vec<RasterImage>,
    factory: ChainFactory,
    strategy: Option<ConcurrencyStrategy>,
    preserve_order: bool,
}

impl BatchJob {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Strategy `execute` will use. Unset defaults to sequential.
    pub fn strategy(&self) -> ConcurrencyStrategy {
        self.strategy
            .clone()
            .unwrap_or(ConcurrencyStrategy::Sequential)
    }

    /// Process every image and wait for all of them.
    ///
    /// Outputs are in input order, or completion order when ordering is off.
    /// The first failure met while collecting is returned, tagged with the
    /// index of the image that failed.
    pub fn execute(self) -> Result<Vec<BatchOutput>> {
        let strategy = self.strategy();
        let BatchJob {
            images,
            factory,
            preserve_order,
            ..
        } = self;

        tracing::debug!(
            images = images.len(),
            strategy = strategy.name(),
            preserve_order,
            "Executing batch"
        );

        if let ConcurrencyStrategy::Sequential = strategy {
            return images
                .into_iter()
                .enumerate()
                .map(|(index, image)| process(index, image, &factory))
                .collect();
        }

        let handle = strategy.pool()?;
        let pool = handle.pool();
        let items: Vec<(usize, RasterImage)> = images.into_iter().enumerate().collect();

        let results: Vec<Result<BatchOutput>> = if preserve_order {
            pool.install(|| {
                items
                    .into_par_iter()
                    .map(|(index, image)| process(index, image, &factory))
                    .collect()
            })
        } else {
            let completed = Mutex::new(Vec::with_capacity(items.len()));
            pool.scope(|scope| {
                for (index, image) in items {
                    let factory = &factory;
                    let completed = &completed;
                    scope.spawn(move |_| {
                        let result = process(index, image, factory);
                        completed.lock().push(result);
                    });
                }
            });
            completed.into_inner()
        };

        results.into_iter().collect()
    }

    /// Start every image and return one future per image, in input order.
    ///
    /// Never fails up front: if the pool cannot be created, every future
    /// resolves to that error. Without an explicit strategy an elastic pool
    /// is used. Job-owned pools shut down after the last task finishes.
    pub fn execute_async(self) -> Vec<ImageTask> {
        let strategy = self
            .strategy
            .clone()
            .unwrap_or(ConcurrencyStrategy::ElasticPool);
        let BatchJob {
            images, factory, ..
        } = self;

        tracing::debug!(
            images = images.len(),
            strategy = strategy.name(),
            "Submitting batch"
        );

        let handle = match strategy.pool() {
            Ok(handle) => handle,
            Err(e) => {
                let message = e.to_string();
                return (0..images.len())
                    .map(|index| ImageTask::failed(index, ChainError::processing(message.clone())))
                    .collect();
            }
        };

        spawn_tasks(images, &factory, handle)
    }

    /// Start every image and wait for all of them without blocking a runtime thread.
    pub async fn execute_all_async(self) -> Result<Vec<BatchOutput>> {
        let preserve_order = self.preserve_order;
        let tasks = self.execute_async();

        if preserve_order {
            return futures::future::join_all(tasks).await.into_iter().collect();
        }

        let mut pending: FuturesUnordered<ImageTask> = tasks.into_iter().collect();
        let mut outputs = Vec::with_capacity(pending.len());
        while let Some(result) = pending.next().await {
            outputs.push(result?);
        }
        Ok(outputs)
    }
}

impl fmt::Debug for BatchJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchJob")
            .field("images", &self.images.len())
            .field("strategy", &self.strategy)
            .field("preserve_order", &self.preserve_order)
            .finish()
    }
}

/// Spawn one pool task per image. Each task holds a clone of `handle`, so a
/// job-owned pool outlives the job until the last task has sent its result.
fn spawn_tasks(
    images: Vec<RasterImage>,
    factory: &ChainFactory,
    handle: PoolHandle,
) -> Vec<ImageTask> {
    images
        .into_iter()
        .enumerate()
        .map(|(index, image)| {
            let (sender, receiver) = oneshot::channel();
            let factory = Arc::clone(factory);
            let worker_handle = handle.clone();
            handle.pool().spawn(move || {
                let result = process(index, image, &factory);
                // receiver may already be gone
                let _ = sender.send(result);
                drop(worker_handle);
            });
            ImageTask::pending(index, receiver)
        })
        .collect()
}

fn process(index: usize, image: RasterImage, factory: &ChainFactory) -> Result<BatchOutput> {
    let image = factory(image)
        .and_then(OperationChain::build)
        .map_err(|e| ChainError::batch(index, e))?;
    tracing::debug!(index, width = image.width(), height = image.height(), "Batch image done");
    Ok(BatchOutput { index, image })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Color, PixelLayout};

    fn images(n: usize) -> Vec<RasterImage> {
        (0..n)
            .map(|i| RasterImage::filled(10 + i as u32, 5, PixelLayout::Rgb8, Color::white()))
            .collect()
    }

    fn rotate_job(n: usize) -> BatchBuilder {
        BatchBuilder::new()
            .images(images(n))
            .apply(|img| OperationChain::new(img)?.rotate(90.0))
    }

    #[test]
    fn test_missing_factory() {
        let err = BatchBuilder::new().images(images(1)).build().unwrap_err();
        assert!(err.is_construction());
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let err = BatchBuilder::new().parallel(0).err().unwrap();
        assert!(err.is_validation());
    }

    #[test]
    fn test_default_strategy_is_sequential() {
        let job = rotate_job(2).build().unwrap();
        assert!(matches!(job.strategy(), ConcurrencyStrategy::Sequential));
        assert_eq!(job.len(), 2);
    }

    #[test]
    fn test_sequential_execute() {
        let out = rotate_job(3).build().unwrap().execute().unwrap();
        let heights: Vec<_> = out.iter().map(|o| o.image.height()).collect();
        assert_eq!(heights, [10, 11, 12]);
    }

    #[test]
    fn test_fixed_pool_preserves_order() {
        let out = rotate_job(8)
            .parallel(4)
            .unwrap()
            .build()
            .unwrap()
            .execute()
            .unwrap();
        let indices: Vec<_> = out.iter().map(|o| o.index).collect();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_unordered_keeps_every_index() {
        let out = rotate_job(6)
            .elastic()
            .preserve_order(false)
            .build()
            .unwrap()
            .execute()
            .unwrap();
        let mut indices: Vec<_> = out.iter().map(|o| o.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_failure_carries_index() {
        let err = BatchBuilder::new()
            .images(images(3))
            .apply(|img| {
                let w = img.width();
                let chain = OperationChain::new(img)?;
                if w == 11 {
                    chain.crop(50, 50, 1, 1)
                } else {
                    Ok(chain)
                }
            })
            .build()
            .unwrap()
            .execute()
            .unwrap_err();
        assert_eq!(err.batch_index(), Some(1));
        assert!(err.root().is_validation());
    }

    #[test]
    fn test_from_config() {
        let config = BatchConfig {
            strategy: StrategyKind::Fixed,
            threads: Some(2),
            preserve_order: false,
        };
        let job = rotate_job(1).from_config(&config).unwrap().build().unwrap();
        assert!(matches!(job.strategy(), ConcurrencyStrategy::FixedPool(n) if n.get() == 2));
        assert!(!job.preserve_order);

        let missing = BatchConfig {
            threads: None,
            ..config
        };
        assert!(rotate_job(1).from_config(&missing).is_err());
    }

    #[tokio::test]
    async fn test_owned_pool_dropped_after_tasks_resolve() {
        let job = rotate_job(6).parallel(2).unwrap().build().unwrap();
        let handle = job.strategy().pool().unwrap();
        let pool = handle.downgrade_owned().unwrap();

        let BatchJob {
            images, factory, ..
        } = job;
        let tasks = spawn_tasks(images, &factory, handle);
        assert!(pool.upgrade().is_some());

        let outputs = futures::future::join_all(tasks).await;
        assert!(outputs.iter().all(|o| o.is_ok()));

        // the last worker drops its handle just after sending
        for _ in 0..200 {
            if pool.upgrade().is_none() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(pool.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_execute_async_one_task_per_image() {
        let tasks = rotate_job(4).build().unwrap().execute_async();
        assert_eq!(tasks.len(), 4);
        for (i, task) in tasks.into_iter().enumerate() {
            assert_eq!(task.index(), i);
            assert_eq!(task.await.unwrap().index, i);
        }
    }
}
