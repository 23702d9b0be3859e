// Batch execution: ordering, failure reporting and pool ownership

use image::Rgba;
use rasterchain::batch::{BatchBuilder, BatchOutput, ConcurrencyStrategy};
use rasterchain::chain::OperationChain;
use rasterchain::config::PipelineConfig;
use rasterchain::raster::{PixelLayout, RasterImage};
use rasterchain::transform::ResizeMode;
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Images whose top-left pixel encodes their input index.
fn marked_images(count: usize) -> Vec<RasterImage> {
    (0..count)
        .map(|i| {
            let mut img = RasterImage::new(16, 8, PixelLayout::Rgba8);
            img.put_pixel(0, 0, Rgba([i as u8, 255 - i as u8, 7, 255]));
            img
        })
        .collect()
}

fn marker(output: &BatchOutput) -> u8 {
    output.image.pixel(0, 0)[0]
}

/// Two half turns keep dimensions and bring the marker back to (0, 0).
fn double_half_turn(img: RasterImage) -> rasterchain::Result<OperationChain> {
    OperationChain::new(img)?.rotate(180.0)?.rotate(180.0)
}

#[rstest]
#[case::sequential(BatchBuilder::new().sequential())]
#[case::fixed(BatchBuilder::new().parallel(3).unwrap())]
#[case::elastic(BatchBuilder::new().elastic())]
fn test_preserved_order_traces_back_to_input(#[case] builder: BatchBuilder) {
    let outputs = builder
        .images(marked_images(24))
        .apply(double_half_turn)
        .preserve_order(true)
        .build()
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(outputs.len(), 24);
    for (i, output) in outputs.iter().enumerate() {
        assert_eq!(output.index, i);
        assert_eq!(marker(output) as usize, i);
        assert_eq!((output.image.width(), output.image.height()), (16, 8));
    }
}

#[test]
fn test_unordered_outputs_keep_their_index() {
    let outputs = BatchBuilder::new()
        .images(marked_images(32))
        .apply(double_half_turn)
        .parallel(4)
        .unwrap()
        .preserve_order(false)
        .build()
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(outputs.len(), 32);
    let mut seen = vec![false; 32];
    for output in &outputs {
        assert_eq!(marker(output) as usize, output.index);
        seen[output.index] = true;
    }
    assert!(seen.into_iter().all(|s| s));
}

#[test]
fn test_factory_called_once_per_image() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    BatchBuilder::new()
        .images(marked_images(10))
        .apply(move |img| {
            counter.fetch_add(1, Ordering::SeqCst);
            OperationChain::new(img)
        })
        .parallel(2)
        .unwrap()
        .build()
        .unwrap()
        .execute()
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 10);
}

#[test]
fn test_execute_surfaces_first_failure() {
    let err = BatchBuilder::new()
        .images(marked_images(5))
        .apply(|img| {
            let index = img.pixel(0, 0)[0];
            let chain = OperationChain::new(img)?;
            if index >= 3 {
                chain.crop(100, 100, 4, 4)
            } else {
                Ok(chain)
            }
        })
        .parallel(2)
        .unwrap()
        .build()
        .unwrap()
        .execute()
        .unwrap_err();

    assert_eq!(err.batch_index(), Some(3));
    assert!(err.root().is_validation());
}

#[test]
fn test_caller_executor_survives_job() {
    let pool = Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap(),
    );
    let outputs = BatchBuilder::new()
        .images(marked_images(6))
        .apply(double_half_turn)
        .executor(Arc::clone(&pool))
        .build()
        .unwrap()
        .execute()
        .unwrap();
    assert_eq!(outputs.len(), 6);
    assert_eq!(Arc::strong_count(&pool), 1);
    assert_eq!(pool.install(|| 40 + 2), 42);
}

#[test]
fn test_oversized_step_fails_its_image_only() {
    let err = BatchBuilder::new()
        .images(marked_images(6))
        .apply(|img| {
            let index = img.pixel(0, 0)[0];
            let chain = OperationChain::new(img)?;
            if index == 4 {
                chain.resize_with(u32::MAX, u32::MAX, ResizeMode::Exact)
            } else {
                Ok(chain)
            }
        })
        .parallel(3)
        .unwrap()
        .build()
        .unwrap()
        .execute()
        .unwrap_err();

    assert_eq!(err.batch_index(), Some(4));
    assert!(err.root().is_validation());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_caller_executor_survives_async_job() {
    let pool = Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap(),
    );
    let outputs = BatchBuilder::new()
        .images(marked_images(8))
        .apply(double_half_turn)
        .executor(Arc::clone(&pool))
        .build()
        .unwrap()
        .execute_all_async()
        .await
        .unwrap();
    assert_eq!(outputs.len(), 8);

    // workers release their handle right after sending the result
    for _ in 0..200 {
        if Arc::strong_count(&pool) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(Arc::strong_count(&pool), 1);
    assert_eq!(pool.install(|| 40 + 2), 42);
}

#[test]
fn test_empty_batch() {
    let job = BatchBuilder::new()
        .apply(OperationChain::new)
        .build()
        .unwrap();
    assert!(job.is_empty());
    assert!(job.execute().unwrap().is_empty());
}

#[test]
fn test_builder_from_config() {
    let config = PipelineConfig::from_yaml_with_env(
        "batch:\n  strategy: fixed\n  threads: 2\n  preserve_order: true\n",
    )
    .unwrap();
    let job = BatchBuilder::new()
        .images(marked_images(4))
        .apply(double_half_turn)
        .from_config(&config.batch)
        .unwrap()
        .build()
        .unwrap();
    assert!(matches!(job.strategy(), ConcurrencyStrategy::FixedPool(n) if n.get() == 2));
    let outputs = job.execute().unwrap();
    assert!(outputs.iter().enumerate().all(|(i, o)| marker(o) as usize == i));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_execute_all_async_in_order() {
    let outputs = BatchBuilder::new()
        .images(marked_images(12))
        .apply(double_half_turn)
        .build()
        .unwrap()
        .execute_all_async()
        .await
        .unwrap();
    let markers: Vec<_> = outputs.iter().map(|o| marker(o) as usize).collect();
    assert_eq!(markers, (0..12).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_execute_all_async_unordered() {
    let outputs = BatchBuilder::new()
        .images(marked_images(12))
        .apply(double_half_turn)
        .parallel(3)
        .unwrap()
        .preserve_order(false)
        .build()
        .unwrap()
        .execute_all_async()
        .await
        .unwrap();
    let mut indices: Vec<_> = outputs.iter().map(|o| o.index).collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..12).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_async_failures_live_in_their_future() {
    let tasks = BatchBuilder::new()
        .images(marked_images(4))
        .apply(|img| {
            if img.pixel(0, 0)[0] == 2 {
                OperationChain::new(img)?.resize(0, 0)
            } else {
                OperationChain::new(img)
            }
        })
        .sequential()
        .build()
        .unwrap()
        .execute_async();

    assert_eq!(tasks.len(), 4);
    let results = futures::future::join_all(tasks).await;
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(output) => assert_ne!(i, 2, "image {} should have failed", output.index),
            Err(e) => {
                assert_eq!(i, 2);
                assert_eq!(e.batch_index(), Some(2));
                assert!(e.root().is_validation());
            }
        }
    }
}

#[test]
fn test_tasks_resolve_outside_a_runtime() {
    let tasks = BatchBuilder::new()
        .images(marked_images(3))
        .apply(double_half_turn)
        .parallel(2)
        .unwrap()
        .build()
        .unwrap()
        .execute_async();
    for (i, task) in tasks.into_iter().enumerate() {
        let output = tokio_test::block_on(task).unwrap();
        assert_eq!(marker(&output) as usize, i);
    }
}
