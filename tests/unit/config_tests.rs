// Configuration loading feeding chains and batches

use rasterchain::chain::OperationChain;
use rasterchain::config::{ConfigError, LogFormat, PipelineConfig, StrategyKind};
use rasterchain::raster::{Color, Dimensions, PixelLayout, RasterImage};
use rasterchain::transform::{Quality, ResizeMode};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_defaults_seed_chain_resize_mode() {
    let config = PipelineConfig::from_yaml_with_env("defaults:\n  mode: exact\n").unwrap();
    assert_eq!(config.defaults.quality, Quality::High);

    let out = OperationChain::new(RasterImage::filled(
        200,
        100,
        PixelLayout::Rgb8,
        Color::white(),
    ))
    .unwrap()
    .with_defaults(config.defaults)
    .resize(150, 150)
    .unwrap()
    .build()
    .unwrap();
    assert_eq!(out.dimensions(), Dimensions::new(150, 150));
}

#[test]
fn test_full_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "defaults:\n  mode: automatic\n  quality: ultra\nbatch:\n  strategy: elastic\nlogging:\n  level: warn\n  format: pretty\n"
    )
    .unwrap();

    let config = PipelineConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.defaults.mode, ResizeMode::Automatic);
    assert_eq!(config.defaults.quality, Quality::Ultra);
    assert_eq!(config.batch.strategy, StrategyKind::Elastic);
    assert!(config.batch.preserve_order);
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_invalid_yaml_is_parse_error() {
    let err = PipelineConfig::from_yaml_with_env("batch: [unclosed").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_unknown_strategy_rejected() {
    let err = PipelineConfig::from_yaml_with_env("batch:\n  strategy: forkjoin\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
