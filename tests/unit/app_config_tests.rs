/*!
 * Tests for configuration file handling
 */

use anyhow::Result;
use log::LevelFilter;

use docweave::app_config::{Config, LogLevel};
use docweave::pipeline::PipelineConfig;

use crate::common::{create_temp_dir, create_test_file};

/// Test loading a full configuration file from disk
#[test]
fn test_load_fullConfigFile_shouldReadEverySection() -> Result<()> {
    let temp_dir = create_temp_dir()?;
    let json = r#"{
        "source_language": "de",
        "target_language": "fre",
        "columns": { "epsilon": 18.0, "min_points": 2 },
        "anchoring": { "tolerance_pt": 1.5, "tolerance_pct": 0.02 },
        "segmentation": { "decode_after_merge": false },
        "log_level": "debug"
    }"#;
    let path = create_test_file(temp_dir.path(), "docweave.json", json)?;

    let config = Config::load(&path)?;

    assert_eq!(config.source_language, "de");
    assert_eq!(config.target_language, "fre");
    assert_eq!(config.columns.epsilon, 18.0);
    assert_eq!(config.columns.min_points, 2);
    assert_eq!(config.anchoring.tolerance_pt, 1.5);
    assert!(!config.segmentation.decode_after_merge);
    assert_eq!(config.log_level.to_level_filter(), LevelFilter::Debug);
    assert!(config.validate().is_ok());
    Ok(())
}

/// Test that a broken file reports which file failed
#[test]
fn test_load_malformedJson_shouldNameFile() -> Result<()> {
    let temp_dir = create_temp_dir()?;
    let path = create_test_file(temp_dir.path(), "broken.json", "{ \"columns\": ")?;

    let err = Config::load(&path).unwrap_err();

    assert!(format!("{:#}", err).contains("Failed to parse config file"));
    assert!(format!("{:#}", err).contains("broken.json"));
    Ok(())
}

#[test]
fn test_load_missingFile_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    assert!(Config::load(&temp_dir.path().join("absent.json")).is_err());
}

#[test]
fn test_save_thenLoad_shouldKeepValues() -> Result<()> {
    let temp_dir = create_temp_dir()?;
    let path = temp_dir.path().join("saved.json");
    let mut config = Config::default();
    config.target_language = "it".to_string();
    config.log_level = LogLevel::Trace;

    config.save(&path)?;
    let loaded = Config::load(&path)?;

    assert_eq!(loaded, config);
    Ok(())
}

#[test]
fn test_pipelineConfig_fromConfig_shouldCopySettings() {
    let mut config = Config::default();
    config.source_language = "es".to_string();
    config.columns.epsilon = 12.0;
    config.anchoring.tolerance_pct = 0.05;
    config.segmentation.decode_after_merge = false;

    let pipeline_config = PipelineConfig::from(&config);

    assert_eq!(pipeline_config.source_language, "es");
    assert_eq!(pipeline_config.target_language, "fr");
    assert_eq!(pipeline_config.epsilon, 12.0);
    assert_eq!(pipeline_config.min_points, 3);
    assert_eq!(pipeline_config.tolerance_pct, 0.05);
    assert!(!pipeline_config.decode_after_merge);
}
