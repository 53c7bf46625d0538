//! Tests for the validated configuration structs.

use super::*;

#[test]
fn default_configs_are_valid() {
    let pool = PoolConfig::default();
    assert_eq!(pool.worker_count, DEFAULT_WORKER_COUNT);
    assert_eq!(pool.library_path, BUILTIN_KERNEL_PATH);

    let builder = BuilderConfig::default();
    assert_eq!(builder.position_epsilon, POSITION_EPSILON);
}

#[test]
fn pool_config_validates_inputs() {
    assert_eq!(
        PoolConfig::new(0, BUILTIN_KERNEL_PATH).unwrap_err(),
        ConfigError::InvalidWorkerCount(0)
    );
    assert_eq!(
        PoolConfig::new(MAX_WORKER_COUNT + 1, BUILTIN_KERNEL_PATH).unwrap_err(),
        ConfigError::InvalidWorkerCount(MAX_WORKER_COUNT + 1)
    );
    assert_eq!(
        PoolConfig::new(2, "   ").unwrap_err(),
        ConfigError::EmptyLibraryPath
    );
}

#[test]
fn builder_config_rejects_bad_tolerance() {
    assert!(BuilderConfig::new(0.0).is_err());
    assert!(BuilderConfig::new(-1.0).is_err());
    assert!(BuilderConfig::new(f32::NAN).is_err());
    assert!(BuilderConfig::new(1.0e-4).is_ok());
}

#[test]
fn config_error_display() {
    let err = ConfigError::InvalidWorkerCount(0);
    assert!(err.to_string().contains("worker_count"));
}
