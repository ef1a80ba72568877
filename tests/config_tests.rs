use std::{env, path::PathBuf, time::Duration};

use perf_baseline::config::{
    DEFAULT_STORE_FILE, ENV_FILE, ENV_LOCK_TIMEOUT_MS, ENV_THRESHOLD,
};
use perf_baseline::{BaselineConfig, BaselineError, DEFAULT_THRESHOLD, TimerConfig};

#[test]
fn test_defaults() {
    let config = BaselineConfig::default();
    assert_eq!(config.path, PathBuf::from(DEFAULT_STORE_FILE));
    assert_eq!(config.threshold, DEFAULT_THRESHOLD);
    assert_eq!(config.threshold, 1.5);
    assert_eq!(config.lock_timeout, Duration::from_secs(10));
    assert_eq!(config.timer, TimerConfig::default());
    assert!(config.validate().is_ok());
}

#[test]
fn test_builders() {
    let timer = TimerConfig {
        min_sample_time: Duration::from_millis(5),
        repeat: 3,
        max_loops: 1_000,
    };
    let config = BaselineConfig::new("target/bench.baseline")
        .with_threshold(2.5)
        .with_lock_timeout(Duration::from_millis(250))
        .with_timer(timer.clone())
        .with_path("elsewhere.baseline");
    assert_eq!(config.path, PathBuf::from("elsewhere.baseline"));
    assert_eq!(config.threshold, 2.5);
    assert_eq!(config.store_options().lock_timeout, Duration::from_millis(250));
    assert_eq!(config.timer, timer);
}

#[test]
fn test_validate_rejects_bad_values() {
    let bad = [
        BaselineConfig::default().with_threshold(0.0),
        BaselineConfig::default().with_threshold(-1.0),
        BaselineConfig::default().with_threshold(f64::INFINITY),
        BaselineConfig::new(""),
        BaselineConfig::default().with_timer(TimerConfig {
            repeat: 0,
            ..TimerConfig::default()
        }),
        BaselineConfig::default().with_timer(TimerConfig {
            max_loops: 0,
            ..TimerConfig::default()
        }),
    ];
    for config in bad {
        assert!(
            matches!(config.validate(), Err(BaselineError::Configuration(_))),
            "{config:?}"
        );
    }
    // Permissive but legal.
    assert!(BaselineConfig::default().with_threshold(0.8).validate().is_ok());
}

// All environment mutation lives in this one test; the variables are process-wide.
#[test]
fn test_environment_overrides() {
    // SAFETY: no other test in this binary reads or writes these variables.
    unsafe {
        env::set_var(ENV_FILE, "from-env.baseline");
        env::set_var(ENV_THRESHOLD, " 2.25 ");
        env::set_var(ENV_LOCK_TIMEOUT_MS, "1500");
    }
    let config = BaselineConfig::from_env().unwrap();
    assert_eq!(config.path, PathBuf::from("from-env.baseline"));
    assert_eq!(config.threshold, 2.25);
    assert_eq!(config.lock_timeout, Duration::from_millis(1500));

    let explicit = BaselineConfig::new("explicit.baseline").apply_env().unwrap();
    assert_eq!(explicit.path, PathBuf::from("from-env.baseline"));

    unsafe {
        env::set_var(ENV_THRESHOLD, "fast");
    }
    let err = BaselineConfig::from_env().unwrap_err();
    assert!(err.to_string().contains(ENV_THRESHOLD), "{err}");
    let store_only = BaselineConfig::default().apply_store_env().unwrap();
    assert_eq!(store_only.path, PathBuf::from("from-env.baseline"));
    assert_eq!(store_only.threshold, DEFAULT_THRESHOLD);

    unsafe {
        env::set_var(ENV_THRESHOLD, "");
        env::set_var(ENV_LOCK_TIMEOUT_MS, "-3");
    }
    assert!(BaselineConfig::from_env().is_err());

    unsafe {
        env::remove_var(ENV_FILE);
        env::remove_var(ENV_THRESHOLD);
        env::remove_var(ENV_LOCK_TIMEOUT_MS);
    }
    assert_eq!(BaselineConfig::from_env().unwrap(), BaselineConfig::default());
}
