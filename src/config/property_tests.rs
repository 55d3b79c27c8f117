//! Property-based tests for configuration module
//!
//! Generated valid configurations must validate and survive a TOML round
//! trip; out-of-range timeouts must always be rejected.

use super::*;
use proptest::prelude::*;

prop_compose! {
    fn valid_render_config()(
        wake_timeout_ms in 1u64..=10_000,
        vsync in any::<bool>(),
    ) -> RenderConfig {
        RenderConfig { wake_timeout_ms, vsync }
    }
}

prop_compose! {
    fn valid_window_config()(
        x in -10_000i32..10_000,
        y in -10_000i32..10_000,
        title in "[a-zA-Z0-9 ]{0,64}",
        class_prefix in "[A-Za-z][A-Za-z0-9_]{0,31}",
    ) -> WindowConfig {
        WindowConfig { x, y, title, class_prefix }
    }
}

prop_compose! {
    fn valid_logging_config()(
        level in prop_oneof![
            Just("trace".to_string()),
            Just("debug".to_string()),
            Just("info".to_string()),
            Just("warn".to_string()),
            Just("error".to_string()),
            Just("off".to_string()),
        ],
        file in proptest::option::of("[a-z]{1,12}\\.log"),
    ) -> LoggingConfig {
        LoggingConfig { level, file: file.map(PathBuf::from) }
    }
}

prop_compose! {
    fn valid_config()(
        render in valid_render_config(),
        window in valid_window_config(),
        logging in valid_logging_config(),
    ) -> MultiWindowConfig {
        MultiWindowConfig { render, window, logging }
    }
}

proptest! {
    #[test]
    fn prop_generated_configs_validate(config in valid_config()) {
        prop_assert!(config.validate().is_ok());
    }

    #[test]
    fn prop_toml_preserves_config(config in valid_config()) {
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: MultiWindowConfig = toml::from_str(&text).unwrap();
        prop_assert_eq!(parsed, config);
    }

    #[test]
    fn prop_timeout_outside_range_rejected(timeout in prop_oneof![Just(0u64), 10_001u64..u64::MAX / 2]) {
        let mut config = MultiWindowConfig::default();
        config.render.wake_timeout_ms = timeout;
        prop_assert!(config.validate().is_err());
    }
}
