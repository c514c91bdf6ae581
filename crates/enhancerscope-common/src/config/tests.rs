#[cfg(test)]
mod tests {
    use super::super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_match_dashboard_layout() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8501);
        assert!(config.server.enable_xsrf_protection);
        assert!(!config.server.enable_cors);
        assert_eq!(config.figure.track_height_px, 120);
        assert_eq!(config.figure.min_height_px, 500);
        assert_eq!(
            config.imaging.priority,
            vec![ExperimentKind::Lightsheet, ExperimentKind::Epi]
        );
        assert_eq!(config.export.format, ExportFormat::Csv);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_file_parses_and_validates() {
        let config = AppConfig::from_toml(include_str!("../../../../enhancerscope.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.data.accessibility_pattern, r"^part.*\.csv$");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9000
            enable_cors = true

            [data]
            dir = "/srv/enhancers"
            allow_missing_metadata = true

            [imaging]
            priority = ["epi", "stpt"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.server.enable_cors);
        assert!(config.data.allow_missing_metadata);
        assert_eq!(
            config.data.metadata_path(),
            PathBuf::from("/srv/enhancers/Enhancer_and_experiment_metadata.feather")
        );
        assert_eq!(config.imaging.priority, vec![ExperimentKind::Epi, ExperimentKind::Stpt]);
        assert_eq!(config.figure.peak_quantile, 0.8);
    }

    #[test]
    fn test_unknown_modality_is_rejected() {
        let err = AppConfig::from_toml("[imaging]\npriority = [\"confocal\"]\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.data.accessibility_pattern = "part(".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.imaging.priority = vec![ExperimentKind::Epi, ExperimentKind::Epi];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.figure.peak_quantile = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.server.host = "localhost:80".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_path_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("enhancerscope.yaml");
        std::fs::File::create(&yaml)
            .unwrap()
            .write_all(b"server:\n  port: 8600\nexport:\n  format: tsv\n")
            .unwrap();
        let config = AppConfig::from_path(&yaml).unwrap();
        assert_eq!(config.server.port, 8600);
        assert_eq!(config.export.format, ExportFormat::Tsv);
        assert_eq!(config.export.preview_rows, 100);

        let json = dir.path().join("enhancerscope.json");
        std::fs::write(&json, r#"{"figure": {"track_height_px": 80}}"#).unwrap();
        let config = AppConfig::from_path(&json).unwrap();
        assert_eq!(config.figure.track_height_px, 80);

        let ini = dir.path().join("enhancerscope.ini");
        std::fs::write(&ini, "port=1").unwrap();
        assert!(matches!(AppConfig::from_path(&ini), Err(ConfigError::UnsupportedFormat(_))));

        let missing = dir.path().join("absent.toml");
        assert!(matches!(AppConfig::from_path(&missing), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        let back = AppConfig::from_toml(&text).unwrap();
        assert_eq!(back.server.port, config.server.port);
        assert_eq!(back.data.accessibility_pattern, config.data.accessibility_pattern);
    }
}
