//! # Configuration Tests Module
//!
//! Layout files, environment configuration and their validation.

#[cfg(test)]
mod tests {
    use eeo_digitizer::observability_config::presets;
    use eeo_digitizer::{
        DigitizerError, EngineConfig, FormCell, FormDigitizer, FormLayout, FormType,
        OcrDocument, RowPitch,
    };
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test loading a custom layout from a JSON file
    #[test]
    fn test_layout_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "form_type": "eeo5",
                "sections": [
                    {{"key": "b", "rows": 3, "cols": 15, "row_pitch": "derived"}},
                    {{"key": "c", "rows": 6, "cols": 15, "padding_px": 30, "row_pitch": {{"fixed": 28}}}}
                ]
            }}"#
        )
        .unwrap();

        let layout = FormLayout::from_file(file.path()).unwrap();
        assert_eq!(layout.form_type, FormType::Eeo5);
        assert_eq!(layout.section("b").unwrap().padding_px, 45);
        let c = layout.section("c").unwrap();
        assert_eq!(c.padding_px, 30);
        assert_eq!(c.row_pitch, RowPitch::Fixed(28));
        assert!(matches!(layout.section("a1"), Err(DigitizerError::Config(_))));
    }

    /// Test that invalid layouts are configuration errors
    #[test]
    fn test_invalid_layouts_rejected() {
        let empty = r#"{"form_type": "eeo1", "sections": []}"#;
        assert!(matches!(
            FormLayout::from_json_str(empty),
            Err(DigitizerError::Config(_))
        ));

        let zero_rows =
            r#"{"form_type": "eeo1", "sections": [{"key": "h", "rows": 0, "cols": 15, "row_pitch": "derived"}]}"#;
        assert!(FormLayout::from_json_str(zero_rows).is_err());

        let missing = std::path::Path::new("/nonexistent/layout.json");
        assert!(matches!(
            FormLayout::from_file(missing),
            Err(DigitizerError::Config(_))
        ));
    }

    /// Test that a section missing from a custom layout is skipped, not fatal
    #[test]
    fn test_section_missing_from_layout_is_skipped() {
        let layout = FormLayout::from_json_str(
            r#"{"form_type": "eeo1", "sections": [{"key": "g", "rows": 2, "cols": 3, "row_pitch": {"fixed": 25}}]}"#,
        )
        .unwrap();
        let digitizer = FormDigitizer::new(EngineConfig::default(), layout).unwrap();

        let result = digitizer.process_form(
            "acme",
            &[FormCell::new("acme_section_h_TABLE", OcrDocument::default())],
        );

        assert!(result.records.is_empty());
        assert_eq!(result.summary().skipped_sections, 1);
        assert!(result.diagnostics.events()[0]
            .to_string()
            .starts_with("sect invalid: h"));
    }

    /// Test environment overrides and their validation
    #[test]
    fn test_engine_config_from_env() {
        std::env::set_var("EEO_CORRECTION_THRESHOLD", "0.65");
        std::env::set_var("EEO_ROW_PITCH_PX", "27");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.grid.low_confidence_correction_threshold, 0.65);
        assert_eq!(config.grid.eeo1_row_pitch_px, 27);
        assert!(config.validate().is_ok());

        std::env::set_var("EEO_ROW_PITCH_PX", "wide");
        assert!(matches!(
            EngineConfig::from_env(),
            Err(DigitizerError::Config(_))
        ));

        std::env::remove_var("EEO_CORRECTION_THRESHOLD");
        std::env::remove_var("EEO_ROW_PITCH_PX");
    }

    /// Test that invalid thresholds are rejected when building a digitizer
    #[test]
    fn test_invalid_thresholds_rejected() {
        let mut config = EngineConfig::default();
        config.grid.confidence_threshold = 1.5;
        assert!(FormDigitizer::for_form(FormType::Eeo1, config).is_err());

        let mut config = EngineConfig::default();
        config.observability = presets::production();
        assert!(FormDigitizer::for_form(FormType::Eeo5, config).is_ok());

        assert_eq!("EEO5".parse::<FormType>().unwrap(), FormType::Eeo5);
        assert!("eeo4".parse::<FormType>().is_err());
    }
}
