//! Settings validation — rejects a document that would put the engine in
//! an inconsistent state before it is ever swapped in.

use super::Settings;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {0}: {1}")]
    Io(String, String),
    #[error("failed to parse settings file {0}: {1}")]
    Parse(String, String),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

pub fn validate(settings: &Settings) -> Result<(), SettingsError> {
    let t = &settings.thresholds;
    if !(0.0..=1.0).contains(&t.min_confidence_for_notify) {
        return Err(SettingsError::Invalid(
            "thresholds.min_confidence_for_notify must be in [0,1]".into(),
        ));
    }
    if !(1..=5).contains(&t.high_severity_threshold) {
        return Err(SettingsError::Invalid(
            "thresholds.high_severity_threshold must be in 1..=5".into(),
        ));
    }
    if settings.incident_grouping.dedup_window_seconds < 0
        || settings.incident_grouping.merge_window_seconds < 0
    {
        return Err(SettingsError::Invalid(
            "incident_grouping windows must be non-negative".into(),
        ));
    }
    if settings.incident_grouping.dedup_window_seconds
        > settings.incident_grouping.merge_window_seconds
    {
        return Err(SettingsError::Invalid(
            "dedup_window_seconds must not exceed merge_window_seconds".into(),
        ));
    }
    if settings.api.port == 0 {
        return Err(SettingsError::Invalid("api.port must be nonzero".into()));
    }
    Ok(())
}
