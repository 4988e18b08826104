//! Built-in default settings, matching the values documented in spec.md §4.1.

use std::collections::{BTreeMap, BTreeSet};

use super::{
    ApiConfig, EvidenceConfig, IncidentGroupingConfig, LlmConfig, LoggingConfig, Settings,
    ThresholdsConfig,
};

pub fn default_settings() -> Settings {
    let mut compatible_event_types = BTreeMap::new();
    compatible_event_types.insert(
        "person_detected".to_string(),
        BTreeSet::from(["loitering".to_string(), "person_detected".to_string()]),
    );
    compatible_event_types.insert(
        "loitering".to_string(),
        BTreeSet::from(["person_detected".to_string(), "loitering".to_string()]),
    );
    compatible_event_types.insert(
        "vehicle_detected".to_string(),
        BTreeSet::from([
            "plate_mismatch".to_string(),
            "red_light".to_string(),
            "vehicle_detected".to_string(),
        ]),
    );
    compatible_event_types.insert(
        "plate_mismatch".to_string(),
        BTreeSet::from(["vehicle_detected".to_string(), "plate_mismatch".to_string()]),
    );
    compatible_event_types.insert(
        "red_light".to_string(),
        BTreeSet::from(["vehicle_detected".to_string(), "red_light".to_string()]),
    );

    Settings {
        incident_grouping: IncidentGroupingConfig {
            dedup_window_seconds: 30,
            merge_window_seconds: 300,
            compatible_event_types,
        },
        thresholds: ThresholdsConfig {
            min_confidence_for_notify: 0.75,
            high_severity_threshold: 4,
            watchlist_match_confidence: 0.80,
            plate_mismatch_confidence: 0.80,
            red_light_confidence: 0.70,
        },
        api: ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_seconds: 30,
        },
        evidence: EvidenceConfig {
            retention_days: 30,
        },
        llm: LlmConfig {
            enabled: false,
            timeout_seconds: 3,
            api_base: None,
            model: None,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}
