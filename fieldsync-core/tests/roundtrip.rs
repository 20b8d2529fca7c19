//! Serde roundtrips for the documents fieldsync persists or exchanges.

use fieldsync_core::{Credential, Settings};

fn sample_settings() -> Settings {
    Settings {
        version: 1,
        portal_url: "https://maps.example.com".to_string(),
        feature_layer_url: "https://maps.example.com/arcgis/rest/services/Survey/FeatureServer/0"
            .to_string(),
        referer: "https://maps.example.com/Uploads/".to_string(),
        user_id: "surveyor01".to_string(),
        read_username: "surveyor01".to_string(),
        write_username: "editor01".to_string(),
        role_cookie: "AGS_ROLES".to_string(),
        token_lifetime_minutes: 60,
    }
}

#[test]
fn settings_yaml_roundtrip() {
    let settings = sample_settings();
    let yaml = serde_yaml::to_string(&settings).expect("serialize");
    let deserialized: Settings = serde_yaml::from_str(&yaml).expect("deserialize");
    assert_eq!(settings, deserialized);
}

#[test]
fn credential_uses_the_wire_field_names() {
    let credential = Credential {
        token: "tok".to_string(),
        expires_at_ms: 1_700_000_000_000,
        session_cookie: "role".to_string(),
    };
    let json = serde_json::to_string(&credential).expect("serialize");
    assert!(json.contains("\"expires\":1700000000000"));
    assert!(json.contains("\"cookie\":\"role\""));

    let deserialized: Credential = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(credential, deserialized);
}
