/// Integration-level tests for the `shared` crate.
///
/// Each section tests one module; unit tests that are tightly coupled to
/// private helpers live inside the modules themselves (see `#[cfg(test)]`
/// blocks in `jwt.rs`, `role.rs` and `server_config.rs`).
// ---------------------------------------------------------------------------
// Session claims
// ---------------------------------------------------------------------------
#[cfg(test)]
mod jwt_tests {
    use shared::types::*;

    fn sample_claims() -> SessionClaims {
        SessionClaims::new("alice@example.com", ["USER"], 1_700_000_000, 259_200)
    }

    #[test]
    fn claims_json_contains_expected_keys() {
        let json = serde_json::to_value(sample_claims()).unwrap();
        for key in &["sub", "roles", "iat", "exp"] {
            assert!(json.get(key).is_some(), "missing key: {}", key);
        }
    }

    #[test]
    fn roles_serialize_as_prefixed_strings() {
        let json = serde_json::to_value(sample_claims()).unwrap();
        assert_eq!(json["roles"], serde_json::json!(["ROLE_USER"]));
    }

    #[test]
    fn missing_roles_claim_deserializes_as_empty() {
        let json = r#"{"sub":"a@b.io","iat":1,"exp":2}"#;
        let c: SessionClaims = serde_json::from_str(json).unwrap();
        assert!(c.roles.is_empty());
    }

    #[test]
    fn blank_subject_counts_as_empty() {
        let mut c = sample_claims();
        c.sub = "   ".into();
        assert!(c.is_empty());
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[cfg(test)]
mod role_tests {
    use shared::types::*;

    #[test]
    fn role_serializes_upper_case() {
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "ADMIN");
    }

    #[test]
    fn unknown_role_message_names_the_input() {
        let err = "ROOT".parse::<Role>().unwrap_err();
        assert!(err.to_string().contains("ROOT"));
    }
}

// ---------------------------------------------------------------------------
// Login / register types
// ---------------------------------------------------------------------------

#[cfg(test)]
mod request_tests {
    use shared::types::*;

    #[test]
    fn login_data_deserializes() {
        let json = r#"{"email":"bob@example.com","password":"pass123"}"#;
        let d: LoginData = serde_json::from_str(json).unwrap();
        assert_eq!(d.email, "bob@example.com");
        assert_eq!(d.password, "pass123");
    }

    #[test]
    fn login_data_debug_redacts_password() {
        let json = r#"{"email":"bob@example.com","password":"hunter22"}"#;
        let d: LoginData = serde_json::from_str(json).unwrap();
        assert!(!format!("{:?}", d).contains("hunter22"));
    }

    #[test]
    fn registration_roles_default_to_empty() {
        let json = r#"{"email":"bob@example.com","password":"x"}"#;
        let d: RegistrationData = serde_json::from_str(json).unwrap();
        assert!(d.roles.is_empty());
    }

    #[test]
    fn registration_keeps_raw_role_names() {
        let json = r#"{"email":"b@e.com","password":"x","roles":["ADMIN","nope"]}"#;
        let d: RegistrationData = serde_json::from_str(json).unwrap();
        assert_eq!(d.roles, vec!["ADMIN", "nope"]);
    }

    #[test]
    fn token_response_serializes_token_field() {
        let json = serde_json::to_value(TokenResponse {
            token: "a.b.c".into(),
        })
        .unwrap();
        assert_eq!(json["token"], "a.b.c");
    }

    #[test]
    fn user_view_has_no_password_field() {
        let v = UserView {
            id: 7,
            email: "x@y.io".into(),
            roles: vec![Role::User],
        };
        let json = serde_json::to_value(&v).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["roles"], serde_json::json!(["USER"]));
    }
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

#[cfg(test)]
mod error_response_tests {
    use shared::types::ErrorResponse;

    #[test]
    fn optional_fields_are_omitted_when_unset() {
        let json = serde_json::to_value(ErrorResponse::new("NOT_FOUND", "gone")).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("path").is_none());
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn path_is_included_when_set() {
        let r = ErrorResponse::new("NOT_FOUND", "gone").with_path("/user/9");
        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json["path"], "/user/9");
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

#[cfg(test)]
mod config_tests {
    use std::io::Write;

    use shared::config::{load_config, parse_config};

    // 32 zero bytes, base64-encoded.
    const KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

    #[test]
    fn minimal_file_fills_defaults() {
        let cfg = parse_config(&format!("[auth]\nsecret_key = \"{}\"\n", KEY)).unwrap();
        assert_eq!(cfg.server.addr(), "127.0.0.1:8080");
        assert_eq!(cfg.auth.token_ttl_secs, 259_200);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(parse_config("   \n").is_err());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let toml = format!("[auth]\nsecret_key = \"{}\"\ntoken_ttl_secs = 0\n", KEY);
        let err = parse_config(&toml).unwrap_err();
        assert!(err.to_string().contains("token_ttl_secs"));
    }

    #[test]
    fn load_config_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 9090\n\n[auth]\nsecret_key = \"{}\"",
            KEY
        )
        .unwrap();

        let cfg = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9090);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(load_config("/definitely/not/here.toml").is_err());
    }
}
