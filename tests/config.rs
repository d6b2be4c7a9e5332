// tests/config.rs

use std::fs;
use std::time::Duration;

use stayopen::config::{load_and_validate, load_or_default, ConfigFile};
use stayopen::errors::StayOpenError;
use stayopen::strategy::{StrategyKind, DEFAULT_CLEANUP_DELAY};
use stayopen::types::ReadFormat;
use stayopen_test_utils::RawConfigBuilder;
use tempfile::tempdir;

#[test]
fn full_file_is_loaded() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Stayopen.toml");
    fs::write(
        &path,
        r#"
[exiftool]
path = "/opt/exiftool/exiftool"
pool_size = 3
cleanup_delay = "30s"

[read]
format = "human_readable"
"#,
    )
    .unwrap();

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.path(), "/opt/exiftool/exiftool");
    assert_eq!(
        cfg.strategy(),
        StrategyKind::Pool {
            size: 3,
            cleanup_delay: Duration::from_secs(30)
        }
    );
    assert_eq!(cfg.format(), ReadFormat::HumanReadable);
}

#[test]
fn empty_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.toml");
    fs::write(&path, "").unwrap();

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.strategy(), StrategyKind::OneShot);
    assert_eq!(cfg.format(), ReadFormat::Numeric);
    assert!(!cfg.path().is_empty());
}

#[test]
fn stay_open_uses_default_delay() {
    let cfg = RawConfigBuilder::new().path("exiftool").stay_open(true).build();
    assert_eq!(
        cfg.strategy(),
        StrategyKind::StayOpen {
            cleanup_delay: DEFAULT_CLEANUP_DELAY
        }
    );
    assert_eq!(DEFAULT_CLEANUP_DELAY, Duration::from_secs(600));
}

#[test]
fn pool_of_one_is_a_single_daemon() {
    let cfg = RawConfigBuilder::new()
        .path("exiftool")
        .pool_size(1)
        .cleanup_delay("250ms")
        .build();
    assert_eq!(
        cfg.strategy(),
        StrategyKind::StayOpen {
            cleanup_delay: Duration::from_millis(250)
        }
    );
}

#[test]
fn invalid_values_are_config_errors() {
    let cases = [
        RawConfigBuilder::new().path("   "),
        RawConfigBuilder::new().pool_size(0),
        RawConfigBuilder::new().stay_open(true).cleanup_delay("0s"),
        RawConfigBuilder::new().stay_open(true).cleanup_delay("ten minutes"),
        RawConfigBuilder::new().stay_open(true).cleanup_delay("10d"),
    ];

    for builder in cases {
        let raw = builder.raw();
        let described = format!("{raw:?}");
        match ConfigFile::try_from(raw) {
            Err(StayOpenError::ConfigError(_)) => {}
            other => panic!("expected ConfigError for {described}, got {other:?}"),
        }
    }
}

#[test]
fn malformed_toml_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[exiftool\npath = 1").unwrap();

    assert!(matches!(
        load_and_validate(&path),
        Err(StayOpenError::TomlError(_))
    ));
}

#[test]
fn unknown_format_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("format.toml");
    fs::write(&path, "[read]\nformat = \"binary\"\n").unwrap();

    assert!(matches!(
        load_and_validate(&path),
        Err(StayOpenError::TomlError(_))
    ));
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    assert!(matches!(
        load_or_default(Some(missing.as_path())),
        Err(StayOpenError::ConfigError(_))
    ));
}

#[test]
fn read_format_parses_aliases() {
    assert_eq!("numeric".parse::<ReadFormat>(), Ok(ReadFormat::Numeric));
    assert_eq!("Human".parse::<ReadFormat>(), Ok(ReadFormat::HumanReadable));
    assert_eq!(" human_readable ".parse::<ReadFormat>(), Ok(ReadFormat::HumanReadable));
    assert!("raw".parse::<ReadFormat>().is_err());
    assert_eq!(ReadFormat::Numeric.arguments(), ["-n"]);
    assert!(ReadFormat::HumanReadable.arguments().is_empty());
}

#[test]
fn delays_accept_common_units() {
    use stayopen::types::parse_duration;

    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
    assert_eq!(parse_duration(" 10M "), Ok(Duration::from_secs(600)));
    assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("15").is_err());
    assert!(parse_duration("s").is_err());
}
