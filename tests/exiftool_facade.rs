// tests/exiftool_facade.rs

mod common;
use crate::common::{args, init_tracing, TestResult};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stayopen::errors::StayOpenError;
use stayopen::exec::CommandExecutor;
use stayopen::exiftool::{ExifTool, ExifToolBuilder, Tag, WriteOptions};
use stayopen::types::ReadFormat;
use stayopen::version::{Version, VersionCache};
use stayopen_test_utils::{FakeExecutor, VersionReply};
use tempfile::TempDir;

const DELAY: Duration = Duration::from_secs(60);

/// An empty "image" the facade will accept as an existing file.
fn image(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"").unwrap();
    path
}

fn builder(executor: &Arc<FakeExecutor>) -> ExifToolBuilder {
    ExifTool::builder()
        .with_path("exiftool")
        .with_executor(Arc::clone(executor) as Arc<dyn CommandExecutor>)
        .with_version_cache(Arc::new(VersionCache::new()))
}

#[tokio::test]
async fn reads_requested_tags_with_one_shot() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let file = image(&dir, "a.jpg");

    let executor = Arc::new(FakeExecutor::new().with_response([
        "ApertureValue: 2.8",
        "Title: Sunset: over the bay",
        "ThumbnailImage: (binary)",
    ]));
    let tool = builder(&executor).build().await?;
    assert_eq!(tool.version(), Some(Version::new(12, 40, 0)));

    let values = tool.get_image_meta(&file, &[Tag::Aperture, Tag::Title]).await?;

    let expected = BTreeMap::from([
        (Tag::Aperture, "2.8".to_string()),
        (Tag::Title, "Sunset: over the bay".to_string()),
    ]);
    assert_eq!(values, expected);

    let file_arg = file.to_str().unwrap();
    assert_eq!(
        executor.stats().requests(),
        vec![args(&["-n", "-S", "-ApertureValue", "-Title", file_arg])]
    );
    assert!(!tool.is_running());
    Ok(())
}

#[tokio::test]
async fn reads_through_a_stay_open_daemon() -> TestResult {
    let dir = TempDir::new()?;
    let first = image(&dir, "a.jpg");
    let second = image(&dir, "b.jpg");

    let executor = Arc::new(FakeExecutor::new().with_response(["Orientation: Rotate 90 CW"]));
    let tool = builder(&executor)
        .enable_stay_open(DELAY)
        .with_format(ReadFormat::HumanReadable)
        .build()
        .await?;

    for file in [&first, &second] {
        let values = tool.get_image_meta(file, &[Tag::Orientation]).await?;
        assert_eq!(values.get(&Tag::Orientation).map(String::as_str), Some("Rotate 90 CW"));
    }
    assert!(tool.is_running());

    let stats = executor.stats();
    assert_eq!(stats.starts(), 1);
    assert_eq!(stats.requests()[0], args(&["-S", "-Orientation", first.to_str().unwrap()]));

    tool.close().await?;
    assert!(!tool.is_running());
    Ok(())
}

#[tokio::test]
async fn writes_tag_assignments() -> TestResult {
    let dir = TempDir::new()?;
    let file = image(&dir, "c.jpg");

    let executor = Arc::new(FakeExecutor::new().with_response(["    1 image files updated"]));
    let tool = builder(&executor).with_pool(2, DELAY).build().await?;

    let values = BTreeMap::from([
        (Tag::Title, "Harbour".to_string()),
        (Tag::Artist, "Jane Doe".to_string()),
    ]);
    tool.set_image_meta(&file, &values, WriteOptions { overwrite_original: true })
        .await?;

    assert_eq!(
        executor.stats().requests(),
        vec![args(&[
            "-overwrite_original",
            "-Artist=Jane Doe",
            "-Title=Harbour",
            file.to_str().unwrap(),
        ])]
    );

    tool.close().await?;
    Ok(())
}

#[tokio::test]
async fn invalid_inputs_are_rejected_before_running() -> TestResult {
    let dir = TempDir::new()?;
    let file = image(&dir, "d.jpg");

    let executor = Arc::new(FakeExecutor::new());
    let tool = builder(&executor).build().await?;

    let missing = dir.path().join("missing.jpg");
    assert!(matches!(
        tool.get_image_meta(&missing, &[Tag::Title]).await,
        Err(StayOpenError::InvalidArgument(_))
    ));
    assert!(matches!(
        tool.get_image_meta(dir.path(), &[Tag::Title]).await,
        Err(StayOpenError::InvalidArgument(_))
    ));
    assert!(matches!(
        tool.get_image_meta(&file, &[]).await,
        Err(StayOpenError::InvalidArgument(_))
    ));
    assert!(matches!(
        tool.set_image_meta(&file, &BTreeMap::new(), WriteOptions::default()).await,
        Err(StayOpenError::InvalidArgument(_))
    ));

    assert!(executor.stats().requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn old_tool_cannot_stay_open() {
    let executor = Arc::new(FakeExecutor::new().with_version("8.00"));

    let result = builder(&executor).enable_stay_open(DELAY).build().await;
    match result {
        Err(StayOpenError::UnsupportedCapability { detected, .. }) => {
            assert_eq!(detected, Some(Version::new(8, 0, 0)));
        }
        other => panic!("expected UnsupportedCapability, got {:?}", other),
    }
    assert_eq!(executor.stats().starts(), 0);

    // One-shot mode still works with the same tool.
    assert!(builder(&executor).build().await.is_ok());
}

#[tokio::test]
async fn missing_tool_fails_the_build() {
    let executor = Arc::new(FakeExecutor::new().with_version_reply(VersionReply::NotFound));

    assert!(matches!(
        builder(&executor).build().await,
        Err(StayOpenError::ProcessNotFound { .. })
    ));
}

#[test]
fn tags_parse_case_insensitively() {
    assert_eq!("iso".parse::<Tag>().unwrap(), Tag::Iso);
    assert_eq!("GPSLatitude".parse::<Tag>().unwrap(), Tag::GpsLatitude);
    assert_eq!(Tag::Description.to_string(), "ImageDescription");
    assert!(matches!(
        "NoSuchTag".parse::<Tag>(),
        Err(StayOpenError::InvalidArgument(_))
    ));
    assert!(Tag::ALL.contains(&Tag::Title));
}
