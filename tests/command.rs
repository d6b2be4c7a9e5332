// tests/command.rs

use proptest::prelude::*;
use stayopen::errors::StayOpenError;
use stayopen::exec::{Command, CommandResult};

#[test]
fn argv_starts_with_executable_then_arguments_in_order() {
    let cmd = Command::builder("exiftool")
        .arg("-S")
        .args(["-Artist", "photo.jpg"])
        .build()
        .unwrap();

    assert_eq!(cmd.executable(), "exiftool");
    assert_eq!(cmd.arguments(), ["-S", "-Artist", "photo.jpg"]);
    assert_eq!(cmd.argv(), vec!["exiftool", "-S", "-Artist", "photo.jpg"]);
    assert_eq!(cmd.to_string(), "exiftool -S -Artist photo.jpg");
}

#[test]
fn blank_executable_is_rejected() {
    match Command::new("  ", ["-ver"]) {
        Err(StayOpenError::InvalidArgument(msg)) => assert!(msg.contains("executable")),
        other => panic!("expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn blank_argument_is_rejected() {
    match Command::new("exiftool", ["-S", " ", "file.jpg"]) {
        Err(StayOpenError::InvalidArgument(msg)) => assert!(msg.contains("#1")),
        other => panic!("expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn command_without_arguments_is_valid() {
    let cmd = Command::new("exiftool", Vec::<String>::new()).unwrap();
    assert!(cmd.arguments().is_empty());
    assert_eq!(cmd.argv(), vec!["exiftool"]);
}

#[test]
fn success_and_failure_are_exclusive() {
    let ok = CommandResult::new(0, "12.40");
    assert!(ok.is_success());
    assert!(!ok.is_failure());
    assert_eq!(ok.output(), "12.40");

    let failed = CommandResult::new(2, "");
    assert!(!failed.is_success());
    assert!(failed.is_failure());
    assert_eq!(failed.exit_status(), 2);
}

proptest! {
    #[test]
    fn arguments_round_trip_without_loss_or_reordering(
        executable in "[a-z/]{1,12}",
        arguments in proptest::collection::vec("[A-Za-z0-9:=._-]{1,16}", 0..12),
    ) {
        let cmd = Command::new(executable.clone(), arguments.clone()).unwrap();

        let argv: Vec<String> = cmd.argv().into_iter().map(str::to_string).collect();
        prop_assert_eq!(&argv[0], &executable);

        let rebuilt = Command::new(argv[0].clone(), argv[1..].to_vec()).unwrap();
        prop_assert_eq!(rebuilt.arguments(), arguments.as_slice());
        prop_assert_eq!(rebuilt, cmd);
    }
}
