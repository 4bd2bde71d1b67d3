//! Unit tests for VmError and ErrorKind

use core_types::{ErrorKind, StackFrame, VmError};

#[test]
fn test_runtime_error_is_recoverable() {
    let error = VmError::runtime("Variable \"x\" does not exist.");
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert!(!error.is_fatal());
}

#[test]
fn test_fatal_error() {
    let error = VmError::fatal("Frame overflow. (Count 64 / 64)");
    assert!(error.is_fatal());
    assert_eq!(error.to_string(), "Frame overflow. (Count 64 / 64)");
}

#[test]
fn test_load_absent() {
    let error = VmError::load_absent("Code for the object class \"Ring\" does not exist!");
    assert_eq!(error.kind, ErrorKind::LoadAbsent);
}

#[test]
fn test_error_is_std_error() {
    fn takes_error(_: &dyn std::error::Error) {}
    takes_error(&VmError::runtime("x"));
}

#[test]
fn test_stack_frames_display() {
    let error = VmError::runtime("boom").with_stack(vec![
        StackFrame::new("top-level function", "Main", Some(1)),
        StackFrame::new("method Player::Hurt", "Player", Some(14)),
    ]);
    let lines: Vec<String> = error.stack.iter().map(|f| f.to_string()).collect();
    assert_eq!(lines[1], "called method Player::Hurt of Player on Line 14");
}
