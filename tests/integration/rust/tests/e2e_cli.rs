//! End-to-end tests through the CLI library
//!
//! Bytecode is written to a temporary directory and driven through
//! `hatch_cli::run` exactly as the binary does.

use std::fs;

use bytecode_system::{Chunk, ClassMap, FunctionProto, OpCode};
use clap::Parser as ClapParser;
use core_types::{filename_hash, hash_name};
use hatch_cli::{run, Cli, CliError};
use integration_tests::{container, entry};
use tempfile::TempDir;

/// Parse arguments the way the binary does
fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["hatch-vm"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

/// Objects.hcm plus one file defining class `Enemy`
fn write_objects(dir: &TempDir) {
    let file = filename_hash("Objects/Enemy");

    let mut main = Chunk::new();
    main.emit_class("Enemy", false);
    main.emit_named(OpCode::DefineGlobal, "Enemy");
    main.emit_op(OpCode::Null);
    main.emit_op(OpCode::Return);

    let mut map = ClassMap::new();
    map.insert(hash_name("Enemy"), file);
    fs::write(dir.path().join("Objects.hcm"), map.to_bytes()).unwrap();
    fs::write(
        dir.path().join(format!("{:08X}.ibc", file)),
        container(vec![entry(main)], &["Enemy"]),
    )
    .unwrap();
}

fn importer() -> Vec<u8> {
    let mut main = Chunk::new();
    let name = main.add_constant("Enemy");
    main.emit_op(OpCode::Import);
    main.emit_u32(name);
    main.emit_op(OpCode::Null);
    main.emit_op(OpCode::Return);
    container(vec![FunctionProto::new(0, 0, main)], &[])
}

#[test]
fn test_run_file_that_imports_from_directory() {
    let dir = TempDir::new().unwrap();
    write_objects(&dir);
    let script = dir.path().join("Boot.ibc");
    fs::write(&script, importer()).unwrap();

    let output = run(&parse(&[
        "--dir",
        dir.path().to_str().unwrap(),
        script.to_str().unwrap(),
        "--gc-stats",
    ]))
    .unwrap();
    assert!(output.contains("Collections: 1"));
}

#[test]
fn test_import_without_directory_fails() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("Boot.ibc");
    fs::write(&script, importer()).unwrap();

    let err = run(&parse(&[script.to_str().unwrap()])).unwrap_err();
    assert!(matches!(err, CliError::Registry(_)));
    assert!(err.to_string().contains("Could not import \"Enemy\"!"));
}

#[test]
fn test_class_flag_loads_from_directory() {
    let dir = TempDir::new().unwrap();
    write_objects(&dir);
    assert!(run(&parse(&["--dir", dir.path().to_str().unwrap(), "--class", "Enemy"])).is_ok());

    let err = run(&parse(&["--dir", dir.path().to_str().unwrap(), "--class", "Boss"]))
        .unwrap_err();
    assert!(matches!(err, CliError::ClassNotLoaded(name) if name == "Boss"));
}
