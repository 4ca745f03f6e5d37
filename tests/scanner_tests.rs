//! Module/consumer scanner behavior on real directory trees.

use std::fs;
use std::path::Path;

use modulith::config::ScanConfig;
use modulith::scanner::ModuleScanner;

fn write(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_finds_modules_in_sorted_order() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src, "shipping/api.rs", b"use modulith::CapabilityRegistry;\n");
    write(&src, "billing/mod.rs", b"// CapabilityRegistry consumer\n");
    write(&src, "billing/models.py", b"from modulith import CapabilityRegistry\n");
    write(&src, "unrelated.rs", b"fn main() {}\n");
    write(&src, "notes.txt", b"CapabilityRegistry\n");

    let report = ModuleScanner::new(vec![src], "CapabilityRegistry").scan();
    assert_eq!(report.modules, ["billing", "billing::models", "shipping::api"]);
    assert!(report.failures.is_empty());
}

#[test]
fn test_unreadable_module_is_reported_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src, "good.py", b"import CapabilityRegistry\n");
    write(&src, "broken.py", &[0xff, 0xfe, 0x00, 0x80]);

    let report = ModuleScanner::new(vec![src.clone()], "CapabilityRegistry").scan();
    assert_eq!(report.modules, ["good"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, src.join("broken.py"));
}

#[test]
fn test_hidden_and_build_directories_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("app");
    write(&root, ".cache/stale.rs", b"CapabilityRegistry");
    write(&root, "target/debug/build.rs", b"CapabilityRegistry");
    write(&root, "live.rs", b"CapabilityRegistry");

    let report = ModuleScanner::new(vec![root], "CapabilityRegistry").scan();
    assert_eq!(report.modules, ["live"]);
}

#[test]
fn test_scan_continues_past_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let tests = dir.path().join("tests");
    write(&tests, "registry_usage.rs", b"CapabilityRegistry::global()");

    let config = ScanConfig {
        roots: vec![dir.path().join("src"), tests],
        ..ScanConfig::default()
    };
    let report = ModuleScanner::from_config(&config).scan();
    assert_eq!(report.modules, ["registry_usage"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, dir.path().join("src"));
}
