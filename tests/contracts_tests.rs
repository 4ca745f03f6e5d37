//! Contract file creation and updates on disk.

use modulith::config::ContractsConfig;
use modulith::contracts::{CONTRACT_SECTION, ContractFile, ROOT_SECTION};

#[test]
fn test_initialize_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".importlinter");
    let config = ContractsConfig::default();
    assert!(!path.exists());

    let mut contract = ContractFile::load_or_default(&path, &config).unwrap();
    assert!(contract.add_module("new_test", &config).unwrap());
    contract.save(&path).unwrap();

    let reloaded = ContractFile::parse(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reloaded.get(ROOT_SECTION, "root_package"), Some("modules"));
    assert_eq!(reloaded.get(ROOT_SECTION, "include_external_packages"), Some("n"));
    assert_eq!(reloaded.get(CONTRACT_SECTION, "type"), Some("independence"));
    assert_eq!(reloaded.modules(), ["new_test"]);
}

#[test]
fn test_add_module_updates_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".importlinter");
    let config = ContractsConfig::default();

    let mut contract = ContractFile::load_or_default(&path, &config).unwrap();
    contract.add_module("first_module", &config).unwrap();
    contract.save(&path).unwrap();

    let mut contract = ContractFile::load_or_default(&path, &config).unwrap();
    assert_eq!(contract.modules(), ["first_module"]);
    contract.add_module("second_module", &config).unwrap();
    contract.save(&path).unwrap();

    let contract = ContractFile::load_or_default(&path, &config).unwrap();
    assert_eq!(contract.modules(), ["first_module", "second_module"]);
}

#[test]
fn test_configured_defaults_are_used_for_new_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lint/contracts.ini");
    let config = ContractsConfig {
        root_package: "apps".into(),
        include_external_packages: true,
        contract_name: "Apps stay apart".into(),
        ..ContractsConfig::default()
    };

    let mut contract = ContractFile::load_or_default(&path, &config).unwrap();
    contract.add_module("orders", &config).unwrap();
    contract.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("[importlinter]\nroot_package = apps\ninclude_external_packages = y\n"));
    assert!(text.contains("name = Apps stay apart\n"));
}

#[test]
fn test_update_keeps_user_comments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".importlinter");
    std::fs::write(
        &path,
        "# owned by the platform team\n[importlinter]\nroot_package = modules\n\n\
         [importlinter:contract:modulith_modules]\n; do not reorder\nname = Modulith modules are independent\n\
         type = independence\nmodules =\n    billing\n",
    )
    .unwrap();
    let config = ContractsConfig::default();

    let mut contract = ContractFile::load_or_default(&path, &config).unwrap();
    contract.add_module("shipping", &config).unwrap();
    contract.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("# owned by the platform team\n[importlinter]\n"));
    assert!(text.contains("[importlinter:contract:modulith_modules]\n; do not reorder\nname = "));
    assert!(text.ends_with("modules =\n    billing\n    shipping\n"));
}
