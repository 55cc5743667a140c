use assert_cmd::Command;

fn bookshelf(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("bookshelf").unwrap();
    cmd.current_dir(config_dir)
        .env("BOOKSHELF_CONFIG_DIR", config_dir)
        .env("BOOKSHELF_ENV", "local")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn show_config_prints_layered_settings() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("base.toml"), "[server]\nport = 9191\n").unwrap();

    let output = bookshelf(dir.path())
        .env("BOOKSHELF_DATABASE__PATH", "from-env.db")
        .arg("show-config")
        .output()
        .unwrap();

    assert!(output.status.success());
    let settings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["server"]["port"], 9191);
    assert_eq!(settings["database"]["path"], "from-env.db");
    assert_eq!(settings["environment"], "local");
}

#[test]
fn init_db_creates_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("catalog.db");

    bookshelf(dir.path())
        .env("BOOKSHELF_DATABASE__PATH", &db_path)
        .arg("init-db")
        .assert()
        .success();

    assert!(db_path.exists());
}

#[test]
fn unsupported_environment_fails() {
    let dir = tempfile::tempdir().unwrap();

    bookshelf(dir.path())
        .env("BOOKSHELF_ENV", "qa")
        .arg("show-config")
        .assert()
        .failure();
}
