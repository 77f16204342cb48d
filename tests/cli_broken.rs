use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn packages_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn broken_reports_nothing_when_all_dependencies_are_present() {
    let dir = TempDir::new().unwrap();
    let packages = packages_file(
        &dir,
        "PACKAGES",
        "Package: child\nVersion: 1.0\nDepends: parent (>= 1.0)\n\n\
         Package: parent\nVersion: 1.0\n",
    );

    Command::cargo_bin("cranidx")
        .unwrap()
        .arg("broken")
        .arg(&packages)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn broken_lists_packages_with_missing_dependencies() {
    let dir = TempDir::new().unwrap();
    let packages = packages_file(
        &dir,
        "PACKAGES",
        "Package: child\nVersion: 1.0\nDepends: missing (>= 2.0)\n",
    );

    Command::cargo_bin("cranidx")
        .unwrap()
        .arg("broken")
        .arg(&packages)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("child").and(predicate::str::contains("missing")));
}

#[test]
fn can_install_succeeds_when_dependencies_are_met() {
    let dir = TempDir::new().unwrap();
    let packages = packages_file(
        &dir,
        "PACKAGES",
        "Package: child\nVersion: 1.0\nDepends: parent (>= 1.0)\n\n\
         Package: parent\nVersion: 1.0\n",
    );

    Command::cargo_bin("cranidx")
        .unwrap()
        .args(["can-install", "child"])
        .arg(&packages)
        .assert()
        .success();
}

#[test]
fn can_install_fails_when_a_dependency_is_missing() {
    let dir = TempDir::new().unwrap();
    let packages = packages_file(
        &dir,
        "PACKAGES",
        "Package: child\nVersion: 1.0\nDepends: missing (>= 2.0)\n",
    );

    Command::cargo_bin("cranidx")
        .unwrap()
        .args(["can-install", "child"])
        .arg(&packages)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn depends_prints_the_transitive_closure() {
    let dir = TempDir::new().unwrap();
    let packages = packages_file(
        &dir,
        "PACKAGES",
        "Package: grandchild\nVersion: 1.0\nDepends: child (>= 1.0)\n\n\
         Package: child\nVersion: 1.0\nDepends: parent (>= 1.0)\n\n\
         Package: parent\nVersion: 1.0\n",
    );

    Command::cargo_bin("cranidx")
        .unwrap()
        .args(["depends", "grandchild"])
        .arg(&packages)
        .assert()
        .success()
        .stdout(predicate::str::contains("child").and(predicate::str::contains("parent")));
}

#[test]
fn depends_fails_for_an_unknown_package() {
    let dir = TempDir::new().unwrap();
    let packages = packages_file(&dir, "PACKAGES", "Package: child\nVersion: 1.0\n");

    Command::cargo_bin("cranidx")
        .unwrap()
        .args(["depends", "nope"])
        .arg(&packages)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn bioc_urls_prints_four_category_urls() {
    Command::cargo_bin("cranidx")
        .unwrap()
        .args(["bioc-urls", "3.18"])
        .assert()
        .success()
        .stdout(predicate::str::contains("packages/3.18/bioc"))
        .stdout(predicate::str::contains("packages/3.18/workflows"));
}

#[test]
fn missing_subcommand_exits_with_usage_error() {
    Command::cargo_bin("cranidx").unwrap().assert().failure().code(2);
}
