use std::error::Error;
use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli() -> Result<Command, Box<dyn Error>> {
    Ok(Command::cargo_bin("focusspace-cli")?)
}

#[test]
fn added_entries_persist_across_invocations() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let notes = workspace.path().join("notes.md");
    fs::write(&notes, "# notes")?;

    cli()?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "add",
            notes.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added"));

    assert!(workspace.path().join(".focusspace/space.json").exists());

    cli()?
        .args(["--workspace", workspace.path().to_str().unwrap(), "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("notes.md"));
    Ok(())
}

#[test]
fn duplicate_paths_are_skipped_unless_allowed() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let file = workspace.path().join("once.txt");
    fs::write(&file, "x")?;
    let ws = workspace.path().to_str().unwrap().to_string();

    cli()?
        .args(["--workspace", &ws, "add", file.to_str().unwrap()])
        .assert()
        .success();
    cli()?
        .args(["--workspace", &ws, "add", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped"));
    cli()?
        .args([
            "--workspace",
            &ws,
            "add",
            "--allow-duplicate",
            file.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added"));
    Ok(())
}

#[test]
fn sections_group_entries_and_moves_reorder_them() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let file = workspace.path().join("task.rs");
    fs::write(&file, "// todo")?;
    let ws = workspace.path().to_str().unwrap().to_string();

    cli()?
        .args(["--workspace", &ws, "section", "Sprint"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created section 'Sprint'"));
    cli()?
        .args(["--workspace", &ws, "add", file.to_str().unwrap()])
        .assert()
        .success();
    cli()?
        .args(["--workspace", &ws, "move", "task.rs", "--to", "Sprint"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved"));

    cli()?
        .args(["--workspace", &ws, "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Sprint\n  task.rs"));

    // moving a section into itself must fail cleanly
    cli()?
        .args(["--workspace", &ws, "move", "Sprint", "--to", "Sprint"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not move"));
    Ok(())
}

#[test]
fn remove_drops_the_whole_subtree() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let file = workspace.path().join("gone.txt");
    fs::write(&file, "x")?;
    let ws = workspace.path().to_str().unwrap().to_string();

    cli()?
        .args(["--workspace", &ws, "section", "Trash"])
        .assert()
        .success();
    cli()?
        .args([
            "--workspace",
            &ws,
            "add",
            "--section",
            "Trash",
            file.to_str().unwrap(),
        ])
        .assert()
        .success();
    cli()?
        .args(["--workspace", &ws, "remove", "Trash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));
    cli()?
        .args(["--workspace", &ws, "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("The focus space is empty."));
    Ok(())
}

#[test]
fn materialize_expands_a_folder_entry() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let project = workspace.path().join("project");
    fs::create_dir_all(project.join("src"))?;
    fs::write(project.join("src/lib.rs"), "pub fn noop() {}")?;
    fs::write(project.join("README.md"), "# readme")?;
    let ws = workspace.path().to_str().unwrap().to_string();

    cli()?
        .args(["--workspace", &ws, "add", project.to_str().unwrap()])
        .assert()
        .success();
    cli()?
        .args(["--workspace", &ws, "materialize", "project"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Materialized 3 entries"));
    cli()?
        .args(["--workspace", &ws, "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("project/")
                .and(predicate::str::contains("src/"))
                .and(predicate::str::contains("lib.rs"))
                .and(predicate::str::contains("README.md")),
        );
    Ok(())
}

#[test]
fn unknown_references_fail_with_a_clear_error() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let ws = workspace.path().to_str().unwrap().to_string();

    cli()?
        .args(["--workspace", &ws, "remove", "no-such-entry"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no entry matches"));
    Ok(())
}
