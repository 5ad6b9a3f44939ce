use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A throwaway project: one CSV source, one SQLite warehouse, two pipelines
/// and a schedule.
struct PipewrightTestEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl PipewrightTestEnv {
    fn new() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().join("project");
        for dir in ["Pipelines", "Connections", "Schedules", "data"] {
            fs::create_dir_all(root.join(dir))?;
        }

        fs::write(
            root.join("data/customers.csv"),
            "Customer ID,Full Name,phone\n1,Ada Lovelace,+1 (555) 010-0001\n2,Grace Hopper,555.010.0002\n",
        )?;

        Self::write(&root, "Connections/files.yaml", "name: customers_csv\ntype: CSV\nfile_path: data/customers.csv\n")?;
        Self::write(&root, "Connections/ghost.yaml", "name: ghost_csv\ntype: CSV\nfile_path: data/ghost.csv\n")?;
        Self::write(&root, "Connections/warehouse.yaml", "name: warehouse\ntype: SQLite\nfile_path: warehouse.db\n")?;

        Self::write(
            &root,
            "Pipelines/customers.yaml",
            "name: customers
source: {connection_name: customers_csv}
target: {connection_name: warehouse, action: drop_and_load, table_name: customers}
transformations:
  - {type: clean_column_names}
  - {type: standardize_phone, column_name: phone}
",
        )?;
        Self::write(
            &root,
            "Pipelines/ghost.yaml",
            "name: ghost
source: {connection_name: ghost_csv}
target: {connection_name: warehouse, action: append, table_name: ghosts}
",
        )?;
        Self::write(&root, "Schedules/nightly.yaml", "pipelines: [customers, ghost]\n")?;

        Ok(Self { _tmp: tmp, root })
    }

    fn write(root: &Path, rel: &str, content: &str) -> Result<()> {
        fs::write(root.join(rel), content)?;
        Ok(())
    }

    fn pipewright(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pipewright"));
        cmd.current_dir(&self.root);
        for var in [
            "PIPEWRIGHT_PROJECT_DIR",
            "PIPEWRIGHT_PIPELINES_DIR",
            "PIPEWRIGHT_CONNECTIONS_DIR",
            "PIPEWRIGHT_SCHEDULES_DIR",
            "PIPEWRIGHT_RUNS_DIR",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    fn warehouse_rows(&self, table: &str) -> Result<i64> {
        let conn = rusqlite::Connection::open(self.root.join("warehouse.db"))?;
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| row.get(0))?)
    }
}

#[test]
fn test_run_loads_csv_into_sqlite() -> Result<()> {
    let env = PipewrightTestEnv::new()?;

    env.pipewright()
        .args(["run", "customers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SUCCESS"));
    assert_eq!(env.warehouse_rows("customers")?, 2);

    // drop_and_load is idempotent
    env.pipewright().args(["run", "customers"]).assert().success();
    assert_eq!(env.warehouse_rows("customers")?, 2);

    let conn = rusqlite::Connection::open(env.root.join("warehouse.db"))?;
    let phone: String = conn.query_row(
        "SELECT phone FROM customers WHERE customer_id = 1",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(phone, "15550100001");
    Ok(())
}

#[test]
fn test_run_json_summary() -> Result<()> {
    let env = PipewrightTestEnv::new()?;

    let output = env
        .pipewright()
        .args(["run", "customers", "--json"])
        .output()?;
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(summary["pipeline"], "customers");
    assert_eq!(summary["success"], true);
    assert_eq!(summary["target_rows"], 2);
    Ok(())
}

#[test]
fn test_run_failures_exit_with_one() -> Result<()> {
    let env = PipewrightTestEnv::new()?;

    env.pipewright()
        .args(["run", "nope"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("NotFoundError: Pipeline 'nope' not found"));

    env.pipewright()
        .args(["run", "ghost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ConnectionError"));
    Ok(())
}

#[test]
fn test_schedule_keeps_going_after_failure() -> Result<()> {
    let env = PipewrightTestEnv::new()?;

    env.pipewright()
        .args(["schedule", "nightly"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("✅ customers"))
        .stdout(predicate::str::contains("❌ ghost"));
    assert_eq!(env.warehouse_rows("customers")?, 2);

    env.pipewright()
        .args(["schedule", "weekly"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("NotFoundError"));
    Ok(())
}

#[test]
fn test_list_and_check() -> Result<()> {
    let env = PipewrightTestEnv::new()?;

    env.pipewright()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("  customers\n  ghost\n"))
        .stdout(predicate::str::contains("  nightly\n"))
        .stdout(predicate::str::contains("  warehouse\n"));

    // The missing source file only shows up at read time
    env.pipewright().arg("check").assert().success();
    assert!(!env.root.join("warehouse.db").exists());

    PipewrightTestEnv::write(
        &env.root,
        "Pipelines/orphan.yaml",
        "name: orphan
source: {connection_name: customers_csv}
target: {connection_name: lake, action: append}
",
    )?;
    env.pipewright()
        .arg("check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("❌ orphan: NotFoundError"));
    Ok(())
}

#[test]
fn test_project_dir_flag() -> Result<()> {
    let env = PipewrightTestEnv::new()?;

    Command::new(assert_cmd::cargo::cargo_bin!("pipewright"))
        .current_dir(&env.root)
        .env_remove("PIPEWRIGHT_PROJECT_DIR")
        .args(["list", "--project-dir", "/nonexistent/project"])
        .assert()
        .success()
        .stdout(predicate::str::contains("customers").not());
    Ok(())
}
