//! End-to-end orchestrator tests against real DuckDB databases in temp dirs.

use dw_core::project::Project;
use dw_db::{Database, DuckDbBackend};
use dw_ledger::{DbLedger, ExecutionLedger};
use dw_runner::{MigrationRunner, ScriptStatus};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// A scratch project directory plus a file-backed database that survives
/// "deployments" (each deployment opens its own connection).
struct Harness {
    dir: tempfile::TempDir,
    db_path: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("db.duckdb");
        fs::write(
            dir.path().join("driftway.yml"),
            format!(
                "name: test-deploy\ndatabase:\n  path: \"{}\"\n",
                db_path.display()
            ),
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("packages")).unwrap();
        Self { dir, db_path }
    }

    fn add_package(&self, name: &str, manifest: Option<&str>) {
        let pkg = self.dir.path().join("packages").join(name);
        fs::create_dir_all(&pkg).unwrap();
        if let Some(content) = manifest {
            fs::write(pkg.join("package.yml"), content).unwrap();
        }
    }

    fn add_script(&self, package: &str, rel: &str, content: &str) {
        let path = self.dir.path().join("packages").join(package).join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project(&self) -> Project {
        Project::load(self.dir.path()).unwrap()
    }

    /// Open one "deployment": a fresh connection, ledger, and runner.
    /// Drop the returned handles before opening the next deployment.
    async fn deployment(&self) -> (Arc<dyn Database>, MigrationRunner) {
        let db: Arc<dyn Database> = Arc::new(DuckDbBackend::from_path(&self.db_path).unwrap());
        let ledger: Arc<dyn ExecutionLedger> =
            Arc::new(DbLedger::open(Arc::clone(&db), "dw_meta").await.unwrap());
        let runner = MigrationRunner::new(Arc::clone(&db), ledger, "dw_shadow");
        (db, runner)
    }
}

fn statuses(summary: &dw_runner::RunSummary) -> Vec<ScriptStatus> {
    summary.results.iter().map(|r| r.status).collect()
}

#[tokio::test]
async fn test_deployment_is_idempotent() {
    let h = Harness::new();
    h.add_package("crm", None);
    // The body is deliberately non-idempotent so a double execution would
    // be visible in the data.
    h.add_script(
        "crm",
        "1.0/1 - suffix emails.sql",
        "-- driftway:tag crm-suffix-emails\n\
         -- driftway:use crm.contact key id integer\n\
         -- driftway:use crm.contact email text\n\
         -- driftway:run\n\
         UPDATE dw_shadow.crm__contact SET email = email || '-x';\n\
         -- driftway:apply crm.contact (id, email)\n",
    );

    {
        let (db, mut runner) = h.deployment().await;
        db.execute_batch(
            "CREATE SCHEMA crm;
             CREATE TABLE crm.contact (id INTEGER, email VARCHAR);
             INSERT INTO crm.contact VALUES (1, 'a');",
        )
        .await
        .unwrap();

        let summary = runner.run_pending(&h.project()).await.unwrap();
        assert_eq!(statuses(&summary), vec![ScriptStatus::Executed]);
    }

    // Second deployment: the ledger filters the script out entirely.
    let (db, mut runner) = h.deployment().await;
    let summary = runner.run_pending(&h.project()).await.unwrap();
    assert_eq!(statuses(&summary), vec![ScriptStatus::Skipped]);

    let rows = db.query_rows("SELECT email FROM crm.contact").await.unwrap();
    assert_eq!(rows, vec![vec!["a-x".to_string()]]);
}

#[tokio::test]
async fn test_later_script_observes_earlier_scripts_shadow_edits() {
    let h = Harness::new();
    h.add_package("crm", None);
    // Script A edits the shadow column and does not apply.
    h.add_script(
        "crm",
        "1.0/1 - rewrite.sql",
        "-- driftway:tag crm-rewrite\n\
         -- driftway:use crm.contact key id integer\n\
         -- driftway:use crm.contact email text\n\
         -- driftway:run\n\
         UPDATE dw_shadow.crm__contact SET email = 'from-a';\n",
    );
    // Script B uses the same pair; a re-copy would clobber A's edit.
    h.add_script(
        "crm",
        "1.0/2 - apply.sql",
        "-- driftway:tag crm-apply\n\
         -- driftway:use crm.contact key id integer\n\
         -- driftway:use crm.contact email text\n\
         -- driftway:apply crm.contact (id, email)\n",
    );

    let (db, mut runner) = h.deployment().await;
    db.execute_batch(
        "CREATE SCHEMA crm;
         CREATE TABLE crm.contact (id INTEGER, email VARCHAR);
         INSERT INTO crm.contact VALUES (1, 'original');",
    )
    .await
    .unwrap();

    let summary = runner.run_pending(&h.project()).await.unwrap();
    assert_eq!(summary.executed_count(), 2);

    let rows = db.query_rows("SELECT email FROM crm.contact").await.unwrap();
    assert_eq!(rows, vec![vec!["from-a".to_string()]]);
}

#[tokio::test]
async fn test_script_before_structural_change_defers_to_restore() {
    let h = Harness::new();
    h.add_package("sales", None);
    // The original table does not exist yet: use creates the shadow empty,
    // the body fills it, apply is a tolerated no-op.
    h.add_script(
        "sales",
        "1.0/1 - seed orders.sql",
        "-- driftway:tag sales-seed-orders\n\
         -- driftway:use sales.orders key id integer\n\
         -- driftway:use sales.orders total double\n\
         -- driftway:run\n\
         INSERT INTO dw_shadow.sales__orders VALUES (1, 9.5), (2, 20.0);\n\
         -- driftway:apply sales.orders (id, total)\n",
    );

    let (db, mut runner) = h.deployment().await;
    let summary = runner.run_pending(&h.project()).await.unwrap();
    assert_eq!(summary.executed_count(), 1);

    // The structural collaborator now creates the table and asks for the
    // shadow data back.
    db.execute_batch("CREATE SCHEMA sales; CREATE TABLE sales.orders (id INTEGER, total DOUBLE)")
        .await
        .unwrap();
    runner
        .shadow_mut()
        .restore_on_create("sales", "orders")
        .await
        .unwrap();

    let rows = db
        .query_rows("SELECT CAST(id AS VARCHAR), CAST(total AS VARCHAR) FROM sales.orders ORDER BY id")
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "1");
    assert_eq!(rows[1][0], "2");
}

#[tokio::test]
async fn test_package_and_natural_ordering_drive_execution() {
    let h = Harness::new();
    h.add_package("base", None);
    h.add_package("app", Some("depends_on: [base]\n"));

    let audit = |label: &str, tag: &str| {
        format!(
            "-- driftway:tag {tag}\n\
             -- driftway:run\n\
             INSERT INTO audit VALUES (nextval('audit_seq'), '{label}');\n"
        )
    };
    // "app" sorts before "base" lexically, but depends on it; within base,
    // 10 sorts after 2 only under natural order.
    h.add_script("app", "1.0/1 - app.sql", &audit("app-1", "app-1"));
    h.add_script("base", "1.0/2 - second.sql", &audit("base-2", "base-2"));
    h.add_script("base", "1.0/10 - tenth.sql", &audit("base-10", "base-10"));

    let (db, mut runner) = h.deployment().await;
    db.execute_batch(
        "CREATE SEQUENCE audit_seq;
         CREATE TABLE audit (n INTEGER, label VARCHAR);",
    )
    .await
    .unwrap();

    let summary = runner.run_pending(&h.project()).await.unwrap();
    assert_eq!(summary.executed_count(), 3);

    let rows = db
        .query_rows("SELECT label FROM audit ORDER BY n")
        .await
        .unwrap();
    let labels: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(labels, vec!["base-2", "base-10", "app-1"]);
}

#[tokio::test]
async fn test_failed_script_halts_run_and_recovers_next_deployment() {
    let h = Harness::new();
    h.add_package("core", None);

    let marker = |label: &str, tag: &str| {
        format!(
            "-- driftway:tag {tag}\n\
             -- driftway:run\n\
             INSERT INTO markers VALUES ('{label}');\n"
        )
    };
    h.add_script("core", "1.0/1 - one.sql", &marker("one", "core-1"));
    h.add_script("core", "1.0/2 - two.sql", &marker("two", "core-2"));
    // Script 3 writes a marker, then fails: the whole transaction must
    // vanish, including the marker.
    h.add_script(
        "core",
        "1.0/3 - three.sql",
        "-- driftway:tag core-3\n\
         -- driftway:run\n\
         INSERT INTO markers VALUES ('three');\n\
         INSERT INTO no_such_table VALUES (1);\n",
    );
    h.add_script("core", "1.0/4 - four.sql", &marker("four", "core-4"));

    {
        let (db, mut runner) = h.deployment().await;
        db.execute_batch("CREATE TABLE markers (label VARCHAR)")
            .await
            .unwrap();

        let summary = runner.run_pending(&h.project()).await.unwrap();
        assert_eq!(
            statuses(&summary),
            vec![
                ScriptStatus::Executed,
                ScriptStatus::Executed,
                ScriptStatus::Failed,
            ]
        );
        assert_eq!(summary.deferred, 1);
        let failure = summary.failure().unwrap();
        assert_eq!(failure.tag, "core-3");
        assert!(failure.error.as_deref().unwrap().contains("core-3"));

        let rows = db.query_rows("SELECT label FROM markers").await.unwrap();
        let labels: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(labels, vec!["one", "two"]);
    }

    // The author fixes script 3 (same tag); the next deployment resumes
    // from it without re-running 1 and 2.
    h.add_script("core", "1.0/3 - three.sql", &marker("three", "core-3"));

    let (db, mut runner) = h.deployment().await;
    let summary = runner.run_pending(&h.project()).await.unwrap();
    assert_eq!(
        statuses(&summary),
        vec![
            ScriptStatus::Skipped,
            ScriptStatus::Skipped,
            ScriptStatus::Executed,
            ScriptStatus::Executed,
        ]
    );

    let rows = db
        .query_rows("SELECT label FROM markers ORDER BY label")
        .await
        .unwrap();
    let labels: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(labels, vec!["four", "one", "three", "two"]);
}

#[tokio::test]
async fn test_unsupported_conversion_leaves_no_ledger_entry() {
    let h = Harness::new();
    h.add_package("crm", None);
    h.add_script(
        "crm",
        "1.0/1 - bad type.sql",
        "-- driftway:tag crm-bad-type\n\
         -- driftway:use crm.contact key id integer\n\
         -- driftway:use crm.contact email integer\n\
         -- driftway:run\n",
    );

    let (db, mut runner) = h.deployment().await;
    db.execute_batch(
        "CREATE SCHEMA crm;
         CREATE TABLE crm.contact (id INTEGER, email VARCHAR);
         INSERT INTO crm.contact VALUES (1, 'not-a-number');",
    )
    .await
    .unwrap();

    let summary = runner.run_pending(&h.project()).await.unwrap();
    let failure = summary.failure().unwrap();
    assert!(failure.error.as_deref().unwrap().contains("[S001]"));

    let recorded = db
        .query_i64("SELECT COUNT(*) FROM dw_meta.script_ledger")
        .await
        .unwrap();
    assert_eq!(recorded, 0);
}

#[tokio::test]
async fn test_duplicate_tags_abort_before_any_execution() {
    let h = Harness::new();
    h.add_package("core", None);
    let body = "-- driftway:tag same-tag\n\
                -- driftway:run\n\
                INSERT INTO markers VALUES ('ran');\n";
    h.add_script("core", "1.0/1 - a.sql", body);
    h.add_script("core", "1.0/2 - b.sql", body);

    let (db, mut runner) = h.deployment().await;
    db.execute_batch("CREATE TABLE markers (label VARCHAR)")
        .await
        .unwrap();

    let result = runner.run_pending(&h.project()).await;
    assert!(matches!(
        result,
        Err(dw_runner::RunnerError::DuplicateTag { .. })
    ));
    assert_eq!(db.query_count("SELECT * FROM markers").await.unwrap(), 0);
}

#[tokio::test]
async fn test_renamed_script_does_not_re_execute() {
    let h = Harness::new();
    h.add_package("core", None);
    let body = "-- driftway:tag stable-tag\n\
                -- driftway:run\n\
                INSERT INTO markers VALUES ('ran');\n";
    h.add_script("core", "1.0/1 - original name.sql", body);

    {
        let (db, mut runner) = h.deployment().await;
        db.execute_batch("CREATE TABLE markers (label VARCHAR)")
            .await
            .unwrap();
        let summary = runner.run_pending(&h.project()).await.unwrap();
        assert_eq!(summary.executed_count(), 1);
    }

    // Reorganize the tree: same tag, new path.
    fs::remove_file(
        h.dir
            .path()
            .join("packages/core/1.0/1 - original name.sql"),
    )
    .unwrap();
    h.add_script("core", "2.0/1 - moved.sql", body);

    let (db, mut runner) = h.deployment().await;
    let summary = runner.run_pending(&h.project()).await.unwrap();
    assert_eq!(statuses(&summary), vec![ScriptStatus::Skipped]);
    assert_eq!(db.query_count("SELECT * FROM markers").await.unwrap(), 1);
}

#[tokio::test]
async fn test_malformed_script_aborts_run() {
    let h = Harness::new();
    h.add_package("core", None);
    h.add_script("core", "1.0/1 - no tag.sql", "-- driftway:run\nSELECT 1;\n");

    let (_db, mut runner) = h.deployment().await;
    let result = runner.run_pending(&h.project()).await;
    assert!(matches!(result, Err(dw_runner::RunnerError::Parse { .. })));
}
