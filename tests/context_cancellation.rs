mod common;

use std::time::{Duration, Instant};

use common::{create_test_db, ToDo};
use rust_record::{Context, Database, Model, ModelError, SqlQuery};
use tokio_util::sync::CancellationToken;

// Enough work to keep SQLite busy for far longer than any test timeout.
const SLOW_QUERY: &str = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 10000000000) SELECT count(*) FROM c";

fn count(db: &Database, ctx: &Context, sql: &str) -> rust_record::Result<Vec<i64>> {
    db.query(ctx, &SqlQuery::new(sql), |row| row.get(0))
}

#[test]
fn test_cancelled_context_issues_nothing() {
    let db = create_test_db().unwrap();
    let model = Model::new("todo", &db).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let ctx = Context::background().with_cancellation(token);
    assert!(ctx.is_done());

    let err = model.insert(&ctx, &ToDo::new("never", "stored")).unwrap_err();
    assert!(matches!(err, ModelError::Cancelled));

    let stored = model.select::<ToDo>(&Context::background(), &[]).unwrap();
    assert!(stored.is_empty());
}

#[test]
fn test_expired_deadline_issues_nothing() {
    let db = create_test_db().unwrap();
    let model = Model::new("todo", &db).unwrap();
    let ctx = Context::background().with_deadline(Instant::now());

    let err = model.select::<ToDo>(&ctx, &[]).unwrap_err();
    assert!(matches!(err, ModelError::DeadlineExceeded));
}

#[test]
fn test_deadline_interrupts_running_statement() {
    let db = Database::open_in_memory().unwrap();
    let ctx = Context::background().with_timeout(Duration::from_millis(100));

    let started = Instant::now();
    let err = count(&db, &ctx, SLOW_QUERY).unwrap_err();
    assert!(matches!(err, ModelError::DeadlineExceeded), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(10));

    // the handle stays usable afterwards
    let one = count(&db, &Context::background(), "SELECT 1").unwrap();
    assert_eq!(one, vec![1]);
}

#[test]
fn test_cancellation_interrupts_running_statement() {
    let db = Database::open_in_memory().unwrap();
    let token = CancellationToken::new();
    let ctx = Context::background().with_cancellation(token.clone());

    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        token.cancel();
    });
    let err = count(&db, &ctx, SLOW_QUERY).unwrap_err();
    canceller.join().unwrap();
    assert!(matches!(err, ModelError::Cancelled), "{err:?}");
}

/// Keep the handle busy with `SLOW_QUERY` for up to `hold` on another thread.
fn hold_handle(db: &Database, hold: Duration) -> std::thread::JoinHandle<ModelError> {
    let db = db.clone();
    let handle = std::thread::spawn(move || {
        let ctx = Context::background().with_timeout(hold);
        count(&db, &ctx, SLOW_QUERY).unwrap_err()
    });
    // let the holder take the lock first
    std::thread::sleep(Duration::from_millis(200));
    handle
}

#[test]
fn test_deadline_bounds_wait_for_busy_handle() {
    let db = Database::open_in_memory().unwrap();
    let holder = hold_handle(&db, Duration::from_secs(3));

    let ctx = Context::background().with_timeout(Duration::from_millis(100));
    let started = Instant::now();
    let err = count(&db, &ctx, "SELECT 1").unwrap_err();
    let waited = started.elapsed();
    assert!(matches!(err, ModelError::DeadlineExceeded), "{err:?}");
    assert!(waited < Duration::from_secs(1), "waited {waited:?}");

    assert!(matches!(holder.join().unwrap(), ModelError::DeadlineExceeded));
}

#[test]
fn test_cancellation_ends_wait_for_busy_handle() {
    let db = Database::open_in_memory().unwrap();
    let holder = hold_handle(&db, Duration::from_secs(3));

    let token = CancellationToken::new();
    let ctx = Context::background().with_cancellation(token.clone());
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        token.cancel();
    });
    let started = Instant::now();
    let err = count(&db, &ctx, "SELECT 1").unwrap_err();
    let waited = started.elapsed();
    canceller.join().unwrap();
    assert!(matches!(err, ModelError::Cancelled), "{err:?}");
    assert!(waited < Duration::from_secs(1), "waited {waited:?}");

    holder.join().unwrap();
}

#[test]
fn test_earlier_deadline_wins() {
    let soon = Instant::now() + Duration::from_secs(1);
    let ctx = Context::background()
        .with_deadline(soon)
        .with_timeout(Duration::from_secs(60));
    assert_eq!(ctx.deadline(), Some(soon));
    assert!(!ctx.is_done());
    assert!(ctx.check().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_accessors_share_one_handle() {
    let db = create_test_db().unwrap();

    let mut tasks = Vec::new();
    for worker in 0..8 {
        let db = db.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let model = Model::new("todo", &db)?;
            let ctx = Context::background().with_timeout(Duration::from_secs(30));
            for n in 0..10 {
                model.insert(&ctx, &ToDo::new(&format!("task {worker}-{n}"), "parallel"))?;
            }
            Ok::<_, ModelError>(())
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let model = Model::new("todo", &db).unwrap();
    let all = model.select::<ToDo>(&Context::background(), &[]).unwrap();
    assert_eq!(all.len(), 80);
}
