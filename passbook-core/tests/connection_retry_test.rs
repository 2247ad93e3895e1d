//! Opening the ledger while another handle holds it must retry with
//! backoff instead of failing outright. Windows file locking is the
//! main reason this path exists; on Unix the opens mostly just work.

use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use passbook_core::adapters::duckdb::DuckDbRepository;
use passbook_core::domain::User;

fn seeded_ledger(dir: &TempDir, name: &str) -> PathBuf {
    let db_path = dir.path().join(name);
    let repo = DuckDbRepository::new(&db_path).unwrap();
    repo.ensure_schema().unwrap();
    db_path
}

#[test]
fn test_simultaneous_opens_all_succeed() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = Arc::new(seeded_ledger(&temp_dir, "contended.duckdb"));
    let barrier = Arc::new(Barrier::new(3));

    let workers: Vec<_> = (0..3)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let db_path = Arc::clone(&db_path);
            thread::spawn(move || {
                barrier.wait();
                let repo = DuckDbRepository::new(&db_path);
                // Hold the handle open so the other threads collide with it
                thread::sleep(Duration::from_millis(100));
                repo.map(|_| ())
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap().unwrap();
    }
}

#[test]
fn test_reopen_sees_persisted_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = seeded_ledger(&temp_dir, "sequential.duckdb");

    {
        let repo = DuckDbRepository::new(&db_path).unwrap();
        let user = User::new("Maria Silva", "maria@example.com", "$argon2id$stub-hash");
        repo.create_user(&user).unwrap();
    }

    // Every reopen runs the schema check again and reads the same ledger
    for _ in 0..5 {
        let repo = DuckDbRepository::new(&db_path).unwrap();
        repo.ensure_schema().unwrap();
        assert_eq!(repo.user_count().unwrap(), 1);
    }
}

/// Non-retryable failures surface immediately instead of burning through
/// the backoff schedule
#[test]
fn test_open_fails_fast_on_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let bad_path = temp_dir.path().join("no-such-dir").join("test.duckdb");

    let result = DuckDbRepository::new(&bad_path);
    assert!(result.is_err(), "Missing parent directory cannot be retried away");
}
