//! Cross-session isolation under concurrency

mod common;

use async_trait::async_trait;
use common::{request, TestService};
use std::sync::Arc;
use std::time::Duration;
use tabserve::config::ServiceConfig;
use tabserve::engine::{CsvEngine, DatasetLoader, LoadError, TableSet};
use tabserve::session::SessionManager;
use tempfile::TempDir;

/// Delegates to the real engine after a pause, holding the exposure
/// window open long enough for two requests to overlap
struct SlowLoader {
    inner: CsvEngine,
    delay: Duration,
}

#[async_trait]
impl DatasetLoader for SlowLoader {
    async fn load(&self, filenames: &[String]) -> Result<TableSet, LoadError> {
        tokio::time::sleep(self.delay).await;
        self.inner.load(filenames).await
    }
}

fn slow_service(delay_ms: u64) -> (SessionManager, TempDir) {
    let tmp = TempDir::new().unwrap();
    let config = ServiceConfig::with_data_root(tmp.path());
    config.ensure_dirs().unwrap();
    let loader = Arc::new(SlowLoader {
        inner: CsvEngine::new(&config.shared_root),
        delay: Duration::from_millis(delay_ms),
    });
    (SessionManager::new(config, loader), tmp)
}

#[tokio::test]
async fn test_disjoint_filenames_do_not_interfere() {
    let service = Arc::new(TestService::new());

    let a = {
        let s = Arc::clone(&service);
        tokio::spawn(async move {
            s.manager
                .process(request("profile_dataframe", &[("left.csv", "x\n1\n2\n")], &[]))
                .await
        })
    };
    let b = {
        let s = Arc::clone(&service);
        tokio::spawn(async move {
            s.manager
                .process(request("profile_dataframe", &[("right.csv", "y\n3\n")], &[]))
                .await
        })
    };
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert!(a.success, "{}", a.message);
    assert!(b.success, "{}", b.message);
    assert_eq!(a.files_processed, vec!["left.csv"]);
    assert_eq!(b.files_processed, vec!["right.csv"]);
    // each session saw only its own staged artifact
    assert!(a.message.contains("left.csv") && !a.message.contains("right.csv"));
    assert!(b.message.contains("right.csv") && !b.message.contains("left.csv"));
}

#[tokio::test]
async fn test_colliding_filenames_reject_the_second_session() {
    let (manager, _tmp) = slow_service(300);
    let manager = Arc::new(manager);

    let a = {
        let m = Arc::clone(&manager);
        tokio::spawn(async move {
            m.process(request("profile_dataframe", &[("same.csv", "x\n1\n")], &[]))
                .await
        })
    };
    // give the first request time to expose before the second arrives
    tokio::time::sleep(Duration::from_millis(100)).await;
    let b = {
        let m = Arc::clone(&manager);
        tokio::spawn(async move {
            m.process(request("profile_dataframe", &[("same.csv", "x\n2\n")], &[]))
                .await
        })
    };
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert!(a.success, "first session wins exposure: {}", a.message);
    assert!(!b.success, "second session must collide");
    assert!(b.message.contains("Name collision"), "{}", b.message);
    assert!(b.message.contains("same.csv"));

    // both sessions cleaned up their working directories
    for result in [&a, &b] {
        let sid = result.session_id.as_deref().unwrap();
        assert!(!_tmp.path().join("uploads").join(sid).exists());
    }
}

#[tokio::test]
async fn test_same_operation_concurrently_keeps_outputs_separate() {
    let service = Arc::new(TestService::new());

    let a = {
        let s = Arc::clone(&service);
        tokio::spawn(async move {
            s.manager
                .process(request(
                    "aggregate_dataframe",
                    &[("north.csv", "k,v\nn,100\nn,200\n")],
                    &["k", "v"],
                ))
                .await
        })
    };
    let b = {
        let s = Arc::clone(&service);
        tokio::spawn(async move {
            s.manager
                .process(request(
                    "aggregate_dataframe",
                    &[("west.csv", "k,v\nw,7\n")],
                    &["k", "v"],
                ))
                .await
        })
    };
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert!(a.success, "{}", a.message);
    assert!(b.success, "{}", b.message);
    assert_eq!(a.output_files.len(), 1);
    assert_eq!(b.output_files.len(), 1);

    // the per-operation lock means each session claims its own artifact
    let bytes_a = service
        .manager
        .retrieve(a.session_id.as_deref().unwrap(), "aggregated_result.csv")
        .await
        .unwrap();
    let bytes_b = service
        .manager
        .retrieve(b.session_id.as_deref().unwrap(), "aggregated_result.csv")
        .await
        .unwrap();
    assert!(String::from_utf8(bytes_a).unwrap().contains("n,300"));
    assert!(String::from_utf8(bytes_b).unwrap().contains("w,7"));
}
