//! End-to-end pipeline tests: staging, dispatch, collection, cleanup

mod common;

use common::{request, TestService};

// 3 columns, 5 rows, into an operation that needs exactly 2 files
#[tokio::test]
async fn test_wrong_file_count_is_reported_not_raised() {
    let service = TestService::new();
    let csv = "a,b,c\n1,2,3\n4,5,6\n7,8,9\n10,11,12\n13,14,15\n";
    let result = service
        .manager
        .process(request("compare_dataframes", &[("a.csv", csv)], &[]))
        .await;

    assert!(!result.success);
    assert!(result.message.contains("requires exactly 2 files"));
    assert!(result.output_files.is_empty());

    let sid = result.session_id.expect("session was allocated");
    assert!(!service.workdir(&sid).exists(), "teardown must have run");
}

#[tokio::test]
async fn test_identical_files_compare_equal() {
    let service = TestService::new();
    let csv = "id,name,score\n1,alice,9.5\n2,bob,7.0\n";
    let result = service
        .manager
        .process(request(
            "compare_dataframes",
            &[("a.csv", csv), ("b.csv", csv)],
            &[],
        ))
        .await;

    assert!(result.success, "{}", result.message);
    assert!(result.message.contains("identical"));
    assert!(result.output_files.is_empty());
    assert_eq!(result.files_processed, vec!["a.csv", "b.csv"]);
}

#[tokio::test]
async fn test_grouped_sum_produces_downloadable_artifact() {
    let service = TestService::new();
    let csv = "region,amount\nnorth,100\nsouth,50\nnorth,200\neast,10\n";
    let result = service
        .manager
        .process(request(
            "aggregate_dataframe",
            &[("sales.csv", csv)],
            &["region", "amount"],
        ))
        .await;

    assert!(result.success, "{}", result.message);
    assert!(result.message.contains("3 groups"));
    assert_eq!(result.output_files.len(), 1);
    assert_eq!(result.output_files[0].filename, "aggregated_result.csv");

    let sid = result.session_id.expect("session id");
    assert_eq!(
        result.output_files[0].download_url,
        format!("/api/download/{sid}/aggregated_result.csv")
    );

    let bytes = service
        .manager
        .retrieve(&sid, "aggregated_result.csv")
        .await
        .expect("artifact retrievable");
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "region,sum_amount\nnorth,300\nsouth,50\neast,10\n"
    );
}

#[tokio::test]
async fn test_oversize_upload_rejected_before_staging() {
    let service = TestService::with_config(|c| c.max_upload_bytes = 64);
    let big = format!("x\n{}\n", "1\n".repeat(200));
    let result = service
        .manager
        .process(request("profile_dataframe", &[("big.csv", &big)], &[]))
        .await;

    assert!(!result.success);
    assert!(result.message.contains("Payload too large"));
    assert!(result.session_id.is_none(), "no session id for oversize");
    let staged: Vec<_> = std::fs::read_dir(service.uploads_dir()).unwrap().collect();
    assert!(staged.is_empty(), "nothing may be staged");
}

#[tokio::test]
async fn test_unknown_operation_stages_nothing() {
    let service = TestService::new();
    let result = service
        .manager
        .process(request("transmogrify", &[("a.csv", "x\n1\n")], &[]))
        .await;

    assert!(!result.success);
    assert!(result.message.contains("Unknown operation: transmogrify"));
    assert!(result.session_id.is_none());
    let staged: Vec<_> = std::fs::read_dir(service.uploads_dir()).unwrap().collect();
    assert!(staged.is_empty());
}

#[tokio::test]
async fn test_invalid_extension_discards_whole_batch() {
    let service = TestService::new();
    let result = service
        .manager
        .process(request(
            "profile_dataframe",
            &[("good.csv", "x\n1\n"), ("evil.exe", "mz")],
            &[],
        ))
        .await;

    assert!(!result.success);
    assert!(result.message.contains("Only CSV files are allowed"));
    assert!(result.files_processed.is_empty());

    let sid = result.session_id.expect("allocated before staging failed");
    assert!(!service.workdir(&sid).exists());
    // the accepted half of the batch must not leak into the shared root
    assert!(!service.data_root.join("good.csv").exists());
}

#[tokio::test]
async fn test_purge_is_idempotent() {
    let service = TestService::new();
    let result = service
        .manager
        .process(request(
            "aggregate_dataframe",
            &[("s.csv", "k,v\na,1\nb,2\n")],
            &["k", "v"],
        ))
        .await;
    let sid = result.session_id.unwrap();
    assert!(service
        .manager
        .retrieve(&sid, "aggregated_result.csv")
        .await
        .is_ok());

    service.manager.purge(&sid).await.unwrap();
    assert!(service
        .manager
        .retrieve(&sid, "aggregated_result.csv")
        .await
        .is_err());
    // second purge, and purging a session that never existed, are no-ops
    service.manager.purge(&sid).await.unwrap();
    service.manager.purge("no-such-session").await.unwrap();
}

#[tokio::test]
async fn test_output_namespace_survives_request_until_purged() {
    let service = TestService::new();
    let result = service
        .manager
        .process(request(
            "detect_anomalies",
            &[("v.csv", "v\n10\n11\n9\n10\n11\n9\n10\n1000\n")],
            &[],
        ))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.output_files.len(), 1);
    let sid = result.session_id.unwrap();

    // working dir gone, output namespace still there
    assert!(!service.workdir(&sid).exists());
    let bytes = service
        .manager
        .retrieve(&sid, "anomalies_result.csv")
        .await
        .unwrap();
    assert!(String::from_utf8(bytes).unwrap().contains("1000"));
}

#[tokio::test]
async fn test_merge_then_validate_full_cycle() {
    let service = TestService::new();

    let merged = service
        .manager
        .process(request(
            "merge_dataframes",
            &[
                ("users.csv", "id,name\n1,alice\n2,bob\n"),
                ("scores.csv", "id,score\n1,9\n2,7\n"),
            ],
            &[],
        ))
        .await;
    assert!(merged.success, "{}", merged.message);
    assert_eq!(merged.output_files.len(), 1);

    let validated = service
        .manager
        .process(request(
            "validate_schema",
            &[
                ("a.csv", "id,name\n1,x\n"),
                ("b.csv", "id,name\n2,y\n"),
            ],
            &[],
        ))
        .await;
    assert!(validated.success);
    assert!(validated.message.contains("All 2 files"));
    // validate produces no artifact, and must not see merge's leftovers
    assert!(validated.output_files.is_empty());
}
