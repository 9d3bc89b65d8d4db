
use sluice::job::{JobPatch, JobStatus};
use sluice::store::StoreError;
use test_helpers::open_temp_store;

#[tokio::test]
async fn upsert_creates_then_merges_without_dropping_fields() {
    let store = open_temp_store(0, 4).await;

    store
        .upsert_job(
            "job-1",
            JobPatch {
                status: Some(JobStatus::Started),
                timestamp: Some(1_000),
                execution_arn: Some("arn:1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Status-only patch must preserve timestamp and arn
    store
        .upsert_job("job-1", JobPatch::status(JobStatus::Completed))
        .await
        .unwrap();

    let job = store.get_job("job-1").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.timestamp, Some(1_000));
    assert_eq!(job.execution_arn.as_deref(), Some("arn:1"));
}

#[tokio::test]
async fn get_absent_job_is_none() {
    let store = open_temp_store(0, 4).await;
    assert!(store.get_job("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn status_change_moves_the_index_entry() {
    let store = open_temp_store(0, 4).await;

    store
        .upsert_job("job-1", JobPatch::status(JobStatus::Queued))
        .await
        .unwrap();
    store
        .upsert_job("job-1", JobPatch::status(JobStatus::Started))
        .await
        .unwrap();

    let queued = store
        .scan_by_status(JobStatus::Queued, 10, true, None)
        .await
        .unwrap();
    assert!(queued.items.is_empty());

    let started = store
        .scan_by_status(JobStatus::Started, 10, true, None)
        .await
        .unwrap();
    assert_eq!(started.items.len(), 1);
    assert_eq!(started.items[0].uuid, "job-1");
}

#[tokio::test]
async fn scan_orders_by_uuid_and_paginates() {
    let store = open_temp_store(0, 4).await;
    for uuid in ["c", "a", "e", "b", "d"] {
        store
            .upsert_job(uuid, JobPatch::status(JobStatus::Queued))
            .await
            .unwrap();
    }

    let first = store
        .scan_by_status(JobStatus::Queued, 2, true, None)
        .await
        .unwrap();
    let ids: Vec<&str> = first.items.iter().map(|j| j.uuid.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    let token = first.next_token.expect("more pages");

    let second = store
        .scan_by_status(JobStatus::Queued, 2, true, Some(&token))
        .await
        .unwrap();
    let ids: Vec<&str> = second.items.iter().map(|j| j.uuid.as_str()).collect();
    assert_eq!(ids, vec!["c", "d"]);
    let token = second.next_token.expect("one more page");

    let last = store
        .scan_by_status(JobStatus::Queued, 2, true, Some(&token))
        .await
        .unwrap();
    let ids: Vec<&str> = last.items.iter().map(|j| j.uuid.as_str()).collect();
    assert_eq!(ids, vec!["e"]);
    assert!(last.next_token.is_none());
}

#[tokio::test]
async fn descending_scan_reverses_index_order() {
    let store = open_temp_store(0, 4).await;
    for uuid in ["a", "b", "c"] {
        store
            .upsert_job(uuid, JobPatch::status(JobStatus::Queued))
            .await
            .unwrap();
    }

    let page = store
        .scan_by_status(JobStatus::Queued, 2, false, None)
        .await
        .unwrap();
    let ids: Vec<&str> = page.items.iter().map(|j| j.uuid.as_str()).collect();
    assert_eq!(ids, vec!["c", "b"]);
    let token = page.next_token.expect("more pages");

    let rest = store
        .scan_by_status(JobStatus::Queued, 2, false, Some(&token))
        .await
        .unwrap();
    let ids: Vec<&str> = rest.items.iter().map(|j| j.uuid.as_str()).collect();
    assert_eq!(ids, vec!["a"]);
    assert!(rest.next_token.is_none());
}

#[tokio::test]
async fn malformed_continuation_token_is_a_decode_error() {
    let store = open_temp_store(0, 4).await;
    let err = store
        .scan_by_status(JobStatus::Queued, 10, true, Some("not!base64!!"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::BadToken(_)));
}

#[tokio::test]
async fn delete_removes_record_and_index_entry() {
    let store = open_temp_store(0, 4).await;
    store
        .upsert_job("job-1", JobPatch::status(JobStatus::Queued))
        .await
        .unwrap();

    store.delete_job("job-1").await.unwrap();

    assert!(store.get_job("job-1").await.unwrap().is_none());
    let page = store
        .scan_by_status(JobStatus::Queued, 10, true, None)
        .await
        .unwrap();
    assert!(page.items.is_empty());
}
