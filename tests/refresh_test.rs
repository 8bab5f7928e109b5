// Snapshot lifecycle tests: first-load assembly under cancelled requests and
// the background refresh scheduler

mod common;

use std::sync::Arc;
use std::time::Duration;

use climate_trends_service::scheduler::start_refresh_scheduler;

#[tokio::test]
async fn test_cancelled_requests_do_not_discard_assembly() {
    // wick takes longer than any of the requests below are willing to wait
    let source = Arc::new(common::oxford_and_wick().slow("wick", Duration::from_millis(200)));
    let service = common::test_service(source.clone(), &["oxford", "wick"]);

    for _ in 0..3 {
        let result =
            tokio::time::timeout(Duration::from_millis(40), service.filter_options()).await;
        assert!(result.is_err(), "request should have timed out");
    }

    let options = service.filter_options().await.unwrap();
    assert_eq!(options.stations, vec!["oxford", "wick"]);

    // one assembly: one fetch per station
    assert_eq!(source.calls(), 2);
    assert!(service.peek().await.is_some());
}

#[tokio::test]
async fn test_scheduler_warms_and_replaces_snapshot() {
    let source = Arc::new(common::oxford_and_wick());
    let service = common::test_service(source.clone(), &["oxford", "wick"]);
    assert!(service.peek().await.is_none());

    let scheduler = tokio::spawn(start_refresh_scheduler(
        service.clone(),
        Duration::from_millis(100),
    ));

    // first tick fires immediately
    tokio::time::sleep(Duration::from_millis(50)).await;
    let first = service.peek().await.expect("cache not warmed by scheduler");
    assert_eq!(first.corpus.len(), 6);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = service.peek().await.unwrap();
    scheduler.abort();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(second.refreshed_at > first.refreshed_at);
    assert!(source.calls() >= 4);
}
