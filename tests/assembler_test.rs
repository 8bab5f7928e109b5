// Corpus assembly tests over in-memory bulletin sources

mod common;

use std::sync::Arc;
use std::time::Duration;

use climate_trends_service::corpus::CorpusAssembler;
use common::StaticSource;

#[tokio::test]
async fn test_failed_station_is_skipped() {
    let source = Arc::new(
        common::oxford_and_wick().with("lerwick", common::NO_HEADER),
    );
    let assembler = CorpusAssembler::new(source);

    let stations = common::stations(&["oxford", "lerwick", "armagh", "wick"]);
    let assembly = assembler.assemble(&stations).await;

    assert_eq!(assembly.corpus.len(), 6);
    assert_eq!(assembly.report.stations_requested, 4);
    assert_eq!(assembly.report.stations_parsed, 2);
    assert_eq!(assembly.report.stations_failed(), 2);

    let failed: Vec<&str> = assembly
        .report
        .failures
        .iter()
        .map(|f| f.station.as_str())
        .collect();
    assert_eq!(failed, vec!["lerwick", "armagh"]);
    assert!(assembly.report.failures[0].reason.contains("no header found"));

    // records keep station iteration order
    let order: Vec<&str> = assembly
        .corpus
        .records()
        .iter()
        .map(|r| r.station.as_str())
        .collect();
    assert_eq!(order, vec!["oxford", "oxford", "oxford", "oxford", "wick", "wick"]);
}

#[tokio::test]
async fn test_locations_cover_every_station() {
    let source = Arc::new(common::oxford_and_wick().with("lerwick", common::NO_HEADER));
    let assembler = CorpusAssembler::new(source);

    let stations = common::stations(&["oxford", "lerwick", "armagh"]);
    let assembly = assembler.assemble(&stations).await;

    assert_eq!(assembly.locations.len(), 3);
    assert_eq!(assembly.locations[0].station, "oxford");
    assert_eq!(assembly.locations[0].latitude, Some(51.761));
    assert_eq!(assembly.locations[0].longitude, Some(-1.262));
    // fetched but without coordinates, and not fetched at all
    assert!(!assembly.locations[1].has_coordinates());
    assert!(!assembly.locations[2].has_coordinates());
}

#[tokio::test]
async fn test_all_stations_failing_yields_empty_corpus() {
    let assembler = CorpusAssembler::new(Arc::new(StaticSource::new()));

    let assembly = assembler
        .assemble(&common::stations(&["oxford", "wick"]))
        .await;

    assert!(assembly.corpus.is_empty());
    assert_eq!(assembly.report.stations_parsed, 0);
    assert_eq!(assembly.report.stations_failed(), 2);
}

#[tokio::test]
async fn test_no_stations_yields_empty_corpus() {
    let assembler = CorpusAssembler::new(Arc::new(StaticSource::new()));
    let assembly = assembler.assemble(&[]).await;

    assert!(assembly.corpus.is_empty());
    assert!(assembly.locations.is_empty());
    assert_eq!(assembly.report.stations_requested, 0);
}

#[tokio::test]
async fn test_slow_station_times_out() {
    let source = Arc::new(
        common::oxford_and_wick().slow("wick", Duration::from_secs(5)),
    );
    let assembler =
        CorpusAssembler::new(source).with_fetch_timeout(Duration::from_millis(50));

    let assembly = assembler
        .assemble(&common::stations(&["oxford", "wick"]))
        .await;

    assert_eq!(assembly.report.stations_parsed, 1);
    assert_eq!(assembly.report.failures[0].station, "wick");
    assert!(assembly.report.failures[0].reason.contains("timed out"));
    assert!(assembly.corpus.records().iter().all(|r| r.station == "oxford"));
}

#[tokio::test]
async fn test_reassembly_is_idempotent() {
    let source = Arc::new(common::oxford_and_wick());
    let assembler = CorpusAssembler::new(source.clone()).with_concurrency(1);
    let stations = common::stations(&["oxford", "wick"]);

    let first = assembler.assemble(&stations).await;
    let second = assembler.assemble(&stations).await;

    assert_eq!(first.corpus, second.corpus);
    assert_eq!(first.report, second.report);
    assert_eq!(source.calls(), 4);
}

#[tokio::test]
async fn test_concurrency_does_not_change_order() {
    let stations = common::stations(&["wick", "oxford"]);
    // the first station finishes last; output order must not follow completion
    let source = Arc::new(common::oxford_and_wick().slow("wick", Duration::from_millis(50)));

    let assembly = CorpusAssembler::new(source)
        .with_concurrency(2)
        .assemble(&stations)
        .await;

    assert_eq!(assembly.corpus.records()[0].station, "wick");
    assert_eq!(assembly.corpus.records()[2].station, "oxford");
}

#[tokio::test]
async fn test_progress_callback_sees_every_station() {
    let source = Arc::new(common::oxford_and_wick());
    let assembler = CorpusAssembler::new(source);
    let stations = common::stations(&["oxford", "armagh", "wick"]);

    let mut seen = Vec::new();
    let assembly = assembler
        .assemble_with(&stations, |outcome| {
            seen.push((outcome.station.clone(), outcome.result.is_ok()));
        })
        .await;

    assert_eq!(assembly.report.stations_parsed, 2);
    assert_eq!(
        seen,
        vec![
            ("oxford".to_string(), true),
            ("armagh".to_string(), false),
            ("wick".to_string(), true),
        ]
    );
}
