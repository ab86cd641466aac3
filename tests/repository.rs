use std::sync::Arc;

use alloy_primitives::Address;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing_subscriber::EnvFilter;

use cloud_event_index::blob::LocalBlobStore;
use cloud_event_index::cloud_event::types::TYPE_STATUS;
use cloud_event_index::db::schema::TABLE_NAME;
use cloud_event_index::db::IdentifierFormat;
use cloud_event_index::testing::{MemoryBlobStore, MemoryColumnarStore};
use cloud_event_index::{
    decode_index, CloudEventHeader, IndexRepository, NftDid, RepoError, SearchOptions, Subject,
};

const BUCKET: &str = "cloud-events";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

struct Fixture {
    columnar: Arc<MemoryColumnarStore>,
    blobs: Arc<MemoryBlobStore>,
    repo: IndexRepository,
}

fn fixture() -> Fixture {
    init_tracing();
    let columnar = Arc::new(MemoryColumnarStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let repo = IndexRepository::new(columnar.clone(), blobs.clone(), BUCKET);
    Fixture {
        columnar,
        blobs,
        repo,
    }
}

fn vehicle(token_id: u32) -> NftDid {
    NftDid::new(137, Address::repeat_byte(0xba), token_id)
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 11, 12, 0, 0).unwrap()
}

fn header(subject: NftDid, time: DateTime<Utc>, id: &str) -> CloudEventHeader {
    CloudEventHeader {
        spec_version: "1.0".to_string(),
        id: id.to_string(),
        source: Address::repeat_byte(0x5e).to_checksum(None),
        producer: NftDid::new(137, Address::repeat_byte(0xaa), 9).to_string(),
        subject: subject.to_string(),
        time,
        event_type: TYPE_STATUS.to_string(),
        data_content_type: "application/json".to_string(),
        data_version: "status/v1".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_latest_returns_most_recent() {
    let f = fixture();
    let subject = vehicle(1);
    let t = base_time();

    for (hours, id) in [(2, "two-hours-ago"), (0, "now"), (1, "one-hour-ago")] {
        let h = header(subject, t - Duration::hours(hours), id);
        f.repo
            .store_object(&h, Bytes::from(format!("{{\"id\":\"{}\"}}", id)))
            .await
            .unwrap();
    }

    let opts = SearchOptions::default().with_subject(subject);
    let latest = f.repo.latest_index(&opts).await.unwrap();
    assert_eq!(latest.header.id, "now");
    assert_eq!(latest.header.time, t);

    let event = f.repo.latest_cloud_event(&opts).await.unwrap();
    assert_eq!(event.header.id, "now");
    assert_eq!(&event.data[..], b"{\"id\":\"now\"}");
}

#[tokio::test]
async fn test_latest_without_records_is_not_found() {
    let f = fixture();
    f.repo
        .store_object(&header(vehicle(1), base_time(), "a"), Bytes::from_static(b"{}"))
        .await
        .unwrap();

    let opts = SearchOptions::default().with_subject(vehicle(2));
    let err = f.repo.latest_index(&opts).await.unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {}", err);

    let err = f.repo.list_indexes(10, &opts).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[tokio::test]
async fn test_list_order() {
    let f = fixture();
    let subject = vehicle(3);
    let t = base_time();

    for minutes in [10, 30, 0, 20] {
        let h = header(subject, t + Duration::minutes(minutes), &format!("m{}", minutes));
        f.repo.store_object(&h, Bytes::from_static(b"{}")).await.unwrap();
    }

    let opts = SearchOptions::default().with_subject(subject);
    let rows = f.repo.list_indexes(10, &opts).await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.header.id.as_str()).collect();
    assert_eq!(ids, vec!["m30", "m20", "m10", "m0"]);
    assert!(rows.windows(2).all(|w| w[0].header.time > w[1].header.time));

    let rows = f.repo.list_indexes(10, &opts.clone().ascending()).await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.header.id.as_str()).collect();
    assert_eq!(ids, vec!["m0", "m10", "m20", "m30"]);

    let rows = f.repo.list_indexes(2, &opts).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_time_range_is_exclusive() {
    let f = fixture();
    let subject = vehicle(4);
    let t = base_time();

    for hours in 0..4 {
        let h = header(subject, t + Duration::hours(hours), &format!("h{}", hours));
        f.repo.store_object(&h, Bytes::from_static(b"{}")).await.unwrap();
    }

    let opts = SearchOptions::default()
        .with_subject(subject)
        .after(t)
        .before(t + Duration::hours(3));
    let rows = f.repo.list_indexes(10, &opts).await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.header.id.as_str()).collect();
    assert_eq!(ids, vec!["h2", "h1"]);
}

#[tokio::test]
async fn test_shared_key_fetched_once() {
    let f = fixture();
    let h1 = header(vehicle(5), base_time(), "first");
    let key = f
        .repo
        .store_object(&h1, Bytes::from_static(b"shared payload"))
        .await
        .unwrap();

    let mut h2 = header(vehicle(5), base_time() + Duration::seconds(1), "second");
    h2.event_type = "dimo.fingerprint".to_string();
    f.repo
        .store_object_with_key(&h2, &key, Bytes::from_static(b"shared payload"))
        .await
        .unwrap();

    let rows = f
        .repo
        .list_indexes(10, &SearchOptions::default().with_subject(vehicle(5)))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].index_key, rows[1].index_key);

    let gets_before = f.blobs.get_count();
    let objects = f.repo.fetch_objects(&rows).await.unwrap();
    assert_eq!(f.blobs.get_count() - gets_before, 1);
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0], objects[1]);
    assert_eq!(&objects[0][..], b"shared payload");
}

#[tokio::test]
async fn test_list_cloud_events_joins_payloads() {
    let f = fixture();
    for (i, token) in [(0, 6), (1, 6), (2, 7)] {
        let h = header(vehicle(token), base_time() + Duration::minutes(i), &format!("e{}", i));
        f.repo
            .store_object(&h, Bytes::from(format!("payload-{}", i)))
            .await
            .unwrap();
    }

    let events = f
        .repo
        .list_cloud_events(10, &SearchOptions::default().with_subject(vehicle(6)))
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].header.id, "e1");
    assert_eq!(&events[0].data[..], b"payload-1");
    assert_eq!(&events[1].data[..], b"payload-0");
}

#[tokio::test]
async fn test_store_round_trip() {
    let f = fixture();
    let subject = vehicle(8);
    let h = header(subject, base_time(), "round-trip");

    let key = f.repo.store_object(&h, Bytes::from_static(b"data")).await.unwrap();

    let index = decode_index(&key).unwrap();
    assert_eq!(index.subject, Subject::Did(subject));
    assert_eq!(index.timestamp, base_time());
    assert_eq!(index.primary_filler, "MA");
    assert!(f.blobs.contains(BUCKET, &key).await);

    let row = f
        .repo
        .latest_index(&SearchOptions::default().with_subject(subject))
        .await
        .unwrap();
    assert_eq!(row.index_key, key);
    assert_eq!(row.header.subject, subject.to_string());
    assert_eq!(row.header.data_version, "status/v1");
    assert_eq!(&f.repo.get_object(&key).await.unwrap()[..], b"data");
}

#[tokio::test]
async fn test_strict_store_rejects_malformed_header() {
    let f = fixture();
    let mut h = header(vehicle(9), base_time(), "bad");
    h.subject = "not-a-did".to_string();

    let err = f
        .repo
        .store_object(&h, Bytes::from_static(b"data"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Index(_)));
    assert_eq!(f.blobs.put_count(), 0);
    assert_eq!(f.columnar.row_count(TABLE_NAME).await, 0);
}

#[tokio::test]
async fn test_partial_store_accepts_malformed_header() {
    let f = fixture();
    let mut h = header(vehicle(9), base_time(), "partial");
    h.subject = "not-a-did".to_string();
    h.source = "garage".to_string();

    let key = f
        .repo
        .store_partial_object(&h, Bytes::from_static(b"data"))
        .await
        .unwrap();
    assert!(!key.is_empty());
    assert!(f.blobs.contains(BUCKET, &key).await);
    assert_eq!(f.columnar.row_count(TABLE_NAME).await, 1);

    // Raw fields keep their own width, so the key is not decodable
    assert!(decode_index(&key).is_err());

    let row = f.repo.latest_index(&SearchOptions::default()).await.unwrap();
    assert_eq!(row.header.subject, "not-a-did");
    assert_eq!(row.header.source, "garage");
    assert_eq!(row.index_key, key);
}

#[tokio::test]
async fn test_failed_blob_write_inserts_no_row() {
    let f = fixture();
    f.blobs.fail_puts(true);

    let err = f
        .repo
        .store_object(&header(vehicle(10), base_time(), "x"), Bytes::from_static(b"data"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::PutObject { .. }));
    assert_eq!(f.columnar.row_count(TABLE_NAME).await, 0);
}

#[tokio::test]
async fn test_failed_row_insert_orphans_blob() {
    let f = fixture();
    f.columnar.fail_inserts(true);

    let h = header(vehicle(11), base_time(), "orphan");
    let err = f
        .repo
        .store_object(&h, Bytes::from_static(b"data"))
        .await
        .unwrap_err();
    let key = match err {
        RepoError::StoreRow { key, .. } => key,
        other => panic!("unexpected error: {}", other),
    };
    assert!(f.blobs.contains(BUCKET, &key).await);
    assert_eq!(f.columnar.row_count(TABLE_NAME).await, 0);
}

#[tokio::test]
async fn test_slug_identifier_format() {
    init_tracing();
    let columnar = Arc::new(MemoryColumnarStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let repo = IndexRepository::new(columnar, blobs, BUCKET)
        .with_identifier_format(IdentifierFormat::Slug);

    let subject = vehicle(12);
    repo.store_object(&header(subject, base_time(), "slug"), Bytes::from_static(b"{}"))
        .await
        .unwrap();

    let row = repo
        .latest_index(&SearchOptions::default().with_subject(subject))
        .await
        .unwrap();
    assert_eq!(row.header.subject, subject.encode());
    assert_eq!(row.header.source, hex_without_prefix(Address::repeat_byte(0x5e)));
}

fn hex_without_prefix(address: Address) -> String {
    address.to_checksum(None).trim_start_matches("0x").to_string()
}

#[tokio::test]
async fn test_local_blob_store_backend() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let columnar = Arc::new(MemoryColumnarStore::new());
    let blobs = Arc::new(LocalBlobStore::new(dir.path()).await.unwrap());
    let repo = IndexRepository::new(columnar, blobs, BUCKET);

    let h = header(vehicle(13), base_time(), "on-disk");
    let key = repo.store_object(&h, Bytes::from_static(b"disk")).await.unwrap();

    assert!(dir.path().join(BUCKET).exists());
    assert_eq!(&repo.get_object(&key).await.unwrap()[..], b"disk");
    let event = repo
        .latest_cloud_event(&SearchOptions::default().with_subject(vehicle(13)))
        .await
        .unwrap();
    assert_eq!(&event.data[..], b"disk");
}

#[tokio::test]
async fn test_local_blob_store_keeps_malformed_headers() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("blobs");
    let columnar = Arc::new(MemoryColumnarStore::new());
    let blobs = Arc::new(LocalBlobStore::new(&base).await.unwrap());
    let repo = IndexRepository::new(columnar.clone(), blobs, BUCKET);

    let mut long = header(vehicle(14), base_time(), "long-raw-ids");
    long.subject = "s".repeat(120);
    long.producer = "p".repeat(120);

    let mut escaping = header(vehicle(14), base_time() + Duration::minutes(1), "dot-dot");
    escaping.subject = "../v".to_string();

    let mut rooted = header(vehicle(14), base_time() + Duration::minutes(2), "rooted");
    rooted.subject = "/etc/passwd".to_string();

    for (h, payload) in [(&long, "long"), (&escaping, "escaping"), (&rooted, "rooted")] {
        let key = repo
            .store_partial_object(h, Bytes::from(payload))
            .await
            .unwrap();
        assert!(key.starts_with(&h.subject));
        assert_eq!(&repo.get_object(&key).await.unwrap()[..], payload.as_bytes());
    }
    assert_eq!(columnar.row_count(TABLE_NAME).await, 3);

    let event = repo
        .latest_cloud_event(&SearchOptions::default().with_event_type(TYPE_STATUS))
        .await
        .unwrap();
    assert_eq!(event.header.subject, "/etc/passwd");
    assert_eq!(&event.data[..], b"rooted");

    // Objects never leave the store directory
    assert!(!dir.path().join("v").exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}
