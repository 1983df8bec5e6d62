use tanka_core::db::open_db;
use tanka_core::{
    BlobStore, CollectionService, EntryDraft, EntryStatus, ImportContext, MemoryBlobStore,
    PersistenceError, PersistenceResult, ServiceError, SqliteBlobStore,
};

/// Blob store whose writes can be switched off.
#[derive(Default)]
struct FlakyBlobStore {
    inner: MemoryBlobStore,
    refuse_writes: bool,
}

impl BlobStore for FlakyBlobStore {
    fn get_blob(&self, name: &str) -> PersistenceResult<Option<String>> {
        self.inner.get_blob(name)
    }

    fn set_blob(&mut self, name: &str, body: &str) -> PersistenceResult<()> {
        if self.refuse_writes {
            return Err(PersistenceError::Unavailable("quota exceeded".to_string()));
        }
        self.inner.set_blob(name, body)
    }
}

fn draft(text: &str, tags: &str) -> EntryDraft {
    EntryDraft {
        tags: tags.to_string(),
        ..EntryDraft::new(text)
    }
}

#[test]
fn sqlite_blob_store_round_trips_bodies() {
    let mut conn = tanka_core::db::open_db_in_memory().unwrap();
    let mut blobs = SqliteBlobStore::new(&mut conn);

    assert_eq!(blobs.get_blob("tankaEntries").unwrap(), None);
    blobs.set_blob("tankaEntries", "[]").unwrap();
    blobs
        .set_blobs(&[("tankaEntries", "[1]"), ("seriesList", "[2]")])
        .unwrap();

    assert_eq!(blobs.get_blob("tankaEntries").unwrap().as_deref(), Some("[1]"));
    assert_eq!(blobs.get_blob("seriesList").unwrap().as_deref(), Some("[2]"));
}

#[test]
fn collection_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tanka.sqlite3");

    let (entry_id, series_id) = {
        let mut conn = open_db(&path).unwrap();
        let mut service = CollectionService::load(SqliteBlobStore::new(&mut conn)).unwrap();
        let series = service.create_series("春の連作", 5).unwrap();
        let entry = service
            .submit_entry(
                EntryDraft {
                    series_id: series.id.clone(),
                    ..draft("白鳥は\nかなしからずや", "海, 空 ,")
                },
                None,
            )
            .unwrap();
        (entry.id, series.id)
    };

    let mut conn = open_db(&path).unwrap();
    let service = CollectionService::load(SqliteBlobStore::new(&mut conn)).unwrap();
    let store = service.store();

    let entry = store.entry(&entry_id).unwrap();
    assert_eq!(entry.lines[1], "かなしからずや");
    assert_eq!(entry.tags, vec!["海", "空"]);
    assert_eq!(entry.series_id, series_id);
    assert_eq!(entry.status, EntryStatus::Unpublished);

    let series = store.series_by_id(&series_id).unwrap();
    assert_eq!(series.name, "春の連作");
    assert_eq!(series.entries, vec![entry_id.clone()]);
    assert_eq!(series.progress().label(), "1/5 首");
}

#[test]
fn blobs_are_written_as_camel_case_json() {
    let mut service = CollectionService::load(MemoryBlobStore::new()).unwrap();
    let series = service.create_series("連作", 0).unwrap();
    service
        .submit_entry(
            EntryDraft {
                series_id: series.id.clone(),
                ..draft("一行", "")
            },
            None,
        )
        .unwrap();

    let blobs = service.into_blobs();
    assert_eq!(blobs.names(), vec!["seriesList", "tankaEntries"]);
    let entries = blobs.get_blob("tankaEntries").unwrap().unwrap();
    assert!(entries.contains("\"seriesId\""));
    assert!(entries.contains("\"status\":\"unpublished\""));
    let series_body = blobs.get_blob("seriesList").unwrap().unwrap();
    assert!(series_body.contains("\"planCount\""));
}

/// Bodies as the browser app stored them: raw CSV status text, a short
/// native row whose missing date key was dropped, and a typed-in plan.
const BROWSER_ENTRIES: &str = r#"[
  {"id":"1700000000000","date":"2023-11-14T22:13:20.000Z","lines":["白鳥は","かなしからずや","空の青","海のあをにも","染まずただよふ"],"tags":["海"],"category":"","seriesId":"series-1700000000001","memo":"","status":"Published"},
  {"id":"short-row","lines":["一行だけ"],"tags":[],"category":"","seriesId":"","memo":"","status":"draft"},
  {"id":"import-1700000000002-1","date":"2023-04-05","lines":["a","b","c","d","e"],"tags":[],"category":"","seriesId":"","memo":""}
]"#;

const BROWSER_SERIES: &str = r#"[
  {"id":"series-1700000000001","name":"旅","planCount":-3,"entries":["1700000000000"]},
  {"id":"series-1700000000003","name":"空","planCount":"10","entries":[]}
]"#;

#[test]
fn browser_written_blobs_load_unchanged() {
    let mut blobs = MemoryBlobStore::new();
    blobs.set_blob("tankaEntries", BROWSER_ENTRIES).unwrap();
    blobs.set_blob("seriesList", BROWSER_SERIES).unwrap();

    let service = CollectionService::load(blobs).unwrap();
    let store = service.store();

    assert_eq!(store.entries().len(), 3);
    assert!(store.integrity_issues().is_empty());

    let published = store.entry("1700000000000").unwrap();
    assert_eq!(published.status, EntryStatus::Published);
    assert_eq!(published.series_id, "series-1700000000001");

    let short = store.entry("short-row").unwrap();
    assert!(short.date.is_empty());
    assert_eq!(short.lines, vec!["一行だけ", "", "", "", ""]);
    assert_eq!(short.status, EntryStatus::Unpublished);

    let legacy = store.entry("import-1700000000002-1").unwrap();
    assert_eq!(legacy.status, EntryStatus::Unpublished);

    let travel = store.series_by_id("series-1700000000001").unwrap();
    assert_eq!(travel.plan_count, 0);
    assert_eq!(travel.entries, vec!["1700000000000"]);
    assert_eq!(store.series_by_id("series-1700000000003").unwrap().plan_count, 10);
}

#[test]
fn corrupt_blob_is_reported_on_load() {
    let mut blobs = MemoryBlobStore::new();
    blobs.set_blob("tankaEntries", "{not json").unwrap();

    match CollectionService::load(blobs) {
        Err(ServiceError::Persistence(PersistenceError::CorruptBlob { blob, .. })) => {
            assert_eq!(blob, "tankaEntries");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("corrupt blob must not load"),
    }
}

#[test]
fn failed_save_leaves_state_unchanged() {
    let mut service = CollectionService::load(FlakyBlobStore::default()).unwrap();
    let kept = service.submit_entry(draft("残る歌", ""), None).unwrap();
    let before = service.store().clone();

    let mut blobs = service.into_blobs();
    blobs.refuse_writes = true;
    let mut service = CollectionService::load(blobs).unwrap();

    let err = service.submit_entry(draft("消える歌", ""), None).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Persistence(PersistenceError::Unavailable(_))
    ));
    assert_eq!(service.store(), &before);

    let err = service
        .import_csv_with(
            "id,date,line1,line2,line3,line4,line5,tags,category,seriesId,memo,status\nz,2024-01-01,x,,,,,,,,,",
            &ImportContext::with_stamp(1),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Persistence(_)));
    assert_eq!(service.store(), &before);
    assert!(service.store().entry(&kept.id).is_some());
}

#[test]
fn blank_submission_is_rejected() {
    let mut service = CollectionService::load(MemoryBlobStore::new()).unwrap();

    let err = service.submit_entry(draft(" \n\n  ", "tag"), None).unwrap_err();
    assert!(matches!(err, ServiceError::EmptySubmission));
    assert!(service.store().entries().is_empty());
}

#[test]
fn editing_keeps_date_and_status() {
    let mut service = CollectionService::load(MemoryBlobStore::new()).unwrap();
    let original = service.submit_entry(draft("初稿", ""), None).unwrap();
    service
        .set_status(&original.id, EntryStatus::Published)
        .unwrap();

    let edited = service
        .submit_entry(draft("改稿", "推敲"), Some(&original.id))
        .unwrap();

    assert_eq!(edited.id, original.id);
    assert_eq!(edited.date, original.date);
    assert_eq!(edited.status, EntryStatus::Published);
    assert_eq!(edited.lines[0], "改稿");
    assert_eq!(service.store().entries().len(), 1);

    let err = service
        .submit_entry(draft("誰か", ""), Some("missing"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::EntryNotFound(_)));
}

#[test]
fn submit_with_unknown_series_is_rejected() {
    let mut service = CollectionService::load(MemoryBlobStore::new()).unwrap();
    let err = service
        .submit_entry(
            EntryDraft {
                series_id: "ghost".to_string(),
                ..draft("歌", "")
            },
            None,
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));
    assert!(service.store().series().is_empty());
}
