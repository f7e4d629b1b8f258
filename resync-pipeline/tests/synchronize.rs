//! End-to-end synchronization over the in-memory store and search engine.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use resync_pipeline::{
    FieldMapping, IndexSchema, RecordTransformer, SyncConfig, SyncEvent, SyncListeners,
    SyncSummary, Synchronizer, Termination,
};
use resync_repository::{
    MemoryRecordStore, MemorySearchEngine, SaveCounter, SaveHooks, SearchEngineClient,
};
use resync_shared::{Record, RecordFilter, SearchQuery};

const TITLES: [&str; 53] = [
    "American Gods",
    "The Great American Novel",
    "Beloved",
    "Invisible Man",
    "Their Eyes Were Watching God",
    "Native Son",
    "Go Tell It on the Mountain",
    "The Color Purple",
    "Song of Solomon",
    "Kindred",
    "Parable of the Sower",
    "The Bluest Eye",
    "Sula",
    "Jazz",
    "Passing",
    "Quicksand",
    "Cane",
    "The Souls of Black Folk",
    "Giovanni's Room",
    "Another Country",
    "The Fire Next Time",
    "A Raisin in the Sun",
    "Fences",
    "The Piano Lesson",
    "Homegoing",
    "The Underground Railroad",
    "The Nickel Boys",
    "Sing, Unburied, Sing",
    "Salvage the Bones",
    "The Water Dancer",
    "Between the World and Me",
    "Red at the Bone",
    "The Vanishing Half",
    "Mumbo Jumbo",
    "The Sellout",
    "Erasure",
    "Middle Passage",
    "The Known World",
    "Corregidora",
    "Meridian",
    "Praisesong for the Widow",
    "Brown Girl, Brownstones",
    "Invisible Cities",
    "The Fifth Season",
    "Dawn",
    "Wild Seed",
    "Dhalgren",
    "Babel-17",
    "Devil in a Blue Dress",
    "A Lesson Before Dying",
    "The Autobiography of Miss Jane Pittman",
    "Mama Day",
    "Brothers and Keepers",
];

fn transformer() -> RecordTransformer {
    RecordTransformer::new(
        IndexSchema::default()
            .field(FieldMapping::text("title").required())
            .field(FieldMapping::text("author")),
    )
}

struct Fixture {
    store: Arc<MemoryRecordStore>,
    engine: Arc<MemorySearchEngine>,
    saves: Arc<SaveCounter>,
    synchronizer: Synchronizer,
}

async fn fixture(with_untitled: bool) -> Fixture {
    let saves = Arc::new(SaveCounter::new());
    let mut hooks = SaveHooks::new();
    hooks.register(saves.clone());

    let store = Arc::new(MemoryRecordStore::with_hooks(hooks));
    store
        .insert_many(
            TITLES
                .iter()
                .map(|title| Record::empty().with_field("title", *title)),
        )
        .await;
    if with_untitled {
        store
            .insert(Record::empty().with_field("author", "Anonymous"))
            .await;
    }

    let engine = Arc::new(MemorySearchEngine::with_refresh_interval(Duration::from_secs(1)));
    let synchronizer = Synchronizer::new(store.clone(), engine.clone(), transformer());

    Fixture {
        store,
        engine,
        saves,
        synchronizer,
    }
}

async fn run(fixture: &Fixture, config: SyncConfig) -> (usize, usize, SyncSummary) {
    let mut data = 0;
    let mut errors = 0;
    let summary = fixture
        .synchronizer
        .synchronize(RecordFilter::all(), config)
        .drive(
            SyncListeners::new()
                .on_data(|_| data += 1)
                .on_error(|_| errors += 1),
        )
        .await;
    (data, errors, summary)
}

#[tokio::test(start_paused = true)]
async fn test_synchronize_with_save_and_one_invalid_record() {
    let fixture = fixture(true).await;

    let (data, errors, summary) = run(&fixture, SyncConfig::default()).await;

    assert_eq!(data, 53);
    assert_eq!(errors, 1);
    assert_eq!(fixture.saves.count(), 53);
    assert_eq!(summary.saved, 53);
    assert_eq!(summary.termination, Termination::Exhausted);
    assert!(summary.is_balanced());

    // Not searchable until the index refreshes.
    let query = SearchQuery::query_string("American");
    let before = fixture.engine.search(&query).await.unwrap();
    assert_eq!(before.total, 0);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let after = fixture.engine.search(&query).await.unwrap();
    assert_eq!(after.total, 2);
    assert_eq!(after.hits.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_synchronize_without_save() {
    let fixture = fixture(false).await;

    let (data, errors, summary) = run(&fixture, SyncConfig::default().save_on_synchronize(false)).await;

    assert_eq!((data, errors), (53, 0));
    assert_eq!(fixture.saves.count(), 0);
    assert_eq!(summary.saved, 0);
    assert_eq!(fixture.engine.document_count().await, 53);
}

#[tokio::test]
async fn test_repeated_runs_give_the_same_split() {
    let fixture = fixture(true).await;
    let config = SyncConfig::default().save_on_synchronize(false);

    let (first_data, first_errors, _) = run(&fixture, config.clone()).await;
    let (second_data, second_errors, _) = run(&fixture, config).await;

    assert_eq!((first_data, first_errors), (53, 1));
    assert_eq!((first_data, first_errors), (second_data, second_errors));
    assert_eq!(fixture.saves.count(), 0);
    // Reindexing overwrites rather than duplicates.
    assert_eq!(fixture.engine.indexed_count(), 106);
    assert_eq!(fixture.engine.document_count().await, 53);
}

#[tokio::test]
async fn test_empty_collection() {
    let fixture = fixture(false).await;
    fixture.store.clear().await;

    let events: Vec<SyncEvent> = fixture.synchronizer.synchronize_all().collect().await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        SyncEvent::Close(summary) => {
            assert_eq!(summary.pulled, 0);
            assert!(summary.is_balanced());
        }
        other => panic!("expected close, got {:?}", other),
    }
    assert_eq!(fixture.saves.count(), 0);
}

#[tokio::test]
async fn test_filter_limits_the_sweep() {
    let fixture = fixture(false).await;
    let tagged = Record::empty()
        .with_field("title", "Kindred")
        .with_field("shelf", "classics");
    fixture.store.insert(tagged.clone()).await;

    let events: Vec<SyncEvent> = fixture
        .synchronizer
        .synchronize(
            RecordFilter::all().with_field("shelf", "classics"),
            SyncConfig::default().save_on_synchronize(false),
        )
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], SyncEvent::Data(document) if document.id == tagged.id));
}

#[tokio::test]
async fn test_refresh_on_close_makes_documents_searchable() {
    let fixture = fixture(false).await;

    let (data, _, _) = run(
        &fixture,
        SyncConfig::default()
            .save_on_synchronize(false)
            .refresh_on_close(true),
    )
    .await;
    assert_eq!(data, 53);

    let response = fixture
        .engine
        .search(&SearchQuery::query_string("American"))
        .await
        .unwrap();
    assert_eq!(response.total, 2);
}
