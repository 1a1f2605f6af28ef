use cineshelf::favorites::{FavoritesStore, FAVORITES_KEY};
use cineshelf::kv::{FileStore, KeyValueStore};
use cineshelf::models::MovieSummary;
use std::sync::Arc;

fn summary(id: i64, title: &str) -> MovieSummary {
    MovieSummary {
        id,
        title: title.to_string(),
        poster_path: None,
        release_date: "2014-11-05".to_string(),
        vote_average: 8.4,
    }
}

#[test]
fn file_backed_favorites_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let store = FavoritesStore::new(Arc::new(FileStore::open(dir.path()).expect("open")));
        assert!(store.toggle_favorite(summary(157336, "Interstellar")).expect("toggle"));
        assert!(store.toggle_favorite(summary(27205, "Inception")).expect("toggle"));
    }

    let reopened = FavoritesStore::new(Arc::new(FileStore::open(dir.path()).expect("reopen")));
    let ids: Vec<i64> = reopened.get_all().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![157336, 27205]);
}

#[test]
fn tabs_sharing_a_file_store_see_each_other() {
    let dir = tempfile::tempdir().expect("tempdir");
    let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).expect("open"));
    let tab_a = FavoritesStore::new(kv.clone());
    let tab_b = FavoritesStore::new(kv);
    let mut events = tab_b.storage_events();

    tab_a.toggle_favorite(summary(603, "The Matrix")).expect("toggle");

    let event = events.try_recv().expect("storage event");
    assert_eq!(event.key, FAVORITES_KEY);
    assert!(tab_b.is_favorite(603));

    tab_b.toggle_favorite(summary(603, "The Matrix")).expect("toggle");
    assert!(!tab_a.is_favorite(603));
    assert!(tab_a.get_all().is_empty());
}

#[test]
fn corrupt_file_reads_as_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("favorites.json"), "[{\"id\": 1,").expect("seed");
    let store = FavoritesStore::new(Arc::new(FileStore::open(dir.path()).expect("open")));
    assert!(store.get_all().is_empty());
    assert!(store.toggle_favorite(summary(1, "Recovered")).expect("toggle"));
    assert_eq!(store.get_all().len(), 1);
}
