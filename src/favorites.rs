use crate::kv::{KeyValueStore, StorageEvent, StoreError};
use crate::models::MovieSummary;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub const FAVORITES_KEY: &str = "favorites";

#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("failed to persist favorites: {0}")]
    Store(#[from] StoreError),
    #[error("failed to encode favorites: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Stored record. Unlike TMDB responses every field must be present.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredFavorite {
    id: i64,
    title: String,
    #[serde(deserialize_with = "Option::deserialize")]
    poster_path: Option<String>,
    release_date: String,
    vote_average: f64,
}

impl From<StoredFavorite> for MovieSummary {
    fn from(stored: StoredFavorite) -> Self {
        MovieSummary {
            id: stored.id,
            title: stored.title,
            poster_path: stored.poster_path,
            release_date: stored.release_date,
            vote_average: stored.vote_average,
        }
    }
}

type Listener = Arc<dyn Fn() + Send + Sync>;
type Listeners = Mutex<HashMap<u64, Listener>>;

/// One execution context's handle on the favorites list.
///
/// Handles built over the same store see each other's writes. In-process
/// listeners registered with [`FavoritesStore::subscribe`] belong to this
/// handle (and its clones) only; other contexts learn about changes through
/// [`FavoritesStore::storage_events`].
#[derive(Clone)]
pub struct FavoritesStore {
    kv: Arc<dyn KeyValueStore>,
    listeners: Arc<Listeners>,
    next_id: Arc<AtomicU64>,
}

/// Registration returned by [`FavoritesStore::subscribe`]. Dropping it
/// unregisters the callback.
#[must_use = "dropping the subscription unregisters the callback"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if let Ok(mut map) = listeners.lock() {
                map.remove(&self.id);
            }
        }
    }
}

impl FavoritesStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The persisted list. Absent, unreadable or malformed data reads as
    /// empty.
    pub fn get_all(&self) -> Vec<MovieSummary> {
        match self.kv.get(FAVORITES_KEY) {
            Some(raw) => decode(&raw),
            None => Vec::new(),
        }
    }

    pub fn is_favorite(&self, movie_id: i64) -> bool {
        self.get_all().iter().any(|m| m.id == movie_id)
    }

    /// Removes the movie if it is a favorite, otherwise appends it as given.
    /// Returns the new membership state.
    ///
    /// The read and the write are separate store calls. Two contexts toggling
    /// at the same time can lose one update; the last write wins.
    pub fn toggle_favorite(&self, movie: MovieSummary) -> Result<bool, FavoritesError> {
        let mut favorites = self.get_all();
        let before = favorites.len();
        favorites.retain(|m| m.id != movie.id);
        let now_favorite = favorites.len() == before;
        let (id, title) = (movie.id, movie.title.clone());
        if now_favorite {
            favorites.push(movie);
        }

        let encoded = serde_json::to_string(&favorites)?;
        self.kv.set(FAVORITES_KEY, &encoded)?;
        info!(
            movie_id = id,
            favorite = now_favorite,
            total = favorites.len(),
            "Toggled favorite '{}'",
            title
        );

        self.notify();
        Ok(now_favorite)
    }

    /// Registers a callback for the in-process "favorites updated" signal.
    ///
    /// Only code holding this handle is called back. Browser tabs are
    /// separate contexts and follow changes through
    /// [`FavoritesStore::storage_events`] instead.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut map) = self.listeners.lock() {
            map.insert(id, Arc::new(callback));
        }
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Storage-change events from every context sharing the store.
    pub fn storage_events(&self) -> broadcast::Receiver<StorageEvent> {
        self.kv.subscribe()
    }

    fn notify(&self) {
        let callbacks: Vec<Listener> = match self.listeners.lock() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => return,
        };
        for callback in callbacks {
            callback();
        }
    }
}

fn decode(raw: &str) -> Vec<MovieSummary> {
    let parsed: Vec<MovieSummary> = match serde_json::from_str::<Vec<StoredFavorite>>(raw) {
        Ok(list) => list.into_iter().map(MovieSummary::from).collect(),
        Err(e) => {
            warn!("Error loading favorites: {}", e);
            return Vec::new();
        }
    };
    let mut seen = HashSet::new();
    let total = parsed.len();
    let unique: Vec<MovieSummary> = parsed.into_iter().filter(|m| seen.insert(m.id)).collect();
    if unique.len() != total {
        warn!(
            "Dropped {} duplicate favorite entries",
            total - unique.len()
        );
    }
    unique
}
