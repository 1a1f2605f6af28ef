use crate::models::{MovieDetail, MovieSummary};
use crate::tmdb::TmdbApi;
use std::sync::Arc;
use tracing::{error, info};

pub const TOP_CAST: usize = 10;

#[derive(Clone)]
pub struct CatalogFetcher {
    tmdb: Arc<dyn TmdbApi>,
}

impl CatalogFetcher {
    pub fn new(tmdb: Arc<dyn TmdbApi>) -> Self {
        Self { tmdb }
    }

    /// First page of currently popular movies, or an empty list on failure.
    pub async fn popular(&self) -> Vec<MovieSummary> {
        match self.tmdb.popular_movies().await {
            Ok(movies) => {
                info!("Fetched {} popular movies", movies.len());
                movies
            }
            Err(e) => {
                error!("Error fetching movies: {:?}", e);
                Vec::new()
            }
        }
    }

    /// Movie record merged with its top-billed cast, or `None` if either
    /// request fails.
    pub async fn detail(&self, id: i64) -> Option<MovieDetail> {
        let fetched = tokio::try_join!(self.tmdb.fetch_movie(id), self.tmdb.fetch_credits(id));
        match fetched {
            Ok((movie, cast)) => Some(MovieDetail {
                cast: cast.into_iter().take(TOP_CAST).collect(),
                ..movie
            }),
            Err(e) => {
                error!("Error fetching movie details for {}: {:?}", id, e);
                None
            }
        }
    }
}

/// Case-insensitive substring match on the title, preserving input order.
/// An empty query matches everything.
pub fn filter_by_title<'a>(movies: &'a [MovieSummary], query: &str) -> Vec<&'a MovieSummary> {
    let needle = query.to_lowercase();
    movies
        .iter()
        .filter(|m| m.title.to_lowercase().contains(&needle))
        .collect()
}
