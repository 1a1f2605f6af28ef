use crate::config::Config;
use crate::models::{CastMember, MovieDetail, MovieSummary};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const POSTER_SIZE: &str = "w500";
pub const PROFILE_SIZE: &str = "w200";

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// The three TMDB reads the catalog needs.
#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn popular_movies(&self) -> Result<Vec<MovieSummary>>;
    /// Core movie record. `cast` is always empty; credits come from
    /// [`TmdbApi::fetch_credits`].
    async fn fetch_movie(&self, id: i64) -> Result<MovieDetail>;
    /// Credits in the order TMDB returns them.
    async fn fetch_credits(&self, id: i64) -> Result<Vec<CastMember>>;
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tmdb_api_key.clone(), config.tmdb_base_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{path}?api_key={}&language=en-US",
            self.base_url,
            urlencoding::encode(&self.api_key)
        )
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", redact(url), text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn popular_movies(&self) -> Result<Vec<MovieSummary>> {
        let url = self.url("/movie/popular");
        let data: PopularResponse = self.get_json(&url).await?;
        Ok(data.results)
    }

    async fn fetch_movie(&self, id: i64) -> Result<MovieDetail> {
        let url = self.url(&format!("/movie/{id}"));
        let detail: MovieDetail = self.get_json(&url).await?;
        Ok(MovieDetail {
            cast: Vec::new(),
            ..detail
        })
    }

    async fn fetch_credits(&self, id: i64) -> Result<Vec<CastMember>> {
        let url = self.url(&format!("/movie/{id}/credits"));
        let credits: Credits = self.get_json(&url).await?;
        Ok(credits.cast)
    }
}

#[derive(Debug, Deserialize)]
struct PopularResponse {
    results: Vec<MovieSummary>,
}

#[derive(Debug, Deserialize)]
struct Credits {
    #[serde(default)]
    cast: Vec<CastMember>,
}

/// Joins an image host base, a size segment and a TMDB relative path.
/// Returns `None` for an absent or blank path so callers can fall back to a
/// placeholder.
pub fn image_url(base: &str, size: &str, path: Option<&str>) -> Option<String> {
    let path = path.map(str::trim).filter(|p| !p.is_empty())?;
    Some(format!(
        "{}/{size}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

/// Keeps the API key out of error messages and logs.
fn redact(url: &str) -> String {
    match url.find("api_key=") {
        Some(start) => {
            let rest = &url[start + "api_key=".len()..];
            let end = rest.find('&').map(|i| &rest[i..]).unwrap_or("");
            format!("{}api_key=***{end}", &url[..start])
        }
        None => url.to_string(),
    }
}
