use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

/// Source feeds pulled during reconciliation, in fixed priority order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SourceFeed {
    Popular,
    NowPlaying,
    Upcoming,
    Trending,
    Regional,
}

impl SourceFeed {
    pub const PRIORITY: [SourceFeed; 5] = [
        SourceFeed::Popular,
        SourceFeed::NowPlaying,
        SourceFeed::Upcoming,
        SourceFeed::Trending,
        SourceFeed::Regional,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SourceFeed::Popular => "popular",
            SourceFeed::NowPlaying => "now_playing",
            SourceFeed::Upcoming => "upcoming",
            SourceFeed::Trending => "trending",
            SourceFeed::Regional => "regional",
        }
    }
}

/// Read-only TMDB client. Constructed once at startup and passed by
/// reference; retries transient statuses with exponential backoff and
/// surfaces everything else as `AppError::Source`.
pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    region: String,
    languages: String,
    max_retries: u32,
    backoff: Duration,
}

impl TmdbClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        if config.tmdb_api_key.trim().is_empty() {
            tracing::warn!("no TMDB_API_KEY provided - catalog sync will fail");
        }

        Self {
            client,
            api_key: config.tmdb_api_key.clone(),
            base_url: config.tmdb_base_url.clone(),
            region: config.tmdb_region.clone(),
            languages: config.tmdb_languages.clone(),
            max_retries: config.tmdb_max_retries.max(1),
            backoff: Duration::from_millis(config.tmdb_backoff_ms),
        }
    }

    pub async fn fetch_genres(&self) -> AppResult<Vec<GenreRecord>> {
        let resp: GenreListResponse = self.get_json("/genre/movie/list", &[]).await?;
        Ok(resp.genres)
    }

    pub async fn fetch_page(&self, feed: SourceFeed, page: u32) -> AppResult<DiscoverPage> {
        let page = page.to_string();
        match feed {
            SourceFeed::Popular => {
                self.get_json("/movie/popular", &[("region", self.region.clone()), ("page", page)])
                    .await
            },
            SourceFeed::NowPlaying => {
                self.get_json(
                    "/movie/now_playing",
                    &[("region", self.region.clone()), ("page", page)],
                )
                .await
            },
            SourceFeed::Upcoming => {
                self.get_json("/movie/upcoming", &[("region", self.region.clone()), ("page", page)])
                    .await
            },
            SourceFeed::Trending => self.get_json("/trending/movie/week", &[("page", page)]).await,
            SourceFeed::Regional => {
                self.get_json(
                    "/discover/movie",
                    &[
                        ("region", self.region.clone()),
                        ("with_original_language", self.languages.clone()),
                        ("sort_by", "popularity.desc".to_string()),
                        ("page", page),
                    ],
                )
                .await
            },
        }
    }

    /// Movie detail with credits appended, one request per movie.
    pub async fn fetch_movie_credits(&self, tmdb_id: i32) -> AppResult<MovieCredits> {
        let resp: MovieWithCredits = self
            .get_json(
                &format!("/movie/{tmdb_id}"),
                &[("append_to_response", "credits".to_string())],
            )
            .await?;
        Ok(resp.credits)
    }

    pub async fn fetch_person_details(&self, tmdb_id: i32) -> AppResult<PersonDetails> {
        self.get_json(&format!("/person/{tmdb_id}"), &[]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut attempt: u32 = 0;

        loop {
            let result = self
                .client
                .get(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .query(params)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json::<T>()
                            .await
                            .map_err(|err| AppError::Source(format!("decoding {path}: {err}")));
                    }
                    if !is_retryable(status) {
                        return Err(AppError::Source(format!("{path} returned {status}")));
                    }
                    tracing::debug!(path, status = %status, attempt, "retryable status");
                },
                Err(err) => {
                    tracing::debug!(path, error = %err, attempt, "transport error");
                },
            }

            attempt += 1;
            if attempt >= self.max_retries {
                return Err(AppError::Source(format!("{path} failed after {attempt} attempts")));
            }
            tokio::time::sleep(self.backoff * 2u32.pow(attempt - 1)).await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

#[derive(Debug, Deserialize)]
struct GenreListResponse {
    genres: Vec<GenreRecord>,
}

#[derive(Debug, Deserialize)]
pub struct GenreRecord {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverPage {
    pub page: u32,
    pub results: Vec<MovieSummary>,
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct MovieSummary {
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    #[serde(default)]
    pub popularity: f64,
}

#[derive(Debug, Deserialize)]
struct MovieWithCredits {
    #[serde(default)]
    credits: MovieCredits,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieCredits {
    #[serde(default)]
    pub cast: Vec<CastRecord>,
    #[serde(default)]
    pub crew: Vec<CrewRecord>,
}

#[derive(Debug, Deserialize)]
pub struct CastRecord {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub known_for_department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CrewRecord {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub known_for_department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PersonDetails {
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub place_of_birth: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    /// Minimal HTTP stub that answers every connection with one fixed status
    /// and counts the requests it sees.
    async fn stub_server(status_line: &'static str, hits: Arc<AtomicUsize>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                hits.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let resp = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = socket.write_all(resp.as_bytes()).await;
            }
        });
        format!("http://{addr}")
    }

    fn client_against(base_url: String) -> TmdbClient {
        let mut config = crate::config::Config::for_tests();
        config.tmdb_base_url = base_url;
        TmdbClient::new(reqwest::Client::new(), &config)
    }

    #[tokio::test]
    async fn transient_failures_retry_until_the_ceiling() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base_url = stub_server("503 Service Unavailable", hits.clone()).await;

        let err = client_against(base_url).fetch_genres().await.unwrap_err();
        assert!(matches!(err, AppError::Source(_)), "{err}");
        // for_tests caps the client at 3 attempts
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_fail_without_retry() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base_url = stub_server("404 Not Found", hits.clone()).await;

        let err = client_against(base_url).fetch_genres().await.unwrap_err();
        assert!(matches!(err, AppError::Source(_)), "{err}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transient_statuses_are_retryable() {
        for code in [429u16, 500, 502, 503, 504] {
            assert!(is_retryable(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn client_errors_are_not_retryable() {
        for code in [400u16, 401, 403, 404, 422] {
            assert!(!is_retryable(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn discover_page_tolerates_sparse_records() {
        let raw = r#"{
            "page": 1,
            "results": [{"id": 603, "title": "The Matrix", "release_date": ""}],
            "total_pages": 12
        }"#;
        let page: DiscoverPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.total_pages, 12);
        assert_eq!(page.results[0].release_date.as_deref(), Some(""));
        assert!(page.results[0].genre_ids.is_empty());
    }
}
