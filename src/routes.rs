use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{FromRequestParts, Path, Query, State},
    http::request::Parts,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    AppState, ai,
    entities::{cast_credit, crew_credit, genre, movie, movie_genre, person, review, user},
    error::{AppError, AppResult},
    models::{HypeValue, ReviewSort, RewriteMode, VoteValue},
    opinions, stats,
};

const MOVIES_PER_PAGE: u64 = 20;
const REVIEWS_PER_PAGE: usize = 10;

/// Identity is injected upstream by the auth front as an `x-user-id` header.
/// Anything missing or malformed is rejected before the handler runs.
pub struct AuthUser(pub i32);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i32>().ok())
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

#[derive(Debug, Deserialize)]
pub struct MovieListQuery {
    search: Option<String>,
    genre: Option<i32>,
    released: Option<bool>,
    #[serde(default = "default_page")]
    page: u64,
}

fn default_page() -> u64 {
    1
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MovieListQuery>,
) -> AppResult<Json<Value>> {
    let mut query = movie::Entity::find();

    if let Some(search) = q.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(movie::Column::Title.contains(search));
    }
    if let Some(genre_id) = q.genre {
        let movie_ids: Vec<i32> = movie_genre::Entity::find()
            .select_only()
            .column(movie_genre::Column::MovieId)
            .filter(movie_genre::Column::GenreId.eq(genre_id))
            .into_tuple()
            .all(&state.db)
            .await?;
        query = query.filter(movie::Column::Id.is_in(movie_ids));
    }
    if let Some(released) = q.released {
        query = query.filter(movie::Column::IsReleased.eq(released));
    }

    let paginator = query
        .order_by_desc(movie::Column::IsReleased)
        .order_by_desc(movie::Column::ReleaseDate)
        .paginate(&state.db, MOVIES_PER_PAGE);

    let total_pages = paginator.num_pages().await?;
    let page = q.page.max(1);
    let movies = paginator.fetch_page(page - 1).await?;

    Ok(Json(json!({
        "ok": true,
        "page": page,
        "total_pages": total_pages,
        "movies": movies,
    })))
}

#[derive(Debug, Serialize)]
struct CastEntry {
    person: person::Model,
    character: String,
}

#[derive(Debug, Serialize)]
struct CrewEntry {
    person: person::Model,
    job: String,
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
) -> AppResult<Json<Value>> {
    let movie = find_movie(&state.db, movie_id).await?;

    let genre_ids: Vec<i32> = movie_genre::Entity::find()
        .select_only()
        .column(movie_genre::Column::GenreId)
        .filter(movie_genre::Column::MovieId.eq(movie.id))
        .into_tuple()
        .all(&state.db)
        .await?;
    let genres = genre::Entity::find()
        .filter(genre::Column::Id.is_in(genre_ids))
        .all(&state.db)
        .await?;

    let cast = credit_entries(&state.db, movie.id).await?;
    let crew = crew_entries(&state.db, movie.id).await?;
    let votes = stats::vote_summary(&state.db, movie.id).await?;

    let hype = if movie.is_released {
        None
    } else {
        Some(stats::hype_summary(&state.db, movie.id).await?)
    };

    Ok(Json(json!({
        "ok": true,
        "movie": movie,
        "genres": genres,
        "cast": cast,
        "crew": crew,
        "votes": votes,
        "hype": hype,
    })))
}

async fn credit_entries(db: &DatabaseConnection, movie_id: i32) -> AppResult<Vec<CastEntry>> {
    let credits = cast_credit::Entity::find()
        .filter(cast_credit::Column::MovieId.eq(movie_id))
        .all(db)
        .await?;
    let people = load_people(db, credits.iter().map(|c| c.person_id)).await?;

    Ok(credits
        .into_iter()
        .filter_map(|c| {
            let person = people.get(&c.person_id)?.clone();
            Some(CastEntry { person, character: c.character })
        })
        .collect())
}

async fn crew_entries(db: &DatabaseConnection, movie_id: i32) -> AppResult<Vec<CrewEntry>> {
    let credits = crew_credit::Entity::find()
        .filter(crew_credit::Column::MovieId.eq(movie_id))
        .all(db)
        .await?;
    let people = load_people(db, credits.iter().map(|c| c.person_id)).await?;

    Ok(credits
        .into_iter()
        .filter_map(|c| {
            let person = people.get(&c.person_id)?.clone();
            Some(CrewEntry { person, job: c.job })
        })
        .collect())
}

async fn load_people(
    db: &DatabaseConnection,
    ids: impl Iterator<Item = i32>,
) -> AppResult<HashMap<i32, person::Model>> {
    let ids: Vec<i32> = ids.collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(person::Entity::find()
        .filter(person::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect())
}

pub async fn person_detail(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<i32>,
) -> AppResult<Json<Value>> {
    let person = person::Entity::find_by_id(person_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound("person"))?;

    let cast_movie_ids: Vec<i32> = cast_credit::Entity::find()
        .select_only()
        .column(cast_credit::Column::MovieId)
        .filter(cast_credit::Column::PersonId.eq(person.id))
        .into_tuple()
        .all(&state.db)
        .await?;
    let crew_movie_ids: Vec<i32> = crew_credit::Entity::find()
        .select_only()
        .column(crew_credit::Column::MovieId)
        .filter(crew_credit::Column::PersonId.eq(person.id))
        .into_tuple()
        .all(&state.db)
        .await?;

    let acted_in = movie::Entity::find()
        .filter(movie::Column::Id.is_in(cast_movie_ids))
        .order_by_desc(movie::Column::ReleaseDate)
        .all(&state.db)
        .await?;
    let worked_on = movie::Entity::find()
        .filter(movie::Column::Id.is_in(crew_movie_ids))
        .order_by_desc(movie::Column::ReleaseDate)
        .all(&state.db)
        .await?;

    Ok(Json(json!({
        "ok": true,
        "person": person,
        "acted_in": acted_in,
        "worked_on": worked_on,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    #[serde(default)]
    sort: ReviewSort,
    #[serde(default = "default_page")]
    page: u64,
}

#[derive(Debug, Serialize)]
struct ReviewView {
    username: String,
    #[serde(flatten)]
    ranked: stats::RankedReview,
}

pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
    Query(q): Query<ReviewListQuery>,
) -> AppResult<Json<Value>> {
    find_movie(&state.db, movie_id).await?;

    let ranked = stats::ranked_reviews(&state.db, movie_id, q.sort).await?;
    let total = ranked.len();

    let page = q.page.max(1) as usize;
    let start = page.saturating_sub(1).saturating_mul(REVIEWS_PER_PAGE);
    let page_items: Vec<_> = ranked.into_iter().skip(start).take(REVIEWS_PER_PAGE).collect();

    let user_ids: Vec<i32> = page_items.iter().map(|r| r.review.user_id).collect();
    let usernames: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    let reviews: Vec<ReviewView> = page_items
        .into_iter()
        .map(|ranked| {
            let username = usernames.get(&ranked.review.user_id).cloned().unwrap_or_default();
            ReviewView { username, ranked }
        })
        .collect();

    Ok(Json(json!({
        "ok": true,
        "total": total,
        "page": page,
        "reviews": reviews,
    })))
}

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    vote: String,
}

pub async fn vote(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<VoteBody>,
) -> AppResult<Json<Value>> {
    if body.vote == "remove" {
        opinions::remove_vote(&state.db, user_id, movie_id).await?;
    } else {
        let value = VoteValue::parse(&body.vote)
            .ok_or_else(|| AppError::validation("unknown vote value"))?;
        opinions::cast_vote(&state.db, user_id, movie_id, value).await?;
    }

    let summary = stats::vote_summary(&state.db, movie_id).await?;
    Ok(Json(json!({ "ok": true, "votes": summary })))
}

pub async fn hype(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<VoteBody>,
) -> AppResult<Json<Value>> {
    if body.vote == "remove" {
        opinions::remove_hype_vote(&state.db, user_id, movie_id).await?;
    } else {
        let value = HypeValue::parse(&body.vote)
            .ok_or_else(|| AppError::validation("unknown hype value"))?;
        opinions::cast_hype_vote(&state.db, user_id, movie_id, value).await?;
    }

    let summary = stats::hype_summary(&state.db, movie_id).await?;
    Ok(Json(json!({ "ok": true, "hype": summary })))
}

pub async fn toggle_watchlist(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Value>> {
    let on_watchlist = opinions::toggle_watchlist(&state.db, user_id, movie_id).await?;
    Ok(Json(json!({ "ok": true, "on_watchlist": on_watchlist })))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    rating: i32,
    text: String,
    #[serde(default)]
    contains_spoiler: bool,
}

pub async fn put_review(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ReviewBody>,
) -> AppResult<Json<Value>> {
    let review = opinions::submit_review(
        &state.db,
        user_id,
        movie_id,
        body.rating,
        &body.text,
        body.contains_spoiler,
    )
    .await?;
    Ok(Json(json!({ "ok": true, "review": review })))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Value>> {
    let deleted = opinions::delete_review(&state.db, user_id, movie_id).await?;
    Ok(Json(json!({ "ok": true, "deleted": deleted })))
}

pub async fn toggle_review_like(
    State(state): State<Arc<AppState>>,
    Path(review_id): Path<i32>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Value>> {
    let (liked, like_count) = opinions::toggle_review_like(&state.db, user_id, review_id).await?;
    Ok(Json(json!({ "ok": true, "liked": liked, "like_count": like_count })))
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    text: String,
    parent_id: Option<i32>,
}

pub async fn post_comment(
    State(state): State<Arc<AppState>>,
    Path(review_id): Path<i32>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CommentBody>,
) -> AppResult<Json<Value>> {
    let comment =
        opinions::add_comment(&state.db, user_id, review_id, &body.text, body.parent_id).await?;
    Ok(Json(json!({ "ok": true, "comment": comment })))
}

pub async fn toggle_comment_like(
    State(state): State<Arc<AppState>>,
    Path(comment_id): Path<i32>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Value>> {
    let liked = opinions::toggle_comment_like(&state.db, user_id, comment_id).await?;
    Ok(Json(json!({ "ok": true, "liked": liked })))
}

pub async fn my_watchlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Value>> {
    let entries = opinions::watchlist_with_hype(&state.db, user_id).await?;
    Ok(Json(json!({ "ok": true, "watchlist": entries })))
}

#[derive(Debug, Deserialize)]
pub struct RewriteBody {
    #[serde(default)]
    text: String,
    mode: RewriteMode,
}

/// Rewrite runs under a per-user sliding window; every attempt lands in the
/// audit log before the model is called.
pub async fn assist_rewrite(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<RewriteBody>,
) -> AppResult<Json<Value>> {
    let movie = find_movie(&state.db, movie_id).await?;

    if body.text.chars().count() > opinions::MAX_REVIEW_CHARS {
        return Err(AppError::validation("review is too long to rewrite"));
    }

    let allowed = ai::within_rate_limit(
        &state.db,
        user_id,
        "rewrite",
        state.config.assist_window_minutes,
        state.config.assist_request_limit,
    )
    .await?;
    if !allowed {
        return Err(AppError::RateLimit);
    }

    tracing::debug!(user_id, movie_id, mode = body.mode.as_str(), "assist rewrite requested");
    let entry =
        ai::log_attempt(&state.db, user_id, Some(movie.id), "rewrite", &body.text).await?;

    let overview = movie.overview.as_deref().unwrap_or_default();
    match state.ai.rewrite(&body.text, body.mode, &movie.title, overview).await {
        Ok(rewritten) => {
            ai::log_success(&state.db, entry, &rewritten).await?;
            Ok(Json(json!({ "ok": true, "text": rewritten })))
        },
        Err(err) => {
            ai::log_failure(&state.db, entry, &err.to_string()).await?;
            Err(err)
        },
    }
}

pub async fn assist_pros_cons(
    State(state): State<Arc<AppState>>,
    Path(review_id): Path<i32>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Value>> {
    let review = review::Entity::find_by_id(review_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound("review"))?;

    let allowed = ai::within_rate_limit(
        &state.db,
        user_id,
        "pros_cons",
        state.config.assist_window_minutes,
        state.config.assist_request_limit,
    )
    .await?;
    if !allowed {
        return Err(AppError::RateLimit);
    }

    let entry = ai::log_attempt(
        &state.db,
        user_id,
        Some(review.movie_id),
        "pros_cons",
        &review.review_text,
    )
    .await?;

    match state.ai.extract_pros_cons(&review.review_text).await {
        Ok(pros_cons) => {
            let raw = serde_json::to_string(&pros_cons).unwrap_or_default();
            ai::log_success(&state.db, entry, &raw).await?;
            Ok(Json(json!({ "ok": true, "pros": pros_cons.pros, "cons": pros_cons.cons })))
        },
        Err(err) => {
            ai::log_failure(&state.db, entry, &err.to_string()).await?;
            Err(err)
        },
    }
}

async fn find_movie(db: &DatabaseConnection, movie_id: i32) -> AppResult<movie::Model> {
    movie::Entity::find_by_id(movie_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("movie"))
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveModelTrait, Set};

    use super::*;
    use crate::{
        ai::AiClient,
        config::Config,
        db::test_db,
        entities::assist_log,
        tmdb::TmdbClient,
    };

    async fn test_state() -> Arc<AppState> {
        let db = test_db().await;
        let config = Arc::new(Config::for_tests());
        let http = reqwest::Client::new();
        let tmdb = Arc::new(TmdbClient::new(http.clone(), &config));
        let ai = Arc::new(AiClient::new(http, &config));
        Arc::new(AppState { config, db, tmdb, ai })
    }

    async fn seed_user(db: &DatabaseConnection, username: &str) -> user::Model {
        user::ActiveModel {
            id: Default::default(),
            username: Set(username.to_string()),
            created_at: Set(0),
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn seed_movie(db: &DatabaseConnection, tmdb_id: i32) -> movie::Model {
        movie::ActiveModel {
            id: Default::default(),
            tmdb_id: Set(tmdb_id),
            title: Set(format!("Movie {tmdb_id}")),
            overview: Set(None),
            poster_path: Set(None),
            release_date: Set(Some("2020-01-01".to_string())),
            is_released: Set(true),
            is_big_release: Set(false),
            created_at: Set(0),
            updated_at: Set(0),
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn review_listing_tolerates_huge_page_numbers() {
        let state = test_state().await;
        let m = seed_movie(&state.db, 1).await;
        let u = seed_user(&state.db, "ann").await;
        opinions::submit_review(&state.db, u.id, m.id, 4, "fine", false).await.unwrap();

        let resp = list_reviews(
            State(state.clone()),
            Path(m.id),
            Query(ReviewListQuery { sort: ReviewSort::Liked, page: u64::MAX }),
        )
        .await
        .unwrap();
        assert_eq!(resp.0["ok"], true);
        assert!(resp.0["reviews"].as_array().unwrap().is_empty());

        let first = list_reviews(
            State(state),
            Path(m.id),
            Query(ReviewListQuery { sort: ReviewSort::Liked, page: 1 }),
        )
        .await
        .unwrap();
        assert_eq!(first.0["reviews"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oversized_rewrite_input_is_rejected_before_any_call() {
        let state = test_state().await;
        let m = seed_movie(&state.db, 2).await;
        let u = seed_user(&state.db, "bob").await;

        let body = RewriteBody { text: "x".repeat(1001), mode: RewriteMode::Rewrite };
        let err = assist_rewrite(State(state.clone()), Path(m.id), AuthUser(u.id), Json(body))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Rejected before the rate-limit check, so nothing is logged.
        let logged = assist_log::Entity::find().all(&state.db).await.unwrap();
        assert!(logged.is_empty());
    }
}
