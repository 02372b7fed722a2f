use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::OnConflict,
};
use serde::Serialize;

use crate::{
    db::now_sec,
    entities::{
        comment_like, hype_vote, movie, movie_vote, review, review_comment, review_like,
        watchlist,
    },
    error::{AppError, AppResult},
    models::{HypeSummary, HypeValue, VoteValue},
};

pub const MAX_REVIEW_CHARS: usize = 1000;
pub const MAX_COMMENT_CHARS: usize = 500;

/// One row per (user, movie); repeat votes update in place via the unique
/// key, which is what serializes concurrent writers.
pub async fn cast_vote(
    db: &DatabaseConnection,
    user_id: i32,
    movie_id: i32,
    value: VoteValue,
) -> AppResult<()> {
    ensure_movie(db, movie_id).await?;

    movie_vote::Entity::insert(movie_vote::ActiveModel {
        id: Default::default(),
        user_id: Set(user_id),
        movie_id: Set(movie_id),
        vote: Set(value.as_str().to_string()),
        created_at: Set(now_sec()),
    })
    .on_conflict(
        OnConflict::columns([movie_vote::Column::UserId, movie_vote::Column::MovieId])
            .update_columns([movie_vote::Column::Vote])
            .to_owned(),
    )
    .exec(db)
    .await?;
    Ok(())
}

pub async fn remove_vote(db: &DatabaseConnection, user_id: i32, movie_id: i32) -> AppResult<bool> {
    let res = movie_vote::Entity::delete_many()
        .filter(movie_vote::Column::UserId.eq(user_id))
        .filter(movie_vote::Column::MovieId.eq(movie_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected > 0)
}

/// Hype is a pre-release signal only.
pub async fn cast_hype_vote(
    db: &DatabaseConnection,
    user_id: i32,
    movie_id: i32,
    value: HypeValue,
) -> AppResult<()> {
    let movie = ensure_movie(db, movie_id).await?;
    if movie.is_released {
        return Err(AppError::validation("hype votes are only for unreleased movies"));
    }

    hype_vote::Entity::insert(hype_vote::ActiveModel {
        id: Default::default(),
        user_id: Set(user_id),
        movie_id: Set(movie_id),
        vote: Set(value.as_str().to_string()),
        created_at: Set(now_sec()),
    })
    .on_conflict(
        OnConflict::columns([hype_vote::Column::UserId, hype_vote::Column::MovieId])
            .update_columns([hype_vote::Column::Vote])
            .to_owned(),
    )
    .exec(db)
    .await?;
    Ok(())
}

pub async fn remove_hype_vote(
    db: &DatabaseConnection,
    user_id: i32,
    movie_id: i32,
) -> AppResult<bool> {
    let res = hype_vote::Entity::delete_many()
        .filter(hype_vote::Column::UserId.eq(user_id))
        .filter(hype_vote::Column::MovieId.eq(movie_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected > 0)
}

/// Returns true when the movie ends up on the watchlist.
pub async fn toggle_watchlist(
    db: &DatabaseConnection,
    user_id: i32,
    movie_id: i32,
) -> AppResult<bool> {
    ensure_movie(db, movie_id).await?;

    let existing = watchlist::Entity::find()
        .filter(watchlist::Column::UserId.eq(user_id))
        .filter(watchlist::Column::MovieId.eq(movie_id))
        .one(db)
        .await?;

    match existing {
        Some(row) => {
            watchlist::Entity::delete_by_id(row.id).exec(db).await?;
            Ok(false)
        },
        None => {
            watchlist::Entity::insert(watchlist::ActiveModel {
                id: Default::default(),
                user_id: Set(user_id),
                movie_id: Set(movie_id),
                created_at: Set(now_sec()),
            })
            .exec(db)
            .await?;
            Ok(true)
        },
    }
}

/// Create or update the caller's review. created_at survives updates.
pub async fn submit_review(
    db: &DatabaseConnection,
    user_id: i32,
    movie_id: i32,
    rating: i32,
    text: &str,
    contains_spoiler: bool,
) -> AppResult<review::Model> {
    ensure_movie(db, movie_id).await?;

    if !(1..=5).contains(&rating) {
        return Err(AppError::validation("rating must be between 1 and 5"));
    }
    let text = validate_text(text, MAX_REVIEW_CHARS, "review")?;
    let now = now_sec();

    let existing = review::Entity::find()
        .filter(review::Column::UserId.eq(user_id))
        .filter(review::Column::MovieId.eq(movie_id))
        .one(db)
        .await?;

    let saved = match existing {
        Some(current) => {
            review::ActiveModel {
                id: Set(current.id),
                rating: Set(rating),
                review_text: Set(text),
                contains_spoiler: Set(contains_spoiler),
                updated_at: Set(now),
                ..Default::default()
            }
            .update(db)
            .await?
        },
        None => {
            review::ActiveModel {
                id: Default::default(),
                user_id: Set(user_id),
                movie_id: Set(movie_id),
                rating: Set(rating),
                review_text: Set(text),
                contains_spoiler: Set(contains_spoiler),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(db)
            .await?
        },
    };

    Ok(saved)
}

pub async fn delete_review(
    db: &DatabaseConnection,
    user_id: i32,
    movie_id: i32,
) -> AppResult<bool> {
    let res = review::Entity::delete_many()
        .filter(review::Column::UserId.eq(user_id))
        .filter(review::Column::MovieId.eq(movie_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected > 0)
}

/// Returns (liked, like_count) after the toggle.
pub async fn toggle_review_like(
    db: &DatabaseConnection,
    user_id: i32,
    review_id: i32,
) -> AppResult<(bool, u64)> {
    review::Entity::find_by_id(review_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("review"))?;

    let existing = review_like::Entity::find()
        .filter(review_like::Column::UserId.eq(user_id))
        .filter(review_like::Column::ReviewId.eq(review_id))
        .one(db)
        .await?;

    let liked = match existing {
        Some(row) => {
            review_like::Entity::delete_by_id(row.id).exec(db).await?;
            false
        },
        None => {
            review_like::Entity::insert(review_like::ActiveModel {
                id: Default::default(),
                user_id: Set(user_id),
                review_id: Set(review_id),
                created_at: Set(now_sec()),
            })
            .exec(db)
            .await?;
            true
        },
    };

    let like_count = review_like::Entity::find()
        .filter(review_like::Column::ReviewId.eq(review_id))
        .count(db)
        .await?;

    Ok((liked, like_count))
}

/// One level of nesting: a reply's parent must be a top-level comment on
/// the same review.
pub async fn add_comment(
    db: &DatabaseConnection,
    user_id: i32,
    review_id: i32,
    text: &str,
    parent_id: Option<i32>,
) -> AppResult<review_comment::Model> {
    review::Entity::find_by_id(review_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("review"))?;

    let text = validate_text(text, MAX_COMMENT_CHARS, "comment")?;

    if let Some(parent_id) = parent_id {
        let parent = review_comment::Entity::find_by_id(parent_id)
            .one(db)
            .await?
            .ok_or(AppError::NotFound("comment"))?;
        if parent.review_id != review_id {
            return Err(AppError::validation("parent comment belongs to a different review"));
        }
        if parent.parent_id.is_some() {
            return Err(AppError::validation("replies cannot be nested further"));
        }
    }

    let comment = review_comment::ActiveModel {
        id: Default::default(),
        user_id: Set(user_id),
        review_id: Set(review_id),
        parent_id: Set(parent_id),
        text: Set(text),
        created_at: Set(now_sec()),
    }
    .insert(db)
    .await?;

    Ok(comment)
}

pub async fn toggle_comment_like(
    db: &DatabaseConnection,
    user_id: i32,
    comment_id: i32,
) -> AppResult<bool> {
    review_comment::Entity::find_by_id(comment_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("comment"))?;

    let existing = comment_like::Entity::find()
        .filter(comment_like::Column::UserId.eq(user_id))
        .filter(comment_like::Column::CommentId.eq(comment_id))
        .one(db)
        .await?;

    match existing {
        Some(row) => {
            comment_like::Entity::delete_by_id(row.id).exec(db).await?;
            Ok(false)
        },
        None => {
            comment_like::Entity::insert(comment_like::ActiveModel {
                id: Default::default(),
                user_id: Set(user_id),
                comment_id: Set(comment_id),
                created_at: Set(now_sec()),
            })
            .exec(db)
            .await?;
            Ok(true)
        },
    }
}

#[derive(Debug, Serialize)]
pub struct WatchlistEntry {
    pub movie: movie::Model,
    pub added_at: i64,
    pub hype: HypeSummary,
}

/// The caller's watchlist, newest first, with per-movie hype totals.
pub async fn watchlist_with_hype(
    db: &DatabaseConnection,
    user_id: i32,
) -> AppResult<Vec<WatchlistEntry>> {
    let rows = watchlist::Entity::find()
        .filter(watchlist::Column::UserId.eq(user_id))
        .order_by_desc(watchlist::Column::CreatedAt)
        .all(db)
        .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let movie_ids: Vec<i32> = rows.iter().map(|r| r.movie_id).collect();
    let movies: HashMap<i32, movie::Model> = movie::Entity::find()
        .filter(movie::Column::Id.is_in(movie_ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    let hype_rows: Vec<(i32, String, i64)> = hype_vote::Entity::find()
        .select_only()
        .column(hype_vote::Column::MovieId)
        .column(hype_vote::Column::Vote)
        .column_as(hype_vote::Column::Id.count(), "count")
        .filter(hype_vote::Column::MovieId.is_in(movie_ids))
        .group_by(hype_vote::Column::MovieId)
        .group_by(hype_vote::Column::Vote)
        .into_tuple()
        .all(db)
        .await?;

    let mut totals: HashMap<i32, (u64, u64)> = HashMap::new();
    for (movie_id, vote, n) in hype_rows {
        let entry = totals.entry(movie_id).or_default();
        match HypeValue::parse(&vote) {
            Some(HypeValue::Excited) => entry.0 = n as u64,
            Some(HypeValue::NotExcited) => entry.1 = n as u64,
            None => {},
        }
    }

    let entries = rows
        .into_iter()
        .filter_map(|row| {
            let movie = movies.get(&row.movie_id)?.clone();
            let (excited, not_excited) = totals.get(&row.movie_id).copied().unwrap_or((0, 0));
            Some(WatchlistEntry {
                movie,
                added_at: row.created_at,
                hype: HypeSummary::from_totals(excited, not_excited),
            })
        })
        .collect();

    Ok(entries)
}

async fn ensure_movie(db: &DatabaseConnection, movie_id: i32) -> AppResult<movie::Model> {
    movie::Entity::find_by_id(movie_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("movie"))
}

fn validate_text(text: &str, max_chars: usize, what: &str) -> AppResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation(format!("{what} cannot be empty")));
    }
    if text.chars().count() > max_chars {
        return Err(AppError::Validation(format!("{what} must be under {max_chars} characters")));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::entities::user;

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

    async fn seed_movie(db: &DatabaseConnection, tmdb_id: i32, released: bool) -> movie::Model {
        movie::ActiveModel {
            id: Default::default(),
            tmdb_id: Set(tmdb_id),
            title: Set(format!("Movie {tmdb_id}")),
            overview: Set(None),
            poster_path: Set(None),
            release_date: Set(None),
            is_released: Set(released),
            is_big_release: Set(false),
            created_at: Set(0),
            updated_at: Set(0),
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn repeat_vote_keeps_one_row_with_latest_value() {
        let db = test_db().await;
        let user = seed_user(&db, "ann").await;
        let movie = seed_movie(&db, 1, true).await;

        cast_vote(&db, user.id, movie.id, VoteValue::Good).await.unwrap();
        cast_vote(&db, user.id, movie.id, VoteValue::Masterpiece).await.unwrap();

        let votes = movie_vote::Entity::find()
            .filter(movie_vote::Column::MovieId.eq(movie.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].vote, "masterpiece");

        assert!(remove_vote(&db, user.id, movie.id).await.unwrap());
        assert!(!remove_vote(&db, user.id, movie.id).await.unwrap());
    }

    #[tokio::test]
    async fn hype_votes_rejected_for_released_movies() {
        let db = test_db().await;
        let user = seed_user(&db, "bob").await;
        let released = seed_movie(&db, 2, true).await;
        let upcoming = seed_movie(&db, 3, false).await;

        let err = cast_hype_vote(&db, user.id, released.id, HypeValue::Excited)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        cast_hype_vote(&db, user.id, upcoming.id, HypeValue::Excited).await.unwrap();
        cast_hype_vote(&db, user.id, upcoming.id, HypeValue::NotExcited).await.unwrap();

        let votes = hype_vote::Entity::find()
            .filter(hype_vote::Column::MovieId.eq(upcoming.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].vote, "not_excited");
    }

    #[tokio::test]
    async fn review_length_boundary() {
        let db = test_db().await;
        let user = seed_user(&db, "carol").await;
        let movie = seed_movie(&db, 4, true).await;

        let exactly_1000 = "x".repeat(1000);
        submit_review(&db, user.id, movie.id, 5, &exactly_1000, false).await.unwrap();

        let too_long = "x".repeat(1001);
        let err = submit_review(&db, user.id, movie.id, 5, &too_long, false).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = submit_review(&db, user.id, movie.id, 0, "fine", false).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = submit_review(&db, user.id, movie.id, 3, "   ", false).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn review_update_preserves_created_at() {
        let db = test_db().await;
        let user = seed_user(&db, "dave").await;
        let movie = seed_movie(&db, 5, true).await;

        let first = submit_review(&db, user.id, movie.id, 3, "okay", false).await.unwrap();
        let second = submit_review(&db, user.id, movie.id, 5, "actually great", true)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.rating, 5);
        assert!(second.contains_spoiler);

        assert!(delete_review(&db, user.id, movie.id).await.unwrap());
        assert!(!delete_review(&db, user.id, movie.id).await.unwrap());
    }

    #[tokio::test]
    async fn like_and_watchlist_toggles() {
        let db = test_db().await;
        let author = seed_user(&db, "eve").await;
        let fan = seed_user(&db, "frank").await;
        let movie = seed_movie(&db, 6, true).await;
        let review = submit_review(&db, author.id, movie.id, 4, "good one", false)
            .await
            .unwrap();

        assert_eq!(toggle_review_like(&db, fan.id, review.id).await.unwrap(), (true, 1));
        assert_eq!(toggle_review_like(&db, author.id, review.id).await.unwrap(), (true, 2));
        assert_eq!(toggle_review_like(&db, fan.id, review.id).await.unwrap(), (false, 1));

        assert!(toggle_watchlist(&db, fan.id, movie.id).await.unwrap());
        assert!(!toggle_watchlist(&db, fan.id, movie.id).await.unwrap());
    }

    #[tokio::test]
    async fn comment_reply_depth_is_bounded() {
        let db = test_db().await;
        let author = seed_user(&db, "gail").await;
        let movie = seed_movie(&db, 7, true).await;
        let review = submit_review(&db, author.id, movie.id, 4, "worth a watch", false)
            .await
            .unwrap();

        let top = add_comment(&db, author.id, review.id, "agreed", None).await.unwrap();
        let reply = add_comment(&db, author.id, review.id, "same", Some(top.id)).await.unwrap();

        let err = add_comment(&db, author.id, review.id, "deeper", Some(reply.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = add_comment(&db, author.id, review.id, "", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(toggle_comment_like(&db, author.id, top.id).await.unwrap());
        assert!(!toggle_comment_like(&db, author.id, top.id).await.unwrap());
    }

    #[tokio::test]
    async fn watchlist_listing_carries_hype_totals() {
        let db = test_db().await;
        let user = seed_user(&db, "hank").await;
        let voter = seed_user(&db, "iris").await;
        let upcoming = seed_movie(&db, 8, false).await;

        toggle_watchlist(&db, user.id, upcoming.id).await.unwrap();
        cast_hype_vote(&db, user.id, upcoming.id, HypeValue::Excited).await.unwrap();
        cast_hype_vote(&db, voter.id, upcoming.id, HypeValue::Excited).await.unwrap();

        let entries = watchlist_with_hype(&db, user.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].movie.id, upcoming.id);
        assert_eq!(entries[0].hype.excited, 2);
        assert_eq!(entries[0].hype.score, 100);
    }
}
