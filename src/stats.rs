use std::collections::HashMap;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;

use crate::{
    entities::{hype_vote, movie_vote, review, review_comment, review_like},
    error::AppResult,
    models::{HypeSummary, HypeValue, ReviewSort, VoteCounts, VoteSummary, VoteValue},
};

/// Derived per-call from the vote rows; no counters are persisted.
pub async fn vote_summary(db: &DatabaseConnection, movie_id: i32) -> AppResult<VoteSummary> {
    let rows: Vec<(String, i64)> = movie_vote::Entity::find()
        .select_only()
        .column(movie_vote::Column::Vote)
        .column_as(movie_vote::Column::Id.count(), "count")
        .filter(movie_vote::Column::MovieId.eq(movie_id))
        .group_by(movie_vote::Column::Vote)
        .into_tuple()
        .all(db)
        .await?;

    let mut counts = VoteCounts::default();
    for (value, n) in rows {
        if let Some(v) = VoteValue::parse(&value) {
            counts.set(v, n as u64);
        }
    }
    Ok(VoteSummary::from_counts(counts))
}

pub async fn hype_summary(db: &DatabaseConnection, movie_id: i32) -> AppResult<HypeSummary> {
    let rows: Vec<(String, i64)> = hype_vote::Entity::find()
        .select_only()
        .column(hype_vote::Column::Vote)
        .column_as(hype_vote::Column::Id.count(), "count")
        .filter(hype_vote::Column::MovieId.eq(movie_id))
        .group_by(hype_vote::Column::Vote)
        .into_tuple()
        .all(db)
        .await?;

    let mut excited = 0u64;
    let mut not_excited = 0u64;
    for (value, n) in rows {
        match HypeValue::parse(&value) {
            Some(HypeValue::Excited) => excited = n as u64,
            Some(HypeValue::NotExcited) => not_excited = n as u64,
            None => {},
        }
    }
    Ok(HypeSummary::from_totals(excited, not_excited))
}

#[derive(Debug, Serialize)]
pub struct RankedReview {
    #[serde(flatten)]
    pub review: review::Model,
    pub like_count: u64,
    pub comment_count: u64,
    pub author_vote: Option<VoteValue>,
}

/// Reviews for a movie with engagement counts computed at query time.
/// `Liked` orders by (like_count desc, created_at desc), `Latest` by
/// created_at desc.
pub async fn ranked_reviews(
    db: &DatabaseConnection,
    movie_id: i32,
    sort: ReviewSort,
) -> AppResult<Vec<RankedReview>> {
    let reviews = review::Entity::find()
        .filter(review::Column::MovieId.eq(movie_id))
        .all(db)
        .await?;
    if reviews.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = reviews.iter().map(|r| r.id).collect();

    let like_rows: Vec<(i32, i64)> = review_like::Entity::find()
        .select_only()
        .column(review_like::Column::ReviewId)
        .column_as(review_like::Column::Id.count(), "count")
        .filter(review_like::Column::ReviewId.is_in(ids.clone()))
        .group_by(review_like::Column::ReviewId)
        .into_tuple()
        .all(db)
        .await?;
    let like_map: HashMap<i32, i64> = like_rows.into_iter().collect();

    let comment_rows: Vec<(i32, i64)> = review_comment::Entity::find()
        .select_only()
        .column(review_comment::Column::ReviewId)
        .column_as(review_comment::Column::Id.count(), "count")
        .filter(review_comment::Column::ReviewId.is_in(ids))
        .group_by(review_comment::Column::ReviewId)
        .into_tuple()
        .all(db)
        .await?;
    let comment_map: HashMap<i32, i64> = comment_rows.into_iter().collect();

    let author_ids: Vec<i32> = reviews.iter().map(|r| r.user_id).collect();
    let author_votes: HashMap<i32, String> = movie_vote::Entity::find()
        .filter(movie_vote::Column::MovieId.eq(movie_id))
        .filter(movie_vote::Column::UserId.is_in(author_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|v| (v.user_id, v.vote))
        .collect();

    let mut ranked: Vec<RankedReview> = reviews
        .into_iter()
        .map(|review| {
            let like_count = like_map.get(&review.id).copied().unwrap_or(0) as u64;
            let comment_count = comment_map.get(&review.id).copied().unwrap_or(0) as u64;
            let author_vote =
                author_votes.get(&review.user_id).and_then(|v| VoteValue::parse(v));
            RankedReview { review, like_count, comment_count, author_vote }
        })
        .collect();

    match sort {
        ReviewSort::Liked => ranked.sort_by(|a, b| {
            b.like_count
                .cmp(&a.like_count)
                .then(b.review.created_at.cmp(&a.review.created_at))
        }),
        ReviewSort::Latest => {
            ranked.sort_by(|a, b| b.review.created_at.cmp(&a.review.created_at))
        },
    }

    Ok(ranked)
}
