pub mod assist_log;
pub mod cast_credit;
pub mod comment_like;
pub mod crew_credit;
pub mod genre;
pub mod hype_vote;
pub mod movie;
pub mod movie_genre;
pub mod movie_vote;
pub mod person;
pub mod review;
pub mod review_comment;
pub mod review_like;
pub mod user;
pub mod watchlist;
