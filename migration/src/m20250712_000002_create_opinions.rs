use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_uniq(Users::Username))
                    .col(big_integer(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieVote::Table)
                    .if_not_exists()
                    .col(pk_auto(MovieVote::Id))
                    .col(integer(MovieVote::UserId))
                    .col(integer(MovieVote::MovieId))
                    .col(string(MovieVote::Vote))
                    .col(big_integer(MovieVote::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_vote_user")
                            .from(MovieVote::Table, MovieVote::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_vote_movie")
                            .from(MovieVote::Table, MovieVote::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_vote_unique")
                    .table(MovieVote::Table)
                    .col(MovieVote::UserId)
                    .col(MovieVote::MovieId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(HypeVote::Table)
                    .if_not_exists()
                    .col(pk_auto(HypeVote::Id))
                    .col(integer(HypeVote::UserId))
                    .col(integer(HypeVote::MovieId))
                    .col(string(HypeVote::Vote))
                    .col(big_integer(HypeVote::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_hype_vote_user")
                            .from(HypeVote::Table, HypeVote::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_hype_vote_movie")
                            .from(HypeVote::Table, HypeVote::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_hype_vote_unique")
                    .table(HypeVote::Table)
                    .col(HypeVote::UserId)
                    .col(HypeVote::MovieId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Watchlist::Table)
                    .if_not_exists()
                    .col(pk_auto(Watchlist::Id))
                    .col(integer(Watchlist::UserId))
                    .col(integer(Watchlist::MovieId))
                    .col(big_integer(Watchlist::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watchlist_user")
                            .from(Watchlist::Table, Watchlist::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watchlist_movie")
                            .from(Watchlist::Table, Watchlist::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_watchlist_unique")
                    .table(Watchlist::Table)
                    .col(Watchlist::UserId)
                    .col(Watchlist::MovieId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Review::Table)
                    .if_not_exists()
                    .col(pk_auto(Review::Id))
                    .col(integer(Review::UserId))
                    .col(integer(Review::MovieId))
                    .col(integer(Review::Rating))
                    .col(text(Review::ReviewText))
                    .col(boolean(Review::ContainsSpoiler))
                    .col(big_integer(Review::CreatedAt))
                    .col(big_integer(Review::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_user")
                            .from(Review::Table, Review::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_movie")
                            .from(Review::Table, Review::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_review_unique")
                    .table(Review::Table)
                    .col(Review::UserId)
                    .col(Review::MovieId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReviewLike::Table)
                    .if_not_exists()
                    .col(pk_auto(ReviewLike::Id))
                    .col(integer(ReviewLike::UserId))
                    .col(integer(ReviewLike::ReviewId))
                    .col(big_integer(ReviewLike::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_like_user")
                            .from(ReviewLike::Table, ReviewLike::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_like_review")
                            .from(ReviewLike::Table, ReviewLike::ReviewId)
                            .to(Review::Table, Review::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_review_like_unique")
                    .table(ReviewLike::Table)
                    .col(ReviewLike::UserId)
                    .col(ReviewLike::ReviewId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReviewComment::Table)
                    .if_not_exists()
                    .col(pk_auto(ReviewComment::Id))
                    .col(integer(ReviewComment::UserId))
                    .col(integer(ReviewComment::ReviewId))
                    .col(integer_null(ReviewComment::ParentId))
                    .col(text(ReviewComment::Text))
                    .col(big_integer(ReviewComment::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_comment_user")
                            .from(ReviewComment::Table, ReviewComment::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_comment_review")
                            .from(ReviewComment::Table, ReviewComment::ReviewId)
                            .to(Review::Table, Review::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_comment_parent")
                            .from(ReviewComment::Table, ReviewComment::ParentId)
                            .to(ReviewComment::Table, ReviewComment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_review_comment_review")
                    .table(ReviewComment::Table)
                    .col(ReviewComment::ReviewId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CommentLike::Table)
                    .if_not_exists()
                    .col(pk_auto(CommentLike::Id))
                    .col(integer(CommentLike::UserId))
                    .col(integer(CommentLike::CommentId))
                    .col(big_integer(CommentLike::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_like_user")
                            .from(CommentLike::Table, CommentLike::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_like_comment")
                            .from(CommentLike::Table, CommentLike::CommentId)
                            .to(ReviewComment::Table, ReviewComment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_like_unique")
                    .table(CommentLike::Table)
                    .col(CommentLike::UserId)
                    .col(CommentLike::CommentId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommentLike::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReviewComment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReviewLike::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Review::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Watchlist::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(HypeVote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MovieVote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum MovieVote {
    Table,
    Id,
    UserId,
    MovieId,
    Vote,
    CreatedAt,
}

#[derive(DeriveIden)]
enum HypeVote {
    Table,
    Id,
    UserId,
    MovieId,
    Vote,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Watchlist {
    Table,
    Id,
    UserId,
    MovieId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Review {
    Table,
    Id,
    UserId,
    MovieId,
    Rating,
    ReviewText,
    ContainsSpoiler,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ReviewLike {
    Table,
    Id,
    UserId,
    ReviewId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ReviewComment {
    Table,
    Id,
    UserId,
    ReviewId,
    ParentId,
    Text,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CommentLike {
    Table,
    Id,
    UserId,
    CommentId,
    CreatedAt,
}
