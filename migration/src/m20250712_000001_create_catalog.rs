use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Genre::Table)
                    .if_not_exists()
                    .col(pk_auto(Genre::Id))
                    .col(string_uniq(Genre::Name))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(pk_auto(Movie::Id))
                    .col(integer_uniq(Movie::TmdbId))
                    .col(string(Movie::Title))
                    .col(text_null(Movie::Overview))
                    .col(string_null(Movie::PosterPath))
                    .col(string_null(Movie::ReleaseDate))
                    .col(boolean(Movie::IsReleased))
                    .col(boolean(Movie::IsBigRelease))
                    .col(big_integer(Movie::CreatedAt))
                    .col(big_integer(Movie::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_release_date")
                    .table(Movie::Table)
                    .col(Movie::ReleaseDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_is_released")
                    .table(Movie::Table)
                    .col(Movie::IsReleased)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieGenre::Table)
                    .if_not_exists()
                    .col(integer(MovieGenre::MovieId))
                    .col(integer(MovieGenre::GenreId))
                    .primary_key(
                        Index::create()
                            .col(MovieGenre::MovieId)
                            .col(MovieGenre::GenreId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genre_movie")
                            .from(MovieGenre::Table, MovieGenre::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genre_genre")
                            .from(MovieGenre::Table, MovieGenre::GenreId)
                            .to(Genre::Table, Genre::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Person::Table)
                    .if_not_exists()
                    .col(pk_auto(Person::Id))
                    .col(integer_uniq(Person::TmdbId))
                    .col(string(Person::Name))
                    .col(string_null(Person::ProfilePath))
                    .col(string(Person::KnownForDepartment))
                    .col(text_null(Person::Biography))
                    .col(string_null(Person::Birthday))
                    .col(string_null(Person::PlaceOfBirth))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CastCredit::Table)
                    .if_not_exists()
                    .col(pk_auto(CastCredit::Id))
                    .col(integer(CastCredit::MovieId))
                    .col(integer(CastCredit::PersonId))
                    .col(string(CastCredit::Character))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cast_credit_movie")
                            .from(CastCredit::Table, CastCredit::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cast_credit_person")
                            .from(CastCredit::Table, CastCredit::PersonId)
                            .to(Person::Table, Person::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cast_credit_movie")
                    .table(CastCredit::Table)
                    .col(CastCredit::MovieId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CrewCredit::Table)
                    .if_not_exists()
                    .col(pk_auto(CrewCredit::Id))
                    .col(integer(CrewCredit::MovieId))
                    .col(integer(CrewCredit::PersonId))
                    .col(string(CrewCredit::Job))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crew_credit_movie")
                            .from(CrewCredit::Table, CrewCredit::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crew_credit_person")
                            .from(CrewCredit::Table, CrewCredit::PersonId)
                            .to(Person::Table, Person::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crew_credit_movie")
                    .table(CrewCredit::Table)
                    .col(CrewCredit::MovieId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrewCredit::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CastCredit::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Person::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MovieGenre::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Movie::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Genre::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Genre {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    TmdbId,
    Title,
    Overview,
    PosterPath,
    ReleaseDate,
    IsReleased,
    IsBigRelease,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MovieGenre {
    Table,
    MovieId,
    GenreId,
}

#[derive(DeriveIden)]
enum Person {
    Table,
    Id,
    TmdbId,
    Name,
    ProfilePath,
    KnownForDepartment,
    Biography,
    Birthday,
    PlaceOfBirth,
}

#[derive(DeriveIden)]
enum CastCredit {
    Table,
    Id,
    MovieId,
    PersonId,
    Character,
}

#[derive(DeriveIden)]
enum CrewCredit {
    Table,
    Id,
    MovieId,
    PersonId,
    Job,
}
