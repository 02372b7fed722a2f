use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use jiff::civil::Date;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::OnConflict,
};
use tracing::{debug, info, warn};

use crate::{
    db::now_sec,
    entities::{cast_credit, crew_credit, genre, movie, movie_genre, person},
    error::{AppError, AppResult},
    tmdb::{MovieSummary, PersonDetails, SourceFeed, TmdbClient},
};

/// Records at or above this source popularity are flagged as big releases.
const BIG_RELEASE_POPULARITY: f64 = 50.0;

/// Only top-billed cast members are kept per movie.
const TOP_BILLED_CAST: usize = 12;

/// Crew jobs retained during sync.
const CREW_JOBS: [&str; 3] = ["Director", "Producer", "Writer"];

#[derive(Debug, Default)]
pub struct MovieSyncReport {
    pub genres: usize,
    pub processed: usize,
    pub feeds_failed: usize,
}

#[derive(Debug, Default)]
pub struct CreditSyncReport {
    pub movies_synced: usize,
    pub movies_skipped: usize,
    pub persons_enriched: usize,
    pub enrichment_failures: usize,
}

/// Pull the source feeds in priority order and upsert movies until `limit`
/// records have been processed. A failing feed is logged and skipped; a
/// failing genre fetch aborts the whole job since the category map is a
/// prerequisite for every record.
pub async fn sync_movies(
    db: &DatabaseConnection,
    tmdb: &TmdbClient,
    limit: usize,
    delay: Duration,
) -> AppResult<MovieSyncReport> {
    let genre_map = sync_genres(db, tmdb).await?;
    let today = today();

    let mut report = MovieSyncReport { genres: genre_map.len(), ..Default::default() };

    'feeds: for feed in SourceFeed::PRIORITY {
        let mut page: u32 = 1;
        loop {
            let data = match tmdb.fetch_page(feed, page).await {
                Ok(data) => data,
                Err(err) => {
                    warn!(feed = feed.name(), page, error = %err, "feed page failed, moving to next feed");
                    report.feeds_failed += 1;
                    continue 'feeds;
                },
            };

            if page == 1 && data.results.is_empty() {
                debug!(feed = feed.name(), "feed is empty, skipping");
                continue 'feeds;
            }

            for record in &data.results {
                upsert_movie_record(db, record, &genre_map, today).await?;
                report.processed += 1;
                if report.processed >= limit {
                    info!(processed = report.processed, "record limit reached");
                    break 'feeds;
                }
            }

            if page >= data.total_pages {
                continue 'feeds;
            }
            page += 1;
            tokio::time::sleep(delay).await;
        }
    }

    info!(
        genres = report.genres,
        processed = report.processed,
        feeds_failed = report.feeds_failed,
        "movie sync finished"
    );
    Ok(report)
}

/// Get-or-create local genres by name and map source genre ids onto them.
async fn sync_genres(
    db: &DatabaseConnection,
    tmdb: &TmdbClient,
) -> AppResult<HashMap<i32, i32>> {
    let genres = tmdb.fetch_genres().await?;

    let mut map = HashMap::with_capacity(genres.len());
    for g in genres {
        let local = match genre::Entity::find()
            .filter(genre::Column::Name.eq(&g.name))
            .one(db)
            .await?
        {
            Some(existing) => existing,
            None => {
                genre::ActiveModel { id: Default::default(), name: Set(g.name.clone()) }
                    .insert(db)
                    .await?
            },
        };
        map.insert(g.id, local.id);
    }
    Ok(map)
}

/// Upsert one raw record keyed by its external id, replacing every mutable
/// field in a single write, then reconcile the genre set.
pub(crate) async fn upsert_movie_record(
    db: &DatabaseConnection,
    record: &MovieSummary,
    genre_map: &HashMap<i32, i32>,
    today: Date,
) -> AppResult<movie::Model> {
    let (release_date, is_released) = derive_release(record.release_date.as_deref(), today);
    let now = now_sec();

    let model = movie::ActiveModel {
        id: Default::default(),
        tmdb_id: Set(record.id),
        title: Set(record.title.clone()),
        overview: Set(record.overview.clone().filter(|s| !s.is_empty())),
        poster_path: Set(record.poster_path.clone()),
        release_date: Set(release_date),
        is_released: Set(is_released),
        is_big_release: Set(record.popularity >= BIG_RELEASE_POPULARITY),
        created_at: Set(now),
        updated_at: Set(now),
    };

    movie::Entity::insert(model)
        .on_conflict(
            OnConflict::column(movie::Column::TmdbId)
                .update_columns([
                    movie::Column::Title,
                    movie::Column::Overview,
                    movie::Column::PosterPath,
                    movie::Column::ReleaseDate,
                    movie::Column::IsReleased,
                    movie::Column::IsBigRelease,
                    movie::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;

    let movie = movie::Entity::find()
        .filter(movie::Column::TmdbId.eq(record.id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound("movie"))?;

    let target: HashSet<i32> =
        record.genre_ids.iter().filter_map(|g| genre_map.get(g).copied()).collect();
    reconcile_genres(db, movie.id, &target).await?;

    Ok(movie)
}

/// A record with a missing or unparsable date is treated as having no
/// release date and stays unreleased.
pub(crate) fn derive_release(raw: Option<&str>, today: Date) -> (Option<String>, bool) {
    let parsed: Option<Date> = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok());

    match parsed {
        Some(date) => (Some(date.to_string()), date <= today),
        None => (None, false),
    }
}

/// Set reconciliation on the junction table: add the missing links, remove
/// the extraneous ones. Safe to run concurrently with additive readers.
async fn reconcile_genres(
    db: &DatabaseConnection,
    movie_id: i32,
    target: &HashSet<i32>,
) -> AppResult<()> {
    let current: HashSet<i32> = movie_genre::Entity::find()
        .filter(movie_genre::Column::MovieId.eq(movie_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.genre_id)
        .collect();

    for genre_id in target.difference(&current) {
        let res = movie_genre::Entity::insert(movie_genre::ActiveModel {
            movie_id: Set(movie_id),
            genre_id: Set(*genre_id),
        })
        .on_conflict(
            OnConflict::columns([movie_genre::Column::MovieId, movie_genre::Column::GenreId])
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await;
        match res {
            Ok(_) | Err(DbErr::RecordNotInserted) => {},
            Err(err) => return Err(err.into()),
        }
    }

    for genre_id in current.difference(target) {
        movie_genre::Entity::delete_many()
            .filter(movie_genre::Column::MovieId.eq(movie_id))
            .filter(movie_genre::Column::GenreId.eq(*genre_id))
            .exec(db)
            .await?;
    }

    Ok(())
}

/// Refresh cast and crew for the most recently updated movies, one credits
/// request per movie plus one detail request per person needing enrichment.
/// A failed credits fetch skips the movie; a failed person detail fetch
/// skips only the enrichment.
pub async fn sync_cast_and_crew(
    db: &DatabaseConnection,
    tmdb: &TmdbClient,
    limit: u64,
    delay: Duration,
) -> AppResult<CreditSyncReport> {
    let movies = movie::Entity::find()
        .order_by_desc(movie::Column::UpdatedAt)
        .limit(limit)
        .all(db)
        .await?;

    let mut report = CreditSyncReport::default();

    for (i, m) in movies.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }

        let credits = match tmdb.fetch_movie_credits(m.tmdb_id).await {
            Ok(credits) => credits,
            Err(err) => {
                warn!(movie = %m.title, tmdb_id = m.tmdb_id, error = %err, "credits fetch failed, skipping movie");
                report.movies_skipped += 1;
                continue;
            },
        };

        let mut cast_rows = Vec::new();
        for c in credits.cast.iter().take(TOP_BILLED_CAST) {
            let seed = PersonSeed {
                tmdb_id: c.id,
                name: c.name.clone(),
                profile_path: c.profile_path.clone(),
                known_for_department: c.known_for_department.clone().unwrap_or_default(),
            };
            let person = resolve_person(db, tmdb, &seed, &mut report).await?;
            cast_rows.push((person.id, c.character.clone().unwrap_or_default()));
        }

        let mut crew_rows = Vec::new();
        for c in &credits.crew {
            let Some(job) = c.job.as_deref() else {
                continue;
            };
            if !CREW_JOBS.contains(&job) {
                continue;
            }
            let seed = PersonSeed {
                tmdb_id: c.id,
                name: c.name.clone(),
                profile_path: c.profile_path.clone(),
                known_for_department: c.known_for_department.clone().unwrap_or_default(),
            };
            let person = resolve_person(db, tmdb, &seed, &mut report).await?;
            crew_rows.push((person.id, job.to_string()));
        }

        replace_credits(db, m.id, &cast_rows, &crew_rows).await?;
        report.movies_synced += 1;
        debug!(movie = %m.title, cast = cast_rows.len(), crew = crew_rows.len(), "credits replaced");
    }

    info!(
        synced = report.movies_synced,
        skipped = report.movies_skipped,
        enriched = report.persons_enriched,
        enrichment_failures = report.enrichment_failures,
        "credits sync finished"
    );
    Ok(report)
}

pub(crate) struct PersonSeed {
    pub tmdb_id: i32,
    pub name: String,
    pub profile_path: Option<String>,
    pub known_for_department: String,
}

/// Get-or-create from the lightweight credit payload, then enrich from the
/// detail endpoint when the person is new or still missing a biography.
/// Enrichment failures keep the base record.
async fn resolve_person(
    db: &DatabaseConnection,
    tmdb: &TmdbClient,
    seed: &PersonSeed,
    report: &mut CreditSyncReport,
) -> AppResult<person::Model> {
    let (person, created) = get_or_create_person(db, seed).await?;

    if !created && !field_is_empty(&person.biography) {
        return Ok(person);
    }

    let details = match tmdb.fetch_person_details(person.tmdb_id).await {
        Ok(details) => details,
        Err(err) => {
            let err = AppError::Enrichment(err.to_string());
            warn!(person = %person.name, tmdb_id = person.tmdb_id, error = %err, "keeping base person record");
            report.enrichment_failures += 1;
            return Ok(person);
        },
    };

    match pending_person_update(&person, &details) {
        Some(update) => {
            let enriched = update.update(db).await?;
            report.persons_enriched += 1;
            Ok(enriched)
        },
        None => Ok(person),
    }
}

async fn get_or_create_person(
    db: &DatabaseConnection,
    seed: &PersonSeed,
) -> AppResult<(person::Model, bool)> {
    if let Some(existing) = person::Entity::find()
        .filter(person::Column::TmdbId.eq(seed.tmdb_id))
        .one(db)
        .await?
    {
        return Ok((existing, false));
    }

    let created = person::ActiveModel {
        id: Default::default(),
        tmdb_id: Set(seed.tmdb_id),
        name: Set(seed.name.clone()),
        profile_path: Set(seed.profile_path.clone()),
        known_for_department: Set(seed.known_for_department.clone()),
        biography: Set(None),
        birthday: Set(None),
        place_of_birth: Set(None),
    }
    .insert(db)
    .await?;

    Ok((created, true))
}

/// Enrichment is additive-only: fields that already hold a value are never
/// overwritten. Returns `None` when nothing would change.
pub(crate) fn pending_person_update(
    person: &person::Model,
    details: &PersonDetails,
) -> Option<person::ActiveModel> {
    let mut update = person::ActiveModel { id: Set(person.id), ..Default::default() };
    let mut changed = false;

    if field_is_empty(&person.biography) && field_has_value(&details.biography) {
        update.biography = Set(details.biography.clone());
        changed = true;
    }
    if field_is_empty(&person.birthday) && field_has_value(&details.birthday) {
        update.birthday = Set(details.birthday.clone());
        changed = true;
    }
    if field_is_empty(&person.place_of_birth) && field_has_value(&details.place_of_birth) {
        update.place_of_birth = Set(details.place_of_birth.clone());
        changed = true;
    }

    changed.then_some(update)
}

fn field_is_empty(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}

fn field_has_value(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Delete-then-recreate the credit rows for one movie inside a transaction,
/// so readers never see a half-replaced credit list.
pub(crate) async fn replace_credits(
    db: &DatabaseConnection,
    movie_id: i32,
    cast: &[(i32, String)],
    crew: &[(i32, String)],
) -> AppResult<()> {
    let txn = db.begin().await?;

    cast_credit::Entity::delete_many()
        .filter(cast_credit::Column::MovieId.eq(movie_id))
        .exec(&txn)
        .await?;
    crew_credit::Entity::delete_many()
        .filter(crew_credit::Column::MovieId.eq(movie_id))
        .exec(&txn)
        .await?;

    for (person_id, character) in cast {
        let model = cast_credit::ActiveModel {
            id: Default::default(),
            movie_id: Set(movie_id),
            person_id: Set(*person_id),
            character: Set(character.clone()),
        };
        cast_credit::Entity::insert(model).exec(&txn).await?;
    }

    for (person_id, job) in crew {
        let model = crew_credit::ActiveModel {
            id: Default::default(),
            movie_id: Set(movie_id),
            person_id: Set(*person_id),
            job: Set(job.clone()),
        };
        crew_credit::Entity::insert(model).exec(&txn).await?;
    }

    txn.commit().await?;
    Ok(())
}

fn today() -> Date {
    jiff::Zoned::now().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn record(tmdb_id: i32, genre_ids: Vec<i32>, release_date: Option<&str>) -> MovieSummary {
        MovieSummary {
            id: tmdb_id,
            title: format!("Movie {tmdb_id}"),
            overview: Some("An overview".to_string()),
            poster_path: Some("/poster.jpg".to_string()),
            release_date: release_date.map(str::to_string),
            genre_ids,
            popularity: 12.0,
        }
    }

    async fn seed_genres(db: &DatabaseConnection) -> HashMap<i32, i32> {
        let mut map = HashMap::new();
        for (source_id, name) in [(28, "Action"), (18, "Drama"), (35, "Comedy")] {
            let g = genre::ActiveModel { id: Default::default(), name: Set(name.to_string()) }
                .insert(db)
                .await
                .unwrap();
            map.insert(source_id, g.id);
        }
        map
    }

    #[test]
    fn released_flag_follows_release_date() {
        let today: Date = "2026-08-23".parse().unwrap();

        assert_eq!(
            derive_release(Some("2022-03-25"), today),
            (Some("2022-03-25".to_string()), true)
        );
        assert_eq!(
            derive_release(Some("2026-08-23"), today),
            (Some("2026-08-23".to_string()), true)
        );
        assert_eq!(
            derive_release(Some("2027-01-01"), today),
            (Some("2027-01-01".to_string()), false)
        );
        assert_eq!(derive_release(None, today), (None, false));
        assert_eq!(derive_release(Some(""), today), (None, false));
        // Unparsable dates count as having no release date at all.
        assert_eq!(derive_release(Some("soon"), today), (None, false));
    }

    #[tokio::test]
    async fn second_upsert_replaces_genre_set() {
        let db = test_db().await;
        let genre_map = seed_genres(&db).await;
        let today: Date = "2026-08-23".parse().unwrap();

        let first = upsert_movie_record(&db, &record(603, vec![28, 18], Some("1999-03-31")), &genre_map, today)
            .await
            .unwrap();
        let second = upsert_movie_record(&db, &record(603, vec![18, 35], Some("1999-03-31")), &genre_map, today)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(movie::Entity::find().all(&db).await.unwrap().len(), 1);

        let mut attached: Vec<i32> = movie_genre::Entity::find()
            .filter(movie_genre::Column::MovieId.eq(second.id))
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.genre_id)
            .collect();
        attached.sort_unstable();

        let mut expected = vec![genre_map[&18], genre_map[&35]];
        expected.sort_unstable();
        assert_eq!(attached, expected);
    }

    #[tokio::test]
    async fn upsert_keeps_created_at_and_replaces_fields() {
        let db = test_db().await;
        let genre_map = seed_genres(&db).await;
        let today: Date = "2026-08-23".parse().unwrap();

        let first =
            upsert_movie_record(&db, &record(550, vec![], Some("2030-01-01")), &genre_map, today)
                .await
                .unwrap();
        assert!(!first.is_released);

        let mut updated = record(550, vec![], Some("2020-01-01"));
        updated.title = "Fight Club".to_string();
        let second = upsert_movie_record(&db, &updated, &genre_map, today).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.title, "Fight Club");
        assert!(second.is_released);
    }

    #[tokio::test]
    async fn credits_resync_replaces_prior_rows() {
        let db = test_db().await;
        let genre_map = seed_genres(&db).await;
        let today: Date = "2026-08-23".parse().unwrap();
        let movie =
            upsert_movie_record(&db, &record(11, vec![], Some("2000-01-01")), &genre_map, today)
                .await
                .unwrap();

        let mut people = Vec::new();
        for tmdb_id in [1, 2, 3] {
            let seed = PersonSeed {
                tmdb_id,
                name: format!("Person {tmdb_id}"),
                profile_path: None,
                known_for_department: "Acting".to_string(),
            };
            let (p, created) = get_or_create_person(&db, &seed).await.unwrap();
            assert!(created);
            people.push(p);
        }

        replace_credits(
            &db,
            movie.id,
            &[(people[0].id, "Neo".to_string()), (people[1].id, "Trinity".to_string())],
            &[(people[2].id, "Director".to_string())],
        )
        .await
        .unwrap();

        replace_credits(
            &db,
            movie.id,
            &[(people[1].id, "Lead".to_string())],
            &[(people[0].id, "Writer".to_string())],
        )
        .await
        .unwrap();

        let cast = cast_credit::Entity::find()
            .filter(cast_credit::Column::MovieId.eq(movie.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(cast.len(), 1);
        assert_eq!(cast[0].person_id, people[1].id);
        assert_eq!(cast[0].character, "Lead");

        let crew = crew_credit::Entity::find()
            .filter(crew_credit::Column::MovieId.eq(movie.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(crew.len(), 1);
        assert_eq!(crew[0].job, "Writer");
    }

    #[test]
    fn enrichment_never_overwrites_filled_fields() {
        let person = person::Model {
            id: 1,
            tmdb_id: 99,
            name: "Someone".to_string(),
            profile_path: None,
            known_for_department: "Acting".to_string(),
            biography: Some("Existing biography".to_string()),
            birthday: None,
            place_of_birth: None,
        };

        let details = PersonDetails {
            biography: Some("Fresh biography".to_string()),
            birthday: Some("1970-01-01".to_string()),
            place_of_birth: Some("Somewhere".to_string()),
        };

        let update = pending_person_update(&person, &details).unwrap();
        assert!(matches!(update.biography, sea_orm::ActiveValue::NotSet));
        assert_eq!(update.birthday.unwrap(), Some("1970-01-01".to_string()));
        assert_eq!(update.place_of_birth.unwrap(), Some("Somewhere".to_string()));
    }

    #[test]
    fn enrichment_with_nothing_to_add_is_a_noop() {
        let person = person::Model {
            id: 1,
            tmdb_id: 99,
            name: "Someone".to_string(),
            profile_path: None,
            known_for_department: "Acting".to_string(),
            biography: Some("Bio".to_string()),
            birthday: Some("1970-01-01".to_string()),
            place_of_birth: Some("Somewhere".to_string()),
        };
        let details = PersonDetails {
            biography: Some("Other".to_string()),
            birthday: Some("1971-01-01".to_string()),
            place_of_birth: Some("Elsewhere".to_string()),
        };
        assert!(pending_person_update(&person, &details).is_none());
    }
}
