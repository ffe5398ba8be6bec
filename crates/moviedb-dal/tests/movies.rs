use futures::TryStreamExt as _;
use moviedb_dal::movie::{CreateMovie, MovieFilter, MovieRepositoryImpl, UpdateMovie};
use moviedb_dal::{Error, ListingParams, Order};
use moviedb_types::Runtime;
use sqlx::Executor;
use tracing_test::traced_test;

const TEST_DATA: &str = r#"
INSERT INTO movie (id, version, title, year, runtime, genres)
VALUES (1, 1, 'Casablanca', 1942, 102, '["drama","romance","war"]');
INSERT INTO movie (id, version, title, year, runtime, genres)
VALUES (2, 1, 'The Breakfast Club', 1985, 96, '["comedy","drama"]');
INSERT INTO movie (id, version, title, year, runtime, genres)
VALUES (3, 1, 'Black Panther', 2018, 134, '["action","adventure"]');
INSERT INTO movie (id, version, title, year, runtime, genres)
VALUES (4, 1, 'Deadpool', 2016, 108, '["action","comedy"]');
INSERT INTO movie (id, version, title, year, runtime, genres)
VALUES (5, 1, 'The Club', 2015, 98, '["drama"]');
"#;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    const DB_URL: &str = "sqlite::memory:";
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(DB_URL)
        .await
        .unwrap();
    moviedb_dal::ensure_schema(&conn).await.unwrap();

    conn.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    conn
}

fn genres(g: &[&str]) -> Vec<String> {
    g.iter().map(|s| s.to_string()).collect()
}

fn titles(movies: &[moviedb_dal::movie::Movie]) -> Vec<&str> {
    movies.iter().map(|m| m.title.as_str()).collect()
}

#[tokio::test]
async fn test_movie_create_and_get() {
    let conn = init_db().await;
    let repo = MovieRepositoryImpl::new(conn);

    let new_movie = CreateMovie {
        title: "Moana".to_string(),
        year: 2016,
        runtime: Runtime::new(107),
        genres: Some(genres(&["animation", "adventure"])),
    };

    let movie = repo.create(&new_movie).await.unwrap();
    assert_eq!(movie.id, 6);
    assert_eq!(movie.version, 1);
    assert_eq!(movie.title, "Moana");

    let stored = repo.get(movie.id).await.unwrap();
    assert_eq!(stored, movie);
    assert_eq!(stored.genres, genres(&["animation", "adventure"]));
    assert_eq!(stored.runtime.minutes(), 107);
}

#[tokio::test]
async fn test_movie_get_missing() {
    let conn = init_db().await;
    let repo = MovieRepositoryImpl::new(conn);

    for id in [-1, 0, 999] {
        let res = repo.get(id).await;
        assert!(matches!(res, Err(Error::RecordNotFound(_))), "id {id}");
    }
}

#[tokio::test]
#[traced_test]
async fn test_movie_update_version_guard() {
    let conn = init_db().await;
    sqlx::query("UPDATE movie SET version = 3 WHERE id = 1")
        .execute(&conn)
        .await
        .unwrap();
    let repo = MovieRepositoryImpl::new(conn);

    let mut first = repo.get(1).await.unwrap();
    let mut second = first.clone();
    assert_eq!(first.version, 3);

    first.title = "Casablanca (restored)".to_string();
    let updated = repo.update(&first).await.unwrap();
    assert_eq!(updated.version, 4);

    second.year = 1943;
    let res = repo.update(&second).await;
    assert!(matches!(
        res,
        Err(Error::EditConflict { id: 1, version: 3 })
    ));

    let stored = repo.get(1).await.unwrap();
    assert_eq!(stored.version, 4);
    assert_eq!(stored.title, "Casablanca (restored)");
    assert_eq!(stored.year, 1942);
}

#[tokio::test]
async fn test_movie_concurrent_updates_single_winner() {
    let conn = init_db().await;
    let repo = MovieRepositoryImpl::new(conn);

    let movie = repo.get(2).await.unwrap();
    let mut a = movie.clone();
    a.title = "A".to_string();
    let mut b = movie.clone();
    b.title = "B".to_string();

    let (res_a, res_b) = tokio::join!(repo.update(&a), repo.update(&b));
    let winners = [&res_a, &res_b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        matches!(res_a, Err(Error::EditConflict { .. }))
            || matches!(res_b, Err(Error::EditConflict { .. }))
    );

    let stored = repo.get(2).await.unwrap();
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_movie_partial_update() {
    let conn = init_db().await;
    let repo = MovieRepositoryImpl::new(conn);

    let mut movie = repo.get(1).await.unwrap();
    let update: UpdateMovie = serde_json::from_str(r#"{"year": 2020}"#).unwrap();
    update.apply_to(&mut movie);
    let updated = repo.update(&movie).await.unwrap();

    let stored = repo.get(1).await.unwrap();
    assert_eq!(stored, updated);
    assert_eq!(stored.year, 2020);
    assert_eq!(stored.title, "Casablanca");
    assert_eq!(stored.runtime.minutes(), 102);
    assert_eq!(stored.genres, genres(&["drama", "romance", "war"]));
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_movie_update_missing_record_conflicts() {
    let conn = init_db().await;
    let repo = MovieRepositoryImpl::new(conn);

    let mut movie = repo.get(3).await.unwrap();
    repo.delete(3).await.unwrap();
    movie.title = "Gone".to_string();
    let res = repo.update(&movie).await;
    assert!(matches!(res, Err(Error::EditConflict { id: 3, .. })));
}

#[tokio::test]
async fn test_movie_delete() {
    let conn = init_db().await;
    let repo = MovieRepositoryImpl::new(conn);

    repo.delete(4).await.unwrap();
    assert!(matches!(repo.get(4).await, Err(Error::RecordNotFound(_))));
    assert!(matches!(repo.delete(4).await, Err(Error::RecordNotFound(_))));
    assert!(matches!(repo.delete(-5).await, Err(Error::RecordNotFound(_))));
    assert!(matches!(repo.delete(0).await, Err(Error::RecordNotFound(_))));
}

#[tokio::test]
async fn test_movie_list_filters() {
    let conn = init_db().await;
    let repo = MovieRepositoryImpl::new(conn);

    let all = repo
        .list(&MovieFilter::default(), &ListingParams::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), [1, 2, 3, 4, 5]);

    let filter = MovieFilter {
        title: "CLUB".to_string(),
        genres: vec![],
    };
    let clubs = repo.list(&filter, &ListingParams::default()).await.unwrap();
    assert_eq!(titles(&clubs), ["The Breakfast Club", "The Club"]);
    assert_eq!(repo.count(&filter).await.unwrap(), 2);

    let filter = MovieFilter {
        title: String::new(),
        genres: genres(&["drama", "comedy"]),
    };
    let dramedies = repo.list(&filter, &ListingParams::default()).await.unwrap();
    assert_eq!(titles(&dramedies), ["The Breakfast Club"]);

    let filter = MovieFilter {
        title: "club".to_string(),
        genres: genres(&["drama"]),
    };
    assert_eq!(repo.count(&filter).await.unwrap(), 2);

    let filter = MovieFilter {
        title: String::new(),
        genres: genres(&["western"]),
    };
    assert!(repo
        .list(&filter, &ListingParams::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_movie_list_sorting_and_paging() {
    let conn = init_db().await;
    let repo = MovieRepositoryImpl::new(conn);
    let filter = MovieFilter::default();

    let params = ListingParams::new(0, 2).with_order(vec![Order::Desc("year".to_string())]);
    let page = repo.list(&filter, &params).await.unwrap();
    assert_eq!(titles(&page), ["Black Panther", "Deadpool"]);

    let params = ListingParams::new(2, 2).with_order(vec![Order::Desc("year".to_string())]);
    let page = repo.list(&filter, &params).await.unwrap();
    assert_eq!(titles(&page), ["The Club", "The Breakfast Club"]);

    let params = ListingParams::new(0, 10).with_order(vec![Order::Asc("runtime".to_string())]);
    let page = repo.list(&filter, &params).await.unwrap();
    assert_eq!(page.first().unwrap().title, "The Breakfast Club");
    assert_eq!(page.last().unwrap().title, "Black Panther");

    let params = ListingParams::new(0, 10).with_order(vec![Order::Asc("created_at".to_string())]);
    assert!(matches!(
        repo.list(&filter, &params).await,
        Err(Error::InvalidOrderByField(_))
    ));
}

#[tokio::test]
async fn test_movie_list_ties_broken_by_id() {
    let conn = init_db().await;
    sqlx::query("UPDATE movie SET year = 2000")
        .execute(&conn)
        .await
        .unwrap();
    let repo = MovieRepositoryImpl::new(conn);

    let params = ListingParams::default().with_order(vec![Order::Desc("year".to_string())]);
    let movies = repo.list(&MovieFilter::default(), &params).await.unwrap();
    assert_eq!(movies.iter().map(|m| m.id).collect::<Vec<_>>(), [1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_movie_store_call_bounded_by_timeout() {
    let conn = init_db().await;
    let budget = std::time::Duration::from_millis(50);
    let repo = MovieRepositoryImpl::new(conn.clone()).with_timeout(budget);

    // the pool has a single connection, keep it busy
    let held = conn.acquire().await.unwrap();
    let res = repo.get(1).await;
    assert!(matches!(res, Err(Error::Timeout(d)) if d == budget));
    drop(held);

    let movie = repo.get(1).await.unwrap();
    assert_eq!(movie.title, "Casablanca");
}
