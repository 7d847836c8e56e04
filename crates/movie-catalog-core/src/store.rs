//! SQLite-backed storage for movies, genres, users and ratings.
//!
//! One connection behind a mutex; callers hold the lock only for the
//! duration of a single operation, never across an `.await`.

use chrono::{DateTime, Utc};
use movie_catalog_models::{Genre, Movie, Rating, User};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create database directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("database lock poisoned by a panicked writer")]
    Poisoned,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Entity counts, used by the `stats` command and import summaries.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StoreCounts {
    pub movies: u64,
    pub movies_with_posters: u64,
    pub genres: u64,
    pub movie_genres: u64,
    pub users: u64,
    pub ratings: u64,
}

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        debug!("Opened database at {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }

    // Movies

    /// Fetch the movie or create it with `title`. An existing title is left
    /// untouched. Returns `(movie, created)`.
    pub fn get_or_create_movie(&self, movie_id: i64, title: &str) -> Result<(Movie, bool), StoreError> {
        self.with_conn(|conn| {
            if let Some(movie) = find_movie(conn, movie_id)? {
                return Ok((movie, false));
            }
            let inserted = conn.execute(
                "INSERT INTO movies (movie_id, title) VALUES (?1, ?2)
                 ON CONFLICT(movie_id) DO NOTHING",
                params![movie_id, title],
            )?;
            // A lost insert race reads back the winner's row
            let movie = find_movie(conn, movie_id)?.ok_or_else(|| not_found("movie", movie_id))?;
            Ok((movie, inserted == 1))
        })
    }

    /// Fetch a movie with its genres.
    pub fn get_movie(&self, movie_id: i64) -> Result<Movie, StoreError> {
        self.with_conn(|conn| {
            let mut movie = find_movie(conn, movie_id)?.ok_or_else(|| not_found("movie", movie_id))?;
            movie.genres = genres_for(conn, movie_id)?;
            Ok(movie)
        })
    }

    /// All movies ordered by id, without genres.
    pub fn all_movies(&self) -> Result<Vec<Movie>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT movie_id, title, poster FROM movies ORDER BY movie_id")?;
            let movies = stmt
                .query_map([], map_movie)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(movies)
        })
    }

    /// The first `limit` movies by id, with genres.
    pub fn list_movies(&self, limit: usize) -> Result<Vec<Movie>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT movie_id, title, poster FROM movies ORDER BY movie_id LIMIT ?1",
            )?;
            let mut movies = stmt
                .query_map(params![limit as i64], map_movie)?
                .collect::<Result<Vec<_>, _>>()?;
            for movie in &mut movies {
                movie.genres = genres_for(conn, movie.movie_id)?;
            }
            Ok(movies)
        })
    }

    /// Unconditionally set the poster reference.
    pub fn set_poster(&self, movie_id: i64, reference: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE movies SET poster = ?2 WHERE movie_id = ?1",
                params![movie_id, reference],
            )?;
            if updated == 0 {
                return Err(not_found("movie", movie_id));
            }
            Ok(())
        })
    }

    /// Set the poster reference only if none is stored yet. Returns whether
    /// a row changed.
    pub fn backfill_poster(&self, movie_id: i64, reference: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE movies SET poster = ?2
                 WHERE movie_id = ?1 AND (poster IS NULL OR poster = '')",
                params![movie_id, reference],
            )?;
            Ok(updated == 1)
        })
    }

    // Genres

    pub fn get_or_create_genre(&self, name: &str) -> Result<(Genre, bool), StoreError> {
        self.with_conn(|conn| {
            if let Some(genre) = find_genre(conn, name)? {
                return Ok((genre, false));
            }
            let inserted = conn.execute(
                "INSERT INTO genres (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                params![name],
            )?;
            let genre = find_genre(conn, name)?.ok_or_else(|| not_found("genre", name))?;
            Ok((genre, inserted == 1))
        })
    }

    /// Attach a genre to a movie. Returns false if it was already attached.
    pub fn add_movie_genre(&self, movie_id: i64, genre_id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO movie_genres (movie_id, genre_id) VALUES (?1, ?2)",
                params![movie_id, genre_id],
            )?;
            Ok(inserted == 1)
        })
    }

    // Users

    /// Fetch the user or create a stub named `user_<id>`.
    pub fn get_or_create_user(&self, user_id: i64) -> Result<(User, bool), StoreError> {
        self.with_conn(|conn| {
            if let Some(user) = find_user(conn, user_id)? {
                return Ok((user, false));
            }
            let inserted = conn.execute(
                "INSERT INTO users (id, username) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
                params![user_id, User::stub_username(user_id)],
            )?;
            let user = find_user(conn, user_id)?.ok_or_else(|| not_found("user", user_id))?;
            Ok((user, inserted == 1))
        })
    }

    // Ratings

    /// Create the (user, movie) rating or overwrite its value. `created_at`
    /// is kept on update. Returns `(rating, created)`.
    pub fn update_or_create_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        value: u8,
    ) -> Result<(Rating, bool), StoreError> {
        self.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let created = match find_rating(conn, user_id, movie_id)? {
                Some(existing) => {
                    conn.execute(
                        "UPDATE ratings SET rating = ?2, updated_at = ?3 WHERE id = ?1",
                        params![existing.id, value, now],
                    )?;
                    false
                }
                None => {
                    conn.execute(
                        "INSERT INTO ratings (user_id, movie_id, rating, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?4)",
                        params![user_id, movie_id, value, now],
                    )?;
                    true
                }
            };
            let rating = find_rating(conn, user_id, movie_id)?
                .ok_or_else(|| not_found("rating", format!("({}, {})", user_id, movie_id)))?;
            Ok((rating, created))
        })
    }

    pub fn get_rating(&self, user_id: i64, movie_id: i64) -> Result<Option<Rating>, StoreError> {
        self.with_conn(|conn| find_rating(conn, user_id, movie_id))
    }

    pub fn counts(&self) -> Result<StoreCounts, StoreError> {
        self.with_conn(|conn| {
            let count = |sql: &str| -> Result<u64, StoreError> {
                Ok(conn.query_row(sql, [], |row| row.get::<_, i64>(0))? as u64)
            };
            Ok(StoreCounts {
                movies: count("SELECT COUNT(*) FROM movies")?,
                movies_with_posters: count(
                    "SELECT COUNT(*) FROM movies WHERE poster IS NOT NULL AND poster != ''",
                )?,
                genres: count("SELECT COUNT(*) FROM genres")?,
                movie_genres: count("SELECT COUNT(*) FROM movie_genres")?,
                users: count("SELECT COUNT(*) FROM users")?,
                ratings: count("SELECT COUNT(*) FROM ratings")?,
            })
        })
    }
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS movies (
            movie_id INTEGER PRIMARY KEY,
            title    TEXT NOT NULL,
            poster   TEXT
        );
        CREATE TABLE IF NOT EXISTS genres (
            id   INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS movie_genres (
            movie_id INTEGER NOT NULL REFERENCES movies(movie_id),
            genre_id INTEGER NOT NULL REFERENCES genres(id),
            PRIMARY KEY (movie_id, genre_id)
        );
        CREATE TABLE IF NOT EXISTS users (
            id       INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS ratings (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    INTEGER NOT NULL REFERENCES users(id),
            movie_id   INTEGER NOT NULL REFERENCES movies(movie_id),
            rating     INTEGER NOT NULL CHECK (rating BETWEEN 0 AND 5),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, movie_id)
        );
        CREATE INDEX IF NOT EXISTS idx_ratings_movie ON ratings(movie_id);
        PRAGMA user_version = 1;",
    )
}

fn not_found(entity: &'static str, key: impl ToString) -> StoreError {
    StoreError::NotFound {
        entity,
        key: key.to_string(),
    }
}

fn map_movie(row: &Row) -> Result<Movie, rusqlite::Error> {
    Ok(Movie {
        movie_id: row.get(0)?,
        title: row.get(1)?,
        genres: Vec::new(),
        poster: row.get(2)?,
    })
}

fn map_genre(row: &Row) -> Result<Genre, rusqlite::Error> {
    Ok(Genre {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn parse_timestamp(row: &Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn find_movie(conn: &Connection, movie_id: i64) -> Result<Option<Movie>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT movie_id, title, poster FROM movies WHERE movie_id = ?1",
            params![movie_id],
            map_movie,
        )
        .optional()?)
}

fn find_genre(conn: &Connection, name: &str) -> Result<Option<Genre>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, name FROM genres WHERE name = ?1",
            params![name],
            map_genre,
        )
        .optional()?)
}

fn genres_for(conn: &Connection, movie_id: i64) -> Result<Vec<Genre>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT g.id, g.name FROM genres g
         JOIN movie_genres mg ON mg.genre_id = g.id
         WHERE mg.movie_id = ?1
         ORDER BY g.name",
    )?;
    let genres = stmt
        .query_map(params![movie_id], map_genre)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(genres)
}

fn find_user(conn: &Connection, user_id: i64) -> Result<Option<User>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, username FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            },
        )
        .optional()?)
}

fn find_rating(conn: &Connection, user_id: i64, movie_id: i64) -> Result<Option<Rating>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, user_id, movie_id, rating, created_at, updated_at
             FROM ratings WHERE user_id = ?1 AND movie_id = ?2",
            params![user_id, movie_id],
            |row| {
                Ok(Rating {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    movie_id: row.get(2)?,
                    rating: row.get(3)?,
                    created_at: parse_timestamp(row, 4)?,
                    updated_at: parse_timestamp(row, 5)?,
                })
            },
        )
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn test_get_or_create_movie_keeps_existing_title() {
        let store = store();
        let (movie, created) = store.get_or_create_movie(1, "Toy Story (1995)").unwrap();
        assert!(created);
        assert_eq!(movie.title, "Toy Story (1995)");
        assert_eq!(movie.poster, None);

        let (movie, created) = store.get_or_create_movie(1, "Renamed").unwrap();
        assert!(!created);
        assert_eq!(movie.title, "Toy Story (1995)");
    }

    #[test]
    fn test_get_movie_not_found() {
        let store = store();
        let err = store.get_movie(404).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_genres_are_unique_and_attachment_is_idempotent() {
        let store = store();
        store.get_or_create_movie(1, "Heat (1995)").unwrap();

        let (action, created) = store.get_or_create_genre("Action").unwrap();
        assert!(created);
        let (again, created) = store.get_or_create_genre("Action").unwrap();
        assert!(!created);
        assert_eq!(action.id, again.id);

        // Names are case-sensitive
        let (lower, created) = store.get_or_create_genre("action").unwrap();
        assert!(created);
        assert_ne!(lower.id, action.id);

        assert!(store.add_movie_genre(1, action.id).unwrap());
        assert!(!store.add_movie_genre(1, action.id).unwrap());

        let movie = store.get_movie(1).unwrap();
        assert_eq!(movie.genres, vec![action]);
        assert_eq!(store.counts().unwrap().movie_genres, 1);
    }

    #[test]
    fn test_backfill_poster_only_when_unset() {
        let store = store();
        store.get_or_create_movie(1, "Jumanji (1995)").unwrap();

        assert!(store.backfill_poster(1, "movie_posters/1.jpg").unwrap());
        assert!(!store.backfill_poster(1, "movie_posters/other.jpg").unwrap());
        assert_eq!(store.get_movie(1).unwrap().poster.as_deref(), Some("movie_posters/1.jpg"));

        store.set_poster(1, "movie_posters/new.jpg").unwrap();
        assert_eq!(store.get_movie(1).unwrap().poster.as_deref(), Some("movie_posters/new.jpg"));
        assert!(store.set_poster(2, "x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_stub_user() {
        let store = store();
        let (user, created) = store.get_or_create_user(7).unwrap();
        assert!(created);
        assert_eq!(user.username, "user_7");
        let (_, created) = store.get_or_create_user(7).unwrap();
        assert!(!created);
    }

    #[test]
    fn test_update_or_create_rating_keeps_created_at() {
        let store = store();
        store.get_or_create_movie(42, "Seven (1995)").unwrap();
        store.get_or_create_user(7).unwrap();

        let (first, created) = store.update_or_create_rating(7, 42, 3).unwrap();
        assert!(created);
        assert_eq!(first.rating, 3);

        let (second, created) = store.update_or_create_rating(7, 42, 5).unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.rating, 5);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.counts().unwrap().ratings, 1);
    }

    #[test]
    fn test_rating_range_is_enforced_by_schema() {
        let store = store();
        store.get_or_create_movie(1, "Movie").unwrap();
        store.get_or_create_user(1).unwrap();
        assert!(store.update_or_create_rating(1, 1, 6).is_err());
    }

    #[test]
    fn test_open_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.sqlite3");
        {
            let store = Store::open(&path).unwrap();
            store.get_or_create_movie(1, "Toy Story (1995)").unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.get_movie(1).unwrap().title, "Toy Story (1995)");
    }

    #[test]
    fn test_list_movies_limit_and_order() {
        let store = store();
        for id in [3, 1, 2] {
            store.get_or_create_movie(id, &format!("Movie {}", id)).unwrap();
        }
        let movies = store.list_movies(2).unwrap();
        assert_eq!(movies.iter().map(|m| m.movie_id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(store.all_movies().unwrap().len(), 3);
    }
}
