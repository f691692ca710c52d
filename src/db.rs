use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Arguments, FromRow, Sqlite};
use std::path::Path;
use tracing::debug;

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        username  TEXT UNIQUE NOT NULL,
        password  TEXT NOT NULL,
        firstname TEXT NOT NULL,
        lastname  TEXT NOT NULL,
        email     TEXT UNIQUE NOT NULL,
        address   TEXT NOT NULL
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS files (
        username          TEXT NOT NULL REFERENCES users(username),
        original_filename TEXT NOT NULL,
        stored_filename   TEXT UNIQUE NOT NULL,
        word_count        INTEGER NOT NULL,
        uploaded_at       TEXT NOT NULL
    )"#,
];

/// A positional statement parameter.
#[derive(Debug, Clone, Copy)]
pub enum Param<'q> {
    Text(&'q str),
    Integer(i64),
}

impl<'q> From<&'q str> for Param<'q> {
    fn from(value: &'q str) -> Self {
        Param::Text(value)
    }
}

impl<'q> From<&'q String> for Param<'q> {
    fn from(value: &'q String) -> Self {
        Param::Text(value.as_str())
    }
}

impl From<i64> for Param<'_> {
    fn from(value: i64) -> Self {
        Param::Integer(value)
    }
}

/// Query executor over the SQLite datastore.
///
/// Every call checks a connection out of the pool for the duration of one
/// statement and hands it back afterwards; there is no transaction spanning
/// several calls.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {:?}", path))?;

        Ok(Self { pool })
    }

    /// Creates the `users` and `files` tables when they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            self.write(statement, &[])
                .await
                .with_context(|| format!("Failed to apply schema: {}", statement.trim()))?;
        }
        Ok(())
    }

    pub async fn write(&self, query: &str, params: &[Param<'_>]) -> Result<(), sqlx::Error> {
        debug!(query, "write");
        let mut conn = self.pool.acquire().await?;
        sqlx::query_with::<Sqlite, _>(query, arguments(params)?)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Fetches at most one row. `None` means nothing matched.
    pub async fn read<T>(&self, query: &str, params: &[Param<'_>]) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        debug!(query, "read");
        let mut conn = self.pool.acquire().await?;
        sqlx::query_as_with::<Sqlite, T, _>(query, arguments(params)?)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn read_all<T>(&self, query: &str, params: &[Param<'_>]) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        debug!(query, "read_all");
        let mut conn = self.pool.acquire().await?;
        sqlx::query_as_with::<Sqlite, T, _>(query, arguments(params)?)
            .fetch_all(&mut *conn)
            .await
    }
}

fn arguments<'q>(params: &[Param<'_>]) -> Result<SqliteArguments<'q>, sqlx::Error> {
    let mut args = SqliteArguments::default();
    for param in params {
        // Owned values keep the arguments independent of the borrowed params.
        let added = match *param {
            Param::Text(text) => args.add(text.to_owned()),
            Param::Integer(value) => args.add(value),
        };
        added.map_err(sqlx::Error::Encode)?;
    }
    Ok(args)
}
