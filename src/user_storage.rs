use crate::db::Database;
use crate::user_models::{Account, UploadedFile, User};

/// Which unique column a registration collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    Username,
    Email,
}

impl Conflict {
    pub fn message(self) -> &'static str {
        match self {
            Conflict::Username => "This username is already taken",
            Conflict::Email => "This email is already registered",
        }
    }
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub address: &'a str,
}

/// Typed statements over the `users` and `files` tables.
#[derive(Clone)]
pub struct UserStorage {
    db: Database,
}

impl UserStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        self.db
            .read(
                "SELECT username, password, firstname, lastname, email, address FROM users WHERE username = ?",
                &[username.into()],
            )
            .await
    }

    /// One query for both unique columns; a username match wins when two
    /// different rows collide.
    pub async fn find_conflict(&self, username: &str, email: &str) -> Result<Option<Conflict>, sqlx::Error> {
        let existing: Option<(String, String)> = self
            .db
            .read(
                "SELECT username, email FROM users WHERE username = ? OR email = ? \
                 ORDER BY username = ? DESC LIMIT 1",
                &[username.into(), email.into(), username.into()],
            )
            .await?;

        Ok(existing.map(|(existing_username, _)| {
            if existing_username == username {
                Conflict::Username
            } else {
                Conflict::Email
            }
        }))
    }

    pub async fn create_user(&self, user: &NewUser<'_>) -> Result<(), sqlx::Error> {
        self.db
            .write(
                "INSERT INTO users (username, password, firstname, lastname, email, address) VALUES (?, ?, ?, ?, ?, ?)",
                &[
                    user.username.into(),
                    user.password_hash.into(),
                    user.first_name.into(),
                    user.last_name.into(),
                    user.email.into(),
                    user.address.into(),
                ],
            )
            .await
    }

    pub async fn add_file(&self, file: &UploadedFile) -> Result<(), sqlx::Error> {
        let uploaded_at = file.uploaded_at.to_rfc3339();
        self.db
            .write(
                "INSERT INTO files (username, original_filename, stored_filename, word_count, uploaded_at) \
                 VALUES (?, ?, ?, ?, ?)",
                &[
                    (&file.username).into(),
                    (&file.original_filename).into(),
                    (&file.stored_filename).into(),
                    file.word_count.into(),
                    (&uploaded_at).into(),
                ],
            )
            .await
    }

    pub async fn get_user_files(&self, username: &str) -> Result<Vec<UploadedFile>, sqlx::Error> {
        self.db
            .read_all(
                "SELECT username, original_filename, stored_filename, word_count, uploaded_at \
                 FROM files WHERE username = ? ORDER BY rowid",
                &[username.into()],
            )
            .await
    }

    pub async fn get_original_filename(&self, stored_filename: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = self
            .db
            .read(
                "SELECT original_filename FROM files WHERE stored_filename = ?",
                &[stored_filename.into()],
            )
            .await?;
        Ok(row.map(|(name,)| name))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, sqlx::Error> {
        self.db
            .read_all(
                "SELECT username, firstname, lastname, email, address FROM users ORDER BY username",
                &[],
            )
            .await
    }

    pub async fn list_files(&self, username: Option<&str>) -> Result<Vec<UploadedFile>, sqlx::Error> {
        match username {
            Some(username) => self.get_user_files(username).await,
            None => {
                self.db
                    .read_all(
                        "SELECT username, original_filename, stored_filename, word_count, uploaded_at \
                         FROM files ORDER BY username, rowid",
                        &[],
                    )
                    .await
            }
        }
    }
}
