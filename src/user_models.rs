use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::upload;

/// A row of the `users` table. `password_hash` holds a bcrypt hash.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub username: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    #[sqlx(rename = "firstname")]
    pub first_name: String,
    #[sqlx(rename = "lastname")]
    pub last_name: String,
    pub email: String,
    pub address: String,
}

/// Profile fields carried in the signed session cookie after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
}

impl From<User> for SessionUser {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            address: user.address,
        }
    }
}

/// Public view of an account, without the password column.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub username: String,
    #[sqlx(rename = "firstname")]
    pub first_name: String,
    #[sqlx(rename = "lastname")]
    pub last_name: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadedFile {
    pub username: String,
    pub original_filename: String,
    pub stored_filename: String,
    pub word_count: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedFile {
    pub fn new(username: String, original_filename: String, word_count: usize) -> Self {
        Self {
            stored_filename: upload::stored_filename(&original_filename),
            username,
            original_filename,
            word_count: i64::try_from(word_count).unwrap_or(i64::MAX),
            uploaded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub password: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    pub address: String,
}

impl RegistrationForm {
    pub fn missing_required(&self) -> bool {
        [&self.username, &self.password, &self.email]
            .iter()
            .any(|value| value.trim().is_empty())
    }
}
