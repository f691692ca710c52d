use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::SignedCookieJar;
use std::io::ErrorKind;
use tokio::{fs::File, task};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::error::AppError;
use crate::pages;
use crate::session::{self, FlashCategory};
use crate::upload;
use crate::user_models::{LoginForm, RegistrationForm, SessionUser, UploadedFile};
use crate::user_storage::{Conflict, NewUser};
use crate::AppState;

type Redirected = (SignedCookieJar, Redirect);

pub async fn index(jar: SignedCookieJar) -> (SignedCookieJar, Html<String>) {
    let (jar, flashes) = session::take_flashes(jar);
    (jar, Html(pages::index(&flashes)))
}

pub async fn signup(jar: SignedCookieJar) -> (SignedCookieJar, Html<String>) {
    let (jar, flashes) = session::take_flashes(jar);
    (jar, Html(pages::signup(&flashes)))
}

pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Redirected, AppError> {
    let Some(user) = state.storage.get_user_by_username(&form.username).await? else {
        warn!(username = %form.username, "login for unknown user");
        return Ok(invalid_credentials(jar));
    };

    if !verify_password(form.password, user.password_hash.clone()).await? {
        warn!(username = %user.username, "login with wrong password");
        return Ok(invalid_credentials(jar));
    }

    info!(username = %user.username, "user logged in");
    let jar = session::sign_in(jar, &SessionUser::from(user));
    Ok((jar, Redirect::to("/profile")))
}

pub async fn registered(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<RegistrationForm>,
) -> Result<Redirected, AppError> {
    if form.missing_required() {
        let jar = session::flash(
            jar,
            FlashCategory::Error,
            "Username, password and email are required.",
        );
        return Ok((jar, Redirect::to("/signup")));
    }

    if let Some(conflict) = state.storage.find_conflict(&form.username, &form.email).await? {
        return Ok(registration_conflict(jar, conflict));
    }

    let cost = state.config.bcrypt_cost;
    let password = form.password.clone();
    let password_hash = task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;

    let new_user = NewUser {
        username: &form.username,
        password_hash: &password_hash,
        first_name: &form.first_name,
        last_name: &form.last_name,
        email: &form.email,
        address: &form.address,
    };

    if let Err(err) = state.storage.create_user(&new_user).await {
        let unique = err
            .as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation());
        if !unique {
            return Err(err.into());
        }
        // Lost a race with a concurrent registration.
        let conflict = state
            .storage
            .find_conflict(&form.username, &form.email)
            .await?
            .unwrap_or(Conflict::Username);
        return Ok(registration_conflict(jar, conflict));
    }

    info!(username = %form.username, "account created");
    let jar = session::flash(
        jar,
        FlashCategory::Success,
        "New account successfully created! Sign in to continue.",
    );
    Ok((jar, Redirect::to("/")))
}

pub async fn profile(State(state): State<AppState>, jar: SignedCookieJar) -> Result<Response, AppError> {
    let Some(user) = session::current_user(&jar) else {
        return Ok(login_required(jar).into_response());
    };

    let files = state.storage.get_user_files(&user.username).await?;
    let (jar, flashes) = session::take_flashes(jar);
    Ok((jar, Html(pages::profile(&user, &files, &flashes))).into_response())
}

pub async fn upload(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut multipart: Multipart,
) -> Result<Redirected, AppError> {
    let Some(user) = session::current_user(&jar) else {
        return Ok(login_required(jar));
    };

    while let Some(field) = multipart.next_field().await? {
        let Some(original) = field
            .file_name()
            .map(upload::original_filename)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
        else {
            continue;
        };

        let bytes = field.bytes().await?;
        let record = UploadedFile::new(user.username.clone(), original, upload::count_words(&bytes));

        upload::save(&state.config.upload_dir, &record.stored_filename, &bytes).await?;
        if let Err(err) = state.storage.add_file(&record).await {
            upload::discard(&state.config.upload_dir, &record.stored_filename).await;
            return Err(err.into());
        }

        info!(
            username = %record.username,
            original = %record.original_filename,
            stored = %record.stored_filename,
            words = record.word_count,
            bytes = bytes.len(),
            "file uploaded"
        );
    }

    let jar = session::flash(jar, FlashCategory::Success, "Files uploaded successfully!");
    Ok((jar, Redirect::to("/profile")))
}

/// Any signed-in user may fetch any stored file; only the stored name is checked.
pub async fn download(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(stored_filename): Path<String>,
) -> Result<Response, AppError> {
    let Some(user) = session::current_user(&jar) else {
        return Ok(login_required(jar).into_response());
    };

    let original = state
        .storage
        .get_original_filename(&stored_filename)
        .await?
        .ok_or(AppError::NotFound)?;

    let file = match File::open(state.config.upload_dir.join(&stored_filename)).await {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(stored = %stored_filename, "file record without stored file");
            return Err(AppError::NotFound);
        }
        Err(err) => return Err(err.into()),
    };

    info!(username = %user.username, stored = %stored_filename, "file downloaded");

    let mime = mime_guess::from_path(&original).first_or_octet_stream();
    let content_type = HeaderValue::from_str(mime.essence_str())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let headers = [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_DISPOSITION, upload::attachment_header(&original)),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

pub async fn logout(jar: SignedCookieJar) -> Redirected {
    if let Some(user) = session::current_user(&jar) {
        info!(username = %user.username, "user logged out");
    }
    (session::sign_out(jar), Redirect::to("/"))
}

async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let outcome = task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    Ok(outcome.unwrap_or_else(|err| {
        warn!(error = %err, "stored password hash could not be verified");
        false
    }))
}

fn invalid_credentials(jar: SignedCookieJar) -> Redirected {
    let jar = session::flash(jar, FlashCategory::Error, "Invalid username or password.");
    (jar, Redirect::to("/"))
}

fn registration_conflict(jar: SignedCookieJar, conflict: Conflict) -> Redirected {
    let jar = session::flash(jar, FlashCategory::Error, conflict.message());
    (jar, Redirect::to("/signup"))
}

fn login_required(jar: SignedCookieJar) -> Redirected {
    let jar = session::flash(jar, FlashCategory::Error, "Please log in first.");
    (jar, Redirect::to("/"))
}
