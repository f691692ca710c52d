use maud::{html, Markup, DOCTYPE};

use crate::session::Flash;
use crate::user_models::{SessionUser, UploadedFile};

pub fn index(flashes: &[Flash]) -> String {
    let body = html! {
        h1 { "Sign in" }
        form method="post" action="/login" {
            label { "Username " input type="text" name="username" required; }
            label { "Password " input type="password" name="password" required; }
            button type="submit" { "Log in" }
        }
        p { "No account yet? " a href="/signup" { "Sign up" } }
    };
    layout("Sign in", flashes, body).into_string()
}

pub fn signup(flashes: &[Flash]) -> String {
    let body = html! {
        h1 { "Create an account" }
        form method="post" action="/registered" {
            label { "Username " input type="text" name="username" required; }
            label { "Password " input type="password" name="password" required; }
            label { "First name " input type="text" name="firstName"; }
            label { "Last name " input type="text" name="lastName"; }
            label { "Email " input type="email" name="email" required; }
            label { "Address " input type="text" name="address"; }
            button type="submit" { "Register" }
        }
        p { "Already registered? " a href="/" { "Sign in" } }
    };
    layout("Sign up", flashes, body).into_string()
}

pub fn profile(user: &SessionUser, files: &[UploadedFile], flashes: &[Flash]) -> String {
    let body = html! {
        h1 { "Welcome, " (user.first_name) " " (user.last_name) }
        dl {
            dt { "Username" } dd { (user.username) }
            dt { "Email" } dd { (user.email) }
            dt { "Address" } dd { (user.address) }
        }
        h2 { "Upload files" }
        form method="post" action="/upload" enctype="multipart/form-data" {
            input type="file" name="files" multiple;
            button type="submit" { "Upload" }
        }
        h2 { "Your files" }
        @if files.is_empty() {
            p { "No files uploaded yet." }
        } @else {
            table {
                tr { th { "File" } th { "Words" } th { "Uploaded" } }
                @for file in files {
                    tr {
                        td { a href={ "/download/" (file.stored_filename) } { (file.original_filename) } }
                        td { (file.word_count.to_string()) }
                        td { (file.uploaded_at.format("%Y-%m-%d %H:%M UTC").to_string()) }
                    }
                }
            }
        }
        p { a href="/logout" { "Log out" } }
    };
    layout("Profile", flashes, body).into_string()
}

fn layout(title: &str, flashes: &[Flash], body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) }
            }
            body {
                @if !flashes.is_empty() {
                    ul.flashes {
                        @for flash in flashes {
                            li class=(flash.category.as_str()) { (flash.message) }
                        }
                    }
                }
                (body)
            }
        }
    }
}
