//! Alumni profiles: creation, owner edits, the gated profile page and the directory.

mod edit;
pub mod model;
mod new;
mod page;
mod privacy;
mod search;
pub mod view;

use axum::{
    Router,
    routing::{get, put},
};

use crate::AppState;

pub use model::Profile;
pub use view::{ProfileCard, ProfileView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search::search).post(new::new_profile))
        .route("/{id}", get(page::profile).patch(edit::edit_profile))
        .route(
            "/{id}/privacy",
            put(privacy::replace_privacy).patch(privacy::merge_privacy),
        )
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
