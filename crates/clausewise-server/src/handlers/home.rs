//! Form page

use axum::response::Html;

const HOME_PAGE: &str = include_str!("../../templates/home.html");

/// GET / - The query + document form
pub async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}
