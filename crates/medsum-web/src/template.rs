use axum::response::Html;

const INDEX_HTML: &str = include_str!("../templates/index.html");

/// Render the index page, injecting the upload limit.
pub fn render_index(max_upload_mb: u32) -> Html<String> {
    let html = INDEX_HTML.replace("{{ max_upload_mb }}", &max_upload_mb.to_string());
    Html(html)
}
