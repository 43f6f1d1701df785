use axum::response::Html;

const UPLOAD_FORM: &str = r#"<!doctype html>
<html>
  <head><title>File upload</title></head>
  <body>
    <form action="/api/v1/files/stream" enctype="multipart/form-data" method="post">
      <input name="file" type="file">
      <input type="submit">
    </form>
  </body>
</html>
"#;

/// GET /static/index.html
/// Minimal form posting to the streaming upload endpoint.
pub async fn index() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}
