use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::{instrument, warn};

use super::{
    dto::UploadedAsset,
    services::{upload_image, UploadItem},
};
use crate::{auth::extractors::AdminUser, error::AppError, state::AppState};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/uploads/image", post(upload_image_multipart))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[derive(Default)]
struct Form {
    folder: Option<String>,
    name: Option<String>,
    file: Option<(Bytes, String, Option<String>)>, // body, content type, file name
}

/// POST /uploads/image (multipart: file, folder, name)
#[instrument(skip_all)]
pub async fn upload_image_multipart(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadedAsset>, AppError> {
    let mut mp = mp?;
    let mut form = Form::default();
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("folder") => form.folder = Some(field.text().await.map_err(bad_multipart)?),
            Some("name") => form.name = Some(field.text().await.map_err(bad_multipart)?),
            Some("file") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let file_name = field.file_name().map(|s| s.to_string());
                let data = field.bytes().await.map_err(bad_multipart)?;
                form.file = Some((data, content_type, file_name));
            }
            _ => {}
        }
    }

    let folder = form
        .folder
        .ok_or_else(|| AppError::Validation("folder is required".into()))?;
    let name = form.name.unwrap_or_default();
    let (body, content_type, file_name) = form
        .file
        .ok_or_else(|| AppError::Validation("file is required".into()))?;

    let asset = upload_image(
        &state,
        user,
        UploadItem {
            folder: &folder,
            name: &name,
            body,
            content_type: &content_type,
            original_filename: file_name.as_deref(),
        },
    )
    .await?;
    Ok(Json(asset))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    warn!(error = %e, "malformed multipart body");
    AppError::Validation(format!("invalid multipart body: {e}"))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::app::build_app;
    use crate::auth::services::{login, register};
    use crate::state::AppState;

    const BOUNDARY: &str = "XBOUNDARYX";

    fn multipart_body(folder: &str, name: &str, content_type: &str, file_name: &str) -> String {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\n{folder}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\nPNGDATA\r\n\
             --{b}--\r\n",
            b = BOUNDARY,
        )
    }

    fn upload_request(token: &str, body: String) -> Request<Body> {
        Request::post("/api/v1/uploads/image")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn token_for(st: &AppState, email: &str, secret: Option<&str>) -> String {
        register(st, email, "Cook", "pw", secret).await.unwrap();
        login(st, email, "pw").await.unwrap().access_token
    }

    #[tokio::test]
    async fn admin_can_upload_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let st = AppState::fake(dir.path());
        let token = token_for(&st, "admin@x.com", Some("letmein")).await;

        let res = build_app(st)
            .oneshot(upload_request(
                &token,
                multipart_body("food", "Greek Yogurt", "image/png", "yogurt.png"),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["filename"], "greek_yogurt.png");
        assert_eq!(json["path"], "assets/food/greek_yogurt.png");
        assert_eq!(json["url"], "/assets/food/greek_yogurt.png");
        assert_eq!(
            std::fs::read(dir.path().join("food/greek_yogurt.png")).unwrap(),
            b"PNGDATA"
        );
    }

    #[tokio::test]
    async fn regular_user_gets_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let st = AppState::fake(dir.path());
        let token = token_for(&st, "user@x.com", None).await;

        let res = build_app(st)
            .oneshot(upload_request(
                &token,
                multipart_body("sauce", "Tomato", "text/plain", "t.txt"),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn invalid_folder_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let st = AppState::fake(dir.path());
        let token = token_for(&st, "admin@x.com", Some("letmein")).await;

        let res = build_app(st)
            .oneshot(upload_request(
                &token,
                multipart_body("sauce", "Tomato", "image/png", "t.png"),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_multipart_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let st = AppState::fake(dir.path());
        let token = token_for(&st, "admin@x.com", Some("letmein")).await;

        let res = build_app(st)
            .oneshot(
                Request::post("/api/v1/uploads/image")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from("folder=food&name=Tomato"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["detail"].is_string());
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let res = build_app(AppState::fake(dir.path()))
            .oneshot(
                Request::post("/api/v1/uploads/image")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(multipart_body("food", "Tomato", "image/png", "t.png")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
