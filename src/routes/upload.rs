use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};

use crate::dto::quiz_dto::{QuizView, UploadResponse};
use crate::error::{Error, Result};
use crate::models::user::Identity;
use crate::services::upload_service::SelectedFile;
use crate::AppState;

/// Collects every `file` field of the form. Other fields are ignored.
async fn read_files(mut multipart: Multipart) -> Result<Vec<SelectedFile>> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(Error::Multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("document.pdf").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(Error::Multipart)?;
        files.push(SelectedFile {
            file_name,
            content_type,
            bytes,
        });
    }
    Ok(files)
}

#[axum::debug_handler]
pub async fn upload_pdf(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    multipart: Multipart,
) -> Result<Response> {
    let files = read_files(multipart).await?;
    tracing::info!(
        files = files.len(),
        signed_in = identity.is_signed_in(),
        "upload received"
    );

    let report = state
        .upload_service
        .handle_file_selection(files, &identity)
        .await;
    let busy = state.upload_service.is_busy();

    let response = match report.outcome {
        Ok(session) => (
            StatusCode::OK,
            Json(UploadResponse {
                notification: report.notification,
                quiz: Some(QuizView::from_session(&session, busy)),
                error: None,
            }),
        ),
        Err(e) => (
            e.status_code(),
            Json(UploadResponse {
                notification: report.notification,
                quiz: None,
                error: Some(e.to_string()),
            }),
        ),
    };
    Ok(response.into_response())
}
