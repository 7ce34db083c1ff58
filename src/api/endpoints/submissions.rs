//! Submission endpoint: complaint image + spoken statement → verified record.
//!
//! `POST /api/submissions` takes multipart fields `image` (file), `audio`
//! (file) and `claimant` (text), runs the pipeline on the blocking pool and
//! returns the `SubmissionOutcome`.

use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::intake::SubmissionRequest;
use crate::pipeline::processor::{CancellationToken, SubmissionOutcome};

/// Cancels the submission if the handler future is dropped (client gone).
/// Firing after the pipeline has finished is a no-op.
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// `POST /api/submissions`
pub async fn create(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<SubmissionOutcome>, ApiError> {
    let request = read_submission(multipart).await?;

    let permit = ctx
        .permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| ApiError::Internal(format!("Submission permits closed: {e}")))?;

    let cancel = CancellationToken::new();
    let _guard = CancelOnDrop(cancel.clone());
    let processor = ctx.processor.clone();

    tracing::info!(
        claimant = %request.claimant,
        image_bytes = request.image.len(),
        audio_bytes = request.audio.len(),
        "Submission received"
    );

    let result = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        processor.process(&request, &cancel)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Pipeline task failed: {e}")))?;

    result
        .map(Json)
        .map_err(|e| ApiError::from_processing(e, ctx.expose_error_details))
}

/// Collect the multipart fields. Missing files are left empty so intake
/// validation reports them.
async fn read_submission(mut multipart: Multipart) -> Result<SubmissionRequest, ApiError> {
    let mut request = SubmissionRequest {
        claimant: String::new(),
        image: Vec::new(),
        image_name: None,
        audio: Vec::new(),
        audio_name: None,
        audio_mime: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                request.image_name = field.file_name().map(str::to_string);
                request.image = read_bytes(field).await?;
            }
            "audio" => {
                request.audio_name = field.file_name().map(str::to_string);
                request.audio_mime = field.content_type().map(str::to_string);
                request.audio = read_bytes(field).await?;
            }
            "claimant" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable claimant field: {e}")))?;
                request.claimant = text.trim().to_string();
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok(request)
}

async fn read_bytes(field: axum::extract::multipart::Field<'_>) -> Result<Vec<u8>, ApiError> {
    field
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| ApiError::BadRequest(format!("Unreadable upload: {e}")))
}
