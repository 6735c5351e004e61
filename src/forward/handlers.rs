//! 转发端点处理器

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use image::{DynamicImage, GenericImageView};
use tracing::Instrument;

use super::error::ForwardError;
use super::params::{self, ImageParams, TextParams};
use super::recorder::{RecordDraft, RequestRecorder};
use super::router::ForwardState;
use super::types::ForwardResponse;
use crate::generation::{ImageToImage, TextToImage, codec};
use crate::request_log::model::{InputType, Mode};

/// multipart 中图片字段名
const IMAGE_FIELD: &str = "image";

/// POST /forward
pub async fn forward(State(state): State<ForwardState>, request: Request) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("forward", %request_id);
    handle(state, request).instrument(span).await
}

async fn handle(state: ForwardState, request: Request) -> Response {
    let mut recorder = RequestRecorder::start(state.log.clone());

    let response = match dispatch(&state, request, recorder.draft_mut()).await {
        Ok(image_b64) => Json(ForwardResponse::new(image_b64)).into_response(),
        Err(err) => {
            tracing::warn!("forward 请求失败: {}", err);
            recorder.draft_mut().fail(&err);
            err.into_response()
        }
    };

    recorder.finish(response.status()).await;
    response
}

/// 按 Content-Type 前缀（忽略大小写）分发，先匹配者优先
async fn dispatch(
    state: &ForwardState,
    request: Request,
    draft: &mut RecordDraft,
) -> Result<String, ForwardError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        draft.narrow(Mode::T2i, InputType::Json);
        text_to_image(state, request, draft).await
    } else if content_type.starts_with("multipart/form-data") {
        draft.narrow(Mode::I2i, InputType::Multipart);
        image_to_image(state, request, draft).await
    } else {
        Err(ForwardError::bad_request(format!(
            "unsupported content type: {:?}",
            content_type
        )))
    }
}

async fn text_to_image(
    state: &ForwardState,
    request: Request,
    draft: &mut RecordDraft,
) -> Result<String, ForwardError> {
    let device = params::device_preference(request.headers());
    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| ForwardError::bad_request(format!("failed to read body: {}", e)))?;
    let params = TextParams::from_json(&body)?;

    draft.set_prompt(&params.prompt);
    draft.set_image_size(params.width, params.height);

    tracing::info!(
        backend = state.backend.name(),
        "t2i: {}x{}, steps={}, seed={:?}, device={}",
        params.width,
        params.height,
        params.steps,
        params.seed,
        device
    );

    let image = state
        .backend
        .text_to_image(TextToImage {
            prompt: params.prompt,
            width: params.width,
            height: params.height,
            steps: params.steps,
            seed: params.seed,
            device,
        })
        .await
        .map_err(ForwardError::generation)?;

    encode_output(image).await
}

async fn image_to_image(
    state: &ForwardState,
    request: Request,
    draft: &mut RecordDraft,
) -> Result<String, ForwardError> {
    let headers = request.headers().clone();
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ForwardError::bad_request(format!("invalid multipart body: {}", e)))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ForwardError::bad_request(format!("invalid multipart field: {}", e)))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ForwardError::bad_request(format!("failed to read image: {}", e)))?;
            upload = Some(bytes);
            break;
        }
    }
    let upload = upload.ok_or_else(|| ForwardError::bad_request("image field missing"))?;

    let params = ImageParams::from_headers(&headers)?;
    let device = params::device_preference(&headers);

    let image = tokio::task::spawn_blocking(move || codec::decode_image_bytes(&upload))
        .await
        .map_err(|e| ForwardError::bad_request(format!("decode task failed: {}", e)))?
        .map_err(|e| ForwardError::bad_request(format!("{:#}", e)))?;

    let (width, height) = image.dimensions();
    draft.set_image_size(width, height);
    draft.set_prompt(&params.prompt);

    tracing::info!(
        backend = state.backend.name(),
        "i2i: {}x{}, steps={}, strength={}, seed={:?}, device={}",
        width,
        height,
        params.steps,
        params.strength,
        params.seed,
        device
    );

    let output = state
        .backend
        .image_to_image(ImageToImage {
            image,
            prompt: params.prompt,
            steps: params.steps,
            strength: params.strength,
            seed: params.seed,
            device,
        })
        .await
        .map_err(ForwardError::generation)?;

    encode_output(output).await
}

/// PNG 编码放到阻塞线程池
async fn encode_output(image: DynamicImage) -> Result<String, ForwardError> {
    tokio::task::spawn_blocking(move || codec::encode_png_base64(&image))
        .await
        .map_err(|e| ForwardError::generation(e.into()))?
        .map_err(ForwardError::generation)
}
