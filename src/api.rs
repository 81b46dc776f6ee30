//! HTTP handlers for SnakeSafe.
//!
//! JSON endpoints return `{"error": ...}` with a 4xx/5xx status on failure.
//! Page endpoints never fail outright: if the data behind a page cannot be
//! loaded, the page renders empty with an error banner.
//!
//! Requester names and phone numbers are never written to the log.

use axum::{
    Form, Json, Router, async_trait,
    extract::{
        DefaultBodyLimit, FromRef, FromRequest, Multipart, Path, Query, Request, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::PathRejection,
    },
    http::{StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument, warn};

use crate::auth::{self, CurrentOperator};
use crate::classifier::{PredictionResponse, SpeciesClassifier};
use crate::error::{AppError, EndpointError};
use crate::geo::{GeoPoint, RankedFacility, rank_by_distance};
use crate::intake;
use crate::model::{
    FacilityKind, HospitalsResponse, LocationQuery, LoginForm, RescuersResponse,
    SubmissionForm, SuccessResponse,
};
use crate::storage::Storage;
use crate::views::{self, Notice};

/// Multipart field carrying the photo for POST /predict.
pub const IMAGE_FIELD: &str = "snakeImage";

/// Largest request body accepted; phone photos are often several megabytes.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

const NO_IMAGE_UPLOADED: &str = "No image uploaded";

/// Application state shared across handlers.
///
/// Everything here is built once in `main` and lives for the whole process.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub storage: Storage,
    pub classifier: SpeciesClassifier,

    /// Signs and verifies the session cookie.
    pub session_key: Key,
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/info", get(info_page))
        .route("/health", get(health_check))
        .route("/snakebite", get(snakebite_page))
        .route("/rescue", get(rescue_page))
        .route("/api/hospitals", get(get_hospitals))
        .route("/api/rescuers", get(get_rescuers))
        .route("/predict", post(predict))
        .route("/submit_request", post(submit_request))
        .route("/delete_request/:id", post(delete_request))
        .route("/dashboard", get(dashboard))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
}

/// GET / - Landing page with the photo upload and help request forms.
pub async fn index() -> Html<String> {
    views::index()
}

/// GET /info - Static first-aid page.
pub async fn info_page() -> Html<String> {
    views::info()
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

// ============================================================================
// Facility directory
// ============================================================================

async fn ranked_facilities(
    storage: &Storage,
    kind: FacilityKind,
    origin: GeoPoint,
) -> Result<Vec<RankedFacility>, AppError> {
    let facilities = storage.list_facilities(kind).await?;
    Ok(rank_by_distance(origin, facilities))
}

async fn facility_page(storage: &Storage, kind: FacilityKind, query: &LocationQuery) -> Html<String> {
    let origin = query.origin();

    match ranked_facilities(storage, kind, origin).await {
        Ok(ranked) => {
            info!(kind = kind.plural(), count = ranked.len(), "Facility page rendered");
            views::facilities(kind, &ranked, origin, None)
        }
        Err(e) => {
            error!(kind = kind.plural(), error = %e, "Failed to load facilities");
            let notice = Notice::danger(format!(
                "An error occurred while loading {}.",
                kind.plural()
            ));
            views::facilities(kind, &[], origin, Some(&notice))
        }
    }
}

/// GET /snakebite - Hospitals nearest to `lat`/`lon` (default: Kathmandu).
#[instrument(skip(state))]
pub async fn snakebite_page(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Html<String> {
    facility_page(&state.storage, FacilityKind::Hospital, &query).await
}

/// GET /rescue - Rescuers nearest to `lat`/`lon` (default: Kathmandu).
#[instrument(skip(state))]
pub async fn rescue_page(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Html<String> {
    facility_page(&state.storage, FacilityKind::Rescuer, &query).await
}

/// GET /api/hospitals - Hospitals sorted by distance.
///
/// # Response
///
/// ```json
/// {
///     "hospitals": [
///         {
///             "id": 2,
///             "name": "Bir Hospital",
///             "phone": "+977-1-4221119",
///             "latitude": 27.706,
///             "longitude": 85.315,
///             "distance": 1.31
///         }
///     ]
/// }
/// ```
#[instrument(skip(state))]
pub async fn get_hospitals(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<HospitalsResponse>, EndpointError> {
    let hospitals = ranked_facilities(&state.storage, FacilityKind::Hospital, query.origin())
        .await
        .map_err(EndpointError::new("Failed to fetch hospitals"))?;

    Ok(Json(HospitalsResponse { hospitals }))
}

/// GET /api/rescuers - Rescuers sorted by distance, same shape as hospitals.
#[instrument(skip(state))]
pub async fn get_rescuers(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<RescuersResponse>, EndpointError> {
    let rescuers = ranked_facilities(&state.storage, FacilityKind::Rescuer, query.origin())
        .await
        .map_err(EndpointError::new("Failed to fetch rescuers"))?;

    Ok(Json(RescuersResponse { rescuers }))
}

// ============================================================================
// Classification
// ============================================================================

/// POST /predict - Identify the snake in an uploaded photo.
///
/// Expects `multipart/form-data` with the image in the `snakeImage` field.
///
/// # Response
///
/// ```json
/// {
///     "species": "Naja_naja",
///     "confidence": 97.3,
///     "common_name": "Indian Cobra",
///     "nepali_name": "गोमन (Goman)",
///     "danger": "Highly venomous",
///     "habitat": "Plains, forests"
/// }
/// ```
#[instrument(skip_all)]
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, EndpointError> {
    const CONTEXT: &str = "Failed to process image";

    let bytes = read_image_field(multipart)
        .await
        .map_err(EndpointError::new(CONTEXT))?;

    let prediction = state
        .classifier
        .classify_upload(bytes)
        .await
        .map_err(EndpointError::new(CONTEXT))?;

    Ok(Json(prediction.into()))
}

async fn read_image_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<u8>, AppError> {
    // Not a multipart body at all: there is no image field to find.
    let mut multipart = multipart.map_err(|e| {
        debug!(error = %e, "Upload is not multipart");
        AppError::Validation(NO_IMAGE_UPLOADED.to_string())
    })?;

    while let Some(field) = multipart.next_field().await.map_err(malformed_upload)? {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await.map_err(malformed_upload)?;
            return Ok(bytes.to_vec());
        }
    }

    Err(AppError::Validation(NO_IMAGE_UPLOADED.to_string()))
}

fn malformed_upload(e: MultipartError) -> AppError {
    AppError::Validation(format!("Malformed upload: {e}"))
}

// ============================================================================
// Help requests
// ============================================================================

/// POST /submit_request - Record a request for a hospital or a rescuer.
///
/// # Form Fields
///
/// - `name`, `phone` (required)
/// - `request_type` (optional): `hospital` (default) or `rescue`
/// - `snakeSpecies`, `location`, `latitude`, `longitude` (optional)
///
/// Coordinates come from `latitude`/`longitude` if both are given, otherwise
/// from a `"lat,lon"` location string. Unparsable values are stored as null.
///
/// The body may be urlencoded or `multipart/form-data`.
#[instrument(skip_all)]
pub async fn submit_request(
    State(state): State<AppState>,
    FormFields(form): FormFields<SubmissionForm>,
) -> Result<Json<SuccessResponse>, EndpointError> {
    intake::submit(&state.storage, &form)
        .await
        .map_err(EndpointError::new("Failed to submit request"))?;

    Ok(Json(SuccessResponse::new("Request submitted successfully")))
}

/// POST /delete_request/:id - Remove a request. Operators only.
#[instrument(skip(state, operator), fields(operator_id = operator.id))]
pub async fn delete_request(
    operator: CurrentOperator,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse>, EndpointError> {
    const CONTEXT: &str = "Failed to delete request";

    // Ids are integers; anything else cannot name a stored request.
    let Path(id) = id.map_err(|e| {
        debug!(error = %e, "Unparsable request id");
        EndpointError::new(CONTEXT)(AppError::NotFound(intake::REQUEST_NOT_FOUND.to_string()))
    })?;

    intake::delete(&state.storage, id)
        .await
        .map_err(EndpointError::new(CONTEXT))?;

    Ok(Json(SuccessResponse::new("Request deleted successfully")))
}

/// GET /dashboard - Every help request. Operators only.
#[instrument(skip(state, operator), fields(operator_id = operator.id))]
pub async fn dashboard(operator: CurrentOperator, State(state): State<AppState>) -> Html<String> {
    match state.storage.list_help_requests().await {
        Ok(requests) => {
            info!(count = requests.len(), "Dashboard rendered");
            views::dashboard(&operator.username, &requests, None)
        }
        Err(e) => {
            error!(error = %e, "Failed to load help requests");
            let notice = Notice::danger("An error occurred while loading requests.");
            views::dashboard(&operator.username, &[], Some(&notice))
        }
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// GET /login - Login form, or a redirect home if already signed in.
pub async fn login_page(operator: Option<CurrentOperator>) -> Response {
    if operator.is_some() {
        return Redirect::to("/").into_response();
    }
    views::login(None).into_response()
}

/// POST /login - Check credentials and start a session.
///
/// A failed attempt re-renders the form and never sets a cookie.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    form: Result<FormFields<LoginForm>, AppError>,
) -> Response {
    // An unreadable body is just a failed login.
    let form = form.map(|FormFields(form)| form).unwrap_or_default();

    let username = form.username.unwrap_or_default();
    let password = form.password.unwrap_or_default();

    match auth::authenticate(&state.storage, &username, &password).await {
        Ok(Some(operator)) => (auth::start_session(jar, &operator), Redirect::to("/")).into_response(),
        Ok(None) => {
            warn!("Rejected login attempt");
            let notice = Notice::danger("Invalid username or password.");
            (StatusCode::UNAUTHORIZED, views::login(Some(&notice))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Login failed");
            let notice = Notice::danger("An error occurred while logging in.");
            (StatusCode::INTERNAL_SERVER_ERROR, views::login(Some(&notice))).into_response()
        }
    }
}

/// GET /logout - End the session.
#[instrument(skip_all, fields(operator_id = operator.id))]
pub async fn logout(operator: CurrentOperator, jar: SignedCookieJar) -> impl IntoResponse {
    info!("Logged out");
    (auth::end_session(jar), Redirect::to("/"))
}

// ============================================================================
// Extractors
// ============================================================================

/// Form fields from an urlencoded or a `multipart/form-data` body.
///
/// Browsers post `FormData` as multipart and plain forms as urlencoded; both
/// decode into the same struct. File parts are skipped and the first value of
/// a repeated field wins. Any other body, or none, yields `T::default()` so
/// that required-field checks can say what is missing.
pub struct FormFields<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for FormFields<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(format!("Malformed form: {e}")))?;
            let fields = text_fields(multipart).await?;
            serde_json::from_value(Value::Object(fields))
                .map(FormFields)
                .map_err(|e| AppError::Validation(format!("Malformed form: {e}")))
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(format!("Malformed form: {e}")))?;
            Ok(FormFields(value))
        } else {
            Ok(FormFields(T::default()))
        }
    }
}

async fn text_fields(mut multipart: Multipart) -> Result<Map<String, Value>, AppError> {
    let mut fields = Map::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed_upload)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if field.file_name().is_some() {
            continue;
        }
        let text = field.text().await.map_err(malformed_upload)?;
        fields.entry(name).or_insert(Value::String(text));
    }

    Ok(fields)
}
