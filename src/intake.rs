//! Validation and persistence of public help requests.
//!
//! Name and phone are mandatory. Everything else is best effort: coordinates
//! that cannot be parsed are stored as null rather than rejecting the request,
//! because someone asking for help with a snakebite should not be bounced over
//! a typo in a location field.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::model::{NewHelpRequest, RequestType, SubmissionForm};
use crate::storage::Storage;

/// Stored when the requester does not name a species.
pub const UNKNOWN_SPECIES: &str = "Unknown";

/// Stored when the requester gives no location text.
pub const UNSPECIFIED_LOCATION: &str = "Not specified";

/// Reported when a delete names no stored request.
pub const REQUEST_NOT_FOUND: &str = "Request not found";

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve coordinates for a submission.
///
/// Priority: explicit latitude and longitude (both present), then a `"lat,lon"`
/// location string, then nothing. A parse failure at the chosen step yields
/// `None`; it does not fall through to the next step.
pub fn resolve_coordinates(
    latitude: Option<&str>,
    longitude: Option<&str>,
    location: Option<&str>,
) -> Option<GeoPoint> {
    if let (Some(lat), Some(lon)) = (non_empty(latitude), non_empty(longitude)) {
        return parse_pair(lat, lon);
    }

    let location = non_empty(location)?;
    let (lat, lon) = location.split_once(',')?;
    if lon.contains(',') {
        return None;
    }
    parse_pair(lat.trim(), lon.trim())
}

fn parse_pair(lat: &str, lon: &str) -> Option<GeoPoint> {
    let latitude = lat.parse::<f64>().ok()?;
    let longitude = lon.parse::<f64>().ok()?;
    Some(GeoPoint::new(latitude, longitude))
}

/// Turn raw form fields into a request ready to store.
pub fn validate_submission(
    form: &SubmissionForm,
    now: DateTime<Utc>,
) -> Result<NewHelpRequest, AppError> {
    let (Some(name), Some(phone)) = (
        non_empty(form.name.as_deref()),
        non_empty(form.phone.as_deref()),
    ) else {
        return Err(AppError::Validation(
            "Name and phone are required".to_string(),
        ));
    };

    let request_type = match non_empty(form.request_type.as_deref()) {
        None => RequestType::default(),
        Some(raw) => raw
            .parse::<RequestType>()
            .map_err(|e| AppError::Validation(format!("Invalid request type: {}", e.0)))?,
    };

    let point = resolve_coordinates(
        form.latitude.as_deref(),
        form.longitude.as_deref(),
        form.location.as_deref(),
    );

    Ok(NewHelpRequest {
        name: name.to_string(),
        phone: phone.to_string(),
        snake_species: non_empty(form.snake_species.as_deref())
            .unwrap_or(UNKNOWN_SPECIES)
            .to_string(),
        location: non_empty(form.location.as_deref())
            .unwrap_or(UNSPECIFIED_LOCATION)
            .to_string(),
        request_type,
        latitude: point.map(|p| p.latitude),
        longitude: point.map(|p| p.longitude),
        timestamp: now,
    })
}

/// Validate and store a submission, returning the new request id.
#[instrument(skip_all, fields(request_type))]
pub async fn submit(storage: &Storage, form: &SubmissionForm) -> Result<i64, AppError> {
    let request = validate_submission(form, Utc::now())?;
    tracing::Span::current().record("request_type", request.request_type.as_str());

    let id = storage.insert_help_request(&request).await?;

    // Name and phone stay out of the log.
    info!(
        id,
        request_type = %request.request_type,
        has_coordinates = request.latitude.is_some(),
        "Help request stored"
    );
    Ok(id)
}

/// Remove a help request. Fails with `NotFound` if the id does not exist.
#[instrument(skip(storage))]
pub async fn delete(storage: &Storage, id: i64) -> Result<(), AppError> {
    if storage.delete_help_request(id).await? {
        info!(id, "Help request deleted");
        Ok(())
    } else {
        Err(AppError::NotFound(REQUEST_NOT_FOUND.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, phone: &str) -> SubmissionForm {
        SubmissionForm {
            name: Some(name.to_string()),
            phone: Some(phone.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_coordinates_win() {
        let point = resolve_coordinates(Some("28.2"), Some("83.98"), Some("27.7,85.3"));
        assert_eq!(point, Some(GeoPoint::new(28.2, 83.98)));
    }

    #[test]
    fn test_location_string_parsed() {
        let point = resolve_coordinates(None, None, Some("27.7,85.3"));
        assert_eq!(point, Some(GeoPoint::new(27.7, 85.3)));

        let point = resolve_coordinates(Some(""), Some(""), Some(" 27.7 , 85.3 "));
        assert_eq!(point, Some(GeoPoint::new(27.7, 85.3)));
    }

    #[test]
    fn test_only_one_explicit_field_uses_location() {
        let point = resolve_coordinates(Some("28.2"), None, Some("27.7,85.3"));
        assert_eq!(point, Some(GeoPoint::new(27.7, 85.3)));
    }

    #[test]
    fn test_bad_explicit_coordinates_are_null() {
        // No fall through to the location string.
        assert_eq!(
            resolve_coordinates(Some("north"), Some("85.3"), Some("27.7,85.3")),
            None
        );
    }

    #[test]
    fn test_unparsable_location_is_null() {
        assert_eq!(resolve_coordinates(None, None, Some("Chitwan")), None);
        assert_eq!(resolve_coordinates(None, None, Some("Bharatpur, Chitwan")), None);
        assert_eq!(resolve_coordinates(None, None, Some("27.7,85.3,1300")), None);
        assert_eq!(resolve_coordinates(None, None, None), None);
    }

    #[test]
    fn test_missing_name_or_phone_rejected() {
        let now = Utc::now();
        for form in [
            form("", "9800000000"),
            form("Sita", ""),
            form("  ", "9800000000"),
            SubmissionForm::default(),
        ] {
            let err = validate_submission(&form, now).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn test_defaults_applied() {
        let request = validate_submission(&form("Sita", "9800000000"), Utc::now()).unwrap();
        assert_eq!(request.snake_species, UNKNOWN_SPECIES);
        assert_eq!(request.location, UNSPECIFIED_LOCATION);
        assert_eq!(request.request_type, RequestType::Hospital);
        assert_eq!(request.latitude, None);
    }

    #[test]
    fn test_unknown_request_type_rejected() {
        let mut form = form("Sita", "9800000000");
        form.request_type = Some("ambulance".to_string());
        let err = validate_submission(&form, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_submit_persists() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let mut form = form("Sita", "9800000000");
        form.location = Some("27.7,85.3".to_string());
        form.request_type = Some("rescue".to_string());

        let id = submit(&storage, &form).await.unwrap();
        let stored = storage.get_help_request(id).await.unwrap().unwrap();

        assert_eq!(stored.request_type, RequestType::Rescue);
        assert!((stored.latitude.unwrap() - 27.7).abs() < 1e-9);
        assert!((stored.longitude.unwrap() - 85.3).abs() < 1e-9);
        assert_eq!(stored.location, "27.7,85.3");
    }

    #[tokio::test]
    async fn test_rejected_submission_not_persisted() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        assert!(submit(&storage, &form("Sita", "")).await.is_err());
        assert_eq!(storage.count_help_requests().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let err = delete(&storage, 42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
