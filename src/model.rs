//! Data models for SnakeSafe.
//!
//! Facilities and operator accounts are reference data written by the seeder.
//! Help requests are the only records created by the public, and the only ones
//! an operator can remove.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, KATHMANDU, RankedFacility};

/// Nepal Time, UTC+05:45. Used only for display.
pub fn nepal_time() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 45 * 60).expect("UTC+05:45 is a valid offset")
}

/// A hospital or volunteer rescuer with a phone number and coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Facility {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Which facility directory a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilityKind {
    Hospital,
    Rescuer,
}

impl FacilityKind {
    /// Backing table for this kind of facility.
    pub(crate) fn table(self) -> &'static str {
        match self {
            FacilityKind::Hospital => "hospitals",
            FacilityKind::Rescuer => "rescuers",
        }
    }

    /// Human-readable plural, used in page headings and log fields.
    pub fn plural(self) -> &'static str {
        match self {
            FacilityKind::Hospital => "hospitals",
            FacilityKind::Rescuer => "rescuers",
        }
    }
}

/// A facility as supplied to the seeder, before it has an id.
#[derive(Debug, Clone, Copy)]
pub struct NewFacility {
    pub name: &'static str,
    pub phone: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

/// What kind of help the requester is asking for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    /// Directions to, or contact with, a hospital.
    #[default]
    Hospital,
    /// A volunteer to remove a snake.
    Rescue,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Hospital => "hospital",
            RequestType::Rescue => "rescue",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a request type string is neither `hospital` nor `rescue`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown request type '{0}'")]
pub struct UnknownRequestType(pub String);

impl FromStr for RequestType {
    type Err = UnknownRequestType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hospital" => Ok(RequestType::Hospital),
            "rescue" => Ok(RequestType::Rescue),
            _ => Err(UnknownRequestType(s.to_string())),
        }
    }
}

/// A persisted help request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HelpRequest {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub snake_species: String,
    pub location: String,
    pub request_type: RequestType,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Server-assigned creation time.
    pub timestamp: DateTime<Utc>,
}

impl HelpRequest {
    /// Creation time rendered in Nepal Time.
    pub fn local_timestamp(&self) -> String {
        self.timestamp
            .with_timezone(&nepal_time())
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

/// A validated help request ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHelpRequest {
    pub name: String,
    pub phone: String,
    pub snake_species: String,
    pub location: String,
    pub request_type: RequestType,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// An operator account as stored. The hash is a PHC string.
#[derive(Debug, Clone)]
pub struct Operator {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// Form body for POST /submit_request.
///
/// Every field is optional at the decoding stage; validation happens in
/// [`crate::intake`] so that a missing field yields a JSON error rather than a
/// framework rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionForm {
    pub request_type: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "snakeSpecies")]
    pub snake_species: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

/// Form body for POST /login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Query parameters for the facility pages and APIs.
///
/// Values are kept as strings so that an unparsable coordinate falls back to
/// the default instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl LocationQuery {
    /// The query point, with Kathmandu substituted for any missing or bad value.
    pub fn origin(&self) -> GeoPoint {
        fn parse(value: Option<&String>) -> Option<f64> {
            value.and_then(|v| v.trim().parse::<f64>().ok())
        }

        GeoPoint::new(
            parse(self.lat.as_ref()).unwrap_or(KATHMANDU.latitude),
            parse(self.lon.as_ref()).unwrap_or(KATHMANDU.longitude),
        )
    }
}

/// Response for GET /api/hospitals.
#[derive(Debug, Clone, Serialize)]
pub struct HospitalsResponse {
    pub hospitals: Vec<RankedFacility>,
}

/// Response for GET /api/rescuers.
#[derive(Debug, Clone, Serialize)]
pub struct RescuersResponse {
    pub rescuers: Vec<RankedFacility>,
}

/// Generic success body for mutations.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Error body returned by every JSON endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
