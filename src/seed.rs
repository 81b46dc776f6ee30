//! Reference data for a fresh database: hospitals with snakebite treatment,
//! volunteer snake rescuers, and the first operator account.
//!
//! Seeding is idempotent. Facilities are matched by name within their own
//! directory and operators by username; existing rows are never touched.
//! A run commits everything or nothing.

use tracing::{info, instrument};

use crate::auth::hash_password;
use crate::model::{FacilityKind, NewFacility};
use crate::storage::{Storage, insert_facility_if_absent, insert_operator_if_absent};

const fn facility(name: &'static str, phone: &'static str, latitude: f64, longitude: f64) -> NewFacility {
    NewFacility {
        name,
        phone,
        latitude,
        longitude,
    }
}

pub const HOSPITALS: &[NewFacility] = &[
    facility("Tribhuvan University Teaching Hospital", "+977-1-4410911", 27.7480, 85.3240),
    facility("Bir Hospital", "+977-1-4221119", 27.7060, 85.3150),
    facility("Patan Hospital", "+977-1-5522295", 27.6680, 85.3200),
    facility(
        "Sukraraj Tropical & Infectious Disease Hospital (Teku Hospital)",
        "+977-1-425xxxx",
        27.7060,
        85.3120,
    ),
    facility("Bheri Hospital (Nepalgunj)", "+977-81-520188", 28.0530, 81.6170),
    facility("BP Koirala Institute of Health Sciences (Dharan)", "+977-25-525015", 26.8110, 87.2829),
    facility("Katari Hospital (Udayapur)", "+977-31-560128", 26.9200, 86.7100),
    facility("Mahakali Provincial Hospital (Mahendranagar)", "+977-99-523xxxx", 28.6340, 80.6190),
    facility("Bharatpur Hospital (Chitwan)", "+977-56-520xxx", 27.6833, 84.4333),
    facility("Rapti Provincial Hospital (Tulsipur)", "+977-82-520xxx", 28.0600, 82.2890),
];

pub const RESCUERS: &[NewFacility] = &[
    facility("Ramji Gautam", "+977-9846033459", 28.2098, 83.9856),
    facility("Keshab Raj Sapkota", "+977-9856024195", 28.2098, 83.9856),
    facility("Asbin Ojha", "+977-9845370199", 27.7000, 84.5000),
    facility("Rishi Baral", "+977-9856038360", 28.2098, 83.9856),
    facility("Aakash Bhandari", "+977-9816636337", 28.2098, 83.9856),
    facility("Siddhartha Bhandari", "+977-9806600444", 28.2098, 83.9856),
    facility("Roshan Giri", "+977-9840290781", 28.2098, 83.9856),
    facility("Rohit Giri", "+977-9866344156", 28.2098, 83.9856),
    facility("Niroj Karki", "+977-9849517193", 27.6730, 85.3430),
    facility("Subodh Acharya", "+977-9843286283", 27.6790, 85.1900),
    facility("Prithivi Narayan Sharma", "+977-9856055058", 28.0500, 83.8500),
    facility("Anirudra Sapkota", "+977-9845070473", 27.7000, 84.4320),
    facility("Sunil Sapkota", "+977-9845364525", 27.7000, 84.4320),
    facility("Puskal Nepal", "+977-9845703045", 27.7000, 84.4320),
    facility("Yam Lal Bhandari", "+977-9855081753", 27.7000, 84.4320),
    facility("NTNC‑BCC (Chitwan)", "+977-56-58062", 27.7000, 84.4320),
    facility("Dr. Amod Ghimire", "+977-9865005828", 27.5000, 84.7500),
    facility("Prem Mahato", "+977-9805423471", 27.4830, 84.2750),
    facility("Mithila Wildlife Trust", "+977-9817629229", 26.7167, 85.8667),
    facility("Nepal Snake Rescue Team (Pokhara)", "+977-9814142349", 28.2098, 83.9856),
    facility("Rohit Giri (Pokhara)", "98245786xx", 28.2098, 83.9856),
];

/// What a seeding run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub hospitals_added: usize,
    pub rescuers_added: usize,
    pub operator_added: bool,
}

/// Insert the built-in directory and the operator account where missing.
#[instrument(skip(storage, admin_password))]
pub async fn seed(
    storage: &Storage,
    admin_username: &str,
    admin_password: &str,
) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    // Look up the operator before opening the transaction: it holds the
    // pool's only connection when the database is in memory.
    let operator_hash = match storage.find_operator_by_username(admin_username).await? {
        Some(_) => None,
        None => Some(
            hash_password(admin_password)
                .map_err(|e| anyhow::anyhow!("failed to hash operator password: {e}"))?,
        ),
    };

    let mut tx = storage.begin().await?;

    for hospital in HOSPITALS {
        if insert_facility_if_absent(&mut tx, FacilityKind::Hospital, hospital).await? {
            report.hospitals_added += 1;
        }
    }

    for rescuer in RESCUERS {
        if insert_facility_if_absent(&mut tx, FacilityKind::Rescuer, rescuer).await? {
            report.rescuers_added += 1;
        }
    }

    if let Some(hash) = operator_hash {
        report.operator_added = insert_operator_if_absent(&mut tx, admin_username, &hash).await?;
    }

    tx.commit().await?;

    info!(
        hospitals_added = report.hospitals_added,
        rescuers_added = report.rescuers_added,
        operator_added = report.operator_added,
        "Seeding complete"
    );
    Ok(report)
}
