//! Patient, prescription and medicine records.
//!
//! A patient owns its prescriptions; a prescription owns its medicines.
//! Prescription order is insertion order and doubles as the positional
//! index the API exposes.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root record for one individual.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Store-assigned identifier (UUID v4).
    pub id: String,
    pub name: String,
    /// Search key for the by-phone lookup.
    pub phone: String,
    pub dob: NaiveDate,
    /// Whole years at creation time. A snapshot, never recomputed.
    pub age: i32,
    pub address: String,
    pub gender: String,
    pub medical_history: String,
    pub prescriptions: Vec<Prescription>,
}

/// One clinical encounter's diagnosis, treatment and medicine list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    /// Surrogate identifier, stable even if positional order ever changes.
    pub id: String,
    pub date: DateTime<Utc>,
    pub diagnosis: String,
    pub treatment: String,
    pub medicines: Vec<Medicine>,
    pub notes: String,
    /// Relative path of the generated document. Set at most once.
    pub pdf_path: Option<String>,
}

/// One drug line item within a prescription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub name: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
}

impl Patient {
    /// Create a new patient with an empty prescription history. The age
    /// snapshot is taken against today's UTC date.
    pub fn new(
        name: String,
        phone: String,
        dob: NaiveDate,
        address: String,
        gender: String,
        medical_history: String,
    ) -> Self {
        let age = age_on(dob, Utc::now().date_naive());
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            phone,
            dob,
            age,
            address,
            gender,
            medical_history,
            prescriptions: Vec::new(),
        }
    }
}

impl Prescription {
    /// Create a prescription with no generated document yet. `date` falls
    /// back to the moment of insertion when the caller did not supply one.
    pub fn new(
        diagnosis: String,
        treatment: String,
        medicines: Vec<Medicine>,
        notes: String,
        date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date: date.unwrap_or_else(Utc::now),
            diagnosis,
            treatment,
            medicines,
            notes,
            pdf_path: None,
        }
    }
}

/// Age in whole years at `today` for someone born on `dob`. Calendar
/// arithmetic only; both dates must come from the same timezone.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}
