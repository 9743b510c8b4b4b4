//! Request handlers for the patient and prescription API.
//!
//! Each handler performs at most one store operation and translates the
//! result into JSON; the generate-pdf path additionally writes the rendered
//! file before persisting its location.

use std::path::Path;
use std::time::Duration;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use validator::Validate;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::models::{Medicine, Patient, Prescription};
use crate::pdf;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPatientRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub dob: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub medical_history: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescribeRequest {
    /// Defaults to the moment of insertion when absent.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub treatment: String,
    #[serde(default)]
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct PhoneQuery {
    pub phone: Option<String>,
}

/// A prescription tagged with its positional index.
#[derive(Debug, Serialize)]
pub struct PrescriptionSummary {
    pub idx: usize,
    #[serde(flatten)]
    pub prescription: Prescription,
}

#[derive(Debug, Serialize)]
pub struct PrescriptionDetail {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub patient: PatientSnapshot,
}

/// Read-only parent snapshot embedded in the detail payload.
#[derive(Debug, Serialize)]
pub struct PatientSnapshot {
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfPathResponse {
    pub pdf_path: String,
}

pub async fn create_patient(
    state: web::Data<AppState>,
    body: web::Json<NewPatientRequest>,
) -> ApiResult<HttpResponse> {
    let req = body.into_inner();
    req.validate()
        .map_err(|e| ApiError::InvalidArgument(e.to_string()))?;
    let dob = NaiveDate::parse_from_str(&req.dob, "%Y-%m-%d")
        .map_err(|_| ApiError::InvalidArgument(format!("unparsable date of birth: {}", req.dob)))?;

    let patient = Patient::new(req.name, req.phone, dob, req.address, req.gender, req.medical_history);
    state.db.insert_patient(&patient).await?;

    tracing::info!(patient_id = %patient.id, "patient created");
    Ok(HttpResponse::Created().json(patient))
}

pub async fn search_by_phone(
    state: web::Data<AppState>,
    query: web::Query<PhoneQuery>,
) -> ApiResult<HttpResponse> {
    let phone = query.phone.as_deref().unwrap_or("").trim().to_string();
    if phone.is_empty() {
        return Err(ApiError::InvalidArgument("phone is required".into()));
    }

    // Zero matches is an empty list, not an error.
    let patients = state.db.find_by_phone_prefix(&phone).await?;
    Ok(HttpResponse::Ok().json(patients))
}

pub async fn prescribe(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PrescribeRequest>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let req = body.into_inner();
    let prescription = Prescription::new(req.diagnosis, req.treatment, req.medicines, req.notes, req.date);

    state.db.append_prescription(&id, &prescription).await?;

    tracing::info!(patient_id = %id, prescription_id = %prescription.id, "prescription added");
    Ok(HttpResponse::Ok().json(prescription))
}

pub async fn list_prescriptions(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let patient = state.db.fetch_patient(&path.into_inner()).await?;
    let summaries: Vec<PrescriptionSummary> = patient
        .prescriptions
        .into_iter()
        .enumerate()
        .map(|(idx, prescription)| PrescriptionSummary { idx, prescription })
        .collect();
    Ok(HttpResponse::Ok().json(summaries))
}

pub async fn prescription_detail(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (id, raw_idx) = path.into_inner();
    let idx = parse_index(&raw_idx)?;
    let patient = state.db.fetch_patient(&id).await?;
    let prescription = patient
        .prescriptions
        .get(idx)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("prescription {idx} not found")))?;

    Ok(HttpResponse::Ok().json(PrescriptionDetail {
        prescription,
        patient: PatientSnapshot {
            name: patient.name,
            age: patient.age,
            gender: patient.gender,
            address: patient.address,
        },
    }))
}

pub async fn generate_pdf(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (id, raw_idx) = path.into_inner();
    let idx = parse_index(&raw_idx)?;
    let patient = state.db.fetch_patient(&id).await?;
    let prescription = patient
        .prescriptions
        .get(idx)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("prescription {idx} not found")))?;

    // Idempotent: a generated document is never re-rendered.
    if let Some(existing) = prescription.pdf_path.as_deref() {
        return Ok(HttpResponse::Ok().json(PdfPathResponse {
            pdf_path: existing.to_string(),
        }));
    }

    let clinic_name = state.clinic.name.clone();
    let render_patient = patient.clone();
    let bytes = web::block(move || pdf::render_prescription(&clinic_name, &render_patient, &prescription))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let file_name = format!("prescription_{}.pdf", Utc::now().timestamp_millis());
    let pdf_path = format!("/uploads/{file_name}");
    let target = state.storage.uploads_path().join(&file_name);
    let timeout = Duration::from_secs(state.storage.pdf_timeout_secs);

    // A stalled write must not hang the request; on timeout the file handle
    // drops with the location still unset, which is the retry starting
    // point.
    match tokio::time::timeout(timeout, write_flushed(&target, &bytes)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(ApiError::Internal(format!("pdf write failed: {e}"))),
        Err(_) => return Err(ApiError::Internal("pdf write timed out".into())),
    }

    if state.db.set_pdf_path(&id, idx, &pdf_path).await? {
        tracing::info!(patient_id = %id, idx, %pdf_path, "prescription pdf generated");
        return Ok(HttpResponse::Ok().json(PdfPathResponse { pdf_path }));
    }

    // Lost the set-once race; the stored location wins and our fresh file
    // stays orphaned on disk.
    let patient = state.db.fetch_patient(&id).await?;
    let winner = patient
        .prescriptions
        .get(idx)
        .and_then(|rx| rx.pdf_path.clone())
        .ok_or_else(|| ApiError::Internal("pdf location missing after update".into()))?;
    Ok(HttpResponse::Ok().json(PdfPathResponse { pdf_path: winner }))
}

fn parse_index(raw: &str) -> ApiResult<usize> {
    raw.parse()
        .map_err(|_| ApiError::InvalidArgument(format!("malformed prescription index: {raw}")))
}

/// The response must not leave before the bytes reach disk.
async fn write_flushed(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}
