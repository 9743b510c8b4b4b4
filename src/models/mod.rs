//! Domain models for patients and their prescription history.

mod patient;

pub use patient::{age_on, Medicine, Patient, Prescription};
