//! Record store operations.
//!
//! Every mutation is a single statement against one patient row, so appends
//! and location updates are atomic per patient without an explicit
//! transaction.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{Database, StoreError, StoreResult};
use crate::models::{Patient, Prescription};

const PATIENT_COLUMNS: &str =
    "id, name, phone, dob, age, address, gender, medical_history, prescriptions";

/// Escape LIKE wildcards so a phone prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn parse_id(id: &str) -> StoreResult<String> {
    Uuid::parse_str(id)
        .map(|u| u.to_string())
        .map_err(|_| StoreError::InvalidId(id.to_string()))
}

fn patient_from_row(row: &SqliteRow) -> StoreResult<Patient> {
    let raw: String = row.try_get("prescriptions")?;
    let prescriptions: Vec<Prescription> = serde_json::from_str(&raw)?;
    Ok(Patient {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        dob: row.try_get("dob")?,
        age: row.try_get("age")?,
        address: row.try_get("address")?,
        gender: row.try_get("gender")?,
        medical_history: row.try_get("medical_history")?,
        prescriptions,
    })
}

impl Database {
    /// Persist a new patient row with its embedded prescription history.
    pub async fn insert_patient(&self, patient: &Patient) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO patients (id, name, phone, dob, age, address, gender, medical_history, prescriptions)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&patient.id)
        .bind(&patient.name)
        .bind(&patient.phone)
        .bind(patient.dob)
        .bind(patient.age)
        .bind(&patient.address)
        .bind(&patient.gender)
        .bind(&patient.medical_history)
        .bind(serde_json::to_string(&patient.prescriptions)?)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Prefix match on stored phone values. SQLite LIKE is ASCII
    /// case-insensitive, which covers the lookup contract.
    pub async fn find_by_phone_prefix(&self, prefix: &str) -> StoreResult<Vec<Patient>> {
        let sql = format!(
            r#"SELECT {PATIENT_COLUMNS} FROM patients WHERE phone LIKE ? ESCAPE '\' ORDER BY name"#
        );
        let rows = sqlx::query(&sql)
            .bind(like_prefix(prefix))
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(patient_from_row).collect()
    }

    pub async fn fetch_patient(&self, id: &str) -> StoreResult<Patient> {
        let id = parse_id(id)?;
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(&id)
            .fetch_optional(self.pool())
            .await?;
        match row {
            Some(row) => patient_from_row(&row),
            None => Err(StoreError::NotFound(id)),
        }
    }

    /// Append a prescription to the patient's embedded history. The append
    /// happens inside one UPDATE via `json_insert('$[#]')`, so there is no
    /// fetch-then-save window between concurrent appends.
    pub async fn append_prescription(
        &self,
        id: &str,
        prescription: &Prescription,
    ) -> StoreResult<()> {
        let id = parse_id(id)?;
        let doc = serde_json::to_string(prescription)?;
        let result = sqlx::query(
            "UPDATE patients
             SET prescriptions = json_insert(prescriptions, '$[#]', json(?))
             WHERE id = ?",
        )
        .bind(doc)
        .bind(&id)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Record the generated document location for the prescription at
    /// `idx`. The update only fires while the stored location is still
    /// null, so the location is set at most once; returns whether this
    /// call won the write.
    pub async fn set_pdf_path(&self, id: &str, idx: usize, pdf_path: &str) -> StoreResult<bool> {
        let id = parse_id(id)?;
        let element = format!("$[{idx}]");
        let result = sqlx::query(
            "UPDATE patients
             SET prescriptions = json_set(prescriptions, ? || '.pdfPath', ?)
             WHERE id = ?
               AND json_extract(prescriptions, ? || '.pdfPath') IS NULL
               AND json_array_length(prescriptions) > ?",
        )
        .bind(&element)
        .bind(pdf_path)
        .bind(&id)
        .bind(&element)
        .bind(idx as i64)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Medicine;
    use chrono::NaiveDate;

    async fn setup_db() -> Database {
        let db = Database::connect_in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        db
    }

    fn sample_patient(name: &str, phone: &str) -> Patient {
        Patient::new(
            name.into(),
            phone.into(),
            NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
            "12 Main St".into(),
            "F".into(),
            "none".into(),
        )
    }

    fn sample_prescription(diagnosis: &str) -> Prescription {
        Prescription::new(
            diagnosis.into(),
            "rest".into(),
            vec![Medicine {
                name: "Amoxicillin".into(),
                dose: Some("500mg".into()),
                frequency: Some("2x/day".into()),
                duration: Some("5d".into()),
                instructions: None,
            }],
            "after meals".into(),
            None,
        )
    }

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("98"), "98%");
        assert_eq!(like_prefix("9_8%"), "9\\_8\\%%");
        assert_eq!(like_prefix("a\\b"), "a\\\\b%");
    }

    #[tokio::test]
    async fn insert_and_fetch_roundtrip() {
        let db = setup_db().await;
        let patient = sample_patient("Asha Rao", "9876543210");
        db.insert_patient(&patient).await.unwrap();

        let fetched = db.fetch_patient(&patient.id).await.unwrap();
        assert_eq!(fetched.name, "Asha Rao");
        assert_eq!(fetched.phone, "9876543210");
        assert_eq!(fetched.dob, patient.dob);
        assert_eq!(fetched.age, patient.age);
        assert!(fetched.prescriptions.is_empty());
    }

    #[tokio::test]
    async fn phone_prefix_search() {
        let db = setup_db().await;
        db.insert_patient(&sample_patient("Asha Rao", "9876543210"))
            .await
            .unwrap();
        db.insert_patient(&sample_patient("Ravi Iyer", "9876000000"))
            .await
            .unwrap();
        db.insert_patient(&sample_patient("Meera Shah", "8000000000"))
            .await
            .unwrap();

        assert_eq!(db.find_by_phone_prefix("9876").await.unwrap().len(), 2);
        assert_eq!(db.find_by_phone_prefix("9876543210").await.unwrap().len(), 1);
        assert!(db.find_by_phone_prefix("7").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn phone_prefix_search_is_case_insensitive() {
        let db = setup_db().await;
        db.insert_patient(&sample_patient("Front Desk", "EXT-4410"))
            .await
            .unwrap();

        let matches = db.find_by_phone_prefix("ext-4").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].phone, "EXT-4410");
    }

    #[tokio::test]
    async fn wildcards_in_prefix_match_literally() {
        let db = setup_db().await;
        db.insert_patient(&sample_patient("Asha Rao", "9876543210"))
            .await
            .unwrap();

        // '%' and '_' must not act as LIKE wildcards.
        assert!(db.find_by_phone_prefix("%").await.unwrap().is_empty());
        assert!(db.find_by_phone_prefix("9_7").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_preserves_insertion_order() {
        let db = setup_db().await;
        let patient = sample_patient("Asha Rao", "9876543210");
        db.insert_patient(&patient).await.unwrap();

        for diagnosis in ["first", "second", "third"] {
            db.append_prescription(&patient.id, &sample_prescription(diagnosis))
                .await
                .unwrap();
        }

        let fetched = db.fetch_patient(&patient.id).await.unwrap();
        let order: Vec<&str> = fetched
            .prescriptions
            .iter()
            .map(|rx| rx.diagnosis.as_str())
            .collect();
        assert_eq!(order, ["first", "second", "third"]);
        assert!(fetched.prescriptions.iter().all(|rx| rx.pdf_path.is_none()));
    }

    #[tokio::test]
    async fn append_to_unknown_patient_is_not_found() {
        let db = setup_db().await;
        let missing = Uuid::new_v4().to_string();
        let err = db
            .append_prescription(&missing, &sample_prescription("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn pdf_location_is_set_at_most_once() {
        let db = setup_db().await;
        let patient = sample_patient("Asha Rao", "9876543210");
        db.insert_patient(&patient).await.unwrap();
        db.append_prescription(&patient.id, &sample_prescription("caries"))
            .await
            .unwrap();

        assert!(db
            .set_pdf_path(&patient.id, 0, "/uploads/prescription_1.pdf")
            .await
            .unwrap());
        assert!(!db
            .set_pdf_path(&patient.id, 0, "/uploads/prescription_2.pdf")
            .await
            .unwrap());

        let fetched = db.fetch_patient(&patient.id).await.unwrap();
        assert_eq!(
            fetched.prescriptions[0].pdf_path.as_deref(),
            Some("/uploads/prescription_1.pdf")
        );
    }

    #[tokio::test]
    async fn pdf_location_out_of_range_is_a_no_op() {
        let db = setup_db().await;
        let patient = sample_patient("Asha Rao", "9876543210");
        db.insert_patient(&patient).await.unwrap();

        assert!(!db
            .set_pdf_path(&patient.id, 0, "/uploads/prescription_1.pdf")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn malformed_and_unknown_ids() {
        let db = setup_db().await;
        assert!(matches!(
            db.fetch_patient("not-a-uuid").await.unwrap_err(),
            StoreError::InvalidId(_)
        ));
        assert!(matches!(
            db.fetch_patient(&Uuid::new_v4().to_string()).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }
}
