//! Prescription PDF rendering.
//!
//! Fixed single-page A4 layout via `printpdf` builtin fonts. Rendering
//! produces the document bytes; file placement belongs to the caller.

use printpdf::*;
use std::io::BufWriter;

use crate::models::{Patient, Prescription};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("pdf font error: {0}")]
    Font(String),

    #[error("pdf save error: {0}")]
    Save(String),
}

const PAGE_WIDTH_MM: f64 = 210.0;
const PT_TO_MM: f64 = 0.352_778;

// Helvetica carries no width table here; half the point size is close
// enough to center a short heading.
fn centered_x(text: &str, font_size: f64) -> Mm {
    let width = text.chars().count() as f64 * font_size * 0.5 * PT_TO_MM;
    Mm(((PAGE_WIDTH_MM - width) / 2.0).max(0.0) as f32)
}

fn blank(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("")
}

/// Render the fixed prescription layout: clinic heading, patient block,
/// date, diagnosis/treatment, numbered medicines and notes.
pub fn render_prescription(
    clinic_name: &str,
    patient: &Patient,
    prescription: &Prescription,
) -> Result<Vec<u8>, RenderError> {
    let (doc, page1, layer1) = PdfDocument::new("Prescription", Mm(210.0), Mm(297.0), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Font(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Font(e.to_string()))?;

    let mut y = Mm(280.0);

    layer.use_text(clinic_name, 18.0, centered_x(clinic_name, 18.0), y, &bold);
    y -= Mm(12.0);

    layer.use_text(format!("Patient: {}", patient.name), 14.0, Mm(20.0), y, &font);
    y -= Mm(7.0);
    layer.use_text(format!("Age: {}", patient.age), 14.0, Mm(20.0), y, &font);
    y -= Mm(7.0);
    layer.use_text(format!("Gender: {}", patient.gender), 14.0, Mm(20.0), y, &font);
    y -= Mm(7.0);
    layer.use_text(format!("Address: {}", patient.address), 14.0, Mm(20.0), y, &font);
    y -= Mm(7.0);
    layer.use_text(
        format!("Date: {}", prescription.date.format("%d/%m/%Y")),
        14.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(12.0);

    layer.use_text(
        format!("Diagnosis: {}", prescription.diagnosis),
        12.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(6.0);
    layer.use_text(
        format!("Treatment: {}", prescription.treatment),
        12.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(10.0);

    layer.use_text("Medicines List:", 12.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    for (i, m) in prescription.medicines.iter().enumerate() {
        let line = format!(
            "{}. {} - {} - {} - {} - {}",
            i + 1,
            m.name,
            blank(&m.dose),
            blank(&m.frequency),
            blank(&m.duration),
            blank(&m.instructions),
        );
        layer.use_text(line.as_str(), 12.0, Mm(20.0), y, &font);
        y -= Mm(6.0);
    }
    y -= Mm(6.0);

    layer.use_text(format!("Notes: {}", prescription.notes), 12.0, Mm(20.0), y, &font);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| RenderError::Save(e.to_string()))?;
    buf.into_inner()
        .map_err(|e| RenderError::Save(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Medicine;
    use chrono::NaiveDate;

    fn sample_patient() -> Patient {
        Patient::new(
            "Asha Rao".into(),
            "9876543210".into(),
            NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
            "12 Main St".into(),
            "F".into(),
            "none".into(),
        )
    }

    #[test]
    fn renders_pdf_bytes() {
        let rx = Prescription::new(
            "caries".into(),
            "filling".into(),
            vec![Medicine {
                name: "Amoxicillin".into(),
                dose: Some("500mg".into()),
                frequency: Some("2x/day".into()),
                duration: Some("5d".into()),
                instructions: Some("after meals".into()),
            }],
            "review in a week".into(),
            None,
        );

        let bytes = render_prescription("SHIV DENTAL CLINIC", &sample_patient(), &rx).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_with_zero_medicines() {
        let rx = Prescription::new("checkup".into(), "none".into(), vec![], "".into(), None);
        let bytes = render_prescription("SHIV DENTAL CLINIC", &sample_patient(), &rx).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(!bytes.is_empty());
    }

    #[test]
    fn heading_centering_never_goes_negative() {
        let very_long = "X".repeat(400);
        assert!(centered_x(&very_long, 18.0).0 >= 0.0);
    }
}
