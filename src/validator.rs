use crate::aliases::StandardField;
use crate::error::{LedgerError, Result};
use crate::mapper::ColumnMapping;
use crate::models::UploadType;

/// A field that must be mapped, either alone or as one of several alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Field(StandardField),
    AnyOf(&'static [StandardField]),
}

impl Requirement {
    fn describe(&self) -> String {
        match self {
            Self::Field(field) => field.to_string(),
            Self::AnyOf(fields) => {
                let names: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
                format!("one of: {}", names.join(", "))
            }
        }
    }
}

pub fn required_fields(upload_type: UploadType) -> &'static [Requirement] {
    use StandardField::*;
    match upload_type {
        UploadType::Bank => &[Requirement::Field(Date), Requirement::AnyOf(&[Credit, Debit, Amount])],
        UploadType::Sales => &[Requirement::Field(Date), Requirement::AnyOf(&[Amount, Credit])],
        UploadType::Purchase => &[Requirement::Field(Date), Requirement::AnyOf(&[Amount, Debit])],
        UploadType::Inventory | UploadType::Loan => &[],
    }
}

/// Check the mapping against the upload type's requirements.
/// Returns `(ok, missing)`; missing entries are field names or `one of: a, b` groups.
pub fn validate(mapping: &ColumnMapping, upload_type: UploadType) -> (bool, Vec<String>) {
    if upload_type.is_auxiliary() {
        return (true, Vec::new());
    }

    let present = mapping.standard_fields();
    let missing: Vec<String> = required_fields(upload_type)
        .iter()
        .filter(|req| match req {
            Requirement::Field(field) => !present.contains(field),
            Requirement::AnyOf(fields) => !fields.iter().any(|f| present.contains(f)),
        })
        .map(|req| req.describe())
        .collect();

    (missing.is_empty(), missing)
}

/// `validate` as a fatal check for the upload pipeline.
pub fn ensure_valid(mapping: &ColumnMapping, upload_type: UploadType) -> Result<()> {
    let (ok, missing) = validate(mapping, upload_type);
    if ok {
        return Ok(());
    }
    tracing::error!(upload_type = %upload_type, ?missing, "required fields missing");
    Err(LedgerError::MissingRequiredFields {
        upload_type: upload_type.to_string(),
        missing,
    })
}
