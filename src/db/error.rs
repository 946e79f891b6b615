use thiserror::Error;

/// Failures raised by the inventory repos.
///
/// Repos return `anyhow::Result`; callers that need to branch on the kind of
/// failure downcast to this type.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{resource} not found: {key}")]
    NotFound { resource: String, key: String },

    #[error("{resource} lookup matched {count} records: {key}")]
    MultipleMatches {
        resource: String,
        key: String,
        count: usize,
    },

    #[error("{resource} already exists: {key}")]
    Duplicate { resource: String, key: String },

    #[error("{resource} constraint violated: {detail}")]
    Constraint { resource: String, detail: String },
}

impl StoreError {
    pub fn not_found(resource: &str, key: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            key: key.into(),
        }
    }

    pub fn constraint(resource: &str, detail: impl Into<String>) -> Self {
        Self::Constraint {
            resource: resource.to_string(),
            detail: detail.into(),
        }
    }
}

/// Translate a failed INSERT into the store taxonomy.
///
/// Unique violations become `Duplicate`, foreign key and check violations
/// become `Constraint`; anything else passes through untouched.
pub fn classify_insert_error(err: sqlx::Error, resource: &str, key: &str) -> anyhow::Error {
    if let sqlx::Error::Database(db_err) = &err {
        use sqlx::error::ErrorKind;
        match db_err.kind() {
            ErrorKind::UniqueViolation => {
                return StoreError::Duplicate {
                    resource: resource.to_string(),
                    key: key.to_string(),
                }
                .into();
            }
            ErrorKind::ForeignKeyViolation | ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                return StoreError::constraint(resource, format!("{} ({})", key, db_err.message())).into();
            }
            _ => {}
        }
    }
    anyhow::Error::new(err).context(format!("Failed to insert {} {}", resource, key))
}
