use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::AttendanceRecord;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("spreadsheet backend unavailable: {0}")]
    Unavailable(String),
    #[error("spreadsheet response could not be decoded: {0}")]
    Decode(String),
}

/// Outcome of a sign-in attempt. A duplicate is a normal branch of the
/// workflow, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignInOutcome {
    Recorded(AttendanceRecord),
    AlreadySignedIn,
}

/// Row-oriented attendance backend. Implementations reload the remote
/// sheet on every call; nothing is cached between interactions.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn list_records(&self) -> Result<Vec<AttendanceRecord>, StoreError>;
    async fn append_record(&self, record: &AttendanceRecord) -> Result<(), StoreError>;
}

/// Appends `record` unless a row with the same (email, date) already
/// exists. The duplicate check is a linear scan over all rows, matching
/// the scale the sheet operates at.
pub async fn record_sign_in(
    store: &dyn AttendanceStore,
    record: AttendanceRecord,
) -> Result<SignInOutcome, StoreError> {
    let existing = store.list_records().await?;
    if has_record_for(&existing, &record.email, record.date) {
        return Ok(SignInOutcome::AlreadySignedIn);
    }

    store.append_record(&record).await?;
    Ok(SignInOutcome::Recorded(record))
}

fn has_record_for(records: &[AttendanceRecord], email: &str, date: NaiveDate) -> bool {
    records.iter().any(|row| row.email == email && row.date == date)
}
