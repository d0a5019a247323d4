use async_trait::async_trait;
use tracing::debug;

use rollcall_core::{AttendanceRecord, AttendanceStore, StoreError};

use crate::client::{SheetsApi, SheetsError};

/// `AttendanceStore` backed by the live spreadsheet. Every call reloads
/// sheet metadata before touching rows; the sheet is never cached.
pub struct GoogleSheetsStore<C> {
    client: C,
}

impl<C> GoogleSheetsStore<C>
where
    C: SheetsApi,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> AttendanceStore for GoogleSheetsStore<C>
where
    C: SheetsApi + 'static,
{
    async fn list_records(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sheet = self.client.load_sheet().await.map_err(store_error)?;
        let records = self.client.list_rows(&sheet).await.map_err(store_error)?;
        debug!(sheet = %sheet.title, rows = records.len(), "listed attendance rows");
        Ok(records)
    }

    async fn append_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let sheet = self.client.load_sheet().await.map_err(store_error)?;
        self.client.append_row(&sheet, record).await.map_err(store_error)?;
        debug!(sheet = %sheet.title, email = %record.email, "appended attendance row");
        Ok(())
    }
}

fn store_error(error: SheetsError) -> StoreError {
    match error {
        SheetsError::Decode(detail) => StoreError::Decode(detail),
        other => StoreError::Unavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};

    use rollcall_core::{AttendanceRecord, AttendanceStore, StoreError, WorkLocation};

    use super::GoogleSheetsStore;
    use crate::client::{SheetHandle, SheetsApi, SheetsError};

    #[derive(Default)]
    struct ScriptedSheets {
        load_calls: AtomicUsize,
        rows: std::sync::Mutex<Vec<AttendanceRecord>>,
        fail_load: bool,
    }

    fn handle() -> SheetHandle {
        SheetHandle {
            spreadsheet_id: "spreadsheet-1".to_owned(),
            title: "Sheet1".to_owned(),
            sheet_id: 0,
        }
    }

    #[async_trait]
    impl SheetsApi for ScriptedSheets {
        async fn load_sheet(&self) -> Result<SheetHandle, SheetsError> {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_load {
                return Err(SheetsError::Api("backend down".to_owned()));
            }
            Ok(handle())
        }

        async fn list_rows(
            &self,
            _sheet: &SheetHandle,
        ) -> Result<Vec<AttendanceRecord>, SheetsError> {
            Ok(self.rows.lock().expect("rows lock").clone())
        }

        async fn append_row(
            &self,
            _sheet: &SheetHandle,
            record: &AttendanceRecord,
        ) -> Result<(), SheetsError> {
            self.rows.lock().expect("rows lock").push(record.clone());
            Ok(())
        }
    }

    fn record() -> AttendanceRecord {
        AttendanceRecord {
            name: "Jess Doe".to_owned(),
            email: "jess@example.com".to_owned(),
            location: WorkLocation::WorkFromOffice,
            date: NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date"),
            time: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
        }
    }

    #[tokio::test]
    async fn every_operation_reloads_sheet_metadata() {
        let store = GoogleSheetsStore::new(ScriptedSheets::default());

        store.list_records().await.expect("list");
        store.append_record(&record()).await.expect("append");
        store.list_records().await.expect("list again");

        assert_eq!(store.client.load_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn append_then_list_round_trips_the_record() {
        let store = GoogleSheetsStore::new(ScriptedSheets::default());

        store.append_record(&record()).await.expect("append");
        let rows = store.list_records().await.expect("list");

        assert_eq!(rows, vec![record()]);
    }

    #[tokio::test]
    async fn backend_failure_maps_to_unavailable() {
        let store =
            GoogleSheetsStore::new(ScriptedSheets { fail_load: true, ..ScriptedSheets::default() });

        let error = store.list_records().await.err().expect("expected failure");
        assert!(matches!(error, StoreError::Unavailable(_)));
    }
}
