use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Sheet date format inherited from the rows the previous bot wrote,
/// e.g. `Fri Aug 07 2026`. New rows must stay comparable with old ones.
pub const SHEET_DATE_FORMAT: &str = "%a %b %d %Y";

/// Sheet time format, e.g. `09:41:07 AM`.
pub const SHEET_TIME_FORMAT: &str = "%I:%M:%S %p";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkLocation {
    WorkFromHome,
    WorkFromOffice,
    ClientLocation,
}

impl WorkLocation {
    pub const ALL: [WorkLocation; 3] =
        [Self::WorkFromHome, Self::WorkFromOffice, Self::ClientLocation];

    /// Human-facing label, also used as the block action value. The casing
    /// is uneven (`Work from Office`) because the sheet already contains
    /// rows with these exact strings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::WorkFromHome => "Work From Home",
            Self::WorkFromOffice => "Work from Office",
            Self::ClientLocation => "Client Location",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|location| location.label() == label.trim())
    }
}

impl std::fmt::Display for WorkLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Read-only profile attributes resolved from the chat platform, fetched
/// fresh per interaction and never cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

/// One attendance row: a single user's sign-in for one calendar day.
/// Append-only; at most one record exists per (email, date) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub name: String,
    pub email: String,
    pub location: WorkLocation,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl AttendanceRecord {
    /// Builds a record stamped with the local date and time.
    pub fn for_today(profile: &UserProfile, location: WorkLocation) -> Self {
        let now = Local::now();
        Self {
            name: profile.display_name.clone(),
            email: profile.email.clone(),
            location,
            date: now.date_naive(),
            time: now.time(),
        }
    }

    /// Serializes into the sheet column order `Name,Email,Location,Date,Time`.
    pub fn to_sheet_row(&self) -> [String; 5] {
        [
            self.name.clone(),
            self.email.clone(),
            self.location.label().to_owned(),
            self.date.format(SHEET_DATE_FORMAT).to_string(),
            self.time.format(SHEET_TIME_FORMAT).to_string(),
        ]
    }

    /// Parses one sheet row; returns `None` for malformed rows so callers
    /// can skip them without failing the whole listing.
    pub fn from_sheet_row(cells: &[String]) -> Option<Self> {
        let name = cells.first()?.clone();
        let email = cells.get(1)?.clone();
        let location = WorkLocation::from_label(cells.get(2)?)?;
        let date = NaiveDate::parse_from_str(cells.get(3)?.trim(), SHEET_DATE_FORMAT).ok()?;
        let time = NaiveTime::parse_from_str(cells.get(4)?.trim(), SHEET_TIME_FORMAT).ok()?;
        Some(Self { name, email, location, date, time })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{AttendanceRecord, UserProfile, WorkLocation};

    #[test]
    fn location_labels_match_the_sheet_vocabulary() {
        assert_eq!(WorkLocation::WorkFromHome.label(), "Work From Home");
        assert_eq!(WorkLocation::WorkFromOffice.label(), "Work from Office");
        assert_eq!(WorkLocation::ClientLocation.label(), "Client Location");
    }

    #[test]
    fn location_parses_from_exact_label() {
        assert_eq!(WorkLocation::from_label("Client Location"), Some(WorkLocation::ClientLocation));
        assert_eq!(WorkLocation::from_label(" Work from Office "), Some(WorkLocation::WorkFromOffice));
        assert_eq!(WorkLocation::from_label("work from home"), None);
    }

    #[test]
    fn sheet_row_round_trips_with_legacy_formats() {
        let record = AttendanceRecord {
            name: "Jess Doe".to_owned(),
            email: "jess@example.com".to_owned(),
            location: WorkLocation::ClientLocation,
            date: NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date"),
            time: NaiveTime::from_hms_opt(9, 41, 7).expect("valid time"),
        };

        let row = record.to_sheet_row();
        assert_eq!(row[3], "Fri Aug 07 2026");
        assert_eq!(row[4], "09:41:07 AM");

        let parsed = AttendanceRecord::from_sheet_row(&row).expect("row should parse back");
        assert_eq!(parsed, record);
    }

    #[test]
    fn malformed_rows_are_rejected_not_panicked_on() {
        let row = ["Jess".to_owned(), "jess@example.com".to_owned(), "Desk".to_owned()];
        assert!(AttendanceRecord::from_sheet_row(&row).is_none());

        let row: [String; 0] = [];
        assert!(AttendanceRecord::from_sheet_row(&row).is_none());
    }

    #[test]
    fn for_today_copies_profile_identity() {
        let profile = UserProfile {
            id: "U123".to_owned(),
            display_name: "Jess Doe".to_owned(),
            email: "jess@example.com".to_owned(),
        };
        let record = AttendanceRecord::for_today(&profile, WorkLocation::WorkFromHome);
        assert_eq!(record.name, "Jess Doe");
        assert_eq!(record.email, "jess@example.com");
        assert_eq!(record.location, WorkLocation::WorkFromHome);
    }
}
