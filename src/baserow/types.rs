use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column names of the member table, as exposed with `user_field_names=true`
pub mod columns {
    pub const ID: &str = "id";
    pub const LEGACY_ID: &str = "Id";
    pub const SURNAME: &str = "Surname";
    pub const FIRST_NAME: &str = "First name";
    pub const EMAIL: &str = "E-mail";
    pub const ALTERNATIVE_EMAIL_1: &str = "Alternative E-mail 1";
    pub const ALTERNATIVE_EMAIL_2: &str = "Alternative E-mail 2";
    pub const ACTIVE_MEMBERSHIP: &str = "Active MemberShip";
    pub const LAST_PAYMENT_DATE: &str = "Last Payment Date";
    pub const LAST_REMINDER_DATE: &str = "Last Contribution Email Date";
    pub const REMINDER_COUNT: &str = "Number of Contributions Email";
    pub const MEMBERSHIP_TYPE: &str = "Membership type";
    pub const PREFERRED_LANGUAGES: &str = "Preferred languages";
    pub const COUNTRY: &str = "Country";
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MemberRecord {
    pub id: u64,
    pub surname: String,
    pub first_name: String,
    pub email: String,
    pub alternative_email_1: String,
    pub alternative_email_2: String,
    pub active_membership: bool,
    pub last_payment_date: Option<NaiveDate>,
    pub last_reminder_date: Option<NaiveDate>,
    pub reminder_count: u32,
    pub membership_type: i64,
    pub preferred_languages: Vec<i64>,
    pub country: String,
}

impl MemberRecord {
    /// Decode one row. Missing or mistyped columns fall back to empty values.
    pub fn from_row(row: &Map<String, Value>) -> Self {
        let id = row
            .get(columns::ID)
            .and_then(Value::as_u64)
            .or_else(|| row.get(columns::LEGACY_ID).and_then(Value::as_u64))
            .unwrap_or_default();

        Self {
            id,
            surname: string_value(row, columns::SURNAME),
            first_name: string_value(row, columns::FIRST_NAME),
            email: string_value(row, columns::EMAIL),
            alternative_email_1: string_value(row, columns::ALTERNATIVE_EMAIL_1),
            alternative_email_2: string_value(row, columns::ALTERNATIVE_EMAIL_2),
            active_membership: row
                .get(columns::ACTIVE_MEMBERSHIP)
                .and_then(Value::as_bool)
                .unwrap_or_default(),
            last_payment_date: date_value(row, columns::LAST_PAYMENT_DATE),
            last_reminder_date: date_value(row, columns::LAST_REMINDER_DATE),
            reminder_count: row
                .get(columns::REMINDER_COUNT)
                .and_then(number_value)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or_default(),
            membership_type: select_id(row, columns::MEMBERSHIP_TYPE).unwrap_or_default(),
            preferred_languages: multi_select_ids(row, columns::PREFERRED_LANGUAGES),
            country: country_value(row),
        }
    }

    /// Primary address followed by the alternates, skipping empty ones
    pub fn emails(&self) -> impl Iterator<Item = &str> {
        [
            self.email.as_str(),
            self.alternative_email_1.as_str(),
            self.alternative_email_2.as_str(),
        ]
        .into_iter()
        .filter(|email| !email.is_empty())
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.emails().any(|own| own == email)
    }

    pub fn to_update(&self) -> MemberUpdate {
        MemberUpdate {
            active_membership: self.active_membership,
            last_payment_date: self.last_payment_date.map(|d| d.format(DATE_FORMAT).to_string()),
            last_reminder_date: self.last_reminder_date.map(|d| d.format(DATE_FORMAT).to_string()),
            reminder_count: self.reminder_count,
        }
    }
}

/// Body of the partial row update written back after reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberUpdate {
    #[serde(rename = "Active MemberShip")]
    pub active_membership: bool,
    #[serde(rename = "Last Payment Date")]
    pub last_payment_date: Option<String>,
    #[serde(rename = "Last Contribution Email Date")]
    pub last_reminder_date: Option<String>,
    #[serde(rename = "Number of Contributions Email")]
    pub reminder_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct RowPage {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<Map<String, Value>>,
}

fn string_value(row: &Map<String, Value>, key: &str) -> String {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn number_value(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn date_value(row: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    row.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
}

fn select_id(row: &Map<String, Value>, key: &str) -> Option<i64> {
    row.get(key)?.as_object()?.get("id").and_then(number_value)
}

fn multi_select_ids(row: &Map<String, Value>, key: &str) -> Vec<i64> {
    row.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object()?.get("id").and_then(number_value))
                .collect()
        })
        .unwrap_or_default()
}

fn country_value(row: &Map<String, Value>) -> String {
    match row.get(columns::COUNTRY) {
        Some(Value::String(country)) => country.clone(),
        Some(Value::Object(select)) => select
            .get("value")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default(),
        _ => String::new(),
    }
}
