use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// One payment as seen by the reconciliation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub order_form_slug: String,
    pub order_date: DateTime<FixedOffset>,
    pub payer_email: String,
    pub payer_first_name: String,
    pub payer_last_name: String,
}

impl PaymentRecord {
    /// Calendar day of the order, in the offset the API reported it with.
    pub fn order_day(&self) -> NaiveDate {
        self.order_date.date_naive()
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct PaymentPage {
    #[serde(default)]
    pub data: Vec<PaymentItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentItem {
    pub order: Order,
    pub payer: Payer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub date: DateTime<FixedOffset>,
    #[serde(default)]
    pub form_slug: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payer {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl From<PaymentItem> for PaymentRecord {
    fn from(item: PaymentItem) -> Self {
        Self {
            order_form_slug: item.order.form_slug,
            order_date: item.order.date,
            payer_email: item.payer.email,
            payer_first_name: item.payer.first_name,
            payer_last_name: item.payer.last_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payment_page() {
        let body = r#"{
            "data": [{
                "order": {"id": 7, "date": "2024-03-01T23:30:00+01:00", "formSlug": "cotisation-annuelle", "formType": "Membership"},
                "payer": {"email": "ada@example.org", "country": "FRA", "firstName": "ADA", "lastName": "Lovelace"},
                "items": [{"id": 1, "amount": 2000, "type": "Membership", "state": "Processed"}],
                "id": 99,
                "amount": 2000,
                "date": "2024-03-01T23:30:00+01:00",
                "state": "Authorized"
            }],
            "pagination": {"pageSize": 100, "totalCount": 1, "pageIndex": 1, "totalPages": 1, "continuationToken": "abc"}
        }"#;

        let page: PaymentPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.len(), 1);

        let record = PaymentRecord::from(page.data.into_iter().next().unwrap());
        assert_eq!(record.order_form_slug, "cotisation-annuelle");
        assert_eq!(record.payer_email, "ada@example.org");
        assert_eq!(record.payer_first_name, "ADA");
        // the day is taken in the offset the order was recorded in
        assert_eq!(record.order_day(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_decode_empty_page() {
        let page: PaymentPage = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(page.data.is_empty());
    }
}
