//! The stored receipt log: what was issued, searchable and exportable.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::ReceiptDetails;
use crate::storage::KeyValueStore;

pub const RECEIPTS_KEY: &str = "TKR_RECEIPTS_DATABASE";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Active,
    Archived,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Services {
    pub electricity: bool,
    pub chairs: bool,
    pub table: bool,
}

impl Services {
    fn enabled(&self) -> Vec<&'static str> {
        [
            ("electricity", self.electricity),
            ("chairs", self.chairs),
            ("table", self.table),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advertisements {
    pub zones: Vec<String>,
    pub total_quantity: String,
    pub car_flags: String,
    pub banner_flags: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReceipt {
    pub id: String,
    pub receipt_number: String,
    pub date: String,
    pub received_from: String,
    pub amount: String,
    pub tent_number: String,
    pub usage_purpose: String,
    pub description: String,
    pub notes: String,
    pub receiver_name: String,
    pub payer_name: String,
    pub services: Services,
    pub advertisements: Advertisements,
    pub created_at: DateTime<Utc>,
    pub status: ReceiptStatus,
}

impl StoredReceipt {
    /// Snapshot of a generated receipt.
    pub fn from_details(details: &ReceiptDetails, now: DateTime<Utc>) -> Self {
        let or_na = |v: &str| if v.is_empty() { "N/A".to_string() } else { v.to_string() };
        let date = match details.date() {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None if details.receipt_date.is_empty() => now.format("%Y-%m-%d").to_string(),
            None => details.receipt_date.clone(),
        };
        StoredReceipt {
            id: new_id(now),
            receipt_number: or_na(&details.receipt_number),
            date,
            received_from: details.received_from_name.clone(),
            amount: details.amount.clone(),
            tent_number: details.tent_number.clone(),
            usage_purpose: details.usage_purpose.clone(),
            description: details.description.clone(),
            notes: details.notes.clone(),
            receiver_name: details.receiver_name.clone(),
            payer_name: details.payer_name.clone(),
            services: Services {
                electricity: details.electricity_available,
                chairs: details.chairs_available,
                table: details.table_available,
            },
            advertisements: Advertisements {
                zones: details
                    .ad_zones()
                    .iter()
                    .filter(|(_, on)| *on)
                    .map(|(letter, _)| format!("Zone {letter}"))
                    .collect(),
                total_quantity: details.ads_total_quantity.clone(),
                car_flags: details.car_flags_count.clone(),
                banner_flags: details.banner_flags_count.clone(),
            },
            created_at: now,
            status: ReceiptStatus::Active,
        }
    }

    /// Numeric value of the free-text amount (`"$1,250.50"` → 1250.5).
    pub fn amount_value(&self) -> f64 {
        parse_amount(&self.amount)
    }

    fn matches(&self, needle: &str) -> bool {
        [
            &self.receipt_number,
            &self.received_from,
            &self.amount,
            &self.tent_number,
            &self.usage_purpose,
            &self.description,
            &self.notes,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// `receipt_<millis>_<9 random chars>`
fn new_id(now: DateTime<Utc>) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("receipt_{}_{}", now.timestamp_millis(), &random[..9])
}

/// Keep digits, '.' and '-', then read the longest leading number.
fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    (1..=cleaned.len())
        .rev()
        .find_map(|end| cleaned[..end].parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Date,
    Amount,
    ReceiptNumber,
    ReceivedFrom,
    TentNumber,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

pub fn sort_receipts(receipts: &mut [StoredReceipt], field: SortField, direction: SortDirection) {
    receipts.sort_by(|a, b| {
        let ord = match field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Date => a.date.cmp(&b.date),
            SortField::Amount => a.amount_value().total_cmp(&b.amount_value()),
            SortField::ReceiptNumber => a.receipt_number.to_lowercase().cmp(&b.receipt_number.to_lowercase()),
            SortField::ReceivedFrom => a.received_from.to_lowercase().cmp(&b.received_from.to_lowercase()),
            SortField::TentNumber => a.tent_number.to_lowercase().cmp(&b.tent_number.to_lowercase()),
        };
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptStats {
    pub total_receipts: usize,
    pub total_amount: f64,
    pub this_month_receipts: usize,
    pub unique_tents: usize,
    pub average_amount: f64,
}

const CSV_HEADERS: [&str; 16] = [
    "Receipt Number",
    "Date",
    "Received From",
    "Amount",
    "Tent Number",
    "Usage Purpose",
    "Description",
    "Services",
    "Ad Zones",
    "Total Ads",
    "Car Flags",
    "Banner Flags",
    "Notes",
    "Receiver",
    "Issuer",
    "Created At",
];

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

pub struct ReceiptDatabase<'s> {
    store: &'s dyn KeyValueStore,
}

impl<'s> ReceiptDatabase<'s> {
    pub fn new(store: &'s dyn KeyValueStore) -> Self {
        ReceiptDatabase { store }
    }

    fn load(&self) -> Vec<StoredReceipt> {
        let Some(raw) = self.store.get(RECEIPTS_KEY) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Error loading receipts from storage: {e}");
            Vec::new()
        })
    }

    fn persist(&self, receipts: &[StoredReceipt]) -> Result<()> {
        let json = serde_json::to_string(receipts)?;
        self.store.set(RECEIPTS_KEY, &json)
    }

    /// Store a snapshot of `details`, newest first. Returns the new id.
    pub fn save(&self, details: &ReceiptDetails) -> Result<String> {
        let mut receipts = self.load();
        let record = StoredReceipt::from_details(details, Utc::now());
        let id = record.id.clone();
        receipts.insert(0, record);
        self.persist(&receipts)?;
        log::info!("Stored receipt {} ({id})", details.receipt_number);
        Ok(id)
    }

    /// All receipts, newest first by creation time.
    pub fn list(&self) -> Vec<StoredReceipt> {
        let mut receipts = self.load();
        sort_receipts(&mut receipts, SortField::CreatedAt, SortDirection::Descending);
        receipts
    }

    pub fn get(&self, id: &str) -> Option<StoredReceipt> {
        self.load().into_iter().find(|r| r.id == id)
    }

    /// Returns false when no receipt has `id`.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let receipts = self.load();
        let before = receipts.len();
        let kept: Vec<StoredReceipt> = receipts.into_iter().filter(|r| r.id != id).collect();
        if kept.len() == before {
            return Ok(false);
        }
        self.persist(&kept)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        self.persist(&[])
    }

    /// Case-insensitive substring match over the free-text fields.
    pub fn search(&self, term: &str) -> Vec<StoredReceipt> {
        let needle = term.to_lowercase();
        self.list().into_iter().filter(|r| r.matches(&needle)).collect()
    }

    pub fn stats(&self) -> ReceiptStats {
        self.stats_at(Local::now().date_naive())
    }

    pub fn stats_at(&self, today: NaiveDate) -> ReceiptStats {
        let receipts = self.load();
        let total_receipts = receipts.len();
        let total_amount: f64 = receipts.iter().map(StoredReceipt::amount_value).sum();
        let month_start = today.with_day(1).unwrap_or(today);
        let this_month_receipts = receipts
            .iter()
            .filter_map(|r| NaiveDate::parse_from_str(&r.date, "%Y-%m-%d").ok())
            .filter(|d| *d >= month_start)
            .count();
        let unique_tents = receipts
            .iter()
            .filter(|r| !r.tent_number.is_empty())
            .map(|r| r.tent_number.as_str())
            .collect::<HashSet<_>>()
            .len();
        ReceiptStats {
            total_receipts,
            total_amount,
            this_month_receipts,
            unique_tents,
            average_amount: if total_receipts > 0 {
                total_amount / total_receipts as f64
            } else {
                0.0
            },
        }
    }

    /// CSV of every stored receipt in storage order.
    pub fn export_csv(&self) -> String {
        let mut lines = vec![CSV_HEADERS.join(",")];
        for r in self.load() {
            let fields = [
                r.receipt_number.clone(),
                r.date.clone(),
                quoted(&r.received_from),
                quoted(&r.amount),
                quoted(&r.tent_number),
                quoted(&r.usage_purpose),
                quoted(&r.description),
                quoted(&r.services.enabled().join(", ")),
                quoted(&r.advertisements.zones.join(", ")),
                quoted(&r.advertisements.total_quantity),
                quoted(&r.advertisements.car_flags),
                quoted(&r.advertisements.banner_flags),
                quoted(&r.notes),
                quoted(&r.receiver_name),
                quoted(&r.payer_name),
                r.created_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ];
            lines.push(fields.join(","));
        }
        lines.join("\n")
    }
}

pub fn export_file_name(today: NaiveDate) -> String {
    format!("receipts-export-{}.csv", today.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn amount_parsing_is_lenient() {
        assert_eq!(parse_amount("$1,250.50"), 1250.5);
        assert_eq!(parse_amount("100 USD"), 100.0);
        assert_eq!(parse_amount("free"), 0.0);
        assert_eq!(parse_amount("12.5.3"), 12.5);
    }

    #[test]
    fn ids_have_expected_shape() {
        let id = new_id(Utc::now());
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "receipt");
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn corrupt_log_reads_as_empty() {
        let store = MemoryStore::new();
        store.set(RECEIPTS_KEY, "not json").unwrap();
        assert!(ReceiptDatabase::new(&store).list().is_empty());
    }

    #[test]
    fn stored_date_falls_back_to_parts_then_today() {
        let now = Utc::now();
        let parts = ReceiptDetails {
            receipt_date: String::new(),
            day: "09".into(),
            month: "07".into(),
            year: "2025".into(),
            ..ReceiptDetails::default()
        };
        assert_eq!(StoredReceipt::from_details(&parts, now).date, "2025-07-09");

        let blank = ReceiptDetails {
            receipt_date: String::new(),
            day: String::new(),
            ..ReceiptDetails::default()
        };
        let today = now.format("%Y-%m-%d").to_string();
        assert_eq!(StoredReceipt::from_details(&blank, now).date, today);
    }

    #[test]
    fn export_name_uses_date() {
        let d = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(export_file_name(d), "receipts-export-2025-06-01.csv");
    }
}
