//! Tent layout and booking views over the built-in sample data.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TentStatus {
    Available,
    Reserved,
    Occupied,
}

impl TentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TentStatus::Available => "available",
            TentStatus::Reserved => "reserved",
            TentStatus::Occupied => "occupied",
        }
    }
}

impl fmt::Display for TentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "available" => Ok(TentStatus::Available),
            "reserved" => Ok(TentStatus::Reserved),
            "occupied" => Ok(TentStatus::Occupied),
            other => Err(Error::InvalidInput(format!("unknown tent status {other:?}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tent {
    pub id: String,
    pub status: TentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<u32>,
    pub position: Position,
}

/// Per-side booking rule: tents up to `occupied_to` are occupied for
/// `occupied_hours`, up to `reserved_to` reserved for `reserved_hours`.
struct SideRule {
    occupied_to: u32,
    occupied_hours: u32,
    reserved_to: u32,
    reserved_hours: u32,
    /// Subtracted from the tent number to get the contact suffix.
    contact_base: u32,
}

fn side_tent(n: u32, rule: &SideRule, position: Position) -> Tent {
    let suffix = n - rule.contact_base;
    let (status, booked_by, hours) = if n <= rule.occupied_to {
        (TentStatus::Occupied, Some(format!("055123456{suffix}")), Some(rule.occupied_hours))
    } else if n <= rule.reserved_to {
        (TentStatus::Reserved, Some(format!("050987654{suffix}")), Some(rule.reserved_hours))
    } else {
        (TentStatus::Available, None, None)
    };
    Tent {
        id: format!("T{n}"),
        status,
        booked_by,
        hours,
        position,
    }
}

/// The 48 tents around the track, top row first then clockwise.
pub fn sample_tents() -> Vec<Tent> {
    let mut tents = Vec::with_capacity(48);
    let top = SideRule { occupied_to: 2, occupied_hours: 4, reserved_to: 4, reserved_hours: 2, contact_base: 0 };
    for n in 1..=8 {
        tents.push(side_tent(n, &top, Position { row: 0, col: n - 1 }));
    }
    let right = SideRule { occupied_to: 11, occupied_hours: 3, reserved_to: 13, reserved_hours: 1, contact_base: 8 };
    for n in 9..=16 {
        tents.push(side_tent(n, &right, Position { row: n - 8, col: 8 }));
    }
    let bottom = SideRule { occupied_to: 0, occupied_hours: 0, reserved_to: 19, reserved_hours: 2, contact_base: 16 };
    for n in 17..=24 {
        tents.push(side_tent(n, &bottom, Position { row: 8, col: 24 - n }));
    }
    let left = SideRule { occupied_to: 28, occupied_hours: 4, reserved_to: 32, reserved_hours: 3, contact_base: 24 };
    for n in 25..=40 {
        tents.push(side_tent(n, &left, Position { row: n - 24, col: 0 }));
    }
    let lower = SideRule { occupied_to: 0, occupied_hours: 0, reserved_to: 43, reserved_hours: 1, contact_base: 40 };
    for n in 41..=48 {
        tents.push(side_tent(n, &lower, Position { row: 9, col: n - 41 }));
    }
    tents
}

pub fn filter_tents(tents: &[Tent], status: Option<TentStatus>) -> Vec<&Tent> {
    tents
        .iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TentCounts {
    pub available: usize,
    pub reserved: usize,
    pub occupied: usize,
    pub total: usize,
}

pub fn tent_counts(tents: &[Tent]) -> TentCounts {
    tents.iter().fold(TentCounts::default(), |mut c, t| {
        match t.status {
            TentStatus::Available => c.available += 1,
            TentStatus::Reserved => c.reserved += 1,
            TentStatus::Occupied => c.occupied += 1,
        }
        c.total += 1;
        c
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Reserved,
    Occupied,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BookingStatus::Reserved => "reserved",
            BookingStatus::Occupied => "occupied",
        })
    }
}

impl FromStr for BookingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reserved" => Ok(BookingStatus::Reserved),
            "occupied" => Ok(BookingStatus::Occupied),
            other => Err(Error::InvalidInput(format!("unknown booking status {other:?}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_id: String,
    pub tent_id: String,
    pub contact: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Hours.
    pub duration: u32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

const CONTACTS: [&str; 8] = [
    "0551234567", "0509876543", "0561234567", "0521234567",
    "0581234567", "0591234567", "0501234567", "0511234567",
];

pub const BOOKINGS_PER_PAGE: usize = 10;

/// 25 bookings spread over a month around `today`, newest date first. The
/// values are derived from the booking number so repeated runs agree.
pub fn sample_bookings(today: NaiveDate) -> Vec<Booking> {
    let mut bookings: Vec<Booking> = (1..=25u32)
        .map(|i| {
            let day_offset = (i as i64 * 7) % 30 - 15;
            let date = today + Duration::days(day_offset);
            let created_hours = ((i * 37) % (7 * 24)) as i64;
            let created_at = date
                .and_hms_opt(12, 0, 0)
                .map(|dt| dt.and_utc() - Duration::hours(created_hours))
                .unwrap_or_default();
            Booking {
                booking_id: format!("BKG-{i:03}"),
                tent_id: format!("T{i}"),
                contact: CONTACTS[(i as usize * 3) % CONTACTS.len()].to_string(),
                date: date.format("%Y-%m-%d").to_string(),
                duration: (i * 5) % 8 + 1,
                status: if i % 3 == 0 || i % 5 == 0 {
                    BookingStatus::Occupied
                } else {
                    BookingStatus::Reserved
                },
                created_at,
                notes: (i % 4 == 0).then(|| "Special requirements noted".to_string()),
            }
        })
        .collect();
    bookings.sort_by(|a, b| b.date.cmp(&a.date));
    bookings
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingSortField {
    BookingId,
    TentId,
    Contact,
    Date,
    Duration,
    Status,
    CreatedAt,
}

impl FromStr for BookingSortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "bookingId" | "booking-id" | "id" => BookingSortField::BookingId,
            "tentId" | "tent-id" | "tent" => BookingSortField::TentId,
            "contact" => BookingSortField::Contact,
            "date" => BookingSortField::Date,
            "duration" => BookingSortField::Duration,
            "status" => BookingSortField::Status,
            "createdAt" | "created-at" | "created" => BookingSortField::CreatedAt,
            other => return Err(Error::InvalidInput(format!("unknown sort field {other:?}"))),
        })
    }
}

#[derive(Clone, Debug)]
pub struct BookingQuery {
    pub search: String,
    pub status: Option<BookingStatus>,
    pub sort: BookingSortField,
    pub descending: bool,
    /// 1-based.
    pub page: usize,
}

impl Default for BookingQuery {
    fn default() -> Self {
        BookingQuery {
            search: String::new(),
            status: None,
            sort: BookingSortField::Date,
            descending: true,
            page: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BookingPage {
    pub rows: Vec<Booking>,
    /// Matches before pagination.
    pub matched: usize,
    pub page: usize,
    pub total_pages: usize,
}

/// Search, filter, sort and paginate. Out-of-range pages are clamped.
pub fn query_bookings(bookings: &[Booking], query: &BookingQuery) -> BookingPage {
    let needle = query.search.to_lowercase();
    let mut matched: Vec<Booking> = bookings
        .iter()
        .filter(|b| {
            needle.is_empty()
                || b.contact.to_lowercase().contains(&needle)
                || b.tent_id.to_lowercase().contains(&needle)
                || b.booking_id.to_lowercase().contains(&needle)
        })
        .filter(|b| query.status.is_none_or(|s| b.status == s))
        .cloned()
        .collect();

    matched.sort_by(|a, b| {
        let ord = match query.sort {
            BookingSortField::BookingId => a.booking_id.cmp(&b.booking_id),
            BookingSortField::TentId => a.tent_id.cmp(&b.tent_id),
            BookingSortField::Contact => a.contact.cmp(&b.contact),
            BookingSortField::Date => a.date.cmp(&b.date),
            BookingSortField::Duration => a.duration.cmp(&b.duration),
            BookingSortField::Status => a.status.to_string().cmp(&b.status.to_string()),
            BookingSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        if query.descending { ord.reverse() } else { ord }
    });

    let total = matched.len();
    let total_pages = total.div_ceil(BOOKINGS_PER_PAGE);
    let page = query.page.clamp(1, total_pages.max(1));
    let rows = matched
        .into_iter()
        .skip((page - 1) * BOOKINGS_PER_PAGE)
        .take(BOOKINGS_PER_PAGE)
        .collect();
    BookingPage {
        rows,
        matched: total,
        page,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tent_layout_counts() {
        let tents = sample_tents();
        assert_eq!(tents.len(), 48);
        let counts = tent_counts(&tents);
        // 2 + 3 + 4 occupied; 2 + 2 + 3 + 4 + 3 reserved
        assert_eq!(counts.occupied, 9);
        assert_eq!(counts.reserved, 14);
        assert_eq!(counts.available, 25);
    }

    #[test]
    fn tent_positions_follow_sides() {
        let tents = sample_tents();
        let t = |id: &str| tents.iter().find(|t| t.id == id).unwrap();
        assert_eq!(t("T1").position, Position { row: 0, col: 0 });
        assert_eq!(t("T9").position, Position { row: 1, col: 8 });
        assert_eq!(t("T17").position, Position { row: 8, col: 7 });
        assert_eq!(t("T25").position, Position { row: 1, col: 0 });
        assert_eq!(t("T48").position, Position { row: 9, col: 7 });
        assert_eq!(t("T10").booked_by.as_deref(), Some("0551234562"));
        assert_eq!(t("T12").booked_by.as_deref(), Some("0509876544"));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Reserved".parse::<TentStatus>().unwrap(), TentStatus::Reserved);
        assert!("gone".parse::<TentStatus>().is_err());
    }
}
