use std::fmt;

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

use crate::script::to_arabic_digits;

pub const DEFAULT_SUBSCRIPTION_PURPOSE: &str =
    "Subscription in Tripoli Karting Race / اشتراك في مهرجان طرابلس للكارتينج";

pub const DEFAULT_LOGO_URL: &str =
    "https://hbslewdkkgwsaohjyzak.supabase.co/storage/v1/object/public/tkr//logo.png";

/// The editable receipt form. Every field is a display value; JSON uses the
/// camelCase names and missing fields take their defaults.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiptDetails {
    pub day: String,
    pub month: String,
    pub year: String,
    /// `YYYY-MM-DD`; takes precedence over day/month/year when set. Left
    /// empty when the form omits it, so the parts are used instead.
    #[serde(default)]
    pub receipt_date: String,
    pub received_from_name: String,
    pub amount: String,
    /// `"English / Arabic"` pair.
    pub subscription_purpose: String,
    pub tent_number: String,
    pub usage_purpose: String,
    pub description: String,

    pub electricity_available: bool,
    pub chairs_available: bool,
    pub table_available: bool,

    pub ads_zone_a: bool,
    pub ads_zone_b: bool,
    pub ads_zone_c: bool,
    pub ads_zone_d: bool,
    pub ads_zone_e: bool,
    pub ads_zone_f: bool,

    pub ads_total_quantity: String,
    pub car_flags_count: String,
    pub banner_flags_count: String,

    pub notes: String,
    pub receiver_name: String,
    pub payer_name: String,

    pub day_ar: String,
    pub month_ar: String,
    pub year_ar: String,

    pub receipt_number: String,
}

impl Default for ReceiptDetails {
    fn default() -> Self {
        let today = Local::now().date_naive();
        ReceiptDetails {
            day: format!("{:02}", today.day()),
            month: format!("{:02}", today.month()),
            year: today.year().to_string(),
            receipt_date: today.format("%Y-%m-%d").to_string(),
            received_from_name: String::new(),
            amount: String::new(),
            subscription_purpose: DEFAULT_SUBSCRIPTION_PURPOSE.to_string(),
            tent_number: String::new(),
            usage_purpose: String::new(),
            description: String::new(),
            electricity_available: false,
            chairs_available: false,
            table_available: false,
            ads_zone_a: false,
            ads_zone_b: false,
            ads_zone_c: false,
            ads_zone_d: false,
            ads_zone_e: false,
            ads_zone_f: false,
            ads_total_quantity: String::new(),
            car_flags_count: String::new(),
            banner_flags_count: String::new(),
            notes: String::new(),
            receiver_name: String::new(),
            payer_name: String::new(),
            day_ar: to_arabic_digits(today.day(), 2),
            month_ar: to_arabic_digits(today.month(), 2),
            year_ar: to_arabic_digits(today.year().unsigned_abs(), 4),
            receipt_number: String::new(),
        }
    }
}

impl ReceiptDetails {
    /// Zone toggles A..F in display order.
    pub fn ad_zones(&self) -> [(char, bool); 6] {
        [
            ('A', self.ads_zone_a),
            ('B', self.ads_zone_b),
            ('C', self.ads_zone_c),
            ('D', self.ads_zone_d),
            ('E', self.ads_zone_e),
            ('F', self.ads_zone_f),
        ]
    }

    /// The receipt date from `receipt_date`, or else from day/month/year.
    pub fn date(&self) -> Option<chrono::NaiveDate> {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(self.receipt_date.trim(), "%Y-%m-%d") {
            return Some(date);
        }
        let year = self.year.trim().parse().ok()?;
        let month = self.month.trim().parse().ok()?;
        let day = self.day.trim().parse().ok()?;
        chrono::NaiveDate::from_ymd_opt(year, month, day)
    }

    /// `DD / MM / YYYY` from `receipt_date`, or from the separate parts
    /// (blank parts become padding so an empty form reads as `  /   /    `).
    pub fn display_date(&self) -> String {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(self.receipt_date.trim(), "%Y-%m-%d") {
            return date.format("%d / %m / %Y").to_string();
        }
        let part = |v: &str, w: usize| {
            let v = v.trim();
            if v.is_empty() { " ".repeat(w) } else { v.to_string() }
        };
        format!("{} / {} / {}", part(&self.day, 2), part(&self.month, 2), part(&self.year, 4))
    }

    /// English and Arabic halves of the subscription purpose, with defaults
    /// filling whichever half is missing.
    pub fn purpose_pair(&self) -> (String, String) {
        let (default_en, default_ar) = split_pair(DEFAULT_SUBSCRIPTION_PURPOSE);
        let (en, ar) = split_pair(&self.subscription_purpose);
        (
            if en.is_empty() { default_en } else { en },
            if ar.is_empty() { default_ar } else { ar },
        )
    }
}

fn split_pair(value: &str) -> (String, String) {
    match value.split_once('/') {
        Some((en, ar)) => (en.trim().to_string(), ar.trim().to_string()),
        None => (value.trim().to_string(), String::new()),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDetails {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Default for CompanyDetails {
    fn default() -> Self {
        CompanyDetails {
            name: "Tripoli Events & Services Co.".to_string(),
            address: "123 Event Street, Tripoli, Lebanon".to_string(),
            phone: "+961 X XXX XXX".to_string(),
            email: "info@tripolievents.com".to_string(),
            logo_url: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientDetails {
    pub name: String,
    pub address: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub project_id: String,
}

/// Ids and page references come back from the model as either strings
/// ("A-101") or plain numbers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for TextOrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextOrNumber::Text(s) => f.write_str(s),
            TextOrNumber::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One line of work extracted from a scope document.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScopeItem {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub item_description: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub material_or_finish: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<TextOrNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measure: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItem {
    pub id: TextOrNumber,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub material_or_finish: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measure: Option<String>,
    #[serde(default)]
    pub price_placeholder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub client_info: ClientDetails,
    #[serde(default)]
    pub company_info: CompanyDetails,
    #[serde(default)]
    pub introduction_text: String,
    #[serde(default)]
    pub items: Vec<QuotationItem>,
    #[serde(default)]
    pub subtotal_placeholder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_placeholder: Option<String>,
    #[serde(default)]
    pub total_price_placeholder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grand_total: Option<String>,
    #[serde(default)]
    pub terms_and_conditions: Vec<String>,
    #[serde(default)]
    pub conclusion_text: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// A decoded-enough raster image: original bytes plus pixel size.
#[derive(Clone)]
pub struct EmbeddedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl EmbeddedImage {
    /// Sniff the format and read dimensions; `None` for anything that is not
    /// a readable PNG or JPEG.
    pub fn from_bytes(data: Vec<u8>) -> Option<EmbeddedImage> {
        let format = match image::guess_format(&data).ok()? {
            image::ImageFormat::Png => ImageFormat::Png,
            image::ImageFormat::Jpeg => ImageFormat::Jpeg,
            _ => return None,
        };
        let reader = image::ImageReader::with_format(
            std::io::Cursor::new(&data),
            match format {
                ImageFormat::Png => image::ImageFormat::Png,
                ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            },
        );
        let (pixel_width, pixel_height) = reader.into_dimensions().ok()?;
        if pixel_width == 0 || pixel_height == 0 {
            return None;
        }
        Some(EmbeddedImage {
            data,
            format,
            pixel_width,
            pixel_height,
        })
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.pixel_width as f32 / self.pixel_height as f32
    }
}
