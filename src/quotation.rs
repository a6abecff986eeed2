//! Quotation item ordering and pricing.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{Quotation, QuotationItem};

const CATEGORY_ORDER: [&str; 4] = ["painting", "cladding", "facade_element", "other"];

/// Unit ordering used to group quotation rows inside a category. Units not
/// listed sort alphabetically after these; items without a unit go last.
pub const UNIT_SORT_ORDER: &[&str] = &[
    "LUMPSUM", "LS", "LUMP SUM", "ALLOWANCE", "ALLOW",
    "SQM", "M2", "SQUARE METER", "SQUARE METERS",
    "SQFT", "SF", "SQUARE FOOT", "SQUARE FEET",
    "LM", "LINEAR METER", "LINEAR METERS",
    "LF", "LINEAR FOOT", "LINEAR FEET",
    "M", "METER", "METERS",
    "FT", "FOOT", "FEET",
    "EACH", "EA", "ITEM", "ITEMS", "UNIT", "UNITS", "NO", "NOS", "NUMBER",
    "SET", "SETS",
    "KG", "KILOGRAM", "KILOGRAMS",
    "TONNE", "TONNES", "TON", "TONS",
    "DAY", "DAYS", "HOUR", "HOURS",
    "CBM", "M3", "CUBIC METER", "CUBIC METERS",
    "CY", "CUBIC YARD", "CUBIC YARDS",
];

fn category_rank(category: &str) -> Option<usize> {
    CATEGORY_ORDER.iter().position(|c| *c == category)
}

fn unit_rank(unit: &str) -> Option<usize> {
    UNIT_SORT_ORDER.iter().position(|u| *u == unit)
}

fn compare_categories(a: &str, b: &str) -> Ordering {
    match (category_rank(a), category_rank(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn compare_units(a: Option<&str>, b: Option<&str>) -> Ordering {
    let a = a.map(str::to_uppercase);
    let b = b.map(str::to_uppercase);
    match (a.as_deref(), b.as_deref()) {
        (Some(x), Some(y)) => match (unit_rank(x), unit_rank(y)) {
            (Some(i), Some(j)) => i.cmp(&j),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => x.cmp(y),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Category, then unit of measure, then id.
pub fn compare_items(a: &QuotationItem, b: &QuotationItem) -> Ordering {
    compare_categories(&a.category, &b.category)
        .then_with(|| compare_units(a.unit_of_measure.as_deref(), b.unit_of_measure.as_deref()))
        .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
}

pub fn sort_items(items: &[QuotationItem]) -> Vec<QuotationItem> {
    let mut sorted = items.to_vec();
    sorted.sort_by(compare_items);
    sorted
}

/// Leading number of a quantity such as `"1,250 SQFT"` or `"12.5m"`.
pub fn leading_quantity(quantity: &str) -> Option<f64> {
    let cleaned: String = quantity
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().ok()
}

pub fn format_money(amount: f64) -> String {
    format!("${amount:.2}")
}

/// Fill in unit prices, line totals, subtotal, tax and grand total.
/// `unit_prices` is keyed by item id. Items without a price or a numeric
/// quantity stay unpriced and are left out of the totals.
pub fn apply_prices(quotation: &mut Quotation, unit_prices: &HashMap<String, f64>, tax_rate: f64) {
    let mut subtotal = 0.0;
    let mut priced = 0usize;
    for item in &mut quotation.items {
        let Some(&unit_price) = unit_prices.get(&item.id.to_string()) else {
            continue;
        };
        item.unit_price = Some(format_money(unit_price));
        let Some(qty) = leading_quantity(&item.quantity) else {
            log::warn!("Item {} has no numeric quantity ({:?}); left unpriced", item.id, item.quantity);
            item.price = None;
            continue;
        };
        let line = unit_price * qty;
        item.price = Some(format_money(line));
        subtotal += line;
        priced += 1;
    }

    let tax = subtotal * tax_rate;
    quotation.subtotal = Some(format_money(subtotal));
    quotation.tax_amount = (tax_rate > 0.0).then(|| format_money(tax));
    quotation.grand_total = Some(format_money(subtotal + tax));
    log::info!(
        "Priced {priced}/{} items: subtotal {}, grand total {}",
        quotation.items.len(),
        format_money(subtotal),
        format_money(subtotal + tax),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextOrNumber;

    fn item(id: &str, category: &str, unit: Option<&str>, quantity: &str) -> QuotationItem {
        QuotationItem {
            id: TextOrNumber::Text(id.into()),
            category: category.into(),
            description: format!("item {id}"),
            quantity: quantity.into(),
            material_or_finish: String::new(),
            dimensions: None,
            page_ref: None,
            unit_of_measure: unit.map(str::to_string),
            price_placeholder: format!("$[ITEM_PRICE_{id}]"),
            unit_price: None,
            price: None,
        }
    }

    #[test]
    fn sorts_by_category_unit_then_id() {
        let items = vec![
            item("5", "zinc", None, "1"),
            item("4", "other", Some("EACH"), "1"),
            item("3", "cladding", Some("sqm"), "1"),
            item("2", "painting", None, "1"),
            item("1", "painting", Some("LF"), "1"),
            item("6", "painting", Some("LS"), "1"),
            item("7", "acoustic", None, "1"),
        ];
        let ids: Vec<String> = sort_items(&items).iter().map(|i| i.id.to_string()).collect();
        assert_eq!(ids, ["6", "1", "2", "3", "4", "7", "5"]);
    }

    #[test]
    fn unknown_units_sort_alphabetically_after_known() {
        let items = vec![
            item("1", "painting", Some("ZZ"), "1"),
            item("2", "painting", Some("AA"), "1"),
            item("3", "painting", Some("EACH"), "1"),
        ];
        let ids: Vec<String> = sort_items(&items).iter().map(|i| i.id.to_string()).collect();
        assert_eq!(ids, ["3", "2", "1"]);
    }

    #[test]
    fn leading_quantity_handles_separators() {
        assert_eq!(leading_quantity("1,250 SQFT"), Some(1250.0));
        assert_eq!(leading_quantity("12.5m"), Some(12.5));
        assert_eq!(leading_quantity("five doors"), None);
    }

    #[test]
    fn prices_and_totals() {
        let mut q: Quotation = serde_json::from_str("{}").unwrap();
        q.items = vec![item("1", "painting", Some("SQM"), "10 SQM"), item("2", "other", None, "N/A")];
        let prices = HashMap::from([("1".to_string(), 2.5), ("2".to_string(), 100.0)]);
        apply_prices(&mut q, &prices, 0.11);
        assert_eq!(q.items[0].price.as_deref(), Some("$25.00"));
        assert_eq!(q.items[1].price, None);
        assert_eq!(q.subtotal.as_deref(), Some("$25.00"));
        assert_eq!(q.tax_amount.as_deref(), Some("$2.75"));
        assert_eq!(q.grand_total.as_deref(), Some("$27.75"));
    }
}
