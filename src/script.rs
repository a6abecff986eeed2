//! Script classification for filled-in values.
//!
//! A value is either drawn with the Arabic face (unchanged) or with the Latin
//! face (upper-cased). There is no per-character mixing: one Arabic-range code
//! point anywhere in the value moves the whole value to the Arabic face.

use std::borrow::Cow;
use std::ops::RangeInclusive;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Arabic,
}

/// Code point ranges classified as Arabic.
///
/// | Range           | Block                                  |
/// |-----------------|----------------------------------------|
/// | U+0600..=U+06FF | Arabic (letters, Arabic-Indic digits)  |
/// | U+0750..=U+077F | Arabic Supplement                      |
/// | U+08A0..=U+08FF | Arabic Extended-A                      |
/// | U+FB50..=U+FDFF | Arabic Presentation Forms-A            |
/// | U+FE70..=U+FEFF | Arabic Presentation Forms-B            |
pub const ARABIC_RANGES: &[RangeInclusive<char>] = &[
    '\u{0600}'..='\u{06FF}',
    '\u{0750}'..='\u{077F}',
    '\u{08A0}'..='\u{08FF}',
    '\u{FB50}'..='\u{FDFF}',
    '\u{FE70}'..='\u{FEFF}',
];

pub fn is_arabic_char(ch: char) -> bool {
    ARABIC_RANGES.iter().any(|r| r.contains(&ch))
}

pub fn detect_script(value: &str) -> Script {
    if value.chars().any(is_arabic_char) {
        Script::Arabic
    } else {
        Script::Latin
    }
}

/// The form a filled value is drawn in: Arabic untouched, Latin upper-cased.
pub fn display_form(value: &str) -> (Script, Cow<'_, str>) {
    match detect_script(value) {
        Script::Arabic => (Script::Arabic, Cow::Borrowed(value)),
        Script::Latin => (Script::Latin, Cow::Owned(value.to_uppercase())),
    }
}

/// True for values that carry nothing worth drawing: empty, whitespace, or
/// the separator residue of an empty date field (`/`, `//`, `  /   /    `).
pub fn is_blank_value(value: &str) -> bool {
    value.chars().all(|c| c == '/' || c.is_whitespace())
}

const EASTERN_ARABIC_DIGITS: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];

/// Render `n` with Eastern Arabic digits, zero-padded to `width`.
pub fn to_arabic_digits(n: u32, width: usize) -> String {
    format!("{n:0width$}")
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => EASTERN_ARABIC_DIGITS[d as usize],
            None => c,
        })
        .collect()
}
