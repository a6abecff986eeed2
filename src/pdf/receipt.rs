//! The single-page bilingual receipt.

use chrono::{DateTime, Local};

use crate::fonts::{FaceRole, FontSet};
use crate::model::{EmbeddedImage, ReceiptDetails};

use super::layout::{
    Align, Geometry, HEADER_COLOR, LABEL_AR_COLOR, LABEL_EN_COLOR, LayoutContext, ROW_HEIGHT,
    RowKind, VALUE_COLOR,
};
use super::{A4_HEIGHT, A4_WIDTH, Document, DrawOp, PT_TO_MM, Rgb};

const MARGIN_X: f32 = 15.0;
const MARGIN_Y: f32 = 12.0;

const LOGO_HEIGHT: f32 = 12.0;
const AFTER_LOGO: f32 = 4.0;
const NUMBER_FONT_SIZE: f32 = 8.0;
const AFTER_NUMBER: f32 = 4.0;
const TITLE_FONT_SIZE: f32 = 24.0;
const AFTER_TITLE: f32 = 7.0;
const SUBTITLE_FONT_SIZE: f32 = 14.0;
const AFTER_SUBTITLE: f32 = 6.0;
const AFTER_HEADER_RULE: f32 = 6.0;
const PURPOSE_FONT_SIZE: f32 = 10.0;
const AFTER_PURPOSE: f32 = 6.0;
const AD_ZONE_FONT_SIZE: f32 = 8.5;
const AFTER_AD_ZONES: f32 = 4.0;
const AFTER_QTY_ROWS: f32 = 3.0;
const AFTER_NOTES: f32 = 4.0;
const AFTER_NOTES_RULE: f32 = 3.0;
const DISCLAIMER_FONT_SIZE: f32 = 7.5;
const AFTER_DISCLAIMER: f32 = 5.0;
const SIG_LINE_OFFSET: f32 = 3.0;
/// jsPDF-style line height factor used to measure single-line text blocks.
const TEXT_BLOCK_FACTOR: f32 = 1.15;

pub fn geometry() -> Geometry {
    Geometry {
        page_width: A4_WIDTH,
        page_height: A4_HEIGHT,
        margin_x: MARGIN_X,
        margin_top: MARGIN_Y,
        margin_bottom: MARGIN_Y,
    }
}

/// Lay out a receipt. `logo` is drawn centred at the top when present;
/// otherwise its space is left empty.
pub fn layout_receipt(
    details: &ReceiptDetails,
    fonts: &FontSet,
    logo: Option<EmbeddedImage>,
) -> Document {
    let mut ctx = LayoutContext::new(fonts, geometry());
    let g = ctx.geometry;

    if let Some(img) = &logo {
        let w = LOGO_HEIGHT * img.aspect_ratio();
        ctx.push(DrawOp::Image {
            x: (g.page_width - w) / 2.0,
            y: ctx.y,
            w,
            h: LOGO_HEIGHT,
        });
    }
    ctx.advance(LOGO_HEIGHT + AFTER_LOGO);

    if !details.receipt_number.trim().is_empty() {
        let text = format!("NO: {}", details.receipt_number.trim());
        let base = ctx.top_baseline(FaceRole::LatinRegular, ctx.y, NUMBER_FONT_SIZE);
        ctx.text(&text, g.right(), base, Align::Right, FaceRole::LatinRegular, NUMBER_FONT_SIZE, LABEL_AR_COLOR);
        ctx.advance(NUMBER_FONT_SIZE * PT_TO_MM * TEXT_BLOCK_FACTOR + AFTER_NUMBER);
    }

    bilingual_line(
        &mut ctx,
        "RECEIPT",
        "وصل استلام مبلغ",
        TITLE_FONT_SIZE,
        true,
        HEADER_COLOR,
    );
    ctx.advance(TITLE_FONT_SIZE * 0.7 + AFTER_TITLE);

    bilingual_line(
        &mut ctx,
        "TRIPOLI KARTING RACE 2025 - SEASON 1",
        "مهرجان طرابلس للكارتينج",
        SUBTITLE_FONT_SIZE,
        false,
        VALUE_COLOR,
    );
    ctx.advance(SUBTITLE_FONT_SIZE * 0.7 + AFTER_SUBTITLE);
    ctx.rule(0.5);
    ctx.advance(AFTER_HEADER_RULE);

    free(&mut ctx, "DATE", "تاريخ الاستلام", &details.display_date());
    free(&mut ctx, "RECEIVED FROM", "وصلنا من السادة", &details.received_from_name);
    free(&mut ctx, "AMOUNT", "مبلغ وقدره", &details.amount);
    ctx.advance(2.0);

    let (purpose_en, purpose_ar) = details.purpose_pair();
    let mid = ctx.y + ROW_HEIGHT / 2.0;
    let base = ctx.middle_baseline(FaceRole::LatinRegular, mid, PURPOSE_FONT_SIZE);
    ctx.text(
        &format!("FOR {}", purpose_en.to_uppercase()),
        g.left(),
        base,
        Align::Left,
        FaceRole::LatinRegular,
        PURPOSE_FONT_SIZE,
        VALUE_COLOR,
    );
    let base = ctx.middle_baseline(FaceRole::ArabicRegular, mid, PURPOSE_FONT_SIZE);
    ctx.text(
        &format!("وذلك بدل {purpose_ar}"),
        g.right(),
        base,
        Align::Right,
        FaceRole::ArabicRegular,
        PURPOSE_FONT_SIZE,
        VALUE_COLOR,
    );
    ctx.advance(ROW_HEIGHT * 0.7 + AFTER_PURPOSE);

    free(&mut ctx, "TENT NO.", "الخيمة رقم", &details.tent_number);
    free(&mut ctx, "USAGE PURPOSE", "جهة الاستعمال", &details.usage_purpose);
    ctx.advance(2.0);

    ctx.draw_section_header("ADDITIONAL SERVICES", "خدمات اخرى");
    ctx.draw_checkbox_row("ELECTRICITY", "كهرباء", details.electricity_available);
    ctx.draw_checkbox_row("CHAIRS", "كراسي", details.chairs_available);
    ctx.draw_checkbox_row("TABLE", "طاولات", details.table_available);
    free(&mut ctx, "DESCRIPTION", "الشرح", &details.description);
    ctx.advance(4.0);

    ctx.draw_section_header("ADVERTISEMENTS ON TRACK", "إعلانات على مسار الحلبة");
    let zones: Vec<(String, bool)> = details
        .ad_zones()
        .iter()
        .map(|(letter, on)| (format!("ZONE {letter}"), *on))
        .collect();
    ctx.draw_checkbox_grid(&zones, AD_ZONE_FONT_SIZE);
    ctx.advance(AFTER_AD_ZONES);

    qty(&mut ctx, "TOTAL QTY", "العدد الإجمالي", &details.ads_total_quantity);
    qty(&mut ctx, "CAR FLAGS", "أعلام على السيارات", &details.car_flags_count);
    qty(&mut ctx, "BANNER FLAGS", "أعلام على الأرصفة", &details.banner_flags_count);
    ctx.advance(AFTER_QTY_ROWS);

    free(&mut ctx, "NOTES", "ملاحظات", &details.notes);
    ctx.advance(AFTER_NOTES);
    ctx.rule(0.3);
    ctx.advance(AFTER_NOTES_RULE);

    let mid = ctx.y + DISCLAIMER_FONT_SIZE * 0.35 / 2.0;
    let base = ctx.middle_baseline(FaceRole::LatinRegular, mid, DISCLAIMER_FONT_SIZE);
    ctx.text(
        "THIS RECEIPT IS NOT A TAX INVOICE.",
        g.left(),
        base,
        Align::Left,
        FaceRole::LatinRegular,
        DISCLAIMER_FONT_SIZE,
        LABEL_EN_COLOR,
    );
    let base = ctx.middle_baseline(FaceRole::ArabicRegular, mid, DISCLAIMER_FONT_SIZE);
    ctx.text(
        "هذا الوصل لا يعتبر فاتورة ضريبية.",
        g.right(),
        base,
        Align::Right,
        FaceRole::ArabicRegular,
        DISCLAIMER_FONT_SIZE,
        LABEL_EN_COLOR,
    );
    ctx.advance(DISCLAIMER_FONT_SIZE * 0.7 + AFTER_DISCLAIMER);

    let line_width = g.content_width() * 0.4;
    let line_y = ctx.y + SIG_LINE_OFFSET;
    ctx.draw_signature(
        g.left() + g.content_width() * 0.25,
        line_y,
        line_width,
        &details.receiver_name,
        "ISSUED TO",
        "المستلم",
    );
    ctx.draw_signature(
        g.right() - g.content_width() * 0.25,
        line_y,
        line_width,
        &details.payer_name,
        "ISSUED BY",
        "صادر عن",
    );

    ctx.finish(A4_WIDTH, A4_HEIGHT, logo)
}

fn free(ctx: &mut LayoutContext, en: &str, ar: &str, value: &str) {
    ctx.draw_labeled_row(en, ar, value, Align::Center, RowKind::Free);
}

fn qty(ctx: &mut LayoutContext, en: &str, ar: &str, value: &str) {
    ctx.draw_labeled_row(en, ar, value, Align::Center, RowKind::Quantity);
}

/// An English/Arabic pair vertically centred on the cursor band of `size`.
fn bilingual_line(
    ctx: &mut LayoutContext,
    en: &str,
    ar: &str,
    size: f32,
    bold: bool,
    color: Rgb,
) {
    let g = ctx.geometry;
    let mid = ctx.y + size * 0.35 / 2.0;
    let (en_face, ar_face) = if bold {
        (FaceRole::LatinBold, FaceRole::ArabicBold)
    } else {
        (FaceRole::LatinRegular, FaceRole::ArabicRegular)
    };
    let base = ctx.middle_baseline(en_face, mid, size);
    ctx.text(en, g.left(), base, Align::Left, en_face, size, color);
    let base = ctx.middle_baseline(ar_face, mid, size);
    ctx.text(ar, g.right(), base, Align::Right, ar_face, size, color);
}

/// `Receipt_<number>.pdf` with anything outside `[A-Za-z0-9-]` replaced, or a
/// timestamped name when the receipt has no number.
pub fn file_name(details: &ReceiptDetails, now: DateTime<Local>) -> String {
    let number = details.receipt_number.trim();
    let suffix = if number.is_empty() {
        now.format("%Y%m%d_%H%M").to_string()
    } else {
        number
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    };
    format!("Receipt_{suffix}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_sanitizes_number() {
        let details = ReceiptDetails {
            receipt_number: "TKR2025-0007/B".into(),
            ..ReceiptDetails::default()
        };
        let now = Local.with_ymd_and_hms(2025, 5, 12, 9, 30, 0).unwrap();
        assert_eq!(file_name(&details, now), "Receipt_TKR2025-0007_B.pdf");
    }

    #[test]
    fn file_name_without_number_uses_timestamp() {
        let details = ReceiptDetails {
            receipt_number: String::new(),
            ..ReceiptDetails::default()
        };
        let now = Local.with_ymd_and_hms(2025, 5, 12, 9, 30, 0).unwrap();
        assert_eq!(file_name(&details, now), "Receipt_20250512_0930.pdf");
    }

    #[test]
    fn receipt_fits_one_page() {
        let fonts = FontSet::fallback();
        let details = ReceiptDetails {
            received_from_name: "Ahmad".into(),
            receipt_number: "TKR2025-0001".into(),
            ..ReceiptDetails::default()
        };
        let doc = layout_receipt(&details, &fonts, None);
        assert_eq!(doc.pages.len(), 1);
        assert!(doc.page_texts(0).any(|t| t == "NO: TKR2025-0001"));
        assert!(doc.page_texts(0).any(|t| t == "AHMAD"));
    }
}
