mod common;

use tkr_receipts::fonts::{FaceRole, FontSet};
use tkr_receipts::pdf::layout::{Align, LayoutContext, MIN_ZONE_WIDTH, ROW_HEIGHT, RowKind};
use tkr_receipts::pdf::receipt;

fn draw_row(
    fonts: &FontSet,
    en: &str,
    ar: &str,
    value: &str,
    kind: RowKind,
) -> (tkr_receipts::pdf::layout::RowGeometry, tkr_receipts::pdf::Document) {
    let mut ctx = LayoutContext::new(fonts, receipt::geometry());
    let row = ctx.draw_labeled_row(en, ar, value, Align::Center, kind);
    (row, ctx.finish(210.0, 297.0, None))
}

#[test]
fn arabic_value_keeps_case_in_arabic_bold() {
    common::init_logging();
    let fonts = FontSet::fallback();
    let (_, doc) = draw_row(&fonts, "Received from", "استلمنا من", "سامي Co", RowKind::Free);
    let texts = common::texts_on(&doc, 0);
    let value = texts.iter().find(|t| t.text.contains("سامي")).expect("value drawn");
    assert_eq!(value.face, FaceRole::ArabicBold);
    assert_eq!(value.text, "سامي Co");
}

#[test]
fn latin_value_is_upper_cased_in_latin_bold() {
    let fonts = FontSet::fallback();
    let (_, doc) = draw_row(&fonts, "Received from", "استلمنا من", "karim haddad", RowKind::Free);
    let texts = common::texts_on(&doc, 0);
    let value = texts.iter().find(|t| t.text == "KARIM HADDAD").expect("value drawn");
    assert_eq!(value.face, FaceRole::LatinBold);
    // English label is upper-cased too
    assert!(texts.iter().any(|t| t.text == "RECEIVED FROM"));
}

#[test]
fn guide_line_stays_between_labels() {
    let fonts = FontSet::fallback();
    for (en, ar) in [
        ("Date", "التاريخ"),
        ("Received from", "استلمنا من"),
        ("Usage purpose", "الغرض من الاستخدام"),
    ] {
        let (row, doc) = draw_row(&fonts, en, ar, "", RowKind::Free);
        let lines = common::dotted_lines_on(&doc, 0);
        assert_eq!(lines.len(), 1);
        let (x1, x2, y) = lines[0];
        assert!(x1 > row.label_en_end, "{en}: line starts inside English label");
        assert!(x2 < row.label_ar_start, "{en}: line ends inside Arabic label");
        assert!((y - (receipt::geometry().margin_top + ROW_HEIGHT - 2.0)).abs() < 1e-4);
    }
}

#[test]
fn exhausted_row_clamps_zone_after_english_label() {
    let fonts = FontSet::fallback();
    let en = "an extremely long english label ".repeat(3);
    let ar = "تسمية عربية طويلة جدا تأخذ بقية المساحة المتاحة في السطر";
    let (row, doc) = draw_row(&fonts, en.trim(), ar, "", RowKind::Free);
    assert!((row.zone_width - MIN_ZONE_WIDTH).abs() < 1e-4);
    let (x1, x2, _) = common::dotted_lines_on(&doc, 0)[0];
    assert!(x1 > row.label_en_end);
    assert!((x2 - x1 - MIN_ZONE_WIDTH).abs() < 1e-4);
}

#[test]
fn quantity_rows_use_fixed_zone() {
    let fonts = FontSet::fallback();
    let g = receipt::geometry();
    let (row, _) = draw_row(&fonts, "Car flags", "أعلام السيارات", "2", RowKind::Quantity);
    assert!((row.zone_start - (g.left() + g.content_width() * 0.22)).abs() < 1e-3);
    let end = g.right() - g.content_width() * 0.33;
    assert!((row.zone_start + row.zone_width - end).abs() < 1e-3);
}

#[test]
fn separator_only_values_are_not_drawn() {
    let fonts = FontSet::fallback();
    for blank in ["", "   ", "/", "//", "  /   /    "] {
        let (_, doc) = draw_row(&fonts, "Date", "التاريخ", blank, RowKind::Free);
        assert_eq!(common::texts_on(&doc, 0).len(), 2, "value {blank:?} should be skipped");
    }
}

#[test]
fn long_values_are_clipped_to_zone() {
    let fonts = FontSet::fallback();
    let value = "w".repeat(200);
    let (row, doc) = draw_row(&fonts, "Notes", "ملاحظات", &value, RowKind::Free);
    let drawn = common::texts_on(&doc, 0)
        .into_iter()
        .find(|t| t.text.starts_with('W'))
        .expect("value drawn");
    let width = fonts.text_width(FaceRole::LatinBold, &drawn.text, 10.0) * 25.4 / 72.0;
    assert!(width <= row.zone_width - 2.0 + 1e-3);
    assert!(drawn.text.len() < value.len());
}

#[test]
fn rows_break_to_a_new_page_at_the_bottom_margin() {
    let fonts = FontSet::fallback();
    let g = receipt::geometry();
    let mut ctx = LayoutContext::new(&fonts, g);
    let per_page = ((g.bottom_limit() - g.margin_top) / ROW_HEIGHT).floor() as usize;
    for _ in 0..per_page {
        ctx.draw_labeled_row("Notes", "ملاحظات", "x", Align::Left, RowKind::Free);
    }
    assert_eq!(ctx.page_count(), 1);
    assert!(ctx.y <= g.bottom_limit());
    ctx.draw_labeled_row("Notes", "ملاحظات", "x", Align::Left, RowKind::Free);
    assert_eq!(ctx.page_count(), 2);
    assert!((ctx.y - (g.margin_top + ROW_HEIGHT)).abs() < 1e-4);
}

#[test]
fn full_receipt_renders_to_pdf_bytes() {
    let fonts = FontSet::fallback();
    let mut details = common::sample_details();
    details.receipt_number = "TKR2025-0042".into();
    let doc = receipt::layout_receipt(&details, &fonts, None);
    assert_eq!(doc.pages.len(), 1);
    let texts: Vec<String> = doc.page_texts(0).map(str::to_string).collect();
    assert!(texts.iter().any(|t| t == "NO: TKR2025-0042"));
    assert!(texts.iter().any(|t| t == "12 / 05 / 2025"));
    assert!(texts.iter().any(|t| t == "مطعم"));

    let bytes = tkr_receipts::pdf::render(&doc, &fonts).expect("render");
    assert!(bytes.starts_with(b"%PDF"));
}
