//! Multi-page quotation: letterhead, client block, introduction, the scope
//! table, totals, terms and a page footer on every page.

use crate::fonts::{FaceRole, FontSet};
use crate::model::{Quotation, QuotationItem};
use crate::quotation::sort_items;

use super::layout::{Align, Geometry, LayoutContext};
use super::table::{self, Column, TableRow};
use super::{A4_HEIGHT, A4_WIDTH, BLACK, Document, PT_TO_MM};

const MARGIN: f32 = 15.0;
const FOOTER_HEIGHT: f32 = 15.0;
const PARAGRAPH_LINE_FACTOR: f32 = 1.3;
const FOOTER_FONT_SIZE: f32 = 8.0;

pub const COLUMNS: [Column; 7] = [
    Column { header: "ID", fraction: 0.05, header_align: Align::Center, body_align: Align::Center },
    Column { header: "Description (Category)", fraction: 0.30, header_align: Align::Left, body_align: Align::Left },
    Column { header: "Qty / Unit", fraction: 0.13, header_align: Align::Center, body_align: Align::Center },
    Column { header: "Material/Spec", fraction: 0.15, header_align: Align::Left, body_align: Align::Left },
    Column { header: "Details (Page/Dim.)", fraction: 0.15, header_align: Align::Left, body_align: Align::Left },
    Column { header: "Unit Price ($)", fraction: 0.11, header_align: Align::Center, body_align: Align::Right },
    Column { header: "Total Price ($)", fraction: 0.11, header_align: Align::Center, body_align: Align::Right },
];

pub fn geometry() -> Geometry {
    Geometry {
        page_width: A4_WIDTH,
        page_height: A4_HEIGHT,
        margin_x: MARGIN,
        margin_top: MARGIN,
        margin_bottom: MARGIN + FOOTER_HEIGHT,
    }
}

pub fn file_name(base: &str) -> String {
    format!("{base}_Quotation.pdf")
}

fn or_placeholder<'s>(value: &'s str, placeholder: &'s str) -> &'s str {
    if value.trim().is_empty() { placeholder } else { value }
}

fn n_a(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "N/A",
    }
}

/// Table cells for one item, in column order.
pub fn item_cells(item: &QuotationItem) -> Vec<String> {
    let quantity = match item.unit_of_measure.as_deref() {
        Some(unit) if !unit.is_empty() => format!("{} ({unit})", n_a(Some(&item.quantity))),
        _ => n_a(Some(&item.quantity)).to_string(),
    };
    vec![
        item.id.to_string(),
        item.description.clone(),
        quantity,
        n_a(Some(&item.material_or_finish)).to_string(),
        format!(
            "Dim: {}\nPage: {}",
            n_a(item.dimensions.as_deref()),
            n_a(item.page_ref.as_deref())
        ),
        item.unit_price.clone().unwrap_or_else(|| "$0.00".to_string()),
        item.price.clone().unwrap_or_else(|| "$0.00".to_string()),
    ]
}

/// Wrapped text at the cursor using the quotation's looser line spacing.
fn paragraph(
    ctx: &mut LayoutContext,
    text: &str,
    x: f32,
    max_width: f32,
    face: FaceRole,
    size: f32,
) {
    let step = size * PT_TO_MM * PARAGRAPH_LINE_FACTOR;
    for line in ctx.wrap_text(text, face, size, max_width) {
        ctx.ensure_space(step);
        let baseline = ctx.top_baseline(face, ctx.y, size);
        ctx.text(&line, x, baseline, Align::Left, face, size, BLACK);
        ctx.y += step;
    }
}

pub fn layout_quotation(quotation: &Quotation, fonts: &FontSet) -> Document {
    let mut ctx = LayoutContext::new(fonts, geometry());
    let g = ctx.geometry;
    let content = g.content_width();
    let regular = FaceRole::LatinRegular;
    let bold = FaceRole::LatinBold;

    // Letterhead: company block left, date / project right
    let top = ctx.y;
    let address_width = content / 2.0 - MARGIN / 2.0;
    let company = &quotation.company_info;
    paragraph(&mut ctx, &company.address, g.left(), address_width, regular, 9.0);
    let y = ctx.top_baseline(regular, ctx.y, 9.0);
    let phone = format!("Phone: {}", company.phone);
    ctx.text(&phone, g.left(), y, Align::Left, regular, 9.0, BLACK);
    let email = format!("Email: {}", company.email);
    ctx.text(&email, g.left(), y + 4.0, Align::Left, regular, 9.0, BLACK);
    let left_y = ctx.y + 8.0;

    let date = or_placeholder(&quotation.client_info.date, "[Quotation Date]");
    let project = or_placeholder(&quotation.client_info.project_id, "[Project ID]");
    let right_base = ctx.top_baseline(regular, top, 9.0);
    let date = format!("Date: {date}");
    ctx.text(&date, g.right(), right_base, Align::Right, regular, 9.0, BLACK);
    let project = format!("Project ID: {project}");
    ctx.text(&project, g.right(), right_base + 4.0, Align::Right, regular, 9.0, BLACK);
    ctx.y = left_y.max(top + 8.0);

    ctx.rule(0.2);
    ctx.advance(7.0);

    let y = ctx.y;
    ctx.text("Client:", g.left(), y, Align::Left, bold, 10.0, BLACK);
    ctx.advance(5.0);
    let client = &quotation.client_info;
    let name = or_placeholder(&client.name, "[Client Name]");
    paragraph(&mut ctx, name, g.left(), content / 2.0, regular, 10.0);
    let address = or_placeholder(&client.address, "[Client Address]");
    paragraph(&mut ctx, address, g.left(), content / 2.0, regular, 10.0);
    ctx.advance(4.0);
    ctx.rule(0.2);
    ctx.advance(7.0);

    paragraph(&mut ctx, &quotation.introduction_text, g.left(), content, regular, 10.0);
    ctx.advance(7.0);

    ctx.ensure_space(7.0);
    let y = ctx.y;
    ctx.text("Scope of Work:", g.left(), y, Align::Left, bold, 11.0, BLACK);
    ctx.advance(7.0);

    let rows: Vec<TableRow> = sort_items(&quotation.items)
        .iter()
        .map(|item| TableRow {
            group: item.category.clone(),
            cells: item_cells(item),
        })
        .collect();
    table::draw_table(&mut ctx, &COLUMNS, &rows);
    ctx.advance(5.0);

    if let Some(subtotal) = &quotation.subtotal {
        total_row(&mut ctx, "Subtotal:", subtotal, false);
    }
    if let Some(tax) = &quotation.tax_amount {
        total_row(&mut ctx, "Tax:", tax, false);
    }
    ctx.advance(2.0);
    if let Some(total) = &quotation.grand_total {
        total_row(&mut ctx, "TOTAL ESTIMATED PRICE:", total, true);
    }
    ctx.advance(7.0);

    ctx.ensure_space(10.0);
    let y = ctx.y;
    ctx.text("Terms and Conditions:", g.left(), y, Align::Left, bold, 10.0, BLACK);
    ctx.advance(5.0);
    for term in &quotation.terms_and_conditions {
        paragraph(&mut ctx, &format!("- {term}"), g.left(), content, regular, 9.0);
        ctx.advance(1.0);
    }
    ctx.advance(7.0);

    ctx.ensure_space(10.0);
    paragraph(&mut ctx, &quotation.conclusion_text, g.left(), content, regular, 10.0);

    draw_footers(&mut ctx);
    log::info!(
        "Quotation layout: {} items over {} page(s)",
        quotation.items.len(),
        ctx.page_count()
    );
    ctx.finish(A4_WIDTH, A4_HEIGHT, None)
}

fn total_row(ctx: &mut LayoutContext, label: &str, value: &str, large: bool) {
    ctx.ensure_space(if large { 8.0 } else { 6.0 });
    let (face, size) = if large {
        (FaceRole::LatinBold, 11.0)
    } else {
        (FaceRole::LatinRegular, 9.0)
    };
    let (y, right) = (ctx.y, ctx.geometry.right());
    ctx.text(label, right - 70.0, y, Align::Left, face, size, BLACK);
    ctx.text(value, right - 5.0, y, Align::Right, face, size, BLACK);
    ctx.advance(if large { 7.0 } else { 5.0 });
}

/// `Page i of n` at the bottom right of every page.
fn draw_footers(ctx: &mut LayoutContext) {
    let total = ctx.page_count();
    let g = ctx.geometry;
    let baseline = g.page_height - MARGIN / 2.0;
    let texts: Vec<(String, f32)> = (1..=total)
        .map(|i| {
            let text = format!("Page {i} of {total}");
            let w = ctx.text_width(FaceRole::LatinRegular, &text, FOOTER_FONT_SIZE);
            (text, w)
        })
        .collect();
    for (page, (text, width)) in ctx.pages_mut().iter_mut().zip(texts) {
        page.ops.push(super::DrawOp::Text {
            x: g.right() - width,
            y: baseline,
            size: FOOTER_FONT_SIZE,
            face: FaceRole::LatinRegular,
            color: BLACK,
            text,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextOrNumber;

    #[test]
    fn cells_fill_missing_values() {
        let item = QuotationItem {
            id: TextOrNumber::Text("1".into()),
            category: "painting".into(),
            description: "Walls".into(),
            quantity: "120".into(),
            material_or_finish: String::new(),
            dimensions: None,
            page_ref: Some("A-101".into()),
            unit_of_measure: Some("SQM".into()),
            price_placeholder: "$[ITEM_PRICE_1]".into(),
            unit_price: None,
            price: None,
        };
        let cells = item_cells(&item);
        assert_eq!(cells[2], "120 (SQM)");
        assert_eq!(cells[3], "N/A");
        assert_eq!(cells[4], "Dim: N/A\nPage: A-101");
        assert_eq!(cells[6], "$0.00");
    }

    #[test]
    fn paragraph_lines_stay_inside_the_margins() {
        let fonts = FontSet::fallback();
        let g = geometry();
        let mut ctx = LayoutContext::new(&fonts, g);
        let text = (0..120).map(|i| format!("sentence {i}")).collect::<Vec<_>>().join("\n");
        paragraph(&mut ctx, &text, g.left(), g.content_width(), FaceRole::LatinRegular, 10.0);

        assert!(ctx.page_count() >= 2);
        assert!(ctx.y <= g.bottom_limit());
        let doc = ctx.finish(A4_WIDTH, A4_HEIGHT, None);
        let top = g.margin_top + 10.0 * PT_TO_MM * fonts.ascender_ratio(FaceRole::LatinRegular);
        for page in &doc.pages {
            for op in &page.ops {
                if let crate::pdf::DrawOp::Text { y, .. } = op {
                    assert!(*y >= top - 1e-3, "baseline {y} rises above the top margin");
                    assert!(*y <= g.bottom_limit());
                }
            }
        }
    }

    #[test]
    fn every_page_gets_a_footer() {
        let fonts = FontSet::fallback();
        let mut q: Quotation = serde_json::from_str("{}").unwrap();
        q.introduction_text = "word ".repeat(2000);
        let doc = layout_quotation(&q, &fonts);
        let n = doc.pages.len();
        assert!(n > 1);
        for i in 0..n {
            let footer = format!("Page {} of {n}", i + 1);
            assert!(doc.page_texts(i).any(|t| t == footer));
        }
    }
}
