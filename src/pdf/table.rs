//! Paginated table with grouped rows.
//!
//! Rows are wrapped up front so every row's height is known before it is
//! placed. A row that would cross the bottom limit closes the current page
//! (vertical separators), and the next page starts with the shaded header
//! band and the group band again. Rows taller than a whole page are split
//! between wrapped lines.

use crate::fonts::FaceRole;

use super::layout::{Align, LayoutContext};
use super::{BLACK, DrawOp, PT_TO_MM};

pub const HEADER_HEIGHT: f32 = 8.0;
pub const BAND_HEIGHT: f32 = 6.0;
pub const CELL_PADDING: f32 = 2.0;
pub const MIN_ROW_HEIGHT: f32 = 6.0;
pub const BODY_FONT_SIZE: f32 = 8.0;
const BAND_FONT_SIZE: f32 = 9.0;
const LINE_HEIGHT_FACTOR: f32 = 1.2;
const HEADER_FILL: u8 = 220;
const BAND_FILL: u8 = 240;
const GRID_LINE_WIDTH: f32 = 0.1;

pub struct Column {
    pub header: &'static str,
    /// Share of the content width.
    pub fraction: f32,
    pub header_align: Align,
    pub body_align: Align,
}

pub struct TableRow {
    /// Group key; a change of group draws a band before the row.
    pub group: String,
    pub cells: Vec<String>,
}

/// A row with every cell already wrapped to its column.
pub struct PreparedRow {
    pub group: String,
    pub lines: Vec<Vec<String>>,
    pub height: f32,
}

pub fn line_height() -> f32 {
    BODY_FONT_SIZE * PT_TO_MM * LINE_HEIGHT_FACTOR
}

/// Height of a row whose tallest cell has `lines` lines.
pub fn row_height(lines: usize) -> f32 {
    (lines as f32 * line_height()).max(MIN_ROW_HEIGHT) + CELL_PADDING * 1.5
}

pub fn band_label(group: &str) -> String {
    format!("{} WORKS", group.to_uppercase().replace('_', " "))
}

fn column_widths(ctx: &LayoutContext, columns: &[Column]) -> Vec<f32> {
    let content = ctx.geometry.content_width();
    columns.iter().map(|c| content * c.fraction).collect()
}

pub fn prepare_rows(
    ctx: &LayoutContext,
    columns: &[Column],
    rows: &[TableRow],
) -> Vec<PreparedRow> {
    let widths = column_widths(ctx, columns);
    rows.iter()
        .map(|row| {
            let lines: Vec<Vec<String>> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let text = row.cells.get(i).map(String::as_str).unwrap_or_default();
                    let max_width = w - 2.0 * CELL_PADDING;
                    ctx.wrap_text(text, FaceRole::LatinRegular, BODY_FONT_SIZE, max_width)
                })
                .collect();
            let tallest = lines.iter().map(Vec::len).max().unwrap_or(1);
            PreparedRow {
                group: row.group.clone(),
                lines,
                height: row_height(tallest),
            }
        })
        .collect()
}

fn draw_header(ctx: &mut LayoutContext, columns: &[Column], widths: &[f32]) {
    let g = ctx.geometry;
    ctx.push(DrawOp::Rect {
        x: g.left(),
        y: ctx.y,
        w: g.content_width(),
        h: HEADER_HEIGHT,
        fill: Some([HEADER_FILL; 3]),
        stroke: None,
        line_width: 0.0,
    });
    let baseline = ctx.y + 5.0;
    let mut x = g.left();
    for (column, w) in columns.iter().zip(widths) {
        let anchor = match column.header_align {
            Align::Center => x + w / 2.0,
            Align::Right => x + w - CELL_PADDING,
            Align::Left => x + CELL_PADDING,
        };
        ctx.text(
            column.header,
            anchor,
            baseline,
            column.header_align,
            FaceRole::LatinBold,
            BODY_FONT_SIZE,
            BLACK,
        );
        x += w;
    }
    ctx.y += HEADER_HEIGHT;
}

fn draw_band(ctx: &mut LayoutContext, group: &str) {
    let g = ctx.geometry;
    ctx.push(DrawOp::Rect {
        x: g.left(),
        y: ctx.y,
        w: g.content_width(),
        h: BAND_HEIGHT,
        fill: Some([BAND_FILL; 3]),
        stroke: None,
        line_width: 0.0,
    });
    let baseline = ctx.y + 4.0;
    ctx.text(
        &band_label(group),
        g.left() + CELL_PADDING,
        baseline,
        Align::Left,
        FaceRole::LatinBold,
        BAND_FONT_SIZE,
        BLACK,
    );
    ctx.y += BAND_HEIGHT;
}

fn draw_separators(ctx: &mut LayoutContext, widths: &[f32], top: f32) {
    let bottom = ctx.y;
    let mut x = ctx.geometry.left();
    for i in 0..=widths.len() {
        ctx.line(x, top, x, bottom, GRID_LINE_WIDTH, BLACK);
        if let Some(w) = widths.get(i) {
            x += w;
        }
    }
}

fn new_table_page(ctx: &mut LayoutContext, columns: &[Column], widths: &[f32]) -> f32 {
    ctx.new_page();
    let top = ctx.y;
    draw_header(ctx, columns, widths);
    top
}

/// Most lines of one row that fit in `available` mm.
fn lines_fitting(available: f32) -> usize {
    if available < row_height(1) {
        return 0;
    }
    (((available - CELL_PADDING * 1.5) / line_height()).floor() as usize).max(1)
}

/// Draw lines `from..to` of every cell of `row` as one grid row.
fn draw_row_lines(
    ctx: &mut LayoutContext,
    columns: &[Column],
    widths: &[f32],
    row: &PreparedRow,
    from: usize,
    to: usize,
) {
    let first_baseline = ctx.y + CELL_PADDING + BODY_FONT_SIZE * PT_TO_MM / 2.0;
    let mut x = ctx.geometry.left();
    for ((cell_lines, column), w) in row.lines.iter().zip(columns).zip(widths) {
        let anchor = match column.body_align {
            Align::Center => x + w / 2.0,
            Align::Right => x + w - CELL_PADDING,
            Align::Left => x + CELL_PADDING,
        };
        let end = to.min(cell_lines.len());
        let chunk = cell_lines.get(from..end).unwrap_or_default();
        for (line_index, line) in chunk.iter().enumerate() {
            ctx.text(
                line,
                anchor,
                first_baseline + line_index as f32 * line_height(),
                column.body_align,
                FaceRole::LatinRegular,
                BODY_FONT_SIZE,
                BLACK,
            );
        }
        x += w;
    }

    let bottom = ctx.y + row_height(to - from);
    let (l, r) = (ctx.geometry.left(), ctx.geometry.right());
    ctx.line(l, bottom, r, bottom, GRID_LINE_WIDTH, BLACK);
    ctx.y = bottom;
}

/// Draw `rows` at the cursor. Returns the number of pages the table touched.
///
/// A row that fits on a fresh page is never split; a taller one is continued
/// line by line across pages, each page repeating the header and band.
pub fn draw_table(ctx: &mut LayoutContext, columns: &[Column], rows: &[TableRow]) -> usize {
    let widths = column_widths(ctx, columns);
    let prepared = prepare_rows(ctx, columns, rows);
    let first_page = ctx.page_count();
    let g = ctx.geometry;
    let page_room = g.bottom_limit() - g.margin_top - HEADER_HEIGHT - BAND_HEIGHT;

    if !ctx.fits(HEADER_HEIGHT + BAND_HEIGHT + row_height(1)) {
        ctx.new_page();
    }
    let mut table_top = ctx.y;
    draw_header(ctx, columns, &widths);

    let mut current_group: Option<&str> = None;
    for row in &prepared {
        let splits = row.height > page_room;
        if current_group != Some(row.group.as_str()) {
            let first_chunk = if splits { row_height(1) } else { row.height };
            if !ctx.fits(BAND_HEIGHT + first_chunk) {
                draw_separators(ctx, &widths, table_top);
                table_top = new_table_page(ctx, columns, &widths);
            }
            draw_band(ctx, &row.group);
            current_group = Some(row.group.as_str());
        }

        let total = row.lines.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let mut from = 0;
        let mut fresh_page = false;
        while from < total {
            let available = ctx.geometry.bottom_limit() - ctx.y;
            let fitting = if splits || from > 0 {
                lines_fitting(available)
            } else if row.height <= available {
                total
            } else {
                0
            };
            // A page too short for even one line still takes one.
            let fitting = if fresh_page { fitting.max(1) } else { fitting };
            if fitting == 0 {
                fresh_page = true;
                draw_separators(ctx, &widths, table_top);
                table_top = new_table_page(ctx, columns, &widths);
                draw_band(ctx, &row.group);
                continue;
            }
            let to = (from + fitting).min(total);
            draw_row_lines(ctx, columns, &widths, row, from, to);
            fresh_page = false;
            from = to;
        }
    }

    draw_separators(ctx, &widths, table_top);
    let pages = ctx.page_count() - first_page + 1;
    log::debug!("Table: {} rows over {} page(s)", prepared.len(), pages);
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontSet;
    use crate::pdf::layout::Geometry;

    #[test]
    fn row_height_has_minimum() {
        assert!((row_height(1) - (MIN_ROW_HEIGHT + 3.0)).abs() < 1e-4);
        let five = row_height(5);
        assert!((five - (5.0 * line_height() + 3.0)).abs() < 1e-4);
    }

    #[test]
    fn band_label_spells_out_category() {
        assert_eq!(band_label("facade_element"), "FACADE ELEMENT WORKS");
    }

    #[test]
    fn wrapped_cells_grow_the_row() {
        let fonts = FontSet::fallback();
        let ctx = LayoutContext::new(
            &fonts,
            Geometry {
                page_width: 210.0,
                page_height: 297.0,
                margin_x: 15.0,
                margin_top: 15.0,
                margin_bottom: 30.0,
            },
        );
        let columns = [Column {
            header: "Description",
            fraction: 0.2,
            header_align: Align::Left,
            body_align: Align::Left,
        }];
        let rows = [TableRow {
            group: "painting".into(),
            cells: vec!["long description that needs several lines in a narrow column".into()],
        }];
        let prepared = prepare_rows(&ctx, &columns, &rows);
        assert!(prepared[0].lines[0].len() > 1);
        assert!(prepared[0].height > row_height(1));
    }
}
