use crate::fonts::{FaceRole, FontSet};
use crate::model::EmbeddedImage;
use crate::script;

use super::{CHECK_MARK_ADVANCE, Document, DrawOp, PT_TO_MM, Page, Rgb};

pub const LINE_COLOR: Rgb = [203, 213, 225];
pub const DOTTED_LINE_COLOR: Rgb = [100, 116, 139];
pub const LABEL_EN_COLOR: Rgb = [71, 85, 105];
pub const LABEL_AR_COLOR: Rgb = [51, 65, 85];
pub const VALUE_COLOR: Rgb = [30, 41, 59];
pub const FILLED_VALUE_COLOR: Rgb = [37, 99, 235];
pub const HEADER_COLOR: Rgb = [15, 23, 42];

pub const ROW_HEIGHT: f32 = 9.5;
pub const ROW_FONT_SIZE: f32 = 10.0;
/// Baseline offset of a filled value relative to its guide line.
pub const TEXT_ON_LINE_OFFSET: f32 = -0.7;
const ZONE_PADDING: f32 = 3.0;
pub const MIN_ZONE_WIDTH: f32 = 10.0;
const GUIDE_LINE_INSET: f32 = 2.0;
const DOT_DASH: [f32; 2] = [0.5, 0.5];
const GUIDE_LINE_WIDTH: f32 = 0.2;
const QTY_EN_FRACTION: f32 = 0.22;
const QTY_AR_FRACTION: f32 = 0.33;

pub const SECTION_FONT_SIZE: f32 = 10.5;
const SECTION_BEFORE: f32 = 3.0;
const SECTION_AFTER_TEXT: f32 = 3.0;
const SECTION_AFTER_RULE: f32 = 4.0;

pub const CHECKBOX_SIZE: f32 = 3.5;
const SERVICE_FONT_SIZE: f32 = 9.0;
pub const SERVICE_ROW_ADVANCE: f32 = 6.5;
const SERVICE_GAP: f32 = 2.0;
const GRID_GAP: f32 = 1.5;
const GRID_COLUMNS: usize = 6;

const SIG_FONT_SIZE: f32 = 9.0;
const SIG_LABEL_OFFSET: f32 = 3.0;
const SIG_AR_LABEL_OFFSET: f32 = 6.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowKind {
    /// Input zone is whatever the two labels leave free.
    Free,
    /// Input zone sits between fixed label containers (22% / 33%).
    Quantity,
}

/// Page size and margins, all in mm.
#[derive(Clone, Copy, Debug)]
pub struct Geometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_x: f32,
    pub margin_top: f32,
    /// Distance from the page bottom that content may not cross.
    pub margin_bottom: f32,
}

impl Geometry {
    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin_x
    }

    pub fn left(&self) -> f32 {
        self.margin_x
    }

    pub fn right(&self) -> f32 {
        self.page_width - self.margin_x
    }

    /// Lowest y a draw operation may reach.
    pub fn bottom_limit(&self) -> f32 {
        self.page_height - self.margin_bottom
    }
}

/// Where a labeled row put its pieces; returned for callers and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowGeometry {
    pub label_en_end: f32,
    pub label_ar_start: f32,
    pub zone_start: f32,
    pub zone_width: f32,
    pub line_y: f32,
}

/// The explicit layout state threaded through every drawing routine: the
/// vertical cursor, the finished pages, and the current page's display list.
pub struct LayoutContext<'a> {
    pub fonts: &'a FontSet,
    pub geometry: Geometry,
    /// Vertical cursor in mm from the top of the current page.
    pub y: f32,
    pages: Vec<Page>,
}

impl<'a> LayoutContext<'a> {
    pub fn new(fonts: &'a FontSet, geometry: Geometry) -> Self {
        LayoutContext {
            fonts,
            geometry,
            y: geometry.margin_top,
            pages: vec![Page::default()],
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }

    pub fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    pub fn advance(&mut self, dy: f32) {
        self.y += dy;
    }

    pub fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = self.geometry.margin_top;
        log::debug!("Page break -> page {}", self.pages.len());
    }

    pub fn fits(&self, height: f32) -> bool {
        self.y + height <= self.geometry.bottom_limit()
    }

    /// Start a new page if `height` would cross the bottom margin. Returns
    /// true when a break happened.
    pub fn ensure_space(&mut self, height: f32) -> bool {
        if self.fits(height) {
            false
        } else {
            self.new_page();
            true
        }
    }

    pub fn finish(
        self,
        page_width: f32,
        page_height: f32,
        image: Option<EmbeddedImage>,
    ) -> Document {
        Document {
            page_width,
            page_height,
            pages: self.pages,
            image,
        }
    }

    /// Width of `text` in mm.
    pub fn text_width(&self, face: FaceRole, text: &str, size: f32) -> f32 {
        self.fonts.text_width(face, text, size) * PT_TO_MM
    }

    /// Baseline that vertically centres text of `size` on `y_mid`.
    pub fn middle_baseline(&self, face: FaceRole, y_mid: f32, size: f32) -> f32 {
        y_mid + size * PT_TO_MM * self.fonts.ascender_ratio(face) * 0.5
    }

    /// Baseline that puts the top of the text at `y_top`.
    pub fn top_baseline(&self, face: FaceRole, y_top: f32, size: f32) -> f32 {
        y_top + size * PT_TO_MM * self.fonts.ascender_ratio(face)
    }

    /// Draw `text` anchored at `x` (left edge, centre or right edge). Returns
    /// the drawn width in mm.
    pub fn text(
        &mut self,
        text: &str,
        x: f32,
        baseline: f32,
        align: Align,
        face: FaceRole,
        size: f32,
        color: Rgb,
    ) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let width = self.text_width(face, text, size);
        let left = match align {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };
        self.push(DrawOp::Text {
            x: left,
            y: baseline,
            size,
            face,
            color,
            text: text.to_string(),
        });
        width
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32, color: Rgb) {
        self.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            width,
            color,
            dash: None,
        });
    }

    pub fn dotted_line(&mut self, x1: f32, x2: f32, y: f32) {
        self.push(DrawOp::Line {
            x1,
            y1: y,
            x2,
            y2: y,
            width: GUIDE_LINE_WIDTH,
            color: DOTTED_LINE_COLOR,
            dash: Some(DOT_DASH),
        });
    }

    /// A full-width rule at the cursor.
    pub fn rule(&mut self, width: f32) {
        let (l, r, y) = (self.geometry.left(), self.geometry.right(), self.y);
        self.line(l, y, r, y, width, LINE_COLOR);
    }

    /// Longest prefix of `text` that fits in `max_width` mm.
    pub fn fit_to_width(&self, text: &str, face: FaceRole, size: f32, max_width: f32) -> String {
        if self.text_width(face, text, size) <= max_width {
            return text.to_string();
        }
        let mut end = text.len();
        while end > 0 {
            end = text[..end]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            let candidate = text[..end].trim_end();
            if self.text_width(face, candidate, size) <= max_width {
                return candidate.to_string();
            }
        }
        String::new()
    }

    /// Greedy word wrap into lines no wider than `max_width` mm. Explicit
    /// newlines are kept; words longer than a line are broken by character.
    pub fn wrap_text(&self, text: &str, face: FaceRole, size: f32, max_width: f32) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut current = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if current.is_empty() {
                    word.to_string()
                } else {
                    format!("{current} {word}")
                };
                if self.text_width(face, &candidate, size) <= max_width {
                    current = candidate;
                    continue;
                }
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                if self.text_width(face, word, size) <= max_width {
                    current = word.to_string();
                } else {
                    for ch in word.chars() {
                        let mut next = current.clone();
                        next.push(ch);
                        if !current.is_empty() && self.text_width(face, &next, size) > max_width {
                            lines.push(std::mem::replace(&mut current, ch.to_string()));
                        } else {
                            current = next;
                        }
                    }
                }
            }
            lines.push(current);
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
    }

    /// Draw wrapped text at the cursor, breaking pages between lines.
    pub fn paragraph(
        &mut self,
        text: &str,
        x: f32,
        max_width: f32,
        face: FaceRole,
        size: f32,
        color: Rgb,
    ) {
        let line_h = size * PT_TO_MM * self.fonts.line_h_ratio(face);
        for line in self.wrap_text(text, face, size, max_width) {
            self.ensure_space(line_h);
            let baseline = self.top_baseline(face, self.y, size);
            self.text(&line, x, baseline, Align::Left, face, size, color);
            self.y += line_h;
        }
    }

    /// One bilingual fill-in row: English label left, Arabic label right, a
    /// dotted guide line across the input zone and the value on top of it.
    pub fn draw_labeled_row(
        &mut self,
        label_en: &str,
        label_ar: &str,
        value: &str,
        align: Align,
        kind: RowKind,
    ) -> RowGeometry {
        self.ensure_space(ROW_HEIGHT);
        let g = self.geometry;
        let label_en = label_en.to_uppercase();
        let mid = self.y + ROW_HEIGHT / 2.0;

        let en_base = self.middle_baseline(FaceRole::LatinRegular, mid, ROW_FONT_SIZE);
        let en_width = self.text(
            &label_en,
            g.left(),
            en_base,
            Align::Left,
            FaceRole::LatinRegular,
            ROW_FONT_SIZE,
            LABEL_EN_COLOR,
        );
        let ar_base = self.middle_baseline(FaceRole::ArabicRegular, mid, ROW_FONT_SIZE);
        let ar_width = self.text(
            label_ar,
            g.right(),
            ar_base,
            Align::Right,
            FaceRole::ArabicRegular,
            ROW_FONT_SIZE,
            LABEL_AR_COLOR,
        );

        let (zone_start, zone_end) = match kind {
            RowKind::Quantity => (
                g.left() + g.content_width() * QTY_EN_FRACTION,
                g.right() - g.content_width() * QTY_AR_FRACTION,
            ),
            RowKind::Free => (
                g.left() + en_width + ZONE_PADDING,
                g.right() - ar_width - ZONE_PADDING,
            ),
        };
        let zone_width = (zone_end - zone_start).max(MIN_ZONE_WIDTH);
        let zone_end = zone_start + zone_width;

        let line_y = self.y + ROW_HEIGHT - GUIDE_LINE_INSET;
        self.dotted_line(zone_start, zone_end, line_y);

        if !script::is_blank_value(value) {
            let (script, display) = script::display_form(value.trim());
            let face = FaceRole::for_script(script, true);
            let clipped = self.fit_to_width(&display, face, ROW_FONT_SIZE, zone_width - 2.0);
            let anchor = match align {
                Align::Left => zone_start + 1.0,
                Align::Center => zone_start + zone_width / 2.0,
                Align::Right => zone_end - 1.0,
            };
            log::debug!("Row {label_en}: value {:?} in {:?} face", clipped, script);
            self.text(
                &clipped,
                anchor,
                line_y + TEXT_ON_LINE_OFFSET,
                align,
                face,
                ROW_FONT_SIZE,
                FILLED_VALUE_COLOR,
            );
        }

        self.y += ROW_HEIGHT;
        RowGeometry {
            label_en_end: g.left() + en_width,
            label_ar_start: g.right() - ar_width,
            zone_start,
            zone_width,
            line_y,
        }
    }

    /// Bold bilingual title pair over a thin full-width rule.
    pub fn draw_section_header(&mut self, title_en: &str, title_ar: &str) {
        let size = SECTION_FONT_SIZE;
        self.ensure_space(SECTION_BEFORE + size * 0.7 + SECTION_AFTER_TEXT + SECTION_AFTER_RULE);
        self.y += SECTION_BEFORE;
        let mid = self.y + size * 0.35 / 2.0;
        let g = self.geometry;

        let base = self.middle_baseline(FaceRole::LatinBold, mid, size);
        self.text(
            &title_en.to_uppercase(),
            g.left(),
            base,
            Align::Left,
            FaceRole::LatinBold,
            size,
            HEADER_COLOR,
        );
        let base = self.middle_baseline(FaceRole::ArabicBold, mid, size);
        self.text(title_ar, g.right(), base, Align::Right, FaceRole::ArabicBold, size, HEADER_COLOR);

        self.y += size * 0.7 + SECTION_AFTER_TEXT;
        self.rule(0.3);
        self.y += SECTION_AFTER_RULE;
    }

    fn checkbox(&mut self, x: f32, mid: f32, checked: bool, mark_size: f32) {
        self.push(DrawOp::Rect {
            x,
            y: mid - CHECKBOX_SIZE / 2.0,
            w: CHECKBOX_SIZE,
            h: CHECKBOX_SIZE,
            fill: None,
            stroke: Some(VALUE_COLOR),
            line_width: 0.2,
        });
        if checked {
            let em = mark_size * PT_TO_MM;
            self.push(DrawOp::CheckMark {
                x: x + CHECKBOX_SIZE / 2.0 - CHECK_MARK_ADVANCE * em / 2.0,
                y: mid + 0.2 + em * 0.35,
                size: mark_size,
                color: VALUE_COLOR,
            });
        }
    }

    /// A service toggle: bold English label and box on the left, `توفير`
    /// plus the Arabic label and its box on the right.
    pub fn draw_checkbox_row(&mut self, label_en: &str, label_ar: &str, checked: bool) {
        self.ensure_space(SERVICE_ROW_ADVANCE);
        let g = self.geometry;
        let mid = self.y + SERVICE_ROW_ADVANCE / 2.0;
        let size = SERVICE_FONT_SIZE;

        let base = self.middle_baseline(FaceRole::LatinBold, mid, size);
        let en_width = self.text(
            &label_en.to_uppercase(),
            g.left(),
            base,
            Align::Left,
            FaceRole::LatinBold,
            size,
            VALUE_COLOR,
        );
        self.checkbox(g.left() + en_width + SERVICE_GAP, mid, checked, CHECKBOX_SIZE * 2.2);

        let ar_text = format!("توفير {label_ar}");
        let base = self.middle_baseline(FaceRole::ArabicBold, mid, size);
        let ar_width = self.text(&ar_text, g.right(), base, Align::Right, FaceRole::ArabicBold, size, VALUE_COLOR);
        self.checkbox(
            g.right() - ar_width - SERVICE_GAP - CHECKBOX_SIZE,
            mid,
            checked,
            CHECKBOX_SIZE * 1.8,
        );

        self.y += SERVICE_ROW_ADVANCE;
    }

    /// Up to six labelled toggles in equal columns across the content width.
    pub fn draw_checkbox_grid(&mut self, items: &[(String, bool)], font_size: f32) {
        self.ensure_space(SERVICE_ROW_ADVANCE);
        let g = self.geometry;
        let col_width = g.content_width() / GRID_COLUMNS as f32;
        let mid = self.y + SERVICE_ROW_ADVANCE / 2.0;
        let face = FaceRole::LatinRegular;

        for (index, (label, checked)) in items.iter().take(GRID_COLUMNS).enumerate() {
            let label_width = self.text_width(face, label, font_size);
            let total = CHECKBOX_SIZE + GRID_GAP + label_width;
            let column_start = g.left() + index as f32 * col_width;
            let box_x = column_start + col_width / 2.0 - total / 2.0;
            self.checkbox(box_x, mid, *checked, CHECKBOX_SIZE * 1.8);
            let base = self.middle_baseline(face, mid, font_size);
            self.text(
                label,
                box_x + CHECKBOX_SIZE + GRID_GAP,
                base,
                Align::Left,
                face,
                font_size,
                VALUE_COLOR,
            );
        }

        self.y += SERVICE_ROW_ADVANCE;
    }

    /// A signature block centred on `center_x`: dotted line at `line_y`, the
    /// name sitting on it, and the bilingual label below.
    pub fn draw_signature(
        &mut self,
        center_x: f32,
        line_y: f32,
        line_width: f32,
        name: &str,
        label_en: &str,
        label_ar: &str,
    ) {
        let start = center_x - line_width / 2.0;
        self.dotted_line(start, start + line_width, line_y);

        if !name.trim().is_empty() {
            let (script, display) = script::display_form(name.trim());
            let face = FaceRole::for_script(script, true);
            let clipped = self.fit_to_width(&display, face, SIG_FONT_SIZE, line_width - 2.0);
            self.text(
                &clipped,
                center_x,
                line_y + TEXT_ON_LINE_OFFSET,
                Align::Center,
                face,
                SIG_FONT_SIZE,
                FILLED_VALUE_COLOR,
            );
        }

        self.text(
            &label_en.to_uppercase(),
            center_x,
            line_y + SIG_LABEL_OFFSET,
            Align::Center,
            FaceRole::LatinRegular,
            SIG_FONT_SIZE,
            LABEL_EN_COLOR,
        );
        self.text(
            label_ar,
            center_x,
            line_y + SIG_AR_LABEL_OFFSET,
            Align::Center,
            FaceRole::ArabicRegular,
            SIG_FONT_SIZE,
            LABEL_AR_COLOR,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a4() -> Geometry {
        Geometry {
            page_width: 210.0,
            page_height: 297.0,
            margin_x: 15.0,
            margin_top: 12.0,
            margin_bottom: 12.0,
        }
    }

    #[test]
    fn wrap_respects_width_and_newlines() {
        let fonts = FontSet::fallback();
        let ctx = LayoutContext::new(&fonts, a4());
        let lines = ctx.wrap_text("one two three four five six\nseven", FaceRole::LatinRegular, 10.0, 25.0);
        assert!(lines.len() >= 3);
        assert_eq!(lines.last().map(String::as_str), Some("seven"));
        for line in &lines {
            assert!(ctx.text_width(FaceRole::LatinRegular, line, 10.0) <= 25.0);
        }
    }

    #[test]
    fn long_word_is_broken() {
        let fonts = FontSet::fallback();
        let ctx = LayoutContext::new(&fonts, a4());
        let lines = ctx.wrap_text("ABCDEFGHIJKLMNOPQRSTUVWXYZ", FaceRole::LatinRegular, 10.0, 20.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "ABCDEFGHIJKLMNOPQRSTUVWXYZ");
    }

    #[test]
    fn ensure_space_breaks_before_crossing_margin() {
        let fonts = FontSet::fallback();
        let mut ctx = LayoutContext::new(&fonts, a4());
        ctx.y = 280.0;
        assert!(ctx.ensure_space(9.5));
        assert_eq!(ctx.page_count(), 2);
        assert_eq!(ctx.y, 12.0);
        assert!(!ctx.ensure_space(9.5));
    }

    #[test]
    fn blank_date_draws_no_value() {
        let fonts = FontSet::fallback();
        let mut ctx = LayoutContext::new(&fonts, a4());
        ctx.draw_labeled_row("Date", "تاريخ الاستلام", "   /    /     ", Align::Center, RowKind::Free);
        let texts: Vec<_> = ctx.pages[0]
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { color, .. } if *color == FILLED_VALUE_COLOR))
            .collect();
        assert!(texts.is_empty());
        assert_eq!(ctx.y, 12.0 + ROW_HEIGHT);
    }

    #[test]
    fn quantity_rows_use_fixed_fractions() {
        let fonts = FontSet::fallback();
        let mut ctx = LayoutContext::new(&fonts, a4());
        let row = ctx.draw_labeled_row("Car flags", "أعلام على السيارات", "4", Align::Center, RowKind::Quantity);
        assert!((row.zone_start - (15.0 + 180.0 * 0.22)).abs() < 1e-4);
        assert!((row.zone_width - 180.0 * (1.0 - 0.22 - 0.33)).abs() < 1e-4);
    }
}
