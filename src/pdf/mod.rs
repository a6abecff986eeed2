//! Display list and PDF assembly.
//!
//! Renderers never touch `pdf-writer` directly: they append [`DrawOp`]s in
//! millimetres with a top-down y axis, and [`render`] turns the finished
//! [`Document`] into PDF bytes (shaping, subsetting, compression).

pub mod layout;
pub mod quotation;
pub mod receipt;
pub mod table;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};

use crate::error::{Error, Result};
use crate::fonts::{self, FaceRole, FontSet, GlyphUsage, ShapedGlyph};
use crate::model::{EmbeddedImage, ImageFormat};

/// Points per millimetre.
pub const MM: f32 = 72.0 / 25.4;
pub const A4_WIDTH: f32 = 210.0;
pub const A4_HEIGHT: f32 = 297.0;

/// Points per millimetre of font size, for converting pt sizes to mm extents.
pub const PT_TO_MM: f32 = 25.4 / 72.0;

pub type Rgb = [u8; 3];

pub const BLACK: Rgb = [0, 0, 0];

const CHECK_FONT_NAME: &str = "ZaDb";
const LOGO_NAME: &str = "Im1";

/// ZapfDingbats '4' (✔) advance at 1000 units/em.
pub const CHECK_MARK_ADVANCE: f32 = 0.76;

/// One drawing primitive. Coordinates in mm from the top-left corner; text
/// `y` is the baseline, `size` is in points.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        face: FaceRole,
        color: Rgb,
        text: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: Rgb,
        dash: Option<[f32; 2]>,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
        line_width: f32,
    },
    /// A check mark glyph with its baseline at `y`.
    CheckMark { x: f32, y: f32, size: f32, color: Rgb },
    /// The document image (logo) scaled into the box.
    Image { x: f32, y: f32, w: f32, h: f32 },
}

#[derive(Clone, Debug, Default)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

pub struct Document {
    pub page_width: f32,
    pub page_height: f32,
    pub pages: Vec<Page>,
    pub image: Option<EmbeddedImage>,
}

impl Document {
    /// All text drawn on `page`, in drawing order.
    pub fn page_texts(&self, page: usize) -> impl Iterator<Item = &str> {
        self.pages
            .get(page)
            .into_iter()
            .flat_map(|p| p.ops.iter())
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
    }
}

struct FontEntry {
    font_ref: Ref,
    gid_map: Option<HashMap<u16, u16>>,
}

/// Assemble `doc` into PDF bytes using the faces in `fonts`.
pub fn render(doc: &Document, fonts: &FontSet) -> Result<Vec<u8>> {
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    // Phase 1: shape every text op once and record glyph usage per face
    let mut shaped: HashMap<(FaceRole, &str), Vec<ShapedGlyph>> = HashMap::new();
    let mut usage: BTreeMap<FaceRole, GlyphUsage> = BTreeMap::new();
    let mut used_roles: BTreeSet<FaceRole> = BTreeSet::new();
    let mut needs_check_font = false;

    for op in doc.pages.iter().flat_map(|p| p.ops.iter()) {
        match op {
            DrawOp::Text { face, text, .. } => {
                used_roles.insert(*face);
                let Some(loaded) = fonts.loaded(*face) else {
                    continue;
                };
                let glyphs = shaped
                    .entry((*face, text.as_str()))
                    .or_insert_with(|| loaded.shape(text));
                let face_usage = usage.entry(*face).or_default();
                for g in glyphs.iter() {
                    face_usage.entry(g.gid).or_insert_with(|| g.text.clone());
                }
            }
            DrawOp::CheckMark { .. } => needs_check_font = true,
            _ => {}
        }
    }
    let t_shape = t0.elapsed();

    // Phase 2: embed faces (subset) or their Helvetica stand-ins
    let mut font_entries: BTreeMap<FaceRole, FontEntry> = BTreeMap::new();
    for &role in &used_roles {
        let font_ref = alloc();
        let gid_map = match (fonts.loaded(role), usage.get(&role)) {
            (Some(face), Some(face_usage)) => {
                let map = fonts::embed_face(&mut pdf, font_ref, &mut alloc, role, face, face_usage)
                    .ok_or_else(|| {
                        Error::Pdf(format!("could not embed font {}", role.file_name()))
                    })?;
                log::debug!(
                    "Embedded {} with {} glyphs",
                    role.file_name(),
                    face_usage.len()
                );
                Some(map)
            }
            _ => {
                fonts::embed_fallback(&mut pdf, font_ref, role);
                None
            }
        };
        font_entries.insert(role, FontEntry { font_ref, gid_map });
    }
    let check_font_ref = needs_check_font.then(|| {
        let r = alloc();
        pdf.type1_font(r).base_font(Name(b"ZapfDingbats"));
        r
    });
    let t_fonts = t0.elapsed();

    // Phase 3: the logo image, if any page draws it
    let draws_image = doc
        .pages
        .iter()
        .flat_map(|p| p.ops.iter())
        .any(|op| matches!(op, DrawOp::Image { .. }));
    let image_ref = match (&doc.image, draws_image) {
        (Some(img), true) => embed_image(&mut pdf, &mut alloc, img),
        _ => None,
    };
    let t_images = t0.elapsed();

    // Phase 4: content streams
    let n = doc.pages.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, page) in doc.pages.iter().enumerate() {
        let mut content = Content::new();
        for op in &page.ops {
            draw_op(
                &mut content,
                op,
                doc.page_height,
                &font_entries,
                &shaped,
                image_ref.is_some(),
            );
        }
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }
    let t_content = t0.elapsed();

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(
            0.0,
            0.0,
            doc.page_width * MM,
            doc.page_height * MM,
        ))
        .parent(pages_id)
        .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut font_dict = resources.fonts();
            for (role, entry) in &font_entries {
                font_dict.pair(Name(role.pdf_name().as_bytes()), entry.font_ref);
            }
            if let Some(r) = check_font_ref {
                font_dict.pair(Name(CHECK_FONT_NAME.as_bytes()), r);
            }
        }
        if let Some(r) = image_ref {
            resources.x_objects().pair(Name(LOGO_NAME.as_bytes()), r);
        }
    }

    let bytes = pdf.finish();
    log::info!(
        "Render phases: shape={:.1}ms, font_embed={:.1}ms, images={:.1}ms, content={:.1}ms, assembly={:.1}ms ({} pages, {} bytes)",
        t_shape.as_secs_f64() * 1000.0,
        (t_fonts - t_shape).as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_content - t_images).as_secs_f64() * 1000.0,
        (t0.elapsed() - t_content).as_secs_f64() * 1000.0,
        n,
        bytes.len(),
    );
    Ok(bytes)
}

fn set_fill(content: &mut Content, [r, g, b]: Rgb) {
    content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
}

fn set_stroke(content: &mut Content, [r, g, b]: Rgb) {
    content.set_stroke_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
}

fn draw_op(
    content: &mut Content,
    op: &DrawOp,
    page_height: f32,
    font_entries: &BTreeMap<FaceRole, FontEntry>,
    shaped: &HashMap<(FaceRole, &str), Vec<ShapedGlyph>>,
    has_image: bool,
) {
    let py = |y: f32| (page_height - y) * MM;
    match op {
        DrawOp::Text {
            x,
            y,
            size,
            face,
            color,
            text,
        } => {
            let Some(entry) = font_entries.get(face) else {
                return;
            };
            content.begin_text();
            set_fill(content, *color);
            content.set_font(Name(face.pdf_name().as_bytes()), *size);
            content.set_text_matrix([1.0, 0.0, 0.0, 1.0, x * MM, py(*y)]);
            match (&entry.gid_map, shaped.get(&(*face, text.as_str()))) {
                (Some(gid_map), Some(glyphs)) => {
                    let mut positioned = content.show_positioned();
                    let mut items = positioned.items();
                    let mut pending = 0.0f32;
                    for g in glyphs {
                        let Some(&new_gid) = gid_map.get(&g.gid) else {
                            continue;
                        };
                        pending -= g.x_offset;
                        if pending != 0.0 {
                            items.adjust(pending);
                        }
                        items.show(Str(&new_gid.to_be_bytes()));
                        // TJ adjustments are subtracted from the default advance
                        pending = g.default_advance - g.advance + g.x_offset;
                    }
                }
                _ => {
                    content.show(Str(&fonts::to_winansi_bytes(text)));
                }
            }
            content.end_text();
        }
        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            width,
            color,
            dash,
        } => {
            content.save_state();
            set_stroke(content, *color);
            content.set_line_width(width * MM);
            if let Some([on, off]) = dash {
                content.set_dash_pattern([on * MM, off * MM], 0.0);
            }
            content.move_to(x1 * MM, py(*y1));
            content.line_to(x2 * MM, py(*y2));
            content.stroke();
            content.restore_state();
        }
        DrawOp::Rect {
            x,
            y,
            w,
            h,
            fill,
            stroke,
            line_width,
        } => {
            content.save_state();
            if let Some(c) = fill {
                set_fill(content, *c);
            }
            if let Some(c) = stroke {
                set_stroke(content, *c);
                content.set_line_width(line_width * MM);
            }
            content.rect(x * MM, py(y + h), w * MM, h * MM);
            match (fill, stroke) {
                (Some(_), Some(_)) => content.fill_nonzero_and_stroke(),
                (Some(_), None) => content.fill_nonzero(),
                (None, Some(_)) => content.stroke(),
                (None, None) => content.end_path(),
            };
            content.restore_state();
        }
        DrawOp::CheckMark { x, y, size, color } => {
            content.begin_text();
            set_fill(content, *color);
            content.set_font(Name(CHECK_FONT_NAME.as_bytes()), *size);
            content.set_text_matrix([1.0, 0.0, 0.0, 1.0, x * MM, py(*y)]);
            content.show(Str(b"4"));
            content.end_text();
        }
        DrawOp::Image { x, y, w, h } => {
            if !has_image {
                return;
            }
            content.save_state();
            content.transform([w * MM, 0.0, 0.0, h * MM, x * MM, py(y + h)]);
            content.x_object(Name(LOGO_NAME.as_bytes()));
            content.restore_state();
        }
    }
}

fn embed_image(pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref, img: &EmbeddedImage) -> Option<Ref> {
    let xobj_ref = alloc();
    match img.format {
        ImageFormat::Jpeg => {
            let mut xobj = pdf.image_xobject(xobj_ref, &img.data);
            xobj.filter(Filter::DctDecode);
            xobj.width(img.pixel_width as i32);
            xobj.height(img.pixel_height as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
        }
        ImageFormat::Png => {
            let reader = image::ImageReader::with_format(
                std::io::Cursor::new(&img.data),
                image::ImageFormat::Png,
            );
            let decoded = match reader.decode() {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("Could not decode logo image: {e}");
                    return None;
                }
            };
            let rgba = decoded.to_rgba8();
            let (w, h) = (rgba.width(), rgba.height());
            let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

            let rgb_data: Vec<u8> = rgba
                .pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .collect();
            let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

            let smask_ref = if has_alpha {
                let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
                let mask_ref = alloc();
                let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w as i32);
                mask.height(h as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                Some(mask_ref)
            } else {
                None
            };

            let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w as i32);
            xobj.height(h as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
        }
    }
    Some(xobj_ref)
}
