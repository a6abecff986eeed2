use std::collections::{BTreeMap, HashMap};

use pdf_writer::{Name, Pdf, Rect, Ref};
use rustybuzz::{Direction, UnicodeBuffer};
use ttf_parser::Face;
use unicode_bidi::BidiInfo;

use crate::fetch::{fetch_bytes, join_location};
use crate::script::Script;

/// The four logical faces a document draws with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaceRole {
    LatinRegular,
    LatinBold,
    ArabicRegular,
    ArabicBold,
}

impl FaceRole {
    pub const ALL: [FaceRole; 4] = [
        FaceRole::LatinRegular,
        FaceRole::LatinBold,
        FaceRole::ArabicRegular,
        FaceRole::ArabicBold,
    ];

    pub fn for_script(script: Script, bold: bool) -> FaceRole {
        match (script, bold) {
            (Script::Latin, false) => FaceRole::LatinRegular,
            (Script::Latin, true) => FaceRole::LatinBold,
            (Script::Arabic, false) => FaceRole::ArabicRegular,
            (Script::Arabic, true) => FaceRole::ArabicBold,
        }
    }

    pub fn family(self) -> &'static str {
        match self {
            FaceRole::LatinRegular | FaceRole::LatinBold => "Inter",
            FaceRole::ArabicRegular | FaceRole::ArabicBold => "NotoKufiArabic",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            FaceRole::LatinRegular => "Inter-Regular.ttf",
            FaceRole::LatinBold => "Inter-Bold.ttf",
            FaceRole::ArabicRegular => "NotoKufiArabic-Regular.ttf",
            FaceRole::ArabicBold => "NotoKufiArabic-Bold.ttf",
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, FaceRole::LatinBold | FaceRole::ArabicBold)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub(crate) fn pdf_name(self) -> &'static str {
        match self {
            FaceRole::LatinRegular => "F1",
            FaceRole::LatinBold => "F2",
            FaceRole::ArabicRegular => "F3",
            FaceRole::ArabicBold => "F4",
        }
    }

    fn fallback_base_font(self) -> &'static [u8] {
        if self.is_bold() {
            b"Helvetica-Bold"
        } else {
            b"Helvetica"
        }
    }
}

/// A custom face whose bytes were fetched and parsed.
pub struct LoadedFace {
    data: Vec<u8>,
    pub origin: String,
    units_per_em: f32,
    pub(crate) ascender_ratio: f32,
    pub(crate) line_h_ratio: f32,
}

pub enum FaceState {
    Loaded(LoadedFace),
    Fallback,
}

/// One shaped glyph, advances in 1000-units.
#[derive(Clone, Debug)]
pub(crate) struct ShapedGlyph {
    pub(crate) gid: u16,
    pub(crate) advance: f32,
    pub(crate) default_advance: f32,
    pub(crate) x_offset: f32,
    pub(crate) text: String,
}

impl LoadedFace {
    pub fn parse(data: Vec<u8>, origin: String) -> Option<LoadedFace> {
        let face = Face::parse(&data, 0).ok()?;
        let units = face.units_per_em() as f32;
        let ascender_ratio = face.ascender() as f32 / units;
        let line_h_ratio =
            (face.ascender() as f32 - face.descender() as f32 + face.line_gap() as f32) / units;
        Some(LoadedFace {
            units_per_em: units,
            ascender_ratio,
            line_h_ratio,
            data,
            origin,
        })
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shape `text` into glyphs in visual (left-to-right) order. Bidi runs are
    /// resolved first so digits and Latin fragments inside Arabic text keep
    /// their reading order.
    pub(crate) fn shape(&self, text: &str) -> Vec<ShapedGlyph> {
        let Some(hb_face) = rustybuzz::Face::from_slice(&self.data, 0) else {
            return Vec::new();
        };
        let Ok(ttf) = Face::parse(&self.data, 0) else {
            return Vec::new();
        };
        let scale = 1000.0 / self.units_per_em;

        let mut out = Vec::new();
        let bidi = BidiInfo::new(text, None);
        for para in &bidi.paragraphs {
            let line = para.range.clone();
            let (levels, runs) = bidi.visual_runs(para, line);
            for run in runs {
                let run_text = &text[run.clone()];
                if run_text.is_empty() {
                    continue;
                }
                let mut buffer = UnicodeBuffer::new();
                buffer.push_str(run_text);
                buffer.guess_segment_properties();
                buffer.set_direction(if levels[run.start].is_rtl() {
                    Direction::RightToLeft
                } else {
                    Direction::LeftToRight
                });
                let output = rustybuzz::shape(&hb_face, &[], buffer);

                let mut boundaries: Vec<usize> =
                    output.glyph_infos().iter().map(|g| g.cluster as usize).collect();
                boundaries.sort_unstable();
                boundaries.dedup();
                if boundaries.last().copied() != Some(run_text.len()) {
                    boundaries.push(run_text.len());
                }

                for (info, pos) in output.glyph_infos().iter().zip(output.glyph_positions()) {
                    let gid = info.glyph_id as u16;
                    let start = (info.cluster as usize).min(run_text.len());
                    let idx = boundaries.binary_search(&start).unwrap_or_else(|i| i);
                    let end = boundaries
                        .get(idx + 1)
                        .copied()
                        .unwrap_or(run_text.len())
                        .min(run_text.len());
                    let default_advance = ttf
                        .glyph_hor_advance(ttf_parser::GlyphId(gid))
                        .map(|a| a as f32 * scale)
                        .unwrap_or(0.0);
                    out.push(ShapedGlyph {
                        gid,
                        advance: pos.x_advance as f32 * scale,
                        default_advance,
                        x_offset: pos.x_offset as f32 * scale,
                        text: run_text.get(start..end).unwrap_or_default().to_string(),
                    });
                }
            }
        }
        out
    }
}

pub struct FontSet {
    faces: Vec<FaceState>,
}

impl FontSet {
    /// A font set where every face fell back to Helvetica.
    pub fn fallback() -> FontSet {
        FontSet {
            faces: FaceRole::ALL.iter().map(|_| FaceState::Fallback).collect(),
        }
    }

    /// Resolve all four faces against the ordered candidate bases. Each face
    /// is loaded on its own thread; returns once all four have resolved.
    pub fn resolve(candidates: &[String]) -> FontSet {
        let t0 = std::time::Instant::now();
        let faces: Vec<FaceState> = std::thread::scope(|s| {
            let handles: Vec<_> = FaceRole::ALL
                .iter()
                .map(|&role| (role, s.spawn(move || load_face(role, candidates))))
                .collect();
            handles
                .into_iter()
                .map(|(role, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        log::warn!("Font loader for {} panicked — using Helvetica", role.file_name());
                        FaceState::Fallback
                    })
                })
                .collect()
        });

        let set = FontSet { faces };
        log::info!(
            "Font resolution: {:.1}ms, loaded [{}]",
            t0.elapsed().as_secs_f64() * 1000.0,
            FaceRole::ALL
                .iter()
                .map(|&r| format!("{}={}", r.file_name(), set.is_loaded(r)))
                .collect::<Vec<_>>()
                .join(", "),
        );
        if !set.is_loaded(FaceRole::ArabicRegular) || !set.is_loaded(FaceRole::ArabicBold) {
            log::warn!("Arabic fonts failed to load. Arabic text may not display correctly.");
        }
        set
    }

    pub fn state(&self, role: FaceRole) -> &FaceState {
        &self.faces[role.index()]
    }

    pub fn is_loaded(&self, role: FaceRole) -> bool {
        matches!(self.state(role), FaceState::Loaded(_))
    }

    pub(crate) fn loaded(&self, role: FaceRole) -> Option<&LoadedFace> {
        match self.state(role) {
            FaceState::Loaded(face) => Some(face),
            FaceState::Fallback => None,
        }
    }

    /// Advance width of `text` in points at `font_size` points.
    pub fn text_width(&self, role: FaceRole, text: &str, font_size: f32) -> f32 {
        match self.loaded(role) {
            Some(face) => {
                face.shape(text).iter().map(|g| g.advance).sum::<f32>() * font_size / 1000.0
            }
            None => {
                let widths = helvetica_widths();
                to_winansi_bytes(text)
                    .iter()
                    .filter(|&&b| b >= 32)
                    .map(|&b| widths[(b - 32) as usize] * font_size / 1000.0)
                    .sum()
            }
        }
    }

    pub fn ascender_ratio(&self, role: FaceRole) -> f32 {
        self.loaded(role).map(|f| f.ascender_ratio).unwrap_or(0.75)
    }

    pub fn line_h_ratio(&self, role: FaceRole) -> f32 {
        self.loaded(role).map(|f| f.line_h_ratio).unwrap_or(1.2)
    }
}

fn load_face(role: FaceRole, candidates: &[String]) -> FaceState {
    for base in candidates {
        let location = join_location(base, role.file_name());
        log::debug!("Attempting to load font from: {location}");
        match fetch_bytes(&location) {
            Ok(data) => match LoadedFace::parse(data, location.clone()) {
                Some(face) => {
                    log::info!("Loaded font {} ({}) from {location}", role.file_name(), role.family());
                    return FaceState::Loaded(face);
                }
                None => log::warn!("Font data at {location} could not be parsed"),
            },
            Err(e) => log::warn!("Failed to fetch font {} from {location}: {e}", role.file_name()),
        }
    }
    log::warn!(
        "Failed to load font {} from all attempted paths — using Helvetica",
        role.file_name()
    );
    FaceState::Fallback
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007F => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes for the fallback
/// face. Characters outside the code page (Arabic included) are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(char_to_winansi)
        .filter(|&b| b != 0)
        .collect()
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths() -> &'static [f32; 224] {
    static WIDTHS: std::sync::OnceLock<[f32; 224]> = std::sync::OnceLock::new();
    WIDTHS.get_or_init(|| {
        let mut w = [556.0f32; 224];
        for b in 32u8..=255u8 {
            w[(b - 32) as usize] = match b {
                32 => 278.0,                          // space
                33..=47 => 333.0,                     // punctuation
                48..=57 => 556.0,                     // digits
                58..=64 => 333.0,                     // more punctuation
                73 | 74 => 278.0,                     // I J (narrow uppercase)
                77 => 833.0,                          // M (wide)
                65..=90 => 667.0,                     // uppercase A-Z (average)
                91..=96 => 333.0,                     // brackets etc.
                102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
                109 | 119 => 833.0,                   // m w (wide)
                97..=122 => 556.0,                    // lowercase a-z (average)
                _ => 556.0,
            };
        }
        w
    })
}

/// Glyph usage for one embedded face: original glyph id → source text.
pub(crate) type GlyphUsage = BTreeMap<u16, String>;

/// Embed a loaded face as a CIDFont (Type0 composite) with Identity-H encoding,
/// subset to the glyphs in `usage`. Returns the old → new glyph id map.
pub(crate) fn embed_face(
    pdf: &mut Pdf,
    font_ref: Ref,
    alloc: &mut impl FnMut() -> Ref,
    role: FaceRole,
    face_data: &LoadedFace,
    usage: &GlyphUsage,
) -> Option<HashMap<u16, u16>> {
    let face = Face::parse(face_data.data(), 0).ok()?;
    let descriptor_ref = alloc();
    let data_ref = alloc();

    let units = face.units_per_em() as f32;
    let ascent = face.ascender() as f32 / units * 1000.0;
    let descent = face.descender() as f32 / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 / units * 1000.0)
        .unwrap_or(700.0);

    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        bb.x_min as f32 / units * 1000.0,
        bb.y_min as f32 / units * 1000.0,
        bb.x_max as f32 / units * 1000.0,
        bb.y_max as f32 / units * 1000.0,
    );

    let mut remapper = subsetter::GlyphRemapper::new();
    let mut gid_map = HashMap::new();
    for &gid in usage.keys() {
        gid_map.insert(gid, remapper.remap(gid));
    }

    let ps_name = format!("{}-{}", role.family(), if role.is_bold() { "Bold" } else { "Regular" });
    let subset_data = subsetter::subset(face_data.data(), 0, &remapper).unwrap_or_else(|e| {
        log::warn!("Font subsetting failed for {ps_name}: {e} — embedding full font");
        face_data.data().to_vec()
    });

    let data_len = i32::try_from(subset_data.len()).ok()?;
    pdf.stream(data_ref, &subset_data)
        .pair(Name(b"Length1"), data_len);

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(descent)
        .cap_height(cap_height)
        .stem_v(if role.is_bold() { 120.0 } else { 80.0 })
        .font_file2(data_ref);

    let cid_font_ref = alloc();
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        });
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        let mut gid_widths: Vec<(u16, f32)> = gid_map
            .iter()
            .map(|(&old, &new)| {
                let w = face
                    .glyph_hor_advance(ttf_parser::GlyphId(old))
                    .map(|adv| adv as f32 / units * 1000.0)
                    .unwrap_or(0.0);
                (new, w)
            })
            .collect();
        gid_widths.sort_by_key(|&(gid, _)| gid);
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for &(gid, width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let tounicode_ref = alloc();
    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = pdf_writer::types::UnicodeCmap::new(
        Name(cmap_name.as_bytes()),
        pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        },
    );
    for (old, text) in usage {
        if text.is_empty() {
            continue;
        }
        if let Some(&new) = gid_map.get(old) {
            cmap.pair_with_multiple(new, text.chars());
        }
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    Some(gid_map)
}

/// Write a base-14 Helvetica stand-in for a face that fell back.
pub(crate) fn embed_fallback(pdf: &mut Pdf, font_ref: Ref, role: FaceRole) {
    pdf.type1_font(font_ref)
        .base_font(Name(role.fallback_base_font()))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_widths_scale_with_size() {
        let fonts = FontSet::fallback();
        let w10 = fonts.text_width(FaceRole::LatinRegular, "AMOUNT", 10.0);
        let w20 = fonts.text_width(FaceRole::LatinRegular, "AMOUNT", 20.0);
        assert!(w10 > 0.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-3);
    }

    #[test]
    fn fallback_drops_arabic_glyphs() {
        let fonts = FontSet::fallback();
        assert_eq!(fonts.text_width(FaceRole::ArabicRegular, "مبلغ", 10.0), 0.0);
        assert!(to_winansi_bytes("NO: TKR2025-0001").len() == 16);
    }

    #[test]
    fn roles_map_scripts_to_faces() {
        assert_eq!(FaceRole::for_script(Script::Arabic, true), FaceRole::ArabicBold);
        assert_eq!(FaceRole::for_script(Script::Latin, false), FaceRole::LatinRegular);
        assert_eq!(FaceRole::ArabicBold.family(), "NotoKufiArabic");
    }

    #[test]
    fn unresolvable_candidates_fall_back() {
        let dir = std::env::temp_dir().join("tkr-receipts-no-fonts-here");
        let fonts = FontSet::resolve(&[dir.to_string_lossy().into_owned()]);
        for role in FaceRole::ALL {
            assert!(!fonts.is_loaded(role));
        }
    }
}
