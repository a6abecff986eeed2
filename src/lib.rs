pub mod ai;
pub mod config;
mod error;
mod fetch;
pub mod fonts;
pub mod model;
pub mod numbering;
pub mod pdf;
pub mod quotation;
pub mod receipts;
pub mod script;
pub mod storage;
pub mod tents;

pub use config::Config;
pub use error::{Error, Result};
pub use fonts::FontSet;
pub use model::{EmbeddedImage, Quotation, ReceiptDetails};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;

use numbering::ReceiptCounter;
use receipts::ReceiptDatabase;

/// Fonts and logo shared by every document produced in one run.
pub struct Assets {
    pub fonts: FontSet,
    pub logo: Option<EmbeddedImage>,
}

impl Assets {
    /// Helvetica everywhere, no logo. Needs no files or network.
    pub fn fallback() -> Self {
        Assets {
            fonts: FontSet::fallback(),
            logo: None,
        }
    }
}

fn load_logo(location: &str) -> Option<EmbeddedImage> {
    let bytes = fetch::fetch_bytes(location)
        .inspect_err(|e| log::warn!("Could not load logo from {location}: {e}"))
        .ok()?;
    let image = EmbeddedImage::from_bytes(bytes);
    if image.is_none() {
        log::warn!("Logo at {location} is not a PNG or JPEG image, leaving space empty");
    }
    image
}

/// Resolve fonts and fetch the logo concurrently.
pub fn load_assets(font_candidates: &[String], logo: Option<&str>) -> Assets {
    let t0 = Instant::now();
    let (fonts, logo) = std::thread::scope(|s| {
        let logo_handle = logo.map(|location| s.spawn(move || load_logo(location)));
        let fonts = FontSet::resolve(font_candidates);
        let logo = logo_handle.and_then(|h| h.join().ok().flatten());
        (fonts, logo)
    });
    log::info!(
        "Assets ready in {:.1}ms (logo {})",
        t0.elapsed().as_secs_f64() * 1000.0,
        if logo.is_some() { "loaded" } else { "absent" }
    );
    Assets { fonts, logo }
}

fn write_output(out_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(file_name);
    std::fs::write(&path, bytes)?;
    Ok(path)
}

#[derive(Debug, Clone)]
pub struct GeneratedReceipt {
    pub path: PathBuf,
    pub receipt_number: String,
    /// Id in the receipt log. `None` for previews.
    pub record_id: Option<String>,
}

/// Numbers, renders and records receipts.
pub struct ReceiptGenerator<'a> {
    store: &'a dyn KeyValueStore,
    assets: &'a Assets,
    prefix: String,
}

impl<'a> ReceiptGenerator<'a> {
    pub fn new(
        store: &'a dyn KeyValueStore,
        assets: &'a Assets,
        prefix: impl Into<String>,
    ) -> Self {
        ReceiptGenerator {
            store,
            assets,
            prefix: prefix.into(),
        }
    }

    /// The number the next generated receipt will carry.
    pub fn next_number(&self) -> String {
        let counter = ReceiptCounter::new(self.store, self.prefix.clone());
        counter.format(counter.peek())
    }

    /// Lay out and serialize one receipt as it stands.
    pub fn render(&self, details: &ReceiptDetails) -> Result<Vec<u8>> {
        let logo = self.assets.logo.clone();
        let doc = pdf::receipt::layout_receipt(details, &self.assets.fonts, logo);
        pdf::render(&doc, &self.assets.fonts)
    }

    /// Assign the next number, write the PDF into `out_dir`, then advance the
    /// counter and store the record. A failure before the file is written
    /// leaves the counter and the log untouched.
    pub fn generate(&self, details: &ReceiptDetails, out_dir: &Path) -> Result<GeneratedReceipt> {
        let t0 = Instant::now();
        let counter = ReceiptCounter::new(self.store, self.prefix.clone());
        let number = counter.peek();

        let mut numbered = details.clone();
        numbered.receipt_number = counter.format(number);

        let bytes = self.render(&numbered)?;
        let t_render = t0.elapsed();

        let name = pdf::receipt::file_name(&numbered, Local::now());
        let path = write_output(out_dir, &name, &bytes)?;
        let t_write = t0.elapsed();

        counter.commit(number)?;
        let record_id = ReceiptDatabase::new(self.store).save(&numbered)?;

        log::info!(
            "Timing: render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
            t_render.as_secs_f64() * 1000.0,
            (t_write - t_render).as_secs_f64() * 1000.0,
            t0.elapsed().as_secs_f64() * 1000.0,
            bytes.len(),
        );
        log::info!("Generated receipt {} at {}", numbered.receipt_number, path.display());

        Ok(GeneratedReceipt {
            path,
            receipt_number: numbered.receipt_number,
            record_id: Some(record_id),
        })
    }

    /// Render without numbering or recording anything.
    pub fn preview(&self, details: &ReceiptDetails, out_dir: &Path) -> Result<GeneratedReceipt> {
        let bytes = self.render(details)?;
        let name = pdf::receipt::file_name(details, Local::now());
        let path = write_output(out_dir, &name, &bytes)?;
        log::info!("Preview written to {}", path.display());
        Ok(GeneratedReceipt {
            path,
            receipt_number: details.receipt_number.clone(),
            record_id: None,
        })
    }
}

/// Render a quotation to `<out_dir>/<base>_Quotation.pdf`.
pub fn generate_quotation(
    quotation: &Quotation,
    fonts: &FontSet,
    base: &str,
    out_dir: &Path,
) -> Result<PathBuf> {
    let t0 = Instant::now();
    let doc = pdf::quotation::layout_quotation(quotation, fonts);
    let bytes = pdf::render(&doc, fonts)?;
    let path = write_output(out_dir, &pdf::quotation::file_name(base), &bytes)?;
    log::info!(
        "Quotation written to {} ({} page(s), {} bytes, {:.1}ms)",
        path.display(),
        doc.pages.len(),
        bytes.len(),
        t0.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(path)
}
