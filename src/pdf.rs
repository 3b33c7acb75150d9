//! Images-to-PDF conversion: one page per image, fit to paper with a margin.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use printpdf::{Image, ImageTransform, Mm, PdfDocument, Pt};
use tracing::{info, warn};

use crate::error::{MakerError, MakerResult};

/// Extensions accepted as page sources.
pub const SUPPORTED_EXTENSIONS: [&str; 8] =
    ["jpg", "jpeg", "png", "webp", "bmp", "gif", "tiff", "tif"];

/// Page margin in points.
const MARGIN_PT: f64 = 36.0;

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// ISO paper sizes with dimensions in PostScript points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum PaperSize {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    A8,
    A9,
    A10,
    B0,
    B1,
    B2,
    B3,
    B4,
    B5,
    B6,
    B7,
    B8,
    B9,
    B10,
}

impl PaperSize {
    /// (width, height) in points, portrait orientation.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            Self::A0 => (2384.0, 3370.0),
            Self::A1 => (1684.0, 2384.0),
            Self::A2 => (1191.0, 1684.0),
            Self::A3 => (842.0, 1191.0),
            Self::A4 => (595.0, 842.0),
            Self::A5 => (420.0, 595.0),
            Self::A6 => (298.0, 420.0),
            Self::A7 => (210.0, 298.0),
            Self::A8 => (147.0, 210.0),
            Self::A9 => (105.0, 147.0),
            Self::A10 => (74.0, 105.0),
            Self::B0 => (2835.0, 4008.0),
            Self::B1 => (2004.0, 2835.0),
            Self::B2 => (1417.0, 2004.0),
            Self::B3 => (1001.0, 1417.0),
            Self::B4 => (709.0, 1001.0),
            Self::B5 => (499.0, 709.0),
            Self::B6 => (354.0, 499.0),
            Self::B7 => (249.0, 354.0),
            Self::B8 => (176.0, 249.0),
            Self::B9 => (125.0, 176.0),
            Self::B10 => (88.0, 125.0),
        }
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for PaperSize {
    type Err = MakerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A0" => Ok(Self::A0),
            "A1" => Ok(Self::A1),
            "A2" => Ok(Self::A2),
            "A3" => Ok(Self::A3),
            "A4" => Ok(Self::A4),
            "A5" => Ok(Self::A5),
            "A6" => Ok(Self::A6),
            "A7" => Ok(Self::A7),
            "A8" => Ok(Self::A8),
            "A9" => Ok(Self::A9),
            "A10" => Ok(Self::A10),
            "B0" => Ok(Self::B0),
            "B1" => Ok(Self::B1),
            "B2" => Ok(Self::B2),
            "B3" => Ok(Self::B3),
            "B4" => Ok(Self::B4),
            "B5" => Ok(Self::B5),
            "B6" => Ok(Self::B6),
            "B7" => Ok(Self::B7),
            "B8" => Ok(Self::B8),
            "B9" => Ok(Self::B9),
            "B10" => Ok(Self::B10),
            other => Err(MakerError::InvalidPaperSize(other.to_string())),
        }
    }
}

/// Placement of an image on a page, all in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale an image to the largest size that fits inside the margins while
/// keeping its aspect ratio, centered on both axes.
pub fn fit_rect(img_w: f64, img_h: f64, page_w: f64, page_h: f64, margin: f64) -> FitRect {
    let usable_w = page_w - 2.0 * margin;
    let usable_h = page_h - 2.0 * margin;

    let scale = (usable_w / img_w).min(usable_h / img_h);

    let width = img_w * scale;
    let height = img_h * scale;

    FitRect {
        x: (page_w - width) / 2.0,
        y: (page_h - height) / 2.0,
        width,
        height,
    }
}

/// Interpret the input argument and collect image paths, sorted.
///
/// Tried in order: existing directory, glob pattern (`*` or `?` present),
/// comma-separated list, single existing file. Anything else is invalid.
pub fn collect_images(input: &str) -> MakerResult<Vec<PathBuf>> {
    let as_path = Path::new(input);

    if as_path.is_dir() {
        return collect_from_directory(as_path);
    }

    if input.contains('*') || input.contains('?') {
        let mut images: Vec<PathBuf> = glob::glob(input)
            .map_err(|e| MakerError::InvalidInput(format!("{}: {}", input, e)))?
            .filter_map(Result::ok)
            .filter(|p| is_supported_image(p))
            .collect();
        images.sort();
        return Ok(images);
    }

    if input.contains(',') {
        let mut images: Vec<PathBuf> = input
            .split(',')
            .map(|s| PathBuf::from(s.trim()))
            .filter(|p| p.is_file() && is_supported_image(p))
            .collect();
        images.sort();
        return Ok(images);
    }

    if as_path.is_file() {
        if is_supported_image(as_path) {
            return Ok(vec![as_path.to_path_buf()]);
        }
        return Ok(Vec::new());
    }

    Err(MakerError::InvalidInput(input.to_string()))
}

fn collect_from_directory(dir: &Path) -> MakerResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(MakerError::NotADirectory(dir.to_path_buf()));
    }

    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_supported_image(p))
        .collect();
    images.sort();
    Ok(images)
}

/// Filesystem scanning on a blocking worker.
pub async fn collect_images_async(input: String) -> MakerResult<Vec<PathBuf>> {
    tokio::task::spawn_blocking(move || collect_images(&input))
        .await
        .map_err(|e| MakerError::Io(std::io::Error::other(e)))?
}

/// Render one page per image into a PDF at `output`.
///
/// An image that fails to decode is reported and skipped; the document still
/// renders with the remaining pages. Returns the number of pages written.
pub fn render_pdf(images: &[PathBuf], output: &Path, paper: PaperSize) -> MakerResult<usize> {
    let (page_w, page_h) = paper.dimensions();
    let page_w_mm = Mm::from(Pt(page_w));
    let page_h_mm = Mm::from(Pt(page_h));

    let (doc, first_page, first_layer) =
        PdfDocument::new("maker images", page_w_mm, page_h_mm, "Layer 1");

    let mut pages = 0usize;
    let mut first_page_used = false;

    for path in images {
        let decoded = match printpdf::image_crate::open(path) {
            Ok(img) => img,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable image");
                continue;
            }
        };

        let img_w = decoded.width() as f64;
        let img_h = decoded.height() as f64;
        let rect = fit_rect(img_w, img_h, page_w, page_h, MARGIN_PT);

        let layer = if first_page_used {
            let (page, layer) = doc.add_page(page_w_mm, page_h_mm, "Layer 1");
            doc.get_page(page).get_layer(layer)
        } else {
            first_page_used = true;
            doc.get_page(first_page).get_layer(first_layer)
        };

        let image = Image::from_dynamic_image(&decoded);
        // At 72 dpi one pixel is one point, so scale is target points over
        // source pixels.
        image.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm::from(Pt(rect.x))),
                translate_y: Some(Mm::from(Pt(rect.y))),
                scale_x: Some(rect.width / img_w),
                scale_y: Some(rect.height / img_h),
                dpi: Some(72.0),
                ..Default::default()
            },
        );

        pages += 1;
        info!(path = %path.display(), "added page");
    }

    let file = File::create(output)?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| MakerError::InvalidInput(format!("PDF write failed: {}", e)))?;

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_size_parsing() {
        assert_eq!("a4".parse::<PaperSize>().unwrap(), PaperSize::A4);
        assert_eq!("B10".parse::<PaperSize>().unwrap(), PaperSize::B10);
        assert!(matches!(
            "C4".parse::<PaperSize>(),
            Err(MakerError::InvalidPaperSize(_))
        ));
    }

    #[test]
    fn test_a4_dimensions() {
        assert_eq!(PaperSize::A4.dimensions(), (595.0, 842.0));
    }

    #[test]
    fn test_fit_wide_image_on_a4() {
        // 2000x1000 on A4: width-bound, scale = 523/2000
        let rect = fit_rect(2000.0, 1000.0, 595.0, 842.0, 36.0);
        assert!((rect.width - 523.0).abs() < 1e-9);
        assert!((rect.height - 261.5).abs() < 1e-9);
        assert!((rect.x - 36.0).abs() < 1e-9);
        assert!((rect.y - (842.0 - 261.5) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_tall_image_is_height_bound() {
        let rect = fit_rect(100.0, 1000.0, 595.0, 842.0, 36.0);
        assert!((rect.height - 770.0).abs() < 1e-9);
        assert!((rect.width - 77.0).abs() < 1e-9);
        // centered horizontally
        assert!((rect.x - (595.0 - 77.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_supported_extension_check() {
        assert!(is_supported_image(Path::new("a.JPG")));
        assert!(is_supported_image(Path::new("dir/b.webp")));
        assert!(!is_supported_image(Path::new("a.txt")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    #[test]
    fn test_collect_from_directory_sorted_and_filtered() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.png"), b"x").unwrap();
        std::fs::write(temp.path().join("a.jpg"), b"x").unwrap();
        std::fs::write(temp.path().join("notes.txt"), b"x").unwrap();

        let images = collect_images(temp.path().to_str().unwrap()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
    }

    #[test]
    fn test_collect_comma_list_keeps_existing_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let a = temp.path().join("a.png");
        std::fs::write(&a, b"x").unwrap();

        let input = format!("{}, {}", a.display(), temp.path().join("gone.png").display());
        let images = collect_images(&input).unwrap();
        assert_eq!(images, vec![a]);
    }

    #[test]
    fn test_collect_rejects_nonsense() {
        assert!(matches!(
            collect_images("/definitely/not/a/real/path"),
            Err(MakerError::InvalidInput(_))
        ));
    }
}
