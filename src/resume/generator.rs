//! Resume PDF rendering.
//!
//! Letter-size pages, cursor-based flow from the top margin down, breaking to
//! a new page when a block would not fit. Glyph widths are estimated at half
//! the font size, which is close enough for Helvetica-class faces to center
//! headers and wrap body text.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Pt, Rgb,
};
use tracing::warn;

use crate::error::{MakerError, MakerResult};
use crate::resume::fonts::{FontPaths, FontResolver};
use crate::resume::models::{Basics, Education, Project, Resume, Skill, Work};

const PAGE_W: f64 = 612.0;
const PAGE_H: f64 = 792.0;
const MARGIN_H: f64 = 54.0;
const MARGIN_V: f64 = 27.0;

const SIZE_NAME: f64 = 24.0;
const SIZE_SECTION: f64 = 14.0;
const SIZE_BODY: f64 = 10.0;
const SIZE_SMALL: f64 = 9.0;

const GLYPH_WIDTH_EM: f64 = 0.5;

/// Month abbreviation for an ISO `YYYY-MM` date; bare years and full dates
/// pass through unchanged.
pub fn format_date(date: &str) -> String {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() == 2 {
        if let Ok(month) = parts[1].parse::<usize>() {
            if (1..=12).contains(&month) {
                return format!("{} {}", MONTHS[month - 1], parts[0]);
            }
        }
    }
    date.to_string()
}

/// `start - end`, with a missing end rendered as "Present".
pub fn format_date_range(start: Option<&str>, end: Option<&str>) -> String {
    if start.is_none() && end.is_none() {
        return String::new();
    }

    let start_str = start.map(format_date).unwrap_or_default();
    let end_str = end.map(format_date).unwrap_or_else(|| "Present".to_string());

    if start_str.is_empty() {
        end_str
    } else {
        format!("{} - {}", start_str, end_str)
    }
}

fn estimated_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * GLYPH_WIDTH_EM
}

/// Greedy word wrap against an estimated line width.
fn wrap_text(text: &str, size: f64, max_width: f64) -> Vec<String> {
    let max_chars = ((max_width / (size * GLYPH_WIDTH_EM)) as usize).max(8);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

struct FontSet {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Top-down layout cursor over a growing document.
struct Layout {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    y: f64,
}

impl Layout {
    fn new(title: &str) -> Self {
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm::from(Pt(PAGE_W)),
            Mm::from(Pt(PAGE_H)),
            "Layer 1",
        );
        let layer_ref = doc.get_page(page).get_layer(layer);
        Self {
            doc,
            layer: layer_ref,
            y: PAGE_H - MARGIN_V,
        }
    }

    fn ensure_space(&mut self, needed: f64) {
        if self.y - needed < MARGIN_V {
            let (page, layer) = self.doc.add_page(
                Mm::from(Pt(PAGE_W)),
                Mm::from(Pt(PAGE_H)),
                "Layer 1",
            );
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_H - MARGIN_V;
        }
    }

    fn text_at(&mut self, text: &str, size: f64, font: &IndirectFontRef, x: f64) {
        let leading = size * 1.2;
        self.ensure_space(leading);
        self.y -= leading;
        self.layer
            .use_text(text, size, Mm::from(Pt(x)), Mm::from(Pt(self.y)), font);
    }

    fn line(&mut self, text: &str, size: f64, font: &IndirectFontRef) {
        self.text_at(text, size, font, MARGIN_H);
    }

    fn centered(&mut self, text: &str, size: f64, font: &IndirectFontRef) {
        let x = ((PAGE_W - estimated_width(text, size)) / 2.0).max(MARGIN_H);
        self.text_at(text, size, font, x);
    }

    fn wrapped(&mut self, text: &str, size: f64, font: &IndirectFontRef, indent: f64) {
        let max_width = PAGE_W - 2.0 * MARGIN_H - indent;
        for line in wrap_text(text, size, max_width) {
            self.text_at(&line, size, font, MARGIN_H + indent);
        }
    }

    fn gray(&mut self) {
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None)));
    }

    fn black(&mut self) {
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    }

    fn space(&mut self, pts: f64) {
        self.y -= pts;
    }
}

pub struct ResumeGenerator {
    font_name: String,
    download_fonts: bool,
    fonts_dir: PathBuf,
}

impl ResumeGenerator {
    pub fn new(
        font_name: impl Into<String>,
        download_fonts: bool,
        fonts_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            font_name: font_name.into(),
            download_fonts,
            fonts_dir: fonts_dir.into(),
        }
    }

    /// Resolve the configured font, render, and write the PDF.
    ///
    /// A non-builtin font that cannot be resolved (or embedded) falls back
    /// to Helvetica with a warning rather than failing the render.
    pub async fn generate(&self, resume: &Resume, output: &Path) -> MakerResult<()> {
        let font_paths = self.resolve_font().await;

        let resume = resume.clone();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || render(&resume, &output, font_paths))
            .await
            .map_err(|e| MakerError::Io(std::io::Error::other(e)))?
    }

    async fn resolve_font(&self) -> Option<FontPaths> {
        let lower = self.font_name.to_ascii_lowercase();
        if matches!(lower.as_str(), "helvetica" | "times" | "courier") {
            return None;
        }

        let resolver = FontResolver::new(&self.fonts_dir);
        match resolver.resolve(&self.font_name, self.download_fonts).await {
            Ok(paths) => Some(paths),
            Err(e) => {
                warn!(font = %self.font_name, error = %e, "font not available, using Helvetica");
                None
            }
        }
    }
}

fn load_fonts(doc: &PdfDocumentReference, paths: Option<FontPaths>) -> MakerResult<FontSet> {
    if let Some(paths) = paths {
        match load_external_fonts(doc, &paths) {
            Ok(set) => return Ok(set),
            Err(e) => {
                warn!(error = %e, "font embedding failed, using Helvetica");
            }
        }
    }

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;
    Ok(FontSet { regular, bold })
}

fn load_external_fonts(doc: &PdfDocumentReference, paths: &FontPaths) -> MakerResult<FontSet> {
    let regular = doc
        .add_external_font(File::open(&paths.regular)?)
        .map_err(pdf_error)?;

    let bold = match &paths.bold {
        Some(bold_path) => doc
            .add_external_font(File::open(bold_path)?)
            .map_err(pdf_error)?,
        None => regular.clone(),
    };

    Ok(FontSet { regular, bold })
}

fn pdf_error(e: printpdf::Error) -> MakerError {
    MakerError::InvalidInput(format!("PDF generation failed: {}", e))
}

fn render(resume: &Resume, output: &Path, font_paths: Option<FontPaths>) -> MakerResult<()> {
    let mut layout = Layout::new(&resume.basics.name);
    let fonts = load_fonts(&layout.doc, font_paths)?;

    render_basics(&mut layout, &fonts, &resume.basics);

    if !resume.work.is_empty() {
        render_work(&mut layout, &fonts, &resume.work);
    }
    if !resume.education.is_empty() {
        render_education(&mut layout, &fonts, &resume.education);
    }
    if !resume.skills.is_empty() {
        render_skills(&mut layout, &fonts, &resume.skills);
    }
    if !resume.projects.is_empty() {
        render_projects(&mut layout, &fonts, &resume.projects);
    }

    // save() unwraps the document's Rc; the layout holds the only strong handle
    let Layout { doc, .. } = layout;

    let file = File::create(output)?;
    doc.save(&mut BufWriter::new(file)).map_err(pdf_error)?;
    Ok(())
}

fn section_header(layout: &mut Layout, fonts: &FontSet, title: &str) {
    layout.space(12.0);
    layout.line(title, SIZE_SECTION, &fonts.bold);
    layout.space(6.0);
}

fn render_basics(layout: &mut Layout, fonts: &FontSet, basics: &Basics) {
    layout.centered(&basics.name, SIZE_NAME, &fonts.bold);
    layout.space(4.0);

    if let Some(label) = &basics.label {
        layout.centered(label, SIZE_BODY + 2.0, &fonts.regular);
        layout.space(8.0);
    }

    let mut contact: Vec<String> = Vec::new();
    if let Some(email) = &basics.email {
        contact.push(email.clone());
    }
    if let Some(phone) = &basics.phone {
        contact.push(phone.clone());
    }
    if let Some(url) = &basics.url {
        contact.push(url.clone());
    }
    if let Some(loc) = &basics.location {
        let parts: Vec<&str> = [&loc.city, &loc.region, &loc.country_code]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        if !parts.is_empty() {
            contact.push(parts.join(", "));
        }
    }
    if !contact.is_empty() {
        layout.gray();
        layout.centered(&contact.join(" | "), SIZE_SMALL, &fonts.regular);
        layout.black();
        layout.space(12.0);
    }

    if let Some(summary) = &basics.summary {
        layout.space(8.0);
        layout.wrapped(summary, SIZE_BODY, &fonts.regular, 0.0);
    }
}

fn render_work(layout: &mut Layout, fonts: &FontSet, entries: &[Work]) {
    section_header(layout, fonts, "Experience");

    for entry in entries {
        if entry.name.is_none() && entry.position.is_none() {
            continue;
        }

        let title = match (&entry.position, &entry.name) {
            (Some(pos), Some(name)) => format!("{} at {}", pos, name),
            (Some(pos), None) => pos.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => unreachable!(),
        };
        layout.space(6.0);
        layout.line(&title, SIZE_BODY + 1.0, &fonts.bold);

        let dates = format_date_range(entry.start_date.as_deref(), entry.end_date.as_deref());
        if !dates.is_empty() {
            layout.gray();
            layout.line(&dates, SIZE_SMALL, &fonts.regular);
            layout.black();
        }

        if let Some(summary) = &entry.summary {
            layout.wrapped(summary, SIZE_BODY, &fonts.regular, 0.0);
        }

        for highlight in &entry.highlights {
            layout.wrapped(&format!("\u{2022} {}", highlight), SIZE_BODY, &fonts.regular, 6.0);
        }
    }
}

fn render_education(layout: &mut Layout, fonts: &FontSet, entries: &[Education]) {
    section_header(layout, fonts, "Education");

    for entry in entries {
        let Some(institution) = &entry.institution else {
            continue;
        };

        let degree: Vec<&str> = [&entry.study_type, &entry.area]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        let title = if degree.is_empty() {
            institution.clone()
        } else {
            format!("{} - {}", degree.join(", "), institution)
        };
        layout.space(6.0);
        layout.line(&title, SIZE_BODY + 1.0, &fonts.bold);

        let mut subtitle: Vec<String> = Vec::new();
        let dates = format_date_range(entry.start_date.as_deref(), entry.end_date.as_deref());
        if !dates.is_empty() {
            subtitle.push(dates);
        }
        if let Some(score) = &entry.score {
            subtitle.push(format!("Score: {}", score));
        }
        if !subtitle.is_empty() {
            layout.gray();
            layout.line(&subtitle.join(" | "), SIZE_SMALL, &fonts.regular);
            layout.black();
        }
    }
}

fn render_skills(layout: &mut Layout, fonts: &FontSet, skills: &[Skill]) {
    section_header(layout, fonts, "Skills");

    for skill in skills {
        let Some(name) = &skill.name else {
            continue;
        };

        let text = if skill.keywords.is_empty() {
            name.clone()
        } else {
            format!("{}: {}", name, skill.keywords.join(", "))
        };
        layout.wrapped(&text, SIZE_BODY, &fonts.regular, 0.0);
        layout.space(4.0);
    }
}

fn render_projects(layout: &mut Layout, fonts: &FontSet, projects: &[Project]) {
    section_header(layout, fonts, "Projects");

    for project in projects {
        let Some(name) = &project.name else {
            continue;
        };

        let title = match &project.url {
            Some(url) => format!("{} ({})", name, url),
            None => name.clone(),
        };
        layout.space(6.0);
        layout.line(&title, SIZE_BODY + 1.0, &fonts.bold);

        if let Some(description) = &project.description {
            layout.wrapped(description, SIZE_BODY, &fonts.regular, 0.0);
        }

        let dates = format_date_range(project.start_date.as_deref(), project.end_date.as_deref());
        if !dates.is_empty() {
            layout.gray();
            layout.line(&dates, SIZE_SMALL, &fonts.regular);
            layout.black();
        }

        for highlight in &project.highlights {
            layout.wrapped(&format!("\u{2022} {}", highlight), SIZE_BODY, &fonts.regular, 6.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume::models::Resume;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2020-03"), "Mar 2020");
        assert_eq!(format_date("2020-12"), "Dec 2020");
        assert_eq!(format_date("2020"), "2020");
        assert_eq!(format_date("2020-03-15"), "2020-03-15");
        assert_eq!(format_date("2020-13"), "2020-13");
    }

    #[test]
    fn test_format_date_range() {
        assert_eq!(
            format_date_range(Some("2020-03"), Some("2022-01")),
            "Mar 2020 - Jan 2022"
        );
        assert_eq!(format_date_range(Some("2020-03"), None), "Mar 2020 - Present");
        assert_eq!(format_date_range(None, Some("2022-01")), "Jan 2022");
        assert_eq!(format_date_range(None, None), "");
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four five six", 10.0, 60.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 12));
        assert_eq!(lines.join(" "), "one two three four five six");
    }

    #[test]
    fn test_wrap_never_drops_long_words() {
        let lines = wrap_text("supercalifragilisticexpialidocious", 10.0, 40.0);
        assert_eq!(lines, vec!["supercalifragilisticexpialidocious"]);
    }

    #[tokio::test]
    async fn test_generate_with_builtin_font() {
        let temp = tempfile::TempDir::new().unwrap();
        let json = r#"{
            "basics": {
                "name": "Ada Lovelace",
                "label": "Engineer",
                "email": "ada@example.com",
                "summary": "Wrote the first program."
            },
            "work": [{
                "name": "Analytical Engine Co",
                "position": "Programmer",
                "startDate": "1842-06",
                "highlights": ["Published the first algorithm"]
            }],
            "skills": [{"name": "Mathematics", "keywords": ["analysis", "notes"]}]
        }"#;
        let resume: Resume = serde_json::from_str(json).unwrap();

        let generator = ResumeGenerator::new("Helvetica", false, temp.path().join("fonts"));
        let output = temp.path().join("resume.pdf");
        generator.generate(&resume, &output).await.unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }
}
