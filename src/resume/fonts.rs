//! TTF discovery and Google Fonts download.
//!
//! System font directories are searched for files named like
//! `FontName-Regular.ttf` / `FontName-Bold.ttf`. When that fails and
//! downloading is enabled, the Google Fonts CSS2 API is queried and the
//! referenced font files cached under the configured fonts directory, with a
//! `manifest.json` mapping family names to cached paths.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MakerError, MakerResult};

const FONT_MANIFEST_FILE: &str = "manifest.json";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// An old, simple user agent makes the CSS2 API serve TTF urls instead of
/// woff2, which is the format we can embed.
const CSS_USER_AGENT: &str = "Safari/5.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

/// Paths to the discovered or downloaded variant files of one family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontPaths {
    pub regular: PathBuf,
    pub bold: Option<PathBuf>,
    pub italic: Option<PathBuf>,
    pub bold_italic: Option<PathBuf>,
}

/// Platform-specific system font directories.
pub fn system_font_dirs() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        let mut dirs = vec![
            PathBuf::from("/Library/Fonts"),
            PathBuf::from("/System/Library/Fonts"),
        ];
        if let Some(home) = dirs::home_dir() {
            dirs.insert(1, home.join("Library/Fonts"));
        }
        dirs
    } else if cfg!(windows) {
        vec![PathBuf::from("C:/Windows/Fonts")]
    } else {
        let mut dirs = vec![
            PathBuf::from("/usr/share/fonts"),
            PathBuf::from("/usr/local/share/fonts"),
        ];
        if let Some(home) = dirs::home_dir() {
            dirs.push(home.join(".local/share/fonts"));
            dirs.push(home.join(".fonts"));
        }
        dirs
    }
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase().replace(' ', "")
}

fn variant_suffixes(variant: Variant) -> &'static [&'static str] {
    match variant {
        Variant::Regular => &["-regular", "-roman", ""],
        Variant::Bold => &["-bold", "-semibold", "-medium"],
        Variant::Italic => &["-italic", "-oblique"],
        Variant::BoldItalic => &["-bolditalic", "-boldoblique"],
    }
}

/// Search directories recursively for TTF files of the named family.
///
/// A file matches when its stem (lowercased, spaces removed) starts with the
/// family name and the remainder is a known variant suffix. First match per
/// variant wins; no regular variant means no result.
pub fn find_font_in_dirs(font_name: &str, search_dirs: &[PathBuf]) -> Option<FontPaths> {
    let name = normalize(font_name);
    let variants = [
        Variant::Regular,
        Variant::Bold,
        Variant::Italic,
        Variant::BoldItalic,
    ];
    let mut found: BTreeMap<usize, PathBuf> = BTreeMap::new();

    for dir in search_dirs {
        if !dir.exists() {
            continue;
        }

        let pattern = format!("{}/**/*.ttf", dir.display());
        let Ok(matches) = glob::glob(&pattern) else {
            continue;
        };

        for ttf in matches.filter_map(Result::ok) {
            let Some(stem) = ttf.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let stem = normalize(stem);
            let Some(suffix) = stem.strip_prefix(name.as_str()) else {
                continue;
            };

            for (i, variant) in variants.iter().enumerate() {
                if variant_suffixes(*variant).contains(&suffix) && !found.contains_key(&i) {
                    found.insert(i, ttf.clone());
                    break;
                }
            }
        }
    }

    let regular = found.remove(&0)?;
    Some(FontPaths {
        regular,
        bold: found.remove(&1),
        italic: found.remove(&2),
        bold_italic: found.remove(&3),
    })
}

/// Pull (variant, url) pairs out of a Google Fonts CSS2 response.
pub fn extract_font_faces(css: &str) -> Vec<(Variant, String)> {
    let block_re = Regex::new(r"@font-face\s*\{([^}]+)\}").unwrap();
    let url_re = Regex::new(r"url\((https://fonts\.gstatic\.com/[^)]+)\)").unwrap();
    let weight_re = Regex::new(r"font-weight:\s*(\d+)").unwrap();
    let style_re = Regex::new(r"font-style:\s*(\w+)").unwrap();

    let mut results = Vec::new();

    for block in block_re.captures_iter(css) {
        let body = &block[1];

        let Some(url) = url_re.captures(body).map(|c| c[1].to_string()) else {
            continue;
        };
        let weight = weight_re
            .captures(body)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "400".to_string());
        let style = style_re
            .captures(body)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "normal".to_string());

        let is_bold = matches!(weight.as_str(), "600" | "700" | "800" | "900");
        let is_italic = style == "italic";

        let variant = match (is_bold, is_italic) {
            (true, true) => Variant::BoldItalic,
            (true, false) => Variant::Bold,
            (false, true) => Variant::Italic,
            (false, false) => Variant::Regular,
        };

        results.push((variant, url));
    }

    results
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FontManifest(BTreeMap<String, FontPaths>);

/// Font resolution against the system plus a cache directory for downloads.
pub struct FontResolver {
    fonts_dir: PathBuf,
}

impl FontResolver {
    pub fn new(fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
        }
    }

    /// Find a family on the system or in the cache; optionally download it
    /// from Google Fonts when it is nowhere to be found.
    pub async fn resolve(&self, font_name: &str, download: bool) -> MakerResult<FontPaths> {
        let mut search_dirs = system_font_dirs();
        search_dirs.push(self.fonts_dir.clone());

        if let Some(paths) = find_font_in_dirs(font_name, &search_dirs) {
            debug!(font = font_name, path = %paths.regular.display(), "found installed font");
            return Ok(paths);
        }

        if download {
            return self.download_google_font(font_name).await;
        }

        Err(MakerError::FontNotFound(font_name.to_string()))
    }

    fn manifest_path(&self) -> PathBuf {
        self.fonts_dir.join(FONT_MANIFEST_FILE)
    }

    async fn load_manifest(&self) -> FontManifest {
        match tokio::fs::read_to_string(self.manifest_path()).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => FontManifest::default(),
        }
    }

    async fn save_manifest(&self, manifest: &FontManifest) -> MakerResult<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        tokio::fs::write(self.manifest_path(), json).await?;
        Ok(())
    }

    /// Fetch a family via the CSS2 API and cache its files.
    pub async fn download_google_font(&self, font_name: &str) -> MakerResult<FontPaths> {
        tokio::fs::create_dir_all(&self.fonts_dir).await?;

        // Cache hit only counts while the regular file still exists.
        let mut manifest = self.load_manifest().await;
        if let Some(cached) = manifest.0.get(font_name) {
            if cached.regular.exists() {
                return Ok(cached.clone());
            }
        }

        let family_dir = self.fonts_dir.join(font_name.to_ascii_lowercase().replace(' ', "-"));
        tokio::fs::create_dir_all(&family_dir).await?;

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| self.download_error(font_name, e))?;

        let css_url = format!(
            "https://fonts.googleapis.com/css2?family={}:wght@400;700",
            font_name.replace(' ', "+")
        );
        let css = client
            .get(&css_url)
            .header(reqwest::header::USER_AGENT, CSS_USER_AGENT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.download_error(font_name, e))?
            .text()
            .await
            .map_err(|e| self.download_error(font_name, e))?;

        let faces = extract_font_faces(&css);
        if faces.is_empty() {
            return Err(MakerError::FontDownloadError {
                font: font_name.to_string(),
                reason: "No font URLs found in CSS response".to_string(),
            });
        }

        let mut downloaded: BTreeMap<&str, PathBuf> = BTreeMap::new();
        for (variant, url) in faces {
            let key = match variant {
                Variant::Regular => "regular",
                Variant::Bold => "bold",
                Variant::Italic => "italic",
                Variant::BoldItalic => "bold_italic",
            };
            if downloaded.contains_key(key) {
                continue;
            }

            let ext = if url.contains("woff2") { "woff2" } else { "ttf" };
            let file_name = format!(
                "{}-{}.{}",
                font_name.to_ascii_lowercase().replace(' ', "-"),
                key,
                ext
            );
            let dest = family_dir.join(file_name);

            let bytes = client
                .get(&url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| self.download_error(font_name, e))?
                .bytes()
                .await
                .map_err(|e| self.download_error(font_name, e))?;
            tokio::fs::write(&dest, &bytes).await?;

            info!(font = font_name, variant = key, path = %dest.display(), "downloaded font file");
            downloaded.insert(key, dest);
        }

        let Some(regular) = downloaded.remove("regular") else {
            return Err(MakerError::FontDownloadError {
                font: font_name.to_string(),
                reason: "Failed to download regular variant".to_string(),
            });
        };

        let paths = FontPaths {
            regular,
            bold: downloaded.remove("bold"),
            italic: downloaded.remove("italic"),
            bold_italic: downloaded.remove("bold_italic"),
        };

        manifest.0.insert(font_name.to_string(), paths.clone());
        self.save_manifest(&manifest).await?;

        Ok(paths)
    }

    fn download_error(&self, font: &str, e: reqwest::Error) -> MakerError {
        MakerError::FontDownloadError {
            font: font.to_string(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSS: &str = r#"
@font-face {
  font-family: 'Roboto';
  font-style: normal;
  font-weight: 400;
  src: url(https://fonts.gstatic.com/s/roboto/v30/regular.ttf) format('truetype');
}
@font-face {
  font-family: 'Roboto';
  font-style: normal;
  font-weight: 700;
  src: url(https://fonts.gstatic.com/s/roboto/v30/bold.ttf) format('truetype');
}
@font-face {
  font-family: 'Roboto';
  font-style: italic;
  font-weight: 400;
  src: url(https://fonts.gstatic.com/s/roboto/v30/italic.ttf) format('truetype');
}
"#;

    #[test]
    fn test_extract_font_faces() {
        let faces = extract_font_faces(SAMPLE_CSS);
        assert_eq!(faces.len(), 3);
        assert_eq!(faces[0].0, Variant::Regular);
        assert_eq!(faces[1].0, Variant::Bold);
        assert_eq!(faces[2].0, Variant::Italic);
        assert!(faces[0].1.ends_with("regular.ttf"));
    }

    #[test]
    fn test_extract_ignores_foreign_urls() {
        let css = "@font-face { src: url(https://evil.example.com/f.ttf); }";
        assert!(extract_font_faces(css).is_empty());
    }

    #[test]
    fn test_find_font_variant_matching() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("fonts");
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["OpenSans-Regular.ttf", "OpenSans-Bold.ttf", "OpenSans-Italic.ttf"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        // Different family, must not match
        std::fs::write(dir.join("OpenSansCondensed-Regular.ttf"), b"x").unwrap();

        let paths = find_font_in_dirs("Open Sans", &[dir]).unwrap();
        assert!(paths.regular.ends_with("OpenSans-Regular.ttf"));
        assert!(paths.bold.unwrap().ends_with("OpenSans-Bold.ttf"));
        assert!(paths.italic.is_some());
        assert!(paths.bold_italic.is_none());
    }

    #[test]
    fn test_find_font_missing_regular_is_none() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("Lato-Bold.ttf"), b"x").unwrap();
        assert!(find_font_in_dirs("Lato", &[temp.path().to_path_buf()]).is_none());
    }

    #[tokio::test]
    async fn test_resolve_unknown_font_without_download() {
        let temp = tempfile::TempDir::new().unwrap();
        let resolver = FontResolver::new(temp.path());
        let result = resolver.resolve("Definitely Not A Font Xyz", false).await;
        assert!(matches!(result, Err(MakerError::FontNotFound(_))));
    }
}
