//! Sprite sheet generation.
//!
//! Background images marked with a `?__sprite` query are packed into one
//! sheet per stylesheet. Images are stacked top to bottom in first-use order,
//! separated by `padding` pixels, and every marked declaration is rewritten to
//! point at the sheet with a matching `background-position`.

use super::parser::{Declaration, Stylesheet};
use super::CssProcessor;
use crate::errors::BuildError;
use crate::utils::paths::{normalize, relative_to, to_slash};
use image::{imageops, RgbaImage};
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static SPRITE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")?]+)\?__sprite['"]?\s*\)"#).expect("sprite pattern is valid")
});

/// Options for [`SpriteSheet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteOptions {
    /// Directory the rewritten stylesheet will live in; defaults to the stylesheet's own directory.
    #[serde(default)]
    pub stylesheet_path: Option<PathBuf>,
    /// Directory the sheets are written to.
    pub sprite_path: PathBuf,
    /// Source images are 2x; positions and sizes are halved.
    #[serde(default)]
    pub retina: bool,
    /// Express positions in rem with this root size.
    #[serde(default)]
    pub rootvalue: Option<f64>,
    /// Pixels between stacked images.
    #[serde(default)]
    pub padding: u32,
}

impl SpriteOptions {
    /// Creates options writing sheets into `sprite_path`.
    #[must_use]
    pub fn new(sprite_path: impl Into<PathBuf>) -> Self {
        Self {
            stylesheet_path: None,
            sprite_path: sprite_path.into(),
            retina: false,
            rootvalue: None,
            padding: 0,
        }
    }

    /// Sets retina mode.
    #[must_use]
    pub fn with_retina(mut self, retina: bool) -> Self {
        self.retina = retina;
        self
    }

    /// Sets the rem root value.
    #[must_use]
    pub fn with_rootvalue(mut self, rootvalue: Option<f64>) -> Self {
        self.rootvalue = rootvalue;
        self
    }

    /// Sets the padding.
    #[must_use]
    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }
}

/// Where one image landed on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    y: u32,
}

/// Packs marked background images into a sprite sheet.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    options: SpriteOptions,
}

impl SpriteSheet {
    /// Creates a sprite generator.
    #[must_use]
    pub fn new(options: SpriteOptions) -> Self {
        Self { options }
    }

    /// Returns the sheet path for a stylesheet.
    #[must_use]
    pub fn sheet_path(&self, stylesheet: &Path) -> PathBuf {
        let stem = stylesheet.file_stem().and_then(|s| s.to_str()).unwrap_or("sprite");
        self.options.sprite_path.join(format!("sprite_{stem}.png"))
    }

    fn length(&self, pixels: u32) -> String {
        let pixels = if self.options.retina {
            f64::from(pixels) / 2.0
        } else {
            f64::from(pixels)
        };
        if pixels == 0.0 {
            return "0".to_string();
        }
        match self.options.rootvalue {
            Some(root) if root > 0.0 => format!("{}rem", trim_number(pixels / root)),
            _ => format!("{}px", trim_number(pixels)),
        }
    }

    fn compose(&self, sources: &[PathBuf]) -> Result<(RgbaImage, HashMap<PathBuf, Slot>), BuildError> {
        let mut images = Vec::with_capacity(sources.len());
        for source in sources {
            let img = image::open(source).map_err(|e| BuildError::image(source, e))?;
            images.push(img.to_rgba8());
        }

        let width = images.iter().map(RgbaImage::width).max().unwrap_or(0);
        let gaps = u32::try_from(images.len().saturating_sub(1)).unwrap_or(0) * self.options.padding;
        let height = images.iter().map(RgbaImage::height).sum::<u32>() + gaps;

        let mut sheet = RgbaImage::new(width.max(1), height.max(1));
        let mut slots = HashMap::with_capacity(sources.len());
        let mut y = 0u32;
        for (source, img) in sources.iter().zip(&images) {
            imageops::overlay(&mut sheet, img, 0, i64::from(y));
            slots.insert(source.clone(), Slot { y });
            y += img.height() + self.options.padding;
        }
        Ok((sheet, slots))
    }

    fn rewrite_block(
        &self,
        decls: &mut Vec<Declaration>,
        base: &Path,
        sheet_url: &str,
        size: (u32, u32),
        slots: &HashMap<PathBuf, Slot>,
    ) {
        let mut slot = None;
        for decl in decls.iter_mut() {
            let name = decl.name();
            if name != "background" && name != "background-image" {
                continue;
            }
            let Some(caps) = SPRITE_URL.captures(&decl.value) else {
                continue;
            };
            slot = slots.get(&normalize(&base.join(&caps[1]))).copied();
            let replacement = format!("url({sheet_url})");
            decl.value = SPRITE_URL.replace(&decl.value, NoExpand(&replacement)).into_owned();
        }
        let Some(slot) = slot else {
            return;
        };

        decls.retain(|d| {
            let name = d.name();
            name != "background-position" && !(self.options.retina && name == "background-size")
        });
        decls.push(Declaration::new(
            "background-position",
            format!("0 {}", negate(&self.length(slot.y))),
        ));
        if self.options.retina {
            decls.push(Declaration::new(
                "background-size",
                format!("{} {}", self.length(size.0), self.length(size.1)),
            ));
        }
    }
}

fn negate(length: &str) -> String {
    if length == "0" {
        length.to_string()
    } else {
        format!("-{length}")
    }
}

fn trim_number(value: f64) -> String {
    let fixed = format!("{value:.5}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl CssProcessor for SpriteSheet {
    fn name(&self) -> &str {
        "csssprite"
    }

    fn process(&self, sheet: &mut Stylesheet, file: &Path) -> Result<(), BuildError> {
        let base = file.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut sources: Vec<PathBuf> = Vec::new();
        sheet.for_each_block(&mut |_, decls| {
            for decl in decls {
                let name = decl.name();
                if name != "background" && name != "background-image" {
                    continue;
                }
                if let Some(caps) = SPRITE_URL.captures(&decl.value) {
                    let source = normalize(&base.join(&caps[1]));
                    if !sources.contains(&source) {
                        sources.push(source);
                    }
                }
            }
        });
        if sources.is_empty() {
            return Ok(());
        }

        let (image, slots) = self.compose(&sources)?;
        let target = self.sheet_path(file);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        image.save(&target).map_err(|e| BuildError::image(&target, e))?;
        debug!(sheet = %target.display(), images = sources.len(), "Wrote sprite sheet");

        let css_dir = self.options.stylesheet_path.clone().unwrap_or_else(|| base.clone());
        let sheet_url = to_slash(&relative_to(&target, &css_dir));
        let size = (image.width(), image.height());
        sheet.for_each_block_mut(&mut |_, decls| self.rewrite_block(decls, &base, &sheet_url, size, &slots));
        Ok(())
    }
}
