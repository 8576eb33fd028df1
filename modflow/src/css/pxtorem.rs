//! Pixel to rem conversion.

use super::parser::{Declaration, Stylesheet};
use super::CssProcessor;
use crate::errors::BuildError;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

// Strings and url() are matched first so pixels inside them survive.
static PX_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""[^"]*"|'[^']*'|url\([^)]*\)|(\d*\.?\d+)px"#).expect("px pattern is valid")
});

fn default_root_value() -> f64 {
    16.0
}

fn default_unit_precision() -> usize {
    5
}

fn default_prop_white_list() -> Vec<String> {
    ["font", "font-size", "line-height", "letter-spacing"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_replace() -> bool {
    true
}

/// Options for [`PxToRem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PxToRemOptions {
    /// Pixels per rem.
    #[serde(default = "default_root_value")]
    pub root_value: f64,
    /// Decimal places kept in converted values.
    #[serde(default = "default_unit_precision")]
    pub unit_precision: usize,
    /// Properties to convert; an empty list converts every property.
    #[serde(default = "default_prop_white_list")]
    pub prop_white_list: Vec<String>,
    /// Selectors containing any of these strings are left alone.
    #[serde(default)]
    pub selector_black_list: Vec<String>,
    /// Replace the pixel declaration instead of appending a rem fallback after it.
    #[serde(default = "default_replace")]
    pub replace: bool,
    /// Also convert pixels in `@media` queries.
    #[serde(default)]
    pub media_query: bool,
}

impl Default for PxToRemOptions {
    fn default() -> Self {
        Self {
            root_value: default_root_value(),
            unit_precision: default_unit_precision(),
            prop_white_list: default_prop_white_list(),
            selector_black_list: Vec::new(),
            replace: default_replace(),
            media_query: false,
        }
    }
}

/// Converts `px` lengths into `rem`.
#[derive(Debug, Clone, Default)]
pub struct PxToRem {
    options: PxToRemOptions,
}

impl PxToRem {
    /// Creates a converter.
    #[must_use]
    pub fn new(options: PxToRemOptions) -> Self {
        Self { options }
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &PxToRemOptions {
        &self.options
    }

    /// Converts every pixel length in a value.
    #[must_use]
    pub fn convert_value(&self, value: &str) -> String {
        PX_VALUE
            .replace_all(value, |caps: &Captures<'_>| match caps.get(1) {
                Some(number) => {
                    let pixels: f64 = number.as_str().parse().unwrap_or(0.0);
                    self.to_rem(pixels)
                }
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    fn to_rem(&self, pixels: f64) -> String {
        if pixels == 0.0 {
            return "0".to_string();
        }
        let fixed = format!("{:.*}", self.options.unit_precision, pixels / self.options.root_value);
        let trimmed = if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.')
        } else {
            fixed.as_str()
        };
        format!("{trimmed}rem")
    }

    fn allows_property(&self, property: &str) -> bool {
        let list = &self.options.prop_white_list;
        list.is_empty() || list.iter().any(|p| p.eq_ignore_ascii_case(property))
    }

    fn blocks_selector(&self, selector: Option<&str>) -> bool {
        selector.is_some_and(|s| self.options.selector_black_list.iter().any(|b| s.contains(b.as_str())))
    }

    fn convert_block(&self, decls: &mut Vec<Declaration>) {
        let mut out: Vec<Declaration> = Vec::with_capacity(decls.len());
        let mut iter = std::mem::take(decls).into_iter().peekable();
        while let Some(mut decl) = iter.next() {
            if !decl.value.contains("px") || !self.allows_property(&decl.property) {
                out.push(decl);
                continue;
            }
            let converted = self.convert_value(&decl.value);
            if converted == decl.value {
                out.push(decl);
                continue;
            }
            if self.options.replace {
                decl.value = converted;
                out.push(decl);
                continue;
            }

            let fallback_present = iter
                .peek()
                .is_some_and(|next| next.property.eq_ignore_ascii_case(&decl.property) && next.value == converted);
            let mut rem = decl.clone();
            rem.value = converted;
            out.push(decl);
            if !fallback_present {
                out.push(rem);
            }
        }
        *decls = out;
    }
}

impl CssProcessor for PxToRem {
    fn name(&self) -> &str {
        "pxtorem"
    }

    fn process(&self, sheet: &mut Stylesheet, _file: &Path) -> Result<(), BuildError> {
        sheet.for_each_block_mut(&mut |ctx, decls| {
            if !self.blocks_selector(ctx.selector) {
                self.convert_block(decls);
            }
        });
        if self.options.media_query {
            sheet.for_each_at_rule_mut(&mut |at| {
                if at.name.eq_ignore_ascii_case("media") {
                    at.prelude = self.convert_value(&at.prelude);
                }
            });
        }
        Ok(())
    }
}
