//! Vendor prefixing.

use super::parser::{Declaration, Stylesheet};
use super::CssProcessor;
use crate::errors::BuildError;
use std::collections::HashSet;
use std::path::Path;

/// Browser list used when a module configures none.
pub const DEFAULT_BROWSERS: &[&str] = &["> 1%", "last 2 versions", "Firefox ESR", "Opera 12.1"];

/// A vendor prefix family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vendor {
    /// `-webkit-`
    Webkit,
    /// `-moz-`
    Moz,
    /// `-ms-`
    Ms,
    /// `-o-`
    O,
}

impl Vendor {
    /// Returns the prefix string.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Webkit => "-webkit-",
            Self::Moz => "-moz-",
            Self::Ms => "-ms-",
            Self::O => "-o-",
        }
    }
}

/// Properties that still need prefixes, with the vendors that need them.
const PREFIXED: &[(&str, &[Vendor])] = &[
    ("animation", &[Vendor::Webkit, Vendor::O]),
    ("appearance", &[Vendor::Webkit, Vendor::Moz]),
    ("backface-visibility", &[Vendor::Webkit]),
    ("box-shadow", &[Vendor::Webkit]),
    ("box-sizing", &[Vendor::Webkit, Vendor::Moz]),
    ("columns", &[Vendor::Webkit, Vendor::Moz]),
    ("filter", &[Vendor::Webkit]),
    ("flex", &[Vendor::Webkit, Vendor::Ms]),
    ("hyphens", &[Vendor::Webkit, Vendor::Moz, Vendor::Ms]),
    ("perspective", &[Vendor::Webkit]),
    ("tab-size", &[Vendor::Moz, Vendor::O]),
    ("text-size-adjust", &[Vendor::Webkit, Vendor::Ms]),
    ("transform", &[Vendor::Webkit, Vendor::Ms, Vendor::O]),
    ("transform-origin", &[Vendor::Webkit, Vendor::Ms, Vendor::O]),
    ("transition", &[Vendor::Webkit, Vendor::O]),
    ("user-select", &[Vendor::Webkit, Vendor::Moz, Vendor::Ms]),
];

/// Maps a browser query list onto the vendor families it targets.
#[must_use]
pub fn vendors_for(browsers: &[String]) -> HashSet<Vendor> {
    let mut vendors = HashSet::new();
    for query in browsers {
        let query = query.trim().to_ascii_lowercase();
        let name = query.split_whitespace().next().unwrap_or_default();

        if query.starts_with('>') || (query.starts_with("last") && query.contains("version")) {
            vendors.extend([Vendor::Webkit, Vendor::Moz, Vendor::Ms]);
            continue;
        }
        match name {
            "firefox" | "ff" | "and_ff" => {
                vendors.insert(Vendor::Moz);
            }
            "ie" | "ie_mob" | "explorer" | "edge" => {
                vendors.insert(Vendor::Ms);
            }
            "opera" | "op_mini" => {
                let version = query
                    .split_whitespace()
                    .find_map(|part| part.split('.').next()?.parse::<u32>().ok());
                if version.is_some_and(|v| v <= 12) {
                    vendors.insert(Vendor::O);
                } else {
                    vendors.insert(Vendor::Webkit);
                }
            }
            "chrome" | "safari" | "ios" | "ios_saf" | "android" | "and_chr" | "samsung" | "blackberry"
            | "uc" | "and_uc" => {
                vendors.insert(Vendor::Webkit);
            }
            _ => {}
        }
    }
    vendors
}

fn is_prefixed(property: &str) -> bool {
    [Vendor::Webkit, Vendor::Moz, Vendor::Ms, Vendor::O]
        .iter()
        .any(|v| property.starts_with(v.prefix()))
}

/// Adds vendor-prefixed copies of declarations for the targeted browsers.
///
/// Prefixed declarations go directly before the standard one. A prefixed
/// property already present in the block is left alone, so running the
/// prefixer twice changes nothing.
#[derive(Debug, Clone)]
pub struct VendorPrefixer {
    browsers: Vec<String>,
    vendors: HashSet<Vendor>,
}

impl Default for VendorPrefixer {
    fn default() -> Self {
        Self::new(DEFAULT_BROWSERS.iter().map(|s| (*s).to_string()).collect())
    }
}

impl VendorPrefixer {
    /// Creates a prefixer for a browser list.
    #[must_use]
    pub fn new(browsers: Vec<String>) -> Self {
        let vendors = vendors_for(&browsers);
        Self { browsers, vendors }
    }

    /// Returns the browser list.
    #[must_use]
    pub fn browsers(&self) -> &[String] {
        &self.browsers
    }

    /// Returns true if the vendor is targeted.
    #[must_use]
    pub fn targets(&self, vendor: Vendor) -> bool {
        self.vendors.contains(&vendor)
    }

    fn prefix_block(&self, decls: &mut Vec<Declaration>) {
        let present: HashSet<String> = decls.iter().map(Declaration::name).collect();
        let mut out = Vec::with_capacity(decls.len());
        for decl in decls.drain(..) {
            let name = decl.name();
            if !is_prefixed(&name) {
                if let Some((_, vendors)) = PREFIXED.iter().find(|(p, _)| *p == name) {
                    for vendor in vendors.iter().filter(|v| self.vendors.contains(*v)) {
                        let prefixed = format!("{}{}", vendor.prefix(), name);
                        if present.contains(&prefixed) {
                            continue;
                        }
                        out.push(Declaration {
                            property: prefixed,
                            value: decl.value.clone(),
                            important: decl.important,
                            position: decl.position,
                        });
                    }
                }
            }
            out.push(decl);
        }
        *decls = out;
    }
}

impl CssProcessor for VendorPrefixer {
    fn name(&self) -> &str {
        "autoprefixer"
    }

    fn process(&self, sheet: &mut Stylesheet, _file: &Path) -> Result<(), BuildError> {
        sheet.for_each_block_mut(&mut |_, decls| self.prefix_block(decls));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(prefixer: &VendorPrefixer, css: &str) -> String {
        let mut sheet = Stylesheet::parse(css).unwrap();
        prefixer.process(&mut sheet, Path::new("a.css")).unwrap();
        sheet.to_string()
    }

    #[test]
    fn test_mobile_browsers_target_webkit_only() {
        let vendors = vendors_for(&["Android >= 4".to_string(), "iOS >= 6".to_string()]);
        assert_eq!(vendors, HashSet::from([Vendor::Webkit]));
    }

    #[test]
    fn test_default_browsers() {
        let prefixer = VendorPrefixer::default();
        assert!(prefixer.targets(Vendor::Webkit));
        assert!(prefixer.targets(Vendor::Moz));
        assert!(prefixer.targets(Vendor::Ms));
        assert!(prefixer.targets(Vendor::O));
    }

    #[test]
    fn test_prefixes_inserted_before_standard_property() {
        let prefixer = VendorPrefixer::new(vec!["iOS >= 7".to_string()]);
        let out = run(&prefixer, ".a { transform: rotate(1deg); color: red; }");
        assert_eq!(
            out,
            ".a {\n  -webkit-transform: rotate(1deg);\n  transform: rotate(1deg);\n  color: red;\n}\n"
        );
    }

    #[test]
    fn test_existing_prefix_is_kept() {
        let prefixer = VendorPrefixer::new(vec!["iOS >= 7".to_string()]);
        let css = ".a { -webkit-transform: none; transform: rotate(1deg); }";
        let out = run(&prefixer, css);
        assert_eq!(out.matches("-webkit-transform").count(), 1);
        assert!(out.contains("-webkit-transform: none;"));
    }

    #[test]
    fn test_prefixing_is_idempotent() {
        let prefixer = VendorPrefixer::default();
        let once = run(&prefixer, ".a { user-select: none; box-sizing: border-box; }");
        let twice = run(&prefixer, &once);
        assert_eq!(once, twice);
    }
}
