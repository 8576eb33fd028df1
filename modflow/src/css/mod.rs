//! CSS tooling: parsing, linting and post-processing.
//!
//! Post-processors implement [`CssProcessor`] and operate on a parsed
//! [`Stylesheet`]. A [`ProcessorChain`] runs several of them in order and
//! adapts the result into a [`FileTransform`] for file streams.

mod lint;
mod parser;
mod prefix;
mod pxtorem;
mod sprite;

pub use lint::{has_errors, BasicLinter, CssLinter, LintMessage, Severity};
#[cfg(test)]
pub use lint::MockCssLinter;
pub use parser::{AtRule, AtRuleBody, BlockContext, CssParseError, Declaration, Node, Position, Rule, Stylesheet};
pub use prefix::{vendors_for, Vendor, VendorPrefixer, DEFAULT_BROWSERS};
pub use pxtorem::{PxToRem, PxToRemOptions};
pub use sprite::{SpriteOptions, SpriteSheet};

use crate::errors::BuildError;
use crate::stream::{FileTransform, VirtualFile};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A transform over a parsed stylesheet.
pub trait CssProcessor: Send + Sync {
    /// Returns the processor name.
    fn name(&self) -> &str;

    /// Rewrites the stylesheet in place. `file` is the stylesheet's path.
    fn process(&self, sheet: &mut Stylesheet, file: &Path) -> Result<(), BuildError>;
}

/// An ordered list of processors applied to each stylesheet.
#[derive(Clone, Default)]
pub struct ProcessorChain {
    processors: Vec<Arc<dyn CssProcessor>>,
}

impl fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorChain")
            .field("processors", &self.names())
            .finish()
    }
}

impl ProcessorChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a processor.
    #[must_use]
    pub fn with(mut self, processor: impl CssProcessor + 'static) -> Self {
        self.processors.push(Arc::new(processor));
        self
    }

    /// Returns the processor names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Returns true if the chain has no processors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Runs the chain over CSS source text.
    pub fn process_source(&self, source: &str, file: &Path) -> Result<String, BuildError> {
        let mut sheet = Stylesheet::parse(source).map_err(|e| BuildError::transform("postcss", file, e))?;
        for processor in &self.processors {
            processor.process(&mut sheet, file)?;
        }
        Ok(sheet.to_string())
    }
}

impl FileTransform for ProcessorChain {
    fn name(&self) -> &str {
        "postcss"
    }

    fn transform(&self, mut file: VirtualFile) -> Result<VirtualFile, BuildError> {
        let output = self.process_source(&file.text(), &file.path)?;
        file.set_text(output);
        Ok(file)
    }
}
