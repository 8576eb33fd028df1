//! The default template resolver.

use super::refs;
use super::{ConcatOptions, ReplaceOptions, ResolverOptions, ScanOptions, TemplateResolver};
use crate::errors::BuildError;
use crate::reference_map::ReferenceMap;
use crate::stream::{FileTransform, VirtualFile};
use async_trait::async_trait;
use parking_lot::Mutex;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

static WIDGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*widget:\s*([\w-]+)\s*-->").expect("widget pattern is valid"));

static INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<!--\s*include\s+"([^"]+)"\s*-->"#).expect("include pattern is valid"));

const TEMPLATE_EXTENSIONS: &[&str] = &["html", "htm", "php", "vm", "ejs"];

// module -> page -> references
type Registry = Arc<Mutex<BTreeMap<String, BTreeMap<String, Vec<String>>>>>;

fn is_rewritable(file: &VirtualFile) -> bool {
    file.has_extension("css") || TEMPLATE_EXTENSIONS.iter().any(|ext| file.has_extension(ext))
}

fn record(reference: &str) -> String {
    if refs::is_external(reference) {
        reference.to_string()
    } else {
        refs::normalize(reference)
    }
}

fn push_unique(list: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !list.contains(&item) {
            list.push(item);
        }
    }
}

/// Resolver for pages with `<!-- widget:name -->` and `<!-- include "path" -->` directives.
///
/// Scans are recorded per module in a registry shared by every transform this
/// resolver hands out. [`TemplateResolver::concat`] drains the module's scans
/// into its reference map, so one resolver can serve many modules and runs.
#[derive(Debug, Clone, Default)]
pub struct MateResolver {
    registry: Registry,
}

impl MateResolver {
    /// Creates a resolver with an empty scan registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the references a pending scan recorded for a module's page.
    #[must_use]
    pub fn scanned(&self, module: &str, page: &str) -> Option<Vec<String>> {
        self.registry.lock().get(module).and_then(|pages| pages.get(page)).cloned()
    }
}

#[async_trait]
impl TemplateResolver for MateResolver {
    fn scan(&self, options: ScanOptions) -> Arc<dyn FileTransform> {
        Arc::new(Scan {
            options,
            registry: Arc::clone(&self.registry),
        })
    }

    fn inject(&self, _options: ResolverOptions) -> Arc<dyn FileTransform> {
        Arc::new(Inject)
    }

    fn replace(&self, options: ReplaceOptions) -> Arc<dyn FileTransform> {
        Arc::new(Replace { options })
    }

    fn inject_server(&self, _options: ResolverOptions) -> Arc<dyn FileTransform> {
        Arc::new(InjectServer)
    }

    async fn concat(&self, options: ConcatOptions) -> Result<ReferenceMap, BuildError> {
        let mut map = ReferenceMap::load(&options.map, &options.base.module).await?;
        let scanned = self.registry.lock().remove(&options.base.module).unwrap_or_default();

        let pages: Vec<String> = match &options.page_files {
            Some(files) => files
                .iter()
                .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
                .collect(),
            None => scanned.keys().chain(options.bundles.keys()).cloned().collect(),
        };

        for page in pages {
            let recorded = scanned.get(&page);
            let bundle = options.bundles.get(&page);
            if recorded.is_none() && bundle.is_none() {
                debug!(module = %options.base.module, page = %page, "No references recorded for page");
                continue;
            }
            let mut assets = recorded.cloned().unwrap_or_default();
            push_unique(&mut assets, bundle.into_iter().flatten().cloned());
            map.merge_page(page, assets);
        }

        map.save(&options.map).await?;
        Ok(map)
    }
}

struct Scan {
    options: ScanOptions,
    registry: Registry,
}

impl Scan {
    fn expand_widgets(&self, text: &str, widget_refs: &mut Vec<String>) -> String {
        let include = self.options.use_include.get("widget").copied().unwrap_or(false);
        WIDGET
            .replace_all(text, |caps: &Captures<'_>| {
                let name = &caps[1];
                if include {
                    return format!("<!-- include \"widget/{name}/{name}.html\" -->");
                }
                let path = self.options.widget_dir.join(name).join(format!("{name}.html"));
                match std::fs::read_to_string(&path) {
                    Ok(widget) => {
                        widget_refs.extend(refs::extract(&widget).iter().map(|r| record(r)));
                        widget
                    }
                    Err(e) => {
                        warn!(
                            module = %self.options.base.module,
                            widget = name,
                            error = %e,
                            "Widget template not found, keeping directive"
                        );
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}

impl FileTransform for Scan {
    fn name(&self) -> &str {
        "scan"
    }

    fn transform(&self, mut file: VirtualFile) -> Result<VirtualFile, BuildError> {
        let Some(page) = file.stem().map(str::to_string) else {
            return Err(BuildError::transform("scan", &file.path, "page has no file name"));
        };

        let text = file.text().into_owned();
        let mut found = Vec::new();
        push_unique(&mut found, refs::extract(&text).iter().map(|r| record(r)));

        let mut widget_refs = Vec::new();
        let expanded = self.expand_widgets(&text, &mut widget_refs);
        if self.options.serve {
            push_unique(&mut found, widget_refs);
        }
        if expanded != text {
            file.set_text(expanded);
        }

        self.registry
            .lock()
            .entry(self.options.base.module.clone())
            .or_default()
            .insert(page, found.clone());
        file.refs = found;
        Ok(file)
    }
}

struct Inject;

impl FileTransform for Inject {
    fn name(&self) -> &str {
        "inject"
    }

    fn transform(&self, mut file: VirtualFile) -> Result<VirtualFile, BuildError> {
        if !is_rewritable(&file) {
            return Ok(file);
        }
        let text = file.text().into_owned();
        let out = refs::rewrite(&text, |r| {
            let normalized = refs::normalize(r);
            (!refs::is_external(r) && normalized != r).then_some(normalized)
        });
        if out != text {
            file.set_text(out);
        }
        Ok(file)
    }
}

struct Replace {
    options: ReplaceOptions,
}

impl Replace {
    fn prefix(&self) -> String {
        let module = &self.options.base.module;
        if self.options.serve {
            return format!("/{module}/");
        }
        let mut publish = self.options.publish_prefix.clone();
        if !publish.ends_with('/') {
            publish.push('/');
        }
        format!("{publish}{}/{module}/", self.options.app)
    }
}

impl FileTransform for Replace {
    fn name(&self) -> &str {
        "replace"
    }

    fn transform(&self, mut file: VirtualFile) -> Result<VirtualFile, BuildError> {
        if !is_rewritable(&file) {
            return Ok(file);
        }
        let prefix = self.prefix();
        let text = file.text().into_owned();
        let out = refs::rewrite(&text, |r| {
            (!refs::is_external(r)).then(|| format!("{prefix}{}", refs::normalize(r)))
        });
        if out != text {
            file.set_text(out);
        }
        Ok(file)
    }
}

struct InjectServer;

impl FileTransform for InjectServer {
    fn name(&self) -> &str {
        "inject_server"
    }

    fn transform(&self, mut file: VirtualFile) -> Result<VirtualFile, BuildError> {
        let syntax: fn(&str) -> String = match file.extension().map(str::to_ascii_lowercase).as_deref() {
            Some("html" | "htm") => |p: &str| format!("<!--#include virtual=\"{p}\" -->"),
            Some("php") => |p: &str| format!("<?php include \"{p}\"; ?>"),
            Some("vm") => |p: &str| format!("#parse(\"{p}\")"),
            Some("ejs") => |p: &str| format!("<%- include(\"{p}\") %>"),
            _ => return Ok(file),
        };
        let text = file.text().into_owned();
        let out = INCLUDE.replace_all(&text, |caps: &Captures<'_>| syntax(&caps[1]));
        if out != text {
            let out = out.into_owned();
            file.set_text(out);
        }
        Ok(file)
    }
}
