//! The CSS lint gate.

use super::{written, Stage};
use crate::context::ModuleBuildContext;
use crate::core::StageOutput;
use crate::css::{BasicLinter, CssLinter, LintMessage};
use crate::errors::{BuildError, LintFailure, LintReport};
use crate::stream::{dest, pattern, src, VirtualFile};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Accumulates lint results across a stream of stylesheets.
///
/// The failure state is the OR of every file's result. Files are forwarded
/// only until the first error; later files are still linted and reported.
#[derive(Debug, Default)]
pub struct LintGate {
    failed: bool,
    forwarded: Vec<VirtualFile>,
    reports: Vec<LintReport>,
}

impl LintGate {
    /// Creates an open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one file's lint messages.
    pub fn check(&mut self, file: VirtualFile, messages: Vec<LintMessage>) {
        let errors: Vec<LintMessage> = messages.into_iter().filter(LintMessage::is_error).collect();
        if !errors.is_empty() {
            let short = file.relative();
            error!(file = %short.display(), errors = errors.len(), "csslint file");
            for message in &errors {
                error!(
                    line = message.line,
                    column = message.column,
                    evidence = %message.evidence,
                    "{}", message.text
                );
            }
            self.reports.push(LintReport {
                file: short,
                messages: errors,
            });
            self.failed = true;
        }
        if !self.failed {
            self.forwarded.push(file);
        }
    }

    /// Returns the files forwarded so far.
    #[must_use]
    pub fn forwarded(&self) -> &[VirtualFile] {
        &self.forwarded
    }

    /// Returns true once any file has failed.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Closes the gate, returning the forwarded files or the failure.
    pub fn finish(self) -> Result<Vec<VirtualFile>, LintFailure> {
        if self.failed {
            Err(LintFailure {
                files: self.reports,
                forwarded: self.forwarded.iter().map(VirtualFile::relative).collect(),
            })
        } else {
            Ok(self.forwarded)
        }
    }
}

/// Lints every stylesheet in the staging tree and fails the build on any error.
///
/// The gate also publishes staged static stylesheets to `dist/_static`. Only
/// files forwarded by the gate are published, so nothing linted after the
/// first error reaches the output tree. With lint disabled every staged
/// stylesheet is published unchecked.
#[derive(Clone)]
pub struct CssLintStage {
    linter: Arc<dyn CssLinter>,
}

impl fmt::Debug for CssLintStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CssLintStage").finish_non_exhaustive()
    }
}

impl Default for CssLintStage {
    fn default() -> Self {
        Self::new(Arc::new(BasicLinter))
    }
}

impl CssLintStage {
    /// Creates a lint stage using the given linter.
    #[must_use]
    pub fn new(linter: Arc<dyn CssLinter>) -> Self {
        Self { linter }
    }
}

#[async_trait]
impl Stage for CssLintStage {
    fn name(&self) -> &str {
        "csslint"
    }

    async fn execute(&self, ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError> {
        let staging = ctx.layout().staging();
        if !ctx.config().csslint_enabled() {
            let sheets = src(&[pattern(&staging.join("static"), "**/*.css")], None).await?;
            let published = publish(ctx, sheets).await?;
            return Ok(StageOutput::skip("csslint is disabled").with_artifacts(written(&published)));
        }

        let files = src(&[pattern(&staging, "**/*.css")], Some(&staging)).await?;
        info!(module = %ctx.module_name, stage = "csslint", files = files.len(), "Linting stylesheets");

        let linter = Arc::clone(&self.linter);
        let gate = tokio::task::spawn_blocking(move || {
            let mut gate = LintGate::new();
            for file in files {
                let messages = linter.verify(&file.text());
                gate.check(file, messages);
            }
            gate
        })
        .await
        .map_err(|e| BuildError::Join(e.to_string()))?;

        let published = publish(ctx, gate.forwarded().to_vec()).await?;
        match gate.finish() {
            Ok(forwarded) => {
                info!(module = %ctx.module_name, stage = "csslint", passed = forwarded.len(), "Stylesheets passed lint");
                Ok(StageOutput::ok(written(&published)))
            }
            Err(failure) => {
                error!(
                    module = %ctx.module_name,
                    stage = "csslint",
                    errors = failure.error_count(),
                    "CSS lint failed, module build aborted"
                );
                Err(BuildError::Lint(failure))
            }
        }
    }
}

/// Writes the staged static stylesheets among `files` to `dist/_static`.
async fn publish(ctx: &ModuleBuildContext, files: Vec<VirtualFile>) -> Result<Vec<VirtualFile>, BuildError> {
    let layout = ctx.layout();
    let staged_static = layout.staging().join("static");
    let sheets: Vec<VirtualFile> = files
        .into_iter()
        .filter(|file| file.path.starts_with(&staged_static))
        .map(|mut file| {
            file.base = staged_static.clone();
            file
        })
        .collect();
    dest(sheets, &layout.static_dir()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use crate::css::{MockCssLinter, Severity};
    use crate::testing::ModuleFixture;
    use std::path::PathBuf;

    fn error_message() -> LintMessage {
        LintMessage::new(Severity::Error, 2, 1, "Unexpected '}'").with_evidence("}")
    }

    fn css(path: &str, body: &str) -> VirtualFile {
        VirtualFile::new(format!("/m/dist/_/{path}"), "/m/dist/_", body)
    }

    #[test]
    fn test_gate_forwards_only_files_before_first_error() {
        let mut gate = LintGate::new();
        gate.check(css("static/css/0.css", ""), Vec::new());
        gate.check(css("static/css/a.css", ""), vec![error_message()]);
        gate.check(css("static/css/c.css", ""), Vec::new());
        assert!(gate.has_failed());

        let failure = gate.finish().unwrap_err();
        assert_eq!(failure.forwarded, vec![PathBuf::from("static/css/0.css")]);
        assert_eq!(failure.files.len(), 1);
        assert_eq!(failure.files[0].file, PathBuf::from("static/css/a.css"));
    }

    #[test]
    fn test_gate_failure_is_sticky() {
        let mut gate = LintGate::new();
        gate.check(css("a.css", ""), vec![error_message()]);
        gate.check(css("b.css", ""), Vec::new());
        gate.check(css("c.css", ""), vec![error_message()]);

        let failure = gate.finish().unwrap_err();
        assert!(failure.forwarded.is_empty());
        assert_eq!(failure.error_count(), 2);
    }

    #[test]
    fn test_warnings_pass_the_gate() {
        let mut gate = LintGate::new();
        gate.check(
            css("a.css", ""),
            vec![LintMessage::new(Severity::Warning, 1, 1, "Rule is empty.")],
        );
        assert_eq!(gate.finish().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stage_fails_on_second_of_three_files() {
        let fixture = ModuleFixture::new()
            .with_module_config(ModuleConfig::new("shop").with_csslint(true))
            .with_file("dist/_/static/css/0.css", ".ok { color: red; }")
            .with_file("dist/_/static/css/a.css", ".bad { color: red; }\n}")
            .with_file("dist/_/static/css/c.css", ".ok { color: blue; }");

        let mut linter = MockCssLinter::new();
        linter
            .expect_verify()
            .times(3)
            .returning(|source| if source.contains(".bad") { vec![error_message()] } else { Vec::new() });
        let stage = CssLintStage::new(Arc::new(linter));

        let err = stage.execute(&fixture.context()).await.unwrap_err();
        let failure = err.lint_failure().unwrap();
        assert!(failure.contains(&PathBuf::from("static/css/a.css")));
        assert_eq!(failure.forwarded, vec![PathBuf::from("static/css/0.css")]);

        let published = fixture.layout().static_css();
        assert!(published.join("0.css").is_file());
        assert!(!published.join("a.css").exists());
        assert!(!published.join("c.css").exists());
    }

    #[tokio::test]
    async fn test_stage_with_basic_linter_passes_clean_files() {
        let fixture = ModuleFixture::new()
            .with_module_config(ModuleConfig::new("shop").with_csslint(true))
            .with_file("dist/_/static/css/home.css", ".a { color: red; }");

        let output = CssLintStage::default().execute(&fixture.context()).await.unwrap();
        assert!(!output.is_skip());
        let target = fixture.layout().static_css().join("home.css");
        assert_eq!(output.written_paths(), vec![target.clone()]);
        assert_eq!(fixture.read(&target), ".a { color: red; }");
    }

    #[tokio::test]
    async fn test_disabled_lint_is_skipped() {
        let fixture = ModuleFixture::new()
            .with_module_config(ModuleConfig::new("shop").with_csslint(false))
            .with_file("dist/_/static/css/a.css", "}");

        let output = CssLintStage::default().execute(&fixture.context()).await.unwrap();
        assert!(output.is_skip());
        assert_eq!(fixture.read(&fixture.layout().static_css().join("a.css")), "}");
    }

    #[tokio::test]
    async fn test_only_static_stylesheets_are_published() {
        let fixture = ModuleFixture::new()
            .with_module_config(ModuleConfig::new("shop").with_csslint(true))
            .with_file("dist/_/page/home/home.css", ".page { color: red; }")
            .with_file("dist/_/static/css/home.css", ".a { color: red; }");

        let output = CssLintStage::default().execute(&fixture.context()).await.unwrap();

        assert_eq!(output.written_paths(), vec![fixture.layout().static_css().join("home.css")]);
        assert!(!fixture.layout().static_dir().join("page").exists());
    }
}
