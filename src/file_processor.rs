use crate::config::{self, Config};
use crate::error_helpers::describe_io_error;
use crate::rewriter::{LineRewriter, Rewrite, RewriteReport};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Source document together with its rewritten form
#[derive(Debug)]
pub struct ProcessedFile {
    pub source: String,
    pub rewrite: Rewrite,
}

pub struct FileProcessor {
    rewriter: LineRewriter,
}

impl FileProcessor {
    pub fn new(rewriter: LineRewriter) -> Self {
        Self { rewriter }
    }

    /// Build a processor from a validated configuration
    ///
    /// Client settings are checked here, before any document is read.
    pub fn from_config(config: &Config) -> Result<Self> {
        config::validate_config(config)?;
        let settings = config.client_settings()?;
        let rewriter = LineRewriter::new(&settings).lenient(config.rewrite.lenient);
        Ok(Self::new(rewriter))
    }

    /// Run the conversion described by `config`
    ///
    /// A dry run reads and rewrites the input but never creates or touches
    /// the output document.
    pub fn run(config: &Config, dry_run: bool) -> Result<ProcessedFile> {
        let processor = Self::from_config(config)?;
        let input = &config.paths.input;

        if dry_run {
            let processed = processor.process_file(input)?;
            debug!(
                input = %input.display(),
                rules = processed.rewrite.report.hits.len(),
                "dry run, output not written"
            );
            return Ok(processed);
        }

        processor.apply(input, &config.paths.output)
    }

    /// Read the whole source document into memory
    pub fn read_source(path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| {
            let message = describe_io_error(path, "reading", &e);
            anyhow::Error::new(e).context(message)
        })
    }

    /// Rewrite a file without touching the filesystem beyond reading it
    pub fn process_file(&self, input: &Path) -> Result<ProcessedFile> {
        let source = Self::read_source(input)?;

        let rewrite = self
            .rewriter
            .rewrite(&source)
            .with_context(|| format!("Failed to rewrite {}", input.display()))?;

        Ok(ProcessedFile { source, rewrite })
    }

    /// Write the output document in one step
    ///
    /// Content goes to a temp file next to the destination which is then
    /// renamed over it, so a failed write leaves any existing output intact.
    pub fn write_output(path: &Path, content: &str) -> Result<()> {
        let parent_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut temp_file = NamedTempFile::new_in(parent_dir).map_err(|e| {
            let message = describe_io_error(parent_dir, "creating a temp file in", &e);
            anyhow::Error::new(e).context(message)
        })?;

        temp_file
            .write_all(content.as_bytes())
            .and_then(|_| temp_file.as_file().sync_all())
            .with_context(|| format!("Failed to write temp file for {}", path.display()))?;

        temp_file.persist(path).map_err(|e| {
            let message = describe_io_error(path, "writing", &e.error);
            anyhow::Error::new(e).context(message)
        })?;

        Ok(())
    }

    /// Read `input`, rewrite it and write the result to `output`
    pub fn convert(&self, input: &Path, output: &Path) -> Result<RewriteReport> {
        Ok(self.apply(input, output)?.rewrite.report)
    }

    fn apply(&self, input: &Path, output: &Path) -> Result<ProcessedFile> {
        let processed = self.process_file(input)?;
        Self::write_output(output, &processed.rewrite.output)?;

        let report = &processed.rewrite.report;
        info!(
            input = %input.display(),
            output = %output.display(),
            lines_read = report.lines_read,
            lines_written = report.lines_written,
            rules = report.hits.len(),
            "document converted"
        );

        Ok(processed)
    }
}
