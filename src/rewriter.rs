//! Line Rewriter
//!
//! Single forward pass over the source document. Each line is matched against
//! a fixed rule table (first match wins) and is either copied, dropped, edited
//! in place, or replaced by one of the literal blocks from [`crate::templates`].

use crate::templates::{
    self, CONNECTING_TEXT, DATA_STORE_MARKER, LOADING_LINE, SCRIPT_START_MARKER, SUPABASE_INIT_CALL,
    SUPABASE_SYNC_MARKER, SUPABASE_USER_CLAUSE, SUPABASE_USER_IDENT, SYNC_BLOCK, USER_ID_FIELD,
};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Connection settings for the replacement backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub url: String,
    pub auth_token: String,
}

/// Reasons client settings cannot be embedded into the output document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// The field is empty
    Missing { field: &'static str },
    /// The value would break out of the single-quoted JS literal it lands in
    ForbiddenChar { field: &'static str, ch: char },
    /// The URL scheme is not one the libSQL web client accepts
    UnsupportedScheme { url: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Missing { field } => write!(
                f,
                "Missing Turso {}. Set it in the config file or via the environment.",
                field
            ),
            SettingsError::ForbiddenChar { field, ch } => write!(
                f,
                "Turso {} contains forbidden character {:?}",
                field, ch
            ),
            SettingsError::UnsupportedScheme { url } => write!(
                f,
                "Unsupported Turso URL '{}' (expected libsql://, https:// or http://)",
                url
            ),
        }
    }
}

impl std::error::Error for SettingsError {}

impl ClientSettings {
    /// Build validated settings
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Result<Self, SettingsError> {
        let settings = Self {
            url: url.into(),
            auth_token: auth_token.into(),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [("database URL", &self.url), ("auth token", &self.auth_token)] {
            if value.trim().is_empty() {
                return Err(SettingsError::Missing { field });
            }
            if let Some(ch) = value.chars().find(|c| matches!(c, '\'' | '\\' | '\r' | '\n')) {
                return Err(SettingsError::ForbiddenChar { field, ch });
            }
        }

        const SCHEMES: [&str; 3] = ["libsql://", "https://", "http://"];
        if !SCHEMES.iter().any(|scheme| self.url.starts_with(scheme)) {
            return Err(SettingsError::UnsupportedScheme {
                url: self.url.clone(),
            });
        }

        Ok(())
    }
}

/// Rewrite rules that act on a line outside the drop window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Module script tag: client block inserted, old client config dropped
    SectionStart,
    /// `supabaseUser` initializer removed from a declaration
    VariableEdit,
    /// Supabase sync functions replaced by the Turso ones
    SyncSection,
    /// Bare `initSupabase();` call removed
    OldInitCall,
    /// Session capture at login removed
    LoginCapture,
    /// Loading text replaced
    StatusText,
}

impl Rule {
    pub const ALL: [Rule; 6] = [
        Rule::SectionStart,
        Rule::VariableEdit,
        Rule::SyncSection,
        Rule::OldInitCall,
        Rule::LoginCapture,
        Rule::StatusText,
    ];

    pub fn describe(&self) -> &'static str {
        match self {
            Rule::SectionStart => "client block inserted",
            Rule::VariableEdit => "supabaseUser declaration removed",
            Rule::SyncSection => "sync section replaced",
            Rule::OldInitCall => "initSupabase() call removed",
            Rule::LoginCapture => "login session capture removed",
            Rule::StatusText => "loading text replaced",
        }
    }
}

/// One rule firing at a 1-based source line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    pub line: usize,
    pub rule: Rule,
}

/// Statistics of a single pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    pub lines_read: usize,
    pub lines_written: usize,
    pub lines_dropped: usize,
    pub hits: Vec<RuleHit>,
    /// Set when a lenient pass hit end of input inside a drop window
    pub truncated_from: Option<usize>,
}

impl RewriteReport {
    pub fn count(&self, rule: Rule) -> usize {
        self.hits.iter().filter(|hit| hit.rule == rule).count()
    }

    pub fn is_unchanged(&self) -> bool {
        self.hits.is_empty() && self.lines_dropped == 0
    }
}

/// Output document plus the report of how it was produced
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub output: String,
    pub report: RewriteReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    /// Input ended while still dropping lines
    UnterminatedSkip {
        marker: &'static str,
        opened_at: usize,
    },
}

impl fmt::Display for RewriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteError::UnterminatedSkip { marker, opened_at } => write!(
                f,
                "Reached end of input while skipping from line {} (marker '{}' never found)\n\n\
                 Everything after line {} would be lost. Check the input document, \
                 or use --lenient to accept the truncated output.",
                opened_at, marker, opened_at
            ),
        }
    }
}

impl std::error::Error for RewriteError {}

/// Scan state of the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Copying,
    Skipping {
        marker: &'static str,
        opened_at: usize,
    },
}

pub struct LineRewriter {
    client_block: String,
    lenient: bool,
}

impl LineRewriter {
    pub fn new(settings: &ClientSettings) -> Self {
        Self {
            client_block: templates::render_client_block(&settings.url, &settings.auth_token),
            lenient: false,
        }
    }

    /// Accept input that ends inside a drop window, discarding the remainder
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Run the pass over a whole document
    pub fn rewrite(&self, source: &str) -> Result<Rewrite, RewriteError> {
        let mut output = String::with_capacity(source.len() + SYNC_BLOCK.len() + self.client_block.len());
        let mut report = RewriteReport::default();
        let mut state = ScanState::Copying;

        for (index, line) in source.split_inclusive('\n').enumerate() {
            let line_num = index + 1;
            report.lines_read = line_num;

            if line.contains(SCRIPT_START_MARKER) {
                debug!(line = line_num, "script section start");
                output.push_str(line);
                if !line.ends_with('\n') {
                    output.push('\n');
                }
                output.push_str(&self.client_block);
                report.hits.push(RuleHit { line: line_num, rule: Rule::SectionStart });
                state = ScanState::Skipping {
                    marker: DATA_STORE_MARKER,
                    opened_at: line_num,
                };
                continue;
            }

            if let ScanState::Skipping { marker, .. } = state {
                if !line.contains(marker) {
                    report.lines_dropped += 1;
                    continue;
                }
                // The closing line leaves the window and goes through the remaining rules
                debug!(line = line_num, marker, "drop window closed");
                state = ScanState::Copying;
            }

            if line.contains(SUPABASE_USER_IDENT) && line.contains('=') {
                // Without the initializer clause the line is kept as is
                if line.contains(SUPABASE_USER_CLAUSE) {
                    output.push_str(&line.replace(SUPABASE_USER_CLAUSE, ""));
                    report.hits.push(RuleHit { line: line_num, rule: Rule::VariableEdit });
                } else {
                    output.push_str(line);
                }
                continue;
            }

            if line.contains(SUPABASE_SYNC_MARKER) {
                debug!(line = line_num, "sync section replaced");
                output.push_str(SYNC_BLOCK);
                report.hits.push(RuleHit { line: line_num, rule: Rule::SyncSection });
                state = ScanState::Skipping {
                    marker: SUPABASE_INIT_CALL,
                    opened_at: line_num,
                };
                continue;
            }

            if line.contains(SUPABASE_INIT_CALL) {
                report.hits.push(RuleHit { line: line_num, rule: Rule::OldInitCall });
                continue;
            }

            if line.contains(SUPABASE_USER_IDENT) && line.contains(USER_ID_FIELD) {
                report.hits.push(RuleHit { line: line_num, rule: Rule::LoginCapture });
                continue;
            }

            if line.contains(CONNECTING_TEXT) {
                output.push_str(LOADING_LINE);
                report.hits.push(RuleHit { line: line_num, rule: Rule::StatusText });
                continue;
            }

            output.push_str(line);
        }

        if let ScanState::Skipping { marker, opened_at } = state {
            if !self.lenient {
                return Err(RewriteError::UnterminatedSkip { marker, opened_at });
            }
            warn!(marker, opened_at, "input ended inside drop window, remainder discarded");
            report.truncated_from = Some(opened_at);
        }

        report.lines_written = output.split_inclusive('\n').count();

        Ok(Rewrite { output, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> LineRewriter {
        let settings = ClientSettings::new("libsql://demo.turso.io", "tok-123").unwrap();
        LineRewriter::new(&settings)
    }

    #[test]
    fn test_no_match_round_trips() {
        let source = "<html>\n  <body>\r\n  plain text\n</html>";
        let result = rewriter().rewrite(source).unwrap();
        assert_eq!(result.output, source);
        assert!(result.report.is_unchanged());
        assert_eq!(result.report.lines_read, 4);
        assert_eq!(result.report.lines_written, 4);
    }

    #[test]
    fn test_empty_input() {
        let result = rewriter().rewrite("").unwrap();
        assert_eq!(result.output, "");
        assert_eq!(result.report.lines_read, 0);
    }

    #[test]
    fn test_section_start_drops_until_data_store() {
        let source = "<script type=\"module\">\nconst supabase = x;\nconnect();\n// --- DATA STORE ---\nlet db = {};\n";
        let result = rewriter().rewrite(source).unwrap();

        let expected = format!(
            "<script type=\"module\">\n{}// --- DATA STORE ---\nlet db = {{}};\n",
            templates::render_client_block("libsql://demo.turso.io", "tok-123")
        );
        assert_eq!(result.output, expected);
        assert_eq!(result.report.lines_dropped, 2);
        assert_eq!(result.report.count(Rule::SectionStart), 1);
    }

    #[test]
    fn test_variable_edit_removes_clause() {
        let result = rewriter().rewrite("let x = a, supabaseUser = null;\n").unwrap();
        assert_eq!(result.output, "let x = a;\n");
        assert_eq!(result.report.count(Rule::VariableEdit), 1);
    }

    #[test]
    fn test_variable_edit_requires_assignment() {
        let result = rewriter().rewrite("console.log(supabaseUser);\n").unwrap();
        assert_eq!(result.output, "console.log(supabaseUser);\n");
        assert_eq!(result.report.count(Rule::VariableEdit), 0);
    }

    #[test]
    fn test_sync_section_replaced_and_init_call_consumed() {
        let source = "// --- SUPABASE SYNC ---\nasync function initSupabase() {\n}\ninitSupabase();\nrender();\n";
        let result = rewriter().rewrite(source).unwrap();
        assert_eq!(result.output, format!("{}render();\n", SYNC_BLOCK));
        assert_eq!(result.report.lines_dropped, 2);
        assert_eq!(result.report.count(Rule::SyncSection), 1);
        assert_eq!(result.report.count(Rule::OldInitCall), 1);
    }

    #[test]
    fn test_init_call_removed_outside_window() {
        let result = rewriter().rewrite("a\n    initSupabase();\nb\n").unwrap();
        assert_eq!(result.output, "a\nb\n");
    }

    #[test]
    fn test_login_capture_removed() {
        let result = rewriter().rewrite("keep\nsupabaseUser: user.id,\nkeep\n").unwrap();
        assert_eq!(result.output, "keep\nkeep\n");
        assert_eq!(result.report.count(Rule::LoginCapture), 1);
    }

    #[test]
    fn test_assignment_takes_precedence_over_login_capture() {
        let line = "supabaseUser = user.id;\n";
        let result = rewriter().rewrite(line).unwrap();
        assert_eq!(result.output, line);
        assert_eq!(result.report.count(Rule::LoginCapture), 0);
    }

    #[test]
    fn test_declaration_without_clause_is_not_reported() {
        let result = rewriter().rewrite("supabaseUser = user.id;\n").unwrap();
        assert_eq!(result.output, "supabaseUser = user.id;\n");
        assert_eq!(result.report.count(Rule::VariableEdit), 0);
        assert!(result.report.is_unchanged());
    }

    #[test]
    fn test_unterminated_script_tag_keeps_block_on_own_line() {
        let source = "<html>\n<script type=\"module\">";
        let result = rewriter().lenient(true).rewrite(source).unwrap();
        let expected = format!(
            "<html>\n<script type=\"module\">\n{}",
            templates::render_client_block("libsql://demo.turso.io", "tok-123")
        );
        assert_eq!(result.output, expected);
        assert!(result.output.lines().any(|l| l.starts_with("import { createClient }")));
    }

    #[test]
    fn test_status_text_replaced() {
        let source = "<div>\n  <p class=\"x\">CONNECTING...</p>\n</div>\n";
        let result = rewriter().rewrite(source).unwrap();
        assert_eq!(result.output, format!("<div>\n{}</div>\n", LOADING_LINE));
    }

    #[test]
    fn test_unterminated_window_is_error() {
        let source = "<script type=\"module\">\nconst a = 1;\n</script>\n";
        let err = rewriter().rewrite(source).unwrap_err();
        assert_eq!(
            err,
            RewriteError::UnterminatedSkip {
                marker: DATA_STORE_MARKER,
                opened_at: 1
            }
        );
        assert!(err.to_string().contains("--lenient"));
    }

    #[test]
    fn test_unterminated_window_lenient_truncates() {
        let source = "head\n// --- SUPABASE SYNC ---\nfunction a() {}\n</script>\n";
        let result = rewriter().lenient(true).rewrite(source).unwrap();
        assert_eq!(result.output, format!("head\n{}", SYNC_BLOCK));
        assert_eq!(result.report.truncated_from, Some(2));
        assert_eq!(result.report.lines_dropped, 2);
    }

    #[test]
    fn test_script_tag_reopens_window() {
        let source = "// --- SUPABASE SYNC ---\n<script type=\"module\">\nx\n// --- DATA STORE ---\n";
        let result = rewriter().rewrite(source).unwrap();
        assert!(result.output.ends_with("// --- DATA STORE ---\n"));
        assert_eq!(result.report.count(Rule::SectionStart), 1);
        assert_eq!(result.report.lines_dropped, 1);
    }

    #[test]
    fn test_rewrite_is_deterministic() {
        let source = "<script type=\"module\">\n// --- DATA STORE ---\n// --- SUPABASE SYNC ---\ninitSupabase();\n";
        let first = rewriter().rewrite(source).unwrap();
        let second = rewriter().rewrite(source).unwrap();
        assert_eq!(first.output, second.output);
        assert_eq!(first.report, second.report);
    }

    #[test]
    fn test_settings_validation() {
        assert!(ClientSettings::new("libsql://db.turso.io", "abc").is_ok());
        assert_eq!(
            ClientSettings::new("libsql://db.turso.io", "  "),
            Err(SettingsError::Missing { field: "auth token" })
        );
        assert_eq!(
            ClientSettings::new("libsql://db.turso.io", "ab'c"),
            Err(SettingsError::ForbiddenChar { field: "auth token", ch: '\'' })
        );
        assert!(matches!(
            ClientSettings::new("ftp://db", "abc"),
            Err(SettingsError::UnsupportedScheme { .. })
        ));
    }
}
