use crate::rewriter::{Rule, RewriteReport};
use colored::*;
use similar::{ChangeTag, TextDiff};
use std::io::IsTerminal;
use std::path::Path;

pub struct DiffFormatter;

impl DiffFormatter {
    /// Auto-detect if we should use colors
    fn should_use_color() -> bool {
        // Check NO_COLOR env var (https://no-color.org/)
        if std::env::var("NO_COLOR").is_ok() {
            return false;
        }

        std::io::stdout().is_terminal()
    }

    /// Format the difference between source and rewritten document
    ///
    /// Unchanged lines are shown only as context around changes; distant
    /// groups of changes are separated by a `...` line.
    pub fn format_diff_with_context(source: &str, output: &str, context_size: usize) -> String {
        Self::format_diff(source, output, context_size, Self::should_use_color())
    }

    fn format_diff(source: &str, output: &str, context_size: usize, use_color: bool) -> String {
        let diff = TextDiff::from_lines(source, output);
        let mut result = String::new();
        let mut added = 0usize;
        let mut deleted = 0usize;

        for (group_idx, group) in diff.grouped_ops(context_size).iter().enumerate() {
            if group_idx > 0 {
                if use_color {
                    result.push_str(&format!("{}\n", "...".dimmed()));
                } else {
                    result.push_str("...\n");
                }
            }

            for op in group {
                for change in diff.iter_changes(op) {
                    let (indicator, line_num) = match change.tag() {
                        ChangeTag::Equal => ("=", change.old_index()),
                        ChangeTag::Insert => {
                            added += 1;
                            ("+", change.new_index())
                        }
                        ChangeTag::Delete => {
                            deleted += 1;
                            ("-", change.old_index())
                        }
                    };
                    let line_num = line_num.map(|i| i + 1).unwrap_or(0);
                    let content = change.value().trim_end_matches(['\n', '\r']);

                    if use_color {
                        let colored_line = match change.tag() {
                            ChangeTag::Equal => format!("L{}: {} {}\n", line_num, indicator.dimmed(), content.dimmed()),
                            ChangeTag::Insert => format!("L{}: {} {}\n", line_num, indicator.green().bold(), content.green().bold()),
                            ChangeTag::Delete => format!("L{}: {} {}\n", line_num, indicator.red().bold(), content.red()),
                        };
                        result.push_str(&colored_line);
                    } else {
                        result.push_str(&format!("L{}: {} {}\n", line_num, indicator, content));
                    }
                }
            }
        }

        let total = added + deleted;
        if use_color {
            result.push_str(&format!("\nTotal: {} change", total.to_string().bold().white()));
            if total != 1 {
                result.push('s');
            }
            result.push_str(&format!(" ({} {}, {} {})\n", added, "added".green(), deleted, "deleted".red()));
        } else {
            result.push_str(&format!("\nTotal: {} changes ({} added, {} deleted)\n", total, added, deleted));
        }

        result
    }

    /// Format the per-rule summary of a pass
    pub fn format_report(report: &RewriteReport) -> String {
        Self::format_report_colored(report, Self::should_use_color())
    }

    fn format_report_colored(report: &RewriteReport, use_color: bool) -> String {
        let mut output = String::new();

        for rule in Rule::ALL {
            let lines: Vec<String> = report
                .hits
                .iter()
                .filter(|hit| hit.rule == rule)
                .map(|hit| format!("L{}", hit.line))
                .collect();
            if lines.is_empty() {
                continue;
            }

            if use_color {
                output.push_str(&format!("  {} {} ({})\n", "✓".green(), rule.describe(), lines.join(", ").dimmed()));
            } else {
                output.push_str(&format!("  ✓ {} ({})\n", rule.describe(), lines.join(", ")));
            }
        }

        output.push_str(&format!(
            "  {} lines read, {} dropped, {} written\n",
            report.lines_read, report.lines_dropped, report.lines_written
        ));

        if let Some(line) = report.truncated_from {
            let warning = format!("  ⚠️  Input ended inside the drop window opened at line {}", line);
            if use_color {
                output.push_str(&format!("{}\n", warning.yellow().bold()));
            } else {
                output.push_str(&format!("{}\n", warning));
            }
        }

        output
    }

    pub fn format_dry_run_header(input: &Path, output: &Path) -> String {
        let use_color = Self::should_use_color();
        let line = format!("Dry run: {} -> {}", input.display(), output.display());
        if use_color {
            format!("{}\n", line.bold().cyan())
        } else {
            format!("{}\n", line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewriter::RuleHit;

    #[test]
    fn test_format_diff_marks_changes() {
        let source = "a\nb\nCONNECTING\nc\n";
        let output = "a\nb\nLOADING\nc\n";
        let text = DiffFormatter::format_diff(source, output, 1, false);
        assert!(text.contains("L3: - CONNECTING"));
        assert!(text.contains("L3: + LOADING"));
        assert!(text.contains("L2: = b"));
        assert!(!text.contains("L1: = a"), "line outside context shown:\n{}", text);
        assert!(text.contains("Total: 2 changes (1 added, 1 deleted)"));
    }

    #[test]
    fn test_format_diff_separates_distant_groups() {
        let source = "x\n1\n2\n3\n4\n5\n6\ny\n";
        let output = "X\n1\n2\n3\n4\n5\n6\nY\n";
        let text = DiffFormatter::format_diff(source, output, 1, false);
        assert!(text.contains("...\n"));
    }

    #[test]
    fn test_format_diff_no_changes() {
        let text = DiffFormatter::format_diff("same\n", "same\n", 2, false);
        assert!(text.contains("Total: 0 changes"));
        assert!(!text.contains("L1"));
    }

    #[test]
    fn test_format_report_lists_rules() {
        let report = RewriteReport {
            lines_read: 10,
            lines_written: 80,
            lines_dropped: 3,
            hits: vec![
                RuleHit { line: 2, rule: Rule::SectionStart },
                RuleHit { line: 9, rule: Rule::StatusText },
            ],
            truncated_from: None,
        };
        let text = DiffFormatter::format_report_colored(&report, false);
        assert!(text.contains("client block inserted"));
        assert!(text.contains("L2"));
        assert!(text.contains("loading text replaced"));
        assert!(!text.contains("sync section replaced"));
        assert!(text.contains("10 lines read, 3 dropped, 80 written"));
    }
}
