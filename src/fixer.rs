//! Auto-fix application module.
//!
//! Chooses which findings' fixes to apply to a unit, applies them through a
//! [`PatchPlan`] under a [`FixPolicy`], and renders the result as a unified
//! diff.

use crate::diagnostics::Finding;
use crate::plan::{MergeConflict, PatchError, PatchPlan};
use crate::rule::FixSafety;
use crate::unit::CompilationUnit;
use std::fmt::Write;
use std::path::Path;

/// What to do when two chosen fixes conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixPolicy {
    /// Apply nothing and report the conflict.
    AllOrNothing,
    /// Apply fixes in finding order, skipping each one that conflicts with a
    /// fix already accepted.
    #[default]
    NonConflicting,
}

#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    pub policy: FixPolicy,
    /// Also apply fixes of rules whose fix is marked unsafe.
    pub allow_unsafe: bool,
    /// Only apply fixes of these rules. Empty means every rule.
    pub rules: Vec<String>,
}

impl FixOptions {
    fn accepts(&self, finding: &Finding) -> bool {
        if finding.rule.fix.safety == FixSafety::Unsafe && !self.allow_unsafe {
            return false;
        }
        self.rules.is_empty() || self.rules.iter().any(|r| r == finding.rule.name)
    }
}

/// Result of applying fixes to one unit.
#[derive(Debug)]
pub struct FixResult {
    /// The modified source code.
    pub fixed_source: String,
    /// Number of fixes applied.
    pub fixes_applied: usize,
    /// Fixes left out: filtered by [`FixOptions`] or conflicting.
    pub fixes_skipped: usize,
    pub conflicts: Vec<MergeConflict>,
}

impl FixResult {
    pub fn changed(&self) -> bool {
        self.fixes_applied > 0
    }
}

pub fn apply_fixes(
    unit: &CompilationUnit,
    findings: &[Finding],
    options: &FixOptions,
) -> Result<FixResult, PatchError> {
    let offered = findings.iter().filter(|f| f.fix.is_some()).count();
    let plan = PatchPlan::from_findings_filtered(findings, |f| options.accepts(f));
    let filtered = offered - plan.len();

    match options.policy {
        FixPolicy::AllOrNothing => match plan.apply(unit) {
            Ok(fixed_source) => Ok(FixResult {
                fixed_source,
                fixes_applied: plan.len(),
                fixes_skipped: filtered,
                conflicts: Vec::new(),
            }),
            Err(PatchError::Conflict(conflict)) => Ok(FixResult {
                fixed_source: unit.text().to_string(),
                fixes_applied: 0,
                fixes_skipped: offered,
                conflicts: vec![*conflict],
            }),
            Err(err) => Err(err),
        },
        FixPolicy::NonConflicting => {
            let partial = plan.apply_non_conflicting(unit)?;
            Ok(FixResult {
                fixed_source: partial.text,
                fixes_applied: partial.applied.len(),
                fixes_skipped: filtered + partial.skipped.len(),
                conflicts: partial.skipped.into_iter().map(|s| s.conflict).collect(),
            })
        }
    }
}

/// Generate a unified diff between original and fixed source.
///
/// Includes context lines (3 lines before and after each change) for better readability.
pub fn format_diff(original: &str, fixed: &str, path: &Path) -> String {
    format_diff_with_context(original, fixed, path, 3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Same(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

/// Line-level edit script via longest common subsequence, after trimming the
/// common prefix and suffix.
fn line_script<'a>(orig: &[&'a str], fixed: &[&'a str]) -> Vec<Line<'a>> {
    let prefix = orig.iter().zip(fixed).take_while(|(a, b)| a == b).count();
    let suffix = orig[prefix..]
        .iter()
        .rev()
        .zip(fixed[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let a = &orig[prefix..orig.len() - suffix];
    let b = &fixed[prefix..fixed.len() - suffix];

    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0u32; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut script: Vec<Line<'a>> = orig[..prefix].iter().map(|l| Line::Same(l)).collect();
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        if i < a.len() && j < b.len() && a[i] == b[j] {
            script.push(Line::Same(a[i]));
            i += 1;
            j += 1;
        } else if i < a.len() && (j == b.len() || lcs[i + 1][j] >= lcs[i][j + 1]) {
            script.push(Line::Removed(a[i]));
            i += 1;
        } else {
            script.push(Line::Added(b[j]));
            j += 1;
        }
    }
    script.extend(orig[orig.len() - suffix..].iter().map(|l| Line::Same(l)));
    script
}

/// Generate a unified diff with configurable context lines.
pub fn format_diff_with_context(
    original: &str,
    fixed: &str,
    path: &Path,
    context: usize,
) -> String {
    let orig_lines: Vec<&str> = original.lines().collect();
    let fixed_lines: Vec<&str> = fixed.lines().collect();
    let script = line_script(&orig_lines, &fixed_lines);

    let changed: Vec<usize> = script
        .iter()
        .enumerate()
        .filter(|(_, l)| !matches!(l, Line::Same(_)))
        .map(|(i, _)| i)
        .collect();
    if changed.is_empty() {
        return String::new();
    }

    // Group changes into hunks of script indices with context
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for &i in &changed {
        let start = i.saturating_sub(context);
        let end = (i + context + 1).min(script.len());
        match hunks.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => hunks.push((start, end)),
        }
    }

    let path_str = path.display().to_string();
    let mut output = String::new();
    // writing to a String cannot fail
    let _ = writeln!(output, "--- a/{path_str}");
    let _ = writeln!(output, "+++ b/{path_str}");

    for (start, end) in hunks {
        let (mut orig_line, mut fixed_line) = (1, 1);
        for l in &script[..start] {
            match l {
                Line::Same(_) => {
                    orig_line += 1;
                    fixed_line += 1;
                }
                Line::Removed(_) => orig_line += 1,
                Line::Added(_) => fixed_line += 1,
            }
        }
        let hunk = &script[start..end];
        let orig_size = hunk.iter().filter(|l| !matches!(l, Line::Added(_))).count();
        let fixed_size = hunk.iter().filter(|l| !matches!(l, Line::Removed(_))).count();

        let _ = writeln!(
            output,
            "@@ -{orig_line},{orig_size} +{fixed_line},{fixed_size} @@"
        );
        for l in hunk {
            let _ = match l {
                Line::Same(s) => writeln!(output, " {s}"),
                Line::Removed(s) => writeln!(output, "-{s}"),
                Line::Added(s) => writeln!(output, "+{s}"),
            };
        }
    }

    output
}
