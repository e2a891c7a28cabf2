//! Merging and applying the suggested fixes chosen for one compilation unit.
//!
//! All edits of all fixes in a [`PatchPlan`] are flattened together with
//! their provenance, sorted by `(start, end, fix, edit)` and walked once. An
//! edit starting before the furthest end accepted so far is a conflict. The
//! accepted edits are then spliced into the original text in one pass, so
//! every offset is interpreted against the text it was computed on.
//!
//! Sorting on `end` after `start` puts a pure insertion at offset `n` before a
//! replacement that starts at `n`: the inserted text ends up in front of the
//! replaced text.

use crate::diagnostics::Finding;
use crate::fix::{SuggestedFix, TextEdit};
use crate::log_event;
use crate::source::TextRange;
use crate::tree::NodeKind;
use crate::unit::CompilationUnit;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Where one edit of a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EditOrigin {
    /// Index of the fix in the plan.
    pub fix: usize,
    /// Index of the finding the fix belongs to, when known.
    pub finding: Option<usize>,
    pub rule: &'static str,
    /// Index of the edit inside its fix. Import insertions use the index one
    /// past the fix's own edits.
    pub edit: usize,
}

impl fmt::Display for EditOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (fix #{}, edit #{})", self.rule, self.fix, self.edit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictSide {
    pub origin: EditOrigin,
    pub range: TextRange,
}

/// Two edits of a plan that overlap. `first` sorts before `second`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error(
    "conflicting edits: {} from {} overlaps {} from {}",
    first.range, first.origin, second.range, second.origin
)]
pub struct MergeConflict {
    pub first: ConflictSide,
    pub second: ConflictSide,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error(transparent)]
    Conflict(Box<MergeConflict>),

    #[error("edits overlap: {first} and {second}")]
    Overlap { first: TextRange, second: TextRange },

    #[error("edit range {range} exceeds source length {len}")]
    OutOfBounds { range: TextRange, len: usize },

    #[error("edit boundary {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
}

impl From<MergeConflict> for PatchError {
    fn from(value: MergeConflict) -> Self {
        PatchError::Conflict(Box::new(value))
    }
}

#[derive(Debug, Clone)]
struct PlannedFix {
    fix: SuggestedFix,
    rule: &'static str,
    finding: Option<usize>,
}

/// A fix that [`PatchPlan::apply_non_conflicting`] left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFix {
    pub fix: usize,
    pub conflict: MergeConflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialApplication {
    pub text: String,
    /// Plan indices of the fixes that were applied.
    pub applied: Vec<usize>,
    pub skipped: Vec<SkippedFix>,
}

/// Fixes chosen for one compilation unit, in plan order.
#[derive(Debug, Clone, Default)]
pub struct PatchPlan {
    fixes: Vec<PlannedFix>,
}

impl PatchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan containing the fix of every finding that has one, in finding
    /// order.
    pub fn from_findings(findings: &[Finding]) -> Self {
        Self::from_findings_filtered(findings, |_| true)
    }

    pub fn from_findings_filtered(findings: &[Finding], keep: impl Fn(&Finding) -> bool) -> Self {
        let mut plan = Self::new();
        for (idx, finding) in findings.iter().enumerate() {
            if let Some(fix) = &finding.fix {
                if keep(finding) {
                    plan.push_for_finding(fix.clone(), finding.rule.name, idx);
                }
            }
        }
        plan
    }

    pub fn push(&mut self, fix: SuggestedFix, rule: &'static str) -> &mut Self {
        self.fixes.push(PlannedFix {
            fix,
            rule,
            finding: None,
        });
        self
    }

    pub fn push_for_finding(
        &mut self,
        fix: SuggestedFix,
        rule: &'static str,
        finding: usize,
    ) -> &mut Self {
        self.fixes.push(PlannedFix {
            fix,
            rule,
            finding: Some(finding),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn fixes(&self) -> impl Iterator<Item = &SuggestedFix> {
        self.fixes.iter().map(|p| &p.fix)
    }

    fn origin(&self, fix: usize, edit: usize) -> EditOrigin {
        let planned = &self.fixes[fix];
        EditOrigin {
            fix,
            finding: planned.finding,
            rule: planned.rule,
            edit,
        }
    }

    /// Every edit of the selected fixes plus the import insertion they need,
    /// sorted by `(start, end, fix, edit)`.
    fn flatten(&self, unit: &CompilationUnit, selected: &[usize]) -> Vec<(TextEdit, EditOrigin)> {
        let mut edits: Vec<(TextEdit, EditOrigin)> = selected
            .iter()
            .flat_map(|&fix| {
                self.fixes[fix]
                    .fix
                    .edits()
                    .iter()
                    .enumerate()
                    .map(move |(edit, e)| (e.clone(), self.origin(fix, edit)))
            })
            .collect();
        if let Some(import) = self.import_edit(unit, selected) {
            edits.push(import);
        }
        edits.sort_by_key(|(e, o)| (e.range.start(), e.range.end(), o.fix, o.edit));
        edits
    }

    /// One insertion adding every import the selected fixes request that the
    /// unit does not already have, attributed to the first requesting fix.
    fn import_edit(
        &self,
        unit: &CompilationUnit,
        selected: &[usize],
    ) -> Option<(TextEdit, EditOrigin)> {
        let mut wanted: Vec<&str> = Vec::new();
        let mut owner = None;
        for &fix in selected {
            for import in self.fixes[fix].fix.imports() {
                if is_imported(unit, import) || wanted.contains(&import.as_str()) {
                    continue;
                }
                owner.get_or_insert(fix);
                wanted.push(import);
            }
        }
        let owner = owner?;
        let (offset, text) = import_insertion(unit, &wanted);
        let origin = self.origin(owner, self.fixes[owner].fix.edits().len());
        Some((TextEdit::insert(offset, text), origin))
    }

    /// Apply every fix, or none of them when any two edits conflict.
    pub fn apply(&self, unit: &CompilationUnit) -> Result<String, PatchError> {
        let all: Vec<usize> = (0..self.fixes.len()).collect();
        let edits = self.flatten(unit, &all);
        let accepted = merge(edits)?;
        let text = splice(unit.text(), accepted.iter())?;
        log_event!(
            debug,
            fixes = self.fixes.len(),
            edits = accepted.len(),
            "applied patch plan"
        );
        Ok(text)
    }

    /// Every pair of conflicting edits in the plan.
    pub fn conflicts(&self, unit: &CompilationUnit) -> Vec<MergeConflict> {
        let all: Vec<usize> = (0..self.fixes.len()).collect();
        let edits = self.flatten(unit, &all);
        let mut out = Vec::new();
        for (i, (a, origin_a)) in edits.iter().enumerate() {
            for (b, origin_b) in &edits[i + 1..] {
                if b.range.start() >= a.range.end() {
                    break;
                }
                if is_duplicate(a, b) || !a.overlaps_with(b) {
                    continue;
                }
                out.push(conflict(a, *origin_a, b, *origin_b));
            }
        }
        out
    }

    /// Accept fixes greedily in plan order, skipping any fix whose edits
    /// conflict with an already accepted fix, then apply the accepted ones.
    pub fn apply_non_conflicting(
        &self,
        unit: &CompilationUnit,
    ) -> Result<PartialApplication, PatchError> {
        let import_point = import_insertion(unit, &[]).0;
        let mut accepted: Vec<(TextEdit, EditOrigin)> = Vec::new();
        let mut applied = Vec::new();
        let mut skipped = Vec::new();

        for (idx, planned) in self.fixes.iter().enumerate() {
            let mut candidate: Vec<(TextEdit, EditOrigin)> = planned
                .fix
                .edits()
                .iter()
                .enumerate()
                .map(|(edit, e)| (e.clone(), self.origin(idx, edit)))
                .collect();
            // a fix needing imports may not rewrite the import point itself
            let mut clash = None;
            if planned.fix.imports().iter().any(|i| !is_imported(unit, i)) {
                let import = TextEdit::insert(import_point, "");
                let origin = self.origin(idx, planned.fix.edits().len());
                clash = candidate
                    .iter()
                    .find(|(e, _)| e.overlaps_with(&import))
                    .map(|(e, e_origin)| conflict(e, *e_origin, &import, origin));
                candidate.push((import, origin));
            }

            let clash = clash.or_else(|| {
                candidate.iter().find_map(|(e, origin)| {
                    accepted
                        .iter()
                        .find(|(a, _)| a.overlaps_with(e) && !is_duplicate(a, e))
                        .map(|(a, a_origin)| conflict(a, *a_origin, e, *origin))
                })
            });
            match clash {
                Some(conflict) => {
                    log_event!(debug, fix = idx, %conflict, "skipping conflicting fix");
                    skipped.push(SkippedFix { fix: idx, conflict });
                }
                None => {
                    accepted.extend(candidate);
                    applied.push(idx);
                }
            }
        }

        let edits = self.flatten(unit, &applied);
        let merged = merge(edits)?;
        let text = splice(unit.text(), merged.iter())?;
        Ok(PartialApplication {
            text,
            applied,
            skipped,
        })
    }
}

fn is_duplicate(a: &TextEdit, b: &TextEdit) -> bool {
    !a.range.is_empty() && a == b
}

fn conflict(a: &TextEdit, origin_a: EditOrigin, b: &TextEdit, origin_b: EditOrigin) -> MergeConflict {
    let (first, second) = if (a.range, origin_a) <= (b.range, origin_b) {
        ((a.range, origin_a), (b.range, origin_b))
    } else {
        ((b.range, origin_b), (a.range, origin_a))
    };
    MergeConflict {
        first: ConflictSide {
            origin: first.1,
            range: first.0,
        },
        second: ConflictSide {
            origin: second.1,
            range: second.0,
        },
    }
}

/// Single linear walk over sorted edits. Identical replacements from
/// different fixes are applied once.
fn merge(edits: Vec<(TextEdit, EditOrigin)>) -> Result<Vec<TextEdit>, MergeConflict> {
    let mut accepted: Vec<TextEdit> = Vec::with_capacity(edits.len());
    let mut furthest: Option<(TextRange, EditOrigin)> = None;
    for (edit, origin) in edits {
        if accepted.last().is_some_and(|prev| is_duplicate(prev, &edit)) {
            continue;
        }
        if let Some((range, prev_origin)) = furthest {
            if edit.range.start() < range.end() {
                let err = MergeConflict {
                    first: ConflictSide {
                        origin: prev_origin,
                        range,
                    },
                    second: ConflictSide {
                        origin,
                        range: edit.range,
                    },
                };
                log_event!(debug, conflict = %err, "patch plan conflict");
                return Err(err);
            }
        }
        if furthest.is_none_or(|(range, _)| edit.range.end() > range.end()) {
            furthest = Some((edit.range, origin));
        }
        accepted.push(edit);
    }
    Ok(accepted)
}

fn check_bounds(source: &str, range: TextRange) -> Result<(), PatchError> {
    if range.end() > source.len() {
        return Err(PatchError::OutOfBounds {
            range,
            len: source.len(),
        });
    }
    for offset in [range.start(), range.end()] {
        if !source.is_char_boundary(offset) {
            return Err(PatchError::NotCharBoundary { offset });
        }
    }
    Ok(())
}

/// Concatenate untouched text and replacements. `edits` must be sorted and
/// non-overlapping.
fn splice<'e>(
    source: &str,
    edits: impl Iterator<Item = &'e TextEdit> + Clone,
) -> Result<String, PatchError> {
    for edit in edits.clone() {
        check_bounds(source, edit.range)?;
    }
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        out.push_str(&source[cursor..edit.range.start()]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end();
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Apply a self-consistent list of edits (in any order) to `source`.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String, PatchError> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.range.start(), e.range.end()));
    for pair in sorted.windows(2) {
        if pair[0].overlaps_with(pair[1]) {
            return Err(PatchError::Overlap {
                first: pair[0].range,
                second: pair[1].range,
            });
        }
    }
    splice(source, sorted.into_iter())
}

fn is_imported(unit: &CompilationUnit, qualified: &str) -> bool {
    let Some((package, _)) = qualified.rsplit_once('.') else {
        return true;
    };
    if package == "java.lang" || unit.types.package() == Some(package) {
        return true;
    }
    let wildcard = format!("{package}.*");
    unit.tree.root().children().any(|n| {
        n.kind() == NodeKind::Import
            && !n.has_modifier("static")
            && n.name().is_some_and(|name| name == qualified || name == wildcard)
    })
}

/// Insertion point and text for the given imports: after the last import,
/// else after the package declaration, else at the top of the file.
fn import_insertion(unit: &CompilationUnit, imports: &[&str]) -> (usize, String) {
    let root = unit.tree.root();
    let last_import = root.children().filter(|n| n.kind() == NodeKind::Import).last();
    let package = root.children().find(|n| n.kind() == NodeKind::Package);
    let lines = imports.iter().map(|i| format!("import {i};"));
    match (last_import, package) {
        (Some(import), _) => (
            import.range().end(),
            lines.map(|l| format!("\n{l}")).collect(),
        ),
        (None, Some(package)) => {
            let body: String = lines.map(|l| format!("\n{l}")).collect();
            (package.range().end(), format!("\n{body}"))
        }
        (None, None) => {
            let body: String = lines.map(|l| format!("{l}\n")).collect();
            (0, format!("{body}\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::java::parse_java;

    fn range(start: usize, end: usize) -> TextRange {
        TextRange::new(start, end).unwrap()
    }

    fn fix(edits: &[(usize, usize, &str)]) -> SuggestedFix {
        edits
            .iter()
            .fold(SuggestedFix::builder(), |b, &(s, e, text)| {
                b.replace(range(s, e), text)
            })
            .build()
            .unwrap()
    }

    fn unit(text: &str) -> CompilationUnit {
        parse_java(text).unwrap()
    }

    #[test]
    fn empty_plan_is_identity() {
        let u = unit("class A { int x; }");
        assert_eq!(PatchPlan::new().apply(&u).unwrap(), u.text());
        let partial = PatchPlan::new().apply_non_conflicting(&u).unwrap();
        assert_eq!(partial.text, u.text());
        assert!(partial.applied.is_empty());
    }

    #[test]
    fn overlapping_fixes_are_rejected_with_both_origins() {
        let u = unit("class Abcdefghijklmnopqrstuvwxyz {}");
        let mut plan = PatchPlan::new();
        plan.push(fix(&[(10, 15, "x")]), "First");
        plan.push(fix(&[(12, 20, "y")]), "Second");

        let err = plan.apply(&u).unwrap_err();
        let PatchError::Conflict(conflict) = err else {
            panic!("expected a merge conflict, got {err:?}");
        };
        assert_eq!(conflict.first.range, range(10, 15));
        assert_eq!(conflict.first.origin.rule, "First");
        assert_eq!(conflict.second.range, range(12, 20));
        assert_eq!(conflict.second.origin.rule, "Second");
        assert_eq!(plan.conflicts(&u), vec![*conflict]);
    }

    #[test]
    fn conflict_is_detected_regardless_of_plan_order() {
        let u = unit("class Abcdefghijklmnopqrstuvwxyz {}");
        let mut plan = PatchPlan::new();
        plan.push(fix(&[(12, 20, "y")]), "Second");
        plan.push(fix(&[(10, 15, "x")]), "First");
        let Err(PatchError::Conflict(conflict)) = plan.apply(&u) else {
            panic!("expected conflict");
        };
        assert_eq!(conflict.first.range, range(10, 15));
        assert_eq!(conflict.second.range, range(12, 20));
    }

    #[test]
    fn insertion_precedes_replacement_at_same_offset() {
        let u = unit("class A {}");
        let mut plan = PatchPlan::new();
        plan.push(fix(&[(6, 7, "B")]), "Rename");
        plan.push(
            SuggestedFix::builder().insert_at(6, "Big").build().unwrap(),
            "Prefix",
        );
        assert_eq!(plan.apply(&u).unwrap(), "class BigB {}");
    }

    #[test]
    fn identical_edits_from_two_fixes_apply_once() {
        let u = unit("class A {}");
        let mut plan = PatchPlan::new();
        plan.push(fix(&[(6, 7, "B")]), "One");
        plan.push(fix(&[(6, 7, "B")]), "Two");
        assert_eq!(plan.apply(&u).unwrap(), "class B {}");
        assert!(plan.conflicts(&u).is_empty());
    }

    #[test]
    fn non_conflicting_subset_is_applied_greedily() {
        let u = unit("class Abcdefghijklmnopqrstuvwxyz {}");
        let mut plan = PatchPlan::new();
        plan.push(fix(&[(6, 7, "Z")]), "Keep");
        plan.push(fix(&[(10, 15, "x")]), "Early");
        plan.push(fix(&[(12, 20, "y")]), "Late");

        let partial = plan.apply_non_conflicting(&u).unwrap();
        assert_eq!(partial.applied, vec![0, 1]);
        assert_eq!(partial.skipped.len(), 1);
        assert_eq!(partial.skipped[0].fix, 2);
        assert_eq!(partial.text, "class Zbcdxjklmnopqrstuvwxyz {}");
    }

    #[test]
    fn fix_rewriting_its_own_import_point_is_skipped() {
        let u = unit("package p;\nclass A {}");
        let mut plan = PatchPlan::new();
        plan.push(fix(&[(17, 18, "B")]), "Rename");
        plan.push(
            SuggestedFix::builder()
                .replace(range(8, 12), "q;\nc")
                .add_import("java.util.Objects")
                .build()
                .unwrap(),
            "Wide",
        );

        let partial = plan.apply_non_conflicting(&u).unwrap();
        assert_eq!(partial.applied, vec![0]);
        assert_eq!(partial.text, "package p;\nclass B {}");
        let [skipped] = partial.skipped.as_slice() else {
            panic!("expected one skipped fix, got {:?}", partial.skipped);
        };
        assert_eq!(skipped.fix, 1);
        assert_eq!(skipped.conflict.first.range, range(8, 12));
        assert_eq!(skipped.conflict.second.range, range(10, 10));
        assert_eq!(skipped.conflict.second.origin.rule, "Wide");
    }

    #[test]
    fn out_of_bounds_edit_is_an_error() {
        let u = unit("class A {}");
        let mut plan = PatchPlan::new();
        plan.push(fix(&[(5, 500, "")]), "Big");
        assert!(matches!(
            plan.apply(&u),
            Err(PatchError::OutOfBounds { len: 10, .. })
        ));
    }

    #[test]
    fn imports_are_added_once_after_existing_imports() {
        let src = "package p;\n\nimport java.util.List;\n\nclass A {}";
        let u = unit(src);
        let start = src.find("A {").unwrap();
        let mut plan = PatchPlan::new();
        for rule in ["First", "Second"] {
            let f = SuggestedFix::builder()
                .replace(range(start, start + 1), "B")
                .add_import("java.util.Objects")
                .add_import("java.util.List")
                .add_import("java.lang.String")
                .build()
                .unwrap();
            plan.push(f, rule);
        }
        assert_eq!(
            plan.apply(&u).unwrap(),
            "package p;\n\nimport java.util.List;\nimport java.util.Objects;\n\nclass B {}"
        );
    }

    #[test]
    fn imports_without_existing_imports() {
        let with_package = unit("package p;\nclass A {}");
        let mut plan = PatchPlan::new();
        plan.push(
            SuggestedFix::builder()
                .add_import("java.util.Objects")
                .build()
                .unwrap(),
            "Import",
        );
        assert_eq!(
            plan.apply(&with_package).unwrap(),
            "package p;\n\nimport java.util.Objects;\nclass A {}"
        );

        let bare = unit("class A {}");
        assert_eq!(
            plan.apply(&bare).unwrap(),
            "import java.util.Objects;\n\nclass A {}"
        );

        let wildcard = unit("import java.util.*;\nclass A {}");
        assert_eq!(plan.apply(&wildcard).unwrap(), wildcard.text());
    }

    #[test]
    fn apply_edits_rejects_overlap() {
        let edits = vec![
            TextEdit::new(range(0, 10), "a"),
            TextEdit::new(range(5, 15), "b"),
        ];
        assert_eq!(
            apply_edits("0123456789abcdefghij", &edits),
            Err(PatchError::Overlap {
                first: range(0, 10),
                second: range(5, 15)
            })
        );
    }

    #[test]
    fn apply_edits_rejects_split_characters() {
        let edits = vec![TextEdit::new(range(1, 2), "x")];
        assert_eq!(
            apply_edits("é", &edits),
            Err(PatchError::NotCharBoundary { offset: 1 })
        );
    }
}
