//! Suggested fixes: position-addressed text edits attached to one finding.
//!
//! A [`SuggestedFix`] is built fluently through [`SuggestedFixBuilder`] and is
//! immutable afterwards. Construction errors (bad offsets, overlapping edits)
//! are collected while building and surface once, from
//! [`SuggestedFixBuilder::build`].
//!
//! ## Normalization
//!
//! - Insertions at the same offset coalesce into one, in the order they were
//!   requested.
//! - A replacement requested twice with identical range and text is kept once.
//! - Any other pair of overlapping edits is a [`FixError::SelfOverlap`].

use crate::plan::{PatchError, apply_edits};
use crate::source::{InvalidRange, SourceFile, TextRange};
use crate::tree::NodeRef;
use serde::Serialize;
use thiserror::Error;

/// Error raised while building a suggested fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
    #[error("fix edits overlap: {first} and {second}")]
    SelfOverlap { first: TextRange, second: TextRange },

    #[error("adjusting {range} by ({start_adjust}, {end_adjust}) yields an invalid range")]
    InvalidAdjustment {
        range: TextRange,
        start_adjust: isize,
        end_adjust: isize,
    },

    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),
}

/// Replace the text in `range` with `replacement`.
///
/// Offsets are byte offsets into the source the edit was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TextEdit {
    pub range: TextRange,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(range: TextRange, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn delete(range: TextRange) -> Self {
        Self::new(range, String::new())
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::new(TextRange::empty(offset), text)
    }

    pub fn is_insertion(&self) -> bool {
        self.range.is_empty()
    }

    pub fn overlaps_with(&self, other: &TextEdit) -> bool {
        self.range.overlaps(&other.range)
    }
}

/// An immutable, internally consistent set of edits for one finding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuggestedFix {
    edits: Vec<TextEdit>,
    short_description: Option<String>,
    imports: Vec<String>,
}

impl SuggestedFix {
    pub fn builder() -> SuggestedFixBuilder {
        SuggestedFixBuilder::default()
    }

    /// Fix that replaces `node` with `replacement`.
    pub fn replace(node: NodeRef<'_>, replacement: impl Into<String>) -> Result<Self, FixError> {
        Self::builder().replace_node(node, replacement).build()
    }

    /// Fix that deletes `node`.
    pub fn delete(node: NodeRef<'_>) -> Result<Self, FixError> {
        Self::builder().delete_node(node).build()
    }

    /// Edits sorted by `(start, end)`, pairwise non-overlapping.
    pub fn edits(&self) -> &[TextEdit] {
        &self.edits
    }

    pub fn short_description(&self) -> Option<&str> {
        self.short_description.as_deref()
    }

    /// Fully-qualified names this fix needs imported.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// True when the fix would change nothing.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.imports.is_empty()
    }

    /// Apply only this fix's own edits to `source`. Imports are handled by
    /// [`crate::plan::PatchPlan`].
    pub fn apply_to(&self, source: &str) -> Result<String, PatchError> {
        apply_edits(source, &self.edits)
    }
}

/// Fluent builder for [`SuggestedFix`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct SuggestedFixBuilder {
    edits: Vec<TextEdit>,
    error: Option<FixError>,
    short_description: Option<String>,
    imports: Vec<String>,
}

impl SuggestedFixBuilder {
    fn push(mut self, edit: TextEdit) -> Self {
        self.edits.push(edit);
        self
    }

    fn fail(mut self, error: FixError) -> Self {
        self.error.get_or_insert(error);
        self
    }

    pub fn replace(self, range: TextRange, replacement: impl Into<String>) -> Self {
        self.push(TextEdit::new(range, replacement))
    }

    pub fn replace_node(self, node: NodeRef<'_>, replacement: impl Into<String>) -> Self {
        self.replace(node.range(), replacement)
    }

    /// Replace the raw byte range `[start, end)`.
    pub fn replace_range(self, start: usize, end: usize, replacement: impl Into<String>) -> Self {
        match TextRange::new(start, end) {
            Ok(range) => self.replace(range, replacement),
            Err(err) => self.fail(err.into()),
        }
    }

    /// Replace `node` with its bounds shifted by the given (signed) amounts,
    /// e.g. `(0, 1)` to also swallow a trailing `;`.
    pub fn replace_adjusted(
        self,
        node: NodeRef<'_>,
        start_adjust: isize,
        end_adjust: isize,
        replacement: impl Into<String>,
    ) -> Self {
        let range = node.range();
        let shifted = range
            .start()
            .checked_add_signed(start_adjust)
            .zip(range.end().checked_add_signed(end_adjust))
            .and_then(|(start, end)| TextRange::new(start, end).ok());
        match shifted {
            Some(range) => self.replace(range, replacement),
            None => self.fail(FixError::InvalidAdjustment {
                range,
                start_adjust,
                end_adjust,
            }),
        }
    }

    pub fn prefix_with(self, node: NodeRef<'_>, text: impl Into<String>) -> Self {
        self.push(TextEdit::insert(node.range().start(), text))
    }

    pub fn postfix_with(self, node: NodeRef<'_>, text: impl Into<String>) -> Self {
        self.push(TextEdit::insert(node.range().end(), text))
    }

    pub fn insert_at(self, offset: usize, text: impl Into<String>) -> Self {
        self.push(TextEdit::insert(offset, text))
    }

    pub fn delete_node(self, node: NodeRef<'_>) -> Self {
        self.push(TextEdit::delete(node.range()))
    }

    pub fn delete_range(self, range: TextRange) -> Self {
        self.push(TextEdit::delete(range))
    }

    /// Exchange the source text of two nodes.
    pub fn swap(self, a: NodeRef<'_>, b: NodeRef<'_>, source: &SourceFile) -> Self {
        let text_a = source.slice(a.range()).unwrap_or_default().to_string();
        let text_b = source.slice(b.range()).unwrap_or_default().to_string();
        self.replace(a.range(), text_b).replace(b.range(), text_a)
    }

    /// Append every edit and import of `other`.
    pub fn merge(mut self, other: SuggestedFixBuilder) -> Self {
        if let Some(err) = other.error {
            self = self.fail(err);
        }
        self.edits.extend(other.edits);
        for import in other.imports {
            self = self.add_import(import);
        }
        if self.short_description.is_none() {
            self.short_description = other.short_description;
        }
        self
    }

    /// Append the edits of an already built fix.
    pub fn merge_fix(self, other: &SuggestedFix) -> Self {
        self.merge(SuggestedFixBuilder {
            edits: other.edits.clone(),
            error: None,
            short_description: other.short_description.clone(),
            imports: other.imports.clone(),
        })
    }

    pub fn short_description(mut self, description: impl Into<String>) -> Self {
        self.short_description = Some(description.into());
        self
    }

    /// Request an import of the fully-qualified `name`.
    pub fn add_import(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.imports.contains(&name) {
            self.imports.push(name);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.imports.is_empty()
    }

    pub fn build(self) -> Result<SuggestedFix, FixError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let edits = normalize(self.edits)?;
        Ok(SuggestedFix {
            edits,
            short_description: self.short_description,
            imports: self.imports,
        })
    }
}

/// Sort, coalesce same-offset insertions, drop identical duplicates and
/// reject overlaps.
fn normalize(mut edits: Vec<TextEdit>) -> Result<Vec<TextEdit>, FixError> {
    // stable: equal ranges keep request order
    edits.sort_by_key(|e| (e.range.start(), e.range.end()));

    let mut out: Vec<TextEdit> = Vec::with_capacity(edits.len());
    let mut furthest: Option<TextRange> = None;
    for edit in edits {
        if let Some(prev) = out.last_mut() {
            if prev.range == edit.range {
                if edit.is_insertion() {
                    prev.replacement.push_str(&edit.replacement);
                    continue;
                }
                if prev.replacement == edit.replacement {
                    continue;
                }
            }
        }
        if let Some(prev) = furthest {
            if edit.range.overlaps(&prev) {
                return Err(FixError::SelfOverlap {
                    first: prev,
                    second: edit.range,
                });
            }
        }
        if furthest.is_none_or(|prev| edit.range.end() > prev.end()) {
            furthest = Some(edit.range);
        }
        out.push(edit);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::java::parse_java;
    use crate::tree::NodeKind;

    fn range(start: usize, end: usize) -> TextRange {
        TextRange::new(start, end).unwrap()
    }

    #[test]
    fn edits_are_sorted() {
        let fix = SuggestedFix::builder()
            .replace(range(8, 13), "3")
            .replace(range(0, 3), "1")
            .replace(range(4, 7), "2")
            .build()
            .unwrap();
        let starts: Vec<_> = fix.edits().iter().map(|e| e.range.start()).collect();
        assert_eq!(starts, vec![0, 4, 8]);
        assert_eq!(fix.apply_to("one two three").unwrap(), "1 2 3");
    }

    #[test]
    fn overlapping_edits_fail_at_build() {
        let err = SuggestedFix::builder()
            .replace(range(0, 10), "a")
            .replace(range(5, 15), "b")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            FixError::SelfOverlap {
                first: range(0, 10),
                second: range(5, 15)
            }
        );

        // an insertion strictly inside a replaced range is an overlap too
        assert!(
            SuggestedFix::builder()
                .replace(range(0, 10), "a")
                .insert_at(4, "x")
                .build()
                .is_err()
        );
        // a nested range is caught even when a shorter edit sits between
        assert!(
            SuggestedFix::builder()
                .replace(range(0, 10), "a")
                .replace(range(2, 3), "b")
                .replace(range(4, 5), "c")
                .build()
                .is_err()
        );
    }

    #[test]
    fn same_range_with_different_text_conflicts() {
        let result = SuggestedFix::builder()
            .replace(range(2, 4), "a")
            .replace(range(2, 4), "b")
            .build();
        assert!(matches!(result, Err(FixError::SelfOverlap { .. })));
    }

    #[test]
    fn identical_replacements_are_kept_once() {
        let fix = SuggestedFix::builder()
            .replace(range(2, 4), "xy")
            .replace(range(2, 4), "xy")
            .build()
            .unwrap();
        assert_eq!(fix.edits().len(), 1);
    }

    #[test]
    fn insertions_at_one_offset_coalesce_in_order() {
        let fix = SuggestedFix::builder()
            .insert_at(5, "a")
            .replace(range(5, 7), "R")
            .insert_at(5, "b")
            .build()
            .unwrap();
        assert_eq!(
            fix.edits(),
            &[TextEdit::insert(5, "ab"), TextEdit::new(range(5, 7), "R")]
        );
        assert_eq!(fix.apply_to("01234567").unwrap(), "01234abR7");
    }

    #[test]
    fn touching_edits_do_not_overlap() {
        let fix = SuggestedFix::builder()
            .replace(range(0, 3), "x")
            .replace(range(3, 6), "y")
            .insert_at(6, "z")
            .build()
            .unwrap();
        assert_eq!(fix.apply_to("aaabbbccc").unwrap(), "xyzccc");
    }

    #[test]
    fn invalid_ranges_are_reported_at_build() {
        let err = SuggestedFix::builder()
            .replace_range(5, 3, "x")
            .replace_range(0, 1, "y")
            .build()
            .unwrap_err();
        assert_eq!(err, FixError::InvalidRange(InvalidRange { start: 5, end: 3 }));
    }

    #[test]
    fn node_anchored_operations() {
        let src = "class A { void m() { call(a, b); } }";
        let unit = parse_java(src).unwrap();
        let args: Vec<_> = unit
            .tree
            .root()
            .preorder()
            .filter(|n| n.kind() == NodeKind::Identifier)
            .collect();
        let stmt = unit
            .tree
            .root()
            .preorder()
            .find(|n| n.kind() == NodeKind::ExpressionStatement)
            .unwrap();

        let swapped = SuggestedFix::builder()
            .swap(args[0], args[1], &unit.source)
            .build()
            .unwrap();
        assert_eq!(
            swapped.apply_to(src).unwrap(),
            "class A { void m() { call(b, a); } }"
        );

        let wrapped = SuggestedFix::builder()
            .prefix_with(stmt, "if (ok) { ")
            .postfix_with(stmt, " }")
            .build()
            .unwrap();
        assert_eq!(
            wrapped.apply_to(src).unwrap(),
            "class A { void m() { if (ok) { call(a, b); } } }"
        );

        let call = stmt.children().next().unwrap();
        let trimmed = SuggestedFix::builder()
            .replace_adjusted(call, 0, 1, "")
            .build()
            .unwrap();
        assert_eq!(trimmed.apply_to(src).unwrap(), "class A { void m() {  } }");

        let bad = SuggestedFix::builder()
            .replace_adjusted(call, -1000, 0, "")
            .build();
        assert!(matches!(bad, Err(FixError::InvalidAdjustment { .. })));
    }

    #[test]
    fn merge_combines_edits_and_imports() {
        let a = SuggestedFix::builder()
            .replace(range(0, 1), "x")
            .add_import("java.util.Objects");
        let b = SuggestedFix::builder()
            .replace(range(2, 3), "y")
            .add_import("java.util.Objects")
            .short_description("b");
        let fix = a.merge(b).build().unwrap();
        assert_eq!(fix.edits().len(), 2);
        assert_eq!(fix.imports(), &["java.util.Objects".to_string()]);
        assert_eq!(fix.short_description(), Some("b"));

        let conflicting = SuggestedFix::builder()
            .replace(range(0, 2), "x")
            .merge(SuggestedFix::builder().replace(range(1, 3), "y"))
            .build();
        assert!(conflicting.is_err());
    }

    #[test]
    fn empty_fix() {
        let fix = SuggestedFix::builder().build().unwrap();
        assert!(fix.is_empty());
        assert_eq!(fix.apply_to("same").unwrap(), "same");
    }
}
