//! Tests for suggested fixes and patch plans.
//!
//! These tests verify that fixes merge deterministically, that conflicts are
//! reported with both origins, and that applying fixes produces valid code.

use bugscan::create_default_engine;
use bugscan::fix::SuggestedFix;
use bugscan::plan::{PatchError, PatchPlan};
use bugscan::source::TextRange;
use bugscan::tree::NodeKind;
use bugscan::unit::CompilationUnit;

fn unit(src: &str) -> CompilationUnit {
    bugscan::host::parse_java(src).expect("source should parse")
}

fn range(start: usize, end: usize) -> TextRange {
    TextRange::new(start, end).unwrap()
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn split_declaration_merges_regardless_of_construction_order() {
    let src = "class A {\nint x = 1, y = 2;\n}";
    let u = unit(src);
    let decl = u
        .tree
        .root()
        .preorder()
        .find(|n| n.kind() == NodeKind::FieldDecl)
        .unwrap();
    let comma = src.find(", y").unwrap();
    let second = src.find(" = 2").unwrap() + " = 2".len();

    let delete = SuggestedFix::builder()
        .replace_range(comma, second, "")
        .build()
        .unwrap();
    let append = SuggestedFix::builder()
        .postfix_with(decl, "\nint y = 2;")
        .build()
        .unwrap();

    let mut forward = PatchPlan::new();
    forward.push(delete.clone(), "delete").push(append.clone(), "append");
    let mut backward = PatchPlan::new();
    backward.push(append, "append").push(delete, "delete");

    let expected = "class A {\nint x = 1;\nint y = 2;\n}";
    assert_eq!(forward.apply(&u).unwrap(), expected);
    assert_eq!(backward.apply(&u).unwrap(), expected);
}

#[test]
fn overlapping_fixes_conflict_with_both_origins() {
    let u = unit("class A { int abcdefghij = 0; }");
    let mut plan = PatchPlan::new();
    plan.push(
        SuggestedFix::builder().replace(range(10, 15), "x").build().unwrap(),
        "First",
    );
    plan.push(
        SuggestedFix::builder().replace(range(12, 20), "y").build().unwrap(),
        "Second",
    );

    let Err(PatchError::Conflict(conflict)) = plan.apply(&u) else {
        panic!("expected a merge conflict");
    };
    assert_eq!(conflict.first.range, range(10, 15));
    assert_eq!(conflict.first.origin.rule, "First");
    assert_eq!(conflict.second.range, range(12, 20));
    assert_eq!(conflict.second.origin.rule, "Second");
    assert_eq!(plan.conflicts(&u).len(), 1);
}

#[test]
fn non_conflicting_subset_skips_later_overlaps() {
    let src = "class A { int abcdefghij = 0; }";
    let u = unit(src);
    let mut plan = PatchPlan::new();
    plan.push(SuggestedFix::builder().replace(range(10, 15), "x").build().unwrap(), "A");
    plan.push(SuggestedFix::builder().replace(range(12, 20), "y").build().unwrap(), "B");
    plan.push(SuggestedFix::builder().replace(range(25, 26), ":").build().unwrap(), "C");

    let partial = plan.apply_non_conflicting(&u).unwrap();
    assert_eq!(partial.applied, vec![0, 2]);
    assert_eq!(partial.skipped.len(), 1);
    assert_eq!(partial.skipped[0].fix, 1);
    assert_eq!(partial.text, "class A { xbcdefghij : 0; }");
}

#[test]
fn empty_plan_and_empty_fix_are_identity() {
    let src = "class A { }";
    let u = unit(src);
    assert_eq!(PatchPlan::new().apply(&u).unwrap(), src);
    assert_eq!(bugscan::apply_fixes(&u, Vec::new()).unwrap(), src);

    let fix = SuggestedFix::builder().build().unwrap();
    assert!(fix.is_empty());
    assert_eq!(bugscan::apply_fixes(&u, vec![fix]).unwrap(), src);
}

#[test]
fn self_overlapping_fix_fails_to_build() {
    let result = SuggestedFix::builder()
        .replace(range(0, 5), "a")
        .replace(range(3, 8), "b")
        .build();
    assert!(result.is_err());
}

// ============================================================================
// Rule fixes through the engine
// ============================================================================

#[test]
fn rewriting_a_split_declarator_conflicts() {
    let src = "class A {\n    void m(boolean f, String s, String t) {\n        boolean a = f == true, b = s != t;\n    }\n}";
    let engine = create_default_engine().unwrap();
    let u = unit(src);
    let findings = engine.scan(&u);
    let rules: Vec<_> = findings.iter().map(|f| f.rule.name).collect();
    assert_eq!(
        rules,
        vec![
            "MultipleVariableDeclarations",
            "BooleanLiteralComparison",
            "ReferenceEquality"
        ]
    );

    // the split copies the second declarator's original text, so rewriting
    // it in the same pass overlaps
    let plan = PatchPlan::from_findings(&findings);
    let conflicts = plan.conflicts(&u);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].first.origin.rule, "MultipleVariableDeclarations");
    assert_eq!(conflicts[0].second.origin.rule, "ReferenceEquality");
}

#[test]
fn imports_are_shared_between_fixes() {
    let src = "import java.util.List;\n\nclass A {\n    boolean m(String a, String b) {\n        return a == b || b != a;\n    }\n}";
    let engine = create_default_engine().unwrap();
    let u = unit(src);
    let findings = engine.scan(&u);
    assert_eq!(findings.len(), 2);

    let fixed = engine.apply_fixes(&u, &findings).unwrap();
    assert_eq!(
        fixed,
        "import java.util.List;\nimport java.util.Objects;\n\nclass A {\n    boolean m(String a, String b) {\n        return Objects.equals(a, b) || !Objects.equals(b, a);\n    }\n}"
    );
}

#[test]
fn existing_import_is_not_repeated() {
    let src = "import java.util.*;\n\nclass A {\n    boolean m(String a, String b) {\n        return a == b;\n    }\n}";
    let engine = create_default_engine().unwrap();
    let u = unit(src);
    let findings = engine.scan(&u);
    let fixed = engine.apply_fixes(&u, &findings).unwrap();
    assert_eq!(
        fixed,
        "import java.util.*;\n\nclass A {\n    boolean m(String a, String b) {\n        return Objects.equals(a, b);\n    }\n}"
    );
}
