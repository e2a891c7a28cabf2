use bugscan::create_default_engine;
use bugscan::fixer::{self, FixOptions};

#[test]
fn class_level_suppression_covers_members() {
    let engine = create_default_engine().unwrap();

    let src = r#"
@SuppressWarnings("ReferenceEquality")
class Cache {
    boolean hit(String key, String last) {
        return key == last;
    }
}
"#;

    let (unit, findings) = engine.scan_source(src).unwrap();
    assert_eq!(findings.len(), 1);
    let diags = engine.diagnostics(&unit, &findings);
    assert!(
        diags.is_empty(),
        "expected class-level suppression to hide ReferenceEquality, got: {diags:#?}"
    );
}

#[test]
fn suppressing_another_rule_does_not_hide() {
    let engine = create_default_engine().unwrap();

    let src = r#"
class Cache {
    @SuppressWarnings({"unchecked", "BooleanLiteralComparison"})
    boolean hit(String key, String last) {
        return key == last;
    }
}
"#;

    let (unit, findings) = engine.scan_source(src).unwrap();
    let diags = engine.diagnostics(&unit, &findings);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].rule, "ReferenceEquality");
}

#[test]
fn suppress_all_on_a_field() {
    let engine = create_default_engine().unwrap();

    let src = r#"
class Point {
    @SuppressWarnings("all")
    int x, y;

    int z, w;
}
"#;

    let (unit, findings) = engine.scan_source(src).unwrap();
    let diags = engine.diagnostics(&unit, &findings);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].span.start.line, 6);
}

#[test]
fn suppressed_findings_are_not_fixed() {
    let engine = create_default_engine().unwrap();

    let src = r#"
class Counter {
    @SuppressWarnings("MultipleVariableDeclarations")
    void legacy() { int x = 1, y = 2; }

    void fresh() { int a = 1, b = 2; }
}
"#;

    let (unit, findings) = engine.scan_source(src).unwrap();
    assert_eq!(findings.len(), 2);
    assert_eq!(engine.diagnostics(&unit, &findings).len(), 1);

    let fixable = engine.fixable(&unit, &findings);
    assert_eq!(fixable.len(), 1);
    let result = fixer::apply_fixes(&unit, &fixable, &FixOptions::default()).unwrap();
    assert_eq!(result.fixes_applied, 1);
    assert!(result.fixed_source.contains("int x = 1, y = 2;"));
    assert!(!result.fixed_source.contains("int a = 1, b = 2;"));

    let fixed = engine.apply_fixes(&unit, &findings).unwrap();
    assert_eq!(fixed, result.fixed_source);
}
