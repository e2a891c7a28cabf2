//! Built-in sample rules.
//!
//! Two are written as [`crate::rule::BugChecker`] types and one as a matcher
//! plus handler closure, covering both ways of registering a rule.

mod boolean_literal_comparison;
mod multiple_variable_declarations;
mod reference_equality;

pub use boolean_literal_comparison::BOOLEAN_LITERAL_COMPARISON;
pub use multiple_variable_declarations::MultipleVariableDeclarations;
pub use reference_equality::ReferenceEquality;

use crate::catalog::Catalog;
use crate::error::BugscanResult;

/// Register every built-in rule, in dispatch order.
pub fn register_all(catalog: &mut Catalog) -> BugscanResult<()> {
    catalog.register_checker(MultipleVariableDeclarations)?;
    catalog.register_checker(ReferenceEquality)?;
    boolean_literal_comparison::register(catalog)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::catalog::Catalog;
    use crate::diagnostics::Finding;
    use crate::host::java::parse_java;
    use crate::plan::PatchPlan;
    use crate::rule::RuleSettings;
    use crate::scanner::Scanner;
    use crate::unit::CompilationUnit;

    /// Scan `src` with the single built-in rule `name`.
    pub fn scan_with(name: &str, src: &str) -> (CompilationUnit, Vec<Finding>) {
        let settings = RuleSettings::default();
        let catalog = Catalog::default_rules()
            .unwrap()
            .filtered(&settings, &[name.to_string()]);
        assert_eq!(catalog.len(), 1, "unknown rule {name}");
        let unit = parse_java(src).unwrap();
        let findings = Scanner::new(&catalog, &settings).scan(&unit);
        (unit, findings)
    }

    /// Source after applying every fix rule `name` suggests.
    pub fn fixed(name: &str, src: &str) -> String {
        let (unit, findings) = scan_with(name, src);
        PatchPlan::from_findings(&findings).apply(&unit).unwrap()
    }
}
