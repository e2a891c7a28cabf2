//! The closed set of rules a scan runs, indexed by node kind.

use crate::context::ScanContext;
use crate::error::{BugscanError, BugscanResult};
use crate::matchers::Matcher;
use crate::rule::{BugChecker, CheckResult, RuleDescriptor, RuleSettings};
use crate::rules;
use crate::tree::{NodeKind, NodeRef};
use std::collections::HashMap;
use std::sync::Arc;

type Handler = Arc<dyn Fn(NodeRef<'_>, &ScanContext<'_>) -> CheckResult + Send + Sync>;

/// One registered rule: the node kinds it applies to, the matcher that gates
/// it and the handler that produces its finding.
#[derive(Clone)]
pub struct RegisteredRule {
    pub descriptor: &'static RuleDescriptor,
    pub kinds: Vec<NodeKind>,
    pub matcher: Matcher,
    handler: Handler,
}

impl std::fmt::Debug for RegisteredRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredRule")
            .field("name", &self.descriptor.name)
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

impl RegisteredRule {
    pub fn run(&self, node: NodeRef<'_>, ctx: &ScanContext<'_>) -> CheckResult {
        (self.handler)(node, ctx)
    }
}

/// Registry of rules. Immutable once built and shared read-only between
/// threads.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    rules: Vec<RegisteredRule>,
    by_kind: HashMap<NodeKind, Vec<usize>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule given as a matcher plus a handler closure. Rule names
    /// must be unique.
    pub fn register(
        &mut self,
        descriptor: &'static RuleDescriptor,
        kinds: impl IntoIterator<Item = NodeKind>,
        matcher: Matcher,
        handler: impl Fn(NodeRef<'_>, &ScanContext<'_>) -> CheckResult + Send + Sync + 'static,
    ) -> BugscanResult<&mut Self> {
        self.insert(RegisteredRule {
            descriptor,
            kinds: kinds.into_iter().collect(),
            matcher,
            handler: Arc::new(handler),
        })
    }

    pub fn register_checker(
        &mut self,
        checker: impl BugChecker + 'static,
    ) -> BugscanResult<&mut Self> {
        let checker = Arc::new(checker);
        let descriptor = checker.descriptor();
        let kinds = checker.node_kinds().to_vec();
        let matcher = checker.matcher();
        self.register(descriptor, kinds, matcher, move |node, ctx| {
            checker.check(node, ctx)
        })
    }

    /// Builder-style [`Self::register_checker`].
    pub fn with_checker(mut self, checker: impl BugChecker + 'static) -> BugscanResult<Self> {
        self.register_checker(checker)?;
        Ok(self)
    }

    fn insert(&mut self, rule: RegisteredRule) -> BugscanResult<&mut Self> {
        if self.find_descriptor(rule.descriptor.name).is_some() {
            return Err(BugscanError::DuplicateRule(rule.descriptor.name.to_string()));
        }
        let idx = self.rules.len();
        let mut kinds = rule.kinds.clone();
        kinds.sort();
        kinds.dedup();
        for kind in kinds {
            self.by_kind.entry(kind).or_default().push(idx);
        }
        self.rules.push(rule);
        Ok(self)
    }

    /// Catalog with every built-in rule.
    pub fn default_rules() -> BugscanResult<Self> {
        let mut catalog = Self::new();
        rules::register_all(&mut catalog)?;
        Ok(catalog)
    }

    /// Copy of this catalog restricted to rules enabled by `settings` and, when
    /// `only` is non-empty, named in it. Registration order is preserved.
    pub fn filtered(&self, settings: &RuleSettings, only: &[String]) -> Self {
        let mut out = Self::new();
        for rule in &self.rules {
            let wanted = only.is_empty() || only.iter().any(|n| n == rule.descriptor.name);
            if wanted && settings.is_enabled(rule.descriptor) {
                // names are already unique
                let _ = out.insert(rule.clone());
            }
        }
        out
    }

    /// Rules registered for `kind`, in registration order.
    pub fn rules_for(&self, kind: NodeKind) -> impl Iterator<Item = &RegisteredRule> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|&idx| &self.rules[idx])
    }

    pub fn rules(&self) -> impl Iterator<Item = &RegisteredRule> {
        self.rules.iter()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static RuleDescriptor> + '_ {
        self.rules.iter().map(|r| r.descriptor)
    }

    pub fn find_descriptor(&self, name: &str) -> Option<&'static RuleDescriptor> {
        self.descriptors().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::SeverityLevel;
    use crate::matchers::anything;
    use crate::rule::RuleCategory;

    static FIRST: RuleDescriptor = RuleDescriptor::warning("First", RuleCategory::Style, "first");
    static SECOND: RuleDescriptor =
        RuleDescriptor::warning("Second", RuleCategory::Style, "second");

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .register(&FIRST, [NodeKind::Identifier], anything(), |_, _| Ok(None))
            .unwrap();
        catalog
            .register(
                &SECOND,
                [NodeKind::Literal, NodeKind::Identifier, NodeKind::Literal],
                anything(),
                |_, _| Ok(None),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn dispatch_index_keeps_registration_order() {
        let catalog = catalog();
        let names: Vec<_> = catalog
            .rules_for(NodeKind::Identifier)
            .map(|r| r.descriptor.name)
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert_eq!(catalog.rules_for(NodeKind::Literal).count(), 1);
        assert_eq!(catalog.rules_for(NodeKind::Block).count(), 0);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut catalog = catalog();
        let err = catalog
            .register(&FIRST, [NodeKind::Block], anything(), |_, _| Ok(None))
            .unwrap_err();
        assert!(matches!(err, BugscanError::DuplicateRule(name) if name == "First"));
    }

    #[test]
    fn filtering_respects_settings_and_only() {
        let catalog = catalog();
        let settings = RuleSettings::default().disable(["First".to_string()]);
        let filtered = catalog.filtered(&settings, &[]);
        assert_eq!(filtered.descriptors().map(|d| d.name).collect::<Vec<_>>(), vec!["Second"]);

        let only = catalog.filtered(&RuleSettings::default(), &["First".to_string()]);
        assert_eq!(only.len(), 1);
        assert!(only.find_descriptor("First").is_some());

        let raised = RuleSettings::default().with_config_levels(
            [("Second".to_string(), SeverityLevel::Error)].into_iter().collect(),
        );
        assert_eq!(catalog.filtered(&raised, &[]).len(), 2);
    }

    #[test]
    fn catalog_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Catalog>();
    }
}
