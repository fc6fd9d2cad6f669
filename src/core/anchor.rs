//! Named pf anchors
//!
//! An [`Anchor`] owns a [`RuleSet`] and knows how to load it into the live
//! anchor of the same name. Anchors are declarative: every commit replaces the
//! whole anchor ruleset with the current in-memory one.

use crate::core::error::Result;
use crate::core::exec::Executor;
use crate::core::firewall::{Action, Rule, RuleSet};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Anchor {
    name: String,
    rule_set: RuleSet,
    executor: Arc<dyn Executor>,
}

impl Anchor {
    pub(crate) fn new(name: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        Self {
            name: name.into(),
            rule_set: RuleSet::new(),
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// Returns a fresh rule with action `block`
    pub fn new_rule(&self) -> Rule {
        let mut rule = Rule::new();
        rule.set_action(Action::Block);
        rule
    }

    /// Adds a committed rule; uncommitted rules are ignored
    pub fn add_rule(&mut self, rule: Rule) {
        self.rule_set.add_rule(rule);
    }

    pub fn rules_text(&self) -> String {
        self.rule_set.rules_text()
    }

    /// Text piped to pfctl when the anchor is loaded
    pub(crate) fn payload(&self) -> String {
        let mut payload = self.rule_set.rules_text();
        payload.push('\n');
        payload
    }

    /// Loads the anchor's rules into pf, replacing whatever the anchor held.
    ///
    /// # Errors
    ///
    /// Returns the executor's error unchanged if pfctl fails.
    pub fn commit(&self) -> Result<()> {
        load_anchor(self.executor.as_ref(), self)
    }

    /// Flushes the live rules of this anchor. The in-memory ruleset is kept.
    ///
    /// # Errors
    ///
    /// Returns the executor's error unchanged if pfctl fails.
    pub fn flush(&self) -> Result<()> {
        self.executor
            .execute(&["-a", &self.name, "-F", "rules"], None)?;
        info!("Flushed rules in anchor {}", self.name);
        Ok(())
    }
}

/// Pipes `anchor`'s ruleset to `pfctl -a <name> -f - -v` through `executor`.
pub(crate) fn load_anchor(executor: &dyn Executor, anchor: &Anchor) -> Result<()> {
    let payload = anchor.payload();
    executor.execute(
        &["-a", &anchor.name, "-f", "-", "-v"],
        Some(payload.as_bytes()),
    )?;
    info!(
        "Loaded {} rule(s) into anchor {}",
        anchor.rule_set.len(),
        anchor.name
    );
    Ok(())
}
