//! Groups: ordered, possibly nested, collections of steps.

use std::collections::HashSet;

use crate::error::{Result, StepwiseError};
use crate::steps::{RetryPolicy, Step};

/// Hook invoked once when a group finishes.
pub type Hook<C> = Box<dyn Fn(&mut C) + Send + Sync>;

/// One entry of a group.
pub enum Entry<C> {
    Step(Step<C>),
    Group(Group<C>),
}

impl<C> Entry<C> {
    /// Key of the entry within its parent (step key or group name).
    pub fn key(&self) -> &str {
        match self {
            Entry::Step(step) => step.key(),
            Entry::Group(group) => group.name(),
        }
    }

    /// Number of leaf steps below (or at) this entry.
    pub fn step_count(&self) -> usize {
        match self {
            Entry::Step(_) => 1,
            Entry::Group(group) => group.step_count(),
        }
    }
}

/// An ordered collection of entries sharing one context and one rollback scope.
pub struct Group<C> {
    name: String,
    entries: Vec<Entry<C>>,
    retry: Option<RetryPolicy>,
    on_submit: Option<Hook<C>>,
    on_cancel: Option<Hook<C>>,
}

impl<C> Group<C> {
    /// Create an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            retry: None,
            on_submit: None,
            on_cancel: None,
        }
    }

    /// Append a step.
    pub fn step(mut self, step: Step<C>) -> Self {
        self.entries.push(Entry::Step(step));
        self
    }

    /// Append several steps in order.
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step<C>>) -> Self {
        self.entries.extend(steps.into_iter().map(Entry::Step));
        self
    }

    /// Append a nested group.
    pub fn group(mut self, group: Group<C>) -> Self {
        self.entries.push(Entry::Group(group));
        self
    }

    /// Append an entry in place.
    pub fn push(&mut self, entry: Entry<C>) {
        self.entries.push(entry);
    }

    /// Default retry policy for steps (and nested groups) without their own.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Fire once after every entry finished without failure or cancellation.
    pub fn on_submit(mut self, hook: impl Fn(&mut C) + Send + Sync + 'static) -> Self {
        self.on_submit = Some(Box::new(hook));
        self
    }

    /// Fire once when the group ends by cancellation or rollback.
    pub fn on_cancel(mut self, hook: impl Fn(&mut C) + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Entry<C>] {
        &self.entries
    }

    pub fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// Total number of leaf steps, nested groups included.
    pub fn step_count(&self) -> usize {
        self.entries.iter().map(Entry::step_count).sum()
    }

    pub(crate) fn submit_hook(&self) -> Option<&Hook<C>> {
        self.on_submit.as_ref()
    }

    pub(crate) fn cancel_hook(&self) -> Option<&Hook<C>> {
        self.on_cancel.as_ref()
    }

    /// Check structural preconditions before anything runs.
    ///
    /// Keys must be non-empty and unique within each group; nested groups
    /// are checked recursively.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(StepwiseError::ConfigValidationError {
                message: "group name must not be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            let key = entry.key();
            if key.trim().is_empty() {
                return Err(StepwiseError::ConfigValidationError {
                    message: format!("group '{}' contains a step with an empty key", self.name),
                });
            }
            if !seen.insert(key) {
                return Err(StepwiseError::DuplicateStepKey {
                    group: self.name.clone(),
                    key: key.to_string(),
                });
            }
            if let Entry::Group(child) = entry {
                child.validate()?;
            }
        }
        Ok(())
    }
}

impl<C> std::fmt::Debug for Group<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<_> = self.entries.iter().map(Entry::key).collect();
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("entries", &keys)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(key: &str) -> Step<()> {
        Step::sync(key, |_| Ok(()))
    }

    #[test]
    fn counts_nested_steps() {
        let group = Group::new("root")
            .step(noop("a"))
            .group(Group::new("inner").step(noop("b")).step(noop("c")))
            .step(noop("d"));
        assert_eq!(group.step_count(), 4);
        assert_eq!(group.entries().len(), 3);
    }

    #[test]
    fn unique_keys_validate() {
        let group = Group::new("root").steps([noop("a"), noop("b")]);
        assert!(group.validate().is_ok());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let group = Group::new("root").step(noop("a")).step(noop("a"));
        let err = group.validate().unwrap_err();
        assert!(matches!(
            err,
            StepwiseError::DuplicateStepKey { ref group, ref key } if group == "root" && key == "a"
        ));
    }

    #[test]
    fn group_name_collides_with_step_key() {
        let group = Group::new("root")
            .step(noop("db"))
            .group(Group::new("db").step(noop("x")));
        assert!(matches!(
            group.validate(),
            Err(StepwiseError::DuplicateStepKey { .. })
        ));
    }

    #[test]
    fn duplicates_in_nested_groups_are_rejected() {
        let group = Group::new("root")
            .step(noop("a"))
            .group(Group::new("inner").step(noop("x")).step(noop("x")));
        let err = group.validate().unwrap_err();
        assert!(matches!(err, StepwiseError::DuplicateStepKey { ref group, .. } if group == "inner"));
    }

    #[test]
    fn same_key_in_different_groups_is_allowed() {
        let group = Group::new("root")
            .step(noop("a"))
            .group(Group::new("inner").step(noop("a")));
        assert!(group.validate().is_ok());
    }

    #[test]
    fn empty_key_is_rejected() {
        let group = Group::new("root").step(noop(""));
        assert!(matches!(
            group.validate(),
            Err(StepwiseError::ConfigValidationError { .. })
        ));
    }
}
