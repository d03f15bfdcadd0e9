//! Placeholder templates with a typed variable set.

use std::marker::PhantomData;

/// Values substituted into a template's `__RIVET_*__` placeholders.
pub trait TemplateVars {
    fn apply(&self, content: &str) -> String;
}

/// Static text bound to the variable set that renders it.
#[derive(Debug, Clone, Copy)]
pub struct Template<V> {
    content: &'static str,
    _marker: PhantomData<V>,
}

impl<V> Template<V> {
    pub const fn new(content: &'static str) -> Self {
        Self {
            content,
            _marker: PhantomData,
        }
    }

    pub const fn content(&self) -> &'static str {
        self.content
    }
}

impl<V: TemplateVars> Template<V> {
    pub fn render(&self, vars: &V) -> String {
        vars.apply(self.content)
    }
}
