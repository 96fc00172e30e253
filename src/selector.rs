use crate::variant::{Relation, VariantDescriptor};
use std::fmt;
use std::ops::Deref;

/// A finished CSS selector for one class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector(String);

impl Selector {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for Selector {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl AsRef<str> for Selector {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<Selector> for String {
    fn from(value: Selector) -> Self {
        value.0
    }
}

/// Escapes a class name for use as a class selector: every `:` becomes `\:`.
pub fn escape_class_name(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() + 4);

    for ch in class.chars() {
        if ch == ':' {
            escaped.push_str("\\:");
        } else {
            escaped.push(ch);
        }
    }

    escaped
}

pub fn build(descriptor: &VariantDescriptor, class_name: &str) -> Selector {
    let class_selector = format!(".{}", escape_class_name(class_name));
    let condition = state_condition(&descriptor.state, descriptor.negated);

    let selector = match descriptor.relation {
        Relation::SelfState => format!("{}{}", class_selector, condition),
        Relation::Group => format!(".group{} {}", condition, class_selector),
        Relation::Peer => format!(".peer{} ~ {}", condition, class_selector),
    };

    Selector(selector)
}

fn state_condition(state: &str, negated: bool) -> String {
    if negated {
        format!(":not([data-state=\"{}\"])", state)
    } else {
        format!("[data-state=\"{}\"]", state)
    }
}
