//! Registration glue between the `ui-` grammar and a stylesheet host.
//!
//! A host hands over the class-name candidates it found. For every candidate
//! whose leading variant segment parses as a `ui-` variant, the plugin
//! registers that variant name with a transform that turns a matched class
//! name into its selector.

use crate::selector::{build, Selector};
use crate::variant::{parse, ParseFailure, Relation, VariantDescriptor};
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub type SelectorTransform = Box<dyn Fn(&str) -> Selector + Send + Sync>;

/// Receives variant registrations.
pub trait VariantHost {
    fn add_variant(&mut self, name: &str, transform: SelectorTransform);
}

/// The six shapes the `ui-` grammar can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantFamily {
    State,
    NotState,
    Group,
    NotGroup,
    Peer,
    NotPeer,
}

impl VariantFamily {
    pub const ALL: [VariantFamily; 6] = [
        VariantFamily::State,
        VariantFamily::NotState,
        VariantFamily::Group,
        VariantFamily::NotGroup,
        VariantFamily::Peer,
        VariantFamily::NotPeer,
    ];

    pub fn of(descriptor: &VariantDescriptor) -> Self {
        match (descriptor.relation, descriptor.negated) {
            (Relation::SelfState, false) => VariantFamily::State,
            (Relation::SelfState, true) => VariantFamily::NotState,
            (Relation::Group, false) => VariantFamily::Group,
            (Relation::Group, true) => VariantFamily::NotGroup,
            (Relation::Peer, false) => VariantFamily::Peer,
            (Relation::Peer, true) => VariantFamily::NotPeer,
        }
    }

    /// Literal text that precedes the state name.
    pub fn prefix(self) -> &'static str {
        match self {
            VariantFamily::State => "ui-",
            VariantFamily::NotState => "ui-not-",
            VariantFamily::Group => "ui-group-",
            VariantFamily::NotGroup => "ui-not-group-",
            VariantFamily::Peer => "ui-peer-",
            VariantFamily::NotPeer => "ui-not-peer-",
        }
    }

    pub fn relation(self) -> Relation {
        match self {
            VariantFamily::State | VariantFamily::NotState => Relation::SelfState,
            VariantFamily::Group | VariantFamily::NotGroup => Relation::Group,
            VariantFamily::Peer | VariantFamily::NotPeer => Relation::Peer,
        }
    }

    pub fn negated(self) -> bool {
        matches!(
            self,
            VariantFamily::NotState | VariantFamily::NotGroup | VariantFamily::NotPeer
        )
    }

    /// Variant name for `state` in this family, e.g. `ui-not-group-open`.
    pub fn variant_name(self, state: &str) -> String {
        format!("{}{}", self.prefix(), state)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Variant names handed to the host, in registration order.
    pub registered: Vec<String>,
    /// Tokens that matched the prefixes but carried no state.
    pub empty_states: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiStatePlugin {
    pub warn_on_empty_state: bool,
}

impl Default for UiStatePlugin {
    fn default() -> Self {
        Self {
            warn_on_empty_state: true,
        }
    }
}

impl UiStatePlugin {
    pub fn new(warn_on_empty_state: bool) -> Self {
        Self {
            warn_on_empty_state,
        }
    }

    /// Registers every distinct `ui-` variant found among `candidates`.
    pub fn register<I, S, H>(&self, candidates: I, host: &mut H) -> RegistrationReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        H: VariantHost + ?Sized,
    {
        let mut report = RegistrationReport::default();
        let mut seen = BTreeSet::new();

        for candidate in candidates {
            let candidate = candidate.as_ref();
            let Some(token) = leading_variant(candidate) else {
                continue;
            };
            if !seen.insert(token.to_string()) {
                continue;
            }

            match parse(token) {
                Ok(descriptor) => {
                    debug!(
                        variant = token,
                        family = ?VariantFamily::of(&descriptor),
                        "registering variant"
                    );
                    host.add_variant(token, transform_for(descriptor));
                    report.registered.push(token.to_string());
                }
                Err(ParseFailure::NotUiVariant { .. }) => {}
                Err(err @ ParseFailure::EmptyState { .. }) => {
                    if self.warn_on_empty_state {
                        warn!(class = candidate, "skipping class: {}", err);
                    }
                    report.empty_states.push(token.to_string());
                }
            }
        }

        report
    }

    /// Resolves the selector for one class without going through a host.
    pub fn selector_for(&self, class_name: &str) -> Option<Selector> {
        let token = leading_variant(class_name)?;
        let descriptor = parse(token).ok()?;
        Some(build(&descriptor, class_name))
    }
}

pub fn transform_for(descriptor: VariantDescriptor) -> SelectorTransform {
    Box::new(move |class_name: &str| build(&descriptor, class_name))
}

/// The variant segment before the first top-level `:`, if any.
pub fn leading_variant(class_name: &str) -> Option<&str> {
    let (variant, _) = split_variant(class_name)?;
    Some(variant)
}

/// Splits `variant:utility` at the first `:` outside brackets and parentheses.
pub fn split_variant(class_name: &str) -> Option<(&str, &str)> {
    let mut paren_depth = 0usize;
    let mut bracket_depth = 0usize;

    for (idx, ch) in class_name.char_indices() {
        match ch {
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            ':' if paren_depth == 0 && bracket_depth == 0 => {
                return Some((&class_name[..idx], &class_name[idx + 1..]));
            }
            _ => {}
        }
    }

    None
}
