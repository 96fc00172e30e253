//! Recognizer for the `ui-` variant grammar.
//!
//! A token is matched against an ordered list of literal prefixes:
//! `ui-`, then an optional `not-`, then an optional `group-` or `peer-`.
//! Whatever is left is the state name.

use thiserror::Error;

const UI_PREFIX: &str = "ui-";

/// Where the state attribute is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    /// The element carrying the class.
    SelfState,
    /// An ancestor marked with `.group`.
    Group,
    /// A preceding sibling marked with `.peer`.
    Peer,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantDescriptor {
    pub relation: Relation,
    pub negated: bool,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("`{token}` is not a ui- variant")]
    NotUiVariant { token: String },

    #[error("`{token}` has no state name")]
    EmptyState { token: String },
}

#[derive(Debug, Clone, Copy)]
enum Effect {
    Negate,
    Relate(Relation),
}

/// Optional segments after `ui-`. Each group is tried once, in order, and at
/// most one rule of a group applies.
const OPTIONAL_RULES: [&[(&str, Effect)]; 2] = [
    &[("not-", Effect::Negate)],
    &[
        ("group-", Effect::Relate(Relation::Group)),
        ("peer-", Effect::Relate(Relation::Peer)),
    ],
];

pub fn parse(token: &str) -> Result<VariantDescriptor, ParseFailure> {
    let Some(mut rest) = token.strip_prefix(UI_PREFIX) else {
        return Err(ParseFailure::NotUiVariant {
            token: token.to_string(),
        });
    };

    let mut relation = Relation::SelfState;
    let mut negated = false;

    for group in OPTIONAL_RULES {
        let matched = group
            .iter()
            .find_map(|(literal, effect)| rest.strip_prefix(literal).map(|tail| (tail, *effect)));
        if let Some((tail, effect)) = matched {
            rest = tail;
            match effect {
                Effect::Negate => negated = true,
                Effect::Relate(value) => relation = value,
            }
        }
    }

    if rest.is_empty() {
        return Err(ParseFailure::EmptyState {
            token: token.to_string(),
        });
    }

    Ok(VariantDescriptor {
        relation,
        negated,
        state: rest.to_string(),
    })
}
