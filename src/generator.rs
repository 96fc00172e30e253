use crate::plugin::{split_variant, SelectorTransform, UiStatePlugin, VariantHost};
use crate::selector::Selector;
use crate::variant::{parse, ParseFailure};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub minify: bool,
    pub warn_on_empty_state: bool,
    /// Merged over [`default_utilities`].
    pub utilities: BTreeMap<String, String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            minify: false,
            warn_on_empty_state: true,
            utilities: BTreeMap::new(),
        }
    }
}

impl From<&crate::config::Config> for GeneratorConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            minify: config.minify,
            warn_on_empty_state: config.warn_on_empty_state,
            utilities: config.utilities.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub css: CssOutput,
    pub class_count: usize,
    /// `ui-` classes dropped for an empty state or an unknown utility.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssOutput(String);

impl CssOutput {
    pub fn new(css: String) -> Self {
        Self(css)
    }

    /// Output with every whitespace run collapsed to a single space.
    pub fn normalized(&self) -> String {
        self.0.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Deref for CssOutput {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl fmt::Display for CssOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Variant name to selector transform.
#[derive(Default)]
pub struct VariantRegistry {
    variants: BTreeMap<String, SelectorTransform>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, name: &str, class_name: &str) -> Option<Selector> {
        self.variants
            .get(name)
            .map(|transform| transform(class_name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variants.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }
}

impl fmt::Debug for VariantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantRegistry")
            .field("variants", &self.variants.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl VariantHost for VariantRegistry {
    fn add_variant(&mut self, name: &str, transform: SelectorTransform) {
        self.variants.insert(name.to_string(), transform);
    }
}

pub fn default_utilities() -> BTreeMap<String, String> {
    [
        ("block", "display: block"),
        ("inline-block", "display: inline-block"),
        ("inline", "display: inline"),
        ("flex", "display: flex"),
        ("inline-flex", "display: inline-flex"),
        ("grid", "display: grid"),
        ("inline-grid", "display: inline-grid"),
        ("contents", "display: contents"),
        ("hidden", "display: none"),
        ("visible", "visibility: visible"),
        ("invisible", "visibility: hidden"),
    ]
    .into_iter()
    .map(|(name, declarations)| (name.to_string(), declarations.to_string()))
    .collect()
}

pub fn generate(classes: &[String], config: &GeneratorConfig) -> GenerationResult {
    let mut registry = VariantRegistry::new();
    let plugin = UiStatePlugin::new(config.warn_on_empty_state);
    plugin.register(classes, &mut registry);
    if registry.is_empty() {
        debug!("no ui- variants among {} classes", classes.len());
        return GenerationResult {
            css: CssOutput::new(String::new()),
            class_count: 0,
            skipped: classes
                .iter()
                .filter(|class| has_empty_state(class))
                .count(),
        };
    }

    let mut utilities = default_utilities();
    utilities.extend(
        config
            .utilities
            .iter()
            .map(|(name, declarations)| (name.clone(), declarations.clone())),
    );

    let mut rules = BTreeMap::<&str, String>::new();
    let mut skipped = 0;

    for class in classes {
        let Some((variant, utility)) = split_variant(class) else {
            continue;
        };
        let Some(selector) = registry.apply(variant, class) else {
            if has_empty_state(class) {
                skipped += 1;
            }
            continue;
        };
        let Some(declarations) = utilities.get(utility) else {
            debug!(class = class.as_str(), utility, "no declarations for utility");
            skipped += 1;
            continue;
        };
        if let Some(rule) = rule(&selector, declarations, config.minify) {
            rules.insert(class.as_str(), rule);
        }
    }

    let class_count = rules.len();
    let separator = if config.minify { "" } else { "\n" };
    let css = rules.into_values().collect::<Vec<_>>().join(separator);

    GenerationResult {
        css: CssOutput::new(css),
        class_count,
        skipped,
    }
}

fn has_empty_state(class: &str) -> bool {
    split_variant(class).is_some_and(|(variant, _)| {
        matches!(parse(variant), Err(ParseFailure::EmptyState { .. }))
    })
}

pub fn emit_css(result: &GenerationResult) -> String {
    result.css.to_string()
}

fn rule(selector: &str, declarations: &str, minify: bool) -> Option<String> {
    let declarations = split_declarations(declarations);
    if declarations.is_empty() {
        return None;
    }
    if minify {
        let body = declarations
            .iter()
            .map(|(property, value)| format!("{}:{}", property, value))
            .collect::<Vec<_>>()
            .join(";");
        return Some(format!("{}{{{}}}", selector, body));
    }
    let lines = declarations
        .iter()
        .map(|(property, value)| format!("  {}: {}", property, value))
        .collect::<Vec<_>>()
        .join(";\n");
    Some(format!("{} {{\n{}\n}}", selector, lines))
}

fn split_declarations(declarations: &str) -> Vec<(&str, &str)> {
    declarations
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim();
            let value = value.trim();
            if property.is_empty() || value.is_empty() {
                return None;
            }
            Some((property, value))
        })
        .collect()
}
