//! Prompt templates and `{{variable}}` substitution.
//!
//! Template content embeds placeholders of the form `{{name}}` where `name`
//! is word characters only. The derived `variables` list is always recomputed
//! from the content rather than trusted from input, so it cannot drift.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"));

/// A reusable prompt with named placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub id: String,
    pub name: String,
    pub content: String,
    pub category: String,
    /// Placeholder names appearing in `content`, first-occurrence order.
    #[serde(default)]
    pub variables: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Construction payload for a template; `variables` is derived from
/// `content` at creation time.
#[derive(Debug, Clone, Default)]
pub struct NewTemplate {
    pub name: String,
    pub content: String,
    pub category: String,
}

/// Field-wise update for a template; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

impl TemplatePatch {
    pub fn apply(&self, template: &mut PromptTemplate) {
        if let Some(name) = &self.name {
            template.name = name.clone();
        }
        if let Some(content) = &self.content {
            template.content = content.clone();
        }
        if let Some(category) = &self.category {
            template.category = category.clone();
        }
    }
}

/// Collect the distinct `{{name}}` placeholder names in `content`, in
/// first-occurrence order.
pub fn parse_template_variables(content: &str) -> Vec<String> {
    let mut variables: Vec<String> = Vec::new();
    for caps in VARIABLE_PATTERN.captures_iter(content) {
        let name = &caps[1];
        if !variables.iter().any(|v| v == name) {
            variables.push(name.to_string());
        }
    }
    variables
}

/// Substitute `{{name}}` placeholders with `values[name]` when that value is
/// present and non-empty; other placeholders stay literal. Plain string
/// substitution: values are not escaped and are never re-expanded.
pub fn fill_template(content: &str, values: &HashMap<String, String>) -> String {
    VARIABLE_PATTERN
        .replace_all(content, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(value) if !value.is_empty() => value.clone(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_first_occurrence_order_and_dedups() {
        let vars = parse_template_variables("{{b}} then {{a}}, {{b}} again, {{c}}");
        assert_eq!(vars, vec!["b", "a", "c"]);
    }

    #[test]
    fn parse_accepts_word_characters_only() {
        let vars = parse_template_variables("{{source_lang1}} {{not valid}} {{x-y}} {{ok}}");
        assert_eq!(vars, vec!["source_lang1", "ok"]);
    }

    #[test]
    fn parse_empty_content_yields_nothing() {
        assert!(parse_template_variables("no placeholders here").is_empty());
    }

    #[test]
    fn fill_substitutes_present_values_and_keeps_missing_literal() {
        let mut values = HashMap::new();
        values.insert("name".to_string(), "Ada".to_string());
        values.insert("empty".to_string(), String::new());
        let out = fill_template("hi {{name}}, {{empty}} and {{missing}}", &values);
        assert_eq!(out, "hi Ada, {{empty}} and {{missing}}");
    }

    #[test]
    fn fill_does_not_expand_recursively() {
        let mut values = HashMap::new();
        values.insert("a".to_string(), "{{b}}".to_string());
        values.insert("b".to_string(), "nope".to_string());
        assert_eq!(fill_template("{{a}}", &values), "{{b}}");
    }

    #[test]
    fn fill_then_parse_yields_exactly_the_unfilled_names_in_order() {
        let content = "{{x}} {{y}} {{z}} {{x}}";
        let mut values = HashMap::new();
        values.insert("y".to_string(), "value".to_string());
        values.insert("z".to_string(), String::new());
        let remaining = parse_template_variables(&fill_template(content, &values));
        assert_eq!(remaining, vec!["x", "z"]);

        values.insert("x".to_string(), "1".to_string());
        values.insert("z".to_string(), "2".to_string());
        let none_left = parse_template_variables(&fill_template(content, &values));
        assert!(none_left.is_empty());
    }
}
