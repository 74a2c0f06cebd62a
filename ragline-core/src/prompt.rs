//! Prompts templating
//!
//! Prompts use [tera] under the hood, which allows jinja style templates. A [`Prompt`] without
//! any context is sent as is; once a context is added it is rendered as a template.
//!
//! # Example
//!
//! ```
//! # use ragline_core::prompt::Prompt;
//! let prompt = Prompt::from("hello {{ world }}").with_context_value("world", "ragline");
//!
//! assert_eq!(prompt.render().unwrap(), "hello ragline");
//! ```
use std::borrow::Cow;

use anyhow::{Context as _, Result};

/// A prompt for a large language model.
#[derive(Clone, Debug)]
pub struct Prompt {
    template: Cow<'static, str>,
    context: Option<tera::Context>,
}

impl Prompt {
    /// Adds anything that implements [`Into<tera::Context>`], like `Serialize` to the Prompt
    #[must_use]
    pub fn with_context(mut self, new_context: impl Into<tera::Context>) -> Self {
        let context = self.context.get_or_insert_with(tera::Context::default);
        context.extend(new_context.into());

        self
    }

    /// Adds a key-value pair to the context of the Prompt
    #[must_use]
    pub fn with_context_value(mut self, key: &str, value: impl Into<tera::Value>) -> Self {
        let context = self.context.get_or_insert_with(tera::Context::default);
        context.insert(key, &value.into());
        self
    }

    /// Renders a prompt
    ///
    /// If no context is provided, the prompt will be rendered as is.
    ///
    /// # Errors
    ///
    /// Errors if the template is invalid or references a missing variable.
    pub fn render(&self) -> Result<String> {
        let Some(context) = &self.context else {
            return Ok(self.template.to_string());
        };

        tera::Tera::one_off(&self.template, context, false).context("Failed to render prompt")
    }
}

impl From<&'static str> for Prompt {
    fn from(prompt: &'static str) -> Self {
        Prompt {
            template: Cow::Borrowed(prompt),
            context: None,
        }
    }
}

impl From<String> for Prompt {
    fn from(prompt: String) -> Self {
        Prompt {
            template: Cow::Owned(prompt),
            context: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_prompt_without_context_is_not_templated() {
        let prompt = Prompt::from("{{ not a variable }}");
        assert_eq!(prompt.render().unwrap(), "{{ not a variable }}");
    }

    #[test]
    fn test_prompt_with_list_context() {
        let prompt = Prompt::from("{% for c in contexts %}[{{ c }}]{% endfor %}")
            .with_context_value("contexts", vec!["a", "b"]);
        assert_eq!(prompt.render().unwrap(), "[a][b]");
    }

    #[test]
    fn test_missing_variable_errors() {
        let prompt = Prompt::from("hello {{ world }}").with_context_value("other", 1);
        assert!(prompt.render().is_err());
    }
}
