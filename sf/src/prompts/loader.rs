//! Prompt Loader
//!
//! Loads prompt templates from a user override directory or falls back to
//! embedded defaults, and renders them with Handlebars.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g. `.storyforge/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader checking `root/.storyforge/prompts/` for overrides
    pub fn new(root: impl AsRef<Path>) -> Self {
        let user_dir = root.as_ref().join(".storyforge/prompts");
        let exists = user_dir.exists();
        debug!(?user_dir, %exists, "PromptLoader::new: called");

        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);

        Self {
            hbs,
            user_dir: if exists { Some(user_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs, user_dir: None }
    }

    /// Load a template by name
    ///
    /// Checks the user override directory first, then the embedded fallback.
    fn load_template(&self, name: &str) -> Result<String> {
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: using user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(String::from)
            .ok_or_else(|| eyre!("Unknown prompt template: {}", name))
    }

    /// Render a template by name with the given context
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        debug!(%name, "PromptLoader::render: called");
        let template = self.load_template(name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render prompt '{}': {}", name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_embedded_template() {
        let loader = PromptLoader::embedded_only();
        let out = loader
            .render(
                "complexity-analysis",
                &json!({"title": "Reset password", "description": "Como usuário..."}),
            )
            .unwrap();
        assert!(out.contains("Reset password"));
        assert!(out.contains("Como usuário..."));
    }

    #[test]
    fn test_render_does_not_html_escape() {
        let loader = PromptLoader::embedded_only();
        let out = loader
            .render(
                "story-rewrite",
                &json!({"title": "T", "description": "a < b && c > d", "history": ""}),
            )
            .unwrap();
        assert!(out.contains("a < b && c > d"));
    }

    #[test]
    fn test_unknown_template_errors() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.render("nope", &json!({})).is_err());
    }

    #[test]
    fn test_user_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let override_dir = dir.path().join(".storyforge/prompts");
        std::fs::create_dir_all(&override_dir).unwrap();
        std::fs::write(override_dir.join("checklist.pmt"), "CUSTOM {{title}}").unwrap();

        let loader = PromptLoader::new(dir.path());
        let out = loader.render("checklist", &json!({"title": "X"})).unwrap();
        assert_eq!(out, "CUSTOM X");
    }

    #[test]
    fn test_each_block_renders_lists() {
        let loader = PromptLoader::embedded_only();
        let out = loader
            .render(
                "gherkin-group",
                &json!({"feature": "F", "titles": ["Login ok", "Login fails"], "history": ""}),
            )
            .unwrap();
        assert!(out.contains("- Login ok"));
        assert!(out.contains("- Login fails"));
    }
}
