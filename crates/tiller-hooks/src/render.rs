// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text rendering of directives for injection into the agent's turn.

use tiller_config::TillerConfig;
use tiller_router::Directive;

/// Renders directives as instructions addressed to the agent.
///
/// Every directive that moves the session carries a `{marker} {model}` line so
/// peer agents reading the shared channel can detect the active model.
#[derive(Debug, Clone)]
pub struct DirectiveRenderer {
    marker: String,
    close_command: String,
    approve_phrase: String,
    override_phrase: String,
}

impl DirectiveRenderer {
    pub fn new(config: &TillerConfig) -> Self {
        let first = |phrases: &[String], fallback: &str| {
            phrases
                .iter()
                .map(|p| p.trim())
                .find(|p| !p.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            marker: config.collaboration.marker.trim().to_string(),
            close_command: config.tracking.close_command.trim().to_string(),
            approve_phrase: first(&config.triggers.approve, "go ahead"),
            override_phrase: first(&config.triggers.r#override, "no switch"),
        }
    }

    /// Text for the agent, or `None` when there is nothing to say.
    pub fn render(&self, directive: &Directive) -> Option<String> {
        let text = match directive {
            Directive::Noop => return None,
            Directive::Suggest {
                model,
                category,
                fallbacks,
            } => {
                let mut text = format!(
                    "This request looks like {category} work. Before answering, suggest \
                     switching to {model} and ask the user to confirm. \
                     Reply \"{}\" to switch or \"{}\" to stay.",
                    self.approve_phrase, self.override_phrase
                );
                if !fallbacks.is_empty() {
                    text.push_str(&format!(" Fallbacks: {}.", fallbacks.join(", ")));
                }
                text
            }
            Directive::Switch {
                model,
                category,
                work_id,
            } => {
                let mut text = format!("Switch to {model} for this {category} work.");
                if let Some(id) = work_id {
                    text.push_str(&format!(
                        " Tracked as {id}; run `{} {id}` when the work is done.",
                        self.close_command
                    ));
                }
                text.push('\n');
                text.push_str(&self.announce(model));
                text
            }
            Directive::AutoSwitch { model, peer_model } => format!(
                "A collaborating agent is on {peer_model}. Switch to {model} without \
                 asking.\n{}",
                self.announce(model)
            ),
            Directive::Fallback { from, to } => format!(
                "{from} is at capacity. Retry the failed call on {to}.\n{}",
                self.announce(to)
            ),
            Directive::Revert { model, work_id } => {
                let reason = match work_id {
                    Some(id) => format!("Work {id} is complete."),
                    None => "The escalated work is complete.".to_string(),
                };
                format!("{reason} Switch back to {model}.\n{}", self.announce(model))
            }
        };
        Some(text)
    }

    fn announce(&self, model: &str) -> String {
        format!("{} {model}", self.marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiller_core::Category;

    fn renderer() -> DirectiveRenderer {
        DirectiveRenderer::new(&TillerConfig::default())
    }

    #[test]
    fn noop_renders_nothing() {
        assert_eq!(renderer().render(&Directive::Noop), None);
    }

    #[test]
    fn suggest_names_model_and_reply_phrases() {
        let text = renderer()
            .render(&Directive::Suggest {
                model: "sonnet".into(),
                category: Category::new("coding"),
                fallbacks: vec!["gemini-pro".into()],
            })
            .unwrap();
        assert!(text.contains("coding work"));
        assert!(text.contains("switching to sonnet"));
        assert!(text.contains("\"go ahead\""));
        assert!(text.contains("\"no switch\""));
        assert!(text.contains("Fallbacks: gemini-pro."));
        assert!(!text.contains("[tiller] model:"));
    }

    #[test]
    fn switch_carries_close_instruction_and_marker() {
        let text = renderer()
            .render(&Directive::Switch {
                model: "opus".into(),
                category: Category::new("complex"),
                work_id: Some("W1".into()),
            })
            .unwrap();
        assert!(text.contains("run `bd close W1`"));
        assert!(text.ends_with("[tiller] model: opus"));
    }

    #[test]
    fn moves_announce_the_new_model() {
        let r = renderer();
        let fallback = r
            .render(&Directive::Fallback {
                from: "opus".into(),
                to: "sonnet".into(),
            })
            .unwrap();
        assert!(fallback.ends_with("[tiller] model: sonnet"));

        let revert = r
            .render(&Directive::Revert {
                model: "gemini-flash".into(),
                work_id: None,
            })
            .unwrap();
        assert!(revert.starts_with("The escalated work is complete."));
        assert!(revert.ends_with("[tiller] model: gemini-flash"));

        let auto = r
            .render(&Directive::AutoSwitch {
                model: "sonnet".into(),
                peer_model: "opus".into(),
            })
            .unwrap();
        assert!(auto.contains("on opus"));
        assert!(auto.ends_with("[tiller] model: sonnet"));
    }
}
