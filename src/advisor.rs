use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::completion::{CompletionModel, Message};
use crate::models::profile::Role;

/// Text-generation capabilities used by onboarding and match previews.
#[async_trait]
pub trait ProfileAdvisor: Send + Sync {
    /// Summarize an interview for matching.
    async fn summarize(
        &self,
        role: Role,
        structured: &HashMap<String, String>,
        free_text: Option<&str>,
    ) -> anyhow::Result<String>;

    /// Explain why a CEO and a CTO fit together.
    async fn rationale(&self, ceo_summary: &str, cto_summary: &str) -> anyhow::Result<String>;
}

const SUMMARY_TEMPERATURE: f64 = 0.2;
const RATIONALE_TEMPERATURE: f64 = 0.2;

/// `ProfileAdvisor` backed by a chat completion model.
pub struct CompletionAdvisor {
    model: Arc<dyn CompletionModel>,
}

impl CompletionAdvisor {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }
}

pub fn summary_prompt(
    role: Role,
    structured: &HashMap<String, String>,
    free_text: Option<&str>,
) -> anyhow::Result<Vec<Message>> {
    // Sorted keys keep the prompt stable across requests.
    let ordered: BTreeMap<&String, &String> = structured.iter().collect();
    let json = serde_json::to_string(&ordered)?;
    Ok(vec![
        Message::system("You are a concise recruiter summarizer."),
        Message::user(format!(
            "Summarize this {role} for matching: JSON={json} NOTE={}",
            free_text.unwrap_or("")
        )),
    ])
}

pub fn rationale_prompt(ceo_summary: &str, cto_summary: &str) -> Vec<Message> {
    vec![
        Message::system("Explain the match succinctly in 3 bullet points."),
        Message::user(format!("CEO: {ceo_summary}\nCTO: {cto_summary}")),
    ]
}

#[async_trait]
impl ProfileAdvisor for CompletionAdvisor {
    async fn summarize(
        &self,
        role: Role,
        structured: &HashMap<String, String>,
        free_text: Option<&str>,
    ) -> anyhow::Result<String> {
        let messages = summary_prompt(role, structured, free_text)?;
        let result = self
            .model
            .complete(&messages, None, Some(SUMMARY_TEMPERATURE))
            .await?;
        Ok(result.content)
    }

    async fn rationale(&self, ceo_summary: &str, cto_summary: &str) -> anyhow::Result<String> {
        let messages = rationale_prompt(ceo_summary, cto_summary);
        let result = self
            .model
            .complete(&messages, None, Some(RATIONALE_TEMPERATURE))
            .await?;
        Ok(result.content)
    }
}
