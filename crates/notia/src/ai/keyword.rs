//! Built-in keyword runtime, used when no real model is configured.
//!
//! Classification prompts (those mentioning 分类) are answered with the task
//! label when they contain a work cue such as 项目 or 会议, and with the news
//! label otherwise. Any other prompt gets a short echo reply.

use async_trait::async_trait;

use super::runtime::{LanguageModel, ModelError};
use crate::model::Category;

const CLASSIFY_CUE: &str = "分类";

const TASK_CUES: &[&str] = &["项目", "汇报", "确认", "会议"];

/// Characters of the prompt quoted back in a chat reply.
const ECHO_CHARS: usize = 50;

#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordModel;

impl KeywordModel {
    pub fn new() -> Self {
        Self
    }

    fn respond(prompt: &str) -> String {
        if prompt.contains(CLASSIFY_CUE) {
            let category = if TASK_CUES.iter().any(|cue| prompt.contains(cue)) {
                Category::Task
            } else {
                Category::News
            };
            return category.label().to_string();
        }

        let quoted: String = prompt.chars().take(ECHO_CHARS).collect();
        format!("这是对您问题的回复：{}...", quoted)
    }
}

#[async_trait]
impl LanguageModel for KeywordModel {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        Ok(Self::respond(prompt))
    }
}
