//! Email classification on top of a [`LanguageModel`].
//!
//! The model is asked to answer with one of the three category labels; its
//! free text is mapped back by marker search with TASK taking precedence
//! over NEWS. Any runtime failure yields UNCLASSIFIED instead of an error.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::ai::{generate_with_timeout, sanitize_for_prompt, LanguageModel};
use crate::model::{Category, ClassificationResult, NormalizedMessage};

/// Body characters included in the prompt.
pub const BODY_PROMPT_CHARS: usize = 500;

/// Markers scanned in order; the first one found wins.
const MARKER_PRECEDENCE: [Category; 2] = [Category::Task, Category::News];

pub struct Classifier {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl Classifier {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    /// Classifies one message. Never fails.
    pub async fn classify(&self, message: &NormalizedMessage) -> ClassificationResult {
        let prompt = build_prompt(message);

        match generate_with_timeout(self.model.as_ref(), &prompt, self.timeout).await {
            Ok(output) if output.trim().is_empty() => {
                warn!(external_id = %message.external_id, "model returned empty output");
                ClassificationResult::new(
                    Category::Unclassified,
                    "classification failed: empty model output",
                )
            }
            Ok(output) => {
                let category = category_from_output(&output);
                debug!(
                    external_id = %message.external_id,
                    category = %category,
                    "classified message"
                );
                ClassificationResult::new(category, output)
            }
            Err(e) => {
                warn!(
                    external_id = %message.external_id,
                    backend = self.model.name(),
                    error = %e,
                    "classification failed"
                );
                ClassificationResult::new(
                    Category::Unclassified,
                    format!("classification failed: {}", e),
                )
            }
        }
    }
}

/// Fixed prompt listing the allowed labels, the title, the sender and the
/// start of the body.
pub fn build_prompt(message: &NormalizedMessage) -> String {
    let body: String = sanitize_for_prompt(&message.body)
        .chars()
        .take(BODY_PROMPT_CHARS)
        .collect();
    let labels = [Category::News, Category::Task, Category::Unclassified]
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join("、");

    format!(
        "请对以下邮件进行分类，分类结果只能是：{labels}\n\n\
         邮件标题：{title}\n\
         发件人：{sender}\n\
         邮件内容：{body}...\n\n\
         请直接返回分类结果：",
        labels = labels,
        title = sanitize_for_prompt(&message.title),
        sender = sanitize_for_prompt(&message.sender),
        body = body,
    )
}

/// Maps free-text model output to a category.
pub fn category_from_output(output: &str) -> Category {
    MARKER_PRECEDENCE
        .into_iter()
        .find(|c| output.contains(c.label()))
        .unwrap_or(Category::Unclassified)
}
