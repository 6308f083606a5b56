//! Grounded prompt assembly and answer generation.

use std::sync::Arc;

use crate::error::GenerationError;
use crate::models::RetrievedSegment;
use crate::services::LanguageModel;

/// What the model is told to say when the context does not contain the answer.
pub const FALLBACK_ANSWER: &str = "I could not find that in the PDF.";

const CONTEXT_SEPARATOR: &str = "\n\n";

/// Builds a context-only prompt from retrieved segments and asks the model once.
///
/// Groundedness is requested by the prompt, not checked afterwards.
pub struct AnswerComposer {
    llm: Arc<dyn LanguageModel>,
}

impl AnswerComposer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Segment contents in retrieval order, separated by a blank line.
    pub fn build_context(segments: &[RetrievedSegment]) -> String {
        segments
            .iter()
            .map(|hit| hit.segment.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    pub fn build_prompt(question: &str, context: &str) -> String {
        format!(
            "You are an assistant.\n\
             Use only the context below to answer the question.\n\
             If the context is not enough, say \"{FALLBACK_ANSWER}\"\n\
             \n\
             Context:\n\
             {context}\n\
             \n\
             Question: {question}"
        )
    }

    pub async fn compose(
        &self,
        question: &str,
        segments: &[RetrievedSegment],
    ) -> Result<String, GenerationError> {
        let context = Self::build_context(segments);
        let prompt = Self::build_prompt(question, &context);
        let answer = self.llm.generate(&prompt).await?;
        Ok(answer.trim().to_string())
    }
}
