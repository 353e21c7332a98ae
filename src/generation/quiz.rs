use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::LLMConfig;
use crate::error::GenerationError;
use crate::llm::{extract_json_array, truncate_for_prompt, ChatMessage, LLM};

pub const OPTIONS_PER_QUESTION: usize = 4;
pub const MIN_QUESTIONS: usize = 3;
pub const MAX_QUESTIONS: usize = 5;

/// Multiple-choice question with exactly four options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: u8,
}

impl QuizQuestion {
    /// Validate one element of the model's array without coercing anything
    fn from_value(index: usize, value: &Value) -> Result<Self, GenerationError> {
        let shape = |reason: &str| GenerationError::Shape(format!("question {}: {}", index, reason));

        let object = value.as_object().ok_or_else(|| shape("not an object"))?;

        let question = object
            .get("question")
            .and_then(Value::as_str)
            .ok_or_else(|| shape("missing string 'question'"))?;

        let options = object
            .get("options")
            .and_then(Value::as_array)
            .ok_or_else(|| shape("missing 'options' array"))?;
        if options.len() != OPTIONS_PER_QUESTION {
            return Err(shape(&format!(
                "expected {} options, got {}",
                OPTIONS_PER_QUESTION,
                options.len()
            )));
        }
        let options = options
            .iter()
            .map(|option| option.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| shape("options must be strings"))?;

        // as_u64 rejects negatives and fractional numbers
        let correct_answer_index = object
            .get("correctAnswerIndex")
            .and_then(Value::as_u64)
            .filter(|i| *i < OPTIONS_PER_QUESTION as u64)
            .ok_or_else(|| shape("'correctAnswerIndex' must be an integer in 0..=3"))?;

        Ok(Self {
            question: question.to_string(),
            options,
            correct_answer_index: correct_answer_index as u8,
        })
    }
}

pub struct QuizGenerator {
    llm: Arc<dyn LLM>,
    model: String,
    max_content_chars: usize,
}

impl QuizGenerator {
    pub fn new(llm: Arc<dyn LLM>, config: &LLMConfig) -> Self {
        Self {
            llm,
            model: config.quiz_model.clone(),
            max_content_chars: config.max_transcript_chars,
        }
    }

    fn prompt(&self, lesson_title: &str, lesson_content: &str) -> String {
        format!(
            "Write between {MIN_QUESTIONS} and {MAX_QUESTIONS} multiple-choice questions that check understanding \
            of the lesson below. Each question has exactly {OPTIONS_PER_QUESTION} options and one correct answer.\n\
            Respond ONLY with a JSON array in this exact format:\n\
            [{{\"question\": \"...\", \"options\": [\"...\", \"...\", \"...\", \"...\"], \"correctAnswerIndex\": 0}}]\n\
            correctAnswerIndex is the zero-based position of the correct option.\n\n\
            Lesson title: {}\n\nLesson content:\n{}",
            lesson_title,
            truncate_for_prompt(lesson_content, self.max_content_chars)
        )
    }

    /// Single attempt; any call or shape failure is returned to the caller
    pub async fn generate(
        &self,
        lesson_title: &str,
        lesson_content: &str,
    ) -> Result<Vec<QuizQuestion>, GenerationError> {
        if !self.llm.has_credentials() {
            return Err(GenerationError::MissingCredentials);
        }

        let response = self
            .llm
            .chat(
                &self.model,
                vec![ChatMessage::user(self.prompt(lesson_title, lesson_content))],
            )
            .await?;

        let questions = extract_json_array(&response.content)?
            .iter()
            .enumerate()
            .map(|(index, value)| QuizQuestion::from_value(index, value))
            .collect::<Result<Vec<_>, _>>()?;

        if questions.is_empty() {
            return Err(GenerationError::Shape("quiz contains no questions".to_string()));
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&questions.len()) {
            warn!(
                "Quiz for '{}' has {} questions, expected {}-{}",
                lesson_title,
                questions.len(),
                MIN_QUESTIONS,
                MAX_QUESTIONS
            );
        }

        info!("❓ Generated {} quiz questions for '{}'", questions.len(), lesson_title);
        Ok(questions)
    }
}
