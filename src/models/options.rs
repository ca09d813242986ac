//! Generation options carried in a job's `config` payload.

use serde::{Deserialize, Serialize};

/// Output structure requested for a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryFormat {
    /// Plain text split into fixed, headed sections.
    #[default]
    Sectioned,
    /// Hierarchical bullet points.
    Bullets,
    /// Continuous prose paragraphs.
    Prose,
    /// Markdown with headings and at least one table.
    Smart,
}

/// Target summary length, resolved to a word band against the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPreset {
    Concise,
    #[default]
    Standard,
    Detailed,
    Comprehensive,
}

/// Reader level the summary is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceLevel {
    HighSchool,
    Undergraduate,
    Graduate,
    Professional,
}

impl AudienceLevel {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::HighSchool => "high school students",
            Self::Undergraduate => "undergraduate students",
            Self::Graduate => "graduate students",
            Self::Professional => "working professionals",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryOptions {
    #[serde(default)]
    pub format: SummaryFormat,
    #[serde(default)]
    pub length: LengthPreset,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub audience: Option<AudienceLevel>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
        }
    }

    /// Resolve the many spellings models use for a question type.
    pub fn from_alias(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match normalized.as_str() {
            "multiplechoice" | "mcq" | "mc" | "choice" | "singlechoice" => {
                Some(Self::MultipleChoice)
            }
            "truefalse" | "tf" | "boolean" | "bool" | "trueorfalse" => Some(Self::TrueFalse),
            _ => None,
        }
    }
}

fn default_num_questions() -> usize {
    10
}

fn default_num_options() -> usize {
    4
}

fn default_question_types() -> Vec<QuestionType> {
    vec![QuestionType::MultipleChoice]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOptions {
    #[serde(default = "default_num_questions")]
    pub num_questions: usize,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_question_types")]
    pub question_types: Vec<QuestionType>,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Options per multiple-choice question.
    #[serde(default = "default_num_options")]
    pub num_options: usize,
    #[serde(default)]
    pub language: Option<String>,
}

impl Default for QuizOptions {
    fn default() -> Self {
        Self {
            num_questions: default_num_questions(),
            difficulty: Difficulty::default(),
            question_types: default_question_types(),
            topics: Vec::new(),
            num_options: default_num_options(),
            language: None,
        }
    }
}

fn default_num_cards() -> usize {
    20
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardOptions {
    #[serde(default = "default_num_cards")]
    pub num_cards: usize,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default = "default_true")]
    pub include_mnemonics: bool,
    #[serde(default = "default_true")]
    pub include_examples: bool,
    #[serde(default)]
    pub language: Option<String>,
}

impl Default for FlashcardOptions {
    fn default() -> Self {
        Self {
            num_cards: default_num_cards(),
            difficulty: Difficulty::default(),
            topics: Vec::new(),
            include_mnemonics: true,
            include_examples: true,
            language: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_aliases() {
        assert_eq!(
            QuestionType::from_alias("Multiple-Choice"),
            Some(QuestionType::MultipleChoice)
        );
        assert_eq!(QuestionType::from_alias("MCQ"), Some(QuestionType::MultipleChoice));
        assert_eq!(QuestionType::from_alias("true/false"), Some(QuestionType::TrueFalse));
        assert_eq!(QuestionType::from_alias("True_False"), Some(QuestionType::TrueFalse));
        assert_eq!(QuestionType::from_alias("essay"), None);
    }

    #[test]
    fn test_quiz_options_defaults_from_empty_payload() {
        let opts: QuizOptions = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(opts, QuizOptions::default());
        assert_eq!(opts.num_options, 4);
    }

    #[test]
    fn test_flashcard_options_parse_partial_payload() {
        let opts: FlashcardOptions = serde_json::from_value(serde_json::json!({
            "num_cards": 5,
            "include_mnemonics": false,
            "difficulty": "hard"
        }))
        .unwrap();
        assert_eq!(opts.num_cards, 5);
        assert!(!opts.include_mnemonics);
        assert!(opts.include_examples);
        assert_eq!(opts.difficulty, Difficulty::Hard);
    }
}
