//! Validation and repair of generated quiz questions and flashcards.
//!
//! Items missing required text are dropped; everything else is coerced to
//! what the caller asked for. An empty result is a validation failure.

use serde_json::Value;
use tracing::debug;

use super::response::{value_text, RawCard, RawQuestion};
use super::LlmError;
use crate::models::{Flashcard, FlashcardOptions, Question, QuestionType, QuizOptions};

const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn truth_value(text: &str) -> Option<bool> {
    match text.trim().trim_end_matches('.').to_lowercase().as_str() {
        "true" | "t" | "yes" => Some(true),
        "false" | "f" | "no" => Some(false),
        _ => None,
    }
}

/// Numeric index, or a single option letter ("B" -> 1).
fn parse_index(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n.as_u64().map(|i| i as usize),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<usize>() {
                return Some(i);
            }
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => {
                    Some((c.to_ascii_lowercase() as u8 - b'a') as usize)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Keeps topics inside the caller's allowed set, handing out allowed
/// topics round-robin to items whose topic doesn't match.
struct TopicAssigner<'a> {
    allowed: &'a [String],
    next: usize,
}

impl<'a> TopicAssigner<'a> {
    fn new(allowed: &'a [String]) -> Self {
        Self { allowed, next: 0 }
    }

    fn assign(&mut self, proposed: Option<String>) -> Option<String> {
        let proposed = non_empty(proposed);
        if self.allowed.is_empty() {
            return proposed;
        }
        if let Some(p) = &proposed {
            if let Some(found) = self.allowed.iter().find(|a| a.trim().eq_ignore_ascii_case(p)) {
                return Some(found.trim().to_string());
            }
        }
        let topic = self.allowed[self.next % self.allowed.len()].trim().to_string();
        self.next += 1;
        Some(topic)
    }
}

fn resolve_type(kind: Option<&str>, options: &[String], answer: Option<&str>) -> QuestionType {
    if let Some(t) = kind.and_then(QuestionType::from_alias) {
        return t;
    }
    let boolean_options = options.len() == 2 && options.iter().all(|o| truth_value(o).is_some());
    let boolean_answer = options.is_empty() && answer.and_then(truth_value).is_some();
    if boolean_options || boolean_answer {
        QuestionType::TrueFalse
    } else {
        QuestionType::MultipleChoice
    }
}

fn repair_question(
    raw: RawQuestion,
    options: &QuizOptions,
    topics: &mut TopicAssigner<'_>,
) -> Option<Question> {
    let question = non_empty(raw.question)?;
    let choices: Vec<String> = raw
        .options
        .unwrap_or_default()
        .iter()
        .filter_map(value_text)
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    let answer = non_empty(raw.correct_answer);
    let index = parse_index(raw.correct_index.as_ref());
    let question_type = resolve_type(raw.kind.as_deref(), &choices, answer.as_deref());

    let (choices, correct_index) = match question_type {
        QuestionType::TrueFalse => {
            let marked = index.and_then(|i| choices.get(i));
            let truth = marked
                .and_then(|m| truth_value(m))
                .or_else(|| answer.as_deref().and_then(truth_value));
            let correct = match truth {
                Some(true) => 0,
                Some(false) => 1,
                None => index.filter(|i| *i < 2).unwrap_or(0),
            };
            (TRUE_FALSE_OPTIONS.map(String::from).to_vec(), correct)
        }
        QuestionType::MultipleChoice => {
            let wanted = options.num_options.max(2);
            if choices.len() < wanted {
                return None;
            }
            let mut choices = choices;
            let mut correct = index
                .filter(|i| *i < choices.len())
                .or_else(|| {
                    answer
                        .as_deref()
                        .and_then(|a| choices.iter().position(|c| c.eq_ignore_ascii_case(a)))
                })
                .unwrap_or(0);
            // Keep the correct answer when trimming surplus options.
            if correct >= wanted {
                choices.swap(correct, wanted - 1);
                correct = wanted - 1;
            }
            choices.truncate(wanted);
            (choices, correct)
        }
    };

    Some(Question {
        question,
        question_type,
        options: choices,
        correct_index,
        explanation: non_empty(raw.explanation),
        difficulty: options.difficulty,
        topic: topics.assign(raw.topic),
    })
}

/// Validate and repair generated quiz questions.
pub fn validate_questions(
    raw: Vec<RawQuestion>,
    options: &QuizOptions,
) -> Result<Vec<Question>, LlmError> {
    let received = raw.len();
    let mut topics = TopicAssigner::new(&options.topics);
    let questions: Vec<Question> = raw
        .into_iter()
        .filter_map(|item| repair_question(item, options, &mut topics))
        .take(options.num_questions)
        .collect();

    debug!(
        received,
        kept = questions.len(),
        requested = options.num_questions,
        "quiz questions validated"
    );

    if questions.is_empty() {
        return Err(LlmError::Validation(format!(
            "none of {} generated questions passed validation",
            received
        )));
    }
    Ok(questions)
}

/// Validate and repair generated flashcards.
pub fn validate_cards(
    raw: Vec<RawCard>,
    options: &FlashcardOptions,
) -> Result<Vec<Flashcard>, LlmError> {
    let received = raw.len();
    let mut topics = TopicAssigner::new(&options.topics);
    let cards: Vec<Flashcard> = raw
        .into_iter()
        .filter_map(|item| {
            let front = non_empty(item.front)?;
            let back = non_empty(item.back)?;
            Some(Flashcard {
                front,
                back,
                mnemonic: non_empty(item.mnemonic).filter(|_| options.include_mnemonics),
                example: non_empty(item.example).filter(|_| options.include_examples),
                difficulty: options.difficulty,
                topic: topics.assign(item.topic),
            })
        })
        .take(options.num_cards)
        .collect();

    debug!(
        received,
        kept = cards.len(),
        requested = options.num_cards,
        "flashcards validated"
    );

    if cards.is_empty() {
        return Err(LlmError::Validation(format!(
            "none of {} generated flashcards passed validation",
            received
        )));
    }
    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;
    use serde_json::json;

    fn raw_questions(value: Value) -> Vec<RawQuestion> {
        serde_json::from_value(value).unwrap()
    }

    fn raw_cards(value: Value) -> Vec<RawCard> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_drops_items_without_question_text() {
        let raw = raw_questions(json!([
            {"question": "  ", "type": "tf", "options": ["True", "False"], "correct_index": 0},
            {"type": "tf", "options": ["True", "False"], "correct_index": 0},
            {"question": "Water boils at 100C at sea level", "type": "tf", "correct_index": 0}
        ]));
        let questions = validate_questions(raw, &QuizOptions::default()).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn test_true_false_index_rederived_from_option_text() {
        let raw = raw_questions(json!([
            {"question": "q1", "type": "True/False", "options": ["False", "True"], "correct_index": 1},
            {"question": "q2", "type": "boolean", "options": ["Yes", "No", "Maybe"], "correct_index": 1},
            {"question": "q3", "type": "tf", "options": [], "correct_index": 7}
        ]));
        let questions = validate_questions(raw, &QuizOptions::default()).unwrap();

        for q in &questions {
            assert_eq!(q.question_type, QuestionType::TrueFalse);
            assert_eq!(q.options, vec!["True", "False"]);
        }
        assert_eq!(questions[0].correct_index, 0);
        assert_eq!(questions[1].correct_index, 1);
        assert_eq!(questions[2].correct_index, 0);
    }

    #[test]
    fn test_multiple_choice_option_count_enforced() {
        let raw = raw_questions(json!([
            {"question": "too few", "type": "mcq", "options": ["a", "b"], "correct_index": 0},
            {"question": "too many", "type": "multiple-choice",
             "options": ["a", "b", "c", "d", "e", "f"], "correct_index": 5},
            {"question": "letter answer", "type": "MC",
             "options": ["a", "b", "c", "d"], "correct_index": "C"},
            {"question": "bad index", "options": ["a", "b", "c", "d"], "correct_index": 9}
        ]));
        let questions = validate_questions(raw, &QuizOptions::default()).unwrap();

        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].options.len(), 4);
        assert_eq!(questions[0].options[questions[0].correct_index], "f");
        assert_eq!(questions[1].correct_index, 2);
        assert_eq!(questions[2].correct_index, 0);
        assert_eq!(questions[2].question_type, QuestionType::MultipleChoice);
    }

    #[test]
    fn test_difficulty_forced_and_list_truncated() {
        let items: Vec<Value> = ["easy", "medium", "hard", "EASY", "unknown", "hard", "medium"]
            .iter()
            .enumerate()
            .map(|(i, d)| {
                json!({
                    "question": format!("q{}", i),
                    "type": "multiple_choice",
                    "options": ["a", "b", "c", "d"],
                    "correct_index": 1,
                    "difficulty": d
                })
            })
            .collect();
        let options = QuizOptions {
            num_questions: 5,
            difficulty: Difficulty::Hard,
            ..QuizOptions::default()
        };

        let questions = validate_questions(raw_questions(Value::Array(items)), &options).unwrap();
        assert_eq!(questions.len(), 5);
        assert!(questions.iter().all(|q| q.difficulty == Difficulty::Hard));
        assert_eq!(questions[4].question, "q4");
    }

    #[test]
    fn test_topics_assigned_round_robin_outside_allowed_set() {
        let raw = raw_questions(json!([
            {"question": "a", "type": "tf", "correct_index": 0, "topic": "Genetics"},
            {"question": "b", "type": "tf", "correct_index": 0, "topic": "astronomy"},
            {"question": "c", "type": "tf", "correct_index": 0},
            {"question": "d", "type": "tf", "correct_index": 0, "topic": "poetry"}
        ]));
        let options = QuizOptions {
            topics: vec!["genetics".to_string(), "evolution".to_string()],
            ..QuizOptions::default()
        };
        let questions = validate_questions(raw, &options).unwrap();
        let topics: Vec<_> = questions.iter().map(|q| q.topic.as_deref().unwrap()).collect();
        assert_eq!(topics, vec!["genetics", "genetics", "evolution", "genetics"]);
    }

    #[test]
    fn test_conformant_true_false_items_pass_unchanged() {
        let raw = raw_questions(json!([
            {"question": "The sun is a star", "type": "true_false",
             "options": ["True", "False"], "correct_index": 0},
            {"question": "The moon is a planet", "type": "true_false",
             "options": ["True", "False"], "correct_index": 1},
            {"question": "Mars is red", "type": "true_false",
             "options": ["True", "False"], "correct_index": 0}
        ]));
        let first = validate_questions(raw, &QuizOptions::default()).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[1].correct_index, 1);

        let again: Vec<RawQuestion> =
            serde_json::from_value(serde_json::to_value(&first).unwrap()).unwrap();
        let second = validate_questions(again, &QuizOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_surviving_questions_is_validation_error() {
        let raw = raw_questions(json!([{"question": "", "options": []}]));
        let err = validate_questions(raw, &QuizOptions::default()).unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
    }

    #[test]
    fn test_cards_respect_include_flags() {
        let raw = raw_cards(json!([
            {"front": "ATP", "back": "energy currency", "mnemonic": "A Tiny Powerhouse",
             "example": "muscle contraction"},
            {"term": "DNA", "definition": "genetic material", "mnemonic": "Do Not Ask"},
            {"front": "missing back"}
        ]));
        let options = FlashcardOptions {
            include_mnemonics: false,
            ..FlashcardOptions::default()
        };
        let cards = validate_cards(raw, &options).unwrap();

        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|c| c.mnemonic.is_none()));
        assert_eq!(cards[0].example.as_deref(), Some("muscle contraction"));
        assert_eq!(cards[1].front, "DNA");
    }

    #[test]
    fn test_zero_surviving_cards_is_validation_error() {
        let err = validate_cards(raw_cards(json!([])), &FlashcardOptions::default()).unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
    }
}
