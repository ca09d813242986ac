//! Prompt construction.
//!
//! Prompts are assembled in fixed layers so the same inputs always give
//! the same prompt: role, format, length band, focus areas, audience,
//! language, then the source text between explicit markers.

use crate::models::{
    FlashcardOptions, LengthPreset, QuestionType, QuizOptions, SummaryFormat, SummaryOptions,
};

pub const SOURCE_START: &str = "=== SOURCE START ===";
pub const SOURCE_END: &str = "=== SOURCE END ===";

/// Section headers required by the sectioned summary format.
pub const SUMMARY_SECTIONS: [&str; 3] = ["OVERVIEW", "KEY POINTS", "TAKEAWAYS"];

pub const TRANSCRIBE_PROMPT: &str = "Transcribe the spoken content of this recording verbatim. \
Return only the transcript as plain text, without timestamps, speaker labels or commentary.";

/// Word-count targets for a length preset: (fraction of source, min, max).
pub fn length_params(preset: LengthPreset) -> (f64, usize, usize) {
    match preset {
        LengthPreset::Concise => (0.10, 150, 400),
        LengthPreset::Standard => (0.20, 300, 800),
        LengthPreset::Detailed => (0.30, 600, 1500),
        LengthPreset::Comprehensive => (0.45, 1000, 2500),
    }
}

/// Target summary length in words for a source of `source_words` words.
pub fn target_words(preset: LengthPreset, source_words: usize) -> usize {
    let (percent, min, max) = length_params(preset);
    let raw = (source_words as f64 * percent).round() as usize;
    raw.clamp(min, max)
}

fn role_layer(task: &str) -> String {
    format!(
        "You are an expert educator who turns lecture material into study resources. {}",
        task
    )
}

fn format_layer(format: SummaryFormat) -> String {
    match format {
        SummaryFormat::Sectioned => format!(
            "Write plain text (no markdown) organised under exactly these three section headers, \
each on its own line: {}, {}, {}. Every section must have content.",
            SUMMARY_SECTIONS[0], SUMMARY_SECTIONS[1], SUMMARY_SECTIONS[2]
        ),
        SummaryFormat::Bullets => "Write hierarchical bullet points: top-level bullets for main \
topics with indented sub-bullets for supporting details."
            .to_string(),
        SummaryFormat::Prose => "Write continuous prose paragraphs with clear transitions. \
Do not use bullet points or headings."
            .to_string(),
        SummaryFormat::Smart => "Write markdown with headings for each major topic and include at \
least one table that compares or organises key concepts."
            .to_string(),
    }
}

fn length_layer(preset: LengthPreset, source_words: usize) -> String {
    let (_, min, max) = length_params(preset);
    format!(
        "Aim for about {} words (never fewer than {} or more than {}).",
        target_words(preset, source_words),
        min,
        max
    )
}

fn focus_layer(focus_areas: &[String]) -> Option<String> {
    let areas: Vec<&str> = focus_areas
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();
    if areas.is_empty() {
        return None;
    }
    Some(format!(
        "Give priority to these focus areas and cover them in more depth: {}.",
        areas.join(", ")
    ))
}

fn language_layer(language: Option<&str>) -> Option<String> {
    language
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!("Write the entire response in {}.", l))
}

fn source_layer(source: &str) -> String {
    format!("{}\n{}\n{}", SOURCE_START, source.trim(), SOURCE_END)
}

fn join_layers(layers: Vec<Option<String>>) -> String {
    layers.into_iter().flatten().collect::<Vec<_>>().join("\n\n")
}

/// Prompt for a summary of `source`.
pub fn summary_prompt(source: &str, title: &str, options: &SummaryOptions) -> String {
    let source_words = source.split_whitespace().count();
    join_layers(vec![
        Some(role_layer(&format!(
            "Summarize the lecture \"{}\" for a student reviewing it.",
            title
        ))),
        Some(format_layer(options.format)),
        Some(length_layer(options.length, source_words)),
        focus_layer(&options.focus_areas),
        options
            .audience
            .map(|a| format!("Pitch the explanation at the level of {}.", a.describe())),
        language_layer(options.language.as_deref()),
        Some(source_layer(source)),
    ])
}

/// Corrective prompt asking the model to reorganise a summary it already
/// produced into the required sections.
pub fn restructure_prompt(generated: &str) -> String {
    join_layers(vec![
        Some(role_layer(
            "The summary below is missing required sections. Reorganise it without adding new facts.",
        )),
        Some(format_layer(SummaryFormat::Sectioned)),
        Some(source_layer(generated)),
    ])
}

fn topics_layer(topics: &[String]) -> Option<String> {
    if topics.is_empty() {
        return None;
    }
    Some(format!(
        "Tag every item with one of these topics: {}.",
        topics.join(", ")
    ))
}

/// Prompt for a quiz over `source`.
pub fn quiz_prompt(source: &str, options: &QuizOptions) -> String {
    let types: Vec<&str> = options.question_types.iter().map(|t| t.as_str()).collect();
    let mut shape = format!(
        "Return ONLY a JSON array of {} objects with fields \"question\", \"type\" ({}), \
\"options\", \"correct_index\" (0-based), \"explanation\", \"difficulty\" and \"topic\".",
        options.num_questions,
        types.join(" or ")
    );
    if options.question_types.contains(&QuestionType::MultipleChoice) {
        shape.push_str(&format!(
            " multiple_choice questions have exactly {} options.",
            options.num_options
        ));
    }
    if options.question_types.contains(&QuestionType::TrueFalse) {
        shape.push_str(" true_false questions have exactly the options [\"True\", \"False\"].");
    }

    join_layers(vec![
        Some(role_layer(&format!(
            "Write {} quiz questions that test understanding of the material.",
            options.num_questions
        ))),
        Some(shape),
        Some(format!(
            "All questions must be {} difficulty.",
            options.difficulty.as_str()
        )),
        topics_layer(&options.topics),
        language_layer(options.language.as_deref()),
        Some(source_layer(source)),
    ])
}

/// Prompt for a flashcard deck over `source`.
pub fn flashcard_prompt(source: &str, options: &FlashcardOptions) -> String {
    let mut fields = vec!["\"front\"", "\"back\"", "\"difficulty\"", "\"topic\""];
    if options.include_mnemonics {
        fields.push("\"mnemonic\"");
    }
    if options.include_examples {
        fields.push("\"example\"");
    }

    join_layers(vec![
        Some(role_layer(&format!(
            "Write {} flashcards covering the key terms and ideas of the material.",
            options.num_cards
        ))),
        Some(format!(
            "Return ONLY a JSON array of objects with fields {}.",
            fields.join(", ")
        )),
        Some(format!(
            "All cards must be {} difficulty.",
            options.difficulty.as_str()
        )),
        topics_layer(&options.topics),
        language_layer(options.language.as_deref()),
        Some(source_layer(source)),
    ])
}
