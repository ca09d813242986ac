//! Generation jobs end to end: prompts, validation and the rate bound.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{fast_options, Harness, ScriptedModel};
use lectern::llm::ModelClient;
use lectern::models::{
    ContentItem, Deck, Difficulty, FlashcardOptions, Job, JobStatus, JobType, QuestionType,
    Quiz, QuizOptions, StatusEvent, Summary, SummaryOptions, SummaryStatus,
};
use lectern::rate_limit::RateSlots;
use lectern::repository::PipelineRepository;

const LECTURE: &str = "The first law of thermodynamics states that energy is conserved. \
The second law states that the entropy of an isolated system never decreases.";

fn seven_questions() -> String {
    let items: Vec<serde_json::Value> = (1..=7)
        .map(|n| {
            json!({
                "question": format!("Question {}?", n),
                "type": "multiple_choice",
                "options": ["alpha", "beta", "gamma", "delta"],
                "correct_index": n % 4,
                "difficulty": "easy",
                "explanation": "Because."
            })
        })
        .collect();
    format!("```json\n{}\n```", json!({ "questions": items }))
}

fn cards_with_mnemonics(count: usize) -> String {
    let items: Vec<serde_json::Value> = (1..=count)
        .map(|n| {
            json!({
                "front": format!("Term {}", n),
                "back": format!("Definition {}", n),
                "mnemonic": "Every Good Boy Does Fine",
                "example": "A steam engine"
            })
        })
        .collect();
    serde_json::to_string(&items).unwrap()
}

async fn seed_summary(harness: &Harness) -> Summary {
    let mut summary = Summary::new("s1", "u1", Some("c1".to_string()), "Thermodynamics");
    summary.raw_content = Some(LECTURE.to_string());
    summary.content = Some("OVERVIEW\nEnergy.".to_string());
    summary.status = SummaryStatus::Completed;
    harness.repo.save_summary(&summary).await.unwrap();
    summary
}

#[tokio::test]
async fn test_quiz_client_trims_surplus_and_forces_difficulty() {
    let model = Arc::new(ScriptedModel::new(vec![Ok(seven_questions())]));
    let client = ModelClient::new(model.clone(), RateSlots::new(2));
    let options = QuizOptions {
        num_questions: 5,
        difficulty: Difficulty::Hard,
        ..Default::default()
    };

    let questions = client.generate_quiz(LECTURE, &options).await.unwrap();

    assert_eq!(questions.len(), 5);
    assert!(questions.iter().all(|q| q.difficulty == Difficulty::Hard));
    assert!(questions.iter().all(|q| q.question_type == QuestionType::MultipleChoice));
    assert!(questions.iter().all(|q| q.correct_index < q.options.len()));
    assert_eq!(questions[0].question, "Question 1?");
    assert!(model.prompts()[0].contains("entropy of an isolated system"));
}

#[tokio::test]
async fn test_flashcards_drop_mnemonics_when_not_requested() {
    let model = Arc::new(ScriptedModel::new(vec![Ok(cards_with_mnemonics(3))]));
    let client = ModelClient::new(model, RateSlots::new(1));
    let options = FlashcardOptions {
        num_cards: 10,
        include_mnemonics: false,
        ..Default::default()
    };

    let cards = client.generate_flashcards(LECTURE, &options).await.unwrap();

    assert_eq!(cards.len(), 3);
    assert!(cards.iter().all(|c| c.mnemonic.is_none()));
    assert!(cards.iter().all(|c| c.example.as_deref() == Some("A steam engine")));
}

#[tokio::test]
async fn test_model_calls_never_exceed_slot_capacity() {
    let replies = (0..6).map(|_| Ok(cards_with_mnemonics(1))).collect();
    let model = Arc::new(ScriptedModel::new(replies).with_delay(Duration::from_millis(40)));
    let client = ModelClient::new(model.clone(), RateSlots::new(2));

    let calls: Vec<_> = (0..6)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .generate_flashcards(LECTURE, &FlashcardOptions::default())
                    .await
            })
        })
        .collect();
    for call in calls {
        call.await.unwrap().unwrap();
    }

    assert_eq!(model.peak(), 2);
    assert_eq!(client.slots().in_flight(), 0);
}

#[tokio::test]
async fn test_sectioned_summary_gets_one_restructure() {
    let model = Arc::new(ScriptedModel::new(vec![
        Ok("Energy is conserved and entropy grows.".to_string()),
        Ok("OVERVIEW\nEnergy and entropy.\n\nKEY POINTS\n- Energy is conserved\n\nTAKEAWAYS\n- Entropy grows".to_string()),
    ]));
    let client = ModelClient::new(model.clone(), RateSlots::new(1));

    let summary = client
        .generate_summary(LECTURE, "Thermodynamics", &SummaryOptions::default())
        .await
        .unwrap();

    assert!(summary.starts_with("OVERVIEW"));
    assert!(summary.contains("TAKEAWAYS"));
    assert_eq!(model.prompts().len(), 2);
}

#[tokio::test]
async fn test_quiz_job_stores_validated_questions() {
    let mut harness = Harness::new();
    let summary = seed_summary(&harness).await;
    let quiz = Quiz::new("q1", "u1", &summary.id, "Thermodynamics quiz");
    harness.repo.save_quiz(&quiz).await.unwrap();

    let job = Job::new(
        "u1",
        JobType::QuizGeneration,
        &quiz.id,
        json!({"num_questions": 5, "difficulty": "hard"}),
    );
    harness.submit(&job).await;

    let model = Arc::new(ScriptedModel::new(vec![Ok(seven_questions())]));
    let handler = Arc::new(harness.pipeline_handlers(model, 2));
    let mut pool = harness.pool(handler, fast_options());
    pool.start(2);
    harness
        .wait_for_job(&job.id, Duration::from_secs(5), |j| j.status == JobStatus::Completed)
        .await;
    pool.stop().await;

    let stored = harness.repo.get_quiz("q1").await.unwrap().unwrap();
    assert_eq!(stored.questions.len(), 5);
    assert!(stored.questions.iter().all(|q| q.difficulty == Difficulty::Hard));

    let events = harness.drain_events();
    assert!(events.contains(&StatusEvent::progress(&job.id, 3, "Generating quiz", 30)));
    assert!(events.contains(&StatusEvent::completed(&job.id, "q1", "quiz")));
}

#[tokio::test]
async fn test_flashcard_job_replaces_deck_cards() {
    let harness = Harness::new();
    let summary = seed_summary(&harness).await;
    let deck = Deck::new("d1", "u1", &summary.id, "Thermodynamics cards");
    harness.repo.save_deck(&deck).await.unwrap();

    let job = Job::new(
        "u1",
        JobType::FlashcardGeneration,
        &deck.id,
        json!({"num_cards": 2, "include_mnemonics": false}),
    );
    harness.submit(&job).await;

    let model = Arc::new(ScriptedModel::new(vec![Ok(cards_with_mnemonics(4))]));
    let handler = Arc::new(harness.pipeline_handlers(model, 1));
    let mut pool = harness.pool(handler, fast_options());
    pool.start(1);
    harness
        .wait_for_job(&job.id, Duration::from_secs(5), |j| j.status == JobStatus::Completed)
        .await;
    pool.stop().await;

    let cards = harness.repo.get_cards("d1").await.unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].front, "Term 1");
    assert!(cards.iter().all(|c| c.mnemonic.is_none()));
}

#[tokio::test]
async fn test_summary_job_reuses_stored_transcript() {
    let harness = Harness::new();
    let mut item = ContentItem::youtube("c1", "u1", "Thermodynamics", "https://youtu.be/dQw4w9WgXcQ");
    item.transcript = Some(LECTURE.to_string());
    harness.repo.save_content(&item).await.unwrap();
    let summary = Summary::new("s1", "u1", Some("c1".to_string()), "Thermodynamics");
    harness.repo.save_summary(&summary).await.unwrap();

    let job = Job::new(
        "u1",
        JobType::SummaryGeneration,
        "s1",
        json!({"format": "prose", "length": "concise"}),
    );
    harness.submit(&job).await;

    let model = Arc::new(ScriptedModel::new(vec![Ok("Energy is conserved.".to_string())]));
    let handler = Arc::new(harness.pipeline_handlers(model.clone(), 1));
    let mut pool = harness.pool(handler, fast_options());
    pool.start(1);
    harness
        .wait_for_job(&job.id, Duration::from_secs(5), |j| j.status == JobStatus::Completed)
        .await;
    pool.stop().await;

    let stored = harness.repo.get_summary("s1").await.unwrap().unwrap();
    assert_eq!(stored.status, SummaryStatus::Completed);
    assert_eq!(stored.content.as_deref(), Some("Energy is conserved."));
    assert_eq!(stored.raw_content.as_deref(), Some(LECTURE));
    assert_eq!(model.prompts().len(), 1);
    assert!(model.prompts()[0].contains("second law"));
}

#[tokio::test]
async fn test_quiz_without_summary_source_fails_permanently() {
    let mut harness = Harness::new();
    let summary = Summary::new("s2", "u1", None, "Empty");
    harness.repo.save_summary(&summary).await.unwrap();
    harness
        .repo
        .save_quiz(&Quiz::new("q2", "u1", "s2", "Empty quiz"))
        .await
        .unwrap();

    let mut job = Job::new("u1", JobType::QuizGeneration, "q2", json!({}));
    job.max_retries = 0;
    harness.submit(&job).await;

    let handler = Arc::new(harness.pipeline_handlers(Arc::new(ScriptedModel::default()), 1));
    let mut pool = harness.pool(handler, fast_options());
    pool.start(1);
    let failed = harness
        .wait_for_job(&job.id, Duration::from_secs(5), |j| j.status == JobStatus::Failed)
        .await;
    pool.stop().await;

    assert!(failed.error_message.as_deref().unwrap_or_default().contains("no source text"));
    assert!(harness
        .drain_events()
        .iter()
        .any(|e| matches!(e, StatusEvent::Error { .. })));
}
