// Tables are created by `repository::diesel_pool::SCHEMA_SQL`; keep both in sync.

diesel::table! {
    jobs (id) {
        id -> Text,
        user_id -> Text,
        job_type -> Text,
        reference_id -> Text,
        config -> Text,
        status -> Text,
        retry_count -> Integer,
        max_retries -> Integer,
        error_message -> Nullable<Text>,
        created_at -> Text,
        completed_at -> Nullable<Text>,
    }
}

diesel::table! {
    content_items (id) {
        id -> Text,
        user_id -> Text,
        content_type -> Text,
        title -> Text,
        status -> Text,
        source_url -> Nullable<Text>,
        file_path -> Nullable<Text>,
        transcript -> Nullable<Text>,
        metadata -> Text,
    }
}

diesel::table! {
    summaries (id) {
        id -> Text,
        user_id -> Text,
        content_id -> Nullable<Text>,
        title -> Text,
        raw_content -> Nullable<Text>,
        content -> Nullable<Text>,
        status -> Text,
    }
}

diesel::table! {
    quizzes (id) {
        id -> Text,
        user_id -> Text,
        summary_id -> Text,
        title -> Text,
        questions -> Text,
    }
}

diesel::table! {
    decks (id) {
        id -> Text,
        user_id -> Text,
        summary_id -> Text,
        title -> Text,
    }
}

diesel::table! {
    flashcards (id) {
        id -> Integer,
        deck_id -> Text,
        position -> Integer,
        front -> Text,
        back -> Text,
        mnemonic -> Nullable<Text>,
        example -> Nullable<Text>,
        difficulty -> Text,
        topic -> Nullable<Text>,
    }
}

diesel::joinable!(flashcards -> decks (deck_id));

diesel::allow_tables_to_appear_in_same_query!(
    jobs,
    content_items,
    summaries,
    quizzes,
    decks,
    flashcards,
);
