//! Stage Catalog
//!
//! Display labels for the pipeline stages the backend is known to emit.
//! The stage set is open: unknown ids get a label derived from the id itself.

pub const CLASSIFY_QUESTION: &str = "classify_question";
pub const REGULAR_CHATBOT: &str = "regular_chatbot";
pub const INIT_RISK: &str = "init_risk";
pub const FETCH_EXTERNAL_DATA: &str = "fetch_external_data";
pub const VERIFY_SOURCES: &str = "verify_sources";
pub const STORE_IN_VECTOR_DB: &str = "store_in_vector_db";
pub const RETRIEVE_RELEVANT_CONTEXT: &str = "retrieve_relevant_context";
pub const GENERATE_FINAL_ANALYSIS: &str = "generate_final_analysis";

const KNOWN_STAGES: [(&str, &str); 8] = [
    (CLASSIFY_QUESTION, "Classifying request"),
    (REGULAR_CHATBOT, "Answering question"),
    (INIT_RISK, "Extracting company details"),
    (FETCH_EXTERNAL_DATA, "Fetching external data"),
    (VERIFY_SOURCES, "Verifying sources"),
    (STORE_IN_VECTOR_DB, "Storing evidence"),
    (RETRIEVE_RELEVANT_CONTEXT, "Retrieving relevant context"),
    (GENERATE_FINAL_ANALYSIS, "Generating risk analysis"),
];

/// Whether the stage id is one the backend is known to emit.
pub fn is_known_stage(stage: &str) -> bool {
    KNOWN_STAGES.iter().any(|(id, _)| *id == stage)
}

/// Human-readable label for a stage id.
pub fn stage_label(stage: &str) -> String {
    if let Some((_, label)) = KNOWN_STAGES.iter().find(|(id, _)| *id == stage) {
        return (*label).to_string();
    }
    generic_label(stage)
}

/// `fetch_partner_filings` -> `Fetch partner filings`
fn generic_label(stage: &str) -> String {
    let words: Vec<&str> = stage
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return "Processing".to_string();
    }

    let joined = words.join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => joined,
    }
}
