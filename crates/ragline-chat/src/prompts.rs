//! Prompt templates.

use ragline_store::ScoredChunk;

/// Grounded QA prompt. Each chunk is listed as `[#<id>] <content>`.
pub fn qa_prompt(question: &str, context: &[ScoredChunk]) -> String {
    let mut prompt = String::from(
        "You are a careful assistant. Answer the question using ONLY the context below. \
         If the context does not contain the answer, say so. \
         Cite the passages you used at the end of each sentence as [#id].\n\nContext:\n",
    );
    for chunk in context {
        prompt.push_str(&format!("[#{}] {}\n", chunk.id, chunk.content.trim()));
    }
    prompt.push_str("\nQuestion: ");
    prompt.push_str(question);
    prompt
}

/// Summary prompt asking for exactly `num_bullets` bullets as `{"bullets": [...]}`.
pub fn summary_prompt(text: &str, num_bullets: usize, category: &str, instruction: &str) -> String {
    let mut prompt = String::from("You are an expert analyst. ");
    if !instruction.is_empty() {
        prompt.push_str(&format!("Task: {}. ", instruction));
    }
    prompt.push_str(&format!(
        "Write exactly {n} short, insightful bullet points (20 to 25 words each) summarizing the document",
        n = num_bullets
    ));
    if !category.is_empty() {
        prompt.push_str(&format!(", focusing on: {}", category));
    }
    prompt.push_str(&format!(
        ".\nUse only information from the text provided.\n\
         Output only JSON of the form {{\"bullets\": [\"...\"]}} with exactly {n} items, \
         with no preamble.\n\nText:\n{text}",
        n = num_bullets,
        text = text
    ));
    prompt
}
