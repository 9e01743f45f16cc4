//! Request context and prompt construction for each AI operation.

use serde::{Deserialize, Serialize};
use study_core::{FileId, KnowledgeLevel};

use crate::provider::Message;

/// Upper bound on source material embedded in one prompt.
pub const MAX_MATERIAL_CHARS: usize = 12_000;

/// Identifier of a previously generated study guide.
pub type StudyGuideId = i64;

/// Material a study guide or quiz is grounded on. Only the ids enter the
/// cache key; `materials` is the text those ids resolve to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyContext {
    pub file_ids: Vec<FileId>,
    pub study_guide_ids: Vec<StudyGuideId>,
    pub subject: Option<String>,
    pub materials: Vec<String>,
}

impl StudyContext {
    pub fn context_ids(&self) -> Vec<String> {
        self.file_ids
            .iter()
            .map(|id| format!("file:{id}"))
            .chain(self.study_guide_ids.iter().map(|id| format!("guide:{id}")))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub conversation_id: Option<i64>,
    pub file_ids: Vec<FileId>,
    /// Prior turns, oldest first.
    pub history: Vec<Message>,
}

impl ConversationContext {
    pub fn context_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.file_ids.iter().map(|id| format!("file:{id}")).collect();
        if let Some(id) = self.conversation_id {
            ids.push(format!("conversation:{id}"));
        }
        // History changes the answer, so each turn is keyed too.
        ids.extend(
            self.history
                .iter()
                .enumerate()
                .map(|(i, m)| format!("turn:{i}:{}:{}", m.role.as_str(), m.content)),
        );
        ids
    }
}

const STUDY_GUIDE_SYSTEM: &str = "You are a study coach. Read the learner's request and the \
study material, then respond ONLY with JSON of the form \
{\"feedback\": {\"summary\": string, \"strengths\": [string], \"weaknesses\": [string]}, \
\"study_plan\": {\"title\": string, \"steps\": [{\"topic\": string, \"description\": string, \
\"duration_minutes\": integer}]}}.";

const QUIZ_SYSTEM: &str = "You write multiple-choice quizzes. Respond ONLY with JSON of the form \
{\"title\": string, \"questions\": [{\"question\": string, \"options\": [string], \
\"answer\": string, \"explanation\": string, \"difficulty\": integer 0-5}]}. \
Every answer must be copied exactly from its options.";

const CHAT_SYSTEM: &str = "You are a patient tutor helping a student understand their study \
material. Answer in plain prose, concisely.";

const FILE_ANALYSIS_SYSTEM: &str = "You analyze study material. Respond ONLY with JSON of the form \
{\"summary\": string, \"key_topics\": [string], \"difficulty\": integer 0-5, \
\"recommendations\": [string], \"confidence\": number 0-1}.";

pub fn study_guide(prompt: &str, ctx: &StudyContext) -> Vec<Message> {
    let mut user = String::new();
    if let Some(subject) = &ctx.subject {
        user.push_str(&format!("Subject: {subject}\n\n"));
    }
    push_materials(&mut user, &ctx.materials);
    user.push_str(&format!("Request:\n{}\n\nRespond ONLY with valid JSON.", prompt.trim()));
    vec![Message::system(STUDY_GUIDE_SYSTEM), Message::user(user)]
}

pub fn quiz(prompt: &str, ctx: &StudyContext, level: KnowledgeLevel, length: u32) -> Vec<Message> {
    let mut user = format!(
        "Write {length} questions for a {} learner (level {level} of 5).\n",
        level.label()
    );
    if let Some(subject) = &ctx.subject {
        user.push_str(&format!("Subject: {subject}\n"));
    }
    user.push('\n');
    push_materials(&mut user, &ctx.materials);
    user.push_str(&format!("Focus:\n{}\n\nRespond ONLY with valid JSON.", prompt.trim()));
    vec![Message::system(QUIZ_SYSTEM), Message::user(user)]
}

pub fn chat(message: &str, ctx: &ConversationContext) -> Vec<Message> {
    let mut messages = Vec::with_capacity(ctx.history.len() + 2);
    messages.push(Message::system(CHAT_SYSTEM));
    messages.extend(ctx.history.iter().cloned());
    messages.push(Message::user(message.trim()));
    messages
}

pub fn file_analysis(text: &str, subject: &str, level: KnowledgeLevel) -> Vec<Message> {
    let user = format!(
        "Subject: {subject}\nReader level: {} ({level} of 5)\n\nMaterial:\n{}\n\nRespond ONLY with valid JSON.",
        level.label(),
        clip(text, MAX_MATERIAL_CHARS)
    );
    vec![Message::system(FILE_ANALYSIS_SYSTEM), Message::user(user)]
}

fn push_materials(out: &mut String, materials: &[String]) {
    let mut budget = MAX_MATERIAL_CHARS;
    for (i, material) in materials.iter().enumerate() {
        if budget == 0 {
            break;
        }
        let piece = clip(material, budget);
        budget = budget.saturating_sub(piece.chars().count());
        out.push_str(&format!("Material {}:\n{}\n\n", i + 1, piece));
    }
}

fn clip(text: &str, max_chars: usize) -> &str {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
