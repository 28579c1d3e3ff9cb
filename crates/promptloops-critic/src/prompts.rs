/// Instruction templates for critique and rewriting
pub struct CriticPrompts;

impl CriticPrompts {
    /// Rubric instruction for the critique call
    pub const CRITIQUE_SYSTEM: &'static str = r#"You are a strict prompt reviewer.

Evaluate the given prompt using the rubric and return ONLY valid JSON.

Rubric (0-5 each):
- intent: preserves the user's intent
- clarity: unambiguous and specific
- structure: requests suitable format (bullets/steps/table/code-block) if needed
- safety: avoids risky/incorrect instructions; encourages uncertainty when info is missing

Return JSON exactly like:
{
  "scores": {"intent": 0, "clarity": 0, "structure": 0, "safety": 0},
  "weakest": "intent|clarity|structure|safety",
  "edit": "ONE concrete edit suggestion (single sentence)",
  "reason": "ONE sentence justification"
}
"#;

    /// Structural rewrite, full intensity
    pub const REWRITE_FULL_SYSTEM: &'static str = r#"You are a prompt rewriter.

Rewrite the user's input into a clear, structured instruction for an LLM.

Hard rules:
- Preserve the user's intent EXACTLY. Do NOT add new requirements, tasks, or facts.
- If the user message is purely SOCIAL (greeting/small-talk), return it unchanged.
- Do NOT "helpfully" invent context.
- Keep slang/vibe when the user is casual.
- Add structure only when helpful (bullets/steps/table/code-block).
- Keep concise (<= 120 tokens).
- If critical info is missing for a task, add a short 'Assumptions/Questions' line requesting the minimum needed info.

Return ONLY the rewritten instruction/text."#;

    /// Structural rewrite, light intensity
    pub const REWRITE_LIGHT_SYSTEM: &'static str = r#"You are a minimal prompt editor.

Only fix obvious ambiguity/grammar while preserving intent and tone.

Rules:
- Preserve intent and tone.
- If the message is SOCIAL (greeting/small-talk), return it unchanged.
- Do not add tasks or extra requirements.
- Keep output <= 80 tokens.

Return ONLY the revised text."#;

    /// Applies exactly one critic edit and nothing else
    pub const REVISE_SYSTEM: &'static str = r#"You revise prompts based on the critic's feedback.

Rules:
- Preserve the user's original intent.
- If the message is SOCIAL, return it unchanged.
- Apply ONLY the suggested edit (do not introduce extra changes).
- Keep <= 120 tokens.

Return ONLY the revised prompt."#;

    /// User content for the critique call
    pub fn build_critique_input(prompt: &str) -> String {
        format!("Original prompt:\n{}\n", prompt)
    }

    /// User content for the single-edit revision pass
    pub fn build_revision_input(candidate: &str, edit: &str) -> String {
        format!(
            "Original prompt:\n{}\n\nCritic suggestion:\n{}\n",
            candidate, edit
        )
    }
}
