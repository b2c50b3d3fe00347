// Shared prompt constants and prompt-building utilities.
// Task prompts live in orchestrator/prompts.rs and chat/prompts.rs.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction shared by every task that touches the skills section.
pub const SKILLS_FIDELITY_INSTRUCTION: &str = "\
    CRITICAL: ONLY include skills that are EXPLICITLY mentioned in the source. \
    Do NOT generate, infer or add skills that are not clearly stated. \
    If the skills section appears missing or incomplete, set \"missing_skills\": true \
    instead of filling it in.";

/// Instruction that keeps generated content grounded in the user's data.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Keep all original information intact. Only enhance existing content; \
    do NOT invent employers, dates, degrees, metrics or achievements that are not \
    supported by the data provided.";

/// System prompt for free-text generation tasks.
pub const WRITER_SYSTEM: &str = "You are an expert resume writer and career coach. \
    Write in a professional, concise and ATS-friendly style.";

/// Fills `{name}` placeholders in one pass over `template`.
///
/// Substituted values are never rescanned, so user text containing `{document}` or
/// similar stays literal. Braces that do not name a known placeholder are kept as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });
        match hit {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
