// Resume extraction: JSON located by `find_json_object`, then deserialized and held to
// the skills-fidelity rule. A skill survives only if it occurs as a whole term in the
// text it was supposedly extracted from.

use serde::Deserialize;
use serde_json::Value;

use super::{find_json_object, ExtractError};
use crate::models::resume::{ResumeRecord, Skills};

pub const SKILLS_INCOMPLETE_WARNING: &str =
    "Skills may be incomplete. Please review and add your skills manually.";

/// A resume pulled out of provider output, plus what the extractor had to do to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResume {
    pub resume: ResumeRecord,
    pub missing_skills: bool,
    pub warnings: Vec<String>,
}

/// Skills arrive either grouped by category or as one flat list.
#[derive(Deserialize)]
#[serde(untagged)]
enum SkillsShape {
    Flat(Vec<String>),
    Grouped(Skills),
}

impl From<SkillsShape> for Skills {
    fn from(shape: SkillsShape) -> Self {
        match shape {
            SkillsShape::Flat(technical) => Skills {
                technical,
                ..Skills::default()
            },
            SkillsShape::Grouped(skills) => skills,
        }
    }
}

/// Extracts a resume from a parse response. `source` is the resume text the provider
/// was given.
pub fn parse_resume(text: &str, source: &str) -> Result<ParsedResume, ExtractError> {
    let (mut resume, flagged_missing) = record_from_response(text)?;
    let mut warnings = Vec::new();

    let dropped = keep_skills_found_in(&mut resume.skills, source);
    if dropped > 0 {
        warnings.push(format!(
            "Removed {dropped} skill(s) that do not appear in the resume text"
        ));
    }

    let missing_skills = flagged_missing || resume.skills.is_empty();
    if missing_skills {
        warnings.push(SKILLS_INCOMPLETE_WARNING.to_string());
    }

    Ok(ParsedResume {
        resume,
        missing_skills,
        warnings,
    })
}

/// Extracts an enhanced resume and checks it against the record it was built from.
///
/// The enhanced record must keep the name and must not drop experience or education
/// entries. Skills absent from the original record are removed.
pub fn parse_enhanced(text: &str, original: &ResumeRecord) -> Result<ParsedResume, ExtractError> {
    let (mut resume, flagged_missing) = record_from_response(text)?;

    if resume.experience.len() < original.experience.len() {
        return Err(ExtractError::MissingField(format!(
            "experience shrank from {} to {} entries",
            original.experience.len(),
            resume.experience.len()
        )));
    }
    if resume.education.len() < original.education.len() {
        return Err(ExtractError::MissingField(format!(
            "education shrank from {} to {} entries",
            original.education.len(),
            resume.education.len()
        )));
    }

    let source = record_text(original);
    let mut warnings = Vec::new();
    let dropped = keep_skills_found_in(&mut resume.skills, &source);
    if dropped > 0 {
        warnings.push(format!(
            "Removed {dropped} skill(s) that were not in the original resume"
        ));
    }

    let missing_skills = flagged_missing || resume.skills.is_empty();
    if missing_skills {
        warnings.push(SKILLS_INCOMPLETE_WARNING.to_string());
    }

    Ok(ParsedResume {
        resume,
        missing_skills,
        warnings,
    })
}

/// Locates the JSON object, normalizes the skills shape and deserializes the record.
/// Returns the record and whether the provider itself flagged skills as missing.
fn record_from_response(text: &str) -> Result<(ResumeRecord, bool), ExtractError> {
    let mut value = find_json_object(text)?;
    let Value::Object(map) = &mut value else {
        return Err(ExtractError::NoJsonObject);
    };

    let flagged_missing = map
        .remove("missing_skills")
        .or_else(|| map.remove("missingSkills"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let skills: Skills = match map.remove("skills") {
        None | Some(Value::Null) => Skills::default(),
        Some(raw) => serde_json::from_value::<SkillsShape>(raw)
            .map_err(|e| ExtractError::Schema(format!("skills: {e}")))?
            .into(),
    };

    let mut resume: ResumeRecord =
        serde_json::from_value(value).map_err(|e| ExtractError::Schema(e.to_string()))?;
    if resume.personal_info.name.trim().is_empty() {
        return Err(ExtractError::MissingField("personal_info.name".to_string()));
    }
    resume.skills = skills;

    Ok((resume, flagged_missing))
}

/// Case-insensitive whole-term check; blank entries are always dropped.
fn keep_skills_found_in(skills: &mut Skills, source: &str) -> usize {
    let haystack = source.to_lowercase();
    skills.retain(|skill| {
        let needle = skill.trim().to_lowercase();
        !needle.is_empty() && occurs_as_term(&haystack, &needle)
    })
}

/// True when `needle` appears in `haystack` with no word character touching either end,
/// so "go" does not match inside "google".
fn occurs_as_term(haystack: &str, needle: &str) -> bool {
    let bytes = haystack.as_bytes();
    haystack.match_indices(needle).any(|(start, found)| {
        let end = start + found.len();
        let open_before = start == 0 || !is_word_byte(bytes, start - 1);
        open_before && !is_word_byte(bytes, end)
    })
}

/// Letters, digits, `+` and `#` are word characters, as is a `.` followed by one
/// ("c++", "c#", "node.js"). A sentence-ending `.` is not.
fn is_word_byte(bytes: &[u8], i: usize) -> bool {
    match bytes.get(i) {
        Some(b'.') => bytes
            .get(i + 1)
            .is_some_and(|next| next.is_ascii_alphanumeric()),
        Some(&b) => b.is_ascii_alphanumeric() || b == b'+' || b == b'#' || !b.is_ascii(),
        None => false,
    }
}

/// Every string value of the record joined by newlines. Field names are left out so a
/// skill cannot be matched against keys like "technical" or "description".
fn record_text(record: &ResumeRecord) -> String {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => out.push(s.clone()),
            Value::Array(items) => items.iter().for_each(|v| collect(v, out)),
            Value::Object(map) => map.values().for_each(|v| collect(v, out)),
            _ => {}
        }
    }

    let mut parts = Vec::new();
    if let Ok(value) = serde_json::to_value(record) {
        collect(&value, &mut parts);
    }
    parts.join("\n")
}
