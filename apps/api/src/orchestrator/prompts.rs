// Prompt templates for every orchestrated task except chat (see chat/prompts.rs).
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{
    render, GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM, SKILLS_FIDELITY_INSTRUCTION, WRITER_SYSTEM,
};
use crate::models::resume::{ExperienceLevel, OptimizationOptions, ResumeRecord};
use crate::orchestrator::TaskPayload;
use crate::providers::Prompt;

/// Resume parsing prompt. Replace: {skills_instruction}, {resume_text}
pub const PARSE_PROMPT_TEMPLATE: &str = r#"Parse the following resume text into structured JSON.

{skills_instruction}

Return a JSON object with this EXACT schema:
{
  "personal_info": {
    "name": "Full Name",
    "email": "Email address",
    "phone": "Phone number",
    "location": "City, State/Country",
    "linked_in": "LinkedIn URL or null",
    "portfolio": "Portfolio URL or null",
    "summary": "Professional summary"
  },
  "experience": [
    {"title": "Job title", "company": "Company name", "location": "City or null",
     "duration": "Start date - End date", "description": "What the role involved",
     "achievements": ["Achievement stated in the text"]}
  ],
  "education": [
    {"degree": "Degree name", "institution": "Institution name", "location": "City or null",
     "year": "Graduation year", "gpa": "GPA or null", "achievements": []}
  ],
  "skills": {
    "technical": ["Only skills explicitly written in the resume"],
    "soft": [],
    "certifications": [],
    "languages": []
  },
  "projects": [
    {"name": "Project name", "description": "Description", "technologies": [], "link": "URL or null"}
  ],
  "missing_skills": false
}

RESUME TEXT:
{resume_text}"#;

/// Enhancement prompt. Replace: {grounding_instruction}, {skills_instruction}, {targeting},
/// {resume_json}
pub const ENHANCE_PROMPT_TEMPLATE: &str = r#"Transform this resume data to make it more powerful and impactful.

{grounding_instruction}

{targeting}

{skills_instruction}

Enhancement requirements:
1. Experience: rewrite descriptions with strong action verbs and focus on results and impact.
2. Projects: highlight the problem solved, the technologies used and the outcome.
3. Education: surface achievements already present in the data.
4. Keep every experience and education entry; never remove or merge entries.
5. Keep the same JSON structure and field names as the input.
6. Maintain ATS-friendly wording.

ORIGINAL RESUME DATA:
{resume_json}"#;

/// LaTeX generation prompt. Replace: {resume_json}, {section_order}
pub const DOCUMENT_PROMPT_TEMPLATE: &str = r#"Generate a professional LaTeX resume from this data:
{resume_json}

Requirements:
1. Create a complete, compilable LaTeX document with these sections in order:
{section_order}
2. Use modern LaTeX formatting: \section{} for main sections, itemize for bullet points,
   \textbf{} for emphasis, \href{} for links, consistent spacing and alignment.
3. Make it ATS-friendly: standard section names, no multi-column or table-heavy layouts.
4. Use only the information in the data. Do not add skills, employers or dates.

Return ONLY the LaTeX source, starting with \documentclass and ending with \end{document}."#;

const FRESHER_SECTIONS: &str = "   - Header (Name, Email, Phone, Location, links)
   - Education (institution, degree, graduation year, GPA if available, achievements)
   - Technical Skills (grouped by category)
   - Projects (name, technologies, problem and outcome, links if available)
   - Certifications (if any)";

const EXPERIENCED_SECTIONS: &str = "   - Header (Name, Email, Phone, Location, links)
   - Professional Summary
   - Professional Experience (most recent first, quantified achievements)
   - Education
   - Technical Skills
   - Projects (if any)
   - Certifications (if any)";

/// Cover letter prompt. Replace: {resume_summary}, {job_description}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Create a professional cover letter based on the candidate's resume and the job description.

CANDIDATE RESUME:
{resume_summary}

JOB DESCRIPTION:
{job_description}

Write a compelling cover letter that highlights the candidate's relevant experience and skills
for this position. Use only facts from the resume. Return only the letter text."#;

/// Career objective prompt. Replace: {resume_summary}, {experience_level}, {target_role}
pub const OBJECTIVE_PROMPT_TEMPLATE: &str = r#"Generate a compelling career objective for this candidate.

{resume_summary}
Experience level: {experience_level}
{target_role}

Rules:
1. Keep it under 3 sentences.
2. Highlight key strengths that appear in the resume.
3. Make it specific to their background.
4. Include career aspirations.
Return only the objective text."#;

/// Single-field rewrite prompt. Replace: {context}, {text}
pub const ENHANCE_TEXT_PROMPT_TEMPLATE: &str = r#"Enhance the following text to make it more professional and impactful.
If the text is written in ALL CAPS, convert it to proper case.

Context: {context}
Text to enhance: {text}

Rules:
1. Maintain factual accuracy; do not add facts, numbers or skills.
2. Use industry-standard terminology.
3. Be concise but descriptive.
4. Fix any grammatical issues.
5. Use active voice.
Return only the rewritten text."#;

/// Achievement bullets prompt. Replace: {role}, {description}
pub const BULLETS_PROMPT_TEMPLATE: &str = r#"Transform the following job description into achievement-oriented bullet points.

Role: {role}
Description: {description}

Guidelines:
1. Start each bullet with a strong action verb.
2. Show impact and results.
3. Include numbers only when the description states them.
4. Be concise yet descriptive and use industry-relevant keywords.

Return ONLY a JSON array of strings, for example ["Bullet one", "Bullet two"]."#;

/// Renders the provider prompt for a task payload.
pub fn build_prompt(payload: &TaskPayload) -> Prompt {
    match payload {
        TaskPayload::Parse { text } => Prompt::new(
            JSON_ONLY_SYSTEM,
            render(
                PARSE_PROMPT_TEMPLATE,
                &[
                    ("skills_instruction", SKILLS_FIDELITY_INSTRUCTION),
                    ("resume_text", text),
                ],
            ),
        ),
        TaskPayload::Enhance { resume, options } => Prompt::new(
            JSON_ONLY_SYSTEM,
            render(
                ENHANCE_PROMPT_TEMPLATE,
                &[
                    ("grounding_instruction", GROUNDING_INSTRUCTION),
                    ("targeting", &targeting(options)),
                    ("skills_instruction", SKILLS_FIDELITY_INSTRUCTION),
                    ("resume_json", &to_pretty_json(resume)),
                ],
            ),
        ),
        TaskPayload::GenerateDocument {
            resume,
            experience_level,
        } => {
            let sections = match experience_level {
                ExperienceLevel::Fresher => FRESHER_SECTIONS,
                ExperienceLevel::Experienced => EXPERIENCED_SECTIONS,
            };
            Prompt::new(
                WRITER_SYSTEM,
                render(
                    DOCUMENT_PROMPT_TEMPLATE,
                    &[
                        ("section_order", sections),
                        ("resume_json", &to_pretty_json(resume)),
                    ],
                ),
            )
        }
        TaskPayload::CoverLetter {
            resume,
            job_description,
        } => Prompt::new(
            WRITER_SYSTEM,
            render(
                COVER_LETTER_PROMPT_TEMPLATE,
                &[
                    ("resume_summary", &summarize(resume)),
                    ("job_description", job_description),
                ],
            ),
        ),
        TaskPayload::CareerObjective { resume, target_role } => {
            let level = if resume.experience.is_empty() {
                "Fresh graduate"
            } else {
                "Experienced professional"
            };
            let target = target_role
                .as_deref()
                .map(|role| format!("Target role: {role}"))
                .unwrap_or_default();
            Prompt::new(
                WRITER_SYSTEM,
                render(
                    OBJECTIVE_PROMPT_TEMPLATE,
                    &[
                        ("resume_summary", &summarize(resume)),
                        ("experience_level", level),
                        ("target_role", &target),
                    ],
                ),
            )
        }
        TaskPayload::EnhanceText { text, context } => Prompt::new(
            WRITER_SYSTEM,
            render(
                ENHANCE_TEXT_PROMPT_TEMPLATE,
                &[("context", or_unspecified(context)), ("text", text)],
            ),
        ),
        TaskPayload::AchievementBullets { description, role } => Prompt::new(
            WRITER_SYSTEM,
            render(
                BULLETS_PROMPT_TEMPLATE,
                &[("role", or_unspecified(role)), ("description", description)],
            ),
        ),
        TaskPayload::Chat {
            document,
            history,
            message,
        } => crate::chat::prompts::build_chat_prompt(document, history, message),
    }
}

fn or_unspecified(value: &str) -> &str {
    match value.trim() {
        "" => "Not specified",
        trimmed => trimmed,
    }
}

/// Target role, industry and focus areas for the enhance prompt.
fn targeting(options: &OptimizationOptions) -> String {
    let focus = if options.focus_areas.is_empty() {
        "All areas".to_string()
    } else {
        options
            .focus_areas
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Target role: {}\nTarget industry: {}\nFocus areas: {focus}",
        or_unspecified(options.target_role.as_deref().unwrap_or_default()),
        or_unspecified(options.target_industry.as_deref().unwrap_or_default()),
    )
}

fn to_pretty_json(resume: &ResumeRecord) -> String {
    serde_json::to_string_pretty(resume).unwrap_or_default()
}

/// Compact plain-text view of a resume for the prose tasks.
pub fn summarize(resume: &ResumeRecord) -> String {
    let info = &resume.personal_info;
    let mut out = format!("Name: {}\n", info.name);
    if !info.summary.is_empty() {
        out.push_str(&format!("Summary: {}\n", info.summary));
    }

    if !resume.experience.is_empty() {
        out.push_str("Experience:\n");
        for exp in &resume.experience {
            out.push_str(&format!(
                "- {} at {} ({})\n  {}\n",
                exp.title, exp.company, exp.duration, exp.description
            ));
        }
    }

    if !resume.education.is_empty() {
        out.push_str("Education:\n");
        for edu in &resume.education {
            out.push_str(&format!(
                "- {} from {} ({})\n",
                edu.degree, edu.institution, edu.year
            ));
        }
    }

    let skills: Vec<&str> = resume.skills.all().map(String::as_str).collect();
    if !skills.is_empty() {
        out.push_str(&format!("Skills: {}\n", skills.join(", ")));
    }
    out
}
