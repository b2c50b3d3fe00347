//! Resume data model shared by every AI task.
//!
//! A `ResumeRecord` is an immutable snapshot: AI operations take one in and hand a new
//! one back. There is no field-level merge anywhere in the service.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, alias = "linkedIn", skip_serializing_if = "Option::is_none")]
    pub linked_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skills {
    #[serde(default)]
    pub technical: Vec<String>,
    #[serde(default)]
    pub soft: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

impl Skills {
    pub fn is_empty(&self) -> bool {
        self.technical.is_empty()
            && self.soft.is_empty()
            && self.certifications.is_empty()
            && self.languages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.technical.len() + self.soft.len() + self.certifications.len() + self.languages.len()
    }

    /// All skill lists, flattened in display order.
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.technical
            .iter()
            .chain(self.soft.iter())
            .chain(self.certifications.iter())
            .chain(self.languages.iter())
    }

    /// Keeps only the skills accepted by `keep`, returning how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let before = self.len();
        for list in [
            &mut self.technical,
            &mut self.soft,
            &mut self.certifications,
            &mut self.languages,
        ] {
            list.retain(|s| keep(s));
        }
        before - self.len()
    }
}

/// Aspect of a resume the enhancer should emphasise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    Technical,
    Leadership,
    Achievements,
    Metrics,
}

impl FocusArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            FocusArea::Technical => "technical",
            FocusArea::Leadership => "leadership",
            FocusArea::Achievements => "achievements",
            FocusArea::Metrics => "metrics",
        }
    }
}

/// Optional steering for resume enhancement. Every field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOptions {
    #[serde(default, alias = "targetRole")]
    pub target_role: Option<String>,
    #[serde(default, alias = "targetIndustry")]
    pub target_industry: Option<String>,
    #[serde(default, alias = "focusAreas")]
    pub focus_areas: Vec<FocusArea>,
}

/// Experience level drives the section order of the generated LaTeX document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Fresher,
    #[default]
    Experienced,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    #[serde(alias = "personalInfo")]
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub skills: Skills,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

impl ResumeRecord {
    /// Rejects records too incomplete to send to a provider.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.personal_info.name.trim().is_empty() {
            return Err(AppError::Validation(
                "personal_info.name is required".to_string(),
            ));
        }
        for (i, exp) in self.experience.iter().enumerate() {
            if exp.title.trim().is_empty() || exp.company.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "experience[{i}] needs both a title and a company"
                )));
            }
        }
        for (i, edu) in self.education.iter().enumerate() {
            if edu.degree.trim().is_empty() || edu.institution.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "education[{i}] needs both a degree and an institution"
                )));
            }
        }
        Ok(())
    }

    /// Schema-valid stand-in returned when every provider fails to parse a resume.
    pub fn placeholder() -> Self {
        ResumeRecord {
            personal_info: PersonalInfo {
                name: "Sample Name".to_string(),
                email: "email@example.com".to_string(),
                phone: "(123) 456-7890".to_string(),
                location: "City, State".to_string(),
                linked_in: None,
                portfolio: None,
                summary: "Please add your professional summary here.".to_string(),
            },
            experience: vec![ExperienceEntry {
                title: "Position Title".to_string(),
                company: "Company Name".to_string(),
                location: None,
                duration: "Start Date - End Date".to_string(),
                description: "Describe your responsibilities and achievements.".to_string(),
                achievements: vec![],
            }],
            education: vec![EducationEntry {
                degree: "Degree".to_string(),
                institution: "University Name".to_string(),
                location: None,
                year: "Graduation Year".to_string(),
                gpa: None,
                achievements: vec![],
            }],
            skills: Skills {
                technical: vec![
                    "Skill 1".to_string(),
                    "Skill 2".to_string(),
                    "Skill 3".to_string(),
                ],
                ..Skills::default()
            },
            projects: vec![],
        }
    }
}
