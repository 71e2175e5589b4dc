//! Static author profile behind the About and Resume pages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub headline: String,
    pub bio: Vec<String>,
    pub email: Option<String>,
    pub github: Option<String>,
    pub avatar_url: Option<String>,
    pub skills: Vec<SkillGroup>,
    pub experience: Vec<TimelineEntry>,
    pub education: Vec<TimelineEntry>,
    pub projects: Vec<ProjectEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillGroup {
    pub name: String,
    pub items: Vec<String>,
}

/// A dated line on the resume: a job, an activity or a degree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineEntry {
    pub title: String,
    pub period: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    pub title: String,
    pub period: String,
    pub role: String,
    pub tech_stack: Vec<String>,
    pub highlights: Vec<String>,
    pub url: Option<String>,
}

impl Profile {
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// `mailto:` link for the contact address, if any.
    pub fn mailto(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(|email| format!("mailto:{email}"))
    }
}
