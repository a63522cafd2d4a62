use crate::error::InterviewerError;
use serde::{Deserialize, Serialize};

/// Resume/job-description fit analysis produced during session setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeInsights {
    /// ATS-style match score, 0-100.
    #[serde(rename = "score")]
    pub match_score: f32,
    pub extracted_skills: Vec<String>,
    pub experience_years: f32,
    pub summary: String,
    pub gaps: Vec<String>,
}

impl ResumeInsights {
    pub fn validate(&self) -> Result<(), InterviewerError> {
        check_score("score", self.match_score)
    }
}

/// Final interview evaluation. Produced exactly once, at session completion,
/// and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub overall_score: f32,
    pub star_compliance: f32,
    pub behavioral_score: f32,
    pub technical_score: f32,
    pub feedback: String,
    pub key_strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
    pub suggested_courses: Vec<SuggestedCourse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedCourse {
    pub title: String,
    pub provider: String,
    pub url: String,
}

impl AnalysisReport {
    /// Every score dimension must fall within 0-100 inclusive; anything else
    /// is a malformed response from the scoring service.
    pub fn validate(&self) -> Result<(), InterviewerError> {
        check_score("overallScore", self.overall_score)?;
        check_score("starCompliance", self.star_compliance)?;
        check_score("behavioralScore", self.behavioral_score)?;
        check_score("technicalScore", self.technical_score)?;
        Ok(())
    }
}

fn check_score(field: &'static str, value: f32) -> Result<(), InterviewerError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(InterviewerError::OutOfRange { field, value })
    }
}
