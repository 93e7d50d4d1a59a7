// Experience submissions - request shapes, validation, filtering and round editing
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::experiences::NewExperience;
use crate::db::models::{Experience, OfferStatus, Round, User};
use crate::error::{AppError, AppResult};
use crate::moderation;

pub const MIN_YEAR: i32 = 1990;
pub const MAX_YEAR: i32 = 2100;

const MISSING_FIELDS: &str = "Missing required fields: company, role, branch, year, rounds";

/// Integer that clients send either as a JSON number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseInt {
    Number(i64),
    Text(String),
}

impl LooseInt {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            LooseInt::Number(n) => i32::try_from(*n).ok(),
            LooseInt::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Body of `POST /experiences`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceInput {
    pub company: Option<String>,
    pub role: Option<String>,
    pub branch: Option<String>,
    pub year: Option<LooseInt>,
    pub rounds: Option<Vec<Round>>,
    pub package: Option<String>,
    pub tips: Option<String>,
    pub interview_date: Option<String>,
    pub offer_status: Option<String>,
    /// Display name for anonymous submissions
    pub author: Option<String>,
}

/// Body of `PUT /experiences/:id`. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceUpdate {
    pub company: Option<String>,
    pub role: Option<String>,
    pub branch: Option<String>,
    pub year: Option<LooseInt>,
    pub rounds: Option<Vec<Round>>,
    pub package: Option<String>,
    pub tips: Option<String>,
    pub interview_date: Option<String>,
    pub offer_status: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_year(year: &LooseInt) -> AppResult<i32> {
    let year = year
        .as_i32()
        .ok_or_else(|| AppError::BadRequest("Year must be a number".into()))?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(AppError::BadRequest(format!(
            "Year must be between {} and {}",
            MIN_YEAR, MAX_YEAR
        )));
    }
    Ok(year)
}

fn validate_rounds(mut rounds: Vec<Round>) -> AppResult<Vec<Round>> {
    if rounds.is_empty() {
        return Err(AppError::BadRequest("At least one round is required".into()));
    }
    renumber_rounds(&mut rounds);
    Ok(rounds)
}

fn parse_offer_status(raw: &str) -> AppResult<OfferStatus> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid offer status: {}", raw)))
}

/// Accepts a plain `YYYY-MM-DD` date or a full RFC 3339 timestamp.
pub fn parse_interview_date(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .ok_or_else(|| AppError::BadRequest(format!("Invalid interview date: {}", raw)))
}

impl ExperienceInput {
    /// Validate a submission. `author` is the signed-in user, if any.
    pub fn validate(self, author: Option<&User>) -> AppResult<NewExperience> {
        let (Some(company), Some(role), Some(branch), Some(year), Some(rounds)) = (
            non_blank(self.company),
            non_blank(self.role),
            non_blank(self.branch),
            self.year,
            self.rounds,
        ) else {
            return Err(AppError::BadRequest(MISSING_FIELDS.into()));
        };

        let year = validate_year(&year)?;
        let rounds = validate_rounds(rounds)?;

        let (author_id, author_name) = match author {
            Some(user) => (Some(user.id.clone()), user.name.clone()),
            None => {
                let name = non_blank(self.author).ok_or_else(|| {
                    AppError::BadRequest("Author name is required for anonymous submissions".into())
                })?;
                (None, name)
            }
        };

        let interview_date = match non_blank(self.interview_date) {
            Some(raw) => parse_interview_date(&raw)?,
            None => Utc::now().date_naive(),
        };
        let offer_status = match non_blank(self.offer_status) {
            Some(raw) => parse_offer_status(&raw)?,
            None => OfferStatus::default(),
        };

        Ok(NewExperience {
            company,
            role,
            branch,
            year,
            package: non_blank(self.package),
            tips: self.tips.unwrap_or_default(),
            interview_date,
            offer_status,
            author_id,
            author_name,
            rounds,
        })
    }
}

impl ExperienceUpdate {
    /// Apply the present fields to `experience`, validating each one.
    pub fn apply_to(self, experience: &mut Experience) -> AppResult<()> {
        if let Some(company) = self.company {
            experience.company =
                non_blank(Some(company)).ok_or_else(|| blank_field("Company"))?;
        }
        if let Some(role) = self.role {
            experience.role = non_blank(Some(role)).ok_or_else(|| blank_field("Role"))?;
        }
        if let Some(branch) = self.branch {
            experience.branch = non_blank(Some(branch)).ok_or_else(|| blank_field("Branch"))?;
        }
        if let Some(year) = self.year {
            experience.year = validate_year(&year)?;
        }
        if let Some(rounds) = self.rounds {
            experience.rounds = validate_rounds(rounds)?;
        }
        if let Some(package) = self.package {
            experience.package = non_blank(Some(package));
        }
        if let Some(tips) = self.tips {
            experience.tips = tips;
        }
        if let Some(raw) = non_blank(self.interview_date) {
            experience.interview_date = parse_interview_date(&raw)?;
        }
        if let Some(raw) = non_blank(self.offer_status) {
            experience.offer_status = parse_offer_status(&raw)?;
        }
        Ok(())
    }
}

fn blank_field(name: &str) -> AppError {
    AppError::BadRequest(format!("{} cannot be empty", name))
}

/// Assign round numbers 1..=n in list order.
pub fn renumber_rounds(rounds: &mut [Round]) {
    for (idx, round) in rounds.iter_mut().enumerate() {
        round.round_number = idx as u32 + 1;
    }
}

/// Remove the round carrying `round_number` and renumber the rest.
pub fn remove_round(rounds: &mut Vec<Round>, round_number: u32) -> AppResult<()> {
    let position = rounds
        .iter()
        .position(|r| r.round_number == round_number)
        .ok_or_else(|| AppError::NotFound(format!("Round {} not found", round_number)))?;

    if rounds.len() == 1 {
        return Err(AppError::BadRequest(
            "An experience must keep at least one round".into(),
        ));
    }

    rounds.remove(position);
    renumber_rounds(rounds);
    Ok(())
}

/// Who may read a record through the detail endpoint.
pub fn can_view(experience: &Experience, viewer: Option<&User>) -> bool {
    moderation::is_public(experience.moderation_status)
        || viewer.is_some_and(|user| can_edit(experience, user))
}

/// Authors and admins may edit or delete a record.
pub fn can_edit(experience: &Experience, user: &User) -> bool {
    user.is_admin() || experience.is_authored_by(&user.id)
}

/// Query string of `GET /experiences`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExperienceFilter {
    pub company: Option<String>,
    pub role: Option<String>,
    pub branch: Option<String>,
    pub year: Option<String>,
    pub search: Option<String>,
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl ExperienceFilter {
    pub fn matches(&self, experience: &Experience) -> bool {
        let field_matches = |filter: &Option<String>, value: &str| match non_blank(filter.clone())
        {
            Some(needle) => contains_ci(value, &needle.to_lowercase()),
            None => true,
        };

        if !field_matches(&self.company, &experience.company)
            || !field_matches(&self.role, &experience.role)
            || !field_matches(&self.branch, &experience.branch)
        {
            return false;
        }

        if let Some(year) = non_blank(self.year.clone()) {
            // An unparsable year matches nothing
            match year.parse::<i32>() {
                Ok(year) if year == experience.year => {}
                _ => return false,
            }
        }

        match non_blank(self.search.clone()) {
            Some(search) => matches_search(experience, &search.to_lowercase()),
            None => true,
        }
    }

    pub fn apply(&self, experiences: Vec<Experience>) -> Vec<Experience> {
        experiences.into_iter().filter(|e| self.matches(e)).collect()
    }
}

fn matches_search(experience: &Experience, needle: &str) -> bool {
    contains_ci(&experience.company, needle)
        || contains_ci(&experience.role, needle)
        || contains_ci(&experience.branch, needle)
        || contains_ci(&experience.tips, needle)
        || experience.rounds.iter().any(|round| {
            round.questions.iter().any(|q| contains_ci(q.text(), needle))
                || contains_ci(&round.feedback, needle)
        })
}

/// Distinct values for the listing filter dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub companies: Vec<String>,
    pub roles: Vec<String>,
    pub branches: Vec<String>,
    pub years: Vec<i32>,
}

pub fn filter_options(experiences: &[Experience]) -> FilterOptions {
    let mut companies = BTreeSet::new();
    let mut roles = BTreeSet::new();
    let mut branches = BTreeSet::new();
    let mut years = BTreeSet::new();

    for experience in experiences {
        companies.insert(experience.company.clone());
        roles.insert(experience.role.clone());
        branches.insert(experience.branch.clone());
        years.insert(experience.year);
    }

    FilterOptions {
        companies: companies.into_iter().collect(),
        roles: roles.into_iter().collect(),
        branches: branches.into_iter().collect(),
        years: years.into_iter().rev().collect(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::db::models::{AuthorSummary, ModerationStatus, Question, Role};

    pub fn round(name: &str, questions: &[&str]) -> Round {
        Round {
            round_number: 0,
            round_name: name.into(),
            questions: questions
                .iter()
                .map(|q| Question::Plain(q.to_string()))
                .collect(),
            feedback: String::new(),
        }
    }

    pub fn experience(company: &str, role: &str, year: i32, package: Option<&str>) -> Experience {
        let now = Utc::now();
        let mut rounds = vec![round("Online Assessment", &["Two sum"])];
        renumber_rounds(&mut rounds);
        Experience {
            id: format!("{}-{}-{}", company, role, year),
            company: company.into(),
            role: role.into(),
            branch: "Computer Engineering".into(),
            year,
            package: package.map(String::from),
            tips: String::new(),
            interview_date: now.date_naive(),
            offer_status: OfferStatus::Selected,
            moderation_status: ModerationStatus::Approved,
            moderation_notes: None,
            moderated_by: None,
            moderated_at: None,
            views: 0,
            author: Some(AuthorSummary {
                id: "author-1".into(),
                name: "Author".into(),
                username: "author".into(),
                role: Role::Student,
                branch: None,
            }),
            author_name: "Author".into(),
            rounds,
            created_at: now,
            updated_at: now,
        }
    }
}
