// Question index - every interview question across approved experiences
pub mod export;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::db::models::{Experience, Level};

/// Query string shared by search and export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionQuery {
    pub company: Option<String>,
    pub role: Option<String>,
}

impl QuestionQuery {
    pub fn company(&self) -> Option<&str> {
        self.company.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionEntry {
    pub question: String,
    pub company: String,
    pub role: String,
    pub round_number: u32,
    pub round_name: String,
    pub year: i32,
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSearch {
    pub questions: Vec<QuestionEntry>,
    /// Roles offered at the filtered company; empty without a company filter
    pub available_roles: Vec<String>,
}

/// Questions of one interview round, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundGroup<'a> {
    pub round_number: u32,
    pub round_name: &'a str,
    pub questions: Vec<&'a QuestionEntry>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Flatten and filter the questions of `experiences`.
pub fn search(experiences: &[Experience], query: &QuestionQuery) -> QuestionSearch {
    let company = query.company();
    let role = query.role();

    let at_company: Vec<&Experience> = experiences
        .iter()
        .filter(|e| company.map_or(true, |c| contains_ci(&e.company, c)))
        .collect();

    let available_roles = match company {
        Some(_) => at_company
            .iter()
            .map(|e| e.role.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        None => Vec::new(),
    };

    let questions = at_company
        .iter()
        .filter(|e| role.map_or(true, |r| contains_ci(&e.role, r)))
        .flat_map(|experience| {
            experience.rounds.iter().flat_map(move |round| {
                round.questions.iter().map(move |question| QuestionEntry {
                    question: question.text().to_string(),
                    company: experience.company.clone(),
                    role: experience.role.clone(),
                    round_number: round.round_number,
                    round_name: round.round_name.clone(),
                    year: experience.year,
                    level: question.level(),
                })
            })
        })
        .collect();

    QuestionSearch {
        questions,
        available_roles,
    }
}

/// Group entries by (round number, round name), ascending by round number.
pub fn group_by_round(entries: &[QuestionEntry]) -> Vec<RoundGroup<'_>> {
    let mut groups: Vec<RoundGroup<'_>> = Vec::new();
    for entry in entries {
        let existing = groups
            .iter_mut()
            .find(|g| g.round_number == entry.round_number && g.round_name == entry.round_name);
        match existing {
            Some(group) => group.questions.push(entry),
            None => groups.push(RoundGroup {
                round_number: entry.round_number,
                round_name: &entry.round_name,
                questions: vec![entry],
            }),
        }
    }
    // Stable: same-numbered rounds with different names keep first-seen order
    groups.sort_by_key(|g| g.round_number);
    groups
}
