// Aggregation engine - analytics over a snapshot of approved experiences
mod package;

pub use package::parse_package;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Serialize, Serializer};

use crate::db::models::Experience;

const TOP_QUESTIONS: usize = 10;
const TOP_PACKAGES: usize = 10;

/// Whole-valued packages serialize as integers (`40`, not `40.0`).
fn serialize_amount<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_experiences: usize,
    pub unique_companies: usize,
    pub unique_roles: usize,
    /// Mean package, two decimals
    pub avg_package: String,
    #[serde(serialize_with = "serialize_amount")]
    pub max_package: f64,
    #[serde(serialize_with = "serialize_amount")]
    pub min_package: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionFrequency {
    pub question: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackagePoint {
    #[serde(serialize_with = "serialize_amount")]
    pub value: f64,
    pub company: String,
    pub role: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub overview: Overview,
    pub frequent_questions: Vec<QuestionFrequency>,
    pub company_distribution: BTreeMap<String, usize>,
    pub year_distribution: BTreeMap<String, usize>,
    pub role_distribution: BTreeMap<String, usize>,
    pub package_trends: Vec<PackagePoint>,
}

/// Compute analytics for `experiences`. Deterministic for identical input.
pub fn compute(experiences: &[Experience]) -> Insights {
    let mut companies = HashSet::new();
    let mut roles = HashSet::new();
    let mut company_distribution = BTreeMap::new();
    let mut year_distribution = BTreeMap::new();
    let mut role_distribution = BTreeMap::new();
    let mut packages = Vec::new();

    // Question counts keep first-seen order so ties stay stable after sorting
    let mut question_counts: Vec<QuestionFrequency> = Vec::new();
    let mut question_index: HashMap<String, usize> = HashMap::new();

    for experience in experiences {
        companies.insert(experience.company.as_str());
        roles.insert(experience.role.as_str());
        *company_distribution
            .entry(experience.company.clone())
            .or_insert(0) += 1;
        *year_distribution
            .entry(experience.year.to_string())
            .or_insert(0) += 1;
        *role_distribution.entry(experience.role.clone()).or_insert(0) += 1;

        if let Some(value) = experience.package.as_deref().and_then(parse_package) {
            packages.push(PackagePoint {
                value,
                company: experience.company.clone(),
                role: experience.role.clone(),
                year: experience.year,
            });
        }

        for question in experience.rounds.iter().flat_map(|r| r.questions.iter()) {
            let key = question.text().to_lowercase();
            match question_index.get(&key) {
                Some(&idx) => question_counts[idx].count += 1,
                None => {
                    question_index.insert(key.clone(), question_counts.len());
                    question_counts.push(QuestionFrequency {
                        question: key,
                        count: 1,
                    });
                }
            }
        }
    }

    question_counts.sort_by(|a, b| b.count.cmp(&a.count));
    question_counts.truncate(TOP_QUESTIONS);

    let overview = overview(
        experiences.len(),
        companies.len(),
        roles.len(),
        &packages,
    );

    packages.sort_by(|a, b| b.value.total_cmp(&a.value));
    packages.truncate(TOP_PACKAGES);

    Insights {
        overview,
        frequent_questions: question_counts,
        company_distribution,
        year_distribution,
        role_distribution,
        package_trends: packages,
    }
}

fn overview(
    total_experiences: usize,
    unique_companies: usize,
    unique_roles: usize,
    packages: &[PackagePoint],
) -> Overview {
    if packages.is_empty() {
        return Overview {
            total_experiences,
            unique_companies,
            unique_roles,
            avg_package: format!("{:.2}", 0.0),
            max_package: 0.0,
            min_package: 0.0,
        };
    }

    let sum: f64 = packages.iter().map(|p| p.value).sum();
    let max = packages
        .iter()
        .map(|p| p.value)
        .fold(f64::NEG_INFINITY, f64::max);
    let min = packages.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);

    Overview {
        total_experiences,
        unique_companies,
        unique_roles,
        avg_package: format!("{:.2}", sum / packages.len() as f64),
        max_package: max,
        min_package: min,
    }
}

/// Per-company rollup served by `/companies`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub name: String,
    pub total_experiences: usize,
    pub roles: Vec<String>,
    pub branches: Vec<String>,
    pub years: Vec<i32>,
    pub packages: Vec<String>,
}

fn push_distinct<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Group experiences by company name, in first-seen order.
pub fn company_rollup(experiences: &[Experience]) -> Vec<CompanySummary> {
    let mut summaries: Vec<CompanySummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for experience in experiences {
        let idx = *index.entry(experience.company.as_str()).or_insert_with(|| {
            summaries.push(CompanySummary {
                name: experience.company.clone(),
                total_experiences: 0,
                roles: Vec::new(),
                branches: Vec::new(),
                years: Vec::new(),
                packages: Vec::new(),
            });
            summaries.len() - 1
        });

        let summary = &mut summaries[idx];
        summary.total_experiences += 1;
        push_distinct(&mut summary.roles, experience.role.clone());
        push_distinct(&mut summary.branches, experience.branch.clone());
        push_distinct(&mut summary.years, experience.year);
        if let Some(package) = experience.package.as_ref().filter(|p| !p.is_empty()) {
            summary.packages.push(package.clone());
        }
    }

    for summary in &mut summaries {
        summary.years.sort_unstable_by(|a, b| b.cmp(a));
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Question;
    use crate::experience::fixtures::experience;
    use serde_json::json;

    fn with_questions(mut exp: Experience, questions: &[&str]) -> Experience {
        exp.rounds[0].questions = questions
            .iter()
            .map(|q| Question::Plain(q.to_string()))
            .collect();
        exp
    }

    #[test]
    fn package_statistics_match_known_values() {
        let experiences: Vec<Experience> = ["35 LPA", "28 LPA", "32 LPA", "26 LPA", "40 LPA"]
            .iter()
            .enumerate()
            .map(|(i, p)| experience(&format!("Company {}", i), "SDE", 2024, Some(p)))
            .collect();

        let insights = compute(&experiences);
        assert_eq!(insights.overview.avg_package, "32.20");
        assert_eq!(insights.overview.max_package, 40.0);
        assert_eq!(insights.overview.min_package, 26.0);

        let json = serde_json::to_value(&insights.overview).unwrap();
        assert_eq!(json["maxPackage"], json!(40));
        assert_eq!(json["minPackage"], json!(26));
        assert_eq!(json["avgPackage"], json!("32.20"));
    }

    #[test]
    fn unparsable_and_missing_packages_are_excluded() {
        let experiences = vec![
            experience("A", "SDE", 2024, Some("12 LPA")),
            experience("B", "SDE", 2024, Some("Not disclosed")),
            experience("C", "SDE", 2024, None),
        ];
        let insights = compute(&experiences);
        assert_eq!(insights.overview.total_experiences, 3);
        assert_eq!(insights.overview.avg_package, "12.00");
        assert_eq!(insights.package_trends.len(), 1);
    }

    #[test]
    fn empty_snapshot_yields_zeroes() {
        let insights = compute(&[]);
        assert_eq!(insights.overview.avg_package, "0.00");
        assert_eq!(insights.overview.max_package, 0.0);
        assert_eq!(insights.overview.min_package, 0.0);
        assert!(insights.frequent_questions.is_empty());
        assert!(insights.package_trends.is_empty());
    }

    #[test]
    fn frequent_questions_are_case_folded_and_capped() {
        let mut experiences = vec![
            with_questions(
                experience("A", "SDE", 2024, None),
                &["Reverse a list", "Two Sum"],
            ),
            with_questions(experience("B", "SDE", 2024, None), &["two sum"]),
        ];
        for i in 0..12 {
            experiences.push(with_questions(
                experience("C", "SDE", 2024, None),
                &[&format!("Unique question {}", i)],
            ));
        }

        let insights = compute(&experiences);
        assert_eq!(insights.frequent_questions.len(), 10);
        assert_eq!(
            insights.frequent_questions[0],
            QuestionFrequency {
                question: "two sum".into(),
                count: 2
            }
        );
        // Ties keep first-seen order
        assert_eq!(insights.frequent_questions[1].question, "reverse a list");
        assert_eq!(
            insights.frequent_questions[2].question,
            "unique question 0"
        );
        assert!(insights
            .frequent_questions
            .windows(2)
            .all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn distributions_and_trends() {
        let experiences = vec![
            experience("Google", "SDE", 2024, Some("30 LPA")),
            experience("Google", "Analyst", 2023, Some("12 LPA")),
            experience("Amazon", "SDE", 2024, Some("45 LPA")),
        ];
        let insights = compute(&experiences);

        assert_eq!(insights.overview.unique_companies, 2);
        assert_eq!(insights.overview.unique_roles, 2);
        assert_eq!(insights.company_distribution["Google"], 2);
        assert_eq!(insights.year_distribution["2024"], 2);
        assert_eq!(insights.role_distribution["SDE"], 2);

        let values: Vec<f64> = insights.package_trends.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![45.0, 30.0, 12.0]);
        assert_eq!(insights.package_trends[0].company, "Amazon");
    }

    #[test]
    fn order_of_input_does_not_change_statistics() {
        let mut experiences = vec![
            experience("Google", "SDE", 2024, Some("30 LPA")),
            experience("Amazon", "SDE", 2023, Some("45 LPA")),
        ];
        let forward = compute(&experiences);
        experiences.reverse();
        let backward = compute(&experiences);
        assert_eq!(forward.overview, backward.overview);
        assert_eq!(forward.company_distribution, backward.company_distribution);
    }

    #[test]
    fn company_rollup_groups_in_first_seen_order() {
        let experiences = vec![
            experience("Google", "SDE", 2023, Some("30 LPA")),
            experience("Amazon", "SDE", 2024, None),
            experience("Google", "Analyst", 2024, Some("12 LPA")),
            experience("Google", "SDE", 2024, None),
        ];
        let rollup = company_rollup(&experiences);

        assert_eq!(rollup.len(), 2);
        let google = &rollup[0];
        assert_eq!(google.name, "Google");
        assert_eq!(google.total_experiences, 3);
        assert_eq!(google.roles, vec!["SDE", "Analyst"]);
        assert_eq!(google.years, vec![2024, 2023]);
        assert_eq!(google.packages, vec!["30 LPA", "12 LPA"]);
        assert_eq!(rollup[1].name, "Amazon");
    }
}
