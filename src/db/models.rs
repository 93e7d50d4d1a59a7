use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Implements string conversions and SQLite TEXT mapping for a fieldless enum.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Invalid {} value: {}", stringify!($name), other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Alumni,
    Admin,
}

text_enum!(Role {
    Student => "student",
    Alumni => "alumni",
    Admin => "admin",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OfferStatus {
    Selected,
    #[serde(rename = "Not Selected")]
    NotSelected,
    #[default]
    Pending,
}

text_enum!(OfferStatus {
    Selected => "Selected",
    NotSelected => "Not Selected",
    Pending => "Pending",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

text_enum!(ModerationStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    InappropriateContent,
    FalseInformation,
    Duplicate,
    Other,
}

text_enum!(ReportReason {
    Spam => "spam",
    InappropriateContent => "inappropriate_content",
    FalseInformation => "false_information",
    Duplicate => "duplicate",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Resolved,
    Dismissed,
}

text_enum!(ReportStatus {
    Pending => "pending",
    Resolved => "resolved",
    Dismissed => "dismissed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    #[default]
    General,
    Placement,
    Important,
}

text_enum!(AnnouncementKind {
    General => "general",
    Placement => "placement",
    Important => "important",
});

/// Declaration order is the sort order: `Urgent` ranks highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

text_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

/// Difficulty classification stored alongside a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Level {
    Easy,
    Medium,
    Hard,
    #[default]
    Unrated,
}

text_enum!(Level {
    Easy => "Easy",
    Medium => "Medium",
    Hard => "Hard",
    Unrated => "Unrated",
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub bio: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub branch: Option<String>,
    pub graduation_year: Option<i32>,
    pub current_company: Option<String>,
    pub profile: Profile,
    pub is_alumni: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Public view of a user embedded in experiences and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: String,
    pub name: String,
    pub username: String,
    pub role: Role,
    pub branch: Option<String>,
}

/// A single interview question. Stored either as bare text or with a difficulty level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Question {
    Plain(String),
    Leveled { text: String, level: Level },
}

impl Question {
    pub fn text(&self) -> &str {
        match self {
            Question::Plain(text) => text,
            Question::Leveled { text, .. } => text,
        }
    }

    pub fn level(&self) -> Level {
        match self {
            Question::Plain(_) => Level::Unrated,
            Question::Leveled { level, .. } => *level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    #[serde(default)]
    pub round_number: u32,
    #[serde(default)]
    pub round_name: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: String,
    pub company: String,
    pub role: String,
    pub branch: String,
    pub year: i32,
    pub package: Option<String>,
    pub tips: String,
    pub interview_date: NaiveDate,
    pub offer_status: OfferStatus,
    pub moderation_status: ModerationStatus,
    pub moderation_notes: Option<String>,
    pub moderated_by: Option<String>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub views: i64,
    pub author: Option<AuthorSummary>,
    pub author_name: String,
    pub rounds: Vec<Round>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Experience {
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author.as_ref().is_some_and(|a| a.id == user_id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub experience_id: String,
    pub author: AuthorSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Minimal experience details shown next to a report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedExperience {
    pub id: String,
    pub company: String,
    pub role: String,
    pub offer_status: OfferStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub experience: ReportedExperience,
    pub reporter_id: Option<String>,
    pub reason: ReportReason,
    pub description: String,
    pub status: ReportStatus,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,
    pub priority: Priority,
    pub published_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    /// Active and not yet expired at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyStandardization {
    pub id: String,
    pub standard_name: String,
    pub variations: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn text_enums_round_trip_through_strings() {
        for status in ModerationStatus::ALL {
            assert_eq!(status.as_str().parse::<ModerationStatus>().unwrap(), *status);
        }
        assert_eq!(
            "Not Selected".parse::<OfferStatus>().unwrap(),
            OfferStatus::NotSelected
        );
        assert!("maybe".parse::<OfferStatus>().is_err());
    }

    #[test]
    fn serde_names_match_sql_names() {
        for reason in ReportReason::ALL {
            let json = serde_json::to_value(reason).unwrap();
            assert_eq!(json, reason.as_str());
        }
        let json = serde_json::to_value(OfferStatus::NotSelected).unwrap();
        assert_eq!(json, "Not Selected");
    }

    #[test]
    fn priority_orders_urgent_highest() {
        let mut all = Priority::ALL.to_vec();
        all.sort();
        assert_eq!(all.last(), Some(&Priority::Urgent));
        assert_eq!(all.first(), Some(&Priority::Low));
    }

    #[test]
    fn question_accepts_plain_and_leveled_forms() {
        let round: Round = serde_json::from_str(
            r#"{"roundNumber":1,"roundName":"OA","questions":["Two sum",{"text":"LRU cache","level":"Hard"}],"feedback":""}"#,
        )
        .unwrap();
        assert_eq!(round.questions[0].text(), "Two sum");
        assert_eq!(round.questions[0].level(), Level::Unrated);
        assert_eq!(round.questions[1].text(), "LRU cache");
        assert_eq!(round.questions[1].level(), Level::Hard);
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let now = Utc::now();
        let user = User {
            id: "u1".into(),
            name: "Alice".into(),
            username: "alice".into(),
            email: "alice@marwadiuniversity.ac.in".into(),
            password_hash: "$2b$10$secret".into(),
            role: Role::Student,
            branch: None,
            graduation_year: None,
            current_company: None,
            profile: Profile::default(),
            is_alumni: false,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("passwordHash"));
    }

    #[test]
    fn announcement_liveness_respects_expiry() {
        let now = Utc::now();
        let mut announcement = Announcement {
            id: "a1".into(),
            title: "Drive".into(),
            content: "Campus drive".into(),
            kind: AnnouncementKind::Placement,
            priority: Priority::High,
            published_at: now,
            expires_at: Some(now + Duration::days(1)),
            is_active: true,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        assert!(announcement.is_live(now));

        announcement.expires_at = Some(now - Duration::minutes(1));
        assert!(!announcement.is_live(now));

        announcement.expires_at = None;
        announcement.is_active = false;
        assert!(!announcement.is_live(now));
    }
}
