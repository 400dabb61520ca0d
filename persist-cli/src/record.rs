use persist::{FieldDescriptor, persist_fields};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The record this tool persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i32,
    pub score: f64,
    pub name: Option<String>,
    pub active: bool,
    pub scores: Option<Vec<i32>>,
    #[serde(skip)]
    pub score_count: u32,
    pub tags: Option<Vec<Option<String>>>,
    #[serde(skip)]
    pub tag_count: u32,
}

pub static USER_FIELDS: &[FieldDescriptor<User>] = persist_fields!(User {
    id: i32,
    score: f64,
    name: str,
    active: bool,
    scores: [i32; score_count],
    tags: [str; tag_count],
});

impl User {
    /// Derive the element counts from the arrays, as JSON input carries none.
    pub fn with_counts(mut self) -> Self {
        self.score_count = self.scores.as_ref().map_or(0, |scores| scores.len() as u32);
        self.tag_count = self.tags.as_ref().map_or(0, |tags| tags.len() as u32);
        self
    }

    pub fn sample() -> Self {
        Self {
            id: 42,
            score: 99.7,
            name: Some("Hans".to_string()),
            active: true,
            scores: None,
            score_count: 0,
            tags: None,
            tag_count: 0,
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  id: {}", self.id)?;
        writeln!(f, "  score: {:.2}", self.score)?;
        writeln!(f, "  name: {}", self.name.as_deref().unwrap_or("<none>"))?;
        writeln!(f, "  active: {}", self.active)?;
        if let Some(scores) = &self.scores {
            writeln!(f, "  scores: {scores:?}")?;
        }
        if let Some(tags) = &self.tags {
            let tags: Vec<&str> = tags.iter().map(|tag| tag.as_deref().unwrap_or("")).collect();
            writeln!(f, "  tags: {tags:?}")?;
        }
        Ok(())
    }
}

/// JSON input: a single user or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserInput {
    One(User),
    Many(Vec<User>),
}

impl UserInput {
    pub fn into_users(self) -> Vec<User> {
        let users = match self {
            UserInput::One(user) => vec![user],
            UserInput::Many(users) => users,
        };
        users.into_iter().map(User::with_counts).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_input_sets_counts() {
        let input: UserInput = serde_json::from_str(
            r#"{"id": 7, "name": "Ada", "scores": [1, 2, 3], "tags": ["x", null]}"#,
        )
        .unwrap();
        let users = input.into_users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].score_count, 3);
        assert_eq!(users[0].tag_count, 2);
        assert!(!users[0].active);
    }

    #[test]
    fn test_json_list_input() {
        let input: UserInput = serde_json::from_str(r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        let ids: Vec<i32> = input.into_users().iter().map(|user| user.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_sample_round_trip() {
        let frame = persist::serialize(&User::sample(), USER_FIELDS).unwrap();
        let user: User = persist::from_bytes(&frame, USER_FIELDS).unwrap();
        assert_eq!(user, User::sample());
    }

    #[test]
    fn test_display() {
        let shown = User::sample().to_string();
        assert!(shown.contains("  score: 99.70\n"));
        assert!(shown.contains("  name: Hans\n"));
        assert!(!shown.contains("scores"));
    }
}
