use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Story {
    pub id: i64,
    #[serde(default)]
    pub author: Option<Value>,
    #[serde(default)]
    pub author_username: Option<String>,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_status() -> String {
    "ONGOING".to_string()
}

impl Story {
    /// Author display name; the backend serializes `author` either as a
    /// plain string or an object carrying `username`.
    pub fn author_name(&self) -> String {
        if let Some(v) = &self.author {
            match v {
                Value::String(s) => return s.clone(),
                Value::Object(obj) => {
                    if let Some(Value::String(s)) = obj.get("username") {
                        return s.clone();
                    }
                }
                _ => {}
            }
        }
        self.author_username
            .clone()
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chapter {
    pub id: i64,
    #[serde(default)]
    pub story: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_html: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub chapter: Option<i64>,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Comment {
    pub fn display_name(&self) -> &str {
        self.author_name
            .as_deref()
            .or(self.user.as_deref())
            .unwrap_or("Reader")
    }

    /// Local timestamp for the status line, empty when absent or unparsable.
    pub fn display_time(&self) -> String {
        self.created_at
            .as_deref()
            .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| {
                dt.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewStory {
    pub title: String,
    pub summary: String,
    pub status: String,
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewChapter {
    pub story: i64,
    pub title: String,
    pub content: String,
    pub position: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_name_handles_string_and_object_shapes() {
        let s: Story = serde_json::from_value(serde_json::json!({
            "id": 1, "title": "T", "author": "alice"
        }))
        .unwrap();
        assert_eq!(s.author_name(), "alice");

        let s: Story = serde_json::from_value(serde_json::json!({
            "id": 2, "title": "T", "author": {"username": "bob"}
        }))
        .unwrap();
        assert_eq!(s.author_name(), "bob");

        let s: Story = serde_json::from_value(serde_json::json!({
            "id": 3, "title": "T", "author_username": "carol"
        }))
        .unwrap();
        assert_eq!(s.author_name(), "carol");
    }

    #[test]
    fn comment_falls_back_to_reader() {
        let c: Comment = serde_json::from_value(serde_json::json!({
            "id": 1, "content": "hi"
        }))
        .unwrap();
        assert_eq!(c.display_name(), "Reader");
        assert_eq!(c.display_time(), "");
    }
}
