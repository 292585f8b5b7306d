//! Candidate routes for endpoints whose exact shape varies between
//! backend configurations. Each chain is ordered data: the client tries
//! the entries in sequence, moving on only on a 404, and propagates the
//! last failure if none succeeds.

/// SimpleJWT default first, then the Djoser-style path.
pub const LOGIN_CANDIDATES: &[&str] = &["token/", "auth/jwt/create/"];

pub const REFRESH_CANDIDATES: &[&str] = &["token/refresh/", "auth/jwt/refresh/"];

pub const REGISTER_PATH: &str = "register/";

/// Probed in order until one yields a usable identifier. Unlike the other
/// chains, the probe swallows every failure, not just 404s.
pub const WHOAMI_CANDIDATES: &[&str] =
    &["me/", "auth/users/me/", "users/me/", "profile/", "whoami/"];

pub fn stories() -> String {
    "stories/".to_string()
}

pub fn my_stories() -> String {
    "stories/mine/".to_string()
}

pub fn story(id: i64) -> String {
    format!("stories/{}/", id)
}

pub fn tags() -> String {
    "tags/".to_string()
}

/// Nested chapter route first, flat route second.
pub fn chapter_list(story_id: i64) -> [String; 2] {
    [
        format!("stories/{}/chapters/", story_id),
        format!("chapters/?story={}", story_id),
    ]
}

pub fn chapter(story_id: i64, chapter_id: i64) -> [String; 2] {
    [
        format!("stories/{}/chapters/{}/", story_id, chapter_id),
        format!("chapters/{}/", chapter_id),
    ]
}

pub fn chapter_create(story_id: i64) -> [String; 2] {
    [
        format!("stories/{}/chapters/", story_id),
        "chapters/".to_string(),
    ]
}

pub fn comment_list(story_id: i64, chapter_id: i64) -> [String; 2] {
    [
        format!("stories/{}/chapters/{}/comments/", story_id, chapter_id),
        format!("comments/?chapter={}", chapter_id),
    ]
}

pub fn comment_create(story_id: i64, chapter_id: i64) -> [String; 2] {
    [
        format!("stories/{}/chapters/{}/comments/", story_id, chapter_id),
        "comments/".to_string(),
    ]
}
