//! The story record served to readers.
//!
//! A [`Story`] never changes after construction. Its JSON form is rendered on
//! first use and memoized on the instance, so a story that stays in the
//! ranking across many cycles and queries is serialized exactly once.

use chrono::{DateTime, Utc};
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

/// Upstream identifier of a story.
pub type StoryId = u64;

#[derive(Debug)]
pub struct Story {
    id: StoryId,
    title: Option<String>,
    url: Option<String>,
    by: Option<String>,
    /// Unix seconds.
    time: i64,
    score: i32,
    descendants: i32,
    json: OnceLock<String>,
}

impl Story {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: StoryId,
        title: Option<String>,
        url: Option<String>,
        by: Option<String>,
        time: i64,
        score: i32,
        descendants: i32,
    ) -> Self {
        Self {
            id,
            title,
            url,
            by,
            time,
            score,
            descendants,
            json: OnceLock::new(),
        }
    }

    pub fn id(&self) -> StoryId {
        self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn posted_by(&self) -> Option<&str> {
        self.by.as_deref()
    }

    pub fn time(&self) -> i64 {
        self.time
    }

    /// Posting time as a UTC timestamp. Out-of-range values clamp to the epoch.
    pub fn posted_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.time, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn comment_count(&self) -> i32 {
        self.descendants
    }

    /// The memoized wire form of this story.
    pub fn to_json(&self) -> &str {
        self.json.get_or_init(|| {
            // Only strings and integers are written, so this cannot fail.
            serde_json::to_string(self).unwrap_or_else(|_| String::from("null"))
        })
    }
}

impl Clone for Story {
    fn clone(&self) -> Self {
        Self::new(
            self.id,
            self.title.clone(),
            self.url.clone(),
            self.by.clone(),
            self.time,
            self.score,
            self.descendants,
        )
    }
}

impl PartialEq for Story {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.url == other.url
            && self.by == other.by
            && self.time == other.time
            && self.score == other.score
            && self.descendants == other.descendants
    }
}

impl Eq for Story {}

impl Serialize for Story {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Story", 6)?;
        s.serialize_field("Title", &self.title)?;
        s.serialize_field("Uri", &self.url)?;
        s.serialize_field("PostedBy", &self.by)?;
        s.serialize_field("Time", &self.time)?;
        s.serialize_field("Score", &self.score)?;
        s.serialize_field("CommentCount", &self.descendants)?;
        s.end()
    }
}

/// Accepts both the upstream item shape (`by`, `url`, `descendants`, ...) and
/// our own wire shape (`PostedBy`, `Uri`, `CommentCount`), matching field
/// names case-insensitively. Unknown fields are skipped and absent or `null`
/// fields take their default.
impl<'de> Deserialize<'de> for Story {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(StoryVisitor)
    }
}

struct StoryVisitor;

impl<'de> Visitor<'de> for StoryVisitor {
    type Value = Story;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a story object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Story, A::Error> {
        let mut id: Option<StoryId> = None;
        let mut title: Option<String> = None;
        let mut url: Option<String> = None;
        let mut by: Option<String> = None;
        let mut time: Option<i64> = None;
        let mut score: Option<i32> = None;
        let mut descendants: Option<i32> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.to_ascii_lowercase().as_str() {
                "id" => id = map.next_value()?,
                "title" => title = map.next_value()?,
                "url" | "uri" => url = map.next_value()?,
                "by" | "postedby" => by = map.next_value()?,
                "time" => time = map.next_value()?,
                "score" => score = map.next_value()?,
                "descendants" | "commentcount" => descendants = map.next_value()?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(Story::new(
            id.unwrap_or_default(),
            title,
            url,
            by,
            time.unwrap_or_default(),
            score.unwrap_or_default(),
            descendants.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_wire_order() {
        let story = Story::new(
            1,
            Some("Test1".into()),
            Some("https://test/url.html".into()),
            Some("Tester".into()),
            DateTime::<Utc>::UNIX_EPOCH.timestamp(),
            7,
            255,
        );
        assert_eq!(
            story.to_json(),
            r#"{"Title":"Test1","Uri":"https://test/url.html","PostedBy":"Tester","Time":0,"Score":7,"CommentCount":255}"#
        );
    }

    #[test]
    fn json_is_memoized() {
        let story = Story::new(3, Some("memo".into()), None, None, 5, 1, 0);
        let first = story.to_json() as *const str;
        let second = story.to_json() as *const str;
        assert_eq!(first, second);
    }

    #[test]
    fn missing_strings_serialize_as_null() {
        let story = Story::new(9, None, None, None, 42, -1, 0);
        assert_eq!(
            story.to_json(),
            r#"{"Title":null,"Uri":null,"PostedBy":null,"Time":42,"Score":-1,"CommentCount":0}"#
        );
    }

    #[test]
    fn deserializes_upstream_item() {
        let json = r#"{"by":"Tester","descendants":123,"id":777,"kids":[1,2,3,4],"score":321,"time":10,"title":"Test2","type":"story","url":"https:/test/url.php"}"#;
        let story: Story = serde_json::from_str(json).unwrap();

        assert_eq!(story.id(), 777);
        assert_eq!(story.title(), Some("Test2"));
        assert_eq!(story.url(), Some("https:/test/url.php"));
        assert_eq!(story.posted_by(), Some("Tester"));
        assert_eq!(story.time(), DateTime::<Utc>::UNIX_EPOCH.timestamp() + 10);
        assert_eq!(story.posted_at(), DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(10));
        assert_eq!(story.score(), 321);
        assert_eq!(story.comment_count(), 123);
    }

    #[test]
    fn field_names_are_case_insensitive() {
        let json = r#"{"BY":"Tester","Descendants":5,"ID":1,"Score":2,"TIME":3,"Title":"t","URL":"u"}"#;
        let story: Story = serde_json::from_str(json).unwrap();
        assert_eq!(story.posted_by(), Some("Tester"));
        assert_eq!(story.comment_count(), 5);
        assert_eq!(story.id(), 1);
        assert_eq!(story.url(), Some("u"));
    }

    #[test]
    fn reads_back_own_wire_shape() {
        let original = Story::new(0, Some("a".into()), Some("b".into()), Some("c".into()), 4, 5, 6);
        let parsed: Story = serde_json::from_str(original.to_json()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn absent_and_null_fields_default() {
        let story: Story = serde_json::from_str(r#"{"id":5,"title":null,"type":"job"}"#).unwrap();
        assert_eq!(story.id(), 5);
        assert_eq!(story.title(), None);
        assert_eq!(story.score(), 0);
        assert_eq!(story.comment_count(), 0);
    }

    #[test]
    fn null_document_is_rejected() {
        assert!(serde_json::from_str::<Story>("null").is_err());
    }
}
