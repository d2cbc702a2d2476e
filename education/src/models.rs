use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub position: i32,
    #[serde(default)]
    pub content: Option<String>,
}

/// Partial course update; unset fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl CourseUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonFilter {
    pub course_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_course_optional_fields_default() {
        let course: Course = serde_json::from_value(json!({"id": 1, "title": "Cumbia 101"})).unwrap();
        assert_eq!(course.description, None);
        assert!(!course.published);
    }

    #[test]
    fn test_course_without_title_is_rejected() {
        assert!(serde_json::from_value::<Course>(json!({"id": 1})).is_err());
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = CourseUpdate {
            title: Some("Cumbia 102".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"title": "Cumbia 102"}));
        assert!(!update.is_empty());
        assert!(CourseUpdate::default().is_empty());
    }
}
