use std::fmt;

use crate::Error;

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CourseId(pub String);

impl CourseId {
    pub fn new(id: &str) -> CourseId {
        CourseId(String::from(id))
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "course {}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,

    /// Sorted by name
    pub professors: Vec<String>,

    /// Number of users currently following this course
    pub follower_count: i64,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewCourse {
    pub id: CourseId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub professors: Vec<String>,
}

impl NewCourse {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_name(&self.id.0)?;
        crate::validate_text("name", &self.name)?;
        crate::validate_text("code", &self.code)?;
        if let Some(d) = &self.description {
            crate::validate_string(d)?;
        }
        for p in &self.professors {
            crate::validate_text("professors", p)?;
        }
        Ok(())
    }
}
