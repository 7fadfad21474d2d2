use bolero::generator::TypeGenerator;

use crate::{CourseId, Error};

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FollowAction {
    Follow,
    Unfollow,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct FollowCourse {
    pub course_id: CourseId,
    pub action: FollowAction,
}

impl FollowCourse {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_name(&self.course_id.0)
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct FollowTag {
    pub tag_name: String,
    pub action: FollowAction,
}

impl FollowTag {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_name(&self.tag_name)
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct ProfessorPreference {
    pub course_id: CourseId,
    pub professor_name: String,
}

impl ProfessorPreference {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_name(&self.course_id.0)?;
        crate::validate_text("professor_name", &self.professor_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_ids_are_names() {
        let follow = |id: &str| FollowCourse {
            course_id: CourseId::new(id),
            action: FollowAction::Unfollow,
        };
        assert!(follow("cmpt120").validate().is_ok());
        assert_eq!(
            follow("x\0").validate(),
            Err(Error::NullByteInString(String::from("x\0")))
        );

        let pref = ProfessorPreference {
            course_id: CourseId::new("cmpt 120"),
            professor_name: String::from("Dr. Brian Fraser"),
        };
        assert_eq!(
            pref.validate(),
            Err(Error::InvalidName(String::from("cmpt 120")))
        );
    }
}
