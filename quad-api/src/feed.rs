use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet},
};

use bolero::generator::TypeGenerator;

use crate::{CourseId, Error, Post, PostId};

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Highest score first
    #[default]
    Score,

    /// Most recent first
    New,
}

impl SortBy {
    /// Ties are broken by creation date then id, so the order is total
    pub fn sort(&self, posts: &mut [Post]) {
        match self {
            SortBy::Score => {
                posts.sort_unstable_by_key(|p| (Reverse(p.score), Reverse(p.created_at), p.id))
            }
            SortBy::New => posts.sort_unstable_by_key(|p| (Reverse(p.created_at), p.id)),
        }
    }
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub sort_by: SortBy,
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct ListQuery {
    pub course_id: Option<CourseId>,
    #[serde(default)]
    pub sort_by: SortBy,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(c) = &self.course_id {
            crate::validate_name(&c.0)?;
        }
        Ok(())
    }

    pub fn matches(&self, p: &Post) -> bool {
        match &self.course_id {
            None => true,
            Some(c) => p.course_id.as_ref() == Some(c),
        }
    }

    pub fn apply<'a>(&self, posts: impl IntoIterator<Item = &'a Post>) -> Vec<Post> {
        let mut res = posts
            .into_iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect::<Vec<_>>();
        self.sort_by.sort(&mut res);
        res.truncate(crate::clamp_limit(self.limit));
        res
    }
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct OwnPostsQuery {
    pub limit: Option<u32>,
}

/// Everything a user follows, as read from the follow registry
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Follows {
    pub courses: BTreeSet<CourseId>,
    pub tags: BTreeSet<String>,
    pub professors: BTreeMap<CourseId, String>,
}

impl Follows {
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty() && self.tags.is_empty()
    }

    /// Posts of a followed course, unless they were given by another professor
    /// than the preferred one. Posts without a professor always pass.
    pub fn admits_via_course(&self, p: &Post) -> bool {
        let course = match &p.course_id {
            Some(c) if self.courses.contains(c) => c,
            _ => return false,
        };
        match (self.professors.get(course), &p.professor) {
            (Some(preferred), Some(prof)) => preferred == prof,
            _ => true,
        }
    }

    /// General posts carrying a followed tag, once they are popular enough
    pub fn admits_via_tag(&self, p: &Post, tag_score_floor: i64) -> bool {
        p.course_id.is_none() && p.score >= tag_score_floor && p.has_any_tag(&self.tags)
    }

    pub fn admits(&self, p: &Post, tag_score_floor: i64) -> bool {
        self.admits_via_course(p) || self.admits_via_tag(p, tag_score_floor)
    }

    /// Assembles a feed out of the given (non-deleted) posts
    pub fn compose<'a>(
        &self,
        posts: impl IntoIterator<Item = &'a Post>,
        q: &FeedQuery,
        tag_score_floor: i64,
    ) -> Vec<Post> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut res = posts
            .into_iter()
            .filter(|p| self.admits(p, tag_score_floor))
            .map(|p| (p.id, p))
            .collect::<BTreeMap<PostId, &Post>>()
            .into_values()
            .cloned()
            .collect::<Vec<_>>();
        q.sort_by.sort(&mut res);
        res.truncate(crate::clamp_limit(q.limit));
        res
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::{Time, Uuid, UserId};

    fn date(minutes: i64) -> Time {
        Utc.with_ymd_and_hms(2024, 9, 3, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn post(n: u8, course: Option<&str>, prof: Option<&str>, tags: &[&str], score: i64) -> Post {
        Post {
            id: PostId(Uuid::from_bytes([n; 16])),
            author_id: UserId::stub(),
            title: format!("post {n}"),
            content: String::from("..."),
            course_id: course.map(CourseId::new),
            professor: prof.map(String::from),
            tags: tags.iter().map(|t| String::from(*t)).collect(),
            score,
            created_at: date(n as i64),
        }
    }

    fn follows(courses: &[&str], tags: &[&str]) -> Follows {
        Follows {
            courses: courses.iter().map(|c| CourseId::new(c)).collect(),
            tags: tags.iter().map(|t| String::from(*t)).collect(),
            professors: BTreeMap::new(),
        }
    }

    fn ids(posts: &[Post]) -> Vec<PostId> {
        posts.iter().map(|p| p.id).collect()
    }

    #[test]
    fn following_nothing_gives_nothing() {
        let posts = vec![post(1, Some("cmpt120"), None, &["finals"], 50)];
        let f = Follows::default();
        assert!(f.compose(&posts, &FeedQuery::default(), 10).is_empty());
    }

    #[test]
    fn professor_preference_filters_course_posts() {
        let fraser = post(1, Some("cmpt120"), Some("Fraser"), &[], 5);
        let vincent = post(2, Some("cmpt120"), Some("Vincent"), &[], 3);
        let nobody = post(3, Some("cmpt120"), None, &[], 1);
        let posts = vec![fraser.clone(), vincent.clone(), nobody.clone()];

        let mut f = follows(&["cmpt120"], &[]);
        let q = FeedQuery::default();
        assert_eq!(
            ids(&f.compose(&posts, &q, 10)),
            vec![fraser.id, vincent.id, nobody.id]
        );

        f.professors
            .insert(CourseId::new("cmpt120"), String::from("Vincent"));
        assert_eq!(ids(&f.compose(&posts, &q, 10)), vec![vincent.id, nobody.id]);
    }

    #[test]
    fn preference_on_another_course_does_not_filter() {
        let fraser = post(1, Some("cmpt120"), Some("Fraser"), &[], 5);
        let mut f = follows(&["cmpt120"], &[]);
        f.professors
            .insert(CourseId::new("math152"), String::from("Mulholland"));
        assert!(f.admits_via_course(&fraser));
    }

    #[test]
    fn tag_posts_need_the_floor_and_no_course() {
        let below = post(1, None, None, &["campus"], 9);
        let at = post(2, None, None, &["campus", "food"], 10);
        let in_course = post(3, Some("math152"), None, &["campus"], 40);
        let untagged = post(4, None, None, &["parking"], 40);
        let posts = vec![below.clone(), at.clone(), in_course, untagged];

        let f = follows(&[], &["campus"]);
        assert_eq!(ids(&f.compose(&posts, &FeedQuery::default(), 10)), vec![at.id]);

        let mut raised = below.clone();
        raised.score = 10;
        assert!(f.admits(&raised, 10));
    }

    #[test]
    fn sorts_and_truncates() {
        let a = post(1, Some("cmpt120"), None, &[], 4);
        let b = post(2, None, None, &["campus"], 12);
        let c = post(3, Some("cmpt120"), None, &[], 4);
        let posts = vec![a.clone(), b.clone(), c.clone()];
        let f = follows(&["cmpt120"], &["campus"]);

        let by_score = FeedQuery {
            sort_by: SortBy::Score,
            limit: None,
        };
        // equal scores fall back to the most recent first
        assert_eq!(ids(&f.compose(&posts, &by_score, 10)), vec![b.id, c.id, a.id]);

        let newest_two = FeedQuery {
            sort_by: SortBy::New,
            limit: Some(2),
        };
        assert_eq!(ids(&f.compose(&posts, &newest_two, 10)), vec![c.id, b.id]);
    }

    #[test]
    fn duplicated_input_appears_once() {
        let a = post(1, Some("cmpt120"), None, &["campus"], 20);
        let posts = vec![a.clone(), a.clone()];
        let f = follows(&["cmpt120"], &["campus"]);
        assert_eq!(ids(&f.compose(&posts, &FeedQuery::default(), 10)), vec![a.id]);
    }

    #[test]
    fn listing_filters_by_course_only() {
        let a = post(1, Some("cmpt120"), Some("Fraser"), &[], 1);
        let b = post(2, None, None, &["campus"], 30);
        let posts = vec![a.clone(), b.clone()];
        let all = ListQuery::default();
        assert_eq!(ids(&all.apply(&posts)), vec![b.id, a.id]);
        let course = ListQuery {
            course_id: Some(CourseId::new("cmpt120")),
            ..ListQuery::default()
        };
        assert_eq!(ids(&course.apply(&posts)), vec![a.id]);
    }

    #[test]
    fn listing_rejects_bad_course_ids() {
        assert!(ListQuery::default().validate().is_ok());
        let q = ListQuery {
            course_id: Some(CourseId::new("\0")),
            ..ListQuery::default()
        };
        assert_eq!(
            q.validate(),
            Err(Error::NullByteInString(String::from("\0")))
        );
    }

    #[test]
    fn sort_modes_parse_from_query_strings() {
        let q: ListQuery = serde_json::from_str(r#"{"sort_by":"new","limit":5}"#).unwrap();
        assert_eq!((q.sort_by, q.limit), (SortBy::New, Some(5)));
        let q: FeedQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.sort_by, SortBy::Score);
    }
}
