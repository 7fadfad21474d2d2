use quad_api::{ListQuery, SortBy, UserId, Uuid};
use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};

pub enum Bind {
    Int(i64),
    Uuid(Uuid),
    String(String),
}

#[derive(Default)]
pub struct Sql {
    pub where_clause: String,
    pub binds: Vec<Bind>,
}

impl Sql {
    /// Adds a Bind, returning the index that should be used to refer to it
    fn add_bind(&mut self, b: Bind) -> usize {
        self.binds.push(b);
        self.binds.len()
    }

    pub fn bind_to<'q, O>(
        self,
        mut query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        for b in self.binds {
            query = match b {
                Bind::Int(i) => query.bind(i),
                Bind::Uuid(u) => query.bind(u),
                Bind::String(s) => query.bind(s),
            };
        }
        query
    }
}

/// Assumes posts are available as `p`
pub fn order_by(sort: SortBy) -> &'static str {
    match sort {
        SortBy::Score => "p.score DESC, p.created_at DESC, p.id ASC",
        SortBy::New => "p.created_at DESC, p.id ASC",
    }
}

/// Assumes posts are available as `p`
pub fn listing(q: &ListQuery) -> Sql {
    let mut res = Sql {
        where_clause: String::from("NOT p.deleted"),
        binds: Vec::new(),
    };
    if let Some(course) = &q.course_id {
        let idx = res.add_bind(Bind::String(course.0.clone()));
        res.where_clause.push_str(&format!(" AND p.course_id = ${idx}"));
    }
    res
}

/// Assumes posts are available as `p`
pub fn own_posts(user: UserId) -> Sql {
    let mut res = Sql::default();
    let idx = res.add_bind(Bind::Uuid(user.0));
    res.where_clause = format!("NOT p.deleted AND p.author_id = ${idx}");
    res
}

/// Posts of followed courses that pass the professor preference, plus
/// popular enough general posts carrying a followed tag.
///
/// Assumes posts are available as `p`
pub fn feed(user: UserId, tag_score_floor: i64) -> Sql {
    let mut res = Sql::default();
    let user = res.add_bind(Bind::Uuid(user.0));
    let floor = res.add_bind(Bind::Int(tag_score_floor));
    res.where_clause = format!(
        "
            NOT p.deleted
            AND (
                (
                    p.course_id IN (
                        SELECT cf.course_id FROM course_follows cf WHERE cf.user_id = ${user}
                    )
                    AND (
                        p.professor IS NULL
                        OR NOT EXISTS (
                            SELECT 1 FROM professor_preferences pp
                            WHERE pp.user_id = ${user}
                            AND pp.course_id = p.course_id
                            AND pp.professor_name <> p.professor
                        )
                    )
                )
                OR (
                    p.course_id IS NULL
                    AND p.score >= ${floor}
                    AND EXISTS (
                        SELECT 1 FROM post_tags pt
                        INNER JOIN tag_follows tf
                            ON tf.tag_name = pt.tag_name
                        WHERE pt.post_id = p.id
                        AND tf.user_id = ${user}
                    )
                )
            )
        "
    );
    res
}

#[cfg(test)]
mod tests {
    use quad_api::CourseId;

    use super::*;

    #[test]
    fn listing_binds_only_the_course() {
        let all = listing(&ListQuery::default());
        assert_eq!(all.where_clause, "NOT p.deleted");
        assert!(all.binds.is_empty());

        let one = listing(&ListQuery {
            course_id: Some(CourseId::new("cmpt120")),
            ..ListQuery::default()
        });
        assert_eq!(one.where_clause, "NOT p.deleted AND p.course_id = $1");
        assert!(matches!(&one.binds[..], [Bind::String(c)] if c == "cmpt120"));
    }

    #[test]
    fn feed_reuses_the_user_bind() {
        let q = feed(UserId::stub(), 10);
        assert!(matches!(&q.binds[..], [Bind::Uuid(_), Bind::Int(10)]));
        assert_eq!(q.where_clause.matches("$1").count(), 3);
        assert_eq!(q.where_clause.matches("$2").count(), 1);
        assert!(!q.where_clause.contains("$3"));
    }

    #[test]
    fn ties_always_end_on_the_id() {
        for sort in [SortBy::Score, SortBy::New] {
            assert!(order_by(sort).ends_with("p.id ASC"));
        }
    }
}
