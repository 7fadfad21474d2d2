use std::collections::{btree_map, BTreeMap, BTreeSet, HashMap};

use chrono::Utc;
use quad_api::{
    AuthToken, Comment, CommentEdit, CommentId, Course, CourseId, Error, FeedQuery, FollowAction,
    FollowCourse, FollowTag, Follows, ListQuery, NewComment, NewCourse, NewPost, NewSession,
    NewUser, NewVote, OwnPostsQuery, Post, PostEdit, PostId, ProfessorPreference, SortBy,
    TargetType, User, UserId, Uuid, VoteChange, VoteDirection, VoteOutcome, VoteTarget,
};

/// In-memory implementation of the whole server API, used as the reference
/// the real server is compared against
pub struct MockServer {
    tag_score_floor: i64,
    users: BTreeMap<UserId, MockUser>,
    courses: BTreeMap<CourseId, MockCourse>,
    posts: BTreeMap<PostId, MockPost>,
    comments: BTreeMap<CommentId, MockComment>,
    votes: BTreeMap<(VoteTarget, UserId), VoteDirection>,
    follows: BTreeMap<UserId, Follows>,
}

#[derive(Debug)]
struct MockUser {
    name: String,
    pass: String,
    sessions: HashMap<AuthToken, Device>,
}

#[derive(Debug)]
struct Device(String);

#[derive(Debug)]
struct MockCourse {
    name: String,
    code: String,
    description: Option<String>,
    professors: BTreeSet<String>,
}

#[derive(Debug)]
struct MockPost {
    post: Post,
    deleted: bool,
}

#[derive(Debug)]
struct MockComment {
    comment: Comment,
    deleted: bool,
}

impl MockServer {
    pub fn new(tag_score_floor: i64) -> MockServer {
        MockServer {
            tag_score_floor,
            users: BTreeMap::new(),
            courses: BTreeMap::new(),
            posts: BTreeMap::new(),
            comments: BTreeMap::new(),
            votes: BTreeMap::new(),
            follows: BTreeMap::new(),
        }
    }

    /// Return name & pass for user number `id`
    pub fn test_get_user_info(&self, id: usize) -> (&str, &str) {
        let u = self
            .users
            .values()
            .nth(id)
            .unwrap_or_else(|| panic!("getting user {id} among {}", self.users.len()));
        (&u.name, &u.pass)
    }

    /// Return the current number of users
    pub fn test_num_users(&self) -> usize {
        self.users.len()
    }

    /// Ids of all the posts ever created, deleted ones included
    pub fn test_post_ids(&self) -> Vec<PostId> {
        self.posts.keys().copied().collect()
    }

    /// Ids of all the comments ever created, deleted ones included
    pub fn test_comment_ids(&self) -> Vec<CommentId> {
        self.comments.keys().copied().collect()
    }

    /// Sum of the ledger entries recorded for `target`
    pub fn test_ledger_sum(&self, target: VoteTarget) -> i64 {
        let first = (target, UserId(Uuid::nil()));
        let last = (target, UserId(Uuid::from_u128(u128::MAX)));
        self.votes
            .range(first..=last)
            .map(|(_, d)| d.value())
            .sum()
    }

    /// Panics if any score diverged from its ledger
    pub fn test_check_scores(&self) {
        for (id, p) in &self.posts {
            assert_eq!(
                p.post.score,
                self.test_ledger_sum(VoteTarget::Post(*id)),
                "score of {id} diverged from its votes"
            );
        }
        for (id, c) in &self.comments {
            assert_eq!(
                c.comment.score,
                self.test_ledger_sum(VoteTarget::Comment(*id)),
                "score of {id} diverged from its votes"
            );
        }
    }

    fn resolve(&self, tok: AuthToken) -> Result<UserId, Error> {
        for (id, u) in self.users.iter() {
            if u.sessions.contains_key(&tok) {
                return Ok(*id);
            }
        }
        Err(Error::PermissionDenied)
    }

    pub fn admin_create_user(&mut self, u: NewUser) -> Result<(), Error> {
        u.validate()?;

        if self.users.values().any(|db| db.name == u.name) {
            return Err(Error::NameAlreadyUsed(u.name));
        }

        match self.users.entry(u.id) {
            btree_map::Entry::Occupied(_) => Err(Error::UuidAlreadyUsed(u.id.0)),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(MockUser {
                    name: u.name,
                    pass: u.password,
                    sessions: HashMap::new(),
                });
                Ok(())
            }
        }
    }

    pub fn admin_create_course(&mut self, c: NewCourse) -> Result<(), Error> {
        c.validate()?;
        match self.courses.entry(c.id) {
            btree_map::Entry::Occupied(o) => Err(Error::NameAlreadyUsed(o.key().0.clone())),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(MockCourse {
                    name: c.name,
                    code: c.code,
                    description: c.description,
                    professors: c.professors.into_iter().collect(),
                });
                Ok(())
            }
        }
    }

    pub fn auth(&mut self, s: NewSession) -> Result<AuthToken, Error> {
        s.validate()?;
        for u in self.users.values_mut() {
            if u.name == s.user {
                // tests (of which mock-server is a part of) don't actually use bcrypt
                if s.password != u.pass {
                    return Err(Error::PermissionDenied);
                } else {
                    let tok = AuthToken(Uuid::new_v4());
                    u.sessions.insert(tok, Device(s.device));
                    return Ok(tok);
                }
            }
        }
        Err(Error::PermissionDenied)
    }

    pub fn unauth(&mut self, tok: AuthToken) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        if let Some(u) = self.users.get_mut(&user) {
            u.sessions.remove(&tok);
        }
        Ok(())
    }

    pub fn whoami(&self, tok: AuthToken) -> Result<UserId, Error> {
        self.resolve(tok)
    }

    pub fn me(&self, tok: AuthToken) -> Result<User, Error> {
        let id = self.resolve(tok)?;
        let name = self.users[&id].name.clone();
        Ok(User { id, name })
    }

    fn course(&self, id: &CourseId, c: &MockCourse) -> Course {
        Course {
            id: id.clone(),
            name: c.name.clone(),
            code: c.code.clone(),
            description: c.description.clone(),
            professors: c.professors.iter().cloned().collect(),
            follower_count: self
                .follows
                .values()
                .filter(|f| f.courses.contains(id))
                .count() as i64,
        }
    }

    pub fn list_courses(&self) -> Vec<Course> {
        let mut res = self
            .courses
            .iter()
            .map(|(id, c)| self.course(id, c))
            .collect::<Vec<_>>();
        res.sort_by(|a, b| {
            b.follower_count
                .cmp(&a.follower_count)
                .then_with(|| a.id.cmp(&b.id))
        });
        res
    }

    pub fn get_course(&self, id: &CourseId) -> Result<Course, Error> {
        quad_api::validate_name(&id.0)?;
        self.courses
            .get(id)
            .map(|c| self.course(id, c))
            .ok_or_else(|| Error::not_found(id))
    }

    fn live_posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.values().filter(|p| !p.deleted).map(|p| &p.post)
    }

    fn live_post_mut(&mut self, id: PostId) -> Result<&mut MockPost, Error> {
        match self.posts.get_mut(&id) {
            Some(p) if !p.deleted => Ok(p),
            _ => Err(Error::not_found(id)),
        }
    }

    fn live_comment_mut(&mut self, id: CommentId) -> Result<&mut MockComment, Error> {
        match self.comments.get_mut(&id) {
            Some(c) if !c.deleted => Ok(c),
            _ => Err(Error::not_found(id)),
        }
    }

    /// Comments of a deleted post cannot be voted on any longer
    fn live_score_mut(&mut self, target: VoteTarget) -> Result<&mut i64, Error> {
        Ok(match target {
            VoteTarget::Post(p) => &mut self.live_post_mut(p)?.post.score,
            VoteTarget::Comment(c) => {
                if let Some(post) = self.comments.get(&c).map(|m| m.comment.post_id) {
                    self.get_post(post).map_err(|_| Error::not_found(c))?;
                }
                &mut self.live_comment_mut(c)?.comment.score
            }
        })
    }

    pub fn list_posts(&self, q: &ListQuery) -> Result<Vec<Post>, Error> {
        q.validate()?;
        Ok(q.apply(self.live_posts()))
    }

    pub fn get_post(&self, id: PostId) -> Result<Post, Error> {
        match self.posts.get(&id) {
            Some(p) if !p.deleted => Ok(p.post.clone()),
            _ => Err(Error::not_found(id)),
        }
    }

    pub fn create_post(&mut self, tok: AuthToken, p: NewPost) -> Result<Post, Error> {
        let author = self.resolve(tok)?;
        p.validate()?;
        if self.posts.contains_key(&p.id) {
            return Err(Error::UuidAlreadyUsed(p.id.0));
        }
        if let Some(c) = &p.course_id {
            if !self.courses.contains_key(c) {
                return Err(Error::not_found(c));
            }
        }
        let post = Post {
            id: p.id,
            author_id: author,
            title: p.title,
            content: p.content,
            course_id: p.course_id,
            professor: p.professor,
            tags: p.tags,
            score: 1,
            created_at: Utc::now(),
        };
        self.votes
            .insert((VoteTarget::Post(p.id), author), VoteDirection::Up);
        self.posts.insert(
            p.id,
            MockPost {
                post: post.clone(),
                deleted: false,
            },
        );
        Ok(post)
    }

    pub fn edit_post(&mut self, tok: AuthToken, id: PostId, e: PostEdit) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        e.validate()?;
        let p = self.live_post_mut(id)?;
        if p.post.author_id != user {
            return Err(Error::PermissionDenied);
        }
        p.post.title = e.title;
        p.post.content = e.content;
        Ok(())
    }

    pub fn delete_post(&mut self, tok: AuthToken, id: PostId) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        let p = self.live_post_mut(id)?;
        if p.post.author_id != user {
            return Err(Error::PermissionDenied);
        }
        p.deleted = true;
        Ok(())
    }

    pub fn own_posts(&self, tok: AuthToken, q: &OwnPostsQuery) -> Result<Vec<Post>, Error> {
        let user = self.resolve(tok)?;
        let mut res = self
            .live_posts()
            .filter(|p| p.author_id == user)
            .cloned()
            .collect::<Vec<_>>();
        SortBy::New.sort(&mut res);
        res.truncate(quad_api::clamp_limit(q.limit));
        Ok(res)
    }

    pub fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, Error> {
        self.get_post(post)?;
        let mut res = self
            .comments
            .values()
            .filter(|c| !c.deleted && c.comment.post_id == post)
            .map(|c| c.comment.clone())
            .collect::<Vec<_>>();
        res.sort_unstable_by_key(|c| (c.created_at, c.id));
        Ok(res)
    }

    pub fn create_comment(&mut self, tok: AuthToken, c: NewComment) -> Result<Comment, Error> {
        let author = self.resolve(tok)?;
        c.validate()?;
        if self.comments.contains_key(&c.id) {
            return Err(Error::UuidAlreadyUsed(c.id.0));
        }
        self.get_post(c.post_id)?;
        let comment = Comment {
            id: c.id,
            post_id: c.post_id,
            author_id: author,
            content: c.content,
            score: 1,
            created_at: Utc::now(),
        };
        self.votes
            .insert((VoteTarget::Comment(c.id), author), VoteDirection::Up);
        self.comments.insert(
            c.id,
            MockComment {
                comment: comment.clone(),
                deleted: false,
            },
        );
        Ok(comment)
    }

    pub fn edit_comment(
        &mut self,
        tok: AuthToken,
        id: CommentId,
        e: CommentEdit,
    ) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        e.validate()?;
        let c = self.live_comment_mut(id)?;
        if c.comment.author_id != user {
            return Err(Error::PermissionDenied);
        }
        c.comment.content = e.content;
        Ok(())
    }

    pub fn delete_comment(&mut self, tok: AuthToken, id: CommentId) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        let c = self.live_comment_mut(id)?;
        if c.comment.author_id != user {
            return Err(Error::PermissionDenied);
        }
        c.deleted = true;
        Ok(())
    }

    pub fn cast_vote(&mut self, tok: AuthToken, v: NewVote) -> Result<VoteOutcome, Error> {
        let voter = self.resolve(tok)?;
        let (target, direction) = v.parse()?;
        self.live_score_mut(target)?;
        let key = (target, voter);
        let change = VoteChange::decide(self.votes.get(&key).copied(), direction);
        let score = {
            let score = self.live_score_mut(target)?;
            *score += change.score_delta();
            *score
        };
        match change.new_value() {
            Some(d) => self.votes.insert(key, d),
            None => self.votes.remove(&key),
        };
        tracing::trace!(?target, ?change, score, "mock vote cast");
        Ok(VoteOutcome {
            score,
            user_vote: change.new_value(),
        })
    }

    pub fn get_vote(
        &self,
        tok: AuthToken,
        target_type: TargetType,
        id: Uuid,
    ) -> Result<Option<VoteDirection>, Error> {
        let voter = self.resolve(tok)?;
        Ok(self
            .votes
            .get(&(VoteTarget::new(target_type, id), voter))
            .copied())
    }

    pub fn feed(&self, tok: AuthToken, q: &FeedQuery) -> Result<Vec<Post>, Error> {
        let user = self.resolve(tok)?;
        let follows = self.follows.get(&user).cloned().unwrap_or_default();
        Ok(follows.compose(self.live_posts(), q, self.tag_score_floor))
    }

    pub fn follow_course(&mut self, tok: AuthToken, f: FollowCourse) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        f.validate()?;
        match f.action {
            FollowAction::Follow => {
                if !self.courses.contains_key(&f.course_id) {
                    return Err(Error::not_found(&f.course_id));
                }
                self.follows
                    .entry(user)
                    .or_default()
                    .courses
                    .insert(f.course_id);
            }
            FollowAction::Unfollow => {
                if let Some(follows) = self.follows.get_mut(&user) {
                    follows.courses.remove(&f.course_id);
                }
            }
        }
        Ok(())
    }

    pub fn follow_tag(&mut self, tok: AuthToken, f: FollowTag) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        f.validate()?;
        match f.action {
            FollowAction::Follow => {
                self.follows.entry(user).or_default().tags.insert(f.tag_name);
            }
            FollowAction::Unfollow => {
                if let Some(follows) = self.follows.get_mut(&user) {
                    follows.tags.remove(&f.tag_name);
                }
            }
        }
        Ok(())
    }

    pub fn set_professor_preference(
        &mut self,
        tok: AuthToken,
        p: ProfessorPreference,
    ) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        p.validate()?;
        if !self.courses.contains_key(&p.course_id) {
            return Err(Error::not_found(&p.course_id));
        }
        self.follows
            .entry(user)
            .or_default()
            .professors
            .insert(p.course_id, p.professor_name);
        Ok(())
    }

    pub fn clear_professor_preference(
        &mut self,
        tok: AuthToken,
        course: &CourseId,
    ) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        quad_api::validate_name(&course.0)?;
        if let Some(follows) = self.follows.get_mut(&user) {
            follows.professors.remove(course);
        }
        Ok(())
    }

    pub fn followed_courses(&self, tok: AuthToken) -> Result<Vec<CourseId>, Error> {
        let user = self.resolve(tok)?;
        Ok(self
            .follows
            .get(&user)
            .map(|f| f.courses.iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn followed_tags(&self, tok: AuthToken) -> Result<Vec<String>, Error> {
        let user = self.resolve(tok)?;
        Ok(self
            .follows
            .get(&user)
            .map(|f| f.tags.iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn professor_preferences(
        &self,
        tok: AuthToken,
    ) -> Result<BTreeMap<CourseId, String>, Error> {
        let user = self.resolve(tok)?;
        Ok(self
            .follows
            .get(&user)
            .map(|f| f.professors.clone())
            .unwrap_or_default())
    }
}
