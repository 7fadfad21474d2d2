use std::fmt;

use bolero::generator::TypeGenerator;
use uuid::Uuid;

use crate::{CommentId, Error, PostId};

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    Comment,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum VoteTarget {
    Post(PostId),
    Comment(CommentId),
}

impl VoteTarget {
    pub fn new(target_type: TargetType, id: Uuid) -> VoteTarget {
        match target_type {
            TargetType::Post => VoteTarget::Post(PostId(id)),
            TargetType::Comment => VoteTarget::Comment(CommentId(id)),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            VoteTarget::Post(p) => p.0,
            VoteTarget::Comment(c) => c.0,
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteTarget::Post(p) => p.fmt(f),
            VoteTarget::Comment(c) => c.fmt(f),
        }
    }
}

/// A single vote, serialized as `1` or `-1`
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(into = "i64", try_from = "i64")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn value(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

impl From<VoteDirection> for i64 {
    fn from(d: VoteDirection) -> i64 {
        d.value()
    }
}

impl TryFrom<i64> for VoteDirection {
    type Error = Error;

    fn try_from(v: i64) -> Result<VoteDirection, Error> {
        match v {
            1 => Ok(VoteDirection::Up),
            -1 => Ok(VoteDirection::Down),
            _ => Err(Error::InvalidField(String::from("value"))),
        }
    }
}

/// Body of a vote request. `value` is kept raw so that a malformed direction
/// is reported as a validation error on that field.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewVote {
    pub target_id: Uuid,
    pub target_type: TargetType,
    pub value: i64,
}

impl NewVote {
    pub fn new(target: VoteTarget, direction: VoteDirection) -> NewVote {
        let target_type = match target {
            VoteTarget::Post(_) => TargetType::Post,
            VoteTarget::Comment(_) => TargetType::Comment,
        };
        NewVote {
            target_id: target.id(),
            target_type,
            value: direction.value(),
        }
    }

    pub fn parse(&self) -> Result<(VoteTarget, VoteDirection), Error> {
        Ok((
            VoteTarget::new(self.target_type, self.target_id),
            VoteDirection::try_from(self.value)?,
        ))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct VoteOutcome {
    pub score: i64,

    /// `None` when the vote was toggled off
    pub user_vote: Option<VoteDirection>,
}

/// What casting a vote does to the ledger entry of the (voter, target) pair
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoteChange {
    Insert(VoteDirection),
    Delete(VoteDirection),
    Flip {
        from: VoteDirection,
        to: VoteDirection,
    },
}

impl VoteChange {
    pub fn decide(existing: Option<VoteDirection>, requested: VoteDirection) -> VoteChange {
        match existing {
            None => VoteChange::Insert(requested),
            Some(d) if d == requested => VoteChange::Delete(d),
            Some(from) => VoteChange::Flip {
                from,
                to: requested,
            },
        }
    }

    pub fn score_delta(&self) -> i64 {
        match self {
            VoteChange::Insert(d) => d.value(),
            VoteChange::Delete(d) => -d.value(),
            VoteChange::Flip { from, to } => to.value() - from.value(),
        }
    }

    /// The voter's ledger entry once the change is applied
    pub fn new_value(&self) -> Option<VoteDirection> {
        match self {
            VoteChange::Insert(d) => Some(*d),
            VoteChange::Delete(_) => None,
            VoteChange::Flip { to, .. } => Some(*to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VoteDirection::*;

    #[test]
    fn decision_table() {
        let first = VoteChange::decide(None, Up);
        assert_eq!(first, VoteChange::Insert(Up));
        assert_eq!((first.score_delta(), first.new_value()), (1, Some(Up)));

        let again = VoteChange::decide(Some(Up), Up);
        assert_eq!(again, VoteChange::Delete(Up));
        assert_eq!((again.score_delta(), again.new_value()), (-1, None));

        let down_again = VoteChange::decide(Some(Down), Down);
        assert_eq!((down_again.score_delta(), down_again.new_value()), (1, None));

        let switch = VoteChange::decide(Some(Down), Up);
        assert_eq!((switch.score_delta(), switch.new_value()), (2, Some(Up)));

        let switch_back = VoteChange::decide(Some(Up), Down);
        assert_eq!((switch_back.score_delta(), switch_back.new_value()), (-2, Some(Down)));
    }

    #[test]
    fn ledger_replay_matches_score() {
        bolero::check!()
            .with_type::<Vec<VoteDirection>>()
            .for_each(|votes| {
                let mut entry = None;
                let mut score = 0;
                for v in votes {
                    let change = VoteChange::decide(entry, *v);
                    score += change.score_delta();
                    entry = change.new_value();
                    assert_eq!(score, entry.map(VoteDirection::value).unwrap_or(0));
                }
            });
    }

    #[test]
    fn direction_is_an_integer_on_the_wire() {
        assert_eq!(serde_json::to_string(&Down).unwrap(), "-1");
        let outcome = VoteOutcome {
            score: 3,
            user_vote: None,
        };
        assert_eq!(
            serde_json::to_string(&outcome).unwrap(),
            r#"{"score":3,"user_vote":null}"#
        );
        assert!(serde_json::from_str::<VoteDirection>("0").is_err());
    }

    #[test]
    fn malformed_value_names_the_field() {
        let vote: NewVote = serde_json::from_str(
            r#"{"target_id":"ffffffff-ffff-ffff-ffff-ffffffffffff","target_type":"post","value":2}"#,
        )
        .unwrap();
        assert_eq!(
            vote.parse().unwrap_err(),
            Error::InvalidField(String::from("value"))
        );
        let target = VoteTarget::Comment(CommentId(crate::STUB_UUID));
        assert_eq!(NewVote::new(target, Up).parse().unwrap(), (target, Up));
    }
}
