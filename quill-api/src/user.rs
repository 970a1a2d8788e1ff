use std::{fmt, str::FromStr};

use uuid::Uuid;

use crate::{Comment, Error, STUB_UUID};

pub const BCRYPT_COST: u32 = 10;

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn stub() -> UserId {
        UserId(STUB_UUID)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Moderator,
    Admin,
}

impl Role {
    /// Privileged roles may edit or delete comments authored by someone else
    pub fn is_privileged(&self) -> bool {
        match self {
            Role::Member => false,
            Role::Moderator | Role::Admin => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Role> {
        match s {
            "member" => Ok(Role::Member),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(anyhow::anyhow!("unknown role {s:?}")),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

/// The user on whose behalf an operation is attempted
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    /// Whether this actor may edit or delete `comment`
    pub fn can_modify(&self, comment: &Comment) -> bool {
        self.id == comment.author_id() || self.role.is_privileged()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewUser {
    pub id: UserId,
    pub name: String,
    pub initial_password_hash: String,
    pub role: Role,
}

impl NewUser {
    pub fn new(id: UserId, name: String, initial_password: String, role: Role) -> NewUser {
        NewUser {
            id,
            name,
            initial_password_hash: bcrypt::hash(initial_password, BCRYPT_COST)
                .expect("failed hashing password"),
            role,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.name)?;
        crate::validate_string(&self.initial_password_hash)?;
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::InvalidName(self.name.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{AuthorRef, CommentId, PostId};

    fn comment_by(author: UserId) -> Comment {
        Comment {
            id: CommentId::stub(),
            parent_id: None,
            post_id: PostId::stub(),
            author_ref: AuthorRef {
                id: author,
                name: String::from("author"),
                avatar_url: None,
            },
            body: String::from("body"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn authors_and_privileged_roles_can_modify() {
        let author = UserId(Uuid::new_v4());
        let stranger = UserId(Uuid::new_v4());
        let c = comment_by(author);

        let as_author = Actor {
            id: author,
            role: Role::Member,
        };
        assert!(as_author.can_modify(&c));

        for (role, allowed) in [
            (Role::Member, false),
            (Role::Moderator, true),
            (Role::Admin, true),
        ] {
            let actor = Actor { id: stranger, role };
            assert_eq!(actor.can_modify(&c), allowed, "role {role}");
        }
    }

    #[test]
    fn role_round_trips_through_its_name() {
        for role in [Role::Member, Role::Moderator, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
        assert!(Role::from_str("root").is_err());
    }

    #[test]
    fn user_names_are_restricted() {
        let mk = |name: &str| NewUser {
            id: UserId::stub(),
            name: String::from(name),
            initial_password_hash: String::from("hash"),
            role: Role::Member,
        };
        assert_eq!(mk("alice_01").validate(), Ok(()));
        assert_eq!(mk("").validate(), Err(Error::InvalidName(String::new())));
        assert_eq!(
            mk("bob smith").validate(),
            Err(Error::InvalidName(String::from("bob smith")))
        );
    }
}
