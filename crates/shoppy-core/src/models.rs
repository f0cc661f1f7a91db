//! Persistent entities and the small value types returned by store queries.

use chrono::{DateTime, Utc};

use crate::{
    conversation::Conversation,
    domain::{ExternalUserId, ItemId, ListId, UserId},
};

// Column limits, in characters.
pub const MAX_USER_NAME_LEN: usize = 255;
pub const MAX_LIST_NAME_LEN: usize = 255;
pub const MAX_ITEM_NAME_LEN: usize = 500;
pub const MAX_DETAILS_LEN: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub external_id: ExternalUserId,
    pub username: Option<String>,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub current_list_id: Option<ListId>,
    pub conversation: Conversation,
}

impl User {
    /// `@handle` when the user has one, display name otherwise.
    pub fn label(&self) -> String {
        match self.username.as_deref() {
            Some(u) if !u.is_empty() => format!("@{u}"),
            _ => self.display_name.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShoppingList {
    pub id: ListId,
    pub name: String,
    pub creator_id: UserId,
    pub share_token: String,
    pub created_at: DateTime<Utc>,
}

impl ShoppingList {
    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.creator_id == user_id
    }
}

/// Membership role. The absence of a membership row is modelled as `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Role::Member),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A list the user belongs to, with the user's role on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListWithRole {
    pub list: ShoppingList,
    pub role: Role,
}

/// A member of a list, with their role on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberWithRole {
    pub user: User,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub list_id: ListId,
    pub name: String,
    pub is_checked: bool,
    pub is_hidden: bool,
    pub added_by: UserId,
    pub added_at: DateTime<Utc>,
    pub order_index: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    ListCreated,
    ListRenamed,
    ListDeleted,
    ItemAdded,
    ItemChecked,
    ItemUnchecked,
    ItemHidden,
    ItemShown,
    UserJoined,
    UserLeft,
    UserPromoted,
    UserDemoted,
    UserRemoved,
}

impl ActionKind {
    pub const ALL: [ActionKind; 13] = [
        ActionKind::ListCreated,
        ActionKind::ListRenamed,
        ActionKind::ListDeleted,
        ActionKind::ItemAdded,
        ActionKind::ItemChecked,
        ActionKind::ItemUnchecked,
        ActionKind::ItemHidden,
        ActionKind::ItemShown,
        ActionKind::UserJoined,
        ActionKind::UserLeft,
        ActionKind::UserPromoted,
        ActionKind::UserDemoted,
        ActionKind::UserRemoved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ListCreated => "list_created",
            ActionKind::ListRenamed => "list_renamed",
            ActionKind::ListDeleted => "list_deleted",
            ActionKind::ItemAdded => "item_added",
            ActionKind::ItemChecked => "item_checked",
            ActionKind::ItemUnchecked => "item_unchecked",
            ActionKind::ItemHidden => "item_hidden",
            ActionKind::ItemShown => "item_shown",
            ActionKind::UserJoined => "user_joined",
            ActionKind::UserLeft => "user_left",
            ActionKind::UserPromoted => "user_promoted",
            ActionKind::UserDemoted => "user_demoted",
            ActionKind::UserRemoved => "user_removed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// One activity-log row joined with the actor's display name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityEntry {
    pub id: i64,
    pub list_id: ListId,
    pub user_id: UserId,
    pub actor_name: String,
    pub action: ActionKind,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}
