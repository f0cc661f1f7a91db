//! Inbound vocabulary: slash commands and inline-button callback data.
//!
//! Both are decoded once here; the router matches on the typed values.

use crate::domain::{ItemId, ListId, UserId};

/// Prefix of the `/start` payload carried by invite links.
pub const JOIN_PREFIX: &str = "join_";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `/start`, optionally with an invite token from `join_<token>`.
    Start { invite: Option<String> },
    Help,
    Cancel,
    NewList { name: Option<String> },
    MyLists,
    List,
    Add { name: Option<String> },
    /// `/check`, `/uncheck`, `/hide`, `/show`, `/listall`: show the items view.
    Legacy,
    Unknown(String),
}

impl Command {
    /// Parse `/cmd[@bot] [argument]`. Returns `None` for non-command text.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        let mut parts = text.splitn(2, char::is_whitespace);
        let first = parts.next().unwrap_or("");
        let rest = parts.next().map(str::trim).filter(|s| !s.is_empty());

        let cmd = first
            .trim_start_matches('/')
            .split('@')
            .next()
            .unwrap_or("")
            .to_lowercase();

        let arg = || rest.map(str::to_string);
        Some(match cmd.as_str() {
            "start" => Command::Start {
                invite: rest
                    .and_then(|r| r.strip_prefix(JOIN_PREFIX))
                    .map(str::to_string),
            },
            "help" => Command::Help,
            "cancel" => Command::Cancel,
            "newlist" => Command::NewList { name: arg() },
            "mylists" => Command::MyLists,
            "list" => Command::List,
            "add" => Command::Add { name: arg() },
            "check" | "uncheck" | "hide" | "show" | "listall" => Command::Legacy,
            _ => Command::Unknown(cmd),
        })
    }
}

/// Actions on the current list under `list:`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListAction {
    Share,
    Rename,
    Delete,
    ConfirmDelete,
    Leave,
    New,
    Log,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberAction {
    Select,
    Promote,
    Demote,
    Remove,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManageScreen {
    Items,
    List,
}

/// Decoded inline-button payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    ListsPage(usize),
    SelectList(ListId),
    List(ListAction),
    ItemsPage(usize),
    ToggleItem(ItemId),
    AddItem,
    ToggleVisibility(ItemId),
    Manage(ManageScreen),
    VisibilityPage(usize),
    UsersPage(usize),
    Member(MemberAction, UserId),
    Noop,
    Unknown,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        let parts: Vec<&str> = data.trim().split(':').collect();
        let page = |s: &str| s.parse::<usize>().ok();
        let id = |s: &str| s.parse::<i64>().ok();

        let parsed = match parts.as_slice() {
            ["noop"] => Some(CallbackAction::Noop),
            ["lists", p] => page(p).map(CallbackAction::ListsPage),
            ["items", p] => page(p).map(CallbackAction::ItemsPage),
            ["visibility", p] => page(p).map(CallbackAction::VisibilityPage),
            ["users", p] => page(p).map(CallbackAction::UsersPage),
            ["list", "select", l] => id(l).map(|l| CallbackAction::SelectList(ListId(l))),
            ["list", action] | ["list", action, _] => list_action(action).map(CallbackAction::List),
            ["item", "toggle", i] => id(i).map(|i| CallbackAction::ToggleItem(ItemId(i))),
            ["item", "togglevis", i] => {
                id(i).map(|i| CallbackAction::ToggleVisibility(ItemId(i)))
            }
            ["item", "add"] | ["item", "add", _] => Some(CallbackAction::AddItem),
            ["manage", "items"] => Some(CallbackAction::Manage(ManageScreen::Items)),
            ["manage", "list"] => Some(CallbackAction::Manage(ManageScreen::List)),
            ["user", action, u] => {
                let action = match *action {
                    "select" => Some(MemberAction::Select),
                    "promote" => Some(MemberAction::Promote),
                    "demote" => Some(MemberAction::Demote),
                    "remove" => Some(MemberAction::Remove),
                    _ => None,
                };
                action.zip(id(u)).map(|(a, u)| CallbackAction::Member(a, UserId(u)))
            }
            _ => None,
        };
        parsed.unwrap_or(CallbackAction::Unknown)
    }

    /// Wire form, the inverse of [`CallbackAction::parse`].
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::ListsPage(p) => format!("lists:{p}"),
            CallbackAction::SelectList(l) => format!("list:select:{}", l.0),
            CallbackAction::List(a) => format!("list:{}", list_action_name(*a)),
            CallbackAction::ItemsPage(p) => format!("items:{p}"),
            CallbackAction::ToggleItem(i) => format!("item:toggle:{}", i.0),
            CallbackAction::AddItem => "item:add".to_string(),
            CallbackAction::ToggleVisibility(i) => format!("item:togglevis:{}", i.0),
            CallbackAction::Manage(ManageScreen::Items) => "manage:items".to_string(),
            CallbackAction::Manage(ManageScreen::List) => "manage:list".to_string(),
            CallbackAction::VisibilityPage(p) => format!("visibility:{p}"),
            CallbackAction::UsersPage(p) => format!("users:{p}"),
            CallbackAction::Member(a, u) => {
                let a = match a {
                    MemberAction::Select => "select",
                    MemberAction::Promote => "promote",
                    MemberAction::Demote => "demote",
                    MemberAction::Remove => "remove",
                };
                format!("user:{a}:{}", u.0)
            }
            CallbackAction::Noop => "noop".to_string(),
            CallbackAction::Unknown => "unknown".to_string(),
        }
    }
}

fn list_action(s: &str) -> Option<ListAction> {
    Some(match s {
        "share" => ListAction::Share,
        "rename" => ListAction::Rename,
        "delete" => ListAction::Delete,
        "confirmdelete" => ListAction::ConfirmDelete,
        "leave" => ListAction::Leave,
        "new" => ListAction::New,
        "log" => ListAction::Log,
        _ => return None,
    })
}

fn list_action_name(a: ListAction) -> &'static str {
    match a {
        ListAction::Share => "share",
        ListAction::Rename => "rename",
        ListAction::Delete => "delete",
        ListAction::ConfirmDelete => "confirmdelete",
        ListAction::Leave => "leave",
        ListAction::New => "new",
        ListAction::Log => "log",
    }
}
