//! Screen rendering: text plus inline keyboard for every menu the bot shows.
//!
//! Everything here is pure; the router fetches data and picks the screen.

use crate::{
    actions::{CallbackAction, ListAction, ManageScreen, MemberAction},
    domain::UserId,
    formatting::truncate_label,
    messaging::types::{InlineButton, InlineKeyboard},
    models::{Item, ListWithRole, MemberWithRole, Role, ShoppingList},
};

const ITEM_LABEL_LEN: usize = 12;
const VISIBILITY_LABEL_LEN: usize = 10;
const MEMBER_LABEL_LEN: usize = 12;
const PER_ROW: usize = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub keyboard: InlineKeyboard,
}

/// A clamped page of a longer collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    /// 0-based.
    pub index: usize,
    /// Always at least 1.
    pub total: usize,
}

impl Page {
    pub fn label(&self) -> String {
        format!("({}/{})", self.index + 1, self.total)
    }
}

/// Clamp `page` into range and slice out its entries.
pub fn paginate<T>(all: &[T], page: usize, size: usize) -> (Page, &[T]) {
    let size = size.max(1);
    let total = all.len().div_ceil(size).max(1);
    let index = page.min(total - 1);
    let start = (index * size).min(all.len());
    let end = (start + size).min(all.len());
    (Page { index, total }, &all[start..end])
}

/// Page holding the entry at 0-based `position`.
pub fn page_of(position: usize, size: usize) -> usize {
    position / size.max(1)
}

fn button(label: impl Into<String>, action: CallbackAction) -> InlineButton {
    InlineButton::new(label, action.encode())
}

fn noop(label: impl Into<String>) -> InlineButton {
    button(label, CallbackAction::Noop)
}

/// Previous/next row, only when there is more than one page.
fn nav_row(page: Page, to: impl Fn(usize) -> CallbackAction) -> Vec<InlineButton> {
    if page.total <= 1 {
        return Vec::new();
    }
    let prev = if page.index > 0 {
        button("⬅️ Previous", to(page.index - 1))
    } else {
        noop(" ")
    };
    let next = if page.index + 1 < page.total {
        button("Next ➡️", to(page.index + 1))
    } else {
        noop(" ")
    };
    vec![prev, next]
}

pub fn check_icon(item: &Item) -> &'static str {
    if item.is_checked {
        "✅"
    } else {
        "⬜"
    }
}

pub fn role_icon(role: Role) -> &'static str {
    match role {
        Role::Admin => "👑",
        Role::Member => "👤",
    }
}

pub fn lists_overview(lists: &[ListWithRole], page: usize, size: usize) -> Screen {
    let (page, shown) = paginate(lists, page, size);

    let buttons = shown
        .iter()
        .map(|l| {
            button(
                format!("📋 {}", l.list.name),
                CallbackAction::SelectList(l.list.id),
            )
        })
        .collect();
    let mut keyboard = InlineKeyboard::grid(buttons, PER_ROW);
    keyboard.push_row(nav_row(page, CallbackAction::ListsPage));

    let text = if lists.is_empty() {
        "📋 You don't have any lists yet.\n\nUse /newlist to create one.".to_string()
    } else {
        format!("📋 Your Lists {}", page.label())
    };
    Screen { text, keyboard }
}

/// Visible items of the current list; tapping toggles the check mark.
pub fn items_view(list: &ShoppingList, visible: &[Item], page: usize, size: usize) -> Screen {
    let (page, shown) = paginate(visible, page, size);

    let buttons = shown
        .iter()
        .map(|i| {
            button(
                format!("{} {}", check_icon(i), truncate_label(&i.name, ITEM_LABEL_LEN)),
                CallbackAction::ToggleItem(i.id),
            )
        })
        .collect();
    let mut keyboard = InlineKeyboard::grid(buttons, PER_ROW);
    keyboard.push_row(nav_row(page, CallbackAction::ItemsPage));
    keyboard.push_row(vec![
        button("🛒 Manage items", CallbackAction::Manage(ManageScreen::Items)),
        button("⚙️ Manage list", CallbackAction::Manage(ManageScreen::List)),
    ]);

    let text = if visible.is_empty() {
        format!(
            "📝 {}\n\nNo items yet. Tap \"Manage items\" to add some!",
            list.name
        )
    } else {
        format!("📝 {} {}", list.name, page.label())
    };
    Screen { text, keyboard }
}

pub fn manage_items(list: &ShoppingList) -> Screen {
    let keyboard = InlineKeyboard::new(vec![
        vec![
            button("➕ Add", CallbackAction::AddItem),
            button("👁️ Visibility", CallbackAction::VisibilityPage(0)),
        ],
        vec![
            button("⬅️ Back", CallbackAction::ItemsPage(0)),
            button("📋 List all", CallbackAction::VisibilityPage(0)),
        ],
    ]);
    Screen {
        text: format!("🛒 Manage Items - {}", list.name),
        keyboard,
    }
}

/// Every item, hidden ones included; tapping toggles visibility.
pub fn visibility(list: &ShoppingList, all: &[Item], page: usize, size: usize) -> Screen {
    let (page, shown) = paginate(all, page, size);

    let buttons = shown
        .iter()
        .map(|i| {
            let vis = if i.is_hidden { "🙈" } else { "👁️" };
            button(
                format!(
                    "{vis}{} {}",
                    check_icon(i),
                    truncate_label(&i.name, VISIBILITY_LABEL_LEN)
                ),
                CallbackAction::ToggleVisibility(i.id),
            )
        })
        .collect();
    let mut keyboard = InlineKeyboard::grid(buttons, PER_ROW);
    keyboard.push_row(nav_row(page, CallbackAction::VisibilityPage));
    keyboard.push_row(vec![
        button("⬅️ Back", CallbackAction::Manage(ManageScreen::Items)),
        button("📋 Back to list", CallbackAction::ItemsPage(0)),
    ]);

    let text = if all.is_empty() {
        format!("👁️ {} - All Items\n\nNo items yet.", list.name)
    } else {
        format!(
            "👁️ {} - All Items {}\n\nTap to toggle visibility (🙈 hidden / 👁️ visible)",
            list.name,
            page.label()
        )
    };
    Screen { text, keyboard }
}

/// List settings; buttons depend on the viewer's role.
pub fn manage_list(list: &ShoppingList, role: Role, viewer: UserId) -> Screen {
    let is_admin = role == Role::Admin;
    let is_owner = list.is_owner(viewer);

    let mut keyboard = InlineKeyboard::default();
    if is_admin {
        keyboard.push_row(vec![
            button("🔗 Share", CallbackAction::List(ListAction::Share)),
            button("✏️ Rename", CallbackAction::List(ListAction::Rename)),
        ]);
    }

    let mut row = Vec::new();
    if is_admin {
        row.push(button("🗑️ Delete", CallbackAction::List(ListAction::Delete)));
    }
    if !is_owner {
        row.push(button("🚪 Leave", CallbackAction::List(ListAction::Leave)));
    }
    keyboard.push_row(row);

    keyboard.push_row(vec![
        button("➕ New", CallbackAction::List(ListAction::New)),
        button("📜 Log", CallbackAction::List(ListAction::Log)),
    ]);
    keyboard.push_row(vec![
        button("⬅️ Back", CallbackAction::ItemsPage(0)),
        button("👥 Users", CallbackAction::UsersPage(0)),
    ]);

    let role_text = if is_owner {
        "Owner"
    } else if is_admin {
        "Admin"
    } else {
        "Member"
    };
    Screen {
        text: format!("⚙️ Manage List - {}\nYour role: {role_text}", list.name),
        keyboard,
    }
}

/// Member roster. Admins can open other members; the viewer is marked.
pub fn members(
    list: &ShoppingList,
    all: &[MemberWithRole],
    viewer: UserId,
    viewer_is_admin: bool,
    page: usize,
    size: usize,
) -> Screen {
    let (page, shown) = paginate(all, page, size);

    let buttons = shown
        .iter()
        .map(|m| {
            let label = format!(
                "{} {}",
                role_icon(m.role),
                truncate_label(&m.user.label(), MEMBER_LABEL_LEN)
            );
            if m.user.id == viewer {
                noop(format!("{label} (you)"))
            } else if viewer_is_admin {
                button(label, CallbackAction::Member(MemberAction::Select, m.user.id))
            } else {
                noop(label)
            }
        })
        .collect();
    let mut keyboard = InlineKeyboard::grid(buttons, PER_ROW);
    keyboard.push_row(nav_row(page, CallbackAction::UsersPage));
    keyboard.push_row(vec![
        button("⬅️ Back", CallbackAction::Manage(ManageScreen::List)),
        button("📋 Back to list", CallbackAction::ItemsPage(0)),
    ]);

    let mut text = format!(
        "👥 {} - Members {}\n\n👑 = Admin, 👤 = Member",
        list.name,
        page.label()
    );
    if viewer_is_admin {
        text.push_str("\n\nTap a user to manage them.");
    }
    Screen { text, keyboard }
}

/// Actions an admin can take on one member.
pub fn member_actions(list: &ShoppingList, target: &MemberWithRole) -> Screen {
    let id = target.user.id;
    let is_owner = list.is_owner(id);
    let is_admin = target.role == Role::Admin;

    let mut keyboard = InlineKeyboard::default();
    if !is_owner {
        let role_button = if is_admin {
            button("⬇️ Demote", CallbackAction::Member(MemberAction::Demote, id))
        } else {
            button("⬆️ Promote", CallbackAction::Member(MemberAction::Promote, id))
        };
        keyboard.push_row(vec![role_button]);
        keyboard.push_row(vec![button(
            "🚫 Remove",
            CallbackAction::Member(MemberAction::Remove, id),
        )]);
    }
    keyboard.push_row(vec![
        button("⬅️ Back", CallbackAction::UsersPage(0)),
        button("📋 Back to list", CallbackAction::ItemsPage(0)),
    ]);

    let role = if is_owner {
        "👑 Owner"
    } else if is_admin {
        "👑 Admin"
    } else {
        "👤 Member"
    };
    Screen {
        text: format!("👤 Manage User\n\n{}\nRole: {role}", target.user.label()),
        keyboard,
    }
}

pub fn confirm_delete(list: &ShoppingList) -> Screen {
    Screen {
        text: format!(
            "⚠️ Are you sure you want to delete \"{}\"?\n\nThis cannot be undone!",
            list.name
        ),
        keyboard: InlineKeyboard::new(vec![vec![
            button("⚠️ Yes, delete", CallbackAction::List(ListAction::ConfirmDelete)),
            button("❌ Cancel", CallbackAction::Manage(ManageScreen::List)),
        ]]),
    }
}
