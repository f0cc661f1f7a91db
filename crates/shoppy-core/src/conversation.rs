//! Per-user conversation slot: which free-text answer the bot is waiting for.
//!
//! The slot is flat (one pending prompt per user) and persisted on the user
//! row, so any process can pick up the next message. This module is pure;
//! the router loads and stores the slot.

/// What free-text input is currently expected from the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConversationState {
    #[default]
    None,
    WaitingForListName,
    WaitingForItemName,
    /// Rename of the current list.
    WaitingForNewListName,
    /// Reserved; no flow enters it.
    WaitingForItemNumber,
}

impl ConversationState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversationState::None => "none",
            ConversationState::WaitingForListName => "waiting_for_list_name",
            ConversationState::WaitingForItemName => "waiting_for_item_name",
            ConversationState::WaitingForNewListName => "waiting_for_new_list_name",
            ConversationState::WaitingForItemNumber => "waiting_for_item_number",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(ConversationState::None),
            "waiting_for_list_name" => Some(ConversationState::WaitingForListName),
            "waiting_for_item_name" => Some(ConversationState::WaitingForItemName),
            "waiting_for_new_list_name" => Some(ConversationState::WaitingForNewListName),
            "waiting_for_item_number" => Some(ConversationState::WaitingForItemNumber),
            _ => None,
        }
    }
}

/// Screen to show once a prompt has been answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReturnTo {
    ListsOverview,
    ManageItems,
    ManageList,
}

impl ReturnTo {
    /// Tag stored in the user's `pending_action` column.
    pub fn tag(self) -> &'static str {
        match self {
            ReturnTo::ListsOverview => "new_back_to_lists",
            ReturnTo::ManageItems => "add_back_to_manage",
            ReturnTo::ManageList => "rename_back_to_manage",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "new_back_to_lists" => Some(ReturnTo::ListsOverview),
            "add_back_to_manage" => Some(ReturnTo::ManageItems),
            "rename_back_to_manage" => Some(ReturnTo::ManageList),
            _ => None,
        }
    }
}

/// The persisted slot: state plus the opaque pending-action tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Conversation {
    pub state: ConversationState,
    pub pending_action: Option<String>,
}

/// Result of feeding free text into the slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Answer {
    /// Nothing was pending; the text is dropped.
    Ignored,
    /// A prompt was pending but has no completion handler.
    Discarded,
    CreateList {
        name: String,
        return_to: Option<ReturnTo>,
    },
    AddItem {
        name: String,
        return_to: Option<ReturnTo>,
    },
    RenameList {
        name: String,
        return_to: Option<ReturnTo>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    NothingToCancel,
    Cancelled,
}

impl Conversation {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn waiting(state: ConversationState, return_to: ReturnTo) -> Self {
        Self {
            state,
            pending_action: Some(return_to.tag().to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state != ConversationState::None
    }

    pub fn return_to(&self) -> Option<ReturnTo> {
        self.pending_action.as_deref().and_then(ReturnTo::from_tag)
    }

    /// Interpret free text against the pending prompt.
    ///
    /// Any non-idle outcome means the caller must clear the slot.
    pub fn answer(&self, text: &str) -> Answer {
        let name = text.trim().to_string();
        let return_to = self.return_to();
        match self.state {
            ConversationState::None => Answer::Ignored,
            ConversationState::WaitingForItemNumber => Answer::Discarded,
            ConversationState::WaitingForListName => Answer::CreateList { name, return_to },
            ConversationState::WaitingForItemName => Answer::AddItem { name, return_to },
            ConversationState::WaitingForNewListName => Answer::RenameList { name, return_to },
        }
    }

    pub fn cancel(&self) -> CancelOutcome {
        if self.is_pending() {
            CancelOutcome::Cancelled
        } else {
            CancelOutcome::NothingToCancel
        }
    }
}
