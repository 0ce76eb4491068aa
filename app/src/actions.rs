//! Actions accepted by the root reducer.
//!
//! To-do actions come in two groups. Local mutations (`Add`, `Toggle`,
//! `Update`, `Delete`, `SetAll`) only change the in-memory list: they are the
//! echoes of acknowledged remote writes and the snapshots of the change feed.
//! Requests (`RequestAdd`, ...) are what the UI dispatches; each performs one
//! remote write and echoes on success.

use crate::types::{Credentials, Todo, TodoId};
use chrono::NaiveDate;
use std::fmt;

/// The remote write that an action performs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WriteOp {
    /// Document creation
    Add,
    /// `completed` flip
    Toggle,
    /// `text` replacement
    Update,
    /// Document removal
    Delete,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Toggle => "toggle",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Actions of the to-do slice
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TodoAction {
    // ========== Local mutations ==========
    /// Append a not yet completed item
    Add {
        /// Remote-assigned id
        id: TodoId,
        /// Description
        text: String,
    },
    /// Flip `completed`
    Toggle {
        /// Target item
        id: TodoId,
    },
    /// Replace `text`
    Update {
        /// Target item
        id: TodoId,
        /// New description
        text: String,
    },
    /// Remove an item
    Delete {
        /// Target item
        id: TodoId,
    },
    /// Replace the whole list with a remote snapshot
    SetAll {
        /// Items of the snapshot
        todos: Vec<Todo>,
    },

    // ========== Remote write requests ==========
    /// Create a document, then echo `Add`
    RequestAdd {
        /// Description
        text: String,
    },
    /// Flip `completed` remotely, then echo `Toggle`
    RequestToggle {
        /// Target item
        id: TodoId,
    },
    /// Replace `text` remotely, then echo `Update`
    RequestUpdate {
        /// Target item
        id: TodoId,
        /// New description
        text: String,
    },
    /// Delete the document, then echo `Delete`
    RequestDelete {
        /// Target item
        id: TodoId,
    },

    // ========== Write outcomes ==========
    /// A remote write was not acknowledged
    WriteFailed {
        /// The failed write
        operation: WriteOp,
        /// Error reported by the remote
        error: String,
    },
}

/// Actions of the user slice
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    /// Sign in with email/password or a social identity
    Login {
        /// What the user presented
        credentials: Credentials,
    },
    /// Create an account and sign in
    Register {
        /// Account email
        email: String,
        /// Plain-text password
        password: String,
        /// Date of birth
        dob: Option<NaiveDate>,
        /// Profile image URI
        image: Option<String>,
    },
    /// Sign out, keeping the roster
    Logout,
    /// Replace the date of birth
    SetDob {
        /// New value
        dob: Option<NaiveDate>,
    },
    /// Replace the profile image
    SetImage {
        /// New value
        image: Option<String>,
    },
    /// Google sign-in completed outside the app
    GoogleSignIn {
        /// Email returned by Google
        email: String,
    },
}

/// Root action
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppAction {
    /// Addressed to the user slice
    User(UserAction),
    /// Addressed to the to-do slice
    Todo(TodoAction),
}

impl AppAction {
    /// The user action, if this is one
    #[must_use]
    pub fn into_user(self) -> Option<UserAction> {
        match self {
            Self::User(action) => Some(action),
            Self::Todo(_) => None,
        }
    }

    /// The to-do action, if this is one
    #[must_use]
    pub fn into_todo(self) -> Option<TodoAction> {
        match self {
            Self::Todo(action) => Some(action),
            Self::User(_) => None,
        }
    }
}

impl From<UserAction> for AppAction {
    fn from(action: UserAction) -> Self {
        Self::User(action)
    }
}

impl From<TodoAction> for AppAction {
    fn from(action: TodoAction) -> Self {
        Self::Todo(action)
    }
}
