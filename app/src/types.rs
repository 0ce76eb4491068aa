//! Domain types for the todo + account state.
//!
//! The root [`AppState`] holds two slices: the signed-in user (with the local
//! credential roster) and the to-do list mirrored from the remote collection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use todo_sync_core::remote::DocumentId;

/// Identifier of a to-do item
///
/// Always the id the remote collection assigned to the backing document;
/// clients never mint their own.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(DocumentId);

impl TodoId {
    /// Creates a `TodoId` from any string-like id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(DocumentId::new(id))
    }

    /// The backing document id
    #[must_use]
    pub const fn as_document_id(&self) -> &DocumentId {
        &self.0
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<DocumentId> for TodoId {
    fn from(id: DocumentId) -> Self {
        Self(id)
    }
}

impl From<&str> for TodoId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TodoId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A single to-do item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Remote-assigned identifier
    pub id: TodoId,
    /// Description
    pub text: String,
    /// Whether the item is done
    pub completed: bool,
}

impl Todo {
    /// Creates a new, not yet completed item
    #[must_use]
    pub fn new(id: impl Into<TodoId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            completed: false,
        }
    }

    /// Same item with the given completion flag
    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

/// The to-do slice of the root state
///
/// Ids are unique at every point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoState {
    /// All items, in the order they were added or last delivered by a snapshot
    pub todos: Vec<Todo>,
}

impl TodoState {
    /// Creates an empty list
    #[must_use]
    pub const fn new() -> Self {
        Self { todos: Vec::new() }
    }

    /// Builds a list from `todos`, collapsing duplicate ids
    ///
    /// The last occurrence of an id wins both value and position.
    #[must_use]
    pub fn from_unique_last(todos: Vec<Todo>) -> Self {
        let mut last_index: HashMap<TodoId, usize> = HashMap::with_capacity(todos.len());
        for (index, todo) in todos.iter().enumerate() {
            last_index.insert(todo.id.clone(), index);
        }
        if last_index.len() == todos.len() {
            return Self { todos };
        }
        let todos = todos
            .into_iter()
            .enumerate()
            .filter(|(index, todo)| last_index.get(&todo.id) == Some(index))
            .map(|(_, todo)| todo)
            .collect();
        Self { todos }
    }

    /// Number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.todos.len()
    }

    /// Whether the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    /// Number of completed items
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|t| t.completed).count()
    }

    /// Looks up an item
    #[must_use]
    pub fn get(&self, id: &TodoId) -> Option<&Todo> {
        self.todos.iter().find(|t| &t.id == id)
    }

    /// Looks up an item mutably
    pub fn get_mut(&mut self, id: &TodoId) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|t| &t.id == id)
    }

    /// Whether an item with this id exists
    #[must_use]
    pub fn contains(&self, id: &TodoId) -> bool {
        self.get(id).is_some()
    }
}

/// Social identity providers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocialProvider {
    /// Google sign-in
    Google,
    /// Facebook login
    Facebook,
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google => f.write_str("Google"),
            Self::Facebook => f.write_str("Facebook"),
        }
    }
}

/// How the current user authenticated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMethod {
    /// Email + password checked against the roster
    #[default]
    Email,
    /// Google sign-in
    Google,
    /// Facebook login
    Facebook,
}

impl From<SocialProvider> for AuthMethod {
    fn from(provider: SocialProvider) -> Self {
        match provider {
            SocialProvider::Google => Self::Google,
            SocialProvider::Facebook => Self::Facebook,
        }
    }
}

/// What a login attempt presents
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Credentials {
    /// Email and password, checked against the roster
    Email {
        /// Account email
        email: String,
        /// Plain-text password
        password: String,
    },
    /// Identity already verified by a social provider
    Social {
        /// Email returned by the provider
        email: String,
        /// The provider that verified it
        provider: SocialProvider,
    },
}

impl Credentials {
    /// Email/password credentials
    #[must_use]
    pub fn email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Email {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Social provider credentials
    #[must_use]
    pub fn social(email: impl Into<String>, provider: SocialProvider) -> Self {
        Self::Social {
            email: email.into(),
            provider,
        }
    }

    /// The email presented
    #[must_use]
    pub fn email_address(&self) -> &str {
        match self {
            Self::Email { email, .. } | Self::Social { email, .. } => email,
        }
    }
}

// Keeps passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email { email, .. } => f
                .debug_struct("Email")
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
            Self::Social { email, provider } => f
                .debug_struct("Social")
                .field("email", email)
                .field("provider", provider)
                .finish(),
        }
    }
}

/// One known account in the local credential roster
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Account email
    pub email: String,
    /// Plain-text password
    pub password: String,
}

impl RosterEntry {
    /// Creates a roster entry
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RosterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RosterEntry")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// The user slice of the root state
///
/// `is_logged_in` implies a non-empty `email`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    /// Email of the signed-in user, empty when signed out
    pub email: String,
    /// Date of birth captured at registration
    pub dob: Option<NaiveDate>,
    /// Profile image URI captured at registration
    pub image: Option<String>,
    /// Whether a user is signed in
    pub is_logged_in: bool,
    /// How the current user signed in
    pub auth_method: AuthMethod,
    /// Known accounts
    pub roster: Vec<RosterEntry>,
}

impl UserState {
    /// Signed-out state with the given roster
    #[must_use]
    pub fn with_roster(roster: Vec<RosterEntry>) -> Self {
        Self {
            roster,
            ..Self::default()
        }
    }

    /// Roster entry for `email`
    #[must_use]
    pub fn find_account(&self, email: &str) -> Option<&RosterEntry> {
        self.roster.iter().find(|entry| entry.email == email)
    }
}

/// Root state
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// Account slice
    pub user: UserState,
    /// To-do slice
    pub todos: TodoState,
}

impl AppState {
    /// Signed-out state with an empty list and the given roster
    #[must_use]
    pub fn with_roster(roster: Vec<RosterEntry>) -> Self {
        Self {
            user: UserState::with_roster(roster),
            todos: TodoState::new(),
        }
    }

    /// Restores the data-model invariants on state read from storage
    ///
    /// A login without an email is dropped and duplicate todo ids collapse to
    /// their last occurrence. Returns `true` if anything changed.
    pub fn repair(&mut self) -> bool {
        let mut repaired = false;

        if self.user.is_logged_in && self.user.email.is_empty() {
            self.user.is_logged_in = false;
            repaired = true;
        }

        let count = self.todos.len();
        self.todos = TodoState::from_unique_last(std::mem::take(&mut self.todos.todos));
        repaired |= self.todos.len() != count;

        repaired
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn todo_id_display_and_serde() {
        let id = TodoId::new("Xk29");
        assert_eq!(id.to_string(), "Xk29");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"Xk29\"");
    }

    #[test]
    fn todo_state_lookup() {
        let state = TodoState {
            todos: vec![Todo::new("a", "milk"), Todo::new("b", "eggs").with_completed(true)],
        };
        assert_eq!(state.len(), 2);
        assert_eq!(state.completed_count(), 1);
        assert_eq!(state.get(&"b".into()).map(|t| t.text.as_str()), Some("eggs"));
        assert!(!state.contains(&"c".into()));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let debug = format!("{:?}", Credentials::email("a@x.com", "hunter2"));
        assert!(debug.contains("a@x.com"));
        assert!(!debug.contains("hunter2"));

        let roster = format!("{:?}", RosterEntry::new("a@x.com", "hunter2"));
        assert!(!roster.contains("hunter2"));
    }

    #[test]
    fn provider_maps_to_auth_method() {
        assert_eq!(AuthMethod::from(SocialProvider::Google), AuthMethod::Google);
        assert_eq!(AuthMethod::from(SocialProvider::Facebook), AuthMethod::Facebook);
    }

    #[test]
    fn from_unique_last_keeps_last_occurrence() {
        let state = TodoState::from_unique_last(vec![
            Todo::new("a", "milk"),
            Todo::new("b", "eggs"),
            Todo::new("a", "oat milk").with_completed(true),
        ]);
        assert_eq!(
            state.todos,
            vec![Todo::new("b", "eggs"), Todo::new("a", "oat milk").with_completed(true)]
        );
    }

    #[test]
    fn repair_clears_login_without_email_and_duplicate_ids() {
        let mut state = AppState::default();
        state.user.is_logged_in = true;
        state.todos.todos = vec![Todo::new("a", "milk"), Todo::new("a", "bread")];

        assert!(state.repair());
        assert!(!state.user.is_logged_in);
        assert_eq!(state.todos.todos, vec![Todo::new("a", "bread")]);

        assert!(!state.repair());
    }

    #[test]
    fn app_state_json_roundtrip() {
        let mut state = AppState::with_roster(vec![RosterEntry::new("a@x.com", "pw1")]);
        state.user.dob = NaiveDate::from_ymd_opt(1990, 4, 2);
        state.todos.todos.push(Todo::new("d1", "milk"));

        let json = serde_json::to_string(&state).unwrap();
        let back: AppState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
