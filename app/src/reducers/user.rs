//! Reducer for the signed-in user and the local credential roster.
//!
//! Failed logins and registrations leave the state exactly as it was and
//! raise a non-blocking alert through the environment's [`Alerter`].
//!
//! [`Alerter`]: todo_sync_core::environment::Alerter

use crate::actions::UserAction;
use crate::environment::AppEnvironment;
use crate::types::{AuthMethod, Credentials, RosterEntry, UserState};
use todo_sync_core::{alert, effect::Effect, reducer::Reducer, smallvec, SmallVec};

/// Alert shown when an email/password login names an unknown account
pub const USER_NOT_FOUND: &str = "User not found, please register first";
/// Alert shown when the password does not match the roster
pub const INCORRECT_PASSWORD: &str = "Incorrect Password";
/// Alert shown when registering an email that is already in the roster
pub const USER_ALREADY_EXISTS: &str = "User already exists";
/// Alert shown when a sign-in carries no email
pub const EMAIL_REQUIRED: &str = "Email is required";

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";

/// Reducer for the user slice
#[derive(Clone, Debug, Default)]
pub struct UserReducer;

impl UserReducer {
    /// Creates a new `UserReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn sign_in(state: &mut UserState, email: String, method: AuthMethod) {
        tracing::info!(%email, ?method, "User logged in");
        state.email = email;
        state.is_logged_in = true;
        state.auth_method = method;
    }

    fn rejected(env: &AppEnvironment, title: &str, message: &str) -> SmallVec<[Effect<UserAction>; 4]> {
        tracing::warn!(%title, %message, "User action rejected");
        smallvec![alert! {
            alerter: env.alerter,
            title: title,
            message: message
        }]
    }

    fn login(
        state: &mut UserState,
        credentials: Credentials,
        env: &AppEnvironment,
    ) -> SmallVec<[Effect<UserAction>; 4]> {
        match credentials {
            Credentials::Social { email, .. } if email.is_empty() => {
                Self::rejected(env, LOGIN_FAILED, EMAIL_REQUIRED)
            },
            Credentials::Social { email, provider } => {
                Self::sign_in(state, email, provider.into());
                SmallVec::new()
            },
            Credentials::Email { email, password } => match state.find_account(&email) {
                None => Self::rejected(env, LOGIN_FAILED, USER_NOT_FOUND),
                Some(account) if account.password != password => {
                    Self::rejected(env, LOGIN_FAILED, INCORRECT_PASSWORD)
                },
                Some(_) => {
                    Self::sign_in(state, email, AuthMethod::Email);
                    SmallVec::new()
                },
            },
        }
    }
}

impl Reducer for UserReducer {
    type State = UserState;
    type Action = UserAction;
    type Environment = AppEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            UserAction::Login { credentials } => Self::login(state, credentials, env),

            UserAction::Register {
                email,
                password,
                dob,
                image,
            } => {
                if email.is_empty() {
                    return Self::rejected(env, REGISTRATION_FAILED, EMAIL_REQUIRED);
                }
                if state.find_account(&email).is_some() {
                    return Self::rejected(env, REGISTRATION_FAILED, USER_ALREADY_EXISTS);
                }

                state.roster.push(RosterEntry::new(email.clone(), password));
                state.dob = dob;
                state.image = image;
                tracing::info!(%email, "User registered");
                Self::sign_in(state, email, AuthMethod::Email);
                SmallVec::new()
            },

            UserAction::Logout => {
                tracing::info!(email = %state.email, "User logged out");
                state.email.clear();
                state.dob = None;
                state.image = None;
                state.is_logged_in = false;
                SmallVec::new()
            },

            UserAction::SetDob { dob } => {
                state.dob = dob;
                SmallVec::new()
            },

            UserAction::SetImage { image } => {
                state.image = image;
                SmallVec::new()
            },

            UserAction::GoogleSignIn { email } => {
                if email.is_empty() {
                    return Self::rejected(env, LOGIN_FAILED, EMAIL_REQUIRED);
                }
                Self::sign_in(state, email, AuthMethod::Google);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::test_support::test_environment;
    use crate::types::SocialProvider;
    use chrono::NaiveDate;
    use todo_sync_testing::helpers::run_effects;
    use todo_sync_testing::{assertions, ReducerTest};

    fn roster_state() -> UserState {
        UserState::with_roster(vec![RosterEntry::new("a@x.com", "pw1")])
    }

    fn login(email: &str, password: &str) -> UserAction {
        UserAction::Login {
            credentials: Credentials::email(email, password),
        }
    }

    #[test]
    fn email_login_succeeds_with_matching_password() {
        ReducerTest::new(UserReducer::new())
            .with_env(test_environment().env)
            .given_state(roster_state())
            .when_action(login("a@x.com", "pw1"))
            .then_state(|state| {
                assert!(state.is_logged_in);
                assert_eq!(state.email, "a@x.com");
                assert_eq!(state.auth_method, AuthMethod::Email);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[tokio::test]
    async fn unknown_user_alerts_and_leaves_state_identical() {
        let deps = test_environment();
        let mut state = roster_state();
        let before = state.clone();

        let effects = UserReducer.reduce(&mut state, login("b@x.com", "pw1"), &deps.env);

        assert_eq!(state, before);
        assert!(run_effects(effects).await.is_empty());
        assert_eq!(deps.alerter.messages(), vec![USER_NOT_FOUND]);
    }

    #[tokio::test]
    async fn wrong_password_alerts_and_leaves_state_identical() {
        let deps = test_environment();
        let mut state = roster_state();
        let before = state.clone();

        let effects = UserReducer.reduce(&mut state, login("a@x.com", "nope"), &deps.env);

        assert_eq!(state, before);
        run_effects(effects).await;
        assert_eq!(deps.alerter.messages(), vec![INCORRECT_PASSWORD]);
        assert_eq!(deps.alerter.alerts()[0].title, "Login failed");
    }

    #[test]
    fn social_login_records_provider() {
        ReducerTest::new(UserReducer::new())
            .with_env(test_environment().env)
            .given_state(UserState::default())
            .when_action(UserAction::Login {
                credentials: Credentials::social("fb@x.com", SocialProvider::Facebook),
            })
            .then_state(|state| {
                assert!(state.is_logged_in);
                assert_eq!(state.email, "fb@x.com");
                assert_eq!(state.auth_method, AuthMethod::Facebook);
                assert!(state.roster.is_empty());
            })
            .run();
    }

    #[tokio::test]
    async fn social_login_without_email_is_rejected() {
        let deps = test_environment();
        let mut state = UserState::default();

        let effects = UserReducer.reduce(
            &mut state,
            UserAction::Login {
                credentials: Credentials::social("", SocialProvider::Google),
            },
            &deps.env,
        );

        assert!(!state.is_logged_in);
        run_effects(effects).await;
        assert_eq!(deps.alerter.messages(), vec![EMAIL_REQUIRED]);
    }

    #[test]
    fn register_appends_and_logs_in() {
        let dob = NaiveDate::from_ymd_opt(1994, 7, 12);
        ReducerTest::new(UserReducer::new())
            .with_env(test_environment().env)
            .given_state(roster_state())
            .when_action(UserAction::Register {
                email: "new@x.com".into(),
                password: "secret1".into(),
                dob,
                image: Some("file:///avatar.png".into()),
            })
            .then_state(move |state| {
                assert_eq!(state.roster.len(), 2);
                assert_eq!(state.roster[1], RosterEntry::new("new@x.com", "secret1"));
                assert!(state.is_logged_in);
                assert_eq!(state.email, "new@x.com");
                assert_eq!(state.dob, dob);
                assert_eq!(state.image.as_deref(), Some("file:///avatar.png"));
            })
            .run();
    }

    #[tokio::test]
    async fn duplicate_registration_alerts_and_leaves_state_identical() {
        let deps = test_environment();
        let mut state = roster_state();
        let before = state.clone();

        let effects = UserReducer.reduce(
            &mut state,
            UserAction::Register {
                email: "a@x.com".into(),
                password: "pw2".into(),
                dob: None,
                image: None,
            },
            &deps.env,
        );

        assert_eq!(state, before);
        run_effects(effects).await;
        assert_eq!(deps.alerter.messages(), vec![USER_ALREADY_EXISTS]);
    }

    #[test]
    fn register_then_login_round_trip() {
        ReducerTest::new(UserReducer::new())
            .with_env(test_environment().env)
            .given_state(roster_state())
            .when_actions([
                UserAction::Register {
                    email: "c@x.com".into(),
                    password: "pw3".into(),
                    dob: None,
                    image: None,
                },
                UserAction::Logout,
                login("c@x.com", "pw3"),
            ])
            .then_state(|state| {
                assert!(state.is_logged_in);
                assert_eq!(state.email, "c@x.com");
            })
            .run();
    }

    #[test]
    fn logout_clears_profile_but_keeps_roster() {
        ReducerTest::new(UserReducer::new())
            .with_env(test_environment().env)
            .given_state(roster_state())
            .when_actions([
                login("a@x.com", "pw1"),
                UserAction::SetDob {
                    dob: NaiveDate::from_ymd_opt(2000, 1, 1),
                },
                UserAction::SetImage {
                    image: Some("file:///me.png".into()),
                },
                UserAction::Logout,
            ])
            .then_state(|state| {
                assert!(!state.is_logged_in);
                assert!(state.email.is_empty());
                assert_eq!(state.dob, None);
                assert_eq!(state.image, None);
                assert_eq!(state.roster.len(), 1);
            })
            .run();
    }

    #[test]
    fn google_sign_in_marks_method() {
        ReducerTest::new(UserReducer::new())
            .with_env(test_environment().env)
            .given_state(UserState::default())
            .when_action(UserAction::GoogleSignIn {
                email: "g@x.com".into(),
            })
            .then_state(|state| {
                assert!(state.is_logged_in);
                assert_eq!(state.auth_method, AuthMethod::Google);
            })
            .run();
    }
}
