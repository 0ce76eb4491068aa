//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants, particularly
//! for remote collection writes and user-facing alerts.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use todo_sync_core::async_effect;
///
/// async_effect! {
///     let id = remote.add("todos", fields).await.ok()?;
///     Some(TodoAction::Add { id: id.into(), text })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Future` performing one write against a remote collection
///
/// The `remote` handle is cloned into the effect and bound to the name given
/// in the `write` closure. Exactly one of `on_success` / `on_error` runs, and
/// its `Option<Action>` is fed back into the store.
///
/// # Example
///
/// ```rust,ignore
/// use todo_sync_core::remote_write;
///
/// remote_write! {
///     remote: env.remote,
///     write: |remote| remote.delete(&collection, &id),
///     on_success: |()| Some(TodoAction::Delete { id }),
///     on_error: |error| Some(TodoAction::WriteFailed { operation: WriteOp::Delete, error: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! remote_write {
    (
        remote: $remote:expr,
        write: |$handle:ident| $write:expr,
        on_success: |$success_param:pat_param| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::Future(::std::boxed::Box::pin({
            let $handle = ::std::sync::Arc::clone(&$remote);
            async move {
                match $write.await {
                    ::std::result::Result::Ok($success_param) => $success_body,
                    ::std::result::Result::Err($error_param) => $error_body,
                }
            }
        }))
    };
}

/// Create an `Effect::Future` that raises a user-facing alert and produces no action
///
/// # Example
///
/// ```rust,ignore
/// use todo_sync_core::alert;
///
/// alert! {
///     alerter: env.alerter,
///     title: "Login failed",
///     message: "Incorrect Password"
/// }
/// ```
#[macro_export]
macro_rules! alert {
    (
        alerter: $alerter:expr,
        title: $title:expr,
        message: $message:expr
    ) => {
        $crate::effect::Effect::Future(::std::boxed::Box::pin({
            let alerter = ::std::sync::Arc::clone(&$alerter);
            let title: ::std::string::String = ::std::string::ToString::to_string(&$title);
            let message: ::std::string::String = ::std::string::ToString::to_string(&$message);
            async move {
                alerter.alert(&title, &message);
                ::std::option::Option::None
            }
        }))
    };
}
