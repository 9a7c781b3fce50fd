//! Macros shared across the API crate.

/// Implement `FromRef<AppState>` for a field of the application state, so
/// handlers can extract it directly with `State<T>`.
///
/// # Example
/// ```ignore
/// crate::impl_from_ref!(Arc<EventsCache>, events_cache);
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
