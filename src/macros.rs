#![allow(unused_macros)]

/// Helper macro for locking items
///
/// Resolves to a `Result`, poisoned locks surface as [`crate::Error::LockError`].
///
/// ```rust, ignore
///  let mut data = lock!(my_mutex)?;
///  data.some_field = 42;
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().map_err(|_| crate::Error::LockError)
    };
}
