#![allow(dead_code)]

pub use digenv_test_utils::builders;
pub use digenv_test_utils::recording_launcher;
pub use digenv_test_utils::{init_tracing, with_timeout};
