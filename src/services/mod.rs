pub(crate) mod admin_notify;
pub(crate) mod ai_grading;
pub(crate) mod attempts;
pub(crate) mod grading;
pub(crate) mod rankings;
pub(crate) mod scoring;
pub(crate) mod timers;
