pub(crate) mod answers;
pub(crate) mod attempts;
pub(crate) mod papers;
pub(crate) mod purchases;
pub(crate) mod questions;
pub(crate) mod rankings;
pub(crate) mod store;
pub(crate) mod users;
