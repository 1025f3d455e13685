//! Operator console shared by every host front end.
//!
//! Lines are lexed and parsed by [`grammar`] against the static command
//! catalog in [`catalog`], executed against an [`Eps`](crate::eps::Eps) by
//! [`executor`], and rendered with the helpers in [`status`]. The
//! [`completion`] engine reads the same catalog so suggestions never drift
//! from what the parser accepts.

pub mod catalog;
pub mod completion;
pub mod executor;
pub mod grammar;
pub mod status;
