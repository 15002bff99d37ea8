//! The timeline engine: date axis, display rows, grid layout, pointer
//! gestures and the structural self-check, tied together by [`Session`].

pub mod axis;
pub mod baseline;
pub mod grid;
pub mod interact;
pub mod qa;
pub mod rows;
pub mod session;
pub mod widths;

pub use session::{HitRow, Release, Session, Viewport};
