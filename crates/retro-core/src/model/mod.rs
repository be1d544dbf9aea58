//! Domain types for retrospectives and the collections built from them.

pub mod catalogue;
pub mod draft;
pub mod feedback;
pub mod notification;
pub mod retro;
pub mod trip;

pub use retro::{Attendee, Category, Comment, Location, Photo, RbtItem, Reaction, Retrospective};
