pub mod anamnesis;
pub mod client;
pub mod course;
pub mod knowledge;
pub mod photo;
pub mod session;

pub use anamnesis::Anamnesis;
pub use client::{Client, NewClient};
pub use course::{Course, CourseProgress};
pub use knowledge::{
    ContentCategory, ContentItem, ContentKind, Favorite, ItemFilter, KnowledgeItem,
};
pub use photo::{ClientPhoto, GalleryPhoto, PhotoFields, PhotoFile, PhotoLabel};
pub use session::{AuthState, AuthSummary, Session, SessionChange, SessionEvent, SessionUser};
