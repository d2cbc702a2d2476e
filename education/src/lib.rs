// education/src/lib.rs
pub mod backend;
pub mod models;
pub mod repository;
pub mod rest;

pub use backend::{Backend, Query};
pub use models::{Course, CourseUpdate, Lesson, LessonFilter};
pub use repository::{EducationCaches, EducationRepository};
pub use rest::RestBackend;
