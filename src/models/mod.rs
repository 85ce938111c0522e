//! The three record kinds served by the registry.

mod exec;
mod student;
mod teacher;

pub use exec::Exec;
pub use student::Student;
pub use teacher::Teacher;
