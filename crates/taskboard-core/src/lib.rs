pub mod model;
pub mod payload;

pub use model::{Task, TaskDto, TaskStatus, User, UserDto};
pub use payload::{TaskFields, TaskPayload, UserFields, UserPayload};
