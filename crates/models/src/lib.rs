pub mod assignment;
pub mod athlete;
pub mod column;
pub mod id;
pub mod program;

pub use assignment::{ACTIVE_STATUS, Assignment, CreateAssignment};
pub use athlete::Athlete;
pub use column::{ColumnId, UNASSIGNED_COLUMN_ID};
pub use id::EntityId;
pub use program::Program;
