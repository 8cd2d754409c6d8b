//! TODO, FIXME, HACK, NOTE and BUG markers left in the source tree.

mod ignore_rules;
mod scanner;
mod todo_data;

pub use scanner::TodoScanner;
pub use todo_data::{Hotspot, MarkerType, TodoItem, TodoReport, TodoStatus};
