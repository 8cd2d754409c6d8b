//! Style-lint offenses and the derived code health score.

mod collector;
mod style_data;

pub use collector::StyleCollector;
pub use style_data::{Offense, StyleReport, StyleStatus};
