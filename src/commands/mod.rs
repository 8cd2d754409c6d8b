mod common;
mod detail;
mod init;
mod refresh;
mod summary;
mod truncate;
mod validate;
mod watch;

pub use common::{GlobalArgs, init_logging};
pub use detail::{DetailArgs, detail};
pub use init::{InitArgs, init_config};
pub use refresh::{RefreshArgs, refresh};
pub use summary::{SummaryArgs, summary};
pub use truncate::{TruncateArgs, truncate_log};
pub use validate::validate_config;
pub use watch::{WatchArgs, watch};
