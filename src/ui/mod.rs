pub mod icons;
pub mod output;
pub mod progress;
pub mod progress_message;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{alias_arrow, dim, header, info, module_line, section, status, success, summary_row};
pub use progress::{ProgressManager, Spinner};
pub use progress_message::{ProgressMessage, ProgressPhase};
pub use table::{routes_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
