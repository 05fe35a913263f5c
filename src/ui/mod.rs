pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, summary_row, success, timing, warn};
pub use progress::SearchProgress;
pub use table::{languages_table, TableBuilder};
pub use theme::{theme, Theme};
