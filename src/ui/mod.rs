pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    dim, error, foreign_key_block, header, info, muted, retrieval_summary, schema_block, section, status, success,
    warn,
};
pub use progress::Spinner;
pub use table::{DatabaseRow, ScoreRow, TableBuilder};
pub use theme::{theme, Theme};
