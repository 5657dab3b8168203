mod connection;
mod prepared;
mod state;
mod transaction;

pub use connection::*;
pub use prepared::*;
pub use state::Call;
pub use transaction::*;

use log::LevelFilter;
use quarry_core::RawRow;
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Row of text columns, `None` being SQL `NULL`.
pub fn text_row<'a>(columns: impl IntoIterator<Item = Option<&'a str>>) -> RawRow {
    RawRow::new(
        columns
            .into_iter()
            .map(|v| v.map(|v| v.as_bytes().into())),
    )
}
