mod as_value;
mod cache;
mod clause;
mod config;
mod descriptor;
mod driver;
mod error;
mod field;
mod materialize;
mod model;
mod query;
mod result;
mod session;
mod util;
mod value;
mod writer;

pub use as_value::*;
pub use cache::*;
pub use clause::*;
pub use config::*;
pub use descriptor::*;
pub use driver::*;
pub use error::*;
pub use field::*;
pub use materialize::*;
pub use model::*;
pub use query::*;
pub use result::*;
pub use session::*;
pub use util::*;
pub use value::*;
pub use writer::*;
