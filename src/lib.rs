mod codec;
mod error;
mod model;
mod report;
mod tempo;
mod util;

pub use codec::queue::*;
pub use codec::*;
pub use error::*;
pub use model::config::*;
pub use model::note::*;
pub use model::token::*;
pub use model::vocabulary::*;
pub use report::*;
pub use tempo::*;
pub use util::*;
