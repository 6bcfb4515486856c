#[macro_use]
mod logging;

pub mod connectivity;
pub mod io;
pub mod layout_store;
pub mod marking;
pub mod settings;
pub mod transmit;

pub use connectivity::{ConnectivityWatcher, LinkEvent};
pub use io::mb3::{SendError, SessionConfig};
pub use logging::{default_log_dir, init_file_logging, stop_file_logging};
pub use marking::{Layout, MalformedRecord, MarkingItem};
pub use settings::{load_settings, save_settings, AppSettings};
pub use transmit::Transmitter;
