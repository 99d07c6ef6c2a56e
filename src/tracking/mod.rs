pub mod monitor;
pub mod registry;
pub mod source;
pub mod state;

pub use monitor::{TrackOutcome, WalletMonitor};
pub use registry::{normalize_address, TrackError, TrackingRegistry};
pub use source::TradeSource;
pub use state::{detect_new_trades, Detection, WalletPollState};
