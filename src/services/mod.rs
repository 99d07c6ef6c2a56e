pub mod dispatcher;
pub mod notifier;
pub mod trade_poller;
