//! CLI command implementations.

pub(crate) mod candles;
pub(crate) mod info;
pub(crate) mod pairs;
pub(crate) mod prune;
pub(crate) mod readiness;
pub(crate) mod replay;
pub(crate) mod run;
