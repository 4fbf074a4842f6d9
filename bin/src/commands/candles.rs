//! Candles command implementation.

use std::path::{Path, PathBuf};

use anyhow::Result;
use candlewick_lib::CandleQuery;

use crate::display::{Format, load_store, open_archive, parse_instant, parse_timeframe, write_output};

/// Arguments of the candles command.
pub(crate) struct CandlesArgs<'a> {
    pub(crate) symbol: &'a str,
    pub(crate) timeframe: &'a str,
    pub(crate) from: Option<&'a str>,
    pub(crate) to: Option<&'a str>,
    pub(crate) limit: Option<usize>,
    pub(crate) include_pending: bool,
    pub(crate) format: Format,
    pub(crate) output: Option<&'a Path>,
}

/// Read archived candles and print or export them.
pub(crate) fn show_candles(args: &CandlesArgs<'_>, state_dir: Option<PathBuf>) -> Result<()> {
    let timeframe = parse_timeframe(args.timeframe)?;
    let from = args.from.map(parse_instant).transpose()?;
    let to = args.to.map(parse_instant).transpose()?;

    let mut query = CandleQuery::new().between(from, to);
    if let Some(limit) = args.limit {
        query = query.with_limit(limit);
    }
    if args.include_pending {
        query = query.including_pending();
    }

    let archive = open_archive(state_dir, None)?;
    let store = load_store(&archive)?;
    let candles = store.snapshot(timeframe).candles(args.symbol, &query);

    write_output(&candles, args.format, args.output)
}
