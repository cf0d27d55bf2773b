use fetch::{fetch_all, Transport};
use std::path::PathBuf;
use tracing::{info, warn};
use upstream::{EmptyPolicy, Upstream};

pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod item;
pub mod upstream;

pub use error::Error;
pub use item::ListItem;

/// What an export run produced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Records fetched from the upstream.
    pub count: usize,
    /// Files written, in the order they were written.
    pub written: Vec<PathBuf>,
}

/// Fetch an upstream's whole collection and write its export files.
///
/// Nothing is written unless every page was fetched. Every export is staged
/// in a temp file first and only moved into place once all of them were
/// staged, so a failed write leaves all previous exports in place.
pub fn dump<T>(upstream: &Upstream, transport: &T) -> Result<ExportSummary, Error>
where
    T: Transport + ?Sized,
{
    info!("fetching {} from {}", upstream.noun, upstream.name);
    let items = fetch_all(transport, &upstream.endpoint)?;

    if items.is_empty() {
        match upstream.on_empty {
            EmptyPolicy::Skip => {
                warn!("no {} found, leaving existing exports alone", upstream.noun);
                return Ok(ExportSummary::default());
            }
            EmptyPolicy::Fail => return Err(Error::Empty { noun: upstream.noun }),
            EmptyPolicy::Write => {}
        }
    }

    let mut staged = Vec::new();
    if let Some(path) = &upstream.json {
        staged.push(export::stage_json(&items, path)?);
    }
    if let Some(csv) = &upstream.csv {
        staged.push(export::stage_csv(&items, &csv.layout, &csv.path)?);
    }

    let written: Vec<PathBuf> = staged
        .into_iter()
        .map(export::Staged::commit)
        .collect::<Result<_, _>>()?;

    Ok(ExportSummary {
        count: items.len(),
        written,
    })
}
