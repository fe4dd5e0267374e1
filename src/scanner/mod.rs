//! State Scanner
//!
//! Fetches every account of a program that passes the server-side filters and
//! hands them out as a single-use [`Scan`]. Client-side predicates that the
//! network cannot evaluate (for example `amount == 1`) run on the decoded
//! records afterwards.

pub mod holder;

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tracing::{debug, warn};

use crate::codec::AccountRecord;
use crate::metrics::Metrics;
use crate::rpc_manager::{AccountFilter, LedgerNetwork, NetworkError, RawAccount};

pub use holder::{find_target_record, holder_filters, select_sole_unit_holder, LookupError};

#[derive(Error, Debug, Clone)]
pub enum ScanError {
    /// The fetch failed; no partial result is returned
    #[error("Scan of program {program} failed: {source}")]
    ScanFailed {
        program: Pubkey,
        #[source]
        source: NetworkError,
    },
}

impl ScanError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ScanFailed { source, .. } => source.is_retryable(),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::ScanFailed { source, .. } => source.category(),
        }
    }
}

/// Accounts returned by one scan call
///
/// Finite and consumed once; scanning again requires a new call and reflects
/// the network state at that later time.
#[derive(Debug)]
pub struct Scan {
    program: Pubkey,
    entries: std::vec::IntoIter<RawAccount>,
    metrics: Arc<Metrics>,
}

impl Iterator for Scan {
    type Item = RawAccount;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for Scan {}

impl Scan {
    pub fn program(&self) -> &Pubkey {
        &self.program
    }

    /// Decode each entry as `T`, dropping entries that fail with a warning
    pub fn decoded<T: AccountRecord>(self) -> impl Iterator<Item = (Pubkey, T)> {
        let Scan {
            program,
            entries,
            metrics,
        } = self;
        entries.filter_map(move |(address, data)| match T::decode(&data) {
            Ok(record) => Some((address, record)),
            Err(err) => {
                metrics.scan_entries_dropped.inc();
                warn!(
                    program = %program,
                    address = %address,
                    record = T::RECORD,
                    error = %err,
                    "Skipping account that does not decode"
                );
                None
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct StateScanner {
    network: Arc<dyn LedgerNetwork>,
    metrics: Arc<Metrics>,
}

impl StateScanner {
    pub fn new(network: Arc<dyn LedgerNetwork>, metrics: Arc<Metrics>) -> Self {
        Self { network, metrics }
    }

    /// Fetch all accounts of `program` matching every filter
    pub async fn scan(&self, program: &Pubkey, filters: &[AccountFilter]) -> Result<Scan, ScanError> {
        self.metrics.scans_total.inc();
        let entries = self
            .network
            .get_program_accounts(program, filters)
            .await
            .map_err(|source| ScanError::ScanFailed {
                program: *program,
                source,
            })?;

        debug!(program = %program, filters = filters.len(), count = entries.len(), "Scan complete");
        Ok(Scan {
            program: *program,
            entries: entries.into_iter(),
            metrics: Arc::clone(&self.metrics),
        })
    }

    /// Number of accounts currently owned by `program`
    pub async fn count(&self, program: &Pubkey) -> Result<usize, ScanError> {
        Ok(self.scan(program, &[]).await?.len())
    }
}
