use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::market::PriceQuote;
use crate::models::portfolio::Portfolio;
use crate::models::transaction::Transaction;
use crate::storage::transaction_log::TransactionLogFile;

/// Slack allowed when selling the whole position after float accumulation.
const QUANTITY_EPSILON: f64 = 1e-9;

/// Notified after every successful mutation of the ledger.
pub trait HoldingsListener: Send + Sync {
    fn holdings_changed(&self, holdings: &[Holding]);
}

/// Channel-based subscription: each change is sent as a full snapshot.
impl HoldingsListener for mpsc::UnboundedSender<Vec<Holding>> {
    fn holdings_changed(&self, holdings: &[Holding]) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.send(holdings.to_vec());
    }
}

/// Owns the transaction log and the holdings derived from it.
///
/// Holdings are always a pure function of the log (replayed in ascending
/// date order) plus the latest price quotes and favorite flags. All
/// mutations are synchronous; listeners hear about each successful one
/// exactly once, after it is fully applied. Failed operations change
/// nothing and publish nothing.
pub struct HoldingsLedger {
    /// Sorted by date, ties in insertion order
    transactions: Vec<Transaction>,
    holdings: Vec<Holding>,
    quotes: HashMap<String, PriceQuote>,
    favorites: HashSet<String>,
    store: Option<TransactionLogFile>,
    listeners: Vec<Box<dyn HoldingsListener>>,
}

impl std::fmt::Debug for HoldingsLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoldingsLedger")
            .field("transactions", &self.transactions.len())
            .field("holdings", &self.holdings.len())
            .field("quotes", &self.quotes.len())
            .field("persistent", &self.store.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl HoldingsLedger {
    /// In-memory ledger with no persistence.
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
            holdings: Vec::new(),
            quotes: HashMap::new(),
            favorites: HashSet::new(),
            store: None,
            listeners: Vec::new(),
        }
    }

    /// Ledger backed by a transaction log file.
    ///
    /// A file that does not parse is moved aside (see
    /// [`TransactionLogFile::quarantine`]) and the ledger starts empty; the
    /// original bytes are never overwritten. Any other read failure, or a
    /// log that cannot be replayed (e.g. a sell with nothing held), is an
    /// error.
    pub fn open(store: TransactionLogFile) -> Result<Self, CoreError> {
        let transactions = match store.load() {
            Ok(txs) => txs,
            Err(e @ CoreError::Deserialization(_)) => {
                let moved = store.quarantine()?;
                warn!(
                    path = %store.path().display(),
                    moved_to = %moved.display(),
                    error = %e,
                    "transaction log unreadable, moved aside"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let mut ledger = Self::new();
        ledger.holdings = Self::rebuild_from(&transactions)?;
        ledger.transactions = transactions;
        ledger.transactions.sort_by_key(|t| t.date);
        ledger.store = Some(store);
        info!(transactions = ledger.transactions.len(), "ledger loaded");
        Ok(ledger)
    }

    // ── Subscriptions ───────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: Box<dyn HoldingsListener>) {
        self.listeners.push(listener);
    }

    /// Subscribe through a channel; every change arrives as a full snapshot.
    pub fn subscribe_channel(&mut self) -> mpsc::UnboundedReceiver<Vec<Holding>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(Box::new(tx));
        rx
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    /// Holding for `symbol`, case-insensitive.
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.matches_symbol(symbol))
    }

    /// The log in ascending date order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Transactions for one coin, newest first.
    pub fn transactions_for(&self, symbol: &str) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .rev()
            .filter(|t| t.coin_symbol.eq_ignore_ascii_case(symbol.trim()))
            .collect()
    }

    pub fn quote(&self, symbol: &str) -> Option<&PriceQuote> {
        self.quotes.get(&symbol.trim().to_uppercase())
    }

    pub fn snapshot(&self) -> Portfolio {
        Portfolio::new(self.holdings.clone(), self.transactions.clone())
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Append a transaction and update holdings.
    ///
    /// Applied incrementally when it is the newest record; a back-dated
    /// record triggers a full rebuild so later sells see the right history.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), CoreError> {
        tx.validate()?;
        if self.transaction(tx.id).is_some() {
            return Err(CoreError::ValidationError(format!(
                "Transaction {} already exists",
                tx.id
            )));
        }

        let pos = self.transactions.partition_point(|t| t.date <= tx.date);
        if pos == self.transactions.len() {
            let mut holdings = self.holdings.clone();
            Self::apply(&tx, &mut holdings)?;
            self.holdings = holdings;
            self.transactions.push(tx);
        } else {
            let mut candidate = self.transactions.clone();
            candidate.insert(pos, tx);
            self.holdings = Self::rebuild_from(&candidate)?;
            self.transactions = candidate;
        }

        self.decorate();
        self.persist();
        self.publish();
        Ok(())
    }

    /// Add several records at once. All-or-nothing; one publish.
    pub fn add_transactions(&mut self, txs: Vec<Transaction>) -> Result<(), CoreError> {
        if txs.is_empty() {
            return Ok(());
        }
        let mut candidate = self.transactions.clone();
        for tx in txs {
            tx.validate()?;
            if candidate.iter().any(|t| t.id == tx.id) {
                return Err(CoreError::ValidationError(format!(
                    "Transaction {} already exists",
                    tx.id
                )));
            }
            let pos = candidate.partition_point(|t| t.date <= tx.date);
            candidate.insert(pos, tx);
        }
        self.holdings = Self::rebuild_from(&candidate)?;
        self.transactions = candidate;

        self.decorate();
        self.persist();
        self.publish();
        Ok(())
    }

    /// Replace the manual transaction `old_id` with `new` and rebuild.
    ///
    /// Rejected with [`CoreError::InvalidEdit`] for synced records. If the
    /// edited history cannot be replayed the ledger is left untouched.
    pub fn update_transaction(&mut self, old_id: Uuid, new: Transaction) -> Result<(), CoreError> {
        let idx = self.position_of_editable(old_id)?;
        new.validate()?;
        if new.id != old_id && self.transaction(new.id).is_some() {
            return Err(CoreError::ValidationError(format!(
                "Transaction {} already exists",
                new.id
            )));
        }

        let mut candidate = self.transactions.clone();
        candidate.remove(idx);
        let pos = candidate.partition_point(|t| t.date <= new.date);
        candidate.insert(pos, new);

        self.holdings = Self::rebuild_from(&candidate)?;
        self.transactions = candidate;
        debug!(%old_id, "transaction updated, holdings rebuilt");

        self.decorate();
        self.persist();
        self.publish();
        Ok(())
    }

    /// Remove a manual transaction and rebuild. Returns the removed record.
    pub fn delete_transaction(&mut self, id: Uuid) -> Result<Transaction, CoreError> {
        let idx = self.position_of_editable(id)?;

        let mut candidate = self.transactions.clone();
        let removed = candidate.remove(idx);

        self.holdings = Self::rebuild_from(&candidate)?;
        self.transactions = candidate;
        debug!(%id, "transaction deleted, holdings rebuilt");

        self.decorate();
        self.persist();
        self.publish();
        Ok(removed)
    }

    /// Recompute holdings from the current log.
    pub fn rebuild(&mut self) -> Result<(), CoreError> {
        self.holdings = Self::rebuild_from(&self.transactions)?;
        self.decorate();
        self.publish();
        Ok(())
    }

    /// Apply the latest price feed. Quotes for coins not held are kept
    /// so a later buy picks them up.
    pub fn update_prices(&mut self, quotes: &[PriceQuote]) {
        for quote in quotes {
            self.quotes
                .insert(quote.symbol.trim().to_uppercase(), quote.clone());
        }
        self.decorate();
        self.publish();
    }

    pub fn set_favorite(&mut self, symbol: &str, favorite: bool) {
        let key = symbol.trim().to_uppercase();
        if favorite {
            self.favorites.insert(key);
        } else {
            self.favorites.remove(&key);
        }
        self.decorate();
        self.publish();
    }

    // ── Derivation ──────────────────────────────────────────────────

    /// Apply one transaction to a holdings list.
    ///
    /// - Buy: quantity-weighted average of the old basis and the buy price;
    ///   a new holding starts at the buy price.
    /// - Sell: reduces quantity, never touches the basis. Selling a coin not
    ///   held, or more than is held, is [`CoreError::InvalidSell`] and leaves
    ///   `holdings` unchanged. A position sold down to zero is removed.
    pub fn apply(tx: &Transaction, holdings: &mut Vec<Holding>) -> Result<(), CoreError> {
        let idx = holdings.iter().position(|h| h.matches_symbol(&tx.coin_symbol));

        if tx.is_buy {
            match idx {
                None => holdings.push(Holding::new(&tx.coin_symbol, tx.quantity, tx.price_per_unit)),
                Some(i) => {
                    let h = &mut holdings[i];
                    let new_qty = h.quantity + tx.quantity;
                    h.average_cost_basis = if new_qty.abs() < f64::EPSILON {
                        0.0
                    } else {
                        (h.average_cost_basis * h.quantity + tx.price_per_unit * tx.quantity)
                            / new_qty
                    };
                    h.quantity = new_qty;
                }
            }
            return Ok(());
        }

        let i = idx.ok_or_else(|| CoreError::InvalidSell {
            symbol: tx.coin_symbol.clone(),
            message: "no holding to sell from".into(),
        })?;
        let held = holdings[i].quantity;
        if tx.quantity > held + QUANTITY_EPSILON {
            return Err(CoreError::InvalidSell {
                symbol: tx.coin_symbol.clone(),
                message: format!("cannot sell {} when only {} is held", tx.quantity, held),
            });
        }

        let remaining = held - tx.quantity;
        if remaining <= QUANTITY_EPSILON {
            holdings.remove(i);
        } else {
            holdings[i].quantity = remaining;
        }
        Ok(())
    }

    /// Replay a log from scratch in ascending date order.
    /// Prices and favorites are not applied.
    pub fn rebuild_from(transactions: &[Transaction]) -> Result<Vec<Holding>, CoreError> {
        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        ordered.sort_by_key(|t| t.date);

        let mut holdings = Vec::new();
        for tx in ordered {
            Self::apply(tx, &mut holdings)?;
        }
        Ok(holdings)
    }

    // ── Internal ────────────────────────────────────────────────────

    fn position_of_editable(&self, id: Uuid) -> Result<usize, CoreError> {
        let idx = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
        if !self.transactions[idx].is_manual {
            return Err(CoreError::InvalidEdit(format!(
                "transaction {id} was synced from an exchange and is read-only"
            )));
        }
        Ok(idx)
    }

    /// Overlay quotes and favorite flags onto the derived holdings.
    fn decorate(&mut self) {
        for h in &mut self.holdings {
            match self.quotes.get(&h.coin_symbol) {
                Some(q) => {
                    h.current_price = q.price;
                    h.daily_change_percent = q.change_percent_24h;
                }
                None => {
                    h.current_price = 0.0;
                    h.daily_change_percent = 0.0;
                }
            }
            h.is_favorite = self.favorites.contains(&h.coin_symbol);
        }
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.transactions) {
                warn!(path = %store.path().display(), error = %e, "failed to persist transaction log");
            }
        }
    }

    fn publish(&self) {
        for listener in &self.listeners {
            listener.holdings_changed(&self.holdings);
        }
    }
}

impl Default for HoldingsLedger {
    fn default() -> Self {
        Self::new()
    }
}
