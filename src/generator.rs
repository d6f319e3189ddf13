//! Synthetic accounts, positions, and trades for demos and tests.

use crate::domain::{
    Account, AccountNumber, Catalog, Money, Position, Symbol, Trade, TradeId, TradeIdError,
    TradeType,
};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

/// Smallest generated cash balance or unit price, in cents.
const MIN_AMOUNT_CENTS: i64 = 100_000;
/// Largest generated cash balance or unit price, in cents.
const MAX_AMOUNT_CENTS: i64 = 10_000_000;
const MAX_QUANTITY: i32 = 500;
const MAX_SHARES: i32 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("cannot place {requested} unique positions: only {available} account/instrument pairs exist")]
    PositionsExhausted { requested: usize, available: usize },
    #[error("cannot generate {0} without accounts")]
    NoAccounts(&'static str),
    #[error("catalog has no {0}")]
    EmptyCatalog(&'static str),
    #[error(transparent)]
    TradeId(#[from] TradeIdError),
}

/// How much data to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub accounts: usize,
    pub positions: usize,
    pub trades: usize,
    /// First and last day (inclusive) trade dates are drawn from.
    pub first_trade_day: NaiveDate,
    pub last_trade_day: NaiveDate,
    /// Fixed seed for reproducible output; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            accounts: 10,
            positions: 100,
            trades: 1000,
            first_trade_day: NaiveDate::from_ymd_opt(2013, 1, 1).unwrap_or_default(),
            last_trade_day: NaiveDate::from_ymd_opt(2022, 8, 31).unwrap_or_default(),
            seed: None,
        }
    }
}

/// One consistent generated run. Positions and trades only reference
/// accounts in `accounts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub accounts: Vec<Account>,
    pub positions: Vec<Position>,
    pub trades: Vec<Trade>,
}

/// Synthetic data generator
pub struct Generator {
    catalog: Catalog,
    config: GeneratorConfig,
    rng: StdRng,
}

impl Generator {
    pub fn new(catalog: Catalog, config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            catalog,
            config,
            rng,
        }
    }

    /// Generate accounts, then positions and trades over those accounts.
    pub fn generate(&mut self) -> Result<Dataset, GeneratorError> {
        let accounts = self.accounts(self.config.accounts)?;
        let positions = self.positions(&accounts, self.config.positions)?;
        let trades = self.trades(&accounts, self.config.trades)?;
        info!(
            "Generated {} accounts, {} positions, {} trades",
            accounts.len(),
            positions.len(),
            trades.len()
        );
        Ok(Dataset {
            accounts,
            positions,
            trades,
        })
    }

    pub fn accounts(&mut self, count: usize) -> Result<Vec<Account>, GeneratorError> {
        if count > 0 && self.catalog.users().is_empty() {
            return Err(GeneratorError::EmptyCatalog("users"));
        }
        let mut accounts = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(user) = self.catalog.users().choose(&mut self.rng) else {
                break;
            };
            let user = user.clone();
            accounts.push(Account {
                username: user.username,
                account_number: AccountNumber::from_random_bytes(self.rng.gen()),
                name: user.name,
                cash_balance: self.amount(),
            });
        }
        Ok(accounts)
    }

    /// Sample unique (account, instrument) pairs by rejection.
    ///
    /// Repeated accounts or symbols count once.
    ///
    /// # Errors
    /// Fails up front when `count` exceeds the number of distinct pairs.
    pub fn positions(
        &mut self,
        accounts: &[Account],
        count: usize,
    ) -> Result<Vec<Position>, GeneratorError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if accounts.is_empty() {
            return Err(GeneratorError::NoAccounts("positions"));
        }
        let mut seen = HashSet::new();
        let owners: Vec<AccountNumber> = accounts
            .iter()
            .map(|a| a.account_number.clone())
            .filter(|n| seen.insert(n.clone()))
            .collect();
        let mut seen = HashSet::new();
        let symbols: Vec<Symbol> = self
            .catalog
            .instruments()
            .iter()
            .filter(|s| seen.insert(*s))
            .cloned()
            .collect();
        let available = owners.len() * symbols.len();
        if count > available {
            return Err(GeneratorError::PositionsExhausted {
                requested: count,
                available,
            });
        }

        let mut used: HashSet<(AccountNumber, Symbol)> = HashSet::with_capacity(count);
        let mut positions = Vec::with_capacity(count);
        while positions.len() < count {
            let account = owners[self.rng.gen_range(0..owners.len())].clone();
            let symbol = symbols[self.rng.gen_range(0..symbols.len())].clone();
            if !used.insert((account.clone(), symbol.clone())) {
                continue;
            }
            positions.push(Position {
                account,
                symbol,
                quantity: self.rng.gen_range(1..=MAX_QUANTITY),
            });
        }
        Ok(positions)
    }

    pub fn trades(&mut self, accounts: &[Account], count: usize) -> Result<Vec<Trade>, GeneratorError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if accounts.is_empty() {
            return Err(GeneratorError::NoAccounts("trades"));
        }

        let mut trades = Vec::with_capacity(count);
        for _ in 0..count {
            let trade_id = self.trade_id()?;
            let account = self.pick_account(accounts);
            let symbol = self.pick_symbol()?;
            let trade_type = if self.rng.gen_bool(0.5) {
                TradeType::Buy
            } else {
                TradeType::Sell
            };
            let shares = self.rng.gen_range(1..=MAX_SHARES);
            let price = self.amount();
            trades.push(Trade::new(account, trade_id, trade_type, symbol, shares, price));
        }
        Ok(trades)
    }

    fn amount(&mut self) -> Money {
        Money::from_cents(self.rng.gen_range(MIN_AMOUNT_CENTS..=MAX_AMOUNT_CENTS))
    }

    fn pick_account(&mut self, accounts: &[Account]) -> AccountNumber {
        let index = self.rng.gen_range(0..accounts.len());
        accounts[index].account_number.clone()
    }

    fn pick_symbol(&mut self) -> Result<Symbol, GeneratorError> {
        self.catalog
            .instruments()
            .choose(&mut self.rng)
            .cloned()
            .ok_or(GeneratorError::EmptyCatalog("instruments"))
    }

    /// Time UUID at midnight of a uniformly random day in the configured window.
    fn trade_id(&mut self) -> Result<TradeId, GeneratorError> {
        let span = (self.config.last_trade_day - self.config.first_trade_day)
            .num_days()
            .max(0) as u64;
        let day = self.config.first_trade_day + chrono::Days::new(self.rng.gen_range(0..=span));
        let clock_seq = self.rng.gen::<u16>() & 0x3fff;
        let node: [u8; 6] = self.rng.gen();
        Ok(TradeId::from_date(day, clock_seq, node)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;

    fn seeded(accounts: usize, positions: usize, trades: usize) -> Generator {
        Generator::new(
            Catalog::demo(),
            GeneratorConfig {
                accounts,
                positions,
                trades,
                seed: Some(42),
                ..GeneratorConfig::default()
            },
        )
    }

    #[test]
    fn test_default_counts() {
        let dataset = Generator::new(Catalog::demo(), GeneratorConfig::default())
            .generate()
            .unwrap();
        assert_eq!(dataset.accounts.len(), 10);
        assert_eq!(dataset.positions.len(), 100);
        assert_eq!(dataset.trades.len(), 1000);
    }

    #[test]
    fn test_accounts_use_roster_and_bounds() {
        let catalog = Catalog::demo();
        let accounts = seeded(50, 0, 0).accounts(50).unwrap();
        for account in &accounts {
            let user = catalog
                .users()
                .iter()
                .find(|u| u.username == account.username)
                .expect("unknown user");
            assert_eq!(user.name, account.name);
            assert!(account.cash_balance >= Money::from_cents(MIN_AMOUNT_CENTS));
            assert!(account.cash_balance <= Money::from_cents(MAX_AMOUNT_CENTS));
            assert_eq!(account.cash_balance.inner().scale(), 2);
        }
        let unique: HashSet<_> = accounts.iter().map(|a| &a.account_number).collect();
        assert_eq!(unique.len(), 50);
    }

    #[test]
    fn test_positions_are_unique_pairs() {
        let dataset = seeded(10, 100, 0).generate().unwrap();
        let pairs: HashSet<_> = dataset
            .positions
            .iter()
            .map(|p| (p.account.clone(), p.symbol.clone()))
            .collect();
        assert_eq!(pairs.len(), 100);
        assert!(dataset
            .positions
            .iter()
            .all(|p| (1..=MAX_QUANTITY).contains(&p.quantity)));
    }

    #[test]
    fn test_positions_can_fill_every_pair() {
        let dataset = seeded(2, 56, 0).generate().unwrap();
        assert_eq!(dataset.positions.len(), 56);
    }

    #[test]
    fn test_positions_exhaustion_fails_fast() {
        let err = seeded(2, 57, 0).generate().unwrap_err();
        assert_eq!(
            err,
            GeneratorError::PositionsExhausted {
                requested: 57,
                available: 56
            }
        );
    }

    #[test]
    fn test_no_accounts() {
        assert_eq!(
            seeded(0, 1, 0).generate().unwrap_err(),
            GeneratorError::NoAccounts("positions")
        );
        assert_eq!(
            seeded(0, 0, 1).generate().unwrap_err(),
            GeneratorError::NoAccounts("trades")
        );
        assert_eq!(seeded(0, 0, 0).generate().unwrap(), Dataset::default());
    }

    #[test]
    fn test_trades_amount_and_dates() {
        let config = GeneratorConfig::default();
        let dataset = seeded(10, 0, 500).generate().unwrap();
        let accounts: HashSet<_> = dataset.accounts.iter().map(|a| &a.account_number).collect();
        for trade in &dataset.trades {
            assert_eq!(trade.amount, trade.price.times(trade.shares));
            assert!((1..=MAX_SHARES).contains(&trade.shares));
            assert!(trade.price >= Money::from_cents(MIN_AMOUNT_CENTS));
            assert!(trade.price <= Money::from_cents(MAX_AMOUNT_CENTS));
            assert!(trade.trade_date() >= config.first_trade_day);
            assert!(trade.trade_date() <= config.last_trade_day);
            assert!(accounts.contains(&trade.account));
        }
        let ids: HashSet<_> = dataset.trades.iter().map(|t| t.trade_id).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = seeded(3, 5, 5).generate().unwrap();
        let b = seeded(3, 5, 5).generate().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_catalog() {
        let mut generator = Generator::new(
            Catalog::new(vec![User::new("solo", "Solo")], vec![]),
            GeneratorConfig {
                accounts: 1,
                positions: 1,
                trades: 0,
                seed: Some(1),
                ..GeneratorConfig::default()
            },
        );
        assert_eq!(
            generator.generate().unwrap_err(),
            GeneratorError::PositionsExhausted {
                requested: 1,
                available: 0
            }
        );
    }

    #[test]
    fn test_repeated_symbols_count_once() {
        let mut generator = Generator::new(
            Catalog::new(
                vec![User::new("solo", "Solo")],
                vec![Symbol::new("VOO"), Symbol::new("VOO")],
            ),
            GeneratorConfig {
                accounts: 1,
                positions: 2,
                trades: 0,
                seed: Some(1),
                ..GeneratorConfig::default()
            },
        );
        assert_eq!(
            generator.generate().unwrap_err(),
            GeneratorError::PositionsExhausted {
                requested: 2,
                available: 1
            }
        );
    }

    #[test]
    fn test_repeated_accounts_count_once() {
        let mut generator = seeded(1, 0, 0);
        let account = generator.accounts(1).unwrap().remove(0);
        let accounts = vec![account.clone(), account];
        assert_eq!(
            generator.positions(&accounts, 29).unwrap_err(),
            GeneratorError::PositionsExhausted {
                requested: 29,
                available: 28
            }
        );
        assert_eq!(generator.positions(&accounts, 28).unwrap().len(), 28);
    }
}
