//! Demo data for a fresh ledger.
//!
//! Generation is driven by a seeded RNG, so the same [`SeedOptions`] against
//! an empty database always produce the same users, wallets, cards and
//! transfers.

use std::collections::BTreeMap;

use fake::Fake;
use fake::faker::name::raw::{FirstName, LastName};
use fake::locales::EN;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument, warn};

use crate::domain::{Cents, Wallet};

use super::{AppError, ErrorKind, LedgerService};

const DEMO_CURRENCIES: [&str; 3] = ["BRL", "USD", "EUR"];

/// Opening balances fall between 50.00 and 5000.00.
const OPENING_BALANCE_RANGE: std::ops::RangeInclusive<Cents> = 5_000..=500_000;

/// Card limits fall between 500.00 and 10000.00.
const CARD_LIMIT_RANGE: std::ops::RangeInclusive<Cents> = 50_000..=1_000_000;

/// Smallest demo transfer, 1.00.
const MIN_TRANSFER: Cents = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    /// RNG seed; equal seeds give equal data
    pub seed: u64,
    pub users: usize,
    /// Each user gets between one and this many wallets
    pub max_wallets_per_user: usize,
    /// Each wallet gets between one and this many cards
    pub max_cards_per_wallet: usize,
    /// Transfers attempted between wallets sharing a currency
    pub transfers: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            users: 5,
            max_wallets_per_user: 2,
            max_cards_per_wallet: 2,
            transfers: 10,
        }
    }
}

/// What a seeding run actually wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub wallets: usize,
    pub cards: usize,
    pub transfers: usize,
    /// Records or transfers left out because they conflicted or were rejected
    pub skipped: usize,
    /// Sum of the created wallets' opening balances, per currency
    pub opening_balances: BTreeMap<String, Cents>,
}

impl LedgerService {
    /// Populate the ledger with generated users, wallets, cards and transfers.
    ///
    /// Conflicting users or cards (for example from an earlier run with the
    /// same seed) and rejected transfers are skipped and counted. Storage
    /// failures abort the run.
    #[instrument(skip(self))]
    pub async fn seed_demo_data(&self, options: SeedOptions) -> Result<SeedReport, AppError> {
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        let mut report = SeedReport::default();
        let mut wallets_by_currency: BTreeMap<&'static str, Vec<Wallet>> = BTreeMap::new();

        for n in 0..options.users {
            let (name, email) = fake_identity(&mut rng, n);
            let tax_id = format!("{:011}", rng.random_range(0..100_000_000_000u64));
            let Some(user) = skip_conflict(self.create_user(&name, &tax_id, &email).await)? else {
                report.skipped += 1;
                continue;
            };
            report.users += 1;

            for _ in 0..count_up_to(&mut rng, options.max_wallets_per_user) {
                let currency = DEMO_CURRENCIES[rng.random_range(0..DEMO_CURRENCIES.len())];
                let balance = rng.random_range(OPENING_BALANCE_RANGE);
                let wallet = self.create_wallet(user.id, Some(currency), balance).await?;
                report.wallets += 1;
                *report
                    .opening_balances
                    .entry(currency.to_string())
                    .or_default() += balance;

                for _ in 0..count_up_to(&mut rng, options.max_cards_per_wallet) {
                    let number = format!("5{:015}", rng.random_range(0..1_000_000_000_000_000u64));
                    let expiry = format!(
                        "{:02}/{:02}",
                        rng.random_range(1..=12u32),
                        rng.random_range(27..=32u32)
                    );
                    let limit = rng.random_range(CARD_LIMIT_RANGE);
                    match skip_conflict(self.create_card(wallet.id, &number, &expiry, limit).await)? {
                        Some(_) => report.cards += 1,
                        None => report.skipped += 1,
                    }
                }

                wallets_by_currency.entry(currency).or_default().push(wallet);
            }
        }

        let groups: Vec<&Vec<Wallet>> = wallets_by_currency
            .values()
            .filter(|wallets| wallets.len() >= 2)
            .collect();

        for _ in 0..options.transfers {
            if groups.is_empty() {
                warn!("no currency has two wallets, skipping demo transfers");
                break;
            }
            let group = groups[rng.random_range(0..groups.len())];
            let from = rng.random_range(0..group.len());
            let mut to = rng.random_range(0..group.len() - 1);
            if to >= from {
                to += 1;
            }
            let (source, destination) = (group[from].id, group[to].id);

            // At most half of what the source currently holds
            let ceiling = self.get_wallet(source).await?.balance / 2;
            if ceiling < MIN_TRANSFER {
                report.skipped += 1;
                continue;
            }
            let amount = rng.random_range(MIN_TRANSFER..=ceiling);

            match self.transfer(source, destination, amount).await {
                Ok(_) => report.transfers += 1,
                Err(err) if err.kind() != ErrorKind::Storage => {
                    warn!(%err, "demo transfer rejected");
                    report.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            users = report.users,
            wallets = report.wallets,
            cards = report.cards,
            transfers = report.transfers,
            skipped = report.skipped,
            "demo data seeded"
        );
        Ok(report)
    }
}

/// A display name and an email unique to the `n`th generated user.
fn fake_identity(rng: &mut ChaCha8Rng, n: usize) -> (String, String) {
    let first: String = FirstName(EN).fake_with_rng(rng);
    let last: String = LastName(EN).fake_with_rng(rng);
    let handle: String = format!("{first}.{last}")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .collect::<String>()
        .to_ascii_lowercase();
    (format!("{first} {last}"), format!("{handle}{n}@example.com"))
}

fn count_up_to(rng: &mut ChaCha8Rng, max: usize) -> usize {
    if max == 0 { 0 } else { rng.random_range(1..=max) }
}

fn skip_conflict<T>(result: Result<T, AppError>) -> Result<Option<T>, AppError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.kind() == ErrorKind::Conflict => {
            warn!(%err, "skipping conflicting demo record");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
