use crate::error::ExecutorError;
use crate::exchange::TradeExecutor;
use async_trait::async_trait;
use configuration::TraderConfig;
use core_types::{Direction, PositionStatus, TradeStatus, Transition};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

/// The balances of a paper account. `base` is negative while short.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ledger {
    quote: Decimal,
    base: Decimal,
}

impl Ledger {
    fn status(&self) -> TradeStatus {
        let status = if self.base > Decimal::ZERO {
            PositionStatus::Long
        } else if self.base < Decimal::ZERO {
            PositionStatus::Short
        } else {
            PositionStatus::Idle
        };
        TradeStatus {
            status,
            base_quantity: self.base,
            quote_quantity: self.quote,
            open_orders: Vec::new(),
        }
    }
}

/// An in-memory account that fills every order at the reference price.
///
/// Used for dry runs: the engine runs its full cycle, but no order reaches
/// the exchange. Shorts are modelled as a negative base balance.
pub struct PaperExecutor {
    ledger: Mutex<Ledger>,
    quote_fraction: Decimal,
}

impl PaperExecutor {
    pub fn new(config: &TraderConfig) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                quote: config.paper_quote_quantity,
                base: Decimal::ZERO,
            }),
            quote_fraction: config.quote_fraction,
        }
    }
}

#[async_trait]
impl TradeExecutor for PaperExecutor {
    async fn reconcile(&self) -> Result<TradeStatus, ExecutorError> {
        Ok(self.ledger.lock().await.status())
    }

    async fn execute(
        &self,
        transition: Transition,
        price: Decimal,
        status: &TradeStatus,
    ) -> Result<TradeStatus, ExecutorError> {
        if transition == Transition::Hold {
            return Ok(status.clone());
        }
        if price <= Decimal::ZERO {
            return Err(ExecutorError::InvalidPrice(price.to_string()));
        }

        let mut ledger = self.ledger.lock().await;
        let mut next = *ledger;
        match transition {
            Transition::Hold => {}
            Transition::Open(direction) => {
                if !next.base.is_zero() {
                    return Err(ExecutorError::Unsupported(format!(
                        "paper account already holds {} base",
                        next.base
                    )));
                }
                let notional = next.quote * self.quote_fraction;
                if notional <= Decimal::ZERO {
                    return Err(ExecutorError::InsufficientFunds(next.quote.to_string()));
                }
                let size = notional / price;
                match direction {
                    Direction::Long => {
                        next.base = size;
                        next.quote -= notional;
                    }
                    Direction::Short => {
                        next.base = -size;
                        next.quote += notional;
                    }
                }
            }
            Transition::Close(_) => {
                // Selling a long adds quote, buying back a short spends it.
                next.quote += next.base * price;
                next.base = Decimal::ZERO;
            }
        }

        tracing::info!(?transition, %price, quote = %next.quote, base = %next.base, "Paper fill");
        *ledger = next;
        Ok(next.status())
    }
}
