// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cascading fallback over print strategies.
//
// Strategies run in fixed priority order. Unavailable ones are skipped, the
// first success wins, and if everything fails the caller gets one reason
// (single attempt) or `name: reason; name: reason` (several).

use tracing::{info, instrument, warn};

use crate::strategy::{PrintStrategy, PrintableTicket};

/// Failure reason when no strategy could even be attempted.
pub const NO_STRATEGY_AVAILABLE: &str = "no print strategy available";

/// Result of running a ticket through the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOutcome {
    pub success: bool,
    /// Strategy that printed the ticket.
    pub strategy: Option<String>,
    /// Collected failure reason when nothing printed.
    pub error: Option<String>,
    /// Names of every strategy attempted, in order.
    pub attempted: Vec<String>,
}

impl PrintOutcome {
    fn printed(strategy: &str, attempted: Vec<String>) -> Self {
        Self {
            success: true,
            strategy: Some(strategy.to_string()),
            error: None,
            attempted,
        }
    }

    fn failed(reason: String, attempted: Vec<String>) -> Self {
        Self {
            success: false,
            strategy: None,
            error: Some(reason),
            attempted,
        }
    }
}

/// Ordered list of print strategies, highest priority first.
#[derive(Default)]
pub struct StrategyChain {
    strategies: Vec<Box<dyn PrintStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn PrintStrategy>>) -> Self {
        Self { strategies }
    }

    /// Append a strategy at the lowest priority.
    pub fn push(&mut self, strategy: Box<dyn PrintStrategy>) {
        self.strategies.push(strategy);
    }

    /// Names of the strategies that can currently be attempted.
    pub fn available(&self) -> Vec<&str> {
        self.strategies
            .iter()
            .filter(|s| s.is_available())
            .map(|s| s.name())
            .collect()
    }

    #[instrument(skip_all, fields(job_id = %ticket.job_id, token = %ticket.token))]
    pub async fn print(&self, ticket: &PrintableTicket) -> PrintOutcome {
        let mut attempted = Vec::new();
        let mut failures: Vec<(String, String)> = Vec::new();

        for strategy in self.strategies.iter().filter(|s| s.is_available()) {
            let name = strategy.name().to_string();
            attempted.push(name.clone());

            match strategy.print(ticket).await {
                Ok(()) => {
                    info!(strategy = %name, attempts = attempted.len(), "ticket printed");
                    return PrintOutcome::printed(&name, attempted);
                }
                Err(failure) => {
                    warn!(strategy = %name, reason = %failure, "print strategy failed, falling back");
                    failures.push((name, failure.reason));
                }
            }
        }

        let reason = match failures.len() {
            0 => NO_STRATEGY_AVAILABLE.to_string(),
            1 => failures.remove(0).1,
            _ => failures
                .iter()
                .map(|(name, reason)| format!("{name}: {reason}"))
                .collect::<Vec<_>>()
                .join("; "),
        };
        PrintOutcome::failed(reason, attempted)
    }
}
