// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ticketwerk-print: the print strategy chain. A ticket is tried on the
// ESC/POS thermal printer first and falls back to a rendered PDF sent through
// the OS spooler.

pub mod chain;
pub mod device;
pub mod escpos;
pub mod spooler;
pub mod strategy;
pub mod system;
pub mod thermal;

pub use chain::{NO_STRATEGY_AVAILABLE, PrintOutcome, StrategyChain};
pub use device::{LinePrinter, ThermalDevice};
pub use escpos::ReceiptOptions;
pub use spooler::{LpSpooler, Spooler};
pub use strategy::{PrintFailure, PrintStrategy, PrintableTicket};
pub use system::SystemStrategy;
pub use thermal::ThermalStrategy;
