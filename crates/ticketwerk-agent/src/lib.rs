// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ticketwerk-agent: the polling print agent.
//
// `remote` talks to the ticket server, `processor` drives one job through the
// print chain, `scheduler` runs poll cycles, and `services` wires them up
// from configuration. `cli` and `commands` back the `ticketwerk` binary.

pub mod cli;
pub mod commands;
pub mod processor;
pub mod remote;
pub mod scheduler;
pub mod services;

pub use processor::{JobProcessor, JobReport};
pub use remote::{FetchedJob, HttpJobSource, JobSource};
pub use scheduler::{CycleReport, PollOptions, PollScheduler, SchedulerHandle};
