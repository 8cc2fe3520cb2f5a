// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service wiring: turns an `AgentConfig` into a ready-to-run scheduler.
//
// The thermal device is opened here, once. When it is missing the chain is
// built with the system strategy alone and the agent keeps running.

use std::sync::Arc;

use tracing::info;

use ticketwerk_bridge::command::DEFAULT_COMMAND_TIMEOUT;
use ticketwerk_bridge::{NetworkInfo, ShellNetwork, SystemRunner, system_network};
use ticketwerk_core::AgentConfig;
use ticketwerk_core::config::PrinterSettings;
use ticketwerk_core::error::Result;
use ticketwerk_print::{LpSpooler, ReceiptOptions, StrategyChain, SystemStrategy, ThermalStrategy};

use crate::processor::JobProcessor;
use crate::remote::{HttpJobSource, JobSource};
use crate::scheduler::{PollOptions, PollScheduler};

/// Network collaborator configured from printer settings.
pub fn network_for(settings: &PrinterSettings) -> ShellNetwork<SystemRunner> {
    system_network(&settings.network_interface, settings.use_sudo, DEFAULT_COMMAND_TIMEOUT)
}

/// Strategy chain in priority order: thermal (when the device opens), then
/// the system spooler.
pub async fn build_chain(settings: &PrinterSettings) -> StrategyChain {
    let mut chain = StrategyChain::default();

    match &settings.thermal_device {
        Some(path) => {
            let thermal = ThermalStrategy::open(path, ReceiptOptions::default(), settings.thermal_timeout()).await;
            chain.push(Box::new(thermal));
        }
        None => info!("thermal printing disabled in configuration"),
    }

    let spooler = LpSpooler::new(
        settings.spooler_command.clone(),
        settings.spooler_queue.clone(),
        settings.spooler_timeout(),
    );
    chain.push(Box::new(SystemStrategy::new(Box::new(spooler))));
    chain
}

/// Everything `ticketwerk run` needs, built once at startup.
pub struct AgentServices {
    pub config: Arc<AgentConfig>,
    pub source: Arc<HttpJobSource>,
    pub network: Arc<ShellNetwork<SystemRunner>>,
}

impl AgentServices {
    pub fn init(config: Arc<AgentConfig>) -> Result<Self> {
        let source = HttpJobSource::new(
            config.api.clone(),
            config.credentials.api_key.clone(),
            config.printer.request_timeout(),
        )?;
        let network = network_for(&config.printer);
        info!(
            base_url = %config.api.base_url,
            device = config.credentials.name.as_deref().unwrap_or(&config.credentials.device_id),
            "agent services initialised"
        );
        Ok(Self {
            config,
            source: Arc::new(source),
            network: Arc::new(network),
        })
    }

    /// Open devices and assemble the polling scheduler.
    pub async fn scheduler(&self) -> PollScheduler {
        let chain = build_chain(&self.config.printer).await;
        let source: Arc<dyn JobSource> = self.source.clone();
        let network: Arc<dyn NetworkInfo> = self.network.clone();
        let processor = JobProcessor::new(source.clone(), chain);
        PollScheduler::new(source, network, processor, PollOptions::from(&self.config.printer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_thermal_device_leaves_system_only() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PrinterSettings {
            thermal_device: Some(dir.path().join("lp0")),
            ..PrinterSettings::default()
        };
        let chain = build_chain(&settings).await;
        assert_eq!(chain.available(), vec!["system"]);
    }

    #[tokio::test]
    async fn writable_thermal_device_goes_first() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("lp0");
        std::fs::write(&device, b"").unwrap();
        let settings = PrinterSettings {
            thermal_device: Some(device),
            ..PrinterSettings::default()
        };
        let chain = build_chain(&settings).await;
        assert_eq!(chain.available(), vec!["thermal", "system"]);
    }

    #[tokio::test]
    async fn disabled_thermal_device_is_skipped() {
        let settings = PrinterSettings {
            thermal_device: None,
            ..PrinterSettings::default()
        };
        assert_eq!(build_chain(&settings).await.available(), vec!["system"]);
    }
}
