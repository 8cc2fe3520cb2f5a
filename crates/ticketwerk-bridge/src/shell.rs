// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Network collaborators backed by standard Linux tools.
//
// Single-board deployments differ in which tools are installed and which of
// them actually report something useful, so every operation walks an ordered
// list of commands and takes the first usable answer. Output is parsed here
// rather than piped through grep/awk.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use ticketwerk_core::error::{Result, TicketwerkError};

use crate::traits::{CommandOutput, CommandRunner, NetworkInfo, WifiControl};

/// Host pinged by `internet_reachable`.
pub const REACHABILITY_HOST: &str = "8.8.8.8";

type AddressParser = fn(&str) -> Option<Ipv4Addr>;

/// `NetworkInfo` + `WifiControl` over `hostname`, `ip`, `ifconfig`, `nmcli`,
/// `iw` and `ping`.
pub struct ShellNetwork<R> {
    runner: R,
    interface: String,
    use_sudo: bool,
}

impl<R: CommandRunner> ShellNetwork<R> {
    pub fn new(runner: R, interface: impl Into<String>, use_sudo: bool) -> Self {
        Self {
            runner,
            interface: interface.into(),
            use_sudo,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Run `program`, prefixed with `sudo` when configured.
    async fn run_privileged(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        if self.use_sudo {
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push(program);
            full.extend_from_slice(args);
            self.runner.run("sudo", &full).await
        } else {
            self.runner.run(program, args).await
        }
    }

    /// Stdout of a successful run, or `None` (logged) for anything else.
    fn usable(program: &str, result: Result<CommandOutput>) -> Option<String> {
        match result {
            Ok(out) => match out.text() {
                Some(text) => Some(text.to_string()),
                None => {
                    debug!(program, stderr = %out.stderr.trim(), "command gave no usable output");
                    None
                }
            },
            Err(err) => {
                debug!(program, error = %err, "command could not run");
                None
            }
        }
    }

    async fn rescan(&self) {
        let result = self.run_privileged("nmcli", &["device", "wifi", "rescan"]).await;
        if Self::usable("nmcli", result).is_none() {
            debug!("wifi rescan skipped");
        }
    }

    async fn profile_exists(&self, name: &str) -> bool {
        let result = self.runner.run("nmcli", &["-t", "-f", "NAME", "connection", "show"]).await;
        Self::usable("nmcli", result)
            .map(|text| text.lines().any(|line| unescape_terse(line.trim()) == name))
            .unwrap_or(false)
    }

    async fn require(&self, program: &str, args: &[&str], step: &str) -> Result<()> {
        let out = self.run_privileged(program, args).await?;
        if out.success {
            return Ok(());
        }
        Err(TicketwerkError::CommandFailed {
            command: format!("{program} {step}"),
            detail: out.stderr.trim().to_string(),
        })
    }
}

#[async_trait]
impl<R: CommandRunner> NetworkInfo for ShellNetwork<R> {
    #[instrument(skip(self), fields(interface = %self.interface))]
    async fn local_ip(&self) -> Result<IpAddr> {
        let iface = self.interface.as_str();
        let ifconfig_args = [iface];
        let nmcli_args = ["-t", "-f", "IP4.ADDRESS", "device", "show", iface];
        let attempts: [(&str, &[&str], AddressParser); 4] = [
            ("hostname", &["-I"], parse_hostname_addresses),
            ("ip", &["-4", "addr", "show"], parse_inet_lines),
            ("ifconfig", &ifconfig_args, parse_inet_lines),
            ("nmcli", &nmcli_args, parse_nmcli_addresses),
        ];

        for (program, args, parse) in attempts {
            let Some(text) = Self::usable(program, self.runner.run(program, args).await) else {
                continue;
            };
            if let Some(ip) = parse(&text) {
                debug!(%ip, via = program, "local address resolved");
                return Ok(IpAddr::V4(ip));
            }
        }

        Err(TicketwerkError::NetworkInfoUnavailable(format!(
            "no IPv4 address found for {iface}"
        )))
    }

    async fn internet_reachable(&self) -> bool {
        match self.runner.run("ping", &["-c", "1", REACHABILITY_HOST]).await {
            Ok(out) => out.success,
            Err(err) => {
                debug!(error = %err, "ping could not run");
                false
            }
        }
    }
}

#[async_trait]
impl<R: CommandRunner> WifiControl for ShellNetwork<R> {
    #[instrument(skip(self))]
    async fn list_networks(&self) -> Result<Vec<String>> {
        self.rescan().await;

        let table = self
            .run_privileged("nmcli", &["--colors=no", "--fields", "SSID", "device", "wifi", "list"])
            .await;
        let table_ok = matches!(&table, Ok(out) if out.success);
        let mut ssids = Self::usable("nmcli", table).map(|t| parse_ssid_table(&t)).unwrap_or_default();

        let mut terse_ok = false;
        if ssids.is_empty() {
            debug!("table listing empty, trying terse output");
            let terse = self.run_privileged("nmcli", &["-t", "-f", "SSID", "device", "wifi", "list"]).await;
            terse_ok = matches!(&terse, Ok(out) if out.success);
            ssids = Self::usable("nmcli", terse).map(|t| parse_ssid_terse(&t)).unwrap_or_default();
        }

        if ssids.is_empty() && !table_ok && !terse_ok {
            return Err(TicketwerkError::CommandFailed {
                command: "nmcli device wifi list".into(),
                detail: "wifi scan failed".into(),
            });
        }
        Ok(ssids)
    }

    #[instrument(skip(self), fields(interface = %self.interface))]
    async fn current_network(&self) -> Result<Option<String>> {
        let active = self
            .runner
            .run("nmcli", &["-t", "-f", "NAME,DEVICE,TYPE", "connection", "show", "--active"])
            .await;
        if let Some(name) = Self::usable("nmcli", active).and_then(|t| parse_active_wifi(&t)) {
            return Ok(Some(name));
        }

        let scan = self.run_privileged("nmcli", &["-t", "-f", "active,ssid", "dev", "wifi"]).await;
        if let Some(ssid) = Self::usable("nmcli", scan).and_then(|t| parse_active_ssid(&t)) {
            return Ok(Some(ssid));
        }

        let iw = self.run_privileged("iw", &[self.interface.as_str(), "info"]).await;
        Ok(Self::usable("iw", iw).and_then(|t| parse_iw_ssid(&t)))
    }

    #[instrument(skip(self, password), fields(interface = %self.interface))]
    async fn connect(&self, ssid: &str, password: &str) -> Result<()> {
        if ssid.trim().is_empty() {
            return Err(TicketwerkError::CommandFailed {
                command: "nmcli device wifi connect".into(),
                detail: "SSID must not be empty".into(),
            });
        }

        self.rescan().await;

        if self.profile_exists(ssid).await {
            debug!("removing existing connection profile");
            let removed = self.run_privileged("nmcli", &["connection", "delete", ssid]).await;
            if Self::usable("nmcli", removed).is_none() {
                warn!(ssid, "could not delete existing profile, connecting anyway");
            }
        }

        let mut direct = vec!["device", "wifi", "connect", ssid];
        if !password.is_empty() {
            direct.extend_from_slice(&["password", password]);
        }
        match self.run_privileged("nmcli", &direct).await {
            Ok(out) if out.success => {
                info!(ssid, "connected to wifi");
                return Ok(());
            }
            Ok(out) => warn!(ssid, stderr = %out.stderr.trim(), "direct connect failed, creating profile"),
            Err(err) => warn!(ssid, error = %err, "direct connect failed, creating profile"),
        }

        let iface = self.interface.as_str();
        self.require(
            "nmcli",
            &["connection", "add", "type", "wifi", "con-name", ssid, "ifname", iface, "ssid", ssid],
            "connection add",
        )
        .await?;
        if !password.is_empty() {
            self.require(
                "nmcli",
                &["connection", "modify", ssid, "wifi-sec.key-mgmt", "wpa-psk", "wifi-sec.psk", password],
                "connection modify",
            )
            .await?;
        }
        self.require("nmcli", &["connection", "up", ssid], "connection up").await?;

        info!(ssid, "connected to wifi via new profile");
        Ok(())
    }
}

fn routable(ip: &Ipv4Addr) -> bool {
    !ip.is_loopback() && !ip.is_unspecified()
}

/// `hostname -I`: space separated addresses, IPv6 mixed in.
fn parse_hostname_addresses(text: &str) -> Option<Ipv4Addr> {
    text.split_whitespace()
        .filter_map(|token| token.parse::<Ipv4Addr>().ok())
        .find(routable)
}

/// `ip -4 addr show` and `ifconfig` (both `inet 10.0.0.2/24` and the older
/// `inet addr:10.0.0.2` forms).
fn parse_inet_lines(text: &str) -> Option<Ipv4Addr> {
    text.lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            tokens.find(|t| *t == "inet")?;
            let raw = tokens.next()?;
            let raw = raw.strip_prefix("addr:").unwrap_or(raw);
            raw.split('/').next()?.parse::<Ipv4Addr>().ok()
        })
        .find(routable)
}

/// `nmcli -t -f IP4.ADDRESS device show`: `IP4.ADDRESS[1]:10.0.0.2/24`.
fn parse_nmcli_addresses(text: &str) -> Option<Ipv4Addr> {
    text.lines()
        .filter_map(|line| {
            let (_, value) = line.split_once(':')?;
            value.split('/').next()?.trim().parse::<Ipv4Addr>().ok()
        })
        .find(routable)
}

/// Terse nmcli output escapes `:` inside values.
fn unescape_terse(value: &str) -> String {
    value.replace("\\:", ":")
}

fn keep_ssid(ssid: &str) -> bool {
    !ssid.is_empty() && ssid != "--"
}

fn parse_ssid_table(text: &str) -> Vec<String> {
    let set: BTreeSet<String> = text
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|s| keep_ssid(s))
        .map(str::to_string)
        .collect();
    set.into_iter().collect()
}

fn parse_ssid_terse(text: &str) -> Vec<String> {
    let set: BTreeSet<String> = text
        .lines()
        .map(|line| unescape_terse(line.trim()))
        .filter(|s| keep_ssid(s))
        .collect();
    set.into_iter().collect()
}

/// First wireless entry of `NAME,DEVICE,TYPE` terse output.
fn parse_active_wifi(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let mut fields = line.trim().rsplitn(3, ':');
        let kind = fields.next()?;
        let _device = fields.next()?;
        let name = fields.next()?;
        let wireless = kind.contains("wireless") || kind.contains("wifi");
        (wireless && !name.is_empty()).then(|| unescape_terse(name))
    })
}

/// `active,ssid` terse output: the line starting with `yes:`.
fn parse_active_ssid(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.trim().strip_prefix("yes:"))
        .map(unescape_terse)
        .filter(|s| !s.is_empty())
}

fn parse_iw_ssid(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.trim().strip_prefix("ssid "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Answers commands from a script keyed by the full command line and
    /// records every invocation. Unscripted commands fail to spawn.
    #[derive(Clone, Default)]
    struct ScriptedRunner {
        script: Arc<HashMap<String, CommandOutput>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn with(entries: &[(&str, bool, &str)]) -> Self {
            let script = entries
                .iter()
                .map(|(line, success, stdout)| {
                    let out = CommandOutput {
                        success: *success,
                        stdout: stdout.to_string(),
                        stderr: if *success { String::new() } else { "Error: failed".into() },
                    };
                    (line.to_string(), out)
                })
                .collect();
            Self {
                script: Arc::new(script),
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
            let line = std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" ");
            self.calls.lock().unwrap().push(line.clone());
            self.script.get(&line).cloned().ok_or_else(|| TicketwerkError::CommandFailed {
                command: program.to_string(),
                detail: "No such file or directory".into(),
            })
        }
    }

    fn network(runner: &ScriptedRunner) -> ShellNetwork<ScriptedRunner> {
        ShellNetwork::new(runner.clone(), "wlan0", false)
    }

    #[tokio::test]
    async fn hostname_answer_wins() {
        let runner = ScriptedRunner::with(&[("hostname -I", true, "192.168.1.44 fe80::1 172.17.0.1\n")]);
        let ip = network(&runner).local_ip().await.unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 44)));
        assert_eq!(runner.calls(), vec!["hostname -I"]);
    }

    #[tokio::test]
    async fn ip_lookup_falls_back_in_order() {
        let runner = ScriptedRunner::with(&[
            ("hostname -I", true, "\n"),
            ("ip -4 addr show", true, "1: lo\n    inet 127.0.0.1/8 scope host lo\n"),
            (
                "ifconfig wlan0",
                true,
                "wlan0: flags=4163\n        inet 10.0.0.7  netmask 255.255.255.0  broadcast 10.0.0.255\n",
            ),
        ]);
        let ip = network(&runner).local_ip().await.unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(runner.calls(), vec!["hostname -I", "ip -4 addr show", "ifconfig wlan0"]);
    }

    #[tokio::test]
    async fn nmcli_is_the_last_resort() {
        let runner = ScriptedRunner::with(&[(
            "nmcli -t -f IP4.ADDRESS device show wlan0",
            true,
            "IP4.ADDRESS[1]:192.168.4.2/24\n",
        )]);
        let ip = network(&runner).local_ip().await.unwrap();
        assert_eq!(ip.to_string(), "192.168.4.2");
        assert_eq!(runner.calls().len(), 4);
    }

    #[tokio::test]
    async fn no_address_is_network_info_unavailable() {
        let runner = ScriptedRunner::default();
        let err = network(&runner).local_ip().await.unwrap_err();
        assert!(matches!(err, TicketwerkError::NetworkInfoUnavailable(_)));
    }

    #[test]
    fn old_ifconfig_format_is_understood() {
        let text = "wlan0 Link encap:Ethernet\n inet addr:192.168.0.9  Bcast:192.168.0.255\n";
        assert_eq!(parse_inet_lines(text), Some(Ipv4Addr::new(192, 168, 0, 9)));
    }

    #[tokio::test]
    async fn wifi_list_is_deduplicated_and_sorted() {
        let runner = ScriptedRunner::with(&[
            ("nmcli device wifi rescan", false, ""),
            (
                "nmcli --colors=no --fields SSID device wifi list",
                true,
                "SSID\nZeta\nCafe Wifi\n--\nZeta\nAlpha\n",
            ),
        ]);
        let ssids = network(&runner).list_networks().await.unwrap();
        assert_eq!(ssids, vec!["Alpha", "Cafe Wifi", "Zeta"]);
    }

    #[tokio::test]
    async fn wifi_list_falls_back_to_terse_output() {
        let runner = ScriptedRunner::with(&[
            ("nmcli --colors=no --fields SSID device wifi list", true, "SSID\n"),
            ("nmcli -t -f SSID device wifi list", true, "Home\\:5G\n--\nHome\\:5G\nOffice\n"),
        ]);
        let ssids = network(&runner).list_networks().await.unwrap();
        assert_eq!(ssids, vec!["Home:5G", "Office"]);
    }

    #[tokio::test]
    async fn wifi_list_errors_when_nmcli_is_missing() {
        let runner = ScriptedRunner::default();
        assert!(network(&runner).list_networks().await.is_err());
    }

    #[tokio::test]
    async fn privileged_commands_use_sudo() {
        let runner = ScriptedRunner::with(&[(
            "sudo nmcli --colors=no --fields SSID device wifi list",
            true,
            "SSID\nHome\n",
        )]);
        let net = ShellNetwork::new(runner.clone(), "wlan0", true);
        assert_eq!(net.list_networks().await.unwrap(), vec!["Home"]);
        assert_eq!(runner.calls()[0], "sudo nmcli device wifi rescan");
    }

    #[tokio::test]
    async fn current_network_prefers_active_connection() {
        let runner = ScriptedRunner::with(&[(
            "nmcli -t -f NAME,DEVICE,TYPE connection show --active",
            true,
            "Wired:eth0:802-3-ethernet\nHome:wlan0:802-11-wireless\n",
        )]);
        assert_eq!(network(&runner).current_network().await.unwrap().as_deref(), Some("Home"));
    }

    #[tokio::test]
    async fn current_network_falls_back_to_iw() {
        let runner = ScriptedRunner::with(&[
            ("nmcli -t -f active,ssid dev wifi", true, "no:Neighbour\n"),
            ("iw wlan0 info", true, "Interface wlan0\n\tssid Office\n\ttype managed\n"),
        ]);
        assert_eq!(network(&runner).current_network().await.unwrap().as_deref(), Some("Office"));
        assert_eq!(runner.calls().last().map(String::as_str), Some("iw wlan0 info"));
    }

    #[tokio::test]
    async fn current_network_none_when_disconnected() {
        let runner = ScriptedRunner::default();
        assert_eq!(network(&runner).current_network().await.unwrap(), None);
    }

    #[tokio::test]
    async fn connect_replaces_existing_profile() {
        let runner = ScriptedRunner::with(&[
            ("nmcli -t -f NAME connection show", true, "Home\nWired\n"),
            ("nmcli connection delete Home", true, "deleted\n"),
            ("nmcli device wifi connect Home password s3cret", true, "activated\n"),
        ]);
        network(&runner).connect("Home", "s3cret").await.unwrap();
        let calls = runner.calls();
        assert!(calls.contains(&"nmcli connection delete Home".to_string()));
        assert_eq!(calls.last().map(String::as_str), Some("nmcli device wifi connect Home password s3cret"));
    }

    #[tokio::test]
    async fn connect_falls_back_to_explicit_profile() {
        let runner = ScriptedRunner::with(&[
            ("nmcli device wifi connect Cafe password pw123456", false, ""),
            ("nmcli connection add type wifi con-name Cafe ifname wlan0 ssid Cafe", true, "added\n"),
            (
                "nmcli connection modify Cafe wifi-sec.key-mgmt wpa-psk wifi-sec.psk pw123456",
                true,
                "ok\n",
            ),
            ("nmcli connection up Cafe", true, "activated\n"),
        ]);
        network(&runner).connect("Cafe", "pw123456").await.unwrap();
        assert_eq!(runner.calls().last().map(String::as_str), Some("nmcli connection up Cafe"));
    }

    #[tokio::test]
    async fn connect_reports_failed_step() {
        let runner = ScriptedRunner::with(&[
            ("nmcli device wifi connect Cafe", false, ""),
            ("nmcli connection add type wifi con-name Cafe ifname wlan0 ssid Cafe", true, "added\n"),
            ("nmcli connection up Cafe", false, ""),
        ]);
        let err = network(&runner).connect("Cafe", "").await.unwrap_err();
        assert!(err.to_string().contains("connection up"));
    }

    #[tokio::test]
    async fn empty_ssid_is_rejected_without_running_anything() {
        let runner = ScriptedRunner::default();
        assert!(network(&runner).connect("  ", "pw").await.is_err());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn reachability_follows_ping_exit_status() {
        let up = ScriptedRunner::with(&[("ping -c 1 8.8.8.8", true, "1 received\n")]);
        assert!(network(&up).internet_reachable().await);
        let down = ScriptedRunner::with(&[("ping -c 1 8.8.8.8", false, "")]);
        assert!(!network(&down).internet_reachable().await);
    }
}
