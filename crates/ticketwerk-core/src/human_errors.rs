// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator-facing error messages.
//
// The agent usually runs unattended on a small board next to a ticket
// printer. When it does stop, whoever is standing next to it needs one plain
// sentence about what went wrong and one about what to do next.

use crate::error::TicketwerkError;

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or busy printer; the next polling cycle retries.
    Transient,
    /// Someone has to act (load paper, plug in the printer, run setup).
    ActionRequired,
    /// Retrying will not help without changing the input or the install.
    Permanent,
}

/// A plain-language error with an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    /// Whether the next polling cycle may succeed on its own.
    pub retriable: bool,
    pub severity: Severity,
}

impl std::fmt::Display for HumanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n  hint: {}", self.message, self.suggestion)
    }
}

/// Convert a `TicketwerkError` into something an operator can act on.
pub fn humanize_error(err: &TicketwerkError) -> HumanError {
    match err {
        // -- Startup --
        TicketwerkError::ConfigurationMissing(path) => HumanError {
            message: format!("No configuration found at {}.", path.display()),
            suggestion: "Run `ticketwerk setup --server <url> --name <device>` or pass --config-dir.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        TicketwerkError::InvalidConfiguration(detail) => HumanError {
            message: "The configuration file could not be used.".into(),
            suggestion: format!("Fix the file and restart the agent. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        TicketwerkError::CredentialsMissing(path) => HumanError {
            message: format!("This device is not registered yet ({} is missing).", path.display()),
            suggestion: "Run `ticketwerk setup` to register the device and store its API key.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Remote --
        TicketwerkError::RemoteUnreachable(_) => HumanError {
            message: "The ticket server can't be reached.".into(),
            suggestion: "Check the network connection (`ticketwerk network ip`). Polling continues automatically.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TicketwerkError::RemoteRejected(detail) => humanize_rejection(detail),

        // -- Printing --
        TicketwerkError::PrintFailure(detail) | TicketwerkError::Device(detail) => humanize_device_error(detail),

        TicketwerkError::Spooler(detail) => HumanError {
            message: "The system print queue refused the ticket.".into(),
            suggestion: format!("Check that CUPS is running and a default printer is set (`lpstat -d`). ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        TicketwerkError::PdfError(_) | TicketwerkError::ImageError(_) => HumanError {
            message: "The ticket could not be rendered.".into(),
            suggestion: "The job data may be incomplete. The job is reported as failed; check it on the server.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- OS --
        TicketwerkError::NetworkInfoUnavailable(_) => HumanError {
            message: "This device has no usable network address.".into(),
            suggestion: "Connect to WiFi with `ticketwerk network wifi-connect <ssid> <password>`.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        TicketwerkError::CommandFailed { command, detail } => {
            let lower = detail.to_ascii_lowercase();
            if lower.contains("not found") || lower.contains("no such file") {
                HumanError {
                    message: format!("The `{command}` tool is not installed."),
                    suggestion: "Install NetworkManager (nmcli) and iproute2, or configure the network by hand.".into(),
                    retriable: false,
                    severity: Severity::Permanent,
                }
            } else if lower.contains("permission") || lower.contains("not authorized") {
                HumanError {
                    message: format!("`{command}` needs more privileges."),
                    suggestion: "Set \"useSudo\": true under \"printer\" in config.json, or run as root.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: format!("`{command}` failed."),
                    suggestion: format!("Try again. ({detail})"),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        // -- Plumbing --
        TicketwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Permission denied while accessing a file or device.".into(),
                suggestion: "Add the agent's user to the `lp` group, or check the configuration directory's owner.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::NotFound => HumanError {
                message: "A file or device could not be found.".into(),
                suggestion: "Check the paths in config.json.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, the SD card may be full or failing.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        TicketwerkError::Serialization(_) => HumanError {
            message: "The agent received data it could not understand.".into(),
            suggestion: "Check that the agent and server versions match.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

fn humanize_rejection(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("401") || lower.contains("403") || lower.contains("api key") || lower.contains("apikey") {
        HumanError {
            message: "The server no longer accepts this device's API key.".into(),
            suggestion: "Register again with `ticketwerk setup`.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("404") {
        HumanError {
            message: "The server doesn't know this endpoint.".into(),
            suggestion: "Check api.baseUrl and api.endpoints in config.json.".into(),
            retriable: false,
            severity: Severity::Permanent,
        }
    } else {
        HumanError {
            message: "The ticket server refused the request.".into(),
            suggestion: format!("Polling continues automatically. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}

fn humanize_device_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("timed out") {
        HumanError {
            message: "The printer didn't respond in time.".into(),
            suggestion: "Check that the printer is switched on and has paper.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("no such") || lower.contains("not found") || lower.contains("no print strategy") {
        HumanError {
            message: "No printer is connected.".into(),
            suggestion: "Plug in the thermal printer, or set a default CUPS printer.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("paper") {
        HumanError {
            message: "The printer is out of paper.".into(),
            suggestion: "Load a new paper roll. Pending jobs print on the next cycle.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The ticket couldn't be printed.".into(),
            suggestion: format!("Try turning the printer off and on again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
