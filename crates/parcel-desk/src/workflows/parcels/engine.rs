//! Scan and pickup workflows.
//!
//! The engine owns the decision logic of the desk and talks to the person at the counter only
//! through [`Operator`], so the same rules drive the terminal front end and the tests. Every
//! workflow re-reads the stores before deciding anything, and writes happen only once all input
//! for that step has been validated.

use std::sync::Arc;

use tracing::{info, warn};

use super::address::{parse_address, BuildingRoster};
use super::directory::{DirectoryError, ResidentDirectory};
use super::domain::{Package, PackageStatus, PhoneNumber, Resident, TrackingCode, Unit};
use super::ledger::{LedgerError, PackageLedger};
use crate::notify::{NoticeTemplates, NotificationGateway, NotificationStatus};
use crate::storage::{RecordStore, StoreError};

const RULE: &str = "================================================================================";
const DIVIDER: &str = "--------------------------------------------------------------------------------";

const TRACKING_CODE_PROMPT: &str = "Enter the tracking code:";
const ADDRESS_PROMPT: &str = "Block and apartment:";
const OPTION_PROMPT: &str = "Select an option:";
const PICKUP_PROMPT: &str = "Select an option (1 or 2):";
const NAME_PROMPT: &str = "Recipient name:";
const PHONE_PROMPT: &str = "Recipient phone (e.g. 11999999999, digits only):";
const MALFORMED_ADDRESS: &str = "Invalid input. Use the format 4204 (block 4, apartment 204).";

/// The interactive surface: questions in, answers out, plus an append-only log.
pub trait Operator {
    /// `None` means the operator cancelled the prompt.
    fn ask(&mut self, prompt: &str) -> Option<String>;
    fn tell(&mut self, line: &str);
    /// Starts a fresh log for a new top-level command.
    fn clear(&mut self);
}

/// How a scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Registered {
        package: Package,
        notification: NotificationStatus,
    },
    Collected {
        package: Package,
        notification: NotificationStatus,
    },
    PickupDeclined {
        tracking_code: TrackingCode,
    },
    AlreadyCollected {
        package: Package,
    },
    EmptyTrackingCode,
    /// A ledger rule refused the write; nothing changed.
    Rejected {
        reason: String,
    },
    Cancelled,
}

/// How a pending-package review ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingReview {
    Listed { unit: Unit, packages: Vec<Package> },
    InvalidAddress { input: String },
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

enum Registration {
    Registered(Resident),
    Retry,
    Cancelled,
}

/// Package lifecycle: `Unknown -> Delivered -> Collected`.
pub struct PackageLifecycleEngine<R, P> {
    directory: ResidentDirectory<R>,
    ledger: PackageLedger<P>,
    gateway: Arc<dyn NotificationGateway>,
    templates: NoticeTemplates,
    roster: BuildingRoster,
}

impl<R, P> PackageLifecycleEngine<R, P>
where
    R: RecordStore<Resident>,
    P: RecordStore<Package>,
{
    pub fn new(
        directory: ResidentDirectory<R>,
        ledger: PackageLedger<P>,
        gateway: Arc<dyn NotificationGateway>,
        templates: NoticeTemplates,
    ) -> Self {
        let roster = ledger.roster().clone();
        Self {
            directory,
            ledger,
            gateway,
            templates,
            roster,
        }
    }

    pub fn directory(&self) -> &ResidentDirectory<R> {
        &self.directory
    }

    pub fn ledger(&self) -> &PackageLedger<P> {
        &self.ledger
    }

    /// Runs one scan of a tracking code through to its outcome.
    pub fn scan(&mut self, operator: &mut dyn Operator) -> Result<ScanOutcome, EngineError> {
        self.ledger.reload()?;
        operator.clear();

        let Some(raw_code) = operator.ask(TRACKING_CODE_PROMPT) else {
            return Ok(cancelled(operator, ScanOutcome::Cancelled));
        };
        let Some(tracking_code) = TrackingCode::parse(&raw_code) else {
            operator.tell("Tracking code cannot be empty.");
            operator.tell(RULE);
            return Ok(ScanOutcome::EmptyTrackingCode);
        };

        operator.tell(&format!("=== Scanned code: {tracking_code} ==="));

        match self.ledger.find_by_tracking_code(&tracking_code).cloned() {
            Some(package) => match package.status {
                PackageStatus::Delivered => self.confirm_pickup(operator, package),
                PackageStatus::Collected => {
                    operator.tell(&format!(
                        "Package ({}) was already collected on {}.",
                        package.tracking_code,
                        package.scanned_at_label()
                    ));
                    operator.tell("No further action is allowed.");
                    operator.tell("Returning to the main menu.");
                    operator.tell(RULE);
                    Ok(ScanOutcome::AlreadyCollected { package })
                }
            },
            None => self.register_arrival(operator, tracking_code),
        }
    }

    /// Lists the packages still waiting for one unit.
    pub fn review_pending(
        &mut self,
        operator: &mut dyn Operator,
    ) -> Result<PendingReview, EngineError> {
        self.ledger.reload()?;
        operator.clear();
        operator.tell("=== Pending packages ===");

        let Some(input) = operator.ask("Block and apartment (e.g. 4204):") else {
            return Ok(cancelled(operator, PendingReview::Cancelled));
        };

        let Some(unit) = parse_address(&input) else {
            operator.tell(MALFORMED_ADDRESS);
            operator.tell(RULE);
            return Ok(PendingReview::InvalidAddress { input });
        };
        if !self.roster.contains(&unit) {
            operator.tell(&format!(
                "Invalid block or apartment. {}.",
                self.roster.describe()
            ));
            operator.tell(RULE);
            return Ok(PendingReview::InvalidAddress { input });
        }

        let packages: Vec<Package> = self
            .ledger
            .list_pending(&unit)
            .into_iter()
            .cloned()
            .collect();
        render_pending(operator, &packages);
        Ok(PendingReview::Listed { unit, packages })
    }

    fn confirm_pickup(
        &mut self,
        operator: &mut dyn Operator,
        package: Package,
    ) -> Result<ScanOutcome, EngineError> {
        operator.tell(
            "Package already registered as delivered but not yet collected. Mark it as collected?",
        );
        operator.tell("1 - Yes, mark as collected");
        operator.tell("2 - No, return to the main menu");

        let confirmed = operator
            .ask(PICKUP_PROMPT)
            .is_some_and(|answer| answer.trim() == "1");
        if !confirmed {
            operator.tell("Returning to the main menu.");
            operator.tell(RULE);
            return Ok(ScanOutcome::PickupDeclined {
                tracking_code: package.tracking_code,
            });
        }

        let collected = match self.ledger.mark_collected(&package.tracking_code) {
            Ok(collected) => collected,
            Err(err) => return reject(operator, err),
        };

        let body = self.templates.pickup(
            &collected.recipient,
            &collected.tracking_code,
            collected.scan_datetime,
        );
        let notification = self.notify(operator, &collected.phone, &body);
        operator.tell("Package marked as collected.");
        operator.tell(RULE);

        Ok(ScanOutcome::Collected {
            package: collected,
            notification,
        })
    }

    fn register_arrival(
        &mut self,
        operator: &mut dyn Operator,
        tracking_code: TrackingCode,
    ) -> Result<ScanOutcome, EngineError> {
        // Only arrivals read residents; pickups never touch the directory.
        self.directory.reload()?;
        operator.tell("=== New package ===");
        operator.tell("Enter the block and apartment (e.g. 4204 for block 4, apartment 204):");

        let Some(recipient) = self.resolve_recipient(operator)? else {
            return Ok(cancelled(operator, ScanOutcome::Cancelled));
        };

        let package = match self.ledger.create(
            tracking_code,
            &recipient.unit,
            &recipient.name,
            recipient.phone.clone(),
        ) {
            Ok(package) => package,
            Err(err) => return reject(operator, err),
        };

        let body = self
            .templates
            .arrival(&package.recipient, &package.tracking_code);
        let notification = self.notify(operator, &package.phone, &body);
        operator.tell("Package registered.");
        operator.tell(RULE);

        Ok(ScanOutcome::Registered {
            package,
            notification,
        })
    }

    /// Address, then resident menu, until a recipient is chosen or the operator cancels.
    /// Invalid menu answers re-prompt without limit.
    fn resolve_recipient(
        &mut self,
        operator: &mut dyn Operator,
    ) -> Result<Option<Resident>, EngineError> {
        'address: loop {
            let Some(unit) = self.prompt_unit(operator) else {
                return Ok(None);
            };

            let residents: Vec<Resident> = self
                .directory
                .find_by_unit(&unit)
                .into_iter()
                .cloned()
                .collect();
            render_resident_menu(operator, &residents);
            let add_option = residents.len() + 1;
            let reenter_option = residents.len() + 2;

            loop {
                let Some(answer) = operator.ask(OPTION_PROMPT) else {
                    return Ok(None);
                };
                let answer = answer.trim();
                if answer.is_empty() {
                    operator.tell("Option cannot be empty. Try again.");
                    continue;
                }
                let Some(choice) = menu_choice(answer) else {
                    operator.tell("Please enter a number. Try again.");
                    continue;
                };

                if (1..=residents.len()).contains(&choice) {
                    return Ok(Some(residents[choice - 1].clone()));
                } else if choice == add_option {
                    match self.register_recipient(operator, &unit)? {
                        Registration::Registered(resident) => return Ok(Some(resident)),
                        Registration::Retry => continue,
                        Registration::Cancelled => return Ok(None),
                    }
                } else if choice == reenter_option {
                    operator.tell("Enter the block and apartment again (e.g. 4204):");
                    continue 'address;
                } else {
                    operator.tell("Invalid option. Try again.");
                }
            }
        }
    }

    fn prompt_unit(&self, operator: &mut dyn Operator) -> Option<Unit> {
        loop {
            let input = operator.ask(ADDRESS_PROMPT)?;
            let Some(unit) = parse_address(&input) else {
                operator.tell(MALFORMED_ADDRESS);
                continue;
            };
            if self.roster.contains(&unit) {
                return Some(unit);
            }
            operator.tell(&format!(
                "Invalid block or apartment. {}. Try again.",
                self.roster.describe()
            ));
        }
    }

    fn register_recipient(
        &mut self,
        operator: &mut dyn Operator,
        unit: &Unit,
    ) -> Result<Registration, EngineError> {
        let Some(name) = operator.ask(NAME_PROMPT) else {
            return Ok(Registration::Cancelled);
        };
        let Some(phone) = operator.ask(PHONE_PROMPT) else {
            return Ok(Registration::Cancelled);
        };
        let (name, phone) = (name.trim(), phone.trim());
        if name.is_empty() || phone.is_empty() {
            operator.tell("Name and phone cannot be empty. Try again.");
            return Ok(Registration::Retry);
        }

        match self.directory.register(name, unit, phone) {
            Ok(resident) => Ok(Registration::Registered(resident)),
            Err(DirectoryError::Store(err)) => Err(err.into()),
            Err(DirectoryError::InvalidPhone(_)) => {
                operator.tell(
                    "Invalid phone. It must contain exactly 11 digits (e.g. 11999999999). Try again.",
                );
                Ok(Registration::Retry)
            }
            Err(DirectoryError::DuplicatePhone(phone)) => {
                operator.tell(&format!(
                    "Phone {phone} is already registered. Select the existing resident or use another phone."
                ));
                Ok(Registration::Retry)
            }
            Err(other) => {
                operator.tell(&format!("{other}. Try again."));
                Ok(Registration::Retry)
            }
        }
    }

    /// Best effort: the transition is already committed whatever happens here.
    fn notify(
        &self,
        operator: &mut dyn Operator,
        phone: &PhoneNumber,
        body: &str,
    ) -> NotificationStatus {
        match self.gateway.send(phone, body) {
            Ok(()) => {
                info!(%phone, "notification sent");
                operator.tell(&format!("[SENT] SMS to {phone}: {body}"));
                NotificationStatus::Sent
            }
            Err(err) => {
                warn!(%phone, error = %err, "notification failed");
                operator.tell(&format!("[ERROR] Failed to send SMS: {err}"));
                NotificationStatus::Failed(err.to_string())
            }
        }
    }
}

/// Writes the pending-package listing for one unit.
pub fn render_pending(operator: &mut dyn Operator, packages: &[Package]) {
    if packages.is_empty() {
        operator.tell("No pending packages for this apartment.");
    } else {
        operator.tell(DIVIDER);
        for package in packages {
            operator.tell(&format!("Code: {}", package.tracking_code));
            operator.tell(&format!("Recipient: {}", package.recipient));
            operator.tell(&format!("Registered at: {}", package.scanned_at_label()));
            operator.tell(DIVIDER);
        }
    }
    operator.tell(RULE);
}

/// Reads a menu answer as a position. Negative numbers map to 0 and numbers too large for
/// `usize` saturate, so both land out of range rather than being treated as text.
fn menu_choice(answer: &str) -> Option<usize> {
    let (negative, digits) = match answer.as_bytes().first() {
        Some(b'-') => (true, &answer[1..]),
        Some(b'+') => (false, &answer[1..]),
        _ => (false, answer),
    };
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    if negative {
        return Some(0);
    }
    Some(digits.parse::<usize>().unwrap_or(usize::MAX))
}

fn render_resident_menu(operator: &mut dyn Operator, residents: &[Resident]) {
    operator.tell("=== Residents in this apartment ===");
    operator.tell(DIVIDER);
    for (position, resident) in residents.iter().enumerate() {
        operator.tell(&format!("{} - {}", position + 1, resident.name));
    }
    operator.tell(&format!("{} - Add a new recipient", residents.len() + 1));
    operator.tell(&format!(
        "{} - Wrong apartment, enter it again",
        residents.len() + 2
    ));
    operator.tell(DIVIDER);
}

/// Discards the session log and reports the cancel.
fn cancelled<T>(operator: &mut dyn Operator, outcome: T) -> T {
    operator.clear();
    operator.tell("Operation cancelled.");
    operator.tell(RULE);
    outcome
}

/// Ledger refusals end the scan with a message; storage failures abort it.
fn reject(operator: &mut dyn Operator, err: LedgerError) -> Result<ScanOutcome, EngineError> {
    match err {
        LedgerError::Store(err) => Err(err.into()),
        other => {
            let reason = other.to_string();
            warn!(%reason, "scan rejected by ledger");
            operator.tell(&format!("{reason}."));
            operator.tell(RULE);
            Ok(ScanOutcome::Rejected { reason })
        }
    }
}
