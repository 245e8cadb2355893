use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::clock::Clock;
use crate::notify::{NoticeTemplates, NotificationError, NotificationGateway};
use crate::storage::MemoryStore;
use crate::workflows::parcels::address::BuildingRoster;
use crate::workflows::parcels::directory::ResidentDirectory;
use crate::workflows::parcels::domain::{
    Package, PackageStatus, PhoneNumber, Resident, TrackingCode, Unit,
};
use crate::workflows::parcels::engine::{Operator, PackageLifecycleEngine};
use crate::workflows::parcels::ledger::PackageLedger;

pub(super) type MemoryEngine = PackageLifecycleEngine<MemoryStore<Resident>, MemoryStore<Package>>;

pub(super) fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 8)
        .expect("valid date")
        .and_hms_opt(9, 30, 0)
        .expect("valid time")
}

/// Moves forward one minute every time it is read.
#[derive(Debug)]
pub(super) struct SteppingClock {
    next: Mutex<NaiveDateTime>,
}

impl SteppingClock {
    pub(super) fn starting_at(start: NaiveDateTime) -> Self {
        Self {
            next: Mutex::new(start),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> NaiveDateTime {
        let mut guard = self.next.lock().expect("clock mutex poisoned");
        let now = *guard;
        *guard = now + Duration::minutes(1);
        now
    }
}

pub(super) fn clock() -> Arc<dyn Clock> {
    Arc::new(SteppingClock::starting_at(start_time()))
}

pub(super) fn code(raw: &str) -> TrackingCode {
    TrackingCode::parse(raw).expect("non-empty tracking code")
}

pub(super) fn unit(block: &str, apartment: &str) -> Unit {
    Unit::new(block, apartment)
}

pub(super) fn resident(name: &str, block: &str, apartment: &str, local_phone: &str) -> Resident {
    Resident {
        name: name.to_string(),
        unit: unit(block, apartment),
        phone: PhoneNumber::from_local(local_phone).expect("valid phone"),
    }
}

pub(super) fn package(raw_code: &str, recipient: &Resident, status: PackageStatus) -> Package {
    Package {
        tracking_code: code(raw_code),
        unit: recipient.unit.clone(),
        recipient: recipient.name.clone(),
        phone: recipient.phone.clone(),
        scan_datetime: start_time() - Duration::days(1),
        status,
    }
}

pub(super) fn maria() -> Resident {
    resident("Maria Silva", "4", "204", "11999999999")
}

pub(super) fn joao() -> Resident {
    resident("Joao Souza", "4", "204", "11988887777")
}

/// Answers prompts from a fixed script and records everything shown to the operator.
#[derive(Debug, Default)]
pub(super) struct ScriptedOperator {
    answers: VecDeque<Option<String>>,
    pub(super) prompts: Vec<String>,
    pub(super) log: Vec<String>,
    pub(super) clears: usize,
}

impl ScriptedOperator {
    pub(super) fn answering(answers: &[&str]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|answer| Some((*answer).to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Queues a cancellation after the scripted answers.
    pub(super) fn then_cancel(mut self) -> Self {
        self.answers.push_back(None);
        self
    }

    pub(super) fn remaining(&self) -> usize {
        self.answers.len()
    }

    pub(super) fn saw(&self, needle: &str) -> bool {
        self.log.iter().any(|line| line.contains(needle))
    }

    pub(super) fn count(&self, needle: &str) -> usize {
        self.log.iter().filter(|line| line.contains(needle)).count()
    }
}

impl Operator for ScriptedOperator {
    fn ask(&mut self, prompt: &str) -> Option<String> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().flatten()
    }

    fn tell(&mut self, line: &str) {
        self.log.push(line.to_string());
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.log.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SentMessage {
    pub(super) phone: PhoneNumber,
    pub(super) body: String,
}

#[derive(Debug, Default, Clone)]
pub(super) struct RecordingGateway {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl RecordingGateway {
    pub(super) fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("gateway mutex poisoned").clone()
    }
}

impl NotificationGateway for RecordingGateway {
    fn send(&self, phone: &PhoneNumber, body: &str) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("gateway mutex poisoned")
            .push(SentMessage {
                phone: phone.clone(),
                body: body.to_string(),
            });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(super) struct FailingGateway;

impl NotificationGateway for FailingGateway {
    fn send(&self, _phone: &PhoneNumber, _body: &str) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("connection refused".to_string()))
    }
}

pub(super) struct Harness {
    pub(super) residents: MemoryStore<Resident>,
    pub(super) packages: MemoryStore<Package>,
    pub(super) gateway: RecordingGateway,
    pub(super) engine: MemoryEngine,
}

pub(super) fn harness(residents: Vec<Resident>, packages: Vec<Package>) -> Harness {
    let gateway = RecordingGateway::default();
    harness_with_gateway(residents, packages, Arc::new(gateway.clone()), gateway)
}

pub(super) fn harness_with_gateway(
    residents: Vec<Resident>,
    packages: Vec<Package>,
    gateway: Arc<dyn NotificationGateway>,
    recorder: RecordingGateway,
) -> Harness {
    let resident_store = MemoryStore::with_records(residents);
    let package_store = MemoryStore::with_records(packages);
    let roster = BuildingRoster::standard();

    let directory =
        ResidentDirectory::open(resident_store.clone(), roster.clone()).expect("directory opens");
    let ledger =
        PackageLedger::open(package_store.clone(), roster, clock()).expect("ledger opens");
    let engine = PackageLifecycleEngine::new(
        directory,
        ledger,
        gateway,
        NoticeTemplates::new("Village Liberdade"),
    );

    Harness {
        residents: resident_store,
        packages: package_store,
        gateway: recorder,
        engine,
    }
}
