mod conflict;
mod error;
mod ledger;
mod mutations;
mod queries;
mod store;
#[cfg(test)]
mod tests;

pub use error::EngineError;
pub use ledger::DayLedger;

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::{DashMap, DashSet};
use tokio::sync::{
    mpsc, oneshot, Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock,
};
use tokio::task::JoinHandle;
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

pub type SharedDayLedger = Arc<RwLock<DayLedger>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;

                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }

                commit_batch(&mut wal, &mut batch);
                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
    tracing::debug!("WAL writer stopped");
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch.as_slice());
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    if let Err(ref e) = result {
        tracing::error!(error = %e, batch = batch.len(), "WAL batch commit failed");
    }
    respond_batch(batch, &result);
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even on append error so partially buffered bytes don't leak
    // into the next batch.
    let flush_err = wal.flush_sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

fn respond_batch(batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { event, response } => {
            let mut batch = vec![(event, response)];
            commit_batch(wal, &mut batch);
        }
    }
}

/// Owned handles a commit needs once it runs detached from its caller.
#[derive(Clone)]
struct Committer {
    wal_tx: mpsc::Sender<WalCommand>,
    appointment_dates: Arc<DashMap<Ulid, NaiveDate>>,
    hours: Arc<DashMap<u8, WorkingHours>>,
    closed_dates: Arc<DashSet<NaiveDate>>,
    services: Arc<DashMap<Ulid, Service>>,
}

impl Committer {
    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    fn apply_to_ledger(&self, ledger: &mut DayLedger, event: &Event) {
        if let Event::AppointmentBooked { appointment } = event {
            self.appointment_dates.insert(appointment.id, appointment.date);
        }
        ledger.apply(event);
    }

    /// Apply a configuration event. Appointment events are ignored here.
    fn apply_config(&self, event: &Event) {
        match event {
            Event::WorkingHoursSet { hours } => {
                self.hours.insert(hours.day_of_week, hours.clone());
            }
            Event::DateClosed { date } => {
                self.closed_dates.insert(*date);
            }
            Event::DateReopened { date } => {
                self.closed_dates.remove(date);
            }
            Event::ServiceSaved { service } => {
                self.services.insert(service.id, service.clone());
            }
            Event::AppointmentBooked { .. } | Event::AppointmentReviewed { .. } => {}
        }
    }
}

async fn join_commit<T>(task: JoinHandle<Result<T, EngineError>>) -> Result<T, EngineError> {
    task.await
        .map_err(|e| EngineError::WalError(format!("commit task failed: {e}")))?
}

/// The durable store behind the scheduler.
///
/// Appointments live in per-date ledgers, each behind its own lock, so
/// bookings for different days never contend. Configuration (working hours,
/// closed dates, services) sits in flat maps and is written last-writer-wins.
///
/// Every commit runs on a task of its own: once a WAL append has been issued
/// the matching in-memory apply follows even if the caller stops waiting.
pub struct Engine {
    pub(super) days: DashMap<NaiveDate, SharedDayLedger>,
    /// Reverse lookup: appointment id → date of its ledger.
    pub(super) appointment_dates: Arc<DashMap<Ulid, NaiveDate>>,
    pub(super) hours: Arc<DashMap<u8, WorkingHours>>,
    pub(super) closed_dates: Arc<DashSet<NaiveDate>>,
    pub(super) services: Arc<DashMap<Ulid, Service>>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Held shared by every commit and exclusively by compaction, so a
    /// compacted log never misses a commit that raced the snapshot.
    pub(super) commit_gate: Arc<RwLock<()>>,
    /// Serialises configuration writes so WAL order matches memory order.
    pub(super) config_lock: Arc<Mutex<()>>,
}

impl Engine {
    /// Replay the WAL at `wal_path` and start the background writer.
    /// Must be called from within a tokio runtime.
    pub fn new(wal_path: PathBuf) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            days: DashMap::new(),
            appointment_dates: Arc::new(DashMap::new()),
            hours: Arc::new(DashMap::new()),
            closed_dates: Arc::new(DashSet::new()),
            services: Arc::new(DashMap::new()),
            wal_tx,
            commit_gate: Arc::new(RwLock::new(())),
            config_lock: Arc::new(Mutex::new(())),
        };
        let committer = engine.committer();

        // Ledgers are rebuilt unshared and only wrapped in locks at the end.
        let mut ledgers: HashMap<NaiveDate, DayLedger> = HashMap::new();
        let mut discarded = 0usize;
        for event in &events {
            match event_date(event) {
                Some(date) => {
                    let ledger = ledgers.entry(date).or_insert_with(|| DayLedger::new(date));
                    if let Event::AppointmentBooked { appointment } = event
                        && appointment.holds_slot()
                        && let Err(e) = conflict::check_slot_vacant(ledger, appointment.time_slot)
                    {
                        tracing::warn!(
                            appointment_id = %appointment.id,
                            error = %e,
                            "replayed booking collides with a held slot, discarded"
                        );
                        discarded += 1;
                        continue;
                    }
                    committer.apply_to_ledger(ledger, event);
                }
                None => committer.apply_config(event),
            }
        }
        for (date, ledger) in ledgers {
            engine.days.insert(date, Arc::new(RwLock::new(ledger)));
        }

        tracing::info!(
            events = events.len(),
            discarded,
            days = engine.days.len(),
            appointments = engine.appointment_dates.len(),
            "engine state replayed"
        );
        Ok(engine)
    }

    fn committer(&self) -> Committer {
        Committer {
            wal_tx: self.wal_tx.clone(),
            appointment_dates: self.appointment_dates.clone(),
            hours: self.hours.clone(),
            closed_dates: self.closed_dates.clone(),
            services: self.services.clone(),
        }
    }

    /// Shared hold on the commit gate that can move into a commit task.
    pub(super) async fn enter_commit(&self) -> OwnedRwLockReadGuard<()> {
        self.commit_gate.clone().read_owned().await
    }

    /// WAL-append `event` then apply it to the ledger the caller has locked.
    ///
    /// Both steps run on a spawned task that owns `gate` and `ledger`, so
    /// dropping the returned future abandons only the wait. The ledger guard
    /// comes back once the event is applied.
    pub(super) async fn commit_to_ledger(
        &self,
        gate: OwnedRwLockReadGuard<()>,
        mut ledger: OwnedRwLockWriteGuard<DayLedger>,
        event: Event,
    ) -> Result<OwnedRwLockWriteGuard<DayLedger>, EngineError> {
        let committer = self.committer();
        let task = tokio::spawn(async move {
            let _gate = gate;
            committer.wal_append(&event).await?;
            committer.apply_to_ledger(&mut ledger, &event);
            Ok::<_, EngineError>(ledger)
        });
        join_commit(task).await
    }

    /// WAL-append then apply a configuration event, detached like
    /// [`Engine::commit_to_ledger`].
    pub(super) async fn commit_config(&self, event: Event) -> Result<(), EngineError> {
        let gate = self.enter_commit().await;
        let serial = self.config_lock.clone().lock_owned().await;
        let committer = self.committer();
        let task = tokio::spawn(async move {
            let (_gate, _serial) = (gate, serial);
            committer.wal_append(&event).await?;
            committer.apply_config(&event);
            Ok::<_, EngineError>(())
        });
        join_commit(task).await
    }

    pub fn get_day(&self, date: &NaiveDate) -> Option<SharedDayLedger> {
        self.days.get(date).map(|e| e.value().clone())
    }

    pub(super) fn day_or_create(&self, date: NaiveDate) -> SharedDayLedger {
        self.days
            .entry(date)
            .or_insert_with(|| Arc::new(RwLock::new(DayLedger::new(date))))
            .value()
            .clone()
    }

    /// Lookup appointment → date, get the ledger, acquire its write lock.
    pub(super) async fn resolve_appointment_write(
        &self,
        id: &Ulid,
    ) -> Result<OwnedRwLockWriteGuard<DayLedger>, EngineError> {
        let date = self
            .appointment_dates
            .get(id)
            .map(|e| *e.value())
            .ok_or(EngineError::NotFound(*id))?;
        let ledger = self.get_day(&date).ok_or(EngineError::NotFound(*id))?;
        Ok(ledger.write_owned().await)
    }
}

/// The ledger date an appointment event belongs to.
fn event_date(event: &Event) -> Option<NaiveDate> {
    match event {
        Event::AppointmentBooked { appointment } => Some(appointment.date),
        Event::AppointmentReviewed { date, .. } => Some(*date),
        Event::WorkingHoursSet { .. }
        | Event::DateClosed { .. }
        | Event::DateReopened { .. }
        | Event::ServiceSaved { .. } => None,
    }
}
