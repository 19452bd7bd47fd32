use std::sync::mpsc::Sender;
use std::sync::Arc;

use super::dummy::DummyIO;
use super::ecobee::dummy::{Dummy, DummyStats, ModifyState};
use super::ecobee::model::ThermostatSnapshot;
use super::notify::dummy::{DummyNotifier, SentNotifications};
use super::notify::Notifications;
use super::IOBundle;

pub struct DummyIOBundleHandle {
    ecobee_handle: Sender<ModifyState>,
    ecobee_stats: Arc<DummyStats>,
    sent: SentNotifications,
}

impl DummyIOBundleHandle {
    pub fn send_ecobee(&mut self, msg: ModifyState) {
        // The bundle owning the receiver may already be gone, in which case nothing is listening.
        let _ = self.ecobee_handle.send(msg);
    }

    pub fn ecobee_stats(&self) -> &DummyStats {
        &self.ecobee_stats
    }

    /// (title, message) of every notification sent so far.
    pub fn sent_notifications(&self) -> Vec<(String, String)> {
        self.sent.lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

pub fn new_dummy_io(snapshot: &ThermostatSnapshot) -> (IOBundle, DummyIOBundleHandle) {
    let (ecobee, ecobee_handle) = Dummy::create(snapshot);
    let ecobee_stats = ecobee.stats();
    let notifier = DummyNotifier::new();
    let sent = notifier.sent();

    let io_bundle = IOBundle::new(ecobee, Notifications::new(vec![Box::new(notifier)]));

    let handle = DummyIOBundleHandle {
        ecobee_handle,
        ecobee_stats,
        sent,
    };

    (io_bundle, handle)
}
