pub mod dummy;
pub mod dummy_io_bundle;
pub mod ecobee;
pub mod notify;

use crate::io::ecobee::EcobeeHub;
use crate::io::notify::Notifications;

pub struct IOBundle {
    ecobee: Box<dyn EcobeeHub>,
    notifications: Notifications,
}

impl IOBundle {
    pub fn new(ecobee: impl EcobeeHub + 'static, notifications: Notifications) -> IOBundle {
        IOBundle {
            ecobee: Box::new(ecobee),
            notifications,
        }
    }

    pub fn ecobee(&self) -> &dyn EcobeeHub {
        &*self.ecobee
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }
}
