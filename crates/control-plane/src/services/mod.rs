// Services layer for business logic
// Services own business logic and validation, calling storage directly and
// dispatching every write through the matching event stream hub

pub mod notification;
pub mod task;

use std::sync::Arc;
use studio_core::{EventStreamHub, HubConfig};
use studio_storage::{
    create_db_notification_source, create_db_task_source, DbNotificationSource, DbTaskSource,
    StorageBackend,
};

pub use notification::NotificationService;
pub use task::TaskService;

/// Hub streaming tasks to their owners
pub type TaskHub = EventStreamHub<DbTaskSource>;

/// Hub streaming notifications to their owners
pub type NotificationHub = EventStreamHub<DbNotificationSource>;

/// Both hubs of one server process
#[derive(Clone)]
pub struct Hubs {
    pub tasks: Arc<TaskHub>,
    pub notifications: Arc<NotificationHub>,
}

impl Hubs {
    pub fn new(db: Arc<StorageBackend>, config: HubConfig) -> Self {
        Self {
            tasks: Arc::new(EventStreamHub::new(
                Arc::new(create_db_task_source(db.clone())),
                config.clone(),
            )),
            notifications: Arc::new(EventStreamHub::new(
                Arc::new(create_db_notification_source(db)),
                config,
            )),
        }
    }

    /// Close every open stream of both hubs
    pub fn shutdown(&self) -> usize {
        self.tasks.shutdown() + self.notifications.shutdown()
    }

    /// Open streams across both hubs
    pub fn connection_count(&self) -> usize {
        self.tasks.registry().connection_count()
            + self.notifications.registry().connection_count()
    }
}

/// Services wired to one storage backend and one set of hubs
#[derive(Clone)]
pub struct Services {
    pub tasks: Arc<TaskService>,
    pub notifications: Arc<NotificationService>,
}

impl Services {
    pub fn new(db: Arc<StorageBackend>, hubs: &Hubs) -> Self {
        let notifications = Arc::new(NotificationService::new(
            db.clone(),
            hubs.notifications.clone(),
        ));
        let tasks = Arc::new(TaskService::new(
            db,
            hubs.tasks.clone(),
            notifications.clone(),
        ));
        Self {
            tasks,
            notifications,
        }
    }
}
