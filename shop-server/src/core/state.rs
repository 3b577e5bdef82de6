use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditLogRequest, AuditService, AuditStorage, AuditWorker};
use crate::auth::JwtService;
use crate::cache::{Cache, MemoryCache};
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result};
use crate::message::{MessageBus, Notification};
use crate::orders::OrdersManager;
use crate::payment::{PaymentService, VnpayGateway};
use crate::storage::ShopStorage;

/// Shared handles for every request
///
/// Cloning is cheap: every service sits behind an `Arc`.
///
/// | Field | Role |
/// |-------|------|
/// | config | immutable configuration |
/// | storage | redb database (orders, catalog, vouchers, carts) |
/// | cache | order read cache |
/// | message_bus | user notification broadcast |
/// | audit | hash-chained audit log |
/// | orders | checkout orchestration |
/// | payment | VNPay adapter |
/// | jwt_service | bearer token validation |
/// | started_at | process start, for uptime |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub storage: ShopStorage,
    pub cache: Arc<dyn Cache>,
    pub message_bus: Arc<MessageBus>,
    pub audit: Arc<AuditService>,
    pub orders: Arc<OrdersManager>,
    pub payment: Arc<PaymentService>,
    pub jwt_service: Arc<JwtService>,
    pub started_at: Instant,
    audit_storage: AuditStorage,
    /// Taken by [`Self::start_background_tasks`]
    audit_rx: Arc<Mutex<Option<mpsc::Receiver<AuditLogRequest>>>>,
}

impl ServerState {
    /// Open the database under `work_dir` and wire every service
    pub fn initialize(config: &Config) -> Result<Self> {
        config.ensure_work_dir_structure()?;
        let storage = ShopStorage::open(config.database_path())?;
        tracing::info!(path = %config.database_path().display(), "Database opened");
        Self::with_storage(config.clone(), storage)
    }

    /// Wire every service on top of an already opened database
    pub fn with_storage(config: Config, storage: ShopStorage) -> Result<Self> {
        let audit_storage = AuditStorage::open(storage.database())?;
        let (audit, audit_rx) = AuditService::new(audit_storage.clone(), config.audit_buffer_size);

        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
        let message_bus = Arc::new(MessageBus::new());

        let orders = Arc::new(
            OrdersManager::new(
                storage.clone(),
                cache.clone(),
                message_bus.clone(),
                audit.clone(),
            )
            .with_cache_ttl(config.cache_ttl()),
        );
        let payment = Arc::new(PaymentService::new(
            VnpayGateway::new(config.vnpay.clone()),
            orders.clone(),
            audit.clone(),
        ));
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Ok(Self {
            config,
            storage,
            cache,
            message_bus,
            audit,
            orders,
            payment,
            jwt_service,
            started_at: Instant::now(),
            audit_storage,
            audit_rx: Arc::new(Mutex::new(Some(audit_rx))),
        })
    }

    /// Start the audit writer and the notification relay
    ///
    /// Only the first call starts the audit writer; the channel has a single
    /// consumer.
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let rx = self.audit_rx.lock().ok().and_then(|mut slot| slot.take());
        match rx {
            Some(rx) => {
                let worker = AuditWorker::new(self.audit_storage.clone());
                let token = tasks.shutdown_token();
                tasks.spawn("audit_worker", TaskKind::Worker, async move {
                    worker.run(rx, token).await;
                });
            }
            None => tracing::warn!("Audit worker already started"),
        }

        let notifications = self.message_bus.subscribe();
        let token = tasks.shutdown_token();
        tasks.spawn("notification_relay", TaskKind::Listener, async move {
            relay_notifications(notifications, token).await;
        });

        tasks
    }
}

/// Log every published notification until shutdown
///
/// Delivery to end users (push, email) subscribes to the same bus.
async fn relay_notifications(
    mut rx: broadcast::Receiver<Notification>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = rx.recv() => match received {
                Ok(n) => {
                    tracing::info!(
                        user_id = n.user_id,
                        kind = ?n.kind,
                        title = %n.title,
                        "Notification published"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification relay lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
