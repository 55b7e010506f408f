use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use crate::admin;
use crate::config::ConfigSource;
use crate::engine;
use crate::identity::{Identity, ImplicitAuthorization};
use crate::monitor::StoreMonitor;
use crate::nss::{NssDatabase, UnixDatabase};
use crate::rules::Details;
use crate::store::StoreSet;

/// Default top-level authorization store paths, in precedence-index order.
pub const DEFAULT_STORE_PATHS: &[&str] = &[
    "/etc/polkit-1/localauthority",
    "/var/lib/polkit-1/localauthority",
];

/// Default directory of local-authority configuration files.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/polkit-1/localauthority.conf.d";

/// The narrow interface a host authority consumes: the implicit-authorization
/// decision and the admin identity list. The host owns prompts, temporary
/// authorizations and IPC; this engine owns local policy.
pub trait PolicyAuthority {
    #[allow(clippy::too_many_arguments)]
    fn check_authorization_sync(
        &self,
        user_for_subject: &Identity,
        subject_is_local: bool,
        subject_is_active: bool,
        action_id: &str,
        details: &Details,
        implicit: ImplicitAuthorization,
    ) -> ImplicitAuthorization;

    fn get_admin_identities(&self) -> Vec<Identity>;
}

pub struct AuthorityBuilder {
    store_paths: Vec<PathBuf>,
    config_path: PathBuf,
    database: Option<Arc<dyn UnixDatabase>>,
    monitor: bool,
    poll_interval: Duration,
}

impl AuthorityBuilder {
    fn new() -> AuthorityBuilder {
        AuthorityBuilder {
            store_paths: DEFAULT_STORE_PATHS.iter().map(PathBuf::from).collect(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            database: None,
            monitor: true,
            poll_interval: Duration::from_secs(2),
        }
    }

    /// Top-level store paths; the position in the list is the precedence
    /// index used in the store sort key.
    pub fn store_paths<I, P>(mut self, paths: I) -> AuthorityBuilder
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.store_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn config_path(mut self, path: impl Into<PathBuf>) -> AuthorityBuilder {
        self.config_path = path.into();
        self
    }

    /// The unix database to consult for groups and netgroups. Defaults to
    /// the system NSS databases.
    pub fn database(mut self, database: Arc<dyn UnixDatabase>) -> AuthorityBuilder {
        self.database = Some(database);
        self
    }

    /// Whether to watch the store paths and rebuild on change.
    pub fn monitor(mut self, enabled: bool) -> AuthorityBuilder {
        self.monitor = enabled;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> AuthorityBuilder {
        self.poll_interval = interval;
        self
    }

    /// Build the store set and config source, and start the monitor if
    /// enabled. Construction never fails; unreadable paths yield empty
    /// stores after warnings.
    pub fn build(self) -> Authority {
        let stores = Arc::new(RwLock::new(StoreSet::build(&self.store_paths)));
        let config = ConfigSource::new(&self.config_path);
        let database = self
            .database
            .unwrap_or_else(|| Arc::new(NssDatabase) as Arc<dyn UnixDatabase>);

        let (events, changed) = std::sync::mpsc::channel();
        let monitor = if self.monitor {
            Some(StoreMonitor::spawn(
                self.store_paths.clone(),
                Arc::clone(&stores),
                self.poll_interval,
                events,
            ))
        } else {
            None
        };

        Authority {
            store_paths: self.store_paths,
            stores,
            config,
            database,
            monitor,
            changed: Mutex::new(changed),
        }
    }
}

/// The local authorization authority: owns the ordered store set, the
/// configuration source, and (when enabled) the change monitor. Safe to
/// query from multiple threads; rebuilds swap the whole store set. Dropping
/// the authority stops the monitor.
pub struct Authority {
    store_paths: Vec<PathBuf>,
    stores: Arc<RwLock<StoreSet>>,
    config: ConfigSource,
    database: Arc<dyn UnixDatabase>,
    monitor: Option<StoreMonitor>,
    changed: Mutex<Receiver<()>>,
}

impl Authority {
    pub fn builder() -> AuthorityBuilder {
        AuthorityBuilder::new()
    }

    pub fn name(&self) -> &'static str {
        "local"
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_some()
    }

    /// Drain pending change notifications; true when at least one rebuild
    /// happened since the last call.
    pub fn take_changed(&self) -> bool {
        let Ok(receiver) = self.changed.lock() else {
            return false;
        };
        let mut changed = false;
        loop {
            match receiver.try_recv() {
                Ok(()) => changed = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    /// Purge and rebuild the store set from the configured paths.
    pub fn rebuild_stores(&self) {
        let rebuilt = StoreSet::build(&self.store_paths);
        *self
            .stores
            .write()
            .unwrap_or_else(PoisonError::into_inner) = rebuilt;
        tracing::debug!("purged and rebuilt all local authorization stores");
    }
}

impl PolicyAuthority for Authority {
    fn check_authorization_sync(
        &self,
        user_for_subject: &Identity,
        subject_is_local: bool,
        subject_is_active: bool,
        action_id: &str,
        details: &Details,
        implicit: ImplicitAuthorization,
    ) -> ImplicitAuthorization {
        let stores = self
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        engine::check_authorization_sync(
            &stores,
            self.database.as_ref(),
            user_for_subject,
            subject_is_local,
            subject_is_active,
            action_id,
            details,
            implicit,
        )
    }

    fn get_admin_identities(&self) -> Vec<Identity> {
        admin::get_admin_identities(&self.config, self.database.as_ref())
    }
}
