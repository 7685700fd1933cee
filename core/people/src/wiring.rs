//! 配線: 標準アダプタで App を組み立てる

use std::sync::Arc;
use std::time::Duration;

use common::adapter::{FileJsonLog, NoopLog, ReqwestTransport, StdClock, StdEnvResolver, StdFileSystem, StdKeyGenerator};
use common::config::ClientConfig;
use common::error::Error;
use common::http::ResourceClient;
use common::ports::outbound::{Clock, FileSystem, HttpTransport, KeyGenerator, Log};

use crate::store::SessionStore;
use crate::usecase::cards::CardQueries;
use crate::usecase::credits::CreditLedgerView;
use crate::usecase::drafts::DraftWorkflow;
use crate::usecase::mutation::MutationCoordinator;
use crate::usecase::profile::ProfileQueries;
use crate::usecase::recent::RecentSearches;
use crate::usecase::search::SearchSessionManager;
use crate::usecase::unlock::ContactUnlocker;
use crate::usecase::{Deps, Settings};

/// 認証済みセッション 1 つ分のユースケース一式
pub struct App {
    pub store: Arc<SessionStore>,
    pub log: Arc<dyn Log>,
    pub credits: CreditLedgerView,
    pub cards: CardQueries,
    pub mutations: MutationCoordinator,
    pub drafts: DraftWorkflow,
    pub search: SearchSessionManager,
    pub recent: RecentSearches,
    pub profiles: ProfileQueries,
    pub unlock: ContactUnlocker,
}

impl App {
    /// 同じ Deps（同じストア）を共有するユースケースを作る
    pub fn from_deps(deps: Deps) -> Self {
        Self {
            store: Arc::clone(&deps.store),
            log: Arc::clone(&deps.log),
            credits: CreditLedgerView::new(deps.clone()),
            cards: CardQueries::new(deps.clone()),
            mutations: MutationCoordinator::new(deps.clone()),
            drafts: DraftWorkflow::new(deps.clone()),
            search: SearchSessionManager::new(deps.clone()),
            recent: RecentSearches::new(deps.clone()),
            profiles: ProfileQueries::new(deps.clone()),
            unlock: ContactUnlocker::new(deps),
        }
    }

    /// ログアウト（ストアを空にする）
    pub fn logout(&self) {
        self.store.teardown();
    }
}

/// 設定ファイルと環境変数から ClientConfig を読む
pub fn load_config() -> Result<ClientConfig, Error> {
    ClientConfig::load(&StdFileSystem, &StdEnvResolver)
}

/// 任意の Transport / Clock / KeyGenerator / Log で Deps を組み立てる
pub fn deps_with(
    config: &ClientConfig,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    keys: Arc<dyn KeyGenerator>,
    log: Arc<dyn Log>,
) -> Deps {
    let client = ResourceClient::new(transport, config.api_base_url.clone(), config.token.clone());
    Deps {
        client: Arc::new(client),
        store: Arc::new(SessionStore::new()),
        clock,
        keys,
        log,
        settings: Settings {
            page_size: config.page_size,
            credits_stale_ms: config.credits_stale_ms,
        },
    }
}

/// 配線: 標準アダプタで App を組み立てる
pub fn wire_people(config: &ClientConfig) -> Result<App, Error> {
    let fs: Arc<dyn FileSystem> = Arc::new(StdFileSystem);
    let clock: Arc<dyn Clock> = Arc::new(StdClock);
    let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(
        config.request_timeout_secs,
    ))?);
    let keys = Arc::new(StdKeyGenerator::new(Arc::clone(&clock)));
    let log: Arc<dyn Log> = match &config.log_file {
        Some(path) => Arc::new(FileJsonLog::new(fs, path)),
        None => Arc::new(NoopLog),
    };
    Ok(App::from_deps(deps_with(config, transport, clock, keys, log)))
}
