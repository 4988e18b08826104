//! `AppContext`: the explicit, constructor-injected handle bundle that
//! replaces the teacher's module-level singletons (spec.md §9). Every
//! HTTP handler, the simulator and the CLI share one `Arc<AppContext>`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::SettingsHandle;
use crate::hub::FanoutHub;
use crate::identity::IdentityStore;
use crate::llm::{DisabledLlmClient, LlmClient};
use crate::simulator::Simulator;
use crate::storage::LogStore;
use crate::supervisor::{Clock, Supervisor, SystemClock};

pub struct AppContext {
    pub data_dir: PathBuf,
    pub settings: SettingsHandle,
    pub identity: IdentityStore,
    pub store: Arc<LogStore>,
    pub hub: Arc<FanoutHub>,
    pub llm: Arc<dyn LlmClient>,
    pub clock: Arc<dyn Clock>,
    pub supervisor: Supervisor,
    pub simulator: Simulator,
}

impl AppContext {
    pub fn open(data_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.into();
        let settings = SettingsHandle::load_from_disk(&data_dir)?;
        let identity = IdentityStore::open(&data_dir)?;
        let store = Arc::new(LogStore::open(&data_dir)?);

        let llm: Arc<dyn LlmClient> = {
            let loaded = settings.load();
            match (loaded.llm.enabled, &loaded.llm.api_base, &loaded.llm.model) {
                (true, Some(api_base), Some(model)) => Arc::new(crate::llm::HttpLlmClient::new(
                    api_base.clone(),
                    model.clone(),
                    std::env::var("ALIBI_LLM_API_KEY").ok(),
                )),
                _ => Arc::new(DisabledLlmClient),
            }
        };

        Ok(Self {
            data_dir,
            settings,
            identity,
            store,
            hub: Arc::new(FanoutHub::new()),
            llm,
            clock: Arc::new(SystemClock),
            supervisor: Supervisor::new(),
            simulator: Simulator::new(),
        })
    }
}
