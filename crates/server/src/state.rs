use std::sync::Arc;

use db::Db;
use services::services::{
    config::AppConfig, discord::DiscordClient, meta::MetaClient, twitter::TwitterClient,
    youtube::YoutubeClient,
};

/// Outbound API clients shared by every request.
#[derive(Clone, Debug)]
pub struct Clients {
    pub twitter: TwitterClient,
    pub youtube: YoutubeClient,
    pub meta: MetaClient,
    pub discord: DiscordClient,
}

#[derive(Clone)]
pub struct AppState {
    db: Db,
    config: Arc<AppConfig>,
    clients: Clients,
}

impl AppState {
    pub fn new(db: Db, config: AppConfig, clients: Clients) -> Self {
        Self {
            db,
            config: Arc::new(config),
            clients,
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn twitter(&self) -> &TwitterClient {
        &self.clients.twitter
    }

    pub fn youtube(&self) -> &YoutubeClient {
        &self.clients.youtube
    }

    pub fn meta(&self) -> &MetaClient {
        &self.clients.meta
    }

    pub fn discord(&self) -> &DiscordClient {
        &self.clients.discord
    }
}
