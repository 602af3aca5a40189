pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;

use std::sync::Arc;

use crate::config::Config;
use crate::db::Db;
use crate::hub::Hub;
use crate::mailer::Mailer;
use crate::recognizer::Recognizer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Db,
    pub hub: Arc<Hub>,
    pub recognizer: Arc<dyn Recognizer>,
    pub mailer: Arc<Mailer>,
}
