use std::sync::Arc;

use crate::{
    config::Settings, email::Mailer, notifier::ChangeNotifier, payments::AsaasClient,
    service::ServiceContext,
};

#[derive(Clone)]
pub struct AppState {
    pub service_context: Arc<ServiceContext>,
    pub notifier: Arc<ChangeNotifier>,
    pub billing_client: Option<Arc<AsaasClient>>,
    pub mailer: Option<Arc<Mailer>>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        service_context: Arc<ServiceContext>,
        notifier: Arc<ChangeNotifier>,
        billing_client: Option<Arc<AsaasClient>>,
        mailer: Option<Arc<Mailer>>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            service_context,
            notifier,
            billing_client,
            mailer,
            settings,
        }
    }
}
