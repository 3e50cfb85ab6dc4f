pub mod common;
pub mod items;
pub mod job_works;
pub mod movements;
pub mod purchase_indents;
pub mod purchase_orders;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    item_state::ItemStateService, items::ItemService, job_works::JobWorkService,
    movements::MovementService, purchase_indents::PurchaseIndentService,
    purchase_orders::PurchaseOrderService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub item_state: Arc<ItemStateService>,
    pub items: Arc<ItemService>,
    pub purchase_indents: Arc<PurchaseIndentService>,
    pub purchase_orders: Arc<PurchaseOrderService>,
    pub movements: Arc<MovementService>,
    pub job_works: Arc<JobWorkService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let item_state = Arc::new(ItemStateService::new(db.clone()));
        let items = Arc::new(ItemService::new(db.clone(), event_sender.clone()));
        let purchase_indents = Arc::new(PurchaseIndentService::new(
            db.clone(),
            event_sender.clone(),
            item_state.clone(),
        ));
        let purchase_orders = Arc::new(PurchaseOrderService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let movements = Arc::new(MovementService::new(
            db.clone(),
            event_sender.clone(),
            item_state.clone(),
        ));
        let job_works = Arc::new(JobWorkService::new(db, event_sender, item_state.clone()));

        Self {
            item_state,
            items,
            purchase_indents,
            purchase_orders,
            movements,
            job_works,
        }
    }
}
