use campus_common::Money;
use checkout_engine::{
    db_types::{CheckoutSession, Order, UserId},
    events::EventProducers,
    order_objects::ConfirmationResult,
    session_objects::IntentResponse,
    test_utils::{
        prepare_env::{create_database, random_db_path, run_migrations},
        MockGateway,
    },
    CheckoutConfig,
    CheckoutError,
    CheckoutSessionApi,
    OrderFulfillmentApi,
    OrderStatusApi,
    PaymentIntentApi,
    SideEffectDispatcher,
    SqliteDatabase,
};
use cucumber::World;
use log::*;

#[derive(Default, Debug, World)]
pub struct CheckoutWorld {
    pub system: Option<CheckoutSystem>,
    /// Every session started in the scenario, oldest first.
    pub sessions: Vec<CheckoutSession>,
    pub intents: Vec<IntentResponse>,
    pub confirmation: Option<ConfirmationResult>,
    pub last_error: Option<CheckoutError>,
}

#[derive(Debug)]
pub struct CheckoutSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub gateway: MockGateway,
    pub sessions: CheckoutSessionApi<SqliteDatabase, MockGateway>,
    pub payments: PaymentIntentApi<SqliteDatabase, MockGateway>,
    pub fulfillment: OrderFulfillmentApi<SqliteDatabase, MockGateway>,
    pub status: OrderStatusApi<SqliteDatabase>,
    pub config: CheckoutConfig,
}

impl CheckoutWorld {
    pub fn system(&self) -> &CheckoutSystem {
        self.system.as_ref().expect("Checkout system not initialised")
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.system().db
    }

    pub fn session(&self) -> &CheckoutSession {
        self.sessions.last().expect("No checkout session has been started")
    }

    pub fn order_from(&self, seller: &str) -> Order {
        let confirmation = self.confirmation.as_ref().expect("The checkout has not been confirmed");
        confirmation
            .orders
            .iter()
            .find(|o| o.seller_id() == &UserId::from(seller))
            .cloned()
            .unwrap_or_else(|| panic!("No order from seller {seller}"))
    }

    /// Records the outcome of a call, so that later steps can check for the error.
    pub fn record<T>(&mut self, result: Result<T, CheckoutError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                debug!("🥒 Step returned an error: {e}");
                self.last_error = Some(e);
                None
            },
        }
    }
}

impl CheckoutSystem {
    pub async fn new() -> Self {
        let db_path = random_db_path();
        create_database(&db_path).await;
        let db = run_migrations(&db_path).await;
        debug!("🥒 Created database: {db_path}");
        let gateway = MockGateway::new();
        let config = CheckoutConfig::default().with_min_intent_amount(Money::from_cents(50));
        let sessions = CheckoutSessionApi::new(db.clone(), gateway.clone(), config.clone());
        let payments = PaymentIntentApi::new(db.clone(), gateway.clone(), config.clone());
        let fulfillment =
            OrderFulfillmentApi::new(db.clone(), gateway.clone(), config.clone(), EventProducers::default());
        let status = OrderStatusApi::new(db.clone(), &config, EventProducers::default());
        Self { db_path, db, gateway, sessions, payments, fulfillment, status, config }
    }

    pub fn dispatcher(&self) -> SideEffectDispatcher<SqliteDatabase, SqliteDatabase, SqliteDatabase> {
        SideEffectDispatcher::new(self.db.clone(), self.db.clone(), self.db.clone(), self.config.outbox_max_attempts)
    }
}
