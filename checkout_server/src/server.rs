use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use checkout_engine::{
    events::EventProducers,
    traits::{CheckoutDatabase, PaymentGateway},
    CheckoutConfig,
    CheckoutSessionApi,
    OrderFulfillmentApi,
    OrderStatusApi,
    PaymentIntentApi,
    SideEffectDispatcher,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::{audit_event_handlers, StripeGateway},
    outbox_worker::start_outbox_worker,
    routes::*,
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    SqliteDatabase::create_if_missing(&config.database_url)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    let gateway = StripeGateway::new(config.stripe.clone());
    if !gateway.is_configured() {
        warn!("💳 No payment gateway is configured. Only cash on delivery checkouts will succeed.");
    }
    let checkout_config = config.checkout_config();
    let handlers = audit_event_handlers(EVENT_BUFFER_SIZE);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    // Neither worker is ever awaited
    let _expiry = start_expiry_worker(db.clone(), gateway.clone(), checkout_config.clone(), config.expiry_sweep_interval);
    let _outbox = start_outbox_worker(db.clone(), checkout_config.outbox_max_attempts, config.outbox_poll_interval);
    let srv = create_server_instance(config, checkout_config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::InitializeError(e.to_string()))
}

pub fn create_server_instance<G>(
    config: ServerConfig,
    checkout_config: CheckoutConfig,
    db: SqliteDatabase,
    gateway: G,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    G: PaymentGateway + Send + 'static,
{
    let options = ServerOptions::from_config(&config);
    let srv = HttpServer::new(move || {
        let app = App::new().wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("checkout::access_log"));
        configure_app::<SqliteDatabase, G, _>(
            app,
            db.clone(),
            gateway.clone(),
            checkout_config.clone(),
            producers.clone(),
            options,
        )
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Checkout server listening on {}:{}", config.host, config.port);
    Ok(srv)
}

/// Registers the APIs and every route on an app. Shared by the server and the endpoint tests.
pub fn configure_app<B, G, T>(
    app: App<T>,
    db: B,
    gateway: G,
    config: CheckoutConfig,
    producers: EventProducers,
    options: ServerOptions,
) -> App<T>
where
    B: CheckoutDatabase + 'static,
    G: PaymentGateway + 'static,
    T: actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Error = actix_web::Error,
        InitError = (),
    >,
{
    let sessions_api = CheckoutSessionApi::new(db.clone(), gateway.clone(), config.clone());
    let payments_api = PaymentIntentApi::new(db.clone(), gateway.clone(), config.clone());
    let fulfillment_api = OrderFulfillmentApi::new(db.clone(), gateway, config.clone(), producers.clone());
    let status_api = OrderStatusApi::new(db.clone(), &config, producers);
    let dispatcher = SideEffectDispatcher::new(db.clone(), db.clone(), db.clone(), config.outbox_max_attempts);
    let api_scope = web::scope("/api")
        .service(CheckoutFromCartRoute::<B, G>::new())
        .service(CheckoutDirectRoute::<B, G>::new())
        .service(ActiveSessionRoute::<B, G>::new())
        .service(SessionByIdRoute::<B, G>::new())
        .service(UpdateSessionRoute::<B, G>::new())
        .service(CancelSessionRoute::<B, G>::new())
        .service(CreatePaymentIntentRoute::<B, G>::new())
        .service(PaymentStatusRoute::<B, G>::new())
        .service(ConfirmPaymentIntentRoute::<B, G>::new())
        .service(CancelPaymentIntentRoute::<B, G>::new())
        .service(ConfirmCheckoutRoute::<B, G>::new())
        .service(MyPurchasesRoute::<B>::new())
        .service(MySalesRoute::<B>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(UpdateOrderStatusRoute::<B>::new())
        .service(CancelOrderRoute::<B>::new())
        .service(OrderStockMovementsRoute::<B>::new())
        .service(MyNotificationsRoute::<B>::new())
        .service(MyEarningsRoute::<B>::new())
        .service(BuyerOrdersRoute::<B>::new())
        .service(SellerOrdersRoute::<B>::new())
        .service(DispatchOutboxRoute::<B>::new());
    app.app_data(web::Data::new(options))
        .app_data(web::Data::new(sessions_api))
        .app_data(web::Data::new(payments_api))
        .app_data(web::Data::new(fulfillment_api))
        .app_data(web::Data::new(status_api))
        .app_data(web::Data::new(dispatcher))
        .app_data(web::Data::new(db))
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            let message = err.to_string();
            debug!("💻️ Rejecting request body. {message}");
            ServerError::InvalidRequestBody(message).into()
        }))
        .service(health)
        .service(api_scope)
}
