//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into the engine APIs. Keep this module neat and tidy 🙏
//!
//! Every response is wrapped in a [`JsonResponse`] envelope: `{ success, data, error, message }`. Failures carry a
//! machine-readable code in `error` and map onto HTTP statuses as described in [`ServerError`].
//!
//! The caller is identified by the `X-User-Id` header (see [`Caller`]). Checkout sessions can only be seen and changed
//! by the buyer that owns them. Orders can be seen by their buyer, their seller and admins.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. All storage and gateway calls are therefore async.
use actix_web::{get, web, HttpResponse, Responder};
use checkout_engine::{
    db_types::{OrderId, Role, SessionId, UserId},
    order_objects::StatusUpdateRequest,
    session_objects::{DirectPurchase, SessionUpdate},
    traits::{CheckoutDatabase, EarningsLedger, NotificationDispatch, PaymentGateway},
    CheckoutSessionApi,
    OrderFulfillmentApi,
    OrderStatusApi,
    PaymentIntentApi,
    SideEffectDispatcher,
};
use log::*;
use serde_json::json;

use crate::{
    data_objects::{CancelRequest, Caller, JsonResponse, OrderListQuery},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:ty),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:ty),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout sessions  ----------------------------------------------
route!(checkout_from_cart => Post "/checkout/sessions/cart" impl CheckoutDatabase, PaymentGateway);
/// Starts a checkout for everything in the caller's cart.
///
/// Any other open checkout the caller has is cancelled first and its reservations are released.
pub async fn checkout_from_cart<B: CheckoutDatabase, G: PaymentGateway>(
    caller: Caller,
    api: web::Data<CheckoutSessionApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST checkout from cart for {}", caller.id);
    let session = api.create_from_cart(&caller.id).await?;
    Ok(HttpResponse::Created().json(JsonResponse::success("Checkout session created", session)))
}

route!(checkout_direct => Post "/checkout/sessions/direct" impl CheckoutDatabase, PaymentGateway);
/// Starts a "buy now" checkout for a single listing.
pub async fn checkout_direct<B: CheckoutDatabase, G: PaymentGateway>(
    caller: Caller,
    body: web::Json<DirectPurchase>,
    api: web::Data<CheckoutSessionApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let purchase = body.into_inner();
    debug!("💻️ POST direct checkout of {} x{} for {}", purchase.listing_id, purchase.quantity, caller.id);
    let session = api.create_from_direct(&caller.id, purchase).await?;
    Ok(HttpResponse::Created().json(JsonResponse::success("Checkout session created", session)))
}

route!(active_session => Get "/checkout/sessions/active" impl CheckoutDatabase, PaymentGateway);
pub async fn active_session<B: CheckoutDatabase, G: PaymentGateway>(
    caller: Caller,
    api: web::Data<CheckoutSessionApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET active checkout session for {}", caller.id);
    let session = api.get_active(&caller.id).await?;
    let message = if session.is_some() { "Active checkout session" } else { "No active checkout session" };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message, session)))
}

route!(session_by_id => Get "/checkout/sessions/{session_id}" impl CheckoutDatabase, PaymentGateway);
pub async fn session_by_id<B: CheckoutDatabase, G: PaymentGateway>(
    caller: Caller,
    path: web::Path<SessionId>,
    api: web::Data<CheckoutSessionApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = path.into_inner();
    debug!("💻️ GET checkout session {session_id} for {}", caller.id);
    let session = api.get(&session_id, &caller.id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Checkout session", session)))
}

route!(update_session => Patch "/checkout/sessions/{session_id}" impl CheckoutDatabase, PaymentGateway);
/// Changes the delivery method, delivery address and/or payment method of an open checkout. Pricing is recomputed.
pub async fn update_session<B: CheckoutDatabase, G: PaymentGateway>(
    caller: Caller,
    path: web::Path<SessionId>,
    body: web::Json<SessionUpdate>,
    api: web::Data<CheckoutSessionApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = path.into_inner();
    debug!("💻️ PATCH checkout session {session_id} for {}", caller.id);
    let session = api.update(&session_id, &caller.id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Checkout session updated", session)))
}

route!(cancel_session => Post "/checkout/sessions/{session_id}/cancel" impl CheckoutDatabase, PaymentGateway);
pub async fn cancel_session<B: CheckoutDatabase, G: PaymentGateway>(
    caller: Caller,
    path: web::Path<SessionId>,
    api: web::Data<CheckoutSessionApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = path.into_inner();
    debug!("💻️ POST cancel checkout session {session_id} for {}", caller.id);
    let session = api.cancel(&session_id, &caller.id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Checkout session cancelled", session)))
}

//----------------------------------------------   Payment intents  ----------------------------------------------
route!(create_payment_intent => Post "/checkout/sessions/{session_id}/payment_intent" impl CheckoutDatabase, PaymentGateway);
/// Creates a payment intent for the session total. Calling this again returns the same intent.
pub async fn create_payment_intent<B: CheckoutDatabase, G: PaymentGateway>(
    caller: Caller,
    path: web::Path<SessionId>,
    api: web::Data<PaymentIntentApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = path.into_inner();
    debug!("💻️ POST payment intent for checkout session {session_id}");
    let intent = api.create_intent(&session_id, &caller.id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Payment intent ready", intent)))
}

route!(payment_status => Get "/checkout/sessions/{session_id}/payment_status" impl CheckoutDatabase, PaymentGateway);
pub async fn payment_status<B: CheckoutDatabase, G: PaymentGateway>(
    caller: Caller,
    path: web::Path<SessionId>,
    api: web::Data<PaymentIntentApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = path.into_inner();
    debug!("💻️ GET payment status for checkout session {session_id}");
    let status = api.get_status(&session_id, &caller.id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Payment status: {status}"), json!({ "status": status }))))
}

route!(confirm_payment_intent => Post "/checkout/sessions/{session_id}/payment_intent/confirm" impl CheckoutDatabase, PaymentGateway);
pub async fn confirm_payment_intent<B: CheckoutDatabase, G: PaymentGateway>(
    caller: Caller,
    path: web::Path<SessionId>,
    api: web::Data<PaymentIntentApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = path.into_inner();
    debug!("💻️ POST confirm payment intent for checkout session {session_id}");
    let intent = api.confirm_intent(&session_id, &caller.id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Payment intent confirmed", intent)))
}

route!(cancel_payment_intent => Post "/checkout/sessions/{session_id}/payment_intent/cancel" impl CheckoutDatabase, PaymentGateway);
/// Detaches the payment intent from the session and cancels it at the gateway. The session goes back to pending.
pub async fn cancel_payment_intent<B: CheckoutDatabase, G: PaymentGateway>(
    caller: Caller,
    path: web::Path<SessionId>,
    api: web::Data<PaymentIntentApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = path.into_inner();
    debug!("💻️ POST cancel payment intent for checkout session {session_id}");
    let session = api.cancel_intent(&session_id, &caller.id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Payment intent cancelled", session)))
}

//----------------------------------------------   Confirmation  ----------------------------------------------
route!(confirm_checkout => Post "/checkout/sessions/{session_id}/confirm" impl CheckoutDatabase, PaymentGateway);
/// Confirms a checkout, creating one order per seller.
///
/// If some sellers' orders could not be created, the request still succeeds and `data.failures` lists them.
pub async fn confirm_checkout<B: CheckoutDatabase, G: PaymentGateway>(
    caller: Caller,
    path: web::Path<SessionId>,
    api: web::Data<OrderFulfillmentApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = path.into_inner();
    debug!("💻️ POST confirm checkout session {session_id} for {}", caller.id);
    let result = api.confirm(&session_id, &caller.id).await?;
    let message = if result.is_partial() {
        format!("{} orders placed. {} sellers could not fulfil their part", result.orders.len(), result.failures.len())
    } else {
        format!("{} orders placed", result.orders.len())
    };
    Ok(HttpResponse::Created().json(JsonResponse::success(message, result)))
}

//----------------------------------------------   Orders  ----------------------------------------------
route!(my_purchases => Get "/orders/buying" impl CheckoutDatabase);
pub async fn my_purchases<B: CheckoutDatabase>(
    caller: Caller,
    query: web::Query<OrderListQuery>,
    api: web::Data<OrderStatusApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders bought by {}", caller.id);
    let orders = api.orders_for_buyer(&caller.id, query.status).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} orders", orders.len()), orders)))
}

route!(my_sales => Get "/orders/selling" impl CheckoutDatabase);
pub async fn my_sales<B: CheckoutDatabase>(
    caller: Caller,
    query: web::Query<OrderListQuery>,
    api: web::Data<OrderStatusApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders sold by {}", caller.id);
    let orders = api.orders_for_seller(&caller.id, query.status).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} orders", orders.len()), orders)))
}

route!(order_by_id => Get "/orders/{order_id}" impl CheckoutDatabase);
pub async fn order_by_id<B: CheckoutDatabase>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderStatusApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id} for {}", caller.id);
    let order = api.get_order(&order_id, &caller.actor()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Order", order)))
}

route!(update_order_status => Patch "/orders/{order_id}/status" impl CheckoutDatabase);
/// Moves an order along its lifecycle. Sellers and admins drive the order forward; buyers may only cancel a pending
/// order.
pub async fn update_order_status<B: CheckoutDatabase>(
    caller: Caller,
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderStatusApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let request = body.into_inner();
    debug!("💻️ PATCH order {order_id} to {} by {}", request.status, caller.id);
    let order = api.update_status(&order_id, &caller.actor(), request).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order is now {}", order.status), order)))
}

route!(cancel_order => Post "/orders/{order_id}/cancel" impl CheckoutDatabase);
pub async fn cancel_order<B: CheckoutDatabase>(
    caller: Caller,
    path: web::Path<OrderId>,
    body: Option<web::Json<CancelRequest>>,
    api: web::Data<OrderStatusApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let reason = body.and_then(|b| b.into_inner().reason);
    debug!("💻️ POST cancel order {order_id} by {}", caller.id);
    let order = api.cancel(&order_id, &caller.actor(), reason).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Order cancelled", order)))
}

route!(order_stock_movements => Get "/orders/{order_id}/stock_movements" impl CheckoutDatabase);
pub async fn order_stock_movements<B: CheckoutDatabase>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderStatusApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET stock movements for order {order_id}");
    let movements = api.stock_movements(&order_id, &caller.actor()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} stock movements", movements.len()), movements)))
}

//----------------------------------------------   Notifications & earnings  ----------------------------------------
route!(my_notifications => Get "/notifications" impl NotificationDispatch);
pub async fn my_notifications<B: NotificationDispatch>(
    caller: Caller,
    db: web::Data<B>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET notifications for {}", caller.id);
    let notifications = db.fetch_notifications(&caller.id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} notifications", notifications.len()), notifications)))
}

route!(my_earnings => Get "/earnings" impl EarningsLedger);
pub async fn my_earnings<B: EarningsLedger>(caller: Caller, db: web::Data<B>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET earnings for {}", caller.id);
    let entries = db.fetch_earnings(&caller.id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} earnings entries", entries.len()), entries)))
}

//----------------------------------------------   Admin  ----------------------------------------------
route!(buyer_orders => Get "/admin/orders/buyer/{user_id}" impl CheckoutDatabase where requires [Role::Admin]);
pub async fn buyer_orders<B: CheckoutDatabase>(
    path: web::Path<UserId>,
    query: web::Query<OrderListQuery>,
    api: web::Data<OrderStatusApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let buyer_id = path.into_inner();
    debug!("💻️ GET orders for buyer {buyer_id}");
    let orders = api.orders_for_buyer(&buyer_id, query.status).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} orders", orders.len()), orders)))
}

route!(seller_orders => Get "/admin/orders/seller/{user_id}" impl CheckoutDatabase where requires [Role::Admin]);
pub async fn seller_orders<B: CheckoutDatabase>(
    path: web::Path<UserId>,
    query: web::Query<OrderListQuery>,
    api: web::Data<OrderStatusApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let seller_id = path.into_inner();
    debug!("💻️ GET orders for seller {seller_id}");
    let orders = api.orders_for_seller(&seller_id, query.status).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} orders", orders.len()), orders)))
}

route!(dispatch_outbox => Post "/admin/outbox/dispatch" impl CheckoutDatabase where requires [Role::Admin]);
/// Delivers pending side effects right away instead of waiting for the outbox worker.
pub async fn dispatch_outbox<B: CheckoutDatabase>(
    dispatcher: web::Data<SideEffectDispatcher<B, B, B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST dispatch outbox");
    let summary = dispatcher.run_once(100).await?;
    info!("💻️ Manual outbox run: {} delivered, {} failed", summary.delivered, summary.failed);
    Ok(HttpResponse::Ok().json(JsonResponse::success("Outbox dispatched", summary)))
}
