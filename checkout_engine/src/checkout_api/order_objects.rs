use serde::{Deserialize, Serialize};

use crate::{
    checkout_api::{errors::SellerFailure, session_objects::ItemRequest},
    db_types::{
        CheckoutSession,
        DeliveryAddress,
        DeliveryMethod,
        Order,
        OrderStatus,
        PaymentDetails,
        PaymentMethod,
        PaymentStatus,
        SessionId,
        UserId,
    },
};

/// Everything needed to create one seller's order.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub session_id: Option<SessionId>,
    pub items: Vec<ItemRequest>,
    pub delivery_method: DeliveryMethod,
    pub delivery_address: DeliveryAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_details: Option<PaymentDetails>,
}

/// The result of confirming a checkout. `failures` lists the seller groups whose order could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    pub session: CheckoutSession,
    pub orders: Vec<Order>,
    pub failures: Vec<SellerFailure>,
}

impl ConfirmationResult {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}
