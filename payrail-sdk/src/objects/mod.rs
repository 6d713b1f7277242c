pub mod auth;
pub mod merchants;
pub mod plans;
pub mod subscriptions;

pub use auth::{LoginRequest, SignupRequest, SignupResponse, TokenResponse};
pub use merchants::{DashboardStats, MerchantResponse, PredictVaultQuery, PredictVaultResponse};
pub use plans::{BillingInterval, CheckoutPlanResponse, CreatePlanRequest, PlanResponse};
pub use subscriptions::{
    ActivationMode, AttachVaultRequest, CancelSubscriptionRequest, DepositVaultResponse,
    MerchantSubscription, OpenSubscriptionRequest, PortalSubscription, SubscriptionDetail,
    SubscriptionResponse, SubscriptionStatus, VaultCheckoutRequest, VaultCheckoutResponse,
    VaultStatus,
};
