pub mod asaas_client;

pub use asaas_client::{
    AsaasClient, AsaasCharge, AsaasCustomer, AsaasPaymentLink, ChargeRequest, CustomerRequest,
    PaymentLinkRequest, PixCharge, PIX_SIMULATED_PREFIX,
};
