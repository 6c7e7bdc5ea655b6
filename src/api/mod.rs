pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use state::AppState;

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        // Push channel for the dashboard
        .route("/ws", get(handlers::ws::websocket))
        .nest("/auth-usuarios", auth_user_routes(app_state.clone()))
        .nest("/planos", plan_routes())
        .nest("/pagamentos", payment_routes())
        .nest("/checkins", checkin_routes())
        .nest("/funcionarios", staff_routes(app_state.clone()))
        .nest("/relatorios", report_routes())
        .with_state(app_state)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // The dashboard is served from another origin
        .layer(TraceLayer::new_for_http())
}

fn auth_user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::auth_users::list))
        .route("/register", post(handlers::auth_users::register))
        .route("/login", post(handlers::auth_users::login))
        .route("/forgot-password", post(handlers::auth_users::forgot_password))
        .route("/reset-password", post(handlers::auth_users::reset_password))
        .route("/usuario/:id", get(handlers::auth_users::get_user))
        .route("/status/:id", get(handlers::auth_users::get_status))
        .route("/:id/plano", get(handlers::auth_users::get_plan))
        .route("/:id/status-plano", get(handlers::auth_users::get_plan_status))
        .route("/:id/cancelar-plano", put(handlers::auth_users::cancel_plan))
        .route("/:id/reativar-plano", put(handlers::auth_users::reactivate_plan))
        .route("/atualizar-status-tempo", post(handlers::auth_users::batch_reconcile))
        // Repair is an administrative operation.
        .route(
            "/corrigir-status",
            post(handlers::auth_users::repair_status).route_layer(
                axum::middleware::from_fn_with_state(state, middleware::auth::require_staff),
            ),
        )
}

fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::plans::list))
        .route("/", post(handlers::plans::create))
        .route("/:id", put(handlers::plans::update))
        .route("/:id", delete(handlers::plans::delete))
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::payments::create))
        .route("/criar-cliente", post(handlers::payments::create_customer))
        .route("/criar-cobranca-cartao", post(handlers::payments::create_card_charge))
        .route("/criar-cobranca-boleto", post(handlers::payments::create_boleto_charge))
        .route("/criar-cobranca-pix", post(handlers::payments::create_pix_charge))
        .route("/criar-link-pagamento", post(handlers::payments::create_payment_link))
        .route("/ultimo-pago/:usuario_id", get(handlers::payments::last_paid))
        .route(
            "/:id",
            get(handlers::payments::list_by_user).put(handlers::payments::update_status),
        )
}

fn checkin_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::checkins::create))
        .route("/", get(handlers::checkins::daily_totals))
        .route("/stats/:usuario_id", get(handlers::checkins::stats))
}

fn staff_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::staff::login))
        // Staff management requires a staff token; the seed binary
        // creates the first account.
        .merge(
            Router::new()
                .route("/", get(handlers::staff::list))
                .route("/", post(handlers::staff::create))
                .route("/:id", put(handlers::staff::update))
                .route("/:id", delete(handlers::staff::delete))
                .route_layer(axum::middleware::from_fn_with_state(
                    state,
                    middleware::auth::require_staff,
                )),
        )
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/usuarios", get(handlers::reports::users))
        .route("/planos", get(handlers::reports::plans))
        .route("/checkins", get(handlers::reports::checkins))
        .route("/financeiro", get(handlers::reports::revenue))
        .route("/grafico-financeiro", get(handlers::reports::revenue_chart))
}
