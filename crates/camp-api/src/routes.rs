//! API routes

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::extractors::AppState;
use crate::handlers::{
    athletes, auth, camps, checkin, promo_codes, public, registrations, reports, staff, tenants,
    venues,
};

/// Create the complete API router
pub fn router() -> Router<AppState> {
    Router::new().nest("/api", api_router())
}

fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_router())
        .nest("/public", public_router())
        .merge(tenants_router())
        .nest("/camps", camps_router())
        .nest("/athletes", athletes_router())
        .merge(registrations_router())
        .nest("/promo-codes", promo_codes_router())
        .merge(incentives_router())
        .nest("/venues", venues_router())
        .nest("/contracts", contracts_router())
        .merge(reports_router())
        .nest("/kiosks", kiosks_router())
}

fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/token", post(auth::token))
        .route("/me", get(auth::me))
}

fn public_router() -> Router<AppState> {
    Router::new()
        .route("/:slug/signup", post(public::signup))
        .route("/:slug/camps", get(public::camps))
}

fn tenants_router() -> Router<AppState> {
    Router::new()
        .route(
            "/tenants",
            get(tenants::list_tenants).post(tenants::create_tenant),
        )
        .route(
            "/tenants/:id",
            get(tenants::get_tenant).patch(tenants::update_tenant),
        )
        .route("/tenants/:id/status", post(tenants::change_tenant_status))
        .route("/users", post(tenants::create_user))
}

fn camps_router() -> Router<AppState> {
    Router::new()
        .route("/", get(camps::list_camps).post(camps::create_camp))
        .route("/:id", get(camps::get_camp).patch(camps::update_camp))
        .route("/:id/status", post(camps::change_camp_status))
        .route("/:id/results", post(camps::record_results))
        .route("/:id/overview", get(camps::camp_overview))
        .route("/:id/registrations", get(registrations::camp_registrations))
        .route("/:id/waitlist/promote", post(registrations::promote_waitlist))
        .route("/:id/staff", get(staff::list_staff).post(staff::assign_staff))
        .route(
            "/:id/staff/:assignment_id",
            delete(staff::remove_staff),
        )
        .route("/:id/roster", get(checkin::roster))
        .route("/:id/checkins", post(checkin::check_in))
        .route("/:id/checkouts", post(checkin::check_out))
        .route("/:id/groups", get(staff::list_groups).post(staff::generate_groups))
        .route("/:id/groups/move", post(staff::move_camper))
        .route("/:id/incentives", get(staff::camp_incentives))
        .route("/:id/incentives/finalize", post(staff::finalize_incentives))
}

fn athletes_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(athletes::list_athletes).post(athletes::create_athlete),
        )
        .route(
            "/:id",
            get(athletes::get_athlete).patch(athletes::update_athlete),
        )
}

fn registrations_router() -> Router<AppState> {
    Router::new()
        .route("/checkout/quote", post(registrations::quote))
        .route("/checkout", post(registrations::checkout))
        .route("/registrations", get(registrations::list_registrations))
        .route(
            "/registrations/:id/cancel",
            post(registrations::cancel_registration),
        )
        .route(
            "/registrations/:id/refund",
            post(registrations::refund_registration),
        )
        .route("/registrations/:id/pay", post(registrations::pay_registration))
}

fn promo_codes_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(promo_codes::list_promo_codes).post(promo_codes::create_promo_code),
        )
        .route(
            "/:id",
            patch(promo_codes::set_promo_code_active),
        )
}

fn incentives_router() -> Router<AppState> {
    Router::new()
        .route(
            "/compensation-plans",
            get(staff::list_plans).post(staff::create_plan),
        )
        .route(
            "/compensation-plans/:id",
            patch(staff::update_plan),
        )
        .route("/payouts/me", get(staff::my_payouts))
}

fn venues_router() -> Router<AppState> {
    Router::new()
        .route("/", get(venues::list_venues).post(venues::create_venue))
        .route(
            "/:id",
            get(venues::get_venue)
                .patch(venues::update_venue)
                .delete(venues::remove_venue),
        )
}

fn contracts_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(venues::list_contracts).post(venues::create_contract),
        )
        .route("/expire", post(venues::expire_contracts))
        .route(
            "/:id",
            get(venues::get_contract).patch(venues::update_contract),
        )
        .route("/:id/send", post(venues::send_contract))
        .route("/:id/sign", post(venues::sign_contract))
        .route("/:id/cancel", post(venues::cancel_contract))
        .route(
            "/:id/document",
            get(venues::download_document).post(venues::upload_document),
        )
}

fn reports_router() -> Router<AppState> {
    Router::new()
        .route("/royalties/statement", get(reports::statement))
        .route(
            "/royalties/invoices",
            get(reports::list_invoices).post(reports::issue_invoices),
        )
        .route(
            "/royalties/invoices/:id/status",
            post(reports::set_invoice_status),
        )
        .route("/dashboard", get(reports::dashboard))
        .route("/analytics", get(reports::analytics))
}

fn kiosks_router() -> Router<AppState> {
    Router::new()
        .route("/", post(checkin::open_kiosk))
        .route("/:id", get(checkin::get_kiosk))
        .route("/:id/events", post(checkin::kiosk_event))
}
